//! sync-board/crates/domains/src/lib.rs
//!
//! The central domain model and port definitions for sync-board.
//! Nothing in this crate performs I/O; adapters implement the ports.

pub mod document;
pub mod errors;
pub mod models;
pub mod ports;
pub mod sync;
pub mod utils;

// Re-exporting for easier access in other crates
pub use document::*;
pub use errors::*;
pub use models::*;
pub use ports::*;
pub use sync::*;

#[cfg(test)]
mod tests {
    use super::models::*;
    use super::utils;

    #[test]
    fn test_board_creation_defaults() {
        let bno = utils::generate_external_id();
        let board = Board::new(
            bno.clone(),
            "Category1",
            "title1",
            "content",
            "user1",
            utils::current_datetime(),
        );
        assert_eq!(board.bno, bno);
        assert_eq!(board.hit_cnt, 0);
        assert!(board.board_id.is_none());
        assert!(board.replies.is_empty());
    }
}
