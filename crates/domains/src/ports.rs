//! # Ports
//!
//! Any adapter must implement these traits to be wired into the services.
//! Mocks are generated for tests behind the `testing` feature.

use async_trait::async_trait;

use crate::document::BoardDocument;
use crate::errors::Result;
use crate::models::{Board, PageableRequest};
use crate::sync::SyncTask;

/// Authoritative persistence for boards and the replies they own.
///
/// Every mutating call is a single transaction; replies are always read and
/// written together with their board.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait BoardRepository: Send + Sync {
    async fn find_by_id(&self, board_id: i64) -> Result<Option<Board>>;
    async fn find_by_bno(&self, bno: &str) -> Result<Option<Board>>;

    /// Persists a new board and returns it with `board_id` assigned.
    /// A duplicate `bno` is a `Conflict`.
    async fn insert(&self, board: &Board) -> Result<Board>;

    /// Bulk variant of [`insert`](Self::insert); all or nothing.
    async fn insert_all(&self, boards: &[Board]) -> Result<Vec<Board>>;

    /// Overwrites the stored row addressed by `board.board_id` and replaces
    /// its reply set, bumping the stored `version`. Returns `false` when no
    /// such row exists and `Stale` when the stored version differs from
    /// `board.version`.
    async fn update(&self, board: &Board) -> Result<bool>;

    /// Removes a board and its replies. Returns `false` when nothing matched.
    async fn delete_by_id(&self, board_id: i64) -> Result<bool>;

    /// Newest first (`reg_date DESC, board_id DESC`), windowed by the request.
    async fn find_page(&self, request: &PageableRequest) -> Result<Vec<Board>>;

    async fn count(&self) -> Result<u64>;
}

/// Keyed document store holding the board projection.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn find_by_id(&self, doc_id: &str) -> Result<Option<BoardDocument>>;

    /// Insert or replace by `document.id`.
    async fn save(&self, document: &BoardDocument) -> Result<()>;

    /// Returns `false` when the document did not exist.
    async fn delete_by_id(&self, doc_id: &str) -> Result<bool>;
}

/// Queue of boards whose search document needs repair.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait SyncOutbox: Send + Sync {
    /// Records a pending repair. Re-enqueuing an existing `bno` only refreshes
    /// `last_error`.
    async fn enqueue(&self, bno: &str, reason: &str) -> Result<()>;

    /// Oldest tasks first, skipping those that already failed
    /// `max_attempts` times.
    async fn pending(&self, limit: usize, max_attempts: u32) -> Result<Vec<SyncTask>>;

    /// Bumps `attempts` and stores `reason` as `last_error`.
    async fn record_failure(&self, bno: &str, reason: &str) -> Result<()>;

    /// Drops the task for `bno`; unknown `bno` is a no-op.
    async fn ack(&self, bno: &str) -> Result<()>;

    async fn pending_count(&self) -> Result<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::document_id;

    #[tokio::test]
    async fn mock_index_reports_missing_documents() {
        let mut index = MockSearchIndex::new();
        index
            .expect_find_by_id()
            .withf(|id: &str| id == document_id("abc"))
            .returning(|_| Ok(None));

        let found = index.find_by_id(&document_id("abc")).await.unwrap();
        assert!(found.is_none());
    }
}
