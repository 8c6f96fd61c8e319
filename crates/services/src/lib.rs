//! # services
//!
//! Use cases over the domain ports: the board write path that keeps the
//! search index in step with the primary store, the reply operations that
//! cascade through it, and the reconciler that repairs drift.

pub mod board_service;
pub mod index_sync;
pub mod reply_service;

pub use board_service::{BoardService, BoardServiceApi};
pub use index_sync::{IndexSync, ReconcileReport};
pub use reply_service::{ReplyService, ReplyServiceApi};
