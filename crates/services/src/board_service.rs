//! # Board service
//!
//! The board write path. Each mutation is one primary-store transaction
//! followed by a projection into the search index through [`IndexSync`].
//! `false` results mean "nothing to act on"; hard failures are errors.

use std::sync::Arc;

use async_trait::async_trait;
use domains::utils::{current_datetime, generate_external_id};
use domains::{Board, BoardKey, BoardRepository, DomainError, PageableRequest, Result};
use tracing::{debug, info};

use crate::index_sync::IndexSync;

#[async_trait]
pub trait BoardServiceApi: Send + Sync {
    /// Newest first, served from the primary store only.
    async fn get_board_list(&self, request: &PageableRequest) -> Result<Vec<Board>>;

    /// The full aggregate, replies included. Missing boards are `NotFound`.
    async fn get_board_detail(&self, key: &BoardKey) -> Result<Board>;

    /// Persists a new board (generating `bno` when empty) and indexes it.
    async fn insert_board(&self, board: Board) -> Result<Board>;

    /// `true` iff the board existed and the update and its projection ran.
    /// A `board` read before someone else's update is rejected as `Stale`
    /// unless it carries exactly the stored content.
    async fn update_board(&self, board: &Board) -> Result<bool>;

    /// `true` iff the board existed and was removed from both stores.
    async fn delete_board(&self, board: &Board) -> Result<bool>;
}

pub struct BoardService {
    store: Arc<dyn BoardRepository>,
    sync: Arc<IndexSync>,
}

impl BoardService {
    pub fn new(store: Arc<dyn BoardRepository>, sync: Arc<IndexSync>) -> Self {
        Self { store, sync }
    }
}

#[async_trait]
impl BoardServiceApi for BoardService {
    async fn get_board_list(&self, request: &PageableRequest) -> Result<Vec<Board>> {
        request.validate()?;
        let boards = self.store.find_page(request).await?;
        debug!(
            page_size = request.limit(),
            from_index = request.from_index,
            returned = boards.len(),
            "board page read"
        );
        Ok(boards)
    }

    async fn get_board_detail(&self, key: &BoardKey) -> Result<Board> {
        let found = match key {
            BoardKey::Id(id) => self.store.find_by_id(*id).await?,
            BoardKey::Bno(bno) => self.store.find_by_bno(bno).await?,
        };
        found.ok_or_else(|| DomainError::not_found("Board", key))
    }

    async fn insert_board(&self, mut board: Board) -> Result<Board> {
        if board.board_id.is_some() {
            return Err(DomainError::validation(
                "board_id is assigned by the store and must be empty on insert",
            ));
        }
        if board.bno.is_empty() {
            board.bno = generate_external_id();
        }
        adopt_replies(&mut board);
        board.validate()?;

        let saved = self.store.insert(&board).await?;
        info!(board_id = ?saved.board_id, bno = %saved.bno, "board inserted");

        self.sync.project(&saved).await?;
        Ok(saved)
    }

    async fn update_board(&self, board: &Board) -> Result<bool> {
        let board_id = require_id(board)?;
        let Some(mut stored) = self.store.find_by_id(board_id).await? else {
            debug!(board_id, "update skipped, board not found");
            return Ok(false);
        };
        if stored.bno != board.bno {
            return Err(DomainError::validation(format!(
                "bno is immutable: board {board_id} is {}, got {}",
                stored.bno, board.bno
            )));
        }

        let mut incoming = board.clone();
        adopt_replies(&mut incoming);
        incoming.validate()?;

        if stored.version != board.version {
            if stored.has_same_content(&incoming) {
                debug!(board_id, "outdated copy matches stored content, re-projecting only");
                self.sync.project(&stored).await?;
                return Ok(true);
            }
            debug!(
                board_id,
                stored = stored.version,
                given = board.version,
                "update rejected, board changed since it was read"
            );
            return Err(DomainError::stale("Board", board_id));
        }
        stored.apply_changes(&incoming, current_datetime());

        if !self.store.update(&stored).await? {
            debug!(board_id, "update skipped, board removed concurrently");
            return Ok(false);
        }
        stored.version += 1;
        info!(board_id, bno = %stored.bno, replies = stored.replies.len(), "board updated");

        self.sync.project(&stored).await?;
        Ok(true)
    }

    async fn delete_board(&self, board: &Board) -> Result<bool> {
        let board_id = require_id(board)?;
        let Some(stored) = self.store.find_by_id(board_id).await? else {
            debug!(board_id, "delete skipped, board not found");
            return Ok(false);
        };
        if !self.store.delete_by_id(board_id).await? {
            return Ok(false);
        }
        info!(board_id, bno = %stored.bno, "board deleted");

        self.sync.remove(&stored.bno).await?;
        Ok(true)
    }
}

fn require_id(board: &Board) -> Result<i64> {
    board
        .board_id
        .ok_or_else(|| DomainError::validation("board_id is required"))
}

/// Replies sent without a parent reference belong to the board carrying them.
fn adopt_replies(board: &mut Board) {
    for reply in board.replies.iter_mut() {
        if reply.bno.is_empty() {
            reply.bno = board.bno.clone();
        }
        if reply.rno.is_empty() {
            reply.rno = generate_external_id();
        }
    }
}
