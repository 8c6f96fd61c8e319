//! Reply operations.
//!
//! Replies have no write path of their own: every operation loads the parent
//! board, edits its reply collection and saves the whole aggregate through
//! [`BoardServiceApi::update_board`], so the search document always carries
//! the current replies. When another write lands between the load and the
//! save, the edit is replayed on a fresh copy of the board.

use std::sync::Arc;

use async_trait::async_trait;
use domains::utils::generate_external_id;
use domains::{Board, BoardKey, DomainError, Reply, Result};
use tracing::debug;

use crate::board_service::BoardServiceApi;

/// Replays of an edit after a stale write before the error is surfaced.
const MAX_STALE_RETRIES: usize = 3;

#[async_trait]
pub trait ReplyServiceApi: Send + Sync {
    /// `false` when the parent board does not exist; a taken `rno` is a
    /// `Conflict`.
    async fn register_reply(&self, reply: &Reply) -> Result<bool>;

    /// Replaces `content` and `visible`. `false` when board or reply is missing.
    async fn update_reply(&self, reply: &Reply) -> Result<bool>;

    async fn delete_reply(&self, reply: &Reply) -> Result<bool>;
}

pub struct ReplyService {
    boards: Arc<dyn BoardServiceApi>,
}

impl ReplyService {
    pub fn new(boards: Arc<dyn BoardServiceApi>) -> Self {
        Self { boards }
    }

    async fn parent_of(&self, reply: &Reply) -> Result<Option<Board>> {
        match self
            .boards
            .get_board_detail(&BoardKey::Bno(reply.bno.clone()))
            .await
        {
            Ok(board) => Ok(Some(board)),
            Err(DomainError::NotFound(..)) => {
                debug!(bno = %reply.bno, rno = %reply.rno, "parent board not found");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Loads the parent, applies `edit` and saves the board. `edit` returning
    /// `false` ends the operation with `false` and nothing written.
    async fn edit_parent<F>(&self, reply: &Reply, edit: F) -> Result<bool>
    where
        F: Fn(&mut Board) -> Result<bool> + Send + Sync,
    {
        let mut retries = 0;
        loop {
            let Some(mut board) = self.parent_of(reply).await? else {
                return Ok(false);
            };
            if !edit(&mut board)? {
                return Ok(false);
            }
            match self.boards.update_board(&board).await {
                Err(DomainError::Stale(reason)) if retries < MAX_STALE_RETRIES => {
                    retries += 1;
                    debug!(
                        bno = %board.bno,
                        rno = %reply.rno,
                        retries,
                        %reason,
                        "parent board changed, replaying reply edit"
                    );
                }
                outcome => return outcome,
            }
        }
    }
}

#[async_trait]
impl ReplyServiceApi for ReplyService {
    async fn register_reply(&self, reply: &Reply) -> Result<bool> {
        let mut reply = reply.clone();
        if reply.rno.is_empty() {
            reply.rno = generate_external_id();
        }
        let new_reply = reply.clone();
        self.edit_parent(&reply, move |board| {
            if board.find_reply(&new_reply.rno).is_some() {
                return Err(DomainError::Conflict(format!(
                    "reply {} already exists on board {}",
                    new_reply.rno, board.bno
                )));
            }
            board.attach_reply(new_reply.clone());
            Ok(true)
        })
        .await
    }

    async fn update_reply(&self, reply: &Reply) -> Result<bool> {
        self.edit_parent(reply, |board| {
            let Some(existing) = board.find_reply_mut(&reply.rno) else {
                return Ok(false);
            };
            existing.content = reply.content.clone();
            existing.visible = reply.visible;
            Ok(true)
        })
        .await
    }

    async fn delete_reply(&self, reply: &Reply) -> Result<bool> {
        self.edit_parent(reply, |board| Ok(board.detach_reply(&reply.rno).is_some()))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::utils::current_datetime;
    use domains::PageableRequest;
    use std::sync::Mutex;

    /// Keeps one board in memory and records what `update_board` received.
    /// The first `stale_writes` updates are refused as stale.
    struct SingleBoard {
        board: Mutex<Option<Board>>,
        updates: Mutex<Vec<Board>>,
        stale_writes: Mutex<usize>,
    }

    impl SingleBoard {
        fn holding(board: Option<Board>) -> Arc<Self> {
            Self::refusing(board, 0)
        }

        fn refusing(board: Option<Board>, stale_writes: usize) -> Arc<Self> {
            Arc::new(Self {
                board: Mutex::new(board),
                updates: Mutex::new(Vec::new()),
                stale_writes: Mutex::new(stale_writes),
            })
        }
    }

    #[async_trait]
    impl BoardServiceApi for SingleBoard {
        async fn get_board_list(&self, _: &PageableRequest) -> Result<Vec<Board>> {
            Ok(self.board.lock().unwrap().clone().into_iter().collect())
        }

        async fn get_board_detail(&self, key: &BoardKey) -> Result<Board> {
            self.board
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| DomainError::not_found("Board", key))
        }

        async fn insert_board(&self, board: Board) -> Result<Board> {
            Ok(board)
        }

        async fn update_board(&self, board: &Board) -> Result<bool> {
            {
                let mut stale = self.stale_writes.lock().unwrap();
                if *stale > 0 {
                    *stale -= 1;
                    return Err(DomainError::stale("Board", board.bno.clone()));
                }
            }
            *self.board.lock().unwrap() = Some(board.clone());
            self.updates.lock().unwrap().push(board.clone());
            Ok(true)
        }

        async fn delete_board(&self, _: &Board) -> Result<bool> {
            Ok(false)
        }
    }

    fn board() -> Board {
        let mut board = Board::new(
            generate_external_id(),
            "Category1",
            "title1",
            "content",
            "user1",
            current_datetime(),
        );
        board.board_id = Some(1);
        board
    }

    fn reply_on(board: &Board) -> Reply {
        Reply::new(
            board.bno.clone(),
            generate_external_id(),
            "first comment",
            "user111",
            current_datetime(),
            true,
        )
    }

    #[tokio::test]
    async fn register_cascades_through_board_update() {
        let board = board();
        let reply = reply_on(&board);
        let boards = SingleBoard::holding(Some(board));
        let svc = ReplyService::new(boards.clone());

        assert!(svc.register_reply(&reply).await.unwrap());
        let updates = boards.updates.lock().unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].replies, vec![reply]);
    }

    #[tokio::test]
    async fn register_generates_missing_rno() {
        let board = board();
        let mut reply = reply_on(&board);
        reply.rno.clear();
        let boards = SingleBoard::holding(Some(board));
        let svc = ReplyService::new(boards.clone());

        assert!(svc.register_reply(&reply).await.unwrap());
        let current = boards.board.lock().unwrap().clone().unwrap();
        assert_eq!(current.replies[0].rno.len(), 32);
    }

    #[tokio::test]
    async fn register_on_missing_board_is_false() {
        let reply = reply_on(&board());
        let svc = ReplyService::new(SingleBoard::holding(None));
        assert!(!svc.register_reply(&reply).await.unwrap());
    }

    #[tokio::test]
    async fn register_twice_conflicts() {
        let board = board();
        let reply = reply_on(&board);
        let svc = ReplyService::new(SingleBoard::holding(Some(board)));

        svc.register_reply(&reply).await.unwrap();
        let err = svc.register_reply(&reply).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn update_and_delete_target_only_the_named_reply() {
        let mut board = board();
        let first = reply_on(&board);
        let second = reply_on(&board);
        board.attach_reply(first.clone());
        board.attach_reply(second.clone());
        let boards = SingleBoard::holding(Some(board));
        let svc = ReplyService::new(boards.clone());

        let mut edited = first.clone();
        edited.content = "edited".into();
        edited.visible = false;
        assert!(svc.update_reply(&edited).await.unwrap());
        assert!(svc.delete_reply(&second).await.unwrap());

        let current = boards.board.lock().unwrap().clone().unwrap();
        assert_eq!(current.replies.len(), 1);
        assert_eq!(current.replies[0].content, "edited");
        assert!(!current.replies[0].visible);

        let mut unknown = reply_on(&current);
        unknown.rno = generate_external_id();
        assert!(!svc.update_reply(&unknown).await.unwrap());
        assert!(!svc.delete_reply(&unknown).await.unwrap());
    }

    #[tokio::test]
    async fn stale_parent_is_reloaded_and_the_edit_replayed() {
        let board = board();
        let reply = reply_on(&board);
        let boards = SingleBoard::refusing(Some(board), 2);
        let svc = ReplyService::new(boards.clone());

        assert!(svc.register_reply(&reply).await.unwrap());
        let current = boards.board.lock().unwrap().clone().unwrap();
        assert_eq!(current.replies, vec![reply]);
    }

    #[tokio::test]
    async fn persistent_staleness_is_surfaced() {
        let board = board();
        let reply = reply_on(&board);
        let boards = SingleBoard::refusing(Some(board), MAX_STALE_RETRIES + 1);
        let svc = ReplyService::new(boards.clone());

        let err = svc.register_reply(&reply).await.unwrap_err();
        assert!(matches!(err, DomainError::Stale(_)));
        assert!(boards.updates.lock().unwrap().is_empty());
    }
}
