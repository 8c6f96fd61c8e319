//! Shared fixtures for the integration tests.
//!
//! Everything here is a factory: each test builds its own stores and data,
//! nothing is shared between tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use domains::utils::{current_datetime, generate_external_id};
use domains::{
    document_id, Board, BoardDocument, BoardRepository, DomainError, Reply, Result, SearchIndex,
    SyncPolicy,
};
use fake::faker::lorem::en::{Sentence, Word};
use fake::faker::name::en::Name;
use fake::Fake;
use services::{BoardService, IndexSync, ReplyService};
use storage_adapters::{
    InMemoryBoardRepository, InMemorySearchIndex, InMemorySyncOutbox, SqliteBoardRepository,
};

pub fn board() -> Board {
    board_at(current_datetime())
}

pub fn board_at(reg_date: NaiveDateTime) -> Board {
    Board::new(
        generate_external_id(),
        Word().fake::<String>(),
        Sentence(2..5).fake::<String>(),
        Sentence(5..12).fake::<String>(),
        Name().fake::<String>(),
        reg_date,
    )
}

pub fn reply_for(board: &Board) -> Reply {
    Reply::new(
        board.bno.clone(),
        generate_external_id(),
        Sentence(3..8).fake::<String>(),
        Name().fake::<String>(),
        current_datetime(),
        true,
    )
}

/// In-memory search index that can be switched into an outage.
#[derive(Default)]
pub struct FlakyIndex {
    inner: InMemorySearchIndex,
    down: AtomicBool,
}

impl FlakyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self) {
        self.down.store(true, Ordering::SeqCst);
    }

    pub fn recover(&self) {
        self.down.store(false, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Reads straight through, outage or not.
    pub async fn document(&self, bno: &str) -> Option<BoardDocument> {
        self.inner.find_by_id(&document_id(bno)).await.ok().flatten()
    }

    fn check(&self) -> Result<()> {
        if self.down.load(Ordering::SeqCst) {
            return Err(DomainError::Storage("search index unreachable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl SearchIndex for FlakyIndex {
    async fn find_by_id(&self, doc_id: &str) -> Result<Option<BoardDocument>> {
        self.check()?;
        self.inner.find_by_id(doc_id).await
    }

    async fn save(&self, document: &BoardDocument) -> Result<()> {
        self.check()?;
        self.inner.save(document).await
    }

    async fn delete_by_id(&self, doc_id: &str) -> Result<bool> {
        self.check()?;
        self.inner.delete_by_id(doc_id).await
    }
}

/// A fully wired service stack over a chosen primary store.
pub struct Harness {
    pub store: Arc<dyn BoardRepository>,
    pub index: Arc<FlakyIndex>,
    pub outbox: Arc<InMemorySyncOutbox>,
    pub sync: Arc<IndexSync>,
    pub boards: Arc<BoardService>,
    pub replies: Arc<ReplyService>,
}

impl Harness {
    pub fn in_memory(policy: SyncPolicy) -> Self {
        Self::over(Arc::new(InMemoryBoardRepository::new()), policy)
    }

    pub async fn sqlite(policy: SyncPolicy) -> Result<Self> {
        let store = SqliteBoardRepository::new("sqlite::memory:", 1).await?;
        Ok(Self::over(Arc::new(store), policy))
    }

    fn over(store: Arc<dyn BoardRepository>, policy: SyncPolicy) -> Self {
        let index = Arc::new(FlakyIndex::new());
        let outbox = Arc::new(InMemorySyncOutbox::new());
        let sync = Arc::new(
            IndexSync::new(store.clone(), index.clone(), outbox.clone())
                .with_policy(policy)
                .with_max_attempts(3),
        );
        let boards = Arc::new(BoardService::new(store.clone(), sync.clone()));
        let replies = Arc::new(ReplyService::new(boards.clone()));
        Self {
            store,
            index,
            outbox,
            sync,
            boards,
            replies,
        }
    }
}
