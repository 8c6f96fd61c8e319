//! Process-local adapters.
//!
//! They follow the same contracts as the SQLite and Elasticsearch adapters
//! (surrogate keys from 1, `bno`/`rno` uniqueness, newest-first pages) so the
//! services can be exercised without any infrastructure.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use dashmap::DashMap;
use domains::{
    Board, BoardDocument, BoardRepository, DomainError, PageableRequest, Result, SearchIndex,
    SyncOutbox, SyncTask,
};

#[derive(Default)]
struct Tables {
    last_id: i64,
    boards: BTreeMap<i64, Board>,
}

impl Tables {
    fn check_unique(&self, board: &Board, own_id: Option<i64>) -> Result<()> {
        for (id, other) in &self.boards {
            if Some(*id) == own_id {
                continue;
            }
            if other.bno == board.bno {
                return Err(DomainError::Conflict(format!(
                    "bno {} already exists",
                    board.bno
                )));
            }
            let taken = board
                .replies
                .iter()
                .find(|r| other.find_reply(&r.rno).is_some());
            if let Some(reply) = taken {
                return Err(DomainError::Conflict(format!(
                    "rno {} already exists",
                    reply.rno
                )));
            }
        }
        Ok(())
    }

    fn insert(&mut self, board: &Board) -> Result<Board> {
        self.check_unique(board, None)?;
        self.last_id += 1;
        let mut saved = board.clone();
        saved.board_id = Some(self.last_id);
        self.boards.insert(self.last_id, saved.clone());
        Ok(saved)
    }
}

/// `BoardRepository` backed by a `BTreeMap` behind a lock.
#[derive(Default)]
pub struct InMemoryBoardRepository {
    tables: RwLock<Tables>,
}

impl InMemoryBoardRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> DomainError {
    DomainError::storage("lock poisoned")
}

#[async_trait]
impl BoardRepository for InMemoryBoardRepository {
    async fn find_by_id(&self, board_id: i64) -> Result<Option<Board>> {
        let tables = self.tables.read().map_err(poisoned)?;
        Ok(tables.boards.get(&board_id).cloned())
    }

    async fn find_by_bno(&self, bno: &str) -> Result<Option<Board>> {
        let tables = self.tables.read().map_err(poisoned)?;
        Ok(tables.boards.values().find(|b| b.bno == bno).cloned())
    }

    async fn insert(&self, board: &Board) -> Result<Board> {
        let mut tables = self.tables.write().map_err(poisoned)?;
        tables.insert(board)
    }

    async fn insert_all(&self, boards: &[Board]) -> Result<Vec<Board>> {
        let mut tables = self.tables.write().map_err(poisoned)?;
        // stage on a copy so a conflict halfway leaves nothing behind
        let mut staged = Tables {
            last_id: tables.last_id,
            boards: tables.boards.clone(),
        };
        let saved = boards
            .iter()
            .map(|b| staged.insert(b))
            .collect::<Result<Vec<_>>>()?;
        *tables = staged;
        Ok(saved)
    }

    async fn update(&self, board: &Board) -> Result<bool> {
        let Some(board_id) = board.board_id else {
            return Ok(false);
        };
        let mut tables = self.tables.write().map_err(poisoned)?;
        match tables.boards.get(&board_id) {
            Some(existing) if existing.bno != board.bno => return Ok(false),
            Some(existing) if existing.version != board.version => {
                return Err(DomainError::stale("Board", board_id));
            }
            Some(_) => {}
            None => return Ok(false),
        }
        tables.check_unique(board, Some(board_id))?;
        let mut stored = board.clone();
        stored.version += 1;
        tables.boards.insert(board_id, stored);
        Ok(true)
    }

    async fn delete_by_id(&self, board_id: i64) -> Result<bool> {
        let mut tables = self.tables.write().map_err(poisoned)?;
        Ok(tables.boards.remove(&board_id).is_some())
    }

    async fn find_page(&self, request: &PageableRequest) -> Result<Vec<Board>> {
        let tables = self.tables.read().map_err(poisoned)?;
        let mut matching: Vec<&Board> = tables
            .boards
            .values()
            .filter(|b| request.contains(&b.reg_date))
            .collect();
        matching.sort_by(|a, b| {
            b.reg_date
                .cmp(&a.reg_date)
                .then_with(|| b.board_id.cmp(&a.board_id))
        });
        Ok(matching
            .into_iter()
            .skip(request.from_index as usize)
            .take(request.limit() as usize)
            .cloned()
            .collect())
    }

    async fn count(&self) -> Result<u64> {
        let tables = self.tables.read().map_err(poisoned)?;
        Ok(tables.boards.len() as u64)
    }
}

/// `SearchIndex` backed by a concurrent map keyed by document id.
#[derive(Default)]
pub struct InMemorySearchIndex {
    documents: DashMap<String, BoardDocument>,
}

impl InMemorySearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[async_trait]
impl SearchIndex for InMemorySearchIndex {
    async fn find_by_id(&self, doc_id: &str) -> Result<Option<BoardDocument>> {
        Ok(self.documents.get(doc_id).map(|d| d.value().clone()))
    }

    async fn save(&self, document: &BoardDocument) -> Result<()> {
        self.documents.insert(document.id.clone(), document.clone());
        Ok(())
    }

    async fn delete_by_id(&self, doc_id: &str) -> Result<bool> {
        Ok(self.documents.remove(doc_id).is_some())
    }
}

/// `SyncOutbox` backed by a concurrent map keyed by `bno`.
#[derive(Default)]
pub struct InMemorySyncOutbox {
    tasks: DashMap<String, SyncTask>,
}

impl InMemorySyncOutbox {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SyncOutbox for InMemorySyncOutbox {
    async fn enqueue(&self, bno: &str, reason: &str) -> Result<()> {
        self.tasks
            .entry(bno.to_string())
            .and_modify(|task| task.last_error = Some(reason.to_string()))
            .or_insert_with(|| SyncTask::new(bno, reason));
        Ok(())
    }

    async fn pending(&self, limit: usize, max_attempts: u32) -> Result<Vec<SyncTask>> {
        let mut tasks: Vec<SyncTask> = self
            .tasks
            .iter()
            .filter(|t| t.attempts < max_attempts)
            .map(|t| t.value().clone())
            .collect();
        tasks.sort_by(|a, b| a.enqueued_at.cmp(&b.enqueued_at).then_with(|| a.bno.cmp(&b.bno)));
        tasks.truncate(limit);
        Ok(tasks)
    }

    async fn record_failure(&self, bno: &str, reason: &str) -> Result<()> {
        if let Some(mut task) = self.tasks.get_mut(bno) {
            task.attempts += 1;
            task.last_error = Some(reason.to_string());
        }
        Ok(())
    }

    async fn ack(&self, bno: &str) -> Result<()> {
        self.tasks.remove(bno);
        Ok(())
    }

    async fn pending_count(&self) -> Result<u64> {
        Ok(self.tasks.len() as u64)
    }
}

impl InMemorySyncOutbox {
    /// Oldest-first copy of every task, exhausted ones included.
    pub fn snapshot(&self) -> Vec<SyncTask> {
        let mut tasks: Vec<SyncTask> = self.tasks.iter().map(|t| t.value().clone()).collect();
        tasks.sort_by_key(|t| t.enqueued_at);
        tasks
    }
}
