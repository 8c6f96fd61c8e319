//! # Domain Models
//!
//! These structs represent the core entities of sync-board.
//! A board carries two identities: the surrogate `board_id` assigned by the
//! primary store, and the caller-generated `bno` that never changes and keys
//! the search document.

use std::collections::HashSet;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::errors::{DomainError, Result};
use crate::utils::is_valid_external_id;

/// Largest window a single list call may return.
pub const MAX_PAGE_SIZE: u32 = 1000;
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// A forum post together with the replies it owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    /// Surrogate key; `None` until the primary store assigns one.
    pub board_id: Option<i64>,
    pub bno: String,
    pub category: String,
    pub title: String,
    pub content: String,
    /// View counter
    pub hit_cnt: i64,
    pub user: String,
    pub reg_date: NaiveDateTime,
    pub mod_date: Option<NaiveDateTime>,
    /// Bumped by the primary store on every update. Writes carrying an older
    /// value are rejected as stale.
    #[serde(default)]
    pub version: i64,
    /// Insertion order is preserved end to end.
    #[serde(default)]
    pub replies: Vec<Reply>,
}

impl Board {
    pub fn new(
        bno: impl Into<String>,
        category: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
        user: impl Into<String>,
        reg_date: NaiveDateTime,
    ) -> Self {
        Self {
            board_id: None,
            bno: bno.into(),
            category: category.into(),
            title: title.into(),
            content: content.into(),
            hit_cnt: 0,
            user: user.into(),
            reg_date,
            mod_date: None,
            version: 0,
            replies: Vec::new(),
        }
    }

    /// Appends a reply to the in-memory aggregate. Nothing is persisted until
    /// the board itself is updated.
    pub fn attach_reply(&mut self, reply: Reply) {
        self.replies.push(reply);
    }

    pub fn find_reply(&self, rno: &str) -> Option<&Reply> {
        self.replies.iter().find(|r| r.rno == rno)
    }

    pub fn find_reply_mut(&mut self, rno: &str) -> Option<&mut Reply> {
        self.replies.iter_mut().find(|r| r.rno == rno)
    }

    /// Removes the reply with `rno`, returning it when it existed.
    pub fn detach_reply(&mut self, rno: &str) -> Option<Reply> {
        let pos = self.replies.iter().position(|r| r.rno == rno)?;
        Some(self.replies.remove(pos))
    }

    /// Copies every mutable field of `source` onto `self`.
    /// Identity (`board_id`, `bno`), `reg_date` and `version` stay untouched.
    pub fn apply_changes(&mut self, source: &Board, modified_at: NaiveDateTime) {
        self.category = source.category.clone();
        self.title = source.title.clone();
        self.content = source.content.clone();
        self.hit_cnt = source.hit_cnt;
        self.replies = source.replies.clone();
        self.mod_date = Some(modified_at);
    }

    /// True when every field [`apply_changes`](Self::apply_changes) copies
    /// already matches `other`.
    pub fn has_same_content(&self, other: &Board) -> bool {
        self.category == other.category
            && self.title == other.title
            && self.content == other.content
            && self.hit_cnt == other.hit_cnt
            && self.replies == other.replies
    }

    /// Checks field-level invariants, including every owned reply.
    pub fn validate(&self) -> Result<()> {
        if !is_valid_external_id(&self.bno) {
            return Err(DomainError::validation(format!(
                "bno must be a 32 character dash-free hex token, got `{}`",
                self.bno
            )));
        }
        require_non_blank("category", &self.category)?;
        require_non_blank("title", &self.title)?;
        require_non_blank("user", &self.user)?;
        if self.hit_cnt < 0 {
            return Err(DomainError::validation("hit_cnt cannot be negative"));
        }

        let mut seen = HashSet::with_capacity(self.replies.len());
        for reply in &self.replies {
            reply.validate()?;
            if reply.bno != self.bno {
                return Err(DomainError::validation(format!(
                    "reply {} belongs to board {}, not {}",
                    reply.rno, reply.bno, self.bno
                )));
            }
            if !seen.insert(reply.rno.as_str()) {
                return Err(DomainError::validation(format!(
                    "duplicate reply rno {}",
                    reply.rno
                )));
            }
        }
        Ok(())
    }
}

/// A comment owned by exactly one board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    /// Parent board's external id
    pub bno: String,
    pub rno: String,
    pub content: String,
    pub user: String,
    pub reg_date: NaiveDateTime,
    /// Hidden replies stay stored but are not meant for display.
    pub visible: bool,
}

impl Reply {
    pub fn new(
        bno: impl Into<String>,
        rno: impl Into<String>,
        content: impl Into<String>,
        user: impl Into<String>,
        reg_date: NaiveDateTime,
        visible: bool,
    ) -> Self {
        Self {
            bno: bno.into(),
            rno: rno.into(),
            content: content.into(),
            user: user.into(),
            reg_date,
            visible,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !is_valid_external_id(&self.rno) {
            return Err(DomainError::validation(format!(
                "rno must be a 32 character dash-free hex token, got `{}`",
                self.rno
            )));
        }
        require_non_blank("reply content", &self.content)?;
        require_non_blank("reply user", &self.user)
    }
}

/// Query descriptor for the paginated board listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageableRequest {
    /// Inclusive lower bound on `reg_date`
    pub start_datetime: Option<NaiveDateTime>,
    /// Exclusive upper bound on `reg_date`
    pub end_datetime: Option<NaiveDateTime>,
    pub page_size: u32,
    pub from_index: u32,
}

impl Default for PageableRequest {
    fn default() -> Self {
        Self {
            start_datetime: None,
            end_datetime: None,
            page_size: DEFAULT_PAGE_SIZE,
            from_index: 0,
        }
    }
}

impl PageableRequest {
    pub fn new(page_size: u32, from_index: u32) -> Self {
        Self {
            page_size,
            from_index,
            ..Self::default()
        }
    }

    pub fn with_range(
        mut self,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Self {
        self.start_datetime = start;
        self.end_datetime = end;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(DomainError::validation("page_size must be positive"));
        }
        if let (Some(start), Some(end)) = (self.start_datetime, self.end_datetime) {
            if start >= end {
                return Err(DomainError::validation(
                    "start_datetime must be earlier than end_datetime",
                ));
            }
        }
        Ok(())
    }

    /// Page size clamped to [`MAX_PAGE_SIZE`].
    pub fn limit(&self) -> u32 {
        self.page_size.min(MAX_PAGE_SIZE)
    }

    /// True when `reg_date` falls inside the optional bounds.
    pub fn contains(&self, reg_date: &NaiveDateTime) -> bool {
        self.start_datetime.map_or(true, |start| *reg_date >= start)
            && self.end_datetime.map_or(true, |end| *reg_date < end)
    }
}

/// How a caller addresses a single board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardKey {
    Id(i64),
    Bno(String),
}

impl From<&Board> for BoardKey {
    /// Prefers the surrogate key when the board has been persisted.
    fn from(board: &Board) -> Self {
        match board.board_id {
            Some(id) => Self::Id(id),
            None => Self::Bno(board.bno.clone()),
        }
    }
}

impl std::fmt::Display for BoardKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id={id}"),
            Self::Bno(bno) => write!(f, "bno={bno}"),
        }
    }
}

fn require_non_blank(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(format!("{field} cannot be empty")));
    }
    Ok(())
}
