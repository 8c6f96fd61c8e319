//! Outbox entries for search index repair.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a write reports when the primary store committed but the search
/// index did not follow.
///
/// Either way a [`SyncTask`] is queued so the reconciler can repair the
/// document later.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPolicy {
    /// Report success; the primary store is the source of truth.
    #[default]
    BestEffort,
    /// Report `DomainError::IndexSync`.
    Strict,
}

/// A board whose search document may disagree with the primary store.
///
/// Tasks are keyed by `bno`: the repair re-reads the board at drain time, so
/// one pending task per board is enough no matter how many writes failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncTask {
    pub bno: String,
    pub enqueued_at: DateTime<Utc>,
    /// Failed repair attempts so far
    pub attempts: u32,
    pub last_error: Option<String>,
}

impl SyncTask {
    pub fn new(bno: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            bno: bno.into(),
            enqueued_at: Utc::now(),
            attempts: 0,
            last_error: Some(reason.into()),
        }
    }
}
