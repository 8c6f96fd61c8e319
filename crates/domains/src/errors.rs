//! # DomainError
//!
//! Centralized error handling for sync-board.
//! Every failure a port or service can report is one of a closed set of kinds;
//! business-level "nothing there" outcomes are returned as `bool`/`Option`
//! instead and never reach this type.

use serde::Serialize;
use thiserror::Error;

/// The primary error type for all domain and service operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Resource not found (e.g., Board by id or bno)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Resource already exists (e.g., duplicate bno or rno)
    #[error("conflict: {0}")]
    Conflict(String),

    /// The write was based on an older version of the record
    #[error("stale write: {0}")]
    Stale(String),

    /// Validation failure (e.g., empty title, malformed bno, page size 0)
    #[error("validation error: {0}")]
    Validation(String),

    /// Infrastructure failure in a store (e.g., SQLite down, index unreachable)
    #[error("storage error: {0}")]
    Storage(String),

    /// The primary write committed but the search index could not follow.
    #[error("search index out of sync for board {bno}: {reason}")]
    IndexSync { bno: String, reason: String },
}

impl DomainError {
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        Self::NotFound(entity.to_string(), id.to_string())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn stale(entity: &str, id: impl ToString) -> Self {
        Self::Stale(format!("{entity} {} was modified concurrently", id.to_string()))
    }

    pub fn storage(err: impl std::fmt::Display) -> Self {
        Self::Storage(err.to_string())
    }

    /// Classifies this error into the public error code table.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound(..) => ErrorCode::NotFound,
            Self::Conflict(_) | Self::Stale(_) => ErrorCode::Conflict,
            Self::Validation(_) => ErrorCode::InvalidRequest,
            Self::Storage(_) => ErrorCode::StorageFailure,
            Self::IndexSync { .. } => ErrorCode::IndexSyncFailure,
        }
    }
}

/// A specialized Result type for sync-board logic.
pub type Result<T> = std::result::Result<T, DomainError>;

/// Public error codes, each bound to an HTTP status and a fixed message.
///
/// `UnknownServerError` is the catch-all for failures that never made it
/// into a [`DomainError`], such as a panicking handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    Conflict,
    InvalidRequest,
    StorageFailure,
    IndexSyncFailure,
    UnknownServerError,
}

impl ErrorCode {
    pub fn status(self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::InvalidRequest => 400,
            Self::StorageFailure => 503,
            Self::IndexSyncFailure => 502,
            Self::UnknownServerError => 500,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Self::NotFound => "requested resource does not exist",
            Self::Conflict => "resource already exists or was modified concurrently",
            Self::InvalidRequest => "request failed validation",
            Self::StorageFailure => "primary store is unavailable",
            Self::IndexSyncFailure => "saved, but the search index could not be updated",
            Self::UnknownServerError => "unknown server error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_maps_to_a_distinct_code() {
        let errors = [
            DomainError::not_found("Board", 1),
            DomainError::Conflict("dup".into()),
            DomainError::validation("bad"),
            DomainError::storage("down"),
            DomainError::IndexSync { bno: "x".into(), reason: "timeout".into() },
        ];
        let codes: Vec<ErrorCode> = errors.iter().map(DomainError::code).collect();
        for (i, a) in codes.iter().enumerate() {
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert!(!codes.contains(&ErrorCode::UnknownServerError));
    }

    #[test]
    fn stale_write_shares_the_conflict_code() {
        let err = DomainError::stale("Board", 3);
        assert_eq!(err.code(), ErrorCode::Conflict);
        assert_eq!(err.to_string(), "stale write: Board 3 was modified concurrently");
    }

    #[test]
    fn unknown_server_error_is_500() {
        assert_eq!(ErrorCode::UnknownServerError.status(), 500);
        assert_eq!(
            serde_json::to_string(&ErrorCode::UnknownServerError).unwrap(),
            "\"UNKNOWN_SERVER_ERROR\""
        );
    }

    #[test]
    fn not_found_message_names_entity_and_id() {
        let err = DomainError::not_found("Board", "abc");
        assert_eq!(err.to_string(), "Board not found with ID abc");
    }
}
