//! # SQLite primary store
//!
//! This module maps between the relational model in `migrations/` and the
//! domain models. Boards and replies are always written in one transaction.

mod board_repo;
mod outbox;

use std::str::FromStr;
use std::time::Duration;

use domains::{DomainError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

pub use board_repo::SqliteBoardRepository;
pub use outbox::SqliteSyncOutbox;

const SCHEMA: &str = include_str!("../../migrations/0001_boards.sql");

/// Opens a pool and applies the schema.
///
/// An in-memory database lives inside a single connection, so the pool is
/// pinned to one connection that never expires.
pub async fn connect(url: &str, max_connections: u32) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(url)
        .map_err(map_sqlx)?
        .create_if_missing(true)
        .foreign_keys(true);

    let in_memory = url.contains(":memory:") || url.contains("mode=memory");
    let pool_options = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
    } else {
        SqlitePoolOptions::new().max_connections(max_connections.max(1))
    };

    let pool = pool_options.connect_with(options).await.map_err(map_sqlx)?;
    migrate(&pool).await?;
    tracing::debug!(in_memory, "sqlite pool ready");
    Ok(pool)
}

/// Idempotent: every statement is `IF NOT EXISTS`.
pub async fn migrate(pool: &SqlitePool) -> Result<()> {
    sqlx::raw_sql(SCHEMA).execute(pool).await.map_err(map_sqlx)?;
    Ok(())
}

pub(crate) fn map_sqlx(err: sqlx::Error) -> DomainError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            DomainError::Conflict(db.message().to_string())
        }
        _ => DomainError::storage(err),
    }
}
