//! # storage-adapters
//!
//! Implementations of the domain ports:
//!
//! - `memory`: process-local store, index and outbox (tests, demos)
//! - `sqlite`: the relational primary store and a durable outbox (`db-sqlite`)
//! - `elastic`: the search index over the Elasticsearch REST API (`search-elastic`)

pub mod memory;

#[cfg(feature = "db-sqlite")]
pub mod sqlite;

#[cfg(feature = "search-elastic")]
pub mod elastic;

pub use memory::{InMemoryBoardRepository, InMemorySearchIndex, InMemorySyncOutbox};

#[cfg(feature = "db-sqlite")]
pub use sqlite::{SqliteBoardRepository, SqliteSyncOutbox};

#[cfg(feature = "search-elastic")]
pub use elastic::{ElasticsearchConfig, ElasticsearchIndex};
