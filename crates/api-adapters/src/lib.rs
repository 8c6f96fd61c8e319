//! # api-adapters
//!
//! Delivery layer for sync-board. `dto` holds the wire shapes shared by every
//! transport; `http` is the axum router, behind `web-axum`.

pub mod dto;

#[cfg(feature = "web-axum")]
pub mod http;

#[cfg(feature = "web-axum")]
pub use http::{build_router, AppState};
