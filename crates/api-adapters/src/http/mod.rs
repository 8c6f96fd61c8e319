//! # HTTP surface (axum)
//!
//! Routes:
//!
//! | method | path | handler |
//! |---|---|---|
//! | GET | `/health` | liveness plus outbox depth |
//! | GET, POST | `/boards` | page listing, insert |
//! | GET, PUT, DELETE | `/boards/{board_id}` | detail, update, delete |
//! | GET | `/boards/bno/{bno}` | detail by external id |
//! | POST | `/boards/bno/{bno}/replies` | register reply |
//! | PUT, DELETE | `/boards/bno/{bno}/replies/{rno}` | update, delete reply |
//! | POST | `/admin/reconcile` | one reconcile pass |

mod admin;
mod boards;
mod error;
mod extractors;
mod replies;

use std::any::Any;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use domains::ErrorCode;
use serde_json::json;
use services::{BoardServiceApi, IndexSync, ReplyServiceApi};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::dto::HealthResponse;

pub use error::ApiError;

/// Shared by every handler. Services are trait objects so tests can swap in
/// any implementation.
#[derive(Clone)]
pub struct AppState {
    pub boards: Arc<dyn BoardServiceApi>,
    pub replies: Arc<dyn ReplyServiceApi>,
    pub sync: Arc<IndexSync>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/boards", get(boards::list).post(boards::create))
        .route(
            "/boards/{board_id}",
            get(boards::detail).put(boards::update).delete(boards::remove),
        )
        .route("/boards/bno/{bno}", get(boards::detail_by_bno))
        .route("/boards/bno/{bno}/replies", post(replies::register))
        .route(
            "/boards/bno/{bno}/replies/{rno}",
            put(replies::update).delete(replies::remove),
        )
        .route("/admin/reconcile", post(admin::reconcile))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// A panicking handler still answers with the JSON error envelope.
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("non-string panic payload");
    tracing::error!(panic = %detail, "handler panicked");

    let code = ErrorCode::UnknownServerError;
    let body = Json(json!({
        "code": code,
        "message": code.message(),
        "status": code.status(),
    }));
    (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let pending_sync_tasks = match state.sync.pending().await {
        Ok(count) => Some(count),
        Err(err) => {
            tracing::warn!(error = %err, "outbox depth unavailable");
            None
        }
    };
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        pending_sync_tasks,
    })
}
