use axum::extract::State;
use axum::Json;
use serde::Serialize;
use services::ReconcileReport;

use super::error::ApiResult;
use super::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ReconcileResponse {
    #[serde(flatten)]
    report: ReconcileReport,
    /// Tasks still queued after this pass, abandoned ones included.
    pending: u64,
}

/// Runs one reconcile pass on demand, independent of the background interval.
pub(super) async fn reconcile(State(state): State<AppState>) -> ApiResult<Json<ReconcileResponse>> {
    let report = state.sync.reconcile().await?;
    let pending = state.sync.pending().await?;
    Ok(Json(ReconcileResponse { report, pending }))
}
