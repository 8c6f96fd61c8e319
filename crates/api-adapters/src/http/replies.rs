use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use domains::utils::current_datetime;
use domains::Reply;

use super::error::{not_found, ApiResult};
use super::extractors::{ApiJson, ApiPath};
use super::AppState;
use crate::dto::{NewReplyRequest, UpdateReplyRequest};

pub(super) async fn register(
    State(state): State<AppState>,
    ApiPath(bno): ApiPath<String>,
    ApiJson(request): ApiJson<NewReplyRequest>,
) -> ApiResult<(StatusCode, Json<Reply>)> {
    let reply = request.into_reply(&bno);
    if !state.replies.register_reply(&reply).await? {
        return Err(not_found("Board", bno));
    }
    Ok((StatusCode::CREATED, Json(reply)))
}

pub(super) async fn update(
    State(state): State<AppState>,
    ApiPath((bno, rno)): ApiPath<(String, String)>,
    ApiJson(request): ApiJson<UpdateReplyRequest>,
) -> ApiResult<StatusCode> {
    // Only content and visibility are read by the service.
    let reply = Reply::new(
        bno,
        rno,
        request.content,
        String::new(),
        current_datetime(),
        request.visible,
    );
    if !state.replies.update_reply(&reply).await? {
        return Err(not_found("Reply", reply.rno));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub(super) async fn remove(
    State(state): State<AppState>,
    ApiPath((bno, rno)): ApiPath<(String, String)>,
) -> ApiResult<StatusCode> {
    let reply = Reply::new(bno, rno, String::new(), String::new(), current_datetime(), false);
    if !state.replies.delete_reply(&reply).await? {
        return Err(not_found("Reply", reply.rno));
    }
    Ok(StatusCode::NO_CONTENT)
}
