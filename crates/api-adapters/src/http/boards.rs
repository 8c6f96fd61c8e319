use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use domains::{Board, BoardKey, PageableRequest};

use super::error::{not_found, ApiResult};
use super::extractors::{ApiJson, ApiPath, ApiQuery};
use super::AppState;
use crate::dto::{NewBoardRequest, UpdateBoardRequest};

pub(super) async fn list(
    State(state): State<AppState>,
    ApiQuery(request): ApiQuery<PageableRequest>,
) -> ApiResult<Json<Vec<Board>>> {
    Ok(Json(state.boards.get_board_list(&request).await?))
}

pub(super) async fn create(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<NewBoardRequest>,
) -> ApiResult<(StatusCode, Json<Board>)> {
    let saved = state.boards.insert_board(request.into_board()).await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

pub(super) async fn detail(
    State(state): State<AppState>,
    ApiPath(board_id): ApiPath<i64>,
) -> ApiResult<Json<Board>> {
    Ok(Json(state.boards.get_board_detail(&BoardKey::Id(board_id)).await?))
}

pub(super) async fn detail_by_bno(
    State(state): State<AppState>,
    ApiPath(bno): ApiPath<String>,
) -> ApiResult<Json<Board>> {
    Ok(Json(state.boards.get_board_detail(&BoardKey::Bno(bno)).await?))
}

pub(super) async fn update(
    State(state): State<AppState>,
    ApiPath(board_id): ApiPath<i64>,
    ApiJson(request): ApiJson<UpdateBoardRequest>,
) -> ApiResult<Json<Board>> {
    let key = BoardKey::Id(board_id);
    let stored = state.boards.get_board_detail(&key).await?;
    if !state.boards.update_board(&request.apply_to(stored)).await? {
        return Err(not_found("Board", key));
    }
    Ok(Json(state.boards.get_board_detail(&key).await?))
}

pub(super) async fn remove(
    State(state): State<AppState>,
    ApiPath(board_id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    let key = BoardKey::Id(board_id);
    let stored = state.boards.get_board_detail(&key).await?;
    if !state.boards.delete_board(&stored).await? {
        return Err(not_found("Board", key));
    }
    Ok(StatusCode::NO_CONTENT)
}
