use std::sync::Arc;

use api_adapters::{build_router, AppState};
use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use domains::{Board, BoardKey, PageableRequest, Result};
use serde_json::{json, Value};
use services::{BoardService, BoardServiceApi, IndexSync, ReplyService};
use storage_adapters::{InMemoryBoardRepository, InMemorySearchIndex, InMemorySyncOutbox};
use tower::ServiceExt;

fn app() -> (Router, Arc<InMemorySearchIndex>) {
    let store = Arc::new(InMemoryBoardRepository::new());
    let index = Arc::new(InMemorySearchIndex::new());
    let outbox = Arc::new(InMemorySyncOutbox::new());
    let sync = Arc::new(IndexSync::new(store.clone(), index.clone(), outbox));
    let boards = Arc::new(BoardService::new(store, sync.clone()));
    let replies = Arc::new(ReplyService::new(boards.clone()));

    let router = build_router(AppState {
        boards,
        replies,
        sync,
    });
    (router, index)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    send_raw(app, method, uri, body.map(|b| b.to_string())).await
}

async fn send_raw(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<String>,
) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.map(Body::from).unwrap_or_else(Body::empty))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn new_board(title: &str) -> Value {
    json!({
        "category": "Category1",
        "title": title,
        "content": "content",
        "user": "user1"
    })
}

#[tokio::test]
async fn health_reports_empty_outbox() {
    let (app, _) = app();
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["pendingSyncTasks"], 0);
}

#[tokio::test]
async fn create_then_fetch_by_id_and_bno() {
    let (app, index) = app();
    let (status, created) = send(&app, "POST", "/boards", Some(new_board("title1"))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["boardId"], 1);
    let bno = created["bno"].as_str().unwrap().to_owned();
    assert_eq!(bno.len(), 32);
    assert_eq!(index.len(), 1);

    let (status, by_id) = send(&app, "GET", "/boards/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_id["title"], "title1");

    let (status, by_bno) = send(&app, "GET", &format!("/boards/bno/{bno}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_bno["boardId"], 1);
}

#[tokio::test]
async fn missing_board_is_not_found_json() {
    let (app, _) = app();
    let (status, body) = send(&app, "GET", "/boards/42", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
    assert_eq!(body["status"], 404);

    let (status, _) = send(&app, "DELETE", "/boards/42", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn blank_title_is_rejected() {
    let (app, index) = app();
    let (status, body) = send(&app, "POST", "/boards", Some(new_board("  "))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_REQUEST");
    assert!(index.is_empty());
}

#[tokio::test]
async fn list_is_newest_first_with_paging() {
    let (app, _) = app();
    for year in 2001..=2005 {
        let mut board = new_board(&format!("title{year}"));
        board["regDate"] = json!(format!("{year}-01-01T01:01:01"));
        send(&app, "POST", "/boards", Some(board)).await;
    }

    let (status, page) = send(&app, "GET", "/boards?pageSize=2&fromIndex=1", None).await;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<&str> = page
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["title2004", "title2003"]);

    let (status, _) = send(&app, "GET", "/boards?pageSize=0", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_and_delete_flow() {
    let (app, index) = app();
    let (_, created) = send(&app, "POST", "/boards", Some(new_board("title1"))).await;
    let bno = created["bno"].as_str().unwrap().to_owned();

    let (status, updated) = send(
        &app,
        "PUT",
        "/boards/1",
        Some(json!({ "category": "Category1", "title": "updated!!!", "content": "content" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "updated!!!");
    assert_eq!(updated["bno"], bno.as_str());
    assert!(updated["modDate"].is_string());

    let (status, body) = send(
        &app,
        "PUT",
        "/boards/1",
        Some(json!({ "bno": "0".repeat(32), "category": "c", "title": "t", "content": "c" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_REQUEST");

    let (status, _) = send(&app, "DELETE", "/boards/1", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(index.is_empty());
}

#[tokio::test]
async fn reply_lifecycle_goes_through_the_board() {
    let (app, _) = app();
    let (_, created) = send(&app, "POST", "/boards", Some(new_board("title1"))).await;
    let bno = created["bno"].as_str().unwrap().to_owned();
    let replies = format!("/boards/bno/{bno}/replies");

    let (status, reply) = send(
        &app,
        "POST",
        &replies,
        Some(json!({ "content": "first comment", "user": "user111" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let rno = reply["rno"].as_str().unwrap().to_owned();

    let (status, _) = send(
        &app,
        "PUT",
        &format!("{replies}/{rno}"),
        Some(json!({ "content": "edited", "visible": false })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, board) = send(&app, "GET", "/boards/1", None).await;
    assert_eq!(board["replies"][0]["rno"], rno.as_str());
    assert_eq!(board["replies"][0]["content"], "edited");
    assert_eq!(board["replies"][0]["visible"], false);

    let (status, _) = send(&app, "DELETE", &format!("{replies}/{rno}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "DELETE", &format!("{replies}/{rno}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "POST",
        &format!("/boards/bno/{}/replies", "f".repeat(32)),
        Some(json!({ "content": "orphan", "user": "user111" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reconcile_on_empty_outbox() {
    let (app, _) = app();
    let (status, body) = send(&app, "POST", "/admin/reconcile", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["processed"], 0);
    assert_eq!(body["pending"], 0);
}

#[tokio::test]
async fn malformed_input_gets_the_json_error_envelope() {
    let (app, index) = app();

    let (status, body) =
        send_raw(&app, "POST", "/boards", Some("{not json".to_owned())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_REQUEST");
    assert_eq!(body["status"], 400);
    assert!(index.is_empty());

    let (status, body) = send(&app, "GET", "/boards?pageSize=abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_REQUEST");

    let (status, body) = send(&app, "GET", "/boards/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_REQUEST");

    let (status, body) = send(&app, "POST", "/boards", Some(json!({ "title": "t" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_REQUEST");
}

/// Board service whose every call panics.
struct Exploding;

#[async_trait]
impl BoardServiceApi for Exploding {
    async fn get_board_list(&self, _: &PageableRequest) -> Result<Vec<Board>> {
        panic!("board listing exploded")
    }

    async fn get_board_detail(&self, _: &BoardKey) -> Result<Board> {
        panic!("board detail exploded")
    }

    async fn insert_board(&self, _: Board) -> Result<Board> {
        panic!("board insert exploded")
    }

    async fn update_board(&self, _: &Board) -> Result<bool> {
        panic!("board update exploded")
    }

    async fn delete_board(&self, _: &Board) -> Result<bool> {
        panic!("board delete exploded")
    }
}

#[tokio::test]
async fn panicking_handler_is_unknown_server_error() {
    let store = Arc::new(InMemoryBoardRepository::new());
    let sync = Arc::new(IndexSync::new(
        store,
        Arc::new(InMemorySearchIndex::new()),
        Arc::new(InMemorySyncOutbox::new()),
    ));
    let boards: Arc<dyn BoardServiceApi> = Arc::new(Exploding);
    let app = build_router(AppState {
        replies: Arc::new(ReplyService::new(boards.clone())),
        boards,
        sync,
    });

    let (status, body) = send(&app, "GET", "/boards", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "UNKNOWN_SERVER_ERROR");
    assert_eq!(body["status"], 500);
}

#[tokio::test]
async fn update_from_an_outdated_version_conflicts() {
    let (app, _) = app();
    send(&app, "POST", "/boards", Some(new_board("title1"))).await;

    let edit = |title: &str| {
        json!({ "category": "Category1", "title": title, "content": "content", "version": 0 })
    };
    let (status, updated) = send(&app, "PUT", "/boards/1", Some(edit("first"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["version"], 1);

    let (status, body) = send(&app, "PUT", "/boards/1", Some(edit("second"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");

    let (_, current) = send(&app, "GET", "/boards/1", None).await;
    assert_eq!(current["title"], "first");
}
