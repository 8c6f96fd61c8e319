//! Request bodies accepted by the API and their conversion into domain models.
//!
//! Identifiers and timestamps the caller leaves out are filled in here, so the
//! services always receive complete aggregates.

use chrono::NaiveDateTime;
use domains::utils::{current_datetime, generate_external_id};
use domains::{Board, Reply};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBoardRequest {
    /// Left empty, the service generates one.
    #[serde(default)]
    pub bno: Option<String>,
    pub category: String,
    pub title: String,
    pub content: String,
    pub user: String,
    #[serde(default)]
    pub hit_cnt: i64,
    pub reg_date: Option<NaiveDateTime>,
    #[serde(default)]
    pub replies: Vec<NewReplyRequest>,
}

impl NewBoardRequest {
    pub fn into_board(self) -> Board {
        let mut board = Board::new(
            self.bno.unwrap_or_default(),
            self.category,
            self.title,
            self.content,
            self.user,
            self.reg_date.unwrap_or_else(current_datetime),
        );
        board.hit_cnt = self.hit_cnt;
        board.replies = self
            .replies
            .into_iter()
            .map(|reply| reply.into_reply(&board.bno))
            .collect();
        board
    }
}

/// Full replacement of a board's mutable fields. `replies: None` keeps the
/// stored reply set.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBoardRequest {
    pub bno: Option<String>,
    pub category: String,
    pub title: String,
    pub content: String,
    pub hit_cnt: Option<i64>,
    pub replies: Option<Vec<NewReplyRequest>>,
    /// The version the client last read. Left out, the update applies to
    /// whatever the handler just loaded.
    pub version: Option<i64>,
}

impl UpdateBoardRequest {
    /// Overlays the request on the stored board. A differing `bno` is passed
    /// through so the service can reject it.
    pub fn apply_to(self, mut board: Board) -> Board {
        if let Some(bno) = self.bno {
            board.bno = bno;
        }
        board.category = self.category;
        board.title = self.title;
        board.content = self.content;
        if let Some(hit_cnt) = self.hit_cnt {
            board.hit_cnt = hit_cnt;
        }
        if let Some(version) = self.version {
            board.version = version;
        }
        if let Some(replies) = self.replies {
            let bno = board.bno.clone();
            board.replies = replies.into_iter().map(|r| r.into_reply(&bno)).collect();
        }
        board
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReplyRequest {
    #[serde(default)]
    pub rno: Option<String>,
    pub content: String,
    pub user: String,
    pub reg_date: Option<NaiveDateTime>,
    #[serde(default = "visible_by_default")]
    pub visible: bool,
}

fn visible_by_default() -> bool {
    true
}

impl NewReplyRequest {
    pub fn into_reply(self, bno: &str) -> Reply {
        Reply::new(
            bno,
            self.rno
                .filter(|rno| !rno.is_empty())
                .unwrap_or_else(generate_external_id),
            self.content,
            self.user,
            self.reg_date.unwrap_or_else(current_datetime),
            self.visible,
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReplyRequest {
    pub content: String,
    pub visible: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub pending_sync_tasks: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_board_fills_defaults() {
        let request: NewBoardRequest = serde_json::from_value(serde_json::json!({
            "category": "Category1",
            "title": "title1",
            "content": "content",
            "user": "user1",
            "replies": [{ "content": "hi", "user": "user111" }]
        }))
        .unwrap();

        let board = request.into_board();
        assert!(board.bno.is_empty());
        assert_eq!(board.hit_cnt, 0);
        assert_eq!(board.replies.len(), 1);
        assert_eq!(board.replies[0].rno.len(), 32);
        assert!(board.replies[0].visible);
    }

    #[test]
    fn update_keeps_replies_when_absent() {
        let mut stored = Board::new(
            generate_external_id(),
            "Category1",
            "title1",
            "content",
            "user1",
            current_datetime(),
        );
        stored.board_id = Some(7);
        let reply = Reply::new(
            stored.bno.clone(),
            generate_external_id(),
            "first",
            "user111",
            current_datetime(),
            true,
        );
        stored.attach_reply(reply.clone());

        let request: UpdateBoardRequest = serde_json::from_value(serde_json::json!({
            "category": "Category2",
            "title": "updated!!!",
            "content": "content"
        }))
        .unwrap();
        let updated = request.apply_to(stored.clone());

        assert_eq!(updated.board_id, Some(7));
        assert_eq!(updated.bno, stored.bno);
        assert_eq!(updated.title, "updated!!!");
        assert_eq!(updated.replies, vec![reply]);
        assert_eq!(updated.version, stored.version);
    }
}
