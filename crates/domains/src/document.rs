//! Search index projection of a board.
//!
//! The document id is derived from `bno` alone, so a board maps to the same
//! document for its whole life and repeated upserts converge.

use serde::{Deserialize, Serialize};

use crate::models::{Board, Reply};
use crate::utils::format_datetime;

pub const DOCUMENT_ID_PREFIX: &str = "board";

/// Derives the search document id for a board's external id.
pub fn document_id(bno: &str) -> String {
    format!("{DOCUMENT_ID_PREFIX}{bno}")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardDocument {
    /// `"board" + bno`
    pub id: String,
    pub board_id: Option<i64>,
    pub bno: String,
    pub category: String,
    pub title: String,
    pub content: String,
    pub hit_cnt: i64,
    pub user: String,
    pub reg_date: String,
    pub mod_date: Option<String>,
    #[serde(default)]
    pub replies: Vec<ReplyDocument>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyDocument {
    pub rno: String,
    pub content: String,
    pub user: String,
    pub reg_date: String,
    pub visible: bool,
}

impl From<&Board> for BoardDocument {
    fn from(board: &Board) -> Self {
        Self {
            id: document_id(&board.bno),
            board_id: board.board_id,
            bno: board.bno.clone(),
            category: board.category.clone(),
            title: board.title.clone(),
            content: board.content.clone(),
            hit_cnt: board.hit_cnt,
            user: board.user.clone(),
            reg_date: format_datetime(&board.reg_date),
            mod_date: board.mod_date.as_ref().map(format_datetime),
            replies: board.replies.iter().map(ReplyDocument::from).collect(),
        }
    }
}

impl From<&Reply> for ReplyDocument {
    fn from(reply: &Reply) -> Self {
        Self {
            rno: reply.rno.clone(),
            content: reply.content.clone(),
            user: reply.user.clone(),
            reg_date: format_datetime(&reply.reg_date),
            visible: reply.visible,
        }
    }
}
