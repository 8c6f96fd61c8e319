use std::collections::HashMap;

use async_trait::async_trait;
use domains::{Board, BoardRepository, DomainError, PageableRequest, Reply, Result};
use sqlx::sqlite::{SqliteConnection, SqlitePool, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite};

use super::map_sqlx;

const BOARD_COLUMNS: &str = "SELECT id, bno, category, title, content, hit_cnt, user_name, \
     reg_date, mod_date, version FROM boards";

pub struct SqliteBoardRepository {
    pool: SqlitePool,
}

impl SqliteBoardRepository {
    /// Connects and applies the schema. See [`super::connect`].
    pub async fn new(url: &str, max_connections: u32) -> Result<Self> {
        Ok(Self {
            pool: super::connect(url, max_connections).await?,
        })
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Loads replies for every board in one query and attaches them in
    /// stored order.
    async fn with_replies(&self, mut boards: Vec<Board>) -> sqlx::Result<Vec<Board>> {
        if boards.is_empty() {
            return Ok(boards);
        }

        let mut query = QueryBuilder::<Sqlite>::new(
            "SELECT bno, rno, content, user_name, reg_date, visible FROM replies WHERE bno IN (",
        );
        {
            let mut list = query.separated(", ");
            for board in &boards {
                list.push_bind(board.bno.clone());
            }
            list.push_unseparated(") ORDER BY bno, position");
        }

        let mut by_board: HashMap<String, Vec<Reply>> = HashMap::new();
        for row in query.build().fetch_all(&self.pool).await? {
            let reply = reply_from_row(&row)?;
            by_board.entry(reply.bno.clone()).or_default().push(reply);
        }
        for board in &mut boards {
            board.replies = by_board.remove(&board.bno).unwrap_or_default();
        }
        Ok(boards)
    }

    async fn find_one(&self, column: &str, value: FindValue<'_>) -> sqlx::Result<Option<Board>> {
        let sql = format!("{BOARD_COLUMNS} WHERE {column} = ?");
        let query = sqlx::query(&sql);
        let query = match value {
            FindValue::Id(id) => query.bind(id),
            FindValue::Bno(bno) => query.bind(bno),
        };
        let Some(row) = query.fetch_optional(&self.pool).await? else {
            return Ok(None);
        };
        let board = board_from_row(&row)?;
        Ok(self.with_replies(vec![board]).await?.pop())
    }
}

enum FindValue<'a> {
    Id(i64),
    Bno(&'a str),
}

fn board_from_row(row: &SqliteRow) -> sqlx::Result<Board> {
    Ok(Board {
        board_id: Some(row.try_get("id")?),
        bno: row.try_get("bno")?,
        category: row.try_get("category")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        hit_cnt: row.try_get("hit_cnt")?,
        user: row.try_get("user_name")?,
        reg_date: row.try_get("reg_date")?,
        mod_date: row.try_get("mod_date")?,
        version: row.try_get("version")?,
        replies: Vec::new(),
    })
}

fn reply_from_row(row: &SqliteRow) -> sqlx::Result<Reply> {
    Ok(Reply {
        bno: row.try_get("bno")?,
        rno: row.try_get("rno")?,
        content: row.try_get("content")?,
        user: row.try_get("user_name")?,
        reg_date: row.try_get("reg_date")?,
        visible: row.try_get("visible")?,
    })
}

async fn insert_row(conn: &mut SqliteConnection, board: &Board) -> sqlx::Result<i64> {
    let result = sqlx::query(
        "INSERT INTO boards
             (bno, category, title, content, hit_cnt, user_name, reg_date, mod_date, version)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(board.bno.as_str())
    .bind(board.category.as_str())
    .bind(board.title.as_str())
    .bind(board.content.as_str())
    .bind(board.hit_cnt)
    .bind(board.user.as_str())
    .bind(board.reg_date)
    .bind(board.mod_date)
    .bind(board.version)
    .execute(&mut *conn)
    .await?;

    let board_id = result.last_insert_rowid();
    replace_replies(conn, &board.bno, &board.replies).await?;
    Ok(board_id)
}

/// The reply set is owned by the board, so it is rewritten wholesale.
async fn replace_replies(
    conn: &mut SqliteConnection,
    bno: &str,
    replies: &[Reply],
) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM replies WHERE bno = ?")
        .bind(bno)
        .execute(&mut *conn)
        .await?;

    for (position, reply) in replies.iter().enumerate() {
        sqlx::query(
            "INSERT INTO replies (rno, bno, position, content, user_name, reg_date, visible)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(reply.rno.as_str())
        .bind(bno)
        .bind(position as i64)
        .bind(reply.content.as_str())
        .bind(reply.user.as_str())
        .bind(reply.reg_date)
        .bind(reply.visible)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

#[async_trait]
impl BoardRepository for SqliteBoardRepository {
    async fn find_by_id(&self, board_id: i64) -> Result<Option<Board>> {
        self.find_one("id", FindValue::Id(board_id))
            .await
            .map_err(map_sqlx)
    }

    async fn find_by_bno(&self, bno: &str) -> Result<Option<Board>> {
        self.find_one("bno", FindValue::Bno(bno))
            .await
            .map_err(map_sqlx)
    }

    async fn insert(&self, board: &Board) -> Result<Board> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;
        let board_id = insert_row(&mut tx, board).await.map_err(map_sqlx)?;
        tx.commit().await.map_err(map_sqlx)?;

        let mut saved = board.clone();
        saved.board_id = Some(board_id);
        Ok(saved)
    }

    /// Atomic bulk insert: one failing row rolls back the whole batch.
    async fn insert_all(&self, boards: &[Board]) -> Result<Vec<Board>> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;
        let mut saved = Vec::with_capacity(boards.len());
        for board in boards {
            let board_id = insert_row(&mut tx, board).await.map_err(map_sqlx)?;
            let mut row = board.clone();
            row.board_id = Some(board_id);
            saved.push(row);
        }
        tx.commit().await.map_err(map_sqlx)?;
        Ok(saved)
    }

    async fn update(&self, board: &Board) -> Result<bool> {
        let Some(board_id) = board.board_id else {
            return Ok(false);
        };

        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;
        let result = sqlx::query(
            "UPDATE boards
             SET category = ?, title = ?, content = ?, hit_cnt = ?, mod_date = ?,
                 version = version + 1
             WHERE id = ? AND bno = ? AND version = ?",
        )
        .bind(board.category.as_str())
        .bind(board.title.as_str())
        .bind(board.content.as_str())
        .bind(board.hit_cnt)
        .bind(board.mod_date)
        .bind(board_id)
        .bind(board.bno.as_str())
        .bind(board.version)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx)?;

        if result.rows_affected() == 0 {
            let current: Option<i64> =
                sqlx::query_scalar("SELECT version FROM boards WHERE id = ? AND bno = ?")
                    .bind(board_id)
                    .bind(board.bno.as_str())
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(map_sqlx)?;
            tx.rollback().await.map_err(map_sqlx)?;
            return match current {
                Some(_) => Err(DomainError::stale("Board", board_id)),
                None => Ok(false),
            };
        }

        replace_replies(&mut tx, &board.bno, &board.replies)
            .await
            .map_err(map_sqlx)?;
        tx.commit().await.map_err(map_sqlx)?;
        Ok(true)
    }

    async fn delete_by_id(&self, board_id: i64) -> Result<bool> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;
        sqlx::query("DELETE FROM replies WHERE bno = (SELECT bno FROM boards WHERE id = ?)")
            .bind(board_id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;
        let result = sqlx::query("DELETE FROM boards WHERE id = ?")
            .bind(board_id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;
        tx.commit().await.map_err(map_sqlx)?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_page(&self, request: &PageableRequest) -> Result<Vec<Board>> {
        let mut query = QueryBuilder::<Sqlite>::new(BOARD_COLUMNS);
        query.push(" WHERE 1 = 1");
        if let Some(start) = request.start_datetime {
            query.push(" AND reg_date >= ").push_bind(start);
        }
        if let Some(end) = request.end_datetime {
            query.push(" AND reg_date < ").push_bind(end);
        }
        query
            .push(" ORDER BY reg_date DESC, id DESC LIMIT ")
            .push_bind(i64::from(request.limit()))
            .push(" OFFSET ")
            .push_bind(i64::from(request.from_index));

        let rows = query
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?;
        let boards = rows
            .iter()
            .map(board_from_row)
            .collect::<sqlx::Result<Vec<_>>>()
            .map_err(map_sqlx)?;
        self.with_replies(boards).await.map_err(map_sqlx)
    }

    async fn count(&self) -> Result<u64> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM boards")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(total as u64)
    }
}
