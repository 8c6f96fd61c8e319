use async_trait::async_trait;
use domains::{Result, SyncOutbox, SyncTask};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;

use super::map_sqlx;

/// Durable outbox sharing the primary store's database, so pending repairs
/// survive a restart.
pub struct SqliteSyncOutbox {
    pool: SqlitePool,
}

impl SqliteSyncOutbox {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn task_from_row(row: &SqliteRow) -> sqlx::Result<SyncTask> {
    let attempts: i64 = row.try_get("attempts")?;
    Ok(SyncTask {
        bno: row.try_get("bno")?,
        enqueued_at: row.try_get("enqueued_at")?,
        attempts: attempts.max(0) as u32,
        last_error: row.try_get("last_error")?,
    })
}

#[async_trait]
impl SyncOutbox for SqliteSyncOutbox {
    async fn enqueue(&self, bno: &str, reason: &str) -> Result<()> {
        let task = SyncTask::new(bno, reason);
        sqlx::query(
            "INSERT INTO index_sync_outbox (bno, enqueued_at, attempts, last_error)
             VALUES (?, ?, 0, ?)
             ON CONFLICT(bno) DO UPDATE SET last_error = excluded.last_error",
        )
        .bind(task.bno.as_str())
        .bind(task.enqueued_at)
        .bind(task.last_error.as_deref())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn pending(&self, limit: usize, max_attempts: u32) -> Result<Vec<SyncTask>> {
        let rows = sqlx::query(
            "SELECT bno, enqueued_at, attempts, last_error FROM index_sync_outbox
             WHERE attempts < ?
             ORDER BY enqueued_at, bno
             LIMIT ?",
        )
        .bind(i64::from(max_attempts))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;

        rows.iter()
            .map(task_from_row)
            .collect::<sqlx::Result<Vec<_>>>()
            .map_err(map_sqlx)
    }

    async fn record_failure(&self, bno: &str, reason: &str) -> Result<()> {
        sqlx::query(
            "UPDATE index_sync_outbox SET attempts = attempts + 1, last_error = ? WHERE bno = ?",
        )
        .bind(reason)
        .bind(bno)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn ack(&self, bno: &str) -> Result<()> {
        sqlx::query("DELETE FROM index_sync_outbox WHERE bno = ?")
            .bind(bno)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(())
    }

    async fn pending_count(&self) -> Result<u64> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM index_sync_outbox")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(total as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn outbox() -> SqliteSyncOutbox {
        let pool = crate::sqlite::connect("sqlite::memory:", 1).await.unwrap();
        SqliteSyncOutbox::new(pool)
    }

    #[tokio::test]
    async fn test_enqueue_is_one_row_per_board() {
        let outbox = outbox().await;
        outbox.enqueue("a", "timeout").await.unwrap();
        outbox.enqueue("a", "refused").await.unwrap();
        outbox.enqueue("b", "timeout").await.unwrap();

        assert_eq!(outbox.pending_count().await.unwrap(), 2);
        let pending = outbox.pending(10, 5).await.unwrap();
        let a = pending.iter().find(|t| t.bno == "a").unwrap();
        assert_eq!(a.last_error.as_deref(), Some("refused"));
        assert_eq!(a.attempts, 0);
    }

    #[tokio::test]
    async fn test_exhausted_tasks_are_skipped_but_kept() {
        let outbox = outbox().await;
        outbox.enqueue("a", "timeout").await.unwrap();
        for _ in 0..3 {
            outbox.record_failure("a", "still down").await.unwrap();
        }

        assert!(outbox.pending(10, 3).await.unwrap().is_empty());
        assert_eq!(outbox.pending(10, 4).await.unwrap()[0].attempts, 3);
        assert_eq!(outbox.pending_count().await.unwrap(), 1);

        outbox.ack("a").await.unwrap();
        assert_eq!(outbox.pending_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_pending_respects_limit() {
        let outbox = outbox().await;
        for bno in ["a", "b", "c"] {
            outbox.enqueue(bno, "down").await.unwrap();
        }
        assert_eq!(outbox.pending(2, 5).await.unwrap().len(), 2);
    }
}
