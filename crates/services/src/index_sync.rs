//! Search index propagation and repair.
//!
//! Writes reach the index only after the primary store committed. A failed
//! index write never rolls the primary back; it leaves a [`SyncTask`] in the
//! outbox and [`IndexSync::reconcile`] later re-projects the board from the
//! primary store, which always wins.
//!
//! [`SyncTask`]: domains::SyncTask

use std::sync::Arc;

use domains::{
    document_id, Board, BoardDocument, BoardRepository, DomainError, Result, SearchIndex,
    SyncOutbox, SyncPolicy,
};
use serde::Serialize;
use tracing::{debug, error, info, warn};

const DEFAULT_BATCH_SIZE: usize = 100;
const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Outcome of one reconcile pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Tasks picked up in this pass
    pub processed: usize,
    pub repaired: usize,
    pub failed: usize,
    /// Failed tasks that just reached the attempt limit and will not be
    /// picked up again.
    pub abandoned: usize,
}

pub struct IndexSync {
    store: Arc<dyn BoardRepository>,
    index: Arc<dyn SearchIndex>,
    outbox: Arc<dyn SyncOutbox>,
    policy: SyncPolicy,
    batch_size: usize,
    max_attempts: u32,
}

impl IndexSync {
    pub fn new(
        store: Arc<dyn BoardRepository>,
        index: Arc<dyn SearchIndex>,
        outbox: Arc<dyn SyncOutbox>,
    ) -> Self {
        Self {
            store,
            index,
            outbox,
            policy: SyncPolicy::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_policy(mut self, policy: SyncPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Max tasks drained per [`reconcile`](Self::reconcile) call.
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    pub fn with_max_attempts(mut self, max: u32) -> Self {
        self.max_attempts = max.max(1);
        self
    }

    /// Upserts the projection of a freshly committed board.
    pub async fn project(&self, board: &Board) -> Result<()> {
        let document = BoardDocument::from(board);
        match self.index.save(&document).await {
            Ok(()) => {
                debug!(doc_id = %document.id, "search document saved");
                self.clear_stale_task(&board.bno).await;
                Ok(())
            }
            Err(err) => self.propagation_failed(&board.bno, err).await,
        }
    }

    /// Removes the projection of a board deleted from the primary store.
    pub async fn remove(&self, bno: &str) -> Result<()> {
        let doc_id = document_id(bno);
        match self.index.delete_by_id(&doc_id).await {
            Ok(existed) => {
                if !existed {
                    debug!(%doc_id, "search document was already absent");
                }
                self.clear_stale_task(bno).await;
                Ok(())
            }
            Err(err) => self.propagation_failed(bno, err).await,
        }
    }

    pub async fn pending(&self) -> Result<u64> {
        self.outbox.pending_count().await
    }

    /// Drains up to `batch_size` pending tasks, re-projecting each board from
    /// the primary store.
    pub async fn reconcile(&self) -> Result<ReconcileReport> {
        let tasks = self
            .outbox
            .pending(self.batch_size, self.max_attempts)
            .await?;
        let mut report = ReconcileReport::default();

        for task in tasks {
            report.processed += 1;
            match self.repair(&task.bno).await {
                Ok(()) => {
                    self.outbox.ack(&task.bno).await?;
                    report.repaired += 1;
                }
                Err(err) => {
                    let reason = err.to_string();
                    self.outbox.record_failure(&task.bno, &reason).await?;
                    report.failed += 1;
                    if task.attempts + 1 >= self.max_attempts {
                        report.abandoned += 1;
                        error!(
                            bno = %task.bno,
                            attempts = task.attempts + 1,
                            %reason,
                            "giving up on search index repair"
                        );
                    } else {
                        warn!(
                            bno = %task.bno,
                            attempts = task.attempts + 1,
                            %reason,
                            "search index repair failed"
                        );
                    }
                }
            }
        }

        if report.processed > 0 {
            info!(
                processed = report.processed,
                repaired = report.repaired,
                failed = report.failed,
                "reconcile pass finished"
            );
        }
        Ok(report)
    }

    async fn repair(&self, bno: &str) -> Result<()> {
        match self.store.find_by_bno(bno).await? {
            Some(board) => self.index.save(&BoardDocument::from(&board)).await,
            None => self.index.delete_by_id(&document_id(bno)).await.map(|_| ()),
        }
    }

    async fn propagation_failed(&self, bno: &str, err: DomainError) -> Result<()> {
        let reason = err.to_string();
        warn!(
            %bno,
            %reason,
            policy = ?self.policy,
            "search index write failed after primary commit"
        );

        if let Err(outbox_err) = self.outbox.enqueue(bno, &reason).await {
            error!(%bno, error = %outbox_err, "could not record search index repair task");
        }

        match self.policy {
            SyncPolicy::BestEffort => Ok(()),
            SyncPolicy::Strict => Err(DomainError::IndexSync {
                bno: bno.to_string(),
                reason,
            }),
        }
    }

    /// A successful write supersedes any repair queued for the same board.
    async fn clear_stale_task(&self, bno: &str) {
        if let Err(err) = self.outbox.ack(bno).await {
            warn!(%bno, error = %err, "could not clear repair task");
        }
    }
}
