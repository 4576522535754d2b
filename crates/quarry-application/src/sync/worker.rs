//! Sync worker pool
//!
//! Consumes the task queue and drives the orchestrator. Delivery is
//! at-least-once: a worker acks only after the orchestrator returned a
//! result; every error nacks, and the queue decides whether backoff or
//! parking applies.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::sync::SyncOrchestrator;
use quarry_domain::entities::{Task, TaskType};
use quarry_domain::error::{Error, Result};
use quarry_domain::ports::TaskQueue;

/// How long one dequeue waits before re-checking for shutdown
const DEQUEUE_WAIT: Duration = Duration::from_secs(1);

pub struct SyncWorker {
    queue: Arc<dyn TaskQueue>,
    orchestrator: Arc<SyncOrchestrator>,
    workers: usize,
}

impl SyncWorker {
    pub fn new(
        queue: Arc<dyn TaskQueue>,
        orchestrator: Arc<SyncOrchestrator>,
        workers: usize,
    ) -> Self {
        Self {
            queue,
            orchestrator,
            workers: workers.max(1),
        }
    }

    /// Spawn the worker loops; they stop when `cancel` fires
    pub fn spawn(self: &Arc<Self>, cancel: CancellationToken) -> Vec<tokio::task::JoinHandle<()>> {
        (0..self.workers)
            .map(|worker_id| {
                let worker = self.clone();
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    worker.run_loop(worker_id, cancel).await;
                })
            })
            .collect()
    }

    async fn run_loop(&self, worker_id: usize, cancel: CancellationToken) {
        info!(worker_id, "sync worker started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                dequeued = self.queue.dequeue_with_timeout(DEQUEUE_WAIT) => {
                    match dequeued {
                        Ok(Some(task)) => self.handle(task).await,
                        Ok(None) => {}
                        Err(e) => {
                            warn!(worker_id, error = %e, "dequeue failed");
                            tokio::time::sleep(DEQUEUE_WAIT).await;
                        }
                    }
                }
            }
        }
        info!(worker_id, "sync worker stopped");
    }

    /// Execute one task and settle it with the queue
    pub async fn handle(&self, task: Task) {
        let outcome = self.execute(&task).await;
        let settle = match outcome {
            Ok(()) => self.queue.ack(&task.id).await,
            Err(e) => {
                warn!(task_id = %task.id, error = %e, "task failed");
                self.queue.nack(&task.id, &e.to_string()).await
            }
        };
        if let Err(e) = settle {
            warn!(task_id = %task.id, error = %e, "task settlement failed");
        }
    }

    async fn execute(&self, task: &Task) -> Result<()> {
        match task.task_type {
            TaskType::SyncSource => {
                let source_id = task
                    .payload
                    .get("source_id")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| Error::invalid_input("sync_source task without source_id"))?;
                self.orchestrator.sync_source(source_id).await?;
                Ok(())
            }
            TaskType::SyncAll => {
                self.orchestrator.sync_all(&task.team_id).await?;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::Chunker;
    use chrono::Utc;
    use crate::normalise::NormaliserRegistry;
    use crate::runtime::{AiHandles, RuntimeCapabilities};
    use crate::services::testsupport::*;
    use quarry_domain::entities::TaskStatus;
    use quarry_domain::ports::ChangeBatch;

    fn worker() -> (Arc<SyncWorker>, Arc<MemQueue>, Arc<ScriptedFactory>, Arc<MemSources>) {
        let queue = Arc::new(MemQueue::default());
        let sources = Arc::new(MemSources::default());
        let factory = Arc::new(ScriptedFactory::default());
        let orchestrator = Arc::new(SyncOrchestrator::new(
            sources.clone(),
            Arc::new(MemSyncStates::default()),
            Arc::new(MemDocuments::default()),
            Arc::new(MemChunks::default()),
            Arc::new(RecordingEngine::default()),
            factory.clone(),
            Arc::new(MemLock::default()),
            Arc::new(MemSettings::default()),
            Arc::new(NormaliserRegistry::new()),
            Chunker::default(),
            Arc::new(RuntimeCapabilities::default()),
            Arc::new(AiHandles::new()),
        ));
        (
            Arc::new(SyncWorker::new(queue.clone(), orchestrator, 2)),
            queue,
            factory,
            sources,
        )
    }

    #[tokio::test]
    async fn successful_task_is_acked() {
        let (worker, queue, factory, sources) = worker();
        sources.0.insert("src1".into(), test_source("src1", vec![]));
        factory.connectors.insert(
            "src1".into(),
            Arc::new(ScriptedConnector::new(vec![Ok(ChangeBatch {
                changes: vec![added("doc-1", "body")],
                next_cursor: "c1".into(),
            })])),
        );

        let task = Task::new(
            TaskType::SyncSource,
            "team1",
            serde_json::json!({"source_id": "src1"}),
        );
        queue.enqueue(task.clone()).await.unwrap();
        let dequeued = queue.dequeue().await.unwrap();
        worker.handle(dequeued).await;

        assert_eq!(
            queue.get_task(&task.id).await.unwrap().status,
            TaskStatus::Completed
        );
    }

    #[tokio::test]
    async fn failing_task_is_nacked_for_retry() {
        let (worker, queue, factory, sources) = worker();
        sources.0.insert("src1".into(), test_source("src1", vec![]));
        factory.errors.insert("src1".into(), || {
            Error::retryable("provider unreachable")
        });

        let task = Task::new(
            TaskType::SyncSource,
            "team1",
            serde_json::json!({"source_id": "src1"}),
        );
        queue.enqueue(task.clone()).await.unwrap();
        let dequeued = queue.dequeue().await.unwrap();
        worker.handle(dequeued).await;

        // Back in pending with the attempt recorded and a backoff stamp.
        let requeued = queue.get_task(&task.id).await.unwrap();
        assert_eq!(requeued.status, TaskStatus::Pending);
        assert_eq!(requeued.attempts, 1);
        assert!(requeued.scheduled_for > Utc::now());
        assert!(requeued
            .error
            .as_deref()
            .unwrap()
            .contains("provider unreachable"));
    }

    #[tokio::test]
    async fn malformed_payload_is_nacked() {
        let (worker, queue, _, _) = worker();
        let task = Task::new(TaskType::SyncSource, "team1", serde_json::json!({}));
        queue.enqueue(task.clone()).await.unwrap();
        let dequeued = queue.dequeue().await.unwrap();
        worker.handle(dequeued).await;

        assert_eq!(
            queue.get_task(&task.id).await.unwrap().status,
            TaskStatus::Pending
        );
    }
}
