//! In-memory durable-semantics task queue
//!
//! Implements the full task queue contract for single-node deployments
//! and tests: readiness ordering by `(scheduled_for, -priority,
//! created_at)`, attempt counting on delivery, nack backoff, and lease
//! reclaim for workers that died mid-task. Only the storage is
//! in-memory; the visible semantics match a database-backed queue.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Notify;
use tracing::debug;

use quarry_domain::constants::TASK_RECLAIM_TIMEOUT;
use quarry_domain::entities::{Task, TaskStatus};
use quarry_domain::error::{Error, Result};
use quarry_domain::ports::{QueueStats, TaskFilter, TaskQueue};

/// How long one dequeue pass parks before re-scanning
const DEQUEUE_POLL: Duration = Duration::from_millis(250);

/// Mutex-and-notify backed task queue
#[derive(Default)]
pub struct InMemoryTaskQueue {
    tasks: Mutex<HashMap<String, Task>>,
    notify: Notify,
    closed: AtomicBool,
}

impl InMemoryTaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return leases whose worker never settled back to pending
    ///
    /// Attempts are preserved: the reclaimed delivery already counted.
    fn reclaim_expired(tasks: &mut HashMap<String, Task>, now: DateTime<Utc>) {
        let reclaim_cutoff =
            now - chrono::Duration::from_std(TASK_RECLAIM_TIMEOUT).unwrap_or_else(|_| chrono::Duration::zero());
        for task in tasks.values_mut() {
            if task.status == TaskStatus::Processing {
                let started = task.started_at.unwrap_or(task.updated_at);
                if started < reclaim_cutoff {
                    debug!(task_id = %task.id, "reclaiming expired task lease");
                    task.status = TaskStatus::Pending;
                    task.updated_at = now;
                }
            }
        }
    }

    /// Pop the best ready task, marking the delivery
    fn try_dequeue(&self) -> Option<Task> {
        let now = Utc::now();
        let mut tasks = self.tasks.lock().unwrap();
        Self::reclaim_expired(&mut tasks, now);

        let best_id = tasks
            .values()
            .filter(|t| t.is_ready(now))
            .min_by_key(|t| (t.scheduled_for, std::cmp::Reverse(t.priority), t.created_at))
            .map(|t| t.id.clone())?;

        let task = tasks.get_mut(&best_id)?;
        task.status = TaskStatus::Processing;
        task.attempts += 1;
        task.started_at = Some(now);
        task.updated_at = now;
        Some(task.clone())
    }
}

#[async_trait]
impl TaskQueue for InMemoryTaskQueue {
    async fn enqueue(&self, mut task: Task) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::service_unavailable("task queue"));
        }
        let mut tasks = self.tasks.lock().unwrap();
        // Idempotent on id: a redelivered enqueue is a no-op
        if tasks.contains_key(&task.id) {
            return Ok(());
        }
        task.status = TaskStatus::Pending;
        tasks.insert(task.id.clone(), task);
        drop(tasks);
        self.notify.notify_waiters();
        Ok(())
    }

    async fn enqueue_batch(&self, batch: Vec<Task>) -> Result<()> {
        for task in batch {
            self.enqueue(task).await?;
        }
        Ok(())
    }

    async fn dequeue(&self) -> Result<Task> {
        loop {
            if self.closed.load(Ordering::SeqCst) {
                return Err(Error::service_unavailable("task queue"));
            }
            if let Some(task) = self.try_dequeue() {
                return Ok(task);
            }
            // Wake on new work or re-scan when a scheduled_for comes due
            tokio::select! {
                _ = self.notify.notified() => {}
                _ = tokio::time::sleep(DEQUEUE_POLL) => {}
            }
        }
    }

    async fn dequeue_with_timeout(&self, timeout: Duration) -> Result<Option<Task>> {
        match tokio::time::timeout(timeout, self.dequeue()).await {
            Ok(result) => result.map(Some),
            Err(_) => Ok(None),
        }
    }

    async fn ack(&self, id: &str) -> Result<()> {
        let mut tasks = self.tasks.lock().unwrap();
        let task = tasks
            .get_mut(id)
            .ok_or_else(|| Error::not_found(format!("task {}", id)))?;
        let now = Utc::now();
        task.status = TaskStatus::Completed;
        task.completed_at = Some(now);
        task.updated_at = now;
        task.error = None;
        Ok(())
    }

    async fn nack(&self, id: &str, reason: &str) -> Result<()> {
        let mut tasks = self.tasks.lock().unwrap();
        let task = tasks
            .get_mut(id)
            .ok_or_else(|| Error::not_found(format!("task {}", id)))?;
        let now = Utc::now();
        task.error = Some(reason.to_string());
        task.updated_at = now;
        if task.can_retry() {
            let backoff = Task::retry_backoff(task.attempts);
            task.status = TaskStatus::Pending;
            task.scheduled_for =
                now + chrono::Duration::from_std(backoff).unwrap_or_else(|_| chrono::Duration::zero());
            debug!(task_id = %id, backoff_secs = backoff.as_secs(), "task scheduled for retry");
        } else {
            task.status = TaskStatus::Failed;
            task.completed_at = Some(now);
            debug!(task_id = %id, "task parked as failed");
        }
        drop(tasks);
        self.notify.notify_waiters();
        Ok(())
    }

    async fn cancel_task(&self, id: &str) -> Result<()> {
        let mut tasks = self.tasks.lock().unwrap();
        match tasks.get(id) {
            Some(task) if task.status == TaskStatus::Pending => {
                tasks.remove(id);
                Ok(())
            }
            Some(_) => Err(Error::invalid_input(format!(
                "task {} is not pending",
                id
            ))),
            None => Err(Error::not_found(format!("task {}", id))),
        }
    }

    async fn purge_tasks(&self, older_than: DateTime<Utc>) -> Result<u64> {
        let mut tasks = self.tasks.lock().unwrap();
        let before = tasks.len();
        tasks.retain(|_, task| {
            let terminal =
                matches!(task.status, TaskStatus::Completed | TaskStatus::Failed);
            !(terminal && task.updated_at < older_than)
        });
        Ok((before - tasks.len()) as u64)
    }

    async fn get_task(&self, id: &str) -> Result<Task> {
        self.tasks
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("task {}", id)))
    }

    async fn list_tasks(&self, filter: TaskFilter) -> Result<Vec<Task>> {
        let tasks = self.tasks.lock().unwrap();
        let mut matched: Vec<Task> = tasks
            .values()
            .filter(|t| filter.status.map_or(true, |s| t.status == s))
            .filter(|t| filter.task_type.map_or(true, |tt| t.task_type == tt))
            .filter(|t| {
                filter
                    .team_id
                    .as_deref()
                    .map_or(true, |team| t.team_id == team)
            })
            .cloned()
            .collect();
        matched.sort_by_key(|t| t.created_at);
        if let Some(limit) = filter.limit {
            matched.truncate(limit);
        }
        Ok(matched)
    }

    async fn stats(&self) -> Result<QueueStats> {
        let tasks = self.tasks.lock().unwrap();
        let mut stats = QueueStats::default();
        for task in tasks.values() {
            match task.status {
                TaskStatus::Pending => stats.pending += 1,
                TaskStatus::Processing => stats.processing += 1,
                TaskStatus::Completed => stats.completed += 1,
                TaskStatus::Failed => stats.failed += 1,
            }
        }
        Ok(stats)
    }

    async fn ping(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::service_unavailable("task queue"));
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
        Ok(())
    }
}
