//! Task queue port
//!
//! Durable priority queue with at-least-once delivery. Ready tasks are
//! ordered by `(scheduled_for, -priority, created_at)` so equal-priority
//! work never starves. A dequeued task holds an implicit lease; without
//! an ack or nack inside the reclaim timeout it returns to pending with
//! its attempt count preserved.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::entities::{Task, TaskStatus, TaskType};
use crate::error::Result;

/// Listing filter for admin views
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub task_type: Option<TaskType>,
    pub team_id: Option<String>,
    pub limit: Option<usize>,
}

/// Queue depth counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub pending: u64,
    pub processing: u64,
    pub completed: u64,
    pub failed: u64,
}

/// Durable task queue
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Persist a pending task; idempotent on `task.id`
    async fn enqueue(&self, task: Task) -> Result<()>;

    /// Persist a batch of pending tasks
    async fn enqueue_batch(&self, tasks: Vec<Task>) -> Result<()>;

    /// Wait for a ready task, marking it processing and counting the
    /// delivery attempt
    async fn dequeue(&self) -> Result<Task>;

    /// Like [`TaskQueue::dequeue`] but gives up after `timeout`,
    /// returning `Ok(None)`
    async fn dequeue_with_timeout(&self, timeout: Duration) -> Result<Option<Task>>;

    /// Mark a delivery successful
    async fn ack(&self, id: &str) -> Result<()>;

    /// Mark a delivery failed; re-schedules with backoff while attempts
    /// remain, otherwise parks the task as failed
    async fn nack(&self, id: &str, reason: &str) -> Result<()>;

    /// Drop a pending task
    async fn cancel_task(&self, id: &str) -> Result<()>;

    /// Delete terminal tasks older than the given instant
    async fn purge_tasks(&self, older_than: DateTime<Utc>) -> Result<u64>;

    async fn get_task(&self, id: &str) -> Result<Task>;

    async fn list_tasks(&self, filter: TaskFilter) -> Result<Vec<Task>>;

    async fn stats(&self) -> Result<QueueStats>;

    async fn ping(&self) -> Result<()>;

    /// Stop delivering; subsequent dequeues fail
    async fn close(&self) -> Result<()>;
}
