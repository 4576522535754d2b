//! Task and schedule entities
//!
//! Rows owned by the task queue and the scheduler. The queue is the
//! single source of truth for task status; consumers see at-least-once
//! delivery and must tolerate redelivery.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::{TASK_BACKOFF_CAP, TASK_MAX_ATTEMPTS};
use crate::ids::new_id;

/// Kind of work a task carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    SyncSource,
    SyncAll,
}

/// Queue-visible task lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// A durable unit of queued work
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub task_type: TaskType,
    pub team_id: String,
    pub payload: serde_json::Value,
    pub status: TaskStatus,
    /// Higher runs first among equally-ready tasks; clamped to [-100, 100]
    pub priority: i8,
    pub attempts: u32,
    pub max_attempts: u32,
    pub scheduled_for: DateTime<Utc>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Create a pending task scheduled for immediate delivery
    pub fn new(task_type: TaskType, team_id: impl Into<String>, payload: serde_json::Value) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            task_type,
            team_id: team_id.into(),
            payload,
            status: TaskStatus::Pending,
            priority: 0,
            attempts: 0,
            max_attempts: TASK_MAX_ATTEMPTS,
            scheduled_for: now,
            error: None,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
        }
    }

    /// Set the delivery priority, clamped to the allowed range
    pub fn with_priority(mut self, priority: i8) -> Self {
        self.priority = priority.clamp(-100, 100);
        self
    }

    /// Delay first delivery until the given instant
    pub fn with_scheduled_for(mut self, at: DateTime<Utc>) -> Self {
        self.scheduled_for = at;
        self
    }

    /// Whether the queue may hand this task to a worker now
    pub fn is_ready(&self, now: DateTime<Utc>) -> bool {
        self.status == TaskStatus::Pending && now >= self.scheduled_for
    }

    /// Whether a failed delivery may be re-driven
    pub fn can_retry(&self) -> bool {
        self.attempts < self.max_attempts
    }

    /// Backoff before redelivery after `attempts` failed deliveries
    ///
    /// `min(2^attempts seconds, 5 minutes)`.
    pub fn retry_backoff(attempts: u32) -> Duration {
        let exp = Duration::from_secs(2u64.saturating_pow(attempts.min(32)));
        exp.min(TASK_BACKOFF_CAP)
    }
}

/// A recurring producer entry evaluated by the scheduler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledTask {
    pub id: String,
    pub task_type: TaskType,
    pub interval: Duration,
    pub enabled: bool,
    pub last_run: Option<DateTime<Utc>>,
    pub next_run: DateTime<Utc>,
}

impl ScheduledTask {
    /// Whether the scheduler should fire this entry now
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.enabled && now >= self.next_run
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readiness_requires_pending_and_due() {
        let now = Utc::now();
        let mut task = Task::new(TaskType::SyncAll, "team1", serde_json::json!({}));
        assert!(task.is_ready(now));

        task.scheduled_for = now + chrono::Duration::seconds(30);
        assert!(!task.is_ready(now));

        task.scheduled_for = now;
        task.status = TaskStatus::Processing;
        assert!(!task.is_ready(now));
    }

    #[test]
    fn backoff_doubles_and_caps() {
        assert_eq!(Task::retry_backoff(0), Duration::from_secs(1));
        assert_eq!(Task::retry_backoff(1), Duration::from_secs(2));
        assert_eq!(Task::retry_backoff(3), Duration::from_secs(8));
        assert_eq!(Task::retry_backoff(20), Duration::from_secs(300));
    }

    #[test]
    fn priority_is_clamped() {
        let task = Task::new(TaskType::SyncAll, "team1", serde_json::json!({})).with_priority(127);
        assert_eq!(task.priority, 100);
    }

    #[test]
    fn schedule_due_only_when_enabled() {
        let now = Utc::now();
        let mut schedule = ScheduledTask {
            id: "document-sync".into(),
            task_type: TaskType::SyncAll,
            interval: Duration::from_secs(3600),
            enabled: true,
            last_run: None,
            next_run: now,
        };
        assert!(schedule.is_due(now));
        schedule.enabled = false;
        assert!(!schedule.is_due(now));
    }
}
