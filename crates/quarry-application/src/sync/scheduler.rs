//! Periodic task scheduler
//!
//! Evaluates the schedule table on a short tick and enqueues due work.
//! Exactly one scheduler instance produces at a time: ticks run only
//! while holding the leader lock, which is extended on every pass.

use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use quarry_domain::constants::{DEFAULT_SYNC_INTERVAL, SCHEDULER_LEADER_TTL, SCHEDULER_TICK};
use quarry_domain::entities::{ScheduledTask, Task, TaskType};
use quarry_domain::error::Result;
use quarry_domain::ports::{DistributedLock, LockLease, ScheduleStore, TaskQueue};

/// Name of the leader election lock
const LEADER_LOCK: &str = "scheduler-leader";

/// Id of the seeded default schedule
const DEFAULT_SCHEDULE_ID: &str = "document-sync";

pub struct Scheduler {
    schedules: Arc<dyn ScheduleStore>,
    queue: Arc<dyn TaskQueue>,
    lock: Arc<dyn DistributedLock>,
    team_id: String,
    lease: tokio::sync::Mutex<Option<LockLease>>,
}

impl Scheduler {
    pub fn new(
        schedules: Arc<dyn ScheduleStore>,
        queue: Arc<dyn TaskQueue>,
        lock: Arc<dyn DistributedLock>,
        team_id: impl Into<String>,
    ) -> Self {
        Self {
            schedules,
            queue,
            lock,
            team_id: team_id.into(),
            lease: tokio::sync::Mutex::new(None),
        }
    }

    /// Run the tick loop until cancelled
    pub async fn run(&self, cancel: CancellationToken) {
        if let Err(e) = self.ensure_default_schedule().await {
            warn!(error = %e, "could not seed default schedule");
        }
        let mut ticker = tokio::time::interval(SCHEDULER_TICK);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.tick().await {
                        warn!(error = %e, "scheduler tick failed");
                    }
                }
            }
        }
        self.surrender_leadership().await;
        info!("scheduler stopped");
    }

    /// One evaluation pass; enqueues nothing unless this instance leads
    pub async fn tick(&self) -> Result<()> {
        if !self.hold_leadership().await? {
            return Ok(());
        }
        let now = Utc::now();
        for schedule in self.schedules.list().await? {
            if !schedule.is_due(now) {
                continue;
            }
            let task = match schedule.task_type {
                TaskType::SyncAll => Task::new(
                    TaskType::SyncAll,
                    &self.team_id,
                    serde_json::json!({}),
                ),
                TaskType::SyncSource => Task::new(
                    TaskType::SyncSource,
                    &self.team_id,
                    serde_json::json!({ "schedule_id": schedule.id }),
                ),
            };
            self.queue.enqueue(task).await?;
            let interval = chrono::Duration::from_std(schedule.interval)
                .unwrap_or_else(|_| chrono::Duration::hours(1));
            self.schedules
                .update_next_run(&schedule.id, now, now + interval)
                .await?;
            debug!(schedule_id = %schedule.id, "scheduled task enqueued");
        }
        Ok(())
    }

    /// Acquire or extend the leader lock
    async fn hold_leadership(&self) -> Result<bool> {
        let mut lease = self.lease.lock().await;
        if let Some(current) = lease.as_ref() {
            match self.lock.extend(current, SCHEDULER_LEADER_TTL).await {
                Ok(()) => return Ok(true),
                Err(e) => {
                    debug!(error = %e, "leader lease lost");
                    *lease = None;
                }
            }
        }
        match self.lock.acquire(LEADER_LOCK, SCHEDULER_LEADER_TTL).await? {
            Some(acquired) => {
                info!("scheduler leadership acquired");
                *lease = Some(acquired);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn surrender_leadership(&self) {
        let mut lease = self.lease.lock().await;
        if let Some(current) = lease.take() {
            let _ = self.lock.release(&current).await;
        }
    }

    /// Seed the hourly full-sync schedule when missing
    async fn ensure_default_schedule(&self) -> Result<()> {
        let existing = self.schedules.list().await?;
        if existing.iter().any(|s| s.id == DEFAULT_SCHEDULE_ID) {
            return Ok(());
        }
        self.schedules
            .save(&ScheduledTask {
                id: DEFAULT_SCHEDULE_ID.to_string(),
                task_type: TaskType::SyncAll,
                interval: DEFAULT_SYNC_INTERVAL,
                enabled: true,
                last_run: None,
                next_run: Utc::now(),
            })
            .await
    }
}
