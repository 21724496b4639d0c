//! Daily pruning of old config backups.
//!
//! The job fires at 01:10:`s` local time, where `s` is drawn once per
//! process from `1..=59` so that many installations do not all hit their
//! disks in the same second.

use std::sync::Arc;

use chrono::{DateTime, Local, NaiveTime, TimeZone};
use rand::Rng;
use tracing::{debug, warn};

use crate::backup::BackupStore;

/// Local hour the retention job runs at.
pub const RUN_HOUR: u32 = 1;
/// Local minute the retention job runs at.
pub const RUN_MINUTE: u32 = 10;

/// Schedules [`BackupStore::prune_older_than`] once a day.
#[derive(Debug, Clone)]
pub struct RetentionScheduler {
    backups: Arc<BackupStore>,
    retention_days: u32,
    second: u32,
}

impl RetentionScheduler {
    /// Create a scheduler with a random second offset.
    #[must_use]
    pub fn new(backups: Arc<BackupStore>, retention_days: u32) -> Self {
        let second = rand::thread_rng().gen_range(1..=59);
        Self {
            backups,
            retention_days,
            second,
        }
    }

    /// Use a fixed second offset instead of a random one. Values outside
    /// `1..=59` are clamped.
    #[must_use]
    pub fn with_second(mut self, second: u32) -> Self {
        self.second = second.clamp(1, 59);
        self
    }

    /// Second of the minute the job fires at.
    #[must_use]
    pub fn second(&self) -> u32 {
        self.second
    }

    /// Next firing strictly after `now`.
    #[must_use]
    pub fn next_run_after<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        next_run_after(now, self.second)
    }

    /// Start the job on the current Tokio runtime. The job stops when the
    /// returned handle is dropped.
    #[must_use]
    pub fn spawn(self) -> RetentionTask {
        let handle = tokio::spawn(async move {
            loop {
                let now = Local::now();
                let Some(next) = self.next_run_after(&now) else {
                    warn!("Could not schedule config backup cleanup; giving up");
                    return;
                };
                let wait = next.signed_duration_since(&now).to_std().unwrap_or_default();
                debug!(next_run = %next, "Scheduled config backup cleanup");

                tokio::time::sleep(wait).await;
                self.run_now().await;
            }
        });
        RetentionTask(handle)
    }

    /// Run one pruning pass immediately. Returns how many backups were
    /// removed.
    pub async fn run_now(&self) -> usize {
        self.backups.prune_older_than(self.retention_days).await
    }
}

/// The next `01:10:second` wall-clock time strictly after `now`.
///
/// Days on which that local time does not exist are skipped; when it exists
/// twice, the earlier instant is used.
pub fn next_run_after<Tz: TimeZone>(now: &DateTime<Tz>, second: u32) -> Option<DateTime<Tz>> {
    let at = NaiveTime::from_hms_opt(RUN_HOUR, RUN_MINUTE, second)?;
    let tz = now.timezone();
    let mut date = now.date_naive();

    for _ in 0..3 {
        if let Some(candidate) = tz.from_local_datetime(&date.and_time(at)).earliest()
            && candidate > *now
        {
            return Some(candidate);
        }
        date = date.succ_opt()?;
    }
    None
}

/// Handle to the running retention job. Aborts the job on drop.
#[derive(Debug)]
pub struct RetentionTask(tokio::task::JoinHandle<()>);

impl RetentionTask {
    /// Stop the job now.
    pub fn abort(&self) {
        self.0.abort();
    }

    /// Whether the job has stopped.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.0.is_finished()
    }
}

impl Drop for RetentionTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}
