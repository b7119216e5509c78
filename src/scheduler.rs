//! Adapter between the pipeline and whatever host triggers it.
//!
//! The host only has to invoke the binary once per day. Retry behavior is
//! described by a single immutable [`ScheduleConfig`] which is applied the same
//! way to every step of a run.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub owner: String,
    /// Runs for processing dates before this are skipped
    pub start_date: Option<NaiveDate>,
    /// Extra attempts per step after the first failure
    pub retries: usize,
    pub retry_delay_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        ScheduleConfig {
            owner: "kurs-emas".to_string(),
            start_date: None,
            retries: 1,
            retry_delay_secs: 300,
        }
    }
}

impl ScheduleConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        self.start_date.is_none_or(|start| date >= start)
    }
}

/// Runs named tasks with the configured retry policy.
#[derive(Debug, Clone)]
pub struct TaskRunner {
    retries: usize,
    delay: Duration,
}

impl From<&ScheduleConfig> for TaskRunner {
    fn from(config: &ScheduleConfig) -> Self {
        TaskRunner {
            retries: config.retries,
            delay: config.retry_delay(),
        }
    }
}

impl TaskRunner {
    pub fn new(retries: usize, delay: Duration) -> Self {
        TaskRunner { retries, delay }
    }

    /// Runs `operation` until it succeeds or `1 + retries` attempts have failed.
    ///
    /// The task does not know why it failed, so every error is retried.
    pub async fn run<F, Fut, T, E>(&self, task: &str, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt = 1;
        loop {
            debug!(task, attempt, "Starting task");
            match operation().await {
                Ok(val) => {
                    info!(task, attempt, "Task succeeded");
                    return Ok(val);
                }
                Err(err) => {
                    if attempt > self.retries {
                        warn!(task, attempt, "Task failed, no retries left: {}", err);
                        return Err(err);
                    }
                    warn!(
                        task,
                        "Attempt {}/{} failed: {}. Retrying in {:?}...",
                        attempt,
                        self.retries + 1,
                        err,
                        self.delay
                    );
                    attempt += 1;
                    tokio::time::sleep(self.delay).await;
                }
            }
        }
    }
}
