//! Job definition, per-job options, and hash (de)serialization.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::QueueError;

/// Job lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Queued, waiting to be leased.
    Waiting,
    /// Leased by a worker and being processed.
    Active,
    /// Finished successfully.
    Completed,
    /// Exhausted its attempts.
    Failed,
    /// Scheduled for a later attempt (retry backoff).
    Delayed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Waiting => "waiting",
            JobState::Active => "active",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
            JobState::Delayed => "delayed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "waiting" => Some(JobState::Waiting),
            "active" => Some(JobState::Active),
            "completed" => Some(JobState::Completed),
            "failed" => Some(JobState::Failed),
            "delayed" => Some(JobState::Delayed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

/// Payload of one report request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobData {
    pub use_case: String,
    pub recipient: String,
    #[serde(default)]
    pub filters: HashMap<String, String>,
}

/// Retention rule for terminal jobs: remove when older than `age` *or*
/// ranked beyond `count` (disjunction).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionRule {
    pub age: Option<Duration>,
    pub count: Option<u64>,
}

/// Per-job options, overridable at enqueue time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOptions {
    pub max_attempts: u32,
    /// Base of the exponential retry backoff.
    pub backoff_base: Duration,
    /// Ceiling of the retry backoff.
    pub backoff_cap: Duration,
    pub remove_on_complete: RetentionRule,
    pub remove_on_fail: RetentionRule,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_secs(1),
            backoff_cap: Duration::from_secs(30),
            remove_on_complete: RetentionRule {
                age: Some(Duration::from_secs(24 * 3600)),
                count: Some(1000),
            },
            remove_on_fail: RetentionRule {
                age: Some(Duration::from_secs(7 * 24 * 3600)),
                count: None,
            },
        }
    }
}

impl JobOptions {
    /// Backoff before the next attempt after the n-th failure (1-indexed):
    /// `base * 2^(n-1)`, capped.
    pub fn backoff_delay(&self, failures: u32) -> Duration {
        if failures == 0 {
            return Duration::ZERO;
        }
        let factor = 1u32.checked_shl(failures - 1).unwrap_or(u32::MAX);
        self.backoff_base
            .saturating_mul(factor)
            .min(self.backoff_cap)
    }
}

/// A durable job, mirrored from its Redis hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub data: JobData,
    pub state: JobState,
    /// Attempts started so far (incremented when a worker leases the job).
    pub attempts_made: u32,
    pub max_attempts: u32,
    pub created_at: DateTime<Utc>,
    pub processed_on: Option<DateTime<Utc>>,
    pub finished_on: Option<DateTime<Utc>>,
    pub result: Option<serde_json::Value>,
    pub failed_reason: Option<String>,
}

impl Job {
    pub fn new(id: impl Into<String>, data: JobData, max_attempts: u32) -> Self {
        Self {
            id: id.into(),
            data,
            state: JobState::Waiting,
            attempts_made: 0,
            max_attempts,
            created_at: Utc::now(),
            processed_on: None,
            finished_on: None,
            result: None,
            failed_reason: None,
        }
    }

    /// Hash fields written at enqueue time.
    pub fn to_fields(&self) -> Result<Vec<(String, String)>, QueueError> {
        let data = serde_json::to_string(&self.data)
            .map_err(|err| QueueError::Serialization(err.to_string()))?;
        Ok(vec![
            ("data".to_string(), data),
            ("state".to_string(), self.state.as_str().to_string()),
            ("attempts_made".to_string(), self.attempts_made.to_string()),
            ("max_attempts".to_string(), self.max_attempts.to_string()),
            (
                "created_at".to_string(),
                self.created_at.timestamp_millis().to_string(),
            ),
        ])
    }

    /// Rebuild a job from its Redis hash.
    pub fn from_fields(id: &str, fields: &HashMap<String, String>) -> Result<Self, QueueError> {
        let data: JobData = fields
            .get("data")
            .ok_or_else(|| QueueError::Serialization(format!("job {id} has no data field")))
            .and_then(|raw| {
                serde_json::from_str(raw)
                    .map_err(|err| QueueError::Serialization(err.to_string()))
            })?;

        let state = fields
            .get("state")
            .and_then(|s| JobState::parse(s))
            .unwrap_or(JobState::Waiting);

        let result = fields
            .get("result")
            .and_then(|raw| serde_json::from_str(raw).ok());

        Ok(Self {
            id: id.to_string(),
            data,
            state,
            attempts_made: parse_u32(fields.get("attempts_made")),
            max_attempts: parse_u32(fields.get("max_attempts")).max(1),
            created_at: parse_millis(fields.get("created_at")).unwrap_or_else(Utc::now),
            processed_on: parse_millis(fields.get("processed_on")),
            finished_on: parse_millis(fields.get("finished_on")),
            result,
            failed_reason: fields.get("failed_reason").cloned(),
        })
    }
}

fn parse_u32(field: Option<&String>) -> u32 {
    field.and_then(|s| s.parse().ok()).unwrap_or(0)
}

fn parse_millis(field: Option<&String>) -> Option<DateTime<Utc>> {
    field
        .and_then(|s| s.parse::<i64>().ok())
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
}

/// Outcome of recording a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailOutcome {
    /// A retry was scheduled after the given delay.
    Retried { delay: Duration },
    /// Attempts are exhausted; the job is terminally failed.
    Terminal,
}
