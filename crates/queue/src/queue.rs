//! Redis-backed durable queue.
//!
//! Keyspace for a queue named `Q`:
//! - `bull:Q:<id>`: job hash
//! - `bull:Q:id`: id counter
//! - `bull:Q:waiting`: FIFO list of waiting ids
//! - `bull:Q:active`: set of leased ids
//! - `bull:Q:delayed` / `bull:Q:completed` / `bull:Q:failed`: sorted sets
//!   scored by run-at / finished-at timestamps (unix ms)
//! - `bull:Q:events`: capped lifecycle event stream

use std::time::Duration;

use chrono::Utc;
use redis::{aio::ConnectionManager, AsyncCommands};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{QueueError, QueueResult};
use crate::job::{FailOutcome, Job, JobData, JobOptions, JobState};

/// Queue configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub redis_url: String,
    pub queue_name: String,
    /// Defaults applied to enqueued jobs.
    pub default_job_options: JobOptions,
    /// Active jobs older than this are eligible for requeue.
    pub stall_window: Duration,
    /// Approximate cap of the lifecycle event stream.
    pub events_cap: usize,
}

impl QueueConfig {
    pub fn new(redis_url: impl Into<String>, queue_name: impl Into<String>) -> Self {
        Self {
            redis_url: redis_url.into(),
            queue_name: queue_name.into(),
            default_job_options: JobOptions::default(),
            stall_window: Duration::from_secs(30 * 60),
            events_cap: 1000,
        }
    }

    pub fn with_job_options(mut self, options: JobOptions) -> Self {
        self.default_job_options = options;
        self
    }

    pub fn with_stall_window(mut self, window: Duration) -> Self {
        self.stall_window = window;
        self
    }

    /// Build a Redis key under this queue's prefix.
    pub fn key(&self, suffix: &str) -> String {
        format!("bull:{}:{}", self.queue_name, suffix)
    }
}

/// Counts surfaced by the introspection endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueCounts {
    pub waiting: u64,
    pub active: u64,
    pub completed: u64,
    pub failed: u64,
    pub delayed: u64,
    pub total: u64,
}

/// One lifecycle transition read back from the event stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LifecycleEvent {
    /// Stream entry id.
    pub id: String,
    pub event: String,
    pub job: String,
    pub ts: i64,
}

/// Durable job queue backed by Redis.
#[derive(Clone)]
pub struct Queue {
    connection: ConnectionManager,
    config: QueueConfig,
}

impl Queue {
    /// Connect to Redis and bind the queue keyspace.
    pub async fn connect(config: QueueConfig) -> QueueResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        let connection = ConnectionManager::new(client).await?;
        info!(queue = %config.queue_name, "job queue ready");
        Ok(Self { connection, config })
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    fn job_key(&self, id: &str) -> String {
        self.config.key(id)
    }

    /// Durably enqueue a job: allocate an id, write the hash, push onto the
    /// waiting list.
    pub async fn enqueue(
        &self,
        data: JobData,
        max_attempts: Option<u32>,
    ) -> QueueResult<Job> {
        let mut conn = self.connection.clone();
        let id: i64 = conn.incr(self.config.key("id"), 1).await?;
        let id = id.to_string();

        let max_attempts =
            max_attempts.unwrap_or(self.config.default_job_options.max_attempts).max(1);
        let job = Job::new(id.clone(), data, max_attempts);

        let fields = job.to_fields()?;
        let _: () = conn.hset_multiple(self.job_key(&id), &fields).await?;
        let _: () = conn.lpush(self.config.key("waiting"), &id).await?;
        self.emit(&mut conn, "waiting", &id).await;

        debug!(job_id = %id, use_case = %job.data.use_case, "job enqueued");
        Ok(job)
    }

    /// Block on the waiting list up to `timeout`, then lease the popped job:
    /// move it into the active set, mark it active, and count the attempt.
    pub async fn lease(&self, timeout: Duration) -> QueueResult<Option<Job>> {
        let mut conn = self.connection.clone();
        let popped: Option<(String, String)> = conn
            .brpop(self.config.key("waiting"), timeout.as_secs_f64())
            .await?;
        let Some((_, id)) = popped else {
            return Ok(None);
        };

        let fields: std::collections::HashMap<String, String> =
            conn.hgetall(self.job_key(&id)).await?;
        if fields.is_empty() {
            // Hash expired or was cleaned while the id sat in the list.
            warn!(job_id = %id, "leased id has no job hash, dropping");
            return Ok(None);
        }

        let now = Utc::now();
        let attempts: u32 = conn.hincr(self.job_key(&id), "attempts_made", 1).await?;
        let _: () = conn
            .hset_multiple(
                self.job_key(&id),
                &[
                    ("state", "active".to_string()),
                    ("processed_on", now.timestamp_millis().to_string()),
                ],
            )
            .await?;
        let _: () = conn.sadd(self.config.key("active"), &id).await?;
        self.emit(&mut conn, "active", &id).await;

        let mut job = Job::from_fields(&id, &fields)?;
        job.state = JobState::Active;
        job.attempts_made = attempts;
        job.processed_on = Some(now);
        Ok(Some(job))
    }

    /// Record success: terminal state, result payload, completed set.
    pub async fn complete(
        &self,
        job: &mut Job,
        result: serde_json::Value,
    ) -> QueueResult<()> {
        let mut conn = self.connection.clone();
        let now = Utc::now();
        let raw = serde_json::to_string(&result)
            .map_err(|err| QueueError::Serialization(err.to_string()))?;

        let _: () = conn
            .hset_multiple(
                self.job_key(&job.id),
                &[
                    ("state", "completed".to_string()),
                    ("finished_on", now.timestamp_millis().to_string()),
                    ("result", raw),
                ],
            )
            .await?;
        let _: () = conn.srem(self.config.key("active"), &job.id).await?;
        let _: () = conn
            .zadd(
                self.config.key("completed"),
                &job.id,
                now.timestamp_millis(),
            )
            .await?;
        self.emit(&mut conn, "completed", &job.id).await;

        job.state = JobState::Completed;
        job.finished_on = Some(now);
        job.result = Some(result);
        info!(job_id = %job.id, attempts = job.attempts_made, "job completed");
        Ok(())
    }

    /// Record a failure: schedule a backoff retry while attempts remain,
    /// otherwise move the job to the failed set.
    pub async fn fail(&self, job: &mut Job, reason: &str) -> QueueResult<FailOutcome> {
        let mut conn = self.connection.clone();
        let now = Utc::now();
        let _: () = conn.srem(self.config.key("active"), &job.id).await?;

        if job.attempts_made < job.max_attempts {
            let delay = self
                .config
                .default_job_options
                .backoff_delay(job.attempts_made);
            let run_at = now + chrono::Duration::from_std(delay).unwrap_or_default();

            let _: () = conn
                .hset_multiple(
                    self.job_key(&job.id),
                    &[
                        ("state", "delayed".to_string()),
                        ("failed_reason", reason.to_string()),
                    ],
                )
                .await?;
            let _: () = conn
                .zadd(
                    self.config.key("delayed"),
                    &job.id,
                    run_at.timestamp_millis(),
                )
                .await?;
            self.emit(&mut conn, "retried", &job.id).await;

            job.state = JobState::Delayed;
            job.failed_reason = Some(reason.to_string());
            warn!(
                job_id = %job.id,
                attempt = job.attempts_made,
                delay_ms = delay.as_millis() as u64,
                error = %reason,
                "job failed, retry scheduled"
            );
            Ok(FailOutcome::Retried { delay })
        } else {
            let _: () = conn
                .hset_multiple(
                    self.job_key(&job.id),
                    &[
                        ("state", "failed".to_string()),
                        ("finished_on", now.timestamp_millis().to_string()),
                        ("failed_reason", reason.to_string()),
                    ],
                )
                .await?;
            let _: () = conn
                .zadd(self.config.key("failed"), &job.id, now.timestamp_millis())
                .await?;
            self.emit(&mut conn, "failed", &job.id).await;

            job.state = JobState::Failed;
            job.finished_on = Some(now);
            job.failed_reason = Some(reason.to_string());
            warn!(
                job_id = %job.id,
                attempts = job.attempts_made,
                error = %reason,
                "job terminally failed"
            );
            Ok(FailOutcome::Terminal)
        }
    }

    /// Promote delayed jobs whose run-at time has passed back to waiting.
    ///
    /// Retried jobs re-enter behind everything currently waiting.
    pub async fn promote_due(&self) -> QueueResult<u64> {
        let mut conn = self.connection.clone();
        let now_ms = Utc::now().timestamp_millis();
        let due: Vec<String> = conn
            .zrangebyscore(self.config.key("delayed"), "-inf", now_ms)
            .await?;

        let mut promoted = 0;
        for id in due {
            let _: () = conn.zrem(self.config.key("delayed"), &id).await?;
            let _: () = conn
                .hset(self.job_key(&id), "state", "waiting")
                .await?;
            let _: () = conn.lpush(self.config.key("waiting"), &id).await?;
            self.emit(&mut conn, "waiting", &id).await;
            promoted += 1;
        }
        if promoted > 0 {
            debug!(promoted, "delayed jobs promoted");
        }
        Ok(promoted)
    }

    /// Requeue active jobs that have been in flight longer than the stall
    /// window (their worker is presumed gone).
    pub async fn requeue_stalled(&self) -> QueueResult<u64> {
        let mut conn = self.connection.clone();
        let active: Vec<String> = conn.smembers(self.config.key("active")).await?;
        let cutoff_ms =
            Utc::now().timestamp_millis() - self.config.stall_window.as_millis() as i64;

        let mut requeued = 0;
        for id in active {
            let processed_on: Option<String> =
                conn.hget(self.job_key(&id), "processed_on").await?;
            let stalled = match processed_on.and_then(|s| s.parse::<i64>().ok()) {
                Some(ms) => ms < cutoff_ms,
                None => true,
            };
            if !stalled {
                continue;
            }
            let _: () = conn.srem(self.config.key("active"), &id).await?;
            let _: () = conn
                .hset(self.job_key(&id), "state", "waiting")
                .await?;
            let _: () = conn.lpush(self.config.key("waiting"), &id).await?;
            self.emit(&mut conn, "stalled", &id).await;
            warn!(job_id = %id, "stalled job requeued");
            requeued += 1;
        }
        Ok(requeued)
    }

    /// Apply the retention policy to terminal jobs: completed jobs expire by
    /// age or count (whichever trips first), failed jobs by age.
    pub async fn cleanup_terminal(&self) -> QueueResult<u64> {
        let opts = self.config.default_job_options.clone();
        let mut removed = 0;
        removed += self
            .cleanup_set("completed", opts.remove_on_complete.age, opts.remove_on_complete.count)
            .await?;
        removed += self
            .cleanup_set("failed", opts.remove_on_fail.age, opts.remove_on_fail.count)
            .await?;
        Ok(removed)
    }

    async fn cleanup_set(
        &self,
        set: &str,
        age: Option<Duration>,
        count: Option<u64>,
    ) -> QueueResult<u64> {
        let mut conn = self.connection.clone();
        let set_key = self.config.key(set);
        let mut removed = 0;

        if let Some(age) = age {
            let cutoff = Utc::now().timestamp_millis() - age.as_millis() as i64;
            let expired: Vec<String> = conn.zrangebyscore(&set_key, "-inf", cutoff).await?;
            for id in &expired {
                let _: () = conn.del(self.job_key(id)).await?;
            }
            if !expired.is_empty() {
                let _: () = conn.zrembyscore(&set_key, "-inf", cutoff).await?;
                removed += expired.len() as u64;
            }
        }

        if let Some(count) = count {
            let size: u64 = conn.zcard(&set_key).await?;
            if size > count {
                let excess = (size - count) as isize;
                let oldest: Vec<String> = conn.zrange(&set_key, 0, excess - 1).await?;
                for id in &oldest {
                    let _: () = conn.del(self.job_key(id)).await?;
                    let _: () = conn.zrem(&set_key, id).await?;
                }
                removed += oldest.len() as u64;
            }
        }

        if removed > 0 {
            debug!(set, removed, "terminal jobs cleaned up");
        }
        Ok(removed)
    }

    /// Read one job back from its hash.
    pub async fn get_job(&self, id: &str) -> QueueResult<Option<Job>> {
        let mut conn = self.connection.clone();
        let fields: std::collections::HashMap<String, String> =
            conn.hgetall(self.job_key(id)).await?;
        if fields.is_empty() {
            return Ok(None);
        }
        Job::from_fields(id, &fields).map(Some)
    }

    /// Promote a terminally-failed job back to waiting, preserving its
    /// attempt count.
    pub async fn retry_failed(&self, id: &str) -> QueueResult<Job> {
        let mut job = self
            .get_job(id)
            .await?
            .ok_or_else(|| QueueError::NotFound(id.to_string()))?;
        if job.state != JobState::Failed {
            return Err(QueueError::InvalidState {
                id: id.to_string(),
                expected: "failed",
                actual: job.state.as_str().to_string(),
            });
        }

        let mut conn = self.connection.clone();
        let _: () = conn.zrem(self.config.key("failed"), id).await?;
        let _: () = conn.hset(self.job_key(id), "state", "waiting").await?;
        let _: () = conn
            .hdel(self.job_key(id), &["finished_on", "failed_reason"])
            .await?;
        let _: () = conn.lpush(self.config.key("waiting"), id).await?;
        self.emit(&mut conn, "waiting", id).await;

        job.state = JobState::Waiting;
        job.finished_on = None;
        job.failed_reason = None;
        info!(job_id = %id, attempts = job.attempts_made, "failed job requeued by request");
        Ok(job)
    }

    /// Current queue counts.
    pub async fn stats(&self) -> QueueResult<QueueCounts> {
        let mut conn = self.connection.clone();
        let waiting: u64 = conn.llen(self.config.key("waiting")).await?;
        let active: u64 = conn.scard(self.config.key("active")).await?;
        let completed: u64 = conn.zcard(self.config.key("completed")).await?;
        let failed: u64 = conn.zcard(self.config.key("failed")).await?;
        let delayed: u64 = conn.zcard(self.config.key("delayed")).await?;

        Ok(QueueCounts {
            waiting,
            active,
            completed,
            failed,
            delayed,
            total: waiting + active + completed + failed + delayed,
        })
    }

    /// Most recent lifecycle events, newest first.
    pub async fn recent_events(&self, limit: usize) -> QueueResult<Vec<LifecycleEvent>> {
        let mut conn = self.connection.clone();
        let raw: Vec<(String, std::collections::HashMap<String, String>)> =
            redis::cmd("XREVRANGE")
                .arg(self.config.key("events"))
                .arg("+")
                .arg("-")
                .arg("COUNT")
                .arg(limit)
                .query_async(&mut conn)
                .await?;

        Ok(raw
            .into_iter()
            .map(|(id, fields)| LifecycleEvent {
                id,
                event: fields.get("event").cloned().unwrap_or_default(),
                job: fields.get("job").cloned().unwrap_or_default(),
                ts: fields.get("ts").and_then(|s| s.parse().ok()).unwrap_or_default(),
            })
            .collect())
    }

    /// Append to the capped lifecycle event stream. Best-effort: event loss
    /// never fails the operation that produced it.
    async fn emit(&self, conn: &mut ConnectionManager, event: &str, id: &str) {
        let result: Result<String, redis::RedisError> = redis::cmd("XADD")
            .arg(self.config.key("events"))
            .arg("MAXLEN")
            .arg("~")
            .arg(self.config.events_cap)
            .arg("*")
            .arg("event")
            .arg(event)
            .arg("job")
            .arg(id)
            .arg("ts")
            .arg(Utc::now().timestamp_millis())
            .query_async(conn)
            .await;
        if let Err(err) = result {
            warn!(event, job_id = %id, error = %err, "failed to append lifecycle event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_scoped_under_the_queue_name() {
        let config = QueueConfig::new("redis://localhost:6379", "reports");
        assert_eq!(config.key("waiting"), "bull:reports:waiting");
        assert_eq!(config.key("42"), "bull:reports:42");
        assert_eq!(config.key("events"), "bull:reports:events");
    }

    #[test]
    fn config_defaults_match_policy() {
        let config = QueueConfig::new("redis://localhost:6379", "reports");
        assert_eq!(config.stall_window, Duration::from_secs(1800));
        assert_eq!(config.default_job_options.max_attempts, 3);
        assert_eq!(config.events_cap, 1000);
    }

    #[test]
    fn config_builders_override_defaults() {
        let config = QueueConfig::new("redis://localhost:6379", "reports")
            .with_stall_window(Duration::from_secs(60))
            .with_job_options(JobOptions {
                max_attempts: 5,
                ..JobOptions::default()
            });
        assert_eq!(config.stall_window, Duration::from_secs(60));
        assert_eq!(config.default_job_options.max_attempts, 5);
    }
}
