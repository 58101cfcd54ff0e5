//! Worker: leases jobs with bounded concurrency and drives the processor.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::job::{FailOutcome, Job};
use crate::queue::Queue;

/// Failure surfaced by a processor. The queue decides retry vs terminal.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ProcessError(pub String);

impl ProcessError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// The unit of work a worker runs for each leased job.
#[async_trait]
pub trait JobProcessor: Send + Sync {
    /// Process one job; the returned value becomes the job's `result`.
    async fn process(&self, job: &Job) -> Result<serde_json::Value, ProcessError>;

    /// Called after a job fails terminally (attempts exhausted). Best-effort:
    /// implementations swallow their own errors so the original failure
    /// remains the job's failed reason.
    async fn on_terminal_failure(&self, _job: &Job, _reason: &str) {}
}

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Number of concurrent in-flight jobs.
    pub concurrency: usize,
    /// Blocking lease timeout; also bounds shutdown latency.
    pub lease_timeout: Duration,
    /// Interval of the scheduler tick (delayed promotion, stalled sweep,
    /// terminal cleanup).
    pub tick_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            lease_timeout: Duration::from_secs(5),
            tick_interval: Duration::from_secs(5),
        }
    }
}

/// Background worker. Multiple instances may share one queue; each id is
/// leased exclusively.
pub struct Worker {
    queue: Queue,
    processor: Arc<dyn JobProcessor>,
    config: WorkerConfig,
    running: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
}

impl Worker {
    pub fn new(queue: Queue, processor: Arc<dyn JobProcessor>, config: WorkerConfig) -> Self {
        Self {
            queue,
            processor,
            config,
            running: Arc::new(AtomicBool::new(false)),
            handles: Vec::new(),
        }
    }

    /// Shared flag reflecting whether the worker loops are live (exposed on
    /// the stats surface).
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    /// Spawn the scheduler tick plus `concurrency` consumer loops.
    pub fn start(&mut self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("worker already running");
            return;
        }
        info!(concurrency = self.config.concurrency, "worker starting");

        let scheduler_queue = self.queue.clone();
        let scheduler_running = self.running.clone();
        let tick = self.config.tick_interval;
        self.handles.push(tokio::spawn(async move {
            scheduler_loop(scheduler_queue, scheduler_running, tick).await;
        }));

        for slot in 0..self.config.concurrency {
            let queue = self.queue.clone();
            let processor = self.processor.clone();
            let running = self.running.clone();
            let lease_timeout = self.config.lease_timeout;
            self.handles.push(tokio::spawn(async move {
                consumer_loop(slot, queue, processor, running, lease_timeout).await;
            }));
        }
    }

    /// Stop leasing and wait for in-flight jobs up to `drain_timeout`.
    ///
    /// Returns `true` when every loop exited within the window; on `false`
    /// the remaining tasks were aborted.
    pub async fn shutdown(&mut self, drain_timeout: Duration) -> bool {
        self.running.store(false, Ordering::SeqCst);
        info!(drain_timeout_secs = drain_timeout.as_secs(), "worker draining");

        let handles: Vec<JoinHandle<()>> = self.handles.drain(..).collect();
        let abort_handles: Vec<_> = handles.iter().map(|h| h.abort_handle()).collect();

        let joined = tokio::time::timeout(
            drain_timeout,
            futures::future::join_all(handles),
        )
        .await;

        match joined {
            Ok(_) => {
                info!("worker drained");
                true
            }
            Err(_) => {
                warn!("worker drain timed out, aborting in-flight tasks");
                for handle in abort_handles {
                    handle.abort();
                }
                false
            }
        }
    }
}

async fn consumer_loop(
    slot: usize,
    queue: Queue,
    processor: Arc<dyn JobProcessor>,
    running: Arc<AtomicBool>,
    lease_timeout: Duration,
) {
    debug!(slot, "consumer loop started");
    while running.load(Ordering::SeqCst) {
        let mut job = match queue.lease(lease_timeout).await {
            Ok(Some(job)) => job,
            Ok(None) => continue,
            Err(err) => {
                error!(slot, error = %err, "lease failed");
                tokio::time::sleep(Duration::from_secs(1)).await;
                continue;
            }
        };

        info!(
            slot,
            job_id = %job.id,
            use_case = %job.data.use_case,
            attempt = job.attempts_made,
            "processing job"
        );

        match processor.process(&job).await {
            Ok(result) => {
                if let Err(err) = queue.complete(&mut job, result).await {
                    error!(job_id = %job.id, error = %err, "failed to record completion");
                }
            }
            Err(process_err) => {
                let reason = process_err.to_string();
                match queue.fail(&mut job, &reason).await {
                    Ok(FailOutcome::Terminal) => {
                        processor.on_terminal_failure(&job, &reason).await;
                    }
                    Ok(FailOutcome::Retried { .. }) => {}
                    Err(err) => {
                        error!(job_id = %job.id, error = %err, "failed to record failure");
                    }
                }
            }
        }
    }
    debug!(slot, "consumer loop stopped");
}

/// Promotes due delayed jobs, requeues stalled ones, applies retention.
async fn scheduler_loop(queue: Queue, running: Arc<AtomicBool>, tick: Duration) {
    debug!("scheduler loop started");
    while running.load(Ordering::SeqCst) {
        if let Err(err) = queue.promote_due().await {
            error!(error = %err, "delayed promotion failed");
        }
        if let Err(err) = queue.requeue_stalled().await {
            error!(error = %err, "stalled sweep failed");
        }
        if let Err(err) = queue.cleanup_terminal().await {
            error!(error = %err, "terminal cleanup failed");
        }
        tokio::time::sleep(tick).await;
    }
    debug!("scheduler loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_queue_policy() {
        let config = WorkerConfig::default();
        assert_eq!(config.concurrency, 5);
        assert_eq!(config.lease_timeout, Duration::from_secs(5));
    }

    #[test]
    fn process_error_displays_its_message() {
        let err = ProcessError::new("No view data was successfully fetched");
        assert_eq!(err.to_string(), "No view data was successfully fetched");
    }
}
