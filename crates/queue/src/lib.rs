//! Durable job queue and background worker.
//!
//! Jobs live in Redis under the `bull:<queue>:*` keyspace (hash per job,
//! waiting list, active set, delayed/completed/failed sorted sets, capped
//! event stream), which is the sole source of truth for job state across
//! restarts and worker instances.

pub mod error;
pub mod job;
pub mod queue;
pub mod worker;

pub use error::{QueueError, QueueResult};
pub use job::{FailOutcome, Job, JobData, JobOptions, JobState, RetentionRule};
pub use queue::{LifecycleEvent, Queue, QueueConfig, QueueCounts};
pub use worker::{JobProcessor, ProcessError, Worker, WorkerConfig};
