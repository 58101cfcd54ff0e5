//! Semantics tests for the queue's pure logic: job model, retry policy,
//! key layout. Redis-touching paths are covered by the service's runtime
//! environment, not here.

use std::collections::HashMap;
use std::time::Duration;

use reportdeck_queue::{Job, JobData, JobOptions, JobState, QueueConfig};

fn data() -> JobData {
    JobData {
        use_case: "POLITICAL_SNAPSHOT".to_string(),
        recipient: "a@b.co".to_string(),
        filters: [("CHANNEL".to_string(), "CTV".to_string())]
            .into_iter()
            .collect(),
    }
}

#[test]
fn new_jobs_start_waiting_with_zero_attempts() {
    let job = Job::new("1", data(), 3);
    assert_eq!(job.state, JobState::Waiting);
    assert_eq!(job.attempts_made, 0);
    assert_eq!(job.max_attempts, 3);
    assert!(job.processed_on.is_none());
    assert!(job.finished_on.is_none());
}

#[test]
fn backoff_delay_without_failures_is_zero() {
    let opts = JobOptions::default();
    assert_eq!(opts.backoff_delay(0), Duration::ZERO);
}

#[test]
fn retry_delay_respects_the_exponential_schedule() {
    let opts = JobOptions::default();
    // On the n-th failure (1-indexed) the next attempt is scheduled no
    // earlier than base * 2^(n-1) and no later than the cap.
    for failure in 1..10u32 {
        let delay = opts.backoff_delay(failure);
        let floor = opts
            .backoff_base
            .saturating_mul(1 << (failure - 1))
            .min(opts.backoff_cap);
        assert!(delay >= floor.min(opts.backoff_cap));
        assert!(delay <= opts.backoff_cap);
    }
}

#[test]
fn first_retry_waits_at_least_one_second() {
    let opts = JobOptions::default();
    assert!(opts.backoff_delay(1) >= Duration::from_secs(1));
}

#[test]
fn job_data_round_trips_through_the_hash_encoding() {
    let job = Job::new("42", data(), 3);
    let fields: HashMap<String, String> = job.to_fields().unwrap().into_iter().collect();

    let back = Job::from_fields("42", &fields).unwrap();
    assert_eq!(back.data.use_case, "POLITICAL_SNAPSHOT");
    assert_eq!(back.data.recipient, "a@b.co");
    assert_eq!(back.data.filters.get("CHANNEL").unwrap(), "CTV");
}

#[test]
fn state_strings_round_trip() {
    for state in [
        JobState::Waiting,
        JobState::Active,
        JobState::Completed,
        JobState::Failed,
        JobState::Delayed,
    ] {
        assert_eq!(JobState::parse(state.as_str()), Some(state));
    }
    assert_eq!(JobState::parse("paused"), None);
}

#[test]
fn keyspace_matches_the_documented_layout() {
    let config = QueueConfig::new("redis://localhost:6379", "report-jobs");
    assert_eq!(config.key("id"), "bull:report-jobs:id");
    assert_eq!(config.key("waiting"), "bull:report-jobs:waiting");
    assert_eq!(config.key("active"), "bull:report-jobs:active");
    assert_eq!(config.key("failed"), "bull:report-jobs:failed");
    assert_eq!(config.key("completed"), "bull:report-jobs:completed");
    assert_eq!(config.key("delayed"), "bull:report-jobs:delayed");
    assert_eq!(config.key("events"), "bull:report-jobs:events");
}

#[test]
fn retention_defaults_keep_completed_for_a_day_and_failed_for_a_week() {
    let opts = JobOptions::default();
    assert_eq!(opts.remove_on_complete.age, Some(Duration::from_secs(86400)));
    assert_eq!(opts.remove_on_complete.count, Some(1000));
    assert_eq!(opts.remove_on_fail.age, Some(Duration::from_secs(604800)));
    assert_eq!(opts.remove_on_fail.count, None);
}
