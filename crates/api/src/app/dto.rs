use std::collections::HashMap;

use serde::Deserialize;

use reportdeck_queue::{Job, JobState};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitJobRequest {
    #[serde(default)]
    pub use_case: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub filters: HashMap<String, String>,
}

// -------------------------
// JSON mapping helpers
// -------------------------

/// Public status of a job: `{waiting, delayed} -> pending`,
/// `active -> processing`, terminal states pass through.
pub fn public_status(state: JobState) -> &'static str {
    match state {
        JobState::Waiting | JobState::Delayed => "pending",
        JobState::Active => "processing",
        JobState::Completed => "completed",
        JobState::Failed => "failed",
    }
}

pub fn job_to_json(job: Job) -> serde_json::Value {
    serde_json::json!({
        "jobId": job.id,
        "status": public_status(job.state),
        "attempts": job.attempts_made,
        "maxAttempts": job.max_attempts,
        "createdAt": job.created_at.to_rfc3339(),
        "processedOn": job.processed_on.map(|t| t.to_rfc3339()),
        "finishedOn": job.finished_on.map(|t| t.to_rfc3339()),
        "failedReason": job.failed_reason,
        "result": job.result,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use reportdeck_queue::JobData;

    #[test]
    fn status_mapping_matches_the_public_contract() {
        assert_eq!(public_status(JobState::Waiting), "pending");
        assert_eq!(public_status(JobState::Delayed), "pending");
        assert_eq!(public_status(JobState::Active), "processing");
        assert_eq!(public_status(JobState::Completed), "completed");
        assert_eq!(public_status(JobState::Failed), "failed");
    }

    #[test]
    fn job_json_carries_attempts_and_reason() {
        let mut job = Job::new(
            "7",
            JobData {
                use_case: "POLITICAL_SNAPSHOT".to_string(),
                recipient: "a@b.co".to_string(),
                filters: HashMap::new(),
            },
            3,
        );
        job.state = JobState::Failed;
        job.attempts_made = 3;
        job.failed_reason = Some("No view data was successfully fetched".to_string());

        let json = job_to_json(job);
        assert_eq!(json["jobId"], "7");
        assert_eq!(json["status"], "failed");
        assert_eq!(json["attempts"], 3);
        assert_eq!(json["maxAttempts"], 3);
        assert_eq!(
            json["failedReason"],
            "No view data was successfully fetched"
        );
    }

    #[test]
    fn submit_request_accepts_camel_case_body() {
        let body = serde_json::json!({
            "useCase": "POLITICAL_SNAPSHOT",
            "email": "a@b.co",
            "filters": {"CHANNEL": "CTV"}
        });
        let request: SubmitJobRequest = serde_json::from_value(body).unwrap();
        assert_eq!(request.use_case, "POLITICAL_SNAPSHOT");
        assert_eq!(request.filters.get("CHANNEL").unwrap(), "CTV");
    }

    #[test]
    fn submit_request_defaults_missing_fields_to_empty() {
        let request: SubmitJobRequest = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(request.use_case.is_empty());
        assert!(request.email.is_empty());
        assert!(request.filters.is_empty());
    }
}
