//! Email subjects and HTML bodies.

/// Subject of the success email carrying the artifact.
pub const REPORT_SUBJECT: &str = "Your Export Report";

/// Subject of the terminal-failure notification.
pub const FAILURE_SUBJECT: &str = "Your Export Report Failed";

/// Body of the success email.
pub fn report_body(use_case: &str) -> String {
    format!(
        "<html><body>\
         <p>Hi,</p>\
         <p>Your <strong>{use_case}</strong> report is attached.</p>\
         <p>This report was generated automatically; replies to this address are not monitored.</p>\
         </body></html>"
    )
}

/// Body of the failure notification: names the use case and summarizes the
/// error.
pub fn failure_body(use_case: &str, job_id: &str, attempts: u32, reason: &str) -> String {
    format!(
        "<html><body>\
         <p>Hi,</p>\
         <p>We could not generate your <strong>{use_case}</strong> report \
         (job {job_id}, {attempts} attempts).</p>\
         <p>Reason: {reason}</p>\
         <p>You can retry the request, or contact support if the problem persists.</p>\
         </body></html>"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_body_names_use_case_and_reason() {
        let body = failure_body(
            "POLITICAL_SNAPSHOT",
            "42",
            3,
            "No view data was successfully fetched",
        );
        assert!(body.contains("POLITICAL_SNAPSHOT"));
        assert!(body.contains("No view data was successfully fetched"));
        assert!(body.contains("job 42"));
    }
}
