//! Notification-API transport.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use tracing::{debug, info};

use crate::error::MailError;

/// Outbound email seam consumed by the pipeline. The queue's retry/backoff
/// is the retry layer; sends here are single-shot.
#[async_trait]
pub trait EmailGateway: Send + Sync {
    /// Send an HTML email with one binary attachment.
    async fn send_attachment(
        &self,
        to: &str,
        subject: &str,
        body_html: &str,
        bytes: Vec<u8>,
        filename: &str,
    ) -> Result<(), MailError>;

    /// Send a plain HTML email (no attachment).
    async fn send_plain(&self, to: &str, subject: &str, body_html: &str)
        -> Result<(), MailError>;
}

/// Configuration of the notification API transport.
#[derive(Debug, Clone)]
pub struct NotificationConfig {
    /// Base URL of the notification API.
    pub api_url: String,
    /// Bearer token for the API gateway.
    pub token: String,
    pub from: String,
    pub team_tag: String,
    pub product_tag: String,
}

/// Gateway that posts messages to the notification API.
pub struct NotificationGateway {
    client: reqwest::Client,
    config: NotificationConfig,
}

impl NotificationGateway {
    pub fn new(config: NotificationConfig) -> Result<Self, MailError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/send", self.config.api_url.trim_end_matches('/'))
    }

    async fn check(&self, response: reqwest::Response) -> Result<(), MailError> {
        if response.status().is_success() {
            return Ok(());
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(MailError::Api { status, body })
    }
}

#[async_trait]
impl EmailGateway for NotificationGateway {
    async fn send_attachment(
        &self,
        to: &str,
        subject: &str,
        body_html: &str,
        bytes: Vec<u8>,
        filename: &str,
    ) -> Result<(), MailError> {
        debug!(to, subject, filename, size = bytes.len(), "sending email with attachment");

        let part = Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(attachment_mime(filename))?;

        let form = Form::new()
            .text("to", to.to_string())
            .text("from", self.config.from.clone())
            .text("subject", subject.to_string())
            .text("body", body_html.to_string())
            .text("team", self.config.team_tag.clone())
            .text("product", self.config.product_tag.clone())
            .part("attachment", part);

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.token)
            .multipart(form)
            .send()
            .await?;

        self.check(response).await?;
        info!(to, subject, filename, "email with attachment sent");
        Ok(())
    }

    async fn send_plain(
        &self,
        to: &str,
        subject: &str,
        body_html: &str,
    ) -> Result<(), MailError> {
        debug!(to, subject, "sending plain email");

        let payload = serde_json::json!({
            "to": to,
            "from": self.config.from,
            "subject": subject,
            "body": body_html,
            "team": self.config.team_tag,
            "product": self.config.product_tag,
        });

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.token)
            .json(&payload)
            .send()
            .await?;

        self.check(response).await?;
        info!(to, subject, "plain email sent");
        Ok(())
    }
}

/// MIME type of an attachment, by extension.
fn attachment_mime(filename: &str) -> &'static str {
    if filename.ends_with(".pptx") {
        "application/vnd.openxmlformats-officedocument.presentationml.presentation"
    } else {
        "application/octet-stream"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pptx_attachments_get_the_presentation_mime() {
        assert!(attachment_mime("report.pptx").contains("presentationml"));
        assert_eq!(attachment_mime("report.bin"), "application/octet-stream");
    }

    #[test]
    fn endpoint_trims_trailing_slash() {
        let gateway = NotificationGateway::new(NotificationConfig {
            api_url: "https://notify.example.com/".to_string(),
            token: "tok".to_string(),
            from: "reports@example.com".to_string(),
            team_tag: "analytics".to_string(),
            product_tag: "reportdeck".to_string(),
        })
        .unwrap();
        assert_eq!(gateway.endpoint(), "https://notify.example.com/send");
    }
}
