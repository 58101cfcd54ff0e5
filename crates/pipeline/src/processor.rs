//! The job processor: glues config, fetch, transform, assembly and email
//! together for one job.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use reportdeck_analytics::{AnalyticsClient, AnalyticsError, ViewRequest};
use reportdeck_config::Registry;
use reportdeck_mail::EmailGateway;
use reportdeck_queue::{Job, JobProcessor, ProcessError};
use reportdeck_transform::{build_view_configs, transform_all};

use crate::emails;
use crate::error::PipelineError;
use crate::writer::PresentationWriter;

/// Seam over the remote fetch so the processor can be exercised without a
/// live analytics server.
#[async_trait]
pub trait ViewSource: Send + Sync {
    async fn fetch_views(
        &self,
        requests: &[ViewRequest],
        workbook_name: &str,
        site: &str,
        concurrency: usize,
    ) -> Result<HashMap<String, String>, AnalyticsError>;
}

#[async_trait]
impl ViewSource for AnalyticsClient {
    async fn fetch_views(
        &self,
        requests: &[ViewRequest],
        workbook_name: &str,
        site: &str,
        concurrency: usize,
    ) -> Result<HashMap<String, String>, AnalyticsError> {
        self.fetch_views_in_parallel(requests, workbook_name, site, concurrency)
            .await
    }
}

/// Processor for report jobs.
pub struct ReportProcessor {
    registry: Arc<Registry>,
    views: Arc<dyn ViewSource>,
    writer: Arc<dyn PresentationWriter>,
    mailer: Arc<dyn EmailGateway>,
    fetch_concurrency: usize,
}

impl ReportProcessor {
    pub fn new(
        registry: Arc<Registry>,
        views: Arc<dyn ViewSource>,
        writer: Arc<dyn PresentationWriter>,
        mailer: Arc<dyn EmailGateway>,
        fetch_concurrency: usize,
    ) -> Self {
        Self {
            registry,
            views,
            writer,
            mailer,
            fetch_concurrency,
        }
    }

    async fn run(&self, job: &Job) -> Result<serde_json::Value, PipelineError> {
        let data = &job.data;
        let meta = self.registry.use_case_meta(&data.use_case)?.clone();
        let catalog = self.registry.view_catalog(&data.use_case)?;

        let requests: Vec<ViewRequest> = build_view_configs(catalog, &data.filters)
            .into_iter()
            .map(|view| ViewRequest {
                view_key: view.view_key,
                view_name: view.view_name,
                filter_params: view.filter_params,
            })
            .collect();

        let fetched = self
            .views
            .fetch_views(
                &requests,
                &meta.workbook_name,
                &meta.site_name,
                self.fetch_concurrency,
            )
            .await?;
        if fetched.is_empty() {
            return Err(PipelineError::NoViewsFetched);
        }

        let shaped = transform_all(catalog, &fetched);
        if shaped.is_empty() {
            return Err(PipelineError::AllTransformsFailed);
        }
        let views_processed = shaped.len();

        let slide_manifest = self.registry.slide_manifest(&data.use_case)?;
        let deck = reportdeck_assembly::assemble(slide_manifest, &shaped);
        let bytes = self.writer.render(&deck).await?;

        let filename = artifact_filename(&data.use_case, Utc::now());
        self.mailer
            .send_attachment(
                &data.recipient,
                emails::REPORT_SUBJECT,
                &emails::report_body(&data.use_case),
                bytes,
                &filename,
            )
            .await?;

        info!(
            job_id = %job.id,
            use_case = %data.use_case,
            recipient = %data.recipient,
            views_processed,
            "report delivered"
        );

        Ok(serde_json::json!({
            "success": true,
            "fileName": filename,
            "recipient": data.recipient,
            "useCase": data.use_case,
            "viewsProcessed": views_processed,
        }))
    }
}

#[async_trait]
impl JobProcessor for ReportProcessor {
    async fn process(&self, job: &Job) -> Result<serde_json::Value, ProcessError> {
        self.run(job)
            .await
            .map_err(|err| ProcessError::new(err.to_string()))
    }

    /// Best-effort failure notification; its own errors are swallowed so the
    /// original cause stays the job's failed reason.
    async fn on_terminal_failure(&self, job: &Job, reason: &str) {
        let body = emails::failure_body(
            &job.data.use_case,
            &job.id,
            job.attempts_made,
            reason,
        );
        if let Err(err) = self
            .mailer
            .send_plain(&job.data.recipient, emails::FAILURE_SUBJECT, &body)
            .await
        {
            warn!(
                job_id = %job.id,
                recipient = %job.data.recipient,
                error = %err,
                "failure notification could not be delivered"
            );
        }
    }
}

/// Artifact file name: use case plus date, `.pptx`-suffixed.
fn artifact_filename(use_case: &str, now: DateTime<Utc>) -> String {
    format!(
        "{}-{}.pptx",
        use_case.to_lowercase().replace('_', "-"),
        now.format("%Y%m%d")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use reportdeck_assembly::PresentationManifest;
    use reportdeck_config::{
        ColumnSchema, SlideManifest, UseCaseCatalog, UseCaseMeta, ViewConfig,
    };
    use reportdeck_core::{ValueFormat, ViewType};
    use reportdeck_mail::MailError;
    use reportdeck_queue::JobData;
    use crate::writer::{ManifestBytesWriter, RenderError};

    struct FixedViewSource {
        payloads: HashMap<String, String>,
    }

    #[async_trait]
    impl ViewSource for FixedViewSource {
        async fn fetch_views(
            &self,
            requests: &[ViewRequest],
            _workbook_name: &str,
            _site: &str,
            _concurrency: usize,
        ) -> Result<HashMap<String, String>, AnalyticsError> {
            Ok(requests
                .iter()
                .filter_map(|r| {
                    self.payloads
                        .get(&r.view_key)
                        .map(|csv| (r.view_key.clone(), csv.clone()))
                })
                .collect())
        }
    }

    #[derive(Default)]
    struct RecordingMailer {
        attachments: Mutex<Vec<(String, String, String)>>,
        plain: Mutex<Vec<(String, String, String)>>,
        fail_sends: bool,
    }

    #[async_trait]
    impl EmailGateway for RecordingMailer {
        async fn send_attachment(
            &self,
            to: &str,
            subject: &str,
            _body_html: &str,
            _bytes: Vec<u8>,
            filename: &str,
        ) -> Result<(), MailError> {
            if self.fail_sends {
                return Err(MailError::Api {
                    status: 502,
                    body: "gateway down".to_string(),
                });
            }
            self.attachments.lock().unwrap().push((
                to.to_string(),
                subject.to_string(),
                filename.to_string(),
            ));
            Ok(())
        }

        async fn send_plain(
            &self,
            to: &str,
            subject: &str,
            body_html: &str,
        ) -> Result<(), MailError> {
            if self.fail_sends {
                return Err(MailError::Api {
                    status: 502,
                    body: "gateway down".to_string(),
                });
            }
            self.plain.lock().unwrap().push((
                to.to_string(),
                subject.to_string(),
                body_html.to_string(),
            ));
            Ok(())
        }
    }

    struct FailingWriter;

    #[async_trait]
    impl PresentationWriter for FailingWriter {
        async fn render(&self, _: &PresentationManifest) -> Result<Vec<u8>, RenderError> {
            Err(RenderError::new("writer offline"))
        }
    }

    fn registry() -> Arc<Registry> {
        let use_cases = [(
            "POLITICAL_SNAPSHOT".to_string(),
            UseCaseMeta {
                workbook_name: "PoliticalSnapshot".to_string(),
                site_name: "campaign-analytics".to_string(),
            },
        )]
        .into_iter()
        .collect();

        let catalogs = [(
            "POLITICAL_SNAPSHOT".to_string(),
            UseCaseCatalog {
                views: vec![
                    ViewConfig {
                        key: "CHANNEL_DATA".to_string(),
                        name: "Channel Performance".to_string(),
                        view_type: ViewType::Table,
                        columns: vec![
                            ColumnSchema {
                                field: "CHANNEL".to_string(),
                                column: "Channel".to_string(),
                                display: "Channel".to_string(),
                                format: ValueFormat::String,
                                needed: true,
                            },
                            ColumnSchema {
                                field: "SPEND".to_string(),
                                column: "Spend".to_string(),
                                display: "Spend".to_string(),
                                format: ValueFormat::Currency,
                                needed: true,
                            },
                        ],
                        filters: vec!["CHANNEL".to_string()],
                    },
                    ViewConfig {
                        key: "TOTAL_SPEND".to_string(),
                        name: "Total Spend".to_string(),
                        view_type: ViewType::FlagCard,
                        columns: vec![ColumnSchema {
                            field: "TOTAL_SPEND".to_string(),
                            column: "Total".to_string(),
                            display: "Total".to_string(),
                            format: ValueFormat::Currency,
                            needed: true,
                        }],
                        filters: vec![],
                    },
                ],
                filters: [("CHANNEL".to_string(), "vf_Channel".to_string())]
                    .into_iter()
                    .collect(),
            },
        )]
        .into_iter()
        .collect();

        let slides = [(
            "POLITICAL_SNAPSHOT".to_string(),
            SlideManifest {
                title: "Political Snapshot".to_string(),
                layout: "LAYOUT_WIDE".to_string(),
                slides: vec![],
            },
        )]
        .into_iter()
        .collect();

        Arc::new(Registry::from_parts(use_cases, catalogs, slides).unwrap())
    }

    fn job() -> Job {
        let mut job = Job::new(
            "1",
            JobData {
                use_case: "POLITICAL_SNAPSHOT".to_string(),
                recipient: "a@b.co".to_string(),
                filters: [("CHANNEL".to_string(), "CTV".to_string())]
                    .into_iter()
                    .collect(),
            },
            3,
        );
        job.attempts_made = 3;
        job
    }

    fn processor_with(
        payloads: HashMap<String, String>,
        mailer: Arc<RecordingMailer>,
    ) -> ReportProcessor {
        ReportProcessor::new(
            registry(),
            Arc::new(FixedViewSource { payloads }),
            Arc::new(ManifestBytesWriter),
            mailer,
            5,
        )
    }

    #[tokio::test]
    async fn happy_path_emails_the_artifact_and_reports_views_processed() {
        let mut payloads = HashMap::new();
        payloads.insert(
            "CHANNEL_DATA".to_string(),
            "Channel,Spend\nCTV,\"1,200\"\n".to_string(),
        );
        payloads.insert("TOTAL_SPEND".to_string(), "Total\n1200\n".to_string());

        let mailer = Arc::new(RecordingMailer::default());
        let processor = processor_with(payloads, mailer.clone());

        let result = processor.run(&job()).await.unwrap();
        assert_eq!(result["success"], true);
        assert_eq!(result["viewsProcessed"], 2);
        assert_eq!(result["recipient"], "a@b.co");

        let sent = mailer.attachments.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1, "Your Export Report");
        assert!(sent[0].2.ends_with(".pptx"));
        assert!(sent[0].2.starts_with("political-snapshot-"));
    }

    #[tokio::test]
    async fn partial_view_failure_still_completes() {
        let mut payloads = HashMap::new();
        payloads.insert(
            "CHANNEL_DATA".to_string(),
            "Channel,Spend\nCTV,10\n".to_string(),
        );
        // TOTAL_SPEND missing: its fetch failed upstream.

        let mailer = Arc::new(RecordingMailer::default());
        let processor = processor_with(payloads, mailer.clone());

        let result = processor.run(&job()).await.unwrap();
        assert_eq!(result["viewsProcessed"], 1);
    }

    #[tokio::test]
    async fn empty_fetch_is_no_views_fetched() {
        let mailer = Arc::new(RecordingMailer::default());
        let processor = processor_with(HashMap::new(), mailer);

        let err = processor.run(&job()).await.unwrap_err();
        assert!(matches!(err, PipelineError::NoViewsFetched));
        assert_eq!(err.to_string(), "No view data was successfully fetched");
    }

    #[tokio::test]
    async fn unusable_payloads_are_all_transforms_failed() {
        let mut payloads = HashMap::new();
        payloads.insert("CHANNEL_DATA".to_string(), "".to_string());
        payloads.insert("TOTAL_SPEND".to_string(), "\n\n".to_string());

        let mailer = Arc::new(RecordingMailer::default());
        let processor = processor_with(payloads, mailer);

        let err = processor.run(&job()).await.unwrap_err();
        assert!(matches!(err, PipelineError::AllTransformsFailed));
    }

    #[tokio::test]
    async fn unknown_use_case_fails_fast() {
        let mailer = Arc::new(RecordingMailer::default());
        let processor = processor_with(HashMap::new(), mailer);
        let mut bad_job = job();
        bad_job.data.use_case = "UNKNOWN".to_string();

        let err = processor.run(&bad_job).await.unwrap_err();
        assert!(matches!(err, PipelineError::Domain(_)));
    }

    #[tokio::test]
    async fn render_failure_propagates() {
        let mut payloads = HashMap::new();
        payloads.insert(
            "CHANNEL_DATA".to_string(),
            "Channel,Spend\nCTV,10\n".to_string(),
        );
        let mailer = Arc::new(RecordingMailer::default());
        let processor = ReportProcessor::new(
            registry(),
            Arc::new(FixedViewSource { payloads }),
            Arc::new(FailingWriter),
            mailer,
            5,
        );

        let err = processor.run(&job()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Render(_)));
    }

    #[tokio::test]
    async fn terminal_failure_sends_a_failure_email_naming_the_use_case() {
        let mailer = Arc::new(RecordingMailer::default());
        let processor = processor_with(HashMap::new(), mailer.clone());

        processor
            .on_terminal_failure(&job(), "No view data was successfully fetched")
            .await;

        let plain = mailer.plain.lock().unwrap();
        assert_eq!(plain.len(), 1);
        assert_eq!(plain[0].0, "a@b.co");
        assert_eq!(plain[0].1, "Your Export Report Failed");
        assert!(plain[0].2.contains("POLITICAL_SNAPSHOT"));
        assert!(plain[0].2.contains("No view data was successfully fetched"));
    }

    #[tokio::test]
    async fn failure_email_errors_are_swallowed() {
        let mailer = Arc::new(RecordingMailer {
            fail_sends: true,
            ..RecordingMailer::default()
        });
        let processor = processor_with(HashMap::new(), mailer);

        // Must not panic or surface the gateway error.
        processor.on_terminal_failure(&job(), "boom").await;
    }

    #[test]
    fn artifact_filename_is_dated_and_pptx() {
        use chrono::TimeZone;
        let now = chrono::Utc.with_ymd_and_hms(2025, 3, 4, 12, 0, 0).unwrap();
        assert_eq!(
            artifact_filename("POLITICAL_SNAPSHOT", now),
            "political-snapshot-20250304.pptx"
        );
    }
}
