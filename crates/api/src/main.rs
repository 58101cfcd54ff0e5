use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use reportdeck_analytics::{AnalyticsClient, DEFAULT_FETCH_CONCURRENCY};
use reportdeck_api::app::{self, AppServices};
use reportdeck_api::settings::Settings;
use reportdeck_config::Registry;
use reportdeck_mail::{NotificationConfig, NotificationGateway};
use reportdeck_pipeline::{ManifestBytesWriter, ReportProcessor};
use reportdeck_queue::{JobOptions, Queue, QueueConfig, Worker, WorkerConfig};

const QUEUE_NAME: &str = "report-jobs";
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    reportdeck_observability::init();

    let settings = Settings::from_env()?;
    let registry = Arc::new(Registry::load_from_dir(&settings.config_dir)?);

    let queue_config = QueueConfig::new(settings.redis_url(), QUEUE_NAME).with_job_options(
        JobOptions {
            max_attempts: settings.queue_attempts,
            ..JobOptions::default()
        },
    );
    let queue = Queue::connect(queue_config).await?;

    let analytics = Arc::new(AnalyticsClient::new(
        &settings.remote_base_url,
        settings.is_production(),
    )?);
    let mailer = Arc::new(NotificationGateway::new(NotificationConfig {
        api_url: settings.notification_api_url.clone(),
        token: settings.api_gateway_token.clone(),
        from: settings.email_from.clone(),
        team_tag: settings.email_team_tag.clone(),
        product_tag: settings.email_product_tag.clone(),
    })?);

    let processor = Arc::new(ReportProcessor::new(
        registry.clone(),
        analytics.clone(),
        Arc::new(ManifestBytesWriter),
        mailer,
        DEFAULT_FETCH_CONCURRENCY,
    ));

    let mut worker = Worker::new(
        queue.clone(),
        processor,
        WorkerConfig {
            concurrency: settings.queue_concurrency,
            ..WorkerConfig::default()
        },
    );
    worker.start();

    let services = Arc::new(AppServices {
        queue: queue.clone(),
        registry,
        worker_running: worker.running_flag(),
        worker_concurrency: settings.queue_concurrency,
        max_attempts: settings.queue_attempts,
    });

    let router = app::build_app(services);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", settings.port)).await?;
    info!(port = settings.port, "listening");

    // Shutdown ordering: stop accepting HTTP, then drain the worker.
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let drained = worker.shutdown(DRAIN_TIMEOUT).await;
    analytics.sign_out_all().await;
    if !drained {
        std::process::exit(1);
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received, stopping HTTP listener");
}
