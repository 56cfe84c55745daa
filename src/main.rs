use std::sync::Arc;
use std::time::Duration;

use anyhow::{Error, Result};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use notify_service::api::{AppState, run_api_server};
use notify_service::clients::database::PostgresDeadLetterStore;
use notify_service::clients::mailer::MailerClient;
use notify_service::clients::rbmq::RabbitMqClient;
use notify_service::config::Config;
use notify_service::dead_letter::DeadLetterService;
use notify_service::dispatcher::NotificationService;
use notify_service::models::notification::NotificationType;
use notify_service::models::template::NotificationTemplate;
use notify_service::processor::{DispatchScope, NotificationQueueProcessor, ScopeFactory};
use notify_service::queue::PriorityNotificationQueue;
use notify_service::retry::RetryService;
use notify_service::senders::NotificationSender;
use notify_service::senders::email::EmailSender;
use notify_service::senders::web_push::{PushHub, WebPushSender};
use notify_service::templates::TemplateStore;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::load()?;

    let store = Arc::new(PostgresDeadLetterStore::connect(&config.database_url).await?);
    let dead_letters = DeadLetterService::new(store.clone());

    let templates = Arc::new(TemplateStore::with_templates(default_templates()));
    let mailer = MailerClient::new(config.mailer_url.clone(), config.mailer_from.clone())?;
    let push_hub = PushHub::new();
    let queue = Arc::new(PriorityNotificationQueue::new());

    // Fresh dispatcher and dead-letter service per dequeued message; the
    // captured inputs (templates, transports, store handle) are read-only.
    let scope_factory: ScopeFactory = {
        let templates = Arc::clone(&templates);
        let retry_config = config.retry_config();
        let mailer = mailer.clone();
        let push_hub = push_hub.clone();
        let store = Arc::clone(&store);

        Arc::new(move || {
            let senders: Vec<Arc<dyn NotificationSender>> = vec![
                Arc::new(EmailSender::new(
                    mailer.clone(),
                    RetryService::new(retry_config.clone()),
                )),
                Arc::new(WebPushSender::new(push_hub.clone())),
            ];

            DispatchScope {
                dispatcher: NotificationService::new(senders, Arc::clone(&templates)),
                dead_letters: DeadLetterService::new(store.clone()),
            }
        })
    };

    let shutdown = CancellationToken::new();

    let mut processor = NotificationQueueProcessor::new(
        Arc::clone(&queue),
        scope_factory,
        Duration::from_millis(config.processing_interval_ms),
        config.notifications_queue_name.clone(),
    );
    processor.start(&shutdown);

    let rabbitmq = RabbitMqClient::connect(&config).await?;
    let consumer = rabbitmq.create_consumer().await?;

    let ingest_handle = tokio::spawn({
        let queue = Arc::clone(&queue);
        let dead_letters = dead_letters.clone();
        let token = shutdown.child_token();
        async move {
            rabbitmq
                .run_ingest_loop(consumer, queue, dead_letters, token)
                .await;
        }
    });

    let state = Arc::new(AppState {
        queue: Arc::clone(&queue),
        dead_letters,
    });
    let api_handle = tokio::spawn(run_api_server(state, config.server_port));

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    shutdown.cancel();
    processor.stop().await;

    if let Err(e) = ingest_handle.await {
        error!(error = %e, "Ingestion task terminated abnormally");
    }
    api_handle.abort();

    info!("Shutdown complete");
    Ok(())
}

fn default_templates() -> Vec<NotificationTemplate> {
    vec![
        NotificationTemplate::new(
            "vitals-alert",
            NotificationType::Email,
            "Patient alert: {patient}",
            "Vital sign {metric} for patient {patient} reported {value}. Severity: {severity}.",
        ),
        NotificationTemplate::new(
            "vitals-alert",
            NotificationType::WebPush,
            "{patient}: {metric} out of range",
            "{metric} = {value} (severity {severity})",
        ),
        NotificationTemplate::new(
            "device-offline",
            NotificationType::Email,
            "Device {device} is offline",
            "Monitoring device {device} assigned to {patient} stopped reporting at {last_seen}.",
        ),
    ]
}
