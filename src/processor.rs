use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::dead_letter::DeadLetterService;
use crate::dispatcher::NotificationService;
use crate::models::notification::NotificationRequest;
use crate::queue::PriorityNotificationQueue;

const PROCESSOR_SOURCE: &str = "notification-queue-processor";

/// Everything one dequeued message needs, built fresh per message so no
/// mutable state is shared across dispatches.
pub struct DispatchScope {
    pub dispatcher: NotificationService,
    pub dead_letters: DeadLetterService,
}

pub type ScopeFactory = Arc<dyn Fn() -> DispatchScope + Send + Sync>;

/// Background drain loop: poll the queue, dispatch each hit in its own
/// scope, dead-letter terminal failures, sleep the poll interval when idle.
/// One message failing never stops the loop.
pub struct NotificationQueueProcessor {
    queue: Arc<PriorityNotificationQueue>,
    scope_factory: ScopeFactory,
    poll_interval: Duration,
    source_topic: String,
    worker: Option<(CancellationToken, JoinHandle<()>)>,
}

impl NotificationQueueProcessor {
    pub fn new(
        queue: Arc<PriorityNotificationQueue>,
        scope_factory: ScopeFactory,
        poll_interval: Duration,
        source_topic: impl Into<String>,
    ) -> Self {
        Self {
            queue,
            scope_factory,
            poll_interval,
            source_topic: source_topic.into(),
            worker: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Spawns the drain loop. The loop observes a child of `shutdown`, so
    /// either an external shutdown or [`stop`](Self::stop) ends it.
    pub fn start(&mut self, shutdown: &CancellationToken) {
        if self.worker.is_some() {
            warn!("Queue processor already running, ignoring start");
            return;
        }

        let token = shutdown.child_token();
        let handle = tokio::spawn(run_loop(
            Arc::clone(&self.queue),
            Arc::clone(&self.scope_factory),
            self.poll_interval,
            self.source_topic.clone(),
            token.clone(),
        ));

        self.worker = Some((token, handle));
    }

    /// Signals cancellation and awaits loop termination.
    pub async fn stop(&mut self) {
        let Some((token, handle)) = self.worker.take() else {
            return;
        };

        token.cancel();

        if let Err(e) = handle.await {
            error!(error = %e, "Queue processor task terminated abnormally");
        }
    }
}

async fn run_loop(
    queue: Arc<PriorityNotificationQueue>,
    scope_factory: ScopeFactory,
    poll_interval: Duration,
    source_topic: String,
    token: CancellationToken,
) {
    info!("Notification queue processor started");

    loop {
        if token.is_cancelled() {
            break;
        }

        match queue.try_dequeue() {
            Some(request) => {
                process_one(&scope_factory, request, &source_topic, &token).await;
            }
            None => {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = sleep(poll_interval) => {}
                }
            }
        }
    }

    info!("Notification queue processor stopped");
}

async fn process_one(
    scope_factory: &ScopeFactory,
    request: NotificationRequest,
    source_topic: &str,
    token: &CancellationToken,
) {
    let scope = (scope_factory)();

    let dispatched = AssertUnwindSafe(scope.dispatcher.send_notification(&request, token))
        .catch_unwind()
        .await;

    let error_reason = match dispatched {
        Ok(Ok(result)) if result.success => return,
        Ok(Ok(result)) => result
            .error_message
            .unwrap_or_else(|| "Delivery failed with no error detail".to_string()),
        Ok(Err(_cancelled)) => {
            // Shutdown interrupted the dispatch before any failure decision
            // was made; nothing to dead-letter.
            warn!(
                notification_type = %request.notification_type,
                "Dispatch cancelled by shutdown, message dropped"
            );
            return;
        }
        Err(panic) => {
            let detail = panic
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            error!(panic = %detail, "Dispatch panicked");
            format!("Dispatch panicked: {detail}")
        }
    };

    let payload = match serde_json::to_string(&request) {
        Ok(json) => json,
        Err(e) => {
            warn!(error = %e, "Failed to serialize request for dead letter");
            format!("{request:?}")
        }
    };

    // The failure decision is already made; shutdown must not skip this.
    if let Err(e) = scope
        .dead_letters
        .publish(source_topic, &payload, &error_reason, PROCESSOR_SOURCE)
        .await
    {
        error!(error = %e, "Failed to publish dead letter");
    }
}
