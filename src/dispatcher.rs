use std::collections::HashMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::models::notification::{NotificationRequest, NotificationResult, NotificationType};
use crate::retry::RetryError;
use crate::senders::NotificationSender;
use crate::templates::TemplateStore;

/// Raised only when shutdown interrupts an in-flight dispatch. Every other
/// failure mode is folded into a [`NotificationResult`].
#[derive(Debug, thiserror::Error)]
#[error("Dispatch was cancelled")]
pub struct DispatchCancelled;

/// Resolves the sender for a request, applies its template if one is named,
/// and invokes the channel. Failure paths produce a result value and have no
/// side effect beyond logging; dead-lettering is the processor's decision.
pub struct NotificationService {
    senders: HashMap<NotificationType, Arc<dyn NotificationSender>>,
    templates: Arc<TemplateStore>,
}

impl NotificationService {
    /// The sender map is keyed by the channel discriminator once at
    /// construction, so dispatch lookup is O(1) with an explicit
    /// not-found branch.
    pub fn new(
        senders: impl IntoIterator<Item = Arc<dyn NotificationSender>>,
        templates: Arc<TemplateStore>,
    ) -> Self {
        let senders = senders
            .into_iter()
            .map(|sender| (sender.notification_type(), sender))
            .collect();

        Self { senders, templates }
    }

    pub async fn send_notification(
        &self,
        request: &NotificationRequest,
        cancel: &CancellationToken,
    ) -> Result<NotificationResult, DispatchCancelled> {
        if cancel.is_cancelled() {
            return Err(DispatchCancelled);
        }

        let Some(sender) = self.senders.get(&request.notification_type) else {
            warn!(
                notification_type = %request.notification_type,
                "No sender registered for notification type"
            );
            return Ok(NotificationResult::failure(format!(
                "No sender registered for notification type '{}'",
                request.notification_type
            )));
        };

        let (subject, body) = match &request.template_name {
            Some(template_name) => {
                let Some(template) = self
                    .templates
                    .get(template_name, request.notification_type)
                else {
                    warn!(
                        template_name = %template_name,
                        notification_type = %request.notification_type,
                        "Template not found, sender will not be invoked"
                    );
                    return Ok(NotificationResult::failure(format!(
                        "Template '{}' not found for notification type '{}'",
                        template_name, request.notification_type
                    )));
                };

                debug!(template_name = %template_name, "Rendering template");
                template.render(&request.template_parameters)
            }
            None => (request.subject.clone(), request.body.clone()),
        };

        match sender.send(&request.recipient, &subject, &body, cancel).await {
            Ok(()) => {
                info!(
                    notification_type = %request.notification_type,
                    recipient = %request.recipient,
                    "Notification dispatched"
                );
                Ok(NotificationResult::ok())
            }
            Err(e) => {
                if e.downcast_ref::<RetryError>()
                    .is_some_and(RetryError::is_cancelled)
                {
                    return Err(DispatchCancelled);
                }

                warn!(
                    notification_type = %request.notification_type,
                    recipient = %request.recipient,
                    error = %e,
                    "Notification delivery failed"
                );
                Ok(NotificationResult::failure(e.to_string()))
            }
        }
    }
}
