use anyhow::{Error, Result};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::clients::mailer::MailerClient;
use crate::models::notification::NotificationType;
use crate::retry::RetryService;
use crate::senders::NotificationSender;

/// Email channel: every submission to the mail gateway goes through the
/// retry executor, tagged with the recipient for diagnostics.
pub struct EmailSender {
    mailer: MailerClient,
    retry: RetryService,
}

impl EmailSender {
    pub fn new(mailer: MailerClient, retry: RetryService) -> Self {
        Self { mailer, retry }
    }
}

#[async_trait]
impl NotificationSender for EmailSender {
    fn notification_type(&self) -> NotificationType {
        NotificationType::Email
    }

    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
        cancel: &CancellationToken,
    ) -> Result<(), Error> {
        let operation_name = format!("send email to {recipient}");

        self.retry
            .execute_with_retry(&operation_name, cancel, || {
                self.mailer.send_email(recipient, subject, body)
            })
            .await?;

        info!(recipient, "Email notification sent");
        Ok(())
    }
}
