use std::sync::{Arc, Mutex};

use anyhow::{Error, Result, anyhow};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use notify_service::models::notification::NotificationType;
use notify_service::senders::NotificationSender;

#[derive(Debug, Clone)]
pub struct RecordedSend {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

/// Test double for a delivery channel: records every invocation and can be
/// told to fail or panic instead of succeeding.
pub struct RecordingSender {
    notification_type: NotificationType,
    calls: Arc<Mutex<Vec<RecordedSend>>>,
    fail_with: Option<String>,
    panic_with: Option<String>,
}

impl RecordingSender {
    pub fn new(notification_type: NotificationType) -> Self {
        Self {
            notification_type,
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_with: None,
            panic_with: None,
        }
    }

    pub fn failing(notification_type: NotificationType, error: &str) -> Self {
        let mut sender = Self::new(notification_type);
        sender.fail_with = Some(error.to_string());
        sender
    }

    pub fn panicking(notification_type: NotificationType, message: &str) -> Self {
        let mut sender = Self::new(notification_type);
        sender.panic_with = Some(message.to_string());
        sender
    }

    /// Shares one call log across per-message sender instances, so tests of
    /// the fresh-scope processor can still observe every invocation.
    pub fn with_shared_log(
        notification_type: NotificationType,
        calls: Arc<Mutex<Vec<RecordedSend>>>,
    ) -> Self {
        Self {
            notification_type,
            calls,
            fail_with: None,
            panic_with: None,
        }
    }

    pub fn call_log(&self) -> Arc<Mutex<Vec<RecordedSend>>> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl NotificationSender for RecordingSender {
    fn notification_type(&self) -> NotificationType {
        self.notification_type
    }

    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
        _cancel: &CancellationToken,
    ) -> Result<(), Error> {
        if let Some(message) = &self.panic_with {
            panic!("{}", message.clone());
        }

        self.calls.lock().unwrap().push(RecordedSend {
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });

        match &self.fail_with {
            Some(error) => Err(anyhow!("{error}")),
            None => Ok(()),
        }
    }
}
