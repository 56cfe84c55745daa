use anyhow::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::models::notification::NotificationType;
use crate::senders::NotificationSender;

const HUB_CAPACITY: usize = 256;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushEvent {
    pub subject: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}

/// Fan-out point for connected real-time clients. The websocket layer
/// subscribes; the sender publishes.
#[derive(Clone)]
pub struct PushHub {
    events: broadcast::Sender<PushEvent>,
}

impl PushHub {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(HUB_CAPACITY);
        Self { events }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PushEvent> {
        self.events.subscribe()
    }

    pub fn connected_clients(&self) -> usize {
        self.events.receiver_count()
    }

    /// Broadcasting with zero connected clients is a successful no-op.
    fn publish(&self, event: PushEvent) -> usize {
        self.events.send(event).unwrap_or(0)
    }
}

impl Default for PushHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Web push channel. The `recipient` argument is not used for targeting:
/// the event fans out to every connected client.
// TODO: per-recipient targeting once client sessions carry an identity.
pub struct WebPushSender {
    hub: PushHub,
}

impl WebPushSender {
    pub fn new(hub: PushHub) -> Self {
        Self { hub }
    }
}

#[async_trait]
impl NotificationSender for WebPushSender {
    fn notification_type(&self) -> NotificationType {
        NotificationType::WebPush
    }

    async fn send(
        &self,
        _recipient: &str,
        subject: &str,
        body: &str,
        _cancel: &CancellationToken,
    ) -> Result<(), Error> {
        let delivered_to = self.hub.publish(PushEvent {
            subject: subject.to_string(),
            body: body.to_string(),
            sent_at: Utc::now(),
        });

        debug!(delivered_to, "Web push broadcast to all connected clients");
        Ok(())
    }
}
