pub mod email;
pub mod web_push;

use anyhow::{Error, Result};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::models::notification::NotificationType;

/// A delivery channel. Adding a channel means implementing this trait and
/// handing the instance to the dispatcher; nothing else changes.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    fn notification_type(&self) -> NotificationType;

    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
        cancel: &CancellationToken,
    ) -> Result<(), Error>;
}
