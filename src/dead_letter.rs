use std::sync::{Arc, Mutex};

use anyhow::Error;
use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::dead_letter::DeadLetterMessage;

#[derive(Debug, thiserror::Error)]
pub enum DeadLetterError {
    #[error("Dead letter {0} not found")]
    NotFound(Uuid),

    #[error("Dead letter store failure: {0}")]
    Store(Error),
}

/// Persistence contract for exhausted deliveries. The Postgres variant lives
/// in `clients::database`; the in-memory variant backs tests and local runs.
#[async_trait]
pub trait DeadLetterStore: Send + Sync {
    async fn insert(&self, message: DeadLetterMessage) -> Result<(), DeadLetterError>;

    async fn all(&self) -> Result<Vec<DeadLetterMessage>, DeadLetterError>;

    async fn unprocessed(&self) -> Result<Vec<DeadLetterMessage>, DeadLetterError>;

    /// Flips `is_processed` and stamps `processed_at`, returning the updated
    /// record. Re-processing is idempotent: the flag never reverts and the
    /// original timestamp is kept. Unknown ids report `NotFound`.
    async fn mark_processed(&self, id: Uuid) -> Result<DeadLetterMessage, DeadLetterError>;
}

/// Facade over a [`DeadLetterStore`]. Publishing builds the record and
/// hands it to the store once; store failures propagate to the caller
/// rather than being retried here.
#[derive(Clone)]
pub struct DeadLetterService {
    store: Arc<dyn DeadLetterStore>,
}

impl DeadLetterService {
    pub fn new(store: Arc<dyn DeadLetterStore>) -> Self {
        Self { store }
    }

    pub async fn publish(
        &self,
        topic: &str,
        payload: &str,
        error_reason: &str,
        received_from: &str,
    ) -> Result<DeadLetterMessage, DeadLetterError> {
        let message = DeadLetterMessage::new(topic, payload, error_reason, received_from);

        warn!(
            id = %message.id,
            topic,
            received_from,
            error_reason,
            "Publishing message to dead letter store"
        );

        self.store.insert(message.clone()).await?;
        Ok(message)
    }

    pub async fn all(&self) -> Result<Vec<DeadLetterMessage>, DeadLetterError> {
        self.store.all().await
    }

    pub async fn unprocessed(&self) -> Result<Vec<DeadLetterMessage>, DeadLetterError> {
        self.store.unprocessed().await
    }

    pub async fn process(&self, id: Uuid) -> Result<DeadLetterMessage, DeadLetterError> {
        let processed = self.store.mark_processed(id).await?;

        info!(%id, "Dead letter marked as processed");
        Ok(processed)
    }
}

/// Lock-protected vector store. Ordering of `all()` follows insertion order.
pub struct InMemoryDeadLetterStore {
    messages: Mutex<Vec<DeadLetterMessage>>,
}

impl InMemoryDeadLetterStore {
    pub fn new() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
        }
    }
}

impl Default for InMemoryDeadLetterStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeadLetterStore for InMemoryDeadLetterStore {
    async fn insert(&self, message: DeadLetterMessage) -> Result<(), DeadLetterError> {
        let mut messages = self
            .messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        messages.push(message);
        Ok(())
    }

    async fn all(&self) -> Result<Vec<DeadLetterMessage>, DeadLetterError> {
        let messages = self
            .messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(messages.clone())
    }

    async fn unprocessed(&self) -> Result<Vec<DeadLetterMessage>, DeadLetterError> {
        let messages = self
            .messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(messages
            .iter()
            .filter(|m| !m.is_processed)
            .cloned()
            .collect())
    }

    async fn mark_processed(&self, id: Uuid) -> Result<DeadLetterMessage, DeadLetterError> {
        let mut messages = self
            .messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let message = messages
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(DeadLetterError::NotFound(id))?;

        if !message.is_processed {
            message.is_processed = true;
            message.processed_at = Some(Utc::now());
        }

        Ok(message.clone())
    }
}
