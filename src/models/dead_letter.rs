use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A delivery whose attempts are exhausted, parked for operator review.
/// `is_processed` only ever moves false -> true.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetterMessage {
    pub id: Uuid,
    pub original_topic: String,
    pub payload: String,
    pub error_reason: String,
    pub received_from: String,
    pub created_at: DateTime<Utc>,
    pub is_processed: bool,
    pub processed_at: Option<DateTime<Utc>>,
}

impl DeadLetterMessage {
    pub fn new(
        original_topic: impl Into<String>,
        payload: impl Into<String>,
        error_reason: impl Into<String>,
        received_from: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            original_topic: original_topic.into(),
            payload: payload.into(),
            error_reason: error_reason.into(),
            received_from: received_from.into(),
            created_at: Utc::now(),
            is_processed: false,
            processed_at: None,
        }
    }
}
