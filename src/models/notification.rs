use std::collections::HashMap;
use std::fmt::{Display, Formatter, Result};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    Email,
    Sms,
    WebPush,
}

impl Display for NotificationType {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            NotificationType::Email => write!(f, "email"),
            NotificationType::Sms => write!(f, "sms"),
            NotificationType::WebPush => write!(f, "webpush"),
        }
    }
}

/// Discrete delivery tiers. Derived `Ord` follows declaration order,
/// so `Low < Normal < High < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Normal,
    High,
    Critical,
}

impl Priority {
    /// All tiers, highest first. Drain order for the queue.
    pub const DESCENDING: [Priority; 4] = [
        Priority::Critical,
        Priority::High,
        Priority::Normal,
        Priority::Low,
    ];

    pub fn bucket_index(self) -> usize {
        match self {
            Priority::Low => 0,
            Priority::Normal => 1,
            Priority::High => 2,
            Priority::Critical => 3,
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Normal
    }
}

/// A single delivery order. Built once by the ingestion adapter and
/// moved by value through the pipeline; nothing mutates it after enqueue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRequest {
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub recipient: String,
    pub subject: String,
    pub body: String,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default)]
    pub template_name: Option<String>,

    #[serde(default)]
    pub template_parameters: HashMap<String, String>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl NotificationRequest {
    pub fn new(
        notification_type: NotificationType,
        recipient: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
        priority: Priority,
    ) -> Self {
        Self {
            notification_type,
            recipient: recipient.into(),
            subject: subject.into(),
            body: body.into(),
            priority,
            template_name: None,
            template_parameters: HashMap::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_template(
        mut self,
        name: impl Into<String>,
        parameters: HashMap<String, String>,
    ) -> Self {
        self.template_name = Some(name.into());
        self.template_parameters = parameters;
        self
    }
}

/// Outcome of one dispatch. The dispatcher always returns this instead of
/// raising, so the processor loop stays alive whatever a sender does.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationResult {
    pub success: bool,
    pub error_message: Option<String>,
}

impl NotificationResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            error_message: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error_message: Some(error.into()),
        }
    }
}
