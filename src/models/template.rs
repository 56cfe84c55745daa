use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::notification::NotificationType;

/// A reusable subject/body pair with `{key}` placeholders. Looked up by
/// `(name, notification_type)`; read-only to the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationTemplate {
    pub name: String,
    pub notification_type: NotificationType,
    pub subject: String,
    pub body: String,
}

impl NotificationTemplate {
    pub fn new(
        name: impl Into<String>,
        notification_type: NotificationType,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            notification_type,
            subject: subject.into(),
            body: body.into(),
        }
    }

    /// Renders subject and body against the parameter map.
    pub fn render(&self, parameters: &HashMap<String, String>) -> (String, String) {
        (
            substitute_placeholders(&self.subject, parameters),
            substitute_placeholders(&self.body, parameters),
        )
    }
}

/// Replaces every `{key}` whose key exists in the map. Placeholders with no
/// matching key stay literal; parameters never referenced are ignored.
pub fn substitute_placeholders(pattern: &str, parameters: &HashMap<String, String>) -> String {
    let mut rendered = String::with_capacity(pattern.len());
    let mut rest = pattern;

    while let Some(open) = rest.find('{') {
        rendered.push_str(&rest[..open]);
        let tail = &rest[open..];

        match tail[1..].find('}') {
            Some(close) => {
                let key = &tail[1..1 + close];
                match parameters.get(key) {
                    Some(value) => rendered.push_str(value),
                    None => rendered.push_str(&tail[..close + 2]),
                }
                rest = &tail[close + 2..];
            }
            None => {
                // Unterminated placeholder, keep the remainder as-is.
                rendered.push_str(tail);
                rest = "";
                break;
            }
        }
    }

    rendered.push_str(rest);
    rendered
}
