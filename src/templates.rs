use std::collections::HashMap;

use tracing::debug;

use crate::models::notification::NotificationType;
use crate::models::template::NotificationTemplate;

/// Read-only template lookup keyed by `(name, type)`. Populated once at
/// startup; the dispatcher only ever reads it.
pub struct TemplateStore {
    templates: HashMap<(String, NotificationType), NotificationTemplate>,
}

impl TemplateStore {
    pub fn new() -> Self {
        Self {
            templates: HashMap::new(),
        }
    }

    pub fn with_templates(templates: impl IntoIterator<Item = NotificationTemplate>) -> Self {
        let mut store = Self::new();
        for template in templates {
            store.insert(template);
        }
        store
    }

    pub fn insert(&mut self, template: NotificationTemplate) {
        debug!(
            name = %template.name,
            notification_type = %template.notification_type,
            "Template registered"
        );
        self.templates.insert(
            (template.name.clone(), template.notification_type),
            template,
        );
    }

    pub fn get(
        &self,
        name: &str,
        notification_type: NotificationType,
    ) -> Option<&NotificationTemplate> {
        self.templates
            .get(&(name.to_string(), notification_type))
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl Default for TemplateStore {
    fn default() -> Self {
        Self::new()
    }
}
