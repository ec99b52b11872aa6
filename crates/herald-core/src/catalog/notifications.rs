//! Notification catalog loaded from a YAML document with a top-level
//! `notifications:` list.

use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use tracing::info;

use crate::catalog::{document_list, read_document};
use crate::error::{HeraldError, HeraldResult};
use crate::traits::NotificationCatalog;
use crate::types::Notification;

#[derive(Debug, Clone, Default)]
pub struct StaticNotificationCatalog {
    notifications: Vec<Notification>,
}

impl StaticNotificationCatalog {
    /// Load notifications from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> HeraldResult<Self> {
        let path = path.as_ref();
        let catalog = Self::from_yaml_str(&read_document(path)?)?;
        info!(
            path = %path.display(),
            notifications = catalog.notifications.len(),
            "Loaded notification catalog"
        );
        Ok(catalog)
    }

    /// Parse notifications from YAML text. Types must be unique.
    pub fn from_yaml_str(yaml: &str) -> HeraldResult<Self> {
        let mut seen = HashSet::new();
        let mut notifications = Vec::new();

        for (idx, item) in document_list(yaml, "notifications")?.into_iter().enumerate() {
            let notification: Notification = serde_yaml::from_value(item).map_err(|e| {
                HeraldError::Configuration(format!("Invalid notification at index {}: {}", idx, e))
            })?;

            if !seen.insert(notification.notification_type.clone()) {
                return Err(HeraldError::Configuration(format!(
                    "Invalid notification at index {}: duplicate type {}",
                    idx, notification.notification_type
                )));
            }
            notifications.push(notification);
        }

        Ok(Self { notifications })
    }

    pub fn get_by_type(&self, notification_type: &str) -> Option<&Notification> {
        self.notifications
            .iter()
            .find(|n| n.notification_type == notification_type)
    }

    pub fn len(&self) -> usize {
        self.notifications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifications.is_empty()
    }
}

#[async_trait]
impl NotificationCatalog for StaticNotificationCatalog {
    async fn get_all(&self) -> HeraldResult<Vec<Notification>> {
        Ok(self.notifications.clone())
    }
}
