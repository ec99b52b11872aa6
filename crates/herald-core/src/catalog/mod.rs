//! Static YAML catalogs of rules and notifications.
//!
//! Both are parsed once and served from memory. Any parse failure is a
//! configuration error naming the offending list index.

mod notifications;
mod rules;

pub use notifications::StaticNotificationCatalog;
pub use rules::StaticRuleCatalog;

use std::path::Path;

use crate::error::{HeraldError, HeraldResult};

fn read_document(path: &Path) -> HeraldResult<String> {
    if !path.exists() {
        return Err(HeraldError::Configuration(format!(
            "catalog file not found: {}",
            path.display()
        )));
    }
    Ok(std::fs::read_to_string(path)?)
}

/// Extract the list under `key` from a YAML document.
fn document_list(yaml: &str, key: &str) -> HeraldResult<Vec<serde_yaml::Value>> {
    let document: serde_yaml::Value = serde_yaml::from_str(yaml)?;
    match document.get(key) {
        Some(serde_yaml::Value::Sequence(items)) => Ok(items.clone()),
        Some(_) => Err(HeraldError::Configuration(format!("'{}' must be a list", key))),
        None => Err(HeraldError::Configuration(format!(
            "document must contain a '{}' list",
            key
        ))),
    }
}
