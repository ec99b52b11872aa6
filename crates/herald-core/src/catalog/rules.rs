//! Rule catalog loaded from a YAML document with a top-level `rules:` list.

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::Duration;
use serde::Deserialize;
use tracing::info;

use crate::catalog::{document_list, read_document};
use crate::error::{HeraldError, HeraldResult};
use crate::rules::debounce::eternity;
use crate::traits::RuleCatalog;
use crate::types::{
    EventCondition, EventLogic, EventProximity, LogicOperator, NotificationRule, PropertyMatch,
    PropertyOperator,
};

#[derive(Debug, Deserialize)]
struct RawRule {
    notification_type: String,
    event_type: String,
    #[serde(default)]
    event_conditions: Vec<RawCondition>,
    delay_seconds: Option<i64>,
    #[serde(default)]
    recheck: bool,
    debounce_period_seconds: Option<i64>,
    debounce_limit: Option<u32>,
    #[serde(default)]
    debounce_calendar_day: bool,
}

#[derive(Debug, Deserialize)]
struct RawCondition {
    property_match: Option<RawPropertyMatch>,
    event_proximity: Option<RawProximity>,
    event_logic: Option<RawLogic>,
}

#[derive(Debug, Deserialize)]
struct RawPropertyMatch {
    property_xpath: String,
    value: serde_json::Value,
    operator: String,
}

#[derive(Debug, Deserialize)]
struct RawProximity {
    event_type: String,
    time_proximity_seconds: Option<i64>,
    #[serde(default)]
    event_conditions: Vec<RawCondition>,
}

#[derive(Debug, Deserialize)]
struct RawLogic {
    logic: String,
    #[serde(default)]
    event_conditions: Vec<RawCondition>,
}

/// Rules held in memory after a one-time parse.
#[derive(Debug, Clone, Default)]
pub struct StaticRuleCatalog {
    rules: Vec<NotificationRule>,
}

impl StaticRuleCatalog {
    /// Load rules from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> HeraldResult<Self> {
        let path = path.as_ref();
        let catalog = Self::from_yaml_str(&read_document(path)?)?;
        info!(path = %path.display(), rules = catalog.rules.len(), "Loaded notification rules");
        Ok(catalog)
    }

    /// Parse rules from YAML text.
    pub fn from_yaml_str(yaml: &str) -> HeraldResult<Self> {
        let items = document_list(yaml, "rules")?;
        let rules = items
            .into_iter()
            .enumerate()
            .map(|(idx, item)| {
                serde_yaml::from_value::<RawRule>(item)
                    .map_err(|e| e.to_string())
                    .and_then(convert_rule)
                    .map_err(|e| HeraldError::Configuration(format!("Invalid rule at index {}: {}", idx, e)))
            })
            .collect::<HeraldResult<Vec<_>>>()?;

        Ok(Self { rules })
    }

    pub fn from_rules(rules: Vec<NotificationRule>) -> Self {
        Self { rules }
    }

    /// Rules triggered by `event_type`, in declaration order.
    pub fn get_by_event_type(&self, event_type: &str) -> Vec<NotificationRule> {
        self.rules
            .iter()
            .filter(|r| r.event_type == event_type)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[async_trait]
impl RuleCatalog for StaticRuleCatalog {
    async fn get_all(&self) -> HeraldResult<Vec<NotificationRule>> {
        Ok(self.rules.clone())
    }
}

/// Zero means "unset". Negative values and values longer than the
/// eternity lookback are rejected.
fn seconds(field: &str, value: Option<i64>) -> Result<Option<Duration>, String> {
    let max = eternity().num_seconds();
    match value {
        None | Some(0) => Ok(None),
        Some(s) if s < 0 => Err(format!("{} must not be negative, got {}", field, s)),
        Some(s) if s > max => Err(format!("{} must be at most {}, got {}", field, max, s)),
        Some(s) => Ok(Some(Duration::seconds(s))),
    }
}

fn convert_rule(raw: RawRule) -> Result<NotificationRule, String> {
    if raw.debounce_limit == Some(0) {
        return Err("debounce_limit must be at least 1".to_string());
    }

    Ok(NotificationRule {
        notification_type: raw.notification_type,
        event_type: raw.event_type,
        event_conditions: convert_conditions(raw.event_conditions)?,
        delay: seconds("delay_seconds", raw.delay_seconds)?,
        recheck: raw.recheck,
        debounce_period: seconds("debounce_period_seconds", raw.debounce_period_seconds)?,
        debounce_limit: raw.debounce_limit,
        debounce_calendar_day: raw.debounce_calendar_day,
    })
}

fn convert_conditions(raw: Vec<RawCondition>) -> Result<Vec<EventCondition>, String> {
    raw.into_iter().map(convert_condition).collect()
}

fn convert_condition(raw: RawCondition) -> Result<EventCondition, String> {
    let property_match = raw
        .property_match
        .map(|pm| {
            let operator = PropertyOperator::from_str(&pm.operator)
                .map_err(|_| format!("unknown property operator '{}'", pm.operator))?;
            Ok::<_, String>(PropertyMatch {
                property_xpath: pm.property_xpath,
                value: pm.value,
                operator,
            })
        })
        .transpose()?;

    let event_proximity = raw
        .event_proximity
        .map(|ep| {
            Ok::<_, String>(EventProximity {
                event_type: ep.event_type,
                time_proximity: seconds("time_proximity_seconds", ep.time_proximity_seconds)?,
                event_conditions: convert_conditions(ep.event_conditions)?,
            })
        })
        .transpose()?;

    let event_logic = raw
        .event_logic
        .map(|el| {
            let logic = LogicOperator::from_str(&el.logic)
                .map_err(|_| format!("unknown logic operator '{}'", el.logic))?;
            Ok::<_, String>(EventLogic {
                logic,
                event_conditions: convert_conditions(el.event_conditions)?,
            })
        })
        .transpose()?;

    Ok(EventCondition {
        property_match,
        event_proximity,
        event_logic,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const RULES: &str = r#"
rules:
  - notification_type: INSUFFICIENT_FUNDS_EMAIL
    event_type: payment_failed
    event_conditions:
      - property_match:
          property_xpath: properties.failure_reason
          value: INSUFFICIENT_FUNDS
          operator: eq
    debounce_limit: 1
    debounce_period_seconds: 86400
    debounce_calendar_day: true
  - notification_type: HIGH_RISK_ALERT
    event_type: payment_failed
    event_conditions:
      - property_match:
          property_xpath: properties.attempt_number
          value: 3
          operator: GTE
  - notification_type: BANK_LINK_NUDGE_SMS
    event_type: link_bank_success
    delay_seconds: 0
    event_conditions:
      - event_proximity:
          event_type: signup_completed
          time_proximity_seconds: 604800
      - event_logic:
          logic: and
          event_conditions:
            - {}
"#;

    #[test]
    fn test_parse_rules() {
        let catalog = StaticRuleCatalog::from_yaml_str(RULES).unwrap();
        assert_eq!(catalog.len(), 3);

        let payment = catalog.get_by_event_type("payment_failed");
        assert_eq!(payment.len(), 2);
        assert_eq!(payment[0].notification_type, "INSUFFICIENT_FUNDS_EMAIL");
        assert_eq!(payment[0].debounce_limit, Some(1));
        assert_eq!(payment[0].debounce_period, Some(Duration::days(1)));
        assert!(payment[0].debounce_calendar_day);

        let pm = payment[0].event_conditions[0].property_match.as_ref().unwrap();
        assert_eq!(pm.operator, PropertyOperator::Eq);
        assert_eq!(pm.value, json!("INSUFFICIENT_FUNDS"));

        let pm = payment[1].event_conditions[0].property_match.as_ref().unwrap();
        assert_eq!(pm.operator, PropertyOperator::Gte);
        assert_eq!(pm.value, json!(3));
        assert!(payment[1].debounce_limit.is_none());
    }

    #[test]
    fn test_parse_proximity_and_logic() {
        let catalog = StaticRuleCatalog::from_yaml_str(RULES).unwrap();
        let rule = &catalog.get_by_event_type("link_bank_success")[0];

        assert!(rule.delay.is_none());
        let proximity = rule.event_conditions[0].event_proximity.as_ref().unwrap();
        assert_eq!(proximity.event_type, "signup_completed");
        assert_eq!(proximity.time_proximity, Some(Duration::days(7)));

        let logic = rule.event_conditions[1].event_logic.as_ref().unwrap();
        assert_eq!(logic.logic, LogicOperator::And);
        assert!(logic.event_conditions[0].is_empty());
    }

    #[test]
    fn test_get_all_returns_declaration_order() {
        let catalog = StaticRuleCatalog::from_yaml_str(RULES).unwrap();
        let rules = tokio_test::block_on(catalog.get_all()).unwrap();
        let types: Vec<_> = rules.iter().map(|r| r.notification_type.as_str()).collect();
        assert_eq!(types, vec!["INSUFFICIENT_FUNDS_EMAIL", "HIGH_RISK_ALERT", "BANK_LINK_NUDGE_SMS"]);
    }

    #[test]
    fn test_invalid_rule_names_index() {
        let yaml = r#"
rules:
  - notification_type: A
    event_type: a
  - notification_type: B
    event_type: b
    event_conditions:
      - property_match:
          property_xpath: properties.x
          value: 1
          operator: BETWEEN
"#;
        let err = StaticRuleCatalog::from_yaml_str(yaml).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("index 1"), "{message}");
        assert!(message.contains("BETWEEN"), "{message}");
    }

    #[test]
    fn test_missing_required_key() {
        let err = StaticRuleCatalog::from_yaml_str("rules:\n  - event_type: a\n").unwrap_err();
        assert!(err.to_string().contains("index 0"));
    }

    #[test]
    fn test_negative_seconds_rejected() {
        let yaml = "rules:\n  - notification_type: A\n    event_type: a\n    debounce_period_seconds: -5\n";
        assert!(StaticRuleCatalog::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn test_out_of_range_seconds_rejected() {
        let yaml = "rules:\n  - notification_type: A\n    event_type: a\n    debounce_limit: 1\n    debounce_period_seconds: 10000000000000\n";
        let message = StaticRuleCatalog::from_yaml_str(yaml).unwrap_err().to_string();
        assert!(message.contains("debounce_period_seconds"), "{message}");

        let yaml = "rules:\n  - notification_type: A\n    event_type: a\n    event_conditions:\n      - event_proximity:\n          event_type: b\n          time_proximity_seconds: 9223372036854775807\n";
        assert!(StaticRuleCatalog::from_yaml_str(yaml).is_err());

        let yaml = "rules:\n  - notification_type: A\n    event_type: a\n    debounce_limit: 1\n    debounce_period_seconds: 3153600000\n";
        let rule = &StaticRuleCatalog::from_yaml_str(yaml).unwrap().get_by_event_type("a")[0];
        assert_eq!(rule.debounce_period, Some(eternity()));
    }

    #[test]
    fn test_missing_rules_list() {
        assert!(StaticRuleCatalog::from_yaml_str("").is_err());
        assert!(StaticRuleCatalog::from_yaml_str("other: []").is_err());
        assert!(StaticRuleCatalog::from_yaml_str("rules: 3").is_err());
    }
}
