//! Recursive evaluation of condition trees against an event.
//!
//! Conditions in a list are conjunctive. Within one node the payloads are
//! checked in a fixed order (property match, event proximity, event logic)
//! and evaluation stops at the first one that fails.

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use tracing::debug;

use crate::error::{ErrorCode, HeraldError, HeraldResult};
use crate::traits::EventHistoryReader;
use crate::types::{
    Event, EventCondition, EventLogic, EventProximity, LogicOperator, PropertyMatch,
    PropertyOperator,
};

/// Decides whether an event satisfies a list of conditions.
///
/// Holds no state besides the history reader, so one evaluator can be
/// shared by any number of concurrent routing tasks.
#[derive(Clone)]
pub struct ConditionEvaluator {
    event_history: Arc<dyn EventHistoryReader>,
}

impl ConditionEvaluator {
    pub fn new(event_history: Arc<dyn EventHistoryReader>) -> Self {
        Self { event_history }
    }

    /// Check `event` against every condition; an empty list matches.
    pub fn matches<'a>(
        &'a self,
        event: &'a Event,
        conditions: &'a [EventCondition],
    ) -> BoxFuture<'a, HeraldResult<bool>> {
        async move {
            for condition in conditions {
                if !self.matches_condition(event, condition).await? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        .boxed()
    }

    async fn matches_condition(&self, event: &Event, condition: &EventCondition) -> HeraldResult<bool> {
        if let Some(property_match) = &condition.property_match {
            if !match_property(&event.as_document(), property_match)? {
                debug!(
                    path = %property_match.property_xpath,
                    operator = %property_match.operator,
                    "Property match failed"
                );
                return Ok(false);
            }
        }

        if let Some(proximity) = &condition.event_proximity {
            if !self.match_proximity(event, proximity).await? {
                debug!(
                    related_event_type = %proximity.event_type,
                    user_id = %event.user_id,
                    "No related event within proximity window"
                );
                return Ok(false);
            }
        }

        if let Some(logic) = &condition.event_logic {
            if !self.match_logic(event, logic).await? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    async fn match_proximity(&self, event: &Event, proximity: &EventProximity) -> HeraldResult<bool> {
        let window = proximity.time_proximity.ok_or_else(|| {
            HeraldError::malformed_rule(
                ErrorCode::RuleMissingField,
                format!(
                    "event_proximity on '{}' has no time_proximity",
                    proximity.event_type
                ),
            )
        })?;

        // Rejected before the history query.
        if !proximity.event_conditions.is_empty() {
            return Err(HeraldError::unsupported(
                "embedded_event_conditions",
                ErrorCode::FeatEmbeddedConditions,
                "conditions on the related event of an event_proximity are not supported",
            ));
        }

        let related = self
            .event_history
            .find_within_window(&proximity.event_type, &event.user_id, window)
            .await?;

        Ok(!related.is_empty())
    }

    async fn match_logic(&self, event: &Event, logic: &EventLogic) -> HeraldResult<bool> {
        match logic.logic {
            LogicOperator::And => self.matches(event, &logic.event_conditions).await,
            other => Err(HeraldError::unsupported(
                "logic_operator",
                ErrorCode::FeatLogicOperator,
                format!("logic operator {} is not supported, only AND", other),
            )),
        }
    }
}

/// Evaluate a property match against the event document.
fn match_property(document: &serde_json::Value, property_match: &PropertyMatch) -> HeraldResult<bool> {
    match property_match.operator {
        PropertyOperator::Eq => {
            let actual = resolve_path(document, &property_match.property_xpath)?;
            Ok(coerce_string(actual) == coerce_string(&property_match.value))
        }
        PropertyOperator::Gte => {
            let actual = resolve_path(document, &property_match.property_xpath)?;
            let actual = coerce_f64(actual, &property_match.property_xpath)?;
            let expected = coerce_f64(&property_match.value, &property_match.property_xpath)?;
            Ok(actual >= expected)
        }
        other => Err(HeraldError::unsupported(
            "property_operator",
            ErrorCode::FeatPropertyOperator,
            format!("property operator {} is not supported, only EQ and GTE", other),
        )),
    }
}

/// Resolve a dotted path such as `properties.items.0.sku`.
///
/// Numeric segments index into arrays. A missing key is an authoring
/// error, not a non-match.
fn resolve_path<'v>(document: &'v serde_json::Value, path: &str) -> HeraldResult<&'v serde_json::Value> {
    let mut current = document;

    for segment in path.split('.') {
        let next = match current {
            serde_json::Value::Object(map) => map.get(segment),
            serde_json::Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };

        current = next.ok_or_else(|| {
            HeraldError::malformed_rule(
                ErrorCode::RuleUnresolvedPath,
                format!("cannot resolve '{}' at segment '{}'", path, segment),
            )
        })?;
    }

    Ok(current)
}

/// String form used by EQ: strings compare by content, everything else by
/// its JSON text.
fn coerce_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Numeric form used by GTE: numbers and numeric strings only.
fn coerce_f64(value: &serde_json::Value, path: &str) -> HeraldResult<f64> {
    let number = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    number.ok_or_else(|| {
        HeraldError::malformed_rule(
            ErrorCode::RuleInvalidOperand,
            format!("value {} compared at '{}' is not numeric", value, path),
        )
    })
}
