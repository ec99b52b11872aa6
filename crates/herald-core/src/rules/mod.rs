//! Rule engine: condition evaluation, debounce policy and routing.

pub mod debounce;
mod evaluator;
mod relay;

pub use evaluator::ConditionEvaluator;
pub use relay::{RuleFailurePolicy, RuleRelay};
