//! Narrow a rule set to the templates applicable to one request.

use super::{Operation, RuleSet, Template};
use crate::error::EngineResult;
use crate::identity::AppIdentity;

/// Templates scoped to `operation` that apply to `caller`, in rule-set order.
pub fn select<'a>(rules: &'a RuleSet, operation: Operation, caller: &AppIdentity) -> Vec<&'a Template> {
    rules
        .templates()
        .iter()
        .filter(|t| t.handles(operation) && t.applies_to(caller))
        .collect()
}

/// Templates that apply to `caller` regardless of operation.
pub fn select_for_app<'a>(rules: &'a RuleSet, caller: &AppIdentity) -> Vec<&'a Template> {
    rules.templates().iter().filter(|t| t.applies_to(caller)).collect()
}

/// Like `select`, for integration points that carry the operation as a name. An unknown name
/// is an `UnsupportedOperation` error, which callers treat as fatal.
pub fn select_named<'a>(rules: &'a RuleSet, operation: &str, caller: &AppIdentity) -> EngineResult<Vec<&'a Template>> {
    let op = operation.parse::<Operation>()?;
    Ok(select(rules, op, caller))
}
