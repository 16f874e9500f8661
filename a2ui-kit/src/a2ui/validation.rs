//! Validation checks.
//!
//! A check names a predicate in the [`FunctionRegistry`] and passes it
//! arguments, where `args.value` is usually bound to the data model:
//!
//! ```json
//! {"call": "minLength", "args": {"value": {"path": "/name"}, "min": 2}, "message": "Too short"}
//! ```

use regex::Regex;
use serde_json::Value;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::LazyLock;

use super::functions::{Args, FunctionRegistry, ResolveFn};
use super::message::CheckDefinition;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

/// Outcome of running a list of checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    /// True when every check with a registered predicate passed
    pub valid: bool,

    /// Messages of the failing checks that carry one, in check order
    pub messages: Vec<String>,
}

impl Default for CheckResult {
    fn default() -> Self {
        CheckResult {
            valid: true,
            messages: Vec::new(),
        }
    }
}

/// Evaluate every check. Nothing short-circuits.
///
/// Checks naming an unregistered predicate are skipped and count neither as
/// a pass nor a failure. A predicate that panics counts as a failure.
pub fn run_checks(
    checks: &[CheckDefinition],
    functions: &FunctionRegistry,
    resolve: ResolveFn<'_>,
) -> CheckResult {
    let mut result = CheckResult::default();
    let no_args = Args::new();

    for check in checks {
        let Some(predicate) = functions.check(&check.call) else {
            log::debug!("skipping unknown check {:?}", check.call);
            continue;
        };
        let args = check.args.as_ref().unwrap_or(&no_args);
        let passed = catch_unwind(AssertUnwindSafe(|| predicate(args, resolve))).unwrap_or_else(|_| {
            log::error!("check {:?} panicked", check.call);
            false
        });
        if !passed {
            result.valid = false;
            if let Some(message) = &check.message {
                result.messages.push(message.clone());
            }
        }
    }

    result
}

/// Seed the built-in predicates into a registry.
pub(crate) fn register_builtin_checks(registry: &mut FunctionRegistry) {
    registry.register_check("required", required);
    registry.register_check("regex", regex_match);
    registry.register_check("minLength", min_length);
    registry.register_check("maxLength", max_length);
    registry.register_check("min", min);
    registry.register_check("max", max);
    registry.register_check("email", email);
}

fn value_of(args: &Args, resolve: ResolveFn<'_>) -> Value {
    resolve(args.get("value"))
}

fn length_of(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(items) => Some(items.len()),
        _ => None,
    }
}

fn required(args: &Args, resolve: ResolveFn<'_>) -> bool {
    match value_of(args, resolve) {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => true,
    }
}

fn regex_match(args: &Args, resolve: ResolveFn<'_>) -> bool {
    let value = value_of(args, resolve);
    let (Some(text), Some(pattern)) = (value.as_str(), args.get("pattern").and_then(Value::as_str))
    else {
        return false;
    };
    if pattern.is_empty() {
        return false;
    }
    Regex::new(pattern).is_ok_and(|re| re.is_match(text))
}

fn min_length(args: &Args, resolve: ResolveFn<'_>) -> bool {
    let Some(min) = args.get("min").and_then(Value::as_f64) else {
        return false;
    };
    length_of(&value_of(args, resolve)).is_some_and(|len| len as f64 >= min)
}

fn max_length(args: &Args, resolve: ResolveFn<'_>) -> bool {
    let Some(max) = args.get("max").and_then(Value::as_f64) else {
        return false;
    };
    length_of(&value_of(args, resolve)).is_some_and(|len| len as f64 <= max)
}

fn min(args: &Args, resolve: ResolveFn<'_>) -> bool {
    let Some(min) = args.get("min").and_then(Value::as_f64) else {
        return false;
    };
    value_of(args, resolve).as_f64().is_some_and(|v| v >= min)
}

fn max(args: &Args, resolve: ResolveFn<'_>) -> bool {
    let Some(max) = args.get("max").and_then(Value::as_f64) else {
        return false;
    };
    value_of(args, resolve).as_f64().is_some_and(|v| v <= max)
}

fn email(args: &Args, resolve: ResolveFn<'_>) -> bool {
    value_of(args, resolve)
        .as_str()
        .is_some_and(|s| EMAIL.is_match(s))
}
