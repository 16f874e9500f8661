//! Client-side function registry.
//!
//! Holds three independent namespaces keyed by name:
//! - action functions, run for their side effect by `functionCall` actions
//! - context functions, whose return value is substituted into a resolved
//!   action context
//! - check functions, the predicates behind component `checks`
//!
//! Registering a name twice replaces the earlier entry.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use super::validation::register_builtin_checks;

/// Arguments passed to every registered function.
pub type Args = Map<String, Value>;

/// Side-effect-only function invoked by a `functionCall` action.
pub type ActionFunction = Rc<dyn Fn(&Args) -> anyhow::Result<()>>;

/// Value-returning function used while resolving an action context.
pub type ContextFunction = Rc<dyn Fn(&Args) -> Option<Value>>;

/// Resolves a check argument (literal or path binding) to its current value.
pub type ResolveFn<'a> = &'a dyn Fn(Option<&Value>) -> Value;

/// Predicate behind a validation check.
pub type CheckFunction = Rc<dyn for<'a> Fn(&Args, ResolveFn<'a>) -> bool>;

/// Registry of client-side functions, injected into surfaces.
///
/// # Example
///
/// ```rust,ignore
/// let mut functions = FunctionRegistry::with_builtins();
/// functions.register_context_function("double", |args| {
///     args.get("n").and_then(Value::as_f64).map(|n| json!(n * 2.0))
/// });
/// ```
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    actions: HashMap<String, ActionFunction>,
    context: HashMap<String, ContextFunction>,
    checks: HashMap<String, CheckFunction>,
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut actions: Vec<_> = self.actions.keys().collect();
        let mut context: Vec<_> = self.context.keys().collect();
        let mut checks: Vec<_> = self.checks.keys().collect();
        actions.sort();
        context.sort();
        checks.sort();
        f.debug_struct("FunctionRegistry")
            .field("actions", &actions)
            .field("context", &context)
            .field("checks", &checks)
            .finish()
    }
}

impl FunctionRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry seeded with the built-in functions and checks
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();

        registry.register_function("openUrl", open_url);
        registry.register_function("showAlert", show_alert);
        registry.register_context_function("formatDate", format_date);
        register_builtin_checks(&mut registry);

        registry
    }

    /// Register an action function
    pub fn register_function(
        &mut self,
        name: impl Into<String>,
        handler: impl Fn(&Args) -> anyhow::Result<()> + 'static,
    ) {
        self.actions.insert(name.into(), Rc::new(handler));
    }

    /// Register a context function
    pub fn register_context_function(
        &mut self,
        name: impl Into<String>,
        handler: impl Fn(&Args) -> Option<Value> + 'static,
    ) {
        self.context.insert(name.into(), Rc::new(handler));
    }

    /// Register a check predicate, replacing a built-in of the same name
    pub fn register_check(
        &mut self,
        name: impl Into<String>,
        check: impl for<'a> Fn(&Args, ResolveFn<'a>) -> bool + 'static,
    ) {
        self.checks.insert(name.into(), Rc::new(check));
    }

    pub fn function(&self, name: &str) -> Option<ActionFunction> {
        self.actions.get(name).cloned()
    }

    pub fn context_function(&self, name: &str) -> Option<ContextFunction> {
        self.context.get(name).cloned()
    }

    pub fn check(&self, name: &str) -> Option<CheckFunction> {
        self.checks.get(name).cloned()
    }

    /// Run an action function.
    ///
    /// Errors and panics raised by the handler are logged, never propagated.
    /// Returns whether a function with that name was registered.
    pub fn execute_function(&self, name: &str, args: &Args) -> bool {
        let Some(handler) = self.function(name) else {
            log::debug!("no action function registered as {name:?}");
            return false;
        };
        match catch_unwind(AssertUnwindSafe(|| handler(args))) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => log::warn!("action function {name:?} failed: {err:#}"),
            Err(_) => log::error!("action function {name:?} panicked"),
        }
        true
    }

    /// Run a context function and return its value.
    ///
    /// A missing name, or a handler that panics, yields `None`.
    pub fn execute_context_function(&self, name: &str, args: &Args) -> Option<Value> {
        let Some(handler) = self.context_function(name) else {
            log::debug!("no context function registered as {name:?}");
            return None;
        };
        match catch_unwind(AssertUnwindSafe(|| handler(args))) {
            Ok(value) => value,
            Err(_) => {
                log::error!("context function {name:?} panicked");
                None
            }
        }
    }
}

fn open_url(args: &Args) -> anyhow::Result<()> {
    let Some(raw) = args.get("url").and_then(Value::as_str) else {
        return Ok(());
    };
    let url = url::Url::parse(raw)?;
    log::info!("openUrl requested: {url}");
    Ok(())
}

fn show_alert(args: &Args) -> anyhow::Result<()> {
    let message = args.get("message").and_then(Value::as_str).unwrap_or("");
    log::info!("showAlert: {message}");
    Ok(())
}

fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Formats a date for display. Dates are rendered in UTC.
///
/// The `format` argument selects styles rather than being a pattern: one
/// containing both `Y` and `M` shows the date, one containing `h` or `a`
/// shows the time.
fn format_date(args: &Args) -> Option<Value> {
    let value = args.get("value").unwrap_or(&Value::Null);
    let date = match value {
        Value::Null => Utc::now(),
        Value::String(raw) => match parse_date(raw) {
            Some(date) => date,
            None => return Some(Value::String(raw.clone())),
        },
        other => return Some(Value::String(other.to_string())),
    };

    let format = args.get("format").and_then(Value::as_str).unwrap_or("PPp");
    let with_date = format.contains('Y') && format.contains('M');
    let with_time = format.contains('h') || format.contains('a');

    let pattern = match (with_date, with_time) {
        (true, true) => "%b %-d, %Y, %-I:%M %p",
        (true, false) => "%b %-d, %Y",
        (false, true) => "%-I:%M %p",
        (false, false) => "%-m/%-d/%Y",
    };
    Some(Value::String(date.format(pattern).to_string()))
}
