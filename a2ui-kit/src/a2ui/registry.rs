//! A2UI Component Registry
//!
//! Maps A2UI component type names to the adapters that render them.

use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use super::context::{ActionIntent, ActionSink, ContextResolver};
use super::data_model::DataModelStore;
use super::functions::FunctionRegistry;
use super::message::{ActionDefinition, CheckDefinition, ComponentNode, Direction, Theme};
use super::renderer::{Element, Handler};
use super::validation::{CheckResult, run_checks};
use super::value;

/// Everything an adapter gets to render one component.
pub struct AdapterProps<'a> {
    /// The raw component record
    pub component: &'a ComponentNode,

    /// Already rendered children, in declaration order
    pub children: Vec<Element>,

    /// Read/write access to the surface data model
    pub data_model: &'a DataModelStore,

    pub surface_id: &'a str,

    /// Receives raw (unresolved) action intents
    pub on_action: &'a ActionSink,

    pub dir: Direction,

    pub theme: Option<&'a Theme>,

    pub functions: &'a Rc<FunctionRegistry>,
}

impl AdapterProps<'_> {
    pub fn id(&self) -> &str {
        &self.component.id
    }

    /// Resolve a literal or binding against this surface's data model.
    pub fn resolve_value(&self, binding: Option<&Value>, fallback: Value) -> Value {
        value::resolve_value(binding, fallback, self.data_model)
    }

    /// Resolve the first of `keys` present and not `null` on the component.
    pub fn resolve_prop(&self, keys: &[&str], fallback: Value) -> Value {
        let binding = keys
            .iter()
            .filter_map(|key| self.component.prop(key))
            .find(|value| !value.is_null());
        self.resolve_value(binding, fallback)
    }

    /// Resolve a property as display text. Numbers and booleans are stringified.
    pub fn resolve_string(&self, keys: &[&str], fallback: &str) -> String {
        match self.resolve_prop(keys, Value::Null) {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => fallback.to_string(),
        }
    }

    pub fn resolve_bool(&self, keys: &[&str], fallback: bool) -> bool {
        self.resolve_prop(keys, Value::Bool(fallback))
            .as_bool()
            .unwrap_or(fallback)
    }

    pub fn resolve_f64(&self, keys: &[&str], fallback: f64) -> f64 {
        match self.resolve_prop(keys, Value::Null) {
            Value::Number(n) => n.as_f64().unwrap_or(fallback),
            Value::String(s) => s.trim().parse().unwrap_or(fallback),
            _ => fallback,
        }
    }

    /// The data model path `key` is bound to, for two-way binding.
    pub fn binding_path(&self, key: &str) -> Option<String> {
        self.component
            .prop(key)
            .and_then(value::as_path_binding)
            .map(str::to_string)
    }

    /// Handler writing the incoming value to the path bound at `key`.
    ///
    /// `None` when the property is a literal, leaving the input read-only.
    pub fn writer(&self, key: &str) -> Option<Handler> {
        let path = self.binding_path(key)?;
        let store = self.data_model.clone();
        Some(Rc::new(move |value: &Value| store.set(&path, value.clone())))
    }

    pub fn checks(&self) -> Vec<CheckDefinition> {
        parse_checks(self.component)
    }

    /// Run this component's checks against the current data model.
    pub fn run_checks(&self) -> CheckResult {
        let checks = self.checks();
        if checks.is_empty() {
            return CheckResult::default();
        }
        let resolve = |v: Option<&Value>| self.resolve_value(v, Value::Null);
        run_checks(&checks, self.functions, &resolve)
    }

    pub fn action(&self) -> Option<ActionDefinition> {
        parse_action(self.component)
    }

    /// Click handler for this component's `action`.
    ///
    /// The handler re-evaluates `disabled` and the checks when pressed and does
    /// nothing while the component is gated. An `event` action is emitted as
    /// a raw intent, a `functionCall` action runs locally.
    pub fn action_handler(&self) -> Option<Handler> {
        let action = self.action()?;
        let component = self.component.clone();
        let store = self.data_model.clone();
        let functions = Rc::clone(self.functions);
        let on_action = Rc::clone(self.on_action);

        Some(Rc::new(move |_: &Value| {
            let disabled = value::resolve_value(component.prop("disabled"), Value::Bool(false), &store);
            if disabled.as_bool() == Some(true) {
                log::debug!("ignoring press on disabled {:?}", component.id);
                return;
            }
            let checks = parse_checks(&component);
            if !checks.is_empty() {
                let resolve = |v: Option<&Value>| value::resolve_value(v, Value::Null, &store);
                if !run_checks(&checks, &functions, &resolve).valid {
                    log::debug!("checks failed on {:?}, action not sent", component.id);
                    return;
                }
            }

            if let Some(event) = &action.event {
                on_action(ActionIntent {
                    source_component_id: component.id.clone(),
                    name: event.name.clone(),
                    context: event.context.clone().unwrap_or_default(),
                });
            }
            if let Some(call) = &action.function_call {
                let args = call
                    .args
                    .as_ref()
                    .map(|args| ContextResolver::new(&store, &functions).resolve_context(args))
                    .unwrap_or_default();
                functions.execute_function(&call.call, &args);
            }
        }))
    }
}

fn parse_checks(component: &ComponentNode) -> Vec<CheckDefinition> {
    let Some(raw) = component.prop("checks") else {
        return Vec::new();
    };
    match serde_json::from_value(raw.clone()) {
        Ok(checks) => checks,
        Err(err) => {
            log::debug!("ignoring malformed checks on {:?}: {err}", component.id);
            Vec::new()
        }
    }
}

fn parse_action(component: &ComponentNode) -> Option<ActionDefinition> {
    let raw = component.prop("action")?;
    match serde_json::from_value(raw.clone()) {
        Ok(action) => Some(action),
        Err(err) => {
            log::debug!("ignoring malformed action on {:?}: {err}", component.id);
            None
        }
    }
}

/// Renders one component type.
///
/// Plain functions and closures taking [`AdapterProps`] are adapters.
pub trait ComponentAdapter {
    fn render(&self, props: AdapterProps<'_>) -> Option<Element>;
}

impl<F> ComponentAdapter for F
where
    F: Fn(AdapterProps<'_>) -> Option<Element>,
{
    fn render(&self, props: AdapterProps<'_>) -> Option<Element> {
        self(props)
    }
}

/// Registry of component adapters keyed by type name.
///
/// # Example
///
/// ```rust,ignore
/// let mut registry = ComponentRegistry::with_standard_catalog();
///
/// // Replace the Text adapter
/// registry.register("Text", |props: AdapterProps<'_>| {
///     Some(Element::new("Label").with_text(props.resolve_string(&["text"], "")))
/// });
/// ```
#[derive(Clone, Default)]
pub struct ComponentRegistry {
    adapters: HashMap<String, Rc<dyn ComponentAdapter>>,
}

impl fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.adapters.keys().collect();
        names.sort();
        f.debug_struct("ComponentRegistry")
            .field("adapters", &names)
            .finish()
    }
}

impl ComponentRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the standard A2UI catalog
    pub fn with_standard_catalog() -> Self {
        let mut registry = Self::new();
        crate::widgets::register_standard_catalog(&mut registry);
        registry
    }

    /// Register an adapter, replacing any previous one for that type
    pub fn register(&mut self, name: impl Into<String>, adapter: impl ComponentAdapter + 'static) {
        self.adapters.insert(name.into(), Rc::new(adapter));
    }

    /// Register a closure adapter
    pub fn register_fn(
        &mut self,
        name: impl Into<String>,
        adapter: impl Fn(AdapterProps<'_>) -> Option<Element> + 'static,
    ) {
        self.register(name, adapter);
    }

    pub fn get(&self, name: &str) -> Option<Rc<dyn ComponentAdapter>> {
        self.adapters.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.adapters.contains_key(name)
    }

    /// Copy every adapter of `overrides` into this registry, replacing ours.
    pub fn merge(&mut self, overrides: &ComponentRegistry) {
        for (name, adapter) in &overrides.adapters {
            self.adapters.insert(name.clone(), Rc::clone(adapter));
        }
    }

    /// Registered type names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.adapters.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;

    const STANDARD: &[&str] = &[
        "Column", "Row", "Box", "Card", "List", "Tabs", "Accordion", "AppBar", "Menu",
        "NavigationDrawer", "BottomNavigation", "Carousel", "Text", "Image", "Icon", "Divider",
        "Badge", "ProgressIndicator", "CodeBlock", "Snackbar", "DataTable", "Video", "Audio",
        "Button", "Link", "TextField", "CheckBox", "Switch", "Slider", "ChoicePicker",
        "DateTimeInput",
    ];

    #[test]
    fn test_standard_catalog() {
        let registry = ComponentRegistry::with_standard_catalog();
        for name in STANDARD {
            assert!(registry.contains(name), "Missing adapter for {name}");
        }
    }

    #[test]
    fn test_merge_overrides_win() {
        let mut registry = ComponentRegistry::with_standard_catalog();
        let mut overrides = ComponentRegistry::new();
        overrides.register_fn("Text", |_| Some(Element::new("Custom")));
        overrides.register_fn("Chart", |_| Some(Element::new("Chart")));
        registry.merge(&overrides);

        assert!(registry.contains("Chart"));
        assert!(registry.contains("Column"));

        let node = ComponentNode::new("t", "Text");
        let store = DataModelStore::new();
        let functions = Rc::new(FunctionRegistry::new());
        let sink: ActionSink = Rc::new(|_: ActionIntent| {});
        let element = registry.get("Text").unwrap().render(AdapterProps {
            component: &node,
            children: Vec::new(),
            data_model: &store,
            surface_id: "s",
            on_action: &sink,
            dir: Direction::Ltr,
            theme: None,
            functions: &functions,
        });
        assert_eq!(element.unwrap().kind, "Custom");
    }

    fn with_props<R>(node: &ComponentNode, store: &DataModelStore, sink: &ActionSink, f: impl FnOnce(AdapterProps<'_>) -> R) -> R {
        let functions = Rc::new(FunctionRegistry::with_builtins());
        f(AdapterProps {
            component: node,
            children: Vec::new(),
            data_model: store,
            surface_id: "s",
            on_action: sink,
            dir: Direction::Ltr,
            theme: None,
            functions: &functions,
        })
    }

    #[test]
    fn test_resolve_prop_uses_first_present_key() {
        let node = ComponentNode::new("b", "Button")
            .with("text", Value::Null)
            .with("label", json!({"path": "/label"}));
        let store = DataModelStore::with_data(json!({"label": "Save"}));
        let sink: ActionSink = Rc::new(|_: ActionIntent| {});

        with_props(&node, &store, &sink, |props| {
            assert_eq!(props.resolve_string(&["text", "label"], ""), "Save");
            assert_eq!(props.resolve_f64(&["missing"], 2.5), 2.5);
            assert!(props.resolve_bool(&["missing"], true));
            assert_eq!(props.binding_path("label").as_deref(), Some("/label"));
            assert_eq!(props.binding_path("text"), None);
        });
    }

    #[test]
    fn test_writer_targets_bound_path() {
        let node = ComponentNode::new("f", "TextField")
            .with("value", json!({"path": "/form/name"}))
            .with("label", json!("Name"));
        let store = DataModelStore::new();
        let sink: ActionSink = Rc::new(|_: ActionIntent| {});

        with_props(&node, &store, &sink, |props| {
            assert!(props.writer("label").is_none());
            let write = props.writer("value").unwrap();
            write(&json!("Ben"));
        });
        assert_eq!(store.get("/form/name"), Some(json!("Ben")));
    }

    #[test]
    fn test_action_handler_emits_raw_intent() {
        let node = ComponentNode::new("submit", "Button").with(
            "action",
            json!({"event": {"name": "send", "context": {"who": {"path": "/name"}}}}),
        );
        let store = DataModelStore::with_data(json!({"name": "Ann"}));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink_seen = Rc::clone(&seen);
        let sink: ActionSink = Rc::new(move |intent: ActionIntent| sink_seen.borrow_mut().push(intent));

        let handler = with_props(&node, &store, &sink, |props| props.action_handler()).unwrap();
        handler(&Value::Null);

        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].source_component_id, "submit");
        assert_eq!(seen[0].name, "send");
        assert_eq!(Value::Object(seen[0].context.clone()), json!({"who": {"path": "/name"}}));
    }

    #[test]
    fn test_action_handler_gated_by_checks_at_press_time() {
        let node = ComponentNode::new("submit", "Button")
            .with("action", json!({"event": {"name": "send"}}))
            .with(
                "checks",
                json!([{"call": "required", "args": {"value": {"path": "/name"}}, "message": "Required"}]),
            );
        let store = DataModelStore::new();
        let count = Rc::new(RefCell::new(0));
        let sink_count = Rc::clone(&count);
        let sink: ActionSink = Rc::new(move |_: ActionIntent| *sink_count.borrow_mut() += 1);

        let (handler, result) = with_props(&node, &store, &sink, |props| {
            (props.action_handler().unwrap(), props.run_checks())
        });
        assert!(!result.valid);
        assert_eq!(result.messages, vec!["Required".to_string()]);

        handler(&Value::Null);
        assert_eq!(*count.borrow(), 0);

        store.set("/name", json!("Ann"));
        handler(&Value::Null);
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn test_function_call_action_runs_locally() {
        let node = ComponentNode::new("go", "Button").with(
            "action",
            json!({"functionCall": {"call": "remember", "args": {"v": {"path": "/v"}}}}),
        );
        let store = DataModelStore::with_data(json!({"v": 7}));
        let intents = Rc::new(RefCell::new(0));
        let sink_intents = Rc::clone(&intents);
        let sink: ActionSink = Rc::new(move |_: ActionIntent| *sink_intents.borrow_mut() += 1);

        let got = Rc::new(RefCell::new(None));
        let mut functions = FunctionRegistry::new();
        let slot = Rc::clone(&got);
        functions.register_function("remember", move |args| {
            *slot.borrow_mut() = args.get("v").cloned();
            Ok(())
        });
        let functions = Rc::new(functions);

        let handler = AdapterProps {
            component: &node,
            children: Vec::new(),
            data_model: &store,
            surface_id: "s",
            on_action: &sink,
            dir: Direction::Ltr,
            theme: None,
            functions: &functions,
        }
        .action_handler()
        .unwrap();
        handler(&Value::Null);

        assert_eq!(*got.borrow(), Some(json!(7)));
        assert_eq!(*intents.borrow(), 0);
    }
}
