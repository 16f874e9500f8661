//! Action context resolution.
//!
//! When a user triggers an action, the raw `context` of its event is resolved
//! against the data model at that instant:
//!
//! ```text
//! {"path": "/x"}                        -> current value at /x
//! {"call": "fn", "args": {...}}         -> fn(resolved args)
//! {"k": {...}}  (plain object)          -> resolved key by key
//! anything else (arrays included)       -> passed through as is
//! ```

use serde_json::{Map, Value};
use std::rc::Rc;

use super::data_model::DataModelStore;
use super::functions::FunctionRegistry;
use super::value::{as_function_call, as_path_binding};

/// Maximum nesting resolved inside a context. Deeper values resolve as absent.
pub const MAX_CONTEXT_DEPTH: usize = 64;

/// An action as emitted by a component, before resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionIntent {
    pub source_component_id: String,
    pub name: String,
    pub context: Map<String, Value>,
}

/// Callback receiving raw action intents from rendered components.
pub type ActionSink = Rc<dyn Fn(ActionIntent)>;

/// Resolves action contexts and function arguments against a data model.
pub struct ContextResolver<'a> {
    data_model: &'a DataModelStore,
    functions: &'a FunctionRegistry,
}

impl<'a> ContextResolver<'a> {
    pub fn new(data_model: &'a DataModelStore, functions: &'a FunctionRegistry) -> Self {
        ContextResolver {
            data_model,
            functions,
        }
    }

    /// Resolve every key of a raw context.
    ///
    /// Keys whose value resolves as absent (a binding to a missing path, an
    /// unknown context function) are left out of the result.
    pub fn resolve_context(&self, raw: &Map<String, Value>) -> Map<String, Value> {
        self.resolve_object(raw, 0)
    }

    /// Resolve a single context value. `None` means absent.
    pub fn resolve_value(&self, value: &Value) -> Option<Value> {
        self.resolve_at(value, 0)
    }

    fn resolve_object(&self, raw: &Map<String, Value>, depth: usize) -> Map<String, Value> {
        raw.iter()
            .filter_map(|(key, value)| {
                self.resolve_at(value, depth + 1)
                    .map(|resolved| (key.clone(), resolved))
            })
            .collect()
    }

    fn resolve_at(&self, value: &Value, depth: usize) -> Option<Value> {
        if depth > MAX_CONTEXT_DEPTH {
            log::warn!("action context nested deeper than {MAX_CONTEXT_DEPTH}, dropping value");
            return None;
        }

        if let Some(path) = as_path_binding(value) {
            return self.data_model.get(path);
        }

        if let Some(call) = as_function_call(value) {
            let args = call
                .args
                .as_ref()
                .map(|args| self.resolve_object(args, depth))
                .unwrap_or_default();
            return self.functions.execute_context_function(&call.call, &args);
        }

        match value {
            // Arrays are not walked, bindings inside them stay literal.
            Value::Object(object) => Some(Value::Object(self.resolve_object(object, depth))),
            other => Some(other.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn times_ten() -> FunctionRegistry {
        let mut functions = FunctionRegistry::new();
        functions.register_context_function("fn", |args| {
            args.get("e").and_then(Value::as_f64).map(|e| json!(e * 10.0))
        });
        functions
    }

    #[test]
    fn test_context_recursion() {
        let store = DataModelStore::with_data(json!({"x": 1, "y": 2}));
        let functions = times_ten();
        let resolver = ContextResolver::new(&store, &functions);

        let resolved = resolver.resolve_context(&object(json!({
            "a": {"path": "/x"},
            "b": {"c": {"path": "/y"}},
            "d": {"call": "fn", "args": {"e": {"path": "/x"}}}
        })));

        assert_eq!(Value::Object(resolved), json!({"a": 1, "b": {"c": 2}, "d": 10.0}));
    }

    #[test]
    fn test_literals_pass_through() {
        let store = DataModelStore::new();
        let functions = FunctionRegistry::new();
        let resolver = ContextResolver::new(&store, &functions);

        let raw = object(json!({"s": "text", "n": 3, "b": false, "z": null}));
        assert_eq!(resolver.resolve_context(&raw), raw);
    }

    #[test]
    fn test_arrays_are_not_resolved() {
        // Bindings inside arrays are kept literally.
        let store = DataModelStore::with_data(json!({"x": 1}));
        let functions = FunctionRegistry::new();
        let resolver = ContextResolver::new(&store, &functions);

        let raw = object(json!({"list": [{"path": "/x"}, 2]}));
        assert_eq!(resolver.resolve_context(&raw), raw);
    }

    #[test]
    fn test_missing_values_are_omitted() {
        let store = DataModelStore::with_data(json!({"nothing": null}));
        let functions = FunctionRegistry::new();
        let resolver = ContextResolver::new(&store, &functions);

        let resolved = resolver.resolve_context(&object(json!({
            "gone": {"path": "/missing"},
            "unknown": {"call": "nope"},
            "null": {"path": "/nothing"}
        })));
        assert_eq!(Value::Object(resolved), json!({"null": null}));
    }

    #[test]
    fn test_resolution_reads_current_state() {
        let store = DataModelStore::with_data(json!({"x": 1}));
        let functions = FunctionRegistry::new();
        let raw = object(json!({"x": {"path": "/x"}}));

        store.set("/x", json!(5));
        let resolved = ContextResolver::new(&store, &functions).resolve_context(&raw);
        assert_eq!(resolved.get("x"), Some(&json!(5)));
    }

    #[test]
    fn test_depth_limit() {
        let store = DataModelStore::new();
        let functions = FunctionRegistry::new();
        let resolver = ContextResolver::new(&store, &functions);

        let mut deep = json!("leaf");
        for _ in 0..(MAX_CONTEXT_DEPTH + 8) {
            deep = json!({"k": deep});
        }
        let resolved = resolver.resolve_value(&deep).unwrap();

        let mut levels = 0;
        let mut cursor = &resolved;
        while let Some(next) = cursor.get("k") {
            levels += 1;
            cursor = next;
        }
        assert!(levels <= MAX_CONTEXT_DEPTH);

        let shallow = json!({"a": {"b": {"c": "leaf"}}});
        assert_eq!(resolver.resolve_value(&shallow), Some(shallow.clone()));
    }
}
