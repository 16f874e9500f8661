//! Interactive components.
//!
//! Inputs bound to a data model path write straight back to it. Inputs given
//! a literal value are read-only.

use serde::Deserialize;
use serde_json::{Value, json};

use crate::a2ui::{AdapterProps, CheckResult, ComponentRegistry, DataModelStore, Element, EventKind};

pub(super) fn register(registry: &mut ComponentRegistry) {
    registry.register("Button", button);
    registry.register("Link", link);
    registry.register("TextField", text_field);
    registry.register("CheckBox", check_box);
    registry.register("Switch", switch);
    registry.register("Slider", slider);
    registry.register("ChoicePicker", choice_picker);
    registry.register("DateTimeInput", date_time_input);
}

fn with_validation(element: Element, result: &CheckResult) -> Element {
    if result.messages.is_empty() {
        element
    } else {
        element.with_prop("validationMessages", json!(result.messages))
    }
}

fn button(mut props: AdapterProps<'_>) -> Option<Element> {
    let label = props.resolve_string(&["text", "label"], "");
    let disabled = props.resolve_bool(&["disabled"], false);
    let checks = props.run_checks();

    let mut element = Element::new("Button").with_prop("disabled", json!(disabled || !checks.valid));
    element = with_validation(element, &checks);
    if let Some(color) = props
        .theme
        .and_then(|theme| theme.primary_color.as_ref().or(theme.primary.as_ref()))
    {
        element = element.with_prop("color", json!(color));
    }
    if let Some(handler) = props.action_handler() {
        element = element.on_handler(EventKind::Click, handler);
    }

    let children = std::mem::take(&mut props.children);
    if children.is_empty() {
        Some(element.with_text(label))
    } else {
        Some(element.with_children(children))
    }
}

fn link(props: AdapterProps<'_>) -> Option<Element> {
    let href = props.resolve_string(&["href", "url"], "#");
    let label = props.resolve_string(&["text", "label"], "");
    let mut element = Element::new("Link")
        .with_prop("href", json!(href))
        .with_text(label);
    if let Some(handler) = props.action_handler() {
        element = element.on_handler(EventKind::Click, handler);
    }
    Some(element)
}

fn text_field(props: AdapterProps<'_>) -> Option<Element> {
    let value = props.resolve_string(&["value"], "");
    let label = props.resolve_string(&["label"], "");
    let placeholder = props.resolve_string(&["placeholder"], "");

    let mut element = Element::new("TextField")
        .with_prop("label", json!(label))
        .with_prop("value", json!(value));
    if !placeholder.is_empty() {
        element = element.with_prop("placeholder", json!(placeholder));
    }
    element = with_validation(element, &props.run_checks());
    if let Some(writer) = props.writer("value") {
        element = element.on_handler(EventKind::Change, writer);
    }
    Some(element)
}

/// Checkbox-like input. Click flips the bound flag, change writes it as given.
fn toggle(kind: &str, props: &AdapterProps<'_>) -> Element {
    let key = if props.component.prop("checked").is_some() {
        "checked"
    } else {
        "value"
    };
    let checked = props.resolve_bool(&[key], false);
    let label = props.resolve_string(&["label"], "");

    let mut element = Element::new(kind).with_prop("checked", json!(checked));
    if !label.is_empty() {
        element = element.with_text(label);
    }
    if let Some(path) = props.binding_path(key) {
        let store = props.data_model.clone();
        element = element.on(EventKind::Click, move |_| {
            let current = store.get(&path).and_then(|v| v.as_bool()).unwrap_or(false);
            store.set(&path, Value::Bool(!current));
        });
    }
    if let Some(writer) = props.writer(key) {
        element = element.on_handler(EventKind::Change, writer);
    }
    element
}

fn check_box(props: AdapterProps<'_>) -> Option<Element> {
    Some(toggle("CheckBox", &props))
}

fn switch(props: AdapterProps<'_>) -> Option<Element> {
    Some(toggle("Switch", &props))
}

fn slider(props: AdapterProps<'_>) -> Option<Element> {
    let min = props.resolve_f64(&["min"], 0.0);
    let max = props.resolve_f64(&["max"], 100.0);
    let value = props.resolve_f64(&["value"], 0.0);

    let mut element = Element::new("Slider")
        .with_prop("value", json!(value))
        .with_prop("min", json!(min))
        .with_prop("max", json!(max));
    if let Some(path) = props.binding_path("value") {
        let store = props.data_model.clone();
        element = element.on(EventKind::Change, move |incoming| {
            let Some(number) = incoming.as_f64() else {
                log::debug!("slider {path:?} ignoring non-numeric input {incoming}");
                return;
            };
            if max < min || (min..=max).contains(&number) {
                store.set(&path, incoming.clone());
            } else {
                store.set(&path, json!(number.clamp(min, max)));
            }
        });
    }
    Some(element)
}

#[derive(Debug, Deserialize)]
struct ChoiceOption {
    label: String,
    value: String,
}

/// Select `value` at `path`, or toggle it in the selected list when the
/// picker allows several.
fn choose(store: &DataModelStore, path: &str, value: &str, multiple: bool) {
    if !multiple {
        store.set(path, json!(value));
        return;
    }
    let mut selected = match store.get(path) {
        Some(Value::Array(items)) => items,
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(s)) if s.is_empty() => Vec::new(),
        Some(other) => vec![other],
    };
    match selected.iter().position(|item| item.as_str() == Some(value)) {
        Some(index) => {
            selected.remove(index);
        }
        None => selected.push(json!(value)),
    }
    store.set(path, Value::Array(selected));
}

fn choice_picker(props: AdapterProps<'_>) -> Option<Element> {
    let options: Vec<ChoiceOption> = props
        .component
        .prop("options")
        .and_then(|raw| serde_json::from_value(raw.clone()).ok())
        .unwrap_or_default();
    let selected = props.resolve_prop(&["value"], Value::Null);
    let multiple = props.resolve_string(&["variant"], "mutuallyExclusive") != "mutuallyExclusive";
    let path = props.binding_path("value");

    let is_selected = |value: &str| match &selected {
        Value::Array(items) => items.iter().any(|item| item.as_str() == Some(value)),
        Value::String(s) => s == value,
        _ => false,
    };

    let children = options
        .into_iter()
        .map(|option| {
            let mut element = Element::new("Option")
                .with_prop("value", json!(option.value))
                .with_prop("selected", json!(is_selected(&option.value)))
                .with_text(option.label);
            if let Some(path) = path.clone() {
                let store = props.data_model.clone();
                let value = option.value;
                element = element.on(EventKind::Click, move |_| choose(&store, &path, &value, multiple));
            }
            element
        })
        .collect();

    Some(
        Element::new("ChoicePicker")
            .with_prop("multiple", json!(multiple))
            .with_children(children),
    )
}

fn date_time_input(props: AdapterProps<'_>) -> Option<Element> {
    let value = props.resolve_string(&["value"], "");
    let mut element = Element::new("DateTimeInput").with_prop("value", json!(value));
    if let Some(writer) = props.writer("value") {
        element = element.on_handler(EventKind::Change, writer);
    }
    Some(element)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::a2ui::{FunctionRegistry, ResolvedAction, Surface, SurfaceOptions};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn surface_with(components: Value, data: Value) -> Surface {
        let surface = Surface::new(SurfaceOptions::new("s"));
        surface.data_model().set("/", data);
        surface.process_message(
            &serde_json::from_value(json!({"version": "v0.9", "updateComponents": {
                "surfaceId": "s", "components": components
            }}))
            .unwrap(),
        );
        surface
    }

    fn record_actions(surface: &Surface) -> Rc<RefCell<Vec<ResolvedAction>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        surface.set_on_action(move |action| sink.borrow_mut().push(action.clone()));
        seen
    }

    #[test]
    fn test_text_field_writes_binding() {
        let surface = surface_with(
            json!([{"id": "root", "component": "TextField", "label": "Name", "value": {"path": "/form/name"}}]),
            json!({}),
        );
        let field = surface.render().unwrap();
        assert_eq!(field.prop("value"), Some(&json!("")));
        assert!(field.change(json!("Ann")));
        assert_eq!(surface.data_model().get("/form/name"), Some(json!("Ann")));
        assert_eq!(surface.render().unwrap().prop("value"), Some(&json!("Ann")));
    }

    #[test]
    fn test_literal_input_is_read_only() {
        let surface = surface_with(
            json!([{"id": "root", "component": "TextField", "value": "fixed"}]),
            json!({}),
        );
        let field = surface.render().unwrap();
        assert!(!field.change(json!("other")));
        assert_eq!(surface.data_model().get_all(), json!({}));
    }

    #[test]
    fn test_button_gated_by_disabled_at_press_time() {
        let surface = surface_with(
            json!([{"id": "root", "component": "Button", "text": "Send",
                "disabled": {"path": "/locked"},
                "action": {"event": {"name": "send"}}}]),
            json!({"locked": true}),
        );
        let seen = record_actions(&surface);
        let button = surface.render().unwrap();
        assert_eq!(button.prop("disabled"), Some(&json!(true)));
        assert_eq!(button.text.as_deref(), Some("Send"));

        button.click();
        assert!(seen.borrow().is_empty());

        surface.data_model().set("/locked", json!(false));
        button.click();
        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(seen.borrow()[0].name, "send");
    }

    #[test]
    fn test_button_checks_block_action() {
        let surface = surface_with(
            json!([{"id": "root", "component": "Button", "label": "Save",
                "checks": [
                    {"call": "required", "args": {"value": {"path": "/name"}}, "message": "Name is required"},
                    {"call": "email", "args": {"value": {"path": "/email"}}}
                ],
                "action": {"event": {"name": "save", "context": {"name": {"path": "/name"}}}}}]),
            json!({"name": "", "email": "a@b.co"}),
        );
        let seen = record_actions(&surface);
        let button = surface.render().unwrap();
        assert_eq!(button.prop("disabled"), Some(&json!(true)));
        assert_eq!(button.prop("validationMessages"), Some(&json!(["Name is required"])));

        button.click();
        assert!(seen.borrow().is_empty());

        surface.data_model().set("/name", json!("Ann"));
        let button = surface.render().unwrap();
        assert_eq!(button.prop("disabled"), Some(&json!(false)));
        assert!(button.prop("validationMessages").is_none());
        button.click();
        assert_eq!(seen.borrow()[0].context, json!({"name": "Ann"}).as_object().cloned());
    }

    #[test]
    fn test_button_function_call_runs_locally() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let record = Rc::clone(&calls);
        let mut functions = FunctionRegistry::new();
        functions.register_function("log", move |args| {
            record.borrow_mut().push(args.clone());
            Ok(())
        });

        let surface = Surface::new(SurfaceOptions::new("s").with_functions(functions));
        surface.data_model().set("/q", json!("rust"));
        surface.process_json(
            r#"{"version": "v0.9", "updateComponents": {"surfaceId": "s", "components": [
                {"id": "root", "component": "Button", "text": "Go",
                 "action": {"functionCall": {"call": "log", "args": {"query": {"path": "/q"}}}}}
            ]}}"#,
        );
        let seen = record_actions(&surface);

        surface.render().unwrap().click();
        assert!(seen.borrow().is_empty());
        assert_eq!(calls.borrow().len(), 1);
        assert_eq!(calls.borrow()[0].get("query"), Some(&json!("rust")));
    }

    #[test]
    fn test_button_prefers_children_over_text() {
        let surface = surface_with(
            json!([
                {"id": "root", "component": "Button", "text": "ignored", "child": "label"},
                {"id": "label", "component": "Text", "text": "Inner"}
            ]),
            json!({}),
        );
        let button = surface.render().unwrap();
        assert_eq!(button.text, None);
        assert_eq!(button.children[0].text.as_deref(), Some("Inner"));
    }

    #[test]
    fn test_check_box_toggles() {
        let surface = surface_with(
            json!([{"id": "root", "component": "CheckBox", "label": "Agree", "checked": {"path": "/agree"}}]),
            json!({}),
        );
        let check_box = surface.render().unwrap();
        assert_eq!(check_box.prop("checked"), Some(&json!(false)));

        check_box.click();
        assert_eq!(surface.data_model().get("/agree"), Some(json!(true)));
        check_box.click();
        assert_eq!(surface.data_model().get("/agree"), Some(json!(false)));
        check_box.change(json!(true));
        assert_eq!(surface.data_model().get("/agree"), Some(json!(true)));
    }

    #[test]
    fn test_switch_uses_value_binding() {
        let surface = surface_with(
            json!([{"id": "root", "component": "Switch", "value": {"path": "/on"}}]),
            json!({"on": true}),
        );
        let switch = surface.render().unwrap();
        assert_eq!(switch.prop("checked"), Some(&json!(true)));
        switch.click();
        assert_eq!(surface.data_model().get("/on"), Some(json!(false)));
    }

    #[test]
    fn test_slider_clamps_input() {
        let surface = surface_with(
            json!([{"id": "root", "component": "Slider", "value": {"path": "/vol"}, "min": 0, "max": 10}]),
            json!({"vol": 3}),
        );
        let slider = surface.render().unwrap();
        assert_eq!(slider.prop("value"), Some(&json!(3.0)));

        slider.change(json!(7));
        assert_eq!(surface.data_model().get("/vol"), Some(json!(7)));
        slider.change(json!(42));
        assert_eq!(surface.data_model().get("/vol"), Some(json!(10.0)));
        slider.change(json!("loud"));
        assert_eq!(surface.data_model().get("/vol"), Some(json!(10.0)));
    }

    #[test]
    fn test_choice_picker_single() {
        let surface = surface_with(
            json!([{"id": "root", "component": "ChoicePicker", "value": {"path": "/size"},
                "options": [{"label": "Small", "value": "s"}, {"label": "Large", "value": "l"}]}]),
            json!({"size": "s"}),
        );
        let picker = surface.render().unwrap();
        assert_eq!(picker.children[0].prop("selected"), Some(&json!(true)));
        assert_eq!(picker.children[1].prop("selected"), Some(&json!(false)));

        picker.children[1].click();
        assert_eq!(surface.data_model().get("/size"), Some(json!("l")));
    }

    #[test]
    fn test_choice_picker_multiple_toggles() {
        let surface = surface_with(
            json!([{"id": "root", "component": "ChoicePicker", "variant": "multipleSelection",
                "value": {"path": "/tags"},
                "options": [{"label": "A", "value": "a"}, {"label": "B", "value": "b"}]}]),
            json!({"tags": "a"}),
        );
        let picker = surface.render().unwrap();
        picker.children[1].click();
        assert_eq!(surface.data_model().get("/tags"), Some(json!(["a", "b"])));
        picker.children[0].click();
        assert_eq!(surface.data_model().get("/tags"), Some(json!(["b"])));
    }

    #[test]
    fn test_link_defaults() {
        let surface = surface_with(
            json!([{"id": "root", "component": "Link", "label": "Docs"}]),
            json!({}),
        );
        let link = surface.render().unwrap();
        assert_eq!(link.prop("href"), Some(&json!("#")));
        assert_eq!(link.text.as_deref(), Some("Docs"));
        assert!(!link.click());
    }

    #[test]
    fn test_date_time_input_writes_binding() {
        let surface = surface_with(
            json!([{"id": "root", "component": "DateTimeInput", "value": {"path": "/when"}}]),
            json!({}),
        );
        surface.render().unwrap().change(json!("2025-03-04T10:00"));
        assert_eq!(surface.data_model().get("/when"), Some(json!("2025-03-04T10:00")));
    }
}
