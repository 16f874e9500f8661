//! Read-only components: text, media, indicators and tables.

use serde::Deserialize;
use serde_json::{Value, json};

use crate::a2ui::{AdapterProps, ComponentRegistry, Element};

pub(super) fn register(registry: &mut ComponentRegistry) {
    registry.register("Text", text);
    registry.register("Markdown", markdown);
    registry.register("CodeBlock", code_block);
    registry.register("Image", image);
    registry.register("Icon", icon);
    registry.register("Divider", divider);
    registry.register("Badge", badge);
    registry.register("ProgressIndicator", progress_indicator);
    registry.register("Snackbar", snackbar);
    registry.register("DataTable", data_table);
    registry.register("Video", video);
    registry.register("Audio", audio);
}

/// Copy a literal styling hint when the component sets one.
fn with_hint(element: Element, props: &AdapterProps<'_>, keys: &[&str], name: &str) -> Element {
    match props.resolve_string(keys, "") {
        hint if hint.is_empty() => element,
        hint => element.with_prop(name, json!(hint)),
    }
}

fn text(props: AdapterProps<'_>) -> Option<Element> {
    let content = props.resolve_string(&["text", "content"], "");
    let element = Element::new("Text").with_text(content);
    let element = with_hint(element, &props, &["variant", "usageHint"], "variant");
    Some(with_hint(element, &props, &["tone"], "tone"))
}

fn markdown(props: AdapterProps<'_>) -> Option<Element> {
    let source = props.resolve_string(&["source", "text", "content"], "");
    Some(Element::new("Markdown").with_text(source))
}

fn code_block(props: AdapterProps<'_>) -> Option<Element> {
    let code = props.resolve_string(&["code", "text", "content"], "");
    let language = props.resolve_string(&["language"], "text");
    Some(
        Element::new("CodeBlock")
            .with_prop("language", json!(language))
            .with_text(code),
    )
}

fn image(props: AdapterProps<'_>) -> Option<Element> {
    let src = props.resolve_string(&["src", "url"], "");
    if src.is_empty() {
        return None;
    }
    let alt = props.resolve_string(&["alt"], "");
    Some(
        Element::new("Image")
            .with_prop("src", json!(src))
            .with_prop("alt", json!(alt)),
    )
}

fn icon(props: AdapterProps<'_>) -> Option<Element> {
    let name = props.resolve_string(&["name", "icon"], "");
    let size = props.resolve_f64(&["size"], 24.0);
    Some(
        Element::new("Icon")
            .with_prop("name", json!(name))
            .with_prop("size", json!(size)),
    )
}

fn divider(props: AdapterProps<'_>) -> Option<Element> {
    let axis = props.resolve_string(&["axis"], "horizontal");
    Some(Element::new("Divider").with_prop("axis", json!(axis)))
}

fn badge(props: AdapterProps<'_>) -> Option<Element> {
    let label = props.resolve_string(&["text", "label"], "");
    let element = Element::new("Badge").with_text(label);
    Some(with_hint(element, &props, &["variant"], "variant"))
}

/// Completion as a percentage of `max`, clamped to `0..=100`.
fn percent(value: f64, max: f64) -> f64 {
    if max <= 0.0 || !value.is_finite() {
        return 0.0;
    }
    (value * 100.0 / max).clamp(0.0, 100.0)
}

fn progress_indicator(props: AdapterProps<'_>) -> Option<Element> {
    let value = props.resolve_f64(&["value", "progress"], 0.0);
    let max = props.resolve_f64(&["max"], 100.0);
    Some(Element::new("ProgressIndicator").with_prop("percent", json!(percent(value, max))))
}

fn snackbar(props: AdapterProps<'_>) -> Option<Element> {
    let message = props.resolve_string(&["message", "text"], "");
    let open = props.resolve_bool(&["open", "visible"], true);
    if !open || message.is_empty() {
        return None;
    }
    Some(Element::new("Snackbar").with_text(message))
}

fn media(kind: &str, props: AdapterProps<'_>) -> Option<Element> {
    let src = props.resolve_string(&["src", "url"], "");
    if src.is_empty() {
        return None;
    }
    Some(Element::new(kind).with_prop("src", json!(src)))
}

fn video(props: AdapterProps<'_>) -> Option<Element> {
    media("Video", props)
}

fn audio(props: AdapterProps<'_>) -> Option<Element> {
    media("Audio", props)
}

#[derive(Debug, Deserialize)]
struct TableColumn {
    key: String,
    #[serde(default)]
    header: Option<String>,
}

fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn data_table(props: AdapterProps<'_>) -> Option<Element> {
    let columns: Vec<TableColumn> = props
        .component
        .prop("columns")
        .and_then(|raw| serde_json::from_value(raw.clone()).ok())
        .unwrap_or_default();
    let rows = match props.resolve_prop(&["data", "items"], json!([])) {
        Value::Array(rows) => rows,
        _ => Vec::new(),
    };

    let header = Element::new("TableHeader").with_children(
        columns
            .iter()
            .map(|column| {
                Element::new("TableCell").with_text(column.header.as_deref().unwrap_or(&column.key))
            })
            .collect(),
    );
    let body = rows.iter().map(|row| {
        Element::new("TableRow").with_children(
            columns
                .iter()
                .map(|column| Element::new("TableCell").with_text(cell_text(row.get(&column.key))))
                .collect(),
        )
    });

    Some(Element::new("DataTable").with_children(std::iter::once(header).chain(body).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::a2ui::{Surface, SurfaceOptions};

    fn render_one(component: Value, data: Value) -> Option<Element> {
        let surface = Surface::new(SurfaceOptions::new("s"));
        surface.data_model().set("/", data);
        surface.process_message(
            &serde_json::from_value(json!({"version": "v0.9", "updateComponents": {
                "surfaceId": "s", "components": [component]
            }}))
            .unwrap(),
        );
        surface.render()
    }

    #[test]
    fn test_text_resolves_binding() {
        let element = render_one(
            json!({"id": "root", "component": "Text", "text": {"path": "/user/name"}, "usageHint": "h1"}),
            json!({"user": {"name": "Ann"}}),
        )
        .unwrap();
        assert_eq!(element.text.as_deref(), Some("Ann"));
        assert_eq!(element.prop("variant"), Some(&json!("h1")));

        let missing = render_one(
            json!({"id": "root", "component": "Text", "text": {"path": "/nope"}}),
            json!({}),
        )
        .unwrap();
        assert_eq!(missing.text.as_deref(), Some(""));
    }

    #[test]
    fn test_image_without_source_renders_nothing() {
        assert!(render_one(json!({"id": "root", "component": "Image"}), json!({})).is_none());
        let image = render_one(
            json!({"id": "root", "component": "Image", "url": "https://img/x.png"}),
            json!({}),
        )
        .unwrap();
        assert_eq!(image.prop("src"), Some(&json!("https://img/x.png")));
    }

    #[test]
    fn test_progress_percent_is_clamped() {
        assert_eq!(percent(50.0, 200.0), 25.0);
        assert_eq!(percent(150.0, 100.0), 100.0);
        assert_eq!(percent(-3.0, 100.0), 0.0);
        assert_eq!(percent(5.0, 0.0), 0.0);

        let element = render_one(
            json!({"id": "root", "component": "ProgressIndicator", "value": {"path": "/p"}}),
            json!({"p": 30}),
        )
        .unwrap();
        assert_eq!(element.prop("percent"), Some(&json!(30.0)));
    }

    #[test]
    fn test_snackbar_visibility() {
        assert!(
            render_one(
                json!({"id": "root", "component": "Snackbar", "message": "Saved", "open": false}),
                json!({})
            )
            .is_none()
        );
        assert!(render_one(json!({"id": "root", "component": "Snackbar"}), json!({})).is_none());
        let shown = render_one(
            json!({"id": "root", "component": "Snackbar", "text": "Saved"}),
            json!({}),
        )
        .unwrap();
        assert_eq!(shown.text.as_deref(), Some("Saved"));
    }

    #[test]
    fn test_data_table_rows_follow_columns() {
        let table = render_one(
            json!({"id": "root", "component": "DataTable",
                "columns": [{"key": "name", "header": "Name"}, {"key": "age"}],
                "data": {"path": "/people"}}),
            json!({"people": [{"name": "Ann", "age": 31}, {"name": "Ben"}]}),
        )
        .unwrap();

        assert_eq!(table.children.len(), 3);
        let headers: Vec<_> = table.children[0]
            .children
            .iter()
            .map(|cell| cell.text.clone().unwrap())
            .collect();
        assert_eq!(headers, vec!["Name", "age"]);
        let second: Vec<_> = table.children[2]
            .children
            .iter()
            .map(|cell| cell.text.clone().unwrap())
            .collect();
        assert_eq!(second, vec!["Ben", ""]);
        assert_eq!(table.children[1].children[1].text.as_deref(), Some("31"));
    }

    #[test]
    fn test_media_needs_source() {
        assert!(render_one(json!({"id": "root", "component": "Video"}), json!({})).is_none());
        let audio = render_one(
            json!({"id": "root", "component": "Audio", "src": "https://a/b.mp3"}),
            json!({}),
        )
        .unwrap();
        assert_eq!(audio.kind, "Audio");
    }
}
