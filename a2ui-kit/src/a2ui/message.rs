//! A2UI Protocol Message Types
//!
//! This module defines the Rust types for the A2UI v0.9 protocol messages.
//! Messages are serialized/deserialized using serde_json.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

use super::value::FunctionCallRef;

/// Protocol version written on outbound messages.
pub const PROTOCOL_VERSION: &str = "v0.9";

/// Id of the component the renderer starts from.
pub const ROOT_COMPONENT_ID: &str = "root";

/// Lenient direction deserializer, unknown values are dropped.
fn lenient_direction<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Direction>, D::Error> {
    let val = Option::<Value>::deserialize(d)?
        .and_then(|v| v.as_str().and_then(Direction::from_str_opt));
    Ok(val)
}

/// Lenient optional field, a value of the wrong shape is dropped.
fn lenient<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let val = Option::<Value>::deserialize(d)?.and_then(|v| serde_json::from_value(v).ok());
    Ok(val)
}

/// Like [`lenient`], falling back to the default value.
fn lenient_or_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    lenient(d).map(Option::unwrap_or_default)
}

/// Component type name. Anything but a string leaves it empty, which no
/// adapter answers to, so the node renders as absent.
fn lenient_type_name<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let val = Option::<Value>::deserialize(d)?
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();
    Ok(val)
}

/// Component list deserializer. Nodes are read one by one and a node
/// without a string `id` is dropped on its own.
fn lenient_components<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<ComponentNode>, D::Error> {
    let nodes = Option::<Vec<Value>>::deserialize(d)?
        .unwrap_or_default()
        .into_iter()
        .filter_map(|v| match serde_json::from_value::<ComponentNode>(v) {
            Ok(node) => Some(node),
            Err(err) => {
                log::debug!("dropping malformed component: {err}");
                None
            }
        })
        .collect();
    Ok(nodes)
}

/// Keeps an explicit `null` as `Some(Value::Null)`; only a missing field is `None`.
fn present_value<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(d).map(Some)
}

/// Top-level A2UI message: a `version` plus exactly one message body key.
///
/// ```text
/// {"version": "v0.9", "createSurface": {"surfaceId": "main", "catalogId": "standard"}}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct A2uiMessage {
    /// Protocol version, currently "v0.9"
    pub version: String,

    #[serde(flatten)]
    pub body: MessageBody,
}

/// The message kinds the server can send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MessageBody {
    /// Initialize a new UI surface
    CreateSurface(CreateSurface),

    /// Replace the component table of a surface
    UpdateComponents(UpdateComponents),

    /// Write into the data model
    UpdateDataModel(UpdateDataModel),

    /// Clear a surface
    DeleteSurface(DeleteSurface),
}

impl A2uiMessage {
    pub fn new(body: MessageBody) -> Self {
        A2uiMessage {
            version: PROTOCOL_VERSION.to_string(),
            body,
        }
    }

    /// Get the surface ID this message applies to
    pub fn surface_id(&self) -> &str {
        match &self.body {
            MessageBody::CreateSurface(m) => &m.surface_id,
            MessageBody::UpdateComponents(m) => &m.surface_id,
            MessageBody::UpdateDataModel(m) => &m.surface_id,
            MessageBody::DeleteSurface(m) => &m.surface_id,
        }
    }

    /// Short name of the message kind, for logging.
    pub fn kind(&self) -> &'static str {
        match &self.body {
            MessageBody::CreateSurface(_) => "createSurface",
            MessageBody::UpdateComponents(_) => "updateComponents",
            MessageBody::UpdateDataModel(_) => "updateDataModel",
            MessageBody::DeleteSurface(_) => "deleteSurface",
        }
    }
}

/// Parse one JSON message. Malformed input is logged and dropped.
pub fn parse_message(json: &str) -> Option<A2uiMessage> {
    match serde_json::from_str::<A2uiMessage>(json) {
        Ok(message) => Some(message),
        Err(err) => {
            log::debug!("discarding malformed A2UI message: {err}");
            None
        }
    }
}

/// Parse a message from an already decoded JSON value.
pub fn message_from_value(value: Value) -> Option<A2uiMessage> {
    match serde_json::from_value::<A2uiMessage>(value) {
        Ok(message) => Some(message),
        Err(err) => {
            log::debug!("discarding malformed A2UI message: {err}");
            None
        }
    }
}

/// Initialize a new UI surface.
///
/// # Example JSON
///
/// ```text
/// {
///   "createSurface": {
///     "surfaceId": "main",
///     "catalogId": "standard",
///     "theme": {"primaryColor": "#007BFF", "radius": "md"},
///     "sendDataModel": true,
///     "config": {"dir": "rtl"}
///   }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSurface {
    /// Unique identifier for this surface
    pub surface_id: String,

    /// Component catalog the server expects
    #[serde(default)]
    pub catalog_id: String,

    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub theme: Option<Theme>,

    /// Attach a data model snapshot to every outbound action
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub send_data_model: Option<bool>,

    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub config: Option<SurfaceConfig>,
}

/// Surface configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurfaceConfig {
    #[serde(
        default,
        deserialize_with = "lenient_direction",
        skip_serializing_if = "Option::is_none"
    )]
    pub dir: Option<Direction>,
}

/// Text direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Ltr,
    Rtl,
}

impl Direction {
    fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "ltr" => Some(Direction::Ltr),
            "rtl" => Some(Direction::Rtl),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Ltr => "ltr",
            Direction::Rtl => "rtl",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Theme tokens for a surface.
///
/// Tokens are passed through to adapters; a token of an unexpected shape is
/// dropped without affecting the others.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub primary: Option<String>,

    /// Primary color (hex format)
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub primary_color: Option<String>,

    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub secondary: Option<String>,

    /// Corner radius token
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub radius: Option<Radius>,

    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub typography: Option<Typography>,

    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub spacing: Option<Spacing>,

    /// Named color overrides
    #[serde(
        default,
        deserialize_with = "lenient_or_default",
        skip_serializing_if = "HashMap::is_empty"
    )]
    pub colors: HashMap<String, String>,

    /// Additional custom tokens
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// Corner radius token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Radius {
    None,
    Sm,
    #[default]
    Md,
    Lg,
    Full,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Typography {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<FontSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<FontSpec>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FontSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Spacing {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sm: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub md: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lg: Option<String>,
}

/// Replace the components of a surface.
///
/// # Example JSON
///
/// ```text
/// {
///   "updateComponents": {
///     "surfaceId": "main",
///     "components": [
///       {"id": "root", "component": "Column", "children": ["title", "name"]},
///       {"id": "title", "component": "Text", "text": "Hello"},
///       {"id": "name", "component": "TextField", "value": {"path": "/name"}}
///     ]
///   }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateComponents {
    /// Target surface ID
    pub surface_id: String,

    /// The complete flat component list
    #[serde(default, deserialize_with = "lenient_components")]
    pub components: Vec<ComponentNode>,
}

/// A single component in the adjacency list.
///
/// Everything besides the structural fields is kept verbatim in `properties`
/// and interpreted by the component adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentNode {
    /// Unique component ID
    pub id: String,

    /// Component type name, looked up in the component registry
    #[serde(default, deserialize_with = "lenient_type_name")]
    pub component: String,

    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub children: Option<ChildList>,

    /// Single child component ID
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub child: Option<String>,

    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

impl ComponentNode {
    pub fn new(id: impl Into<String>, component: impl Into<String>) -> Self {
        ComponentNode {
            id: id.into(),
            component: component.into(),
            children: None,
            child: None,
            properties: Map::new(),
        }
    }

    /// Builder-style property setter.
    pub fn with(mut self, key: &str, value: Value) -> Self {
        self.properties.insert(key.to_string(), value);
        self
    }

    pub fn with_children<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.children = Some(ChildList::Explicit(ids.into_iter().map(Into::into).collect()));
        self
    }

    pub fn with_child(mut self, id: impl Into<String>) -> Self {
        self.child = Some(id.into());
        self
    }

    /// Raw property by name.
    pub fn prop(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Child ids in render order: `children` when it is an explicit list,
    /// otherwise the single `child`.
    pub fn child_ids(&self) -> Vec<&str> {
        match &self.children {
            Some(ChildList::Explicit(ids)) => ids.iter().map(String::as_str).collect(),
            Some(ChildList::Template { .. }) => Vec::new(),
            None => self.child.as_deref().into_iter().collect(),
        }
    }
}

/// Children reference - either explicit list or template-based
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChildList {
    /// Explicit list of child component IDs
    Explicit(Vec<String>),

    /// Template-based children (for dynamic lists)
    Template {
        /// Data binding path for the list data
        path: String,
        /// Template component ID
        #[serde(rename = "componentId")]
        component_id: String,
    },
}

/// Write into the data model.
///
/// A missing `path` means the root; a missing `value` makes the message a
/// no-op, while an explicit `null` is written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDataModel {
    /// Target surface ID
    pub surface_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub value: Option<Value>,
}

impl UpdateDataModel {
    /// Target path, defaulting to the root.
    pub fn path_or_root(&self) -> &str {
        self.path.as_deref().unwrap_or("/")
    }
}

/// Clear a surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteSurface {
    /// Surface ID to delete
    pub surface_id: String,
}

// ============================================================================
// Actions
// ============================================================================

/// Action definition for interactive components
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionDefinition {
    /// Event sent to the server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<ActionEvent>,

    /// Function run locally on the client
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCallRef>,
}

/// Named event with an unresolved context
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionEvent {
    /// Action name (e.g., "addToCart", "submit")
    pub name: String,

    /// Context values, resolved against the data model when the action fires
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Map<String, Value>>,
}

/// Validation check attached to a component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckDefinition {
    /// Check function name
    pub call: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Map<String, Value>>,

    /// Message shown when the check fails
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Client-to-server action message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionMessage {
    pub version: String,
    pub action: ResolvedAction,
}

impl ActionMessage {
    pub fn new(action: ResolvedAction) -> Self {
        ActionMessage {
            version: PROTOCOL_VERSION.to_string(),
            action,
        }
    }
}

/// An action whose context has been fully resolved against the data model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedAction {
    /// Source surface ID
    pub surface_id: String,

    /// Component that triggered the action
    pub source_component_id: String,

    /// Action name
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Map<String, Value>>,

    /// ISO-8601 time at which the action was resolved
    pub timestamp: String,

    /// Full data model snapshot, only for surfaces created with `sendDataModel`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_model: Option<Value>,
}
