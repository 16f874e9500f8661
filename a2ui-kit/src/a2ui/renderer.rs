//! A2UI Tree Renderer
//!
//! Materializes a flat component table into an [`Element`] tree, starting at
//! the root id and asking the [`ComponentRegistry`] for an adapter per node.
//!
//! ```text
//! components (flat, by id)         Element tree
//!   root: Column [a, b]     ->     Column#root
//!   a: Text                          Text#a "Hello"
//!   b: Button (child: c)             Button#b [click]
//!   c: Text                            Text#c "Send"
//! ```

use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use super::context::ActionSink;
use super::data_model::DataModelStore;
use super::functions::FunctionRegistry;
use super::message::{ComponentNode, Direction, ROOT_COMPONENT_ID, Theme};
use super::registry::{AdapterProps, ComponentRegistry};

/// Maximum depth of a rendered tree. Deeper nodes render as absent.
pub const MAX_RENDER_DEPTH: usize = 64;

/// Maximum number of nodes visited in one render pass. Shared children are
/// visited once per reference, so a table can fan out far past its size.
pub const MAX_RENDERED_NODES: usize = 10_000;

/// Interaction kinds an element can react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Press, tap or toggle
    Click,
    /// New input value
    Change,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Click => "click",
            EventKind::Change => "change",
        }
    }
}

/// Event handler bound at render time.
pub type Handler = Rc<dyn Fn(&Value)>;

/// A rendered node.
///
/// Elements are plain data plus event handlers; presenting them is up to the
/// host. Handlers write to the data model or emit actions directly, so a host
/// only needs to call [`click`](Element::click) or
/// [`change`](Element::change) and re-render when the surface reports it
/// needs a redraw.
#[derive(Clone, Default)]
pub struct Element {
    /// Element kind, normally the component type name
    pub kind: String,

    /// Id of the component this element was rendered from
    pub component_id: Option<String>,

    /// Resolved properties
    pub props: Map<String, Value>,

    /// Text content
    pub text: Option<String>,

    pub children: Vec<Element>,

    handlers: Vec<(EventKind, Handler)>,
}

impl Element {
    pub fn new(kind: impl Into<String>) -> Self {
        Element {
            kind: kind.into(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.component_id = Some(id.into());
        self
    }

    pub fn with_prop(mut self, key: &str, value: Value) -> Self {
        self.props.insert(key.to_string(), value);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_children(mut self, children: Vec<Element>) -> Self {
        self.children = children;
        self
    }

    /// Attach a handler for `kind`.
    pub fn on(mut self, kind: EventKind, handler: impl Fn(&Value) + 'static) -> Self {
        self.handlers.push((kind, Rc::new(handler)));
        self
    }

    /// Attach an already shared handler for `kind`.
    pub fn on_handler(mut self, kind: EventKind, handler: Handler) -> Self {
        self.handlers.push((kind, handler));
        self
    }

    pub fn prop(&self, key: &str) -> Option<&Value> {
        self.props.get(key)
    }

    pub fn handles(&self, kind: EventKind) -> bool {
        self.handlers.iter().any(|(k, _)| *k == kind)
    }

    /// Invoke every handler for `kind`. Returns false when there is none.
    pub fn dispatch(&self, kind: EventKind, value: &Value) -> bool {
        let mut handled = false;
        for (k, handler) in &self.handlers {
            if *k == kind {
                handler(value);
                handled = true;
            }
        }
        handled
    }

    pub fn click(&self) -> bool {
        self.dispatch(EventKind::Click, &Value::Null)
    }

    pub fn change(&self, value: Value) -> bool {
        self.dispatch(EventKind::Change, &value)
    }

    /// Depth-first search by component id.
    pub fn find(&self, component_id: &str) -> Option<&Element> {
        if self.component_id.as_deref() == Some(component_id) {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(component_id))
    }

    fn write_outline(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        write!(f, "{:indent$}{}", "", self.kind, indent = indent * 2)?;
        if let Some(id) = &self.component_id {
            write!(f, "#{id}")?;
        }
        if !self.props.is_empty() {
            write!(f, " {}", Value::Object(self.props.clone()))?;
        }
        if let Some(text) = &self.text {
            write!(f, " {text:?}")?;
        }
        let mut kinds: Vec<&str> = self.handlers.iter().map(|(k, _)| k.as_str()).collect();
        kinds.dedup();
        if !kinds.is_empty() {
            write!(f, " [{}]", kinds.join(", "))?;
        }
        writeln!(f)?;
        for child in &self.children {
            child.write_outline(f, indent + 1)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("kind", &self.kind)
            .field("component_id", &self.component_id)
            .field("props", &self.props)
            .field("text", &self.text)
            .field("children", &self.children)
            .field(
                "handlers",
                &self.handlers.iter().map(|(k, _)| *k).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Indented outline, one element per line.
impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_outline(f, 0)
    }
}

/// Index a flat component list by id. Later duplicates replace earlier ones.
pub fn build_component_map(components: Vec<ComponentNode>) -> IndexMap<String, ComponentNode> {
    let mut map = IndexMap::with_capacity(components.len());
    for node in components {
        if map.contains_key(&node.id) {
            log::warn!("duplicate component id {:?}, keeping the last one", node.id);
        }
        map.insert(node.id.clone(), node);
    }
    map
}

/// The root id of a table, if it has a node with the root sentinel id.
pub fn root_id(components: &IndexMap<String, ComponentNode>) -> Option<String> {
    components
        .contains_key(ROOT_COMPONENT_ID)
        .then(|| ROOT_COMPONENT_ID.to_string())
}

/// Everything a render pass needs, borrowed from the owning surface.
pub struct RenderContext<'a> {
    pub components: &'a IndexMap<String, ComponentNode>,
    pub registry: &'a ComponentRegistry,
    pub data_model: &'a DataModelStore,
    pub functions: &'a Rc<FunctionRegistry>,
    pub surface_id: &'a str,
    pub on_action: &'a ActionSink,
    pub dir: Direction,
    pub theme: Option<&'a Theme>,
}

/// Render the tree below `root_id`. Nothing is rendered without a root.
pub fn render_tree(ctx: &RenderContext<'_>, root_id: Option<&str>) -> Option<Element> {
    let root_id = root_id?;
    let mut walk = Walk::default();
    render_node(ctx, root_id, &mut walk)
}

/// Per-pass walk state.
#[derive(Default)]
struct Walk {
    ancestors: Vec<String>,
    visited: usize,
}

fn render_node(ctx: &RenderContext<'_>, id: &str, walk: &mut Walk) -> Option<Element> {
    if walk.visited >= MAX_RENDERED_NODES {
        return None;
    }
    let Some(node) = ctx.components.get(id) else {
        log::debug!("component {id:?} is not in the table");
        return None;
    };
    if walk.ancestors.iter().any(|ancestor| ancestor == id) {
        log::warn!("component {id:?} references itself through its children");
        return None;
    }
    if walk.ancestors.len() >= MAX_RENDER_DEPTH {
        log::warn!("component tree deeper than {MAX_RENDER_DEPTH} at {id:?}");
        return None;
    }
    walk.visited += 1;
    if walk.visited == MAX_RENDERED_NODES {
        log::warn!("render pass reached {MAX_RENDERED_NODES} nodes at {id:?}, the rest renders as absent");
    }
    let Some(adapter) = ctx.registry.get(&node.component) else {
        log::debug!("no adapter for component type {:?} ({id})", node.component);
        return None;
    };

    walk.ancestors.push(id.to_string());
    let children: Vec<Element> = node
        .child_ids()
        .into_iter()
        .filter_map(|child_id| render_node(ctx, child_id, walk))
        .collect();
    walk.ancestors.pop();

    let props = AdapterProps {
        component: node,
        children,
        data_model: ctx.data_model,
        surface_id: ctx.surface_id,
        on_action: ctx.on_action,
        dir: ctx.dir,
        theme: ctx.theme,
        functions: ctx.functions,
    };

    match catch_unwind(AssertUnwindSafe(|| adapter.render(props))) {
        Ok(element) => element.map(|mut element| {
            if element.component_id.is_none() {
                element.component_id = Some(node.id.clone());
            }
            element
        }),
        Err(_) => {
            log::error!("adapter for {:?} panicked while rendering {id:?}", node.component);
            None
        }
    }
}
