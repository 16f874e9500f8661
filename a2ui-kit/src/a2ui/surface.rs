//! A2UI Surface
//!
//! One independently addressable UI instance. A surface ingests protocol
//! messages addressed to its id, owns the data model, renders the component
//! table through the registry, and turns raw action intents from rendered
//! elements into resolved actions for the host callback and the transport.

use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use super::context::{ActionIntent, ActionSink, ContextResolver};
use super::data_model::{DataModelStore, Subscription};
use super::functions::FunctionRegistry;
use super::message::{A2uiMessage, Direction, ResolvedAction, Theme, message_from_value};
use super::processor::{ProcessorEvent, RenderState, SurfaceLifecycle, SurfaceState};
use super::registry::ComponentRegistry;
use super::renderer::{Element, RenderContext, render_tree};
use super::transport::{SharedTransport, TransportError};

/// Callback receiving every resolved action.
pub type ActionCallback = Rc<dyn Fn(&ResolvedAction)>;

/// Construction options for a [`Surface`].
#[derive(Clone)]
pub struct SurfaceOptions {
    pub surface_id: String,

    /// Direction used until a `createSurface` sets one
    pub dir: Direction,

    /// Theme used until a `createSurface` sets one
    pub theme: Option<Theme>,

    /// Adapters merged over the standard catalog, these win
    pub components: ComponentRegistry,

    pub functions: Rc<FunctionRegistry>,
}

impl SurfaceOptions {
    pub fn new(surface_id: impl Into<String>) -> Self {
        SurfaceOptions {
            surface_id: surface_id.into(),
            dir: Direction::Ltr,
            theme: None,
            components: ComponentRegistry::new(),
            functions: Rc::new(FunctionRegistry::with_builtins()),
        }
    }

    pub fn with_dir(mut self, dir: Direction) -> Self {
        self.dir = dir;
        self
    }

    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = Some(theme);
        self
    }

    pub fn with_components(mut self, components: ComponentRegistry) -> Self {
        self.components = components;
        self
    }

    pub fn with_functions(mut self, functions: FunctionRegistry) -> Self {
        self.functions = Rc::new(functions);
        self
    }
}

struct SurfaceInner {
    id: String,
    state: RefCell<SurfaceState>,
    data_model: DataModelStore,
    registry: ComponentRegistry,
    functions: Rc<FunctionRegistry>,
    default_dir: Direction,
    default_theme: Option<Theme>,
    on_action: RefCell<Option<ActionCallback>>,
    transport: RefCell<Option<SharedTransport>>,
    needs_redraw: Rc<Cell<bool>>,
    redraw_on_write: Subscription,
}

impl Drop for SurfaceInner {
    fn drop(&mut self) {
        self.redraw_on_write.unsubscribe();
    }
}

/// Handle to a surface. Clones share the same surface.
///
/// # Example
///
/// ```rust,ignore
/// let surface = Surface::new(SurfaceOptions::new("main"));
/// surface.set_on_action(|action| println!("{}", action.name));
///
/// surface.process_json(json_from_server);
/// if surface.needs_redraw() {
///     let tree = surface.render();
///     surface.clear_dirty();
/// }
/// ```
#[derive(Clone)]
pub struct Surface {
    inner: Rc<SurfaceInner>,
}

impl fmt::Debug for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Surface")
            .field("id", &self.inner.id)
            .field("state", &*self.inner.state.borrow())
            .field("data_model", &self.inner.data_model)
            .finish()
    }
}

impl Surface {
    pub fn new(options: SurfaceOptions) -> Self {
        let mut registry = ComponentRegistry::with_standard_catalog();
        registry.merge(&options.components);

        let data_model = DataModelStore::new();
        let needs_redraw = Rc::new(Cell::new(true));
        let flag = Rc::clone(&needs_redraw);
        let redraw_on_write = data_model.on_change(move || flag.set(true));

        Surface {
            inner: Rc::new(SurfaceInner {
                id: options.surface_id,
                state: RefCell::new(SurfaceState::new()),
                data_model,
                registry,
                functions: options.functions,
                default_dir: options.dir,
                default_theme: options.theme,
                on_action: RefCell::new(None),
                transport: RefCell::new(None),
                needs_redraw,
                redraw_on_write,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn data_model(&self) -> &DataModelStore {
        &self.inner.data_model
    }

    pub fn functions(&self) -> &Rc<FunctionRegistry> {
        &self.inner.functions
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.inner.registry
    }

    pub fn state(&self) -> Ref<'_, SurfaceState> {
        self.inner.state.borrow()
    }

    pub fn lifecycle(&self) -> SurfaceLifecycle {
        self.inner.state.borrow().lifecycle
    }

    pub fn render_state(&self) -> RenderState {
        self.inner.state.borrow().render_state()
    }

    /// Effective direction: the one from `createSurface`, else the default.
    pub fn dir(&self) -> Direction {
        self.inner.state.borrow().dir.unwrap_or(self.inner.default_dir)
    }

    /// Effective theme: the one from `createSurface`, else the default.
    pub fn theme(&self) -> Option<Theme> {
        self.inner
            .state
            .borrow()
            .theme
            .clone()
            .or_else(|| self.inner.default_theme.clone())
    }

    /// Whether the component table or the data model changed since the last
    /// [`clear_dirty`](Self::clear_dirty).
    pub fn needs_redraw(&self) -> bool {
        self.inner.needs_redraw.get()
    }

    /// Mark the surface as needing redraw
    pub fn mark_dirty(&self) {
        self.inner.needs_redraw.set(true);
    }

    /// Clear the dirty flag
    pub fn clear_dirty(&self) {
        self.inner.needs_redraw.set(false);
    }

    /// Set the callback receiving resolved actions, replacing any previous one.
    pub fn set_on_action(&self, callback: impl Fn(&ResolvedAction) + 'static) {
        *self.inner.on_action.borrow_mut() = Some(Rc::new(callback));
    }

    /// Send resolved actions through `transport` as well.
    pub fn attach_transport(&self, transport: SharedTransport) {
        *self.inner.transport.borrow_mut() = Some(transport);
    }

    pub fn detach_transport(&self) {
        *self.inner.transport.borrow_mut() = None;
    }

    /// Apply one message. Messages for other surfaces are ignored.
    pub fn process_message(&self, message: &A2uiMessage) -> Option<ProcessorEvent> {
        let applied = self
            .inner
            .state
            .borrow_mut()
            .apply(&self.inner.id, message);

        // The state borrow is released before subscribers run.
        if let Some(write) = applied.write {
            self.inner.data_model.set(&write.path, write.value);
        }
        if applied.event.is_some() {
            self.mark_dirty();
        }
        applied.event
    }

    /// Apply messages in order.
    pub fn process_messages(&self, messages: &[A2uiMessage]) -> Vec<ProcessorEvent> {
        messages
            .iter()
            .filter_map(|message| self.process_message(message))
            .collect()
    }

    /// Apply a JSON payload holding one message or an array of messages.
    ///
    /// Malformed payloads are dropped; inside an array only the malformed
    /// elements are.
    pub fn process_json(&self, json: &str) -> Vec<ProcessorEvent> {
        let value: Value = match serde_json::from_str(json) {
            Ok(value) => value,
            Err(err) => {
                log::debug!("discarding malformed A2UI payload: {err}");
                return Vec::new();
            }
        };
        let messages: Vec<A2uiMessage> = match value {
            Value::Array(items) => items.into_iter().filter_map(message_from_value).collect(),
            single => message_from_value(single).into_iter().collect(),
        };
        self.process_messages(&messages)
    }

    /// Render the current component table. `None` while there is no root.
    pub fn render(&self) -> Option<Element> {
        let state = self.inner.state.borrow();
        let sink = self.action_sink();
        let theme = state.theme.as_ref().or(self.inner.default_theme.as_ref());
        let ctx = RenderContext {
            components: &state.components,
            registry: &self.inner.registry,
            data_model: &self.inner.data_model,
            functions: &self.inner.functions,
            surface_id: &self.inner.id,
            on_action: &sink,
            dir: state.dir.unwrap_or(self.inner.default_dir),
            theme,
        };
        render_tree(&ctx, state.root_id.as_deref())
    }

    /// Sink handed to rendered elements. Holds the surface weakly, so
    /// elements kept past the surface emit nothing.
    fn action_sink(&self) -> ActionSink {
        let surface: Weak<SurfaceInner> = Rc::downgrade(&self.inner);
        Rc::new(move |intent: ActionIntent| match surface.upgrade() {
            Some(inner) => {
                Surface { inner }.dispatch(intent);
            }
            None => log::debug!("dropping action {:?}, surface is gone", intent.name),
        })
    }

    /// Resolve an intent against the data model as it is now, then hand the
    /// result to the callback and the transport.
    pub fn dispatch(&self, intent: ActionIntent) -> ResolvedAction {
        let action = self.resolve(intent);

        let callback = self.inner.on_action.borrow().clone();
        if let Some(callback) = callback {
            callback(&action);
        }

        let transport = self.inner.transport.borrow().clone();
        if let Some(transport) = transport {
            match transport.try_borrow_mut() {
                Ok(mut transport) => match transport.send_action(&action) {
                    Ok(()) => {}
                    Err(TransportError::Unsupported(name)) => {
                        log::trace!("{name} transport does not send actions")
                    }
                    Err(e) => log::warn!("sending action {:?} failed: {e}", action.name),
                },
                Err(_) => log::warn!("transport busy, action {:?} not sent", action.name),
            }
        }

        action
    }

    /// Resolve an intent without dispatching it.
    pub fn resolve(&self, intent: ActionIntent) -> ResolvedAction {
        let resolver = ContextResolver::new(&self.inner.data_model, &self.inner.functions);
        let context =
            (!intent.context.is_empty()).then(|| resolver.resolve_context(&intent.context));
        let data_model = self
            .inner
            .state
            .borrow()
            .sends_data_model()
            .then(|| self.inner.data_model.get_all());

        ResolvedAction {
            surface_id: self.inner.id.clone(),
            source_component_id: intent.source_component_id,
            name: intent.name,
            context,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            data_model,
        }
    }
}
