//! A2UI Message Processor
//!
//! Applies incoming A2UI messages to the state of one surface. The processor
//! owns no callbacks and no data model: writes to the data model are handed
//! back to the caller as part of the outcome, so they can run once the state
//! borrow is released.

use indexmap::IndexMap;
use serde_json::Value;

use super::message::*;
use super::renderer::{build_component_map, root_id};

/// Lifecycle of a surface.
///
/// ```text
/// Uninitialized --createSurface--> Active --deleteSurface--> Cleared
///                                    ^                          |
///                                    +----updateComponents------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SurfaceLifecycle {
    #[default]
    Uninitialized,
    Active,
    Cleared,
}

/// Whether the surface currently has something to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderState {
    /// No table or no root
    Empty,
    /// A table with a resolvable root
    Populated,
}

/// Event emitted when a surface is created
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceCreatedEvent {
    pub surface_id: String,
}

/// Event emitted when the component table is replaced
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceUpdatedEvent {
    pub surface_id: String,
    pub component_ids: Vec<String>,
}

/// Event emitted when a surface is cleared
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceDeletedEvent {
    pub surface_id: String,
}

/// Event emitted when data model is written
#[derive(Debug, Clone, PartialEq)]
pub struct DataModelUpdatedEvent {
    pub surface_id: String,
    pub path: String,
}

/// Events that can be emitted by the processor
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessorEvent {
    SurfaceCreated(SurfaceCreatedEvent),
    SurfaceUpdated(SurfaceUpdatedEvent),
    SurfaceDeleted(SurfaceDeletedEvent),
    DataModelUpdated(DataModelUpdatedEvent),
}

/// A data model write requested by an `updateDataModel` message.
#[derive(Debug, Clone, PartialEq)]
pub struct DataWrite {
    pub path: String,
    pub value: Value,
}

/// Outcome of applying one message.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Applied {
    pub event: Option<ProcessorEvent>,
    pub write: Option<DataWrite>,
}

impl Applied {
    fn ignored() -> Self {
        Self::default()
    }

    fn event(event: ProcessorEvent) -> Self {
        Applied {
            event: Some(event),
            write: None,
        }
    }
}

/// Component table and configuration of one surface.
#[derive(Debug, Clone, Default)]
pub struct SurfaceState {
    pub lifecycle: SurfaceLifecycle,

    /// Component definitions by ID, in declaration order
    pub components: IndexMap<String, ComponentNode>,

    /// Root component ID, set when the table contains the root sentinel
    pub root_id: Option<String>,

    pub catalog_id: Option<String>,

    pub dir: Option<Direction>,

    pub theme: Option<Theme>,

    pub send_data_model: Option<bool>,
}

impl SurfaceState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a component by ID
    pub fn get_component(&self, id: &str) -> Option<&ComponentNode> {
        self.components.get(id)
    }

    /// Get all component IDs
    pub fn component_ids(&self) -> impl Iterator<Item = &String> {
        self.components.keys()
    }

    pub fn render_state(&self) -> RenderState {
        match &self.root_id {
            Some(root) if self.components.contains_key(root) => RenderState::Populated,
            _ => RenderState::Empty,
        }
    }

    pub fn sends_data_model(&self) -> bool {
        self.send_data_model.unwrap_or(false)
    }

    /// Apply one message addressed to `surface_id`.
    ///
    /// Messages for another surface are ignored. An `updateDataModel` is not
    /// written here, it comes back as [`Applied::write`].
    pub fn apply(&mut self, surface_id: &str, message: &A2uiMessage) -> Applied {
        if message.surface_id() != surface_id {
            log::trace!(
                "ignoring {} for surface {:?} on {:?}",
                message.kind(),
                message.surface_id(),
                surface_id
            );
            return Applied::ignored();
        }

        match &message.body {
            MessageBody::CreateSurface(create) => self.create(create),
            MessageBody::UpdateComponents(update) => self.update_components(update),
            MessageBody::UpdateDataModel(update) => self.update_data_model(update),
            MessageBody::DeleteSurface(delete) => self.delete(delete),
        }
    }

    fn create(&mut self, create: &CreateSurface) -> Applied {
        if self.catalog_id.is_none() && !create.catalog_id.is_empty() {
            self.catalog_id = Some(create.catalog_id.clone());
        }
        if self.dir.is_none() {
            self.dir = create.config.as_ref().and_then(|config| config.dir);
        }
        if self.theme.is_none() {
            self.theme = create.theme.clone();
        }
        if self.send_data_model.is_none() {
            self.send_data_model = create.send_data_model;
        }
        self.lifecycle = SurfaceLifecycle::Active;

        log::debug!("surface {:?} created", create.surface_id);
        Applied::event(ProcessorEvent::SurfaceCreated(SurfaceCreatedEvent {
            surface_id: create.surface_id.clone(),
        }))
    }

    fn update_components(&mut self, update: &UpdateComponents) -> Applied {
        self.components = build_component_map(update.components.clone());
        self.root_id = root_id(&self.components);
        if self.lifecycle == SurfaceLifecycle::Cleared {
            self.lifecycle = SurfaceLifecycle::Active;
        }
        if self.root_id.is_none() {
            log::debug!(
                "surface {:?} has no {ROOT_COMPONENT_ID:?} component, nothing to render",
                update.surface_id
            );
        }

        Applied::event(ProcessorEvent::SurfaceUpdated(SurfaceUpdatedEvent {
            surface_id: update.surface_id.clone(),
            component_ids: self.components.keys().cloned().collect(),
        }))
    }

    fn update_data_model(&mut self, update: &UpdateDataModel) -> Applied {
        let Some(value) = &update.value else {
            return Applied::ignored();
        };
        let path = update.path_or_root().to_string();
        Applied {
            event: Some(ProcessorEvent::DataModelUpdated(DataModelUpdatedEvent {
                surface_id: update.surface_id.clone(),
                path: path.clone(),
            })),
            write: Some(DataWrite {
                path,
                value: value.clone(),
            }),
        }
    }

    fn delete(&mut self, delete: &DeleteSurface) -> Applied {
        self.components.clear();
        self.root_id = None;
        self.lifecycle = SurfaceLifecycle::Cleared;

        log::debug!("surface {:?} cleared", delete.surface_id);
        Applied::event(ProcessorEvent::SurfaceDeleted(SurfaceDeletedEvent {
            surface_id: delete.surface_id.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn msg(value: Value) -> A2uiMessage {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_process_create_surface() {
        let mut state = SurfaceState::new();
        assert_eq!(state.lifecycle, SurfaceLifecycle::Uninitialized);

        let applied = state.apply(
            "main",
            &msg(json!({"version": "v0.9", "createSurface": {
                "surfaceId": "main", "catalogId": "std",
                "sendDataModel": true, "config": {"dir": "rtl"}
            }})),
        );

        assert_eq!(state.lifecycle, SurfaceLifecycle::Active);
        assert_eq!(state.dir, Some(Direction::Rtl));
        assert!(state.sends_data_model());
        assert_eq!(state.catalog_id.as_deref(), Some("std"));
        assert!(matches!(applied.event, Some(ProcessorEvent::SurfaceCreated(_))));
        assert_eq!(state.render_state(), RenderState::Empty);
    }

    #[test]
    fn test_create_surface_first_value_wins() {
        let mut state = SurfaceState::new();
        state.apply(
            "s",
            &msg(json!({"version": "v0.9", "createSurface": {"surfaceId": "s", "catalogId": "c", "config": {"dir": "rtl"}}})),
        );
        state.apply(
            "s",
            &msg(json!({"version": "v0.9", "createSurface": {"surfaceId": "s", "catalogId": "c", "sendDataModel": true, "config": {"dir": "ltr"}}})),
        );
        assert_eq!(state.dir, Some(Direction::Rtl));
        assert_eq!(state.send_data_model, Some(true));
    }

    #[test]
    fn test_mismatched_surface_is_ignored() {
        let mut state = SurfaceState::new();
        let applied = state.apply(
            "mine",
            &msg(json!({"version": "v0.9", "updateComponents": {"surfaceId": "other", "components": [{"id": "root", "component": "Text"}]}})),
        );
        assert_eq!(applied, Applied::default());
        assert!(state.components.is_empty());
        assert_eq!(state.lifecycle, SurfaceLifecycle::Uninitialized);
    }

    #[test]
    fn test_component_table_replacement_is_total() {
        let mut state = SurfaceState::new();
        state.apply(
            "s",
            &msg(json!({"version": "v0.9", "updateComponents": {"surfaceId": "s", "components": [
                {"id": "root", "component": "Column", "children": ["a"]},
                {"id": "a", "component": "Text"},
                {"id": "orphan", "component": "Text"}
            ]}})),
        );
        assert_eq!(state.render_state(), RenderState::Populated);

        let applied = state.apply(
            "s",
            &msg(json!({"version": "v0.9", "updateComponents": {"surfaceId": "s", "components": [
                {"id": "b", "component": "Text"}
            ]}})),
        );

        assert_eq!(state.component_ids().collect::<Vec<_>>(), vec!["b"]);
        assert!(state.get_component("orphan").is_none());
        assert_eq!(state.root_id, None);
        assert_eq!(state.render_state(), RenderState::Empty);
        match applied.event {
            Some(ProcessorEvent::SurfaceUpdated(e)) => assert_eq!(e.component_ids, vec!["b".to_string()]),
            other => panic!("Expected SurfaceUpdated, got {other:?}"),
        }
    }

    #[test]
    fn test_update_data_model_returns_write() {
        let mut state = SurfaceState::new();
        let applied = state.apply(
            "s",
            &msg(json!({"version": "v0.9", "updateDataModel": {"surfaceId": "s", "value": {"a": 1}}})),
        );
        assert_eq!(
            applied.write,
            Some(DataWrite {
                path: "/".to_string(),
                value: json!({"a": 1})
            })
        );

        let no_value = state.apply(
            "s",
            &msg(json!({"version": "v0.9", "updateDataModel": {"surfaceId": "s", "path": "/a"}})),
        );
        assert_eq!(no_value, Applied::default());
    }

    #[test]
    fn test_delete_and_recreate() {
        let mut state = SurfaceState::new();
        state.apply("s", &msg(json!({"version": "v0.9", "createSurface": {"surfaceId": "s", "catalogId": "c"}})));
        state.apply(
            "s",
            &msg(json!({"version": "v0.9", "updateComponents": {"surfaceId": "s", "components": [{"id": "root", "component": "Text"}]}})),
        );
        state.apply("s", &msg(json!({"version": "v0.9", "deleteSurface": {"surfaceId": "s"}})));

        assert_eq!(state.lifecycle, SurfaceLifecycle::Cleared);
        assert!(state.components.is_empty());
        assert_eq!(state.render_state(), RenderState::Empty);

        state.apply(
            "s",
            &msg(json!({"version": "v0.9", "updateComponents": {"surfaceId": "s", "components": [{"id": "root", "component": "Text"}]}})),
        );
        assert_eq!(state.lifecycle, SurfaceLifecycle::Active);
        assert_eq!(state.render_state(), RenderState::Populated);
    }
}
