//! Containers. They only arrange their children.

use serde_json::json;

use crate::a2ui::{AdapterProps, ComponentAdapter, ComponentRegistry, Direction, Element};

/// Adapter for a component whose whole job is holding children.
#[derive(Debug, Clone, Copy)]
pub struct Container {
    kind: &'static str,
    /// Rows lay out along the reading direction
    directional: bool,
}

impl Container {
    pub const fn new(kind: &'static str) -> Self {
        Container {
            kind,
            directional: false,
        }
    }

    pub const fn directional(kind: &'static str) -> Self {
        Container {
            kind,
            directional: true,
        }
    }
}

impl ComponentAdapter for Container {
    fn render(&self, mut props: AdapterProps<'_>) -> Option<Element> {
        let mut element = Element::new(self.kind);
        if self.directional && props.dir == Direction::Rtl {
            element = element.with_prop("dir", json!(props.dir.as_str()));
        }
        Some(element.with_children(std::mem::take(&mut props.children)))
    }
}

const CONTAINERS: &[Container] = &[
    Container::new("Column"),
    Container::directional("Row"),
    Container::new("Box"),
    Container::new("Card"),
    Container::new("List"),
    Container::new("Tabs"),
    Container::new("Accordion"),
    Container::new("AppBar"),
    Container::new("Menu"),
    Container::new("NavigationDrawer"),
    Container::directional("BottomNavigation"),
    Container::directional("Carousel"),
];

pub(super) fn register(registry: &mut ComponentRegistry) {
    for container in CONTAINERS {
        registry.register(container.kind, *container);
    }
}
