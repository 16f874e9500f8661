//! The standard A2UI component catalog.
//!
//! Adapters here turn component records into a styling-free [`Element`]
//! tree. Hosts draw that tree however they like, or register their own
//! adapters over these through [`SurfaceOptions`].
//!
//! [`Element`]: crate::a2ui::Element
//! [`SurfaceOptions`]: crate::a2ui::SurfaceOptions

use crate::a2ui::ComponentRegistry;

mod display;
mod input;
mod layout;

pub use layout::Container;

/// Register every standard component type on `registry`.
pub fn register_standard_catalog(registry: &mut ComponentRegistry) {
    layout::register(registry);
    display::register(registry);
    input::register(registry);
}
