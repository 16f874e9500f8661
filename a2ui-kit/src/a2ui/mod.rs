//! A2UI Protocol Implementation
//!
//! A2UI (Agent-to-UI) is a declarative JSON protocol for AI agents to generate
//! rich, interactive UIs. This module implements the renderer core: it keeps
//! surfaces in sync with the agent's messages and turns user interaction into
//! actions sent back to the agent.
//!
//! # Architecture
//!
//! ```text
//! Transport (SSE / WebSocket / manual)
//!        ↓
//!     A2uiHost ───────────────┐
//!        ↓                    │ ResolvedAction
//!     Surface ── ContextResolver
//!        ↓
//! ┌──────┴──────┐
//! │             │
//! DataModel  SurfaceState
//!    │             │
//!    └──────┬──────┘
//!           ↓
//!   render_tree + ComponentRegistry
//!           ↓
//!     Element tree
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use a2ui_kit::a2ui::*;
//!
//! let surface = Surface::new(SurfaceOptions::new("main"));
//! surface.process_json(r#"{"version": "v0.9", "createSurface": {"surfaceId": "main", "catalogId": "std"}}"#);
//!
//! if let Some(tree) = surface.render() {
//!     print!("{tree}");
//! }
//! ```

mod context;
mod data_model;
mod functions;
mod host;
mod message;
mod processor;
mod registry;
mod renderer;
mod surface;
mod transport;
mod validation;
mod value;

#[cfg(feature = "sse")]
mod sse;
#[cfg(feature = "websocket")]
mod websocket;

pub use context::*;
pub use data_model::*;
pub use functions::*;
pub use host::*;
pub use message::*;
pub use processor::*;
pub use registry::*;
pub use renderer::*;
pub use surface::*;
pub use transport::*;
pub use validation::*;
pub use value::*;

#[cfg(feature = "sse")]
pub use sse::*;
#[cfg(feature = "websocket")]
pub use websocket::*;
