//! # Description
//!
//! A2UI Kit is a Rust crate that renders [A2UI](https://a2ui.org) v0.9
//! surfaces: agent-driven user interfaces described as flat component tables
//! plus a JSON data model.
//!
//! # Features
//!
//! - Data model store with JSON Pointer paths and change subscriptions.
//! - Literal and path-bound component properties, resolved at render time.
//! - Pluggable component adapters over a standard catalog.
//! - Button checks and action context resolution.
//! - SSE and WebSocket transports (cargo features `sse` and `websocket`).
//!
//! The renderer produces a plain [`a2ui::Element`] tree; drawing it is left
//! to the host.

pub mod a2ui;
pub mod widgets;
