//! A2UI Host
//!
//! Connects one transport to the surfaces it feeds. Messages are applied in
//! arrival order to every attached surface; each surface keeps only those
//! addressed to it. Resolved actions flow back through the same transport.

use std::cell::RefCell;
use std::rc::Rc;

use super::message::A2uiMessage;
use super::processor::ProcessorEvent;
use super::surface::Surface;
use super::transport::{
    SharedTransport, Transport, TransportConfig, TransportError, TransportEvent, create_transport,
};

/// Events from the host
#[derive(Clone, Debug, PartialEq)]
pub enum HostEvent {
    /// Connected to server
    Connected,
    /// A message was applied; carries what each surface made of it
    Message {
        message: A2uiMessage,
        events: Vec<ProcessorEvent>,
    },
    /// Error occurred
    Error(String),
    /// Disconnected from server
    Disconnected,
}

/// Pumps one transport into its surfaces.
pub struct A2uiHost {
    transport: SharedTransport,
    surfaces: Vec<Surface>,
}

impl A2uiHost {
    pub fn new(transport: Box<dyn Transport>) -> Self {
        A2uiHost {
            transport: Rc::new(RefCell::new(transport)),
            surfaces: Vec::new(),
        }
    }

    /// Create a host from a transport configuration
    pub fn from_config(config: &TransportConfig) -> Result<Self, TransportError> {
        Ok(Self::new(create_transport(config)?))
    }

    pub fn transport(&self) -> &SharedTransport {
        &self.transport
    }

    /// Attach a surface. Its actions are sent through this host's transport.
    pub fn add_surface(&mut self, surface: Surface) {
        surface.attach_transport(Rc::clone(&self.transport));
        self.surfaces.push(surface);
    }

    pub fn surface(&self, surface_id: &str) -> Option<&Surface> {
        self.surfaces.iter().find(|surface| surface.id() == surface_id)
    }

    pub fn surfaces(&self) -> &[Surface] {
        &self.surfaces
    }

    pub fn connect(&mut self) -> Result<(), TransportError> {
        let mut transport = self.transport.borrow_mut();
        log::debug!("connecting {} transport", transport.name());
        transport.connect()
    }

    pub fn disconnect(&mut self) {
        self.transport.borrow_mut().disconnect();
    }

    pub fn is_connected(&self) -> bool {
        self.transport.borrow().is_connected()
    }

    /// Drain pending transport events and apply them (non-blocking).
    pub fn poll(&mut self) -> Vec<HostEvent> {
        // Drain first so surfaces can send actions while messages apply.
        let pending: Vec<TransportEvent> = {
            let mut transport = self.transport.borrow_mut();
            std::iter::from_fn(|| transport.poll()).collect()
        };

        pending
            .into_iter()
            .map(|event| match event {
                TransportEvent::Message(message) => {
                    let events = self
                        .surfaces
                        .iter()
                        .filter_map(|surface| surface.process_message(&message))
                        .collect();
                    HostEvent::Message { message, events }
                }
                TransportEvent::Connected => {
                    log::info!("A2UI host connected");
                    HostEvent::Connected
                }
                TransportEvent::Error(e) => {
                    log::warn!("A2UI host error: {e}");
                    HostEvent::Error(e)
                }
                TransportEvent::Disconnected => {
                    log::info!("A2UI host disconnected");
                    HostEvent::Disconnected
                }
            })
            .collect()
    }

    /// Whether any attached surface needs to be drawn again.
    pub fn needs_redraw(&self) -> bool {
        self.surfaces.iter().any(Surface::needs_redraw)
    }
}
