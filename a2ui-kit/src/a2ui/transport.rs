//! Transports deliver A2UI messages to surfaces and carry actions back.
//!
//! Three variants exist:
//! - WebSocket: one bidirectional socket ([`WebSocketTransport`](super::WebSocketTransport))
//! - SSE: a server-to-client event stream plus an HTTP POST per action
//!   ([`SseTransport`](super::SseTransport))
//! - Manual: the caller hands messages over directly ([`ManualTransport`])
//!
//! Network transports read on a background thread and hand events over an
//! mpsc channel; the UI thread drains them with [`Transport::poll`].

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use thiserror::Error;

use super::message::{A2uiMessage, ResolvedAction};

/// Events produced by a transport.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// Connection established
    Connected,
    /// A parsed protocol message
    Message(A2uiMessage),
    /// Something failed; the transport may still be usable
    Error(String),
    /// The connection ended
    Disconnected,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport is not connected")]
    NotConnected,

    #[error("{0} transport does not send actions")]
    Unsupported(&'static str),

    #[error("transport `{0}` is not enabled in this build")]
    FeatureDisabled(&'static str),

    #[error("invalid URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to encode action: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("connection failed: {0}")]
    Connection(String),
}

/// Transport configuration.
///
/// ```json
/// {"type": "sse", "url": "http://localhost:8080/sse", "actionEndpoint": "http://localhost:8080/action"}
/// {"type": "websocket", "url": "ws://localhost:8080/ws"}
/// {"type": "manual"}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TransportConfig {
    Websocket {
        url: String,
    },
    Sse {
        url: String,
        #[serde(rename = "actionEndpoint", default, skip_serializing_if = "Option::is_none")]
        action_endpoint: Option<String>,
    },
    Manual,
}

/// A source of protocol messages and a sink for resolved actions.
pub trait Transport {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Start delivering messages.
    fn connect(&mut self) -> Result<(), TransportError>;

    /// Next pending event, without blocking.
    fn poll(&mut self) -> Option<TransportEvent>;

    /// Stop delivering messages. Already delivered messages stay applied.
    fn disconnect(&mut self);

    fn is_connected(&self) -> bool;

    /// Send a resolved action upstream, fire-and-forget.
    fn send_action(&mut self, action: &ResolvedAction) -> Result<(), TransportError> {
        let _ = action;
        Err(TransportError::Unsupported(self.name()))
    }
}

/// A transport shared between a host and its surfaces.
pub type SharedTransport = Rc<RefCell<Box<dyn Transport>>>;

pub fn share(transport: impl Transport + 'static) -> SharedTransport {
    Rc::new(RefCell::new(Box::new(transport)))
}

/// Build a transport from its configuration.
pub fn create_transport(config: &TransportConfig) -> Result<Box<dyn Transport>, TransportError> {
    match config {
        #[cfg(feature = "websocket")]
        TransportConfig::Websocket { url } => {
            Ok(Box::new(super::websocket::WebSocketTransport::new(url)?))
        }
        #[cfg(not(feature = "websocket"))]
        TransportConfig::Websocket { .. } => Err(TransportError::FeatureDisabled("websocket")),

        #[cfg(feature = "sse")]
        TransportConfig::Sse {
            url,
            action_endpoint,
        } => Ok(Box::new(super::sse::SseTransport::new(
            url,
            action_endpoint.clone(),
        )?)),
        #[cfg(not(feature = "sse"))]
        TransportConfig::Sse { .. } => Err(TransportError::FeatureDisabled("sse")),

        TransportConfig::Manual => Ok(Box::new(ManualTransport::new())),
    }
}

#[derive(Debug, Default)]
struct ManualState {
    queue: VecDeque<A2uiMessage>,
    processed: usize,
    connected: bool,
}

/// Messages supplied directly by the caller.
///
/// The caller keeps re-feeding its growing message list; only the part past
/// the last fed length is queued. Clones share the same queue, so one clone
/// can be handed to a host while the caller keeps feeding the other.
#[derive(Debug, Clone, Default)]
pub struct ManualTransport {
    state: Rc<RefCell<ManualState>>,
}

impl ManualTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the messages of `messages` not seen by a previous call.
    ///
    /// A list shorter than the previous one starts a new stream and is
    /// queued whole.
    pub fn feed(&self, messages: &[A2uiMessage]) {
        let mut state = self.state.borrow_mut();
        if messages.len() < state.processed {
            log::debug!("manual message list shrank, replaying it from the start");
            state.processed = 0;
        }
        let start = state.processed;
        state.queue.extend(messages[start..].iter().cloned());
        state.processed = messages.len();
    }

    /// Queue one message.
    pub fn push(&self, message: A2uiMessage) {
        let mut state = self.state.borrow_mut();
        state.queue.push_back(message);
        state.processed += 1;
    }

    /// Number of messages fed so far.
    pub fn processed(&self) -> usize {
        self.state.borrow().processed
    }

    pub fn pending(&self) -> usize {
        self.state.borrow().queue.len()
    }
}

impl Transport for ManualTransport {
    fn name(&self) -> &'static str {
        "manual"
    }

    fn connect(&mut self) -> Result<(), TransportError> {
        self.state.borrow_mut().connected = true;
        Ok(())
    }

    fn poll(&mut self) -> Option<TransportEvent> {
        let mut state = self.state.borrow_mut();
        if !state.connected {
            return None;
        }
        state.queue.pop_front().map(TransportEvent::Message)
    }

    fn disconnect(&mut self) {
        let mut state = self.state.borrow_mut();
        state.connected = false;
        state.queue.clear();
    }

    fn is_connected(&self) -> bool {
        self.state.borrow().connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::a2ui::message::parse_message;

    fn data_update(n: u32) -> A2uiMessage {
        parse_message(&format!(
            r#"{{"version": "v0.9", "updateDataModel": {{"surfaceId": "s", "path": "/n", "value": {n}}}}}"#
        ))
        .unwrap()
    }

    fn drain(transport: &mut ManualTransport) -> Vec<A2uiMessage> {
        std::iter::from_fn(|| match transport.poll() {
            Some(TransportEvent::Message(m)) => Some(m),
            _ => None,
        })
        .collect()
    }

    #[test]
    fn test_manual_feed_applies_suffix_only() {
        let (m1, m2) = (data_update(1), data_update(2));
        let mut transport = ManualTransport::new();
        transport.connect().unwrap();

        transport.feed(&[m1.clone()]);
        assert_eq!(drain(&mut transport), vec![m1.clone()]);

        transport.feed(&[m1.clone(), m2.clone()]);
        assert_eq!(drain(&mut transport), vec![m2]);

        transport.feed(&[m1.clone(), data_update(2)]);
        assert!(drain(&mut transport).is_empty());
    }

    #[test]
    fn test_manual_shorter_list_restarts() {
        let mut transport = ManualTransport::new();
        transport.connect().unwrap();
        transport.feed(&[data_update(1), data_update(2)]);
        drain(&mut transport);

        transport.feed(&[data_update(9)]);
        assert_eq!(drain(&mut transport), vec![data_update(9)]);
        assert_eq!(transport.processed(), 1);
    }

    #[test]
    fn test_manual_clones_share_queue() {
        let feeder = ManualTransport::new();
        let mut consumer = feeder.clone();
        consumer.connect().unwrap();

        feeder.push(data_update(1));
        assert_eq!(consumer.pending(), 1);
        assert_eq!(drain(&mut consumer), vec![data_update(1)]);
    }

    #[test]
    fn test_manual_disconnect_stops_delivery() {
        let mut transport = ManualTransport::new();
        transport.feed(&[data_update(1)]);
        assert!(transport.poll().is_none());

        transport.connect().unwrap();
        transport.disconnect();
        assert!(!transport.is_connected());
        transport.feed(&[data_update(1), data_update(2)]);
        assert!(transport.poll().is_none());
    }

    #[test]
    fn test_manual_has_no_action_channel() {
        let mut transport = ManualTransport::new();
        let action = ResolvedAction {
            surface_id: "s".into(),
            source_component_id: "b".into(),
            name: "go".into(),
            context: None,
            timestamp: "2025-01-01T00:00:00.000Z".into(),
            data_model: None,
        };
        assert!(matches!(
            transport.send_action(&action),
            Err(TransportError::Unsupported("manual"))
        ));
    }

    #[test]
    fn test_transport_config_shapes() {
        let sse: TransportConfig = serde_json::from_str(
            r#"{"type": "sse", "url": "http://h/sse", "actionEndpoint": "http://h/act"}"#,
        )
        .unwrap();
        assert_eq!(
            sse,
            TransportConfig::Sse {
                url: "http://h/sse".into(),
                action_endpoint: Some("http://h/act".into())
            }
        );
        let ws: TransportConfig =
            serde_json::from_str(r#"{"type": "websocket", "url": "ws://h/ws"}"#).unwrap();
        assert_eq!(ws, TransportConfig::Websocket { url: "ws://h/ws".into() });
        let manual: TransportConfig = serde_json::from_str(r#"{"type": "manual"}"#).unwrap();
        assert_eq!(manual, TransportConfig::Manual);

        let mut transport = create_transport(&manual).unwrap();
        assert_eq!(transport.name(), "manual");
        assert!(transport.connect().is_ok());
    }
}
