//! SSE (Server-Sent Events) Transport Layer
//!
//! Implements SSE parsing for the A2UI streaming protocol.
//! SSE format:
//! - Lines starting with "data:" contain JSON payload
//! - Lines starting with ":" are comments (keep-alive pings)
//! - Empty lines mark message boundaries
//!
//! Actions travel the other way as a JSON POST to a separate endpoint.

use std::io::{BufRead, BufReader};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;

use super::message::{ActionMessage, ResolvedAction, parse_message};
use super::transport::{Transport, TransportError, TransportEvent};

/// SSE event parsed from stream
#[derive(Debug, Clone, PartialEq)]
pub enum SseEvent {
    /// Data event with JSON payload
    Data(String),
    /// Comment (keep-alive)
    Comment(String),
}

/// SSE parser state
#[derive(Debug, Default)]
pub struct SseParser {
    data_buffer: Vec<String>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a single line from SSE stream
    /// Returns Some(event) when a complete event is ready
    pub fn parse_line(&mut self, line: &str) -> Option<SseEvent> {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if let Some(data) = line.strip_prefix("data:") {
            self.data_buffer
                .push(data.strip_prefix(' ').unwrap_or(data).to_string());
            None
        } else if let Some(comment) = line.strip_prefix(':') {
            Some(SseEvent::Comment(comment.trim().to_string()))
        } else if line.is_empty() {
            self.flush()
        } else {
            // event:, id:, retry: and unknown fields are not used
            None
        }
    }

    /// Flush any remaining data
    pub fn flush(&mut self) -> Option<SseEvent> {
        if self.data_buffer.is_empty() {
            return None;
        }
        let data = self.data_buffer.join("\n");
        self.data_buffer.clear();
        Some(SseEvent::Data(data))
    }
}

/// Default action endpoint: the stream URL with a trailing `/sse` replaced
/// by `/action`.
pub fn default_action_endpoint(url: &str) -> String {
    match url.strip_suffix("/sse") {
        Some(base) => format!("{base}/action"),
        None => url.to_string(),
    }
}

/// Streams messages from an SSE endpoint and POSTs actions.
pub struct SseTransport {
    url: String,
    action_endpoint: String,
    events: Option<Receiver<TransportEvent>>,
    sender: Option<Sender<TransportEvent>>,
    stop: Arc<AtomicBool>,
}

impl SseTransport {
    pub fn new(url: &str, action_endpoint: Option<String>) -> Result<Self, TransportError> {
        url::Url::parse(url).map_err(|source| TransportError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;
        Ok(SseTransport {
            url: url.to_string(),
            action_endpoint: action_endpoint.unwrap_or_else(|| default_action_endpoint(url)),
            events: None,
            sender: None,
            stop: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn action_endpoint(&self) -> &str {
        &self.action_endpoint
    }

    fn stream(url: &str, tx: &Sender<TransportEvent>, stop: &AtomicBool) -> Result<(), String> {
        let response = ureq::get(url)
            .set("Accept", "text/event-stream")
            .call()
            .map_err(|e| format!("HTTP request failed: {e}"))?;

        if response.status() != 200 {
            return Err(format!("HTTP error: {}", response.status()));
        }
        if tx.send(TransportEvent::Connected).is_err() {
            return Ok(());
        }

        let mut parser = SseParser::new();
        for line in BufReader::new(response.into_reader()).lines() {
            if stop.load(Ordering::Relaxed) {
                return Ok(());
            }
            let line = line.map_err(|e| format!("Read error: {e}"))?;
            if let Some(SseEvent::Data(data)) = parser.parse_line(&line) {
                if !Self::forward(&data, tx) {
                    return Ok(());
                }
            }
        }

        if let Some(SseEvent::Data(data)) = parser.flush() {
            Self::forward(&data, tx);
        }
        Ok(())
    }

    /// Returns false once the receiving side is gone.
    fn forward(data: &str, tx: &Sender<TransportEvent>) -> bool {
        match parse_message(data) {
            Some(message) => tx.send(TransportEvent::Message(message)).is_ok(),
            None => true,
        }
    }
}

impl Transport for SseTransport {
    fn name(&self) -> &'static str {
        "sse"
    }

    fn connect(&mut self) -> Result<(), TransportError> {
        if self.events.is_some() {
            return Ok(());
        }
        let (tx, rx) = mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));
        let url = self.url.clone();
        let thread_tx = tx.clone();
        let thread_stop = Arc::clone(&stop);

        log::info!("connecting to SSE stream {url}");
        thread::spawn(move || {
            if let Err(e) = Self::stream(&url, &thread_tx, &thread_stop) {
                log::warn!("SSE stream {url} failed: {e}");
                let _ = thread_tx.send(TransportEvent::Error(e));
            }
            let _ = thread_tx.send(TransportEvent::Disconnected);
        });

        self.events = Some(rx);
        self.sender = Some(tx);
        self.stop = stop;
        Ok(())
    }

    fn poll(&mut self) -> Option<TransportEvent> {
        match self.events.as_ref()?.try_recv() {
            Ok(TransportEvent::Disconnected) | Err(TryRecvError::Disconnected) => {
                // Clear receiver to prevent returning Disconnected repeatedly
                self.events = None;
                self.sender = None;
                Some(TransportEvent::Disconnected)
            }
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) => None,
        }
    }

    fn disconnect(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        self.events = None;
        self.sender = None;
    }

    fn is_connected(&self) -> bool {
        self.events.is_some()
    }

    fn send_action(&mut self, action: &ResolvedAction) -> Result<(), TransportError> {
        let Some(tx) = self.sender.clone() else {
            return Err(TransportError::NotConnected);
        };
        let body = serde_json::to_string(&ActionMessage::new(action.clone()))?;
        let endpoint = self.action_endpoint.clone();

        thread::spawn(move || {
            let result = ureq::post(&endpoint)
                .set("Content-Type", "application/json")
                .send_string(&body);
            if let Err(e) = result {
                log::warn!("posting action to {endpoint} failed: {e}");
                let _ = tx.send(TransportEvent::Error(format!("action POST failed: {e}")));
            }
        });
        Ok(())
    }
}
