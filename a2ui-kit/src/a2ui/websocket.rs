//! WebSocket transport.
//!
//! A single socket carries protocol messages in and `{version, action}`
//! frames out. The socket lives on its own thread; reads use a short timeout
//! so queued actions are written between reads.

use std::net::TcpStream;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;
use std::time::Duration;

use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};

use super::message::{ActionMessage, ResolvedAction, parse_message};
use super::transport::{Transport, TransportError, TransportEvent};

const READ_TIMEOUT: Duration = Duration::from_millis(50);

enum Outbound {
    Text(String),
    Close,
}

pub struct WebSocketTransport {
    url: String,
    events: Option<Receiver<TransportEvent>>,
    outbound: Option<Sender<Outbound>>,
}

impl WebSocketTransport {
    pub fn new(url: &str) -> Result<Self, TransportError> {
        let parsed = url::Url::parse(url).map_err(|source| TransportError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;
        if !matches!(parsed.scheme(), "ws" | "wss") {
            return Err(TransportError::Connection(format!(
                "expected a ws:// or wss:// URL, got {url}"
            )));
        }
        Ok(WebSocketTransport {
            url: url.to_string(),
            events: None,
            outbound: None,
        })
    }

    fn run(url: &str, tx: &Sender<TransportEvent>, outbound: &Receiver<Outbound>) -> Result<(), String> {
        let (mut socket, _response) =
            tungstenite::connect(url).map_err(|e| format!("WebSocket connect failed: {e}"))?;
        set_read_timeout(&socket);
        if tx.send(TransportEvent::Connected).is_err() {
            return Ok(());
        }

        loop {
            loop {
                match outbound.try_recv() {
                    Ok(Outbound::Text(text)) => socket
                        .send(Message::text(text))
                        .map_err(|e| format!("WebSocket send failed: {e}"))?,
                    Ok(Outbound::Close) | Err(TryRecvError::Disconnected) => {
                        let _ = socket.close(None);
                        let _ = socket.flush();
                        return Ok(());
                    }
                    Err(TryRecvError::Empty) => break,
                }
            }

            match socket.read() {
                Ok(Message::Text(text)) => {
                    // Frames without a version are not protocol messages.
                    if let Some(message) = parse_message(text.as_str()) {
                        if tx.send(TransportEvent::Message(message)).is_err() {
                            return Ok(());
                        }
                    }
                }
                Ok(Message::Close(_)) => return Ok(()),
                Ok(_) => {}
                Err(tungstenite::Error::Io(e))
                    if matches!(
                        e.kind(),
                        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                    ) => {}
                Err(tungstenite::Error::ConnectionClosed) => return Ok(()),
                Err(e) => return Err(format!("WebSocket read failed: {e}")),
            }
        }
    }
}

/// The TCP socket under a plain or TLS stream.
fn tcp_stream(stream: &MaybeTlsStream<TcpStream>) -> Option<&TcpStream> {
    match stream {
        MaybeTlsStream::Plain(stream) => Some(stream),
        MaybeTlsStream::Rustls(stream) => Some(stream.get_ref()),
        _ => None,
    }
}

fn set_read_timeout(socket: &WebSocket<MaybeTlsStream<TcpStream>>) {
    let Some(stream) = tcp_stream(socket.get_ref()) else {
        log::warn!("unknown WebSocket stream, reads will block");
        return;
    };
    if let Err(e) = stream.set_read_timeout(Some(READ_TIMEOUT)) {
        log::warn!("could not set WebSocket read timeout: {e}");
    }
}

impl Transport for WebSocketTransport {
    fn name(&self) -> &'static str {
        "websocket"
    }

    fn connect(&mut self) -> Result<(), TransportError> {
        if self.events.is_some() {
            return Ok(());
        }
        let (tx, rx) = mpsc::channel();
        let (out_tx, out_rx) = mpsc::channel();
        let url = self.url.clone();

        log::info!("connecting to WebSocket {url}");
        thread::spawn(move || {
            if let Err(e) = Self::run(&url, &tx, &out_rx) {
                log::warn!("WebSocket {url} failed: {e}");
                let _ = tx.send(TransportEvent::Error(e));
            }
            let _ = tx.send(TransportEvent::Disconnected);
        });

        self.events = Some(rx);
        self.outbound = Some(out_tx);
        Ok(())
    }

    fn poll(&mut self) -> Option<TransportEvent> {
        match self.events.as_ref()?.try_recv() {
            Ok(TransportEvent::Disconnected) | Err(TryRecvError::Disconnected) => {
                // Clear receiver to prevent returning Disconnected repeatedly
                self.events = None;
                self.outbound = None;
                Some(TransportEvent::Disconnected)
            }
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) => None,
        }
    }

    fn disconnect(&mut self) {
        if let Some(outbound) = self.outbound.take() {
            let _ = outbound.send(Outbound::Close);
        }
        self.events = None;
    }

    fn is_connected(&self) -> bool {
        self.events.is_some()
    }

    fn send_action(&mut self, action: &ResolvedAction) -> Result<(), TransportError> {
        let outbound = self.outbound.as_ref().ok_or(TransportError::NotConnected)?;
        let frame = serde_json::to_string(&ActionMessage::new(action.clone()))?;
        outbound
            .send(Outbound::Text(frame))
            .map_err(|_| TransportError::Connection("WebSocket thread has stopped".to_string()))
    }
}
