//! Uniform lifecycle every protocol client implements.
//!
//! Clients report what they observe through a [`ClientEventSink`] handed to
//! them at connect time. The engine owns the sink's receiving side and decides
//! when the exchange is complete.

mod merge;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::types::HttpResponse;

pub use merge::merge_stream_messages;

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("connect failed: {0}")]
    Connect(String),

    #[error("send failed: {0}")]
    Send(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("client is not connected")]
    NotConnected,

    #[error("{0} clients cannot send after connect")]
    SendNotSupported(String),

    #[error("request timed out")]
    Timeout,

    #[error("response body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Open,
    Streaming,
    Closed,
}

impl ConnectionState {
    pub fn is_open(&self) -> bool {
        matches!(self, ConnectionState::Open | ConnectionState::Streaming)
    }

    /// Next state after an observed message; `Closed` is terminal.
    pub fn on_message(self) -> Self {
        match self {
            ConnectionState::Closed => ConnectionState::Closed,
            _ => ConnectionState::Streaming,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Data,
    MetaData,
    Error,
}

/// One observed message, already shaped as a partial response.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamMessage {
    pub kind: MessageKind,
    /// Protocol-specific event label, e.g. `message`, `open`, `close`.
    pub label: String,
    pub response: HttpResponse,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    Message(StreamMessage),
    /// The remote side ended the exchange.
    Closed,
}

/// Callback handle a client uses to surface messages to the engine.
#[derive(Clone)]
pub struct ClientEventSink {
    emit: Arc<dyn Fn(ClientEvent) + Send + Sync>,
}

impl ClientEventSink {
    pub fn new(emit: impl Fn(ClientEvent) + Send + Sync + 'static) -> Self {
        Self {
            emit: Arc::new(emit),
        }
    }

    pub fn on_message(&self, label: impl Into<String>, response: HttpResponse) {
        self.emit(MessageKind::Data, label, response);
    }

    pub fn on_metadata(&self, label: impl Into<String>, response: HttpResponse) {
        self.emit(MessageKind::MetaData, label, response);
    }

    pub fn on_error(&self, label: impl Into<String>, response: HttpResponse) {
        self.emit(MessageKind::Error, label, response);
    }

    pub fn closed(&self) {
        (self.emit)(ClientEvent::Closed);
    }

    fn emit(&self, kind: MessageKind, label: impl Into<String>, response: HttpResponse) {
        (self.emit)(ClientEvent::Message(StreamMessage {
            kind,
            label: label.into(),
            response,
        }));
    }
}

impl fmt::Debug for ClientEventSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ClientEventSink")
    }
}

#[async_trait]
pub trait StreamingClient: Send + Sync {
    /// Whether messages are reported individually while the exchange runs.
    fn supports_streaming(&self) -> bool;

    /// Short description used when logging the exchange.
    fn report_message(&self) -> String;

    fn state(&self) -> ConnectionState;

    /// When false, the engine calls `send(body)` once `connect` returns.
    fn sends_request_on_connect(&self) -> bool {
        true
    }

    /// Underlying library client, for collaborators that need it.
    fn native_client(&self) -> Option<&(dyn std::any::Any + Send + Sync)> {
        None
    }

    async fn connect(&mut self, events: ClientEventSink) -> Result<(), ClientError>;

    async fn send(&mut self, body: Option<&str>) -> Result<(), ClientError>;

    /// Tears the connection down. Must tolerate being called in any state.
    async fn disconnect(&mut self, error: Option<&ClientError>);
}
