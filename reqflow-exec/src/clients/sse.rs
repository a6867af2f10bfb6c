use std::time::Instant;

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::task::JoinHandle;

use reqflow_core::{
    ClientError, ClientEventSink, ConnectionState, HttpRequest, HttpResponse, Protocol,
    StreamingClient,
};

use super::{build_request, map_reqwest_error, response_headers, ClientProvider};

pub struct SseClientProvider {
    client: reqwest::Client,
}

impl SseClientProvider {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl ClientProvider for SseClientProvider {
    fn protocol(&self) -> Protocol {
        Protocol::Sse
    }

    fn create(&self, request: &HttpRequest) -> Result<Box<dyn StreamingClient>, ClientError> {
        Ok(Box::new(SseStreamingClient {
            client: self.client.clone(),
            request: request.clone(),
            state: ConnectionState::Idle,
            reader: None,
        }))
    }
}

pub struct SseStreamingClient {
    client: reqwest::Client,
    request: HttpRequest,
    state: ConnectionState,
    reader: Option<JoinHandle<()>>,
}

#[async_trait]
impl StreamingClient for SseStreamingClient {
    fn supports_streaming(&self) -> bool {
        true
    }

    fn report_message(&self) -> String {
        format!("SSE {}", self.request.url)
    }

    fn state(&self) -> ConnectionState {
        self.state
    }

    async fn connect(&mut self, events: ClientEventSink) -> Result<(), ClientError> {
        self.state = ConnectionState::Connecting;
        let started = Instant::now();
        let method = match Protocol::from_keyword(&self.request.method) {
            Some(_) => "GET",
            None => self.request.method.as_str(),
        };
        let rb = build_request(&self.client, &self.request, method)?
            .header(reqwest::header::ACCEPT, "text/event-stream");
        let resp = rb.send().await.map_err(map_reqwest_error)?;

        let status = resp.status();
        let mut template = HttpResponse::new(Protocol::Sse, status.as_u16());
        template.status_message = status.canonical_reason().map(str::to_string);
        template.headers = response_headers(resp.headers());

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            self.state = ConnectionState::Closed;
            events.on_error("error", template.with_body(body));
            events.closed();
            return Ok(());
        }

        self.state = ConnectionState::Open;
        events.on_metadata("open", template.clone());

        self.reader = Some(tokio::spawn(async move {
            let mut parser = EventStreamParser::default();
            let mut stream = resp.bytes_stream();
            while let Some(chunk) = stream.next().await {
                match chunk {
                    Ok(bytes) => {
                        for event in parser.push(&bytes) {
                            let mut response = template.clone().with_body(event.data);
                            response.duration = started.elapsed();
                            events.on_message(event.event, response);
                        }
                    }
                    Err(e) => {
                        let mut response = template.clone();
                        response.status_message = Some(e.to_string());
                        events.on_error("error", response);
                        break;
                    }
                }
            }
            events.closed();
        }));
        self.state = ConnectionState::Streaming;
        Ok(())
    }

    async fn send(&mut self, _body: Option<&str>) -> Result<(), ClientError> {
        Err(ClientError::SendNotSupported(Protocol::Sse.to_string()))
    }

    async fn disconnect(&mut self, _error: Option<&ClientError>) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        self.state = ConnectionState::Closed;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event: String,
    pub data: String,
    pub id: Option<String>,
}

/// Incremental `text/event-stream` framing.
#[derive(Debug, Default)]
pub struct EventStreamParser {
    buffer: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
    id: Option<String>,
}

impl EventStreamParser {
    /// Feeds raw bytes and returns every event completed by them.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(bytes);
        let mut out = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);
            if let Some(event) = self.line(line) {
                out.push(event);
            }
        }
        out
    }

    fn line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }
        let (field, value) = match line.split_once(':') {
            Some((f, v)) => (f, v.strip_prefix(' ').unwrap_or(v)),
            None => (line, ""),
        };
        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            "id" => self.id = Some(value.to_string()),
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        Some(SseEvent {
            event: event.filter(|e| !e.is_empty()).unwrap_or_else(|| "message".to_string()),
            data: std::mem::take(&mut self.data).join("\n"),
            id: self.id.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_events_split_across_chunks() {
        let mut p = EventStreamParser::default();
        assert!(p.push(b"event: tick\nda").is_empty());
        let events = p.push(b"ta: 1\ndata: 2\n\n: comment\ndata: {\"a\":3}\r\n\r\n");
        assert_eq!(
            events,
            vec![
                SseEvent {
                    event: "tick".into(),
                    data: "1\n2".into(),
                    id: None
                },
                SseEvent {
                    event: "message".into(),
                    data: "{\"a\":3}".into(),
                    id: None
                },
            ]
        );
    }

    #[test]
    fn ids_persist_and_empty_events_are_dropped() {
        let mut p = EventStreamParser::default();
        let events = p.push(b"id: 7\n\nevent: x\n\ndata: y\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id.as_deref(), Some("7"));
        assert_eq!(events[0].event, "message");
    }

    #[test]
    fn multibyte_characters_survive_chunk_boundaries() {
        let mut p = EventStreamParser::default();
        let bytes = "data: héllo\n\n".as_bytes();
        let (a, b) = bytes.split_at(8);
        assert!(p.push(a).is_empty());
        assert_eq!(p.push(b)[0].data, "héllo");
    }
}
