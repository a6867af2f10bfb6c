use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use reqflow_core::{
    ClientError, ClientEventSink, ConnectionState, HttpRequest, HttpResponse, Protocol,
    StreamingClient,
};

use super::ClientProvider;

type Writer = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

const CLOSE_NORMAL: u16 = 1000;
const CLOSE_NO_STATUS: u16 = 1005;
const CLOSE_ABNORMAL: u16 = 1006;

pub struct WebSocketClientProvider;

impl ClientProvider for WebSocketClientProvider {
    fn protocol(&self) -> Protocol {
        Protocol::WebSocket
    }

    fn create(&self, request: &HttpRequest) -> Result<Box<dyn StreamingClient>, ClientError> {
        Ok(Box::new(WebSocketStreamingClient {
            request: request.clone(),
            state: ConnectionState::Idle,
            writer: None,
            reader: None,
        }))
    }
}

/// Full-duplex client. The request body is sent as a text frame once the
/// handshake completes.
pub struct WebSocketStreamingClient {
    request: HttpRequest,
    state: ConnectionState,
    writer: Option<Writer>,
    reader: Option<JoinHandle<()>>,
}

#[async_trait]
impl StreamingClient for WebSocketStreamingClient {
    fn supports_streaming(&self) -> bool {
        true
    }

    fn report_message(&self) -> String {
        format!("WS {}", self.request.url)
    }

    fn state(&self) -> ConnectionState {
        self.state
    }

    fn sends_request_on_connect(&self) -> bool {
        false
    }

    async fn connect(&mut self, events: ClientEventSink) -> Result<(), ClientError> {
        self.state = ConnectionState::Connecting;
        let started = Instant::now();
        let mut handshake = self
            .request
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| ClientError::Connect(e.to_string()))?;
        for (k, v) in &self.request.headers {
            let name = HeaderName::from_bytes(k.as_bytes())
                .map_err(|e| ClientError::Connect(format!("header '{k}': {e}")))?;
            let value = HeaderValue::from_str(v)
                .map_err(|e| ClientError::Connect(format!("header '{k}': {e}")))?;
            handshake.headers_mut().append(name, value);
        }

        let (stream, upgrade) = connect_async(handshake)
            .await
            .map_err(|e| ClientError::Connect(e.to_string()))?;

        let mut template = HttpResponse::new(Protocol::WebSocket, upgrade.status().as_u16());
        template.status_message = upgrade.status().canonical_reason().map(str::to_string);
        template.headers = upgrade
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
            .collect();
        template.duration = started.elapsed();
        events.on_metadata("open", template.clone());
        self.state = ConnectionState::Open;

        let (writer, mut reader) = stream.split();
        self.writer = Some(writer);
        self.reader = Some(tokio::spawn(async move {
            while let Some(frame) = reader.next().await {
                let mut response = template.clone();
                response.duration = started.elapsed();
                match frame {
                    Ok(Message::Text(text)) => {
                        events.on_message("message", response.with_body(text.as_str()));
                    }
                    Ok(Message::Binary(bytes)) => {
                        let body = String::from_utf8_lossy(&bytes).into_owned();
                        events.on_message("message", response.with_body(body));
                    }
                    Ok(Message::Close(frame)) => {
                        let code = frame.as_ref().map(|f| u16::from(f.code)).unwrap_or(CLOSE_NO_STATUS);
                        response.status_code = code;
                        response.status_message = frame.map(|f| f.reason.as_str().to_string());
                        if code == CLOSE_NORMAL || code == CLOSE_NO_STATUS {
                            events.on_metadata("close", response);
                        } else {
                            events.on_error("close", response);
                        }
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        response.status_code = CLOSE_ABNORMAL;
                        response.status_message = Some(e.to_string());
                        events.on_error("error", response);
                        break;
                    }
                }
            }
            events.closed();
        }));
        Ok(())
    }

    async fn send(&mut self, body: Option<&str>) -> Result<(), ClientError> {
        let writer = self.writer.as_mut().ok_or(ClientError::NotConnected)?;
        let Some(body) = body else {
            return Ok(());
        };
        writer
            .send(Message::Text(body.to_string().into()))
            .await
            .map_err(|e| ClientError::Send(e.to_string()))?;
        self.state = self.state.on_message();
        Ok(())
    }

    async fn disconnect(&mut self, _error: Option<&ClientError>) {
        if let Some(mut writer) = self.writer.take() {
            if tokio::time::timeout(Duration::from_secs(2), writer.close()).await.is_err() {
                tracing::debug!(url = %self.request.url, "websocket close handshake timed out");
            }
        }
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        self.state = ConnectionState::Closed;
    }
}
