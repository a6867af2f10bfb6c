//! Protocol clients behind the `StreamingClient` contract.

mod http;
mod sse;
mod ws;

use std::sync::Arc;

use reqflow_core::{ClientError, HttpRequest, Protocol, StreamingClient};

use crate::config::ExecutorConfig;

pub use http::{HttpClientProvider, HttpStreamingClient};
pub use sse::{EventStreamParser, SseClientProvider, SseEvent, SseStreamingClient};
pub use ws::{WebSocketClientProvider, WebSocketStreamingClient};

/// Creates a fresh client for each request of one protocol.
pub trait ClientProvider: Send + Sync {
    fn protocol(&self) -> Protocol;

    fn create(&self, request: &HttpRequest) -> Result<Box<dyn StreamingClient>, ClientError>;
}

/// Providers by protocol; the most recently registered one wins.
#[derive(Clone, Default)]
pub struct ClientRegistry {
    providers: Vec<Arc<dyn ClientProvider>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// HTTP, SSE and WebSocket. MQTT, gRPC and Kafka need a registered
    /// provider.
    pub fn with_defaults(config: &ExecutorConfig) -> Self {
        let client = build_reqwest_client(config);
        let mut registry = Self::new();
        registry.register(Arc::new(HttpClientProvider::new(client.clone(), config)));
        registry.register(Arc::new(SseClientProvider::new(client)));
        registry.register(Arc::new(WebSocketClientProvider));
        registry
    }

    pub fn register(&mut self, provider: Arc<dyn ClientProvider>) {
        self.providers.push(provider);
    }

    pub fn provider(&self, protocol: Protocol) -> Option<&Arc<dyn ClientProvider>> {
        self.providers.iter().rev().find(|p| p.protocol() == protocol)
    }

    pub fn supports(&self, protocol: Protocol) -> bool {
        self.provider(protocol).is_some()
    }
}

fn build_reqwest_client(config: &ExecutorConfig) -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::limited(10))
        .user_agent(config.user_agent.clone())
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "falling back to default HTTP client settings");
            reqwest::Client::new()
        })
}

pub(crate) fn map_reqwest_error(e: reqwest::Error) -> ClientError {
    if e.is_timeout() {
        return ClientError::Timeout;
    }
    if e.is_connect() || e.is_request() {
        return ClientError::Connect(e.to_string());
    }
    ClientError::Protocol(e.to_string())
}

pub(crate) fn response_headers(headers: &reqwest::header::HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
        .collect()
}

pub(crate) fn build_request(
    client: &reqwest::Client,
    request: &HttpRequest,
    method: &str,
) -> Result<reqwest::RequestBuilder, ClientError> {
    let method = method
        .parse::<reqwest::Method>()
        .map_err(|e| ClientError::Protocol(format!("invalid method '{method}': {e}")))?;
    let mut rb = client.request(method, &request.url);
    for (k, v) in &request.headers {
        rb = rb.header(k, v);
    }
    if let Some(body) = &request.body {
        rb = rb.body(body.clone());
    }
    Ok(rb)
}
