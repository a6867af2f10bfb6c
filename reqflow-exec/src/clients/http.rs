use std::time::{Duration, Instant};

use async_trait::async_trait;

use reqflow_core::{
    ClientError, ClientEventSink, ConnectionState, HttpRequest, HttpResponse, Protocol,
    StreamingClient,
};

use super::{build_request, map_reqwest_error, response_headers, ClientProvider};
use crate::config::ExecutorConfig;

pub struct HttpClientProvider {
    client: reqwest::Client,
    timeout: Duration,
    max_response_bytes: usize,
}

impl HttpClientProvider {
    pub fn new(client: reqwest::Client, config: &ExecutorConfig) -> Self {
        Self {
            client,
            timeout: config.request_timeout,
            max_response_bytes: config.max_response_bytes,
        }
    }
}

impl ClientProvider for HttpClientProvider {
    fn protocol(&self) -> Protocol {
        Protocol::Http
    }

    fn create(&self, request: &HttpRequest) -> Result<Box<dyn StreamingClient>, ClientError> {
        Ok(Box::new(HttpStreamingClient {
            client: self.client.clone(),
            request: request.clone(),
            timeout: self.timeout,
            max_response_bytes: self.max_response_bytes,
            state: ConnectionState::Idle,
        }))
    }
}

/// Request/response exchange: `connect` sends the request and reports the
/// response as a single message.
pub struct HttpStreamingClient {
    client: reqwest::Client,
    request: HttpRequest,
    timeout: Duration,
    max_response_bytes: usize,
    state: ConnectionState,
}

#[async_trait]
impl StreamingClient for HttpStreamingClient {
    fn supports_streaming(&self) -> bool {
        false
    }

    fn report_message(&self) -> String {
        format!("{} {}", self.request.method, self.request.url)
    }

    fn state(&self) -> ConnectionState {
        self.state
    }

    fn native_client(&self) -> Option<&(dyn std::any::Any + Send + Sync)> {
        Some(&self.client)
    }

    async fn connect(&mut self, events: ClientEventSink) -> Result<(), ClientError> {
        self.state = ConnectionState::Connecting;
        let started = Instant::now();
        let rb = build_request(&self.client, &self.request, &self.request.method)?.timeout(self.timeout);
        let mut resp = rb.send().await.map_err(map_reqwest_error)?;
        self.state = ConnectionState::Open;

        let status = resp.status();
        let headers = response_headers(resp.headers());
        let mut body = Vec::new();
        while let Some(chunk) = resp.chunk().await.map_err(map_reqwest_error)? {
            if body.len() + chunk.len() > self.max_response_bytes {
                return Err(ClientError::BodyTooLarge {
                    limit: self.max_response_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }

        let mut response = HttpResponse::new(Protocol::Http, status.as_u16());
        response.status_message = status.canonical_reason().map(str::to_string);
        response.headers = headers;
        response.set_body(String::from_utf8_lossy(&body).into_owned());
        response.duration = started.elapsed();

        self.state = self.state.on_message();
        events.on_message("response", response);
        events.closed();
        Ok(())
    }

    async fn send(&mut self, _body: Option<&str>) -> Result<(), ClientError> {
        Err(ClientError::SendNotSupported(Protocol::Http.to_string()))
    }

    async fn disconnect(&mut self, _error: Option<&ClientError>) {
        self.state = ConnectionState::Closed;
    }
}
