#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use reqflow_core::{
    ClientError, ClientEventSink, ConnectionState, HttpRequest, HttpResponse, Protocol,
    StreamingClient,
};
use reqflow_exec::{ClientProvider, ClientRegistry, Executor, ExecutorConfig, Progress, Services};

#[derive(Default)]
pub struct Recorder {
    pub urls: Mutex<Vec<String>>,
    pub sent: Mutex<Vec<String>>,
    pub disconnects: AtomicUsize,
}

impl Recorder {
    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().clone()
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

type Respond = Arc<dyn Fn(&HttpRequest) -> HttpResponse + Send + Sync>;

/// Unary HTTP stand-in answering every request through `respond`.
pub struct MockHttpProvider {
    pub recorder: Arc<Recorder>,
    respond: Respond,
}

impl MockHttpProvider {
    pub fn new(recorder: Arc<Recorder>, respond: impl Fn(&HttpRequest) -> HttpResponse + Send + Sync + 'static) -> Self {
        Self {
            recorder,
            respond: Arc::new(respond),
        }
    }

    /// Echoes the URL path as a JSON body.
    pub fn echo(recorder: Arc<Recorder>) -> Self {
        Self::new(recorder, |req| {
            HttpResponse::new(Protocol::Http, 200)
                .with_body(serde_json::json!({ "url": req.url }).to_string())
        })
    }
}

impl ClientProvider for MockHttpProvider {
    fn protocol(&self) -> Protocol {
        Protocol::Http
    }

    fn create(&self, request: &HttpRequest) -> Result<Box<dyn StreamingClient>, ClientError> {
        Ok(Box::new(MockHttpClient {
            request: request.clone(),
            recorder: self.recorder.clone(),
            respond: self.respond.clone(),
            state: ConnectionState::Idle,
        }))
    }
}

struct MockHttpClient {
    request: HttpRequest,
    recorder: Arc<Recorder>,
    respond: Respond,
    state: ConnectionState,
}

#[async_trait]
impl StreamingClient for MockHttpClient {
    fn supports_streaming(&self) -> bool {
        false
    }

    fn report_message(&self) -> String {
        format!("{} {}", self.request.method, self.request.url)
    }

    fn state(&self) -> ConnectionState {
        self.state
    }

    async fn connect(&mut self, events: ClientEventSink) -> Result<(), ClientError> {
        self.recorder.urls.lock().push(self.request.url.clone());
        self.state = ConnectionState::Open;
        events.on_message("response", (self.respond)(&self.request));
        events.closed();
        Ok(())
    }

    async fn send(&mut self, _body: Option<&str>) -> Result<(), ClientError> {
        Err(ClientError::SendNotSupported("HTTP".into()))
    }

    async fn disconnect(&mut self, _error: Option<&ClientError>) {
        self.recorder.disconnects.fetch_add(1, Ordering::SeqCst);
        self.state = ConnectionState::Closed;
    }
}

/// What a scripted stream does once connected.
#[derive(Clone)]
pub enum Step {
    Data(u16, &'static str),
    Meta(&'static str, u16),
    Error(u16),
    Close,
    /// Cancels the run's progress token.
    Cancel,
    Sleep(Duration),
}

/// WebSocket stand-in replaying a script of events after `send`.
pub struct ScriptedStreamProvider {
    pub recorder: Arc<Recorder>,
    script: Vec<Step>,
    progress: Option<Progress>,
}

impl ScriptedStreamProvider {
    pub fn new(recorder: Arc<Recorder>, script: Vec<Step>, progress: Option<Progress>) -> Self {
        Self {
            recorder,
            script,
            progress,
        }
    }
}

impl ClientProvider for ScriptedStreamProvider {
    fn protocol(&self) -> Protocol {
        Protocol::WebSocket
    }

    fn create(&self, request: &HttpRequest) -> Result<Box<dyn StreamingClient>, ClientError> {
        Ok(Box::new(ScriptedStreamClient {
            request: request.clone(),
            recorder: self.recorder.clone(),
            script: self.script.clone(),
            progress: self.progress.clone(),
            events: None,
            state: ConnectionState::Idle,
        }))
    }
}

struct ScriptedStreamClient {
    request: HttpRequest,
    recorder: Arc<Recorder>,
    script: Vec<Step>,
    progress: Option<Progress>,
    events: Option<ClientEventSink>,
    state: ConnectionState,
}

#[async_trait]
impl StreamingClient for ScriptedStreamClient {
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
        self.recorder.urls.lock().push(self.request.url.clone());
        self.events = Some(events);
        self.state = ConnectionState::Open;
        Ok(())
    }

    async fn send(&mut self, body: Option<&str>) -> Result<(), ClientError> {
        let events = self.events.clone().ok_or(ClientError::NotConnected)?;
        if let Some(body) = body {
            self.recorder.sent.lock().push(body.to_string());
        }
        let script = self.script.clone();
        let progress = self.progress.clone();
        tokio::spawn(async move {
            for step in script {
                match step {
                    Step::Data(status, body) => {
                        events.on_message("message", HttpResponse::new(Protocol::WebSocket, status).with_body(body))
                    }
                    Step::Meta(label, status) => {
                        events.on_metadata(label, HttpResponse::new(Protocol::WebSocket, status))
                    }
                    Step::Error(status) => {
                        events.on_error("error", HttpResponse::new(Protocol::WebSocket, status))
                    }
                    Step::Close => events.closed(),
                    Step::Cancel => {
                        if let Some(progress) = &progress {
                            progress.cancel();
                        }
                    }
                    Step::Sleep(d) => tokio::time::sleep(d).await,
                }
            }
        });
        Ok(())
    }

    async fn disconnect(&mut self, _error: Option<&ClientError>) {
        self.recorder.disconnects.fetch_add(1, Ordering::SeqCst);
        self.events = None;
        self.state = ConnectionState::Closed;
    }
}

pub fn executor_with(providers: Vec<Arc<dyn ClientProvider>>) -> Executor {
    let mut services = Services::new(ExecutorConfig {
        cookie_jar: false,
        ..ExecutorConfig::default()
    });
    services.clients = ClientRegistry::new();
    for provider in providers {
        services.clients.register(provider);
    }
    Executor::new(services)
}

pub fn vars(pairs: &[(&str, serde_json::Value)]) -> reqflow_core::Variables {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}
