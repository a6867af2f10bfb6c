use std::sync::Arc;

use uuid::Uuid;

use reqflow_core::{EnvKey, HookError, HttpRequest, HttpResponse, RegionId, Variables};
use reqflow_store::{MemoryStore, SessionStore};

use crate::clients::ClientRegistry;
use crate::config::ExecutorConfig;
use crate::document::{HttpFile, HttpRegion};
use crate::events::{Event, EventSink, NoOpEventSink};
use crate::progress::Progress;
use crate::secrets::{SchemeRouter, SecretValue, SecretsPolicy, SecretsProvider};

/// Why a region is being executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionKind {
    /// Requested by the user or a batch.
    Direct,
    /// Pulled in by `@ref`/`@forceRef` of another region.
    Reference,
    /// A global region run ahead of a named one.
    Prerequisite,
}

/// Receives responses and errors as regions finish.
pub trait ResponseLogger: Send + Sync {
    fn log_response(
        &self,
        region: &HttpRegion,
        request: Option<&HttpRequest>,
        response: &HttpResponse,
        secrets: &[SecretValue],
    );

    fn log_error(&self, region: &HttpRegion, error: &HookError);
}

/// Long-lived collaborators shared by every execution of a run.
pub struct Services {
    pub config: ExecutorConfig,
    pub clients: ClientRegistry,
    pub secrets: Arc<dyn SecretsProvider>,
    pub secrets_policy: SecretsPolicy,
    pub sessions: Arc<dyn SessionStore>,
    pub events: Arc<dyn EventSink>,
    pub logger: Option<Arc<dyn ResponseLogger>>,
}

impl Services {
    pub fn new(config: ExecutorConfig) -> Self {
        let secrets_policy = SecretsPolicy {
            allow_secrets_in_url: config.allow_secrets_in_url,
        };
        Self {
            clients: ClientRegistry::with_defaults(&config),
            config,
            secrets: Arc::new(SchemeRouter::with_env()),
            secrets_policy,
            sessions: Arc::new(MemoryStore::new()),
            events: Arc::new(NoOpEventSink),
            logger: None,
        }
    }
}

impl Default for Services {
    fn default() -> Self {
        Self::new(ExecutorConfig::default())
    }
}

/// State threaded through every hook of one region execution.
pub struct ProcessorContext {
    pub file: Arc<HttpFile>,
    pub region: Arc<HttpRegion>,
    pub variables: Variables,
    pub request: Option<HttpRequest>,
    pub response: Option<HttpResponse>,
    pub environments: Vec<String>,
    pub env_key: EnvKey,
    pub progress: Option<Progress>,
    pub caller: Option<Arc<HttpRegion>>,
    /// Regions currently executing on this flow, outermost first.
    pub call_stack: Vec<RegionId>,
    pub kind: ExecutionKind,
    pub services: Arc<Services>,
    pub run_id: Uuid,
    /// Secret values substituted into the current request.
    pub secrets: Vec<SecretValue>,
}

impl ProcessorContext {
    pub fn new(file: Arc<HttpFile>, region: Arc<HttpRegion>, services: Arc<Services>) -> Self {
        Self {
            file,
            region,
            variables: Variables::new(),
            request: None,
            response: None,
            environments: Vec::new(),
            env_key: EnvKey::none(),
            progress: None,
            caller: None,
            call_stack: Vec::new(),
            kind: ExecutionKind::Direct,
            services,
            run_id: Uuid::new_v4(),
            secrets: Vec::new(),
        }
    }

    pub fn with_environments(mut self, environments: Vec<String>) -> Self {
        self.env_key = EnvKey::from_environments(&environments);
        self.environments = environments;
        self
    }

    pub fn with_variables(mut self, variables: Variables) -> Self {
        self.variables = variables;
        self
    }

    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Context for executing `region` on behalf of the current region.
    /// Variables are copied; request state starts empty.
    pub fn child(&self, region: Arc<HttpRegion>, kind: ExecutionKind) -> Self {
        Self {
            file: self.file.clone(),
            region,
            variables: self.variables.clone(),
            request: None,
            response: None,
            environments: self.environments.clone(),
            env_key: self.env_key.clone(),
            progress: self.progress.clone(),
            caller: Some(self.region.clone()),
            call_stack: {
                let mut stack = self.call_stack.clone();
                stack.push(self.region.id);
                stack
            },
            kind,
            services: self.services.clone(),
            run_id: self.run_id,
            secrets: Vec::new(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.progress.as_ref().is_some_and(Progress::is_cancelled)
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.services.config
    }

    pub async fn emit(&self, event: Event) {
        self.services.events.emit(event).await;
    }

    /// Hands the response to the logger unless the region opted out.
    pub fn log_response(&self, response: &HttpResponse) {
        if self.region.metadata.no_log() {
            return;
        }
        if let Some(logger) = &self.services.logger {
            logger.log_response(&self.region, self.request.as_ref(), response, &self.secrets);
        }
    }

    pub fn log_error(&self, error: &HookError) {
        if let Some(logger) = &self.services.logger {
            logger.log_error(&self.region, error);
        }
    }
}
