use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

use reqflow_core::{
    Assertion, EnvKey, HookPipeline, HttpRequest, HttpResponse, Metadata, RegionId, Symbol,
    TestResult, Variables,
};

use crate::context::ProcessorContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    Idle,
    Running,
    Looping,
    AwaitingStream,
    Skipped,
    Completed,
    Failed,
    Cancelled,
}

#[derive(Debug)]
struct RegionState {
    status: ExecutionState,
    response: Option<HttpResponse>,
    test_results: Vec<TestResult>,
    variables_per_env: BTreeMap<EnvKey, Variables>,
}

impl Default for RegionState {
    fn default() -> Self {
        Self {
            status: ExecutionState::Idle,
            response: None,
            test_results: Vec::new(),
            variables_per_env: BTreeMap::new(),
        }
    }
}

/// One executable unit of a document.
///
/// Definition fields are fixed after compilation. Runtime results live behind
/// a lock and are only written by the region's own execution or by
/// invalidation on its behalf.
pub struct HttpRegion {
    pub id: RegionId,
    pub symbol: Symbol,
    pub metadata: Metadata,
    pub request: Option<Arc<HttpRequest>>,
    /// Loop iteration this region was cloned for.
    pub iteration: Option<usize>,
    pipeline: HookPipeline<ProcessorContext, bool>,
    state: Mutex<RegionState>,
}

impl std::fmt::Debug for HttpRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRegion")
            .field("id", &self.id)
            .field("name", &self.name())
            .field("iteration", &self.iteration)
            .finish()
    }
}

impl HttpRegion {
    pub fn new(
        id: RegionId,
        symbol: Symbol,
        metadata: Metadata,
        request: Option<HttpRequest>,
        pipeline: HookPipeline<ProcessorContext, bool>,
    ) -> Self {
        Self {
            id,
            symbol,
            metadata,
            request: request.map(Arc::new),
            iteration: None,
            pipeline,
            state: Mutex::new(RegionState::default()),
        }
    }

    /// Fresh region for loop iteration `index`: same id and request
    /// template, name suffixed with the index, no pipeline and no results.
    pub fn clone_for_iteration(&self, index: usize) -> HttpRegion {
        let mut metadata = self.metadata.clone();
        if let Some(name) = self.metadata.name() {
            metadata.set("name", format!("{name}{index}"));
        }
        let mut symbol = self.symbol.clone();
        symbol.name = format!("{}{index}", self.symbol.name);
        HttpRegion {
            id: self.id,
            symbol,
            metadata,
            request: self.request.clone(),
            iteration: Some(index),
            pipeline: HookPipeline::new(),
            state: Mutex::new(RegionState::default()),
        }
    }

    /// A region with neither a request nor a name runs before every named
    /// region of its document.
    pub fn is_global(&self) -> bool {
        self.request.is_none() && self.metadata.name().is_none()
    }

    pub fn name(&self) -> &str {
        self.metadata.name().unwrap_or(&self.symbol.name)
    }

    /// Pipeline run by `execute_region`: document steps merged with this
    /// region's own, or only its own for globals.
    pub fn pipeline(&self) -> &HookPipeline<ProcessorContext, bool> {
        &self.pipeline
    }

    pub fn status(&self) -> ExecutionState {
        self.state.lock().status
    }

    pub fn set_status(&self, status: ExecutionState) {
        self.state.lock().status = status;
    }

    /// Clears the previous response and test results before a run.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.status = ExecutionState::Running;
        state.response = None;
        state.test_results.clear();
    }

    pub fn response(&self) -> Option<HttpResponse> {
        self.state.lock().response.clone()
    }

    pub fn set_response(&self, response: HttpResponse) {
        self.state.lock().response = Some(response);
    }

    pub fn test_results(&self) -> Vec<TestResult> {
        self.state.lock().test_results.clone()
    }

    pub fn add_test_result(&self, result: TestResult) {
        self.state.lock().test_results.push(result);
    }

    pub fn has_failures(&self) -> bool {
        self.state
            .lock()
            .test_results
            .iter()
            .any(|t| t.status.is_failure())
    }

    pub fn cached_variables(&self, env: &EnvKey) -> Option<Variables> {
        self.state.lock().variables_per_env.get(env).cloned()
    }

    pub fn store_variables(&self, env: &EnvKey, variables: Variables) {
        self.state
            .lock()
            .variables_per_env
            .insert(env.clone(), variables);
    }

    /// Drops the cached response and the variables cached for `env` only.
    pub fn invalidate(&self, env: &EnvKey) {
        let mut state = self.state.lock();
        state.response = None;
        state.variables_per_env.remove(env);
    }

    pub fn clear_cache(&self) {
        let mut state = self.state.lock();
        *state = RegionState::default();
    }

    /// Copies the outcome of a finished loop iteration onto this region.
    pub fn absorb_iteration(&self, iteration: &HttpRegion) {
        let (response, results) = {
            let s = iteration.state.lock();
            (s.response.clone(), s.test_results.clone())
        };
        let mut state = self.state.lock();
        if response.is_some() {
            state.response = response;
        }
        state.test_results.extend(results);
    }
}
