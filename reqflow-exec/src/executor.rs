//! Facade over loading and running documents.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use reqflow_core::{parse_document_str, Flow, HookError, HttpResponse, TestResult, Variables};

use crate::compile::{Compiler, InterceptorPlugin, Plugin};
use crate::context::{ProcessorContext, Services};
use crate::document::{ExecutionState, HttpFile, HttpRegion};
use crate::error::ExecutionError;
use crate::interceptors::{BailOnFailureInterceptor, StepTraceInterceptor};
use crate::progress::Progress;
use crate::runner::execute_region;

#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    pub variables: Variables,
    pub environments: Vec<String>,
    pub progress: Option<Progress>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Every region with a name or a request, in document order.
    All,
    Names(Vec<String>),
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct RegionReport {
    pub name: String,
    pub line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<HttpResponse>,
    pub test_results: Vec<TestResult>,
    pub succeeded: bool,
    pub skipped: bool,
    pub cancelled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RegionReport {
    fn new(region: &HttpRegion, outcome: &Result<Flow<bool>, HookError>) -> Self {
        let (succeeded, cancelled, error) = match outcome {
            Ok(Flow::Continue(ok)) => (*ok, false, None),
            Ok(Flow::Cancelled) => (false, true, None),
            Err(e) => (false, false, Some(e.root().to_string())),
        };
        Self {
            name: region.name().to_string(),
            line: region.symbol.start_line,
            response: region.response(),
            test_results: region.test_results(),
            succeeded,
            skipped: region.status() == ExecutionState::Skipped,
            cancelled,
            error,
        }
    }

    /// FAILED or ERROR results, or an error that ended the run.
    pub fn has_failures(&self) -> bool {
        self.error.is_some() || self.test_results.iter().any(|t| t.status.is_failure())
    }
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct BatchResult {
    pub reports: Vec<RegionReport>,
    /// The run was cancelled before every selected region ran.
    pub cancelled: bool,
}

impl BatchResult {
    pub fn succeeded(&self) -> bool {
        !self.cancelled && self.reports.iter().all(|r| !r.has_failures())
    }

    pub fn failed_count(&self) -> usize {
        self.reports.iter().filter(|r| r.has_failures()).count()
    }
}

pub struct Executor {
    services: Arc<Services>,
    compiler: Compiler,
    bail: Option<Arc<BailOnFailureInterceptor>>,
}

impl Executor {
    pub fn new(services: Services) -> Self {
        let compiler = Compiler::new(services.config.clone()).with_plugin(Arc::new(
            InterceptorPlugin::new("stepTrace", Arc::new(StepTraceInterceptor)),
        ));
        Self {
            services: Arc::new(services),
            compiler,
            bail: None,
        }
    }

    pub fn with_plugin(mut self, plugin: Arc<dyn Plugin>) -> Self {
        self.compiler.add_plugin(plugin);
        self
    }

    /// Skips every region after the first one that fails. Applies to
    /// documents loaded afterwards.
    pub fn with_bail(mut self) -> Self {
        let bail = Arc::new(BailOnFailureInterceptor::new());
        self.compiler
            .add_plugin(Arc::new(InterceptorPlugin::new("bail", bail.clone())));
        self.bail = Some(bail);
        self
    }

    pub fn services(&self) -> &Arc<Services> {
        &self.services
    }

    pub fn load_str(&self, source: &str, path: Option<PathBuf>) -> Result<Arc<HttpFile>, ExecutionError> {
        let document = parse_document_str(source)?;
        let file = self.compiler.compile(document, path)?;
        tracing::debug!(path = ?file.path, regions = file.regions().len(), "document loaded");
        Ok(Arc::new(file))
    }

    pub async fn load_file(&self, path: &Path) -> Result<Arc<HttpFile>, ExecutionError> {
        let source = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ExecutionError::Io {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        self.load_str(&source, Some(path.to_path_buf()))
    }

    /// Forgets cached results and sessions, e.g. between test batches.
    pub async fn reset(&self, file: &HttpFile) -> Result<(), ExecutionError> {
        file.reset_caches();
        self.services.sessions.reset().await?;
        if let Some(bail) = &self.bail {
            bail.reset();
        }
        Ok(())
    }

    /// Runs one region by name. Runtime failures are part of the report.
    pub async fn execute(
        &self,
        file: &Arc<HttpFile>,
        name: &str,
        options: &ExecuteOptions,
    ) -> Result<RegionReport, ExecutionError> {
        let region = find_region(file, name)?;
        let (report, _) = self.run(file, region, options.variables.clone(), options).await;
        Ok(report)
    }

    /// Runs the selected regions in order.
    ///
    /// Variables produced by a region are visible to the ones after it; a
    /// region that errored contributes nothing. Cancellation stops the batch.
    pub async fn execute_all(
        &self,
        file: &Arc<HttpFile>,
        selection: &Selection,
        options: &ExecuteOptions,
    ) -> Result<BatchResult, ExecutionError> {
        let regions: Vec<Arc<HttpRegion>> = match selection {
            Selection::All => file.regions().iter().filter(|r| !r.is_global()).cloned().collect(),
            Selection::Names(names) => names
                .iter()
                .map(|name| find_region(file, name))
                .collect::<Result<_, _>>()?,
        };

        let mut batch = BatchResult::default();
        let mut variables = options.variables.clone();
        for region in regions {
            if options.progress.as_ref().is_some_and(Progress::is_cancelled) {
                batch.cancelled = true;
                break;
            }
            let (report, output) = self.run(file, region, variables.clone(), options).await;
            if let Some(output) = output {
                variables = output;
            }
            let cancelled = report.cancelled;
            batch.reports.push(report);
            if cancelled {
                batch.cancelled = true;
                break;
            }
        }
        Ok(batch)
    }

    async fn run(
        &self,
        file: &Arc<HttpFile>,
        region: Arc<HttpRegion>,
        variables: Variables,
        options: &ExecuteOptions,
    ) -> (RegionReport, Option<Variables>) {
        let mut ctx = ProcessorContext::new(file.clone(), region.clone(), self.services.clone())
            .with_environments(options.environments.clone())
            .with_variables(variables);
        if let Some(progress) = &options.progress {
            ctx = ctx.with_progress(progress.clone());
        }
        tracing::info!(region = %region.name(), run_id = %ctx.run_id, "executing region");

        let outcome = execute_region(&mut ctx).await;
        let report = RegionReport::new(&region, &outcome);
        if let Err(e) = &outcome {
            tracing::warn!(region = %region.name(), error = %e, "region failed");
        }
        // errors end the trigger before `after_loop`
        if let (Some(bail), Err(_)) = (&self.bail, &outcome) {
            bail.mark_failed();
        }
        let output = outcome.is_ok().then_some(ctx.variables);
        (report, output)
    }
}

fn find_region(file: &HttpFile, name: &str) -> Result<Arc<HttpRegion>, ExecutionError> {
    file.region_by_name(name)
        .or_else(|| file.regions().iter().find(|r| r.symbol.name == name))
        .cloned()
        .ok_or_else(|| ExecutionError::RegionNotFound(name.to_string()))
}
