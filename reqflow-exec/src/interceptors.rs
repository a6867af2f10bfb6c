//! Interceptors the executor installs on top of the compiled pipelines.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use reqflow_core::{Flow, HookError, Interceptor, TestResult, TriggerContext};

use crate::context::ProcessorContext;
use crate::document::ExecutionState;

/// Stop-on-first-failure policy for a batch.
///
/// Once a region ends with a FAILED or ERROR result, every later region is
/// skipped before any of its steps run.
#[derive(Debug, Default)]
pub struct BailOnFailureInterceptor {
    failed: AtomicBool,
}

impl BailOnFailureInterceptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }

    /// Marks the batch as failed, for errors that end a trigger early.
    pub fn mark_failed(&self) {
        self.failed.store(true, Ordering::SeqCst);
    }

    pub fn reset(&self) {
        self.failed.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl Interceptor<ProcessorContext, bool> for BailOnFailureInterceptor {
    async fn before_loop(
        &self,
        tc: &mut TriggerContext<'_, ProcessorContext, bool>,
    ) -> Result<Flow<()>, HookError> {
        if self.has_failed() {
            let region = &tc.args.region;
            tracing::info!(region = %region.name(), "skipped after an earlier failure");
            region.add_test_result(TestResult::skipped("skipped after an earlier failure"));
            region.set_status(ExecutionState::Skipped);
            tc.bail();
        }
        Ok(Flow::Continue(()))
    }

    async fn after_loop(
        &self,
        tc: &mut TriggerContext<'_, ProcessorContext, bool>,
    ) -> Result<Flow<()>, HookError> {
        // Loop clones share their region's id; the region itself holds the
        // results of every iteration.
        let region = &tc.args.region;
        let failed = region.has_failures()
            || tc
                .args
                .file
                .region(region.id)
                .is_some_and(|r| r.has_failures());
        if failed {
            self.mark_failed();
        }
        Ok(Flow::Continue(()))
    }
}

/// Logs every step at debug level.
#[derive(Debug, Default)]
pub struct StepTraceInterceptor;

#[async_trait]
impl Interceptor<ProcessorContext, bool> for StepTraceInterceptor {
    async fn before_trigger(
        &self,
        tc: &mut TriggerContext<'_, ProcessorContext, bool>,
    ) -> Result<Flow<()>, HookError> {
        tracing::debug!(
            region = %tc.args.region.name(),
            step = tc.index() + 1,
            of = tc.length(),
            "step"
        );
        Ok(Flow::Continue(()))
    }

    async fn after_trigger(
        &self,
        tc: &mut TriggerContext<'_, ProcessorContext, bool>,
    ) -> Result<Flow<()>, HookError> {
        tracing::debug!(
            region = %tc.args.region.name(),
            hook = tc.hook_name().unwrap_or_default(),
            result = ?tc.results().last(),
            "step done"
        );
        Ok(Flow::Continue(()))
    }
}
