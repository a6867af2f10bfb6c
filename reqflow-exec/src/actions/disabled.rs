use async_trait::async_trait;

use reqflow_core::condition::evaluate_condition;
use reqflow_core::{DisableSpec, Flow, Hook, HookError, Interceptor, TestResult, TriggerContext};

use super::replaced;
use crate::context::ProcessorContext;
use crate::document::{ExecutionState, HttpRegion};
use crate::secrets::SecretPlacement;

fn skip(region: &HttpRegion, reason: String) {
    tracing::info!(region = %region.name(), "{reason}");
    region.add_test_result(TestResult::skipped(reason));
    region.set_status(ExecutionState::Skipped);
}

/// Evaluates a conditional `@disabled <expr>` against the current variables.
pub struct DisabledAction;

#[async_trait]
impl Hook<ProcessorContext, bool> for DisabledAction {
    async fn call(&self, ctx: &mut ProcessorContext) -> Result<Flow<bool>, HookError> {
        let Some(DisableSpec::When(expression)) = ctx.region.metadata.disabled() else {
            return Ok(Flow::Continue(true));
        };
        let Some(text) = replaced(ctx, &expression, SecretPlacement::Variable).await? else {
            return Ok(Flow::Cancelled);
        };
        if evaluate_condition(&text)? {
            skip(&ctx.region, format!("disabled: {expression}"));
            return Ok(Flow::Continue(false));
        }
        Ok(Flow::Continue(true))
    }
}

/// Skips the whole region when it is disabled unconditionally, and stops the
/// remaining steps once a conditional disable matched.
pub struct DisabledInterceptor;

#[async_trait]
impl Interceptor<ProcessorContext, bool> for DisabledInterceptor {
    async fn before_loop(
        &self,
        tc: &mut TriggerContext<'_, ProcessorContext, bool>,
    ) -> Result<Flow<()>, HookError> {
        if !tc.is_bailed() && tc.args.region.metadata.disabled() == Some(DisableSpec::Always) {
            skip(&tc.args.region, "disabled".to_string());
            tc.bail();
        }
        Ok(Flow::Continue(()))
    }

    async fn after_trigger(
        &self,
        tc: &mut TriggerContext<'_, ProcessorContext, bool>,
    ) -> Result<Flow<()>, HookError> {
        if tc.args.region.status() == ExecutionState::Skipped {
            tc.bail();
        }
        Ok(Flow::Continue(()))
    }
}
