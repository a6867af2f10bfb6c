use async_trait::async_trait;

use reqflow_core::{Flow, Hook, HookError};

use crate::context::ProcessorContext;
use crate::document::ExecutionState;
use crate::stream_driver::drive;

/// Sends `ctx.request` through the client registered for its protocol.
///
/// The response is stored on the region, run through `on_response`, and
/// exposed as a variable named after the region.
pub struct SendAction;

#[async_trait]
impl Hook<ProcessorContext, bool> for SendAction {
    async fn call(&self, ctx: &mut ProcessorContext) -> Result<Flow<bool>, HookError> {
        let Some(request) = ctx.request.clone() else {
            return Ok(Flow::Continue(true));
        };
        let provider = ctx
            .services
            .clients
            .provider(request.protocol)
            .cloned()
            .ok_or_else(|| HookError::UnsupportedProtocol(request.protocol.to_string()))?;
        let client = provider.create(&request)?;

        ctx.region.set_status(ExecutionState::AwaitingStream);
        let response = match drive(ctx, client, request.body.as_deref()).await? {
            Flow::Continue(response) => response,
            Flow::Cancelled => return Ok(Flow::Cancelled),
        };
        ctx.region.set_status(ExecutionState::Running);
        tracing::debug!(
            region = %ctx.region.name(),
            status = response.status_code,
            duration_ms = response.duration.as_millis() as u64,
            "response received"
        );

        ctx.response = Some(response);
        let file = ctx.file.clone();
        if file.hooks.on_response.trigger(ctx).await?.is_cancelled() {
            return Ok(Flow::Cancelled);
        }
        let Some(response) = ctx.response.clone() else {
            return Ok(Flow::Continue(true));
        };

        ctx.region.set_response(response.clone());
        if let Some(name) = ctx.region.metadata.name() {
            ctx.variables.insert(name.to_string(), response.body_value());
        }
        ctx.log_response(&response);
        Ok(Flow::Continue(true))
    }
}
