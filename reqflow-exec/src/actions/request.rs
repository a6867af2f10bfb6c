use async_trait::async_trait;

use reqflow_core::{Flow, Hook, HookError, HttpRequest};

use super::replaced;
use crate::context::ProcessorContext;
use crate::secrets::SecretPlacement;

/// Builds `ctx.request` from the region's template and runs the document's
/// `on_request` hooks on it.
pub struct RequestAction;

#[async_trait]
impl Hook<ProcessorContext, bool> for RequestAction {
    async fn call(&self, ctx: &mut ProcessorContext) -> Result<Flow<bool>, HookError> {
        let Some(template) = ctx.region.request.clone() else {
            return Ok(Flow::Continue(true));
        };
        ctx.secrets.clear();

        let Some(url) = replaced(ctx, &template.url, SecretPlacement::Url).await? else {
            return Ok(Flow::Cancelled);
        };
        let mut request = HttpRequest::new(template.protocol, template.method.clone(), url);
        for (name, value) in &template.headers {
            let Some(value) = replaced(ctx, value, SecretPlacement::Header).await? else {
                return Ok(Flow::Cancelled);
            };
            request.headers.push((name.clone(), value));
        }
        if let Some(body) = &template.body {
            let Some(body) = replaced(ctx, body, SecretPlacement::Body).await? else {
                return Ok(Flow::Cancelled);
            };
            request.body = Some(body);
        }

        ctx.request = Some(request);
        let file = ctx.file.clone();
        if file.hooks.on_request.trigger(ctx).await?.is_cancelled() {
            return Ok(Flow::Cancelled);
        }
        Ok(Flow::Continue(true))
    }
}
