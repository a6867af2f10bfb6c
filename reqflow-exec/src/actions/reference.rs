use async_trait::async_trait;

use reqflow_core::{Flow, Hook, HookError};

use crate::context::{ExecutionKind, ProcessorContext};
use crate::runner::{changed_variables, execute_region, merge_produced};

/// Resolves `@ref` and `@forceRef`.
///
/// A plain reference reuses the target's cached variables for the current
/// environment; a forced one always re-executes the target. Only what the
/// target produced is merged, and never over a variable already set here.
pub struct RefAction;

#[async_trait]
impl Hook<ProcessorContext, bool> for RefAction {
    async fn call(&self, ctx: &mut ProcessorContext) -> Result<Flow<bool>, HookError> {
        let file = ctx.file.clone();
        for (name, force) in ctx.region.metadata.refs() {
            let target = file
                .region_by_name(&name)
                .cloned()
                .ok_or_else(|| HookError::UnknownReference(name.clone()))?;
            if target.id == ctx.region.id || ctx.call_stack.contains(&target.id) {
                return Err(HookError::message(format!(
                    "reference cycle: '{}' is already executing",
                    name
                )));
            }

            let cached = if force {
                None
            } else {
                target.cached_variables(&ctx.env_key)
            };
            match cached {
                Some(variables) => {
                    tracing::debug!(region = %ctx.region.name(), reference = %name, "reference served from cache");
                    file.add_dependent(target.id, ctx.region.id);
                    merge_produced(&mut ctx.variables, variables);
                }
                None => {
                    let mut child = ctx.child(target.clone(), ExecutionKind::Reference);
                    match execute_region(&mut child).await? {
                        Flow::Cancelled => return Ok(Flow::Cancelled),
                        Flow::Continue(false) => return Ok(Flow::Continue(false)),
                        Flow::Continue(true) => {
                            let produced = changed_variables(&ctx.variables, &child.variables);
                            merge_produced(&mut ctx.variables, produced);
                        }
                    }
                }
            }

            if ctx.region.request.is_none() {
                ctx.response = target.response();
                if let Some(response) = &ctx.response {
                    ctx.region.set_response(response.clone());
                }
            }
        }
        Ok(Flow::Continue(true))
    }
}
