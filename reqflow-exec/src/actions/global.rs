use async_trait::async_trait;

use reqflow_core::{Flow, Hook, HookError};

use crate::context::{ExecutionKind, ProcessorContext};
use crate::runner::{changed_variables, execute_region};

/// Runs the document's global regions ahead of a named region.
///
/// Their variables are cached per environment on the document, so globals
/// run once per environment until one of them is executed again directly.
pub struct GlobalAction;

#[async_trait]
impl Hook<ProcessorContext, bool> for GlobalAction {
    async fn call(&self, ctx: &mut ProcessorContext) -> Result<Flow<bool>, HookError> {
        if ctx.region.is_global() {
            return Ok(Flow::Continue(true));
        }
        let file = ctx.file.clone();
        let globals: Vec<_> = file.global_regions().cloned().collect();
        if globals.is_empty() {
            return Ok(Flow::Continue(true));
        }
        for global in &globals {
            file.add_dependent(global.id, ctx.region.id);
        }

        if let Some(cached) = file.cached_globals(&ctx.env_key) {
            tracing::debug!(region = %ctx.region.name(), env = %ctx.env_key, "global variables from cache");
            ctx.variables.extend(cached);
            return Ok(Flow::Continue(true));
        }

        let before = ctx.variables.clone();
        let mut variables = ctx.variables.clone();
        for global in globals {
            let mut child = ctx.child(global, ExecutionKind::Prerequisite);
            child.variables = variables;
            match execute_region(&mut child).await? {
                Flow::Cancelled => return Ok(Flow::Cancelled),
                Flow::Continue(false) => return Ok(Flow::Continue(false)),
                Flow::Continue(true) => variables = child.variables,
            }
        }

        let changed = changed_variables(&before, &variables);
        file.store_globals(&ctx.env_key, changed.clone());
        ctx.variables.extend(changed);
        Ok(Flow::Continue(true))
    }
}
