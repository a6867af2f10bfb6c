//! Placeholder replacement through the document's `replace_variable` pipeline.

mod host;
mod secret;
mod variable;

use std::sync::Arc;

use reqflow_core::template::{has_expressions, parse_template};
use reqflow_core::{Flow, HookError, HookOptions, HookPipeline, PipelineError, Variables};

use crate::context::{ProcessorContext, Services};
use crate::progress::Progress;
use crate::secrets::{SecretPlacement, SecretValue};

pub use host::HostReplacer;
pub use secret::SecretReplacer;
pub use variable::{lookup_path, VariableReplacer};

pub const SECRET: &str = "secret";
pub const HOST: &str = "host";
pub const VARIABLE: &str = "variable";

/// Arguments of one replacement; each hook rewrites `text` in place.
pub struct ReplaceArgs {
    pub text: String,
    pub placement: SecretPlacement,
    pub variables: Variables,
    pub services: Arc<Services>,
    pub progress: Option<Progress>,
    /// Secret values substituted so far, for redaction.
    pub secrets: Vec<SecretValue>,
}

impl ReplaceArgs {
    pub fn is_cancelled(&self) -> bool {
        self.progress.as_ref().is_some_and(Progress::is_cancelled)
    }
}

/// Registers `secret`, `host` and `variable` in that order.
pub fn register_defaults(pipeline: &mut HookPipeline<ReplaceArgs, bool>) -> Result<(), PipelineError> {
    pipeline.add_hook(SECRET, SecretReplacer, HookOptions::new().before(HOST))?;
    pipeline.add_hook(HOST, HostReplacer, HookOptions::new().before(VARIABLE))?;
    pipeline.add_hook(VARIABLE, VariableReplacer, HookOptions::new().after(HOST))?;
    Ok(())
}

/// Rewrites every placeholder `resolve` knows; the rest stay as written.
/// Text that is not a well-formed template is returned unchanged.
pub(crate) fn rewrite(text: &str, resolve: impl FnMut(&str) -> Option<String>) -> String {
    match parse_template(text) {
        Ok(template) => template.render(resolve),
        Err(e) => {
            tracing::debug!(error = %e, "placeholder syntax error, text left unchanged");
            text.to_string()
        }
    }
}

/// Replaces placeholders in `text` with the current variables.
///
/// Returns `Flow::Cancelled` when the run was cancelled, which callers treat
/// like a cancelled pipeline.
pub async fn replace_variables(
    ctx: &mut ProcessorContext,
    text: &str,
    placement: SecretPlacement,
) -> Result<Flow<String>, HookError> {
    if ctx.is_cancelled() {
        return Ok(Flow::Cancelled);
    }
    if !has_expressions(text) {
        return Ok(Flow::Continue(text.to_string()));
    }

    let mut args = ReplaceArgs {
        text: text.to_string(),
        placement,
        variables: ctx.variables.clone(),
        services: ctx.services.clone(),
        progress: ctx.progress.clone(),
        secrets: Vec::new(),
    };
    let file = ctx.file.clone();
    if file.hooks.replace_variable.trigger(&mut args).await?.is_cancelled() {
        return Ok(Flow::Cancelled);
    }

    if let Ok(template) = parse_template(&args.text) {
        for expr in template.expressions() {
            tracing::warn!(region = %ctx.region.name(), placeholder = %expr, "unresolved placeholder");
        }
    }
    ctx.secrets.extend(args.secrets);
    Ok(Flow::Continue(args.text))
}
