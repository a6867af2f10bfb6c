use async_trait::async_trait;
use serde_json::Value as JsonValue;

use reqflow_core::{Flow, Hook, HookError};

use super::replaced;
use crate::context::ProcessorContext;
use crate::secrets::SecretPlacement;

/// `@name = value`: the replaced value is stored as JSON when it parses as
/// JSON and as a string otherwise.
pub struct VariableAction {
    pub name: String,
    pub expression: String,
}

#[async_trait]
impl Hook<ProcessorContext, bool> for VariableAction {
    async fn call(&self, ctx: &mut ProcessorContext) -> Result<Flow<bool>, HookError> {
        let Some(text) = replaced(ctx, &self.expression, SecretPlacement::Variable).await? else {
            return Ok(Flow::Cancelled);
        };
        let value = serde_json::from_str(&text).unwrap_or(JsonValue::String(text));
        ctx.variables.insert(self.name.clone(), value);
        Ok(Flow::Continue(true))
    }
}
