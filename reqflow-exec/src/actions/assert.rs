use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};
use serde_json_path::JsonPath;

use reqflow_core::condition::{as_text, compare, is_truthy, parse_literal, split_condition};
use reqflow_core::{Flow, Hook, HookError, HttpResponse, TestResult};

use super::replaced;
use crate::context::ProcessorContext;
use crate::secrets::SecretPlacement;

/// One `?? <subject> <op> <expected>` line.
pub struct AssertAction {
    pub line: usize,
    pub text: String,
}

#[async_trait]
impl Hook<ProcessorContext, bool> for AssertAction {
    async fn call(&self, ctx: &mut ProcessorContext) -> Result<Flow<bool>, HookError> {
        let Some(text) = replaced(ctx, &self.text, SecretPlacement::Variable).await? else {
            return Ok(Flow::Cancelled);
        };

        let result = match split_condition(&text) {
            Some((lhs, op, rhs)) => {
                let actual = resolve_subject(ctx.response.as_ref(), lhs)?;
                let message = format!("{lhs} {op} {rhs}");
                match compare(&actual, op, &parse_literal(rhs)) {
                    Ok(true) => TestResult::success(message),
                    Ok(false) => TestResult::failed(format!("{message} (actual: {})", as_text(&actual))),
                    Err(e) => TestResult::failed(format!("{message}: {e}")),
                }
            }
            None => {
                let actual = resolve_subject(ctx.response.as_ref(), &text)?;
                if is_truthy(&actual) {
                    TestResult::success(text.clone())
                } else {
                    TestResult::failed(format!("{text} is falsy"))
                }
            }
        };

        let passed = !result.status.is_failure();
        if !passed {
            tracing::debug!(region = %ctx.region.name(), line = self.line, "{}", result.message);
        }
        ctx.region.add_test_result(result);
        Ok(Flow::Continue(passed))
    }
}

/// Value an assertion subject refers to: `status`, `header <name>`, `body`,
/// `body <jsonpath>`, `duration`, or a literal.
pub fn resolve_subject(response: Option<&HttpResponse>, subject: &str) -> Result<JsonValue, HookError> {
    let subject = subject.trim();
    let (head, rest) = match subject.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (subject, ""),
    };
    let needs_response = matches!(head, "status" | "header" | "headers" | "body" | "duration");
    if !needs_response {
        return Ok(parse_literal(subject));
    }
    let response = response.ok_or_else(|| HookError::message(format!("'{subject}' needs a response")))?;

    let value = match (head, rest) {
        ("status", "") => json!(response.status_code),
        ("duration", "") => json!(response.duration.as_millis() as u64),
        ("header" | "headers", name) if !name.is_empty() => response
            .header(name)
            .map(|v| JsonValue::String(v.to_string()))
            .unwrap_or(JsonValue::Null),
        ("body", "") => response.body_value(),
        ("body", path) => {
            let path = if path.starts_with('$') {
                path.to_string()
            } else {
                format!("$.{path}")
            };
            let query = JsonPath::parse(&path)
                .map_err(|e| HookError::message(format!("invalid JSONPath '{path}': {e}")))?;
            let body = response.body_value();
            query.query(&body).first().cloned().unwrap_or(JsonValue::Null)
        }
        _ => parse_literal(subject),
    };
    Ok(value)
}
