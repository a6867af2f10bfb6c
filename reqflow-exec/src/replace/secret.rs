use async_trait::async_trait;

use reqflow_core::template::{parse_template, Segment};
use reqflow_core::{Flow, Hook, HookError};

use super::ReplaceArgs;
use crate::secrets::{SecretError, SecretRef};

/// `{{$secret scheme://id}}` through the configured secrets provider.
pub struct SecretReplacer;

#[async_trait]
impl Hook<ReplaceArgs, bool> for SecretReplacer {
    async fn call(&self, args: &mut ReplaceArgs) -> Result<Flow<bool>, HookError> {
        if args.is_cancelled() {
            return Ok(Flow::Cancelled);
        }
        let Ok(template) = parse_template(&args.text) else {
            return Ok(Flow::Continue(true));
        };
        if !template.expressions().any(|e| secret_ref_text(e).is_some()) {
            return Ok(Flow::Continue(true));
        }

        let mut out = String::with_capacity(args.text.len());
        for segment in &template.segments {
            match segment {
                Segment::Literal(s) => out.push_str(s),
                Segment::Expr(expr) => match secret_ref_text(expr) {
                    Some(raw) => {
                        let value = resolve(args, raw).await.map_err(secret_error)?;
                        out.push_str(&value);
                    }
                    None => {
                        out.push_str("{{");
                        out.push_str(expr);
                        out.push_str("}}");
                    }
                },
            }
        }
        args.text = out;
        Ok(Flow::Continue(true))
    }
}

fn secret_ref_text(expr: &str) -> Option<&str> {
    let rest = expr.strip_prefix("$secret")?;
    rest.starts_with(char::is_whitespace).then(|| rest.trim())
}

async fn resolve(args: &mut ReplaceArgs, raw: &str) -> Result<String, SecretError> {
    let secret_ref = SecretRef::parse(raw)?;
    args.services
        .secrets_policy
        .ensure_allowed(&secret_ref, args.placement)?;
    let value = args.services.secrets.get(&secret_ref).await?;
    let text = value
        .expose_str()
        .ok_or_else(|| SecretError::NotUtf8(secret_ref.clone()))?
        .to_string();
    args.secrets.push(value);
    Ok(text)
}

fn secret_error(e: SecretError) -> HookError {
    HookError::Secret(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_secret_placeholders() {
        assert_eq!(secret_ref_text("$secret env://TOKEN"), Some("env://TOKEN"));
        assert_eq!(secret_ref_text("$secrets"), None);
        assert_eq!(secret_ref_text("token"), None);
    }
}
