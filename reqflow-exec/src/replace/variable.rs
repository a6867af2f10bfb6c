use async_trait::async_trait;
use serde_json::Value as JsonValue;

use reqflow_core::condition::as_text;
use reqflow_core::{Flow, Hook, HookError, Variables};

use super::{rewrite, ReplaceArgs};

/// Named variables, with dotted paths into JSON values (`login.token`,
/// `items.0.id`).
pub struct VariableReplacer;

#[async_trait]
impl Hook<ReplaceArgs, bool> for VariableReplacer {
    async fn call(&self, args: &mut ReplaceArgs) -> Result<Flow<bool>, HookError> {
        if args.is_cancelled() {
            return Ok(Flow::Cancelled);
        }
        let variables = &args.variables;
        args.text = rewrite(&args.text, |expr| lookup_path(variables, expr).map(as_text));
        Ok(Flow::Continue(true))
    }
}

pub fn lookup_path<'a>(variables: &'a Variables, path: &str) -> Option<&'a JsonValue> {
    let path = path.trim();
    if let Some(v) = variables.get(path) {
        return Some(v);
    }
    let mut parts = path.split('.');
    let mut current = variables.get(parts.next()?)?;
    for part in parts {
        current = match current {
            JsonValue::Object(map) => map.get(part)?,
            JsonValue::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dotted_paths_walk_objects_and_arrays() {
        let vars = Variables::from([
            ("login".to_string(), json!({"token": "abc", "roles": ["a", "b"]})),
            ("a.b".to_string(), json!("literal")),
        ]);
        assert_eq!(lookup_path(&vars, "login.token"), Some(&json!("abc")));
        assert_eq!(lookup_path(&vars, "login.roles.1"), Some(&json!("b")));
        assert_eq!(lookup_path(&vars, "a.b"), Some(&json!("literal")));
        assert_eq!(lookup_path(&vars, "login.missing"), None);
    }
}
