use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use reqflow_core::Variables;
use reqflow_exec::secrets::{CachingProvider, FileSecretsProvider, SchemeRouter, SecretsProvider};
use reqflow_exec::ExecutorConfig;

use crate::RunArgs;

/// Reads initial variables from a JSON or YAML object.
pub fn load_vars(path: Option<&Path>) -> Result<Variables, String> {
    let Some(path) = path else {
        return Ok(Variables::new());
    };
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read variables from {}: {e}", path.display()))?;
    let value: serde_json::Value = match serde_json::from_str(&content) {
        Ok(v) => v,
        Err(_) => serde_yaml::from_str(&content)
            .map_err(|_| "variables file is neither valid JSON nor YAML".to_string())?,
    };
    match value {
        serde_json::Value::Object(map) => Ok(map.into_iter().collect()),
        serde_json::Value::Null => Ok(Variables::new()),
        _ => Err("variables file must contain an object".to_string()),
    }
}

/// Applies `KEY=VALUE` overrides. Values that parse as JSON keep their type.
pub fn merge_set_vars(variables: &mut Variables, set_vars: &[String]) -> Result<(), String> {
    for s in set_vars {
        let (key, value) = s
            .split_once('=')
            .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(format!("empty variable name in '{s}'"));
        }
        let value = serde_json::from_str(value)
            .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
        variables.insert(key.to_string(), value);
    }
    Ok(())
}

pub fn build_executor_config(run: &RunArgs) -> ExecutorConfig {
    ExecutorConfig {
        request_timeout: Duration::from_millis(run.timeout),
        max_response_bytes: run.max_response_bytes,
        cookie_jar: !run.no_cookie_jar,
        allow_secrets_in_url: run.allow_secrets_in_url,
        ..Default::default()
    }
}

const SECRET_CACHE_TTL: Duration = Duration::from_secs(300);

/// `env://` always; `file://` when a secrets directory is given.
pub fn build_secrets(run: &RunArgs) -> Arc<dyn SecretsProvider> {
    let mut router = SchemeRouter::with_env();
    if let Some(dir) = &run.secrets_dir {
        router = router.with("file", FileSecretsProvider::new(dir.clone()));
    }
    Arc::new(CachingProvider::new(router, SECRET_CACHE_TTL))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_vars_keep_json_types() {
        let mut vars = Variables::new();
        merge_set_vars(
            &mut vars,
            &["n=5".to_string(), "id=007".to_string(), "flag=true".to_string()],
        )
        .unwrap();
        assert_eq!(vars["n"], json!(5));
        assert_eq!(vars["id"], json!("007"));
        assert_eq!(vars["flag"], json!(true));
    }

    #[test]
    fn set_vars_reject_missing_equals() {
        let mut vars = Variables::new();
        assert!(merge_set_vars(&mut vars, &["oops".to_string()]).is_err());
    }

    #[test]
    fn loads_yaml_vars() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("vars.yaml");
        std::fs::write(&path, "host: https://example.com\nretries: 3\n").unwrap();
        let vars = load_vars(Some(&path)).unwrap();
        assert_eq!(vars["host"], json!("https://example.com"));
        assert_eq!(vars["retries"], json!(3));
    }

    #[test]
    fn rejects_non_object_vars() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("vars.json");
        std::fs::write(&path, "[1, 2]").unwrap();
        assert!(load_vars(Some(&path)).is_err());
    }
}
