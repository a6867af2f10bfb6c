use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use super::{SecretError, SecretRef, SecretValue};

/// Backend for one secret scheme. `secret_ref.id` is the part after `://`.
#[async_trait]
pub trait SecretsProvider: Send + Sync {
    async fn get(&self, secret_ref: &SecretRef) -> Result<SecretValue, SecretError>;
}

/// Dispatches `{{$secret scheme://id}}` to the provider registered for `scheme`.
#[derive(Default, Clone)]
pub struct SchemeRouter {
    providers: BTreeMap<String, Arc<dyn SecretsProvider>>,
}

impl SchemeRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Router with the process environment mounted as `env`.
    pub fn with_env() -> Self {
        Self::new().with("env", EnvSecretsProvider::default())
    }

    pub fn with(mut self, scheme: impl Into<String>, provider: impl SecretsProvider + 'static) -> Self {
        self.register(scheme, Arc::new(provider));
        self
    }

    /// Replaces any provider already mounted for `scheme`.
    pub fn register(&mut self, scheme: impl Into<String>, provider: Arc<dyn SecretsProvider>) {
        self.providers.insert(scheme.into(), provider);
    }

    pub fn schemes(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }
}

#[async_trait]
impl SecretsProvider for SchemeRouter {
    async fn get(&self, secret_ref: &SecretRef) -> Result<SecretValue, SecretError> {
        let provider = self
            .providers
            .get(&secret_ref.scheme)
            .ok_or_else(|| SecretError::UnknownScheme(secret_ref.scheme.clone()))?;
        provider.get(secret_ref).await
    }
}

/// Process environment variables, optionally under a common prefix.
#[derive(Debug, Clone, Default)]
pub struct EnvSecretsProvider {
    pub prefix: Option<String>,
}

#[async_trait]
impl SecretsProvider for EnvSecretsProvider {
    async fn get(&self, secret_ref: &SecretRef) -> Result<SecretValue, SecretError> {
        let key = match &self.prefix {
            Some(prefix) => format!("{prefix}{}", secret_ref.id),
            None => secret_ref.id.clone(),
        };
        match std::env::var(&key) {
            Ok(v) => Ok(SecretValue::from_string(v)),
            Err(std::env::VarError::NotPresent) => Err(SecretError::NotFound(secret_ref.clone())),
            Err(e) => Err(SecretError::provider(secret_ref.clone(), e.to_string())),
        }
    }
}

/// One file per secret below `root`, e.g. mounted container secrets.
/// A single trailing line break is stripped.
#[derive(Debug, Clone)]
pub struct FileSecretsProvider {
    root: PathBuf,
}

impl FileSecretsProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, secret_ref: &SecretRef) -> Result<PathBuf, SecretError> {
        let relative = Path::new(&secret_ref.id);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(SecretError::provider(
                secret_ref.clone(),
                "path must stay inside the secrets directory",
            ));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl SecretsProvider for FileSecretsProvider {
    async fn get(&self, secret_ref: &SecretRef) -> Result<SecretValue, SecretError> {
        let path = self.path_for(secret_ref)?;
        let mut bytes = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => SecretError::NotFound(secret_ref.clone()),
            _ => SecretError::provider(secret_ref.clone(), e.to_string()),
        })?;
        let trim = match bytes.as_slice() {
            [.., b'\r', b'\n'] => 2,
            [.., b'\n'] => 1,
            _ => 0,
        };
        bytes.truncate(bytes.len() - trim);
        Ok(SecretValue::from_bytes(bytes))
    }
}

/// In-memory secrets keyed by id, for tests and embedding.
#[derive(Default)]
pub struct MapSecretsProvider {
    values: BTreeMap<String, SecretValue>,
}

impl MapSecretsProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, value: impl Into<String>) {
        self.values
            .insert(id.into(), SecretValue::from_string(value.into()));
    }
}

#[async_trait]
impl SecretsProvider for MapSecretsProvider {
    async fn get(&self, secret_ref: &SecretRef) -> Result<SecretValue, SecretError> {
        self.values
            .get(&secret_ref.id)
            .cloned()
            .ok_or_else(|| SecretError::NotFound(secret_ref.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vault() -> MapSecretsProvider {
        let mut map = MapSecretsProvider::new();
        map.insert("api-key", "s3cr3t");
        map
    }

    #[tokio::test]
    async fn routes_by_scheme() {
        let router = SchemeRouter::new().with("vault", vault());
        let value = router.get(&SecretRef::new("vault", "api-key")).await.unwrap();
        assert_eq!(value.expose_str(), Some("s3cr3t"));

        let err = router.get(&SecretRef::new("aws", "x")).await.unwrap_err();
        assert!(matches!(err, SecretError::UnknownScheme(s) if s == "aws"));
        assert_eq!(router.schemes().collect::<Vec<_>>(), vec!["vault"]);
    }

    #[tokio::test]
    async fn file_secrets_strip_one_line_break() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("token"), "abc\r\n").unwrap();
        let files = FileSecretsProvider::new(dir.path());

        let value = files.get(&SecretRef::new("file", "token")).await.unwrap();
        assert_eq!(value.expose_str(), Some("abc"));

        let missing = files.get(&SecretRef::new("file", "nope")).await.unwrap_err();
        assert!(matches!(missing, SecretError::NotFound(_)));
    }

    #[tokio::test]
    async fn file_secrets_refuse_parent_paths() {
        let files = FileSecretsProvider::new("/run/secrets");
        let err = files
            .get(&SecretRef::new("file", "../etc/passwd"))
            .await
            .unwrap_err();
        assert!(matches!(err, SecretError::Provider { .. }));
    }
}
