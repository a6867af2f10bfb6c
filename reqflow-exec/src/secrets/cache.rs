use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{SecretError, SecretRef, SecretValue, SecretsProvider};

/// Remembers resolved secrets for `ttl`, so a region loop does not hit the
/// backing provider once per iteration.
pub struct CachingProvider<P> {
    inner: P,
    ttl: Duration,
    entries: Mutex<HashMap<SecretRef, (SecretValue, Instant)>>,
}

impl<P: SecretsProvider> CachingProvider<P> {
    pub fn new(inner: P, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

#[async_trait]
impl<P: SecretsProvider> SecretsProvider for CachingProvider<P> {
    async fn get(&self, secret_ref: &SecretRef) -> Result<SecretValue, SecretError> {
        {
            let mut entries = self.entries.lock();
            match entries.get(secret_ref) {
                Some((value, expires_at)) if Instant::now() < *expires_at => {
                    return Ok(value.clone())
                }
                Some(_) => {
                    entries.remove(secret_ref);
                }
                None => {}
            }
        }

        let value = self.inner.get(secret_ref).await?;
        self.entries
            .lock()
            .insert(secret_ref.clone(), (value.clone(), Instant::now() + self.ttl));
        Ok(value)
    }
}
