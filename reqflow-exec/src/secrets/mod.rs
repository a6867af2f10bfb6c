//! `{{$secret scheme://id}}` resolution.

mod cache;
mod placement;
mod provider;
mod redact;
mod reference;
mod value;

pub use cache::CachingProvider;
pub use placement::{SecretPlacement, SecretsPolicy};
pub use provider::{
    EnvSecretsProvider, FileSecretsProvider, MapSecretsProvider, SchemeRouter, SecretsProvider,
};
pub use redact::{redact_headers, redact_text, REDACTED};
pub use reference::{SecretRef, SecretRefParseError};
pub use value::SecretValue;

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("secret not found: {0}")]
    NotFound(SecretRef),
    #[error("secret provider error for {secret_ref}: {message}")]
    Provider {
        secret_ref: SecretRef,
        message: String,
    },
    #[error("secret {secret_ref} is not allowed in the {placement}")]
    Disallowed {
        secret_ref: SecretRef,
        placement: SecretPlacement,
    },
    #[error(transparent)]
    InvalidRef(#[from] SecretRefParseError),
    #[error("no secrets provider for scheme '{0}'")]
    UnknownScheme(String),
    #[error("secret {0} is not valid UTF-8")]
    NotUtf8(SecretRef),
}

impl SecretError {
    pub fn provider(secret_ref: SecretRef, message: impl Into<String>) -> Self {
        Self::Provider {
            secret_ref,
            message: message.into(),
        }
    }
}
