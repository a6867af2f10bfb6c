use std::fmt;

use super::{SecretError, SecretRef};

/// Part of a request a placeholder is being resolved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretPlacement {
    Url,
    Header,
    Body,
    Variable,
}

impl fmt::Display for SecretPlacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SecretPlacement::Url => "url",
            SecretPlacement::Header => "header",
            SecretPlacement::Body => "body",
            SecretPlacement::Variable => "variable",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SecretsPolicy {
    pub allow_secrets_in_url: bool,
}

impl SecretsPolicy {
    pub fn ensure_allowed(
        &self,
        secret_ref: &SecretRef,
        placement: SecretPlacement,
    ) -> Result<(), SecretError> {
        match placement {
            SecretPlacement::Url if !self.allow_secrets_in_url => Err(SecretError::Disallowed {
                secret_ref: secret_ref.clone(),
                placement,
            }),
            _ => Ok(()),
        }
    }
}
