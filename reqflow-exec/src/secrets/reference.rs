use std::fmt;

/// Identifier of a secret: `scheme://id`. A bare `NAME` means `env://NAME`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SecretRef {
    pub scheme: String,
    pub id: String,
}

pub const DEFAULT_SCHEME: &str = "env";

impl SecretRef {
    pub fn new(scheme: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            id: id.into(),
        }
    }

    pub fn parse(input: &str) -> Result<Self, SecretRefParseError> {
        let s = input.trim();
        if s.is_empty() {
            return Err(SecretRefParseError::EmptyId);
        }
        let (scheme, id) = match s.split_once("://") {
            Some((scheme, id)) => (scheme, id),
            None => (DEFAULT_SCHEME, s),
        };
        if !is_valid_scheme(scheme) {
            return Err(SecretRefParseError::InvalidScheme(scheme.to_string()));
        }
        if id.is_empty() {
            return Err(SecretRefParseError::EmptyId);
        }
        if id.contains(char::is_whitespace) {
            return Err(SecretRefParseError::Whitespace(id.to_string()));
        }
        Ok(Self::new(scheme, id))
    }
}

impl fmt::Display for SecretRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.id)
    }
}

fn is_valid_scheme(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.')
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum SecretRefParseError {
    #[error("invalid secret reference scheme: {0}")]
    InvalidScheme(String),
    #[error("secret reference id must not be empty")]
    EmptyId,
    #[error("secret reference id must not contain whitespace: {0}")]
    Whitespace(String),
}
