use std::fmt;

pub const ENVIRONMENT_NONE: &str = "ENVIRONMENT_NONE";

/// Canonical cache key for a set of active environments.
///
/// Names are sorted and de-duplicated so `[b, a]` and `[a, b, a]` share one
/// key. An empty list maps to [`ENVIRONMENT_NONE`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EnvKey(String);

impl EnvKey {
    pub fn none() -> Self {
        Self(ENVIRONMENT_NONE.to_string())
    }

    pub fn from_environments<S: AsRef<str>>(environments: &[S]) -> Self {
        let mut names: Vec<&str> = environments
            .iter()
            .map(|s| s.as_ref().trim())
            .filter(|s| !s.is_empty())
            .collect();
        if names.is_empty() {
            return Self::none();
        }
        names.sort_unstable();
        names.dedup();
        Self(names.join(","))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for EnvKey {
    fn default() -> Self {
        Self::none()
    }
}

impl fmt::Display for EnvKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
