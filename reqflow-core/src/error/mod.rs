use thiserror::Error;

use crate::condition::ConditionError;
use crate::stream::ClientError;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("line {line}: invalid loop specification '{spec}'")]
    InvalidLoop { line: usize, spec: String },
    #[error("line {line}: invalid request line '{text}'")]
    InvalidRequestLine { line: usize, text: String },
    #[error("line {line}: invalid header '{text}'")]
    InvalidHeader { line: usize, text: String },
    #[error("line {line}: region name '{name}' is already used at line {first_line}")]
    DuplicateName {
        line: usize,
        name: String,
        first_line: usize,
    },
}

/// Configuration errors raised while registering or merging hooks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("hook '{0}' is already registered")]
    DuplicateHook(String),
    #[error("hook '{0}' cannot be ordered relative to itself")]
    SelfReference(String),
    #[error("ordering constraints form a cycle between hooks: {}", .0.join(", "))]
    Cycle(Vec<String>),
}

#[derive(Debug, Error)]
pub enum HookError {
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Condition(#[from] ConditionError),
    #[error("referenced region '{0}' does not exist")]
    UnknownReference(String),
    #[error("no client is registered for protocol {0}")]
    UnsupportedProtocol(String),
    #[error("secret resolution failed: {0}")]
    Secret(String),
    #[error("region '{region}' failed: {source}")]
    Reported {
        region: String,
        #[source]
        source: Box<HookError>,
    },
}

impl HookError {
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    /// Marks an error as already recorded on `region`.
    pub fn reported(region: impl Into<String>, source: HookError) -> Self {
        if source.is_reported() {
            return source;
        }
        Self::Reported {
            region: region.into(),
            source: Box::new(source),
        }
    }

    pub fn is_reported(&self) -> bool {
        matches!(self, Self::Reported { .. })
    }

    /// The innermost error, skipping `Reported` wrappers.
    pub fn root(&self) -> &HookError {
        match self {
            Self::Reported { source, .. } => source.root(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reported_is_not_wrapped_twice() {
        let inner = HookError::message("boom");
        let once = HookError::reported("a", inner);
        let twice = HookError::reported("b", once);
        match &twice {
            HookError::Reported { region, .. } => assert_eq!(region, "a"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(twice.root().to_string(), "boom");
    }
}
