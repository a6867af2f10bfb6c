use reqflow_core::{HookError, ParseError, PipelineError};
use reqflow_store::StoreError;

/// Failures surfaced by the [`Executor`](crate::Executor) facade.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("invalid hook configuration: {0}")]
    Pipeline(#[from] PipelineError),
    #[error("region not found: {0}")]
    RegionNotFound(String),
    #[error(transparent)]
    Hook(#[from] HookError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("failed to read {path}: {message}")]
    Io { path: String, message: String },
}
