#![forbid(unsafe_code)]

pub mod condition;
pub mod dependency;
pub mod error;
pub mod parser;
pub mod pipeline;
pub mod stream;
pub mod template;
pub mod types;

pub use crate::dependency::{DependencyGraph, RegionId};
pub use crate::error::{HookError, ParseError, PipelineError};
pub use crate::parser::{parse_document_str, Assertion, ParsedDocument, RegionDefinition};
pub use crate::pipeline::{Flow, Hook, HookOptions, HookPipeline, Interceptor, TriggerContext};
pub use crate::stream::{
    merge_stream_messages, ClientError, ClientEvent, ClientEventSink, ConnectionState, MessageKind,
    StreamMessage, StreamingClient,
};
pub use crate::types::{
    DisableSpec, EnvKey, HttpRequest, HttpResponse, LoopSpec, Metadata, Protocol, Symbol, TestResult,
    TestResultStatus, Variables, ENVIRONMENT_NONE,
};
