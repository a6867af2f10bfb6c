#![forbid(unsafe_code)]

//! Runtime engine for reqflow documents.
//!
//! Parsing and the pipeline primitives live in `reqflow-core`; this crate
//! compiles documents into executable regions and runs them.

pub mod actions;
pub mod clients;
pub mod compile;
pub mod config;
pub mod context;
pub mod cookies;
pub mod document;
pub mod error;
pub mod events;
pub mod executor;
pub mod interceptors;
pub mod progress;
pub mod replace;
pub mod runner;
pub mod secrets;
pub mod stream_driver;

pub use crate::clients::{ClientProvider, ClientRegistry};
pub use crate::compile::{Compiler, InterceptorPlugin, Plugin};
pub use crate::config::ExecutorConfig;
pub use crate::context::{ExecutionKind, ProcessorContext, ResponseLogger, Services};
pub use crate::document::{ExecutionState, FileHooks, HttpFile, HttpRegion};
pub use crate::error::ExecutionError;
pub use crate::events::{
    CompositeEventSink, Event, EventSink, NoOpEventSink, StdoutEventSink, TracingEventSink,
};
pub use crate::executor::{BatchResult, ExecuteOptions, Executor, RegionReport, Selection};
pub use crate::interceptors::{BailOnFailureInterceptor, StepTraceInterceptor};
pub use crate::progress::Progress;
pub use crate::runner::execute_region;
