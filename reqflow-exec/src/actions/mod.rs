//! Hooks and interceptors that make up a region's pipeline.
//!
//! Document-wide steps live in [`FileHooks::execute`](crate::document::FileHooks);
//! the compiler adds the per-region ones. Step order is fixed through
//! `before`/`after` constraints on these names:
//!
//! `global` → `ref` → `disabled` → `variable:*` → `request` → `send` → `assert:*`

mod assert;
mod disabled;
mod global;
mod loops;
mod reference;
mod request;
mod send;
mod variable;

use reqflow_core::HookError;

use crate::context::ProcessorContext;
use crate::replace::replace_variables;
use crate::secrets::SecretPlacement;

pub use assert::{resolve_subject, AssertAction};
pub use disabled::{DisabledAction, DisabledInterceptor};
pub use global::GlobalAction;
pub use loops::LoopInterceptor;
pub use reference::RefAction;
pub use request::RequestAction;
pub use send::SendAction;
pub use variable::VariableAction;

pub const GLOBAL: &str = "global";
pub const REF: &str = "ref";
pub const DISABLED: &str = "disabled";
pub const REQUEST: &str = "request";
pub const SEND: &str = "send";

pub fn variable_step(name: &str) -> String {
    format!("variable:{name}")
}

pub fn assert_step(line: usize) -> String {
    format!("assert:{line}")
}

/// `replace_variables` with cancellation flattened to `None`.
pub(crate) async fn replaced(
    ctx: &mut ProcessorContext,
    text: &str,
    placement: SecretPlacement,
) -> Result<Option<String>, HookError> {
    Ok(replace_variables(ctx, text, placement).await?.into_option())
}
