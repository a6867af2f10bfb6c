use async_trait::async_trait;

use crate::error::HookError;
use crate::pipeline::Flow;

/// State of one `trigger()` call, visible to interceptors.
///
/// `index` is the step about to run (in `before_trigger`) or the step that
/// just ran (in `after_trigger`). Moving it to `length` ends the loop without
/// an error.
pub struct TriggerContext<'a, C, T> {
    pub args: &'a mut C,
    index: usize,
    length: usize,
    results: Vec<T>,
    hook_name: Option<String>,
    rewind: bool,
}

impl<'a, C, T> TriggerContext<'a, C, T> {
    pub(crate) fn new(args: &'a mut C, length: usize) -> Self {
        Self {
            args,
            index: 0,
            length,
            results: Vec::new(),
            hook_name: None,
            rewind: false,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn set_index(&mut self, index: usize) {
        self.index = index.min(self.length);
    }

    /// Stop after the current callback; remaining steps are not run.
    pub fn bail(&mut self) {
        self.index = self.length;
    }

    pub fn is_bailed(&self) -> bool {
        self.index >= self.length
    }

    /// Run the whole step list again once the current step completes.
    pub fn restart(&mut self) {
        self.rewind = true;
    }

    pub fn is_last_step(&self) -> bool {
        self.index + 1 == self.length
    }

    pub fn hook_name(&self) -> Option<&str> {
        self.hook_name.as_deref()
    }

    pub fn results(&self) -> &[T] {
        &self.results
    }

    pub(crate) fn set_hook_name(&mut self, name: &str) {
        self.hook_name = Some(name.to_string());
    }

    pub(crate) fn push_result(&mut self, value: T) {
        self.results.push(value);
    }

    pub(crate) fn advance(&mut self) {
        if std::mem::take(&mut self.rewind) {
            self.index = 0;
        } else {
            self.index = self.index.saturating_add(1);
        }
    }

    pub(crate) fn into_results(self) -> Vec<T> {
        self.results
    }
}

/// Cross-cutting callbacks wrapping a whole pipeline trigger.
///
/// Every callback is optional. Returning `Flow::Cancelled` from any of them
/// short-circuits the trigger.
#[async_trait]
pub trait Interceptor<C: Send, T: Send>: Send + Sync {
    async fn before_loop(&self, _tc: &mut TriggerContext<'_, C, T>) -> Result<Flow<()>, HookError> {
        Ok(Flow::Continue(()))
    }

    async fn before_trigger(
        &self,
        _tc: &mut TriggerContext<'_, C, T>,
    ) -> Result<Flow<()>, HookError> {
        Ok(Flow::Continue(()))
    }

    async fn after_trigger(
        &self,
        _tc: &mut TriggerContext<'_, C, T>,
    ) -> Result<Flow<()>, HookError> {
        Ok(Flow::Continue(()))
    }

    async fn after_loop(&self, _tc: &mut TriggerContext<'_, C, T>) -> Result<Flow<()>, HookError> {
        Ok(Flow::Continue(()))
    }

    /// Called for every step error. Returning a value records it as the
    /// step's result and lets the loop continue instead of propagating.
    async fn on_error(&self, _error: &HookError, _tc: &mut TriggerContext<'_, C, T>) -> Option<T> {
        None
    }
}
