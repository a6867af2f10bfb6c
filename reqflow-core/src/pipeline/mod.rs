//! Ordered, named hook steps with interceptors.
//!
//! A [`HookPipeline`] is used for every extensible stage of an execution.
//! Ordering constraints are resolved when hooks are added or pipelines are
//! merged, so `trigger` only walks a precomputed order.

mod interceptor;
mod sort;

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::BoxFuture;

use crate::error::{HookError, PipelineError};
use sort::{sort_hooks, SortNode};

pub use interceptor::{Interceptor, TriggerContext};

/// Result of a step or trigger that may have been cancelled.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow<T> {
    Continue(T),
    Cancelled,
}

impl<T> Flow<T> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Flow::Cancelled)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Flow<U> {
        match self {
            Flow::Continue(v) => Flow::Continue(f(v)),
            Flow::Cancelled => Flow::Cancelled,
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Flow::Continue(v) => Some(v),
            Flow::Cancelled => None,
        }
    }
}

#[async_trait]
pub trait Hook<C: Send, T: Send>: Send + Sync {
    async fn call(&self, ctx: &mut C) -> Result<Flow<T>, HookError>;
}

pub type HookFuture<'a, T> = BoxFuture<'a, Result<Flow<T>, HookError>>;

/// Adapter for closure hooks: `|ctx| Box::pin(async move { ... })`.
pub struct FnHook<F>(F);

#[async_trait]
impl<C, T, F> Hook<C, T> for FnHook<F>
where
    C: Send,
    T: Send,
    F: for<'a> Fn(&'a mut C) -> HookFuture<'a, T> + Send + Sync,
{
    async fn call(&self, ctx: &mut C) -> Result<Flow<T>, HookError> {
        (self.0)(ctx).await
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HookOptions {
    pub before: Vec<String>,
    pub after: Vec<String>,
}

impl HookOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn before(mut self, name: impl Into<String>) -> Self {
        self.before.push(name.into());
        self
    }

    pub fn after(mut self, name: impl Into<String>) -> Self {
        self.after.push(name.into());
        self
    }
}

struct HookEntry<C, T> {
    name: String,
    options: HookOptions,
    hook: Arc<dyn Hook<C, T>>,
}

impl<C, T> Clone for HookEntry<C, T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            options: self.options.clone(),
            hook: self.hook.clone(),
        }
    }
}

pub struct HookPipeline<C, T> {
    entries: Vec<HookEntry<C, T>>,
    order: Vec<usize>,
    interceptors: Vec<Arc<dyn Interceptor<C, T>>>,
}

impl<C, T> Clone for HookPipeline<C, T> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            order: self.order.clone(),
            interceptors: self.interceptors.clone(),
        }
    }
}

impl<C, T> Default for HookPipeline<C, T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            order: Vec::new(),
            interceptors: Vec::new(),
        }
    }
}

impl<C, T> std::fmt::Debug for HookPipeline<C, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookPipeline")
            .field("hooks", &self.hook_names())
            .field("interceptors", &self.interceptors.len())
            .finish()
    }
}

impl<C, T> HookPipeline<C, T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    /// Hook names in execution order.
    pub fn hook_names(&self) -> Vec<&str> {
        self.order
            .iter()
            .map(|&i| self.entries[i].name.as_str())
            .collect()
    }

    pub fn interceptor_count(&self) -> usize {
        self.interceptors.len()
    }

    fn compute_order(&self) -> Result<Vec<usize>, PipelineError> {
        let nodes: Vec<SortNode<'_>> = self
            .entries
            .iter()
            .map(|e| SortNode {
                name: &e.name,
                before: &e.options.before,
                after: &e.options.after,
            })
            .collect();
        sort_hooks(&nodes)
    }

    fn push_entry(&mut self, entry: HookEntry<C, T>) -> Result<(), PipelineError> {
        if self.contains(&entry.name) {
            return Err(PipelineError::DuplicateHook(entry.name));
        }
        if entry.options.before.contains(&entry.name) || entry.options.after.contains(&entry.name) {
            return Err(PipelineError::SelfReference(entry.name));
        }
        self.entries.push(entry);
        match self.compute_order() {
            Ok(order) => {
                self.order = order;
                Ok(())
            }
            Err(e) => {
                if let Some(rejected) = self.entries.pop() {
                    tracing::debug!(hook = %rejected.name, error = %e, "hook rejected");
                }
                Err(e)
            }
        }
    }
}

impl<C, T> HookPipeline<C, T>
where
    C: Send + 'static,
    T: Send + 'static,
{
    pub fn add_hook(
        &mut self,
        name: impl Into<String>,
        hook: impl Hook<C, T> + 'static,
        options: HookOptions,
    ) -> Result<(), PipelineError> {
        self.add_arc_hook(name, Arc::new(hook), options)
    }

    pub fn add_arc_hook(
        &mut self,
        name: impl Into<String>,
        hook: Arc<dyn Hook<C, T>>,
        options: HookOptions,
    ) -> Result<(), PipelineError> {
        self.push_entry(HookEntry {
            name: name.into(),
            options,
            hook,
        })
    }

    pub fn add_fn<F>(
        &mut self,
        name: impl Into<String>,
        options: HookOptions,
        f: F,
    ) -> Result<(), PipelineError>
    where
        F: for<'a> Fn(&'a mut C) -> HookFuture<'a, T> + Send + Sync + 'static,
    {
        self.add_hook(name, FnHook(f), options)
    }

    pub fn add_interceptor(&mut self, interceptor: impl Interceptor<C, T> + 'static) {
        self.interceptors.push(Arc::new(interceptor));
    }

    pub fn add_arc_interceptor(&mut self, interceptor: Arc<dyn Interceptor<C, T>>) {
        self.interceptors.push(interceptor);
    }

    /// Union of both pipelines, re-sorted. Neither input is modified; hooks of
    /// `other` whose name already exists in `self` are skipped.
    pub fn merge(&self, other: &HookPipeline<C, T>) -> Result<HookPipeline<C, T>, PipelineError> {
        let mut merged = self.clone();
        for entry in &other.entries {
            if merged.contains(&entry.name) {
                continue;
            }
            merged.entries.push(entry.clone());
        }
        merged.order = merged.compute_order()?;
        for interceptor in &other.interceptors {
            if !merged.interceptors.iter().any(|i| Arc::ptr_eq(i, interceptor)) {
                merged.interceptors.push(interceptor.clone());
            }
        }
        Ok(merged)
    }

    /// Run every step in order.
    ///
    /// Returns `Flow::Cancelled` as soon as a step or interceptor cancels,
    /// otherwise the results of every step that ran.
    pub async fn trigger(&self, ctx: &mut C) -> Result<Flow<Vec<T>>, HookError> {
        let mut tc = TriggerContext::new(ctx, self.order.len());

        for interceptor in &self.interceptors {
            if interceptor.before_loop(&mut tc).await?.is_cancelled() {
                return Ok(Flow::Cancelled);
            }
        }

        while tc.index() < tc.length() {
            for interceptor in &self.interceptors {
                if interceptor.before_trigger(&mut tc).await?.is_cancelled() {
                    return Ok(Flow::Cancelled);
                }
            }
            if tc.is_bailed() {
                break;
            }

            let entry = &self.entries[self.order[tc.index()]];
            tc.set_hook_name(&entry.name);
            match entry.hook.call(&mut *tc.args).await {
                Ok(Flow::Continue(value)) => tc.push_result(value),
                Ok(Flow::Cancelled) => return Ok(Flow::Cancelled),
                Err(error) => {
                    let mut recovered = None;
                    for interceptor in &self.interceptors {
                        let value = interceptor.on_error(&error, &mut tc).await;
                        if recovered.is_none() {
                            recovered = value;
                        }
                    }
                    match recovered {
                        Some(value) => tc.push_result(value),
                        None => return Err(error),
                    }
                }
            }

            for interceptor in &self.interceptors {
                if interceptor.after_trigger(&mut tc).await?.is_cancelled() {
                    return Ok(Flow::Cancelled);
                }
            }
            tc.advance();
        }

        for interceptor in &self.interceptors {
            if interceptor.after_loop(&mut tc).await?.is_cancelled() {
                return Ok(Flow::Cancelled);
            }
        }

        Ok(Flow::Continue(tc.into_results()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Log = Vec<String>;

    struct Push(&'static str, bool);

    #[async_trait]
    impl Hook<Log, bool> for Push {
        async fn call(&self, ctx: &mut Log) -> Result<Flow<bool>, HookError> {
            ctx.push(self.0.to_string());
            Ok(Flow::Continue(self.1))
        }
    }

    #[tokio::test]
    async fn runs_hooks_in_constraint_order() {
        let mut p: HookPipeline<Log, bool> = HookPipeline::new();
        p.add_hook("send", Push("send", true), HookOptions::new().after("request"))
            .unwrap();
        p.add_hook("request", Push("request", true), HookOptions::new())
            .unwrap();
        p.add_hook("vars", Push("vars", true), HookOptions::new().before("request"))
            .unwrap();

        let mut log = Log::new();
        let out = p.trigger(&mut log).await.unwrap();
        assert_eq!(out, Flow::Continue(vec![true, true, true]));
        assert_eq!(log, vec!["vars", "request", "send"]);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut p: HookPipeline<Log, bool> = HookPipeline::new();
        p.add_hook("a", Push("a", true), HookOptions::new()).unwrap();
        let err = p.add_hook("a", Push("a", true), HookOptions::new()).unwrap_err();
        assert_eq!(err, PipelineError::DuplicateHook("a".into()));
    }

    #[test]
    fn cycle_is_rejected_and_pipeline_left_intact() {
        let mut p: HookPipeline<Log, bool> = HookPipeline::new();
        p.add_hook("a", Push("a", true), HookOptions::new().before("b"))
            .unwrap();
        let err = p
            .add_hook("b", Push("b", true), HookOptions::new().before("a"))
            .unwrap_err();
        assert!(matches!(err, PipelineError::Cycle(_)));
        assert_eq!(p.hook_names(), vec!["a"]);
    }

    #[tokio::test]
    async fn closure_hooks_are_supported() {
        let mut p: HookPipeline<Log, bool> = HookPipeline::new();
        p.add_fn("first", HookOptions::new(), |ctx| {
            Box::pin(async move {
                ctx.push("closure".to_string());
                Ok(Flow::Continue(true))
            })
        })
        .unwrap();
        let mut log = Log::new();
        p.trigger(&mut log).await.unwrap();
        assert_eq!(log, vec!["closure"]);
    }

    #[test]
    fn merge_does_not_touch_inputs() {
        let mut global: HookPipeline<Log, bool> = HookPipeline::new();
        global.add_hook("global", Push("global", true), HookOptions::new()).unwrap();
        let mut local: HookPipeline<Log, bool> = HookPipeline::new();
        local.add_hook("local", Push("local", true), HookOptions::new().before("global"))
            .unwrap();

        let merged = global.merge(&local).unwrap();
        assert_eq!(merged.hook_names(), vec!["local", "global"]);
        assert_eq!(global.hook_names(), vec!["global"]);
        assert_eq!(local.hook_names(), vec!["local"]);
    }

    struct Cancel;

    #[async_trait]
    impl Hook<Log, bool> for Cancel {
        async fn call(&self, ctx: &mut Log) -> Result<Flow<bool>, HookError> {
            ctx.push("cancel".to_string());
            Ok(Flow::Cancelled)
        }
    }

    struct Fail;

    #[async_trait]
    impl Hook<Log, bool> for Fail {
        async fn call(&self, _ctx: &mut Log) -> Result<Flow<bool>, HookError> {
            Err(HookError::message("boom"))
        }
    }

    /// Bails before any step and records each loop callback.
    struct BailEarly;

    #[async_trait]
    impl Interceptor<Log, bool> for BailEarly {
        async fn before_loop(
            &self,
            tc: &mut TriggerContext<'_, Log, bool>,
        ) -> Result<Flow<()>, HookError> {
            tc.args.push("before_loop".to_string());
            tc.bail();
            Ok(Flow::Continue(()))
        }

        async fn after_loop(
            &self,
            tc: &mut TriggerContext<'_, Log, bool>,
        ) -> Result<Flow<()>, HookError> {
            tc.args.push("after_loop".to_string());
            Ok(Flow::Continue(()))
        }
    }

    struct Recover;

    #[async_trait]
    impl Interceptor<Log, bool> for Recover {
        async fn on_error(
            &self,
            error: &HookError,
            tc: &mut TriggerContext<'_, Log, bool>,
        ) -> Option<bool> {
            tc.args.push(format!("recovered {error}"));
            Some(false)
        }
    }

    #[tokio::test]
    async fn cancelled_step_stops_the_trigger() {
        let mut p: HookPipeline<Log, bool> = HookPipeline::new();
        p.add_hook("a", Push("a", true), HookOptions::new()).unwrap();
        p.add_hook("cancel", Cancel, HookOptions::new()).unwrap();
        p.add_hook("b", Push("b", true), HookOptions::new()).unwrap();

        let mut log = Log::new();
        assert_eq!(p.trigger(&mut log).await.unwrap(), Flow::Cancelled);
        assert_eq!(log, vec!["a", "cancel"]);
    }

    #[tokio::test]
    async fn bail_in_before_loop_runs_no_steps() {
        let mut p: HookPipeline<Log, bool> = HookPipeline::new();
        p.add_hook("a", Push("a", true), HookOptions::new()).unwrap();
        p.add_interceptor(BailEarly);

        let mut log = Log::new();
        assert_eq!(p.trigger(&mut log).await.unwrap(), Flow::Continue(vec![]));
        assert_eq!(log, vec!["before_loop", "after_loop"]);
    }

    #[tokio::test]
    async fn errors_propagate_unless_recovered() {
        let mut p: HookPipeline<Log, bool> = HookPipeline::new();
        p.add_hook("fail", Fail, HookOptions::new()).unwrap();
        p.add_hook("after", Push("after", true), HookOptions::new()).unwrap();

        let mut log = Log::new();
        assert!(p.trigger(&mut log).await.is_err());
        assert!(log.is_empty());

        p.add_interceptor(Recover);
        let out = p.trigger(&mut log).await.unwrap();
        assert_eq!(out, Flow::Continue(vec![false, true]));
        assert_eq!(log, vec!["recovered boom", "after"]);
    }

    #[tokio::test]
    async fn constrained_order_ignores_registration_order() {
        let build = |names: &[&'static str]| {
            let mut p: HookPipeline<Log, bool> = HookPipeline::new();
            for &name in names {
                let options = match name {
                    "request" => HookOptions::new().after("vars"),
                    "send" => HookOptions::new().after("request"),
                    _ => HookOptions::new(),
                };
                p.add_hook(name, Push(name, true), options).unwrap();
            }
            p
        };
        let registrations = [
            ["vars", "request", "send"],
            ["send", "request", "vars"],
            ["request", "send", "vars"],
        ];
        for names in registrations {
            let mut log = Log::new();
            build(&names).trigger(&mut log).await.unwrap();
            assert_eq!(log, vec!["vars", "request", "send"], "registered as {names:?}");
        }
    }
}
