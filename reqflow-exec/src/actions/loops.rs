use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value as JsonValue};

use reqflow_core::condition::evaluate_condition;
use reqflow_core::{Flow, HookError, Interceptor, LoopSpec, TriggerContext};

use super::replaced;
use crate::context::ProcessorContext;
use crate::document::{ExecutionState, HttpRegion};
use crate::replace::lookup_path;
use crate::secrets::SecretPlacement;

pub const INDEX_VARIABLE: &str = "$index";

type Binding = Vec<(String, JsonValue)>;

#[derive(Default)]
struct LoopState {
    original: Option<Arc<HttpRegion>>,
    current: Option<Arc<HttpRegion>>,
    index: usize,
    items: Vec<JsonValue>,
}

/// Repeats a region's pipeline once per loop value.
///
/// Every pass runs against a fresh clone of the region; when a pass ends the
/// clone's response and test results are folded into the original region.
pub struct LoopInterceptor {
    spec: LoopSpec,
    state: Mutex<LoopState>,
}

impl LoopInterceptor {
    pub fn new(spec: LoopSpec) -> Self {
        Self {
            spec,
            state: Mutex::new(LoopState::default()),
        }
    }

    /// Variables for pass `index`, or `None` once the loop is exhausted.
    async fn binding(&self, ctx: &mut ProcessorContext, index: usize) -> Result<Flow<Option<Binding>>, HookError> {
        let index_binding = (INDEX_VARIABLE.to_string(), json!(index));
        let binding = match &self.spec {
            LoopSpec::Count(count) => (index < *count).then(|| vec![index_binding]),
            LoopSpec::ForOf { item, variable } => {
                if index == 0 {
                    let items = match lookup_path(&ctx.variables, variable) {
                        Some(JsonValue::Array(items)) => items.clone(),
                        other => {
                            tracing::debug!(region = %ctx.region.name(), variable = %variable, found = other.is_some(), "loop source is not an array");
                            Vec::new()
                        }
                    };
                    self.state.lock().items = items;
                }
                let value = self.state.lock().items.get(index).cloned();
                value.map(|v| vec![index_binding, (item.clone(), v)])
            }
            LoopSpec::While(expression) => {
                ctx.variables.insert(INDEX_VARIABLE.to_string(), json!(index));
                let Some(text) = replaced(ctx, expression, SecretPlacement::Variable).await? else {
                    return Ok(Flow::Cancelled);
                };
                evaluate_condition(&text)?.then(|| vec![index_binding])
            }
        };
        Ok(Flow::Continue(binding))
    }

    fn start_iteration(&self, ctx: &mut ProcessorContext, index: usize, binding: Binding) {
        let mut state = self.state.lock();
        let Some(original) = state.original.clone() else {
            return;
        };
        let clone = Arc::new(original.clone_for_iteration(index));
        tracing::debug!(region = %original.name(), iteration = index, "loop iteration");
        ctx.variables.extend(binding);
        ctx.region = clone.clone();
        state.current = Some(clone);
        state.index = index;
    }

    fn absorb_current(&self) {
        let (original, current) = {
            let mut state = self.state.lock();
            (state.original.clone(), state.current.take())
        };
        if let (Some(original), Some(current)) = (original, current) {
            original.absorb_iteration(&current);
            if current.status() == ExecutionState::Skipped {
                original.set_status(ExecutionState::Skipped);
            }
        }
    }
}

#[async_trait]
impl Interceptor<ProcessorContext, bool> for LoopInterceptor {
    async fn before_loop(
        &self,
        tc: &mut TriggerContext<'_, ProcessorContext, bool>,
    ) -> Result<Flow<()>, HookError> {
        if tc.is_bailed() {
            return Ok(Flow::Continue(()));
        }
        let original = tc.args.region.clone();
        *self.state.lock() = LoopState {
            original: Some(original.clone()),
            ..LoopState::default()
        };

        match self.binding(tc.args, 0).await? {
            Flow::Cancelled => Ok(Flow::Cancelled),
            Flow::Continue(None) => {
                tracing::debug!(region = %original.name(), "loop has no iterations");
                tc.bail();
                Ok(Flow::Continue(()))
            }
            Flow::Continue(Some(binding)) => {
                original.set_status(ExecutionState::Looping);
                self.start_iteration(tc.args, 0, binding);
                Ok(Flow::Continue(()))
            }
        }
    }

    async fn after_trigger(
        &self,
        tc: &mut TriggerContext<'_, ProcessorContext, bool>,
    ) -> Result<Flow<()>, HookError> {
        if !tc.is_last_step() {
            return Ok(Flow::Continue(()));
        }
        self.absorb_current();
        let next = self.state.lock().index + 1;
        match self.binding(tc.args, next).await? {
            Flow::Cancelled => Ok(Flow::Cancelled),
            Flow::Continue(None) => Ok(Flow::Continue(())),
            Flow::Continue(Some(binding)) => {
                self.start_iteration(tc.args, next, binding);
                tc.restart();
                Ok(Flow::Continue(()))
            }
        }
    }

    async fn after_loop(
        &self,
        tc: &mut TriggerContext<'_, ProcessorContext, bool>,
    ) -> Result<Flow<()>, HookError> {
        self.absorb_current();
        let original = std::mem::take(&mut *self.state.lock()).original;
        if let Some(original) = original {
            tc.args.region = original;
        }
        Ok(Flow::Continue(()))
    }
}
