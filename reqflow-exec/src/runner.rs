//! Region execution state machine.

use futures_util::future::BoxFuture;

use reqflow_core::{Flow, HookError, TestResult, Variables};

use crate::context::{ExecutionKind, ProcessorContext};
use crate::document::ExecutionState;
use crate::events::Event;

/// Runs `ctx.region` through its pipeline and records the outcome on it.
///
/// `Continue(true)` means every step succeeded, `Continue(false)` that the
/// region was skipped or a step reported a failure. Errors come back wrapped
/// in [`HookError::Reported`] once they have been recorded and logged.
pub fn execute_region(ctx: &mut ProcessorContext) -> BoxFuture<'_, Result<Flow<bool>, HookError>> {
    Box::pin(async move {
        let region = ctx.region.clone();
        let file = ctx.file.clone();
        region.reset();
        ctx.emit(Event::RegionStarted {
            run_id: ctx.run_id,
            region: region.name().to_string(),
        })
        .await;
        if let Some(caller) = &ctx.caller {
            file.register_caller(region.id, caller.id);
        }

        let initial = ctx.variables.clone();
        let outcome = region.pipeline().trigger(ctx).await;
        ctx.region = region.clone();

        let result = match outcome {
            Ok(Flow::Cancelled) => {
                region.set_status(ExecutionState::Cancelled);
                Ok(Flow::Cancelled)
            }
            Ok(Flow::Continue(_)) if region.status() == ExecutionState::Skipped => {
                ctx.emit(Event::RegionSkipped {
                    run_id: ctx.run_id,
                    region: region.name().to_string(),
                })
                .await;
                Ok(Flow::Continue(false))
            }
            Ok(Flow::Continue(results)) => {
                let succeeded = results.iter().all(|ok| *ok) && !region.has_failures();
                if succeeded {
                    region.set_status(ExecutionState::Completed);
                    on_success(ctx, &initial).await;
                } else {
                    region.set_status(ExecutionState::Failed);
                }
                Ok(Flow::Continue(succeeded))
            }
            Err(error) => {
                region.set_status(ExecutionState::Failed);
                region.add_test_result(TestResult::error(
                    format!("{} failed", region.name()),
                    error.root(),
                ));
                // a nested region already logged it
                if !error.is_reported() {
                    ctx.log_error(&error);
                }
                Err(HookError::reported(region.name(), error))
            }
        };

        for test in region.test_results() {
            ctx.emit(Event::TestRecorded {
                run_id: ctx.run_id,
                region: region.name().to_string(),
                status: test.status,
                message: test.message,
            })
            .await;
        }
        ctx.emit(Event::RegionFinished {
            run_id: ctx.run_id,
            region: region.name().to_string(),
            succeeded: matches!(result, Ok(Flow::Continue(true))),
            cancelled: matches!(result, Ok(Flow::Cancelled)),
        })
        .await;
        result
    })
}

async fn on_success(ctx: &ProcessorContext, initial: &Variables) {
    let region = &ctx.region;
    let file = &ctx.file;
    if ctx.kind != ExecutionKind::Prerequisite {
        for dependent in file.invalidate_dependents(region.id, &ctx.env_key) {
            tracing::debug!(region = %region.name(), dependent = %dependent.name(), env = %ctx.env_key, "cache invalidated");
            ctx.emit(Event::CacheInvalidated {
                run_id: ctx.run_id,
                region: dependent.name().to_string(),
                env: ctx.env_key.to_string(),
            })
            .await;
        }
        if region.is_global() {
            file.store_globals(&ctx.env_key, changed_variables(initial, &ctx.variables));
        }
    }
    region.store_variables(&ctx.env_key, changed_variables(initial, &ctx.variables));
}

/// Adds `produced` to `variables` without replacing anything already there.
pub(crate) fn merge_produced(variables: &mut Variables, produced: Variables) {
    for (key, value) in produced {
        variables.entry(key).or_insert(value);
    }
}

/// Entries of `after` that are new or differ from `before`.
pub(crate) fn changed_variables(before: &Variables, after: &Variables) -> Variables {
    after
        .iter()
        .filter(|(k, v)| before.get(*k) != Some(*v))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}
