//! Turns a parsed document into an executable [`HttpFile`].

use std::path::PathBuf;
use std::sync::Arc;

use reqflow_core::{
    DisableSpec, HookOptions, HookPipeline, Interceptor, ParsedDocument, PipelineError, RegionDefinition,
    RegionId,
};

use crate::actions::{
    self, AssertAction, DisabledAction, DisabledInterceptor, GlobalAction, LoopInterceptor,
    RefAction, RequestAction, SendAction, VariableAction,
};
use crate::config::ExecutorConfig;
use crate::context::ProcessorContext;
use crate::cookies;
use crate::document::{FileHooks, HttpFile, HttpRegion};
use crate::replace;

/// Extends the document-level hooks of every compiled file.
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    fn register(&self, hooks: &mut FileHooks) -> Result<(), PipelineError>;
}

/// Adds one interceptor to the document-level `execute` pipeline, so it
/// wraps every non-global region.
pub struct InterceptorPlugin {
    name: String,
    interceptor: Arc<dyn Interceptor<ProcessorContext, bool>>,
}

impl InterceptorPlugin {
    pub fn new(name: impl Into<String>, interceptor: Arc<dyn Interceptor<ProcessorContext, bool>>) -> Self {
        Self {
            name: name.into(),
            interceptor,
        }
    }
}

impl Plugin for InterceptorPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn register(&self, hooks: &mut FileHooks) -> Result<(), PipelineError> {
        hooks.execute.add_arc_interceptor(self.interceptor.clone());
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct Compiler {
    config: ExecutorConfig,
    plugins: Vec<Arc<dyn Plugin>>,
}

impl Compiler {
    pub fn new(config: ExecutorConfig) -> Self {
        Self {
            config,
            plugins: Vec::new(),
        }
    }

    pub fn add_plugin(&mut self, plugin: Arc<dyn Plugin>) {
        self.plugins.push(plugin);
    }

    pub fn with_plugin(mut self, plugin: Arc<dyn Plugin>) -> Self {
        self.add_plugin(plugin);
        self
    }

    /// Plugins first, then the built-in steps.
    pub fn file_hooks(&self) -> Result<FileHooks, PipelineError> {
        let mut hooks = FileHooks::default();
        for plugin in &self.plugins {
            tracing::debug!(plugin = plugin.name(), "registering plugin");
            plugin.register(&mut hooks)?;
        }
        hooks.execute.add_hook(actions::GLOBAL, GlobalAction, HookOptions::new())?;
        replace::register_defaults(&mut hooks.replace_variable)?;
        if self.config.cookie_jar {
            cookies::register(&mut hooks)?;
        }
        Ok(hooks)
    }

    /// Builds every region's effective pipeline, so ordering errors surface
    /// here rather than on first execution.
    pub fn compile(&self, document: ParsedDocument, path: Option<PathBuf>) -> Result<HttpFile, PipelineError> {
        let hooks = self.file_hooks()?;
        let mut regions = Vec::with_capacity(document.regions.len());
        for (index, definition) in document.regions.into_iter().enumerate() {
            let local = region_pipeline(&definition)?;
            let pipeline = if definition.is_global() {
                local
            } else {
                hooks.execute.merge(&local)?
            };
            let RegionDefinition {
                symbol,
                metadata,
                request,
                ..
            } = definition;
            regions.push(HttpRegion::new(RegionId(index), symbol, metadata, request, pipeline));
        }
        Ok(HttpFile::new(path, hooks, regions))
    }
}

/// Steps and interceptors that belong to one region.
pub fn region_pipeline(definition: &RegionDefinition) -> Result<HookPipeline<ProcessorContext, bool>, PipelineError> {
    let mut pipeline = HookPipeline::new();
    let metadata = &definition.metadata;

    pipeline.add_hook(actions::REF, RefAction, HookOptions::new().after(actions::GLOBAL))?;
    let mut previous = actions::REF.to_string();

    match metadata.disabled() {
        Some(DisableSpec::When(_)) => {
            pipeline.add_hook(actions::DISABLED, DisabledAction, HookOptions::new().after(&previous))?;
            previous = actions::DISABLED.to_string();
            pipeline.add_interceptor(DisabledInterceptor);
        }
        Some(DisableSpec::Always) => pipeline.add_interceptor(DisabledInterceptor),
        None => {}
    }

    for (name, expression) in &definition.variables {
        let mut step = actions::variable_step(name);
        if pipeline.contains(&step) {
            step = format!("{step}#{}", pipeline.len());
        }
        let action = VariableAction {
            name: name.clone(),
            expression: expression.clone(),
        };
        pipeline.add_hook(step.clone(), action, HookOptions::new().after(&previous))?;
        previous = step;
    }

    if definition.request.is_some() {
        pipeline.add_hook(actions::REQUEST, RequestAction, HookOptions::new().after(&previous))?;
        pipeline.add_hook(actions::SEND, SendAction, HookOptions::new().after(actions::REQUEST))?;
        previous = actions::SEND.to_string();
    }

    for assertion in &definition.assertions {
        let step = actions::assert_step(assertion.line);
        let action = AssertAction {
            line: assertion.line,
            text: assertion.text.clone(),
        };
        pipeline.add_hook(step.clone(), action, HookOptions::new().after(&previous))?;
        previous = step;
    }

    if let Some(spec) = metadata.loop_spec() {
        pipeline.add_interceptor(LoopInterceptor::new(spec));
    }
    Ok(pipeline)
}
