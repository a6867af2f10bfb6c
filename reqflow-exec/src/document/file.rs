use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;

use reqflow_core::{DependencyGraph, EnvKey, HookPipeline, RegionId, Variables};

use crate::context::ProcessorContext;
use crate::document::HttpRegion;
use crate::replace::ReplaceArgs;

/// Document-level extension points.
#[derive(Default, Clone)]
pub struct FileHooks {
    /// Steps merged into every non-global region's pipeline.
    pub execute: HookPipeline<ProcessorContext, bool>,
    /// Runs after the request is built, before it is sent.
    pub on_request: HookPipeline<ProcessorContext, bool>,
    /// Runs after a response was received, before assertions.
    pub on_response: HookPipeline<ProcessorContext, bool>,
    /// Rewrites `{{ }}` placeholders.
    pub replace_variable: HookPipeline<ReplaceArgs, bool>,
}

/// A loaded document with its regions and per-environment caches.
pub struct HttpFile {
    pub path: Option<PathBuf>,
    pub hooks: FileHooks,
    regions: Vec<Arc<HttpRegion>>,
    global_variables: Mutex<BTreeMap<EnvKey, Variables>>,
    dependencies: Mutex<DependencyGraph>,
}

impl std::fmt::Debug for HttpFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpFile")
            .field("path", &self.path)
            .field("regions", &self.regions.len())
            .finish()
    }
}

impl HttpFile {
    pub fn new(path: Option<PathBuf>, hooks: FileHooks, regions: Vec<HttpRegion>) -> Self {
        Self {
            path,
            hooks,
            regions: regions.into_iter().map(Arc::new).collect(),
            global_variables: Mutex::new(BTreeMap::new()),
            dependencies: Mutex::new(DependencyGraph::new()),
        }
    }

    pub fn regions(&self) -> &[Arc<HttpRegion>] {
        &self.regions
    }

    pub fn region(&self, id: RegionId) -> Option<&Arc<HttpRegion>> {
        self.regions.iter().find(|r| r.id == id)
    }

    pub fn region_by_name(&self, name: &str) -> Option<&Arc<HttpRegion>> {
        self.regions.iter().find(|r| r.metadata.name() == Some(name))
    }

    pub fn global_regions(&self) -> impl Iterator<Item = &Arc<HttpRegion>> {
        self.regions.iter().filter(|r| r.is_global())
    }

    pub fn cached_globals(&self, env: &EnvKey) -> Option<Variables> {
        self.global_variables.lock().get(env).cloned()
    }

    pub fn store_globals(&self, env: &EnvKey, variables: Variables) {
        self.global_variables.lock().insert(env.clone(), variables);
    }

    pub fn add_dependent(&self, upstream: RegionId, dependent: RegionId) {
        self.dependencies.lock().add_dependent(upstream, dependent);
    }

    /// `caller` read the output of `region` and of every global region.
    pub fn register_caller(&self, region: RegionId, caller: RegionId) {
        let mut graph = self.dependencies.lock();
        for global in self.global_regions() {
            graph.add_dependent(global.id, caller);
        }
        graph.add_dependent(region, caller);
    }

    /// Invalidates the `env` caches of every region transitively depending
    /// on `root` and returns them in visiting order.
    pub fn invalidate_dependents(&self, root: RegionId, env: &EnvKey) -> Vec<Arc<HttpRegion>> {
        let ids = self.dependencies.lock().collect_dependents(root);
        let invalidated: Vec<Arc<HttpRegion>> =
            ids.into_iter().filter_map(|id| self.region(id).cloned()).collect();
        for region in &invalidated {
            region.invalidate(env);
        }
        invalidated
    }

    /// Forgets every cached result, for a fresh batch.
    pub fn reset_caches(&self) {
        self.global_variables.lock().clear();
        self.dependencies.lock().clear();
        for region in &self.regions {
            region.clear_cache();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqflow_core::{HttpRequest, HttpResponse, Metadata, Protocol, Symbol};

    fn region(id: usize, name: Option<&str>) -> HttpRegion {
        let mut metadata = Metadata::new();
        if let Some(n) = name {
            metadata.set("name", n);
        }
        HttpRegion::new(
            RegionId(id),
            Symbol::default(),
            metadata,
            name.map(|_| HttpRequest::new(Protocol::Http, "GET", "https://example.com")),
            HookPipeline::new(),
        )
    }

    #[test]
    fn invalidation_follows_cycles_once() {
        let file = HttpFile::new(
            None,
            FileHooks::default(),
            vec![region(0, Some("a")), region(1, Some("b"))],
        );
        let env = EnvKey::none();
        file.add_dependent(RegionId(0), RegionId(1));
        file.add_dependent(RegionId(1), RegionId(0));
        for r in file.regions() {
            r.set_response(HttpResponse::new(Protocol::Http, 200));
        }

        let invalidated = file.invalidate_dependents(RegionId(0), &env);

        assert_eq!(invalidated.len(), 1);
        assert_eq!(invalidated[0].id, RegionId(1));
        assert!(file.regions()[1].response().is_none());
        assert!(file.regions()[0].response().is_some());
    }

    #[test]
    fn callers_depend_on_globals() {
        let file = HttpFile::new(
            None,
            FileHooks::default(),
            vec![region(0, None), region(1, Some("get")), region(2, Some("c"))],
        );
        file.register_caller(RegionId(1), RegionId(2));
        let env = EnvKey::none();
        let ids: Vec<_> = file
            .invalidate_dependents(RegionId(0), &env)
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![RegionId(2)]);
        let ids: Vec<_> = file
            .invalidate_dependents(RegionId(1), &env)
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![RegionId(2)]);
    }
}
