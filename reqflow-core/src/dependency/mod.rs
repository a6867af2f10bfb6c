//! Which regions read which other regions' output.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Stable identity of a region within one document. Loop clones share the id
/// of the region they were cloned from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegionId(pub usize);

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Adjacency list from a region to the regions that depend on it.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    dependents: BTreeMap<RegionId, BTreeSet<RegionId>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `dependent` read the output of `upstream`.
    /// Returns false when the edge already existed or is a self edge.
    pub fn add_dependent(&mut self, upstream: RegionId, dependent: RegionId) -> bool {
        if upstream == dependent {
            return false;
        }
        self.dependents.entry(upstream).or_default().insert(dependent)
    }

    /// Every region transitively depending on `root`, in depth-first
    /// pre-order. `root` itself is never included and each region appears
    /// once, even when the graph has diamonds or cycles.
    pub fn collect_dependents(&self, root: RegionId) -> Vec<RegionId> {
        let mut visited = BTreeSet::from([root]);
        let mut out = Vec::new();
        self.walk(root, &mut visited, &mut out);
        out
    }

    /// Depth-first walk sharing `visited` with the caller, so several roots
    /// can be invalidated in one pass without revisiting regions.
    pub fn walk(&self, from: RegionId, visited: &mut BTreeSet<RegionId>, out: &mut Vec<RegionId>) {
        let Some(next) = self.dependents.get(&from) else {
            return;
        };
        for &dependent in next {
            if visited.insert(dependent) {
                out.push(dependent);
                self.walk(dependent, visited, out);
            }
        }
    }

    pub fn clear(&mut self) {
        self.dependents.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.dependents.values().all(BTreeSet::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitive_dependents_are_collected_once() {
        let (a, b, c, d) = (RegionId(0), RegionId(1), RegionId(2), RegionId(3));
        let mut g = DependencyGraph::new();
        g.add_dependent(a, b);
        g.add_dependent(a, c);
        g.add_dependent(b, d);
        g.add_dependent(c, d);
        assert_eq!(g.collect_dependents(a), vec![b, d, c]);
    }

    #[test]
    fn cycles_terminate_and_exclude_root() {
        let (a, b) = (RegionId(0), RegionId(1));
        let mut g = DependencyGraph::new();
        g.add_dependent(a, b);
        g.add_dependent(b, a);
        assert_eq!(g.collect_dependents(a), vec![b]);
        assert_eq!(g.collect_dependents(b), vec![a]);
    }

    #[test]
    fn self_edges_are_ignored() {
        let mut g = DependencyGraph::new();
        assert!(!g.add_dependent(RegionId(4), RegionId(4)));
        assert!(g.is_empty());
    }
}
