use std::collections::{BTreeMap, BTreeSet};

use crate::error::PipelineError;

pub(crate) struct SortNode<'a> {
    pub name: &'a str,
    pub before: &'a [String],
    pub after: &'a [String],
}

/// Stable topological order over registration indices.
///
/// Hooks are emitted in registration order, each one preceded by any not yet
/// emitted hooks that must run before it. A hook declaring `before: x` thus
/// lands directly ahead of `x`, and unconstrained hooks keep the order in
/// which they were added. Constraints naming hooks that are not registered
/// are ignored.
pub(crate) fn sort_hooks(nodes: &[SortNode<'_>]) -> Result<Vec<usize>, PipelineError> {
    let index_of: BTreeMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.name, i))
        .collect();

    // predecessors[i]: hooks that must run before hook i
    let mut predecessors: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); nodes.len()];
    for (i, node) in nodes.iter().enumerate() {
        for target in node.before {
            if let Some(&j) = index_of.get(target.as_str()) {
                predecessors[j].insert(i);
            }
        }
        for target in node.after {
            if let Some(&j) = index_of.get(target.as_str()) {
                predecessors[i].insert(j);
            }
        }
    }

    let mut marks = vec![Mark::Unvisited; nodes.len()];
    let mut stack = Vec::new();
    let mut out = Vec::with_capacity(nodes.len());
    for i in 0..nodes.len() {
        visit(i, &predecessors, &mut marks, &mut stack, &mut out).map_err(|cycle| {
            let mut members = cycle;
            members.sort_unstable();
            PipelineError::Cycle(members.into_iter().map(|m| nodes[m].name.to_string()).collect())
        })?;
    }
    Ok(out)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnStack,
    Done,
}

/// Emits the predecessors of `n`, then `n`. On a cycle returns its members.
fn visit(
    n: usize,
    predecessors: &[BTreeSet<usize>],
    marks: &mut [Mark],
    stack: &mut Vec<usize>,
    out: &mut Vec<usize>,
) -> Result<(), Vec<usize>> {
    match marks[n] {
        Mark::Done => return Ok(()),
        Mark::OnStack => {
            let from = stack.iter().position(|&m| m == n).unwrap_or(0);
            return Err(stack[from..].to_vec());
        }
        Mark::Unvisited => {}
    }
    marks[n] = Mark::OnStack;
    stack.push(n);
    for &p in &predecessors[n] {
        visit(p, predecessors, marks, stack, out)?;
    }
    stack.pop();
    marks[n] = Mark::Done;
    out.push(n);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node<'a>(name: &'a str, before: &'a [String], after: &'a [String]) -> SortNode<'a> {
        SortNode {
            name,
            before,
            after,
        }
    }

    #[test]
    fn keeps_registration_order_without_constraints() {
        let nodes = [node("a", &[], &[]), node("b", &[], &[]), node("c", &[], &[])];
        assert_eq!(sort_hooks(&nodes).unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn before_moves_hook_ahead() {
        let before_a = vec!["a".to_string()];
        let nodes = [node("a", &[], &[]), node("b", &[], &[]), node("c", &before_a, &[])];
        assert_eq!(sort_hooks(&nodes).unwrap(), vec![2, 0, 1]);
    }

    #[test]
    fn satisfied_constraints_keep_registration_order() {
        let c = vec!["c".to_string()];
        let nodes = [node("a", &c, &[]), node("b", &[], &[]), node("c", &[], &[])];
        assert_eq!(sort_hooks(&nodes).unwrap(), vec![0, 1, 2]);

        // pulled behind its target
        let nodes = [node("a", &[], &c), node("b", &[], &[]), node("c", &[], &[])];
        assert_eq!(sort_hooks(&nodes).unwrap(), vec![2, 0, 1]);
    }

    #[test]
    fn unknown_targets_are_ignored() {
        let missing = vec!["missing".to_string()];
        let nodes = [node("a", &missing, &missing), node("b", &[], &[])];
        assert_eq!(sort_hooks(&nodes).unwrap(), vec![0, 1]);
    }

    #[test]
    fn cycle_is_reported_with_members() {
        let before_b = vec!["b".to_string()];
        let before_a = vec!["a".to_string()];
        let nodes = [node("a", &before_b, &[]), node("b", &before_a, &[]), node("c", &[], &[])];
        match sort_hooks(&nodes) {
            Err(PipelineError::Cycle(names)) => assert_eq!(names, vec!["a", "b"]),
            other => panic!("expected cycle, got {other:?}"),
        }
    }
}
