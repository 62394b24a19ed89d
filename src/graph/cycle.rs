//! Reachability and cycle checks over the child -> parent relation

use indexmap::{IndexMap, IndexSet};
use std::collections::{HashMap, HashSet};

pub(crate) type ParentMap = IndexMap<String, IndexSet<String>>;

/// Finds an inheritance path from `from` up to `target`
///
/// Returns the path including both ends, or `None` when `target` is not
/// an ancestor of `from` (and not `from` itself).
///
/// The walk keeps its own stack of `(role, next parent index)` frames, so
/// chain depth is bounded by memory, not by the thread stack.
pub(crate) fn path_between(parents: &ParentMap, from: &str, target: &str) -> Option<Vec<String>> {
    if from == target {
        return Some(vec![from.to_string()]);
    }

    let mut visited: HashSet<&str> = HashSet::new();
    visited.insert(from);
    let mut stack: Vec<(&str, usize)> = vec![(from, 0)];

    while let Some(frame) = stack.last_mut() {
        let (node, index) = *frame;
        let Some(parent) = parents.get(node).and_then(|p| p.get_index(index)) else {
            stack.pop();
            continue;
        };
        frame.1 += 1;

        if parent == target {
            let mut path: Vec<String> = stack.iter().map(|(n, _)| n.to_string()).collect();
            path.push(parent.clone());
            return Some(path);
        }

        if visited.insert(parent.as_str()) {
            stack.push((parent.as_str(), 0));
        }
    }

    None
}

#[derive(Debug, PartialEq, Clone, Copy)]
enum VisitState {
    Visiting,
    Visited,
}

/// Searches the whole relation for a cycle
///
/// Roles are explored in registration order, so the reported path is
/// stable for a given graph. The path starts and ends on the same role.
pub(crate) fn find_cycle(parents: &ParentMap) -> Option<Vec<String>> {
    let mut state: HashMap<&str, VisitState> = HashMap::new();

    for root in parents.keys() {
        if state.contains_key(root.as_str()) {
            continue;
        }

        state.insert(root.as_str(), VisitState::Visiting);
        let mut stack: Vec<(&str, usize)> = vec![(root.as_str(), 0)];

        while let Some(frame) = stack.last_mut() {
            let (node, index) = *frame;
            let Some(parent) = parents.get(node).and_then(|p| p.get_index(index)) else {
                state.insert(node, VisitState::Visited);
                stack.pop();
                continue;
            };
            frame.1 += 1;

            match state.get(parent.as_str()) {
                Some(VisitState::Visiting) => {
                    let start = stack
                        .iter()
                        .position(|(n, _)| *n == parent.as_str())
                        .unwrap_or(0);
                    let mut cycle: Vec<String> =
                        stack[start..].iter().map(|(n, _)| n.to_string()).collect();
                    cycle.push(parent.clone());
                    return Some(cycle);
                }
                Some(VisitState::Visited) => {}
                None => {
                    state.insert(parent.as_str(), VisitState::Visiting);
                    stack.push((parent.as_str(), 0));
                }
            }
        }
    }

    None
}
