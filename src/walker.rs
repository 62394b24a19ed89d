//! Lock-free traversal of a graph snapshot
//!
//! [`walk`] copies the graph once under its read lock and then calls the
//! handler for every role without holding any lock, so a handler is free
//! to query or even mutate the graph it is walking.
//!
//! Roles are visited parents-first using Kahn's algorithm over the
//! snapshot; ties are broken by registration order, so the same graph is
//! always visited in the same order.

use indexmap::IndexMap;
use std::collections::BTreeSet;

use crate::graph::RoleGraph;
use crate::role::Role;

/// Point-in-time copy of a [`RoleGraph`]
#[derive(Debug, Clone, Default)]
pub struct GraphSnapshot {
    roles: IndexMap<String, Role>,
    parents: IndexMap<String, Vec<String>>,
}

impl GraphSnapshot {
    pub(crate) fn new(roles: IndexMap<String, Role>, parents: IndexMap<String, Vec<String>>) -> Self {
        Self { roles, parents }
    }

    /// Roles in registration order
    pub fn roles(&self) -> impl Iterator<Item = &Role> {
        self.roles.values()
    }

    pub fn role(&self, id: &str) -> Option<&Role> {
        self.roles.get(id)
    }

    /// Direct parents of `id`; empty for unknown roles
    pub fn parents_of(&self, id: &str) -> &[String] {
        self.parents.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// Role ids with every parent ahead of its children
    ///
    /// Roles caught in a cycle (only possible in a corrupted snapshot) are
    /// appended at the end in registration order, so every role appears
    /// exactly once.
    pub fn visit_order(&self) -> Vec<&str> {
        let count = self.roles.len();
        let mut in_degree = vec![0usize; count];
        let mut children: Vec<Vec<usize>> = vec![Vec::new(); count];

        for (child, (id, _)) in self.roles.iter().enumerate() {
            for parent in self.parents_of(id) {
                if let Some(parent) = self.roles.get_index_of(parent) {
                    children[parent].push(child);
                    in_degree[child] += 1;
                }
            }
        }

        let mut ready: BTreeSet<usize> = (0..count).filter(|&i| in_degree[i] == 0).collect();
        let mut emitted = vec![false; count];
        let mut order = Vec::with_capacity(count);

        while let Some(index) = ready.pop_first() {
            emitted[index] = true;
            order.push(index);

            for &child in &children[index] {
                in_degree[child] -= 1;
                if in_degree[child] == 0 {
                    ready.insert(child);
                }
            }
        }

        order.extend((0..count).filter(|&i| !emitted[i]));

        order
            .into_iter()
            .filter_map(|i| self.roles.get_index(i).map(|(id, _)| id.as_str()))
            .collect()
    }

    /// Calls `visit` for every role of the snapshot, in
    /// [`visit_order`](Self::visit_order)
    ///
    /// Stops at the first error and returns it. Whatever the handler did
    /// for earlier roles is left as is.
    pub fn walk<F, E>(&self, mut visit: F) -> Result<(), E>
    where
        F: FnMut(&Role, &[String]) -> Result<(), E>,
    {
        for id in self.visit_order() {
            if let Some(role) = self.roles.get(id) {
                visit(role, self.parents_of(id))?;
            }
        }
        Ok(())
    }
}

/// Visits every role of `graph` with its direct parent ids
///
/// # Examples
///
/// ```rust
/// use rbac::{walk, Permission, Role, RoleGraph};
/// use std::collections::BTreeMap;
///
/// let graph = RoleGraph::new();
/// graph.add(Role::new("editor").with_permissions([Permission::exact("add-text")])).unwrap();
/// graph.add(Role::new("chief-editor")).unwrap();
/// graph.set_parents("chief-editor", ["editor"]).unwrap();
///
/// let mut inheritance = BTreeMap::new();
/// walk(&graph, |role, parents| {
///     inheritance.insert(role.id().to_string(), parents.to_vec());
///     Ok::<(), std::convert::Infallible>(())
/// })
/// .unwrap();
///
/// assert_eq!(inheritance["chief-editor"], vec!["editor".to_string()]);
/// ```
pub fn walk<F, E>(graph: &RoleGraph, visit: F) -> Result<(), E>
where
    F: FnMut(&Role, &[String]) -> Result<(), E>,
{
    graph.snapshot().walk(visit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::Permission;

    fn chain_graph() -> RoleGraph {
        let graph = RoleGraph::new();
        // Registered child-first so parents-first order differs from
        // registration order.
        graph.add(Role::new("director")).unwrap();
        graph.add(Role::new("manager")).unwrap();
        graph.add(Role::new("employee").with_permissions([Permission::exact("badge")])).unwrap();
        graph.add(Role::new("contractor")).unwrap();
        graph.set_parents("director", ["manager"]).unwrap();
        graph.set_parents("manager", ["employee"]).unwrap();
        graph
    }

    #[test]
    fn test_empty_graph() {
        let graph = RoleGraph::new();
        let mut visited = 0;
        walk(&graph, |_, _| {
            visited += 1;
            Ok::<(), ()>(())
        })
        .unwrap();
        assert_eq!(visited, 0);
        assert!(graph.snapshot().is_empty());
    }

    #[test]
    fn test_parents_visited_first() {
        let graph = chain_graph();
        let snapshot = graph.snapshot();
        assert_eq!(snapshot.visit_order(), vec!["employee", "manager", "director", "contractor"]);
    }

    #[test]
    fn test_every_role_visited_once() {
        let graph = chain_graph();
        let mut seen = Vec::new();
        walk(&graph, |role, parents| {
            seen.push((role.id().to_string(), parents.to_vec()));
            Ok::<(), ()>(())
        })
        .unwrap();

        assert_eq!(seen.len(), 4);
        assert!(seen.contains(&("director".to_string(), vec!["manager".to_string()])));
        assert!(seen.contains(&("contractor".to_string(), vec![])));
    }

    #[test]
    fn test_first_error_stops_walk() {
        let graph = chain_graph();
        let mut visited = Vec::new();

        let result = walk(&graph, |role, _| {
            if role.id() == "manager" {
                return Err(format!("cannot export {}", role.id()));
            }
            visited.push(role.id().to_string());
            Ok(())
        });

        assert_eq!(result, Err("cannot export manager".to_string()));
        assert_eq!(visited, vec!["employee"]);
    }

    #[test]
    fn test_handler_may_reenter_graph() {
        let graph = chain_graph();
        let badge = Permission::exact("badge");

        walk(&graph, |role, _| {
            // Both a read and a write on the walked graph, with no deadlock
            let _ = graph.is_granted(role.id(), &badge, None);
            graph.replace(role.clone());
            Ok::<(), ()>(())
        })
        .unwrap();

        assert_eq!(graph.len(), 4);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let graph = chain_graph();
        let snapshot = graph.snapshot();

        graph.remove("contractor").unwrap();

        assert_eq!(snapshot.len(), 4);
        assert!(snapshot.role("contractor").is_some());
        assert_eq!(snapshot.parents_of("director"), &["manager".to_string()]);
        assert!(snapshot.parents_of("unknown").is_empty());
    }

    #[test]
    fn test_corrupt_cycle_still_terminates() {
        let graph = chain_graph();
        graph.force_edge("employee", "director");

        let snapshot = graph.snapshot();
        let order = snapshot.visit_order();
        assert_eq!(order.len(), 4);
        assert_eq!(order[0], "contractor");
    }
}
