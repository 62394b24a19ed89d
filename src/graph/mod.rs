//! The RBAC graph: role ownership, inheritance edges and grant queries
//!
//! All roles and all parent edges live behind one reader-writer lock, so a
//! query never observes a role whose edges are still being written.
//!
//! - Queries (`is_granted`, `get`, `parents`, ...) share the read lock
//! - Mutations (`add`, `remove`, `set_parents`, ...) take the write lock
//! - Inheritance edges are checked for cycles before they are committed

mod cycle;

use indexmap::{IndexMap, IndexSet};
use parking_lot::RwLock;
use std::collections::{HashSet, VecDeque};
use tracing::{debug, trace};

use crate::error::{RbacError, Result};
use crate::permission::Permission;
use crate::role::Role;
use crate::walker::GraphSnapshot;
use cycle::ParentMap;

/// Per-role gate consulted while answering a grant query
///
/// Returning `false` prunes the role: neither its permissions nor its
/// ancestors are considered.
///
/// The gate runs while the graph's read lock is held. It must not call
/// back into the same graph, not even for reads: the lock is fair, so a
/// nested read queues behind any waiting writer and never returns. Look up
/// whatever the gate needs beforehand, e.g. from a [`GraphSnapshot`].
pub type Condition<'a> = dyn Fn(&Role, &Permission) -> bool + 'a;

#[derive(Debug, Default)]
struct GraphState {
    roles: IndexMap<String, Role>,
    parents: ParentMap,
}

impl GraphState {
    fn require(&self, id: &str) -> Result<()> {
        if self.roles.contains_key(id) {
            Ok(())
        } else {
            Err(RbacError::not_found(id))
        }
    }

    /// Fails if making `parent` a parent of `child` closes a loop
    fn check_edge(&self, child: &str, parent: &str) -> Result<()> {
        match cycle::path_between(&self.parents, parent, child) {
            Some(path) => {
                let mut cycle = Vec::with_capacity(path.len() + 1);
                cycle.push(child.to_string());
                cycle.extend(path);
                Err(RbacError::CycleDetected { cycle })
            }
            None => Ok(()),
        }
    }

    fn is_granted(&self, id: &str, permission: &Permission, condition: Option<&Condition<'_>>) -> bool {
        if !self.roles.contains_key(id) {
            return false;
        }

        let mut visited: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        queue.push_back(id);

        while let Some(current) = queue.pop_front() {
            if !visited.insert(current) {
                continue;
            }

            let Some(role) = self.roles.get(current) else {
                continue;
            };

            if let Some(condition) = condition {
                if !condition(role, permission) {
                    continue;
                }
            }

            if role.permit(permission) {
                return true;
            }

            if let Some(parents) = self.parents.get(current) {
                queue.extend(
                    parents
                        .iter()
                        .map(String::as_str)
                        .filter(|p| !visited.contains(p)),
                );
            }
        }

        false
    }
}

/// Thread-safe role graph
///
/// # Examples
///
/// ```rust
/// use rbac::{Permission, Role, RoleGraph};
///
/// let graph = RoleGraph::new();
/// let add_text = Permission::exact("add-text");
///
/// graph.add(Role::new("editor").with_permissions([add_text.clone()])).unwrap();
/// graph.add(Role::new("chief-editor")).unwrap();
/// graph.set_parents("chief-editor", ["editor"]).unwrap();
///
/// assert!(graph.is_granted("chief-editor", &add_text, None));
/// assert!(!graph.is_granted("nobody", &add_text, None));
/// ```
#[derive(Debug, Default)]
pub struct RoleGraph {
    state: RwLock<GraphState>,
}

impl RoleGraph {
    /// Creates an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a role
    ///
    /// # Errors
    ///
    /// `DuplicateRole` if a role with the same id is already registered.
    /// Use [`replace`](Self::replace) to overwrite.
    pub fn add(&self, role: Role) -> Result<()> {
        let mut state = self.state.write();

        if state.roles.contains_key(role.id()) {
            return Err(RbacError::DuplicateRole {
                role: role.id().to_string(),
            });
        }

        let id = role.id().to_string();
        state.parents.insert(id.clone(), IndexSet::new());
        state.roles.insert(id, role);

        debug!(role_count = state.roles.len(), "role added");
        Ok(())
    }

    /// Inserts or overwrites a role, keeping any inheritance edges it has
    ///
    /// Returns the previous definition when one was replaced.
    pub fn replace(&self, role: Role) -> Option<Role> {
        let mut state = self.state.write();
        let id = role.id().to_string();

        state.parents.entry(id.clone()).or_default();
        let previous = state.roles.insert(id, role);

        debug!(replaced = previous.is_some(), "role replaced");
        previous
    }

    /// Unregisters a role and severs every edge that references it
    pub fn remove(&self, id: &str) -> Result<Role> {
        let mut state = self.state.write();

        let role = state
            .roles
            .shift_remove(id)
            .ok_or_else(|| RbacError::not_found(id))?;

        state.parents.shift_remove(id);
        for parents in state.parents.values_mut() {
            parents.shift_remove(id);
        }

        debug!(role = id, "role removed");
        Ok(role)
    }

    /// Replaces the full parent set of `id`
    ///
    /// Nothing changes unless every referenced role exists and none of the
    /// new parents already inherits from `id`.
    pub fn set_parents<I, S>(&self, id: &str, parent_ids: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let requested: IndexSet<String> = parent_ids.into_iter().map(Into::into).collect();
        let mut state = self.state.write();

        state.require(id)?;
        for parent in &requested {
            state.require(parent)?;
        }
        for parent in &requested {
            state.check_edge(id, parent)?;
        }

        debug!(role = id, parent_count = requested.len(), "parents set");
        state.parents.insert(id.to_string(), requested);
        Ok(())
    }

    /// Adds a single inheritance edge, keeping existing parents
    pub fn add_parent(&self, id: &str, parent_id: &str) -> Result<()> {
        let mut state = self.state.write();

        state.require(id)?;
        state.require(parent_id)?;
        state.check_edge(id, parent_id)?;

        state
            .parents
            .entry(id.to_string())
            .or_default()
            .insert(parent_id.to_string());

        debug!(role = id, parent = parent_id, "parent added");
        Ok(())
    }

    /// Removes a single inheritance edge; a missing edge is not an error
    pub fn remove_parent(&self, id: &str, parent_id: &str) -> Result<()> {
        let mut state = self.state.write();

        state.require(id)?;
        if let Some(parents) = state.parents.get_mut(id) {
            parents.shift_remove(parent_id);
        }

        debug!(role = id, parent = parent_id, "parent removed");
        Ok(())
    }

    /// Checks whether `id` holds `permission` directly or through any
    /// ancestor
    ///
    /// Unknown roles are never granted anything. Each role is visited at
    /// most once per query.
    pub fn is_granted(&self, id: &str, permission: &Permission, condition: Option<&Condition<'_>>) -> bool {
        let granted = self.state.read().is_granted(id, permission, condition);
        trace!(role = id, permission = permission.id(), granted, "grant check");
        granted
    }

    /// True if at least one of `ids` is granted `permission`
    pub fn any_granted<S>(&self, ids: &[S], permission: &Permission, condition: Option<&Condition<'_>>) -> bool
    where
        S: AsRef<str>,
    {
        let state = self.state.read();
        ids.iter()
            .any(|id| state.is_granted(id.as_ref(), permission, condition))
    }

    /// True if every one of `ids` is granted `permission`
    ///
    /// An empty list grants nothing.
    pub fn all_granted<S>(&self, ids: &[S], permission: &Permission, condition: Option<&Condition<'_>>) -> bool
    where
        S: AsRef<str>,
    {
        if ids.is_empty() {
            return false;
        }

        let state = self.state.read();
        ids.iter()
            .all(|id| state.is_granted(id.as_ref(), permission, condition))
    }

    /// Copy of a registered role
    pub fn get(&self, id: &str) -> Option<Role> {
        self.state.read().roles.get(id).cloned()
    }

    /// Direct parents of `id`, in the order they were declared
    pub fn parents(&self, id: &str) -> Option<Vec<String>> {
        let state = self.state.read();
        if !state.roles.contains_key(id) {
            return None;
        }

        Some(
            state
                .parents
                .get(id)
                .map(|p| p.iter().cloned().collect())
                .unwrap_or_default(),
        )
    }

    /// Every transitive parent of `id`, nearest first
    pub fn ancestors(&self, id: &str) -> Option<Vec<String>> {
        let state = self.state.read();
        if !state.roles.contains_key(id) {
            return None;
        }

        let mut seen: IndexSet<&str> = IndexSet::new();
        let mut queue: VecDeque<&str> = VecDeque::from([id]);

        while let Some(current) = queue.pop_front() {
            if let Some(parents) = state.parents.get(current) {
                for parent in parents {
                    if parent != id && seen.insert(parent.as_str()) {
                        queue.push_back(parent);
                    }
                }
            }
        }

        Some(seen.into_iter().map(str::to_string).collect())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.state.read().roles.contains_key(id)
    }

    /// Registered role ids in registration order
    pub fn role_ids(&self) -> Vec<String> {
        self.state.read().roles.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.state.read().roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().roles.is_empty()
    }

    /// Audits the whole inheritance relation for cycles
    ///
    /// Mutations never commit a cycle, so this only fails if the graph was
    /// corrupted some other way. The error carries the offending path.
    pub fn detect_cycles(&self) -> Result<()> {
        match cycle::find_cycle(&self.state.read().parents) {
            Some(cycle) => Err(RbacError::CycleDetected { cycle }),
            None => Ok(()),
        }
    }

    /// Consistent copy of all roles and edges
    ///
    /// The read lock is released before this returns.
    pub fn snapshot(&self) -> GraphSnapshot {
        let state = self.state.read();

        let parents = state
            .roles
            .keys()
            .map(|id| {
                let ids: Vec<String> = state
                    .parents
                    .get(id)
                    .map(|p| p.iter().cloned().collect())
                    .unwrap_or_default();
                (id.clone(), ids)
            })
            .collect();

        GraphSnapshot::new(state.roles.clone(), parents)
    }

    /// Writes an edge without any checks, to simulate a corrupted graph
    #[cfg(test)]
    pub(crate) fn force_edge(&self, child: &str, parent: &str) {
        self.state
            .write()
            .parents
            .entry(child.to_string())
            .or_default()
            .insert(parent.to_string());
    }
}
