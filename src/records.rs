//! Loader and persister records
//!
//! A graph is exchanged with the outside world as two plain maps:
//!
//! - `roles`: role id -> ids of the permissions it holds directly
//! - `inheritance`: role id -> ids of its parent roles
//!
//! [`build`] turns records into a graph and [`dump`] turns a graph back into
//! records, so `build(&dump(&graph))` answers every grant query the same way
//! `graph` does. Decoding the records from a file or wire format is the
//! caller's business; the maps are ordered so any serde format produces
//! stable output.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::convert::Infallible;
use tracing::debug;

use crate::error::Result;
use crate::graph::RoleGraph;
use crate::permission::PermissionRegistry;
use crate::role::Role;
use crate::walker::walk;

/// Role id -> direct permission ids
pub type RoleRecords = BTreeMap<String, Vec<String>>;

/// Role id -> parent role ids
pub type InheritanceRecords = BTreeMap<String, Vec<String>>;

/// A whole graph as plain records
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphRecords {
    #[serde(default)]
    pub roles: RoleRecords,

    #[serde(default)]
    pub inheritance: InheritanceRecords,
}

impl GraphRecords {
    pub fn new(roles: RoleRecords, inheritance: InheritanceRecords) -> Self {
        Self { roles, inheritance }
    }

    /// Number of inheritance edges
    pub fn edge_count(&self) -> usize {
        self.inheritance.values().map(Vec::len).sum()
    }
}

/// Builds a fresh graph from records
///
/// Permission identities come from `registry`: ids it already knows keep
/// their registered kind, new ids are created with its default kind.
///
/// # Errors
///
/// `RoleNotFound` if an inheritance entry names a role missing from
/// `records.roles`, `CycleDetected` if the inheritance is cyclic.
///
/// # Examples
///
/// ```rust
/// use rbac::records::{self, GraphRecords};
/// use rbac::{Permission, PermissionRegistry};
///
/// let mut input = GraphRecords::default();
/// input.roles.insert("editor".into(), vec!["add-text".into()]);
/// input.roles.insert("chief-editor".into(), vec![]);
/// input.inheritance.insert("chief-editor".into(), vec!["editor".into()]);
///
/// let registry = PermissionRegistry::new();
/// let graph = records::build(&input, &registry).unwrap();
///
/// assert!(graph.is_granted("chief-editor", &Permission::exact("add-text"), None));
/// ```
pub fn build(records: &GraphRecords, registry: &PermissionRegistry) -> Result<RoleGraph> {
    let graph = RoleGraph::new();
    load_into(&graph, records, registry)?;
    Ok(graph)
}

/// Adds the roles and edges of `records` to an existing graph
///
/// Every role is registered before any edge is set, so inheritance entries
/// may appear in any order. Roles already present in `graph` are
/// overwritten, which makes reloading the same records idempotent.
///
/// Loading is not atomic as a whole: on error the roles and edges applied
/// before the failing entry stay in place.
pub fn load_into(graph: &RoleGraph, records: &GraphRecords, registry: &PermissionRegistry) -> Result<()> {
    for (role_id, permission_ids) in &records.roles {
        let role = Role::new(role_id.as_str()).with_permissions(
            permission_ids
                .iter()
                .map(|id| registry.ensure_default(id)),
        );
        graph.replace(role);
    }

    for (role_id, parent_ids) in &records.inheritance {
        graph.set_parents(role_id, parent_ids.iter().cloned())?;
    }

    debug!(
        roles = records.roles.len(),
        edges = records.edge_count(),
        "records loaded"
    );
    Ok(())
}

/// Exports every role with its direct permissions and parents
///
/// Every role gets an entry in both maps, empty lists included.
pub fn dump(graph: &RoleGraph) -> GraphRecords {
    let mut records = GraphRecords::default();

    let walked = walk(graph, |role, parents| {
        records
            .roles
            .insert(role.id().to_string(), role.permission_ids());
        records
            .inheritance
            .insert(role.id().to_string(), parents.to_vec());
        Ok::<(), Infallible>(())
    });
    if let Err(never) = walked {
        match never {}
    }

    debug!(roles = records.roles.len(), "records dumped");
    records
}
