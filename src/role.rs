//! Roles and their directly assigned permissions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::permission::Permission;

/// A named principal holding permissions directly
///
/// A role knows nothing about inheritance. Parent edges are owned by the
/// [`RoleGraph`](crate::RoleGraph) the role is registered in.
///
/// # Examples
///
/// ```rust
/// use rbac::{Permission, Role};
///
/// let mut editor = Role::new("editor");
/// editor.assign(Permission::exact("add-text"));
///
/// assert!(editor.permit(&Permission::exact("add-text")));
/// assert!(!editor.permit(&Permission::exact("add-photos")));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    id: String,
    #[serde(default)]
    permissions: HashMap<String, Permission>,
}

impl Role {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            permissions: HashMap::new(),
        }
    }

    /// Builder form of [`assign`](Self::assign)
    pub fn with_permissions<I>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = Permission>,
    {
        for permission in permissions {
            self.assign(permission);
        }
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Assigns a permission, replacing any held permission with the same id
    pub fn assign(&mut self, permission: Permission) {
        self.permissions
            .insert(permission.id().to_string(), permission);
    }

    /// Revokes a permission by id; absent ids are ignored
    pub fn revoke(&mut self, permission_id: &str) {
        self.permissions.remove(permission_id);
    }

    /// Checks the role's own permissions, ignoring inheritance
    pub fn permit(&self, requested: &Permission) -> bool {
        if let Some(held) = self.permissions.get(requested.id()) {
            if held.matches(requested) {
                return true;
            }
        }

        self.permissions
            .values()
            .any(|held| held.matches(requested))
    }

    pub fn has_permission(&self, permission_id: &str) -> bool {
        self.permissions.contains_key(permission_id)
    }

    /// Snapshot of the held permissions, sorted by id
    pub fn permissions(&self) -> Vec<Permission> {
        let mut permissions: Vec<Permission> = self.permissions.values().cloned().collect();
        permissions.sort_by(|a, b| a.id().cmp(b.id()));
        permissions
    }

    /// Held permission ids, sorted
    pub fn permission_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.permissions.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn permission_count(&self) -> usize {
        self.permissions.len()
    }
}
