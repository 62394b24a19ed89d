//! Deduplicating permission registry

use dashmap::DashMap;

use super::{Permission, PermissionKind};

/// Thread-safe map from permission id to the single shared [`Permission`]
///
/// Loaders use it so that every role referencing `"add-text"` holds the
/// same identity. Pre-seed non-default kinds with [`insert`](Self::insert)
/// before loading and the loader will reuse them.
///
/// # Examples
///
/// ```rust
/// use rbac::{PermissionKind, PermissionRegistry};
///
/// let registry = PermissionRegistry::new();
/// let a = registry.ensure("add-text", PermissionKind::Exact);
/// let b = registry.ensure("add-text", PermissionKind::Prefix);
///
/// // The first registration wins
/// assert_eq!(a, b);
/// assert_eq!(b.kind(), PermissionKind::Exact);
/// ```
#[derive(Debug, Default)]
pub struct PermissionRegistry {
    permissions: DashMap<String, Permission>,
    default_kind: PermissionKind,
}

impl PermissionRegistry {
    /// Creates an empty registry creating exact permissions by default
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty registry whose [`ensure_default`](Self::ensure_default)
    /// creates permissions of `kind`
    pub fn with_kind(kind: PermissionKind) -> Self {
        Self {
            permissions: DashMap::new(),
            default_kind: kind,
        }
    }

    pub fn default_kind(&self) -> PermissionKind {
        self.default_kind
    }

    pub fn get(&self, id: &str) -> Option<Permission> {
        self.permissions.get(id).map(|p| p.clone())
    }

    /// Returns the registered permission for `id`, creating it with `kind`
    /// if absent
    ///
    /// Lookup and creation happen under one shard lock, so concurrent
    /// callers always receive the same identity.
    pub fn ensure(&self, id: &str, kind: PermissionKind) -> Permission {
        if let Some(existing) = self.permissions.get(id) {
            return existing.clone();
        }

        self.permissions
            .entry(id.to_string())
            .or_insert_with(|| Permission::new(id, kind))
            .clone()
    }

    pub fn ensure_default(&self, id: &str) -> Permission {
        self.ensure(id, self.default_kind)
    }

    /// Stores `permission`, replacing any previous entry with the same id
    pub fn insert(&self, permission: Permission) -> Option<Permission> {
        self.permissions
            .insert(permission.id().to_string(), permission)
    }

    pub fn remove(&self, id: &str) -> Option<Permission> {
        self.permissions.remove(id).map(|(_, p)| p)
    }

    /// Registered ids in sorted order
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.permissions.iter().map(|p| p.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }
}
