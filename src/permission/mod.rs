//! Permission identities and their matching rules
//!
//! A [`Permission`] is an immutable id paired with a [`PermissionKind`]
//! that decides which requested permissions it covers:
//!
//! 1. Exact: `"add-text"` covers only `"add-text"`
//! 2. Prefix: `"article-"` covers `"article-edit"`, `"article-delete"`
//! 3. Layered: `"article"` covers `"article:edit"` but not `"articles:edit"`
//!
//! Permissions are cheap to clone. The id is reference counted, so the same
//! identity can be held by any number of roles.

mod registry;

pub use registry::PermissionRegistry;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Segment separator used by [`Permission::layered`]
pub const DEFAULT_LAYER_SEPARATOR: char = ':';

/// Matching rule attached to a permission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionKind {
    /// Covers only a permission with the same id
    #[default]
    Exact,

    /// Covers any permission whose id starts with this id
    Prefix,

    /// Covers any permission whose leading segments equal this id's segments
    Layered { separator: char },
}

impl PermissionKind {
    /// Layered matching on [`DEFAULT_LAYER_SEPARATOR`]
    pub const fn layered() -> Self {
        PermissionKind::Layered {
            separator: DEFAULT_LAYER_SEPARATOR,
        }
    }
}

/// An atomic capability identity
///
/// # Examples
///
/// ```rust
/// use rbac::Permission;
///
/// let held = Permission::prefix("article-");
/// assert!(held.matches(&Permission::exact("article-edit")));
///
/// let held = Permission::exact("article-");
/// assert!(!held.matches(&Permission::exact("article-edit")));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permission {
    id: Arc<str>,
    #[serde(default)]
    kind: PermissionKind,
}

impl Permission {
    /// Creates a permission with an explicit matching rule
    pub fn new(id: impl AsRef<str>, kind: PermissionKind) -> Self {
        Self {
            id: Arc::from(id.as_ref()),
            kind,
        }
    }

    pub fn exact(id: impl AsRef<str>) -> Self {
        Self::new(id, PermissionKind::Exact)
    }

    pub fn prefix(id: impl AsRef<str>) -> Self {
        Self::new(id, PermissionKind::Prefix)
    }

    pub fn layered(id: impl AsRef<str>) -> Self {
        Self::new(id, PermissionKind::layered())
    }

    pub fn layered_with(id: impl AsRef<str>, separator: char) -> Self {
        Self::new(id, PermissionKind::Layered { separator })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> PermissionKind {
        self.kind
    }

    /// Checks whether holding `self` covers a request for `requested`
    ///
    /// Equal ids always match. Beyond that the rule of `self` decides; the
    /// kind of `requested` is ignored.
    pub fn matches(&self, requested: &Permission) -> bool {
        let held = self.id();
        let wanted = requested.id();

        if held == wanted {
            return true;
        }

        match self.kind {
            PermissionKind::Exact => false,
            PermissionKind::Prefix => wanted.starts_with(held),
            PermissionKind::Layered { separator } => {
                let mut wanted_segments = wanted.split(separator);
                held.split(separator)
                    .all(|segment| wanted_segments.next() == Some(segment))
            }
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl AsRef<str> for Permission {
    fn as_ref(&self) -> &str {
        &self.id
    }
}
