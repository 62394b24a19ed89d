//! # Role-Based Access Control engine (rbac)
//!
//! An embeddable RBAC engine with support for:
//! - Exact, prefix and layered permission matching
//! - Graph-scoped role inheritance with cycle rejection
//! - Per-role conditions that prune inheritance branches
//! - Concurrent grant queries behind a single reader-writer lock
//! - Deterministic, lock-free walks for export
//!
//! ## Example
//!
//! ```rust
//! use rbac::{Permission, PermissionRegistry, Role, RoleGraph};
//!
//! let registry = PermissionRegistry::new();
//! let add_text = registry.ensure_default("add-text");
//!
//! let graph = RoleGraph::new();
//! graph.add(Role::new("editor").with_permissions([add_text.clone()])).unwrap();
//! graph.add(Role::new("chief-editor")).unwrap();
//! graph.set_parents("chief-editor", ["editor"]).unwrap();
//!
//! assert!(graph.is_granted("chief-editor", &add_text, None));
//! assert!(graph.set_parents("editor", ["chief-editor"]).is_err());
//! ```

pub mod error;
pub mod graph;
pub mod permission;
pub mod records;
pub mod role;
pub mod walker;

pub use error::{RbacError, Result};
pub use graph::{Condition, RoleGraph};
pub use permission::{Permission, PermissionKind, PermissionRegistry, DEFAULT_LAYER_SEPARATOR};
pub use records::GraphRecords;
pub use role::Role;
pub use walker::{walk, GraphSnapshot};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
