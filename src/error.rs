//! Error types for the RBAC engine

use thiserror::Error;

/// Result type alias for graph mutations
pub type Result<T> = std::result::Result<T, RbacError>;

/// Errors returned by graph mutations and loaders
///
/// Queries never produce these: an unknown role simply holds no
/// permissions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RbacError {
    /// A mutation referenced a role id that is not registered
    #[error("role '{role}' not found")]
    RoleNotFound { role: String },

    /// An inheritance change would make a role its own ancestor
    #[error("circular inheritance detected: {}", .cycle.join(" -> "))]
    CycleDetected { cycle: Vec<String> },

    /// `add` was called with an id that is already registered
    #[error("role '{role}' already exists")]
    DuplicateRole { role: String },
}

impl RbacError {
    pub(crate) fn not_found(role: impl Into<String>) -> Self {
        RbacError::RoleNotFound { role: role.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = RbacError::not_found("editor");
        assert_eq!(err.to_string(), "role 'editor' not found");
    }

    #[test]
    fn test_cycle_display() {
        let err = RbacError::CycleDetected {
            cycle: vec!["role_a".to_string(), "role_b".to_string(), "role_a".to_string()],
        };
        assert!(err.to_string().contains("circular inheritance"));
        assert!(err.to_string().contains("role_a -> role_b -> role_a"));
    }

    #[test]
    fn test_error_equality() {
        let err1 = RbacError::DuplicateRole { role: "x".to_string() };
        let err2 = RbacError::DuplicateRole { role: "x".to_string() };
        assert_eq!(err1, err2);
    }
}
