//! Pooling errors
//!
//! Capacity exhaustion is not an error: a full pool answers `None`.

use crate::pooling::host::TemplateId;

/// Errors reported by pools and the registry
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// A pool for this template name or id is already registered
    #[error("A pool for template '{name}' ({id}) is already registered")]
    DuplicateTemplate {
        /// Template name
        name: String,
        /// Template reference identity
        id: TemplateId,
    },

    /// No pool is registered under this name
    #[error("No pool registered for template '{name}'")]
    UnknownTemplate {
        /// Requested template name
        name: String,
    },

    /// The instance is already idle in this pool
    #[error("Instance is already idle in pool '{pool}'")]
    AlreadyIdle {
        /// Pool the despawn was routed to
        pool: String,
    },

    /// The pool has no outstanding instances to take back
    #[error("Pool '{pool}' has no instances checked out")]
    NotCheckedOut {
        /// Pool the despawn was routed to
        pool: String,
    },

    /// `initialize` was called twice
    #[error("Pool '{pool}' is already initialized")]
    AlreadyInitialized {
        /// Pool name
        pool: String,
    },

    /// The pool was used before `initialize`
    #[error("Pool '{pool}' has not been initialized")]
    NotInitialized {
        /// Pool name
        pool: String,
    },

    /// Pool configuration failed validation
    #[error("Invalid configuration for pool '{pool}': {reason}")]
    InvalidConfig {
        /// Pool name
        pool: String,
        /// Validation failure
        reason: String,
    },
}

/// Result type for pooling operations
pub type PoolResult<T> = Result<T, PoolError>;
