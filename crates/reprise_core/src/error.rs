//! Core error types

use thiserror::Error;

/// Structural DOM operation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    /// Node handle does not refer to a live node
    #[error("node does not exist")]
    MissingNode,

    /// Node kind cannot hold children
    #[error("node cannot have children: {0}")]
    NotAContainer(String),

    /// Insertion would create a cycle
    #[error("cannot insert a node into its own subtree")]
    HierarchyRequest,

    /// Reference node is not a child of the parent
    #[error("reference node is not a child of the parent")]
    NotAChild,

    /// Operation requires a different node kind
    #[error("wrong node kind for {0}")]
    WrongKind(&'static str),
}

/// Native element capability errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CapabilityError {
    /// The backend has no native implementation for this call
    #[error("native capability unsupported")]
    Unsupported,

    /// The call is invalid in the element's current state
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    #[error(transparent)]
    Dom(#[from] DomError),
}

/// Result type for DOM operations
pub type Result<T> = std::result::Result<T, DomError>;
