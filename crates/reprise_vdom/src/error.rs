//! Reconciler error types

use reprise_core::{DomError, NodeId};
use thiserror::Error;

/// Errors that abort an incremental patch of the live tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    /// Live mirror points at a node the live tree no longer has
    #[error("live node for {0} vanished")]
    LiveNodeMissing(NodeId),

    /// Live tree rejected a structural operation
    #[error("live tree rejected patch: {0}")]
    Dom(#[from] DomError),
}

/// Result type for reconciliation
pub type Result<T> = std::result::Result<T, ReconcileError>;
