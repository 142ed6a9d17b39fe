//! Reprise core
//!
//! Building blocks for replaying recorded DOM sessions:
//!
//! - [`events`]: the recorded event model and its JSON form
//! - [`dom`]: the [`DomTree`] capability every replay target implements
//! - [`host`]: an in-memory live document with native `<dialog>` semantics
//! - [`mirror`]: recorded id to node mapping
//! - [`rebuild`]: full snapshot reconstruction
//! - [`apply`]: incremental mutation application
//! - [`dialog`]: the `<dialog>` open-state adapter

pub mod apply;
pub mod dialog;
pub mod dom;
pub mod error;
pub mod events;
pub mod host;
pub mod mirror;
pub mod rebuild;

pub use apply::{apply_batch, apply_input, apply_mutation, ApplyReport};
pub use dialog::{DialogAdapter, DialogIntent, FoldedIntents, ModalState, NativeCall, TransitionPlan};
pub use dom::{is_dialog, subtree, DomTree, NodeKind};
pub use error::{CapabilityError, DomError, Result};
pub use events::{
    AddedNode, DialogDirective, Event, EventData, IncrementalData, IncrementalMutation,
    MutationBatch, NodeId, OpenMode, ScrollOffset, SerializedData, SerializedNode, Timestamp,
    LEGACY_OPEN_MODE_ATTRIBUTE,
};
pub use host::{HostCapabilities, HostDocument, HostNodeId, NativeCallRecord, DEFAULT_CALL_LOG_CAPACITY};
pub use mirror::Mirror;
pub use rebuild::{build_node, rebuild, restore_open_modes};
