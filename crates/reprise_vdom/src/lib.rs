//! Reprise virtual DOM
//!
//! A [`VirtualDom`] absorbs incremental mutations between frames, recording
//! dialog intents instead of executing them. The [`Reconciler`] then patches
//! the live tree with the minimal set of operations, including only the
//! native dialog calls needed to reach each dialog's final state.
//!
//! ```
//! use reprise_core::{rebuild, HostDocument, Mirror, SerializedNode};
//! use reprise_vdom::{Reconciler, VirtualDom};
//!
//! let snapshot = SerializedNode::document(1, vec![SerializedNode::element(2, "main")]);
//! let mut vdom = VirtualDom::new();
//! let mut vmirror = Mirror::new();
//! rebuild(&mut vdom, &mut vmirror, &snapshot);
//!
//! let mut live = HostDocument::new();
//! let mut live_mirror = Mirror::new();
//! let report = Reconciler::reconcile(&mut vdom, &vmirror, &mut live, &mut live_mirror);
//! assert_eq!(report.created, 1);
//! ```

pub mod error;
pub mod reconcile;
pub mod vdom;

pub use error::{ReconcileError, Result};
pub use reconcile::{PatchReport, Reconciler};
pub use vdom::{VNode, VNodeData, VNodeKey, VirtualDom};
