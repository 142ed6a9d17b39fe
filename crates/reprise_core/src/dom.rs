//! Node mutation capability shared by every replay target.
//!
//! The Mutation Applier and Node Reconstructor are written once against
//! [`DomTree`]. A live document (the in-memory [`HostDocument`](crate::HostDocument)
//! or a browser binding) and the virtual tree both implement it.

use std::fmt::Debug;
use std::hash::Hash;

use crate::dialog::{DialogAdapter, DialogIntent, ModalState};
use crate::error::{CapabilityError, Result};

/// Kind of a node in a tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Document,
    DocumentType,
    Element,
    Text,
    Comment,
}

/// Structural and native operations a replay target exposes.
pub trait DomTree {
    /// Cheap handle to a node of this tree.
    type Node: Copy + Eq + Hash + Debug;

    /// The document node that owns the replayed content.
    fn document(&self) -> Self::Node;

    /// Drop every node below the document.
    fn clear_document(&mut self);

    /// Free detached subtrees in which `retain` matches no node. Returns
    /// the number of nodes freed.
    fn collect_detached(&mut self, _retain: &dyn Fn(Self::Node) -> bool) -> usize {
        0
    }

    fn create_element(&mut self, tag_name: &str, is_svg: bool) -> Self::Node;
    fn create_text(&mut self, text: &str) -> Self::Node;
    fn create_comment(&mut self, text: &str) -> Self::Node;
    fn create_doctype(&mut self, name: &str, public_id: &str, system_id: &str) -> Self::Node;

    /// `None` when the handle no longer refers to a node.
    fn node_kind(&self, node: Self::Node) -> Option<NodeKind>;

    /// Lowercase tag name of an element.
    fn tag_name(&self, node: Self::Node) -> Option<&str>;

    fn attribute(&self, node: Self::Node, name: &str) -> Option<&str>;
    fn attributes(&self, node: Self::Node) -> Vec<(&str, &str)>;
    fn set_attribute(&mut self, node: Self::Node, name: &str, value: &str) -> Result<()>;
    fn remove_attribute(&mut self, node: Self::Node, name: &str) -> Result<()>;

    /// Character data of a text or comment node.
    fn text(&self, node: Self::Node) -> Option<&str>;
    fn set_text(&mut self, node: Self::Node, value: &str) -> Result<()>;

    fn parent(&self, node: Self::Node) -> Option<Self::Node>;
    fn children(&self, node: Self::Node) -> &[Self::Node];

    /// Insert `child` under `parent` before `reference`, or append when
    /// `reference` is `None`. A child attached elsewhere is moved.
    fn insert_before(
        &mut self,
        parent: Self::Node,
        child: Self::Node,
        reference: Option<Self::Node>,
    ) -> Result<()>;

    fn remove_child(&mut self, parent: Self::Node, child: Self::Node) -> Result<()>;

    /// Whether `node` is attached below the document.
    fn is_connected(&self, node: Self::Node) -> bool {
        let document = self.document();
        let mut current = Some(node);
        while let Some(n) = current {
            if n == document {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    /// Native dialog state, `None` when the backend has no native dialogs.
    fn dialog_state(&self, _node: Self::Node) -> Option<ModalState> {
        None
    }

    /// Native `show()` / `showModal()`.
    fn show_dialog(&mut self, _node: Self::Node, _modal: bool) -> std::result::Result<(), CapabilityError> {
        Err(CapabilityError::Unsupported)
    }

    /// Elements in the native top layer, bottom first. Empty without native dialogs.
    fn top_layer_order(&self) -> Vec<Self::Node> {
        Vec::new()
    }

    /// Native `close()`.
    fn close_dialog(&mut self, _node: Self::Node) -> std::result::Result<(), CapabilityError> {
        Err(CapabilityError::Unsupported)
    }

    /// Scroll an element or the document.
    fn scroll_to(&mut self, _node: Self::Node, _x: f64, _y: f64) {}

    /// Route a dialog open-state intent.
    ///
    /// Live targets execute it through the [`DialogAdapter`]. Trees that
    /// batch work (the virtual tree) override this to record it instead.
    fn route_dialog_intent(&mut self, node: Self::Node, intent: DialogIntent) {
        DialogAdapter::transition(self, node, intent);
    }
}

/// Whether `node` is a `<dialog>` element.
pub fn is_dialog<T: DomTree + ?Sized>(tree: &T, node: T::Node) -> bool {
    tree.tag_name(node)
        .is_some_and(|tag| tag.eq_ignore_ascii_case("dialog"))
}

/// Collect `node` and all its descendants in document order.
pub fn subtree<T: DomTree + ?Sized>(tree: &T, node: T::Node) -> Vec<T::Node> {
    let mut out = Vec::new();
    let mut stack = vec![node];
    while let Some(current) = stack.pop() {
        out.push(current);
        stack.extend(tree.children(current).iter().rev().copied());
    }
    out
}
