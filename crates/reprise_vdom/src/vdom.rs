//! Virtual tree that absorbs mutations between presented frames.
//!
//! Mutations are applied here with the same applier as a live document.
//! Dialog open-state changes are not executed: the intent is recorded on the
//! node and the virtual modal state advances through the adapter's plan, so
//! the reconciler can later issue only the calls needed to reach the final
//! state.

use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use tracing::trace;

use reprise_core::dialog::{DialogAdapter, DialogIntent, ModalState};
use reprise_core::dom::{is_dialog, subtree, DomTree, NodeKind};
use reprise_core::error::{DomError, Result};

new_key_type! {
    /// Handle to a node of a [`VirtualDom`].
    pub struct VNodeKey;
}

/// Payload of a virtual node.
#[derive(Clone, Debug, PartialEq)]
pub enum VNodeData {
    Document,
    DocumentType {
        name: String,
        public_id: String,
        system_id: String,
    },
    Element {
        tag_name: String,
        is_svg: bool,
        attributes: IndexMap<String, String>,
    },
    Text(String),
    Comment(String),
}

impl VNodeData {
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Document => NodeKind::Document,
            Self::DocumentType { .. } => NodeKind::DocumentType,
            Self::Element { .. } => NodeKind::Element,
            Self::Text(_) => NodeKind::Text,
            Self::Comment(_) => NodeKind::Comment,
        }
    }
}

/// A node of the virtual tree.
#[derive(Clone, Debug)]
pub struct VNode {
    pub data: VNodeData,
    pub parent: Option<VNodeKey>,
    pub children: Vec<VNodeKey>,
    /// Open state of a dialog as of the last recorded intent.
    pub modal: ModalState,
    /// Dialog intents recorded since the last reconcile, in order.
    pub pending: SmallVec<[DialogIntent; 2]>,
    /// Sequence number of the last pending intent that entered the top layer.
    pub entered_top_layer_at: Option<u64>,
}

impl VNode {
    fn new(data: VNodeData) -> Self {
        Self {
            data,
            parent: None,
            children: Vec::new(),
            modal: ModalState::Closed,
            pending: SmallVec::new(),
            entered_top_layer_at: None,
        }
    }
}

/// Arena-backed virtual document.
#[derive(Clone, Debug)]
pub struct VirtualDom {
    nodes: SlotMap<VNodeKey, VNode>,
    document: VNodeKey,
    pending_dialogs: Vec<VNodeKey>,
    intent_seq: u64,
}

impl VirtualDom {
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let document = nodes.insert(VNode::new(VNodeData::Document));
        Self {
            nodes,
            document,
            pending_dialogs: Vec::new(),
            intent_seq: 0,
        }
    }

    pub fn node(&self, key: VNodeKey) -> Option<&VNode> {
        self.nodes.get(key)
    }

    /// Virtual open state of a dialog.
    pub fn modal_state(&self, key: VNodeKey) -> ModalState {
        self.nodes.get(key).map(|n| n.modal).unwrap_or_default()
    }

    /// Intents recorded for `key` since the last [`clear_pending`](Self::clear_pending).
    pub fn pending_intents(&self, key: VNodeKey) -> &[DialogIntent] {
        self.nodes.get(key).map(|n| n.pending.as_slice()).unwrap_or(&[])
    }

    /// When `key` last entered the top layer through a pending intent.
    /// Later entries sit higher in the top layer.
    pub fn top_layer_entry(&self, key: VNodeKey) -> Option<u64> {
        self.nodes.get(key).and_then(|n| n.entered_top_layer_at)
    }

    pub fn has_pending(&self) -> bool {
        !self.pending_dialogs.is_empty()
    }

    pub fn clear_pending(&mut self) {
        for key in self.pending_dialogs.drain(..) {
            if let Some(node) = self.nodes.get_mut(key) {
                node.pending.clear();
                node.entered_top_layer_at = None;
            }
        }
    }

    /// Doctype fields `(name, public_id, system_id)`.
    pub fn doctype(&self, key: VNodeKey) -> Option<(&str, &str, &str)> {
        match &self.nodes.get(key)?.data {
            VNodeData::DocumentType {
                name,
                public_id,
                system_id,
            } => Some((name.as_str(), public_id.as_str(), system_id.as_str())),
            _ => None,
        }
    }

    pub fn is_svg(&self, key: VNodeKey) -> bool {
        matches!(
            self.nodes.get(key).map(|n| &n.data),
            Some(VNodeData::Element { is_svg: true, .. })
        )
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn insert(&mut self, data: VNodeData) -> VNodeKey {
        self.nodes.insert(VNode::new(data))
    }

    fn attributes_mut(&mut self, key: VNodeKey) -> Result<&mut IndexMap<String, String>> {
        match self.nodes.get_mut(key).map(|n| &mut n.data) {
            Some(VNodeData::Element { attributes, .. }) => Ok(attributes),
            Some(_) => Err(DomError::WrongKind("element")),
            None => Err(DomError::MissingNode),
        }
    }

    fn detach(&mut self, child: VNodeKey) {
        let Some(parent) = self.nodes.get_mut(child).and_then(|c| c.parent.take()) else {
            return;
        };
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.retain(|&c| c != child);
        }
        self.detach_steps(child);
    }

    /// A detached modal dialog leaves the top layer but stays open. Intents
    /// recorded before the detach no longer describe a reachable state.
    fn detach_steps(&mut self, root: VNodeKey) {
        for key in subtree(self, root) {
            if let Some(node) = self.nodes.get_mut(key) {
                if node.modal.is_modal() {
                    node.modal = ModalState::Shown;
                    node.pending.clear();
                    node.entered_top_layer_at = None;
                }
            }
        }
    }

    /// Keep the `open` attribute of a dialog in line with its modal state.
    fn sync_open_attribute(&mut self, key: VNodeKey) {
        let open = self.modal_state(key).is_open();
        if let Ok(attributes) = self.attributes_mut(key) {
            if open {
                attributes.entry("open".to_string()).or_default();
            } else {
                attributes.shift_remove("open");
            }
        }
    }
}

impl Default for VirtualDom {
    fn default() -> Self {
        Self::new()
    }
}

impl DomTree for VirtualDom {
    type Node = VNodeKey;

    fn document(&self) -> VNodeKey {
        self.document
    }

    fn clear_document(&mut self) {
        let document = self.document;
        self.nodes.retain(|key, _| key == document);
        if let Some(doc) = self.nodes.get_mut(document) {
            doc.children.clear();
        }
        self.pending_dialogs.clear();
    }

    fn collect_detached(&mut self, retain: &dyn Fn(VNodeKey) -> bool) -> usize {
        let document = self.document;
        let roots: Vec<VNodeKey> = self
            .nodes
            .iter()
            .filter(|(key, node)| *key != document && node.parent.is_none())
            .map(|(key, _)| key)
            .collect();

        let mut garbage = FxHashSet::default();
        for root in roots {
            let nodes = subtree(self, root);
            if !nodes.iter().any(|&n| retain(n)) {
                garbage.extend(nodes);
            }
        }
        if garbage.is_empty() {
            return 0;
        }
        self.nodes.retain(|key, _| !garbage.contains(&key));
        self.pending_dialogs.retain(|key| !garbage.contains(key));
        garbage.len()
    }

    fn create_element(&mut self, tag_name: &str, is_svg: bool) -> VNodeKey {
        let tag_name = if is_svg {
            tag_name.to_string()
        } else {
            tag_name.to_ascii_lowercase()
        };
        self.insert(VNodeData::Element {
            tag_name,
            is_svg,
            attributes: IndexMap::new(),
        })
    }

    fn create_text(&mut self, text: &str) -> VNodeKey {
        self.insert(VNodeData::Text(text.to_string()))
    }

    fn create_comment(&mut self, text: &str) -> VNodeKey {
        self.insert(VNodeData::Comment(text.to_string()))
    }

    fn create_doctype(&mut self, name: &str, public_id: &str, system_id: &str) -> VNodeKey {
        self.insert(VNodeData::DocumentType {
            name: name.to_string(),
            public_id: public_id.to_string(),
            system_id: system_id.to_string(),
        })
    }

    fn node_kind(&self, node: VNodeKey) -> Option<NodeKind> {
        self.nodes.get(node).map(|n| n.data.kind())
    }

    fn tag_name(&self, node: VNodeKey) -> Option<&str> {
        match &self.nodes.get(node)?.data {
            VNodeData::Element { tag_name, .. } => Some(tag_name.as_str()),
            _ => None,
        }
    }

    fn attribute(&self, node: VNodeKey, name: &str) -> Option<&str> {
        match &self.nodes.get(node)?.data {
            VNodeData::Element { attributes, .. } => attributes.get(name).map(String::as_str),
            _ => None,
        }
    }

    fn attributes(&self, node: VNodeKey) -> Vec<(&str, &str)> {
        match self.nodes.get(node).map(|n| &n.data) {
            Some(VNodeData::Element { attributes, .. }) => attributes
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect(),
            _ => Vec::new(),
        }
    }

    fn set_attribute(&mut self, node: VNodeKey, name: &str, value: &str) -> Result<()> {
        self.attributes_mut(node)?
            .insert(name.to_string(), value.to_string());
        // Snapshot builds set `open` directly; that is a resting non-modal state.
        if name == "open" && is_dialog(self, node) {
            if let Some(n) = self.nodes.get_mut(node) {
                if !n.modal.is_open() {
                    n.modal = ModalState::Shown;
                }
            }
        }
        Ok(())
    }

    fn remove_attribute(&mut self, node: VNodeKey, name: &str) -> Result<()> {
        self.attributes_mut(node)?.shift_remove(name);
        if name == "open" {
            if let Some(n) = self.nodes.get_mut(node) {
                n.modal = ModalState::Closed;
            }
        }
        Ok(())
    }

    fn text(&self, node: VNodeKey) -> Option<&str> {
        match &self.nodes.get(node)?.data {
            VNodeData::Text(text) | VNodeData::Comment(text) => Some(text.as_str()),
            _ => None,
        }
    }

    fn set_text(&mut self, node: VNodeKey, value: &str) -> Result<()> {
        match self.nodes.get_mut(node).map(|n| &mut n.data) {
            Some(VNodeData::Text(text) | VNodeData::Comment(text)) => {
                value.clone_into(text);
                Ok(())
            }
            Some(_) => Err(DomError::WrongKind("character data")),
            None => Err(DomError::MissingNode),
        }
    }

    fn parent(&self, node: VNodeKey) -> Option<VNodeKey> {
        self.nodes.get(node)?.parent
    }

    fn children(&self, node: VNodeKey) -> &[VNodeKey] {
        self.nodes
            .get(node)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    fn insert_before(
        &mut self,
        parent: VNodeKey,
        child: VNodeKey,
        reference: Option<VNodeKey>,
    ) -> Result<()> {
        match self.nodes.get(parent).map(|n| &n.data) {
            Some(VNodeData::Document | VNodeData::Element { .. }) => {}
            Some(other) => return Err(DomError::NotAContainer(format!("{:?}", other.kind()))),
            None => return Err(DomError::MissingNode),
        }
        if !self.nodes.contains_key(child) {
            return Err(DomError::MissingNode);
        }
        let mut ancestor = Some(parent);
        while let Some(a) = ancestor {
            if a == child {
                return Err(DomError::HierarchyRequest);
            }
            ancestor = self.parent(a);
        }
        if reference == Some(child) {
            return Ok(());
        }
        if let Some(r) = reference {
            if self.parent(r) != Some(parent) {
                return Err(DomError::NotAChild);
            }
        }

        self.detach(child);
        let position = reference
            .and_then(|r| self.children(parent).iter().position(|&c| c == r))
            .unwrap_or_else(|| self.children(parent).len());
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.insert(position, child);
        }
        if let Some(c) = self.nodes.get_mut(child) {
            c.parent = Some(parent);
        }
        Ok(())
    }

    fn remove_child(&mut self, parent: VNodeKey, child: VNodeKey) -> Result<()> {
        if self.parent(child) != Some(parent) {
            return Err(DomError::NotAChild);
        }
        self.detach(child);
        Ok(())
    }

    fn dialog_state(&self, node: VNodeKey) -> Option<ModalState> {
        is_dialog(self, node).then(|| self.modal_state(node))
    }

    fn route_dialog_intent(&mut self, node: VNodeKey, intent: DialogIntent) {
        let Some(n) = self.nodes.get_mut(node) else {
            return;
        };
        let plan = DialogAdapter::plan(n.modal, intent);
        trace!(?node, from = ?n.modal, ?intent, next = ?plan.next, "recording dialog intent");
        self.intent_seq += 1;
        n.modal = plan.next;
        if plan.enters_top_layer() {
            n.entered_top_layer_at = Some(self.intent_seq);
        }
        if n.pending.is_empty() {
            self.pending_dialogs.push(node);
        }
        n.pending.push(intent);
        self.sync_open_attribute(node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reprise_core::events::DialogDirective;

    fn dialog(vdom: &mut VirtualDom) -> VNodeKey {
        let d = vdom.create_element("dialog", false);
        let root = vdom.document();
        vdom.insert_before(root, d, None).unwrap();
        d
    }

    #[test]
    fn test_intents_are_recorded_not_executed() {
        let mut vdom = VirtualDom::new();
        let d = dialog(&mut vdom);

        vdom.route_dialog_intent(d, DialogIntent::Directive(DialogDirective::ShowModal));
        assert_eq!(vdom.modal_state(d), ModalState::ShownModal);
        assert_eq!(vdom.attribute(d, "open"), Some(""));
        assert!(vdom.has_pending());

        vdom.route_dialog_intent(d, DialogIntent::Directive(DialogDirective::Close));
        assert_eq!(vdom.modal_state(d), ModalState::Closed);
        assert_eq!(vdom.attribute(d, "open"), None);
        assert_eq!(vdom.pending_intents(d).len(), 2);

        vdom.clear_pending();
        assert!(!vdom.has_pending());
        assert!(vdom.pending_intents(d).is_empty());
    }

    #[test]
    fn test_open_attribute_tracks_resting_state() {
        let mut vdom = VirtualDom::new();
        let d = dialog(&mut vdom);
        vdom.set_attribute(d, "open", "").unwrap();
        assert_eq!(vdom.dialog_state(d), Some(ModalState::Shown));
        vdom.remove_attribute(d, "open").unwrap();
        assert_eq!(vdom.dialog_state(d), Some(ModalState::Closed));
        assert!(!vdom.has_pending());
    }

    #[test]
    fn test_detaching_modal_dialog_demotes_it() {
        let mut vdom = VirtualDom::new();
        let d = dialog(&mut vdom);
        vdom.route_dialog_intent(d, DialogIntent::Directive(DialogDirective::ShowModal));

        let root = vdom.document();
        vdom.remove_child(root, d).unwrap();
        assert_eq!(vdom.modal_state(d), ModalState::Shown);
        assert!(vdom.pending_intents(d).is_empty());
        assert_eq!(vdom.attribute(d, "open"), Some(""));
    }

    #[test]
    fn test_top_layer_entries_follow_recording_order() {
        let mut vdom = VirtualDom::new();
        let first = dialog(&mut vdom);
        let second = dialog(&mut vdom);

        vdom.route_dialog_intent(second, DialogIntent::Directive(DialogDirective::ShowModal));
        vdom.route_dialog_intent(first, DialogIntent::Directive(DialogDirective::ShowModal));
        assert!(vdom.top_layer_entry(second) < vdom.top_layer_entry(first));

        // Staying modal is not a new entry.
        let before = vdom.top_layer_entry(second);
        vdom.route_dialog_intent(second, DialogIntent::AttributeAdded);
        assert_eq!(vdom.top_layer_entry(second), before);

        vdom.clear_pending();
        assert_eq!(vdom.top_layer_entry(first), None);
    }

    #[test]
    fn test_collect_detached() {
        let mut vdom = VirtualDom::new();
        let root = vdom.document();
        let kept = vdom.create_element("div", false);
        vdom.insert_before(root, kept, None).unwrap();
        let orphan = vdom.create_element("p", false);
        let orphan_text = vdom.create_text("x");
        vdom.insert_before(orphan, orphan_text, None).unwrap();

        assert_eq!(vdom.collect_detached(&|node| node == orphan_text), 0);
        assert_eq!(vdom.collect_detached(&|_| false), 2);
        assert_eq!(vdom.node_count(), 2);
        assert!(vdom.node(kept).is_some());
    }

    #[test]
    fn test_structure() {
        let mut vdom = VirtualDom::new();
        let root = vdom.document();
        let a = vdom.create_element("DIV", false);
        let b = vdom.create_text("b");
        vdom.insert_before(root, a, None).unwrap();
        vdom.insert_before(a, b, None).unwrap();

        assert_eq!(vdom.tag_name(a), Some("div"));
        assert!(matches!(vdom.insert_before(b, a, None), Err(DomError::NotAContainer(_))));
        assert_eq!(vdom.insert_before(a, root, None), Err(DomError::HierarchyRequest));

        vdom.remove_child(a, b).unwrap();
        assert!(vdom.children(a).is_empty());
        vdom.clear_document();
        assert_eq!(vdom.node_count(), 1);
    }
}
