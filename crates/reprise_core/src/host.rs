//! In-memory host document with native dialog behavior.
//!
//! `HostDocument` is the default render target for replay. It keeps a plain
//! node arena plus the state a browser keeps outside attributes: whether a
//! dialog is modal, the top layer stack, and scroll offsets. Native dialog
//! calls follow the HTML rules:
//!
//! - `show()` on a modal dialog and `showModal()` on a non-modal open dialog
//!   are invalid state errors
//! - `showModal()` requires a connected element
//! - removing `open` or detaching a dialog drops it from the top layer

use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::{new_key_type, SlotMap};

use crate::dialog::{ModalState, NativeCall};
use crate::dom::{is_dialog, DomTree, NodeKind};
use crate::error::{CapabilityError, DomError, Result};

new_key_type! {
    /// Handle to a node of a [`HostDocument`].
    pub struct HostNodeId;
}

/// Native features the host exposes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HostCapabilities {
    /// `show()`, `showModal()` and `close()` on dialogs.
    pub native_dialog: bool,
}

impl Default for HostCapabilities {
    fn default() -> Self {
        Self { native_dialog: true }
    }
}

impl HostCapabilities {
    /// A host without native dialog support.
    pub fn legacy() -> Self {
        Self {
            native_dialog: false,
        }
    }
}

#[derive(Clone, Debug)]
enum HostNodeData {
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
        modal: bool,
    },
    Text(String),
    Comment(String),
}

#[derive(Clone, Debug)]
struct HostNode {
    data: HostNodeData,
    parent: Option<HostNodeId>,
    children: Vec<HostNodeId>,
}

impl HostNode {
    fn new(data: HostNodeData) -> Self {
        Self {
            data,
            parent: None,
            children: Vec::new(),
        }
    }
}

/// Native dialog call recorded by the host, in call order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NativeCallRecord {
    pub node: HostNodeId,
    pub call: NativeCall,
}

/// Native calls kept in the journal before the oldest half is dropped.
pub const DEFAULT_CALL_LOG_CAPACITY: usize = 4096;

/// An in-memory document.
pub struct HostDocument {
    nodes: SlotMap<HostNodeId, HostNode>,
    document: HostNodeId,
    top_layer: Vec<HostNodeId>,
    scroll: FxHashMap<HostNodeId, (f64, f64)>,
    capabilities: HostCapabilities,
    native_calls: Vec<NativeCallRecord>,
    call_log_capacity: usize,
    calls_recorded: usize,
}

impl HostDocument {
    pub fn new() -> Self {
        Self::with_capabilities(HostCapabilities::default())
    }

    pub fn with_capabilities(capabilities: HostCapabilities) -> Self {
        let mut nodes = SlotMap::with_key();
        let document = nodes.insert(HostNode::new(HostNodeData::Document));
        Self {
            nodes,
            document,
            top_layer: Vec::new(),
            scroll: FxHashMap::default(),
            capabilities,
            native_calls: Vec::new(),
            call_log_capacity: DEFAULT_CALL_LOG_CAPACITY,
            calls_recorded: 0,
        }
    }

    /// Bound the native call journal. Zero disables it.
    pub fn with_call_log_capacity(mut self, capacity: usize) -> Self {
        self.call_log_capacity = capacity;
        self.native_calls.truncate(capacity);
        self
    }

    pub fn capabilities(&self) -> HostCapabilities {
        self.capabilities
    }

    /// Elements in the top layer, bottom first.
    pub fn top_layer(&self) -> &[HostNodeId] {
        &self.top_layer
    }

    /// Modal dialog currently painting the backdrop (topmost modal).
    pub fn backdrop_owner(&self) -> Option<HostNodeId> {
        self.top_layer.last().copied()
    }

    pub fn has_backdrop(&self) -> bool {
        !self.top_layer.is_empty()
    }

    pub fn scroll_offset(&self, node: HostNodeId) -> Option<(f64, f64)> {
        self.scroll.get(&node).copied()
    }

    /// The most recent native dialog calls, oldest first.
    pub fn native_calls(&self) -> &[NativeCallRecord] {
        &self.native_calls
    }

    /// Native calls executed since creation, including ones the journal dropped.
    pub fn native_call_count(&self) -> usize {
        self.calls_recorded
    }

    /// Calls executed after the journal counted `mark` calls, as far as it still holds them.
    pub fn native_calls_since(&self, mark: usize) -> &[NativeCallRecord] {
        let newer = self.calls_recorded.saturating_sub(mark);
        &self.native_calls[self.native_calls.len().saturating_sub(newer)..]
    }

    pub fn clear_native_calls(&mut self) {
        self.native_calls.clear();
    }

    /// Number of live nodes, the document included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// First element with the given `id` attribute, in document order.
    pub fn element_by_id(&self, id: &str) -> Option<HostNodeId> {
        crate::dom::subtree(self, self.document)
            .into_iter()
            .find(|&node| self.attribute(node, "id") == Some(id))
    }

    /// First element with the given tag name, in document order.
    pub fn first_element(&self, tag_name: &str) -> Option<HostNodeId> {
        crate::dom::subtree(self, self.document)
            .into_iter()
            .find(|&node| self.tag_name(node).is_some_and(|tag| tag.eq_ignore_ascii_case(tag_name)))
    }

    /// Name, public id and system id of a doctype node.
    pub fn doctype(&self, node: HostNodeId) -> Option<(&str, &str, &str)> {
        match &self.nodes.get(node)?.data {
            HostNodeData::DocumentType {
                name,
                public_id,
                system_id,
            } => Some((name.as_str(), public_id.as_str(), system_id.as_str())),
            _ => None,
        }
    }

    pub fn is_svg(&self, node: HostNodeId) -> bool {
        matches!(
            self.nodes.get(node).map(|n| &n.data),
            Some(HostNodeData::Element { is_svg: true, .. })
        )
    }

    /// Concatenated text of a subtree.
    pub fn text_content(&self, node: HostNodeId) -> String {
        crate::dom::subtree(self, node)
            .into_iter()
            .filter_map(|n| match &self.nodes.get(n)?.data {
                HostNodeData::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    fn element_mut(&mut self, node: HostNodeId) -> Result<(&mut IndexMap<String, String>, &mut bool)> {
        match self.nodes.get_mut(node).map(|n| &mut n.data) {
            Some(HostNodeData::Element {
                attributes, modal, ..
            }) => Ok((attributes, modal)),
            Some(_) => Err(DomError::WrongKind("element")),
            None => Err(DomError::MissingNode),
        }
    }

    fn is_modal(&self, node: HostNodeId) -> bool {
        matches!(
            self.nodes.get(node).map(|n| &n.data),
            Some(HostNodeData::Element { modal: true, .. })
        )
    }

    fn leave_top_layer(&mut self, node: HostNodeId) {
        self.top_layer.retain(|&n| n != node);
        if let Ok((_, modal)) = self.element_mut(node) {
            *modal = false;
        }
    }

    /// Dialog removing steps for every dialog in a detached subtree.
    fn detach_steps(&mut self, root: HostNodeId) {
        for node in crate::dom::subtree(self, root) {
            if self.is_modal(node) {
                self.leave_top_layer(node);
            }
        }
    }

    fn detach(&mut self, child: HostNodeId) {
        if let Some(parent) = self.nodes.get(child).and_then(|n| n.parent) {
            if let Some(p) = self.nodes.get_mut(parent) {
                p.children.retain(|&c| c != child);
            }
            if let Some(c) = self.nodes.get_mut(child) {
                c.parent = None;
            }
            self.detach_steps(child);
        }
    }

    fn record(&mut self, node: HostNodeId, call: NativeCall) {
        self.calls_recorded += 1;
        if self.call_log_capacity == 0 {
            return;
        }
        if self.native_calls.len() >= self.call_log_capacity {
            let drop = (self.call_log_capacity / 2).max(1);
            self.native_calls.drain(..drop);
        }
        self.native_calls.push(NativeCallRecord { node, call });
    }
}

impl Default for HostDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl DomTree for HostDocument {
    type Node = HostNodeId;

    fn document(&self) -> HostNodeId {
        self.document
    }

    fn clear_document(&mut self) {
        // Detached nodes are dropped too.
        let document = self.document;
        self.nodes.retain(|id, _| id == document);
        if let Some(doc) = self.nodes.get_mut(document) {
            doc.children.clear();
        }
        self.top_layer.clear();
        self.scroll.clear();
    }

    fn collect_detached(&mut self, retain: &dyn Fn(HostNodeId) -> bool) -> usize {
        let document = self.document;
        let roots: Vec<HostNodeId> = self
            .nodes
            .iter()
            .filter(|(id, node)| *id != document && node.parent.is_none())
            .map(|(id, _)| id)
            .collect();

        let mut garbage = FxHashSet::default();
        for root in roots {
            let nodes = crate::dom::subtree(self, root);
            if !nodes.iter().any(|&n| retain(n)) {
                garbage.extend(nodes);
            }
        }
        if garbage.is_empty() {
            return 0;
        }
        self.nodes.retain(|id, _| !garbage.contains(&id));
        self.scroll.retain(|id, _| !garbage.contains(id));
        garbage.len()
    }

    fn create_element(&mut self, tag_name: &str, is_svg: bool) -> HostNodeId {
        let tag_name = if is_svg {
            tag_name.to_string()
        } else {
            tag_name.to_ascii_lowercase()
        };
        self.nodes.insert(HostNode::new(HostNodeData::Element {
            tag_name,
            is_svg,
            attributes: IndexMap::new(),
            modal: false,
        }))
    }

    fn create_text(&mut self, text: &str) -> HostNodeId {
        self.nodes.insert(HostNode::new(HostNodeData::Text(text.to_string())))
    }

    fn create_comment(&mut self, text: &str) -> HostNodeId {
        self.nodes.insert(HostNode::new(HostNodeData::Comment(text.to_string())))
    }

    fn create_doctype(&mut self, name: &str, public_id: &str, system_id: &str) -> HostNodeId {
        self.nodes.insert(HostNode::new(HostNodeData::DocumentType {
            name: name.to_string(),
            public_id: public_id.to_string(),
            system_id: system_id.to_string(),
        }))
    }

    fn node_kind(&self, node: HostNodeId) -> Option<NodeKind> {
        self.nodes.get(node).map(|n| match n.data {
            HostNodeData::Document => NodeKind::Document,
            HostNodeData::DocumentType { .. } => NodeKind::DocumentType,
            HostNodeData::Element { .. } => NodeKind::Element,
            HostNodeData::Text(_) => NodeKind::Text,
            HostNodeData::Comment(_) => NodeKind::Comment,
        })
    }

    fn tag_name(&self, node: HostNodeId) -> Option<&str> {
        match &self.nodes.get(node)?.data {
            HostNodeData::Element { tag_name, .. } => Some(tag_name.as_str()),
            _ => None,
        }
    }

    fn attribute(&self, node: HostNodeId, name: &str) -> Option<&str> {
        match &self.nodes.get(node)?.data {
            HostNodeData::Element { attributes, .. } => attributes.get(name).map(String::as_str),
            _ => None,
        }
    }

    fn attributes(&self, node: HostNodeId) -> Vec<(&str, &str)> {
        match self.nodes.get(node).map(|n| &n.data) {
            Some(HostNodeData::Element { attributes, .. }) => attributes
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect(),
            _ => Vec::new(),
        }
    }

    fn set_attribute(&mut self, node: HostNodeId, name: &str, value: &str) -> Result<()> {
        let (attributes, _) = self.element_mut(node)?;
        attributes.insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn remove_attribute(&mut self, node: HostNodeId, name: &str) -> Result<()> {
        let (attributes, _) = self.element_mut(node)?;
        let removed = attributes.shift_remove(name).is_some();
        if removed && name == "open" && self.is_modal(node) {
            self.leave_top_layer(node);
        }
        Ok(())
    }

    fn text(&self, node: HostNodeId) -> Option<&str> {
        match &self.nodes.get(node)?.data {
            HostNodeData::Text(text) | HostNodeData::Comment(text) => Some(text.as_str()),
            _ => None,
        }
    }

    fn set_text(&mut self, node: HostNodeId, value: &str) -> Result<()> {
        match self.nodes.get_mut(node).map(|n| &mut n.data) {
            Some(HostNodeData::Text(text) | HostNodeData::Comment(text)) => {
                value.clone_into(text);
                Ok(())
            }
            Some(_) => Err(DomError::WrongKind("character data")),
            None => Err(DomError::MissingNode),
        }
    }

    fn parent(&self, node: HostNodeId) -> Option<HostNodeId> {
        self.nodes.get(node)?.parent
    }

    fn children(&self, node: HostNodeId) -> &[HostNodeId] {
        self.nodes
            .get(node)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    fn insert_before(
        &mut self,
        parent: HostNodeId,
        child: HostNodeId,
        reference: Option<HostNodeId>,
    ) -> Result<()> {
        match self.nodes.get(parent).map(|n| &n.data) {
            Some(HostNodeData::Document | HostNodeData::Element { .. }) => {}
            Some(_) => return Err(DomError::NotAContainer(format!("{:?}", self.node_kind(parent)))),
            None => return Err(DomError::MissingNode),
        }
        if !self.nodes.contains_key(child) {
            return Err(DomError::MissingNode);
        }
        // No cycles: parent must not be inside child's subtree.
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

    fn remove_child(&mut self, parent: HostNodeId, child: HostNodeId) -> Result<()> {
        if self.parent(child) != Some(parent) {
            return Err(DomError::NotAChild);
        }
        self.detach(child);
        Ok(())
    }

    fn dialog_state(&self, node: HostNodeId) -> Option<ModalState> {
        if !self.capabilities.native_dialog || !is_dialog(self, node) {
            return None;
        }
        Some(if self.is_modal(node) {
            ModalState::ShownModal
        } else {
            ModalState::from_open_attribute(self.attribute(node, "open").is_some())
        })
    }

    fn show_dialog(&mut self, node: HostNodeId, modal: bool) -> std::result::Result<(), CapabilityError> {
        if !self.capabilities.native_dialog || !is_dialog(self, node) {
            return Err(CapabilityError::Unsupported);
        }
        let open = self.attribute(node, "open").is_some();
        let is_modal = self.is_modal(node);

        if modal {
            if open && is_modal {
                return Ok(());
            }
            if open {
                return Err(CapabilityError::InvalidState(
                    "showModal() on a dialog that is already open non-modally",
                ));
            }
            if !self.is_connected(node) {
                return Err(CapabilityError::InvalidState("showModal() on a disconnected dialog"));
            }
            let (attributes, modal_flag) = self.element_mut(node)?;
            attributes.insert("open".to_string(), String::new());
            *modal_flag = true;
            self.top_layer.push(node);
            self.record(node, NativeCall::ShowModal);
        } else {
            if open && !is_modal {
                return Ok(());
            }
            if open {
                return Err(CapabilityError::InvalidState("show() on a modal dialog"));
            }
            let (attributes, _) = self.element_mut(node)?;
            attributes.insert("open".to_string(), String::new());
            self.record(node, NativeCall::Show);
        }
        Ok(())
    }

    fn top_layer_order(&self) -> Vec<HostNodeId> {
        self.top_layer.clone()
    }

    fn close_dialog(&mut self, node: HostNodeId) -> std::result::Result<(), CapabilityError> {
        if !self.capabilities.native_dialog || !is_dialog(self, node) {
            return Err(CapabilityError::Unsupported);
        }
        if self.attribute(node, "open").is_none() {
            return Ok(());
        }
        let (attributes, _) = self.element_mut(node)?;
        attributes.shift_remove("open");
        self.leave_top_layer(node);
        self.record(node, NativeCall::Close);
        Ok(())
    }

    fn scroll_to(&mut self, node: HostNodeId, x: f64, y: f64) {
        if self.nodes.contains_key(node) {
            self.scroll.insert(node, (x, y));
        }
    }
}
