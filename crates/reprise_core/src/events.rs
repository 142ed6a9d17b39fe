//! Recorded event model.
//!
//! A recording is a flat list of [`Event`]s. Each event carries a timestamp
//! (milliseconds) and one of:
//!
//! - a full snapshot of the document ([`EventData::FullSnapshot`])
//! - an incremental record ([`EventData::Incremental`]), most importantly a
//!   [`MutationBatch`] of DOM mutations
//! - metadata and lifecycle markers that carry no DOM change
//!
//! Events serialize to JSON with serde so recordings can be loaded from disk.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Attribute used by older recorders to carry the dialog open mode.
pub const LEGACY_OPEN_MODE_ATTRIBUTE: &str = "rr_open_mode";

/// Recorded node identity, unique within one snapshot's lifetime.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub i32);

impl NodeId {
    pub fn new(id: i32) -> Self {
        Self(id)
    }

    pub fn get(self) -> i32 {
        self.0
    }
}

impl From<i32> for NodeId {
    fn from(id: i32) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Timestamp in milliseconds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub const fn zero() -> Self {
        Self(0)
    }

    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    pub const fn as_millis(self) -> i64 {
        self.0
    }

    /// Milliseconds elapsed since `earlier`, saturating at zero.
    pub fn saturating_since(self, earlier: Timestamp) -> u64 {
        self.0.saturating_sub(earlier.0).max(0) as u64
    }

    pub fn saturating_add_millis(self, millis: u64) -> Self {
        Self(self.0.saturating_add(millis.min(i64::MAX as u64) as i64))
    }
}

impl From<i64> for Timestamp {
    fn from(millis: i64) -> Self {
        Self(millis)
    }
}

impl From<i32> for Timestamp {
    fn from(millis: i32) -> Self {
        Self(i64::from(millis))
    }
}

/// One recorded event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub timestamp: Timestamp,
    pub data: EventData,
}

impl Event {
    pub fn new(timestamp: impl Into<Timestamp>, data: EventData) -> Self {
        Self {
            timestamp: timestamp.into(),
            data,
        }
    }

    /// Full snapshot event rooted at `node`.
    pub fn full_snapshot(timestamp: impl Into<Timestamp>, node: SerializedNode) -> Self {
        Self::new(
            timestamp,
            EventData::FullSnapshot {
                node,
                initial_offset: ScrollOffset::default(),
            },
        )
    }

    /// Incremental event holding one mutation batch.
    pub fn mutations(timestamp: impl Into<Timestamp>, mutations: Vec<IncrementalMutation>) -> Self {
        Self::new(
            timestamp,
            EventData::Incremental(IncrementalData::Mutation(MutationBatch { mutations })),
        )
    }

    pub fn meta(timestamp: impl Into<Timestamp>, href: &str, width: u32, height: u32) -> Self {
        Self::new(
            timestamp,
            EventData::Meta {
                href: href.to_string(),
                width,
                height,
            },
        )
    }

    pub fn is_full_snapshot(&self) -> bool {
        matches!(self.data, EventData::FullSnapshot { .. })
    }

    pub fn is_incremental(&self) -> bool {
        matches!(self.data, EventData::Incremental(_))
    }

    /// Rewrite legacy `rr_open_mode` attributes into explicit dialog state.
    ///
    /// Snapshot elements get their `open_mode` field set, attribute
    /// mutations become directives on the `open` attribute. The legacy
    /// attribute never reaches a tree.
    pub fn normalize_legacy_open_mode(&mut self) {
        match &mut self.data {
            EventData::FullSnapshot { node, .. } => node.normalize_legacy_open_mode(),
            EventData::Incremental(IncrementalData::Mutation(batch)) => {
                batch.normalize_legacy_open_mode()
            }
            _ => {}
        }
    }
}

/// Payload of a recorded event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventData {
    DomContentLoaded,
    Load,
    FullSnapshot {
        node: SerializedNode,
        #[serde(default)]
        initial_offset: ScrollOffset,
    },
    Incremental(IncrementalData),
    Meta {
        #[serde(default)]
        href: String,
        width: u32,
        height: u32,
    },
    Custom {
        tag: String,
        #[serde(default)]
        payload: serde_json::Value,
    },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrollOffset {
    pub top: f64,
    pub left: f64,
}

/// Incremental record, tagged by recording source.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum IncrementalData {
    Mutation(MutationBatch),
    Input {
        id: NodeId,
        text: String,
        #[serde(default)]
        is_checked: Option<bool>,
    },
    Scroll {
        id: NodeId,
        x: f64,
        y: f64,
    },
    /// Interaction sources (mouse, touch, viewport) with no DOM effect.
    Other {
        #[serde(default)]
        kind: String,
    },
}

/// Ordered list of mutations observed together.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MutationBatch {
    pub mutations: Vec<IncrementalMutation>,
}

impl MutationBatch {
    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    fn normalize_legacy_open_mode(&mut self) {
        let mut normalized: Vec<IncrementalMutation> = Vec::with_capacity(self.mutations.len());
        for mutation in self.mutations.drain(..) {
            match mutation {
                IncrementalMutation::Attribute {
                    target_id,
                    name,
                    value,
                    ..
                } if name == LEGACY_OPEN_MODE_ATTRIBUTE => {
                    let Some(mode) = value.as_deref().and_then(OpenMode::from_legacy_value) else {
                        continue;
                    };
                    let directive = mode.directive();
                    // Attach to an `open` mutation of the same target if one was recorded.
                    let paired = normalized.iter_mut().rev().find_map(|m| match m {
                        IncrementalMutation::Attribute {
                            target_id: t,
                            name: n,
                            value: Some(_),
                            directive: d,
                        } if *t == target_id && n.as_str() == "open" => Some(d),
                        _ => None,
                    });
                    match paired {
                        Some(slot) => *slot = Some(directive),
                        None => normalized.push(IncrementalMutation::Attribute {
                            target_id,
                            name: "open".to_string(),
                            value: Some(String::new()),
                            directive: Some(directive),
                        }),
                    }
                }
                IncrementalMutation::ChildList {
                    target_id,
                    mut added,
                    removed,
                } => {
                    for addition in &mut added {
                        addition.node.normalize_legacy_open_mode();
                    }
                    normalized.push(IncrementalMutation::ChildList {
                        target_id,
                        added,
                        removed,
                    });
                }
                other => normalized.push(other),
            }
        }
        self.mutations = normalized;
    }
}

/// One recorded DOM change.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IncrementalMutation {
    /// `value: None` means the attribute was removed.
    Attribute {
        target_id: NodeId,
        name: String,
        #[serde(default)]
        value: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        directive: Option<DialogDirective>,
    },
    Text {
        target_id: NodeId,
        value: String,
    },
    ChildList {
        target_id: NodeId,
        #[serde(default)]
        added: Vec<AddedNode>,
        #[serde(default)]
        removed: Vec<NodeId>,
    },
}

impl IncrementalMutation {
    pub fn set_attribute(target: i32, name: &str, value: &str) -> Self {
        Self::Attribute {
            target_id: NodeId(target),
            name: name.to_string(),
            value: Some(value.to_string()),
            directive: None,
        }
    }

    pub fn remove_attribute(target: i32, name: &str) -> Self {
        Self::Attribute {
            target_id: NodeId(target),
            name: name.to_string(),
            value: None,
            directive: None,
        }
    }

    /// `open` attribute mutation carrying an explicit dialog directive.
    pub fn dialog(target: i32, directive: DialogDirective) -> Self {
        let value = match directive {
            DialogDirective::Close => None,
            DialogDirective::Show | DialogDirective::ShowModal => Some(String::new()),
        };
        Self::Attribute {
            target_id: NodeId(target),
            name: "open".to_string(),
            value,
            directive: Some(directive),
        }
    }

    pub fn text(target: i32, value: &str) -> Self {
        Self::Text {
            target_id: NodeId(target),
            value: value.to_string(),
        }
    }

    pub fn append(target: i32, node: SerializedNode) -> Self {
        Self::ChildList {
            target_id: NodeId(target),
            added: vec![AddedNode {
                node,
                next_sibling_id: None,
            }],
            removed: Vec::new(),
        }
    }

    pub fn insert_before(target: i32, node: SerializedNode, next_sibling: i32) -> Self {
        Self::ChildList {
            target_id: NodeId(target),
            added: vec![AddedNode {
                node,
                next_sibling_id: Some(NodeId(next_sibling)),
            }],
            removed: Vec::new(),
        }
    }

    pub fn remove(target: i32, removed: &[i32]) -> Self {
        Self::ChildList {
            target_id: NodeId(target),
            added: Vec::new(),
            removed: removed.iter().copied().map(NodeId).collect(),
        }
    }

    pub fn target_id(&self) -> NodeId {
        match self {
            Self::Attribute { target_id, .. }
            | Self::Text { target_id, .. }
            | Self::ChildList { target_id, .. } => *target_id,
        }
    }
}

/// Node added by a child-list mutation. `next_sibling_id: None` appends.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AddedNode {
    pub node: SerializedNode,
    #[serde(default)]
    pub next_sibling_id: Option<NodeId>,
}

/// Imperative dialog call recorded alongside an attribute mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogDirective {
    Show,
    ShowModal,
    Close,
}

/// Resting open mode of a dialog captured in a snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenMode {
    Modal,
    NonModal,
}

impl OpenMode {
    pub fn from_legacy_value(value: &str) -> Option<Self> {
        match value {
            "modal" => Some(Self::Modal),
            "non-modal" => Some(Self::NonModal),
            _ => None,
        }
    }

    pub fn directive(self) -> DialogDirective {
        match self {
            Self::Modal => DialogDirective::ShowModal,
            Self::NonModal => DialogDirective::Show,
        }
    }
}

/// A serialized node with its recorded id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SerializedNode {
    pub id: NodeId,
    #[serde(flatten)]
    pub data: SerializedData,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node_type", rename_all = "snake_case")]
pub enum SerializedData {
    Document {
        #[serde(default)]
        children: Vec<SerializedNode>,
    },
    DocumentType {
        name: String,
        #[serde(default)]
        public_id: String,
        #[serde(default)]
        system_id: String,
    },
    Element {
        tag_name: String,
        #[serde(default)]
        attributes: IndexMap<String, String>,
        #[serde(default)]
        children: Vec<SerializedNode>,
        #[serde(default)]
        is_svg: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        open_mode: Option<OpenMode>,
    },
    Text {
        text_content: String,
    },
    Comment {
        text_content: String,
    },
    CData,
}

impl SerializedNode {
    pub fn document(id: i32, children: Vec<SerializedNode>) -> Self {
        Self {
            id: NodeId(id),
            data: SerializedData::Document { children },
        }
    }

    pub fn doctype(id: i32, name: &str) -> Self {
        Self {
            id: NodeId(id),
            data: SerializedData::DocumentType {
                name: name.to_string(),
                public_id: String::new(),
                system_id: String::new(),
            },
        }
    }

    pub fn element(id: i32, tag_name: &str) -> Self {
        Self {
            id: NodeId(id),
            data: SerializedData::Element {
                tag_name: tag_name.to_string(),
                attributes: IndexMap::new(),
                children: Vec::new(),
                is_svg: false,
                open_mode: None,
            },
        }
    }

    pub fn text(id: i32, text: &str) -> Self {
        Self {
            id: NodeId(id),
            data: SerializedData::Text {
                text_content: text.to_string(),
            },
        }
    }

    pub fn comment(id: i32, text: &str) -> Self {
        Self {
            id: NodeId(id),
            data: SerializedData::Comment {
                text_content: text.to_string(),
            },
        }
    }

    /// Add an attribute (elements only).
    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        if let SerializedData::Element { attributes, .. } = &mut self.data {
            attributes.insert(name.to_string(), value.to_string());
        }
        self
    }

    /// Append a child (documents and elements only).
    pub fn with_child(mut self, child: SerializedNode) -> Self {
        match &mut self.data {
            SerializedData::Document { children } | SerializedData::Element { children, .. } => {
                children.push(child)
            }
            _ => {}
        }
        self
    }

    pub fn with_children(self, children: impl IntoIterator<Item = SerializedNode>) -> Self {
        children.into_iter().fold(self, |node, child| node.with_child(child))
    }

    /// Mark an element as resting in the given dialog open mode.
    ///
    /// Also sets the `open` attribute, as an open dialog always carries it.
    pub fn with_open_mode(mut self, mode: OpenMode) -> Self {
        if let SerializedData::Element {
            attributes,
            open_mode,
            ..
        } = &mut self.data
        {
            attributes.insert("open".to_string(), String::new());
            *open_mode = Some(mode);
        }
        self
    }

    pub fn children(&self) -> &[SerializedNode] {
        match &self.data {
            SerializedData::Document { children } | SerializedData::Element { children, .. } => {
                children
            }
            _ => &[],
        }
    }

    pub fn tag_name(&self) -> Option<&str> {
        match &self.data {
            SerializedData::Element { tag_name, .. } => Some(tag_name),
            _ => None,
        }
    }

    pub fn open_mode(&self) -> Option<OpenMode> {
        match &self.data {
            SerializedData::Element { open_mode, .. } => *open_mode,
            _ => None,
        }
    }

    /// Visit this node and all descendants in document order.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a SerializedNode)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }

    fn normalize_legacy_open_mode(&mut self) {
        match &mut self.data {
            SerializedData::Element {
                attributes,
                children,
                open_mode,
                ..
            } => {
                if let Some(legacy) = attributes.shift_remove(LEGACY_OPEN_MODE_ATTRIBUTE) {
                    if attributes.contains_key("open") {
                        *open_mode = OpenMode::from_legacy_value(&legacy).or(*open_mode);
                    }
                }
                for child in children {
                    child.normalize_legacy_open_mode();
                }
            }
            SerializedData::Document { children } => {
                for child in children {
                    child.normalize_legacy_open_mode();
                }
            }
            _ => {}
        }
    }
}
