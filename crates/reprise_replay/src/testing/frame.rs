//! Structural frame capture for testing.
//!
//! Provides functionality to:
//! - Capture the settled state of a host document as a comparable frame
//! - Compare frames line by line
//! - Collect frame sequences while stepping through a replay

use std::collections::BTreeMap;
use std::fmt;

use reprise_core::{is_dialog, subtree, DomTree, HostDocument, HostNodeId, Mirror, ModalState, NodeId, NodeKind};

/// Captured state of a host document.
///
/// Holds one outline line per node in document order, plus the state a
/// browser keeps outside the tree: dialog open modes, the top layer and the
/// backdrop.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameCapture {
    /// Document outline, one node per line
    pub lines: Vec<String>,
    /// Open state of every mirrored dialog
    pub dialogs: BTreeMap<NodeId, ModalState>,
    /// Top layer, bottom first, as recorded ids
    pub top_layer: Vec<Option<NodeId>>,
    /// Dialog painting the backdrop
    pub backdrop: Option<NodeId>,
    /// Frame number (if capturing a sequence)
    pub frame_number: u64,
}

impl FrameCapture {
    /// Capture `document`, naming nodes by their ids in `mirror`.
    pub fn capture(document: &HostDocument, mirror: &Mirror<HostNodeId>) -> Self {
        let root = document.document();
        let mut lines = Vec::new();
        outline(document, mirror, root, 0, &mut lines);

        let mut dialogs = BTreeMap::new();
        for node in subtree(document, root) {
            if !is_dialog(document, node) {
                continue;
            }
            if let Some(id) = mirror.id_of(node) {
                let state = document
                    .dialog_state(node)
                    .unwrap_or_else(|| ModalState::from_open_attribute(document.attribute(node, "open").is_some()));
                dialogs.insert(id, state);
            }
        }

        Self {
            lines,
            dialogs,
            top_layer: document.top_layer().iter().map(|&n| mirror.id_of(n)).collect(),
            backdrop: document.backdrop_owner().and_then(|n| mirror.id_of(n)),
            frame_number: 0,
        }
    }

    /// Create with frame number.
    pub fn with_frame_number(mut self, frame: u64) -> Self {
        self.frame_number = frame;
        self
    }

    /// State of a dialog by recorded id.
    pub fn dialog(&self, id: impl Into<NodeId>) -> Option<ModalState> {
        self.dialogs.get(&id.into()).copied()
    }

    pub fn has_backdrop(&self) -> bool {
        self.backdrop.is_some()
    }

    /// Whether a node is in the top layer.
    pub fn in_top_layer(&self, id: impl Into<NodeId>) -> bool {
        let id = id.into();
        self.top_layer.iter().any(|&n| n == Some(id))
    }

    /// Check if two frames show the same document. Frame numbers are ignored.
    pub fn is_identical_to(&self, other: &FrameCapture) -> bool {
        self.lines == other.lines
            && self.dialogs == other.dialogs
            && self.top_layer == other.top_layer
            && self.backdrop == other.backdrop
    }

    /// Number of outline lines that differ, counting missing lines.
    pub fn diff_line_count(&self, other: &FrameCapture) -> usize {
        let paired = self
            .lines
            .iter()
            .zip(&other.lines)
            .filter(|(a, b)| a != b)
            .count();
        paired + self.lines.len().abs_diff(other.lines.len())
    }

    /// First differing outline line as `(index, ours, theirs)`.
    pub fn first_difference<'a>(&'a self, other: &'a FrameCapture) -> Option<(usize, &'a str, &'a str)> {
        let len = self.lines.len().max(other.lines.len());
        (0..len).find_map(|i| {
            let ours = self.lines.get(i).map_or("", String::as_str);
            let theirs = other.lines.get(i).map_or("", String::as_str);
            (ours != theirs).then_some((i, ours, theirs))
        })
    }
}

impl fmt::Display for FrameCapture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{line}")?;
        }
        if !self.top_layer.is_empty() {
            writeln!(f, "top layer: {:?}", self.top_layer)?;
        }
        Ok(())
    }
}

fn outline(
    document: &HostDocument,
    mirror: &Mirror<HostNodeId>,
    node: HostNodeId,
    depth: usize,
    lines: &mut Vec<String>,
) {
    let id = mirror
        .id_of(node)
        .map_or_else(|| "-".to_string(), |id| id.to_string());
    let indent = "  ".repeat(depth);

    let mut line = match document.node_kind(node) {
        Some(NodeKind::Document) => format!("{indent}{id} #document"),
        Some(NodeKind::DocumentType) => {
            let (name, public_id, system_id) = document.doctype(node).unwrap_or_default();
            format!("{indent}{id} <!DOCTYPE {name} \"{public_id}\" \"{system_id}\">")
        }
        Some(NodeKind::Element) => {
            let mut attributes = document.attributes(node);
            attributes.sort_unstable();
            let tag = document.tag_name(node).unwrap_or_default();
            let mut line = format!("{indent}{id} <{tag}");
            for (name, value) in attributes {
                line.push_str(&format!(" {name}=\"{value}\""));
            }
            line.push('>');
            if document.is_svg(node) {
                line.push_str(" svg");
            }
            line
        }
        Some(NodeKind::Text) => format!("{indent}{id} {:?}", document.text(node).unwrap_or_default()),
        Some(NodeKind::Comment) => format!("{indent}{id} <!--{}-->", document.text(node).unwrap_or_default()),
        None => format!("{indent}{id} ?"),
    };
    if let Some((x, y)) = document.scroll_offset(node) {
        line.push_str(&format!(" scroll=({x}, {y})"));
    }
    lines.push(line);

    for &child in document.children(node) {
        outline(document, mirror, child, depth + 1, lines);
    }
}

/// Frame sequence for capturing multiple frames.
pub struct FrameSequence {
    frames: Vec<FrameCapture>,
    max_frames: usize,
}

impl FrameSequence {
    /// Create a new frame sequence with maximum capacity.
    pub fn new(max_frames: usize) -> Self {
        Self {
            frames: Vec::with_capacity(max_frames.min(1000)),
            max_frames,
        }
    }

    /// Add a frame to the sequence, numbering it.
    pub fn push(&mut self, frame: FrameCapture) {
        if self.frames.len() < self.max_frames {
            let number = self.frames.len() as u64;
            self.frames.push(frame.with_frame_number(number));
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&FrameCapture> {
        self.frames.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FrameCapture> {
        self.frames.iter()
    }

    /// Number of consecutive frame pairs that differ.
    pub fn change_count(&self) -> usize {
        self.frames
            .windows(2)
            .filter(|pair| !pair[0].is_identical_to(&pair[1]))
            .count()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

/// Result of comparing two frames.
#[derive(Clone, Debug)]
pub struct FrameComparison {
    pub passed: bool,
    /// Number of outline lines that differ.
    pub diff_lines: usize,
    /// Dialogs whose state differs, with `(actual, expected)` states.
    pub dialog_mismatches: Vec<(NodeId, Option<ModalState>, Option<ModalState>)>,
    pub top_layer_matches: bool,
}

/// Compare a frame against the expected one.
pub fn compare_frames(actual: &FrameCapture, expected: &FrameCapture) -> FrameComparison {
    let mut ids: Vec<NodeId> = actual.dialogs.keys().chain(expected.dialogs.keys()).copied().collect();
    ids.sort_unstable();
    ids.dedup();
    let dialog_mismatches: Vec<_> = ids
        .into_iter()
        .filter_map(|id| {
            let a = actual.dialog(id);
            let e = expected.dialog(id);
            (a != e).then_some((id, a, e))
        })
        .collect();

    let diff_lines = actual.diff_line_count(expected);
    let top_layer_matches = actual.top_layer == expected.top_layer && actual.backdrop == expected.backdrop;

    FrameComparison {
        passed: diff_lines == 0 && dialog_mismatches.is_empty() && top_layer_matches,
        diff_lines,
        dialog_mismatches,
        top_layer_matches,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reprise_core::{rebuild, OpenMode, SerializedNode};

    fn capture(root: &SerializedNode) -> FrameCapture {
        let mut document = HostDocument::new();
        let mut mirror = Mirror::new();
        rebuild(&mut document, &mut mirror, root);
        FrameCapture::capture(&document, &mirror)
    }

    fn page(dialog: SerializedNode) -> SerializedNode {
        SerializedNode::document(1, vec![]).with_child(
            SerializedNode::element(2, "html").with_child(SerializedNode::element(3, "body").with_child(dialog)),
        )
    }

    #[test]
    fn test_capture_outline() {
        let frame = capture(&page(
            SerializedNode::element(4, "p")
                .with_attr("title", "t")
                .with_attr("class", "c")
                .with_child(SerializedNode::text(5, "hi")),
        ));
        assert_eq!(
            frame.lines,
            vec![
                "#1 #document",
                "  #2 <html>",
                "    #3 <body>",
                "      #4 <p class=\"c\" title=\"t\">",
                "        #5 \"hi\"",
            ]
        );
        assert!(frame.dialogs.is_empty());
        assert!(!frame.has_backdrop());
    }

    #[test]
    fn test_capture_modal_dialog() {
        let frame = capture(&page(SerializedNode::element(4, "dialog").with_open_mode(OpenMode::Modal)));
        assert_eq!(frame.dialog(4), Some(ModalState::ShownModal));
        assert!(frame.in_top_layer(4));
        assert_eq!(frame.backdrop, Some(NodeId(4)));
    }

    #[test]
    fn test_frame_comparison() {
        let closed = capture(&page(SerializedNode::element(4, "dialog")));
        let open = capture(&page(SerializedNode::element(4, "dialog").with_attr("open", "")));

        assert!(closed.is_identical_to(&closed.clone().with_frame_number(3)));
        assert!(!closed.is_identical_to(&open));
        assert_eq!(closed.diff_line_count(&open), 1);
        assert_eq!(closed.first_difference(&open).map(|(i, _, _)| i), Some(3));

        let result = compare_frames(&open, &closed);
        assert!(!result.passed);
        assert_eq!(
            result.dialog_mismatches,
            vec![(NodeId(4), Some(ModalState::Shown), Some(ModalState::Closed))]
        );
        assert!(result.top_layer_matches);
    }

    #[test]
    fn test_frame_sequence() {
        let mut seq = FrameSequence::new(2);
        assert!(seq.is_empty());

        let frame = capture(&page(SerializedNode::element(4, "dialog")));
        seq.push(frame.clone());
        seq.push(capture(&page(SerializedNode::element(4, "dialog").with_attr("open", ""))));
        seq.push(frame);

        assert_eq!(seq.len(), 2);
        assert_eq!(seq.get(1).map(|f| f.frame_number), Some(1));
        assert_eq!(seq.change_count(), 1);
    }
}
