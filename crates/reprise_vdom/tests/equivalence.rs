//! Integration tests for virtual tree + reconciler against direct application
//!
//! These tests verify that:
//! - Applying batches through the virtual tree and reconciling yields the
//!   same live structure as applying them to the live tree directly
//! - Dialog open state agrees between both paths after every batch
//! - Mutations touching nodes that moved between parents are reconciled

use reprise_core::events::{DialogDirective, IncrementalMutation, MutationBatch, NodeId, OpenMode, SerializedNode};
use reprise_core::{apply_batch, rebuild, DomTree, HostDocument, HostNodeId, Mirror};
use reprise_vdom::{Reconciler, VNodeKey, VirtualDom};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Indented outline of a host document, dialogs annotated with their state.
fn outline(doc: &HostDocument) -> Vec<String> {
    fn walk(doc: &HostDocument, node: HostNodeId, depth: usize, out: &mut Vec<String>) {
        let label = match (doc.tag_name(node), doc.text(node)) {
            (Some(tag), _) => {
                let mut attrs: Vec<String> = doc
                    .attributes(node)
                    .into_iter()
                    .map(|(k, v)| format!("{k}={v:?}"))
                    .collect();
                attrs.sort();
                match doc.dialog_state(node) {
                    Some(state) => format!("<{tag} {}> {state:?}", attrs.join(" ")),
                    None => format!("<{tag} {}>", attrs.join(" ")),
                }
            }
            (None, Some(text)) => format!("{text:?}"),
            (None, None) => "#node".to_string(),
        };
        out.push(format!("{}{label}", "  ".repeat(depth)));
        for &child in doc.children(node) {
            walk(doc, child, depth + 1, out);
        }
    }

    let mut out = Vec::new();
    walk(doc, doc.document(), 0, &mut out);
    out
}

struct Session {
    direct: HostDocument,
    direct_mirror: Mirror<HostNodeId>,
    vdom: VirtualDom,
    vmirror: Mirror<VNodeKey>,
    live: HostDocument,
    live_mirror: Mirror<HostNodeId>,
}

impl Session {
    fn start(snapshot: &SerializedNode) -> Self {
        let mut session = Self {
            direct: HostDocument::new(),
            direct_mirror: Mirror::new(),
            vdom: VirtualDom::new(),
            vmirror: Mirror::new(),
            live: HostDocument::new(),
            live_mirror: Mirror::new(),
        };
        rebuild(&mut session.direct, &mut session.direct_mirror, snapshot);
        rebuild(&mut session.vdom, &mut session.vmirror, snapshot);
        rebuild(&mut session.live, &mut session.live_mirror, snapshot);
        session.vdom.clear_pending();
        session
    }

    fn step(&mut self, mutations: Vec<IncrementalMutation>) {
        let batch = MutationBatch { mutations };
        apply_batch(&mut self.direct, &mut self.direct_mirror, &batch);
        apply_batch(&mut self.vdom, &mut self.vmirror, &batch);
        Reconciler::reconcile(&mut self.vdom, &self.vmirror, &mut self.live, &mut self.live_mirror);
        assert_eq!(outline(&self.direct), outline(&self.live));
    }
}

fn page() -> SerializedNode {
    SerializedNode::document(1, vec![]).with_child(
        SerializedNode::element(2, "html").with_child(
            SerializedNode::element(3, "body")
                .with_child(SerializedNode::element(4, "section").with_attr("id", "a"))
                .with_child(SerializedNode::element(5, "section").with_attr("id", "b"))
                .with_child(SerializedNode::element(6, "dialog").with_child(SerializedNode::text(7, "hi"))),
        ),
    )
}

/// Structural edits end in the same live tree
#[test]
fn test_structural_edits_match_direct_application() {
    init_tracing();
    let mut session = Session::start(&page());

    session.step(vec![
        IncrementalMutation::append(4, SerializedNode::element(10, "ul")),
        IncrementalMutation::append(10, SerializedNode::element(11, "li").with_child(SerializedNode::text(12, "one"))),
        IncrementalMutation::set_attribute(5, "hidden", ""),
    ]);

    // Move the list into the second section, then edit inside it
    session.step(vec![
        IncrementalMutation::append(5, SerializedNode::element(10, "ul")),
        IncrementalMutation::text(12, "uno"),
        IncrementalMutation::remove_attribute(5, "hidden"),
    ]);

    session.step(vec![IncrementalMutation::remove(3, &[4])]);
    assert!(!session.live_mirror.contains(NodeId(4)));
    assert!(session.live_mirror.contains(NodeId(12)));
}

/// Dialog states agree after every batch
#[test]
fn test_dialog_states_match_direct_application() {
    init_tracing();
    let mut session = Session::start(&page());

    session.step(vec![IncrementalMutation::dialog(6, DialogDirective::ShowModal)]);
    session.step(vec![IncrementalMutation::dialog(6, DialogDirective::Show)]);
    session.step(vec![IncrementalMutation::dialog(6, DialogDirective::ShowModal)]);
    session.step(vec![IncrementalMutation::remove_attribute(6, "open")]);
    session.step(vec![IncrementalMutation::set_attribute(6, "open", "")]);
    session.step(vec![IncrementalMutation::dialog(6, DialogDirective::Close)]);

    let dialog = session.live_mirror.get(NodeId(6)).unwrap();
    assert!(session.live.top_layer().is_empty());
    assert_eq!(session.live.attribute(dialog, "open"), None);
}

/// A modal dialog added by a mutation is modal on the live tree
#[test]
fn test_added_modal_dialog() {
    init_tracing();
    let mut session = Session::start(&page());

    session.step(vec![IncrementalMutation::append(
        3,
        SerializedNode::element(20, "dialog").with_open_mode(OpenMode::Modal),
    )]);

    let dialog = session.live_mirror.get(NodeId(20)).unwrap();
    assert_eq!(session.live.top_layer(), &[dialog]);
    assert!(session.live.has_backdrop());
}

/// Moving an open modal dialog drops it from the top layer on both paths
#[test]
fn test_moving_modal_dialog() {
    init_tracing();
    let mut session = Session::start(&page());
    session.step(vec![IncrementalMutation::dialog(6, DialogDirective::ShowModal)]);

    session.step(vec![IncrementalMutation::append(4, SerializedNode::element(6, "dialog"))]);

    let dialog = session.live_mirror.get(NodeId(6)).unwrap();
    assert_eq!(session.live.parent(dialog), session.live_mirror.get(NodeId(4)));
    assert!(session.live.top_layer().is_empty());
    assert_eq!(session.live.attribute(dialog, "open"), Some(""));
}

/// Showing a dialog modally and moving it in the same batch
#[test]
fn test_show_modal_then_move_in_one_batch() {
    init_tracing();
    let mut session = Session::start(&page());
    session.step(vec![
        IncrementalMutation::dialog(6, DialogDirective::ShowModal),
        IncrementalMutation::append(5, SerializedNode::element(6, "dialog")),
    ]);
    assert!(session.live.top_layer().is_empty());
}
