//! Property tests for seeking
//!
//! These tests verify that:
//! - Seeking to the end renders the same frame however it is reached
//! - seek(t1) followed by seek(t2) renders what a fresh seek(t2) renders
//! - The virtual DOM and direct application render identical frames,
//!   including the stacking of two modal dialogs across sibling moves

use proptest::prelude::*;
use reprise_core::{DialogDirective, Event, HostDocument, IncrementalMutation, SerializedNode};
use reprise_replay::testing::FrameCapture;
use reprise_replay::{ReplayConfig, Replayer};

const BODY: i32 = 3;
const CONTAINER: i32 = 20;
const DIALOG: i32 = 5;
const DIALOG_TEXT: i32 = 6;
const OTHER_DIALOG: i32 = 7;
const FIRST_ADDED: i32 = 100;

#[derive(Clone, Debug)]
enum Op {
    SetAttribute { target: i32, name: &'static str, value: u8 },
    RemoveAttribute { target: i32, name: &'static str },
    Text(u8),
    Dialog { target: i32, directive: DialogDirective },
    /// `open` set or removed with no directive.
    OpenAttribute { target: i32, open: bool },
    Append { parent: i32 },
    /// Re-append an existing node at the end of `parent`.
    Move { target: i32, parent: i32 },
    Remove { parent: i32, added: i32 },
}

fn op() -> impl Strategy<Value = Op> {
    let target = prop::sample::select(vec![BODY, CONTAINER, DIALOG, FIRST_ADDED, FIRST_ADDED + 1]);
    let name = prop::sample::select(vec!["class", "title", "data-x"]);
    let parent = prop::sample::select(vec![BODY, CONTAINER]);
    let dialog = prop::sample::select(vec![DIALOG, OTHER_DIALOG]);
    let movable = prop::sample::select(vec![CONTAINER, DIALOG, OTHER_DIALOG, FIRST_ADDED, FIRST_ADDED + 1]);
    let directive = prop::sample::select(vec![
        DialogDirective::Show,
        DialogDirective::ShowModal,
        DialogDirective::Close,
    ]);

    prop_oneof![
        1 => (target.clone(), name.clone(), any::<u8>())
            .prop_map(|(target, name, value)| Op::SetAttribute { target, name, value }),
        1 => (target, name).prop_map(|(target, name)| Op::RemoveAttribute { target, name }),
        1 => any::<u8>().prop_map(Op::Text),
        2 => (dialog.clone(), directive).prop_map(|(target, directive)| Op::Dialog { target, directive }),
        1 => (dialog, any::<bool>()).prop_map(|(target, open)| Op::OpenAttribute { target, open }),
        1 => parent.clone().prop_map(|parent| Op::Append { parent }),
        2 => (movable, parent.clone()).prop_map(|(target, parent)| Op::Move { target, parent }),
        1 => (parent, 0..8i32).prop_map(|(parent, added)| Op::Remove { parent, added }),
    ]
}

/// Timestamp gaps (ties allowed) and a batch of ops per event.
fn recording() -> impl Strategy<Value = Vec<(u8, Vec<Op>)>> {
    prop::collection::vec((0u8..30, prop::collection::vec(op(), 1..4)), 1..12)
}

fn page() -> SerializedNode {
    SerializedNode::document(1, vec![]).with_child(
        SerializedNode::element(2, "html").with_child(
            SerializedNode::element(BODY, "body")
                .with_child(SerializedNode::element(CONTAINER, "div"))
                .with_child(SerializedNode::element(DIALOG, "dialog").with_child(SerializedNode::text(DIALOG_TEXT, "x")))
                .with_child(SerializedNode::element(OTHER_DIALOG, "dialog")),
        ),
    )
}

fn tag_of(id: i32) -> &'static str {
    match id {
        CONTAINER => "div",
        DIALOG | OTHER_DIALOG => "dialog",
        _ => "span",
    }
}

fn build_events(steps: &[(u8, Vec<Op>)]) -> Vec<Event> {
    let mut events = vec![Event::full_snapshot(0, page())];
    let mut t = 0i64;
    let mut next_id = FIRST_ADDED;

    for (gap, ops) in steps {
        t += i64::from(*gap) + 1;
        let mutations = ops
            .iter()
            .map(|op| match op {
                Op::SetAttribute { target, name, value } => {
                    IncrementalMutation::set_attribute(*target, name, &value.to_string())
                }
                Op::RemoveAttribute { target, name } => IncrementalMutation::remove_attribute(*target, name),
                Op::Text(value) => IncrementalMutation::text(DIALOG_TEXT, &value.to_string()),
                Op::Dialog { target, directive } => IncrementalMutation::dialog(*target, *directive),
                Op::OpenAttribute { target, open: true } => IncrementalMutation::set_attribute(*target, "open", ""),
                Op::OpenAttribute { target, open: false } => IncrementalMutation::remove_attribute(*target, "open"),
                Op::Append { parent } => {
                    let id = next_id;
                    next_id += 1;
                    IncrementalMutation::append(*parent, SerializedNode::element(id, "span"))
                }
                Op::Move { target, parent } => {
                    IncrementalMutation::append(*parent, SerializedNode::element(*target, tag_of(*target)))
                }
                Op::Remove { parent, added } => IncrementalMutation::remove(*parent, &[FIRST_ADDED + added]),
            })
            .collect();
        events.push(Event::mutations(t, mutations));
    }
    events
}

fn frame_at(events: &[Event], seeks: &[i64], use_virtual_dom: bool) -> FrameCapture {
    let config = ReplayConfig::testing().with_virtual_dom(use_virtual_dom);
    let mut replayer = Replayer::new(events.to_vec(), HostDocument::new(), config).unwrap();
    for &t in seeks {
        replayer.pause(t);
    }
    FrameCapture::capture(replayer.document(), replayer.mirror())
}

fn end_of(events: &[Event]) -> i64 {
    events.last().map_or(0, |e| e.timestamp.as_millis())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: seeking to the end from scratch is deterministic.
    #[test]
    fn prop_seek_to_end_is_deterministic(steps in recording()) {
        let events = build_events(&steps);
        let end = end_of(&events);

        for use_virtual_dom in [true, false] {
            let once = frame_at(&events, &[end], use_virtual_dom);
            let again = frame_at(&events, &[end, 0, end], use_virtual_dom);
            prop_assert!(once.is_identical_to(&again), "{}\n---\n{}", once, again);
        }
    }

    /// Property: the frame after seek(t2) does not depend on an earlier seek(t1).
    #[test]
    fn prop_seek_is_order_independent(steps in recording(), a in 0u32..400, b in 0u32..400) {
        let events = build_events(&steps);
        let end = end_of(&events).max(1);
        let t1 = i64::from(a) % (end + 1);
        let t2 = i64::from(b) % (end + 1);

        for use_virtual_dom in [true, false] {
            let fresh = frame_at(&events, &[t2], use_virtual_dom);
            let after = frame_at(&events, &[t1, t2], use_virtual_dom);
            prop_assert!(fresh.is_identical_to(&after), "t1={} t2={}\n{}\n---\n{}", t1, t2, fresh, after);
        }
    }

    /// Property: batching through the virtual DOM renders what direct application renders.
    #[test]
    fn prop_virtual_dom_matches_direct(steps in recording(), a in 0u32..400) {
        let events = build_events(&steps);
        let end = end_of(&events).max(1);
        let t = i64::from(a) % (end + 1);

        let batched = frame_at(&events, &[t, end], true);
        let direct = frame_at(&events, &[t, end], false);
        prop_assert!(batched.is_identical_to(&direct), "{}\n---\n{}", batched, direct);
    }
}
