//! Integration tests for dialog replay
//!
//! These tests verify that:
//! - Every recorded dialog transition renders the same state with and
//!   without the virtual DOM
//! - Modal dialogs land in the top layer with a backdrop, whether shown
//!   incrementally, restored from a full snapshot or added in a batch
//! - Open-then-close within one seek issues no native calls when batched
//! - Hosts without native dialog support fall back to the `open` attribute
//! - Several modal dialogs stack in the order they were shown
//! - Reordering siblings never knocks a modal dialog out of the top layer

use reprise_core::{DialogDirective, Event, IncrementalMutation, ModalState, NativeCall, NodeId, SerializedNode};
use reprise_replay::testing::{dialog_playback, FrameCapture, ScenarioRunner};
use reprise_replay::{ReplayConfig, Replayer};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// `<dialog>` with id 5 inside `<body>`.
fn closed_dialog_page() -> SerializedNode {
    SerializedNode::document(1, vec![]).with_child(
        SerializedNode::element(2, "html").with_child(
            SerializedNode::element(3, "body")
                .with_child(SerializedNode::element(5, "dialog").with_child(SerializedNode::text(6, "content"))),
        ),
    )
}

fn directives(steps: &[(i64, DialogDirective)]) -> Vec<Event> {
    let mut events = vec![Event::full_snapshot(0, closed_dialog_page())];
    events.extend(
        steps
            .iter()
            .map(|&(t, directive)| Event::mutations(t, vec![IncrementalMutation::dialog(5, directive)])),
    );
    events
}

/// A closed dialog shown with a show-modal directive at t=100 renders modal.
#[test]
fn test_show_modal_directive_renders_modal() {
    init_tracing();
    let events = directives(&[(100, DialogDirective::ShowModal)]);

    for use_virtual_dom in [true, false] {
        let config = ReplayConfig::testing().with_virtual_dom(use_virtual_dom);
        let mut replayer = Replayer::new(events.clone(), reprise_core::HostDocument::new(), config).unwrap();
        replayer.pause(100);

        let dialog = replayer.node(5).unwrap();
        let document = replayer.document();
        assert_eq!(document.top_layer(), &[dialog], "virtual dom: {use_virtual_dom}");
        assert_eq!(document.backdrop_owner(), Some(dialog));

        let frame = FrameCapture::capture(document, replayer.mirror());
        assert_eq!(frame.dialog(5), Some(ModalState::ShownModal));
        assert!(frame.has_backdrop());
        assert!(frame.lines.iter().any(|line| line.contains("#5 <dialog open=\"\">")));
    }
}

/// Every checkpoint of the dialog session, each seeked from a fresh replayer.
#[test]
fn test_dialog_checkpoints_in_both_modes() {
    init_tracing();
    let runner = ScenarioRunner::default_runner();
    let events = dialog_playback::events();

    for (t, id, expected) in dialog_playback::CHECKPOINTS {
        let result = runner.run(&events, &[t]).unwrap();
        let comparison = result.comparison();
        assert!(
            comparison.passed,
            "t={t}: {:?}\nvirtual:\n{}\ndirect:\n{}",
            comparison, result.virtual_dom.frame, result.direct.frame
        );

        for run in [&result.virtual_dom, &result.direct] {
            assert_eq!(run.frame.dialog(id), Some(expected), "t={t}");
            assert_eq!(run.frame.in_top_layer(id), expected.is_modal(), "t={t}");
            assert_eq!(run.frame.has_backdrop(), expected.is_modal(), "t={t}");
        }
    }
}

/// Seeking through the checkpoints in order matches seeking each from scratch.
#[test]
fn test_forward_and_backward_seeks_match_fresh_seeks() {
    init_tracing();
    let runner = ScenarioRunner::default_runner();
    let events = dialog_playback::events();
    let forward: Vec<i64> = dialog_playback::CHECKPOINTS.iter().map(|&(t, _, _)| t).collect();
    let backward: Vec<i64> = forward.iter().rev().copied().collect();

    for seeks in [forward, backward] {
        let result = runner.run(&events, &seeks).unwrap();
        assert!(result.frames_match());

        for (frame, &t) in result.virtual_dom.frames.iter().zip(&seeks) {
            let fresh = runner.run_mode(&events, &[t], true).unwrap();
            assert!(frame.is_identical_to(&fresh.frame), "t={t}");
        }
    }
}

/// Show then close within one seek leaves the dialog closed and, with the
/// virtual DOM, never touches the native dialog.
#[test]
fn test_open_then_close_in_one_seek() {
    init_tracing();
    let events = directives(&[(100, DialogDirective::Show), (150, DialogDirective::Close)]);
    let result = ScenarioRunner::default_runner().run(&events, &[200]).unwrap();

    assert!(result.frames_match());
    assert_eq!(result.virtual_dom.frame.dialog(5), Some(ModalState::Closed));
    assert!(result.virtual_dom.native_calls.is_empty());
    assert_eq!(result.direct.native_calls, vec![NativeCall::Show, NativeCall::Close]);
}

/// Modal, then non-modal, then modal again ends modal with a backdrop.
#[test]
fn test_modal_show_modal_round_trip() {
    init_tracing();
    let events = directives(&[
        (100, DialogDirective::ShowModal),
        (200, DialogDirective::Show),
        (300, DialogDirective::ShowModal),
    ]);
    let result = ScenarioRunner::default_runner().run(&events, &[300]).unwrap();

    assert!(result.frames_match());
    for run in [&result.virtual_dom, &result.direct] {
        assert_eq!(run.frame.dialog(5), Some(ModalState::ShownModal));
        assert_eq!(run.frame.top_layer, vec![Some(NodeId(5))]);
        assert!(run.frame.has_backdrop());
    }
    assert_eq!(result.virtual_dom.native_calls, vec![NativeCall::ShowModal]);
}

/// Seeking step by step through the round trip matches the final frame.
#[test]
fn test_modal_round_trip_step_by_step() {
    init_tracing();
    let events = directives(&[
        (100, DialogDirective::ShowModal),
        (200, DialogDirective::Show),
        (300, DialogDirective::ShowModal),
    ]);
    let result = ScenarioRunner::default_runner()
        .run(&events, &[100, 200, 300])
        .unwrap();

    assert!(result.frames_match());
    let states: Vec<_> = result.virtual_dom.frames.iter().map(|f| f.dialog(5)).collect();
    assert_eq!(
        states,
        vec![
            Some(ModalState::ShownModal),
            Some(ModalState::Shown),
            Some(ModalState::ShownModal)
        ]
    );
    assert_eq!(
        result.direct.native_calls,
        vec![
            NativeCall::ShowModal,
            NativeCall::Close,
            NativeCall::Show,
            NativeCall::Close,
            NativeCall::ShowModal
        ]
    );
}

/// A modal dialog in a full snapshot is restored into the top layer.
#[test]
fn test_full_snapshot_modal_restored() {
    init_tracing();
    let result = ScenarioRunner::default_runner()
        .run(
            &dialog_playback::events(),
            &[dialog_playback::SHOW_MODAL_FULL_SNAPSHOT_TIME],
        )
        .unwrap();

    assert!(result.frames_match());
    let frame = &result.direct.frame;
    assert_eq!(frame.backdrop, Some(NodeId(dialog_playback::DIALOG_ID)));
    // The legacy attribute never reaches the document.
    assert!(frame.lines.iter().all(|line| !line.contains("rr_open_mode")));
}

/// A dialog added already open as modal enters the top layer once attached.
#[test]
fn test_incremental_add_of_modal_dialog() {
    init_tracing();
    let events = vec![
        Event::full_snapshot(0, closed_dialog_page()),
        Event::mutations(
            100,
            vec![IncrementalMutation::append(
                3,
                SerializedNode::element(7, "dialog").with_open_mode(reprise_core::OpenMode::Modal),
            )],
        ),
    ];
    let result = ScenarioRunner::default_runner().run(&events, &[100]).unwrap();

    assert!(result.frames_match());
    for run in [&result.virtual_dom, &result.direct] {
        assert_eq!(run.frame.dialog(7), Some(ModalState::ShownModal));
        assert_eq!(run.frame.dialog(5), Some(ModalState::Closed));
        assert_eq!(run.frame.top_layer, vec![Some(NodeId(7))]);
    }
}

/// Without native dialogs every transition degrades to the `open` attribute.
#[test]
fn test_legacy_host_falls_back_to_attribute() {
    init_tracing();
    let runner = ScenarioRunner::legacy();
    let events = dialog_playback::events();

    for (t, id, expected) in dialog_playback::CHECKPOINTS {
        let result = runner.run(&events, &[t]).unwrap();
        assert!(result.frames_match(), "t={t}");

        let fallback = ModalState::from_open_attribute(expected.is_open());
        for run in [&result.virtual_dom, &result.direct] {
            assert_eq!(run.frame.dialog(id), Some(fallback), "t={t}");
            assert!(run.frame.top_layer.is_empty());
            assert!(run.native_calls.is_empty());
        }
    }
}

/// Body holding two paragraphs and two closed dialogs, 5 and 7.
fn two_dialog_page() -> SerializedNode {
    SerializedNode::document(1, vec![]).with_child(
        SerializedNode::element(2, "html").with_child(
            SerializedNode::element(3, "body")
                .with_child(SerializedNode::element(10, "p"))
                .with_child(SerializedNode::element(11, "p"))
                .with_child(SerializedNode::element(5, "dialog"))
                .with_child(SerializedNode::element(7, "dialog")),
        ),
    )
}

/// Two dialogs shown modally within one seek stack in recorded order.
#[test]
fn test_modal_dialogs_stack_in_recorded_order() {
    init_tracing();
    let events = vec![
        Event::full_snapshot(0, two_dialog_page()),
        Event::mutations(100, vec![IncrementalMutation::dialog(7, DialogDirective::ShowModal)]),
        Event::mutations(200, vec![IncrementalMutation::dialog(5, DialogDirective::ShowModal)]),
    ];
    let runner = ScenarioRunner::default_runner();

    for seeks in [vec![200], vec![100, 200], vec![200, 0, 200]] {
        let result = runner.run(&events, &seeks).unwrap();
        assert!(result.frames_match(), "seeks={seeks:?}");
        for run in [&result.virtual_dom, &result.direct] {
            assert_eq!(run.frame.top_layer, vec![Some(NodeId(7)), Some(NodeId(5))], "seeks={seeks:?}");
            assert_eq!(run.frame.backdrop, Some(NodeId(5)), "seeks={seeks:?}");
        }
    }
}

/// Moving a sibling past a modal dialog leaves the dialog modal, however
/// the seek gets there.
#[test]
fn test_sibling_reorder_keeps_dialog_modal() {
    init_tracing();
    let events = vec![
        Event::full_snapshot(0, two_dialog_page()),
        Event::mutations(100, vec![IncrementalMutation::dialog(7, DialogDirective::ShowModal)]),
        Event::mutations(
            200,
            vec![
                IncrementalMutation::append(3, SerializedNode::element(10, "p")),
                IncrementalMutation::append(3, SerializedNode::element(11, "p")),
                IncrementalMutation::append(3, SerializedNode::element(5, "dialog")),
                IncrementalMutation::set_attribute(7, "open", ""),
            ],
        ),
    ];
    let runner = ScenarioRunner::default_runner();

    for seeks in [vec![200], vec![100, 200]] {
        let result = runner.run(&events, &seeks).unwrap();
        assert!(result.frames_match(), "seeks={seeks:?}");
        for run in [&result.virtual_dom, &result.direct] {
            assert_eq!(run.frame.dialog(7), Some(ModalState::ShownModal), "seeks={seeks:?}");
            assert_eq!(run.frame.top_layer, vec![Some(NodeId(7))], "seeks={seeks:?}");
        }
    }
}
