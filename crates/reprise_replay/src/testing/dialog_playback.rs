//! Recorded session exercising every dialog transition.
//!
//! One page with a single `<dialog>` inside `<body>`. Each constant names the
//! time of the event that produces the state under test, so
//! `replayer.pause(SHOW_MODAL_INCREMENTAL_ATTRIBUTE_TIME)` shows the dialog
//! right after `showModal()` was recorded.

use reprise_core::{
    DialogDirective, Event, IncrementalMutation, ModalState, OpenMode, SerializedNode, LEGACY_OPEN_MODE_ATTRIBUTE,
};

/// Full snapshot with the dialog closed.
pub const CLOSED_FULL_SNAPSHOT_TIME: i64 = 10;
/// `open` added with a `show()` directive.
pub const SHOW_INCREMENTAL_ATTRIBUTE_TIME: i64 = 100;
/// `open` removed with a `close()` directive.
pub const CLOSE_INCREMENTAL_ATTRIBUTE_TIME: i64 = 200;
/// `open` added with a `showModal()` directive.
pub const SHOW_MODAL_INCREMENTAL_ATTRIBUTE_TIME: i64 = 300;
/// Modal dialog re-shown non-modally.
pub const SWITCH_BETWEEN_SHOW_MODAL_AND_SHOW_INCREMENTAL_ATTRIBUTE_TIME: i64 = 400;
/// Non-modal dialog re-shown modally.
pub const SWITCH_BETWEEN_SHOW_AND_SHOW_MODAL_INCREMENTAL_ATTRIBUTE_TIME: i64 = 500;
/// Full snapshot with the dialog open non-modally.
pub const SHOW_FULL_SNAPSHOT_TIME: i64 = 600;
/// Full snapshot with the dialog open modally, in the legacy attribute form.
pub const SHOW_MODAL_FULL_SNAPSHOT_TIME: i64 = 700;
/// Dialog replaced by a newly added modal dialog.
pub const SHOW_MODAL_INCREMENTAL_ADD_TIME: i64 = 800;

pub const BODY_ID: i32 = 4;
pub const DIALOG_ID: i32 = 5;
pub const ADDED_DIALOG_ID: i32 = 8;

/// Every checkpoint with the dialog id and state it must render.
pub const CHECKPOINTS: [(i64, i32, ModalState); 9] = [
    (CLOSED_FULL_SNAPSHOT_TIME, DIALOG_ID, ModalState::Closed),
    (SHOW_INCREMENTAL_ATTRIBUTE_TIME, DIALOG_ID, ModalState::Shown),
    (CLOSE_INCREMENTAL_ATTRIBUTE_TIME, DIALOG_ID, ModalState::Closed),
    (SHOW_MODAL_INCREMENTAL_ATTRIBUTE_TIME, DIALOG_ID, ModalState::ShownModal),
    (
        SWITCH_BETWEEN_SHOW_MODAL_AND_SHOW_INCREMENTAL_ATTRIBUTE_TIME,
        DIALOG_ID,
        ModalState::Shown,
    ),
    (
        SWITCH_BETWEEN_SHOW_AND_SHOW_MODAL_INCREMENTAL_ATTRIBUTE_TIME,
        DIALOG_ID,
        ModalState::ShownModal,
    ),
    (SHOW_FULL_SNAPSHOT_TIME, DIALOG_ID, ModalState::Shown),
    (SHOW_MODAL_FULL_SNAPSHOT_TIME, DIALOG_ID, ModalState::ShownModal),
    (SHOW_MODAL_INCREMENTAL_ADD_TIME, ADDED_DIALOG_ID, ModalState::ShownModal),
];

/// The page around `dialog`.
pub fn page(dialog: SerializedNode) -> SerializedNode {
    SerializedNode::document(1, vec![]).with_child(
        SerializedNode::element(2, "html")
            .with_child(SerializedNode::element(3, "head"))
            .with_child(
                SerializedNode::element(BODY_ID, "body")
                    .with_child(SerializedNode::element(10, "h1").with_child(SerializedNode::text(11, "Dialog test")))
                    .with_child(dialog),
            ),
    )
}

fn dialog(id: i32) -> SerializedNode {
    SerializedNode::element(id, "dialog")
        .with_attr("id", "dialog")
        .with_child(SerializedNode::text(id + 1, "This is a dialog"))
}

/// The recorded session.
pub fn events() -> Vec<Event> {
    vec![
        Event::meta(0, "http://localhost/html/dialog.html", 1000, 800),
        Event::full_snapshot(CLOSED_FULL_SNAPSHOT_TIME, page(dialog(DIALOG_ID))),
        Event::mutations(
            SHOW_INCREMENTAL_ATTRIBUTE_TIME,
            vec![IncrementalMutation::dialog(DIALOG_ID, DialogDirective::Show)],
        ),
        Event::mutations(
            CLOSE_INCREMENTAL_ATTRIBUTE_TIME,
            vec![IncrementalMutation::dialog(DIALOG_ID, DialogDirective::Close)],
        ),
        Event::mutations(
            SHOW_MODAL_INCREMENTAL_ATTRIBUTE_TIME,
            vec![IncrementalMutation::dialog(DIALOG_ID, DialogDirective::ShowModal)],
        ),
        Event::mutations(
            SWITCH_BETWEEN_SHOW_MODAL_AND_SHOW_INCREMENTAL_ATTRIBUTE_TIME,
            vec![
                IncrementalMutation::dialog(DIALOG_ID, DialogDirective::Close),
                IncrementalMutation::dialog(DIALOG_ID, DialogDirective::Show),
            ],
        ),
        // Legacy recorders paired `open` with the open mode attribute.
        Event::mutations(
            SWITCH_BETWEEN_SHOW_AND_SHOW_MODAL_INCREMENTAL_ATTRIBUTE_TIME,
            vec![
                IncrementalMutation::dialog(DIALOG_ID, DialogDirective::Close),
                IncrementalMutation::set_attribute(DIALOG_ID, "open", ""),
                IncrementalMutation::set_attribute(DIALOG_ID, LEGACY_OPEN_MODE_ATTRIBUTE, "modal"),
            ],
        ),
        Event::full_snapshot(
            SHOW_FULL_SNAPSHOT_TIME,
            page(dialog(DIALOG_ID).with_open_mode(OpenMode::NonModal)),
        ),
        Event::full_snapshot(
            SHOW_MODAL_FULL_SNAPSHOT_TIME,
            page(
                dialog(DIALOG_ID)
                    .with_attr("open", "")
                    .with_attr(LEGACY_OPEN_MODE_ATTRIBUTE, "modal"),
            ),
        ),
        Event::mutations(
            SHOW_MODAL_INCREMENTAL_ADD_TIME,
            vec![
                IncrementalMutation::remove(BODY_ID, &[DIALOG_ID]),
                IncrementalMutation::append(BODY_ID, dialog(ADDED_DIALOG_ID).with_open_mode(OpenMode::Modal)),
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkpoints_are_event_times() {
        let times: Vec<i64> = events().iter().skip(1).map(|e| e.timestamp.as_millis()).collect();
        let checkpoints: Vec<i64> = CHECKPOINTS.iter().map(|&(t, _, _)| t).collect();
        assert_eq!(times, checkpoints);
    }
}
