//! Special-Element Adapter for `<dialog>`.
//!
//! A dialog has three observable states that attributes alone cannot
//! express: closed, shown (non-modal) and shown as modal (top layer plus
//! backdrop). The adapter is a small state machine: it turns an attribute
//! change or an explicit [`DialogDirective`] into the sequence of native
//! calls that reaches the right state, and falls back to attribute-only
//! mutation when the target has no native dialog support.
//!
//! | from \ intent | attr added | attr removed | show | show-modal | close |
//! |---|---|---|---|---|---|
//! | Closed | set `open` | - | show | showModal | - |
//! | Shown | - | remove `open` | - | close, showModal | close |
//! | ShownModal | - | remove `open` | close, show | - | close |

use smallvec::{smallvec, SmallVec};
use tracing::{trace, warn};

use crate::dom::DomTree;
use crate::error::CapabilityError;
use crate::events::{DialogDirective, OpenMode};

/// Open state of a dialog element.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ModalState {
    #[default]
    Closed,
    Shown,
    ShownModal,
}

impl ModalState {
    pub fn is_open(self) -> bool {
        !matches!(self, Self::Closed)
    }

    pub fn is_modal(self) -> bool {
        matches!(self, Self::ShownModal)
    }

    /// Best guess from the `open` attribute alone.
    pub fn from_open_attribute(open: bool) -> Self {
        if open {
            Self::Shown
        } else {
            Self::Closed
        }
    }
}

/// What a mutation asks of a dialog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DialogIntent {
    /// `open` attribute added with no directive.
    AttributeAdded,
    /// `open` attribute removed with no directive.
    AttributeRemoved,
    Directive(DialogDirective),
}

impl DialogIntent {
    /// Intent for an `open` attribute mutation. A directive wins over the value.
    pub fn from_attribute(value: Option<&str>, directive: Option<DialogDirective>) -> Self {
        match (directive, value) {
            (Some(directive), _) => Self::Directive(directive),
            (None, Some(_)) => Self::AttributeAdded,
            (None, None) => Self::AttributeRemoved,
        }
    }
}

/// One step executed against a dialog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NativeCall {
    Show,
    ShowModal,
    Close,
    SetOpenAttribute,
    RemoveOpenAttribute,
}

/// Calls needed for one transition and the state they reach.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransitionPlan {
    pub calls: SmallVec<[NativeCall; 2]>,
    pub next: ModalState,
}

impl TransitionPlan {
    fn stay(state: ModalState) -> Self {
        Self {
            calls: SmallVec::new(),
            next: state,
        }
    }

    fn to(next: ModalState, calls: SmallVec<[NativeCall; 2]>) -> Self {
        Self { calls, next }
    }

    pub fn is_noop(&self) -> bool {
        self.calls.is_empty()
    }

    /// Whether executing the plan puts the dialog (back) into the top layer.
    pub fn enters_top_layer(&self) -> bool {
        self.calls.contains(&NativeCall::ShowModal)
    }
}

/// Result of folding an intent sequence without executing it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FoldedIntents {
    pub state: ModalState,
    /// A show-modal call happened along the way.
    pub entered_top_layer: bool,
}

/// Dialog state machine and executor.
pub struct DialogAdapter;

impl DialogAdapter {
    /// Plan the calls that take a dialog in `state` through `intent`.
    pub fn plan(state: ModalState, intent: DialogIntent) -> TransitionPlan {
        use DialogDirective as D;
        use ModalState as S;

        match (state, intent) {
            (S::Closed, DialogIntent::AttributeAdded) => {
                TransitionPlan::to(S::Shown, smallvec![NativeCall::SetOpenAttribute])
            }
            // Already open in some mode; a bare attribute add cannot switch modes.
            (S::Shown | S::ShownModal, DialogIntent::AttributeAdded) => TransitionPlan::stay(state),

            (S::Closed, DialogIntent::AttributeRemoved) => TransitionPlan::stay(state),
            (S::Shown | S::ShownModal, DialogIntent::AttributeRemoved) => {
                TransitionPlan::to(S::Closed, smallvec![NativeCall::RemoveOpenAttribute])
            }

            (S::Closed, DialogIntent::Directive(D::Show)) => {
                TransitionPlan::to(S::Shown, smallvec![NativeCall::Show])
            }
            (S::Shown, DialogIntent::Directive(D::Show)) => TransitionPlan::stay(state),
            (S::ShownModal, DialogIntent::Directive(D::Show)) => TransitionPlan::to(
                S::Shown,
                smallvec![NativeCall::Close, NativeCall::Show],
            ),

            (S::Closed, DialogIntent::Directive(D::ShowModal)) => {
                TransitionPlan::to(S::ShownModal, smallvec![NativeCall::ShowModal])
            }
            (S::Shown, DialogIntent::Directive(D::ShowModal)) => TransitionPlan::to(
                S::ShownModal,
                smallvec![NativeCall::Close, NativeCall::ShowModal],
            ),
            (S::ShownModal, DialogIntent::Directive(D::ShowModal)) => TransitionPlan::stay(state),

            (S::Closed, DialogIntent::Directive(D::Close)) => TransitionPlan::stay(state),
            (S::Shown | S::ShownModal, DialogIntent::Directive(D::Close)) => {
                TransitionPlan::to(S::Closed, smallvec![NativeCall::Close])
            }
        }
    }

    /// Final state of a dialog after a sequence of intents.
    pub fn fold(start: ModalState, intents: &[DialogIntent]) -> FoldedIntents {
        intents.iter().fold(
            FoldedIntents {
                state: start,
                entered_top_layer: false,
            },
            |acc, intent| {
                let plan = Self::plan(acc.state, *intent);
                FoldedIntents {
                    state: plan.next,
                    entered_top_layer: acc.entered_top_layer || plan.enters_top_layer(),
                }
            },
        )
    }

    /// Plan that moves a dialog from `current` straight to `target`.
    ///
    /// With `reenter_top_layer`, a dialog that is already modal is closed and
    /// shown as modal again so it moves to the top of the top layer.
    pub fn plan_settle(current: ModalState, target: ModalState, reenter_top_layer: bool) -> TransitionPlan {
        match target {
            ModalState::ShownModal if current.is_modal() && reenter_top_layer => TransitionPlan::to(
                ModalState::ShownModal,
                smallvec![NativeCall::Close, NativeCall::ShowModal],
            ),
            ModalState::ShownModal => {
                Self::plan(current, DialogIntent::Directive(DialogDirective::ShowModal))
            }
            ModalState::Shown => Self::plan(current, DialogIntent::Directive(DialogDirective::Show)),
            ModalState::Closed => {
                Self::plan(current, DialogIntent::Directive(DialogDirective::Close))
            }
        }
    }

    /// Current state of a dialog: native when available, else from the attribute.
    pub fn current_state<T: DomTree + ?Sized>(tree: &T, node: T::Node) -> ModalState {
        tree.dialog_state(node)
            .unwrap_or_else(|| ModalState::from_open_attribute(tree.attribute(node, "open").is_some()))
    }

    /// Apply one intent to a dialog of `tree`, returning the reached state.
    pub fn transition<T: DomTree + ?Sized>(tree: &mut T, node: T::Node, intent: DialogIntent) -> ModalState {
        let current = Self::current_state(tree, node);
        let plan = Self::plan(current, intent);
        trace!(?node, ?current, ?intent, next = ?plan.next, "dialog transition");
        Self::execute(tree, node, &plan.calls);
        Self::current_state(tree, node)
    }

    /// Move a dialog of `tree` directly to `target`.
    pub fn settle<T: DomTree + ?Sized>(
        tree: &mut T,
        node: T::Node,
        target: ModalState,
        reenter_top_layer: bool,
    ) -> ModalState {
        let current = Self::current_state(tree, node);
        let plan = Self::plan_settle(current, target, reenter_top_layer);
        trace!(?node, ?current, ?target, calls = plan.calls.len(), "dialog settle");
        Self::execute(tree, node, &plan.calls);
        Self::current_state(tree, node)
    }

    /// Bring a connected dialog to the resting state recorded in a snapshot.
    pub fn restore<T: DomTree + ?Sized>(tree: &mut T, node: T::Node, mode: Option<OpenMode>) -> ModalState {
        let target = match mode {
            Some(OpenMode::Modal) => ModalState::ShownModal,
            Some(OpenMode::NonModal) => ModalState::Shown,
            None => ModalState::Closed,
        };
        Self::settle(tree, node, target, false)
    }

    /// Execute planned calls, falling back to attribute mutation when the
    /// native call is unavailable or refused.
    pub fn execute<T: DomTree + ?Sized>(tree: &mut T, node: T::Node, calls: &[NativeCall]) {
        for call in calls {
            let native = match call {
                NativeCall::Show => tree.show_dialog(node, false),
                NativeCall::ShowModal => tree.show_dialog(node, true),
                NativeCall::Close => tree.close_dialog(node),
                NativeCall::SetOpenAttribute => tree.set_attribute(node, "open", "").map_err(Into::into),
                NativeCall::RemoveOpenAttribute => tree.remove_attribute(node, "open").map_err(Into::into),
            };

            let Err(err) = native else {
                continue;
            };

            match err {
                CapabilityError::Unsupported => {
                    warn!(target: "reprise::dialog", ?node, ?call, "native dialog call unsupported, falling back to attribute");
                }
                CapabilityError::InvalidState(reason) => {
                    warn!(target: "reprise::dialog", ?node, ?call, reason, "native dialog call refused, falling back to attribute");
                }
                CapabilityError::Dom(err) => {
                    warn!(target: "reprise::dialog", ?node, ?call, %err, "dialog call failed");
                    continue;
                }
            }

            let fallback = match call {
                NativeCall::Show | NativeCall::ShowModal | NativeCall::SetOpenAttribute => {
                    tree.set_attribute(node, "open", "")
                }
                NativeCall::Close | NativeCall::RemoveOpenAttribute => tree.remove_attribute(node, "open"),
            };
            if let Err(err) = fallback {
                warn!(target: "reprise::dialog", ?node, ?call, %err, "dialog attribute fallback failed");
            }
        }
    }
}
