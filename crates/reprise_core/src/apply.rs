//! Mutation Applier.
//!
//! Applies one recorded [`MutationBatch`] to any [`DomTree`]. Malformed
//! sub-operations (unknown ids, inconsistent child lists) are skipped and
//! logged; the rest of the batch still applies.
//!
//! Child-list application is not idempotent: applying the same batch twice
//! inserts twice. The timeline applies each event exactly once.

use tracing::{trace, warn};

use crate::dialog::DialogIntent;
use crate::dom::{is_dialog, DomTree, NodeKind};
use crate::events::{AddedNode, DialogDirective, IncrementalMutation, MutationBatch, NodeId};
use crate::mirror::Mirror;
use crate::rebuild::{build_node, restore_open_modes};

/// Outcome counters for applied mutations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Sub-operations that reached the tree.
    pub applied: usize,
    /// Sub-operations skipped as malformed.
    pub skipped: usize,
}

impl ApplyReport {
    pub fn merge(&mut self, other: ApplyReport) {
        self.applied += other.applied;
        self.skipped += other.skipped;
    }

    pub fn is_clean(&self) -> bool {
        self.skipped == 0
    }

    fn skip(&mut self) {
        self.skipped += 1;
    }

    fn hit(&mut self) {
        self.applied += 1;
    }
}

/// Apply every mutation of `batch`, in recorded order.
pub fn apply_batch<T: DomTree + ?Sized>(
    tree: &mut T,
    mirror: &mut Mirror<T::Node>,
    batch: &MutationBatch,
) -> ApplyReport {
    let mut report = ApplyReport::default();
    for mutation in &batch.mutations {
        apply_mutation(tree, mirror, mutation, &mut report);
    }
    report
}

/// Apply a single mutation.
pub fn apply_mutation<T: DomTree + ?Sized>(
    tree: &mut T,
    mirror: &mut Mirror<T::Node>,
    mutation: &IncrementalMutation,
    report: &mut ApplyReport,
) {
    match mutation {
        IncrementalMutation::Attribute {
            target_id,
            name,
            value,
            directive,
        } => apply_attribute(tree, mirror, *target_id, name, value.as_deref(), *directive, report),
        IncrementalMutation::Text { target_id, value } => {
            apply_text(tree, mirror, *target_id, value, report)
        }
        IncrementalMutation::ChildList {
            target_id,
            added,
            removed,
        } => apply_child_list(tree, mirror, *target_id, added, removed, report),
    }
}

fn apply_attribute<T: DomTree + ?Sized>(
    tree: &mut T,
    mirror: &Mirror<T::Node>,
    target_id: NodeId,
    name: &str,
    value: Option<&str>,
    directive: Option<DialogDirective>,
    report: &mut ApplyReport,
) {
    let Some(node) = mirror.get(target_id) else {
        warn!(id = %target_id, name, "attribute mutation on unknown node");
        report.skip();
        return;
    };

    if is_dialog(tree, node) && (name == "open" || directive.is_some()) {
        if name != "open" {
            set_or_remove(tree, node, target_id, name, value, report);
        }
        let intent = if name == "open" {
            DialogIntent::from_attribute(value, directive)
        } else {
            // Directive carried by another attribute
            DialogIntent::from_attribute(Some(""), directive)
        };
        trace!(id = %target_id, ?intent, "routing dialog intent");
        tree.route_dialog_intent(node, intent);
        report.hit();
        return;
    }

    if directive.is_some() {
        warn!(id = %target_id, name, "dialog directive on a non-dialog element, applying attribute only");
    }
    set_or_remove(tree, node, target_id, name, value, report);
}

fn set_or_remove<T: DomTree + ?Sized>(
    tree: &mut T,
    node: T::Node,
    target_id: NodeId,
    name: &str,
    value: Option<&str>,
    report: &mut ApplyReport,
) {
    let result = match value {
        Some(value) => tree.set_attribute(node, name, value),
        None => tree.remove_attribute(node, name),
    };
    match result {
        Ok(()) => report.hit(),
        Err(err) => {
            warn!(id = %target_id, name, %err, "attribute mutation failed");
            report.skip();
        }
    }
}

fn apply_text<T: DomTree + ?Sized>(
    tree: &mut T,
    mirror: &Mirror<T::Node>,
    target_id: NodeId,
    value: &str,
    report: &mut ApplyReport,
) {
    let Some(node) = mirror.get(target_id) else {
        warn!(id = %target_id, "text mutation on unknown node");
        report.skip();
        return;
    };
    match tree.set_text(node, value) {
        Ok(()) => report.hit(),
        Err(err) => {
            warn!(id = %target_id, %err, "text mutation failed");
            report.skip();
        }
    }
}

fn apply_child_list<T: DomTree + ?Sized>(
    tree: &mut T,
    mirror: &mut Mirror<T::Node>,
    target_id: NodeId,
    added: &[AddedNode],
    removed: &[NodeId],
    report: &mut ApplyReport,
) {
    let Some(parent) = mirror.get(target_id) else {
        warn!(id = %target_id, "child list mutation on unknown node");
        report.skipped += added.len() + removed.len();
        return;
    };

    for &id in removed {
        remove_node(tree, mirror, parent, id, report);
    }
    for addition in added {
        add_node(tree, mirror, parent, addition, report);
    }
}

fn remove_node<T: DomTree + ?Sized>(
    tree: &mut T,
    mirror: &mut Mirror<T::Node>,
    parent: T::Node,
    id: NodeId,
    report: &mut ApplyReport,
) {
    let Some(node) = mirror.get(id) else {
        warn!(id = %id, "removal of unknown node");
        report.skip();
        return;
    };
    if tree.parent(node) != Some(parent) {
        warn!(id = %id, "removal of a node that is not a child of the target");
        report.skip();
        return;
    }
    // Forget the subtree while it is still reachable.
    mirror.remove_subtree(tree, node);
    match tree.remove_child(parent, node) {
        Ok(()) => report.hit(),
        Err(err) => {
            warn!(id = %id, %err, "node removal failed");
            report.skip();
        }
    }
}

fn add_node<T: DomTree + ?Sized>(
    tree: &mut T,
    mirror: &mut Mirror<T::Node>,
    parent: T::Node,
    addition: &AddedNode,
    report: &mut ApplyReport,
) {
    let reference = match addition.next_sibling_id {
        None => None,
        Some(sibling_id) => match mirror.get(sibling_id) {
            Some(sibling) if tree.parent(sibling) == Some(parent) => Some(sibling),
            _ => {
                warn!(id = %addition.node.id, sibling = %sibling_id, "next sibling not found under target, appending");
                report.skip();
                None
            }
        },
    };

    // A known, live node is moved rather than rebuilt.
    let existing = mirror
        .get(addition.node.id)
        .filter(|&node| tree.node_kind(node).is_some_and(|kind| kind != NodeKind::Document));
    let node = match existing {
        Some(node) => node,
        None => match build_node(tree, mirror, &addition.node) {
            Some(node) => node,
            None => {
                report.skip();
                return;
            }
        },
    };

    match tree.insert_before(parent, node, reference) {
        Ok(()) => {
            report.hit();
            if existing.is_none() {
                restore_open_modes(tree, mirror, &addition.node);
            }
        }
        Err(err) => {
            warn!(id = %addition.node.id, %err, "node insertion failed");
            if existing.is_none() {
                mirror.remove_subtree(tree, node);
            }
            report.skip();
        }
    }
}

/// Apply a recorded input value to a form control.
pub fn apply_input<T: DomTree + ?Sized>(
    tree: &mut T,
    mirror: &Mirror<T::Node>,
    id: NodeId,
    text: &str,
    is_checked: Option<bool>,
) -> ApplyReport {
    let mut report = ApplyReport::default();
    let Some(node) = mirror.get(id) else {
        warn!(id = %id, "input on unknown node");
        report.skip();
        return report;
    };

    if tree.tag_name(node).is_some_and(|tag| tag.eq_ignore_ascii_case("textarea")) {
        // Textarea value lives in its text child when it has one.
        let text_child = tree
            .children(node)
            .iter()
            .copied()
            .find(|&c| tree.node_kind(c) == Some(NodeKind::Text));
        if let Some(child) = text_child {
            match tree.set_text(child, text) {
                Ok(()) => report.hit(),
                Err(err) => {
                    warn!(id = %id, %err, "textarea input failed");
                    report.skip();
                }
            }
            return report;
        }
    }

    set_or_remove(tree, node, id, "value", Some(text), &mut report);
    if let Some(checked) = is_checked {
        let value = if checked { Some("") } else { None };
        set_or_remove(tree, node, id, "checked", value, &mut report);
    }
    report
}
