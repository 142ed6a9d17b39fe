//! Node Reconstructor: builds trees from full snapshots.
//!
//! Attributes are set before children are attached, and a dialog's `open`
//! attribute is set directly: a snapshot is a resting state, not a
//! transition. Modal dialogs need a connected element for `showModal()`,
//! so their modal mode is restored after the subtree is attached.

use tracing::{debug, warn};

use crate::dialog::DialogIntent;
use crate::dom::DomTree;
use crate::events::{OpenMode, SerializedData, SerializedNode};
use crate::mirror::Mirror;

/// Build `node` and its descendants, registering each in `mirror`.
///
/// Returns the created node, or `None` for kinds that do not produce a node
/// (nested documents, CDATA).
pub fn build_node<T: DomTree + ?Sized>(
    tree: &mut T,
    mirror: &mut Mirror<T::Node>,
    node: &SerializedNode,
) -> Option<T::Node> {
    let created = match &node.data {
        SerializedData::Element {
            tag_name,
            attributes,
            is_svg,
            ..
        } => {
            let element = tree.create_element(tag_name, *is_svg);
            for (name, value) in attributes {
                if let Err(err) = tree.set_attribute(element, name, value) {
                    warn!(id = %node.id, name = name.as_str(), %err, "failed to set snapshot attribute");
                }
            }
            element
        }
        SerializedData::Text { text_content } => tree.create_text(text_content),
        SerializedData::Comment { text_content } => tree.create_comment(text_content),
        SerializedData::DocumentType {
            name,
            public_id,
            system_id,
        } => tree.create_doctype(name, public_id, system_id),
        SerializedData::Document { .. } | SerializedData::CData => {
            warn!(id = %node.id, "skipping node kind that cannot be built in place");
            return None;
        }
    };

    mirror.insert(node.id, created);
    build_children(tree, mirror, created, node.children());
    Some(created)
}

fn build_children<T: DomTree + ?Sized>(
    tree: &mut T,
    mirror: &mut Mirror<T::Node>,
    parent: T::Node,
    children: &[SerializedNode],
) {
    for child in children {
        let Some(built) = build_node(tree, mirror, child) else {
            continue;
        };
        if let Err(err) = tree.insert_before(parent, built, None) {
            warn!(id = %child.id, %err, "failed to attach snapshot child");
            mirror.remove_subtree(tree, built);
        }
    }
}

/// Restore the recorded modal mode of open dialogs in `node`'s subtree.
///
/// Call once the subtree is connected.
pub fn restore_open_modes<T: DomTree + ?Sized>(
    tree: &mut T,
    mirror: &Mirror<T::Node>,
    node: &SerializedNode,
) {
    let mut modal = Vec::new();
    node.walk(&mut |n| {
        if n.open_mode() == Some(OpenMode::Modal) {
            modal.push(n.id);
        }
    });

    for id in modal {
        let Some(dialog) = mirror.get(id) else {
            continue;
        };
        tree.route_dialog_intent(dialog, DialogIntent::Directive(OpenMode::Modal.directive()));
    }
}

/// Replace the document content with the snapshot rooted at `root`.
///
/// The mirror is reset and repopulated. A `Document` root maps onto the
/// tree's own document node; any other root is appended to it.
pub fn rebuild<T: DomTree + ?Sized>(tree: &mut T, mirror: &mut Mirror<T::Node>, root: &SerializedNode) {
    mirror.reset();
    tree.clear_document();

    let document = tree.document();
    match &root.data {
        SerializedData::Document { children } => {
            mirror.insert(root.id, document);
            build_children(tree, mirror, document, children);
        }
        _ => {
            if let Some(built) = build_node(tree, mirror, root) {
                if let Err(err) = tree.insert_before(document, built, None) {
                    warn!(id = %root.id, %err, "failed to attach snapshot root");
                }
            }
        }
    }

    restore_open_modes(tree, mirror, root);
    debug!(nodes = mirror.len(), "rebuilt tree from full snapshot");
}
