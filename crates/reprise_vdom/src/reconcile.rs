//! Patch a live tree from the virtual tree.
//!
//! The walk pairs virtual and live nodes by recorded id through the two
//! mirrors. Attributes and text are diffed, children are removed, created
//! and reordered, then dialogs are settled. A dialog's `open` attribute is
//! never diffed: its open state belongs to the dialog adapter, which is
//! driven from the intents the virtual tree recorded.

use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace, warn};

use reprise_core::dialog::DialogAdapter;
use reprise_core::dom::{is_dialog, DomTree, NodeKind};
use reprise_core::error::DomError;
use reprise_core::mirror::Mirror;
use reprise_core::ModalState;

use crate::error::{ReconcileError, Result};
use crate::vdom::{VNodeData, VNodeKey, VirtualDom};

/// Operations issued against the live tree by one reconcile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PatchReport {
    pub attributes_set: usize,
    pub attributes_removed: usize,
    pub texts_updated: usize,
    pub created: usize,
    pub removed: usize,
    pub moved: usize,
    pub dialogs_settled: usize,
    /// The incremental patch failed and the live tree was rebuilt.
    pub rebuilt: bool,
}

impl PatchReport {
    pub fn total(&self) -> usize {
        self.attributes_set
            + self.attributes_removed
            + self.texts_updated
            + self.created
            + self.removed
            + self.moved
            + self.dialogs_settled
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0 && !self.rebuilt
    }
}

/// Virtual-to-live tree reconciler.
pub struct Reconciler;

impl Reconciler {
    /// Bring `live` in line with `vdom`, then clear the recorded intents.
    ///
    /// When the incremental patch fails, the live content is dropped and
    /// rebuilt from the virtual tree's current state.
    pub fn reconcile<L: DomTree + ?Sized>(
        vdom: &mut VirtualDom,
        vmirror: &Mirror<VNodeKey>,
        live: &mut L,
        live_mirror: &mut Mirror<L::Node>,
    ) -> PatchReport {
        let report = match Self::patch(vdom, vmirror, live, live_mirror) {
            Ok(report) => report,
            Err(err) => {
                warn!(%err, "incremental patch failed, rebuilding live tree");
                live.clear_document();
                live_mirror.reset();
                let mut report = Self::patch(vdom, vmirror, live, live_mirror).unwrap_or_else(|err| {
                    warn!(%err, "live rebuild from virtual tree failed");
                    PatchReport::default()
                });
                report.rebuilt = true;
                report
            }
        };
        vdom.clear_pending();

        debug!(
            created = report.created,
            removed = report.removed,
            moved = report.moved,
            attributes = report.attributes_set + report.attributes_removed,
            texts = report.texts_updated,
            dialogs = report.dialogs_settled,
            rebuilt = report.rebuilt,
            "reconciled live tree"
        );
        report
    }

    /// One incremental patch pass. Leaves pending intents in place.
    pub fn patch<L: DomTree + ?Sized>(
        vdom: &VirtualDom,
        vmirror: &Mirror<VNodeKey>,
        live: &mut L,
        live_mirror: &mut Mirror<L::Node>,
    ) -> Result<PatchReport> {
        let vroot = vdom.document();
        let lroot = live.document();
        if let Some(id) = vmirror.id_of(vroot) {
            live_mirror.insert(id, lroot);
        }

        let top_layer = live.top_layer_order();
        let mut patcher = Patcher {
            vdom,
            vmirror,
            live,
            live_mirror,
            report: PatchReport::default(),
            dialogs: Vec::new(),
            top_layer,
        };
        patcher.patch_children(vroot, lroot)?;
        patcher.settle_dialogs();
        Ok(patcher.report)
    }
}

struct PairedDialog<N> {
    vnode: VNodeKey,
    live: N,
    created: bool,
}

struct Patcher<'a, L: DomTree + ?Sized> {
    vdom: &'a VirtualDom,
    vmirror: &'a Mirror<VNodeKey>,
    live: &'a mut L,
    live_mirror: &'a mut Mirror<L::Node>,
    report: PatchReport,
    dialogs: Vec<PairedDialog<L::Node>>,
    /// Live top layer before any structural change.
    top_layer: Vec<L::Node>,
}

impl<L: DomTree + ?Sized> Patcher<'_, L> {
    fn patch_node(&mut self, vnode: VNodeKey, lnode: L::Node) -> Result<()> {
        let vdom = self.vdom;
        match vdom.node(vnode).map(|n| &n.data) {
            Some(VNodeData::Element { attributes, .. }) => {
                self.patch_attributes(vnode, lnode, attributes)?;
            }
            Some(VNodeData::Text(text) | VNodeData::Comment(text)) => {
                if self.live.text(lnode) != Some(text.as_str()) {
                    self.live.set_text(lnode, text)?;
                    self.report.texts_updated += 1;
                }
            }
            _ => {}
        }
        self.patch_children(vnode, lnode)
    }

    fn patch_attributes(
        &mut self,
        vnode: VNodeKey,
        lnode: L::Node,
        attributes: &IndexMap<String, String>,
    ) -> Result<()> {
        let dialog = is_dialog(self.vdom, vnode);
        for (name, value) in attributes {
            if dialog && name == "open" {
                continue;
            }
            if self.live.attribute(lnode, name) != Some(value.as_str()) {
                self.live.set_attribute(lnode, name, value)?;
                self.report.attributes_set += 1;
            }
        }

        let stale: Vec<String> = self
            .live
            .attributes(lnode)
            .into_iter()
            .filter(|(name, _)| !(dialog && *name == "open") && !attributes.contains_key(*name))
            .map(|(name, _)| name.to_string())
            .collect();
        for name in stale {
            self.live.remove_attribute(lnode, &name)?;
            self.report.attributes_removed += 1;
        }
        Ok(())
    }

    fn patch_children(&mut self, vnode: VNodeKey, lnode: L::Node) -> Result<()> {
        let vdom = self.vdom;
        let vchildren = vdom.children(vnode);

        let mut desired = Vec::with_capacity(vchildren.len());
        for &vchild in vchildren {
            desired.push(self.resolve(vchild)?);
        }

        let keep: FxHashSet<L::Node> = desired.iter().copied().collect();
        let current = self.live.children(lnode).to_vec();
        for child in current {
            if !keep.contains(&child) {
                self.remove_live(lnode, child)?;
            }
        }

        // Children already in the right relative order stay put; the rest are
        // placed back to front in front of their successor.
        let index_of: FxHashMap<L::Node, usize> = self
            .live
            .children(lnode)
            .iter()
            .enumerate()
            .map(|(index, &child)| (child, index))
            .collect();
        let positions: Vec<Option<usize>> = desired.iter().map(|child| index_of.get(child).copied()).collect();
        let stable = increasing_run(&positions);

        let mut next = None;
        for (index, &lchild) in desired.iter().enumerate().rev() {
            if !stable.contains(&index) {
                let was_attached = self.live.parent(lchild).is_some();
                self.live.insert_before(lnode, lchild, next)?;
                if was_attached {
                    self.report.moved += 1;
                }
            }
            next = Some(lchild);
        }

        for (&vchild, &lchild) in vchildren.iter().zip(&desired) {
            self.patch_node(vchild, lchild)?;
        }
        Ok(())
    }

    /// Live counterpart of `vchild`, created (detached, childless) if missing.
    fn resolve(&mut self, vchild: VNodeKey) -> Result<L::Node> {
        let vdom = self.vdom;
        let id = self.vmirror.id_of(vchild);

        let existing = match id.and_then(|id| self.live_mirror.get(id).map(|n| (id, n))) {
            Some((id, lnode)) => match self.live.node_kind(lnode) {
                None => return Err(ReconcileError::LiveNodeMissing(id)),
                Some(kind) if self.same_shape(vchild, lnode, kind) => Some(lnode),
                Some(_) => {
                    trace!(%id, "node shape changed, replacing live node");
                    None
                }
            },
            None => None,
        };

        let (lnode, created) = match existing {
            Some(lnode) => (lnode, false),
            None => {
                let lnode = self.create(vchild)?;
                if let Some(id) = id {
                    self.live_mirror.insert(id, lnode);
                }
                self.report.created += 1;
                (lnode, true)
            }
        };

        if is_dialog(vdom, vchild) {
            self.dialogs.push(PairedDialog {
                vnode: vchild,
                live: lnode,
                created,
            });
        }
        Ok(lnode)
    }

    fn same_shape(&self, vchild: VNodeKey, lnode: L::Node, kind: NodeKind) -> bool {
        let vdom = self.vdom;
        if vdom.node_kind(vchild) != Some(kind) {
            return false;
        }
        match kind {
            NodeKind::Element => match (vdom.tag_name(vchild), self.live.tag_name(lnode)) {
                (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
                _ => false,
            },
            _ => true,
        }
    }

    fn create(&mut self, vchild: VNodeKey) -> Result<L::Node> {
        let vdom = self.vdom;
        let Some(node) = vdom.node(vchild) else {
            return Err(DomError::MissingNode.into());
        };
        let lnode = match &node.data {
            VNodeData::Element {
                tag_name,
                is_svg,
                attributes,
            } => {
                let dialog = is_dialog(vdom, vchild);
                let element = self.live.create_element(tag_name, *is_svg);
                for (name, value) in attributes {
                    if dialog && name == "open" {
                        continue;
                    }
                    self.live.set_attribute(element, name, value)?;
                }
                element
            }
            VNodeData::Text(text) => self.live.create_text(text),
            VNodeData::Comment(text) => self.live.create_comment(text),
            VNodeData::DocumentType {
                name,
                public_id,
                system_id,
            } => self.live.create_doctype(name, public_id, system_id),
            VNodeData::Document => return Err(DomError::WrongKind("nested document").into()),
        };
        Ok(lnode)
    }

    fn remove_live(&mut self, parent: L::Node, child: L::Node) -> Result<()> {
        // Ids still present in the virtual tree may be placed elsewhere later in the walk.
        for node in reprise_core::dom::subtree(&*self.live, child) {
            if let Some(id) = self.live_mirror.id_of(node) {
                if !self.vmirror.contains(id) {
                    self.live_mirror.remove(id);
                }
            }
        }
        self.live.remove_child(parent, child)?;
        self.report.removed += 1;
        Ok(())
    }

    /// Settle each dialog to its virtual state.
    ///
    /// Dialogs that were already modal keep their stacking order; dialogs that
    /// entered the top layer go above them in the order they entered it. A
    /// structural move can drop a modal dialog from the live top layer, in
    /// which case every modal dialog stacked above it is re-shown too.
    fn settle_dialogs(&mut self) {
        let vdom = self.vdom;
        let top_layer = std::mem::take(&mut self.top_layer);
        let mut dialogs: Vec<(Stacking, PairedDialog<L::Node>)> = std::mem::take(&mut self.dialogs)
            .into_iter()
            .map(|dialog| {
                let stacking = match vdom.top_layer_entry(dialog.vnode) {
                    Some(seq) => Stacking::Entered(seq),
                    None => match top_layer.iter().position(|&n| n == dialog.live) {
                        Some(position) => Stacking::Kept(position),
                        None => Stacking::Below,
                    },
                };
                (stacking, dialog)
            })
            .collect();
        dialogs.sort_by_key(|(stacking, _)| *stacking);

        let mut restack = false;
        for (stacking, PairedDialog { vnode, live, created }) in dialogs {
            let native = self.live.dialog_state(live).is_some();
            let before = DialogAdapter::current_state(&*self.live, live);
            let target = vdom.modal_state(vnode);

            let reenter = match stacking {
                Stacking::Entered(_) => !created,
                Stacking::Kept(_) if target.is_modal() => {
                    let dropped = !before.is_modal();
                    let reenter = restack;
                    restack |= dropped;
                    reenter
                }
                _ => false,
            };

            if !(reenter && before.is_modal()) && in_sync(native, before, target) {
                continue;
            }
            let reached = DialogAdapter::settle(&mut *self.live, live, target, reenter);

            trace!(?vnode, ?before, ?reached, ?stacking, "settled dialog");
            if reached != before || reenter {
                self.report.dialogs_settled += 1;
            }
        }
    }
}

/// Where a dialog belongs in the live top layer once settled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Stacking {
    /// Not in the top layer before the patch and not shown modally since.
    Below,
    /// In the top layer before the patch, at this position.
    Kept(usize),
    /// Shown modally since the last reconcile, with this intent sequence.
    Entered(u64),
}

/// Indices of the longest run of `positions` that is already increasing.
/// `None` entries (children not yet under the parent) never belong to it.
fn increasing_run(positions: &[Option<usize>]) -> FxHashSet<usize> {
    // tails[k]: index into `positions` ending the best run of length k + 1
    let mut tails: Vec<usize> = Vec::new();
    let mut prev: Vec<Option<usize>> = vec![None; positions.len()];

    for (index, position) in positions.iter().enumerate() {
        let Some(position) = *position else {
            continue;
        };
        let at = tails.partition_point(|&t| positions[t].is_some_and(|p| p < position));
        if at > 0 {
            prev[index] = Some(tails[at - 1]);
        }
        if at == tails.len() {
            tails.push(index);
        } else {
            tails[at] = index;
        }
    }

    let mut run = FxHashSet::default();
    let mut cursor = tails.last().copied();
    while let Some(index) = cursor {
        run.insert(index);
        cursor = prev[index];
    }
    run
}

/// Without native dialogs only the `open` attribute is observable.
fn in_sync(native: bool, live: ModalState, target: ModalState) -> bool {
    if native {
        live == target
    } else {
        live.is_open() == target.is_open()
    }
}
