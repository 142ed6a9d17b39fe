//! Replayer: seek and playback over a render target.
//!
//! Every operation applies whole events and ends with a presented frame.
//! With the virtual DOM enabled, incremental batches land in the virtual
//! tree and the live tree is patched once per seek or tick; otherwise they
//! are applied to the live tree directly.

use std::time::Duration;

use reprise_core::{
    apply_batch, apply_input, rebuild, ApplyReport, DomTree, EventData, HostDocument,
    IncrementalData, Mirror, NodeId, Timestamp,
};
use reprise_vdom::{PatchReport, Reconciler, VNodeKey, VirtualDom};
use tracing::{debug, trace, warn};

use super::{Emitter, HandlerId, ReplayerEvent, ReplayerEventKind, Timeline, VirtualClock};
use crate::config::ReplayConfig;
use crate::error::Result;

/// Current state of the replayer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplayState {
    /// Not started.
    Idle,
    Playing,
    Paused,
    /// Reached the end.
    Finished,
}

/// Ticket issued by `play`. Ticks carrying an older ticket are ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PlaybackToken {
    epoch: u64,
}

impl PlaybackToken {
    pub fn epoch(self) -> u64 {
        self.epoch
    }
}

/// Recorded page viewport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Viewport {
    pub href: String,
    pub width: u32,
    pub height: u32,
}

/// Result of one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameUpdate {
    /// Virtual time after the tick.
    pub position: Timestamp,
    /// Events applied during the tick.
    pub events_applied: usize,
    pub mutations: ApplyReport,
    /// Live tree patch, when the virtual DOM is enabled.
    pub patch: Option<PatchReport>,
    pub finished: bool,
    /// The tick carried an outdated token and did nothing.
    pub stale: bool,
}

impl FrameUpdate {
    pub fn has_events(&self) -> bool {
        self.events_applied > 0
    }
}

/// Result of a seek.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SeekReport {
    /// Replayed from the most recent full snapshot rather than forward.
    pub rebuilt: bool,
    pub events_applied: usize,
    pub mutations: ApplyReport,
    pub patch: Option<PatchReport>,
}

/// Replays a recording onto a [`DomTree`].
pub struct Replayer<D: DomTree = HostDocument> {
    timeline: Timeline,
    config: ReplayConfig,
    clock: VirtualClock,
    state: ReplayState,
    epoch: u64,
    /// `timeline.events()[..applied]` are reflected in the document.
    applied: usize,
    live: D,
    live_mirror: Mirror<D::Node>,
    vdom: VirtualDom,
    vmirror: Mirror<VNodeKey>,
    pending_scrolls: Vec<(NodeId, f64, f64)>,
    viewport: Option<Viewport>,
    emitter: Emitter,
}

impl<D: DomTree> Replayer<D> {
    /// Build a replayer over `live` and render up to the first full snapshot.
    pub fn new(events: Vec<reprise_core::Event>, live: D, config: ReplayConfig) -> Result<Self> {
        config.validate()?;
        let timeline = Timeline::new(events)?;
        let mut clock = VirtualClock::new(timeline.start(), timeline.end());
        clock.set_speed(config.speed);

        let mut replayer = Self {
            timeline,
            config,
            clock,
            state: ReplayState::Idle,
            epoch: 0,
            applied: 0,
            live,
            live_mirror: Mirror::new(),
            vdom: VirtualDom::new(),
            vmirror: Mirror::new(),
            pending_scrolls: Vec::new(),
            viewport: None,
            emitter: Emitter::new(),
        };
        let initial = replayer
            .timeline
            .first_snapshot_time()
            .unwrap_or_else(|| replayer.timeline.start());
        replayer.seek_to(initial);
        Ok(replayer)
    }

    /// Build a replayer from a JSON array of events.
    pub fn from_json(json: &str, live: D, config: ReplayConfig) -> Result<Self> {
        let events: Vec<reprise_core::Event> = serde_json::from_str(json)?;
        Self::new(events, live, config)
    }

    pub fn state(&self) -> ReplayState {
        self.state
    }

    pub fn config(&self) -> &ReplayConfig {
        &self.config
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn clock(&self) -> &VirtualClock {
        &self.clock
    }

    /// Current virtual time.
    pub fn current_time(&self) -> Timestamp {
        self.clock.position()
    }

    /// Recording length in milliseconds.
    pub fn duration(&self) -> u64 {
        self.clock.duration_ms()
    }

    pub fn progress(&self) -> f32 {
        self.clock.progress()
    }

    pub fn speed(&self) -> f64 {
        self.clock.speed()
    }

    /// Change the playback rate; takes effect on the next tick.
    pub fn set_speed(&mut self, speed: f64) {
        self.clock.set_speed(speed);
    }

    pub fn viewport(&self) -> Option<&Viewport> {
        self.viewport.as_ref()
    }

    /// The render target.
    pub fn document(&self) -> &D {
        &self.live
    }

    /// Give the render target back.
    pub fn into_document(self) -> D {
        self.live
    }

    /// Live node for a recorded id.
    pub fn node(&self, id: impl Into<NodeId>) -> Option<D::Node> {
        self.live_mirror.get(id.into())
    }

    pub fn mirror(&self) -> &Mirror<D::Node> {
        &self.live_mirror
    }

    /// Register a handler for one kind of replayer event.
    pub fn on<F>(&mut self, kind: ReplayerEventKind, handler: F) -> HandlerId
    where
        F: FnMut(&ReplayerEvent) + 'static,
    {
        self.emitter.subscribe(Some(kind), handler)
    }

    /// Register a handler for every replayer event.
    pub fn on_any<F>(&mut self, handler: F) -> HandlerId
    where
        F: FnMut(&ReplayerEvent) + 'static,
    {
        self.emitter.subscribe(None, handler)
    }

    pub fn off(&mut self, id: HandlerId) -> bool {
        self.emitter.unsubscribe(id)
    }

    /// Show the document as of virtual time `t` and invalidate running ticks.
    ///
    /// Running playback stops; call [`play`](Self::play) for a new token.
    pub fn seek(&mut self, t: impl Into<Timestamp>) -> SeekReport {
        self.epoch += 1;
        match self.state {
            ReplayState::Playing => {
                self.clock.pause();
                self.state = ReplayState::Paused;
                self.emitter.emit(ReplayerEvent::Pause);
            }
            ReplayState::Finished => self.state = ReplayState::Paused,
            ReplayState::Idle | ReplayState::Paused => {}
        }
        self.seek_to(t.into())
    }

    /// Seek to `t` and stop there.
    pub fn pause(&mut self, t: impl Into<Timestamp>) -> SeekReport {
        let report = self.seek(t);
        self.halt();
        report
    }

    /// Stop at the current position.
    pub fn halt(&mut self) {
        self.epoch += 1;
        self.clock.pause();
        if matches!(self.state, ReplayState::Playing | ReplayState::Idle) {
            self.state = ReplayState::Paused;
            self.emitter.emit(ReplayerEvent::Pause);
        }
    }

    /// Start or resume playback from the current position.
    ///
    /// A finished replay starts over from the first full snapshot.
    pub fn play(&mut self) -> PlaybackToken {
        let previous = self.state;
        if previous == ReplayState::Finished || self.clock.is_at_end() {
            let start = self.restart_time();
            self.seek_to(start);
        }

        self.epoch += 1;
        self.clock.play();
        self.state = ReplayState::Playing;
        match previous {
            ReplayState::Paused => self.emitter.emit(ReplayerEvent::Resume),
            ReplayState::Idle | ReplayState::Finished => self.emitter.emit(ReplayerEvent::Start),
            ReplayState::Playing => {}
        }
        PlaybackToken { epoch: self.epoch }
    }

    /// Seek to `t`, then play.
    pub fn play_from(&mut self, t: impl Into<Timestamp>) -> PlaybackToken {
        self.seek(t);
        self.play()
    }

    /// Advance one frame of `frame_duration_ms` real time.
    pub fn tick(&mut self, token: PlaybackToken) -> FrameUpdate {
        self.advance(token, Duration::from_millis(self.config.frame_duration_ms))
    }

    /// Advance by `elapsed` real time, scaled by the playback speed.
    pub fn advance(&mut self, token: PlaybackToken, elapsed: Duration) -> FrameUpdate {
        if token.epoch != self.epoch || self.state != ReplayState::Playing {
            trace!(token = token.epoch, epoch = self.epoch, "ignoring stale tick");
            return FrameUpdate {
                position: self.clock.position(),
                stale: true,
                ..FrameUpdate::default()
            };
        }

        let reached_end = self.clock.advance(elapsed);
        let target = self.clock.position();
        let end = self.timeline.end_index(target);
        let from = self.applied;
        let mutations = self.apply_range(from, end);
        let patch = self.present();

        let mut update = FrameUpdate {
            position: target,
            events_applied: end.saturating_sub(from),
            mutations,
            patch,
            finished: false,
            stale: false,
        };

        if reached_end {
            if self.config.loop_playback {
                debug!("replay reached the end, looping");
                let start = self.restart_time();
                self.seek_to(start);
                self.clock.play();
            } else {
                self.state = ReplayState::Finished;
                update.finished = true;
                self.emitter.emit(ReplayerEvent::Finish);
            }
        }
        update
    }

    /// Where playback restarts after finishing.
    fn restart_time(&self) -> Timestamp {
        self.timeline
            .first_snapshot_time()
            .unwrap_or_else(|| self.timeline.start())
    }

    fn seek_to(&mut self, t: Timestamp) -> SeekReport {
        self.clock.seek(t);
        let end = self.timeline.end_index(t);

        // Forward when every applied event is at or before `t`.
        let (from, rebuilt) = if self.applied <= end {
            (self.applied, false)
        } else {
            match self.timeline.baseline_index(t) {
                Some(baseline) => (baseline, true),
                None => {
                    self.clear_documents();
                    (0, true)
                }
            }
        };

        let mutations = self.apply_range(from, end);
        let patch = self.present();
        debug!(
            t = t.as_millis(),
            from,
            to = end,
            rebuilt,
            skipped = mutations.skipped,
            "seek"
        );

        SeekReport {
            rebuilt,
            events_applied: end.saturating_sub(from),
            mutations,
            patch,
        }
    }

    fn clear_documents(&mut self) {
        self.live.clear_document();
        self.live_mirror.reset();
        self.vdom.clear_document();
        self.vmirror.reset();
        self.pending_scrolls.clear();
    }

    /// Apply `events[from..to]` and mark them applied.
    fn apply_range(&mut self, from: usize, to: usize) -> ApplyReport {
        let mut report = ApplyReport::default();
        for index in from..to {
            report.merge(self.apply_event(index));
        }
        self.applied = to.max(from);
        report
    }

    fn apply_event(&mut self, index: usize) -> ApplyReport {
        let Some(event) = self.timeline.get(index) else {
            return ApplyReport::default();
        };
        let timestamp = event.timestamp;
        let virtual_dom = self.config.use_virtual_dom;
        let mut report = ApplyReport::default();

        match &event.data {
            EventData::FullSnapshot {
                node,
                initial_offset,
            } => {
                rebuild(&mut self.live, &mut self.live_mirror, node);
                if virtual_dom {
                    rebuild(&mut self.vdom, &mut self.vmirror, node);
                    self.vdom.clear_pending();
                }
                self.pending_scrolls.clear();
                self.pending_scrolls
                    .push((node.id, initial_offset.left, initial_offset.top));
                self.emitter.emit(ReplayerEvent::FullSnapshotRebuilt { timestamp });
            }
            EventData::Incremental(IncrementalData::Mutation(batch)) => {
                trace!(t = timestamp.as_millis(), mutations = batch.len(), "applying mutations");
                report = if virtual_dom {
                    apply_batch(&mut self.vdom, &mut self.vmirror, batch)
                } else {
                    apply_batch(&mut self.live, &mut self.live_mirror, batch)
                };
            }
            EventData::Incremental(IncrementalData::Input { id, text, is_checked }) => {
                report = if virtual_dom {
                    apply_input(&mut self.vdom, &self.vmirror, *id, text, *is_checked)
                } else {
                    apply_input(&mut self.live, &self.live_mirror, *id, text, *is_checked)
                };
            }
            EventData::Incremental(IncrementalData::Scroll { id, x, y }) => {
                self.pending_scrolls.push((*id, *x, *y));
            }
            EventData::Incremental(IncrementalData::Other { kind }) => {
                trace!(t = timestamp.as_millis(), kind = kind.as_str(), "interaction event");
            }
            EventData::Meta {
                href,
                width,
                height,
            } => {
                self.viewport = Some(Viewport {
                    href: href.clone(),
                    width: *width,
                    height: *height,
                });
                self.emitter.emit(ReplayerEvent::MetaChanged {
                    href: href.clone(),
                    width: *width,
                    height: *height,
                });
            }
            EventData::Custom { tag, payload } => {
                self.emitter.emit(ReplayerEvent::CustomEvent {
                    tag: tag.clone(),
                    payload: payload.clone(),
                });
            }
            EventData::DomContentLoaded | EventData::Load => {
                trace!(t = timestamp.as_millis(), "document lifecycle event");
            }
        }
        report
    }

    /// Make the live tree reflect everything applied so far.
    fn present(&mut self) -> Option<PatchReport> {
        let patch = self.config.use_virtual_dom.then(|| {
            Reconciler::reconcile(
                &mut self.vdom,
                &self.vmirror,
                &mut self.live,
                &mut self.live_mirror,
            )
        });

        for (id, x, y) in std::mem::take(&mut self.pending_scrolls) {
            match self.live_mirror.get(id) {
                Some(node) => self.live.scroll_to(node, x, y),
                None => warn!(id = %id, "scroll on unknown node"),
            }
        }
        self.collect_detached();
        patch
    }

    /// Free removed subtrees once nothing maps to them.
    fn collect_detached(&mut self) {
        let live_mirror = &self.live_mirror;
        let freed = self.live.collect_detached(&|node| live_mirror.id_of(node).is_some());
        let vmirror = &self.vmirror;
        let vfreed = self.vdom.collect_detached(&|node| vmirror.id_of(node).is_some());
        if freed + vfreed > 0 {
            trace!(freed, vfreed, "collected detached nodes");
        }
    }
}
