//! Replay engine for recorded sessions.
//!
//! This module provides:
//! - `VirtualClock` - Deterministic time control for replay
//! - `Timeline` - Ordered events with full snapshot positions indexed
//! - `Replayer` - Seek and play back a recording onto a document
//! - `Emitter` - Lifecycle notifications for subscribers
//!
//! # Example
//!
//! ```ignore
//! use reprise_replay::{ReplayConfig, Replayer};
//! use reprise_core::HostDocument;
//!
//! let mut replayer = Replayer::from_json(&json, HostDocument::new(), ReplayConfig::default())?;
//!
//! // Jump to a point in time
//! replayer.pause(1_500);
//!
//! // Or play at 2x speed, driven by the host's frame loop
//! replayer.set_speed(2.0);
//! let token = replayer.play();
//! while !replayer.tick(token).finished {
//!     // Render the document...
//! }
//! ```

mod clock;
mod emitter;
mod player;
mod timeline;

pub use clock::VirtualClock;
pub use emitter::{Emitter, HandlerId, ReplayerEvent, ReplayerEventHandler, ReplayerEventKind};
pub use player::{FrameUpdate, PlaybackToken, ReplayState, Replayer, SeekReport, Viewport};
pub use timeline::Timeline;
