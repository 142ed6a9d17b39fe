//! Reprise replay engine
//!
//! Seeks and plays back recorded DOM sessions onto a [`DomTree`]. The
//! [`Replayer`] orders events on a [`Timeline`], drives them with a
//! [`VirtualClock`] and, when enabled, batches mutations in a virtual DOM
//! that is reconciled onto the live document once per frame.
//!
//! ```
//! use reprise_core::{DialogDirective, Event, HostDocument, IncrementalMutation, SerializedNode};
//! use reprise_replay::{ReplayConfig, Replayer};
//!
//! let page = SerializedNode::document(1, vec![]).with_child(
//!     SerializedNode::element(2, "body").with_child(SerializedNode::element(5, "dialog")),
//! );
//! let events = vec![
//!     Event::full_snapshot(0, page),
//!     Event::mutations(100, vec![IncrementalMutation::dialog(5, DialogDirective::ShowModal)]),
//! ];
//!
//! let mut replayer = Replayer::new(events, HostDocument::new(), ReplayConfig::default()).unwrap();
//! replayer.pause(100);
//!
//! let dialog = replayer.node(5).unwrap();
//! assert_eq!(replayer.document().top_layer(), &[dialog]);
//! ```
//!
//! [`DomTree`]: reprise_core::DomTree

pub mod config;
pub mod error;
pub mod replay;
pub mod testing;

pub use config::{ConfigError, ReplayConfig, MAX_SPEED, MIN_SPEED};
pub use error::{ReplayError, Result};
pub use replay::{
    Emitter, FrameUpdate, HandlerId, PlaybackToken, ReplayState, Replayer, ReplayerEvent, ReplayerEventKind,
    SeekReport, Timeline, Viewport, VirtualClock,
};
