//! Headless verification of replays.
//!
//! This module provides:
//! - `FrameCapture` - Structural frame of a host document
//! - `ScenarioRunner` - Run a seek scenario with and without the virtual DOM
//! - `dialog_playback` - Recorded session covering every dialog transition

pub mod dialog_playback;
mod frame;
mod runner;

pub use frame::{compare_frames, FrameCapture, FrameComparison, FrameSequence};
pub use runner::{ScenarioConfig, ScenarioResult, ScenarioRun, ScenarioRunner};
