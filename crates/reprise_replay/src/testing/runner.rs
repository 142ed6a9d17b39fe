//! Scenario runner for replay verification.
//!
//! Runs the same recording and seek sequence once with the virtual DOM and
//! once applying mutations directly, capturing a frame after every seek so
//! the two renderings can be compared.

use reprise_core::{Event, HostCapabilities, HostDocument, NativeCall};
use tracing::debug;

use super::frame::{compare_frames, FrameCapture, FrameComparison, FrameSequence};
use crate::config::ReplayConfig;
use crate::error::Result;
use crate::replay::Replayer;

/// Configuration for the scenario runner.
#[derive(Clone, Debug)]
pub struct ScenarioConfig {
    /// Replay options shared by both runs; `use_virtual_dom` is overridden.
    pub replay: ReplayConfig,
    /// Native features of the host documents.
    pub capabilities: HostCapabilities,
    /// Maximum frames kept per run.
    pub max_frames: usize,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            replay: ReplayConfig::testing(),
            capabilities: HostCapabilities::default(),
            max_frames: 256,
        }
    }
}

impl ScenarioConfig {
    /// Host without native dialog support.
    pub fn legacy() -> Self {
        Self::default().with_capabilities(HostCapabilities::legacy())
    }

    pub fn with_capabilities(mut self, capabilities: HostCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_replay(mut self, replay: ReplayConfig) -> Self {
        self.replay = replay;
        self
    }
}

/// Output of one run.
pub struct ScenarioRun {
    /// Frame after the last seek.
    pub frame: FrameCapture,
    /// Frame after every seek, in order.
    pub frames: FrameSequence,
    /// Native dialog calls issued by the seeks, construction excluded.
    pub native_calls: Vec<NativeCall>,
}

/// Both runs of a scenario.
pub struct ScenarioResult {
    pub virtual_dom: ScenarioRun,
    pub direct: ScenarioRun,
}

impl ScenarioResult {
    /// Whether both runs rendered identical frames after every seek.
    pub fn frames_match(&self) -> bool {
        self.virtual_dom.frames.len() == self.direct.frames.len()
            && self
                .virtual_dom
                .frames
                .iter()
                .zip(self.direct.frames.iter())
                .all(|(a, b)| a.is_identical_to(b))
    }

    /// Compare the final frames, the direct run taken as expected.
    pub fn comparison(&self) -> FrameComparison {
        compare_frames(&self.virtual_dom.frame, &self.direct.frame)
    }
}

/// Runs seek scenarios against in-memory host documents.
pub struct ScenarioRunner {
    config: ScenarioConfig,
}

impl ScenarioRunner {
    pub fn new(config: ScenarioConfig) -> Self {
        Self { config }
    }

    /// Runner with a native-dialog host.
    pub fn default_runner() -> Self {
        Self::new(ScenarioConfig::default())
    }

    /// Runner with a host lacking native dialog support.
    pub fn legacy() -> Self {
        Self::new(ScenarioConfig::legacy())
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    /// Pause at each of `seeks` in order, once per mode.
    pub fn run(&self, events: &[Event], seeks: &[i64]) -> Result<ScenarioResult> {
        Ok(ScenarioResult {
            virtual_dom: self.run_mode(events, seeks, true)?,
            direct: self.run_mode(events, seeks, false)?,
        })
    }

    /// Pause at each of `seeks` in order with the given mode.
    pub fn run_mode(&self, events: &[Event], seeks: &[i64], use_virtual_dom: bool) -> Result<ScenarioRun> {
        let config = self.config.replay.clone().with_virtual_dom(use_virtual_dom);
        let document = HostDocument::with_capabilities(self.config.capabilities);
        let mut replayer = Replayer::new(events.to_vec(), document, config)?;
        let baseline = replayer.document().native_call_count();

        let mut frames = FrameSequence::new(self.config.max_frames);
        for &t in seeks {
            replayer.pause(t);
            frames.push(FrameCapture::capture(replayer.document(), replayer.mirror()));
        }

        let frame = FrameCapture::capture(replayer.document(), replayer.mirror());
        let native_calls: Vec<NativeCall> = replayer
            .document()
            .native_calls_since(baseline)
            .iter()
            .map(|record| record.call)
            .collect();
        debug!(
            use_virtual_dom,
            seeks = seeks.len(),
            native_calls = native_calls.len(),
            "scenario run complete"
        );

        Ok(ScenarioRun {
            frame,
            frames,
            native_calls,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::dialog_playback;
    use reprise_core::ModalState;

    #[test]
    fn test_runner_basic() {
        let runner = ScenarioRunner::default_runner();
        let result = runner
            .run(&dialog_playback::events(), &[dialog_playback::SHOW_INCREMENTAL_ATTRIBUTE_TIME])
            .unwrap();

        assert!(result.frames_match());
        assert!(result.comparison().passed);
        assert_eq!(result.virtual_dom.frames.len(), 1);
        assert_eq!(
            result.direct.frame.dialog(dialog_playback::DIALOG_ID),
            Some(ModalState::Shown)
        );
    }

    #[test]
    fn test_config_builders() {
        let config = ScenarioConfig::legacy().with_replay(ReplayConfig::testing().with_speed(2.0));
        assert!(!config.capabilities.native_dialog);
        assert_eq!(config.replay.speed, 2.0);
        assert_eq!(config.max_frames, 256);
    }
}
