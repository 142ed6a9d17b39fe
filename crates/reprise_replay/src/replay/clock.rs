//! Virtual clock for deterministic replay timing.
//!
//! The clock never reads wall time. The host's frame loop tells it how much
//! real time elapsed and the clock scales that by the playback speed, so a
//! replay driven by the same ticks always lands on the same positions.

use std::time::Duration;

use reprise_core::Timestamp;

use crate::config::clamp_speed;

/// A virtual clock over the recording's `[start, end]` range.
#[derive(Debug, Clone)]
pub struct VirtualClock {
    /// Current virtual time position.
    position: Timestamp,
    /// Whether the clock is running.
    running: bool,
    /// Playback speed multiplier.
    speed: f64,
    /// Sub-millisecond remainder carried between advances.
    carry: f64,
    start: Timestamp,
    end: Timestamp,
}

impl VirtualClock {
    pub fn new(start: Timestamp, end: Timestamp) -> Self {
        Self {
            position: start,
            running: false,
            speed: 1.0,
            carry: 0.0,
            start,
            end: end.max(start),
        }
    }

    pub fn position(&self) -> Timestamp {
        self.position
    }

    pub fn start(&self) -> Timestamp {
        self.start
    }

    pub fn end(&self) -> Timestamp {
        self.end
    }

    /// Length of the recording in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        self.end.saturating_since(self.start)
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Set the playback speed, clamped to the supported range.
    pub fn set_speed(&mut self, speed: f64) {
        self.speed = clamp_speed(speed);
    }

    pub fn play(&mut self) {
        self.running = true;
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    pub fn toggle(&mut self) {
        self.running = !self.running;
    }

    /// Seek to a position, clamped to the recording range.
    pub fn seek(&mut self, position: Timestamp) {
        self.position = position.clamp(self.start, self.end);
        self.carry = 0.0;
    }

    pub fn seek_to_start(&mut self) {
        self.seek(self.start);
    }

    pub fn seek_to_end(&mut self) {
        self.seek(self.end);
    }

    /// Seek by a relative amount of milliseconds.
    pub fn seek_by(&mut self, delta_ms: i64) {
        let target = self.position.as_millis().saturating_add(delta_ms);
        self.seek(Timestamp::from_millis(target));
    }

    /// Advance by `elapsed` real time scaled by the speed.
    ///
    /// Returns true if the clock reached the end.
    pub fn advance(&mut self, elapsed: Duration) -> bool {
        if !self.running {
            return false;
        }

        let scaled = elapsed.as_nanos() as f64 / 1_000_000.0 * self.speed + self.carry;
        let whole = scaled.floor();
        self.carry = scaled - whole;
        self.position = self.position.saturating_add_millis(whole as u64);

        if self.position >= self.end {
            self.position = self.end;
            self.running = false;
            self.carry = 0.0;
            return true;
        }
        false
    }

    /// Progress through the recording (0.0 to 1.0).
    pub fn progress(&self) -> f32 {
        let duration = self.duration_ms();
        if duration == 0 {
            return 0.0;
        }
        self.position.saturating_since(self.start) as f32 / duration as f32
    }

    pub fn is_at_end(&self) -> bool {
        self.position >= self.end
    }

    pub fn is_at_start(&self) -> bool {
        self.position <= self.start
    }

    /// Back to the start, stopped.
    pub fn reset(&mut self) {
        self.position = self.start;
        self.running = false;
        self.carry = 0.0;
    }
}
