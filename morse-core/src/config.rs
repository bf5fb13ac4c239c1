//! Player configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    audio::ToneSettings,
    buffering::CHAR_QUEUE_CAPACITY,
    morse::{clamp_wpm, DEFAULT_WPM},
};

/// Scheduler poll cadence.
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 100;
const MAX_TICK_INTERVAL_MS: u64 = 1_000;

/// Configuration for `MorsePlayer`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct PlayerConfig {
    /// Starting speed; adjustable later with `set_wpm`. Default: 20.
    pub initial_wpm: f32,
    /// How often the loop polls the queue and the play flag. Default: 100 ms.
    ///
    /// At most one character is started per tick, so this also bounds how
    /// quickly playback resumes after the queue runs dry.
    pub tick_interval_ms: u64,
    /// Character slots in the queue. Default: 650 (~130 words).
    pub queue_capacity: usize,
    pub tone: ToneSettings,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            initial_wpm: DEFAULT_WPM,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            queue_capacity: CHAR_QUEUE_CAPACITY,
            tone: ToneSettings::default(),
        }
    }
}

impl PlayerConfig {
    pub fn normalize(&mut self) {
        self.initial_wpm = clamp_wpm(self.initial_wpm);
        self.tick_interval_ms = self.tick_interval_ms.clamp(1, MAX_TICK_INTERVAL_MS);
        self.queue_capacity = self.queue_capacity.max(1);
        self.tone.normalize();
    }

    pub fn normalized(mut self) -> Self {
        self.normalize();
        self
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}
