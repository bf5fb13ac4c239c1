//! Sine tone synthesis with a linear attack/release envelope.
//!
//! Runs inside the audio callback: no allocation, no locking, no logging.

use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

pub const TONE_FREQUENCY_HZ: f32 = 800.0;
pub const TONE_AMPLITUDE: f32 = 0.5;
/// Samples over which the envelope ramps at each end of a block.
pub const RAMP_SAMPLES: usize = 100;
pub const REFERENCE_SAMPLE_RATE: u32 = 44_100;

/// Tone parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct ToneSettings {
    pub frequency_hz: f32,
    pub amplitude: f32,
    pub ramp_samples: usize,
}

impl Default for ToneSettings {
    fn default() -> Self {
        Self {
            frequency_hz: TONE_FREQUENCY_HZ,
            amplitude: TONE_AMPLITUDE,
            ramp_samples: RAMP_SAMPLES,
        }
    }
}

impl ToneSettings {
    pub fn normalize(&mut self) {
        if !self.frequency_hz.is_finite() {
            self.frequency_hz = TONE_FREQUENCY_HZ;
        }
        self.frequency_hz = self.frequency_hz.clamp(100.0, 4_000.0);
        if !self.amplitude.is_finite() {
            self.amplitude = TONE_AMPLITUDE;
        }
        self.amplitude = self.amplitude.clamp(0.0, 1.0);
        self.ramp_samples = self.ramp_samples.max(1);
    }
}

/// Gain for `frame` within a block of `frame_count` frames.
///
/// Rises linearly over the first `ramp` frames and falls over the last
/// `ramp`, 1.0 in between. The attack wins when the two overlap.
#[inline]
pub fn envelope(frame: usize, frame_count: usize, ramp: usize) -> f32 {
    let ramp = ramp.max(1);
    if frame < ramp {
        frame as f32 / ramp as f32
    } else if frame + ramp > frame_count {
        frame_count.saturating_sub(frame) as f32 / ramp as f32
    } else {
        1.0
    }
}

/// Block renderer for the keyed tone.
///
/// Phase is carried across blocks while the tone stays on and restarts from
/// zero on each key-down, so output depends only on the sequence of
/// `(enabled, frame_count)` calls.
#[derive(Debug, Clone)]
pub struct ToneGenerator {
    settings: ToneSettings,
    /// Phase increment per sample, in cycles.
    step: f64,
    /// Current phase in cycles, kept in [0, 1).
    phase: f64,
    sample_rate: u32,
}

impl ToneGenerator {
    pub fn new(settings: ToneSettings, sample_rate: u32) -> Self {
        let sample_rate = sample_rate.max(1);
        Self {
            settings,
            step: settings.frequency_hz as f64 / sample_rate as f64,
            phase: 0.0,
            sample_rate,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn settings(&self) -> ToneSettings {
        self.settings
    }

    /// Render `frame_count` frames, handing each `(frame, sample)` to `write`.
    ///
    /// When `enabled` is false every sample is 0.0 and the phase is reset.
    #[inline]
    pub fn render_with<F>(&mut self, enabled: bool, frame_count: usize, mut write: F)
    where
        F: FnMut(usize, f32),
    {
        if !enabled {
            self.phase = 0.0;
            for frame in 0..frame_count {
                write(frame, 0.0);
            }
            return;
        }

        let amplitude = self.settings.amplitude;
        let ramp = self.settings.ramp_samples;
        for frame in 0..frame_count {
            let raw = (TAU * self.phase).sin() as f32;
            write(frame, amplitude * raw * envelope(frame, frame_count, ramp));
            self.phase += self.step;
            if self.phase >= 1.0 {
                self.phase -= 1.0;
            }
        }
    }

    /// Fill an interleaved buffer; every channel of a frame gets the same sample.
    pub fn render(&mut self, enabled: bool, out: &mut [f32], channels: usize) {
        let channels = channels.max(1);
        let frame_count = out.len() / channels;
        self.render_with(enabled, frame_count, |frame, sample| {
            let base = frame * channels;
            out[base..base + channels].fill(sample);
        });
    }

    /// Fill one buffer per channel (non-interleaved layout).
    pub fn render_planar(&mut self, enabled: bool, outputs: &mut [&mut [f32]]) {
        let frame_count = outputs.iter().map(|b| b.len()).min().unwrap_or(0);
        self.render_with(enabled, frame_count, |frame, sample| {
            for buffer in outputs.iter_mut() {
                buffer[frame] = sample;
            }
        });
    }
}
