//! Offline rendering of text to Morse audio and WAV export.
//!
//! Uses the same hold plan and tone generator as live playback, with each
//! tone interval rendered as a single envelope block so the ramps land on
//! the key-down and key-up edges. The live loop's polling pause between
//! characters is not included; output is pure PARIS timing at a fixed WPM.

use std::path::Path;

use tracing::info;

use crate::{
    audio::{ToneGenerator, ToneSettings},
    error::{MorseError, Result},
    morse::{unit_seconds, Glyph},
};

/// Render `text` (case-insensitive) to mono f32 samples.
///
/// Hold boundaries are placed on the cumulative unit count, so rounding to
/// whole samples never accumulates across a long text.
pub fn render_text(text: &str, wpm: f32, tone: ToneSettings, sample_rate: u32) -> Vec<f32> {
    let mut generator = ToneGenerator::new(tone, sample_rate);
    let frames_per_unit = unit_seconds(wpm) * generator.sample_rate() as f64;

    let mut samples = Vec::new();
    let mut elapsed_units = 0u64;

    for glyph in text.chars().flat_map(char::to_uppercase).filter_map(Glyph::of) {
        for hold in glyph.holds() {
            elapsed_units += u64::from(hold.units);
            let end = (elapsed_units as f64 * frames_per_unit).round() as usize;
            let start = samples.len();
            samples.resize(end.max(start), 0.0);
            generator.render(hold.tone, &mut samples[start..], 1);
        }
    }
    samples
}

/// Write mono 32-bit float samples to a WAV file.
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };

    let mut writer =
        hound::WavWriter::create(path, spec).map_err(|e| MorseError::Wav(e.to_string()))?;
    for sample in samples {
        writer
            .write_sample(*sample)
            .map_err(|e| MorseError::Wav(e.to_string()))?;
    }
    writer
        .finalize()
        .map_err(|e| MorseError::Wav(e.to_string()))?;

    info!(
        path = %path.display(),
        samples = samples.len(),
        sample_rate,
        "wrote WAV"
    );
    Ok(())
}
