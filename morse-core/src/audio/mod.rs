//! Audio output via the cpal backend.
//!
//! # Design constraints
//!
//! The cpal output callback runs on an OS audio thread at elevated priority.
//! It **must not**:
//! - Allocate heap memory
//! - Block on a mutex or condvar
//! - Perform I/O
//!
//! The only state it shares with the rest of the engine is the `ToneGate`
//! atomic, written by the scheduler and read once per callback.
//!
//! # Threading note
//!
//! `cpal::Stream` is `!Send` on most platforms (COM on Windows, CoreAudio on
//! macOS). `ToneOutput` therefore builds the stream on a dedicated thread that
//! owns it until shutdown; the handle itself is `Send` and can live inside a
//! `SinkHandle`.

pub mod device;
pub mod tone;

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread::JoinHandle;

use crossbeam_channel::Sender;
use tracing::{debug, info};

#[cfg(feature = "audio-cpal")]
use cpal::{
    traits::{DeviceTrait, StreamTrait},
    FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig,
};
#[cfg(feature = "audio-cpal")]
use tracing::{error, warn};

use crate::{
    error::{MorseError, Result},
    sink::ToneSink,
};

pub use tone::{ToneGenerator, ToneSettings};

/// The tone-enabled flag shared between the scheduler and the audio callback.
///
/// Single writer (scheduler side), single reader (callback side).
#[derive(Debug, Clone, Default)]
pub struct ToneGate(Arc<AtomicBool>);

impl ToneGate {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn set(&self, on: bool) {
        self.0.store(on, Ordering::Release);
    }

    #[inline]
    pub fn is_on(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Stream parameters reported back by the output thread.
#[derive(Debug, Clone)]
struct StreamInfo {
    device_name: String,
    sample_rate: u32,
    channels: u16,
}

/// Handle to an active tone output stream.
pub struct ToneOutput {
    gate: ToneGate,
    /// Set by the stream error callback; keying fails once set.
    faulted: Arc<AtomicBool>,
    shutdown_tx: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
    pub device_name: String,
    /// Actual output sample rate reported by the device (Hz).
    pub sample_rate: u32,
    pub channels: u16,
}

impl ToneOutput {
    /// Open an output device by preferred name, otherwise fall back to the
    /// default output device and then the first available device.
    ///
    /// Blocks until the stream is confirmed playing (or fails).
    ///
    /// # Errors
    /// `MorseError::NoDefaultOutputDevice` when no output exists, or
    /// `MorseError::AudioStream` if cpal fails to build or start the stream.
    pub fn open_with_preference(
        settings: ToneSettings,
        preferred_device_name: Option<&str>,
    ) -> Result<Self> {
        let gate = ToneGate::new();
        let faulted = Arc::new(AtomicBool::new(false));

        let (open_tx, open_rx) = crossbeam_channel::bounded::<Result<StreamInfo>>(1);
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);

        let preferred = preferred_device_name.map(str::to_owned);
        let thread_gate = gate.clone();
        let thread_faulted = Arc::clone(&faulted);

        let worker = std::thread::Builder::new()
            .name("morse-audio-out".into())
            .spawn(move || {
                // ── Build stream on this thread, cpal::Stream is !Send ──
                let _stream = match open_stream(
                    settings,
                    preferred.as_deref(),
                    thread_gate,
                    thread_faulted,
                ) {
                    Ok((stream, info)) => {
                        let _ = open_tx.send(Ok(info));
                        stream
                    }
                    Err(e) => {
                        let _ = open_tx.send(Err(e));
                        return;
                    }
                };

                // Park until the handle is dropped.
                let _ = shutdown_rx.recv();
                debug!("audio output stream shutting down");
            })?;

        match open_rx.recv() {
            Ok(Ok(info)) => {
                info!(
                    device = info.device_name.as_str(),
                    sample_rate = info.sample_rate,
                    channels = info.channels,
                    "tone output ready"
                );
                Ok(Self {
                    gate,
                    faulted,
                    shutdown_tx: Some(shutdown_tx),
                    worker: Some(worker),
                    device_name: info.device_name,
                    sample_rate: info.sample_rate,
                    channels: info.channels,
                })
            }
            Ok(Err(e)) => {
                let _ = worker.join();
                Err(e)
            }
            Err(_) => Err(MorseError::Other(anyhow::anyhow!(
                "audio output thread died unexpectedly"
            ))),
        }
    }

    /// Open the system default output device.
    pub fn open_default(settings: ToneSettings) -> Result<Self> {
        Self::open_with_preference(settings, None)
    }

    /// The gate the callback reads. Exposed for monitoring.
    pub fn gate(&self) -> ToneGate {
        self.gate.clone()
    }

    pub fn is_faulted(&self) -> bool {
        self.faulted.load(Ordering::Acquire)
    }
}

impl ToneSink for ToneOutput {
    fn begin_tone(&mut self) -> Result<()> {
        if self.is_faulted() {
            return Err(MorseError::SinkUnavailable(
                "output stream reported an error".into(),
            ));
        }
        self.gate.set(true);
        Ok(())
    }

    fn end_tone(&mut self) -> Result<()> {
        self.gate.set(false);
        Ok(())
    }
}

impl Drop for ToneOutput {
    fn drop(&mut self) {
        self.gate.set(false);
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

#[cfg(feature = "audio-cpal")]
fn open_stream(
    settings: ToneSettings,
    preferred_device_name: Option<&str>,
    gate: ToneGate,
    faulted: Arc<AtomicBool>,
) -> Result<(Stream, StreamInfo)> {
    use cpal::traits::HostTrait;

    let host = cpal::default_host();
    let mut selected_device = None;

    if let Some(preferred_name) = preferred_device_name {
        match host.output_devices() {
            Ok(mut devices) => {
                selected_device = devices.find(|device| {
                    device
                        .name()
                        .map(|name| name == preferred_name)
                        .unwrap_or(false)
                });

                if selected_device.is_none() {
                    warn!(
                        "preferred output device '{}' not found, falling back",
                        preferred_name
                    );
                }
            }
            Err(e) => {
                warn!("failed to list output devices while resolving preference: {e}");
            }
        }
    }

    let device = if let Some(device) = selected_device {
        device
    } else if let Some(default) = host.default_output_device() {
        default
    } else {
        let mut devices = host
            .output_devices()
            .map_err(|e| MorseError::AudioDevice(e.to_string()))?;
        let fallback = devices.next().ok_or(MorseError::NoDefaultOutputDevice)?;
        warn!("no default output device, falling back to first available output");
        fallback
    };

    let device_name = device.name().unwrap_or_default();
    info!(device = device_name.as_str(), "opening output device");

    let supported = device
        .default_output_config()
        .map_err(|e| MorseError::AudioDevice(e.to_string()))?;

    let sample_format = supported.sample_format();
    let config: StreamConfig = supported.config();
    let generator = ToneGenerator::new(settings, config.sample_rate.0);

    let stream = match sample_format {
        SampleFormat::F32 => build_stream::<f32>(&device, &config, generator, gate, faulted),
        SampleFormat::I16 => build_stream::<i16>(&device, &config, generator, gate, faulted),
        SampleFormat::U16 => build_stream::<u16>(&device, &config, generator, gate, faulted),
        fmt => {
            return Err(MorseError::AudioStream(format!(
                "unsupported sample format: {fmt:?}"
            )))
        }
    }?;

    stream
        .play()
        .map_err(|e| MorseError::AudioStream(e.to_string()))?;

    Ok((
        stream,
        StreamInfo {
            device_name,
            sample_rate: config.sample_rate.0,
            channels: config.channels,
        },
    ))
}

#[cfg(feature = "audio-cpal")]
fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut generator: ToneGenerator,
    gate: ToneGate,
    faulted: Arc<AtomicBool>,
) -> Result<Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = (config.channels as usize).max(1);

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _info| {
                let frames = data.len() / channels;
                generator.render_with(gate.is_on(), frames, |frame, sample| {
                    let base = frame * channels;
                    data[base..base + channels].fill(T::from_sample(sample));
                });
            },
            move |err| {
                error!("audio output stream error: {err}");
                faulted.store(true, Ordering::Release);
            },
            None,
        )
        .map_err(|e| MorseError::AudioStream(e.to_string()))
}

/// Stub when the `audio-cpal` feature is disabled.
#[cfg(not(feature = "audio-cpal"))]
fn open_stream(
    _settings: ToneSettings,
    _preferred_device_name: Option<&str>,
    _gate: ToneGate,
    _faulted: Arc<AtomicBool>,
) -> Result<((), StreamInfo)> {
    Err(MorseError::AudioStream(
        "compiled without audio-cpal feature".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::ToneGate;

    #[test]
    fn gate_clones_share_state() {
        let writer = ToneGate::new();
        let reader = writer.clone();
        assert!(!reader.is_on());
        writer.set(true);
        assert!(reader.is_on());
        writer.set(false);
        assert!(!reader.is_on());
    }
}
