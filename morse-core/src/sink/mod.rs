//! Audio sink abstraction.
//!
//! The scheduler brackets every tone-on interval with `begin_tone` /
//! `end_tone`. Device setup, buffering and stream lifetime belong to the
//! implementor (`audio::ToneOutput` for real hardware, `NullSink` headless).
//!
//! All calls are serialised through `SinkHandle`'s `parking_lot::Mutex`. The
//! scheduler re-checks cancellation while holding that lock before keying, so
//! a `stop()` that has already forced the tone off cannot be followed by a
//! stray key-down.

pub mod null;

pub use null::NullSink;

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Result;

/// Contract for anything that can key a tone on and off.
pub trait ToneSink: Send + 'static {
    /// Start sounding the tone.
    ///
    /// # Errors
    /// `MorseError::SinkUnavailable` when the output can no longer play.
    fn begin_tone(&mut self) -> Result<()>;

    /// Silence the tone. Must be idempotent.
    fn end_tone(&mut self) -> Result<()>;
}

/// Thread-safe reference-counted handle to any `ToneSink` implementor.
#[derive(Clone)]
pub struct SinkHandle(pub Arc<Mutex<dyn ToneSink>>);

impl SinkHandle {
    /// Wrap any `ToneSink` in a `SinkHandle`.
    pub fn new<S: ToneSink>(sink: S) -> Self {
        Self(Arc::new(Mutex::new(sink)))
    }
}

impl std::fmt::Debug for SinkHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkHandle").finish_non_exhaustive()
    }
}
