//! `NullSink`: headless sink that keeps time but makes no sound.
//!
//! Used when audio is disabled or no output device exists, so the scheduler
//! and the character event stream still run end-to-end.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use tracing::trace;

use crate::error::Result;
use crate::sink::ToneSink;

#[derive(Debug, Clone, Default)]
pub struct NullSink {
    tones: Arc<AtomicUsize>,
    keyed: bool,
}

impl NullSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared counter of key-downs, readable after the sink is moved into a handle.
    pub fn tone_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.tones)
    }
}

impl ToneSink for NullSink {
    fn begin_tone(&mut self) -> Result<()> {
        self.keyed = true;
        self.tones.fetch_add(1, Ordering::Relaxed);
        trace!("NullSink::begin_tone");
        Ok(())
    }

    fn end_tone(&mut self) -> Result<()> {
        if self.keyed {
            trace!("NullSink::end_tone");
        }
        self.keyed = false;
        Ok(())
    }
}
