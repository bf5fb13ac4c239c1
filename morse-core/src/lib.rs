//! # morse-core
//!
//! Text-to-Morse playback engine.
//!
//! ## Architecture
//!
//! ```text
//! Text producer → SharedQueue<char> (overwrite-on-full ring)
//!                        │
//!               scheduler thread: tick → pop → Glyph::holds
//!                        │
//!               SinkHandle::begin_tone / end_tone
//!                        │
//!               ToneGate (AtomicBool) → cpal callback → ToneGenerator
//! ```
//!
//! The audio callback is zero-alloc and lock-free. All waiting happens on the
//! scheduler thread, through interruptible deadline waits.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod audio;
pub mod buffering;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod morse;
pub mod render;
pub mod sink;

// Convenience re-exports for downstream crates
pub use audio::{ToneGate, ToneGenerator, ToneOutput, ToneSettings};
pub use buffering::{RingQueue, SharedQueue};
pub use config::PlayerConfig;
pub use engine::MorsePlayer;
pub use error::MorseError;
pub use events::{CharacterEvent, PlayerStatus, PlayerStatusEvent};
pub use morse::{Glyph, MorseSymbol};
pub use sink::{NullSink, SinkHandle, ToneSink};
