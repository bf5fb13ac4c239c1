//! Event types broadcast by the player.
//!
//! | Event | Subscribe with |
//! |-------|----------------|
//! | `PlayerStatusEvent` | `MorsePlayer::subscribe_status` |
//! | `CharacterEvent` | `MorsePlayer::subscribe_characters` |

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Status events
// ---------------------------------------------------------------------------

/// Emitted whenever the player changes state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStatusEvent {
    pub status: PlayerStatus,
    /// Optional human-readable detail (e.g. error message).
    pub detail: Option<String>,
}

/// Current state of the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerStatus {
    /// No scheduler loop is running.
    Stopped,
    /// Loop is ticking but playback is paused; nothing is dequeued.
    Idle,
    /// Loop is ticking and draining the queue.
    Playing,
    /// The audio sink failed; the loop has exited. Restart required.
    Error,
}

impl PlayerStatus {
    /// Status for a running loop with the given play flag.
    pub fn running(playing: bool) -> Self {
        if playing {
            PlayerStatus::Playing
        } else {
            PlayerStatus::Idle
        }
    }
}

// ---------------------------------------------------------------------------
// Character events
// ---------------------------------------------------------------------------

/// Emitted when a character starts sounding (or its word gap starts).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterEvent {
    /// Monotonically increasing event sequence number.
    pub seq: u64,
    pub character: char,
    /// Speed in effect when the character started.
    pub wpm: f32,
}
