use thiserror::Error;

/// All errors produced by morse-core.
///
/// An empty queue and an unmapped character are not errors: the first is a
/// `None` from `pop`/`peek`, the second is skipped silently by the scheduler.
#[derive(Debug, Error)]
pub enum MorseError {
    #[error("audio device error: {0}")]
    AudioDevice(String),

    #[error("audio stream error: {0}")]
    AudioStream(String),

    #[error("no default output device found")]
    NoDefaultOutputDevice,

    #[error("audio sink unavailable: {0}")]
    SinkUnavailable(String),

    #[error("player is already running")]
    AlreadyRunning,

    #[error("player is not running")]
    NotRunning,

    #[error("WAV export error: {0}")]
    Wav(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, MorseError>;
