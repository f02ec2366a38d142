//! Error types for the synth engine

use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the synth engine
#[derive(Debug, Error)]
pub enum Error {
    /// Note name with an unknown letter or a malformed octave
    #[error("Invalid note: {0:?}")]
    InvalidNote(String),

    /// Malformed score document or record
    #[error("Score format error: {0}")]
    ScoreFormat(String),

    /// No usable audio output
    #[error("Audio device unavailable: {0}")]
    DeviceUnavailable(String),

    /// Unparsable chord selection
    #[error("Invalid chord: {0}")]
    InvalidChord(String),

    /// Playback requested before a score was loaded
    #[error("No score loaded")]
    NoScore,

    /// Chord slot index out of range
    #[error("Invalid chord slot {0}")]
    InvalidSlot(usize),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WAV writer error
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
}
