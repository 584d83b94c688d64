//! Error taxonomy for the board core.
//!
//! Lookup misses are not errors — catalog and store return `Option` for
//! those. Only conditions a UI client must be told about get a variant.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BoardError {
    /// A save was rejected before touching durable state.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Audio playback failed after the fallback chain was exhausted.
    #[error("playback failed for \"{word}\": {reason}")]
    Playback { word: String, reason: String },
}

impl BoardError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn playback(word: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Playback {
            word: word.into(),
            reason: reason.into(),
        }
    }
}
