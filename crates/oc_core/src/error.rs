use thiserror::Error;

use crate::models::SelectionNeed;

/// Unified error type for every fallible operation in the crate.
///
/// The first five variants are domain rejections: the call was refused and
/// the match state is byte-identical to what it was before the call.
#[derive(Error, Debug)]
pub enum ScoreError {
    /// Malformed request: runs out of range, unknown player id, wicket
    /// details that contradict the delivery, and similar.
    #[error("validation error: {0}")]
    Validation(String),

    /// Structurally valid request that is illegal in the current phase,
    /// e.g. scoring a ball while the innings break is in progress.
    #[error("state conflict: {0}")]
    StateConflict(String),

    /// Scoring cannot continue until a batter or bowler is chosen.
    #[error("selection required: {need}")]
    SelectionRequired { need: SelectionNeed },

    /// Another editor currently holds the edit lock.
    #[error("edit lock held by {holder_name}")]
    LockConflict { holder_name: String },

    /// A playing-conditions limit would be breached, e.g. a bowler past
    /// their over cap.
    #[error("capacity exceeded: {0}")]
    CapacityExceeded(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("playing conditions error: {0}")]
    Conditions(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScoreError {
    /// True for domain rejections, where the state was left untouched and
    /// the same call can succeed once the caller fixes its input. Store and
    /// IO failures are transient instead; callers decide whether to retry.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            ScoreError::Validation(_)
                | ScoreError::StateConflict(_)
                | ScoreError::SelectionRequired { .. }
                | ScoreError::LockConflict { .. }
                | ScoreError::CapacityExceeded(_)
        )
    }
}

impl From<serde_json::Error> for ScoreError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_io() {
            ScoreError::Serialization(err.to_string())
        } else {
            // Syntax, data and eof errors all mean the input was bad.
            ScoreError::Deserialization(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, ScoreError>;
