use dialogue_client::ApiError;
use thiserror::Error;

use crate::session::Phase;

/// Errors from editing session operations
#[derive(Debug, Error)]
pub enum EditorError {
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Backend(#[from] ApiError),

    #[error("Cannot {action} while in the {phase} phase")]
    InvalidTransition { phase: Phase, action: &'static str },

    #[error("No project is loaded")]
    NoActiveProject,

    #[error("Unknown speaker: {0}")]
    UnknownSpeaker(String),

    #[error("Unknown dialogue line: {0}")]
    UnknownLine(String),

    #[error("No generated audio for this project")]
    NoGeneratedAudio,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EditorError>;
