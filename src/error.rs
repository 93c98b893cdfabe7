use std::io;
use thiserror::Error;

use crate::instructions::StepId;

/// Rejections caused by the data handed to the core rather than by its state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("nothing to execute: the instruction batch is empty")]
    EmptyBatch,

    #[error("could not generate exercise steps from the assistant response")]
    NoInstructions,

    #[error("message is blank")]
    BlankMessage,
}

/// Rejections of a transition that is not legal from the current sequencer state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("an exercise sequence is already in progress")]
    AlreadyRunning,

    #[error("no exercise step is currently running")]
    NotRunning,

    #[error("resting between steps")]
    Resting,

    #[error("step {requested} is not the current step ({current})")]
    NotCurrentStep { requested: StepId, current: StepId },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error("unknown setting `{0}`")]
    UnknownKey(String),

    #[error("invalid value for `{key}`: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("expected KEY=VALUE, got `{0}`")]
    MalformedAssignment(String),
}

/// Application-wide error type.
#[derive(Debug, Error)]
pub enum LimberError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),

    /// Failures of the history database.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The response generator could not produce an answer.
    #[error("assistant unavailable: {0}")]
    Assistant(String),

    /// The speech output channel failed.
    #[error("speech unavailable: {0}")]
    Speech(String),
}

impl LimberError {
    /// True for rejections that leave the session untouched and can be shown
    /// to the user as-is.
    pub fn is_rejection(&self) -> bool {
        matches!(self, LimberError::Input(_) | LimberError::State(_))
    }
}

pub type Result<T, E = LimberError> = std::result::Result<T, E>;
