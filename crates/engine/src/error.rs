//! The module contains the errors the engine can throw.
//!
//! Caller contract violations are reported eagerly:
//!
//! - [`InvalidAmount`] an expense amount is not strictly positive or cannot be
//!   parsed.
//! - [`InvalidSplit`] a split has no members or repeats a participant.
//! - [`UnknownParticipant`] an expense references someone outside the roster.
//! - [`InvalidPattern`] a recurrence pattern string is not recognised.
//!
//! Storage failures are surfaced unchanged through [`Database`], except unique
//! index violations on occurrences which become [`Conflict`].
//!
//!  [`InvalidAmount`]: EngineError::InvalidAmount
//!  [`InvalidSplit`]: EngineError::InvalidSplit
//!  [`UnknownParticipant`]: EngineError::UnknownParticipant
//!  [`InvalidPattern`]: EngineError::InvalidPattern
//!  [`Database`]: EngineError::Database
//!  [`Conflict`]: EngineError::Conflict
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid split: {0}")]
    InvalidSplit(String),
    #[error("Unknown participant: {0}")]
    UnknownParticipant(String),
    #[error("Invalid recurrence pattern: {0}")]
    InvalidPattern(String),
    #[error("Date out of range: {0}")]
    DateOutOfRange(String),
    #[error("Invalid name: {0}")]
    InvalidName(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Participant in use: {0}")]
    ParticipantInUse(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidSplit(a), Self::InvalidSplit(b)) => a == b,
            (Self::UnknownParticipant(a), Self::UnknownParticipant(b)) => a == b,
            (Self::InvalidPattern(a), Self::InvalidPattern(b)) => a == b,
            (Self::DateOutOfRange(a), Self::DateOutOfRange(b)) => a == b,
            (Self::InvalidName(a), Self::InvalidName(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::Conflict(a), Self::Conflict(b)) => a == b,
            (Self::ParticipantInUse(a), Self::ParticipantInUse(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
