use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{ContactField, ParticipantField};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Validation,
    Encoding,
    Transport,
    Busy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Success,
    Error,
}

/// The single line shown to a visitor after a submit attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMessage {
    pub kind: StatusKind,
    pub message: String,
}

impl StatusMessage {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Error,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.kind == StatusKind::Success
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MissingField {
    Participant {
        index: usize,
        field: ParticipantField,
    },
    IdCard {
        index: usize,
    },
    TransactionReference,
    PaymentProof,
    Contact {
        field: ContactField,
    },
}

impl fmt::Display for MissingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingField::Participant { index, field } => {
                write!(f, "participant {} {field}", index + 1)
            }
            MissingField::IdCard { index } => write!(f, "participant {} ID card", index + 1),
            MissingField::TransactionReference => f.write_str("transaction reference"),
            MissingField::PaymentProof => f.write_str("payment proof"),
            MissingField::Contact { field } => write!(f, "contact {field}"),
        }
    }
}

fn join_missing(fields: &[MissingField]) -> String {
    fields
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("participant count {requested} is outside the allowed range {min}-{max}")]
    ParticipantCountOutOfRange { requested: u32, min: u32, max: u32 },
    #[error("event '{event}' requires at least {minimum} participants but allows at most {max}")]
    InvalidBounds {
        event: String,
        minimum: u32,
        max: u32,
    },
    #[error("participant index {index} is out of range for {count} participants")]
    ParticipantIndexOutOfRange { index: usize, count: u32 },
    #[error("cannot {action} while {step}")]
    InvalidTransition {
        action: &'static str,
        step: &'static str,
    },
    #[error("attachment '{file_name}' has unsupported type {mime_type}")]
    UnsupportedAttachment { file_name: String, mime_type: String },
    #[error("missing required fields: {}", join_missing(.0))]
    MissingFields(Vec<MissingField>),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error("failed to read attachment '{file_name}': {message}")]
    Read { file_name: String, message: String },
    #[error("attachment '{file_name}' is {size} bytes, limit is {limit}")]
    TooLarge {
        file_name: String,
        size: usize,
        limit: usize,
    },
    #[error("encoding '{file_name}' did not finish: {message}")]
    Interrupted { file_name: String, message: String },
    #[error("failed to serialize submission: {0}")]
    Serialize(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("no submission endpoint configured")]
    MissingEndpoint,
    #[error("invalid submission endpoint '{0}'")]
    InvalidEndpoint(String),
    #[error("submission request failed: {0}")]
    Request(String),
    #[error("submission endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("submission rejected by endpoint: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("a submission is already in progress")]
    SubmissionInProgress,
}

impl RegistrationError {
    pub fn code(&self) -> ErrorCode {
        match self {
            RegistrationError::Validation(_) => ErrorCode::Validation,
            RegistrationError::Encoding(_) => ErrorCode::Encoding,
            RegistrationError::Transport(_) => ErrorCode::Transport,
            RegistrationError::SubmissionInProgress => ErrorCode::Busy,
        }
    }

    pub fn status_message(&self) -> StatusMessage {
        let message = match self {
            RegistrationError::Validation(err) => format!("Please fix the form: {err}."),
            RegistrationError::Encoding(err) => {
                format!("Could not read an uploaded file ({err}). Please re-attach it and try again.")
            }
            RegistrationError::Transport(_) => "Registration failed. Please try again.".to_string(),
            RegistrationError::SubmissionInProgress => {
                "Your registration is already being submitted.".to_string()
            }
        };
        StatusMessage::error(message)
    }
}
