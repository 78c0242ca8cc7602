//! Error types for Huddle Core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid invite code: {0}")]
    InvalidCode(String),

    #[error("Not a member: {0}")]
    NotMember(String),

    #[error("Cannot remove the owner of group {0}")]
    CannotRemoveOwner(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),
}

/// Stable classification of an [`Error`], one per failure category.
///
/// Backend failures of any origin collapse into `StoreUnavailable` so callers can
/// map kinds to user-facing messages without matching on source types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    InvalidCode,
    NotMember,
    CannotRemoveOwner,
    StoreUnavailable,
    Unauthorized,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidInput(_) | Error::Config(_) => ErrorKind::InvalidInput,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::InvalidCode(_) => ErrorKind::InvalidCode,
            Error::NotMember(_) => ErrorKind::NotMember,
            Error::CannotRemoveOwner(_) => ErrorKind::CannotRemoveOwner,
            Error::Unauthorized(_) => ErrorKind::Unauthorized,
            Error::StoreUnavailable(_)
            | Error::Database(_)
            | Error::Io(_)
            | Error::Serialization(_) => ErrorKind::StoreUnavailable,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
