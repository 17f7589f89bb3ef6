use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to write stored file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to read stored file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to serialize stored row: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize stored row: {0}")]
    Deserialization(serde_json::Error),

    #[error("invalid identifier: {0}")]
    Uuid(#[from] odonto_uuid::UuidError),
    #[error("invalid text: {0}")]
    Text(#[from] odonto_types::TextError),
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Coarse classification of a [`CoreError`], used by API surfaces to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    Conflict,
    Unavailable,
    /// Persistence or encoding failure whose detail must not reach callers.
    Internal,
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::InvalidInput(_) | CoreError::Text(_) => ErrorKind::InvalidInput,
            CoreError::NotFound(_) => ErrorKind::NotFound,
            CoreError::Conflict(_) => ErrorKind::Conflict,
            CoreError::Unavailable(_) => ErrorKind::Unavailable,
            CoreError::StorageDirCreation(_)
            | CoreError::FileWrite(_)
            | CoreError::FileRead(_)
            | CoreError::Serialization(_)
            | CoreError::Deserialization(_)
            | CoreError::Uuid(_) => ErrorKind::Internal,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Unavailable => "unavailable",
            ErrorKind::Internal => "internal",
        };
        f.write_str(name)
    }
}
