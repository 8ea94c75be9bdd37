//! Common error types for ytrank

use thiserror::Error;

/// Common result type for ytrank operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across ytrank crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A sync was requested while another one is still active
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Remote request failed (transport error or non-2xx status)
    #[error("Network error: {0}")]
    Network(String),

    /// Ranking was asked to rank zero videos
    #[error("{0}")]
    EmptyInput(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Message without the variant prefix, for embedding in other messages
    pub fn detail(&self) -> String {
        match self {
            Error::Config(msg)
            | Error::Conflict(msg)
            | Error::Network(msg)
            | Error::EmptyInput(msg)
            | Error::NotFound(msg)
            | Error::InvalidInput(msg)
            | Error::Internal(msg) => msg.clone(),
            Error::Database(err) => err.to_string(),
            Error::Io(err) => err.to_string(),
        }
    }
}
