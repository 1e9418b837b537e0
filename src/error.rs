use std::io;

use thiserror::Error;

/// Errors raised by the desk operations.
///
/// Every failure is terminal for the action that raised it, nothing here is retried.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Access denied for {0}")]
    NotAllowed(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Remote API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Conflict writing {path}: {message}")]
    Conflict { path: String, message: String },

    #[error("Invalid post format: {0}")]
    MalformedFile(String),

    #[error("Missing field '{0}'")]
    MissingField(&'static str),

    #[error("Post is not ready to publish:\n{}", .0.join("\n"))]
    Validation(Vec<String>),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Could not read the post HTML {0}")]
    Html(String),

    #[error("Could not decode content: {0}")]
    Decode(String),

    #[error("Template error: {0}")]
    Template(String),
}

impl Error {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api { status, message: message.into() }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict { .. })
    }
}

impl From<base64::DecodeError> for Error {
    fn from(value: base64::DecodeError) -> Self {
        Error::Decode(value.to_string())
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(value: std::string::FromUtf8Error) -> Self {
        Error::Decode(value.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
