use crate::chat::MessageId;
use std::io;
use thiserror::Error;

/// Unified error type for docchat
#[derive(Error, Debug)]
pub enum DocChatError {
    /// The remote service answered with an error status or an error payload
    #[error("API error: {0}")]
    Api(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// User input errors
    #[error("Input error: {0}")]
    Input(String),

    /// IO-related errors
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    /// Serialization/deserialization errors, including unexpected payload shapes
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Network-related errors
    #[error("Network error: {0}")]
    Network(String),

    /// Event stream protocol errors
    #[error("Stream error: {0}")]
    Stream(String),

    /// No event arrived on a stream within the inactivity window
    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Message not found: {0}")]
    MessageNotFound(MessageId),

    /// A turn is already in flight for this session
    #[error("A request is already in progress")]
    Busy,

    #[error("Nothing to send: the message is empty")]
    EmptyDraft,

    #[error("Edit rejected: {0}")]
    EditRejected(String),
}

impl From<reqwest::Error> for DocChatError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DocChatError::Network(format!("Request timed out: {}", err))
        } else if err.is_connect() {
            DocChatError::Network(format!("Connection failed: {}", err))
        } else if err.is_status() {
            DocChatError::Api(format!("Service returned error status: {}", err))
        } else if err.is_decode() {
            DocChatError::Serialization(format!("Malformed response body: {}", err))
        } else {
            DocChatError::Network(format!("Request failed: {}", err))
        }
    }
}

impl From<serde_json::Error> for DocChatError {
    fn from(err: serde_json::Error) -> Self {
        DocChatError::Serialization(format!("JSON error: {}", err))
    }
}

impl From<serde_yml::Error> for DocChatError {
    fn from(err: serde_yml::Error) -> Self {
        DocChatError::Serialization(format!("YAML error: {}", err))
    }
}

impl From<rustyline::error::ReadlineError> for DocChatError {
    fn from(err: rustyline::error::ReadlineError) -> Self {
        DocChatError::Input(format!("Line editor error: {}", err))
    }
}
