//! Errors surfaced by the dispute console.
//!
//! Every async operation returns [`ConsoleError`]; the session layer turns
//! them into operator notifications with [`ConsoleError::user_message`].

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConsoleError>;

#[derive(Debug, Error)]
pub enum ConsoleError {
    /// Request never completed (connect failure, timeout, reset).
    #[error("network failure: {0}")]
    Network(String),
    /// Backend answered with an error; message is the backend's own text.
    #[error("{0}")]
    Rejected(String),
    /// Bearer token is no longer accepted; carries the backend's text.
    #[error("{0}")]
    SessionExpired(String),
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error("realtime channel: {0}")]
    Realtime(String),
    #[error("message is empty")]
    EmptyMessage,
    #[error("a message is already being sent")]
    SendInFlight,
    #[error("dispute has no chat")]
    MissingChat,
    #[error("dispute resolution already in progress")]
    ResolutionInFlight,
    #[error("dispute is already {0}")]
    AlreadyTerminal(String),
    #[error("resolution must be confirmed first")]
    ConfirmationRequired,
    #[error("configuration: {0}")]
    Config(String),
}

impl ConsoleError {
    /// Text shown to the operator. Backend rejections pass through verbatim.
    pub fn user_message(&self) -> String {
        match self {
            ConsoleError::Rejected(message) | ConsoleError::SessionExpired(message) => {
                message.clone()
            }
            other => other.to_string(),
        }
    }

    /// Map a backend-provided message onto the right variant.
    pub(crate) fn from_backend_message(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.contains("jwt expired") {
            ConsoleError::SessionExpired(message)
        } else {
            ConsoleError::Rejected(message)
        }
    }
}

impl From<reqwest::Error> for ConsoleError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ConsoleError::Decode(err.to_string())
        } else {
            ConsoleError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ConsoleError {
    fn from(err: serde_json::Error) -> Self {
        ConsoleError::Decode(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ConsoleError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        ConsoleError::Realtime(err.to_string())
    }
}
