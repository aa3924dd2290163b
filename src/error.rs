use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CdpError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("WebSocket error: {0}")]
    Ws(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    #[error("Invalid command method: {0:?}")]
    InvalidMethod(String),

    #[error("Command {method} timed out after {timeout:?}")]
    Timeout { method: String, timeout: Duration },

    #[error("Connecting to {url} timed out after {timeout:?}")]
    ConnectTimeout { url: String, timeout: Duration },

    #[error("No suitable Chrome target found at host: {0}")]
    NoPageTargetFound(String),

    #[error("Internal communication error: {0}")]
    InternalError(String),

    #[error("Chrome returned an error (code {code}): {message}")]
    ProtocolError {
        code: i64,
        message: String,
        data: Option<String>,
    },

    #[error("Connection lost: {reason}")]
    Disconnected { reason: String },
}

impl CdpError {
    pub(crate) fn disconnected(reason: impl Into<String>) -> Self {
        CdpError::Disconnected {
            reason: reason.into(),
        }
    }
}

pub type CdpResult<T> = Result<T, CdpError>;
