use relay_types::{InvalidChannel, ProtocolKind};
use relay_usb::error::RelayError;

#[derive(thiserror::Error, Debug)]
pub enum AgentError {
    #[error(transparent)]
    Relay(#[from] RelayError),

    #[error(transparent)]
    InvalidChannel(#[from] InvalidChannel),

    #[error("Device unavailable on agent: {0}")]
    RemoteUnavailable(String),

    #[error("Device access failed on agent: {0}")]
    RemoteAccess(String),

    #[error("Agent reported an error: {0}")]
    Remote(String),

    #[error("Unexpected response from agent for {0}")]
    UnexpectedResponse(ProtocolKind),

    #[error("No transport available to reach agent on {0}")]
    NoTransport(String),

    #[error("Agent transport failed: {0:#}")]
    Transport(anyhow::Error),

    #[error("Malformed agent message: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("Agent connection has been closed")]
    Closed,
}

impl AgentError {
    pub fn is_unavailable(&self) -> bool {
        match self {
            AgentError::Relay(error) => error.is_unavailable(),
            AgentError::RemoteUnavailable(_) => true,
            _ => false,
        }
    }
}
