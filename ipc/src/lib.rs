use relay_types::{DeviceIdentity, ProtocolKind, RelayChannel};
use serde::{Deserialize, Serialize};

mod agent;
mod error;
mod proxy;
mod remote;
pub mod client;

pub use agent::LocalAgent;
pub use error::AgentError;
pub use proxy::RelayProxy;
pub use remote::{AgentTransport, RemoteAgent};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentRequest {
    Set {
        protocol: ProtocolKind,
        bus: u8,
        address: u8,
        channel: u8,
        status: bool,
    },
    Get {
        protocol: ProtocolKind,
        bus: u8,
        address: u8,
        channel: u8,
    },
}

impl AgentRequest {
    pub fn identity(&self) -> DeviceIdentity {
        match self {
            AgentRequest::Set { bus, address, .. } | AgentRequest::Get { bus, address, .. } => {
                DeviceIdentity::new(*bus, *address)
            }
        }
    }

    // Channels arrive as plain numbers off the wire, so they get checked here rather than
    // trusted.
    pub fn channel(&self) -> Result<RelayChannel, AgentError> {
        let channel = match self {
            AgentRequest::Set { channel, .. } | AgentRequest::Get { channel, .. } => *channel,
        };
        Ok(RelayChannel::try_from(channel)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentResponse {
    Ok,
    Status(bool),

    // Failures keep the distinction between a busy device and a broken one, callers treat
    // those differently.
    Unavailable(String),
    AccessFailed(String),
    Error(String),
}
