use crate::error::AgentError;
use crate::proxy::RelayProxy;
use crate::{AgentRequest, AgentResponse};
use log::debug;
use relay_types::ProtocolKind;
use std::sync::Arc;

/// Carries one request to an agent on another host and returns its reply. How it gets there
/// (ssh, a socket, a coordinator) is up to the implementation, it only has to be synchronous.
pub trait AgentTransport: Send + Sync {
    fn call(&self, request: &str) -> anyhow::Result<String>;
}

#[derive(Clone)]
pub struct RemoteAgent {
    host: String,
    transport: Arc<dyn AgentTransport>,
}

impl RemoteAgent {
    pub fn new(host: impl Into<String>, transport: Arc<dyn AgentTransport>) -> Self {
        Self {
            host: host.into(),
            transport,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn load(&self, protocol: ProtocolKind) -> Box<dyn RelayProxy> {
        debug!("Loading {} on agent at {}", protocol, self.host);
        Box::new(RemoteProxy {
            agent: self.clone(),
            protocol,
        })
    }

    fn send(&self, request: AgentRequest) -> Result<AgentResponse, AgentError> {
        let request = serde_json::to_string(&request)?;
        let response = self
            .transport
            .call(&request)
            .map_err(AgentError::Transport)?;
        Ok(serde_json::from_str(&response)?)
    }
}

struct RemoteProxy {
    agent: RemoteAgent,
    protocol: ProtocolKind,
}

impl RemoteProxy {
    fn check_failure(&self, response: AgentResponse) -> AgentError {
        match response {
            AgentResponse::Unavailable(message) => AgentError::RemoteUnavailable(message),
            AgentResponse::AccessFailed(message) => AgentError::RemoteAccess(message),
            AgentResponse::Error(message) => AgentError::Remote(message),
            AgentResponse::Ok | AgentResponse::Status(_) => {
                AgentError::UnexpectedResponse(self.protocol)
            }
        }
    }
}

impl RelayProxy for RemoteProxy {
    fn set(&self, bus: u8, address: u8, channel: u8, status: bool) -> Result<(), AgentError> {
        let response = self.agent.send(AgentRequest::Set {
            protocol: self.protocol,
            bus,
            address,
            channel,
            status,
        })?;

        match response {
            AgentResponse::Ok => Ok(()),
            response => Err(self.check_failure(response)),
        }
    }

    fn get(&self, bus: u8, address: u8, channel: u8) -> Result<bool, AgentError> {
        let response = self.agent.send(AgentRequest::Get {
            protocol: self.protocol,
            bus,
            address,
            channel,
        })?;

        match response {
            AgentResponse::Status(status) => Ok(status),
            response => Err(self.check_failure(response)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LocalAgent;
    use anyhow::bail;
    use relay_types::DeviceIdentity;
    use relay_usb::access::ClaimPolicy;
    use relay_usb::mock::MockBus;
    use std::time::Duration;

    // Hands requests straight to an agent in this process, as if it were on the far end.
    struct Loopback(Arc<LocalAgent>);

    impl AgentTransport for Loopback {
        fn call(&self, request: &str) -> anyhow::Result<String> {
            Ok(self.0.handle_json(request))
        }
    }

    struct Unreachable;

    impl AgentTransport for Unreachable {
        fn call(&self, _request: &str) -> anyhow::Result<String> {
            bail!("connection refused")
        }
    }

    fn remote() -> (Arc<MockBus>, RemoteAgent) {
        let bus = Arc::new(MockBus::new());
        let policy = ClaimPolicy {
            timeout: Duration::from_millis(50),
            retry_interval: Duration::from_millis(10),
        };
        let agent = Arc::new(LocalAgent::new(bus.clone(), policy));
        (bus, RemoteAgent::new("exporter-1", Arc::new(Loopback(agent))))
    }

    #[test]
    fn forwards_set_and_get() {
        let (bus, remote) = remote();
        let board = bus.attach(DeviceIdentity::new(1, 9));

        let proxy = remote.load(ProtocolKind::FtdiGpio);
        proxy.set(1, 9, 8, true).unwrap();
        assert_eq!(board.port(), 0x80);
        assert!(proxy.get(1, 9, 8).unwrap());
    }

    #[test]
    fn busy_stays_distinguishable() {
        let (bus, remote) = remote();
        bus.attach(DeviceIdentity::new(1, 9)).always_busy(true);

        let error = remote.load(ProtocolKind::FtdiGpio).set(1, 9, 1, true).unwrap_err();
        assert!(error.is_unavailable());

        let error = remote.load(ProtocolKind::FtdiGpio).get(7, 7, 1).unwrap_err();
        assert!(matches!(error, AgentError::RemoteAccess(_)));
    }

    #[test]
    fn transport_failures_surface() {
        let remote = RemoteAgent::new("exporter-2", Arc::new(Unreachable));
        let error = remote.load(ProtocolKind::HidReport).get(1, 1, 1).unwrap_err();
        assert!(matches!(error, AgentError::Transport(_)));
        assert!(!error.is_unavailable());
    }
}
