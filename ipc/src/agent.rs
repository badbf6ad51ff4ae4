use crate::error::AgentError;
use crate::proxy::RelayProxy;
use crate::{AgentRequest, AgentResponse};
use log::{debug, error, warn};
use relay_types::{DeviceIdentity, ProtocolKind, RelayChannel};
use relay_usb::access::ClaimPolicy;
use relay_usb::dispatch::RelayHub;
use relay_usb::error::RelayError;
use relay_usb::{DeviceOpener, LibUsbOpener};
use std::sync::Arc;

// Sent in place of a response which couldn't be encoded, so the caller still gets an answer.
const ENCODING_FAILED: &str = r#"{"Error":"Unable to encode response"}"#;

/// The agent for devices attached to this host. It owns the controller registries, so there
/// should be one per process, shared by everything that talks to local hardware.
pub struct LocalAgent {
    hub: RelayHub,
}

impl LocalAgent {
    pub fn new(opener: Arc<dyn DeviceOpener>, policy: ClaimPolicy) -> Self {
        Self {
            hub: RelayHub::new(opener, policy),
        }
    }

    pub fn libusb(policy: ClaimPolicy) -> Self {
        Self::new(Arc::new(LibUsbOpener), policy)
    }

    pub fn load(self: &Arc<Self>, protocol: ProtocolKind) -> Box<dyn RelayProxy> {
        debug!("Loading {} on local agent", protocol);
        Box::new(LocalProxy {
            agent: self.clone(),
            protocol,
        })
    }

    pub fn set(
        &self,
        protocol: ProtocolKind,
        identity: DeviceIdentity,
        channel: RelayChannel,
        status: bool,
    ) -> Result<(), RelayError> {
        self.hub.set(protocol, identity, channel, status)
    }

    pub fn get(
        &self,
        protocol: ProtocolKind,
        identity: DeviceIdentity,
        channel: RelayChannel,
    ) -> Result<bool, RelayError> {
        self.hub.get(protocol, identity, channel)
    }

    pub fn handle(&self, request: AgentRequest) -> AgentResponse {
        let identity = request.identity();
        let channel = match request.channel() {
            Ok(channel) => channel,
            Err(error) => return AgentResponse::Error(error.to_string()),
        };

        let result = match request {
            AgentRequest::Set {
                protocol, status, ..
            } => self
                .set(protocol, identity, channel, status)
                .map(|_| AgentResponse::Ok),
            AgentRequest::Get { protocol, .. } => self
                .get(protocol, identity, channel)
                .map(AgentResponse::Status),
        };

        result.unwrap_or_else(|error| {
            warn!("Relay request for {} failed: {}", identity, error);
            match error {
                RelayError::DeviceUnavailable { .. } => AgentResponse::Unavailable(error.to_string()),
                RelayError::DeviceAccess { .. } | RelayError::MalformedResponse { .. } => {
                    AgentResponse::AccessFailed(error.to_string())
                }
                RelayError::InvalidChannel(_) => AgentResponse::Error(error.to_string()),
            }
        })
    }

    /// Serves one JSON encoded request, for use behind a transport.
    pub fn handle_json(&self, request: &str) -> String {
        let response = match serde_json::from_str::<AgentRequest>(request) {
            Ok(request) => self.handle(request),
            Err(error) => AgentResponse::Error(format!("Unable to parse request: {}", error)),
        };

        serde_json::to_string(&response).unwrap_or_else(|error| {
            error!("Unable to encode agent response {:?}: {}", response, error);
            String::from(ENCODING_FAILED)
        })
    }
}

struct LocalProxy {
    agent: Arc<LocalAgent>,
    protocol: ProtocolKind,
}

impl RelayProxy for LocalProxy {
    fn set(&self, bus: u8, address: u8, channel: u8, status: bool) -> Result<(), AgentError> {
        let channel = RelayChannel::try_from(channel)?;
        let identity = DeviceIdentity::new(bus, address);
        Ok(self.agent.set(self.protocol, identity, channel, status)?)
    }

    fn get(&self, bus: u8, address: u8, channel: u8) -> Result<bool, AgentError> {
        let channel = RelayChannel::try_from(channel)?;
        let identity = DeviceIdentity::new(bus, address);
        Ok(self.agent.get(self.protocol, identity, channel)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_usb::mock::MockBus;
    use std::time::Duration;

    fn agent() -> (Arc<MockBus>, Arc<LocalAgent>) {
        let bus = Arc::new(MockBus::new());
        let policy = ClaimPolicy {
            timeout: Duration::from_millis(100),
            retry_interval: Duration::from_millis(10),
        };
        let agent = Arc::new(LocalAgent::new(bus.clone(), policy));
        (bus, agent)
    }

    #[test]
    fn proxy_drives_the_loaded_protocol() {
        let (bus, agent) = agent();
        let board = bus.attach(DeviceIdentity::new(1, 2));

        let proxy = agent.load(ProtocolKind::FtdiGpio);
        proxy.set(1, 2, 5, true).unwrap();
        assert_eq!(board.port(), 0b0001_0000);
        assert!(proxy.get(1, 2, 5).unwrap());
        assert!(!proxy.get(1, 2, 4).unwrap());
    }

    #[test]
    fn proxy_rejects_bad_channels() {
        let (bus, agent) = agent();
        bus.attach(DeviceIdentity::new(1, 2));

        let proxy = agent.load(ProtocolKind::HidReport);
        assert!(matches!(
            proxy.set(1, 2, 9, true),
            Err(AgentError::InvalidChannel(_))
        ));
    }

    #[test]
    fn handle_maps_failures() {
        let (bus, agent) = agent();
        let board = bus.attach(DeviceIdentity::new(2, 3));
        board.always_busy(true);

        let request = AgentRequest::Get {
            protocol: ProtocolKind::HidReport,
            bus: 2,
            address: 3,
            channel: 1,
        };
        assert!(matches!(
            agent.handle(request),
            AgentResponse::Unavailable(_)
        ));

        let missing = AgentRequest::Get {
            protocol: ProtocolKind::HidReport,
            bus: 9,
            address: 9,
            channel: 1,
        };
        assert!(matches!(
            agent.handle(missing),
            AgentResponse::AccessFailed(_)
        ));
    }

    #[test]
    fn encoding_fallback_is_an_error_response() {
        let response: AgentResponse = serde_json::from_str(ENCODING_FAILED).unwrap();
        assert_eq!(
            response,
            AgentResponse::Error("Unable to encode response".to_string())
        );
    }

    #[test]
    fn handle_json_round_trip() {
        let (bus, agent) = agent();
        let board = bus.attach(DeviceIdentity::new(3, 1));

        let request = serde_json::to_string(&AgentRequest::Set {
            protocol: ProtocolKind::HidReport,
            bus: 3,
            address: 1,
            channel: 2,
            status: true,
        })
        .unwrap();

        let response: AgentResponse = serde_json::from_str(&agent.handle_json(&request)).unwrap();
        assert_eq!(response, AgentResponse::Ok);
        assert_eq!(board.hid_relays(), 0b0000_0010);

        let response: AgentResponse =
            serde_json::from_str(&agent.handle_json("{\"Reboot\":{}}")).unwrap();
        assert!(matches!(response, AgentResponse::Error(_)));
    }
}
