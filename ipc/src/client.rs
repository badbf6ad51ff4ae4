use crate::agent::LocalAgent;
use crate::error::AgentError;
use crate::proxy::RelayProxy;
use crate::remote::{AgentTransport, RemoteAgent};
use log::info;
use relay_types::ProtocolKind;
use std::collections::HashMap;
use std::sync::Arc;

/// Hands out agent connections: the local agent for resources on this host, or a forwarding
/// agent for resources exported by another host.
#[derive(Clone)]
pub struct AgentConnector {
    local: Arc<LocalAgent>,
    transports: HashMap<String, Arc<dyn AgentTransport>>,
}

impl AgentConnector {
    pub fn new(local: Arc<LocalAgent>) -> Self {
        Self {
            local,
            transports: HashMap::new(),
        }
    }

    pub fn with_transport(mut self, host: impl Into<String>, transport: Arc<dyn AgentTransport>) -> Self {
        self.transports.insert(host.into(), transport);
        self
    }

    pub fn connect(&self, host: Option<&str>) -> Result<AgentWrapper, AgentError> {
        let agent = match host {
            None => Agent::Local(self.local.clone()),
            Some(host) => {
                let transport = self
                    .transports
                    .get(host)
                    .ok_or_else(|| AgentError::NoTransport(host.to_string()))?;
                info!("Connecting to relay agent on {}", host);
                Agent::Remote(RemoteAgent::new(host, transport.clone()))
            }
        };

        Ok(AgentWrapper { agent: Some(agent) })
    }
}

enum Agent {
    Local(Arc<LocalAgent>),
    Remote(RemoteAgent),
}

/// One open connection to an agent.
pub struct AgentWrapper {
    agent: Option<Agent>,
}

impl AgentWrapper {
    pub fn is_remote(&self) -> bool {
        matches!(self.agent, Some(Agent::Remote(_)))
    }

    pub fn load(&self, protocol: ProtocolKind) -> Result<Box<dyn RelayProxy>, AgentError> {
        match &self.agent {
            Some(Agent::Local(agent)) => Ok(agent.load(protocol)),
            Some(Agent::Remote(agent)) => Ok(agent.load(protocol)),
            None => Err(AgentError::Closed),
        }
    }

    pub fn close(&mut self) {
        if let Some(Agent::Remote(agent)) = self.agent.take() {
            info!("Closed relay agent connection to {}", agent.host());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_usb::access::ClaimPolicy;
    use relay_usb::mock::MockBus;

    struct Loopback(Arc<LocalAgent>);

    impl AgentTransport for Loopback {
        fn call(&self, request: &str) -> anyhow::Result<String> {
            Ok(self.0.handle_json(request))
        }
    }

    fn connector() -> AgentConnector {
        let local = Arc::new(LocalAgent::new(
            Arc::new(MockBus::new()),
            ClaimPolicy::default(),
        ));
        let exporter = Arc::new(LocalAgent::new(
            Arc::new(MockBus::new()),
            ClaimPolicy::default(),
        ));
        AgentConnector::new(local).with_transport("exporter", Arc::new(Loopback(exporter)))
    }

    #[test]
    fn picks_agent_by_host() {
        let connector = connector();
        assert!(!connector.connect(None).unwrap().is_remote());
        assert!(connector.connect(Some("exporter")).unwrap().is_remote());
        assert!(matches!(
            connector.connect(Some("elsewhere")),
            Err(AgentError::NoTransport(_))
        ));
    }

    #[test]
    fn closed_wrapper_refuses_loads() {
        let mut wrapper = connector().connect(None).unwrap();
        assert!(wrapper.load(ProtocolKind::HidReport).is_ok());

        wrapper.close();
        assert!(matches!(
            wrapper.load(ProtocolKind::HidReport),
            Err(AgentError::Closed)
        ));
    }
}
