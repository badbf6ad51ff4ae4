use crate::error::DriverError;
use crate::resource::HidRelayResource;
use log::{debug, info};
use relay_ipc::client::{AgentConnector, AgentWrapper};
use relay_ipc::RelayProxy;
use relay_types::ProtocolKind;
use relay_usb::dispatch::ProtocolDispatcher;
use strum::{Display, EnumIter, EnumString};

#[derive(Debug, Display, EnumString, EnumIter, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Inactive,
    Activating,
    Active,
    Deactivating,
}

struct ActiveRelay {
    wrapper: AgentWrapper,
    protocol: ProtocolKind,
    proxy: Box<dyn RelayProxy>,
}

/// A digital output backed by one channel of a USB relay board.
///
/// The driver holds configuration only. The relay state lives on the board, and each `set` or
/// `get` goes through the agent the board is attached to. With `invert` set, the logical
/// output is the opposite of the physical contact, in both directions.
pub struct HidRelayDriver {
    resource: HidRelayResource,
    connector: AgentConnector,
    dispatcher: ProtocolDispatcher,
    state: DriverState,
    active: Option<ActiveRelay>,
}

impl HidRelayDriver {
    pub fn new(resource: HidRelayResource, connector: AgentConnector) -> Self {
        Self::with_dispatcher(resource, connector, ProtocolDispatcher::new())
    }

    pub fn with_dispatcher(
        resource: HidRelayResource,
        connector: AgentConnector,
        dispatcher: ProtocolDispatcher,
    ) -> Self {
        Self {
            resource,
            connector,
            dispatcher,
            state: DriverState::Inactive,
            active: None,
        }
    }

    pub fn resource(&self) -> &HidRelayResource {
        &self.resource
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn protocol(&self) -> Option<ProtocolKind> {
        self.active.as_ref().map(|active| active.protocol)
    }

    pub fn activate(&mut self) -> Result<(), DriverError> {
        if self.state == DriverState::Active {
            debug!("Relay driver '{}' is already active", self.resource.name);
            return Ok(());
        }

        self.state = DriverState::Activating;

        // The board may have been swapped since the last activation, so the protocol is
        // worked out again every time.
        let protocol = self
            .dispatcher
            .select(self.resource.vendor_id, self.resource.model_id);

        let loaded = self
            .connector
            .connect(self.resource.host.as_deref())
            .and_then(|wrapper| {
                let proxy = wrapper.load(protocol)?;
                Ok(ActiveRelay {
                    wrapper,
                    protocol,
                    proxy,
                })
            });

        match loaded {
            Ok(active) => {
                info!(
                    "Activated relay '{}' ({} channel {}) using {}",
                    self.resource.name,
                    self.resource.identity(),
                    self.resource.index,
                    protocol
                );
                self.active = Some(active);
                self.state = DriverState::Active;
                Ok(())
            }
            Err(error) => {
                self.state = DriverState::Inactive;
                Err(error.into())
            }
        }
    }

    pub fn deactivate(&mut self) -> Result<(), DriverError> {
        self.check_active()?;

        self.state = DriverState::Deactivating;
        if let Some(mut active) = self.active.take() {
            active.wrapper.close();
        }
        self.state = DriverState::Inactive;

        debug!("Deactivated relay '{}'", self.resource.name);
        Ok(())
    }

    pub fn set(&self, status: bool) -> Result<(), DriverError> {
        let proxy = self.check_active()?;
        let status = status ^ self.resource.invert;

        proxy.set(
            self.resource.bus_number,
            self.resource.address,
            self.resource.index.number(),
            status,
        )?;
        Ok(())
    }

    pub fn get(&self) -> Result<bool, DriverError> {
        let proxy = self.check_active()?;
        let status = proxy.get(
            self.resource.bus_number,
            self.resource.address,
            self.resource.index.number(),
        )?;

        Ok(status ^ self.resource.invert)
    }

    fn check_active(&self) -> Result<&dyn RelayProxy, DriverError> {
        match (&self.state, &self.active) {
            (DriverState::Active, Some(active)) => Ok(active.proxy.as_ref()),
            _ => Err(DriverError::NotActive {
                name: self.resource.name.clone(),
                state: self.state,
            }),
        }
    }
}
