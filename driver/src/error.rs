use crate::driver::DriverState;
use relay_ipc::AgentError;
use relay_usb::error::RelayError;

#[derive(thiserror::Error, Debug)]
pub enum DriverError {
    #[error("Relay driver '{name}' is not active (currently {state})")]
    NotActive { name: String, state: DriverState },

    #[error(transparent)]
    Agent(#[from] AgentError),
}

impl DriverError {
    /// The hardware error underneath, when the relay was driven from this process.
    pub fn relay_error(&self) -> Option<&RelayError> {
        match self {
            DriverError::Agent(AgentError::Relay(error)) => Some(error),
            _ => None,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        match self {
            DriverError::Agent(error) => error.is_unavailable(),
            DriverError::NotActive { .. } => false,
        }
    }
}
