use crate::error::AgentError;

/// A loaded relay protocol on some agent. Calls block until the agent has finished with the
/// hardware, and every failure is reported back.
pub trait RelayProxy: Send + Sync {
    fn set(&self, bus: u8, address: u8, channel: u8, status: bool) -> Result<(), AgentError>;
    fn get(&self, bus: u8, address: u8, channel: u8) -> Result<bool, AgentError>;
}
