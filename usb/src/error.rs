use relay_types::{DeviceIdentity, InvalidChannel};
use std::time::Duration;

#[derive(thiserror::Error, Debug)]
pub enum RelayError {
    #[error("Device {identity} is busy, unable to claim it within {timeout:?}")]
    DeviceUnavailable {
        identity: DeviceIdentity,
        timeout: Duration,
    },

    #[error("USB error on device {identity}: {source}")]
    DeviceAccess {
        identity: DeviceIdentity,
        #[source]
        source: rusb::Error,
    },

    #[error("Short transfer with device {identity}, expected {expected} bytes, got {received}")]
    MalformedResponse {
        identity: DeviceIdentity,
        expected: usize,
        received: usize,
    },

    #[error(transparent)]
    InvalidChannel(#[from] InvalidChannel),
}

impl RelayError {
    pub(crate) fn access(identity: DeviceIdentity) -> impl FnOnce(rusb::Error) -> RelayError {
        move |source| RelayError::DeviceAccess { identity, source }
    }

    /// The claim deadline passed while something else held the device. Retrying the whole
    /// operation later is reasonable, everything else is not.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, RelayError::DeviceUnavailable { .. })
    }
}
