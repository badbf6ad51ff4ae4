use crate::access::ExclusiveAccess;
use crate::error::RelayError;
use relay_types::{DeviceIdentity, RelayChannel};

// One live controller per physical board. Implementations hold no relay state of their own,
// the board is asked every time as something else may have flipped a channel since.
pub trait RelayController: Send + Sync {
    fn attach(access: ExclusiveAccess) -> Self
    where
        Self: Sized;

    fn identity(&self) -> DeviceIdentity;
    fn set_output(&self, channel: RelayChannel, status: bool) -> Result<(), RelayError>;
    fn get_output(&self, channel: RelayChannel) -> Result<bool, RelayError>;
}
