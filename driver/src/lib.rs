pub mod driver;
pub mod error;
pub mod resource;

pub use driver::{DriverState, HidRelayDriver};
pub use error::DriverError;
pub use resource::{HidRelayResource, RelayConfig};
