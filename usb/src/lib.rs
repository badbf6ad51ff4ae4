pub use rusb;
pub mod access;
pub mod controller;
pub mod devices;
pub mod dispatch;
pub mod error;
pub mod ftdi;
pub mod hid;
pub mod registry;

mod device;

pub use device::base::{DeviceOpener, DeviceSession};
pub use device::LibUsbOpener;

#[cfg(any(test, feature = "mock"))]
pub use device::mock;
