pub mod base;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

mod libusb;
pub use crate::device::libusb::device::{find_devices, AttachedDevice, LibUsbOpener};
