use crate::device::base::{DeviceOpener, DeviceSession};
use log::{debug, warn};
use relay_types::{DeviceIdentity, DeviceModel};
use rusb::{Device, DeviceHandle, GlobalContext};
use std::time::Duration;

pub struct LibUsbOpener;

impl LibUsbOpener {
    fn find_device(identity: DeviceIdentity) -> rusb::Result<Device<GlobalContext>> {
        for usb_device in rusb::devices()?.iter() {
            if usb_device.bus_number() == identity.bus_number
                && usb_device.address() == identity.address
            {
                return Ok(usb_device);
            }
        }
        Err(rusb::Error::NoDevice)
    }
}

impl DeviceOpener for LibUsbOpener {
    fn open(&self, identity: DeviceIdentity) -> rusb::Result<Box<dyn DeviceSession>> {
        let device = LibUsbOpener::find_device(identity)?;
        let mut handle = device.open()?;

        // Relay boards tend to get picked up by usbhid / ftdi_sio, which would otherwise make
        // every claim fail with Busy. Platforms without kernel drivers to detach just say so.
        match handle.set_auto_detach_kernel_driver(true) {
            Ok(()) | Err(rusb::Error::NotSupported) => {}
            Err(error) => {
                warn!("Unable to enable kernel driver detach on {}: {}", identity, error);
                return Err(error);
            }
        }

        debug!("Opened USB device {}", identity);
        Ok(Box::new(LibUsbSession { handle }))
    }
}

struct LibUsbSession {
    handle: DeviceHandle<GlobalContext>,
}

impl DeviceSession for LibUsbSession {
    fn claim_interface(&mut self, interface: u8) -> rusb::Result<()> {
        self.handle.claim_interface(interface)
    }

    fn release_interface(&mut self, interface: u8) -> rusb::Result<()> {
        self.handle.release_interface(interface)
    }

    fn read_control(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buf: &mut [u8],
        timeout: Duration,
    ) -> rusb::Result<usize> {
        self.handle
            .read_control(request_type, request, value, index, buf, timeout)
    }

    fn write_control(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
        timeout: Duration,
    ) -> rusb::Result<usize> {
        self.handle
            .write_control(request_type, request, value, index, data, timeout)
    }

    fn write_bulk(&mut self, endpoint: u8, data: &[u8], timeout: Duration) -> rusb::Result<usize> {
        self.handle.write_bulk(endpoint, data, timeout)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachedDevice {
    pub identity: DeviceIdentity,
    pub model: DeviceModel,
}

pub fn find_devices() -> Vec<AttachedDevice> {
    let mut found_devices: Vec<AttachedDevice> = Vec::new();

    let devices = match rusb::devices() {
        Ok(devices) => devices,
        Err(error) => {
            warn!("Unable to enumerate USB devices: {}", error);
            return found_devices;
        }
    };

    for device in devices.iter() {
        match device.device_descriptor() {
            Ok(descriptor) => found_devices.push(AttachedDevice {
                identity: DeviceIdentity::new(device.bus_number(), device.address()),
                model: DeviceModel::new(descriptor.vendor_id(), descriptor.product_id()),
            }),
            Err(error) => debug!(
                "Skipping device {:03}:{:03}, no descriptor: {}",
                device.bus_number(),
                device.address(),
                error
            ),
        }
    }

    found_devices
}
