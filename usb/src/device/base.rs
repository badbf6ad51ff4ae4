use relay_types::DeviceIdentity;
use std::time::Duration;

// An open handle to a single device. Dropping the session closes the handle, so a caller
// never needs an explicit close.
pub trait DeviceSession: Send {
    fn claim_interface(&mut self, interface: u8) -> rusb::Result<()>;
    fn release_interface(&mut self, interface: u8) -> rusb::Result<()>;

    fn read_control(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buf: &mut [u8],
        timeout: Duration,
    ) -> rusb::Result<usize>;

    fn write_control(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
        timeout: Duration,
    ) -> rusb::Result<usize>;

    fn write_bulk(&mut self, endpoint: u8, data: &[u8], timeout: Duration) -> rusb::Result<usize>;
}

// Locates a device by its bus position and opens it. Each call must produce a fresh handle,
// the claim loop relies on that to recover a handle that needs reconfiguring.
pub trait DeviceOpener: Send + Sync {
    fn open(&self, identity: DeviceIdentity) -> rusb::Result<Box<dyn DeviceSession>>;
}
