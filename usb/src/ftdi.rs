use crate::access::ExclusiveAccess;
use crate::controller::RelayController;
use crate::device::base::DeviceSession;
use crate::error::RelayError;
use log::debug;
use relay_types::{DeviceIdentity, RelayChannel};
use rusb::{Direction, Recipient, RequestType};
use std::time::Duration;

pub const VID_FTDI: u16 = 0x0403;

// SIO vendor requests
const SIO_SET_BITMODE: u8 = 0x0b;
const SIO_READ_PINS: u8 = 0x0c;

const BITMODE_BITBANG: u16 = 0x01;

// Every pin on the port drives a relay.
const ALL_OUTPUTS: u16 = 0xff;

// Port A, the only port on the single channel chips relay boards are built with.
const INTERFACE_A: u16 = 1;
const ENDPOINT_OUT_A: u8 = 0x02;

const USB_TIMEOUT: Duration = Duration::from_secs(1);

/// Returns `state` with only `channel`'s bit changed.
pub fn apply_channel(state: u8, channel: RelayChannel, status: bool) -> u8 {
    match status {
        true => state | channel.mask(),
        false => state & !channel.mask(),
    }
}

// The FT232 GPIO port of a claimed device, in asynchronous bit-bang mode.
struct BitbangPort<'a> {
    identity: DeviceIdentity,
    session: &'a mut dyn DeviceSession,
}

impl<'a> BitbangPort<'a> {
    fn configure(
        identity: DeviceIdentity,
        session: &'a mut dyn DeviceSession,
    ) -> Result<Self, RelayError> {
        // Entering bit-bang mode keeps the pin latch, and the mode is never reset on close so
        // the relays hold their state once we let go of the device.
        session
            .write_control(
                rusb::request_type(Direction::Out, RequestType::Vendor, Recipient::Device),
                SIO_SET_BITMODE,
                (BITMODE_BITBANG << 8) | ALL_OUTPUTS,
                INTERFACE_A,
                &[],
                USB_TIMEOUT,
            )
            .map_err(RelayError::access(identity))?;

        Ok(Self { identity, session })
    }

    fn read_port(&mut self) -> Result<u8, RelayError> {
        let mut buf = [0; 1];
        let received = self
            .session
            .read_control(
                rusb::request_type(Direction::In, RequestType::Vendor, Recipient::Device),
                SIO_READ_PINS,
                0,
                INTERFACE_A,
                &mut buf,
                USB_TIMEOUT,
            )
            .map_err(RelayError::access(self.identity))?;

        if received != buf.len() {
            return Err(RelayError::MalformedResponse {
                identity: self.identity,
                expected: buf.len(),
                received,
            });
        }
        Ok(buf[0])
    }

    fn write_port(&mut self, state: u8) -> Result<(), RelayError> {
        let buf = [state];
        let written = self
            .session
            .write_bulk(ENDPOINT_OUT_A, &buf, USB_TIMEOUT)
            .map_err(RelayError::access(self.identity))?;

        if written != buf.len() {
            return Err(RelayError::MalformedResponse {
                identity: self.identity,
                expected: buf.len(),
                received: written,
            });
        }
        Ok(())
    }
}

pub struct FtdiRelay {
    access: ExclusiveAccess,
}

impl FtdiRelay {
    pub fn read_channel(&self, channel: RelayChannel) -> Result<bool, RelayError> {
        let identity = self.access.identity();
        self.access.with_claimed_device(|session| {
            let mut port = BitbangPort::configure(identity, session)?;
            Ok(port.read_port()? & channel.mask() != 0)
        })
    }

    pub fn write_channel(&self, channel: RelayChannel, status: bool) -> Result<(), RelayError> {
        let identity = self.access.identity();

        // Other channels share the register, so the read and the write have to happen inside
        // the same claim.
        self.access.with_claimed_device(|session| {
            let mut port = BitbangPort::configure(identity, session)?;
            let state = port.read_port()?;
            let updated = apply_channel(state, channel, status);

            debug!(
                "FTDI {} channel {} -> {}, port {:#04x} -> {:#04x}",
                identity, channel, status, state, updated
            );
            port.write_port(updated)
        })
    }
}

impl RelayController for FtdiRelay {
    fn attach(access: ExclusiveAccess) -> Self {
        Self { access }
    }

    fn identity(&self) -> DeviceIdentity {
        self.access.identity()
    }

    fn set_output(&self, channel: RelayChannel, status: bool) -> Result<(), RelayError> {
        self.write_channel(channel, status)
    }

    fn get_output(&self, channel: RelayChannel) -> Result<bool, RelayError> {
        self.read_channel(channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::ClaimPolicy;
    use crate::device::mock::{MockBoard, MockBus};
    use std::sync::Arc;
    use std::thread;

    fn relay() -> (MockBoard, Arc<FtdiRelay>) {
        let identity = DeviceIdentity::new(3, 2);
        let bus = Arc::new(MockBus::new());
        let board = bus.attach(identity);
        let access = ExclusiveAccess::new(identity, bus, ClaimPolicy::default());
        (board, Arc::new(FtdiRelay::attach(access)))
    }

    #[test]
    fn apply_touches_one_bit() {
        assert_eq!(apply_channel(0b0000_0000, RelayChannel::new(1), true), 0b0000_0001);
        assert_eq!(apply_channel(0b1111_1111, RelayChannel::new(8), false), 0b0111_1111);
        assert_eq!(apply_channel(0b1010_0000, RelayChannel::new(6), true), 0b1010_0000);
        assert_eq!(apply_channel(0b1010_0000, RelayChannel::new(3), false), 0b1010_0000);
    }

    #[test]
    fn round_trip_every_channel() {
        let (board, relay) = relay();

        for channel in RelayChannel::all() {
            relay.write_channel(channel, true).unwrap();
            assert!(relay.read_channel(channel).unwrap());
            relay.write_channel(channel, false).unwrap();
            assert!(!relay.read_channel(channel).unwrap());
        }
        assert_eq!(board.port(), 0);
    }

    #[test]
    fn writes_leave_other_channels_alone() {
        let (board, relay) = relay();
        board.set_port(0b1001_0110);

        relay.write_channel(RelayChannel::new(1), true).unwrap();
        assert_eq!(board.port(), 0b1001_0111);

        relay.write_channel(RelayChannel::new(5), true).unwrap();
        assert_eq!(board.port(), 0b1001_0111);

        relay.write_channel(RelayChannel::new(8), false).unwrap();
        assert_eq!(board.port(), 0b0001_0111);

        for c1 in RelayChannel::all() {
            for c2 in RelayChannel::all().filter(|c| *c != c1) {
                let before = relay.read_channel(c2).unwrap();
                relay.write_channel(c1, !relay.read_channel(c1).unwrap()).unwrap();
                assert_eq!(relay.read_channel(c2).unwrap(), before);
            }
        }
    }

    #[test]
    fn configures_bitbang_with_all_outputs() {
        let (board, relay) = relay();
        relay.read_channel(RelayChannel::new(2)).unwrap();
        assert_eq!(board.bitmode(), Some(0x01ff));
    }

    #[test]
    fn short_write_is_rejected() {
        let (board, relay) = relay();
        board.dropped_writes(true);

        let result = relay.write_channel(RelayChannel::new(1), true);
        assert!(matches!(
            result,
            Err(RelayError::MalformedResponse {
                expected: 1,
                received: 0,
                ..
            })
        ));
        assert_eq!(board.port(), 0);
        assert!(!board.is_claimed());
    }

    #[test]
    fn reads_reflect_external_changes() {
        let (board, relay) = relay();
        assert!(!relay.read_channel(RelayChannel::new(4)).unwrap());

        // Another process flipping the channel behind our back.
        board.set_port(0b0000_1000);
        assert!(relay.read_channel(RelayChannel::new(4)).unwrap());
    }

    #[test]
    fn concurrent_writes_to_sibling_channels() {
        let (board, relay) = relay();
        board.write_delay(Duration::from_millis(5));

        let handles: Vec<_> = RelayChannel::all()
            .map(|channel| {
                let relay = relay.clone();
                thread::spawn(move || relay.write_channel(channel, true))
            })
            .collect();

        for handle in handles {
            handle.join().unwrap().unwrap();
        }
        assert_eq!(board.port(), 0xff);
        assert_eq!(board.stats().busy_rejections, 0);
    }
}
