use crate::access::ExclusiveAccess;
use crate::controller::RelayController;
use crate::error::RelayError;
use log::debug;
use relay_types::{DeviceIdentity, RelayChannel};
use rusb::{Direction, Recipient, RequestType};
use std::time::Duration;

// V-USB based "USBRelay" boards (1, 2, 4 and 8 channel variants share the ID).
pub const VID_HID_RELAY: u16 = 0x16c0;
pub const PID_HID_RELAY: u16 = 0x05df;

const HID_GET_REPORT: u8 = 0x01;
const HID_SET_REPORT: u8 = 0x09;
const REPORT_TYPE_FEATURE: u16 = 3;

// These boards don't use report IDs.
const REPORT_VALUE: u16 = REPORT_TYPE_FEATURE << 8;

const COMMAND_ON: u8 = 0xff;
const COMMAND_OFF: u8 = 0xfd;

const REPORT_LENGTH: usize = 8;

// The last byte of the feature report carries the relay bitmap.
const STATE_OFFSET: usize = 7;

const USB_TIMEOUT: Duration = Duration::from_secs(1);

pub struct HidRelay {
    access: ExclusiveAccess,
}

impl HidRelay {
    pub fn read_channel(&self, channel: RelayChannel) -> Result<bool, RelayError> {
        let identity = self.access.identity();
        self.access.with_claimed_device(|session| {
            let mut report = [0; REPORT_LENGTH];
            let received = session
                .read_control(
                    rusb::request_type(Direction::In, RequestType::Class, Recipient::Device),
                    HID_GET_REPORT,
                    REPORT_VALUE,
                    0,
                    &mut report,
                    USB_TIMEOUT,
                )
                .map_err(RelayError::access(identity))?;

            if received < REPORT_LENGTH {
                return Err(RelayError::MalformedResponse {
                    identity,
                    expected: REPORT_LENGTH,
                    received,
                });
            }
            Ok(report[STATE_OFFSET] & channel.mask() != 0)
        })
    }

    pub fn write_channel(&self, channel: RelayChannel, status: bool) -> Result<(), RelayError> {
        let identity = self.access.identity();
        let command = match status {
            true => COMMAND_ON,
            false => COMMAND_OFF,
        };

        debug!("HID relay {} channel {} -> {}", identity, channel, status);
        self.access.with_claimed_device(|session| {
            session
                .write_control(
                    rusb::request_type(Direction::Out, RequestType::Class, Recipient::Device),
                    HID_SET_REPORT,
                    REPORT_VALUE,
                    0,
                    &[command, channel.number()],
                    USB_TIMEOUT,
                )
                .map_err(RelayError::access(identity))?;
            Ok(())
        })
    }
}

impl RelayController for HidRelay {
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
