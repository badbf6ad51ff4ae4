#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt::Formatter;
use strum::{Display, EnumIter, EnumString};

pub const MIN_CHANNEL: u8 = 1;
pub const MAX_CHANNEL: u8 = 8;

// A physical device on this host, as libusb sees it. No normalisation happens here, two
// identities are the same device only if both the bus and the address match.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeviceIdentity {
    pub bus_number: u8,
    pub address: u8,
}

impl DeviceIdentity {
    pub fn new(bus_number: u8, address: u8) -> Self {
        Self {
            bus_number,
            address,
        }
    }
}

impl std::fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:03}:{:03}", self.bus_number, self.address)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeviceModel {
    pub vendor_id: u16,
    pub model_id: u16,
}

impl DeviceModel {
    pub const fn new(vendor_id: u16, model_id: u16) -> Self {
        Self {
            vendor_id,
            model_id,
        }
    }
}

impl std::fmt::Display for DeviceModel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04x}:{:04x}", self.vendor_id, self.model_id)
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Relay channel {0} is outside of 1..=8")]
pub struct InvalidChannel(pub u8);

/// One output of an adapter, numbered from 1. Channel `n` lives in bit `n - 1` of the
/// adapter's port register.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "u8", into = "u8"))]
pub struct RelayChannel(u8);

impl RelayChannel {
    /// Channel numbers come from static configuration, so an out of range value here is a
    /// bug in the caller. Use `RelayChannel::try_from` for anything read at runtime.
    pub fn new(number: u8) -> Self {
        assert!(
            (MIN_CHANNEL..=MAX_CHANNEL).contains(&number),
            "relay channel {} out of range",
            number
        );
        Self(number)
    }

    pub fn number(&self) -> u8 {
        self.0
    }

    pub fn mask(&self) -> u8 {
        1 << (self.0 - 1)
    }

    pub fn all() -> impl Iterator<Item = RelayChannel> {
        (MIN_CHANNEL..=MAX_CHANNEL).map(RelayChannel)
    }
}

impl TryFrom<u8> for RelayChannel {
    type Error = InvalidChannel;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (MIN_CHANNEL..=MAX_CHANNEL).contains(&value) {
            Ok(Self(value))
        } else {
            Err(InvalidChannel(value))
        }
    }
}

impl From<RelayChannel> for u8 {
    fn from(value: RelayChannel) -> Self {
        value.0
    }
}

impl std::fmt::Display for RelayChannel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// The names here are what an agent is asked to 'load', so they need to stay stable.
#[derive(Copy, Clone, Debug, Display, EnumIter, EnumString, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ProtocolKind {
    #[strum(serialize = "usb_ftdi_relay")]
    #[cfg_attr(feature = "serde", serde(rename = "usb_ftdi_relay"))]
    FtdiGpio,

    #[strum(serialize = "usb_hid_relay")]
    #[cfg_attr(feature = "serde", serde(rename = "usb_hid_relay"))]
    HidReport,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn channel_maps_to_bit() {
        assert_eq!(RelayChannel::new(1).mask(), 0x01);
        assert_eq!(RelayChannel::new(4).mask(), 0x08);
        assert_eq!(RelayChannel::new(8).mask(), 0x80);
    }

    #[test]
    fn channel_bounds() {
        assert_eq!(RelayChannel::try_from(0), Err(InvalidChannel(0)));
        assert_eq!(RelayChannel::try_from(9), Err(InvalidChannel(9)));
        assert_eq!(RelayChannel::try_from(8).map(u8::from), Ok(8));
        assert_eq!(RelayChannel::all().count(), 8);
    }

    #[test]
    #[should_panic]
    fn channel_zero_is_a_bug() {
        RelayChannel::new(0);
    }

    #[test]
    fn identity_equality_is_exact() {
        assert_eq!(DeviceIdentity::new(1, 4), DeviceIdentity::new(1, 4));
        assert_ne!(DeviceIdentity::new(1, 4), DeviceIdentity::new(4, 1));
        assert_eq!(DeviceIdentity::new(3, 12).to_string(), "003:012");
    }

    #[test]
    fn protocol_names() {
        assert_eq!(ProtocolKind::FtdiGpio.to_string(), "usb_ftdi_relay");
        assert_eq!(
            ProtocolKind::from_str("usb_hid_relay"),
            Ok(ProtocolKind::HidReport)
        );
        assert!(ProtocolKind::from_str("usb_serial_relay").is_err());

        for protocol in ProtocolKind::iter() {
            assert_eq!(ProtocolKind::from_str(&protocol.to_string()), Ok(protocol));
        }
    }
}
