use crate::access::ClaimPolicy;
use crate::controller::RelayController;
use crate::device::base::DeviceOpener;
use crate::error::RelayError;
use crate::ftdi::FtdiRelay;
use crate::hid::{HidRelay, PID_HID_RELAY, VID_HID_RELAY};
use crate::registry::RelayRegistry;
use relay_types::{DeviceIdentity, DeviceModel, ProtocolKind, RelayChannel};
use std::sync::Arc;

cfg_if::cfg_if! {
    if #[cfg(feature = "ftdi")] {
        // FT232R, FT2232, FT4232, FT232H, FT-X series and FT4232HA
        const FTDI_PRODUCT_IDS: Option<&[DeviceModel]> = Some(&[
            DeviceModel::new(crate::ftdi::VID_FTDI, 0x6001),
            DeviceModel::new(crate::ftdi::VID_FTDI, 0x6010),
            DeviceModel::new(crate::ftdi::VID_FTDI, 0x6011),
            DeviceModel::new(crate::ftdi::VID_FTDI, 0x6014),
            DeviceModel::new(crate::ftdi::VID_FTDI, 0x6015),
            DeviceModel::new(crate::ftdi::VID_FTDI, 0x6048),
        ]);
    } else {
        const FTDI_PRODUCT_IDS: Option<&[DeviceModel]> = None;
    }
}

/// Picks the wire protocol for a board from its USB vendor and product IDs. Known FTDI parts
/// are driven as bit-bang GPIO, anything else is assumed to be a HID relay.
#[derive(Debug, Clone, Copy)]
pub struct ProtocolDispatcher {
    ftdi_models: Option<&'static [DeviceModel]>,
}

impl Default for ProtocolDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ProtocolDispatcher {
    pub fn new() -> Self {
        Self::with_ftdi_models(FTDI_PRODUCT_IDS)
    }

    pub fn with_ftdi_models(ftdi_models: Option<&'static [DeviceModel]>) -> Self {
        Self { ftdi_models }
    }

    pub fn ftdi_available(&self) -> bool {
        self.ftdi_models.is_some()
    }

    pub fn select(&self, vendor_id: u16, model_id: u16) -> ProtocolKind {
        let model = DeviceModel::new(vendor_id, model_id);
        match self.ftdi_models {
            Some(models) if models.contains(&model) => ProtocolKind::FtdiGpio,
            _ => ProtocolKind::HidReport,
        }
    }

    /// Whether a device is one we'd know how to drive, used when listing devices.
    pub fn is_relay(&self, model: DeviceModel) -> bool {
        self.select(model.vendor_id, model.model_id) == ProtocolKind::FtdiGpio
            || (model.vendor_id == VID_HID_RELAY && model.model_id == PID_HID_RELAY)
    }
}

/// The set of controllers available to an agent, one registry per protocol. Requests name
/// the protocol they were loaded for, and are routed to that protocol's controller for the
/// device.
pub struct RelayHub {
    ftdi: RelayRegistry<FtdiRelay>,
    hid: RelayRegistry<HidRelay>,
}

impl RelayHub {
    pub fn new(opener: Arc<dyn DeviceOpener>, policy: ClaimPolicy) -> Self {
        Self {
            ftdi: RelayRegistry::new(opener.clone(), policy),
            hid: RelayRegistry::new(opener, policy),
        }
    }

    pub fn set(
        &self,
        protocol: ProtocolKind,
        identity: DeviceIdentity,
        channel: RelayChannel,
        status: bool,
    ) -> Result<(), RelayError> {
        match protocol {
            ProtocolKind::FtdiGpio => self.ftdi.get_or_create(identity).set_output(channel, status),
            ProtocolKind::HidReport => self.hid.get_or_create(identity).set_output(channel, status),
        }
    }

    pub fn get(
        &self,
        protocol: ProtocolKind,
        identity: DeviceIdentity,
        channel: RelayChannel,
    ) -> Result<bool, RelayError> {
        match protocol {
            ProtocolKind::FtdiGpio => self.ftdi.get_or_create(identity).get_output(channel),
            ProtocolKind::HidReport => self.hid.get_or_create(identity).get_output(channel),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::mock::MockBus;

    #[test]
    #[cfg(feature = "ftdi")]
    fn known_ftdi_parts_use_gpio() {
        let dispatcher = ProtocolDispatcher::new();
        assert!(dispatcher.ftdi_available());
        assert_eq!(dispatcher.select(0x0403, 0x6001), ProtocolKind::FtdiGpio);
        assert_eq!(dispatcher.select(0x0403, 0x6014), ProtocolKind::FtdiGpio);
    }

    #[test]
    fn everything_else_is_hid() {
        let dispatcher = ProtocolDispatcher::new();
        assert_eq!(dispatcher.select(0x16c0, 0x05df), ProtocolKind::HidReport);

        // Exact pairs only, an FTDI product ID under another vendor doesn't count.
        assert_eq!(dispatcher.select(0x16c0, 0x6001), ProtocolKind::HidReport);
        assert_eq!(dispatcher.select(0x0403, 0x05df), ProtocolKind::HidReport);
    }

    #[test]
    fn missing_table_never_selects_gpio() {
        let dispatcher = ProtocolDispatcher::with_ftdi_models(None);
        assert!(!dispatcher.ftdi_available());
        assert_eq!(dispatcher.select(0x0403, 0x6001), ProtocolKind::HidReport);
    }

    #[test]
    fn recognises_relay_boards() {
        let dispatcher = ProtocolDispatcher::new();
        assert!(dispatcher.is_relay(DeviceModel::new(0x16c0, 0x05df)));
        assert!(!dispatcher.is_relay(DeviceModel::new(0x046d, 0xc52b)));
        assert_eq!(
            dispatcher.is_relay(DeviceModel::new(0x0403, 0x6001)),
            dispatcher.ftdi_available()
        );

        let hid_only = ProtocolDispatcher::with_ftdi_models(None);
        assert!(!hid_only.is_relay(DeviceModel::new(0x0403, 0x6001)));
        assert!(hid_only.is_relay(DeviceModel::new(0x16c0, 0x05df)));
    }

    #[test]
    #[cfg(feature = "ftdi")]
    fn ftdi_parts_are_relays() {
        assert!(ProtocolDispatcher::new().is_relay(DeviceModel::new(0x0403, 0x6001)));
    }

    #[test]
    fn hub_routes_by_protocol() {
        let bus = Arc::new(MockBus::new());
        let identity = DeviceIdentity::new(4, 4);
        let board = bus.attach(identity);
        let hub = RelayHub::new(bus, ClaimPolicy::default());

        hub.set(ProtocolKind::FtdiGpio, identity, RelayChannel::new(3), true)
            .unwrap();
        assert_eq!(board.port(), 0b0000_0100);
        assert_eq!(board.hid_relays(), 0);

        hub.set(ProtocolKind::HidReport, identity, RelayChannel::new(1), true)
            .unwrap();
        assert_eq!(board.hid_relays(), 0b0000_0001);

        assert!(hub
            .get(ProtocolKind::FtdiGpio, identity, RelayChannel::new(3))
            .unwrap());
        assert!(!hub
            .get(ProtocolKind::HidReport, identity, RelayChannel::new(3))
            .unwrap());
    }
}
