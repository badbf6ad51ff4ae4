// Plain descriptions of the relay boards currently plugged in, so callers can offer them for
// configuration without having to go near libusb themselves.
use crate::device::{self, AttachedDevice};
use crate::dispatch::ProtocolDispatcher;
use relay_types::{DeviceIdentity, DeviceModel, ProtocolKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayDevice {
    pub identity: DeviceIdentity,
    pub model: DeviceModel,
    pub protocol: ProtocolKind,
}

pub fn find_relays(dispatcher: &ProtocolDispatcher) -> Vec<RelayDevice> {
    relays_among(dispatcher, device::find_devices())
}

fn relays_among(dispatcher: &ProtocolDispatcher, attached: Vec<AttachedDevice>) -> Vec<RelayDevice> {
    attached
        .into_iter()
        .filter(|attached| dispatcher.is_relay(attached.model))
        .map(|attached| RelayDevice {
            identity: attached.identity,
            model: attached.model,
            protocol: dispatcher.select(attached.model.vendor_id, attached.model.model_id),
        })
        .collect()
}
