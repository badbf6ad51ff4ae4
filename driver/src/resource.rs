use anyhow::{Context, Result};
use relay_types::{DeviceIdentity, DeviceModel, RelayChannel};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;

/// One relay channel on a USB relay board, as handed to a driver. The board is found by its
/// bus position, the model decides which protocol drives it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HidRelayResource {
    pub name: String,
    pub bus_number: u8,
    pub address: u8,
    pub vendor_id: u16,
    pub model_id: u16,

    #[serde(default = "default_index")]
    pub index: RelayChannel,

    #[serde(default)]
    pub invert: bool,

    // Set when the board hangs off another host and is reached through its agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

fn default_index() -> RelayChannel {
    RelayChannel::new(1)
}

impl HidRelayResource {
    pub fn identity(&self) -> DeviceIdentity {
        DeviceIdentity::new(self.bus_number, self.address)
    }

    pub fn model(&self) -> DeviceModel {
        DeviceModel::new(self.vendor_id, self.model_id)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub resources: Vec<HidRelayResource>,
}

impl RelayConfig {
    pub fn read(path: &Path) -> Result<RelayConfig> {
        match File::open(path) {
            Ok(reader) => serde_json::from_reader(reader).context(format!(
                "Could not parse relay configuration at {}",
                path.to_string_lossy()
            )),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(RelayConfig::default()),
            Err(error) => Err(error).context(format!(
                "Could not open relay configuration for reading at {}",
                path.to_string_lossy()
            )),
        }
    }

    pub fn find(&self, name: &str) -> Option<&HidRelayResource> {
        self.resources.iter().find(|resource| resource.name == name)
    }
}
