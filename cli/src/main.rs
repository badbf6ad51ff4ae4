mod cli;

use crate::cli::{default_config_location, Cli, SubCommands};
use anyhow::{anyhow, Context, Result};
use clap::Parser;
use log::debug;
use relay_driver::{HidRelayDriver, RelayConfig};
use relay_ipc::client::AgentConnector;
use relay_ipc::LocalAgent;
use relay_usb::access::ClaimPolicy;
use relay_usb::devices::find_relays;
use relay_usb::dispatch::ProtocolDispatcher;
use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};
use std::sync::Arc;
use std::time::Duration;

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    CombinedLogger::init(vec![TermLogger::new(
        args.log_level.into(),
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )])
    .context("Could not configure the logger")?;

    let dispatcher = ProtocolDispatcher::new();
    if !dispatcher.ftdi_available() {
        debug!("Built without FTDI support, all boards will be driven as HID relays");
    }

    let name = match args.command {
        SubCommands::List => {
            for relay in find_relays(&dispatcher) {
                println!("{}\t{}\t{}", relay.identity, relay.model, relay.protocol);
            }
            return Ok(());
        }
        SubCommands::Get { ref name } | SubCommands::Set { ref name, .. } => name.clone(),
    };

    let config_path = args
        .config
        .or_else(default_config_location)
        .ok_or_else(|| anyhow!("Unable to locate a configuration directory, use --config"))?;
    let config = RelayConfig::read(&config_path)?;
    let resource = config
        .find(&name)
        .ok_or_else(|| anyhow!("No relay named '{}' in {}", name, config_path.display()))?
        .clone();

    let policy = ClaimPolicy {
        timeout: Duration::from_millis(args.claim_timeout),
        ..Default::default()
    };
    let connector = AgentConnector::new(Arc::new(LocalAgent::libusb(policy)));

    let mut driver = HidRelayDriver::with_dispatcher(resource, connector, dispatcher);
    driver.activate()?;

    let result = match args.command {
        SubCommands::Set { state, .. } => driver.set(state.into()),
        _ => driver.get().map(|status| {
            println!("{}", if status { "on" } else { "off" });
        }),
    };

    driver.deactivate()?;
    result.with_context(|| format!("Relay '{}' failed", name))
}
