use clap::{Parser, Subcommand, ValueEnum};
use directories::ProjectDirs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(about, version, author)]
pub struct Cli {
    /// Minimum log level to print out
    #[clap(long, value_enum, default_value = "warn")]
    pub log_level: LevelFilter,

    /// Location of the relay configuration file on disk
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// How long to keep retrying a busy relay board before giving up, in milliseconds
    #[clap(long, default_value = "1000")]
    pub claim_timeout: u64,

    #[clap(subcommand)]
    pub command: SubCommands,
}

#[derive(Subcommand, Debug)]
pub enum SubCommands {
    /// List relay boards attached to this host
    List,

    /// Print the state of a configured relay
    Get {
        /// Name of the relay resource in the configuration
        name: String,
    },

    /// Switch a configured relay on or off
    Set {
        /// Name of the relay resource in the configuration
        name: String,

        #[clap(value_enum)]
        state: OutputState,
    },
}

#[derive(ValueEnum, Copy, Clone, Eq, PartialEq, Debug)]
pub enum OutputState {
    On,
    Off,
}

impl From<OutputState> for bool {
    fn from(value: OutputState) -> Self {
        value == OutputState::On
    }
}

#[repr(usize)]
#[derive(ValueEnum, Copy, Clone, Eq, PartialEq, Debug)]
pub enum LevelFilter {
    /// A level lower than all log levels.
    Off,
    /// Corresponds to the `Error` log level.
    Error,
    /// Corresponds to the `Warn` log level.
    Warn,
    /// Corresponds to the `Info` log level.
    Info,
    /// Corresponds to the `Debug` log level.
    Debug,
    /// Corresponds to the `Trace` log level.
    Trace,
}

impl From<LevelFilter> for log::LevelFilter {
    fn from(value: LevelFilter) -> Self {
        match value {
            LevelFilter::Off => log::LevelFilter::Off,
            LevelFilter::Error => log::LevelFilter::Error,
            LevelFilter::Warn => log::LevelFilter::Warn,
            LevelFilter::Info => log::LevelFilter::Info,
            LevelFilter::Debug => log::LevelFilter::Debug,
            LevelFilter::Trace => log::LevelFilter::Trace,
        }
    }
}

pub fn default_config_location() -> Option<PathBuf> {
    ProjectDirs::from("org", "relay-control", "relay-ctl")
        .map(|dirs| dirs.config_dir().join("relays.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_set() {
        let cli = Cli::parse_from(["relay-ctl", "set", "dut-power", "on"]);
        match cli.command {
            SubCommands::Set { name, state } => {
                assert_eq!(name, "dut-power");
                assert!(bool::from(state));
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert_eq!(cli.claim_timeout, 1000);
        assert_eq!(cli.log_level, LevelFilter::Warn);
    }

    #[test]
    fn rejects_unknown_state() {
        assert!(Cli::try_parse_from(["relay-ctl", "set", "dut-power", "maybe"]).is_err());
    }
}
