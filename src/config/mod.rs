mod defaults;
mod error;
mod loader;
mod raw;

pub(crate) use error::ConfigError;
pub(crate) use loader::{CliArgs, MaintenanceAction, initialize_configuration};
pub(crate) use raw::{Config, ConfigRaw};
