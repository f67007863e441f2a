use std::path::Path;

use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use figment::{
    Figment,
    providers::{Format, Serialized, Toml},
};
use serde::Deserialize;

use super::{Config, ConfigRaw, defaults};
use crate::config::ConfigError;

const DEFAULT_CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Deserialize)]
struct EnvironmentConfig {
    environment: Option<String>,
}

/// One-shot maintenance requested on the command line instead of the sync loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MaintenanceAction {
    /// Print cache statistics and exit.
    Stats,
    /// Delete every cached event and the watermark.
    ClearCache,
    /// Rewind the watermark; `None` removes it.
    ResetWatermark(Option<u64>),
}

#[derive(Debug, Clone, Default)]
pub(crate) struct CliArgs {
    pub config_path: Option<String>,
    pub maintenance: Option<MaintenanceAction>,
}

impl CliArgs {
    pub(crate) fn parse() -> Self {
        Self::from_matches(&command().get_matches())
    }

    fn from_matches(matches: &ArgMatches) -> Self {
        let maintenance = if matches.get_flag("stats") {
            Some(MaintenanceAction::Stats)
        } else if matches.get_flag("clear-cache") {
            Some(MaintenanceAction::ClearCache)
        } else if matches.contains_id("reset-watermark") {
            Some(MaintenanceAction::ResetWatermark(
                matches.get_one::<u64>("reset-watermark").copied(),
            ))
        } else {
            None
        };

        Self {
            config_path: matches.get_one::<String>("config").cloned(),
            maintenance,
        }
    }
}

fn command() -> Command {
    Command::new("IoT IAM access log sync")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Sets a custom config file (.toml format)"),
        )
        .arg(
            Arg::new("stats")
                .long("stats")
                .action(ArgAction::SetTrue)
                .conflicts_with_all(["clear-cache", "reset-watermark"])
                .help("Prints cache statistics and exits"),
        )
        .arg(
            Arg::new("clear-cache")
                .long("clear-cache")
                .action(ArgAction::SetTrue)
                .conflicts_with("reset-watermark")
                .help("Deletes all cached events and the sync watermark, then exits"),
        )
        .arg(
            Arg::new("reset-watermark")
                .long("reset-watermark")
                .value_name("BLOCK")
                .num_args(0..=1)
                .value_parser(value_parser!(u64))
                .help("Rewinds the sync watermark to BLOCK (or removes it), then exits"),
        )
}

pub(crate) fn initialize_configuration(args: &CliArgs) -> Config {
    load_configuration(args.config_path.as_deref()).expect("Failed to load configuration")
}

fn load_configuration(custom_config_path: Option<&str>) -> Result<Config, ConfigError> {
    let environment = resolve_environment(custom_config_path)?;

    // Lowest to highest priority: typed defaults, config.toml, custom file.
    let mut figment = Figment::from(Serialized::defaults(defaults::config_for(&environment)?));

    if Path::new(DEFAULT_CONFIG_FILE).exists() {
        figment = figment.merge(Toml::file(DEFAULT_CONFIG_FILE));
    }

    if let Some(config_path) = custom_config_path {
        figment = figment.merge(Toml::file(config_path));
    }

    let config: ConfigRaw = figment.extract().map_err(Box::new)?;
    if normalize_env(config.environment.clone()) != environment {
        return Err(ConfigError::UnknownEnvironment(format!(
            "config environment '{}' does not match selected '{}'",
            config.environment, environment
        )));
    }

    config.resolve()
}

fn resolve_environment(custom_config_path: Option<&str>) -> Result<String, ConfigError> {
    let config_path = custom_config_path.unwrap_or(DEFAULT_CONFIG_FILE);

    if !Path::new(config_path).exists() {
        return Err(ConfigError::MissingConfig(config_path.to_string()));
    }

    let environment = read_environment_from(config_path).ok_or_else(|| {
        ConfigError::MissingEnvironment(
            "set environment = \"development|testnet|mainnet\" in your config".to_string(),
        )
    })?;

    if !matches!(environment.as_str(), "development" | "testnet" | "mainnet") {
        return Err(ConfigError::UnknownEnvironment(environment));
    }

    Ok(environment)
}

fn read_environment_from(path: &str) -> Option<String> {
    Figment::from(Toml::file(path))
        .extract::<EnvironmentConfig>()
        .ok()
        .and_then(|config| config.environment)
        .map(normalize_env)
}

fn normalize_env(env: String) -> String {
    env.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn config_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn path(file: &NamedTempFile) -> &str {
        file.path().to_str().unwrap()
    }

    #[test]
    fn environment_is_read_and_normalized() {
        let file = config_file("environment = \" Testnet \"\n");

        assert_eq!(resolve_environment(Some(path(&file))).unwrap(), "testnet");
    }

    #[test]
    fn missing_file_and_environment_are_errors() {
        assert!(matches!(
            resolve_environment(Some("/definitely/not/here.toml")),
            Err(ConfigError::MissingConfig(_))
        ));

        let file = config_file("app_data_path = \"data\"\n");
        assert!(matches!(
            resolve_environment(Some(path(&file))),
            Err(ConfigError::MissingEnvironment(_))
        ));

        let file = config_file("environment = \"staging\"\n");
        assert!(matches!(
            resolve_environment(Some(path(&file))),
            Err(ConfigError::UnknownEnvironment(_))
        ));
    }

    #[test]
    fn custom_file_overrides_defaults() {
        let file = config_file(
            r#"
environment = "development"

[blockchain]
contract_address = "0x5FbDB2315678afecb367f032d93F642f64180aa3"
confirmations = 6

[fetcher]
max_block_span = 250

[sync]
genesis_block = 1200
"#,
        );

        let config = load_configuration(Some(path(&file))).unwrap();

        assert_eq!(config.environment, "development");
        assert_eq!(config.blockchain.confirmations, 6);
        assert_eq!(config.fetcher.max_block_span, 250);
        assert_eq!(config.sync.genesis_block, 1200);
        assert!(config.sync.enabled);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let file = config_file(
            r#"
environment = "development"

[sync]
period_secs = 3
"#,
        );

        assert!(matches!(
            load_configuration(Some(path(&file))),
            Err(ConfigError::LoadError(_))
        ));
    }

    #[test]
    fn maintenance_flags_are_parsed() {
        let parse = |args: &[&str]| {
            CliArgs::from_matches(&command().try_get_matches_from(args).unwrap())
        };

        assert_eq!(parse(&["sync"]).maintenance, None);
        assert_eq!(
            parse(&["sync", "--stats"]).maintenance,
            Some(MaintenanceAction::Stats)
        );
        assert_eq!(
            parse(&["sync", "--clear-cache"]).maintenance,
            Some(MaintenanceAction::ClearCache)
        );
        assert_eq!(
            parse(&["sync", "--reset-watermark", "42"]).maintenance,
            Some(MaintenanceAction::ResetWatermark(Some(42)))
        );
        assert_eq!(
            parse(&["sync", "--reset-watermark"]).maintenance,
            Some(MaintenanceAction::ResetWatermark(None))
        );

        let args = parse(&["sync", "-c", "custom.toml"]);
        assert_eq!(args.config_path.as_deref(), Some("custom.toml"));
        assert!(command().try_get_matches_from(["sync", "--stats", "--clear-cache"]).is_err());
    }
}
