//! Command handlers for the `lanwatch` CLI.

pub mod events;
pub mod ingest;
pub mod prune;
pub mod stats;
pub mod status;
pub mod validate;

use lanwatch_config::Config;
use lanwatch_core::{JsonFileBackend, SnapshotStore};

use crate::cli::{Cli, Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a parsed command.
pub async fn dispatch(cli: Cli) -> Result<(), CliError> {
    let global = cli.global;
    match cli.command {
        Command::Ingest(args) => ingest::run(&global, &args).await,
        Command::Status(args) => status::run(&global, &args),
        Command::Events(args) => events::run(&global, &args),
        Command::Uptime(args) => stats::uptime(&global, &args),
        Command::Count(args) => stats::count(&global, &args),
        Command::Validate(args) => validate::run(&global, &args),
        Command::Prune(args) => prune::run(&global, &args).await,
    }
}

/// Load config and open the store file for this invocation.
pub fn open_store(global: &GlobalOpts) -> Result<SnapshotStore, CliError> {
    let mut config = Config::load(global.config.as_deref())?;
    if let Some(dir) = &global.data_dir {
        config.data_dir = Some(dir.clone());
    }
    let options = config.engine_options()?;
    let store_path = config.store_path()?;
    tracing::debug!(path = %store_path.display(), "opening store");
    let backend = Box::new(JsonFileBackend::new(store_path));
    Ok(SnapshotStore::open(backend, options)?)
}

/// Load config with the data-dir flag override applied (for commands
/// that need config values beyond the store itself).
pub fn load_config(global: &GlobalOpts) -> Result<Config, CliError> {
    let mut config = Config::load(global.config.as_deref())?;
    if let Some(dir) = &global.data_dir {
        config.data_dir = Some(dir.clone());
    }
    Ok(config)
}

/// Parse a humantime flag value into a chrono duration.
pub fn parse_duration_flag(
    flag: &'static str,
    value: &str,
) -> Result<chrono::Duration, CliError> {
    let std_duration =
        humantime::parse_duration(value).map_err(|_| CliError::InvalidDuration {
            flag,
            value: value.to_owned(),
        })?;
    chrono::Duration::from_std(std_duration).map_err(|_| CliError::InvalidDuration {
        flag,
        value: value.to_owned(),
    })
}
