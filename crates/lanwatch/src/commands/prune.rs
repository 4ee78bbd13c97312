//! Retention pass: drop history and events older than a horizon.

use chrono::Utc;

use crate::cli::{GlobalOpts, PruneArgs};
use crate::error::CliError;
use crate::output;

use super::{load_config, open_store, parse_duration_flag};

pub async fn run(global: &GlobalOpts, args: &PruneArgs) -> Result<(), CliError> {
    let horizon = match &args.older_than {
        Some(value) => parse_duration_flag("older-than", value)?,
        None => {
            let config = load_config(global)?;
            config
                .engine_options()?
                .history_retention
                .ok_or(CliError::NoRetentionHorizon)?
        }
    };

    let store = open_store(global)?;
    let cutoff = Utc::now() - horizon;
    let outcome = store.prune_history(cutoff).await?;

    output::print_output(
        &format!(
            "pruned {} history record(s) and {} event(s) older than {}",
            outcome.removed_records,
            outcome.removed_events,
            cutoff.to_rfc3339()
        ),
        global.quiet,
    );
    Ok(())
}
