//! Current per-device presence state.

use owo_colors::OwoColorize;
use tabled::Tabled;

use lanwatch_core::{DeviceState, PresenceStatus};

use crate::cli::{GlobalOpts, OutputFormat, StatusArgs};
use crate::error::CliError;
use crate::output;

use super::open_store;

#[derive(Tabled)]
struct StatusRow {
    #[tabled(rename = "MAC")]
    mac: String,
    #[tabled(rename = "Device")]
    device: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Last seen")]
    last_seen: String,
    #[tabled(rename = "Misses")]
    misses: u32,
}

fn to_row(state: &DeviceState, color: bool) -> StatusRow {
    let status = if color {
        match state.status {
            PresenceStatus::Present => state.status.to_string().green().to_string(),
            PresenceStatus::Absent => state.status.to_string().red().to_string(),
        }
    } else {
        state.status.to_string()
    };
    StatusRow {
        mac: state.identity.mac.to_string(),
        device: state.identity.label().to_owned(),
        status,
        last_seen: state.last_seen.to_rfc3339(),
        misses: state.consecutive_misses,
    }
}

pub fn run(global: &GlobalOpts, args: &StatusArgs) -> Result<(), CliError> {
    let store = open_store(global)?;
    let state = store.current_state();

    let mut states: Vec<DeviceState> = state.device_states.values().cloned().collect();
    if args.present_only {
        states.retain(|s| s.status == PresenceStatus::Present);
    }

    if states.is_empty() {
        output::print_output("no devices known yet", global.quiet);
        return Ok(());
    }

    let color = matches!(global.output, OutputFormat::Table) && output::should_color();
    let rendered = output::render_list(
        &global.output,
        &states,
        |s| to_row(s, color),
        |s| s.identity.mac.to_string(),
    );
    output::print_output(&rendered, global.quiet);
    Ok(())
}
