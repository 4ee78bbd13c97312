//! Recent presence events, newest first.

use tabled::Tabled;

use lanwatch_core::PresenceEvent;

use crate::cli::{EventsArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::open_store;

#[derive(Tabled)]
struct EventRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Event")]
    kind: String,
    #[tabled(rename = "Device")]
    device: String,
    #[tabled(rename = "MAC")]
    mac: String,
    #[tabled(rename = "Transition")]
    transition: String,
}

impl From<&PresenceEvent> for EventRow {
    fn from(e: &PresenceEvent) -> Self {
        let prior = e
            .prior_status
            .map_or_else(|| "NONE".to_owned(), |s| s.to_string());
        Self {
            time: e.timestamp.to_rfc3339(),
            kind: e.kind.to_string(),
            device: e.identity.label().to_owned(),
            mac: e.identity.mac.to_string(),
            transition: format!("{prior} -> {}", e.new_status),
        }
    }
}

pub fn run(global: &GlobalOpts, args: &EventsArgs) -> Result<(), CliError> {
    let store = open_store(global)?;
    let events = store.recent_events(args.limit);

    if events.is_empty() {
        output::print_output("no events recorded yet", global.quiet);
        return Ok(());
    }

    let rendered = output::render_list(
        &global.output,
        &events,
        |e| EventRow::from(e),
        |e| format!("{} {} {}", e.timestamp.to_rfc3339(), e.kind, e.identity.mac),
    );
    output::print_output(&rendered, global.quiet);
    Ok(())
}
