//! Snapshot ingestion: read a submission, commit it, report events.

use std::io::Read;

use tabled::Tabled;
use tracing::warn;

use lanwatch_core::engine::{ScanAdvisory, TransitionKind};
use lanwatch_core::{PresenceEvent, SnapshotSubmission};

use crate::cli::{GlobalOpts, IngestArgs};
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
}

impl From<&PresenceEvent> for EventRow {
    fn from(e: &PresenceEvent) -> Self {
        Self {
            time: e.timestamp.to_rfc3339(),
            kind: e.kind.to_string(),
            device: e.identity.label().to_owned(),
            mac: e.identity.mac.to_string(),
        }
    }
}

pub async fn run(global: &GlobalOpts, args: &IngestArgs) -> Result<(), CliError> {
    let raw = read_input(&args.file)?;
    let submission: SnapshotSubmission =
        serde_json::from_str(&raw).map_err(|source| CliError::InvalidJson {
            path: args.file.clone(),
            source,
        })?;

    let normalized = submission.normalize();
    for rejected in &normalized.rejected {
        warn!(address = %rejected.raw.address, error = %rejected.error, "device skipped");
    }

    let store = open_store(global)?;

    if args.dry_run {
        let classification = store.preview(&normalized.snapshot);
        if let Some(ScanAdvisory::SuspectedScanFailure { known_before }) = classification.advisory {
            eprintln!("advisory: suspected scan failure ({known_before} devices known, none seen)");
        }
        let summary = format!(
            "dry run: {} arrived, {} departed, {} refreshed, {} missed",
            classification.of_kind(TransitionKind::Arrived).count(),
            classification.of_kind(TransitionKind::Departed).count(),
            classification.of_kind(TransitionKind::Refresh).count(),
            classification.of_kind(TransitionKind::Miss).count(),
        );
        output::print_output(&summary, global.quiet);
        return Ok(());
    }

    let outcome = store.commit(normalized.snapshot).await?;

    if let Some(ScanAdvisory::SuspectedScanFailure { known_before }) = outcome.advisory {
        eprintln!("advisory: suspected scan failure ({known_before} devices known, none seen)");
    }

    if outcome.events.is_empty() {
        output::print_output("no presence changes", global.quiet);
        return Ok(());
    }

    let rendered = output::render_list(
        &global.output,
        &outcome.events,
        |e| EventRow::from(e),
        |e| format!("{} {}", e.kind, e.identity.mac),
    );
    output::print_output(&rendered, global.quiet);
    Ok(())
}

fn read_input(file: &str) -> Result<String, CliError> {
    if file == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|source| CliError::ReadFailed {
                path: "<stdin>".into(),
                source,
            })?;
        Ok(buf)
    } else {
        std::fs::read_to_string(file).map_err(|source| CliError::ReadFailed {
            path: file.to_owned(),
            source,
        })
    }
}
