//! Aggregation queries: uptime ratio and device counts over time.

use chrono::Utc;
use serde::Serialize;
use tabled::Tabled;

use lanwatch_core::{CountBucket, MacAddress};

use crate::cli::{CountArgs, GlobalOpts, UptimeArgs};
use crate::error::CliError;
use crate::output;

use super::{open_store, parse_duration_flag};

// ── Uptime ──────────────────────────────────────────────────────────

#[derive(Serialize)]
struct UptimeReport {
    mac: String,
    window: String,
    ratio: f64,
}

pub fn uptime(global: &GlobalOpts, args: &UptimeArgs) -> Result<(), CliError> {
    let mac = MacAddress::parse(&args.address).map_err(|_| CliError::MalformedAddress {
        address: args.address.clone(),
    })?;
    let window = parse_duration_flag("window", &args.window)?;

    let store = open_store(global)?;
    if !store.current_state().device_states.contains_key(&mac) {
        return Err(CliError::DeviceNotFound {
            address: mac.to_string(),
        });
    }

    let end = Utc::now();
    let start = end - window;
    let Some(ratio) = store.uptime_ratio(&mac, start, end) else {
        output::print_output("no history records in window", global.quiet);
        return Ok(());
    };

    let report = UptimeReport {
        mac: mac.to_string(),
        window: args.window.clone(),
        ratio,
    };
    let rendered = output::render_single(
        &global.output,
        &report,
        |r| format!("{}: {:.1}% present over the last {}", r.mac, r.ratio * 100.0, r.window),
        |r| format!("{:.4}", r.ratio),
    );
    output::print_output(&rendered, global.quiet);
    Ok(())
}

// ── Count over time ─────────────────────────────────────────────────

#[derive(Tabled)]
struct BucketRow {
    #[tabled(rename = "Bucket start")]
    start: String,
    #[tabled(rename = "Devices")]
    count: usize,
}

impl From<&CountBucket> for BucketRow {
    fn from(b: &CountBucket) -> Self {
        Self {
            start: b.start.to_rfc3339(),
            count: b.count,
        }
    }
}

pub fn count(global: &GlobalOpts, args: &CountArgs) -> Result<(), CliError> {
    let window = parse_duration_flag("window", &args.window)?;
    let bucket = parse_duration_flag("bucket", &args.bucket)?;

    let store = open_store(global)?;
    let end = Utc::now();
    let start = end - window;
    let buckets = store.device_count_over_time(start, end, bucket);

    if buckets.is_empty() {
        output::print_output("no history records in window", global.quiet);
        return Ok(());
    }

    let rendered = output::render_list(
        &global.output,
        &buckets,
        |b| BucketRow::from(b),
        |b| format!("{} {}", b.start.to_rfc3339(), b.count),
    );
    output::print_output(&rendered, global.quiet);
    Ok(())
}
