//! Structural validation of a snapshot submission file.
//!
//! Field-by-field report without touching the store: required envelope
//! fields, per-device address checks, and a summary printout. Intended
//! for CI hooks that gate snapshot uploads.

use chrono::{DateTime, Utc};
use serde_json::Value;

use lanwatch_core::MacAddress;

use crate::cli::{GlobalOpts, ValidateArgs};
use crate::error::CliError;
use crate::output;

pub fn run(global: &GlobalOpts, args: &ValidateArgs) -> Result<(), CliError> {
    let raw = std::fs::read_to_string(&args.file).map_err(|source| CliError::ReadFailed {
        path: args.file.display().to_string(),
        source,
    })?;
    let value: Value = serde_json::from_str(&raw).map_err(|source| CliError::InvalidJson {
        path: args.file.display().to_string(),
        source,
    })?;

    let errors = validate_structure(&value);
    if !errors.is_empty() {
        eprintln!("VALIDATION FAILED:");
        for error in &errors {
            eprintln!("  - {error}");
        }
        return Err(CliError::ValidationFailed {
            count: errors.len(),
        });
    }

    output::print_output(&summary(&value), global.quiet);
    Ok(())
}

/// Validate the submission structure, returning all problems found.
fn validate_structure(value: &Value) -> Vec<String> {
    let mut errors = Vec::new();

    let Some(object) = value.as_object() else {
        return vec!["submission must be a JSON object".into()];
    };

    match object.get("timestamp").and_then(Value::as_str) {
        None => errors.push("missing required field: 'timestamp'".into()),
        Some(ts) => {
            if ts.parse::<DateTime<Utc>>().is_err() {
                errors.push(format!("'timestamp' is not ISO-8601: {ts:?}"));
            }
        }
    }

    match object.get("devices") {
        None => errors.push("missing required field: 'devices'".into()),
        Some(Value::Array(devices)) => {
            for (i, device) in devices.iter().enumerate() {
                let Some(entry) = device.as_object() else {
                    errors.push(format!("device {i} must be an object"));
                    continue;
                };
                match entry.get("address").and_then(Value::as_str) {
                    None => errors.push(format!("device {i} missing field: 'address'")),
                    Some(address) => {
                        if MacAddress::parse(address).is_err() {
                            errors.push(format!("device {i} has malformed address: {address:?}"));
                        }
                    }
                }
                if let Some(ip) = entry.get("ip") {
                    let ok = ip
                        .as_str()
                        .is_some_and(|s| s.parse::<std::net::IpAddr>().is_ok());
                    if !ok {
                        errors.push(format!("device {i} has invalid 'ip'"));
                    }
                }
            }
        }
        Some(_) => errors.push("'devices' must be a list".into()),
    }

    errors
}

/// Human summary of a valid submission, one device per line.
fn summary(value: &Value) -> String {
    let timestamp = value
        .get("timestamp")
        .and_then(Value::as_str)
        .unwrap_or("?");
    let host = value.get("host").and_then(Value::as_str).unwrap_or("-");
    let interface = value
        .get("interface")
        .and_then(Value::as_str)
        .unwrap_or("-");
    let devices = value
        .get("devices")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut out = String::new();
    out.push_str(&"=".repeat(60));
    out.push_str("\nSNAPSHOT VALIDATED SUCCESSFULLY\n");
    out.push_str(&"=".repeat(60));
    out.push_str(&format!(
        "\nTimestamp:    {timestamp}\nHost:         {host}\nInterface:    {interface}\nDevice count: {}\n",
        devices.len()
    ));
    out.push_str(&"-".repeat(60));
    out.push_str("\nDevices:\n");
    for device in &devices {
        let address = device.get("address").and_then(Value::as_str).unwrap_or("?");
        let ip = device.get("ip").and_then(Value::as_str).unwrap_or("-");
        let vendor = device.get("vendor").and_then(Value::as_str).unwrap_or("-");
        out.push_str(&format!("  {ip:15} {address}  {vendor}\n"));
    }
    out.push_str(&"=".repeat(60));
    out
}
