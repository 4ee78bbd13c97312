//! CLI error types with miette diagnostics.
//!
//! Maps core and config errors into user-facing errors with actionable
//! help text and documented exit codes.

use miette::Diagnostic;
use thiserror::Error;

use lanwatch_core::CoreError;

/// Exit codes.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const STALE_SNAPSHOT: i32 = 6;
    pub const STORE_IO: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Input ────────────────────────────────────────────────────────
    #[error("Could not read {path}")]
    #[diagnostic(code(lanwatch::read_failed))]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid snapshot JSON in {path}")]
    #[diagnostic(
        code(lanwatch::invalid_json),
        help(
            "The file must be a snapshot submission:\n\
             {{\"timestamp\": \"2026-03-01T12:00:00Z\", \"devices\": [{{\"address\": \"aa:bb:cc:dd:ee:ff\"}}]}}\n\
             Run: lanwatch validate <file> for a field-by-field report."
        )
    )]
    InvalidJson {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Malformed hardware address: {address:?}")]
    #[diagnostic(
        code(lanwatch::malformed_address),
        help("Addresses look like aa:bb:cc:dd:ee:ff (colons, dashes, or bare hex).")
    )]
    MalformedAddress { address: String },

    #[error("Invalid duration {value:?} for --{flag}")]
    #[diagnostic(
        code(lanwatch::invalid_duration),
        help("Durations are humantime strings: \"90s\", \"5m\", \"24h\", \"7d\".")
    )]
    InvalidDuration { flag: &'static str, value: String },

    #[error("Validation failed: {count} problem(s) found")]
    #[diagnostic(code(lanwatch::validation_failed))]
    ValidationFailed { count: usize },

    #[error("No retention horizon: pass --older-than or set engine.history_retention")]
    #[diagnostic(code(lanwatch::no_horizon))]
    NoRetentionHorizon,

    // ── Lookups ──────────────────────────────────────────────────────
    #[error("Device not found: {address}")]
    #[diagnostic(
        code(lanwatch::not_found),
        help("Run: lanwatch status to see known devices")
    )]
    DeviceNotFound { address: String },

    // ── Core / config passthrough ────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(code(lanwatch::core))]
    Core(#[from] CoreError),

    #[error(transparent)]
    #[diagnostic(code(lanwatch::config))]
    Config(#[from] lanwatch_config::ConfigError),
}

impl CliError {
    /// Map this error to a process exit code.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ReadFailed { .. } | Self::ValidationFailed { .. } => exit_code::GENERAL,
            Self::InvalidJson { .. }
            | Self::MalformedAddress { .. }
            | Self::InvalidDuration { .. }
            | Self::NoRetentionHorizon => exit_code::USAGE,
            Self::DeviceNotFound { .. } => exit_code::NOT_FOUND,
            Self::Core(core) => match core {
                CoreError::StaleSnapshot { .. } => exit_code::STALE_SNAPSHOT,
                CoreError::StoreIo { .. } | CoreError::StoreFormat { .. } => exit_code::STORE_IO,
                CoreError::MalformedAddress { .. } | CoreError::InvalidSubmission { .. } => {
                    exit_code::USAGE
                }
                CoreError::Config { .. } => exit_code::USAGE,
            },
            Self::Config(_) => exit_code::USAGE,
        }
    }
}
