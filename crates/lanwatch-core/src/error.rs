// ── Core error types ──
//
// User-facing errors from lanwatch-core. Per-device malformations are
// recoverable (skip the device, keep the snapshot); store-level failures
// abort the whole commit. A failed commit never leaves partial state
// visible to readers.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Normalization errors (per-device, recoverable) ───────────────
    #[error("Malformed hardware address: {raw:?}")]
    MalformedAddress { raw: String },

    // ── Ordering errors ──────────────────────────────────────────────
    #[error(
        "Stale snapshot: submitted timestamp {submitted} is not after last committed {last_committed}"
    )]
    StaleSnapshot {
        submitted: DateTime<Utc>,
        last_committed: DateTime<Utc>,
    },

    // ── Persistence errors (fatal for the current commit) ────────────
    #[error("Store I/O failure at {path}: {source}")]
    StoreIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Store format error at {path}: {source}")]
    StoreFormat {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    // ── Input errors ─────────────────────────────────────────────────
    #[error("Invalid snapshot submission: {message}")]
    InvalidSubmission { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Attach a path to an `std::io::Error` for context.
    pub(crate) fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::StoreIo {
            path: path.into(),
            source,
        }
    }

    /// Attach a path to a serde failure for context.
    pub(crate) fn format(path: impl Into<String>, source: serde_json::Error) -> Self {
        Self::StoreFormat {
            path: path.into(),
            source,
        }
    }
}
