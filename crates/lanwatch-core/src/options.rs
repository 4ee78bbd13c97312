// ── Engine tuning options ──
//
// These knobs control debounce, flap collapsing, outage suppression,
// and history retention. They carry no I/O configuration — the config
// crate resolves disk/env settings into this type and hands it in.

use chrono::Duration;

use crate::error::CoreError;

/// Runtime policy options for the change-detection engine.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Consecutive missed scans before a device is declared departed.
    /// Must be >= 1. With 1, a single miss departs immediately; with 2,
    /// one missed probe is tolerated (radio noise).
    pub absence_debounce_threshold: u32,

    /// Window within which a departed-then-returned device is collapsed
    /// into a single FLAPPED event instead of a second ARRIVED.
    /// `None` disables flap collapsing.
    pub flap_window: Option<Duration>,

    /// When an empty snapshot arrives while many devices are known,
    /// suppress the mass departure and surface a scan-failure advisory
    /// instead. Off by default: an empty scan is trusted as a real outage.
    pub suspected_outage_suppression: bool,

    /// Minimum known-device population for outage suppression to engage.
    /// Below this, an empty snapshot is always taken at face value.
    pub outage_min_population: usize,

    /// History records older than this horizon are removed by
    /// [`prune_history`](crate::store::SnapshotStore::prune_history).
    /// `None` retains history indefinitely.
    pub history_retention: Option<Duration>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            absence_debounce_threshold: 1,
            flap_window: None,
            suspected_outage_suppression: false,
            outage_min_population: 5,
            history_retention: None,
        }
    }
}

impl EngineOptions {
    /// Validate option bounds.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.absence_debounce_threshold < 1 {
            return Err(CoreError::Config {
                message: "absence_debounce_threshold must be >= 1".into(),
            });
        }
        if let Some(window) = self.flap_window {
            if window <= Duration::zero() {
                return Err(CoreError::Config {
                    message: "flap_window must be a positive duration".into(),
                });
            }
        }
        Ok(())
    }
}
