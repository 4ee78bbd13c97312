//! Configuration loading for lanwatch.
//!
//! Layered resolution via figment: built-in defaults, then the TOML
//! config file, then `LANWATCH_*` environment variables. A missing
//! config file is not an error — defaults apply. Durations are written
//! as humantime strings (`"90s"`, `"5m"`, `"7d"`).
//!
//! ```toml
//! # ~/.config/lanwatch/config.toml
//! data_dir = "/var/lib/lanwatch"
//!
//! [engine]
//! absence_debounce_threshold = 2
//! flap_window = "10m"
//! suspected_outage_suppression = true
//! outage_min_population = 5
//! history_retention = "30d"
//! ```

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use lanwatch_core::EngineOptions;

const ENV_PREFIX: &str = "LANWATCH_";
const STORE_FILE: &str = "store.json";

// ── Errors ──────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("Invalid duration for {field}: {value:?} ({reason})")]
    InvalidDuration {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("Invalid engine options: {0}")]
    InvalidOptions(#[from] lanwatch_core::CoreError),

    #[error("No home directory available to place config/data files")]
    NoProjectDirs,
}

// ── Config shape ────────────────────────────────────────────────────

/// Root of the TOML config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Where the store file lives. Defaults to the platform data dir.
    pub data_dir: Option<PathBuf>,

    #[serde(default)]
    pub engine: EngineSection,
}

/// `[engine]` table: mirrors [`EngineOptions`] with durations as
/// humantime strings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineSection {
    pub absence_debounce_threshold: Option<u32>,
    pub flap_window: Option<String>,
    pub suspected_outage_suppression: Option<bool>,
    pub outage_min_population: Option<usize>,
    pub history_retention: Option<String>,
}

impl Config {
    /// Load configuration with layered resolution.
    ///
    /// `path` overrides the default config file location; when `None`,
    /// the platform config dir is probed and a missing file means
    /// defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));

        let file = match path {
            Some(p) => Some(p.to_path_buf()),
            None => default_config_path(),
        };
        if let Some(file) = file {
            figment = figment.merge(Toml::file(file));
        }

        // CONFIG and OUTPUT are handled by the CLI layer, not here.
        let config: Config = figment
            .merge(
                Env::prefixed(ENV_PREFIX)
                    .split("__")
                    .ignore(&["config", "output"]),
            )
            .extract()
            .map_err(Box::new)?;
        Ok(config)
    }

    /// Resolve the `[engine]` table into runtime [`EngineOptions`],
    /// validating bounds.
    pub fn engine_options(&self) -> Result<EngineOptions, ConfigError> {
        let defaults = EngineOptions::default();
        let options = EngineOptions {
            absence_debounce_threshold: self
                .engine
                .absence_debounce_threshold
                .unwrap_or(defaults.absence_debounce_threshold),
            flap_window: parse_duration_field("flap_window", self.engine.flap_window.as_deref())?,
            suspected_outage_suppression: self
                .engine
                .suspected_outage_suppression
                .unwrap_or(defaults.suspected_outage_suppression),
            outage_min_population: self
                .engine
                .outage_min_population
                .unwrap_or(defaults.outage_min_population),
            history_retention: parse_duration_field(
                "history_retention",
                self.engine.history_retention.as_deref(),
            )?,
        };
        options.validate()?;
        Ok(options)
    }

    /// Directory holding the store file.
    pub fn data_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(project_dirs()?.data_dir().to_path_buf()),
        }
    }

    /// Full path of the store file.
    pub fn store_path(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.data_dir()?.join(STORE_FILE))
    }
}

/// Default config file path (`<platform config dir>/config.toml`),
/// when a home directory exists.
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "lanwatch").map(|dirs| dirs.config_dir().join("config.toml"))
}

fn project_dirs() -> Result<ProjectDirs, ConfigError> {
    ProjectDirs::from("", "", "lanwatch").ok_or(ConfigError::NoProjectDirs)
}

/// Parse an optional humantime duration into a chrono duration.
pub fn parse_duration_field(
    field: &'static str,
    value: Option<&str>,
) -> Result<Option<chrono::Duration>, ConfigError> {
    let Some(value) = value else {
        return Ok(None);
    };
    let std_duration =
        humantime::parse_duration(value).map_err(|e| ConfigError::InvalidDuration {
            field,
            value: value.to_owned(),
            reason: e.to_string(),
        })?;
    let duration =
        chrono::Duration::from_std(std_duration).map_err(|e| ConfigError::InvalidDuration {
            field,
            value: value.to_owned(),
            reason: e.to_string(),
        })?;
    Ok(Some(duration))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = Config::load(Some(Path::new("/nonexistent/lanwatch.toml"))).unwrap();
        let options = config.engine_options().unwrap();
        assert_eq!(options.absence_debounce_threshold, 1);
        assert!(options.flap_window.is_none());
        assert!(!options.suspected_outage_suppression);
    }

    #[test]
    fn file_values_override_defaults() {
        let file = write_config(
            r#"
            data_dir = "/var/lib/lanwatch"

            [engine]
            absence_debounce_threshold = 2
            flap_window = "10m"
            suspected_outage_suppression = true
            history_retention = "7d"
            "#,
        );
        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.data_dir.as_deref(), Some(Path::new("/var/lib/lanwatch")));

        let options = config.engine_options().unwrap();
        assert_eq!(options.absence_debounce_threshold, 2);
        assert_eq!(options.flap_window, Some(chrono::Duration::minutes(10)));
        assert!(options.suspected_outage_suppression);
        assert_eq!(options.history_retention, Some(chrono::Duration::days(7)));
    }

    #[test]
    fn bad_duration_is_reported_with_field() {
        let file = write_config(
            r#"
            [engine]
            flap_window = "not-a-duration"
            "#,
        );
        let config = Config::load(Some(file.path())).unwrap();
        let err = config.engine_options().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidDuration { field: "flap_window", .. }
        ));
    }

    #[test]
    fn zero_threshold_fails_validation() {
        let file = write_config(
            r#"
            [engine]
            absence_debounce_threshold = 0
            "#,
        );
        let config = Config::load(Some(file.path())).unwrap();
        assert!(config.engine_options().is_err());
    }

    #[test]
    fn store_path_uses_data_dir_override() {
        let config = Config {
            data_dir: Some(PathBuf::from("/tmp/lw")),
            engine: EngineSection::default(),
        };
        assert_eq!(config.store_path().unwrap(), PathBuf::from("/tmp/lw/store.json"));
    }
}
