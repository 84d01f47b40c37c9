//! Run configuration and the optional `autotune.toml` application config.

use std::{fmt, num::NonZeroU32, path::PathBuf, str::FromStr, time::Duration};

use chrono::NaiveDate;
use chrono_tz::Tz;
use nightscout_ingestor::models::window::{FetchWindow, WindowError};
use serde::{Deserialize, Serialize};

use crate::recommendation::TuningMode;

pub const DEFAULT_DIA_HOURS: f64 = 4.0;
pub const DEFAULT_RESULTS_DIR: &str = "autotune_results";

/// Insulin activity curve. Recorded on the run and the pump profile; the
/// deviation model does not distinguish curves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InsulinCurve {
    #[default]
    RapidActing,
    UltraRapid,
}

impl InsulinCurve {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsulinCurve::RapidActing => "rapid-acting",
            InsulinCurve::UltraRapid => "ultra-rapid",
        }
    }
}

impl fmt::Display for InsulinCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InsulinCurve {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rapid-acting" | "rapid" => Ok(InsulinCurve::RapidActing),
            "ultra-rapid" => Ok(InsulinCurve::UltraRapid),
            other => Err(format!("unknown insulin curve {other:?} (expected rapid-acting or ultra-rapid)")),
        }
    }
}

/// Parameters of one autotune run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Forwarded and echoed; unannounced meals are not separated from basal periods.
    #[serde(default)]
    pub categorize_uam_as_basal: bool,
    #[serde(default)]
    pub aggressive: bool,
    #[serde(default)]
    pub insulin_curve: InsulinCurve,
    #[serde(default = "utc")]
    pub timezone: Tz,
    /// Fallback duration of insulin action (hours) for profiles without one.
    #[serde(default = "default_dia")]
    pub dia: f64,
}

fn utc() -> Tz {
    Tz::UTC
}

fn default_dia() -> f64 {
    DEFAULT_DIA_HOURS
}

impl RunConfig {
    /// A standard-mode config for `start..=end` in UTC.
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date,
            categorize_uam_as_basal: false,
            aggressive: false,
            insulin_curve: InsulinCurve::default(),
            timezone: Tz::UTC,
            dia: DEFAULT_DIA_HOURS,
        }
    }

    pub fn window(&self) -> Result<FetchWindow, WindowError> {
        FetchWindow::new(self.start_date, self.end_date, self.timezone)
    }

    pub fn mode(&self) -> TuningMode {
        TuningMode::from_aggressive(self.aggressive)
    }
}

/// Contents of `autotune.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub nightscout: NightscoutConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NightscoutConfig {
    pub url: Option<String>,
    pub timeout_secs: Option<u64>,
    /// Cap on glucose entries per fetch; the provider default applies when unset.
    pub entry_count: Option<NonZeroU32>,
}

impl NightscoutConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            results_dir: default_results_dir(),
        }
    }
}

fn default_results_dir() -> PathBuf {
    PathBuf::from(DEFAULT_RESULTS_DIR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn run_config_defaults() {
        let config: RunConfig = serde_json::from_value(json!({
            "start_date": "2025-11-04",
            "end_date": "2025-11-05"
        }))
        .unwrap();

        assert_eq!(config, RunConfig::new(
            NaiveDate::from_ymd_opt(2025, 11, 4).unwrap(),
            NaiveDate::from_ymd_opt(2025, 11, 5).unwrap(),
        ));
        assert_eq!(config.mode(), TuningMode::Standard);
        assert_eq!(config.window().unwrap().days(), 2);
    }

    #[test]
    fn run_config_serializes_readable_values() {
        let mut config = RunConfig::new(
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        );
        config.insulin_curve = InsulinCurve::UltraRapid;
        config.timezone = chrono_tz::Europe::Amsterdam;
        config.aggressive = true;

        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["insulin_curve"], json!("ultra-rapid"));
        assert_eq!(value["timezone"], json!("Europe/Amsterdam"));
        assert_eq!(value["start_date"], json!("2025-01-01"));
        assert_eq!(config.mode(), TuningMode::Aggressive);
    }

    #[test]
    fn reversed_dates_fail_window() {
        let config = RunConfig::new(
            NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        );
        assert!(matches!(config.window(), Err(WindowError::EndBeforeStart { .. })));
    }

    #[test]
    fn curve_parsing() {
        assert_eq!("ultra-rapid".parse::<InsulinCurve>(), Ok(InsulinCurve::UltraRapid));
        assert_eq!("Rapid-Acting".parse::<InsulinCurve>(), Ok(InsulinCurve::RapidActing));
        assert!("fiasp".parse::<InsulinCurve>().is_err());
    }

    #[test]
    fn app_config_from_toml() {
        let config: AppConfig = toml::from_str(
            r#"
            [nightscout]
            url = "https://ns.example.com"
            timeout_secs = 30
            "#,
        )
        .unwrap();
        assert_eq!(config.nightscout.url.as_deref(), Some("https://ns.example.com"));
        assert_eq!(config.nightscout.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.output.results_dir, PathBuf::from(DEFAULT_RESULTS_DIR));
        assert_eq!(config.nightscout.entry_count, None);

        let config: AppConfig = toml::from_str("[nightscout]\nentry_count = 288").unwrap();
        assert_eq!(config.nightscout.entry_count, NonZeroU32::new(288));
        assert!(toml::from_str::<AppConfig>("[nightscout]\nentry_count = 0").is_err());

        assert!(toml::from_str::<AppConfig>("[nightscout]\nuri = \"x\"").is_err());
    }
}
