//! Orchestrates one autotune run: fetch, validate, compute deviations,
//! recommend. An engine is built per request; it holds no state between runs
//! beyond its data source.

use chrono::Utc;
use indexmap::IndexMap;
use nightscout_ingestor::{
    models::profile::ProfileDocument,
    providers::{DataSource, ProviderInitError, nightscout_rest::NightscoutProvider},
    tz::to_rfc3339_millis,
};
use secrecy::SecretString;
use serde_json::Map;

use crate::{
    applier::apply_recommendations,
    config::{NightscoutConfig, RunConfig},
    deviation::calculate_deviations,
    errors::AutotuneError,
    outcome::{DataSummary, RunFailure, RunOutcome, RunReport},
    pump_profile::PumpProfile,
    recommendation::recommend,
};

/// Fewer glucose readings than this fails the run.
pub const MIN_READINGS: usize = 10;

pub struct AutotuneEngine {
    source: Box<dyn DataSource + Send + Sync>,
}

impl AutotuneEngine {
    pub fn new(source: impl DataSource + Send + Sync + 'static) -> Self {
        Self {
            source: Box::new(source),
        }
    }

    /// An engine reading from the Nightscout site at `url`, with timeout and
    /// entry cap taken from `settings`.
    pub fn nightscout(
        url: &str,
        token: Option<SecretString>,
        settings: &NightscoutConfig,
    ) -> Result<Self, ProviderInitError> {
        let mut provider = NightscoutProvider::new(url, token, settings.timeout())?;
        if let Some(count) = settings.entry_count {
            provider = provider.with_entry_count(count);
        }
        Ok(Self::new(provider))
    }

    pub fn source(&self) -> &(dyn DataSource + Send + Sync) {
        self.source.as_ref()
    }

    /// Runs autotune for `config`. Every failure is reported in the outcome.
    pub async fn run(&self, config: &RunConfig) -> RunOutcome {
        match self.analyze(config).await {
            Ok(report) => {
                tracing::info!(
                    recommendations = report.recommendations.len(),
                    "autotune run completed"
                );
                RunOutcome::Success(report)
            }
            Err(e) => {
                tracing::error!(error = %e, "autotune run failed");
                RunOutcome::Error(RunFailure {
                    error: e.to_string(),
                    config: config.clone(),
                })
            }
        }
    }

    /// The fallible body of [`Self::run`].
    pub async fn analyze(&self, config: &RunConfig) -> Result<RunReport, AutotuneError> {
        let window = config.window()?;
        tracing::info!(
            start = %config.start_date,
            end = %config.end_date,
            timezone = %config.timezone,
            mode = config.mode().as_str(),
            curve = %config.insulin_curve,
            "starting autotune run"
        );

        tracing::info!("fetching BG readings");
        let readings = self.source.fetch_entries(&window).await?;
        tracing::info!("fetching treatments");
        let treatments = self.source.fetch_treatments(&window).await?;
        tracing::info!("fetching profile");
        let profile = self.source.fetch_profile().await?;

        if readings.len() < MIN_READINGS {
            return Err(AutotuneError::InsufficientReadings {
                found: readings.len(),
                required: MIN_READINGS,
            });
        }
        tracing::info!(
            bg_readings = readings.len(),
            treatments = treatments.len(),
            "data summary"
        );

        let deviations = calculate_deviations(&readings, &treatments, &profile)?;
        let recommendations = recommend(&deviations, &profile, config.mode());

        Ok(RunReport {
            config: config.clone(),
            data_summary: DataSummary {
                bg_readings: readings.len(),
                treatments: treatments.len(),
                deviations: deviations.len(),
            },
            recommendations,
            profile,
        })
    }

    /// Applies a report's recommendations to its source profile and uploads
    /// the result as a new store entry named `Autotune <end date>`.
    ///
    /// Single best-effort call; a failed upload is not retried.
    pub async fn upload_adjusted(&self, report: &RunReport) -> Result<PumpProfile, AutotuneError> {
        let config = &report.config;
        let current = PumpProfile::from_therapy(&report.profile, config.insulin_curve, config.dia);
        let adjusted = apply_recommendations(&report.recommendations, &current);

        let document = upload_document(report, &adjusted)?;
        tracing::info!(profile = %document.default_profile, "uploading adjusted profile");
        self.source.upload_profile(&document).await?;
        Ok(adjusted)
    }
}

/// Name of the store entry an adjusted profile is uploaded under.
pub fn adjusted_profile_name(config: &RunConfig) -> String {
    format!("Autotune {}", config.end_date.format("%Y-%m-%d"))
}

fn upload_document(
    report: &RunReport,
    adjusted: &PumpProfile,
) -> Result<ProfileDocument<serde_json::Value>, AutotuneError> {
    let name = adjusted_profile_name(&report.config);
    let entry = serde_json::to_value(adjusted.to_therapy(&report.profile))?;
    let now = Utc::now();

    let mut store = IndexMap::new();
    store.insert(name.clone(), entry);

    Ok(ProfileDocument {
        default_profile: name,
        store,
        start_date: Some(to_rfc3339_millis(now)),
        mills: Some(now.timestamp_millis()),
        units: report.profile.units.clone(),
        created_at: Some(to_rfc3339_millis(now)),
        extra: Map::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroU32;

    #[test]
    fn nightscout_engine_from_settings() {
        let settings = NightscoutConfig {
            url: None,
            timeout_secs: Some(10),
            entry_count: NonZeroU32::new(288),
        };
        assert!(AutotuneEngine::nightscout("https://ns.example.com", None, &settings).is_ok());
        assert!(matches!(
            AutotuneEngine::nightscout("not a url", None, &settings),
            Err(ProviderInitError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn adjusted_profile_is_named_after_the_end_date() {
        let config = RunConfig::new(
            chrono::NaiveDate::from_ymd_opt(2025, 11, 1).unwrap(),
            chrono::NaiveDate::from_ymd_opt(2025, 11, 4).unwrap(),
        );
        assert_eq!(adjusted_profile_name(&config), "Autotune 2025-11-04");
    }
}
