//! The structured result of a run.

use nightscout_ingestor::models::profile::TherapyProfile;
use serde::{Deserialize, Serialize};

use crate::{config::RunConfig, recommendation::Recommendation};

/// Result of [`crate::engine::AutotuneEngine::run`], tagged by `status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    Success(RunReport),
    Error(RunFailure),
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Success(_))
    }

    pub fn config(&self) -> &RunConfig {
        match self {
            RunOutcome::Success(report) => &report.config,
            RunOutcome::Error(failure) => &failure.config,
        }
    }

    /// The successful report, if any.
    pub fn report(&self) -> Option<&RunReport> {
        match self {
            RunOutcome::Success(report) => Some(report),
            RunOutcome::Error(_) => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            RunOutcome::Success(_) => None,
            RunOutcome::Error(failure) => Some(&failure.error),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub config: RunConfig,
    pub data_summary: DataSummary,
    pub recommendations: Vec<Recommendation>,
    /// The therapy profile the recommendations were computed against.
    pub profile: TherapyProfile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunFailure {
    pub error: String,
    pub config: RunConfig,
}

/// Volume of data a run worked with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DataSummary {
    pub bg_readings: usize,
    pub treatments: usize,
    pub deviations: usize,
}
