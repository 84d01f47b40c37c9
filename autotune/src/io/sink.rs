use std::path::{Path, PathBuf};

use async_trait::async_trait;
use snafu::{Backtrace, ResultExt, Snafu};

use crate::{outcome::RunOutcome, recommendation::Recommendation};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SinkError {
    /// The outcome could not be encoded as JSON.
    #[snafu(display("Failed to encode result: {source}"))]
    Json {
        source: serde_json::Error,
        backtrace: Backtrace,
    },

    /// The recommendation table could not be encoded as CSV.
    #[snafu(display("Failed to encode recommendations: {source}"))]
    Csv {
        source: csv::Error,
        backtrace: Backtrace,
    },

    /// A filesystem operation failed.
    #[snafu(display("I/O error on {}: {source}", path.display()))]
    Io {
        path: PathBuf,
        source: std::io::Error,
        backtrace: Backtrace,
    },
}

/// Destination for run outcomes.
#[async_trait]
pub trait ResultSink {
    /// What a successful write returns (e.g. the files created).
    type Output;

    async fn write(&self, outcome: &RunOutcome) -> Result<Self::Output, SinkError>;
}

/// Writes `autotune_result_<start>.json` and, for successful runs with
/// recommendations, `recommendations_<start>.csv` into a directory.
///
/// Files from an earlier run with the same start date are overwritten.
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl ResultSink for FileSink {
    type Output = Vec<PathBuf>;

    async fn write(&self, outcome: &RunOutcome) -> Result<Vec<PathBuf>, SinkError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .context(IoSnafu { path: &self.dir })?;

        let start = outcome.config().start_date.format("%Y-%m-%d").to_string();
        let mut written = Vec::with_capacity(2);

        let json_path = self.dir.join(format!("autotune_result_{start}.json"));
        let json = serde_json::to_vec_pretty(outcome).context(JsonSnafu)?;
        tokio::fs::write(&json_path, json)
            .await
            .context(IoSnafu { path: &json_path })?;
        written.push(json_path);

        if let Some(report) = outcome.report().filter(|r| !r.recommendations.is_empty()) {
            let csv_path = self.dir.join(format!("recommendations_{start}.csv"));
            let table = recommendations_csv(&report.recommendations)?;
            tokio::fs::write(&csv_path, table)
                .await
                .context(IoSnafu { path: &csv_path })?;
            written.push(csv_path);
        }

        tracing::info!(dir = %self.dir.display(), files = written.len(), "results saved");
        Ok(written)
    }
}

/// Renders the recommendation table with a `Parameter,Pump,Autotune,DaysMissing` header.
pub fn recommendations_csv(recommendations: &[Recommendation]) -> Result<Vec<u8>, SinkError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for rec in recommendations {
        writer.serialize(rec).context(CsvSnafu)?;
    }
    writer
        .into_inner()
        .map_err(|e| e.into_error())
        .context(IoSnafu { path: PathBuf::from("<memory>") })
}
