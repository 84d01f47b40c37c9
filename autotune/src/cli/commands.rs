use std::path::PathBuf;

use chrono::NaiveDate;
use chrono_tz::Tz;
use clap::{Args, Parser, Subcommand};
use nightscout_ingestor::tz::parse_tz;

use crate::config::{DEFAULT_DIA_HOURS, InsulinCurve, RunConfig};

#[derive(Parser, Debug)]
#[command(author, version, about = "Autotune recommendations from Nightscout data")]
pub struct Cli {
    /// Path to the config file (autotune.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Nightscout site URL; overrides the config file
    #[arg(long, global = true, env = "NIGHTSCOUT_URL")]
    pub url: Option<String>,

    /// API token; falls back to NIGHTSCOUT_TOKEN
    #[arg(long, global = true)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze a date range and print recommendations
    Run(RunArgs),

    /// Print the active therapy profile as JSON
    Profile,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// First day of the analysis window (YYYY-MM-DD)
    #[arg(long)]
    pub start: NaiveDate,

    /// Last day of the analysis window, inclusive (YYYY-MM-DD)
    #[arg(long)]
    pub end: NaiveDate,

    /// Lower evidence and threshold requirements for basal changes
    #[arg(long)]
    pub aggressive: bool,

    /// Categorize unannounced meals as basal
    #[arg(long)]
    pub uam: bool,

    /// Insulin curve: rapid-acting or ultra-rapid
    #[arg(long, default_value = "rapid-acting")]
    pub curve: InsulinCurve,

    /// IANA time zone the dates are interpreted in
    #[arg(long, default_value = "UTC", value_parser = parse_tz)]
    pub timezone: Tz,

    /// Duration of insulin action (hours) when the profile has none
    #[arg(long, default_value_t = DEFAULT_DIA_HOURS)]
    pub dia: f64,

    /// Directory for result files; overrides the config file
    #[arg(long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Apply the recommendations and upload the adjusted profile
    #[arg(long)]
    pub upload: bool,
}

impl RunArgs {
    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            start_date: self.start,
            end_date: self.end,
            categorize_uam_as_basal: self.uam,
            aggressive: self.aggressive,
            insulin_curve: self.curve,
            timezone: self.timezone,
            dia: self.dia,
        }
    }
}
