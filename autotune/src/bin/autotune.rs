use std::process::ExitCode;

use anyhow::{Context, Result};
use autotune::{
    cli::{
        commands::{Cli, Commands, RunArgs},
        table,
    },
    config::AppConfig,
    engine::AutotuneEngine,
    io::sink::{FileSink, ResultSink},
    outcome::RunOutcome,
};
use clap::Parser;
use nightscout_ingestor::providers::nightscout_rest::provider::TOKEN_ENV;
use secrecy::SecretString;
use shared_utils::{config::load_toml, env::get_optional_env_var};
use tracing_subscriber::{EnvFilter, fmt};

fn init_logging() {
    let mut filter = EnvFilter::from_default_env();
    for directive in ["autotune=info", "nightscout_ingestor=info"] {
        if let Ok(d) = directive.parse() {
            filter = filter.add_directive(d);
        }
    }
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_logging();
    let cli = Cli::parse();

    let app: AppConfig = match &cli.config {
        Some(path) => load_toml(path)?,
        None => AppConfig::default(),
    };

    let url = cli
        .url
        .clone()
        .or_else(|| app.nightscout.url.clone())
        .context("no Nightscout URL: pass --url, set NIGHTSCOUT_URL or add [nightscout].url to the config file")?;
    let token = cli
        .token
        .clone()
        .or_else(|| get_optional_env_var(TOKEN_ENV))
        .map(SecretString::from);

    let engine = AutotuneEngine::nightscout(&url, token, &app.nightscout)?;

    match cli.command {
        Commands::Profile => {
            let profile = engine.source().fetch_profile().await?;
            println!("{}", serde_json::to_string_pretty(&profile)?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Run(args) => run(&engine, &args, &app).await,
    }
}

async fn run(engine: &AutotuneEngine, args: &RunArgs, app: &AppConfig) -> Result<ExitCode> {
    let config = args.run_config();
    let outcome = engine.run(&config).await;

    let dir = args.output.clone().unwrap_or_else(|| app.output.results_dir.clone());
    match FileSink::new(dir).write(&outcome).await {
        Ok(files) => {
            for file in files {
                eprintln!("{}", file.display());
            }
        }
        Err(e) => tracing::warn!(error = %e, "could not save results"),
    }

    let report = match &outcome {
        RunOutcome::Success(report) => report,
        RunOutcome::Error(failure) => {
            eprintln!("ERROR: {}", failure.error);
            return Ok(ExitCode::FAILURE);
        }
    };

    print!("{}", table::render(&report.recommendations));

    if args.upload {
        engine
            .upload_adjusted(report)
            .await
            .context("uploading adjusted profile")?;
        eprintln!("uploaded profile {:?}", autotune::engine::adjusted_profile_name(&report.config));
    }

    Ok(ExitCode::SUCCESS)
}
