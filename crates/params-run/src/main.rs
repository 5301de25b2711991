//! Horizon Run - Applies a revision to a parameter family
//!
//! Loads a family document and its defaults, optionally applies a revision
//! read from a `.json` file or inline JSON, and prints the metadata snapshot
//! for one year as JSON on stdout.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use horizon_params::{JsonFamily, ParameterFamily, Parameters};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "horizon-run")]
#[command(about = "Apply a revision to a parameter family and print a year snapshot")]
struct Cli {
    /// Path to the family document (horizon, rates, registries)
    family: PathBuf,

    /// Path to the defaults document
    defaults: PathBuf,

    /// Revision as a .json file path or inline JSON text
    #[arg(long)]
    revision: Option<String>,

    /// Top-level key selected from compound revision documents
    /// (defaults to the family name)
    #[arg(long)]
    topkey: Option<String>,

    /// Year to snapshot (defaults to the start year)
    #[arg(long)]
    year: Option<i32>,

    /// Do not log parameter warnings
    #[arg(long)]
    quiet: bool,

    /// Keep going when revised values are out of range
    #[arg(long)]
    no_raise: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "horizon_run=info,horizon_params=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    info!("Loading family from: {}", cli.family.display());
    let family = JsonFamily::from_paths(&cli.family, &cli.defaults)
        .with_context(|| format!("failed to load family {}", cli.family.display()))?;
    let mut params = Parameters::from_family(&family).with_context(|| {
        format!("failed to initialize parameters from {}", cli.defaults.display())
    })?;

    if let Some(source) = cli.revision.as_deref() {
        let topkey = cli.topkey.as_deref().unwrap_or(family.name());
        let revision = horizon_params::read_json_revision(Some(source), topkey)
            .context("failed to read revision")?;
        info!(years = ?revision.years(), "applying revision");
        params
            .apply_revision(&revision, !cli.quiet, !cli.no_raise)
            .context("revision failed")?;
        if cli.no_raise && !params.errors().is_empty() {
            warn!(
                errors = params.errors().len(),
                "revision left out-of-range values:\n{}",
                params.parameter_errors()
            );
        }
    }

    let year = cli.year.unwrap_or(params.start_year());
    params
        .set_year(year)
        .with_context(|| format!("cannot snapshot year {year}"))?;
    let snapshot = params.metadata()?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}
