use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use covidtrack_core::outputs::{write_json, write_outputs, write_series_csv};
use covidtrack_core::{
    aggregate_by_date, clean_with, latest_snapshot, load_any, run_pipeline, CleanOptions, Metric,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod display;
mod settings;

use settings::{resolve_config, SelectionArgs};

#[derive(Parser, Debug)]
#[command(author, version, about = "COVID-19 metric pipeline for chart-ready series", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full pipeline and write every output file
    Run(RunArgs),
    /// List the entities present in the cleaned source
    Entities(EntitiesArgs),
    /// Print one metric's per-entity series
    Series(SeriesArgs),
    /// Print every entity's figures on the latest date
    Snapshot(SnapshotArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    selection: SelectionArgs,
    /// Directory receiving metrics, series, snapshot and summary files
    #[arg(long, default_value = "output")]
    output_dir: PathBuf,
}

#[derive(Args, Debug)]
struct EntitiesArgs {
    #[command(flatten)]
    selection: SelectionArgs,
    /// Include OWID_ aggregate regions
    #[arg(long)]
    include_aggregates: bool,
}

#[derive(Args, Debug)]
struct SeriesArgs {
    #[command(flatten)]
    selection: SelectionArgs,
    /// Metric name, e.g. new_cases or vaccination_coverage
    #[arg(long)]
    metric: String,
    /// Also write the series as CSV to this path
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct SnapshotArgs {
    #[command(flatten)]
    selection: SelectionArgs,
    /// Include OWID_ aggregate regions
    #[arg(long)]
    include_aggregates: bool,
    /// Show at most this many rows
    #[arg(long)]
    limit: Option<usize>,
    /// Also write the snapshot as JSON to this path
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => {
            let config = resolve_config(&args.selection)?;
            let output = run_pipeline(&config).context("pipeline run failed")?;
            for entity in &output.summary.insufficient_history {
                warn!(entity = %entity, "not enough history for daily deltas");
            }
            let artifacts = write_outputs(&output, &config.chart_metrics, &args.output_dir)
                .with_context(|| format!("failed to write outputs to {}", args.output_dir.display()))?;
            info!(
                metrics_csv = %artifacts.metrics_csv.display(),
                series_files = artifacts.series.len(),
                "Run complete"
            );
            display::display_summary(&output.summary);
            Ok(())
        }
        Command::Entities(args) => {
            let config = resolve_config(&args.selection)?;
            let loaded = load_any(&config.sources)?;
            let cleaned = clean_with(
                &loaded,
                &CleanOptions {
                    drop_rows_without_counts: config.drop_rows_without_counts,
                },
            );
            display::display_entities(&cleaned, args.include_aggregates);
            Ok(())
        }
        Command::Series(args) => {
            let metric: Metric = args.metric.parse()?;
            let config = resolve_config(&args.selection)?;
            let output = run_pipeline(&config).context("pipeline run failed")?;
            let series = aggregate_by_date(&output.derived, metric, Vec::<String>::new())?;
            if let Some(path) = &args.out {
                write_series_csv(&series, path)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                info!(path = %path.display(), metric = %metric, "Wrote series");
            }
            display::display_series(&series);
            Ok(())
        }
        Command::Snapshot(args) => {
            let config = resolve_config(&args.selection)?;
            let loaded = load_any(&config.sources)?;
            let Some(snapshot) = latest_snapshot(&loaded, !args.include_aggregates) else {
                warn!("source has no dated rows; nothing to show");
                return Ok(());
            };
            if let Some(path) = &args.out {
                write_json(&snapshot, path)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                info!(path = %path.display(), date = %snapshot.date, "Wrote snapshot");
            }
            display::display_snapshot(&snapshot, args.limit);
            Ok(())
        }
    }
}
