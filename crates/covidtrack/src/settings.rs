use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Args;
use covidtrack_core::config::{load_config, DateRange, PipelineConfig};

/// Replaces the configured source list when set.
pub const SOURCE_ENV: &str = "COVIDTRACK_SOURCE";

#[derive(Args, Debug, Default, Clone)]
pub struct SelectionArgs {
    /// TOML pipeline configuration
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Source CSV; repeat to give fallbacks in order
    #[arg(long)]
    pub source: Vec<PathBuf>,
    /// Entity name or ISO code; repeat for several
    #[arg(long)]
    pub entity: Vec<String>,
    /// First date to keep (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<NaiveDate>,
    /// Last date to keep (YYYY-MM-DD)
    #[arg(long)]
    pub end: Option<NaiveDate>,
    /// Trailing window length in rows
    #[arg(long)]
    pub window: Option<usize>,
}

pub fn resolve_config(args: &SelectionArgs) -> Result<PipelineConfig> {
    let config = match &args.config {
        Some(path) => load_config(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    apply_overrides(config, args, std::env::var(SOURCE_ENV).ok())
}

/// Layers the environment source and command-line flags over a loaded config.
pub fn apply_overrides(
    mut config: PipelineConfig,
    args: &SelectionArgs,
    env_source: Option<String>,
) -> Result<PipelineConfig> {
    if let Some(source) = env_source.as_deref().map(str::trim) {
        if !source.is_empty() {
            config.sources = vec![PathBuf::from(source)];
        }
    }
    if !args.source.is_empty() {
        config.sources = args.source.clone();
    }
    if !args.entity.is_empty() {
        config.entities = args.entity.iter().cloned().collect();
    }
    if args.start.is_some() || args.end.is_some() {
        let start = args
            .start
            .or(config.date_range.map(|range| range.start))
            .unwrap_or(NaiveDate::MIN);
        let end = args
            .end
            .or(config.date_range.map(|range| range.end))
            .unwrap_or(NaiveDate::MAX);
        config.date_range = Some(DateRange::new(start, end)?);
    }
    if let Some(window) = args.window {
        config.window = window;
    }
    config.validate()?;
    Ok(config)
}
