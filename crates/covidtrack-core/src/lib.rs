pub mod clean;
pub mod config;
pub mod error;
pub mod frame;
pub mod metrics;
pub mod outputs;
pub mod pipeline;
pub mod select;
pub mod series;
pub mod snapshot;

pub use clean::{clean, clean_with, clean_with_summary, CleanOptions, CleanSummary};
pub use covidtrack_parser::{EntityKey, FillFlags, Record, SourceInfo, Table};
pub use error::{PipelineError, Result};
pub use metrics::{
    derive_daily_metrics, derive_daily_metrics_with, DailyMetrics, DerivedRow, DerivedTable,
    MetricOptions,
};
pub use pipeline::{load, load_any, run_on_table, run_pipeline, PipelineOutput, PipelineSummary};
pub use select::{exclude_aggregates, filter_date_range, select_entities};
pub use series::{aggregate_by_date, Metric, MetricSeries, SeriesPoint};
pub use snapshot::{latest_snapshot, Snapshot, SnapshotRow};
