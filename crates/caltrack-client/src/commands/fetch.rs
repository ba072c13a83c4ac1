//! `caltrack fetch`: run the pipeline and write a snapshot.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tracing::info;

use caltrack_core::{CategorizedEvent, CategoryStats, Snapshot, TimeWindow};

use crate::cli::FetchArgs;
use crate::config::ClientConfig;
use crate::error::ClientResult;
use crate::pipeline::{self, NO_EVENTS_MESSAGE, PipelineOutcome, PipelineRequest};

pub async fn run(args: FetchArgs, config: &ClientConfig) -> ClientResult<()> {
    let config = effective_config(&args, config)?;
    let provider = super::authenticated_provider(&config)?;
    let now = Utc::now();
    let request = build_request(&args, &config, now);
    let categorizer = config.categorizer.categorizer();

    match pipeline::run(&provider, &request, &categorizer).await? {
        PipelineOutcome::NoEvents => println!("{}", NO_EVENTS_MESSAGE),
        PipelineOutcome::Dataset(rows) => {
            let fetch = &config.fetch;
            let dir = args.output_dir.unwrap_or_else(|| fetch.data_dir());
            let (path, summary) = save(rows, now, fetch.days, &dir, &fetch.file_prefix)?;
            println!("Saved snapshot to {}", path.display());
            for line in summary {
                println!("{}", line);
            }
        }
    }
    Ok(())
}

/// Applies command-line values over the config file and validates the
/// result before anything is fetched.
fn effective_config(args: &FetchArgs, config: &ClientConfig) -> ClientResult<ClientConfig> {
    let mut config = config.clone();
    if let Some(days) = args.days {
        config.fetch.days = days;
    }
    if !args.calendars.is_empty() {
        config.fetch.calendars = args.calendars.clone();
    }
    super::ensure_valid(&config)?;
    Ok(config)
}

fn build_request(args: &FetchArgs, config: &ClientConfig, now: DateTime<Utc>) -> PipelineRequest {
    PipelineRequest::new(TimeWindow::lookback(now, config.fetch.days))
        .with_allow_list(config.fetch.calendars.clone())
        .with_primary_only(args.primary_only)
}

/// Writes the snapshot and returns its path with a per-category summary.
fn save(
    rows: Vec<CategorizedEvent>,
    now: DateTime<Utc>,
    days: u32,
    dir: &std::path::Path,
    prefix: &str,
) -> ClientResult<(PathBuf, Vec<String>)> {
    let stats = CategoryStats::from_events(&rows);
    let snapshot = Snapshot::from_rows(rows, now, days);
    let path = snapshot.write(dir, prefix)?;
    info!(rows = snapshot.row_count, path = %path.display(), "snapshot written");

    let mut summary = vec![format!(
        "{} events over the last {} days",
        snapshot.row_count, days
    )];
    summary.extend(summary_lines(&stats));
    Ok((path, summary))
}

fn summary_lines(stats: &CategoryStats) -> Vec<String> {
    stats
        .totals
        .iter()
        .map(|t| {
            format!(
                "  {:<16} {:>4} events {:>8.0} min {:>6.2}%",
                t.category.label(),
                t.event_count,
                t.total_minutes,
                t.percentage
            )
        })
        .collect()
}
