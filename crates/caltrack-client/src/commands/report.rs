//! `caltrack report`: render the dashboard for a snapshot.

use std::io::IsTerminal;

use tracing::debug;

use caltrack_core::{
    Dashboard, DashboardFilter, DashboardOptions, ReportFormatter, ReportOptions, Snapshot,
};

use crate::cli::ReportArgs;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

pub fn run(args: ReportArgs, config: &ClientConfig) -> ClientResult<()> {
    let color = use_color(&args, config);
    let output = render(&args, config, color)?;
    print!("{}", output);
    Ok(())
}

fn use_color(args: &ReportArgs, config: &ClientConfig) -> bool {
    let no_color_env = std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty());
    config.dashboard.color && !args.no_color && !no_color_env && std::io::stdout().is_terminal()
}

fn load_snapshot(args: &ReportArgs, config: &ClientConfig) -> ClientResult<Snapshot> {
    let snapshot = match &args.snapshot {
        Some(path) => Snapshot::read(path)?,
        None => Snapshot::load_latest(&config.fetch.data_dir(), &config.fetch.file_prefix)?,
    };
    debug!(
        rows = snapshot.row_count,
        generated_at = %snapshot.generated_at,
        "loaded snapshot"
    );
    Ok(snapshot)
}

/// Builds the dashboard; command-line values win over the config file.
fn build_dashboard(args: &ReportArgs, config: &ClientConfig) -> ClientResult<Dashboard> {
    let rows = load_snapshot(args, config)?.rows()?;

    let filter = DashboardFilter {
        year: args.year,
        calendars: args.calendars.clone(),
    };
    let options = DashboardOptions {
        locale: args.locale.unwrap_or(config.dashboard.locale),
        time_scale: args.scale.unwrap_or(config.dashboard.time_scale),
        calendar_colors: config.dashboard.calendar_colors.clone(),
        event_limit: args.events.unwrap_or(config.dashboard.events),
    };

    Ok(Dashboard::build(rows, &filter, &options))
}

fn render(args: &ReportArgs, config: &ClientConfig, color: bool) -> ClientResult<String> {
    let dashboard = build_dashboard(args, config)?;

    if args.json {
        let json = ReportFormatter::default()
            .render_json(&dashboard)
            .map_err(|e| ClientError::Output(format!("failed to serialize dashboard: {}", e)))?;
        return Ok(format!("{}\n", json));
    }

    let formatter = ReportFormatter::new(ReportOptions {
        color,
        ..ReportOptions::default()
    });
    Ok(formatter.render_text(&dashboard))
}
