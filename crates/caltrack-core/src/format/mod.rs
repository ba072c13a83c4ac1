//! Rendering of a [`Dashboard`] for the terminal.
//!
//! - **Text**: headings, metrics, category table and a contribution chart
//!   drawn with block characters, optionally colored with 24-bit ANSI codes
//! - **JSON**: the dashboard structure as-is, for scripting

use std::borrow::Cow;
use std::fmt::Write as _;

use crate::dashboard::{Dashboard, DashboardRow};

const BAR_CHAR: char = '█';
const ANSI_RESET: &str = "\x1b[0m";

/// Options for text rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOptions {
    /// Color contribution bars with the calendar color.
    pub color: bool,
    /// Width of the longest contribution bar.
    pub bar_width: usize,
    /// Maximum length of titles and calendar names (truncated with ellipsis).
    pub max_title_length: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            color: false,
            bar_width: 24,
            max_title_length: 40,
        }
    }
}

/// Renders dashboards.
#[derive(Debug, Clone, Default)]
pub struct ReportFormatter {
    options: ReportOptions,
}

impl ReportFormatter {
    pub fn new(options: ReportOptions) -> Self {
        Self { options }
    }

    /// Renders the dashboard as plain text. Lines never end in whitespace.
    pub fn render_text(&self, dashboard: &Dashboard) -> String {
        let labels = dashboard.locale.labels();
        let mut out = String::new();

        let year = dashboard
            .selected_year
            .map_or_else(|| "-".to_string(), |y| y.to_string());
        line(
            &mut out,
            format!(
                "{} ({}, {})",
                labels.title,
                year,
                dashboard.locale.time_scale_label(dashboard.time_scale)
            ),
        );
        line(
            &mut out,
            format!(
                "{}: {}",
                labels.calendars,
                dashboard.selected_calendars.join(", ")
            ),
        );
        out.push('\n');

        let metrics = &dashboard.metrics;
        let average = metrics
            .average_duration_minutes
            .map_or_else(|| "-".to_string(), |m| format!("{:.1} min", m));
        line(&mut out, format!("{}: {}", labels.total_events, metrics.total_events));
        line(&mut out, format!("{}: {}", labels.average_duration, average));
        line(&mut out, format!("{}: {}", labels.all_day_events, metrics.all_day_events));

        out.push('\n');
        line(&mut out, labels.categories.to_string());
        if dashboard.categories.is_empty() {
            line(&mut out, format!("  {}", labels.no_data));
        }
        for totals in &dashboard.categories.totals {
            line(
                &mut out,
                format!(
                    "  {:<18} {:>4} {:>12} {:>8}",
                    dashboard.locale.category_label(totals.category),
                    totals.event_count,
                    format!("{:.1} min", totals.total_minutes),
                    format!("{:.2}%", totals.percentage),
                ),
            );
        }

        out.push('\n');
        line(&mut out, labels.contribution.to_string());
        self.render_contribution(&mut out, dashboard);

        if !dashboard.events.is_empty() {
            out.push('\n');
            line(&mut out, labels.events.to_string());
            for row in &dashboard.events {
                line(&mut out, self.event_line(row, labels.all_day));
            }
        }

        out
    }

    fn render_contribution(&self, out: &mut String, dashboard: &Dashboard) {
        let contribution = &dashboard.contribution;
        if contribution.is_empty() {
            line(out, format!("  {}", dashboard.locale.labels().no_data));
            return;
        }

        let bucket_width = contribution
            .iter()
            .map(|b| b.bucket.chars().count())
            .max()
            .unwrap_or(0);
        let calendar_width = contribution
            .iter()
            .map(|b| ellipsis(&b.calendar, self.options.max_title_length).chars().count())
            .max()
            .unwrap_or(0);
        let max_minutes = contribution
            .iter()
            .map(|b| b.total_minutes)
            .fold(0.0_f64, f64::max);

        for bucket in contribution {
            let bar = self.bar(bucket.total_minutes, max_minutes, &bucket.color);
            line(
                out,
                format!(
                    "  {:<bw$}  {:<cw$} {:>4} {:>10}  {}",
                    bucket.bucket,
                    ellipsis(&bucket.calendar, self.options.max_title_length),
                    bucket.event_count,
                    format!("{:.0} min", bucket.total_minutes),
                    bar,
                    bw = bucket_width,
                    cw = calendar_width,
                ),
            );
        }
    }

    fn bar(&self, minutes: f64, max_minutes: f64, color: &str) -> String {
        if max_minutes <= 0.0 || minutes <= 0.0 {
            return String::new();
        }
        let len = ((minutes / max_minutes) * self.options.bar_width as f64).round() as usize;
        let bar: String = std::iter::repeat_n(BAR_CHAR, len.max(1)).collect();

        match (self.options.color, hex_to_rgb(color)) {
            (true, Some((r, g, b))) => format!("\x1b[38;2;{};{};{}m{}{}", r, g, b, bar, ANSI_RESET),
            _ => bar,
        }
    }

    fn event_line(&self, row: &DashboardRow, all_day_label: &str) -> String {
        let event = &row.row.event;
        let when = match event.start_time.as_datetime() {
            Some(dt) => dt.format("%H:%M").to_string(),
            None => all_day_label.to_string(),
        };
        format!(
            "  {} {:<3} {:<5} {} [{}] {}",
            event.start_date().format("%Y-%m-%d"),
            ellipsis(&row.weekday_name, 3),
            when,
            ellipsis(&event.summary, self.options.max_title_length),
            ellipsis(&event.calendar_name, self.options.max_title_length),
            row.category_label,
        )
    }

    /// Renders the dashboard as pretty-printed JSON.
    pub fn render_json(&self, dashboard: &Dashboard) -> serde_json::Result<String> {
        serde_json::to_string_pretty(dashboard)
    }
}

fn line(out: &mut String, text: String) {
    let _ = writeln!(out, "{}", text.trim_end());
}

/// Parses `#RRGGBB`.
fn hex_to_rgb(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((r, g, b))
}

/// Truncates a string to `max_len` characters, ending with "..." when cut.
pub fn ellipsis(s: &str, max_len: usize) -> Cow<'_, str> {
    if max_len == 0 {
        return Cow::Borrowed("");
    }

    if s.chars().count() <= max_len {
        return Cow::Borrowed(s);
    }

    if max_len <= 3 {
        return Cow::Owned(s.chars().take(max_len).collect());
    }

    let truncated: String = s.chars().take(max_len - 3).collect();
    Cow::Owned(format!("{}...", truncated))
}
