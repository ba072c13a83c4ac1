//! Dashboard view over a stored dataset.
//!
//! [`Dashboard::build`] takes the categorized rows of a snapshot, derives
//! the presentation columns (period keys, localized names, calendar colors),
//! applies the year and calendar filters and computes the metrics, the
//! category breakdown and the per-period contribution of each calendar.
//! Rendering lives in [`crate::format`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Weekday};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analysis::CategoryStats;
use crate::category::Category;
use crate::event::CategorizedEvent;

/// Fallback colors for calendars without a configured color.
pub const PASTEL_PALETTE: [&str; 8] = [
    "#FFB6C1", // pink
    "#ADD8E6", // blue
    "#98FB98", // green
    "#FFFACD", // yellow
    "#E6E6FA", // lavender
    "#FFDAB9", // peach
    "#B0E0E6", // powder blue
    "#F5DEB3", // wheat
];

/// Color for calendars the palette does not know.
pub const UNKNOWN_CALENDAR_COLOR: &str = "#D3D3D3";

const MONTHS_EN: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const MONTHS_IT: [&str; 12] = [
    "Gennaio",
    "Febbraio",
    "Marzo",
    "Aprile",
    "Maggio",
    "Giugno",
    "Luglio",
    "Agosto",
    "Settembre",
    "Ottobre",
    "Novembre",
    "Dicembre",
];

const WEEKDAYS_EN: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

const WEEKDAYS_IT: [&str; 7] = [
    "Lunedì",
    "Martedì",
    "Mercoledì",
    "Giovedì",
    "Venerdì",
    "Sabato",
    "Domenica",
];

/// Display language for names and headings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "en", alias = "english")]
    English,
    #[serde(rename = "it", alias = "italian")]
    Italian,
}

/// Fixed UI strings for one locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Labels {
    pub title: &'static str,
    pub calendars: &'static str,
    pub total_events: &'static str,
    pub average_duration: &'static str,
    pub all_day_events: &'static str,
    pub categories: &'static str,
    pub contribution: &'static str,
    pub events: &'static str,
    pub all_day: &'static str,
    pub no_data: &'static str,
}

const LABELS_EN: Labels = Labels {
    title: "Calendar dashboard",
    calendars: "Calendars",
    total_events: "Total events",
    average_duration: "Average duration",
    all_day_events: "All-day events",
    categories: "Categories",
    contribution: "Contribution",
    events: "Events",
    all_day: "all day",
    no_data: "no data",
};

const LABELS_IT: Labels = Labels {
    title: "Dashboard calendario",
    calendars: "Calendari",
    total_events: "Totale eventi",
    average_duration: "Durata media",
    all_day_events: "Eventi giornalieri",
    categories: "Categorie",
    contribution: "Distribuzione attività",
    events: "Eventi",
    all_day: "tutto il giorno",
    no_data: "nessun dato",
};

impl Locale {
    /// Month name for `month` in 1..=12.
    pub fn month_name(self, month: u32) -> &'static str {
        let idx = (month.clamp(1, 12) - 1) as usize;
        match self {
            Locale::English => MONTHS_EN[idx],
            Locale::Italian => MONTHS_IT[idx],
        }
    }

    pub fn weekday_name(self, weekday: Weekday) -> &'static str {
        let idx = weekday.num_days_from_monday() as usize;
        match self {
            Locale::English => WEEKDAYS_EN[idx],
            Locale::Italian => WEEKDAYS_IT[idx],
        }
    }

    pub fn category_label(self, category: Category) -> &'static str {
        match self {
            Locale::English => category.label(),
            Locale::Italian => category.label_it(),
        }
    }

    pub fn time_scale_label(self, scale: TimeScale) -> &'static str {
        match (self, scale) {
            (Locale::English, TimeScale::Weekly) => "weekly",
            (Locale::English, TimeScale::Monthly) => "monthly",
            (Locale::English, TimeScale::Yearly) => "yearly",
            (Locale::Italian, TimeScale::Weekly) => "settimanale",
            (Locale::Italian, TimeScale::Monthly) => "mensile",
            (Locale::Italian, TimeScale::Yearly) => "annuale",
        }
    }

    pub fn labels(self) -> &'static Labels {
        match self {
            Locale::English => &LABELS_EN,
            Locale::Italian => &LABELS_IT,
        }
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" | "english" => Ok(Locale::English),
            "it" | "italian" | "italiano" => Ok(Locale::Italian),
            other => Err(format!("unknown locale '{}' (expected en or it)", other)),
        }
    }
}

/// Period granularity of the contribution chart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeScale {
    Weekly,
    #[default]
    Monthly,
    Yearly,
}

impl TimeScale {
    /// Picks the period key of a row for this scale.
    pub fn bucket<'a>(self, row: &'a DashboardRow) -> &'a str {
        match self {
            TimeScale::Weekly => &row.year_month_week,
            TimeScale::Monthly => &row.year_month,
            TimeScale::Yearly => &row.year_only,
        }
    }
}

impl fmt::Display for TimeScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(Locale::English.time_scale_label(*self))
    }
}

impl FromStr for TimeScale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "weekly" | "week" => Ok(TimeScale::Weekly),
            "monthly" | "month" => Ok(TimeScale::Monthly),
            "yearly" | "year" => Ok(TimeScale::Yearly),
            other => Err(format!(
                "unknown time scale '{}' (expected weekly, monthly or yearly)",
                other
            )),
        }
    }
}

/// Calendar name to `#RRGGBB` color.
///
/// Configured colors are kept as given; every other calendar gets the next
/// pastel color, assigned in sorted name order so the mapping does not
/// depend on row order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CalendarPalette {
    colors: BTreeMap<String, String>,
}

impl CalendarPalette {
    pub fn new<'a>(
        configured: &BTreeMap<String, String>,
        calendars: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let mut colors = configured.clone();
        let unassigned: BTreeSet<&str> = calendars
            .into_iter()
            .filter(|name| !configured.contains_key(*name))
            .collect();

        for (i, name) in unassigned.into_iter().enumerate() {
            colors.insert(
                name.to_string(),
                PASTEL_PALETTE[i % PASTEL_PALETTE.len()].to_string(),
            );
        }

        Self { colors }
    }

    pub fn color_for(&self, calendar: &str) -> &str {
        self.colors
            .get(calendar)
            .map_or(UNKNOWN_CALENDAR_COLOR, String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.colors.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// A categorized row with its presentation-only columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardRow {
    #[serde(flatten)]
    pub row: CategorizedEvent,
    /// `"2025"`
    pub year_only: String,
    /// `"2025-01"`
    pub year_month: String,
    /// Year-month of the start date plus the zero-padded ISO week, `"2025-01-02"`.
    pub year_month_week: String,
    pub weekday_name: String,
    pub month_name: String,
    pub category_label: String,
    pub color: String,
}

impl DashboardRow {
    pub fn derive(row: CategorizedEvent, locale: Locale, palette: &CalendarPalette) -> Self {
        let date = row.event.start_date();
        Self {
            year_only: date.format("%Y").to_string(),
            year_month: date.format("%Y-%m").to_string(),
            year_month_week: format!("{}-{:02}", date.format("%Y-%m"), row.event.week_number),
            weekday_name: locale.weekday_name(date.weekday()).to_string(),
            month_name: locale.month_name(date.month()).to_string(),
            category_label: locale.category_label(row.event_category).to_string(),
            color: palette.color_for(&row.event.calendar_name).to_string(),
            row,
        }
    }
}

/// Row selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardFilter {
    /// Year to show; defaults to the most recent year in the data.
    pub year: Option<i32>,
    /// Calendars to show; empty means all.
    pub calendars: Vec<String>,
}

impl DashboardFilter {
    fn keeps(&self, row: &DashboardRow, year: Option<i32>) -> bool {
        let year_ok = year.is_none_or(|y| row.row.event.year == y);
        let calendar_ok = self.calendars.is_empty()
            || self.calendars.iter().any(|c| *c == row.row.event.calendar_name);
        year_ok && calendar_ok
    }
}

/// How the dashboard is derived and presented.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardOptions {
    pub locale: Locale,
    pub time_scale: TimeScale,
    /// Configured calendar colors; the rest come from [`PASTEL_PALETTE`].
    pub calendar_colors: BTreeMap<String, String>,
    /// Number of rows to list, most recent first; 0 lists none.
    pub event_limit: usize,
}

/// Headline numbers for the filtered rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metrics {
    pub total_events: usize,
    /// Mean duration of timed events; `None` when there are none.
    pub average_duration_minutes: Option<f64>,
    pub all_day_events: usize,
}

impl Metrics {
    fn from_rows(rows: &[&DashboardRow]) -> Self {
        let durations: Vec<f64> = rows
            .iter()
            .filter_map(|r| r.row.event.duration_minutes)
            .collect();
        let average_duration_minutes = if durations.is_empty() {
            None
        } else {
            Some(durations.iter().sum::<f64>() / durations.len() as f64)
        };

        Self {
            total_events: rows.len(),
            average_duration_minutes,
            all_day_events: rows.iter().filter(|r| r.row.event.all_day).count(),
        }
    }
}

/// Contribution of one calendar to one period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketTotals {
    pub bucket: String,
    pub calendar: String,
    pub color: String,
    pub event_count: usize,
    pub total_minutes: f64,
}

/// The computed dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub locale: Locale,
    pub time_scale: TimeScale,
    /// Years present in the data, ascending.
    pub years: Vec<i32>,
    /// Calendars present in the data, sorted.
    pub calendars: Vec<String>,
    pub selected_year: Option<i32>,
    pub selected_calendars: Vec<String>,
    pub metrics: Metrics,
    pub categories: CategoryStats,
    /// Ordered by period, then calendar.
    pub contribution: Vec<BucketTotals>,
    /// Listed rows, most recent first.
    pub events: Vec<DashboardRow>,
    pub palette: CalendarPalette,
}

impl Dashboard {
    pub fn build(
        rows: Vec<CategorizedEvent>,
        filter: &DashboardFilter,
        options: &DashboardOptions,
    ) -> Self {
        let years: Vec<i32> = rows
            .iter()
            .map(|r| r.event.year)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let calendars: Vec<String> = rows
            .iter()
            .map(|r| r.event.calendar_name.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let palette = CalendarPalette::new(
            &options.calendar_colors,
            calendars.iter().map(String::as_str),
        );

        let selected_year = filter.year.or_else(|| years.last().copied());
        let selected_calendars = if filter.calendars.is_empty() {
            calendars.clone()
        } else {
            filter.calendars.clone()
        };

        let derived: Vec<DashboardRow> = rows
            .into_iter()
            .map(|r| DashboardRow::derive(r, options.locale, &palette))
            .collect();
        let filtered: Vec<&DashboardRow> = derived
            .iter()
            .filter(|r| filter.keeps(r, selected_year))
            .collect();

        debug!(
            total = derived.len(),
            shown = filtered.len(),
            year = ?selected_year,
            "built dashboard"
        );

        let metrics = Metrics::from_rows(&filtered);
        let category_rows: Vec<CategorizedEvent> = filtered.iter().map(|r| r.row.clone()).collect();
        let categories = CategoryStats::from_events(&category_rows);
        let contribution = contribution(&filtered, options.time_scale);

        let mut events: Vec<DashboardRow> = filtered.iter().map(|r| (*r).clone()).collect();
        events.sort_by(|a, b| b.row.event.start_time.cmp(&a.row.event.start_time));
        events.truncate(options.event_limit);

        Self {
            locale: options.locale,
            time_scale: options.time_scale,
            years,
            calendars,
            selected_year,
            selected_calendars,
            metrics,
            categories,
            contribution,
            events,
            palette,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.total_events == 0
    }
}

fn contribution(rows: &[&DashboardRow], scale: TimeScale) -> Vec<BucketTotals> {
    let mut buckets: BTreeMap<(String, String), BucketTotals> = BTreeMap::new();
    for row in rows {
        let bucket = scale.bucket(row).to_string();
        let calendar = row.row.event.calendar_name.clone();
        let entry = buckets
            .entry((bucket.clone(), calendar.clone()))
            .or_insert_with(|| BucketTotals {
                bucket,
                calendar,
                color: row.color.clone(),
                event_count: 0,
                total_minutes: 0.0,
            });
        entry.event_count += 1;
        entry.total_minutes += row.row.event.duration_minutes.unwrap_or(0.0);
    }
    buckets.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::NormalizedEvent;
    use chrono::{DateTime, NaiveDate};

    fn timed(id: &str, start: &str, minutes: i64, calendar: &str, category: Category) -> CategorizedEvent {
        let start = DateTime::parse_from_rfc3339(start).unwrap();
        let end = start + chrono::Duration::minutes(minutes);
        CategorizedEvent::new(
            NormalizedEvent::timed(id, id, start, end).with_calendar(calendar, calendar),
            category,
        )
    }

    fn all_day(id: &str, y: i32, m: u32, d: u32, calendar: &str) -> CategorizedEvent {
        let day = NaiveDate::from_ymd_opt(y, m, d).unwrap();
        CategorizedEvent::new(
            NormalizedEvent::all_day(id, id, day, day.succ_opt().unwrap())
                .with_calendar(calendar, calendar),
            Category::PersonalEvent,
        )
    }

    fn dataset() -> Vec<CategorizedEvent> {
        vec![
            timed("a", "2024-11-04T09:00:00Z", 60, "Work", Category::Meeting),
            timed("b", "2025-01-06T09:00:00Z", 90, "Work", Category::Meeting),
            timed("c", "2025-01-08T12:30:00Z", 60, "Home", Category::Meal),
            all_day("d", 2025, 2, 14, "Home"),
        ]
    }

    mod presentation {
        use super::*;

        #[test]
        fn period_keys() {
            let palette = CalendarPalette::default();
            let row = DashboardRow::derive(
                timed("x", "2025-01-06T09:00:00Z", 30, "Work", Category::Other),
                Locale::English,
                &palette,
            );
            assert_eq!(row.year_only, "2025");
            assert_eq!(row.year_month, "2025-01");
            assert_eq!(row.year_month_week, "2025-01-02");
        }

        #[test]
        fn week_key_keeps_calendar_month() {
            // 2024-12-30 is in ISO week 1 of 2025; the key keeps the start date's year-month.
            let palette = CalendarPalette::default();
            let row = DashboardRow::derive(all_day("x", 2024, 12, 30, "Home"), Locale::English, &palette);
            assert_eq!(row.year_month_week, "2024-12-01");
        }

        #[test]
        fn italian_names() {
            let palette = CalendarPalette::default();
            let row = DashboardRow::derive(
                timed("x", "2025-01-06T09:00:00Z", 30, "Work", Category::Meeting),
                Locale::Italian,
                &palette,
            );
            assert_eq!(row.weekday_name, "Lunedì");
            assert_eq!(row.month_name, "Gennaio");
            assert_eq!(row.category_label, "Riunione");
        }

        #[test]
        fn locale_parsing() {
            assert_eq!("it".parse::<Locale>().unwrap(), Locale::Italian);
            assert_eq!("English".parse::<Locale>().unwrap(), Locale::English);
            assert!("fr".parse::<Locale>().is_err());
            assert_eq!("week".parse::<TimeScale>().unwrap(), TimeScale::Weekly);
            assert!("daily".parse::<TimeScale>().is_err());
        }
    }

    mod palette {
        use super::*;

        #[test]
        fn configured_colors_win() {
            let mut configured = BTreeMap::new();
            configured.insert("Work".to_string(), "#123456".to_string());
            let palette = CalendarPalette::new(&configured, ["Work", "Home", "Gym"]);

            assert_eq!(palette.color_for("Work"), "#123456");
            // Remaining calendars in sorted order: Gym, Home.
            assert_eq!(palette.color_for("Gym"), PASTEL_PALETTE[0]);
            assert_eq!(palette.color_for("Home"), PASTEL_PALETTE[1]);
            assert_eq!(palette.color_for("Other"), UNKNOWN_CALENDAR_COLOR);
        }

        #[test]
        fn assignment_ignores_input_order() {
            let a = CalendarPalette::new(&BTreeMap::new(), ["B", "A"]);
            let b = CalendarPalette::new(&BTreeMap::new(), ["A", "B", "A"]);
            assert_eq!(a, b);
        }
    }

    mod build {
        use super::*;

        #[test]
        fn defaults_to_latest_year_and_all_calendars() {
            let dashboard = Dashboard::build(
                dataset(),
                &DashboardFilter::default(),
                &DashboardOptions::default(),
            );
            assert_eq!(dashboard.years, vec![2024, 2025]);
            assert_eq!(dashboard.selected_year, Some(2025));
            assert_eq!(dashboard.calendars, vec!["Home", "Work"]);
            assert_eq!(dashboard.selected_calendars, vec!["Home", "Work"]);
            assert_eq!(dashboard.metrics.total_events, 3);
            assert_eq!(dashboard.metrics.all_day_events, 1);
            assert_eq!(dashboard.metrics.average_duration_minutes, Some(75.0));
        }

        #[test]
        fn calendar_filter() {
            let filter = DashboardFilter {
                year: Some(2025),
                calendars: vec!["Home".to_string()],
            };
            let dashboard = Dashboard::build(dataset(), &filter, &DashboardOptions::default());
            assert_eq!(dashboard.metrics.total_events, 2);
            assert_eq!(dashboard.selected_calendars, vec!["Home"]);
            assert_eq!(dashboard.metrics.average_duration_minutes, Some(60.0));
        }

        #[test]
        fn contribution_by_month() {
            let dashboard = Dashboard::build(
                dataset(),
                &DashboardFilter::default(),
                &DashboardOptions::default(),
            );
            let keys: Vec<_> = dashboard
                .contribution
                .iter()
                .map(|b| (b.bucket.as_str(), b.calendar.as_str(), b.event_count))
                .collect();
            assert_eq!(
                keys,
                vec![
                    ("2025-01", "Home", 1),
                    ("2025-01", "Work", 1),
                    ("2025-02", "Home", 1)
                ]
            );
            assert_eq!(dashboard.contribution[1].total_minutes, 90.0);
        }

        #[test]
        fn contribution_by_year() {
            let options = DashboardOptions {
                time_scale: TimeScale::Yearly,
                ..DashboardOptions::default()
            };
            let filter = DashboardFilter {
                calendars: vec!["Work".to_string()],
                year: Some(2024),
            };
            let dashboard = Dashboard::build(dataset(), &filter, &options);
            assert_eq!(dashboard.contribution.len(), 1);
            assert_eq!(dashboard.contribution[0].bucket, "2024");
            assert_eq!(dashboard.contribution[0].total_minutes, 60.0);
        }

        #[test]
        fn listing_is_most_recent_first_and_limited() {
            let options = DashboardOptions {
                event_limit: 2,
                ..DashboardOptions::default()
            };
            let dashboard = Dashboard::build(dataset(), &DashboardFilter::default(), &options);
            let ids: Vec<_> = dashboard
                .events
                .iter()
                .map(|r| r.row.event.event_id.as_str())
                .collect();
            assert_eq!(ids, vec!["d", "c"]);
        }

        #[test]
        fn empty_dataset() {
            let dashboard = Dashboard::build(
                Vec::new(),
                &DashboardFilter::default(),
                &DashboardOptions::default(),
            );
            assert!(dashboard.is_empty());
            assert_eq!(dashboard.selected_year, None);
            assert_eq!(dashboard.metrics.average_duration_minutes, None);
            assert!(dashboard.contribution.is_empty());
        }
    }
}
