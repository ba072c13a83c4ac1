//! Core types: time, events, categories, snapshots, dashboard

pub mod analysis;
pub mod category;
pub mod dashboard;
pub mod event;
pub mod format;
pub mod snapshot;
pub mod time;
pub mod tracing;

pub use analysis::{CategoryStats, CategoryTotals};
pub use category::{Categorizer, Category, CategoryRule, CategoryRules};
pub use dashboard::{
    BucketTotals, CalendarPalette, Dashboard, DashboardFilter, DashboardOptions, DashboardRow,
    Locale, Metrics, TimeScale,
};
pub use event::{CategorizedEvent, NormalizedEvent, DEFAULT_SUMMARY, PRIMARY_CALENDAR};
pub use format::{ReportFormatter, ReportOptions, ellipsis};
pub use snapshot::{Snapshot, SnapshotError, SnapshotResult};
pub use time::{EventTime, TimeWindow};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
