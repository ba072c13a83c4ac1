//! Per-category statistics over a categorized dataset.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::category::Category;
use crate::event::CategorizedEvent;

/// Totals for one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotals {
    pub category: Category,
    pub event_count: usize,
    /// Sum of timed-event durations; all-day events contribute nothing.
    pub total_minutes: f64,
    /// Share of the overall duration, rounded to two decimals.
    pub percentage: f64,
}

/// Category breakdown of a dataset, in category order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryStats {
    pub totals: Vec<CategoryTotals>,
    pub total_minutes: f64,
}

impl CategoryStats {
    /// Aggregates the given rows. Only categories that occur are listed.
    pub fn from_events(events: &[CategorizedEvent]) -> Self {
        let mut buckets: BTreeMap<Category, (usize, f64)> = BTreeMap::new();
        for row in events {
            let entry = buckets.entry(row.event_category).or_default();
            entry.0 += 1;
            entry.1 += row.event.duration_minutes.unwrap_or(0.0);
        }

        let total_minutes: f64 = buckets.values().map(|(_, minutes)| minutes).sum();

        let totals = buckets
            .into_iter()
            .map(|(category, (event_count, minutes))| CategoryTotals {
                category,
                event_count,
                total_minutes: minutes,
                percentage: percentage(minutes, total_minutes),
            })
            .collect();

        Self {
            totals,
            total_minutes,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    pub fn get(&self, category: Category) -> Option<&CategoryTotals> {
        self.totals.iter().find(|t| t.category == category)
    }
}

fn percentage(part: f64, total: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    (part / total * 10_000.0).round() / 100.0
}
