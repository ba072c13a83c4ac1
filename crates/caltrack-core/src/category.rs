//! Keyword categorization of normalized events.
//!
//! Each event is assigned exactly one [`Category`]. The rule table is tested
//! in order against the lower-cased summary and description; the first rule
//! with a keyword contained anywhere in that text wins, and events matching
//! nothing fall back to [`Category::Other`].
//!
//! Matching is plain substring search, so `"conference"` hits the Meeting
//! keyword `"conf"`.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::event::{CategorizedEvent, NormalizedEvent};

/// Event category, in rule-table order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(alias = "meeting")]
    Meeting,
    #[serde(alias = "training")]
    Training,
    #[serde(alias = "deadline")]
    Deadline,
    #[serde(alias = "travel")]
    Travel,
    #[serde(alias = "meal")]
    Meal,
    #[serde(rename = "Personal event", alias = "personal_event")]
    PersonalEvent,
    #[serde(alias = "other")]
    Other,
}

impl Category {
    /// Every category, in rule-table order.
    pub const ALL: [Category; 7] = [
        Category::Meeting,
        Category::Training,
        Category::Deadline,
        Category::Travel,
        Category::Meal,
        Category::PersonalEvent,
        Category::Other,
    ];

    /// English label, as stored in snapshots.
    pub fn label(self) -> &'static str {
        match self {
            Category::Meeting => "Meeting",
            Category::Training => "Training",
            Category::Deadline => "Deadline",
            Category::Travel => "Travel",
            Category::Meal => "Meal",
            Category::PersonalEvent => "Personal event",
            Category::Other => "Other",
        }
    }

    /// Italian label, used by the dashboard.
    pub fn label_it(self) -> &'static str {
        match self {
            Category::Meeting => "Riunione",
            Category::Training => "Formazione",
            Category::Deadline => "Scadenza",
            Category::Travel => "Viaggio",
            Category::Meal => "Pasto",
            Category::PersonalEvent => "Evento personale",
            Category::Other => "Altro",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One row of the rule table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub category: Category,
    pub keywords: Vec<String>,
}

impl CategoryRule {
    /// Creates a rule; keywords are stored lower-cased.
    pub fn new<I, S>(category: Category, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            category,
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    fn matches(&self, text: &str) -> bool {
        self.keywords.iter().any(|k| text.contains(k.as_str()))
    }
}

/// Ordered, immutable rule table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRules {
    rules: Vec<CategoryRule>,
}

impl CategoryRules {
    /// Builds a table from rules in priority order.
    ///
    /// Keywords are lower-cased again here so rules deserialized from a
    /// config file match case-insensitively too.
    pub fn new(rules: Vec<CategoryRule>) -> Self {
        let rules = rules
            .into_iter()
            .map(|rule| CategoryRule::new(rule.category, rule.keywords))
            .collect();
        Self { rules }
    }

    /// Rules in priority order.
    pub fn rules(&self) -> &[CategoryRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for CategoryRules {
    fn default() -> Self {
        Self::new(vec![
            CategoryRule::new(Category::Meeting, ["riunione", "meeting", "call", "conf"]),
            CategoryRule::new(
                Category::Training,
                ["formazione", "corso", "training", "workshop"],
            ),
            CategoryRule::new(Category::Deadline, ["consegna", "scadenza", "deadline"]),
            CategoryRule::new(Category::Travel, ["viaggio", "trasferta", "volo"]),
            CategoryRule::new(Category::Meal, ["pranzo", "cena", "colazione"]),
            CategoryRule::new(
                Category::PersonalEvent,
                ["compleanno", "anniversario", "festa"],
            ),
        ])
    }
}

/// Assigns categories using an injected rule table.
#[derive(Debug, Clone, Default)]
pub struct Categorizer {
    rules: CategoryRules,
}

impl Categorizer {
    pub fn new(rules: CategoryRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &CategoryRules {
        &self.rules
    }

    /// Categorizes free text: summary plus optional description.
    pub fn categorize_text(&self, summary: &str, description: Option<&str>) -> Category {
        let text = format!(
            "{} {}",
            summary.to_lowercase(),
            description.unwrap_or_default().to_lowercase()
        );

        self.rules
            .rules()
            .iter()
            .find(|rule| rule.matches(&text))
            .map_or(Category::Other, |rule| rule.category)
    }

    /// Categorizes one event.
    pub fn categorize(&self, event: NormalizedEvent) -> CategorizedEvent {
        let category = self.categorize_text(&event.summary, event.description.as_deref());
        CategorizedEvent::new(event, category)
    }

    /// Categorizes a batch, preserving order.
    pub fn categorize_all(&self, events: Vec<NormalizedEvent>) -> Vec<CategorizedEvent> {
        let categorized: Vec<_> = events.into_iter().map(|e| self.categorize(e)).collect();
        debug!(count = categorized.len(), "categorized events");
        categorized
    }
}
