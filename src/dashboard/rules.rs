//! Cross-resource consistency rules.
//!
//! Pure and idempotent: applying a rule to its own output changes nothing.

use serde::Serialize;

use crate::types::{is_aggregate, Summary, AGGREGATE_RIC};

/// Everything the selection-dependent pollers are keyed on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selection {
    /// Chosen as-of date; `None` until seeded by a summary or the date list.
    pub date: Option<String>,
    /// Instrument for the time-series view.
    pub ric: String,
    /// Instrument for the scenario-distribution view, reconciled separately.
    pub scenario_ric: String,
    pub window_days: u32,
}

impl Selection {
    pub fn new(window_days: u32) -> Self {
        Self {
            date: None,
            ric: AGGREGATE_RIC.to_string(),
            scenario_ric: AGGREGATE_RIC.to_string(),
            window_days,
        }
    }

    /// Both instrument selections reconciled against `summary`, date seeded if unset.
    pub fn after_summary(&self, summary: &Summary) -> Selection {
        Selection {
            date: seed_date(self.date.as_deref(), summary),
            ric: reconcile_ric(&self.ric, summary),
            scenario_ric: reconcile_ric(&self.scenario_ric, summary),
            window_days: self.window_days,
        }
    }

    pub fn after_dates(&self, dates: &[String]) -> Selection {
        Selection {
            date: reconcile_date(self.date.as_deref(), dates),
            ..self.clone()
        }
    }
}

/// Keep `selected` if it is the aggregate or present in `summary`; otherwise the
/// first asset, or the aggregate when there are none.
pub fn reconcile_ric(selected: &str, summary: &Summary) -> String {
    if is_aggregate(selected) || summary.contains_ric(selected) {
        return selected.to_string();
    }
    summary.first_ric().unwrap_or(AGGREGATE_RIC).to_string()
}

/// An explicitly chosen date wins; otherwise the summary's own as-of.
pub fn seed_date(chosen: Option<&str>, summary: &Summary) -> Option<String> {
    match chosen {
        Some(date) if !date.is_empty() => Some(date.to_string()),
        _ => Some(summary.as_of.clone()),
    }
}

/// Keep the chosen date when listed; otherwise fall back to the first entry.
/// An empty list leaves the choice alone.
pub fn reconcile_date(chosen: Option<&str>, dates: &[String]) -> Option<String> {
    let Some(first) = dates.first() else {
        return chosen.map(str::to_string);
    };
    match chosen {
        Some(date) if dates.iter().any(|d| d == date) => Some(date.to_string()),
        _ => Some(first.clone()),
    }
}
