//! Dashboard state and the pure reducer: (State, Event) -> (State, Vec<SyncNote>).
//!
//! Every resource lives in its own [`ResourceSlot`]; a successful fetch replaces
//! the slot wholesale. Summary and date-list events run the consistency rules so
//! the selection never points at something the latest data no longer contains.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::poller::PollOutcome;
use crate::types::{is_window_option, NewsItem, ScenarioDistribution, Summary, TimeSeries};

use super::rules::Selection;

/// Where the value in a slot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Live,
    Sample,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceSlot<T> {
    pub data: Option<T>,
    /// Inline message for the section; only set by a strict-mode failure.
    pub error: Option<String>,
    pub origin: Option<Origin>,
    pub updated_at: Option<DateTime<Utc>>,
    /// At least one outcome has been applied.
    pub settled: bool,
}

impl<T> Default for ResourceSlot<T> {
    fn default() -> Self {
        Self {
            data: None,
            error: None,
            origin: None,
            updated_at: None,
            settled: false,
        }
    }
}

impl<T> ResourceSlot<T> {
    pub fn apply(&mut self, outcome: PollOutcome<T>, now: DateTime<Utc>) {
        match outcome {
            PollOutcome::Fresh(data) => {
                self.data = Some(data);
                self.error = None;
                self.origin = Some(Origin::Live);
            }
            PollOutcome::Fallback { data, .. } => {
                self.data = Some(data);
                self.error = None;
                self.origin = Some(Origin::Sample);
            }
            PollOutcome::Failed { message, .. } => {
                self.data = None;
                self.error = Some(message);
                self.origin = None;
            }
        }
        self.updated_at = Some(now);
        self.settled = true;
    }

    /// No outcome yet, so the section is still loading.
    pub fn is_loading(&self) -> bool {
        !self.settled
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardState {
    pub selection: Selection,
    pub summary: ResourceSlot<Summary>,
    pub dates: ResourceSlot<Vec<String>>,
    pub timeseries: ResourceSlot<TimeSeries>,
    pub scenario: ResourceSlot<ScenarioDistribution>,
    pub news: ResourceSlot<Vec<NewsItem>>,
    /// Bumped on every applied event.
    pub revision: u64,
}

impl DashboardState {
    pub fn new(window_days: u32) -> Self {
        Self {
            selection: Selection::new(window_days),
            summary: ResourceSlot::default(),
            dates: ResourceSlot::default(),
            timeseries: ResourceSlot::default(),
            scenario: ResourceSlot::default(),
            news: ResourceSlot::default(),
            revision: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub enum DashboardEvent {
    Summary(PollOutcome<Summary>),
    Dates(PollOutcome<Vec<String>>),
    TimeSeries(PollOutcome<TimeSeries>),
    Scenario(PollOutcome<ScenarioDistribution>),
    News(PollOutcome<Vec<NewsItem>>),
    SelectDate(String),
    SelectRic(String),
    SelectScenarioRic(String),
    SetWindowDays(u32),
}

impl DashboardEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DashboardEvent::Summary(_) => "summary",
            DashboardEvent::Dates(_) => "dates",
            DashboardEvent::TimeSeries(_) => "timeseries",
            DashboardEvent::Scenario(_) => "scenario_distribution",
            DashboardEvent::News(_) => "news",
            DashboardEvent::SelectDate(_) => "select_date",
            DashboardEvent::SelectRic(_) => "select_ric",
            DashboardEvent::SelectScenarioRic(_) => "select_scenario_ric",
            DashboardEvent::SetWindowDays(_) => "set_window_days",
        }
    }
}

/// Side observations from a reduction, logged by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncNote {
    RicHealed { from: String, to: String },
    ScenarioRicHealed { from: String, to: String },
    DateSeeded(String),
    DateCorrected { from: String, to: String },
    UnknownCategories(Vec<String>),
}

pub fn reduce(state: &mut DashboardState, event: DashboardEvent, now: DateTime<Utc>) -> Vec<SyncNote> {
    let mut notes = Vec::new();
    // User choices are not heals; only rule-driven changes against this baseline are noted.
    let mut before = state.selection.clone();

    match event {
        DashboardEvent::Summary(outcome) => {
            if let Some(summary) = outcome.data() {
                let unknown = summary.unknown_categories();
                if !unknown.is_empty() {
                    notes.push(SyncNote::UnknownCategories(
                        unknown.into_iter().map(str::to_string).collect(),
                    ));
                }
                state.selection = state.selection.after_summary(summary);
            }
            state.summary.apply(outcome, now);
        }
        DashboardEvent::Dates(outcome) => {
            if let Some(dates) = outcome.data() {
                state.selection = state.selection.after_dates(dates);
            }
            state.dates.apply(outcome, now);
        }
        DashboardEvent::TimeSeries(outcome) => state.timeseries.apply(outcome, now),
        DashboardEvent::Scenario(outcome) => state.scenario.apply(outcome, now),
        DashboardEvent::News(outcome) => state.news.apply(outcome, now),
        DashboardEvent::SelectDate(date) => {
            state.selection.date = Some(date).filter(|d| !d.is_empty());
            before = state.selection.clone();
        }
        DashboardEvent::SelectRic(ric) => {
            state.selection.ric = ric;
            before = state.selection.clone();
            if let Some(summary) = &state.summary.data {
                state.selection = state.selection.after_summary(summary);
            }
        }
        DashboardEvent::SelectScenarioRic(ric) => {
            state.selection.scenario_ric = ric;
            before = state.selection.clone();
            if let Some(summary) = &state.summary.data {
                state.selection = state.selection.after_summary(summary);
            }
        }
        DashboardEvent::SetWindowDays(days) => {
            if is_window_option(days) {
                state.selection.window_days = days;
            }
        }
    }

    let after = &state.selection;
    if before.ric != after.ric {
        notes.push(SyncNote::RicHealed { from: before.ric.clone(), to: after.ric.clone() });
    }
    if before.scenario_ric != after.scenario_ric {
        notes.push(SyncNote::ScenarioRicHealed {
            from: before.scenario_ric.clone(),
            to: after.scenario_ric.clone(),
        });
    }
    match (&before.date, &after.date) {
        (None, Some(date)) => notes.push(SyncNote::DateSeeded(date.clone())),
        (Some(from), Some(to)) if from != to => notes.push(SyncNote::DateCorrected {
            from: from.clone(),
            to: to.clone(),
        }),
        _ => {}
    }

    state.revision += 1;
    notes
}
