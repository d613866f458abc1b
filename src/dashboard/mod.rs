//! Dashboard orchestration.
//!
//! One poller per resource. Dates and news run for the lifetime of the
//! dashboard; summary, time series and scenario distribution are keyed on the
//! current selection and restarted by a supervisor task whenever their key
//! changes, so a selection change triggers an immediate fetch. All outcomes
//! flow through [`reduce`] under a single state lock.

pub mod rules;
pub mod state;
pub mod view;

use std::future::Future;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::api::VarApi;
use crate::config::Config;
use crate::error::{FetchError, Resource};
use crate::logging::{self, obj, v_str, v_u64, Domain};
use crate::poller::{lock, FailurePolicy, PollOutcome, Poller, PollerHandle};
use crate::sample;
use crate::types::SCENARIO_WINDOW;

pub use rules::Selection;
pub use state::{reduce, DashboardEvent, DashboardState, Origin, ResourceSlot, SyncNote};
pub use view::{compose, DashboardView};

struct Inner {
    config: Config,
    api: Arc<dyn VarApi>,
    state: Mutex<DashboardState>,
    selection_tx: watch::Sender<Selection>,
    revision_tx: watch::Sender<u64>,
}

/// Shared handle to the dashboard state; cheap to clone.
#[derive(Clone)]
pub struct Dashboard {
    inner: Arc<Inner>,
}

impl Dashboard {
    pub fn new(config: Config, api: Arc<dyn VarApi>) -> Self {
        let state = DashboardState::new(config.window_days);
        let (selection_tx, _) = watch::channel(state.selection.clone());
        let (revision_tx, _) = watch::channel(state.revision);
        Self {
            inner: Arc::new(Inner {
                config,
                api,
                state: Mutex::new(state),
                selection_tx,
                revision_tx,
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Apply one event and publish the resulting selection and revision.
    pub fn dispatch(&self, event: DashboardEvent) {
        let name = event.name();
        let mut state = lock(&self.inner.state);
        let notes = reduce(&mut state, event, Utc::now());
        let selection = state.selection.clone();
        let revision = state.revision;
        // Published under the lock so concurrent dispatches cannot reorder them.
        self.inner.selection_tx.send_if_modified(|current| {
            if *current == selection {
                return false;
            }
            *current = selection;
            true
        });
        self.inner.revision_tx.send_replace(revision);
        drop(state);

        logging::trace(
            Domain::Sync,
            "applied",
            obj(&[("event", v_str(name)), ("revision", v_u64(revision))]),
        );
        for note in notes {
            log_note(&note);
        }
    }

    pub fn select_date(&self, date: impl Into<String>) {
        self.dispatch(DashboardEvent::SelectDate(date.into()));
    }

    pub fn select_ric(&self, ric: impl Into<String>) {
        self.dispatch(DashboardEvent::SelectRic(ric.into()));
    }

    pub fn select_scenario_ric(&self, ric: impl Into<String>) {
        self.dispatch(DashboardEvent::SelectScenarioRic(ric.into()));
    }

    pub fn set_window_days(&self, days: u32) {
        self.dispatch(DashboardEvent::SetWindowDays(days));
    }

    pub fn selection(&self) -> Selection {
        self.inner.selection_tx.borrow().clone()
    }

    pub fn snapshot(&self) -> DashboardState {
        lock(&self.inner.state).clone()
    }

    pub fn view(&self) -> DashboardView {
        let view = compose(&lock(&self.inner.state));
        logging::trace(
            Domain::View,
            "composed",
            obj(&[
                ("errors", v_u64(view.errors.len() as u64)),
                ("sample_sections", v_u64(view.sample_sections.len() as u64)),
            ]),
        );
        view
    }

    /// Receiver that changes on every applied event.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.revision_tx.subscribe()
    }

    /// Start polling. Dropping or shutting down the handle tears every poller down.
    pub fn start(&self) -> DashboardHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let statics = vec![self.spawn_dates(), self.spawn_news()];
        let supervisor = tokio::spawn(supervise(
            self.clone(),
            self.inner.selection_tx.subscribe(),
            stop_rx,
        ));
        logging::info(
            Domain::Sync,
            "dashboard_started",
            obj(&[
                ("interval_ms", v_u64(self.inner.config.refresh_interval_ms)),
                ("failure_mode", v_str(&format!("{:?}", self.inner.config.failure_mode))),
            ]),
        );
        DashboardHandle {
            stop_tx,
            statics,
            supervisor: Some(supervisor),
        }
    }

    fn poller<T: Send + 'static, F, Fut>(&self, resource: Resource, fetch: F) -> Poller<T>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        Poller::new(resource, self.inner.config.refresh_interval(), fetch)
            .with_stale_guard(self.inner.config.stale_guard)
    }

    fn sink<T, E>(&self, wrap: E) -> impl Fn(PollOutcome<T>) + Send + Sync + 'static
    where
        E: Fn(PollOutcome<T>) -> DashboardEvent + Send + Sync + 'static,
    {
        let dashboard = self.clone();
        move |outcome| dashboard.dispatch(wrap(outcome))
    }

    fn spawn_dates(&self) -> PollerHandle {
        let api = self.inner.api.clone();
        self.poller(Resource::Dates, move || {
            let api = api.clone();
            async move { api.fetch_dates().await }
        })
        .with_policy(FailurePolicy::for_mode(self.inner.config.failure_mode, sample::sample_dates))
        .spawn(self.sink(DashboardEvent::Dates))
    }

    fn spawn_news(&self) -> PollerHandle {
        let api = self.inner.api.clone();
        let limit = self.inner.config.news_limit;
        self.poller(Resource::News, move || {
            let api = api.clone();
            async move { api.fetch_news(limit).await }
        })
        .with_label(format!("limit={}", limit))
        .with_policy(FailurePolicy::for_mode(self.inner.config.failure_mode, move || {
            let mut news = sample::sample_news();
            news.truncate(limit as usize);
            news
        }))
        .spawn(self.sink(DashboardEvent::News))
    }

    fn spawn_summary(&self, date: Option<String>) -> PollerHandle {
        let api = self.inner.api.clone();
        let key = date.clone();
        let fallback_date = date.clone();
        self.poller(Resource::Summary, move || {
            let api = api.clone();
            let date = key.clone();
            async move { api.fetch_summary(date.as_deref()).await }
        })
        .with_label(format!("as_of={}", date.as_deref().unwrap_or("latest")))
        .with_policy(FailurePolicy::for_mode(self.inner.config.failure_mode, move || {
            let mut summary = sample::sample_summary();
            if let Some(date) = &fallback_date {
                summary.as_of = date.clone();
            }
            summary
        }))
        .spawn(self.sink(DashboardEvent::Summary))
    }

    fn spawn_timeseries(&self, ric: String, days: u32) -> PollerHandle {
        let api = self.inner.api.clone();
        let key = ric.clone();
        let fallback_ric = ric.clone();
        self.poller(Resource::TimeSeries, move || {
            let api = api.clone();
            let ric = key.clone();
            async move { api.fetch_timeseries(&ric, days).await }
        })
        .with_label(format!("ric={} days={}", ric, days))
        .with_policy(FailurePolicy::for_mode(self.inner.config.failure_mode, move || {
            sample::build_sample_series(&fallback_ric, days)
        }))
        .spawn(self.sink(DashboardEvent::TimeSeries))
    }

    fn spawn_scenario(&self, ric: String) -> PollerHandle {
        let api = self.inner.api.clone();
        let key = ric.clone();
        let fallback_ric = ric.clone();
        self.poller(Resource::Scenario, move || {
            let api = api.clone();
            let ric = key.clone();
            async move { api.fetch_scenario_distribution(&ric).await }
        })
        .with_label(format!("ric={}", ric))
        .with_policy(FailurePolicy::for_mode(self.inner.config.failure_mode, move || {
            sample::build_sample_scenario_distribution(&fallback_ric, SCENARIO_WINDOW)
        }))
        .spawn(self.sink(DashboardEvent::Scenario))
    }
}

fn log_note(note: &SyncNote) {
    match note {
        SyncNote::RicHealed { from, to } => logging::info(
            Domain::Sync,
            "selection_healed",
            obj(&[("field", v_str("ric")), ("from", v_str(from)), ("to", v_str(to))]),
        ),
        SyncNote::ScenarioRicHealed { from, to } => logging::info(
            Domain::Sync,
            "selection_healed",
            obj(&[("field", v_str("scenario_ric")), ("from", v_str(from)), ("to", v_str(to))]),
        ),
        SyncNote::DateSeeded(date) => {
            logging::info(Domain::Sync, "date_seeded", obj(&[("date", v_str(date))]))
        }
        SyncNote::DateCorrected { from, to } => logging::info(
            Domain::Sync,
            "date_corrected",
            obj(&[("from", v_str(from)), ("to", v_str(to))]),
        ),
        SyncNote::UnknownCategories(labels) => logging::warn(
            Domain::Sync,
            "unknown_categories",
            obj(&[("categories", v_str(&labels.join(",")))]),
        ),
    }
}

/// A running poller together with the key it was started for.
struct Keyed<K> {
    key: K,
    handle: PollerHandle,
}

fn restart_if_changed<K: PartialEq>(
    slot: &mut Option<Keyed<K>>,
    key: K,
    start: impl FnOnce() -> PollerHandle,
) {
    if slot.as_ref().is_some_and(|running| running.key == key) {
        return;
    }
    // Old handle drops here, before the replacement issues its first request.
    drop(slot.take());
    *slot = Some(Keyed {
        key,
        handle: start(),
    });
}

async fn supervise(
    dashboard: Dashboard,
    mut selection_rx: watch::Receiver<Selection>,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut summary: Option<Keyed<Option<String>>> = None;
    let mut timeseries: Option<Keyed<(String, u32)>> = None;
    let mut scenario: Option<Keyed<String>> = None;

    loop {
        let selection = selection_rx.borrow_and_update().clone();
        restart_if_changed(&mut summary, selection.date.clone(), || {
            dashboard.spawn_summary(selection.date.clone())
        });
        restart_if_changed(
            &mut timeseries,
            (selection.ric.clone(), selection.window_days),
            || dashboard.spawn_timeseries(selection.ric.clone(), selection.window_days),
        );
        restart_if_changed(&mut scenario, selection.scenario_ric.clone(), || {
            dashboard.spawn_scenario(selection.scenario_ric.clone())
        });

        tokio::select! {
            changed = selection_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = stop_rx.changed() => break,
        }
    }

    let stopped = [summary.map(|k| k.handle), timeseries.map(|k| k.handle), scenario.map(|k| k.handle)];
    logging::debug(
        Domain::Sync,
        "supervisor_stopped",
        obj(&[(
            "pollers",
            v_u64(stopped.iter().filter(|h| h.is_some()).count() as u64),
        )]),
    );
}

/// Owner of a started dashboard.
pub struct DashboardHandle {
    stop_tx: watch::Sender<bool>,
    statics: Vec<PollerHandle>,
    supervisor: Option<JoinHandle<()>>,
}

impl DashboardHandle {
    /// Stop every poller and wait until the keyed ones are torn down.
    pub async fn shutdown(mut self) {
        for handle in &self.statics {
            handle.cancel();
        }
        let _ = self.stop_tx.send(true);
        if let Some(task) = self.supervisor.take() {
            let _ = task.await;
        }
        logging::info(Domain::Sync, "dashboard_stopped", obj(&[]));
    }
}

impl Drop for DashboardHandle {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(true);
    }
}
