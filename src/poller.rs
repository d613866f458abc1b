//! Interval-driven resource polling.
//!
//! A [`Poller`] fires once immediately and then every `interval`. Each tick issues
//! one fetch in its own task; responses are committed in completion order through
//! a gate that holds the poller's active flag and the generation of the newest
//! applied response. Teardown flips the flag and stops the ticker; requests already
//! in flight run to completion but their results are dropped at the gate.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt};
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

use crate::config::{FailureMode, StaleGuard};
use crate::error::{FetchError, Resource};
use crate::logging::{self, obj, v_str, v_u64, Domain};

pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

type FetchFn<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, FetchError>> + Send + Sync>;
type Sink<T> = Arc<dyn Fn(PollOutcome<T>) + Send + Sync>;

/// Resource-specific reaction to a failed fetch.
pub enum FailurePolicy<T> {
    /// Clear the snapshot and record the resource's inline message.
    Strict,
    /// Substitute the value produced by the closure.
    Resilient(Arc<dyn Fn() -> T + Send + Sync>),
}

impl<T> FailurePolicy<T> {
    pub fn resilient<F>(fallback: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        FailurePolicy::Resilient(Arc::new(fallback))
    }

    /// Strict, or resilient with `fallback`, depending on `mode`.
    pub fn for_mode<F>(mode: FailureMode, fallback: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        match mode {
            FailureMode::Strict => FailurePolicy::Strict,
            FailureMode::Resilient => Self::resilient(fallback),
        }
    }
}

/// What a committed tick hands to the sink.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome<T> {
    Fresh(T),
    /// Fetch failed; sample data stands in. `error` is for logs only.
    Fallback { data: T, error: String },
    /// Fetch failed; the snapshot must be cleared and `message` shown.
    Failed { error: String, message: String },
}

impl<T> PollOutcome<T> {
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> PollOutcome<U> {
        match self {
            PollOutcome::Fresh(data) => PollOutcome::Fresh(f(data)),
            PollOutcome::Fallback { data, error } => PollOutcome::Fallback { data: f(data), error },
            PollOutcome::Failed { error, message } => PollOutcome::Failed { error, message },
        }
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            PollOutcome::Fresh(data) | PollOutcome::Fallback { data, .. } => Some(data),
            PollOutcome::Failed { .. } => None,
        }
    }
}

pub struct Poller<T> {
    resource: Resource,
    label: String,
    interval: Duration,
    fetch: FetchFn<T>,
    policy: FailurePolicy<T>,
    guard: StaleGuard,
}

impl<T: Send + 'static> Poller<T> {
    pub fn new<F, Fut>(resource: Resource, interval: Duration, fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        Self {
            resource,
            label: resource.as_str().to_string(),
            interval,
            fetch: Arc::new(move || fetch().boxed()),
            policy: FailurePolicy::Strict,
            guard: StaleGuard::Monotonic,
        }
    }

    /// Free-form tag carried in logs, e.g. the selection key.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_policy(mut self, policy: FailurePolicy<T>) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_stale_guard(mut self, guard: StaleGuard) -> Self {
        self.guard = guard;
        self
    }

    /// Start ticking. Dropping the returned handle tears the poller down.
    pub fn spawn<S>(self, sink: S) -> PollerHandle
    where
        S: Fn(PollOutcome<T>) + Send + Sync + 'static,
    {
        let gate = Arc::new(Mutex::new(Gate::new()));
        let issued = Arc::new(AtomicU64::new(0));
        let committer = Arc::new(Committer {
            resource: self.resource,
            label: self.label.clone(),
            policy: self.policy,
            guard: self.guard,
            sink: Arc::new(sink),
            gate: gate.clone(),
        });
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let fetch = self.fetch;
        let period = self.interval;
        let tick_counter = issued.clone();

        logging::debug(
            Domain::Poller,
            "start",
            obj(&[
                ("resource", v_str(self.resource.as_str())),
                ("label", v_str(&self.label)),
                ("interval_ms", v_u64(period.as_millis() as u64)),
            ]),
        );

        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let generation = tick_counter.fetch_add(1, Ordering::SeqCst) + 1;
                        let request = fetch();
                        let committer = committer.clone();
                        tokio::spawn(async move {
                            let result = request.await;
                            committer.commit(generation, result);
                        });
                    }
                    _ = stop_rx.changed() => break,
                }
            }
        });

        PollerHandle {
            resource: self.resource,
            label: self.label,
            gate,
            issued,
            stop_tx,
        }
    }
}

#[derive(Debug)]
struct Gate {
    active: bool,
    last_applied: u64,
}

impl Gate {
    fn new() -> Self {
        Self {
            active: true,
            last_applied: 0,
        }
    }
}

struct Committer<T> {
    resource: Resource,
    label: String,
    policy: FailurePolicy<T>,
    guard: StaleGuard,
    sink: Sink<T>,
    gate: Arc<Mutex<Gate>>,
}

impl<T> Committer<T> {
    fn commit(&self, generation: u64, result: Result<T, FetchError>) {
        let mut gate = lock(&self.gate);
        if !gate.active {
            self.log_discard("discarded_after_teardown", generation, gate.last_applied);
            return;
        }
        if self.guard == StaleGuard::Monotonic && generation < gate.last_applied {
            self.log_discard("discarded_stale", generation, gate.last_applied);
            return;
        }
        gate.last_applied = gate.last_applied.max(generation);
        let outcome = self.resolve(result);
        (self.sink)(outcome);
    }

    fn resolve(&self, result: Result<T, FetchError>) -> PollOutcome<T> {
        let err = match result {
            Ok(data) => return PollOutcome::Fresh(data),
            Err(err) => err,
        };
        let fields = obj(&[
            ("resource", v_str(self.resource.as_str())),
            ("label", v_str(&self.label)),
            ("kind", v_str(err.kind())),
            ("msg", v_str(&err.to_string())),
        ]);
        match &self.policy {
            FailurePolicy::Strict => {
                logging::error(Domain::Poller, "fetch_failed", fields);
                PollOutcome::Failed {
                    error: err.to_string(),
                    message: self.resource.failure_message().to_string(),
                }
            }
            FailurePolicy::Resilient(fallback) => {
                logging::warn(Domain::Sample, "fallback_substituted", fields);
                PollOutcome::Fallback {
                    data: fallback(),
                    error: err.to_string(),
                }
            }
        }
    }

    fn log_discard(&self, event: &str, generation: u64, last_applied: u64) {
        logging::debug(
            Domain::Poller,
            event,
            obj(&[
                ("resource", v_str(self.resource.as_str())),
                ("label", v_str(&self.label)),
                ("generation", v_u64(generation)),
                ("last_applied", v_u64(last_applied)),
            ]),
        );
    }
}

/// Owner of a running poller. Teardown happens on `cancel` or drop.
pub struct PollerHandle {
    resource: Resource,
    label: String,
    gate: Arc<Mutex<Gate>>,
    issued: Arc<AtomicU64>,
    stop_tx: watch::Sender<bool>,
}

impl PollerHandle {
    pub fn is_active(&self) -> bool {
        lock(&self.gate).active
    }

    /// Requests issued so far, including ones still in flight.
    pub fn requests_issued(&self) -> u64 {
        self.issued.load(Ordering::SeqCst)
    }

    /// Once this returns, no further outcome reaches the sink.
    pub fn cancel(&self) {
        let was_active = {
            let mut gate = lock(&self.gate);
            std::mem::replace(&mut gate.active, false)
        };
        let _ = self.stop_tx.send(true);
        if was_active {
            logging::debug(
                Domain::Poller,
                "stop",
                obj(&[
                    ("resource", v_str(self.resource.as_str())),
                    ("label", v_str(&self.label)),
                    ("issued", v_u64(self.requests_issued())),
                ]),
            );
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}
