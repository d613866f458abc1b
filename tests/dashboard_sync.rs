//! Dashboard synchronization against a scripted in-memory backend.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{sleep, Instant};

use varwatch::api::{FetchResult, VarApi};
use varwatch::config::Config;
use varwatch::dashboard::{Dashboard, Origin};
use varwatch::error::{FetchError, Resource};
use varwatch::types::{
    Asset, DriverContributions, NewsItem, Portfolio, ScenarioDistribution, Summary, TimeSeries,
    TimeSeriesPoint, AGGREGATE_RIC,
};

#[derive(Default)]
struct Script {
    rics: Vec<String>,
    failing: HashSet<Resource>,
    calls: Vec<String>,
}

#[derive(Clone, Default)]
struct ScriptedApi {
    script: Arc<Mutex<Script>>,
}

impl ScriptedApi {
    fn with_assets(rics: &[&str]) -> Self {
        let api = Self::default();
        api.set_assets(rics);
        api
    }

    fn set_assets(&self, rics: &[&str]) {
        self.script.lock().unwrap().rics = rics.iter().map(|r| r.to_string()).collect();
    }

    fn fail(&self, resource: Resource) {
        self.script.lock().unwrap().failing.insert(resource);
    }

    fn calls(&self) -> Vec<String> {
        self.script.lock().unwrap().calls.clone()
    }

    fn enter(&self, resource: Resource, call: String) -> FetchResult<Vec<String>> {
        let mut script = self.script.lock().unwrap();
        script.calls.push(call);
        if script.failing.contains(&resource) {
            return Err(FetchError::Status { resource, status: 503 });
        }
        Ok(script.rics.clone())
    }
}

fn asset(ric: &str, amount: f64) -> Asset {
    Asset {
        ric: ric.to_string(),
        name: format!("Asset {}", ric),
        category: "株式".to_string(),
        amount,
        change_amount: 0.1,
        change_pct: 1.0,
        contributions: DriverContributions::default(),
    }
}

#[async_trait]
impl VarApi for ScriptedApi {
    async fn fetch_summary(&self, as_of: Option<&str>) -> FetchResult<Summary> {
        let rics = self.enter(Resource::Summary, format!("summary:{}", as_of.unwrap_or("latest")))?;
        Ok(Summary {
            as_of: as_of.unwrap_or("2024-05-02").to_string(),
            portfolio: Portfolio { total: 15.0, change_amount: 1.0, change_pct: 6.7, diversification_effect: -2.0 },
            assets: rics.iter().enumerate().map(|(i, r)| asset(r, 10.0 - i as f64)).collect(),
            market_signal: None,
            driver_commentary: None,
        })
    }

    async fn fetch_dates(&self) -> FetchResult<Vec<String>> {
        self.enter(Resource::Dates, "dates".to_string())?;
        Ok(vec!["2024-05-02".to_string(), "2024-05-01".to_string()])
    }

    async fn fetch_timeseries(&self, ric: &str, days: u32) -> FetchResult<TimeSeries> {
        self.enter(Resource::TimeSeries, format!("timeseries:{}:{}", ric, days))?;
        Ok(TimeSeries {
            ric: ric.to_string(),
            points: vec![TimeSeriesPoint { date: "2024-05-02".to_string(), value: 8.0, change: None }],
        })
    }

    async fn fetch_scenario_distribution(&self, ric: &str) -> FetchResult<ScenarioDistribution> {
        self.enter(Resource::Scenario, format!("scenario:{}", ric))?;
        Ok(ScenarioDistribution { ric: ric.to_string(), values: vec![1.0, 1.0, 1.0, 1.0, 5.0, 5.0] })
    }

    async fn fetch_news(&self, limit: u32) -> FetchResult<Vec<NewsItem>> {
        self.enter(Resource::News, format!("news:{}", limit))?;
        Ok(vec![NewsItem {
            id: "n1".to_string(),
            headline: "headline".to_string(),
            published_at: "2024-05-02T09:00:00Z".to_string(),
            source: "wire".to_string(),
            summary: None,
        }])
    }
}

fn config(pairs: &[(&str, &str)]) -> Config {
    let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    Config::from_lookup(|k| map.get(k).cloned())
}

async fn wait_until<F: Fn() -> bool>(what: &str, cond: F) {
    let deadline = Instant::now() + Duration::from_secs(3);
    while !cond() {
        if Instant::now() > deadline {
            panic!("timed out waiting for {}", what);
        }
        sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn first_summary_seeds_date_and_refetches_for_it() {
    let api = ScriptedApi::with_assets(&["A", "B"]);
    let dashboard = Dashboard::new(config(&[("VAR_REFRESH_INTERVAL_MS", "3600000")]), Arc::new(api.clone()));
    let handle = dashboard.start();

    wait_until("dated summary fetch", || api.calls().contains(&"summary:2024-05-02".to_string())).await;
    assert!(api.calls().iter().filter(|c| c.as_str() == "summary:latest").count() <= 1);
    assert_eq!(dashboard.selection().date.as_deref(), Some("2024-05-02"));
    handle.shutdown().await;
}

#[tokio::test]
async fn dropped_asset_heals_selection_and_refetches() {
    let api = ScriptedApi::with_assets(&["A", "B"]);
    let dashboard = Dashboard::new(config(&[("VAR_REFRESH_INTERVAL_MS", "40")]), Arc::new(api.clone()));
    let handle = dashboard.start();

    wait_until("summary", || dashboard.snapshot().summary.data.is_some()).await;
    dashboard.select_ric("B");
    dashboard.select_scenario_ric(AGGREGATE_RIC);
    wait_until("timeseries for B", || api.calls().iter().any(|c| c.starts_with("timeseries:B:"))).await;

    api.set_assets(&["A"]);
    wait_until("selection healed", || dashboard.selection().ric == "A").await;
    assert_eq!(dashboard.selection().scenario_ric, AGGREGATE_RIC);
    wait_until("timeseries for A", || api.calls().iter().any(|c| c.starts_with("timeseries:A:"))).await;
    handle.shutdown().await;
}

#[tokio::test]
async fn window_change_fetches_out_of_band() {
    let api = ScriptedApi::with_assets(&["A"]);
    let dashboard = Dashboard::new(config(&[("VAR_REFRESH_INTERVAL_MS", "3600000")]), Arc::new(api.clone()));
    let handle = dashboard.start();

    wait_until("initial timeseries", || api.calls().contains(&"timeseries:ALL_ASSETS:30".to_string())).await;
    dashboard.set_window_days(14);
    wait_until("refetch with new window", || api.calls().contains(&"timeseries:ALL_ASSETS:14".to_string())).await;
    handle.shutdown().await;
}

#[tokio::test]
async fn strict_failure_is_contained_to_its_section() {
    let api = ScriptedApi::with_assets(&["A"]);
    api.fail(Resource::News);
    let dashboard = Dashboard::new(
        config(&[("VAR_REFRESH_INTERVAL_MS", "3600000"), ("VAR_FAILURE_MODE", "strict")]),
        Arc::new(api.clone()),
    );
    let handle = dashboard.start();

    wait_until("news settled", || dashboard.snapshot().news.settled).await;
    wait_until("summary settled", || dashboard.snapshot().summary.settled).await;
    let view = dashboard.view();
    assert!(!view.news_loading);
    assert!(view.news.is_empty());
    assert_eq!(view.errors.len(), 1);
    assert_eq!(view.errors[0].section, "news");
    assert_eq!(view.errors[0].message, "ニュースの取得に失敗しました");
    assert_eq!(view.metrics.len(), 3);
    handle.shutdown().await;
}

#[tokio::test]
async fn resilient_failure_substitutes_sample_data() {
    let api = ScriptedApi::with_assets(&["A"]);
    api.fail(Resource::Scenario);
    let dashboard = Dashboard::new(
        config(&[("VAR_REFRESH_INTERVAL_MS", "3600000"), ("VAR_FAILURE_MODE", "resilient")]),
        Arc::new(api.clone()),
    );
    let handle = dashboard.start();

    wait_until("scenario settled", || dashboard.snapshot().scenario.settled).await;
    let state = dashboard.snapshot();
    assert_eq!(state.scenario.origin, Some(Origin::Sample));
    assert_eq!(state.scenario.data.map(|d| d.values.len()), Some(800));
    assert!(dashboard.view().errors.is_empty());
    handle.shutdown().await;
}

#[tokio::test]
async fn shutdown_stops_all_polling() {
    let api = ScriptedApi::with_assets(&["A"]);
    let dashboard = Dashboard::new(config(&[("VAR_REFRESH_INTERVAL_MS", "20")]), Arc::new(api.clone()));
    let handle = dashboard.start();

    wait_until("a few rounds", || api.calls().iter().filter(|c| c.as_str() == "dates").count() >= 3).await;
    handle.shutdown().await;
    sleep(Duration::from_millis(40)).await;
    let settled = api.calls().len();
    let revision = *dashboard.subscribe().borrow();
    sleep(Duration::from_millis(120)).await;
    assert_eq!(api.calls().len(), settled);
    assert_eq!(*dashboard.subscribe().borrow(), revision);
}
