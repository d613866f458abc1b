use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{Config, DataSource};
use crate::error::FetchError;
use crate::types::{NewsItem, ScenarioDistribution, Summary, TimeSeries};

mod http;
mod sample;

pub use http::HttpVarApi;
pub use sample::SampleVarApi;

pub type FetchResult<T> = Result<T, FetchError>;

/// The backend contract. One method per polled resource.
#[async_trait]
pub trait VarApi: Send + Sync {
    /// `GET {base}/var/summary[?as_of=<date>]`
    async fn fetch_summary(&self, as_of: Option<&str>) -> FetchResult<Summary>;
    /// `GET {base}/var/dates`, most recent first by convention.
    async fn fetch_dates(&self) -> FetchResult<Vec<String>>;
    /// `GET {base}/var/timeseries?ric=<id>&days=<n>`
    async fn fetch_timeseries(&self, ric: &str, days: u32) -> FetchResult<TimeSeries>;
    /// `GET {base}/var/scenario-distribution?ric=<id>`
    async fn fetch_scenario_distribution(&self, ric: &str) -> FetchResult<ScenarioDistribution>;
    /// `GET {base}/news?limit=<n>`
    async fn fetch_news(&self, limit: u32) -> FetchResult<Vec<NewsItem>>;
}

pub fn build(cfg: &Config) -> Arc<dyn VarApi> {
    match cfg.data_source {
        DataSource::Http => Arc::new(HttpVarApi::new(cfg)),
        DataSource::Sample => Arc::new(SampleVarApi::new()),
    }
}
