use async_trait::async_trait;

use crate::api::{FetchResult, VarApi};
use crate::sample;
use crate::types::{NewsItem, ScenarioDistribution, Summary, TimeSeries, SCENARIO_WINDOW};

/// Serves the deterministic sample dataset; no network access.
#[derive(Debug, Default, Clone)]
pub struct SampleVarApi;

impl SampleVarApi {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl VarApi for SampleVarApi {
    async fn fetch_summary(&self, as_of: Option<&str>) -> FetchResult<Summary> {
        let mut summary = sample::sample_summary();
        if let Some(date) = as_of.filter(|d| !d.is_empty()) {
            summary.as_of = date.to_string();
        }
        Ok(summary)
    }

    async fn fetch_dates(&self) -> FetchResult<Vec<String>> {
        Ok(sample::sample_dates())
    }

    async fn fetch_timeseries(&self, ric: &str, days: u32) -> FetchResult<TimeSeries> {
        Ok(sample::build_sample_series(ric, days))
    }

    async fn fetch_scenario_distribution(&self, ric: &str) -> FetchResult<ScenarioDistribution> {
        Ok(sample::build_sample_scenario_distribution(ric, SCENARIO_WINDOW))
    }

    async fn fetch_news(&self, limit: u32) -> FetchResult<Vec<NewsItem>> {
        let mut news = sample::sample_news();
        news.truncate(limit as usize);
        Ok(news)
    }
}
