use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::api::{FetchResult, VarApi};
use crate::config::Config;
use crate::error::{FetchError, Resource};
use crate::logging::{self, obj, v_str, v_u64, Domain};
use crate::types::{NewsItem, ScenarioDistribution, Summary, TimeSeries};

pub struct HttpVarApi {
    client: Client,
    root: String,
}

impl HttpVarApi {
    pub fn new(cfg: &Config) -> Self {
        Self::with_root(cfg.api_root(), Duration::from_secs(cfg.http_timeout_secs))
    }

    pub fn with_root(root: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: build_client(timeout),
            root: root.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        resource: Resource,
        path: &str,
        query: &[(&str, String)],
    ) -> FetchResult<T> {
        let url = format!("{}{}", self.root, path);
        logging::debug(
            Domain::Api,
            "request",
            obj(&[("resource", v_str(resource.as_str())), ("url", v_str(&url))]),
        );
        let mut req = self
            .client
            .get(&url)
            .header(reqwest::header::CACHE_CONTROL, "no-store");
        if !query.is_empty() {
            req = req.query(query);
        }
        let resp = req
            .send()
            .await
            .map_err(|source| FetchError::Transport { resource, source })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                resource,
                status: status.as_u16(),
            });
        }

        let body = resp
            .text()
            .await
            .map_err(|source| FetchError::Transport { resource, source })?;
        logging::trace(
            Domain::Api,
            "response",
            obj(&[
                ("resource", v_str(resource.as_str())),
                ("status", v_u64(status.as_u16() as u64)),
                ("bytes", v_u64(body.len() as u64)),
            ]),
        );
        serde_json::from_str(&body).map_err(|source| FetchError::Decode { resource, source })
    }
}

fn build_client(timeout: Duration) -> Client {
    match Client::builder().timeout(timeout).build() {
        Ok(client) => client,
        Err(err) => {
            logging::warn(
                Domain::Api,
                "client_build_failed",
                obj(&[
                    ("error", v_str(&err.to_string())),
                    ("timeout_ms", v_u64(timeout.as_millis() as u64)),
                ]),
            );
            Client::new()
        }
    }
}

#[async_trait]
impl VarApi for HttpVarApi {
    async fn fetch_summary(&self, as_of: Option<&str>) -> FetchResult<Summary> {
        let query: Vec<(&str, String)> = match as_of {
            Some(date) if !date.is_empty() => vec![("as_of", date.to_string())],
            _ => Vec::new(),
        };
        self.get_json(Resource::Summary, "/var/summary", &query).await
    }

    async fn fetch_dates(&self) -> FetchResult<Vec<String>> {
        self.get_json(Resource::Dates, "/var/dates", &[]).await
    }

    async fn fetch_timeseries(&self, ric: &str, days: u32) -> FetchResult<TimeSeries> {
        self.get_json(
            Resource::TimeSeries,
            "/var/timeseries",
            &[("ric", ric.to_string()), ("days", days.to_string())],
        )
        .await
    }

    async fn fetch_scenario_distribution(&self, ric: &str) -> FetchResult<ScenarioDistribution> {
        self.get_json(
            Resource::Scenario,
            "/var/scenario-distribution",
            &[("ric", ric.to_string())],
        )
        .await
    }

    async fn fetch_news(&self, limit: u32) -> FetchResult<Vec<NewsItem>> {
        self.get_json(Resource::News, "/news", &[("limit", limit.to_string())])
            .await
    }
}
