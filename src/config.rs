use std::path::PathBuf;
use std::time::Duration;

use crate::types::is_window_option;

pub const DEFAULT_API_BASE: &str = "/api/v1";
pub const DEFAULT_API_ORIGIN: &str = "http://localhost:8000";
pub const DEFAULT_NEWS_LIMIT: u32 = 5;
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 60_000;
pub const DEFAULT_WINDOW_DAYS: u32 = 30;

/// What a poller does when a fetch fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// Clear the snapshot and surface an inline error.
    Strict,
    /// Substitute the deterministic sample data and log a warning.
    Resilient,
}

impl FailureMode {
    fn parse(raw: Option<&str>) -> Self {
        match raw.map(|v| v.trim().to_lowercase()).as_deref() {
            Some("resilient") | Some("fallback") => FailureMode::Resilient,
            _ => FailureMode::Strict,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Http,
    Sample,
}

impl DataSource {
    fn parse(raw: Option<&str>) -> Self {
        match raw.map(|v| v.trim().to_lowercase()).as_deref() {
            Some("sample") | Some("preview") => DataSource::Sample,
            _ => DataSource::Http,
        }
    }
}

/// How late responses are filtered before they are committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleGuard {
    /// Only responses arriving after teardown are dropped.
    Teardown,
    /// Additionally drop a response older than one already applied.
    Monotonic,
}

impl StaleGuard {
    fn parse(raw: Option<&str>) -> Self {
        match raw.map(|v| v.trim().to_lowercase()).as_deref() {
            Some("teardown") => StaleGuard::Teardown,
            _ => StaleGuard::Monotonic,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base: String,
    pub api_origin: String,
    pub news_limit: u32,
    pub refresh_interval_ms: u64,
    pub window_days: u32,
    pub failure_mode: FailureMode,
    pub data_source: DataSource,
    pub stale_guard: StaleGuard,
    pub http_timeout_secs: u64,
    pub theme_file: PathBuf,
    pub prefers_dark: bool,
    pub export_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let refresh_interval_ms = lookup("VAR_REFRESH_INTERVAL_MS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .unwrap_or(DEFAULT_REFRESH_INTERVAL_MS);
        Self {
            api_base: lookup("VAR_API_BASE_URL")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            api_origin: lookup("VAR_API_ORIGIN").unwrap_or_else(|| DEFAULT_API_ORIGIN.to_string()),
            news_limit: lookup("VAR_NEWS_LIMIT").and_then(|v| v.trim().parse().ok()).unwrap_or(DEFAULT_NEWS_LIMIT),
            refresh_interval_ms,
            window_days: lookup("VAR_WINDOW_DAYS")
                .and_then(|v| v.trim().parse().ok())
                .filter(|d| is_window_option(*d))
                .unwrap_or(DEFAULT_WINDOW_DAYS),
            failure_mode: FailureMode::parse(lookup("VAR_FAILURE_MODE").as_deref()),
            data_source: DataSource::parse(lookup("VAR_DATA_SOURCE").as_deref()),
            stale_guard: StaleGuard::parse(lookup("VAR_STALE_GUARD").as_deref()),
            http_timeout_secs: lookup("VAR_HTTP_TIMEOUT_SECS").and_then(|v| v.trim().parse().ok()).unwrap_or(10),
            theme_file: lookup("VAR_THEME_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".varwatch-theme.json")),
            prefers_dark: lookup("VAR_PREFERS_COLOR_SCHEME")
                .map(|v| !v.trim().eq_ignore_ascii_case("light"))
                .unwrap_or(true),
            export_dir: lookup("VAR_EXPORT_DIR").filter(|v| !v.is_empty()).map(PathBuf::from),
        }
    }

    /// Absolute API root. An absolute base URL wins; a bare path is joined onto the origin.
    pub fn api_root(&self) -> String {
        let base = self.api_base.trim_end_matches('/');
        if base.starts_with("http://") || base.starts_with("https://") {
            return base.to_string();
        }
        let origin = self.api_origin.trim_end_matches('/');
        if base.starts_with('/') {
            format!("{}{}", origin, base)
        } else {
            format!("{}/{}", origin, base)
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn cfg(pairs: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults() {
        let c = Config::default();
        assert_eq!(c.api_base, "/api/v1");
        assert_eq!(c.api_root(), "http://localhost:8000/api/v1");
        assert_eq!(c.news_limit, 5);
        assert_eq!(c.refresh_interval(), Duration::from_millis(60_000));
        assert_eq!(c.window_days, 30);
        assert_eq!(c.failure_mode, FailureMode::Strict);
        assert_eq!(c.data_source, DataSource::Http);
        assert_eq!(c.stale_guard, StaleGuard::Monotonic);
        assert!(c.prefers_dark);
        assert!(c.export_dir.is_none());
    }

    #[test]
    fn non_numeric_news_limit_falls_back() {
        assert_eq!(cfg(&[("VAR_NEWS_LIMIT", "lots")]).news_limit, 5);
        assert_eq!(cfg(&[("VAR_NEWS_LIMIT", "12")]).news_limit, 12);
    }

    #[test]
    fn zero_interval_falls_back() {
        assert_eq!(cfg(&[("VAR_REFRESH_INTERVAL_MS", "0")]).refresh_interval_ms, 60_000);
        assert_eq!(cfg(&[("VAR_REFRESH_INTERVAL_MS", "abc")]).refresh_interval_ms, 60_000);
        assert_eq!(cfg(&[("VAR_REFRESH_INTERVAL_MS", "1500")]).refresh_interval_ms, 1_500);
    }

    #[test]
    fn window_days_must_be_an_offered_option() {
        assert_eq!(cfg(&[("VAR_WINDOW_DAYS", "60")]).window_days, 60);
        assert_eq!(cfg(&[("VAR_WINDOW_DAYS", "100000000")]).window_days, 30);
        assert_eq!(cfg(&[("VAR_WINDOW_DAYS", "0")]).window_days, 30);
    }

    #[test]
    fn absolute_base_url_wins() {
        let c = cfg(&[("VAR_API_BASE_URL", "https://risk.example.com/api/v2/")]);
        assert_eq!(c.api_root(), "https://risk.example.com/api/v2");
        let c = cfg(&[("VAR_API_BASE_URL", "api/v3"), ("VAR_API_ORIGIN", "http://10.0.0.5:9000/")]);
        assert_eq!(c.api_root(), "http://10.0.0.5:9000/api/v3");
    }

    #[test]
    fn modes_parse() {
        let c = cfg(&[
            ("VAR_FAILURE_MODE", "Resilient"),
            ("VAR_DATA_SOURCE", "sample"),
            ("VAR_STALE_GUARD", "teardown"),
            ("VAR_PREFERS_COLOR_SCHEME", "light"),
        ]);
        assert_eq!(c.failure_mode, FailureMode::Resilient);
        assert_eq!(c.data_source, DataSource::Sample);
        assert_eq!(c.stale_guard, StaleGuard::Teardown);
        assert!(!c.prefers_dark);
    }
}
