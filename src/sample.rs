//! Deterministic offline dataset.
//!
//! Used when a live fetch fails in resilient mode and by the sample data source.
//! Same inputs always give the same output; only the `*_at` variants' date anchor
//! moves with the clock.

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::metrics::round_dp;
use crate::types::{
    Asset, DriverContributions, NewsItem, Portfolio, ScenarioDistribution, Summary, TimeSeries,
    TimeSeriesPoint, AGGREGATE_RIC, SCENARIO_WINDOW,
};

pub const SAMPLE_DATE_COUNT: usize = 4;

/// Upper bound on generated series length, about ten years of daily points.
pub const MAX_SERIES_DAYS: i64 = 3650;

/// Series base level for instruments without an entry.
pub const DEFAULT_SERIES_BASE: f64 = 8.0;

const SERIES_BASE: [(&str, f64); 6] = [
    ("JP_EQ_LARGE", 11.2),
    ("US_EQ_TECH", 9.5),
    ("US_RATES_CORE", 8.4),
    ("EU_RATES_CORE", 6.6),
    ("IG_CREDIT_US", 6.0),
    ("MBS_AGENCY", 6.3),
];

pub fn series_base(ric: &str) -> f64 {
    SERIES_BASE
        .iter()
        .find(|(key, _)| *key == ric)
        .map(|(_, base)| *base)
        .unwrap_or(DEFAULT_SERIES_BASE)
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Four consecutive days ending at `today`, most recent first.
pub fn sample_dates_at(today: NaiveDate) -> Vec<String> {
    (0..SAMPLE_DATE_COUNT as i64)
        .map(|offset| format_date(today - Duration::days(offset)))
        .collect()
}

pub fn sample_dates() -> Vec<String> {
    sample_dates_at(today())
}

fn contributions(window_drop: f64, window_add: f64, position_change: f64, ranking_shift: f64) -> DriverContributions {
    DriverContributions {
        window_drop,
        window_add,
        position_change,
        ranking_shift,
    }
}

fn sample_asset(
    ric: &str,
    name: &str,
    category: &str,
    amount: f64,
    change_amount: f64,
    change_pct: f64,
    drivers: DriverContributions,
) -> Asset {
    Asset {
        ric: ric.to_string(),
        name: name.to_string(),
        category: category.to_string(),
        amount,
        change_amount,
        change_pct,
        contributions: drivers,
    }
}

pub fn sample_summary_at(today: NaiveDate) -> Summary {
    Summary {
        as_of: format_date(today),
        portfolio: Portfolio {
            total: 21.8,
            change_amount: 0.7,
            change_pct: 3.3,
            diversification_effect: -5.5,
        },
        assets: vec![
            sample_asset("JP_EQ_LARGE", "日本株式（大型）", "株式", 11.2, 0.5, 4.7, contributions(-0.08, 0.06, 0.25, 0.27)),
            sample_asset("US_EQ_TECH", "米国株式（テック）", "株式", 9.5, -0.2, -2.1, contributions(-0.07, -0.02, -0.07, -0.04)),
            sample_asset("US_RATES_CORE", "米国金利（10Y）", "金利", 8.4, 0.3, 3.6, contributions(0.05, 0.08, 0.1, 0.07)),
            sample_asset("EU_RATES_CORE", "欧州金利", "金利", 6.6, -0.1, -1.4, contributions(-0.03, -0.02, -0.03, -0.02)),
            sample_asset("IG_CREDIT_US", "米国IGクレジット", "クレジット", 6.0, 0.2, 3.2, contributions(0.05, 0.02, 0.08, 0.05)),
            sample_asset("MBS_AGENCY", "エージェンシーMBS", "モーゲージ", 6.3, 0.1, 1.9, contributions(-0.02, 0.01, 0.07, 0.04)),
        ],
        market_signal: None,
        driver_commentary: None,
    }
}

pub fn sample_summary() -> Summary {
    sample_summary_at(today())
}

/// `days` points ending at `today`, oldest first:
/// `value = base(ric) + sin(i/3) * 0.9`, `change = sin(i/3) * 0.25` (none for i = 0).
/// Longer requests are truncated to the most recent `MAX_SERIES_DAYS` points.
pub fn build_sample_series_at(ric: &str, days: u32, today: NaiveDate) -> TimeSeries {
    let base = series_base(ric);
    let days = i64::from(days).min(MAX_SERIES_DAYS);
    let points = (0..days)
        .filter_map(|idx| {
            let date = today.checked_sub_signed(Duration::days(days - idx - 1))?;
            let wave = (idx as f64 / 3.0).sin();
            Some(TimeSeriesPoint {
                date: format_date(date),
                value: round_dp(base + wave * 0.9, 2),
                change: if idx == 0 { None } else { Some(round_dp(wave * 0.25, 2)) },
            })
        })
        .collect();
    TimeSeries {
        ric: ric.to_string(),
        points,
    }
}

pub fn build_sample_series(ric: &str, days: u32) -> TimeSeries {
    build_sample_series_at(ric, days, today())
}

/// Box-Muller over sin-hashed uniforms. Only reproducibility matters here.
pub fn build_sample_scenario_distribution(ric: &str, length: usize) -> ScenarioDistribution {
    // length in UTF-16 units
    let len = ric.encode_utf16().count();
    let sigma = 0.65 + (len % 4) as f64 * 0.05;
    let mu = -2.3 - (len % 3) as f64 * 0.05;
    let offset = len as f64;

    let values = (0..length)
        .map(|idx| {
            let i = idx as f64;
            let u1 = ((i * 12.9898 + offset).sin() + 1.0) / 2.0;
            let u2 = (((i + 0.5) * 78.233 + offset).sin() + 1.0) / 2.0;
            let radius = (-2.0 * u1.max(1e-6).ln()).sqrt();
            let theta = 2.0 * std::f64::consts::PI * u2;
            round_dp(mu + radius * theta.cos() * sigma, 3)
        })
        .collect();

    ScenarioDistribution {
        ric: ric.to_string(),
        values,
    }
}

pub fn default_scenario_distribution() -> ScenarioDistribution {
    build_sample_scenario_distribution(AGGREGATE_RIC, SCENARIO_WINDOW)
}

pub fn sample_news_at(now: DateTime<Utc>) -> Vec<NewsItem> {
    let published_at = now.to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
    vec![
        NewsItem {
            id: "fallback-1".to_string(),
            headline: "日銀、長期金利の許容レンジ拡大を示唆".to_string(),
            published_at: published_at.clone(),
            source: "日本経済新聞".to_string(),
            summary: Some("長期ゾーンのJGB利回りが上昇し、銀行や保険のポジション調整が波及。".to_string()),
        },
        NewsItem {
            id: "fallback-2".to_string(),
            headline: "米CPI鈍化で長期債が続伸、ヘッジ需要も増加".to_string(),
            published_at,
            source: "Bloomberg".to_string(),
            summary: Some("コアCPIが予想を下回り、デュレーション・ヘッジに再び資金が向かう。".to_string()),
        },
    ]
}

pub fn sample_news() -> Vec<NewsItem> {
    sample_news_at(Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn series_is_deterministic() {
        let t = day(2024, 5, 10);
        assert_eq!(build_sample_series_at("JP_EQ_LARGE", 30, t), build_sample_series_at("JP_EQ_LARGE", 30, t));
    }

    #[test]
    fn series_shape_and_dates() {
        let s = build_sample_series_at("JP_EQ_LARGE", 5, day(2024, 5, 10));
        assert_eq!(s.points.len(), 5);
        assert_eq!(s.points[0].date, "2024-05-06");
        assert_eq!(s.points[4].date, "2024-05-10");
        assert_eq!(s.points[0].value, 11.2);
        assert_eq!(s.points[0].change, None);
        assert_eq!(s.points[3].value, round_dp(11.2 + 1.0f64.sin() * 0.9, 2));
        assert_eq!(s.points[3].change, Some(round_dp(1.0f64.sin() * 0.25, 2)));
    }

    #[test]
    fn varying_days_keeps_formula() {
        let t = day(2024, 5, 10);
        let short = build_sample_series_at("US_EQ_TECH", 14, t);
        let long = build_sample_series_at("US_EQ_TECH", 60, t);
        assert_eq!(long.points.len(), 60);
        for (a, b) in short.points.iter().zip(long.points.iter()) {
            assert_eq!(a.value, b.value);
            assert_eq!(a.change, b.change);
        }
        assert_eq!(short.points.last().unwrap().date, long.points.last().unwrap().date);
    }

    #[test]
    fn oversized_window_is_truncated_without_overflow() {
        let t = day(2024, 5, 10);
        let s = build_sample_series_at("X", 100_000_000, t);
        assert_eq!(s.points.len(), MAX_SERIES_DAYS as usize);
        assert_eq!(s.points.last().unwrap().date, "2024-05-10");
        assert_eq!(build_sample_series_at("X", u32::MAX, NaiveDate::MIN).points.len(), 1);
    }

    #[test]
    fn unknown_ric_uses_default_base() {
        let s = build_sample_series_at("NOPE", 1, day(2024, 1, 1));
        assert_eq!(s.points[0].value, DEFAULT_SERIES_BASE);
        assert!(build_sample_series_at("NOPE", 0, day(2024, 1, 1)).points.is_empty());
    }

    #[test]
    fn scenario_distribution_is_reproducible() {
        let a = build_sample_scenario_distribution(AGGREGATE_RIC, SCENARIO_WINDOW);
        let b = build_sample_scenario_distribution(AGGREGATE_RIC, SCENARIO_WINDOW);
        assert_eq!(a.values.len(), 800);
        assert_eq!(a, b);
        assert_eq!(a, default_scenario_distribution());
        assert!(a.values.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn scenario_distribution_depends_on_ric_length() {
        let agg = build_sample_scenario_distribution(AGGREGATE_RIC, 50);
        let other = build_sample_scenario_distribution("JP_EQ_LARGE", 50);
        assert_ne!(agg.values, other.values);
        let mean: f64 = build_sample_scenario_distribution(AGGREGATE_RIC, 800).values.iter().sum::<f64>() / 800.0;
        assert!(mean < 0.0);
    }

    #[test]
    fn sample_summary_is_consistent() {
        let t = day(2024, 5, 10);
        let s = sample_summary_at(t);
        assert_eq!(s.assets.len(), 6);
        assert_eq!(s.as_of, "2024-05-10");
        assert_eq!(sample_dates_at(t), vec!["2024-05-10", "2024-05-09", "2024-05-08", "2024-05-07"]);
        assert!(s.unknown_categories().is_empty());
        for asset in &s.assets {
            assert_eq!(series_base(&asset.ric), asset.amount);
        }
    }

    #[test]
    fn fallback_news_has_two_items() {
        let news = sample_news();
        assert_eq!(news.len(), 2);
        assert_ne!(news[0].id, news[1].id);
    }
}
