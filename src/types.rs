//! Wire types for the VaR backend.
//!
//! Every snapshot is replaced wholesale on a successful fetch; nothing here is
//! patched in place.

use serde::{Deserialize, Serialize};

/// Sentinel instrument identifier meaning "no single-instrument filter".
/// Never appears inside `Summary::assets`.
pub const AGGREGATE_RIC: &str = "ALL_ASSETS";

/// Expected number of simulated P&L values in a scenario distribution.
pub const SCENARIO_WINDOW: usize = 800;

/// Observation windows offered by the time-series selector.
pub const WINDOW_OPTIONS: [u32; 3] = [14, 30, 60];

pub fn is_window_option(days: u32) -> bool {
    WINDOW_OPTIONS.contains(&days)
}

pub fn is_aggregate(ric: &str) -> bool {
    ric == AGGREGATE_RIC
}

/// Day-over-day change attributed to four causes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DriverContributions {
    pub window_drop: f64,
    pub window_add: f64,
    pub position_change: f64,
    pub ranking_shift: f64,
}

impl DriverContributions {
    pub fn sum(&self) -> f64 {
        self.window_drop + self.window_add + self.position_change + self.ranking_shift
    }

    /// Component-wise sum across a set of contributions.
    pub fn total<'a, I>(items: I) -> Self
    where
        I: IntoIterator<Item = &'a DriverContributions>,
    {
        items.into_iter().fold(Self::default(), |acc, c| Self {
            window_drop: acc.window_drop + c.window_drop,
            window_add: acc.window_add + c.window_add,
            position_change: acc.position_change + c.position_change,
            ranking_shift: acc.ranking_shift + c.ranking_shift,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub ric: String,
    pub name: String,
    pub category: String,
    pub amount: f64,
    pub change_amount: f64,
    pub change_pct: f64,
    #[serde(default)]
    pub contributions: DriverContributions,
}

impl Asset {
    pub fn category_kind(&self) -> Option<Category> {
        Category::from_label(&self.category)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    pub total: f64,
    pub change_amount: f64,
    pub change_pct: f64,
    pub diversification_effect: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSignal {
    #[serde(default)]
    pub as_of: String,
    pub score: f64,
    pub label: String,
    pub narrative: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverCommentary {
    pub as_of: String,
    pub technical_summary: String,
    pub news_summary: String,
    #[serde(default)]
    pub driver_totals: DriverContributions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub as_of: String,
    pub portfolio: Portfolio,
    pub assets: Vec<Asset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_signal: Option<MarketSignal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_commentary: Option<DriverCommentary>,
}

impl Summary {
    pub fn contains_ric(&self, ric: &str) -> bool {
        self.assets.iter().any(|a| a.ric == ric)
    }

    pub fn first_ric(&self) -> Option<&str> {
        self.assets.first().map(|a| a.ric.as_str())
    }

    /// Category labels present in the summary that the grouped views cannot place.
    pub fn unknown_categories(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for asset in &self.assets {
            if asset.category_kind().is_none() && !out.contains(&asset.category.as_str()) {
                out.push(asset.category.as_str());
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub date: String,
    pub value: f64,
    #[serde(default)]
    pub change: Option<f64>,
}

/// Oldest-first points for one instrument or the aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub ric: String,
    pub points: Vec<TimeSeriesPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioDistribution {
    pub ric: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub id: String,
    pub headline: String,
    pub published_at: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// The five asset classes the grouped table and contribution chart know about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Equity,
    Rates,
    Credit,
    Mortgage,
    Commodity,
}

impl Category {
    /// Display order.
    pub const ORDER: [Category; 5] = [
        Category::Equity,
        Category::Rates,
        Category::Credit,
        Category::Mortgage,
        Category::Commodity,
    ];

    /// Label as sent by the backend.
    pub fn key(&self) -> &'static str {
        match self {
            Category::Equity => "株式",
            Category::Rates => "金利",
            Category::Credit => "クレジット",
            Category::Mortgage => "モーゲージ",
            Category::Commodity => "コモディティ",
        }
    }

    pub fn display_label(&self) -> &'static str {
        match self {
            Category::Mortgage => "不動産（モーゲージ）",
            other => other.key(),
        }
    }

    /// Exact match on the backend label or the English alias.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "株式" | "equity" => Some(Category::Equity),
            "金利" | "rates" => Some(Category::Rates),
            "クレジット" | "credit" => Some(Category::Credit),
            "モーゲージ" | "mortgage" => Some(Category::Mortgage),
            "コモディティ" | "commodity" => Some(Category::Commodity),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_parses_without_extended_fields() {
        let raw = r#"{
            "as_of": "2024-05-01",
            "portfolio": {"total": 15.0, "change_amount": 1.0, "change_pct": 6.7, "diversification_effect": -2.0},
            "assets": [{
                "ric": "A", "name": "Asset A", "category": "株式",
                "amount": 10.0, "change_amount": 0.4, "change_pct": 4.1,
                "contributions": {"window_drop": 0.1, "window_add": 0.1, "position_change": 0.1, "ranking_shift": 0.1}
            }]
        }"#;
        let summary: Summary = serde_json::from_str(raw).unwrap();
        assert_eq!(summary.assets.len(), 1);
        assert!(summary.market_signal.is_none());
        assert!(summary.driver_commentary.is_none());
        assert_eq!(summary.assets[0].category_kind(), Some(Category::Equity));
    }

    #[test]
    fn first_point_change_may_be_null() {
        let raw = r#"{"ric":"A","points":[{"date":"2024-05-01","value":1.0,"change":null},{"date":"2024-05-02","value":1.2,"change":0.2}]}"#;
        let series: TimeSeries = serde_json::from_str(raw).unwrap();
        assert_eq!(series.points[0].change, None);
        assert_eq!(series.points[1].change, Some(0.2));
    }

    #[test]
    fn category_labels_round_trip_through_order() {
        for cat in Category::ORDER {
            assert_eq!(Category::from_label(cat.key()), Some(cat));
        }
        assert_eq!(Category::from_label("equity"), Some(Category::Equity));
        assert_eq!(Category::from_label("crypto"), None);
        assert_eq!(Category::Mortgage.display_label(), "不動産（モーゲージ）");
    }

    #[test]
    fn contribution_totals_sum_componentwise() {
        let a = DriverContributions { window_drop: 1.0, window_add: 2.0, position_change: 3.0, ranking_shift: 4.0 };
        let b = DriverContributions { window_drop: -0.5, window_add: 0.5, position_change: 0.0, ranking_shift: 1.0 };
        let t = DriverContributions::total([&a, &b]);
        assert_eq!(t.window_drop, 0.5);
        assert_eq!(t.window_add, 2.5);
        assert_eq!(t.ranking_shift, 5.0);
        assert_eq!(t.sum(), 11.0);
    }

    #[test]
    fn unknown_categories_listed_once() {
        let mut asset = Asset {
            ric: "X".into(),
            name: "x".into(),
            category: "crypto".into(),
            amount: 1.0,
            change_amount: 0.0,
            change_pct: 0.0,
            contributions: DriverContributions::default(),
        };
        let mut second = asset.clone();
        second.ric = "Y".into();
        asset.ric = "X".into();
        let summary = Summary {
            as_of: "d".into(),
            portfolio: Portfolio::default(),
            assets: vec![asset, second],
            market_signal: None,
            driver_commentary: None,
        };
        assert_eq!(summary.unknown_categories(), vec!["crypto"]);
        assert!(!is_aggregate("X"));
        assert!(is_aggregate(AGGREGATE_RIC));
    }
}
