//! Headline metrics for the summary cards.

use serde::Serialize;

use crate::types::Summary;

pub const PORTFOLIO_LABEL: &str = "ポートフォリオVaR";
pub const LARGEST_ASSET_LABEL: &str = "最大寄与資産";
pub const DIVERSIFICATION_LABEL: &str = "分散効果";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSummary {
    pub label: String,
    pub value: f64,
    pub delta: f64,
    pub change: f64,
}

impl MetricSummary {
    fn new(label: &str, value: f64, delta: f64, change: f64) -> Self {
        Self {
            label: label.to_string(),
            value,
            delta,
            change,
        }
    }

    /// `"+5.10%"` style badge.
    pub fn change_badge(&self) -> String {
        format!("{}{:.2}%", sign(self.change), self.change)
    }

    /// `"+0.70"` style day-over-day difference.
    pub fn delta_text(&self) -> String {
        format!("{}{:.2}", sign(self.delta), self.delta)
    }
}

fn sign(v: f64) -> &'static str {
    if v >= 0.0 {
        "+"
    } else {
        ""
    }
}

/// Portfolio total, first-listed asset, diversification effect; always in that
/// order. The asset list is taken as given: "largest" is only literal when the
/// caller pre-sorted it.
///
/// The diversification entry carries the effect as both value and delta.
pub fn build_metrics(summary: &Summary) -> [MetricSummary; 3] {
    let portfolio = &summary.portfolio;
    let primary = summary.assets.first();
    [
        MetricSummary::new(
            PORTFOLIO_LABEL,
            portfolio.total,
            portfolio.change_amount,
            portfolio.change_pct,
        ),
        MetricSummary::new(
            LARGEST_ASSET_LABEL,
            primary.map(|a| a.amount).unwrap_or(0.0),
            primary.map(|a| a.change_amount).unwrap_or(0.0),
            primary.map(|a| a.change_pct).unwrap_or(0.0),
        ),
        MetricSummary::new(
            DIVERSIFICATION_LABEL,
            portfolio.diversification_effect,
            portfolio.diversification_effect,
            portfolio.change_pct,
        ),
    ]
}

/// Round to `decimals` places through decimal formatting, so the stored value
/// matches the digits a fixed-precision display shows.
pub fn round_dp(value: f64, decimals: usize) -> f64 {
    format!("{:.*}", decimals, value).parse().unwrap_or(value)
}
