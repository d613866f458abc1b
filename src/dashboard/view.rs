//! Composes dashboard state into prepared, render-ready data.
//!
//! Everything here is a pure function of [`DashboardState`]; drawing is left to
//! whatever consumes the [`DashboardView`].

use serde::Serialize;

use crate::histogram::{bin_scenarios, Histogram};
use crate::metrics::{build_metrics, round_dp, MetricSummary, PORTFOLIO_LABEL};
use crate::types::{
    Category, DriverContributions, NewsItem, Summary, TimeSeriesPoint, AGGREGATE_RIC, WINDOW_OPTIONS,
};

use super::rules::Selection;
use super::state::{DashboardState, Origin, ResourceSlot};

pub const AGGREGATE_LABEL: &str = "全資産合算";
pub const TOTAL_ROW_CATEGORY: &str = "全体";
/// Smallest bar drawn for a non-empty row.
pub const MIN_BAR_RATIO: f64 = 0.08;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetOption {
    pub ric: String,
    pub name: String,
}

/// Selector entries: the aggregate first, then every asset in summary order.
pub fn asset_options(summary: Option<&Summary>) -> Vec<AssetOption> {
    let mut options = vec![AssetOption {
        ric: AGGREGATE_RIC.to_string(),
        name: AGGREGATE_LABEL.to_string(),
    }];
    if let Some(summary) = summary {
        options.extend(summary.assets.iter().map(|a| AssetOption {
            ric: a.ric.clone(),
            name: a.name.clone(),
        }));
    }
    options
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetRow {
    pub ric: String,
    pub name: String,
    pub category: String,
    pub amount: f64,
    pub change_amount: f64,
    pub change_pct: f64,
    pub contributions: DriverContributions,
    pub bar_ratio: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetGroup {
    pub category: Category,
    pub label: String,
    pub rows: Vec<AssetRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetTable {
    pub groups: Vec<AssetGroup>,
    pub total: AssetRow,
    pub max_amount: f64,
}

/// `max(0.08, sqrt(amount / max))` with the ratio clamped to `[0, 1]`.
pub fn bar_ratio(amount: f64, max_amount: f64) -> Option<f64> {
    if max_amount <= 0.0 {
        return None;
    }
    let ratio = (amount / max_amount).clamp(0.0, 1.0);
    let ratio = if ratio.is_nan() { 0.0 } else { ratio };
    Some(ratio.sqrt().max(MIN_BAR_RATIO))
}

pub fn build_asset_table(summary: &Summary) -> AssetTable {
    let portfolio = &summary.portfolio;
    let max_amount = summary
        .assets
        .iter()
        .map(|a| a.amount)
        .fold(portfolio.total.max(1.0), f64::max);

    let groups = Category::ORDER
        .iter()
        .filter_map(|&category| {
            let mut members: Vec<_> = summary
                .assets
                .iter()
                .filter(|a| a.category_kind() == Some(category))
                .collect();
            if members.is_empty() {
                return None;
            }
            members.sort_by(|a, b| b.amount.total_cmp(&a.amount));
            Some(AssetGroup {
                category,
                label: category.display_label().to_string(),
                rows: members
                    .into_iter()
                    .map(|a| AssetRow {
                        ric: a.ric.clone(),
                        name: a.name.clone(),
                        category: category.display_label().to_string(),
                        amount: a.amount,
                        change_amount: a.change_amount,
                        change_pct: a.change_pct,
                        contributions: a.contributions,
                        bar_ratio: bar_ratio(a.amount, max_amount),
                    })
                    .collect(),
            })
        })
        .collect();

    let total = AssetRow {
        ric: AGGREGATE_RIC.to_string(),
        name: AGGREGATE_LABEL.to_string(),
        category: TOTAL_ROW_CATEGORY.to_string(),
        amount: portfolio.total,
        change_amount: portfolio.change_amount,
        change_pct: portfolio.change_pct,
        contributions: DriverContributions::total(summary.assets.iter().map(|a| &a.contributions)),
        bar_ratio: bar_ratio(portfolio.total, max_amount),
    };

    AssetTable {
        groups,
        total,
        max_amount,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContributionSeries {
    pub name: String,
    pub values: Vec<f64>,
}

/// Horizontal waterfall: one column per category plus the portfolio column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContributionChart {
    pub categories: Vec<String>,
    pub category_totals: Vec<f64>,
    /// Invisible base of each column; the portfolio column starts at zero.
    pub offsets: Vec<f64>,
    pub assets: Vec<ContributionSeries>,
    pub portfolio: ContributionSeries,
    /// Sum of standalone asset amounts minus the portfolio total.
    pub diversification_gain: f64,
    pub diversification_effect: f64,
}

impl ContributionChart {
    pub fn footer(&self) -> String {
        format!(
            "分散効果(億円): {:.2} ({:.2})",
            self.diversification_gain, self.diversification_effect
        )
    }
}

pub fn build_contribution_chart(summary: &Summary) -> ContributionChart {
    let portfolio_column = Category::ORDER.len();
    let mut categories: Vec<String> = Category::ORDER
        .iter()
        .map(|c| c.display_label().to_string())
        .collect();
    categories.push(PORTFOLIO_LABEL.to_string());

    let category_totals: Vec<f64> = Category::ORDER
        .iter()
        .map(|&c| {
            summary
                .assets
                .iter()
                .filter(|a| a.category_kind() == Some(c))
                .map(|a| a.amount)
                .sum()
        })
        .collect();

    let mut cumulative = 0.0;
    let mut offsets: Vec<f64> = category_totals
        .iter()
        .map(|total| {
            let current = cumulative;
            cumulative += total;
            round_dp(current, 2)
        })
        .collect();
    offsets.push(0.0);

    let assets = summary
        .assets
        .iter()
        .map(|a| {
            let mut values = vec![0.0; categories.len()];
            if let Some(idx) = a
                .category_kind()
                .and_then(|k| Category::ORDER.iter().position(|&c| c == k))
            {
                values[idx] = round_dp(a.amount, 2);
            }
            ContributionSeries {
                name: a.name.clone(),
                values,
            }
        })
        .collect();

    let mut portfolio_values = vec![0.0; categories.len()];
    portfolio_values[portfolio_column] = round_dp(summary.portfolio.total, 2);

    let asset_total: f64 = summary.assets.iter().map(|a| a.amount).sum();
    ContributionChart {
        categories,
        category_totals,
        offsets,
        assets,
        portfolio: ContributionSeries {
            name: PORTFOLIO_LABEL.to_string(),
            values: portfolio_values,
        },
        diversification_gain: asset_total - summary.portfolio.total,
        diversification_effect: summary.portfolio.diversification_effect,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Gauge {
    /// Score clamped to `[0, 100]`.
    pub score: f64,
    pub label: String,
    pub narrative: String,
    pub fill: f64,
    /// Needle rotation in degrees, -90 (cautious) to +90 (bullish).
    pub pointer_deg: f64,
}

impl Gauge {
    pub fn footer(&self) -> String {
        format!("スコア: {:.1}", self.score)
    }
}

pub fn build_gauge(summary: &Summary) -> Option<Gauge> {
    let signal = summary.market_signal.as_ref()?;
    let score = if signal.score.is_finite() { signal.score.clamp(0.0, 100.0) } else { 0.0 };
    Some(Gauge {
        score,
        label: signal.label.clone(),
        narrative: signal.narrative.clone(),
        fill: score / 100.0,
        pointer_deg: score / 100.0 * 180.0 - 90.0,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriverLine {
    pub label: &'static str,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Commentary {
    pub technical_summary: String,
    pub news_summary: String,
    pub drivers: Vec<DriverLine>,
    pub footer: String,
}

pub fn build_commentary(summary: &Summary) -> Option<Commentary> {
    let c = summary.driver_commentary.as_ref()?;
    let t = &c.driver_totals;
    Some(Commentary {
        technical_summary: c.technical_summary.clone(),
        news_summary: c.news_summary.clone(),
        drivers: vec![
            DriverLine { label: "離脱要因", value: t.window_drop },
            DriverLine { label: "追加要因", value: t.window_add },
            DriverLine { label: "ポジション調整", value: t.position_change },
            DriverLine { label: "順位変動", value: t.ranking_shift },
        ],
        footer: format!("対象基準日: {}", c.as_of),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioPanel {
    pub ric: String,
    pub histogram: Histogram,
    pub footer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionError {
    pub section: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub as_of: Option<String>,
    pub selection: Selection,
    pub metrics: Vec<MetricSummary>,
    pub asset_options: Vec<AssetOption>,
    pub window_options: Vec<u32>,
    pub available_dates: Vec<String>,
    pub asset_table: Option<AssetTable>,
    pub contribution: Option<ContributionChart>,
    pub timeseries: Vec<TimeSeriesPoint>,
    pub scenario: Option<ScenarioPanel>,
    pub gauge: Option<Gauge>,
    pub commentary: Option<Commentary>,
    pub news: Vec<NewsItem>,
    pub news_loading: bool,
    pub errors: Vec<SectionError>,
    /// Sections currently showing sample data.
    pub sample_sections: Vec<&'static str>,
}

fn collect_slot<T>(
    section: &'static str,
    slot: &ResourceSlot<T>,
    errors: &mut Vec<SectionError>,
    sample: &mut Vec<&'static str>,
) {
    if let Some(message) = &slot.error {
        errors.push(SectionError {
            section,
            message: message.clone(),
        });
    }
    if slot.origin == Some(Origin::Sample) {
        sample.push(section);
    }
}

pub fn compose(state: &DashboardState) -> DashboardView {
    let summary = state.summary.data.as_ref();

    let mut errors = Vec::new();
    let mut sample_sections = Vec::new();
    collect_slot("summary", &state.summary, &mut errors, &mut sample_sections);
    collect_slot("dates", &state.dates, &mut errors, &mut sample_sections);
    collect_slot("timeseries", &state.timeseries, &mut errors, &mut sample_sections);
    collect_slot("scenario_distribution", &state.scenario, &mut errors, &mut sample_sections);
    collect_slot("news", &state.news, &mut errors, &mut sample_sections);

    DashboardView {
        as_of: summary.map(|s| s.as_of.clone()),
        selection: state.selection.clone(),
        metrics: summary.map(|s| build_metrics(s).to_vec()).unwrap_or_default(),
        asset_options: asset_options(summary),
        window_options: WINDOW_OPTIONS.to_vec(),
        available_dates: state.dates.data.clone().unwrap_or_default(),
        asset_table: summary.map(build_asset_table),
        contribution: summary.map(build_contribution_chart),
        timeseries: state
            .timeseries
            .data
            .as_ref()
            .map(|ts| ts.points.clone())
            .unwrap_or_default(),
        scenario: state.scenario.data.as_ref().map(|dist| {
            let histogram = bin_scenarios(&dist.values);
            let footer = histogram.footer();
            ScenarioPanel {
                ric: dist.ric.clone(),
                histogram,
                footer,
            }
        }),
        gauge: summary.and_then(build_gauge),
        commentary: summary.and_then(build_commentary),
        news: state.news.data.clone().unwrap_or_default(),
        news_loading: state.news.is_loading(),
        errors,
        sample_sections,
    }
}

impl DashboardView {
    /// Compact terminal rendering, one fact per line.
    pub fn status_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        lines.push(format!(
            "as_of={} ric={} scenario_ric={} window={}d",
            self.as_of.as_deref().unwrap_or("-"),
            self.selection.ric,
            self.selection.scenario_ric,
            self.selection.window_days,
        ));
        for m in &self.metrics {
            lines.push(format!("{}: {:.2} ({}, {})", m.label, m.value, m.delta_text(), m.change_badge()));
        }
        if let Some(chart) = &self.contribution {
            lines.push(chart.footer());
        }
        if let Some(last) = self.timeseries.last() {
            lines.push(format!("時系列: {}点 最新 {} = {:.2}", self.timeseries.len(), last.date, last.value));
        }
        if let Some(panel) = &self.scenario {
            if let Some((idx, count)) = panel.histogram.peak() {
                let label = panel.histogram.labels.get(idx).map(String::as_str).unwrap_or("-");
                lines.push(format!("シナリオ最頻区間: {} ({}件)", label, count));
            }
            lines.push(panel.footer.clone());
        }
        if let Some(gauge) = &self.gauge {
            lines.push(format!("{} {}", gauge.footer(), gauge.label));
        }
        if self.news_loading {
            lines.push("ニュース: 読み込み中".to_string());
        }
        for item in &self.news {
            lines.push(format!("- {} [{}]", item.headline, item.source));
        }
        if !self.sample_sections.is_empty() {
            lines.push(format!("sample: {}", self.sample_sections.join(",")));
        }
        for err in &self.errors {
            lines.push(format!("! {}: {}", err.section, err.message));
        }
        lines
    }
}
