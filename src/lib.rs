//! Headless synchronization core for a VaR risk dashboard.
//!
//! Pollers fetch summary, dates, time series, scenario distribution and news
//! from the backend on independent schedules; the dashboard keeps the user's
//! selection consistent with whatever arrived last and composes it all into a
//! render-ready view.

pub mod api;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod export;
pub mod histogram;
pub mod logging;
pub mod metrics;
pub mod poller;
pub mod sample;
pub mod theme;
pub mod types;
