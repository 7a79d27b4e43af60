use serde::{Deserialize, Serialize};

/// Point-in-time record of one listed equity, as shown on the dashboard and fed to the analyst.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockSnapshot {
    pub symbol: String,
    pub name: String,
    pub sector: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub pe: f64,
    pub pbv: f64,
    /// Percent.
    pub dividend_yield: f64,
    /// Display string, e.g. "985B".
    pub market_cap: String,
    pub volume: String,
    /// Relative Strength Index, 0..=100.
    pub rsi: f64,
    pub description: String,
    pub latest_news: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    /// Display label (Thai short date), not a parseable date.
    pub date: String,
    pub price: f64,
}
