pub mod mock;

use crate::domain::stock::{HistoryPoint, StockSnapshot};

/// Symbol-keyed market data: the listing and an ordered price series per symbol.
#[async_trait::async_trait]
pub trait StockDataSource: Send + Sync {
    fn source_name(&self) -> &'static str;

    async fn list_stocks(&self) -> anyhow::Result<Vec<StockSnapshot>>;

    /// Oldest point first.
    async fn get_history(&self, symbol: &str) -> anyhow::Result<Vec<HistoryPoint>>;

    async fn find_stock(&self, symbol: &str) -> anyhow::Result<Option<StockSnapshot>> {
        let symbol = symbol.trim();
        Ok(self
            .list_stocks()
            .await?
            .into_iter()
            .find(|s| s.symbol.eq_ignore_ascii_case(symbol)))
    }

    /// Listing order is kept. A blank query matches everything.
    async fn search_stocks(&self, query: &str) -> anyhow::Result<Vec<StockSnapshot>> {
        let stocks = self.list_stocks().await?;
        Ok(stocks
            .into_iter()
            .filter(|s| matches_query(s, query))
            .collect())
    }
}

/// Case-insensitive substring match on symbol or name.
pub fn matches_query(stock: &StockSnapshot, query: &str) -> bool {
    let query = query.trim().to_lowercase();
    query.is_empty()
        || stock.symbol.to_lowercase().contains(&query)
        || stock.name.to_lowercase().contains(&query)
}
