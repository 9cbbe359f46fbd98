// src/infrastructure/price/mod.rs
// Price history sources for the cache refresh

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::domain::errors::{PriceError, PriceResult};
use crate::domain::models::{Price, Security};
use crate::domain::repository::PriceHistoryProvider;

#[derive(Debug, Deserialize)]
struct QuoteEntry {
    #[serde(default)]
    current: Option<String>,
    #[serde(default)]
    history: Vec<PointEntry>,
}

#[derive(Debug, Deserialize)]
struct PointEntry {
    date: NaiveDate,
    price: String,
}

fn parse_price(value: &str, isin: &str) -> PriceResult<Decimal> {
    Decimal::from_str(value.trim())
        .map_err(|e| PriceError::Provider(format!("Invalid price {:?} for {}: {}", value, isin, e)))
}

/// In-memory quotes, keyed by ISIN
#[derive(Debug, Clone, Default)]
pub struct StaticPriceProvider {
    history: HashMap<String, Vec<Price>>,
    current: HashMap<String, Decimal>,
}

impl StaticPriceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a quotes document of the form
    /// `{"<isin>": {"current": "1.0", "history": [{"date": "...", "price": "..."}]}}`
    pub fn from_json(contents: &str) -> PriceResult<Self> {
        let entries: HashMap<String, QuoteEntry> = serde_json::from_str(contents)
            .map_err(|e| PriceError::Provider(format!("Invalid quotes document: {}", e)))?;

        let mut provider = Self::new();
        for (isin, entry) in entries {
            for point in entry.history {
                let price = parse_price(&point.price, &isin)?;
                provider = provider.with_price(&isin, point.date, price);
            }
            if let Some(current) = entry.current {
                let price = parse_price(&current, &isin)?;
                provider = provider.with_current(&isin, price);
            }
        }
        Ok(provider)
    }

    pub fn with_price(mut self, isin: &str, date: NaiveDate, price: Decimal) -> Self {
        self.history
            .entry(isin.to_string())
            .or_default()
            .push(Price::new(date, price));
        self
    }

    pub fn with_current(mut self, isin: &str, price: Decimal) -> Self {
        self.current.insert(isin.to_string(), price);
        self
    }
}

#[async_trait]
impl PriceHistoryProvider for StaticPriceProvider {
    async fn history(&self, security: &Security) -> PriceResult<Vec<Price>> {
        self.history
            .get(&security.isin)
            .cloned()
            .ok_or_else(|| PriceError::NoData(security.isin.clone()))
    }

    async fn current_price(&self, security: &Security) -> PriceResult<Decimal> {
        if let Some(price) = self.current.get(&security.isin) {
            return Ok(*price);
        }
        // fall back to the latest historical close
        self.history
            .get(&security.isin)
            .and_then(|h| h.iter().max_by_key(|p| p.date))
            .map(|p| p.price)
            .ok_or_else(|| PriceError::NoData(security.isin.clone()))
    }
}

/// Quotes document on disk, re-read on every request so edits are picked up
/// by the next refresh
pub struct JsonPriceProvider {
    path: PathBuf,
}

impl JsonPriceProvider {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    async fn load(&self) -> PriceResult<StaticPriceProvider> {
        let contents = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            PriceError::Provider(format!("Failed to read {}: {}", self.path.display(), e))
        })?;
        StaticPriceProvider::from_json(&contents)
    }
}

#[async_trait]
impl PriceHistoryProvider for JsonPriceProvider {
    async fn history(&self, security: &Security) -> PriceResult<Vec<Price>> {
        self.load().await?.history(security).await
    }

    async fn current_price(&self, security: &Security) -> PriceResult<Decimal> {
        self.load().await?.current_price(security).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::date;
    use rust_decimal_macros::dec;

    const QUOTES: &str = r#"{
        "US88160R1014": {
            "history": [
                { "date": "2020-11-23", "price": "521.849976" },
                { "date": "2020-11-25", "price": "574.000000" }
            ]
        },
        "US0378331005": { "current": "118.03", "history": [] }
    }"#;

    #[tokio::test]
    async fn serves_history_and_current_prices() {
        let provider = StaticPriceProvider::from_json(QUOTES).unwrap();
        let tesla = Security::new("Tesla", Some("TSLA"), "US88160R1014");
        let apple = Security::new("Apple", Some("AAPL"), "US0378331005");

        let history = provider.history(&tesla).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(provider.current_price(&tesla).await.unwrap(), dec!(574.000000));
        assert_eq!(provider.current_price(&apple).await.unwrap(), dec!(118.03));
    }

    #[tokio::test]
    async fn unknown_security_has_no_data() {
        let provider = StaticPriceProvider::new().with_price("X1", date(2020, 1, 1), dec!(1));
        let other = Security::new("Other", None, "X2");
        assert!(matches!(provider.history(&other).await, Err(PriceError::NoData(_))));
    }

    #[test]
    fn rejects_bad_prices() {
        let quotes = r#"{"X1": {"history": [{"date": "2020-01-01", "price": "n/a"}]}}"#;
        assert!(matches!(
            StaticPriceProvider::from_json(quotes),
            Err(PriceError::Provider(_))
        ));
    }
}
