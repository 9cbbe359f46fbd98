// src/infrastructure/repository/mod.rs
// Ledger sources: a JSON document on disk and an in-memory list

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::domain::errors::{RepositoryError, RepositoryResult};
use crate::domain::models::{Security, Stock};
use crate::domain::repository::StockRepository;

#[derive(Debug, Deserialize)]
struct LedgerFile {
    stocks: Vec<StockEntry>,
}

#[derive(Debug, Deserialize)]
struct StockEntry {
    name: String,
    #[serde(default)]
    symbol: Option<String>,
    isin: String,
    #[serde(default)]
    transactions: Vec<TransactionEntry>,
}

#[derive(Debug, Deserialize)]
struct TransactionEntry {
    date: NaiveDate,
    amount: String,
    shares: String,
    #[serde(default)]
    depot: String,
}

/// Parse a ledger document.
///
/// Amounts and share counts are decimal strings so that no precision is lost
/// on the way in. An empty symbol counts as no symbol.
pub fn parse_ledger(contents: &str) -> RepositoryResult<Vec<Stock>> {
    let file: LedgerFile = serde_json::from_str(contents)?;

    file.stocks
        .into_iter()
        .map(|entry| {
            let symbol = entry.symbol.as_deref().filter(|s| !s.is_empty());
            let mut stock = Stock::new(Security::new(&entry.name, symbol, &entry.isin));
            for tx in entry.transactions {
                let amount = parse_decimal(&tx.amount, "amount", &entry.isin)?;
                let shares = parse_decimal(&tx.shares, "shares", &entry.isin)?;
                stock.add_transaction(tx.date, amount, shares, &tx.depot);
            }
            Ok(stock)
        })
        .collect()
}

fn parse_decimal(value: &str, field: &str, isin: &str) -> RepositoryResult<Decimal> {
    Decimal::from_str(value.trim()).map_err(|e| {
        RepositoryError::Parse(format!("Invalid {} {:?} for {}: {}", field, value, isin, e))
    })
}

/// Reads the whole ledger from a JSON file on every call
pub struct JsonLedgerRepository {
    path: PathBuf,
}

impl JsonLedgerRepository {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl StockRepository for JsonLedgerRepository {
    async fn stocks(&self) -> RepositoryResult<Vec<Stock>> {
        let contents = tokio::fs::read_to_string(&self.path).await?;
        let stocks = parse_ledger(&contents)?;
        log::debug!("Loaded {} stocks from {}", stocks.len(), self.path.display());
        Ok(stocks)
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    stocks: Vec<Stock>,
}

impl InMemoryRepository {
    pub fn new(stocks: Vec<Stock>) -> Self {
        Self { stocks }
    }
}

#[async_trait]
impl StockRepository for InMemoryRepository {
    async fn stocks(&self) -> RepositoryResult<Vec<Stock>> {
        Ok(self.stocks.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::date;
    use rust_decimal_macros::dec;

    const LEDGER: &str = r#"{
        "stocks": [
            {
                "name": "Tesla",
                "symbol": "TSLA",
                "isin": "US88160R1014",
                "transactions": [
                    { "date": "2020-01-02", "amount": "-1000.50", "shares": "-10", "depot": "A" },
                    { "date": "2020-06-01", "amount": "12.3", "shares": "0", "depot": "A" }
                ]
            },
            { "name": "Cash fund", "symbol": "", "isin": "LU0000000000" }
        ]
    }"#;

    #[test]
    fn parses_stocks_and_transactions() {
        let stocks = parse_ledger(LEDGER).unwrap();
        assert_eq!(stocks.len(), 2);

        let tesla = &stocks[0];
        assert_eq!(tesla.security.symbol.as_deref(), Some("TSLA"));
        assert_eq!(tesla.transactions.len(), 2);
        assert_eq!(tesla.transactions[0].date, date(2020, 1, 2));
        assert_eq!(tesla.transactions[0].amount, dec!(-1000.50));
        assert_eq!(tesla.transactions[1].shares, Decimal::ZERO);

        assert_eq!(stocks[1].security.symbol, None);
        assert!(stocks[1].transactions.is_empty());
    }

    #[test]
    fn rejects_bad_numbers() {
        let ledger = r#"{"stocks":[{"name":"X","isin":"X1","transactions":[
            {"date":"2020-01-02","amount":"ten","shares":"-1","depot":"A"}]}]}"#;
        assert!(matches!(parse_ledger(ledger), Err(RepositoryError::Parse(_))));
        assert!(matches!(parse_ledger("{"), Err(RepositoryError::InvalidFormat(_))));
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let repo = JsonLedgerRepository::new("/nonexistent/ledger.json");
        assert!(matches!(repo.stocks().await, Err(RepositoryError::Io(_))));
    }
}
