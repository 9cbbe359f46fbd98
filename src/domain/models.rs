// src/domain/models.rs
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Identity of a tradable security. Shared by every transaction of the stock.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Security {
    pub name: String,
    pub symbol: Option<String>,
    pub isin: String,
}

impl Security {
    pub fn new(name: &str, symbol: Option<&str>, isin: &str) -> Self {
        Self {
            name: name.to_string(),
            symbol: symbol.map(|s| s.to_string()),
            isin: isin.to_string(),
        }
    }
}

impl fmt::Display for Security {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.symbol {
            Some(symbol) => write!(f, "{} ({}, {})", self.name, symbol, self.isin),
            None => write!(f, "{} ({})", self.name, self.isin),
        }
    }
}

/// A security together with its ordered transaction history
#[derive(Debug, Clone)]
pub struct Stock {
    pub security: Arc<Security>,
    pub transactions: Vec<Transaction>,
}

impl Stock {
    pub fn new(security: Security) -> Self {
        Self {
            security: Arc::new(security),
            transactions: Vec::new(),
        }
    }

    pub fn isin(&self) -> &str {
        &self.security.isin
    }

    /// Record a transaction against this stock.
    ///
    /// Negative `shares` buys, positive `shares` sells, zero is a dividend.
    pub fn add_transaction(&mut self, date: NaiveDate, amount: Decimal, shares: Decimal, depot: &str) {
        self.transactions.push(Transaction {
            date,
            amount,
            shares,
            depot: depot.to_string(),
            security: self.security.clone(),
        });
    }

    pub fn with_transaction(mut self, date: NaiveDate, amount: Decimal, shares: Decimal, depot: &str) -> Self {
        self.add_transaction(date, amount, shares, depot);
        self
    }
}

/// Immutable ledger fact.
///
/// Sign convention: negative shares are acquired (cash outflow, negative
/// amount), positive shares are disposed of (cash inflow), zero shares is a
/// cash dividend.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub date: NaiveDate,
    pub amount: Decimal,
    pub shares: Decimal,
    pub depot: String,
    pub security: Arc<Security>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    Buy,
    Sell,
    Dividend,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Buy => "BUY",
            TransactionKind::Sell => "SELL",
            TransactionKind::Dividend => "DIVIDEND",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Transaction {
    pub fn kind(&self) -> TransactionKind {
        if self.shares > Decimal::ZERO {
            TransactionKind::Sell
        } else if self.shares < Decimal::ZERO {
            TransactionKind::Buy
        } else {
            TransactionKind::Dividend
        }
    }

    /// Amount per share; zero for dividends
    pub fn price_per_share(&self) -> Decimal {
        if self.shares.is_zero() {
            return Decimal::ZERO;
        }
        self.amount / self.shares
    }
}

/// Keep only the transactions booked in `depot`
pub fn for_depot(transactions: &[Transaction], depot: &str) -> Vec<Transaction> {
    transactions
        .iter()
        .filter(|t| t.depot == depot)
        .cloned()
        .collect()
}

/// Historical price point
#[derive(Debug, Clone, PartialEq)]
pub struct Price {
    pub date: NaiveDate,
    pub price: Decimal,
}

impl Price {
    pub fn new(date: NaiveDate, price: Decimal) -> Self {
        Self { date, price }
    }
}

#[cfg(test)]
pub(crate) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn kind_follows_share_sign() {
        let stock = Stock::new(Security::new("Tesla", Some("TSLA"), "US88160R1014"))
            .with_transaction(date(2020, 1, 2), dec!(-1000), dec!(-10), "A")
            .with_transaction(date(2020, 2, 3), dec!(600), dec!(5), "A")
            .with_transaction(date(2020, 3, 4), dec!(12.5), dec!(0), "A");

        let kinds: Vec<_> = stock.transactions.iter().map(|t| t.kind()).collect();
        assert_eq!(
            kinds,
            vec![TransactionKind::Buy, TransactionKind::Sell, TransactionKind::Dividend]
        );
        assert_eq!(stock.transactions[0].price_per_share(), dec!(100));
        assert_eq!(stock.transactions[2].price_per_share(), Decimal::ZERO);
    }

    #[test]
    fn transactions_share_the_stock_identity() {
        let stock = Stock::new(Security::new("Tesla", None, "US88160R1014"))
            .with_transaction(date(2020, 1, 2), dec!(-1000), dec!(-10), "A");

        assert!(Arc::ptr_eq(&stock.security, &stock.transactions[0].security));
        assert_eq!(stock.security.to_string(), "Tesla (US88160R1014)");
    }

    #[test]
    fn for_depot_filters() {
        let stock = Stock::new(Security::new("Tesla", None, "US88160R1014"))
            .with_transaction(date(2020, 1, 2), dec!(-1000), dec!(-10), "A")
            .with_transaction(date(2020, 1, 3), dec!(-500), dec!(-5), "B");

        let filtered = for_depot(&stock.transactions, "B");
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].shares, dec!(-5));
    }
}
