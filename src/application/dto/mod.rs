// src/application/dto/mod.rs
// Serializable report shapes handed to the presentation layer

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::models::{Security, Transaction};
use crate::ledger::{Batch, PortfolioStock, Stats, StatsKind};
use crate::performance::{Performance, Performances};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockDto {
    pub name: String,
    pub isin: String,
    pub symbol: Option<String>,
}

impl From<&Security> for StockDto {
    fn from(security: &Security) -> Self {
        Self {
            name: security.name.clone(),
            isin: security.isin.clone(),
            symbol: security.symbol.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceDto {
    /// `None` when the return is not a finite number
    #[serde(rename = "return")]
    pub simple_return: Option<f64>,
    pub profit: String,
}

impl From<&Performance> for PerformanceDto {
    fn from(performance: &Performance) -> Self {
        Self {
            simple_return: finite(performance.simple_return),
            profit: performance.profit.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformancesDto {
    pub overall: PerformanceDto,
    pub ytd: PerformanceDto,
    pub today: PerformanceDto,
    pub irr: Option<f64>,
}

impl From<&Performances> for PerformancesDto {
    fn from(performances: &Performances) -> Self {
        Self {
            overall: (&performances.overall).into(),
            ytd: (&performances.ytd).into(),
            today: (&performances.today).into(),
            irr: finite(performances.irr),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchDto {
    pub depot: String,
    pub date: String,
    pub shares: String,
    pub price_per_share: String,
    pub invested: String,
    pub value: String,
    pub performances: PerformancesDto,
}

impl BatchDto {
    pub fn new(batch: &Batch, value: Decimal, performances: &Performances) -> Self {
        Self {
            depot: batch.depot.clone(),
            date: format_date(batch.date),
            shares: batch.shares.to_string(),
            price_per_share: batch.price_per_share.to_string(),
            invested: batch.invested().to_string(),
            value: value.to_string(),
            performances: performances.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioStockDto {
    pub stock: StockDto,
    pub batches: Vec<BatchDto>,
    pub invested: String,
    pub value: String,
    pub shares: String,
    pub price_per_share: String,
    pub performances: PerformancesDto,
}

impl PortfolioStockDto {
    /// Value is the invested capital plus the overall profit
    pub fn new(ps: &PortfolioStock, batches: Vec<BatchDto>, performances: &Performances) -> Self {
        Self {
            stock: ps.security.as_ref().into(),
            batches,
            invested: ps.invested().to_string(),
            value: (ps.invested() + performances.overall.profit).to_string(),
            shares: ps.shares().to_string(),
            price_per_share: ps.price_per_share().to_string(),
            performances: performances.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioReport {
    pub stocks: Vec<PortfolioStockDto>,
    pub invested: String,
    pub value: String,
    pub performances: PerformancesDto,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatsDto {
    Buy {
        price_per_share: String,
    },
    Sell {
        #[serde(rename = "return")]
        simple_return: Option<f64>,
        profit: String,
        price_per_share: String,
    },
    Dividend {
        #[serde(rename = "return")]
        simple_return: Option<f64>,
    },
}

impl From<&StatsKind> for StatsDto {
    fn from(kind: &StatsKind) -> Self {
        match kind {
            StatsKind::Buy { price_per_share } => StatsDto::Buy {
                price_per_share: price_per_share.to_string(),
            },
            StatsKind::Sell {
                simple_return,
                profit,
                price_per_share,
            } => StatsDto::Sell {
                simple_return: finite(*simple_return),
                profit: profit.to_string(),
                price_per_share: price_per_share.to_string(),
            },
            StatsKind::Dividend { simple_return } => StatsDto::Dividend {
                simple_return: finite(*simple_return),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionDto {
    pub date: String,
    pub kind: String,
    pub amount: String,
    pub shares: String,
    pub depot: String,
    pub stats: StatsDto,
}

impl TransactionDto {
    pub fn new(tx: &Transaction, stats: &Stats) -> Self {
        Self {
            date: format_date(tx.date),
            kind: tx.kind().to_string(),
            amount: tx.amount.to_string(),
            shares: tx.shares.to_string(),
            depot: tx.depot.clone(),
            stats: (&stats.kind).into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockReport {
    pub stock: StockDto,
    pub transactions: Vec<TransactionDto>,
    pub performances: PerformancesDto,
    pub batches: Vec<BatchDto>,
    pub invested: String,
    pub value: String,
    pub shares: String,
    pub price_per_share: String,
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}
