// src/domain/repository/mod.rs
// Interfaces to the data sources the engine reads from

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::errors::{PriceResult, RepositoryResult};
use crate::domain::models::{Price, Security, Stock};

/// Source of truth for all securities and their transaction histories
#[async_trait]
pub trait StockRepository: Send + Sync {
    /// Every stock with its complete, already-deduplicated transaction list
    async fn stocks(&self) -> RepositoryResult<Vec<Stock>>;
}

/// Remote or local quote source used by the price cache refresh
#[async_trait]
pub trait PriceHistoryProvider: Send + Sync {
    /// Full daily price history of a security, in any order
    async fn history(&self, security: &Security) -> PriceResult<Vec<Price>>;

    /// Latest known quote
    async fn current_price(&self, security: &Security) -> PriceResult<Decimal>;
}
