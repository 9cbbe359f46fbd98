// src/application/usecase/refresh_usecase.rs
// Pull fresh quotes for every stock in the ledger into the price cache

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::sync::Arc;

use crate::domain::errors::AppResult;
use crate::domain::repository::StockRepository;
use crate::price::PriceCache;

#[async_trait]
pub trait PriceRefreshUseCase {
    /// Reload full histories, then record today's quotes on top
    async fn refresh(&self, today: NaiveDate) -> AppResult<()>;
}

pub struct PriceRefresher {
    repository: Arc<dyn StockRepository>,
    prices: Arc<PriceCache>,
}

impl PriceRefresher {
    pub fn new(repository: Arc<dyn StockRepository>, prices: Arc<PriceCache>) -> Self {
        Self { repository, prices }
    }

    pub async fn refresh_now(&self) -> AppResult<()> {
        self.refresh(Utc::now().date_naive()).await
    }
}

#[async_trait]
impl PriceRefreshUseCase for PriceRefresher {
    async fn refresh(&self, today: NaiveDate) -> AppResult<()> {
        let stocks = self.repository.stocks().await?;
        log::info!("Refreshing prices for {} stocks", stocks.len());

        self.prices.update_history(&stocks).await?;
        self.prices.update_current(&stocks, today).await?;

        Ok(())
    }
}
