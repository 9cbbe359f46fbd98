// src/application/usecase/report_usecase.rs
// Portfolio and per-stock reports over the ledger and cached prices

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;

use crate::application::dto::{
    BatchDto, PortfolioReport, PortfolioStockDto, StockDto, StockReport, TransactionDto,
};
use crate::domain::errors::{AppError, AppResult};
use crate::domain::models::Stock;
use crate::domain::repository::StockRepository;
use crate::ledger::{Portfolio, PortfolioStock, Timeline};
use crate::performance::{calculate_batch_performances_at, calculate_performances_at};
use crate::price::PriceCache;

#[async_trait]
pub trait ReportUseCase {
    /// Every security in the ledger
    async fn stocks(&self) -> AppResult<Vec<StockDto>>;

    /// Holdings with open shares and their performances, optionally
    /// restricted to the stocks trading under `symbol`
    async fn portfolio_report(&self, symbol: Option<&str>, today: NaiveDate) -> AppResult<PortfolioReport>;

    /// Transactions, performances and open batches of one stock
    async fn stock_report(&self, isin: &str, today: NaiveDate) -> AppResult<StockReport>;
}

pub struct ReportService {
    repository: Arc<dyn StockRepository>,
    prices: Arc<PriceCache>,
}

impl ReportService {
    pub fn new(repository: Arc<dyn StockRepository>, prices: Arc<PriceCache>) -> Self {
        Self { repository, prices }
    }

    /// Portfolio report as of the current UTC date
    pub async fn current_portfolio_report(&self, symbol: Option<&str>) -> AppResult<PortfolioReport> {
        self.portfolio_report(symbol, Utc::now().date_naive()).await
    }

    fn batches(&self, ps: &PortfolioStock, today: NaiveDate) -> AppResult<Vec<BatchDto>> {
        let price = self.prices.price_func();
        let current = self.prices.price(&ps.security, today);

        ps.batches
            .iter()
            .map(|batch| {
                let performances = calculate_batch_performances_at(&price, batch, today)?;
                Ok(BatchDto::new(batch, current * batch.shares, &performances))
            })
            .collect()
    }

    fn holding(&self, stock: &Stock, ps: &PortfolioStock, today: NaiveDate) -> AppResult<PortfolioStockDto> {
        let timeline = Timeline::replay(std::slice::from_ref(stock))?;
        let performances = calculate_performances_at(&self.prices.price_func(), &timeline, today);
        Ok(PortfolioStockDto::new(ps, self.batches(ps, today)?, &performances))
    }
}

/// Transactions in the order they were recorded on the stock, each paired
/// with the stats of its replay
fn recorded_transactions(stock: &Stock, timeline: &Timeline) -> Vec<TransactionDto> {
    // same stable date sort as the replay, inverted
    let mut replayed: Vec<usize> = (0..stock.transactions.len()).collect();
    replayed.sort_by_key(|&i| stock.transactions[i].date);
    let mut position = vec![0; replayed.len()];
    for (k, &i) in replayed.iter().enumerate() {
        position[i] = k;
    }

    stock
        .transactions
        .iter()
        .zip(position)
        .filter_map(|(tx, k)| timeline.stats().get(k).map(|stats| TransactionDto::new(tx, stats)))
        .collect()
}

#[async_trait]
impl ReportUseCase for ReportService {
    async fn stocks(&self) -> AppResult<Vec<StockDto>> {
        let stocks = self.repository.stocks().await?;
        Ok(stocks.iter().map(|s| s.security.as_ref().into()).collect())
    }

    async fn portfolio_report(&self, symbol: Option<&str>, today: NaiveDate) -> AppResult<PortfolioReport> {
        let mut stocks = self.repository.stocks().await?;
        if let Some(symbol) = symbol {
            // first stock trading under the symbol
            stocks = stocks
                .into_iter()
                .find(|s| s.security.symbol.as_deref() == Some(symbol))
                .into_iter()
                .collect();
        }

        let portfolio = Portfolio::build(&stocks)?;
        let timeline = Timeline::replay(&stocks)?;
        let performances = calculate_performances_at(&self.prices.price_func(), &timeline, today);

        let mut holdings = Vec::new();
        for stock in &stocks {
            let Some(ps) = portfolio.get(stock.isin()) else {
                continue;
            };
            if ps.shares() <= Decimal::ZERO {
                continue;
            }
            holdings.push(self.holding(stock, ps, today)?);
        }
        log::debug!("Portfolio report: {} holdings as of {}", holdings.len(), today);

        Ok(PortfolioReport {
            stocks: holdings,
            invested: portfolio.invested().to_string(),
            value: (portfolio.invested() + performances.overall.profit).to_string(),
            performances: (&performances).into(),
        })
    }

    async fn stock_report(&self, isin: &str, today: NaiveDate) -> AppResult<StockReport> {
        let stocks = self.repository.stocks().await?;
        let stock = stocks
            .iter()
            .find(|s| s.isin() == isin)
            .ok_or_else(|| AppError::NotFound(format!("Stock {}", isin)))?;

        let timeline = Timeline::replay(std::slice::from_ref(stock))?;
        let performances = calculate_performances_at(&self.prices.price_func(), &timeline, today);
        let transactions = recorded_transactions(stock, &timeline);

        let portfolio = timeline.final_portfolio();
        let empty = PortfolioStock::new(stock.security.clone());
        let ps = portfolio.get(isin).unwrap_or(&empty);
        let current = self.prices.price(&stock.security, today);

        Ok(StockReport {
            stock: stock.security.as_ref().into(),
            transactions,
            performances: (&performances).into(),
            batches: self.batches(ps, today)?,
            invested: ps.invested().to_string(),
            value: (current * ps.shares()).to_string(),
            shares: ps.shares().to_string(),
            price_per_share: ps.price_per_share().to_string(),
        })
    }
}
