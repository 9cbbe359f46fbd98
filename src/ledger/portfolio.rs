// src/ledger/portfolio.rs
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::errors::{LedgerError, LedgerResult};
use crate::domain::models::{Security, Stock, Transaction, TransactionKind};
use crate::ledger::{ratio, simple_return};

/// Open lot: shares bought together that have not been sold yet
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub depot: String,
    pub date: NaiveDate,
    /// Remaining shares, always positive while the batch exists
    pub shares: Decimal,
    pub price_per_share: Decimal,
    /// The buy plus one synthetic sub-transaction per partial sale
    pub transactions: Vec<Transaction>,
}

impl Batch {
    pub fn invested(&self) -> Decimal {
        self.shares * self.price_per_share
    }
}

/// Outcome of a sale for the realized-gain bookkeeping
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RealizedSale {
    pub simple_return: f64,
    pub profit: Decimal,
}

/// FIFO state of a single security
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioStock {
    pub security: Arc<Security>,
    /// Oldest first
    pub batches: Vec<Batch>,
    pub realized_profit: Decimal,
    pub dividends: Decimal,
}

impl PortfolioStock {
    pub fn new(security: Arc<Security>) -> Self {
        Self {
            security,
            batches: Vec::new(),
            realized_profit: Decimal::ZERO,
            dividends: Decimal::ZERO,
        }
    }

    pub fn shares(&self) -> Decimal {
        self.batches.iter().map(|b| b.shares).sum()
    }

    pub fn invested(&self) -> Decimal {
        self.batches.iter().map(|b| b.invested()).sum()
    }

    /// Weighted average cost of the open batches
    pub fn price_per_share(&self) -> Decimal {
        let shares = self.shares();
        if shares.is_zero() {
            return Decimal::ZERO;
        }
        self.invested() / shares
    }

    /// Shares held in a single depot
    pub fn depot_shares(&self, depot: &str) -> Decimal {
        self.batches
            .iter()
            .filter(|b| b.depot == depot)
            .map(|b| b.shares)
            .sum()
    }

    pub fn add_shares(&mut self, tx: &Transaction) {
        self.batches.push(Batch {
            depot: tx.depot.clone(),
            date: tx.date,
            shares: tx.shares.abs(),
            // negative amount over negative shares
            price_per_share: tx.amount / tx.shares,
            transactions: vec![tx.clone()],
        });
    }

    /// Consume the oldest batches of the transaction's depot.
    ///
    /// The batch list is left untouched when the depot does not hold enough
    /// shares to cover the sale.
    pub fn remove_shares(&mut self, tx: &Transaction) -> LedgerResult<RealizedSale> {
        let available = self.depot_shares(&tx.depot);
        if tx.shares > available {
            return Err(LedgerError::InsufficientShares {
                isin: self.security.isin.clone(),
                depot: tx.depot.clone(),
                date: tx.date,
                requested: tx.shares,
                available,
            });
        }

        let mut to_remove = tx.shares;
        let mut invested = Decimal::ZERO;
        let mut i = 0;

        while to_remove > Decimal::ZERO && i < self.batches.len() {
            if self.batches[i].depot != tx.depot {
                i += 1;
                continue;
            }

            let batch = &mut self.batches[i];
            if to_remove >= batch.shares {
                to_remove -= batch.shares;
                invested += batch.invested();
                self.batches.remove(i);
            } else {
                invested += batch.price_per_share * to_remove;
                batch.shares -= to_remove;
                batch.transactions.push(Transaction {
                    date: tx.date,
                    amount: tx.amount / tx.shares * to_remove,
                    shares: to_remove,
                    depot: tx.depot.clone(),
                    security: tx.security.clone(),
                });
                to_remove = Decimal::ZERO;
            }
        }

        let profit = tx.amount - invested;
        self.realized_profit += profit;

        Ok(RealizedSale {
            simple_return: simple_return(invested, tx.amount),
            profit,
        })
    }

    /// Book a cash dividend and return its yield on the invested capital
    pub fn add_dividend(&mut self, tx: &Transaction) -> f64 {
        self.dividends += tx.amount;
        dividend_yield(self.invested(), tx.amount)
    }
}

fn dividend_yield(invested: Decimal, amount: Decimal) -> f64 {
    if invested.is_zero() {
        return 0.0;
    }
    ratio(amount, invested)
}

/// Ledger of every security, keyed by ISIN.
///
/// Cloning is cheap: stocks are shared until one of the clones changes them,
/// so snapshots handed out earlier never observe later mutations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Portfolio {
    stocks: BTreeMap<String, Arc<PortfolioStock>>,
}

impl Portfolio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replay every stock's transactions in their recorded order
    pub fn build(stocks: &[Stock]) -> LedgerResult<Self> {
        let mut portfolio = Portfolio::new();
        for stock in stocks {
            for tx in &stock.transactions {
                portfolio.apply(tx)?;
            }
        }
        Ok(portfolio)
    }

    pub fn get(&self, isin: &str) -> Option<&PortfolioStock> {
        self.stocks.get(isin).map(|ps| ps.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &PortfolioStock> {
        self.stocks.values().map(|ps| ps.as_ref())
    }

    pub fn len(&self) -> usize {
        self.stocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stocks.is_empty()
    }

    pub fn invested(&self) -> Decimal {
        self.iter().map(|ps| ps.invested()).sum()
    }

    pub fn realized_profit(&self) -> Decimal {
        self.iter().map(|ps| ps.realized_profit).sum()
    }

    pub fn dividends(&self) -> Decimal {
        self.iter().map(|ps| ps.dividends).sum()
    }

    /// Market value of all positions with shares left, priced at `date`
    pub fn value<P>(&self, price: &P, date: NaiveDate) -> Decimal
    where
        P: Fn(&Security, NaiveDate) -> Decimal + ?Sized,
    {
        self.iter()
            .filter_map(|ps| {
                let shares = ps.shares();
                (shares > Decimal::ZERO).then(|| price(&ps.security, date) * shares)
            })
            .sum()
    }

    pub fn add_shares(&mut self, tx: &Transaction) {
        let entry = self
            .stocks
            .entry(tx.security.isin.clone())
            .or_insert_with(|| Arc::new(PortfolioStock::new(tx.security.clone())));
        Arc::make_mut(entry).add_shares(tx);
    }

    pub fn remove_shares(&mut self, tx: &Transaction) -> LedgerResult<RealizedSale> {
        self.stock_mut(tx)?.remove_shares(tx)
    }

    pub fn add_dividend(&mut self, tx: &Transaction) -> LedgerResult<f64> {
        Ok(self.stock_mut(tx)?.add_dividend(tx))
    }

    /// Dispatch on the share sign and discard the per-transaction result
    pub fn apply(&mut self, tx: &Transaction) -> LedgerResult<()> {
        match tx.kind() {
            TransactionKind::Sell => self.remove_shares(tx).map(|_| ()),
            TransactionKind::Buy => {
                self.add_shares(tx);
                Ok(())
            }
            TransactionKind::Dividend => self.add_dividend(tx).map(|_| ()),
        }
    }

    fn stock_mut(&mut self, tx: &Transaction) -> LedgerResult<&mut PortfolioStock> {
        self.stocks
            .get_mut(&tx.security.isin)
            .map(Arc::make_mut)
            .ok_or_else(|| LedgerError::StockNotInPortfolio {
                isin: tx.security.isin.clone(),
            })
    }
}
