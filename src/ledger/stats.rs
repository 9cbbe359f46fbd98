// src/ledger/stats.rs
use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::domain::errors::LedgerResult;
use crate::domain::models::{Stock, Transaction, TransactionKind};
use crate::ledger::portfolio::Portfolio;

/// Per-transaction result of applying it to the ledger
#[derive(Debug, Clone, PartialEq)]
pub enum StatsKind {
    Buy {
        price_per_share: Decimal,
    },
    Sell {
        simple_return: f64,
        profit: Decimal,
        price_per_share: Decimal,
    },
    Dividend {
        simple_return: f64,
    },
}

/// Ledger state immediately after a transaction, plus what the transaction realized
#[derive(Debug, Clone, PartialEq)]
pub struct Stats {
    pub portfolio: Portfolio,
    pub kind: StatsKind,
}

/// Date-ordered transactions and, at the same index, the stats of each one
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    transactions: Vec<Transaction>,
    stats: Vec<Stats>,
}

impl Timeline {
    /// Pool the transactions of all `stocks` and replay them in date order
    pub fn replay(stocks: &[Stock]) -> LedgerResult<Self> {
        let transactions = stocks
            .iter()
            .flat_map(|s| s.transactions.iter().cloned())
            .collect();
        Self::from_transactions(transactions)
    }

    /// Replay an arbitrary transaction list.
    ///
    /// The sort is stable: same-day transactions keep their relative order,
    /// which decides the FIFO order of batches opened on that day.
    pub fn from_transactions(mut transactions: Vec<Transaction>) -> LedgerResult<Self> {
        transactions.sort_by_key(|t| t.date);

        let mut stats: Vec<Stats> = Vec::with_capacity(transactions.len());
        for tx in &transactions {
            let mut portfolio = stats
                .last()
                .map(|s| s.portfolio.clone())
                .unwrap_or_default();

            let kind = match tx.kind() {
                TransactionKind::Sell => {
                    let sale = portfolio.remove_shares(tx)?;
                    StatsKind::Sell {
                        simple_return: sale.simple_return,
                        profit: sale.profit,
                        price_per_share: tx.price_per_share(),
                    }
                }
                TransactionKind::Buy => {
                    portfolio.add_shares(tx);
                    StatsKind::Buy {
                        price_per_share: tx.price_per_share(),
                    }
                }
                TransactionKind::Dividend => StatsKind::Dividend {
                    simple_return: portfolio.add_dividend(tx)?,
                },
            };

            stats.push(Stats { portfolio, kind });
        }

        log::debug!("Replayed {} transactions", transactions.len());

        Ok(Self { transactions, stats })
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn stats(&self) -> &[Stats] {
        &self.stats
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Transaction, &Stats)> {
        self.transactions.iter().zip(self.stats.iter())
    }

    /// Ledger state right after the transaction at `index`
    pub fn snapshot(&self, index: usize) -> Option<&Portfolio> {
        self.stats.get(index).map(|s| &s.portfolio)
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.transactions.first().map(|t| t.date)
    }

    /// Ledger after the whole history, empty for an empty timeline
    pub fn final_portfolio(&self) -> Portfolio {
        self.stats
            .last()
            .map(|s| s.portfolio.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::LedgerError;
    use crate::domain::models::{date, Security};
    use rust_decimal_macros::dec;

    fn tesla() -> Stock {
        Stock::new(Security::new("Tesla", Some("TSLA"), "US88160R1014"))
    }

    fn apple() -> Stock {
        Stock::new(Security::new("Apple", Some("AAPL"), "US0378331005"))
    }

    #[test]
    fn pools_and_sorts_transactions_across_stocks() {
        let tesla = tesla()
            .with_transaction(date(2020, 1, 2), dec!(-1000), dec!(-10), "A")
            .with_transaction(date(2020, 3, 2), dec!(600), dec!(5), "A");
        let apple = apple().with_transaction(date(2020, 2, 1), dec!(-300), dec!(-3), "A");

        let timeline = Timeline::replay(&[tesla, apple]).unwrap();
        let dates: Vec<_> = timeline.transactions().iter().map(|t| t.date).collect();
        assert_eq!(dates, vec![date(2020, 1, 2), date(2020, 2, 1), date(2020, 3, 2)]);

        // second snapshot holds both stocks
        assert_eq!(timeline.snapshot(1).unwrap().len(), 2);
        assert_eq!(timeline.snapshot(0).unwrap().len(), 1);
        assert_eq!(timeline.first_date(), Some(date(2020, 1, 2)));

        match &timeline.stats()[2].kind {
            StatsKind::Sell {
                profit,
                price_per_share,
                simple_return,
            } => {
                assert_eq!(*profit, dec!(100));
                assert_eq!(*price_per_share, dec!(120));
                assert!((simple_return - 0.2).abs() < 1e-12);
            }
            other => panic!("unexpected stats: {:?}", other),
        }
    }

    #[test]
    fn same_day_transactions_keep_their_order() {
        let stock = tesla()
            .with_transaction(date(2020, 1, 5), dec!(-200), dec!(-2), "A")
            .with_transaction(date(2020, 1, 2), dec!(-100), dec!(-1), "A")
            .with_transaction(date(2020, 1, 5), dec!(-300), dec!(-3), "A");

        let timeline = Timeline::replay(&[stock]).unwrap();
        let shares: Vec<_> = timeline.transactions().iter().map(|t| t.shares).collect();
        assert_eq!(shares, vec![dec!(-1), dec!(-2), dec!(-3)]);

        let ps = timeline.final_portfolio();
        let batches = &ps.get("US88160R1014").unwrap().batches;
        assert_eq!(batches[1].price_per_share, dec!(100));
        assert_eq!(batches[1].shares, dec!(2));
        assert_eq!(batches[2].shares, dec!(3));
    }

    #[test]
    fn earlier_snapshots_are_untouched() {
        let stock = tesla()
            .with_transaction(date(2020, 1, 2), dec!(-1000), dec!(-10), "A")
            .with_transaction(date(2020, 2, 2), dec!(1100), dec!(10), "A")
            .with_transaction(date(2020, 3, 2), dec!(5), dec!(0), "A");

        let timeline = Timeline::replay(&[stock]).unwrap();
        let first = timeline.snapshot(0).unwrap().get("US88160R1014").unwrap();
        assert_eq!(first.shares(), dec!(10));
        assert_eq!(first.realized_profit, Decimal::ZERO);

        let last = timeline.snapshot(2).unwrap().get("US88160R1014").unwrap();
        assert_eq!(last.shares(), Decimal::ZERO);
        assert_eq!(last.realized_profit, dec!(100));
        assert_eq!(last.dividends, dec!(5));
        assert_eq!(timeline.stats()[2].kind, StatsKind::Dividend { simple_return: 0.0 });
    }

    #[test]
    fn replay_surfaces_integrity_errors() {
        let stock = tesla()
            .with_transaction(date(2020, 1, 2), dec!(-500), dec!(-5), "A")
            .with_transaction(date(2020, 2, 2), dec!(660), dec!(6), "A");

        let err = Timeline::replay(&[stock]).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientShares { .. }));
    }

    #[test]
    fn empty_history_gives_empty_timeline() {
        let timeline = Timeline::replay(&[tesla()]).unwrap();
        assert!(timeline.is_empty());
        assert!(timeline.final_portfolio().is_empty());
        assert_eq!(timeline.first_date(), None);
    }
}
