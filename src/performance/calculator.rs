// src/performance/calculator.rs
use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::domain::errors::LedgerResult;
use crate::domain::models::Security;
use crate::ledger::{simple_return, Batch, Timeline};
use crate::performance::xirr::{self, CashFlow};

/// Simple return and absolute profit over one window
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Performance {
    pub simple_return: f64,
    pub profit: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Performances {
    pub overall: Performance,
    pub ytd: Performance,
    pub today: Performance,
    /// Annualized money-weighted return, NaN when the solver gave up
    pub irr: f64,
}

/// Overall, year-to-date and today's performance as of the current UTC date
pub fn calculate_performances<P>(price: &P, timeline: &Timeline) -> Performances
where
    P: Fn(&Security, NaiveDate) -> Decimal + ?Sized,
{
    calculate_performances_at(price, timeline, Utc::now().date_naive())
}

pub fn calculate_performances_at<P>(price: &P, timeline: &Timeline, today: NaiveDate) -> Performances
where
    P: Fn(&Security, NaiveDate) -> Decimal + ?Sized,
{
    let Some(first) = timeline.first_date() else {
        return Performances::default();
    };
    let jan1 = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today);

    Performances {
        overall: calculate_performance(price, timeline, first, today),
        ytd: calculate_performance(price, timeline, jan1, today),
        today: calculate_performance(price, timeline, today, today),
        irr: calculate_irr(price, timeline, first, today),
    }
}

/// Performances of a single open batch, replaying the buy that opened it
/// and the partial sales recorded on it
pub fn calculate_batch_performances_at<P>(price: &P, batch: &Batch, today: NaiveDate) -> LedgerResult<Performances>
where
    P: Fn(&Security, NaiveDate) -> Decimal + ?Sized,
{
    let timeline = Timeline::from_transactions(batch.transactions.clone())?;
    Ok(calculate_performances_at(price, &timeline, today))
}

/// Performance of the ledger over `[begin, end]`.
///
/// Values the snapshot after the last transaction on or before `end`. Batches
/// opened before `begin` enter the window at their market value on the day
/// before `begin`, batches opened inside it at their cost.
pub fn calculate_performance<P>(
    price: &P,
    timeline: &Timeline,
    begin: NaiveDate,
    end: NaiveDate,
) -> Performance
where
    P: Fn(&Security, NaiveDate) -> Decimal + ?Sized,
{
    let Some((_, b)) = select_transactions(timeline, begin, end) else {
        return Performance::default();
    };
    let Some(portfolio) = timeline.snapshot(b - 1) else {
        return Performance::default();
    };
    if portfolio.invested().is_zero() {
        return Performance::default();
    }

    let value = portfolio.value(price, end);
    let day_before = day_before(begin);

    let mut invested = Decimal::ZERO;
    for ps in portfolio.iter() {
        for batch in &ps.batches {
            if batch.date < begin {
                invested += price(&ps.security, day_before) * batch.shares;
            } else {
                invested += batch.invested();
            }
        }
    }

    Performance {
        simple_return: simple_return(invested, value),
        profit: value - invested,
    }
}

/// Annualized money-weighted return over `[begin, end]`.
///
/// The position held before the window is bought at `begin` for its value on
/// the day before, every transaction inside the window is taken as is, and
/// the position left at `end` is sold for its value on that day.
pub fn calculate_irr<P>(price: &P, timeline: &Timeline, begin: NaiveDate, end: NaiveDate) -> f64
where
    P: Fn(&Security, NaiveDate) -> Decimal + ?Sized,
{
    let Some((a, b)) = select_transactions(timeline, begin, end) else {
        return 0.0;
    };

    let mut flows = Vec::new();

    if a > 0 {
        if let Some(beginning) = timeline.snapshot(a - 1) {
            if beginning.invested() > Decimal::ZERO {
                let value = beginning.value(price, day_before(begin));
                flows.push(CashFlow::new(begin, -to_f64(value)));
            }
        }
    }

    for tx in &timeline.transactions()[a..b] {
        flows.push(CashFlow::new(tx.date, to_f64(tx.amount)));
    }

    if let Some(ending) = timeline.snapshot(b - 1) {
        if ending.invested() > Decimal::ZERO {
            flows.push(CashFlow::new(end, to_f64(ending.value(price, end))));
        }
    }

    let (Some(first), Some(last)) = (flows.first(), flows.last()) else {
        return 0.0;
    };
    let days = (last.date - first.date).num_days();

    let rate = xirr::xirr(&flows, xirr::guess(&flows));
    if rate.is_nan() {
        log::debug!("IRR did not converge over {} cash flows", flows.len());
        return rate;
    }
    if days < 365 {
        return (1.0 + rate).powf(days as f64 / 365.0) - 1.0;
    }
    rate
}

/// Index range `[a, b)` of the transactions dated inside `[begin, end]`.
///
/// `a` is the first transaction on or after `begin`, `b` is one past the last
/// transaction on or before `end`. `None` when nothing happened on or before
/// `end`.
pub fn select_transactions(timeline: &Timeline, begin: NaiveDate, end: NaiveDate) -> Option<(usize, usize)> {
    let transactions = timeline.transactions();
    let (first, last) = (transactions.first()?, transactions.last()?);
    if first.date > end || begin > end {
        return None;
    }
    if last.date < begin {
        return Some((transactions.len(), transactions.len()));
    }

    let a = transactions.iter().position(|t| t.date >= begin)?;
    let b = transactions.iter().rposition(|t| t.date <= end)? + 1;
    Some((a, b))
}

fn day_before(date: NaiveDate) -> NaiveDate {
    date.pred_opt().unwrap_or(date)
}

fn to_f64(d: Decimal) -> f64 {
    d.to_f64().unwrap_or_default()
}
