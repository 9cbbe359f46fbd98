// src/performance/xirr.rs
// Money-weighted return over irregularly dated cash flows

use chrono::NaiveDate;

pub const MAX_ERROR: f64 = 1e-6;
pub const MAX_ITERATIONS: usize = 100;

/// Signed cash flow: negative money goes in, positive money comes out
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CashFlow {
    pub date: NaiveDate,
    pub amount: f64,
}

impl CashFlow {
    pub fn new(date: NaiveDate, amount: f64) -> Self {
        Self { date, amount }
    }
}

/// Solve for the rate at which the discounted flows sum to zero.
///
/// Newton-Raphson starting at `guess`, discounting every flow by whole days
/// elapsed since the first one. Returns NaN when a step is not finite or the
/// iteration budget runs out.
pub fn xirr(flows: &[CashFlow], guess: f64) -> f64 {
    let Some(first) = flows.first() else {
        return f64::NAN;
    };

    let mut rate = guess;
    for _ in 0..MAX_ITERATIONS {
        let mut result = first.amount;
        let mut deriv = 0.0;
        for flow in &flows[1..] {
            let exp = years_between(first.date, flow.date);
            result += flow.amount / (1.0 + rate).powf(exp);
            deriv -= exp * flow.amount / (1.0 + rate).powf(exp + 1.0);
        }

        let next = rate - result / deriv;
        if !next.is_finite() {
            return f64::NAN;
        }
        if (next - rate).abs() <= MAX_ERROR || result.abs() < MAX_ERROR {
            return next;
        }
        rate = next;
    }

    f64::NAN
}

/// Starting point for [`xirr`]: the overall gain on the money put in,
/// annualized over the span of the flows.
pub fn guess(flows: &[CashFlow]) -> f64 {
    let (Some(first), Some(last)) = (flows.first(), flows.last()) else {
        return f64::NAN;
    };

    let sum: f64 = flows.iter().map(|f| f.amount).sum();
    let debit: f64 = flows
        .iter()
        .filter(|f| f.amount < 0.0)
        .map(|f| -f.amount)
        .sum();
    let days = (last.date - first.date).num_days() as f64;

    (1.0 + sum / debit).powf(365.0 / days) - 1.0
}

fn years_between(from: NaiveDate, to: NaiveDate) -> f64 {
    (to - from).num_days() as f64 / 365.0
}
