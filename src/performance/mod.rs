// src/performance/mod.rs
// Windowed returns and XIRR on top of the replayed ledger

pub mod calculator;
pub mod xirr;

pub use calculator::{
    calculate_batch_performances_at, calculate_irr, calculate_performance, calculate_performances,
    calculate_performances_at, select_transactions, Performance, Performances,
};
pub use xirr::CashFlow;
