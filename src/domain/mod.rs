// src/domain/mod.rs
pub mod errors;
pub mod models;
pub mod repository;

// Re-export common types for convenience
pub use errors::{
    AppError, AppResult, LedgerError, LedgerResult, PriceError, PriceResult, RepositoryError,
    RepositoryResult,
};
pub use models::{Price, Security, Stock, Transaction, TransactionKind};
pub use repository::{PriceHistoryProvider, StockRepository};
