// src/domain/errors.rs
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Price error: {0}")]
    Price(#[from] PriceError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// Inconsistent transaction history. Fatal to the query that hit it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("stock not in portfolio: {isin}")]
    StockNotInPortfolio { isin: String },

    #[error(
        "invalid transaction for {isin} on {date}: selling {requested} shares in depot {depot:?} \
         but only {available} are held there"
    )]
    InsufficientShares {
        isin: String,
        depot: String,
        date: chrono::NaiveDate,
        requested: Decimal,
        available: Decimal,
    },
}

#[derive(Error, Debug)]
pub enum PriceError {
    #[error("No price available for: {0}")]
    NoData(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("fetching prices for {isin}: {source}")]
    Refresh {
        isin: String,
        #[source]
        source: Box<PriceError>,
    },
}

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid data format: {0}")]
    InvalidFormat(#[from] serde_json::Error),

    #[error("Data parse error: {0}")]
    Parse(String),
}

// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;
pub type LedgerResult<T> = Result<T, LedgerError>;
pub type PriceResult<T> = Result<T, PriceError>;
pub type RepositoryResult<T> = Result<T, RepositoryError>;
