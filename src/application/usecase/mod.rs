// src/application/usecase/mod.rs
pub mod refresh_usecase;
pub mod report_usecase;

pub use refresh_usecase::{PriceRefreshUseCase, PriceRefresher};
pub use report_usecase::{ReportService, ReportUseCase};
