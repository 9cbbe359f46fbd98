// src/price/mod.rs
pub mod cache;

pub use cache::{PriceCache, PriceMap};
