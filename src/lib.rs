// src/lib.rs
// Main library module declarations

pub mod domain;
pub mod ledger;
pub mod performance;
pub mod price;
pub mod application;
pub mod infrastructure;
pub mod config;
