// src/infrastructure/mod.rs
pub mod price;
pub mod repository;
