//! Cost classification and financial analytics for small businesses.
//!
//! Expenses are tagged fixed/variable/mixed and direct/indirect from custom
//! rules, an industry pattern library and the business profile. Classified
//! transactions feed margin, break-even and budget variance reports.

pub mod analytics;
pub mod budget;
pub mod classifications;
pub mod classifier;
pub mod db;
pub mod error;
pub mod fmt;
pub mod models;
pub mod patterns;
pub mod profile;
pub mod rules;
pub mod settings;
pub mod transactions;
