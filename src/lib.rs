//! Personal Finance Advisor
//!
//! A small HTTP backend that:
//! - Registers users and issues one-hour bearer tokens
//! - Records expenses and a financial profile (income, debts, savings goals)
//! - Derives monthly metrics from the stored records
//! - Turns those metrics into a prompt and asks a chat-completion model for advice
//!
//! ADVICE FLOW:
//! LOAD → AGGREGATE → RENDER PROMPT → GENERATE → ANSWER

pub mod accounts;
pub mod advice;
pub mod aggregator;
pub mod api;
pub mod auth;
pub mod coerce;
pub mod completion;
pub mod config;
pub mod error;
pub mod expenses;
pub mod models;
pub mod profile;
pub mod prompt;
pub mod repository;

pub use error::Result;

// Re-export common types
pub use error::FinanceError;
pub use models::*;
