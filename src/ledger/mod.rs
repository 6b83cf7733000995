//! The external double-entry ledger engine, as seen from this crate.

pub mod client;
pub mod memory;

pub use client::{CreateAccountResult, CreateAccountsError, LedgerClient, LedgerError};
pub use memory::InMemoryLedger;
