use crate::core::account::Account;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Outcome of creating a single account, as reported by the ledger engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreateAccountResult {
    Ok,
    /// An account with this id and identical attributes already exists.
    Exists,
    ExistsWithDifferentFlags,
    ExistsWithDifferentLedger,
    ExistsWithDifferentCode,
    IdMustNotBeZero,
    IdMustNotBeIntMax,
    LedgerMustNotBeZero,
    CodeMustNotBeZero,
    FlagsAreMutuallyExclusive,
}

impl CreateAccountResult {
    pub fn as_str(self) -> &'static str {
        match self {
            CreateAccountResult::Ok => "ok",
            CreateAccountResult::Exists => "exists",
            CreateAccountResult::ExistsWithDifferentFlags => "exists_with_different_flags",
            CreateAccountResult::ExistsWithDifferentLedger => "exists_with_different_ledger",
            CreateAccountResult::ExistsWithDifferentCode => "exists_with_different_code",
            CreateAccountResult::IdMustNotBeZero => "id_must_not_be_zero",
            CreateAccountResult::IdMustNotBeIntMax => "id_must_not_be_int_max",
            CreateAccountResult::LedgerMustNotBeZero => "ledger_must_not_be_zero",
            CreateAccountResult::CodeMustNotBeZero => "code_must_not_be_zero",
            CreateAccountResult::FlagsAreMutuallyExclusive => "flags_are_mutually_exclusive",
        }
    }
}

impl fmt::Display for CreateAccountResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-success entry in a batch result: which record, and why.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateAccountsError {
    pub index: u32,
    pub result: CreateAccountResult,
}

/// Request-level failure: the batch was not processed at all.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger engine unavailable: {0}")]
    Unavailable(String),
    #[error("ledger engine rejected the request: {0}")]
    Request(String),
    #[error("ledger engine returned result index {index} for a batch of {len}")]
    IndexOutOfRange { index: u32, len: usize },
    #[error("ledger engine returned more than one result for index {index}")]
    DuplicateIndex { index: u32 },
}

/// The slice of the external double-entry ledger engine this crate uses.
///
/// Creation is idempotent by account id. The engine answers a batch with
/// the results of only those records that did not succeed as new
/// creations, so an empty vector means every record was created.
pub trait LedgerClient {
    fn create_accounts(&self, accounts: &[Account]) -> Result<Vec<CreateAccountsError>, LedgerError>;
}

impl<T: LedgerClient + ?Sized> LedgerClient for &T {
    fn create_accounts(&self, accounts: &[Account]) -> Result<Vec<CreateAccountsError>, LedgerError> {
        (**self).create_accounts(accounts)
    }
}
