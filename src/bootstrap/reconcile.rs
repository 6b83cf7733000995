use crate::bootstrap::accounts::SystemAccountTable;
use crate::core::account::Account;
use crate::core::currency::ScaleRegistry;
use crate::core::identity::Namespace;
use crate::ledger::{CreateAccountResult, CreateAccountsError, LedgerClient, LedgerError};
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// What to do when the ledger rejects a system account for any reason
/// other than "already exists identically".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Refuse to start: the table would name accounts known not to exist.
    #[default]
    Abort,
    /// Log each rejection and start anyway.
    LogOnly,
}

/// A system account the ledger refused to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountFailure {
    pub account: Account,
    pub result: CreateAccountResult,
}

/// Reconciliation of one bootstrap batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapReport {
    /// Records submitted.
    pub requested: usize,
    /// Records the ledger created in this run.
    pub created: usize,
    /// Records that already existed with identical attributes.
    pub exists: usize,
    pub failures: Vec<AccountFailure>,
}

impl BootstrapReport {
    /// True when every system account is now known to exist.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for BootstrapReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Bootstrap Report ===")?;
        writeln!(f, "Requested: {}", self.requested)?;
        writeln!(f, "Created:   {}", self.created)?;
        writeln!(f, "Exists:    {}", self.exists)?;
        writeln!(f, "Failures:  {}", self.failures.len())?;
        for failure in &self.failures {
            writeln!(
                f,
                "  {} ledger={} code={}: {}",
                failure.account.id, failure.account.ledger, failure.account.code, failure.result
            )?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("failed to send create accounts request to the ledger: {0}")]
    Ledger(#[from] LedgerError),
    #[error("ledger rejected {} of {} system accounts", .0.failures.len(), .0.requested)]
    AccountsRejected(BootstrapReport),
}

/// Ensure every system account exists in the ledger and return their ids.
///
/// All accounts go out in one batch. Accounts that already exist with the
/// same attributes are the normal outcome of every restart after the first.
/// Any other rejection is handled according to `policy`. A request-level
/// ledger failure always aborts. Nothing is retried.
pub fn bootstrap_system_accounts<L: LedgerClient>(
    registry: &ScaleRegistry,
    namespace: &Namespace,
    ledger: &L,
    policy: FailurePolicy,
) -> Result<(SystemAccountTable, BootstrapReport), BootstrapError> {
    let table = SystemAccountTable::derive(registry, namespace);
    let batch = table.accounts();

    debug!(
        "submitting {} system accounts for {} currencies",
        batch.len(),
        registry.len()
    );
    let results = ledger.create_accounts(&batch)?;
    let report = reconcile(&batch, &results)?;

    info!(
        "account creation requests complete: total_requests={} created={} exists_occurrences={} failure_occurrences={}",
        report.requested,
        report.created,
        report.exists,
        report.failures.len()
    );

    if !report.is_complete() && policy == FailurePolicy::Abort {
        return Err(BootstrapError::AccountsRejected(report));
    }
    Ok((table, report))
}

/// Sort the ledger's sparse per-index results into created / exists /
/// failed buckets.
pub fn reconcile(
    batch: &[Account],
    results: &[CreateAccountsError],
) -> Result<BootstrapReport, LedgerError> {
    let mut report = BootstrapReport {
        requested: batch.len(),
        ..BootstrapReport::default()
    };

    let mut seen = vec![false; batch.len()];
    for entry in results {
        let account = batch
            .get(entry.index as usize)
            .ok_or(LedgerError::IndexOutOfRange {
                index: entry.index,
                len: batch.len(),
            })?;
        let slot = &mut seen[entry.index as usize];
        if *slot {
            return Err(LedgerError::DuplicateIndex { index: entry.index });
        }
        *slot = true;

        match entry.result {
            // Not expected in a non-success list; counts as created.
            CreateAccountResult::Ok => {}
            CreateAccountResult::Exists => {
                report.exists += 1;
                debug!(
                    "account creation: exists id={} ledger={} code={}",
                    account.id, account.ledger, account.code
                );
            }
            other => {
                error!(
                    "account creation: {} id={} ledger={} code={}",
                    other, account.id, account.ledger, account.code
                );
                report.failures.push(AccountFailure {
                    account: *account,
                    result: other,
                });
            }
        }
    }

    report.created = report
        .requested
        .saturating_sub(report.exists + report.failures.len());
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::account::{AccountId, AccountRole};
    use crate::core::currency::CurrencyId;
    use crate::ledger::{CreateAccountsError, InMemoryLedger};

    fn registry() -> ScaleRegistry {
        ScaleRegistry::with_scales([(CurrencyId::USD, 2), (CurrencyId::JPY, 0)], CurrencyId::USD)
            .unwrap()
    }

    struct DownLedger;

    impl LedgerClient for DownLedger {
        fn create_accounts(&self, _: &[Account]) -> Result<Vec<CreateAccountsError>, LedgerError> {
            Err(LedgerError::Unavailable("connection refused".into()))
        }
    }

    struct BogusIndexLedger;

    impl LedgerClient for BogusIndexLedger {
        fn create_accounts(&self, accounts: &[Account]) -> Result<Vec<CreateAccountsError>, LedgerError> {
            Ok(vec![CreateAccountsError {
                index: accounts.len() as u32,
                result: CreateAccountResult::Exists,
            }])
        }
    }

    #[test]
    fn test_first_run_creates_everything() {
        let ledger = InMemoryLedger::new();
        let ns = Namespace::generate();
        let (table, report) =
            bootstrap_system_accounts(&registry(), &ns, &ledger, FailurePolicy::Abort).unwrap();
        assert_eq!(report.requested, 9);
        assert_eq!(report.created, 9);
        assert_eq!(report.exists, 0);
        assert!(report.is_complete());
        assert_eq!(ledger.len(), 9);
        assert!(ledger.get(table.fees()).is_some());
    }

    #[test]
    fn test_rerun_is_idempotent() {
        let ledger = InMemoryLedger::new();
        let ns = Namespace::generate();
        let (first, _) =
            bootstrap_system_accounts(&registry(), &ns, &ledger, FailurePolicy::Abort).unwrap();
        let (second, report) =
            bootstrap_system_accounts(&registry(), &ns, &ledger, FailurePolicy::Abort).unwrap();
        assert_eq!(first, second);
        assert_eq!(report.created, 0);
        assert_eq!(report.exists, 9);
        assert!(report.failures.is_empty());
        assert_eq!(ledger.len(), 9);
    }

    #[test]
    fn test_conflict_aborts_by_default() {
        let ledger = InMemoryLedger::new();
        let ns = Namespace::generate();
        let table = SystemAccountTable::derive(&registry(), &ns);
        let liquidity = table.liquidity(CurrencyId::USD).unwrap();
        // Same id already used by an account with a different code.
        ledger.insert(Account::for_role(liquidity, CurrencyId::USD, AccountRole::BranchControl));

        let err = bootstrap_system_accounts(&registry(), &ns, &ledger, FailurePolicy::Abort)
            .unwrap_err();
        match err {
            BootstrapError::AccountsRejected(report) => {
                assert_eq!(report.failures.len(), 1);
                assert_eq!(report.failures[0].account.id, liquidity);
                assert_eq!(
                    report.failures[0].result,
                    CreateAccountResult::ExistsWithDifferentCode
                );
                assert_eq!(report.created, 8);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_conflict_tolerated_when_log_only() {
        let ledger = InMemoryLedger::new();
        let ns = Namespace::generate();
        let table = SystemAccountTable::derive(&registry(), &ns);
        ledger.insert(Account::for_role(
            table.overs(CurrencyId::JPY).unwrap(),
            CurrencyId::USD,
            AccountRole::BranchOvers,
        ));

        let (_, report) =
            bootstrap_system_accounts(&registry(), &ns, &ledger, FailurePolicy::LogOnly).unwrap();
        assert_eq!(report.failures.len(), 1);
        assert_eq!(
            report.failures[0].result,
            CreateAccountResult::ExistsWithDifferentLedger
        );
        assert!(!report.is_complete());
    }

    #[test]
    fn test_transport_failure_aborts() {
        let ns = Namespace::generate();
        let err = bootstrap_system_accounts(&registry(), &ns, &DownLedger, FailurePolicy::LogOnly)
            .unwrap_err();
        assert!(matches!(err, BootstrapError::Ledger(LedgerError::Unavailable(_))));
    }

    #[test]
    fn test_out_of_range_index_is_protocol_error() {
        let ns = Namespace::generate();
        let err = bootstrap_system_accounts(&registry(), &ns, &BogusIndexLedger, FailurePolicy::LogOnly)
            .unwrap_err();
        assert!(matches!(
            err,
            BootstrapError::Ledger(LedgerError::IndexOutOfRange { index: 9, len: 9 })
        ));
    }

    #[test]
    fn test_repeated_index_is_protocol_error() {
        let batch = [
            Account::for_role(AccountId::new(1), CurrencyId::USD, AccountRole::BranchLiquidity),
            Account::for_role(AccountId::new(2), CurrencyId::USD, AccountRole::BranchOvers),
        ];
        let exists = CreateAccountsError {
            index: 1,
            result: CreateAccountResult::Exists,
        };
        assert!(matches!(
            reconcile(&batch, &[exists, exists]),
            Err(LedgerError::DuplicateIndex { index: 1 })
        ));
    }

    #[test]
    fn test_reconcile_tolerates_ok_entries() {
        let batch = [Account::for_role(
            AccountId::new(1),
            CurrencyId::USD,
            AccountRole::BranchLiquidity,
        )];
        let results = [CreateAccountsError {
            index: 0,
            result: CreateAccountResult::Ok,
        }];
        let report = reconcile(&batch, &results).unwrap();
        assert_eq!(report.created, 1);
        assert!(report.is_complete());
    }
}
