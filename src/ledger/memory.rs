use crate::core::account::{Account, AccountId};
use crate::ledger::client::{CreateAccountResult, CreateAccountsError, LedgerClient, LedgerError};
use std::collections::HashMap;
use std::sync::Mutex;

/// In-process ledger engine with the same account-creation semantics as
/// the external one.
///
/// Used for dry runs and tests. It validates each record, deduplicates by
/// id, and reports only non-success outcomes.
///
/// # Examples
///
/// ```
/// use hyperfx_core::core::account::{Account, AccountId, AccountRole};
/// use hyperfx_core::core::currency::CurrencyId;
/// use hyperfx_core::ledger::{CreateAccountResult, InMemoryLedger, LedgerClient};
///
/// let ledger = InMemoryLedger::new();
/// let account = Account::for_role(AccountId::new(1), CurrencyId::USD, AccountRole::BranchControl);
///
/// assert!(ledger.create_accounts(&[account]).unwrap().is_empty());
/// let again = ledger.create_accounts(&[account]).unwrap();
/// assert_eq!(again[0].result, CreateAccountResult::Exists);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    accounts: Mutex<HashMap<AccountId, Account>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn get(&self, id: AccountId) -> Option<Account> {
        self.lock().get(&id).copied()
    }

    /// Store an account as-is, bypassing validation. Lets tests stage a
    /// ledger that already holds conflicting records.
    pub fn insert(&self, account: Account) {
        self.lock().insert(account.id, account);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<AccountId, Account>> {
        // The map is never left half-updated, so a poisoned lock is still usable.
        self.accounts.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn validate(account: &Account) -> CreateAccountResult {
        if account.id.get() == 0 {
            return CreateAccountResult::IdMustNotBeZero;
        }
        if account.id.get() == u128::MAX {
            return CreateAccountResult::IdMustNotBeIntMax;
        }
        if account.flags.debits_must_not_exceed_credits && account.flags.credits_must_not_exceed_debits {
            return CreateAccountResult::FlagsAreMutuallyExclusive;
        }
        if account.ledger.code() == 0 {
            return CreateAccountResult::LedgerMustNotBeZero;
        }
        if account.code == 0 {
            return CreateAccountResult::CodeMustNotBeZero;
        }
        CreateAccountResult::Ok
    }

    fn compare(existing: &Account, account: &Account) -> CreateAccountResult {
        if existing.flags != account.flags {
            CreateAccountResult::ExistsWithDifferentFlags
        } else if existing.ledger != account.ledger {
            CreateAccountResult::ExistsWithDifferentLedger
        } else if existing.code != account.code {
            CreateAccountResult::ExistsWithDifferentCode
        } else {
            CreateAccountResult::Exists
        }
    }
}

impl LedgerClient for InMemoryLedger {
    fn create_accounts(&self, accounts: &[Account]) -> Result<Vec<CreateAccountsError>, LedgerError> {
        let mut stored = self.lock();
        let mut errors = Vec::new();

        for (index, account) in accounts.iter().enumerate() {
            let result = match Self::validate(account) {
                CreateAccountResult::Ok => match stored.get(&account.id) {
                    Some(existing) => Self::compare(existing, account),
                    None => {
                        stored.insert(account.id, *account);
                        CreateAccountResult::Ok
                    }
                },
                rejected => rejected,
            };

            if result != CreateAccountResult::Ok {
                errors.push(CreateAccountsError {
                    index: index as u32,
                    result,
                });
            }
        }

        Ok(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::account::{AccountFlags, AccountRole};
    use crate::core::currency::CurrencyId;

    fn account(id: u128, role: AccountRole) -> Account {
        Account::for_role(AccountId::new(id), CurrencyId::USD, role)
    }

    #[test]
    fn test_create_new_accounts() {
        let ledger = InMemoryLedger::new();
        let batch = [
            account(1, AccountRole::BranchLiquidity),
            account(2, AccountRole::BranchOvers),
        ];
        assert!(ledger.create_accounts(&batch).unwrap().is_empty());
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_duplicate_reported_as_exists() {
        let ledger = InMemoryLedger::new();
        let batch = [account(1, AccountRole::BranchLiquidity)];
        ledger.create_accounts(&batch).unwrap();
        let errors = ledger.create_accounts(&batch).unwrap();
        assert_eq!(
            errors,
            vec![CreateAccountsError {
                index: 0,
                result: CreateAccountResult::Exists
            }]
        );
    }

    #[test]
    fn test_duplicate_within_one_batch() {
        let ledger = InMemoryLedger::new();
        let a = account(1, AccountRole::BranchLiquidity);
        let errors = ledger.create_accounts(&[a, a]).unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].index, 1);
        assert_eq!(errors[0].result, CreateAccountResult::Exists);
    }

    #[test]
    fn test_conflicting_attributes() {
        let ledger = InMemoryLedger::new();
        ledger.insert(account(1, AccountRole::BranchLiquidity));

        let mut different_code = account(1, AccountRole::BranchControl);
        let errors = ledger.create_accounts(&[different_code]).unwrap();
        assert_eq!(errors[0].result, CreateAccountResult::ExistsWithDifferentCode);

        different_code.ledger = CurrencyId::EUR;
        let errors = ledger.create_accounts(&[different_code]).unwrap();
        assert_eq!(errors[0].result, CreateAccountResult::ExistsWithDifferentLedger);

        let different_flags = account(1, AccountRole::BranchOvers);
        let errors = ledger.create_accounts(&[different_flags]).unwrap();
        assert_eq!(errors[0].result, CreateAccountResult::ExistsWithDifferentFlags);
    }

    #[test]
    fn test_validation() {
        let ledger = InMemoryLedger::new();
        let mut bad_flags = account(3, AccountRole::BranchOvers);
        bad_flags.flags = AccountFlags {
            debits_must_not_exceed_credits: true,
            credits_must_not_exceed_debits: true,
            ..AccountFlags::default()
        };
        let mut no_ledger = account(4, AccountRole::BranchOvers);
        no_ledger.ledger = CurrencyId::new(0);
        let mut no_code = account(5, AccountRole::BranchOvers);
        no_code.code = 0;

        let batch = [
            account(0, AccountRole::BranchOvers),
            account(u128::MAX, AccountRole::BranchOvers),
            bad_flags,
            no_ledger,
            no_code,
            account(6, AccountRole::BranchOvers),
        ];
        let results: Vec<_> = ledger
            .create_accounts(&batch)
            .unwrap()
            .into_iter()
            .map(|e| (e.index, e.result))
            .collect();
        assert_eq!(
            results,
            vec![
                (0, CreateAccountResult::IdMustNotBeZero),
                (1, CreateAccountResult::IdMustNotBeIntMax),
                (2, CreateAccountResult::FlagsAreMutuallyExclusive),
                (3, CreateAccountResult::LedgerMustNotBeZero),
                (4, CreateAccountResult::CodeMustNotBeZero),
            ]
        );
        assert_eq!(ledger.len(), 1);
    }
}
