use crate::core::account::{Account, AccountId, AccountRole};
use crate::core::currency::{CurrencyId, ScaleRegistry};
use crate::core::identity::{role_key, Namespace};
use std::collections::BTreeMap;
use std::fmt;

/// Resolved identifiers of every system account.
///
/// Built once at startup from the namespace and the scale registry, then
/// only read. Per-currency accounts are keyed by (currency, role); the fees
/// account exists once, on the local currency's ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemAccountTable {
    per_currency: BTreeMap<(CurrencyId, AccountRole), AccountId>,
    fees: AccountId,
    local: CurrencyId,
}

impl SystemAccountTable {
    /// Derive every system account id. Pure: no ledger access.
    pub fn derive(registry: &ScaleRegistry, namespace: &Namespace) -> Self {
        let per_currency = registry
            .currencies()
            .flat_map(|currency| {
                AccountRole::PER_CURRENCY.iter().map(move |&role| {
                    let id = namespace.derive(&role_key(role, Some(currency)));
                    ((currency, role), id)
                })
            })
            .collect();

        Self {
            per_currency,
            fees: namespace.derive(&role_key(AccountRole::BranchFees, None)),
            local: registry.local(),
        }
    }

    /// Id of the `role` account for `currency`.
    ///
    /// Returns `None` for currencies outside the registry and for roles that
    /// are not per-currency (fees, customer).
    pub fn get(&self, currency: CurrencyId, role: AccountRole) -> Option<AccountId> {
        self.per_currency.get(&(currency, role)).copied()
    }

    pub fn liquidity(&self, currency: CurrencyId) -> Option<AccountId> {
        self.get(currency, AccountRole::BranchLiquidity)
    }

    pub fn overs(&self, currency: CurrencyId) -> Option<AccountId> {
        self.get(currency, AccountRole::BranchOvers)
    }

    pub fn shorts(&self, currency: CurrencyId) -> Option<AccountId> {
        self.get(currency, AccountRole::BranchShorts)
    }

    pub fn control(&self, currency: CurrencyId) -> Option<AccountId> {
        self.get(currency, AccountRole::BranchControl)
    }

    /// The fees account, on the local currency ledger.
    pub fn fees(&self) -> AccountId {
        self.fees
    }

    pub fn local(&self) -> CurrencyId {
        self.local
    }

    /// Number of system accounts, fees included.
    pub fn len(&self) -> usize {
        self.per_currency.len() + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Creation records for every system account: per currency in ascending
    /// order liquidity, overs, shorts, control; the fees account last.
    pub fn accounts(&self) -> Vec<Account> {
        let mut accounts: Vec<Account> = self
            .per_currency
            .iter()
            .map(|(&(currency, role), &id)| Account::for_role(id, currency, role))
            .collect();
        accounts.push(Account::for_role(self.fees, self.local, AccountRole::BranchFees));
        accounts
    }

    /// Every (currency, role, id) entry, fees last.
    pub fn entries(&self) -> impl Iterator<Item = (CurrencyId, AccountRole, AccountId)> + '_ {
        self.per_currency
            .iter()
            .map(|(&(currency, role), &id)| (currency, role, id))
            .chain(std::iter::once((self.local, AccountRole::BranchFees, self.fees)))
    }
}

impl fmt::Display for SystemAccountTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== System Accounts ===")?;
        for (currency, role, id) in self.entries() {
            writeln!(f, "  {:<4} {:<17} {}", currency.to_string(), role.name(), id)?;
        }
        Ok(())
    }
}
