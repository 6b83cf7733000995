use crate::core::currency::CurrencyId;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Ledger account classification code (the ledger's `code` field).
pub type AccountCode = u16;

/// The part an account plays in branch accounting.
///
/// Each role carries a fixed classification code the ledger engine uses for
/// reporting. Codes are constants and must never change once accounts
/// exist under them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountRole {
    /// Cash the branch holds in a currency.
    BranchLiquidity,
    /// Fees earned, held in the local currency only.
    BranchFees,
    /// Till surpluses found at reconciliation.
    BranchOvers,
    /// Till deficits found at reconciliation.
    BranchShorts,
    /// Balancing side for opening and closing positions.
    BranchControl,
    Customer,
}

impl AccountRole {
    /// The four roles every currency gets a system account for.
    pub const PER_CURRENCY: [AccountRole; 4] = [
        AccountRole::BranchLiquidity,
        AccountRole::BranchOvers,
        AccountRole::BranchShorts,
        AccountRole::BranchControl,
    ];

    pub const fn code(self) -> AccountCode {
        match self {
            AccountRole::BranchLiquidity => 1000,
            AccountRole::BranchFees => 1001,
            AccountRole::BranchOvers => 2000,
            AccountRole::BranchShorts => 2001,
            AccountRole::BranchControl => 9000,
            AccountRole::Customer => 3000,
        }
    }

    /// Stable name used as the prefix of derived identity keys.
    pub const fn name(self) -> &'static str {
        match self {
            AccountRole::BranchLiquidity => "branch_liquidity",
            AccountRole::BranchFees => "branch_fees",
            AccountRole::BranchOvers => "branch_overs",
            AccountRole::BranchShorts => "branch_shorts",
            AccountRole::BranchControl => "branch_control",
            AccountRole::Customer => "customer",
        }
    }

    /// Balance constraints the ledger should enforce for this role.
    ///
    /// Branch accounts all keep balance history.
    pub fn flags(self) -> AccountFlags {
        let base = AccountFlags {
            history: true,
            ..AccountFlags::default()
        };
        match self {
            AccountRole::BranchOvers | AccountRole::BranchFees => AccountFlags {
                debits_must_not_exceed_credits: true,
                ..base
            },
            AccountRole::BranchShorts => AccountFlags {
                credits_must_not_exceed_debits: true,
                ..base
            },
            AccountRole::BranchLiquidity | AccountRole::BranchControl => base,
            AccountRole::Customer => AccountFlags::default(),
        }
    }
}

impl fmt::Display for AccountRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Account flags understood by the ledger engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountFlags {
    pub linked: bool,
    pub debits_must_not_exceed_credits: bool,
    pub credits_must_not_exceed_debits: bool,
    pub history: bool,
}

impl AccountFlags {
    const LINKED: u16 = 1 << 0;
    const DEBITS_MUST_NOT_EXCEED_CREDITS: u16 = 1 << 1;
    const CREDITS_MUST_NOT_EXCEED_DEBITS: u16 = 1 << 2;
    const HISTORY: u16 = 1 << 3;

    /// Wire representation (the ledger's `flags` field).
    pub fn to_u16(self) -> u16 {
        let mut bits = 0;
        if self.linked {
            bits |= Self::LINKED;
        }
        if self.debits_must_not_exceed_credits {
            bits |= Self::DEBITS_MUST_NOT_EXCEED_CREDITS;
        }
        if self.credits_must_not_exceed_debits {
            bits |= Self::CREDITS_MUST_NOT_EXCEED_DEBITS;
        }
        if self.history {
            bits |= Self::HISTORY;
        }
        bits
    }

    pub fn from_u16(bits: u16) -> Self {
        Self {
            linked: bits & Self::LINKED != 0,
            debits_must_not_exceed_credits: bits & Self::DEBITS_MUST_NOT_EXCEED_CREDITS != 0,
            credits_must_not_exceed_debits: bits & Self::CREDITS_MUST_NOT_EXCEED_DEBITS != 0,
            history: bits & Self::HISTORY != 0,
        }
    }
}

/// 128-bit ledger account identifier.
///
/// Identifiers are usually derived from a UUID. The UUID's 16 bytes are read
/// as a little-endian integer, which is the byte order the ledger engine
/// uses on the wire, so converting back yields the same UUID.
///
/// # Examples
///
/// ```
/// use hyperfx_core::core::account::AccountId;
/// use uuid::Uuid;
///
/// let uuid = Uuid::new_v4();
/// let id = AccountId::from_uuid(uuid);
/// assert_eq!(id.to_uuid(), uuid);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(u128);

impl AccountId {
    pub const fn new(raw: u128) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u128 {
        self.0
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid.to_u128_le())
    }

    pub fn to_uuid(self) -> Uuid {
        Uuid::from_u128_le(self.0)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

/// An account-creation record as submitted to the ledger engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub ledger: CurrencyId,
    pub code: AccountCode,
    pub flags: AccountFlags,
}

impl Account {
    /// Record for `role` on `ledger`, with the role's code and flags.
    pub fn for_role(id: AccountId, ledger: CurrencyId, role: AccountRole) -> Self {
        Self {
            id,
            ledger,
            code: role.code(),
            flags: role.flags(),
        }
    }
}
