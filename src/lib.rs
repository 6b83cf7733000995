//! # hyperfx-core
//!
//! Account bootstrap and conversion arithmetic for a foreign-exchange
//! branch that keeps its books in an external double-entry ledger engine.
//!
//! ## Architecture
//!
//! - **core**: Currencies and asset scales, account roles and records,
//!   deterministic account identities under a per-deployment namespace
//! - **ledger**: The ledger engine's batch account-creation interface and
//!   an in-memory implementation
//! - **bootstrap**: Idempotent provisioning of the system accounts at
//!   startup, and the resulting account table
//! - **conversion**: Local/foreign conversion in minor units with rounding
//!   that always favours the house
//! - **config**: JSON deployment configuration
//!
//! ## Startup
//!
//! ```
//! use hyperfx_core::bootstrap::{bootstrap_system_accounts, FailurePolicy};
//! use hyperfx_core::core::currency::{CurrencyId, ScaleRegistry};
//! use hyperfx_core::core::identity::Namespace;
//! use hyperfx_core::ledger::InMemoryLedger;
//!
//! let registry = ScaleRegistry::new(CurrencyId::GBP).unwrap();
//! let namespace = Namespace::generate();
//! let ledger = InMemoryLedger::new();
//!
//! let (accounts, report) =
//!     bootstrap_system_accounts(&registry, &namespace, &ledger, FailurePolicy::Abort).unwrap();
//! assert_eq!(report.created, registry.len() * 4 + 1);
//! assert!(accounts.liquidity(CurrencyId::EUR).is_some());
//! ```

pub mod bootstrap;
pub mod config;
pub mod conversion;
pub mod core;
pub mod ledger;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::bootstrap::{bootstrap_system_accounts, BootstrapReport, FailurePolicy, SystemAccountTable};
    pub use crate::conversion::{ConversionEngine, Rate, RateSource, TradeDirection};
    pub use crate::core::account::{AccountId, AccountRole};
    pub use crate::core::currency::{CurrencyId, ScaleRegistry};
    pub use crate::core::identity::{Namespace, NamespaceFile};
    pub use crate::ledger::LedgerClient;
}
