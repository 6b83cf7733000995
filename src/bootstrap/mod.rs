//! Startup provisioning of the fixed set of system accounts.

pub mod accounts;
pub mod reconcile;

pub use accounts::SystemAccountTable;
pub use reconcile::{
    bootstrap_system_accounts, reconcile, AccountFailure, BootstrapError, BootstrapReport,
    FailurePolicy,
};
