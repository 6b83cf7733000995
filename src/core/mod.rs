//! Foundational types: currencies and their scales, account roles and
//! records, and deterministic account identities.

pub mod account;
pub mod currency;
pub mod identity;
