//! Balancer V2 Vault

pub mod contracts;
mod vault;

pub use contracts::NO_DEADLINE;
pub use vault::BalancerVaultClient;
