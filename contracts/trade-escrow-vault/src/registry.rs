use soroban_sdk::{contractclient, Address, Env};

/// The part of the access registry's interface the vault relies on.
///
/// Only `is_admin` is needed: whitelist changes, pausing and dispute
/// resolution are gated on it. Role management stays in the registry.
#[allow(dead_code)]
#[contractclient(name = "RegistryClient")]
pub trait AccessRegistryInterface {
    fn is_admin(env: Env, account: Address) -> bool;
}
