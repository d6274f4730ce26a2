/*!
 * Access Registry Smart Contract
 *
 * Single source of truth for "who may perform administrative actions".
 * Dependent contracts (the trade escrow vault) hold the registry's address and
 * query `is_admin` before executing any administrative command.
 *
 * Key features:
 * - Flat role storage: one persistent flag per (address, role) pair
 * - At least one admin exists at every point after initialization
 * - A separate multisig guardian that only it can rotate
 * - Guardian escalation path that can restore an admin, never remove one
 *
 * Every state change publishes an event so off-chain indexers can rebuild
 * the role set without reading storage.
 */

#![no_std]

mod types;

#[cfg(test)]
mod test;

use soroban_sdk::{contract, contractimpl, log, symbol_short, Address, Env, Symbol};

pub use types::{DataKey, Error, GuardianUpdated, Role, RoleGranted, RoleRevoked};
use types::{GUARDIAN_UPDATED, ROLE_GRANTED, ROLE_REVOKED};

#[contract]
pub struct AccessRegistry;

// Instance storage keys
const GUARDIAN_KEY: Symbol = symbol_short!("GUARDIAN"); // Multisig guardian address, doubles as the init marker
const ADMIN_COUNT_KEY: Symbol = symbol_short!("ADM_COUNT"); // Number of addresses holding Role::Admin

// ~30 days / ~60 days of ledgers at 5s each
const TTL_THRESHOLD: u32 = 518_400;
const TTL_EXTEND_TO: u32 = 1_036_800;

#[contractimpl]
impl AccessRegistry {
    /// Initializes the registry with its first admin and the multisig guardian.
    /// Can only be called once.
    ///
    /// # Arguments
    /// * `initial_admin` - Receives `Role::Admin`; must sign the transaction
    /// * `multisig_guardian` - Escalation identity, stored apart from the role set.
    ///   May equal `initial_admin` on single-operator deployments.
    ///
    /// # Events
    /// - `role_grnt` for `(Admin, initial_admin)` with `initial_admin` as sender
    /// - `guard_upd` with no previous guardian
    ///
    /// # Errors
    /// - AlreadyInitialized: If the registry was initialized before
    /// - InvalidArgument: If either identity is empty
    pub fn initialize(env: Env, initial_admin: Address, multisig_guardian: Address) -> Result<(), Error> {
        if env.storage().instance().has(&GUARDIAN_KEY) {
            return Err(Error::AlreadyInitialized);
        }

        Self::_validate_address(&initial_admin)?;
        Self::_validate_address(&multisig_guardian)?;

        initial_admin.require_auth();

        env.storage().instance().set(&GUARDIAN_KEY, &multisig_guardian);
        env.storage().instance().set(&ADMIN_COUNT_KEY, &0u32);
        env.storage().instance().extend_ttl(TTL_THRESHOLD, TTL_EXTEND_TO);

        Self::_grant(&env, Role::Admin, &initial_admin, &initial_admin);

        env.events().publish(
            (GUARDIAN_UPDATED,),
            GuardianUpdated {
                previous: None,
                new_guardian: multisig_guardian,
            },
        );

        Ok(())
    }

    // ================================================================================================
    // ROLE MANAGEMENT
    // ================================================================================================

    /// Grants `role` to `account`.
    ///
    /// Granting a role that is already held succeeds without side effects and
    /// without an event.
    ///
    /// # Errors
    /// - NotInitialized: If the registry has no guardian yet
    /// - Unauthorized: If `caller` does not hold `Role::Admin`
    /// - InvalidArgument: If `account` is empty
    pub fn grant_role(env: Env, caller: Address, role: Role, account: Address) -> Result<(), Error> {
        Self::_require_initialized(&env)?;
        caller.require_auth();
        Self::_require_admin(&env, &caller)?;
        Self::_validate_address(&account)?;

        Self::_grant(&env, role, &account, &caller);
        Ok(())
    }

    /// Revokes `role` from `account`.
    ///
    /// Revoking a role the account does not hold is a no-op success.
    ///
    /// # Errors
    /// - NotInitialized: If the registry has no guardian yet
    /// - Unauthorized: If `caller` does not hold `Role::Admin`
    /// - InvariantViolation: If `account` is the last remaining admin
    pub fn revoke_role(env: Env, caller: Address, role: Role, account: Address) -> Result<(), Error> {
        Self::_require_initialized(&env)?;
        caller.require_auth();
        Self::_require_admin(&env, &caller)?;

        Self::_revoke(&env, role, &account, &caller)
    }

    /// Drops `role` from the signing account itself.
    ///
    /// Subject to the same last-admin rule as `revoke_role`.
    pub fn renounce_role(env: Env, account: Address, role: Role) -> Result<(), Error> {
        Self::_require_initialized(&env)?;
        account.require_auth();

        Self::_revoke(&env, role, &account, &account)
    }

    // ================================================================================================
    // MULTISIG GUARDIAN
    // ================================================================================================

    /// Replaces the multisig guardian.
    ///
    /// Only the current guardian can authorize this call; admins cannot.
    /// When the guardian is a Stellar multisig account, its own signature
    /// threshold applies to this authorization.
    ///
    /// # Errors
    /// - NotInitialized: If the registry has no guardian yet
    /// - InvalidArgument: If `new_guardian` is empty
    pub fn update_multisig_guardian(env: Env, new_guardian: Address) -> Result<(), Error> {
        let current = Self::_guardian(&env)?;
        current.require_auth();
        Self::_validate_address(&new_guardian)?;

        env.storage().instance().set(&GUARDIAN_KEY, &new_guardian);
        env.storage().instance().extend_ttl(TTL_THRESHOLD, TTL_EXTEND_TO);

        env.events().publish(
            (GUARDIAN_UPDATED,),
            GuardianUpdated {
                previous: Some(current),
                new_guardian,
            },
        );

        Ok(())
    }

    /// Escalation path: the guardian grants `Role::Admin` to `account`.
    ///
    /// Used to restore administration when admin keys are lost or
    /// compromised. The guardian cannot revoke admins; removals still go
    /// through `revoke_role` by an admin.
    ///
    /// # Errors
    /// - NotInitialized: If the registry has no guardian yet
    /// - InvalidArgument: If `account` is empty
    pub fn guardian_grant_admin(env: Env, account: Address) -> Result<(), Error> {
        let guardian = Self::_guardian(&env)?;
        guardian.require_auth();
        Self::_validate_address(&account)?;

        Self::_grant(&env, Role::Admin, &account, &guardian);
        Ok(())
    }

    // ================================================================================================
    // QUERY FUNCTIONS
    // ================================================================================================

    /// Returns true if `account` holds `Role::Admin`. No side effects.
    pub fn is_admin(env: Env, account: Address) -> bool {
        Self::_has_role(&env, &account, Role::Admin)
    }

    /// Returns true if `account` holds `role`.
    pub fn has_role(env: Env, account: Address, role: Role) -> bool {
        Self::_has_role(&env, &account, role)
    }

    /// Number of addresses currently holding `Role::Admin`.
    pub fn admin_count(env: Env) -> u32 {
        Self::_admin_count(&env)
    }

    pub fn multisig_guardian(env: Env) -> Result<Address, Error> {
        Self::_guardian(&env)
    }

    // ================================================================================================
    // INTERNAL HELPERS
    // ================================================================================================

    fn _require_initialized(env: &Env) -> Result<(), Error> {
        if !env.storage().instance().has(&GUARDIAN_KEY) {
            return Err(Error::NotInitialized);
        }
        Ok(())
    }

    fn _guardian(env: &Env) -> Result<Address, Error> {
        env.storage().instance().get(&GUARDIAN_KEY).ok_or(Error::NotInitialized)
    }

    fn _require_admin(env: &Env, caller: &Address) -> Result<(), Error> {
        if !Self::_has_role(env, caller, Role::Admin) {
            return Err(Error::Unauthorized);
        }
        Ok(())
    }

    fn _validate_address(addr: &Address) -> Result<(), Error> {
        if addr.to_string().len() == 0 {
            return Err(Error::InvalidArgument);
        }
        Ok(())
    }

    fn _has_role(env: &Env, account: &Address, role: Role) -> bool {
        env.storage()
            .persistent()
            .get(&DataKey::Role(account.clone(), role))
            .unwrap_or(false)
    }

    fn _admin_count(env: &Env) -> u32 {
        env.storage().instance().get(&ADMIN_COUNT_KEY).unwrap_or(0)
    }

    fn _grant(env: &Env, role: Role, account: &Address, sender: &Address) {
        if Self::_has_role(env, account, role) {
            return;
        }

        let key = DataKey::Role(account.clone(), role);
        env.storage().persistent().set(&key, &true);
        env.storage().persistent().extend_ttl(&key, TTL_THRESHOLD, TTL_EXTEND_TO);

        if role == Role::Admin {
            let count = Self::_admin_count(env) + 1;
            env.storage().instance().set(&ADMIN_COUNT_KEY, &count);
        }
        env.storage().instance().extend_ttl(TTL_THRESHOLD, TTL_EXTEND_TO);

        env.events().publish(
            (ROLE_GRANTED, account.clone()),
            RoleGranted {
                role,
                account: account.clone(),
                sender: sender.clone(),
            },
        );
    }

    fn _revoke(env: &Env, role: Role, account: &Address, sender: &Address) -> Result<(), Error> {
        if !Self::_has_role(env, account, role) {
            return Ok(());
        }

        if role == Role::Admin {
            let count = Self::_admin_count(env);
            if count <= 1 {
                log!(env, "Refusing to remove the last admin");
                return Err(Error::InvariantViolation);
            }
            env.storage().instance().set(&ADMIN_COUNT_KEY, &(count - 1));
        }

        env.storage().persistent().remove(&DataKey::Role(account.clone(), role));
        env.storage().instance().extend_ttl(TTL_THRESHOLD, TTL_EXTEND_TO);

        env.events().publish(
            (ROLE_REVOKED, account.clone()),
            RoleRevoked {
                role,
                account: account.clone(),
                sender: sender.clone(),
            },
        );

        Ok(())
    }
}
