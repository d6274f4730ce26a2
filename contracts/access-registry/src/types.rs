/*!
 * Type Definitions for the Access Registry Contract
 *
 * Roles, storage keys, event payloads and the error enum shared by every
 * entry point of the registry.
 */

use soroban_sdk::{contracterror, contracttype, symbol_short, Address, Symbol};

// ================================================================================================
// ROLES AND STORAGE KEYS
// ================================================================================================

/// Role tags that can be attached to an address.
///
/// Roles are stored as a flat set per address (`DataKey::Role(address, role)`),
/// so an address may hold any combination of them.
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Role {
    /// Manages roles and gates administrative actions of dependent contracts.
    Admin,

    /// Operational role for off-chain automation. Carries no authority inside
    /// the registry itself; dependent contracts query it through `has_role`.
    Keeper,
}

/// Persistent storage keys, one entry per (address, role) pair.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DataKey {
    Role(Address, Role),
}

// ================================================================================================
// EVENT PAYLOADS
// ================================================================================================

/// Emitted whenever a role is newly attached to an address.
/// Topics: (ROLE_GRANTED, account)
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RoleGranted {
    pub role: Role,
    pub account: Address,
    /// The admin (or guardian) that authorised the grant
    pub sender: Address,
}

/// Emitted whenever a role is removed from an address.
/// Topics: (ROLE_REVOKED, account)
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RoleRevoked {
    pub role: Role,
    pub account: Address,
    pub sender: Address,
}

/// Emitted at construction and on every guardian rotation.
/// Topics: (GUARDIAN_UPDATED,)
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GuardianUpdated {
    /// `None` only for the event emitted by `initialize`
    pub previous: Option<Address>,
    pub new_guardian: Address,
}

// ================================================================================================
// ERROR DEFINITIONS
// ================================================================================================

/// Errors returned by the registry.
///
/// Any `Err` aborts the invocation and the host discards all of its writes,
/// so a rejected call never leaves a half-applied role change behind.
#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    /// `initialize` was called on an already initialized registry
    AlreadyInitialized = 1,

    /// A command was invoked before `initialize`
    NotInitialized = 2,

    /// Caller lacks the admin role, or is not the guardian for guardian-only calls
    Unauthorized = 3,

    /// The call would leave the registry without any admin
    InvariantViolation = 4,

    /// Empty identity or otherwise malformed argument
    InvalidArgument = 5,
}

// ================================================================================================
// EVENT TOPICS
// ================================================================================================

pub const ROLE_GRANTED: Symbol = symbol_short!("role_grnt");
pub const ROLE_REVOKED: Symbol = symbol_short!("role_revk");
pub const GUARDIAN_UPDATED: Symbol = symbol_short!("guard_upd");
