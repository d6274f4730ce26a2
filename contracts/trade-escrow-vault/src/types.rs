/*!
 * Type Definitions for the Trade Escrow Vault Contract
 *
 * This module defines the offer record, its lifecycle states, the storage keys,
 * the structured event payloads and the error enum used throughout the vault.
 */

use soroban_sdk::{contracterror, contracttype, symbol_short, Address, BytesN, String, Symbol};

// ================================================================================================
// CORE DATA STRUCTURES
// ================================================================================================

/// A rate-locked trade offer between two whitelisted counterparties.
///
/// The fiat leg is settled off-chain; the vault only custodies the token leg.
/// The token amount is derived once, at creation, from `fiat_amount` and
/// `fiat_to_token_rate` and is never recomputed afterwards, so later price
/// movements cannot change what either side receives.
///
/// # Sides
/// - `is_buy == false`: the creator sells tokens, the counterparty buys them
/// - `is_buy == true`: the creator buys tokens, the counterparty sells them
///
/// Tokens always flow seller -> vault -> buyer.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Offer {
    /// Creator-supplied identifier; consumed forever once used
    pub reference: BytesN<32>,

    /// Whitelisted address that created the offer
    pub creator: Address,

    /// The only address allowed to accept the offer
    pub counterparty: Address,

    /// Token contract escrowed by the vault
    pub settlement_token: Address,

    /// Direction flag, see the type-level docs
    pub is_buy: bool,

    /// Ledger timestamp (seconds) from which the offer can no longer be accepted
    pub expiry: u64,

    /// Off-chain currency code such as "NGN"; informational only
    pub fiat_currency_code: String,

    /// Fiat amount expected off-chain, fixed at creation
    pub fiat_amount: i128,

    /// Whole tokens per fiat unit, scaled by `settlement::RATE_SCALE`
    pub fiat_to_token_rate: i128,

    /// Token base units escrowed on acceptance, locked at creation
    pub token_amount: i128,

    pub status: OfferStatus,

    /// Ledger timestamp of creation
    pub created_at: u64,
}

impl Offer {
    /// Side that escrows tokens on acceptance.
    pub fn seller(&self) -> &Address {
        if self.is_buy {
            &self.counterparty
        } else {
            &self.creator
        }
    }

    /// Side that receives the escrowed tokens on settlement.
    pub fn buyer(&self) -> &Address {
        if self.is_buy {
            &self.creator
        } else {
            &self.counterparty
        }
    }
}

// ================================================================================================
// ENUMERATIONS
// ================================================================================================

/// Lifecycle state of an offer.
///
/// # State Transition Rules
/// - NonExistent → Open (create_offer)
/// - Open → Accepted (accept_offer, tokens escrowed)
/// - Open → Cancelled (cancel_offer by the creator)
/// - Open → Expired (expire_offer once `expiry` has passed)
/// - Accepted → Settled (settle_offer by the seller, or admin release)
/// - Accepted → Refunded (admin refund)
///
/// Settled, Cancelled, Expired and Refunded are final. Records in a final state
/// are kept so their reference can never be reused.
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OfferStatus {
    /// No offer has ever been stored under the reference. Never persisted.
    NonExistent,
    Open,
    Accepted,
    Settled,
    Cancelled,
    Expired,
    Refunded,
}

/// Admin decision for an accepted offer whose parties disagree.
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DisputeResolution {
    /// Release the escrow to the buyer; the offer ends `Settled`
    ReleaseToBuyer,

    /// Return the escrow to the seller; the offer ends `Refunded`
    RefundToSeller,
}

/// Persistent storage keys.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DataKey {
    Whitelist(Address),
    Offer(BytesN<32>),
}

// ================================================================================================
// EVENT PAYLOADS
// ================================================================================================
// Off-chain fiat reconciliation replays these, so each one carries the
// reference (or account) it concerns plus the resulting state.

/// Topics: (WHITELIST_UPDATED, account)
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WhitelistUpdated {
    pub account: Address,
    pub previous: bool,
    pub allowed: bool,
    pub updated_by: Address,
}

/// Topics: (OFFER_ACCEPTED, reference)
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OfferAccepted {
    pub reference: BytesN<32>,
    pub counterparty: Address,
    /// Address the escrowed tokens were taken from
    pub funder: Address,
    pub token_amount: i128,
}

/// Topics: (OFFER_SETTLED, reference)
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OfferSettled {
    pub reference: BytesN<32>,
    pub recipient: Address,
    pub token_amount: i128,
    /// True when released through `resolve_dispute`
    pub resolved_by_admin: bool,
}

/// Topics: (OFFER_CANCELLED, reference)
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OfferCancelled {
    pub reference: BytesN<32>,
    pub cancelled_by: Address,
}

/// Topics: (OFFER_EXPIRED, reference)
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OfferExpired {
    pub reference: BytesN<32>,
    pub expiry: u64,
    pub swept_at: u64,
}

/// Topics: (OFFER_REFUNDED, reference)
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OfferRefunded {
    pub reference: BytesN<32>,
    pub recipient: Address,
    pub token_amount: i128,
}

// ================================================================================================
// ERROR DEFINITIONS
// ================================================================================================

/// Error kinds surfaced to callers of the vault.
///
/// An `Err` aborts the whole invocation: storage writes, token movements and
/// events of that call are all discarded by the host.
///
/// # Error Code Ranges
/// - 1-2: Lifecycle of the contract itself
/// - 3-4: Authorization and standing invariants
/// - 5-10: Offer lookup, validation and state machine
/// - 11-14: Operational and financial failures
#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    AlreadyInitialized = 1,
    NotInitialized = 2,

    /// Caller lacks admin rights in the registry, is not whitelisted, or is
    /// not the party the operation belongs to
    Unauthorized = 3,

    InvariantViolation = 4,

    /// An offer already exists under this reference (live or final)
    AlreadyExists = 5,

    /// No offer has been stored under this reference
    NotFound = 6,

    /// Empty identity, non-positive amount or rate, expiry not in the future,
    /// malformed currency code, unusable token, or a zero settlement amount
    InvalidArgument = 7,

    /// Acceptance attempted at or after the offer's expiry
    Expired = 8,

    /// The offer's current status does not allow this operation
    InvalidStateTransition = 9,

    /// Expiry sweep attempted before the offer's expiry
    NotYetExpired = 10,

    /// Trading is halted by an admin
    ContractPaused = 11,

    /// A token transfer into or out of the vault failed
    TokenTransferFailed = 12,

    /// Settlement arithmetic overflowed i128
    ArithmeticOverflow = 13,

    /// The seller has not approved the vault for the locked amount
    InsufficientAllowance = 14,
}

// ================================================================================================
// EVENT TOPICS
// ================================================================================================

pub const WHITELIST_UPDATED: Symbol = symbol_short!("wl_upd");
pub const OFFER_CREATED: Symbol = symbol_short!("offr_crt");
pub const OFFER_ACCEPTED: Symbol = symbol_short!("offr_acc");
pub const OFFER_SETTLED: Symbol = symbol_short!("offr_stl");
pub const OFFER_CANCELLED: Symbol = symbol_short!("offr_cncl");
pub const OFFER_EXPIRED: Symbol = symbol_short!("offr_exp");
pub const OFFER_REFUNDED: Symbol = symbol_short!("offr_rfnd");
pub const PAUSED: Symbol = symbol_short!("paused");
pub const UNPAUSED: Symbol = symbol_short!("unpaused");
