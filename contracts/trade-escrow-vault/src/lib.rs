/*!
 * Trade Escrow Vault Smart Contract
 *
 * Permissioned custody for peer-to-peer fiat/token trades. Whitelisted
 * counterparties create rate-locked offers; the vault escrows the token leg
 * while the fiat leg is paid off-chain, then releases it to the buyer.
 *
 * Key features:
 * - Fiat-to-token rate fixed at creation, settlement amount never re-derived
 * - Creator-supplied 32-byte references, permanently consumed once used
 * - Lazy expiry: checked on every access, plus an explicit sweep
 * - Administrative commands gated by an external access registry
 * - Trading commands gated by the vault's own whitelist
 * - Pausable trading and admin dispute resolution for accepted offers
 *
 * Business Logic:
 * 1. An admin whitelists the trading parties
 * 2. A whitelisted creator opens an offer naming its counterparty
 * 3. The counterparty accepts; the seller's tokens move into the vault
 * 4. The seller confirms fiat receipt and settles; tokens go to the buyer
 * 5. Open offers may be cancelled by their creator or swept once expired
 */

#![no_std]

mod registry;
pub mod settlement;
mod types;


use soroban_sdk::{
    contract, contractimpl, log, symbol_short, token, Address, BytesN, Env, String, Symbol,
};

use registry::RegistryClient;
pub use types::{
    DataKey, DisputeResolution, Error, Offer, OfferAccepted, OfferCancelled, OfferExpired,
    OfferRefunded, OfferSettled, OfferStatus, WhitelistUpdated,
};
use types::{
    OFFER_ACCEPTED, OFFER_CANCELLED, OFFER_CREATED, OFFER_EXPIRED, OFFER_REFUNDED, OFFER_SETTLED,
    PAUSED, UNPAUSED, WHITELIST_UPDATED,
};

#[contract]
pub struct TradeEscrowVault;

// Instance storage keys
const REGISTRY_KEY: Symbol = symbol_short!("REGISTRY"); // Access registry address, immutable after initialize
const PAUSED_KEY: Symbol = symbol_short!("PAUSED"); // Trading pause flag

// ~30 days / ~60 days of ledgers at 5s each
const TTL_THRESHOLD: u32 = 518_400;
const TTL_EXTEND_TO: u32 = 1_036_800;

// Bounds for the informational fiat currency code, in bytes
const MAX_CURRENCY_CODE_LEN: u32 = 8;

#[contractimpl]
impl TradeEscrowVault {
    /// Binds the vault to a deployed access registry. Can only be called once;
    /// the registry reference is immutable afterwards.
    ///
    /// The registry is probed with an `is_admin` query; an address that does
    /// not answer it is rejected.
    ///
    /// # Errors
    /// - AlreadyInitialized: If the vault is already bound to a registry
    /// - InvalidArgument: If the address is empty or does not answer `is_admin`
    pub fn initialize(env: Env, access_registry: Address) -> Result<(), Error> {
        if env.storage().instance().has(&REGISTRY_KEY) {
            return Err(Error::AlreadyInitialized);
        }

        Self::_validate_address(&access_registry)?;

        let probe = RegistryClient::new(&env, &access_registry)
            .try_is_admin(&env.current_contract_address());
        if !matches!(probe, Ok(Ok(_))) {
            log!(&env, "Address does not behave like an access registry");
            return Err(Error::InvalidArgument);
        }

        env.storage().instance().set(&REGISTRY_KEY, &access_registry);
        env.storage().instance().set(&PAUSED_KEY, &false);
        env.storage().instance().extend_ttl(TTL_THRESHOLD, TTL_EXTEND_TO);

        Ok(())
    }

    // ================================================================================================
    // ADMINISTRATIVE FUNCTIONS
    // ================================================================================================
    // Every function in this section consults AccessRegistry::is_admin(caller).

    /// Adds `account` to, or removes it from, the trading whitelist.
    ///
    /// # Arguments
    /// * `caller` - Must hold the admin role in the registry and sign
    /// * `account` - Address whose eligibility changes
    /// * `allowed` - New whitelist flag
    ///
    /// # Events
    /// `wl_upd` with both the previous and the new flag
    ///
    /// # Errors
    /// - NotInitialized: If the vault has no registry
    /// - Unauthorized: If `caller` is not an admin; the whitelist is untouched
    /// - InvalidArgument: If `account` is empty
    pub fn set_whitelist(env: Env, caller: Address, account: Address, allowed: bool) -> Result<(), Error> {
        caller.require_auth();
        Self::_require_admin(&env, &caller)?;
        Self::_validate_address(&account)?;

        let previous = Self::_is_whitelisted(&env, &account);
        let key = DataKey::Whitelist(account.clone());
        if allowed {
            env.storage().persistent().set(&key, &true);
            env.storage().persistent().extend_ttl(&key, TTL_THRESHOLD, TTL_EXTEND_TO);
        } else {
            env.storage().persistent().remove(&key);
        }

        env.events().publish(
            (WHITELIST_UPDATED, account.clone()),
            WhitelistUpdated {
                account,
                previous,
                allowed,
                updated_by: caller,
            },
        );

        Ok(())
    }

    /// Halts create, accept, settle, cancel and expire. Admin only.
    pub fn pause(env: Env, caller: Address) -> Result<(), Error> {
        caller.require_auth();
        Self::_require_admin(&env, &caller)?;

        env.storage().instance().set(&PAUSED_KEY, &true);
        env.events().publish((PAUSED,), caller);
        Ok(())
    }

    /// Resumes trading after a pause. Admin only.
    pub fn unpause(env: Env, caller: Address) -> Result<(), Error> {
        caller.require_auth();
        Self::_require_admin(&env, &caller)?;

        env.storage().instance().set(&PAUSED_KEY, &false);
        env.events().publish((UNPAUSED,), caller);
        Ok(())
    }

    /// Resolves an accepted offer whose parties disagree about the fiat leg.
    ///
    /// # Resolution Logic
    /// - ReleaseToBuyer: the escrow goes to the buyer, offer ends `Settled`
    /// - RefundToSeller: the escrow returns to the seller, offer ends `Refunded`
    ///
    /// Available while paused, so an admin can unwind positions during an incident.
    ///
    /// # Errors
    /// - Unauthorized: If `caller` is not an admin
    /// - NotFound: If no offer exists under `reference`
    /// - InvalidStateTransition: If the offer is not `Accepted`
    /// - TokenTransferFailed: If the payout fails
    pub fn resolve_dispute(
        env: Env,
        caller: Address,
        reference: BytesN<32>,
        resolution: DisputeResolution,
    ) -> Result<(), Error> {
        caller.require_auth();
        Self::_require_admin(&env, &caller)?;

        let mut offer = Self::_load_offer(&env, &reference)?;
        if offer.status != OfferStatus::Accepted {
            return Err(Error::InvalidStateTransition);
        }

        match resolution {
            DisputeResolution::ReleaseToBuyer => {
                let recipient = offer.buyer().clone();
                offer.status = OfferStatus::Settled;
                Self::_save_offer(&env, &offer);

                Self::_payout(&env, &offer.settlement_token, &recipient, offer.token_amount)?;

                env.events().publish(
                    (OFFER_SETTLED, reference.clone()),
                    OfferSettled {
                        reference,
                        recipient,
                        token_amount: offer.token_amount,
                        resolved_by_admin: true,
                    },
                );
            }
            DisputeResolution::RefundToSeller => {
                let recipient = offer.seller().clone();
                offer.status = OfferStatus::Refunded;
                Self::_save_offer(&env, &offer);

                Self::_payout(&env, &offer.settlement_token, &recipient, offer.token_amount)?;

                env.events().publish(
                    (OFFER_REFUNDED, reference.clone()),
                    OfferRefunded {
                        reference,
                        recipient,
                        token_amount: offer.token_amount,
                    },
                );
            }
        }

        Ok(())
    }

    // ================================================================================================
    // OFFER LIFECYCLE
    // ================================================================================================

    /// Opens a new rate-locked offer.
    ///
    /// The settlement amount is computed here, once, from `fiat_amount`,
    /// `fiat_to_token_rate` and the token's decimals, and stored on the offer.
    /// No tokens move until the counterparty accepts.
    ///
    /// # Business Flow
    /// 1. Checks pause state, creator signature and creator whitelist status
    /// 2. Rejects a reference that was ever used before
    /// 3. Validates counterparty, expiry, amounts, rate and currency code
    /// 4. Reads the token's decimals and locks the token amount
    /// 5. Stores the offer as `Open` and emits `offr_crt` with the full record
    ///
    /// The counterparty's whitelist status is checked when it accepts, not here.
    ///
    /// # Errors
    /// - ContractPaused: If trading is halted
    /// - Unauthorized: If `creator` is not whitelisted
    /// - AlreadyExists: If `reference` is already taken, even by a finished offer
    /// - InvalidArgument: For a self-trade, a non-future expiry, non-positive
    ///   amount or rate, a bad currency code, an unusable token or a zero
    ///   settlement amount
    /// - ArithmeticOverflow: If the settlement amount does not fit in i128
    #[allow(clippy::too_many_arguments)]
    pub fn create_offer(
        env: Env,
        creator: Address,
        reference: BytesN<32>,
        counterparty: Address,
        settlement_token: Address,
        is_buy: bool,
        expiry: u64,
        fiat_currency_code: String,
        fiat_amount: i128,
        fiat_to_token_rate: i128,
    ) -> Result<Offer, Error> {
        Self::_require_initialized(&env)?;
        if Self::_is_paused(&env) { return Err(Error::ContractPaused); }

        creator.require_auth();

        if !Self::_is_whitelisted(&env, &creator) {
            return Err(Error::Unauthorized);
        }

        let key = DataKey::Offer(reference.clone());
        if env.storage().persistent().has(&key) {
            return Err(Error::AlreadyExists);
        }

        Self::_validate_address(&counterparty)?;
        if counterparty == creator {
            return Err(Error::InvalidArgument);
        }

        let now = env.ledger().timestamp();
        if expiry <= now {
            log!(&env, "Expiry must be in the future. Now: {}, Provided: {}", now, expiry);
            return Err(Error::InvalidArgument);
        }

        if fiat_amount <= 0 || fiat_to_token_rate <= 0 {
            log!(&env, "Non-positive amount or rate. Amount: {}, Rate: {}", fiat_amount, fiat_to_token_rate);
            return Err(Error::InvalidArgument);
        }

        let code_len = fiat_currency_code.len();
        if code_len == 0 || code_len > MAX_CURRENCY_CODE_LEN {
            return Err(Error::InvalidArgument);
        }

        let decimals = Self::_token_decimals(&env, &settlement_token)?;
        let token_amount = settlement::settlement_amount(fiat_amount, fiat_to_token_rate, decimals)?;

        let offer = Offer {
            reference: reference.clone(),
            creator,
            counterparty,
            settlement_token,
            is_buy,
            expiry,
            fiat_currency_code,
            fiat_amount,
            fiat_to_token_rate,
            token_amount,
            status: OfferStatus::Open,
            created_at: now,
        };
        Self::_save_offer(&env, &offer);

        env.events().publish((OFFER_CREATED, reference), offer.clone());

        Ok(offer)
    }

    /// Accepts an open offer and escrows the locked token amount.
    ///
    /// # Funding
    /// - Sell offer (`is_buy == false`): the creator is the seller. The vault
    ///   pulls the amount with `transfer_from`, so the creator must have
    ///   approved the vault as spender beforehand.
    /// - Buy offer (`is_buy == true`): the caller is the seller and the amount
    ///   is transferred from the caller directly.
    ///
    /// An expired offer is rejected without changing its state; use
    /// `expire_offer` to finalize it.
    ///
    /// # Returns
    /// The escrowed token amount
    ///
    /// # Errors
    /// - ContractPaused: If trading is halted
    /// - NotFound: If no offer exists under `reference`
    /// - InvalidStateTransition: If the offer is not `Open`
    /// - Unauthorized: If `caller` is not the counterparty, or either party is
    ///   not whitelisted
    /// - Expired: If the ledger time has reached `expiry`
    /// - InsufficientAllowance: If a selling creator has not approved the vault
    /// - TokenTransferFailed: If the escrow transfer fails
    pub fn accept_offer(env: Env, caller: Address, reference: BytesN<32>) -> Result<i128, Error> {
        Self::_require_initialized(&env)?;
        if Self::_is_paused(&env) { return Err(Error::ContractPaused); }

        caller.require_auth();

        let mut offer = Self::_load_offer(&env, &reference)?;
        if offer.status != OfferStatus::Open {
            return Err(Error::InvalidStateTransition);
        }
        if caller != offer.counterparty || !Self::_is_whitelisted(&env, &caller) {
            return Err(Error::Unauthorized);
        }
        // Both parties must still be whitelisted when the escrow is funded
        if !Self::_is_whitelisted(&env, &offer.creator) {
            log!(&env, "Offer creator is no longer whitelisted");
            return Err(Error::Unauthorized);
        }
        if env.ledger().timestamp() >= offer.expiry {
            return Err(Error::Expired);
        }

        let funder = offer.seller().clone();
        offer.status = OfferStatus::Accepted;
        Self::_save_offer(&env, &offer);

        let vault = env.current_contract_address();
        let token_client = token::Client::new(&env, &offer.settlement_token);

        if offer.is_buy {
            if token_client.try_transfer(&caller, &vault, &offer.token_amount).is_err() {
                log!(&env, "Escrow transfer of {} from counterparty failed", offer.token_amount);
                return Err(Error::TokenTransferFailed);
            }
        } else {
            let allowance = token_client.allowance(&funder, &vault);
            if allowance < offer.token_amount {
                log!(&env, "Insufficient allowance. Required: {}, Available: {}", offer.token_amount, allowance);
                return Err(Error::InsufficientAllowance);
            }
            if token_client
                .try_transfer_from(&vault, &funder, &vault, &offer.token_amount)
                .is_err()
            {
                log!(&env, "Escrow transfer of {} from creator failed", offer.token_amount);
                return Err(Error::TokenTransferFailed);
            }
        }

        env.events().publish(
            (OFFER_ACCEPTED, reference.clone()),
            OfferAccepted {
                reference,
                counterparty: caller,
                funder,
                token_amount: offer.token_amount,
            },
        );

        Ok(offer.token_amount)
    }

    /// Releases the escrow of an accepted offer to the buyer.
    ///
    /// Called by the seller once the fiat payment has arrived off-chain.
    ///
    /// # Errors
    /// - ContractPaused: If trading is halted
    /// - NotFound: If no offer exists under `reference`
    /// - InvalidStateTransition: If the offer is not `Accepted`
    /// - Unauthorized: If `caller` is not the seller or not whitelisted
    /// - TokenTransferFailed: If the release transfer fails
    pub fn settle_offer(env: Env, caller: Address, reference: BytesN<32>) -> Result<(), Error> {
        Self::_require_initialized(&env)?;
        if Self::_is_paused(&env) { return Err(Error::ContractPaused); }

        caller.require_auth();

        let mut offer = Self::_load_offer(&env, &reference)?;
        if offer.status != OfferStatus::Accepted {
            return Err(Error::InvalidStateTransition);
        }
        if caller != *offer.seller() || !Self::_is_whitelisted(&env, &caller) {
            return Err(Error::Unauthorized);
        }

        let recipient = offer.buyer().clone();
        offer.status = OfferStatus::Settled;
        Self::_save_offer(&env, &offer);

        Self::_payout(&env, &offer.settlement_token, &recipient, offer.token_amount)?;

        env.events().publish(
            (OFFER_SETTLED, reference.clone()),
            OfferSettled {
                reference,
                recipient,
                token_amount: offer.token_amount,
                resolved_by_admin: false,
            },
        );

        Ok(())
    }

    /// Withdraws an open offer. Only its creator may do so.
    ///
    /// Nothing is escrowed while an offer is `Open`, so no tokens move.
    /// The reference stays consumed.
    ///
    /// # Errors
    /// - ContractPaused: If trading is halted
    /// - NotFound: If no offer exists under `reference`
    /// - InvalidStateTransition: If the offer is not `Open`
    /// - Unauthorized: If `caller` is not the creator or not whitelisted
    pub fn cancel_offer(env: Env, caller: Address, reference: BytesN<32>) -> Result<(), Error> {
        Self::_require_initialized(&env)?;
        if Self::_is_paused(&env) { return Err(Error::ContractPaused); }

        caller.require_auth();

        let mut offer = Self::_load_offer(&env, &reference)?;
        if offer.status != OfferStatus::Open {
            return Err(Error::InvalidStateTransition);
        }
        if caller != offer.creator || !Self::_is_whitelisted(&env, &caller) {
            return Err(Error::Unauthorized);
        }

        offer.status = OfferStatus::Cancelled;
        Self::_save_offer(&env, &offer);

        env.events().publish(
            (OFFER_CANCELLED, reference.clone()),
            OfferCancelled {
                reference,
                cancelled_by: caller,
            },
        );

        Ok(())
    }

    /// Marks an open offer whose expiry has passed as `Expired`.
    /// Anyone can call this function to clean up stale offers.
    ///
    /// # Errors
    /// - ContractPaused: If trading is halted
    /// - NotFound: If no offer exists under `reference`
    /// - InvalidStateTransition: If the offer is not `Open`
    /// - NotYetExpired: If the ledger time is still before `expiry`
    pub fn expire_offer(env: Env, reference: BytesN<32>) -> Result<(), Error> {
        Self::_require_initialized(&env)?;
        if Self::_is_paused(&env) { return Err(Error::ContractPaused); }

        let mut offer = Self::_load_offer(&env, &reference)?;
        if offer.status != OfferStatus::Open {
            return Err(Error::InvalidStateTransition);
        }

        let now = env.ledger().timestamp();
        if now < offer.expiry {
            return Err(Error::NotYetExpired);
        }

        offer.status = OfferStatus::Expired;
        Self::_save_offer(&env, &offer);

        env.events().publish(
            (OFFER_EXPIRED, reference.clone()),
            OfferExpired {
                reference,
                expiry: offer.expiry,
                swept_at: now,
            },
        );

        Ok(())
    }

    // ================================================================================================
    // QUERY FUNCTIONS (GETTERS)
    // ================================================================================================

    /// Returns the offer stored under `reference`, whatever its status.
    ///
    /// # Errors
    /// - NotFound: If the reference was never used
    pub fn get_offer(env: Env, reference: BytesN<32>) -> Result<Offer, Error> {
        Self::_load_offer(&env, &reference)
    }

    /// Lifecycle state of `reference`; `NonExistent` if it was never used.
    pub fn offer_status(env: Env, reference: BytesN<32>) -> OfferStatus {
        env.storage()
            .persistent()
            .get::<DataKey, Offer>(&DataKey::Offer(reference))
            .map(|offer| offer.status)
            .unwrap_or(OfferStatus::NonExistent)
    }

    /// Whitelist flag of `account`.
    pub fn whitelist(env: Env, account: Address) -> bool {
        Self::_is_whitelisted(&env, &account)
    }

    /// Token amount an offer with these terms would lock right now.
    ///
    /// Lets both parties reproduce the settlement amount independently before
    /// creating or accepting an offer.
    pub fn quote_settlement(
        env: Env,
        settlement_token: Address,
        fiat_amount: i128,
        fiat_to_token_rate: i128,
    ) -> Result<i128, Error> {
        let decimals = Self::_token_decimals(&env, &settlement_token)?;
        settlement::settlement_amount(fiat_amount, fiat_to_token_rate, decimals)
    }

    pub fn get_access_registry(env: Env) -> Result<Address, Error> {
        Self::_registry(&env)
    }

    pub fn is_paused(env: Env) -> bool {
        Self::_is_paused(&env)
    }

    // ================================================================================================
    // INTERNAL HELPERS
    // ================================================================================================

    fn _registry(env: &Env) -> Result<Address, Error> {
        env.storage().instance().get(&REGISTRY_KEY).ok_or(Error::NotInitialized)
    }

    fn _require_initialized(env: &Env) -> Result<(), Error> {
        Self::_registry(env).map(|_| ())
    }

    /// Asks the access registry whether `caller` is an admin.
    /// The caller must already have been `require_auth`-ed.
    fn _require_admin(env: &Env, caller: &Address) -> Result<(), Error> {
        let registry = Self::_registry(env)?;
        if !RegistryClient::new(env, &registry).is_admin(caller) {
            return Err(Error::Unauthorized);
        }
        Ok(())
    }

    fn _is_paused(env: &Env) -> bool {
        env.storage().instance().get(&PAUSED_KEY).unwrap_or(false)
    }

    fn _is_whitelisted(env: &Env, account: &Address) -> bool {
        env.storage()
            .persistent()
            .get(&DataKey::Whitelist(account.clone()))
            .unwrap_or(false)
    }

    fn _validate_address(addr: &Address) -> Result<(), Error> {
        if addr.to_string().len() == 0 {
            return Err(Error::InvalidArgument);
        }
        Ok(())
    }

    fn _load_offer(env: &Env, reference: &BytesN<32>) -> Result<Offer, Error> {
        env.storage()
            .persistent()
            .get(&DataKey::Offer(reference.clone()))
            .ok_or(Error::NotFound)
    }

    fn _save_offer(env: &Env, offer: &Offer) {
        let key = DataKey::Offer(offer.reference.clone());
        env.storage().persistent().set(&key, offer);
        env.storage().persistent().extend_ttl(&key, TTL_THRESHOLD, TTL_EXTEND_TO);
        env.storage().instance().extend_ttl(TTL_THRESHOLD, TTL_EXTEND_TO);
    }

    /// Reads `decimals()` from the token contract. Anything that does not
    /// answer like a token, or reports more precision than the rate scale,
    /// is rejected.
    fn _token_decimals(env: &Env, token: &Address) -> Result<u32, Error> {
        match token::Client::new(env, token).try_decimals() {
            Ok(Ok(decimals)) if decimals <= settlement::MAX_TOKEN_DECIMALS => Ok(decimals),
            _ => {
                log!(env, "Settlement token rejected: no usable decimals()");
                Err(Error::InvalidArgument)
            }
        }
    }

    fn _payout(env: &Env, token: &Address, recipient: &Address, amount: i128) -> Result<(), Error> {
        let token_client = token::Client::new(env, token);
        if token_client
            .try_transfer(&env.current_contract_address(), recipient, &amount)
            .is_err()
        {
            log!(env, "Failed to release {} from escrow", amount);
            return Err(Error::TokenTransferFailed);
        }
        Ok(())
    }
}
