//! Fixed-point settlement arithmetic.
//!
//! Rates are integers scaled by [`RATE_SCALE`] and express whole tokens per
//! fiat unit. The token amount in base units is
//!
//! ```text
//! fiat_amount * rate * 10^decimals / RATE_SCALE
//! ```
//!
//! rounded down. Both parties can reproduce it from the offer fields alone.

use crate::types::Error;

/// 1e18, the scale of `fiat_to_token_rate`.
pub const RATE_SCALE: i128 = 1_000_000_000_000_000_000;

/// Largest token precision the vault accepts. Equal to the rate scale's
/// exponent, which keeps the divisor below an exact power of ten.
pub const MAX_TOKEN_DECIMALS: u32 = 18;

/// Token base units owed for `fiat_amount` at `fiat_to_token_rate`.
///
/// The rate counts whole tokens, so the token's precision is part of the
/// formula and `create_offer` reads `decimals()` from the token contract.
/// For an 18-decimal token the result is the plain `fiat_amount * rate`.
/// With the bare product a 7-decimal Stellar asset would lock zero base
/// units for ordinary fiat quotes.
///
/// Because `decimals <= 18`, multiplying by `10^decimals` and dividing by
/// `10^18` is the same as one division by `10^(18 - decimals)`. Rounding is
/// toward zero, which for positive inputs is rounding down.
pub fn settlement_amount(
    fiat_amount: i128,
    fiat_to_token_rate: i128,
    token_decimals: u32,
) -> Result<i128, Error> {
    if fiat_amount <= 0 || fiat_to_token_rate <= 0 || token_decimals > MAX_TOKEN_DECIMALS {
        return Err(Error::InvalidArgument);
    }

    let gross = fiat_amount
        .checked_mul(fiat_to_token_rate)
        .ok_or(Error::ArithmeticOverflow)?;
    let divisor = 10i128.pow(MAX_TOKEN_DECIMALS - token_decimals);
    let amount = gross / divisor;

    // An offer that escrows nothing cannot be settled meaningfully
    if amount == 0 {
        return Err(Error::InvalidArgument);
    }
    Ok(amount)
}
