//! Price Conversion
//!
//! Fixed-price arithmetic: payment = floor(sale_units × price / unit_scale).
//! All math is u128 with explicit overflow checks; no floating point.

use lib_types::Amount;

use crate::errors::{RaiseError, RaiseResult};

/// Payment required for a desired quantity of sale units
///
/// `price` is payment-asset smallest units per one whole sale unit;
/// `unit_scale` is the sale asset's smallest-unit scale and must be
/// non-zero (validated when the ledger is opened). The result floors
/// toward zero. A non-zero request that floors to zero payment is
/// rejected rather than admitted for free.
pub fn required_payment(
    sale_units: Amount,
    price: Amount,
    unit_scale: Amount,
) -> RaiseResult<Amount> {
    let payment = sale_units
        .checked_mul(price)
        .ok_or(RaiseError::PaymentOverflow { sale_units, price })?
        .checked_div(unit_scale)
        .ok_or(RaiseError::PaymentOverflow { sale_units, price })?;

    if payment == 0 && sale_units > 0 {
        return Err(RaiseError::ZeroPayment { sale_units });
    }

    Ok(payment)
}
