//! Server-side price recomputation for custom-size variants.
//!
//! The declared price is recomputed from the dimensional inputs before any
//! remote call. A mismatch means the client-side price was tampered with (or
//! the two sides disagree on the formula) and the request is rejected.

use rust_decimal::Decimal;

/// Area divisor: width and height arrive in centimeters, pricing is per
/// square meter.
const AREA_DIVISOR: u32 = 10_000;

/// Currency rounding, 2 decimal places.
const PRICE_SCALE: u32 = 2;

/// Compute the expected price: `base × (width × height / 10 000) + Σ extras`,
/// rounded to 2 decimal places. The result always carries exactly two
/// decimal places so it formats as a currency amount.
#[must_use]
pub fn expected_price(base: Decimal, width: u32, height: u32, extras: &[Decimal]) -> Decimal {
    let area = Decimal::from(width) * Decimal::from(height) / Decimal::from(AREA_DIVISOR);
    let extras_total: Decimal = extras.iter().copied().sum();
    let mut total = (base * area + extras_total).round_dp(PRICE_SCALE);
    total.rescale(PRICE_SCALE);
    total
}

/// Whether a declared price matches the recomputed one within currency
/// rounding.
#[must_use]
pub fn declared_price_matches(declared: Decimal, expected: Decimal) -> bool {
    declared.round_dp(PRICE_SCALE) == expected
}
