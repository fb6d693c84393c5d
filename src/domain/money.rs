//! Monetary types for price and volume representation.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Price represented as a Decimal for precision.
pub type Price = Decimal;

/// Volume represented as a Decimal for precision.
pub type Volume = Decimal;

/// Basis points per unit.
pub const BPS_PER_UNIT: Decimal = dec!(10000);

/// Convert basis points into a fraction (`25` -> `0.0025`).
#[must_use]
pub fn bps_to_fraction(bps: Decimal) -> Decimal {
    bps / BPS_PER_UNIT
}
