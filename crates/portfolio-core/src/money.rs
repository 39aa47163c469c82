//! Fixed-scale decimal arithmetic shared by every calculation.
//!
//! All cost-basis bookkeeping runs at scale 10 with HALF_UP rounding
//! (midpoint away from zero). Every division is guarded: a non-positive
//! denominator yields zero instead of panicking, so the engine is total
//! over its documented input domain.

use rust_decimal::{Decimal, RoundingStrategy};

/// Scale used for all intermediate cost/quantity divisions.
pub const CALCULATION_SCALE: u32 = 10;

/// Scale used for synthetic share counts in rolling-window positions.
pub const SHARE_SCALE: u32 = 8;

/// Day-count denominator for annualization.
pub const DAYS_PER_YEAR: f64 = 365.25;

/// `a / b` at [`CALCULATION_SCALE`], HALF_UP. Zero when `b <= 0`.
pub fn safe_div(a: Decimal, b: Decimal) -> Decimal {
    div_at_scale(a, b, CALCULATION_SCALE)
}

/// `a / b` at an explicit scale, HALF_UP. Zero when `b <= 0`.
pub fn div_at_scale(a: Decimal, b: Decimal, scale: u32) -> Decimal {
    if b <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (a / b).round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero)
}

/// Round to [`CALCULATION_SCALE`], HALF_UP.
pub fn round_scale(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(CALCULATION_SCALE, RoundingStrategy::MidpointAwayFromZero)
}
