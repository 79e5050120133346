//! Money helpers. All arithmetic stays at full `Decimal` precision; rounding to
//! cents happens only when a value is presented.

use rust_decimal::{Decimal, RoundingStrategy};

/// Round to two decimal places for display (half away from zero).
pub fn round_display(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

/// `amount × percentage / 100`, unrounded.
pub fn percent_of(amount: Decimal, percentage: Decimal) -> Decimal {
    amount * percentage / Decimal::ONE_HUNDRED
}

/// Format an amount in Brazilian reais, e.g. `R$ 77.90`.
pub fn format_brl(amount: Decimal) -> String {
    format!("R$ {}", round_display(amount))
}
