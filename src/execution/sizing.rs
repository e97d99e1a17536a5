use rust_decimal::{Decimal, RoundingStrategy};
use std::fmt;

use crate::models::{Balances, LotConstraint, Side};

/// Sizing limits applied to every candidate order
#[derive(Debug, Clone, PartialEq)]
pub struct SizingParams {
    /// Share of the relevant free balance committed per trade, in (0, 1]
    pub risk_fraction: Decimal,
    /// Smallest quantity worth sending to the venue
    pub min_qty: Decimal,
    /// Also require `notional >= price * min_qty` on sells
    pub min_notional_on_sell: bool,
}

/// A candidate order too small to submit.
///
/// This is an expected outcome; the cycle records it as "no action".
#[derive(Debug, Clone, PartialEq)]
pub struct BelowMinimum {
    pub side: Side,
    pub quantity: Decimal,
    pub notional: Decimal,
    pub min_qty: Decimal,
}

impl fmt::Display for BelowMinimum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} quantity {} (notional {}) below minimum {}",
            self.side, self.quantity, self.notional, self.min_qty
        )
    }
}

/// Round a quantity to the nearest multiple of the lot step
///
/// Rounds at `round(-log10(step_size))` decimal digits, halves to even.
/// A non-positive step leaves the quantity untouched.
pub fn quantize(quantity: Decimal, lot: &LotConstraint) -> Decimal {
    let Some(precision) = lot.precision() else {
        return quantity;
    };

    if precision >= 0 {
        return quantity.round_dp_with_strategy(precision as u32, RoundingStrategy::MidpointNearestEven);
    }

    // Steps of 10, 100, ...: round to whole multiples of the step
    let factor = (0..precision.unsigned_abs())
        .try_fold(Decimal::ONE, |acc, _| acc.checked_mul(Decimal::TEN));
    let Some(factor) = factor else {
        // Step beyond the representable range: nothing rounds up to it
        return Decimal::ZERO;
    };
    (quantity / factor).round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven) * factor
}

/// Size an order for `side` against free balances
///
/// - Buy: notional = quote_free * risk_fraction, quantity = notional / price
/// - Sell: quantity = base_free * risk_fraction
///
/// The quantity is quantized to the lot step and must reach `min_qty`.
/// Buys must also carry a notional of at least `price * min_qty`.
pub fn size_order(
    balances: &Balances,
    price: Decimal,
    lot: &LotConstraint,
    params: &SizingParams,
    side: Side,
) -> Result<Decimal, BelowMinimum> {
    let (raw_quantity, notional) = match side {
        Side::Buy => {
            let notional = balances.quote_free * params.risk_fraction;
            let quantity = if price > Decimal::ZERO {
                notional / price
            } else {
                Decimal::ZERO
            };
            (quantity, notional)
        }
        Side::Sell => {
            let quantity = balances.base_free * params.risk_fraction;
            (quantity, quantity * price)
        }
    };

    let quantity = quantize(raw_quantity, lot);

    let reject = || BelowMinimum {
        side,
        quantity,
        notional,
        min_qty: params.min_qty,
    };

    if price <= Decimal::ZERO || quantity <= Decimal::ZERO || quantity < params.min_qty {
        return Err(reject());
    }

    let guard_notional = match side {
        Side::Buy => true,
        Side::Sell => params.min_notional_on_sell,
    };
    if guard_notional && notional < price * params.min_qty {
        return Err(reject());
    }

    Ok(quantity)
}
