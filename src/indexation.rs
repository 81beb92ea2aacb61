// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::TariffError;
use rust_decimal::{Decimal, RoundingStrategy};

/// South African VAT, 15%. Single known rate in the current contracts.
pub fn vat_factor() -> Decimal {
    Decimal::new(115, 2)
}

/// Tunables consulted by the formula and the warning logic. Always passed
/// in explicitly; the pure functions never read storage.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlSettings {
    pub base_diesel_price: Decimal,
    pub diesel_impact_percentage: Decimal,
    pub auto_adjust_threshold: Decimal,
    pub max_monthly_increase: Decimal,
    pub rounding_precision: u32,
    pub effective_day_of_month: u32,
}

impl Default for ControlSettings {
    fn default() -> Self {
        ControlSettings {
            base_diesel_price: Decimal::new(2150, 2),
            diesel_impact_percentage: Decimal::from(35),
            auto_adjust_threshold: Decimal::from(5),
            max_monthly_increase: Decimal::from(10),
            rounding_precision: 2,
            effective_day_of_month: 1,
        }
    }
}

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Round-half-up on the unit 10^-decimals.
pub fn round_half_up(value: Decimal, decimals: u32) -> Decimal {
    value.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero)
}

/// Proposed rate after passing a diesel-price movement through the
/// contractual impact share:
/// `base × (1 + change/100 × impact/100)`, rounded half-up.
pub fn proposed_rate(
    base_rate: Decimal,
    diesel_change_percent: Decimal,
    diesel_impact_percent: Decimal,
    decimals: u32,
) -> Decimal {
    let factor =
        Decimal::ONE + (diesel_change_percent / HUNDRED) * (diesel_impact_percent / HUNDRED);
    round_half_up(base_rate * factor, decimals)
}

/// The billable rate stored on an assignment when an operator edits it:
/// `(base + additional charges) × 1.15` when VAT is included.
pub fn compose_current_rate(
    base_rate: Decimal,
    additional_charges: Decimal,
    includes_vat: bool,
) -> Decimal {
    let subtotal = base_rate + additional_charges;
    if includes_vat {
        subtotal * vat_factor()
    } else {
        subtotal
    }
}

/// Percentage movement of the current index price against the configured
/// base price. A zero base has no meaningful delta.
pub fn change_from_base(
    current_price: Decimal,
    base_price: Decimal,
) -> Result<Decimal, TariffError> {
    if base_price.is_zero() {
        return Err(TariffError::Validation(
            "base diesel price is zero; set base_diesel_price first".into(),
        ));
    }
    Ok((current_price - base_price) / base_price * HUNDRED)
}

/// `(new − previous)/previous × 100`; 0 when there is no previous rate to
/// compare against.
pub fn adjustment_percentage(previous: Decimal, new: Decimal) -> Decimal {
    if previous.is_zero() {
        return Decimal::ZERO;
    }
    (new - previous) / previous * HUNDRED
}

/// Scale an already-composed current rate by a signed percentage. This is
/// the monthly-batch path: VAT is not re-applied here.
pub fn scaled_rate(current_rate: Decimal, percent: Decimal, decimals: u32) -> Decimal {
    round_half_up(current_rate * (Decimal::ONE + percent / HUNDRED), decimals)
}
