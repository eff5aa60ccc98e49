//! Booking and cafe price calculation
//!
//! All amounts are integer cents and all ratios basis points (1/100 of a
//! percent). Rounding is half-up to the nearest cent.
use crate::config::PricingConfig;
use crate::core::types::Cents;
use serde::Serialize;

const BP_SCALE: i64 = 10_000;

/// Itemised price for a booking or order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Quote {
    pub base_cents: Cents,
    pub discount_cents: Cents,
    pub fee_cents: Cents,
    pub total_cents: Cents,
    pub credits_used: i32,
}

/// `numerator / denominator` rounded half-up, for non-negative inputs
fn div_round(numerator: i64, denominator: i64) -> i64 {
    (numerator + denominator / 2) / denominator
}

/// Apply a basis point ratio to an amount
pub fn apply_bp(amount: Cents, bp: u32) -> Cents {
    div_round(amount.max(0) * bp as i64, BP_SCALE)
}

/// Hourly rate times duration, clamped to the daily rate when one exists
pub fn workspace_base_price(
    hourly_rate_cents: Cents,
    daily_rate_cents: Option<Cents>,
    billed_minutes: i64,
) -> Cents {
    if billed_minutes <= 0 {
        return 0;
    }
    let hourly = div_round(hourly_rate_cents.max(0) * billed_minutes, 60);
    match daily_rate_cents {
        Some(daily) if daily >= 0 && hourly > daily => daily,
        _ => hourly,
    }
}

/// Gateway surcharge; zero when nothing is charged
pub fn processing_fee(amount: Cents, config: &PricingConfig) -> Cents {
    if amount <= 0 {
        return 0;
    }
    apply_bp(amount, config.processing_fee_bp) + config.processing_fee_fixed_cents
}

/// Minutes left to pay for after whole credit hours are applied
pub fn billed_minutes(duration_minutes: i64, credits_used: i32) -> i64 {
    (duration_minutes - credits_used as i64 * 60).max(0)
}

/// Price a workspace booking.
///
/// `credits_used` whole hours are covered by membership credits; the
/// holder discount applies to what remains.
pub fn quote_workspace(
    hourly_rate_cents: Cents,
    daily_rate_cents: Option<Cents>,
    duration_minutes: i64,
    credits_used: i32,
    nft_holder: bool,
    config: &PricingConfig,
) -> Quote {
    let billed = billed_minutes(duration_minutes, credits_used);
    let base = workspace_base_price(hourly_rate_cents, daily_rate_cents, billed);
    let discount =
        if nft_holder { apply_bp(base, config.nft_workspace_discount_bp).min(base) } else { 0 };
    finish(base, discount, credits_used, config)
}

/// Price a cafe order from `(unit_price, quantity)` lines
pub fn quote_cafe(lines: &[(Cents, i32)], nft_holder: bool, config: &PricingConfig) -> Quote {
    let subtotal: Cents = lines.iter().map(|&(price, qty)| price.max(0) * qty.max(0) as i64).sum();
    let discount =
        if nft_holder { apply_bp(subtotal, config.nft_cafe_discount_bp).min(subtotal) } else { 0 };
    finish(subtotal, discount, 0, config)
}

fn finish(base: Cents, discount: Cents, credits_used: i32, config: &PricingConfig) -> Quote {
    let discounted = (base - discount).max(0);
    let fee = processing_fee(discounted, config);
    Quote {
        base_cents: base,
        discount_cents: discount,
        fee_cents: fee,
        total_cents: discounted + fee,
        credits_used,
    }
}
