//! # Currency Module
//!
//! USD ⇄ Bs conversion helpers.
//!
//! ## Dual-Currency Model
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  Prices and balances are STORED in USD.                          │
//! │  Cash is HANDLED in Bs at a floating daily rate.                 │
//! │                                                                  │
//! │     usd ──× rate──► bs        bs ──÷ rate──► usd                 │
//! │                                                                  │
//! │  A Sale freezes the rate it was made at; converting a historic   │
//! │  total always uses the sale's own rate, never the live one.      │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All arithmetic is plain `f64`. Values are kept unrounded internally;
//! rounding is a display concern. The only tolerance in the system is
//! [`crate::CASH_EPSILON_BS`], applied when checking tendered cash.

// =============================================================================
// Conversions
// =============================================================================

/// Converts a USD amount to Bs at the given rate.
#[inline]
pub fn usd_to_bs(usd: f64, rate: f64) -> f64 {
    usd * rate
}

/// Converts a Bs amount to USD at the given rate.
///
/// A non-positive rate yields 0.0. Operations that record money validate
/// their rate first; this guard only keeps derived displays finite.
#[inline]
pub fn bs_to_usd(bs: f64, rate: f64) -> f64 {
    if rate > 0.0 {
        bs / rate
    } else {
        0.0
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
