//! # Cart Module
//!
//! The in-progress checkout: a list of frozen product snapshots plus the
//! cash-tender calculator.
//!
//! ## Cart Rules
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  Add product        stock must be > 0, else rejected             │
//! │  Add again          merges into the existing line                │
//! │  Quantity           clamped to [1, product.stock]                │
//! │  Totals             Σ price × quantity (USD), × rate for Bs      │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The cart holds [`SaleItem`] snapshots, so a product edit made while the
//! cart is open does not change lines already added.

use crate::currency::usd_to_bs;
use crate::types::{Product, SaleItem};
use crate::CASH_EPSILON_BS;

// =============================================================================
// Cart
// =============================================================================

/// An in-progress checkout.
#[derive(Debug, Clone, Default)]
pub struct Cart {
    items: Vec<SaleItem>,
}

impl Cart {
    pub fn new() -> Self {
        Cart::default()
    }

    /// Builds a cart directly from snapshots, used when re-seeding after a
    /// sale edit.
    pub fn from_items(items: Vec<SaleItem>) -> Self {
        Cart { items }
    }

    /// Adds `quantity` of a product, merging with an existing line.
    ///
    /// Returns `false` (and leaves the cart untouched) when the product is
    /// out of stock. The resulting line quantity never exceeds the
    /// product's current stock.
    pub fn add(&mut self, product: &Product, quantity: f64) -> bool {
        if product.stock <= 0.0 || quantity <= 0.0 {
            return false;
        }
        match self.items.iter_mut().find(|i| i.product_id == product.id) {
            Some(item) => {
                item.quantity = (item.quantity + quantity).min(product.stock);
            }
            None => {
                let clamped = quantity.min(product.stock);
                self.items.push(SaleItem::from_product(product, clamped));
            }
        }
        true
    }

    /// Adjusts a line's quantity by `delta`, clamped to `[1, stock]`.
    ///
    /// Dropping below one unit is not a removal; use [`Cart::remove`].
    pub fn change_quantity(&mut self, product: &Product, delta: f64) {
        if let Some(item) = self.items.iter_mut().find(|i| i.product_id == product.id) {
            item.quantity = (item.quantity + delta).min(product.stock).max(1.0);
        }
    }

    pub fn remove(&mut self, product_id: &str) {
        self.items.retain(|i| i.product_id != product_id);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[SaleItem] {
        &self.items
    }

    /// Cart total in USD.
    pub fn total_usd(&self) -> f64 {
        self.items.iter().map(|i| i.line_total()).sum()
    }

    /// Cart total in Bs at the given rate.
    pub fn total_bs(&self, rate: f64) -> f64 {
        usd_to_bs(self.total_usd(), rate)
    }
}

// =============================================================================
// Cash Tender
// =============================================================================

/// Change calculation for a cash payment in Bs.
///
/// ## Example
/// ```rust
/// use pointy_core::CashTender;
///
/// let tender = CashTender { total_bs: 100.0, tendered_bs: 150.0 };
/// assert!(tender.is_sufficient());
/// assert_eq!(tender.change_bs(), 50.0);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct CashTender {
    pub total_bs: f64,
    pub tendered_bs: f64,
}

impl CashTender {
    /// Whether the tendered cash covers the total, within
    /// [`CASH_EPSILON_BS`].
    pub fn is_sufficient(&self) -> bool {
        self.tendered_bs >= self.total_bs - CASH_EPSILON_BS
    }

    /// Change due in Bs, never negative.
    pub fn change_bs(&self) -> f64 {
        (self.tendered_bs - self.total_bs).max(0.0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
