//! # Write Intents
//!
//! [`WriteOp`] is the typed vocabulary of every mutation the system can
//! make. An engine operation returns a `Vec<WriteOp>` describing the whole
//! atomic batch; the persistence layer lowers each op to a document path
//! and JSON value.
//!
//! ## Why a tagged union?
//! An untyped map of paths to arbitrary values hides what an operation
//! actually does and cannot be inverted. With an enum the compiler checks
//! every mutation site, and [`crate::AppState::apply`] can hand back the
//! exact inverse op for rollback.

use serde::{Deserialize, Serialize};

use crate::types::{Customer, ExchangeRateRecord, Product, Sale, Shift, TreasuryTransaction};

// =============================================================================
// WriteOp
// =============================================================================

/// A single typed mutation of the ledger.
///
/// Upserts carry the full entity (documents are replaced whole, never
/// patched); deletes carry the id. The `Set*` variants target the
/// singleton settings documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", content = "data")]
pub enum WriteOp {
    UpsertProduct(Product),
    DeleteProduct(String),

    UpsertCustomer(Customer),
    DeleteCustomer(String),

    UpsertSale(Sale),
    DeleteSale(String),

    UpsertTransaction(TreasuryTransaction),
    DeleteTransaction(String),

    UpsertRateRecord(ExchangeRateRecord),
    DeleteRateRecord(String),

    /// Sets the live exchange rate (Bs per USD).
    SetExchangeRate(f64),

    /// Replaces the product category list.
    SetCategories(Vec<String>),

    /// Sets the open shift (the register singleton).
    SetShift(Shift),

    /// Clears the open shift.
    ClearShift,
}

// =============================================================================
// Unit Tests
// =============================================================================
