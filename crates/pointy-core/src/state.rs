//! # Ledger State
//!
//! [`AppState`] is the complete in-memory picture of the business: every
//! collection plus the three settings singletons. It changes only through
//! [`AppState::apply`], which executes one [`WriteOp`] and returns the op
//! that would undo it.
//!
//! ## Optimistic Update Flow
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  engine op ──► Vec<WriteOp> ──► apply_all ──► inverses           │
//! │                                    │                             │
//! │                persist batch ──────┤                             │
//! │                    ok              │  err                        │
//! │                     ▼              ▼                             │
//! │                  done        replay inverses (rollback)          │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Inverses are captured before each write, so replaying them in reverse
//! order restores the exact prior state.

use std::collections::BTreeMap;

use crate::types::{Customer, ExchangeRateRecord, Product, Sale, Shift, TreasuryTransaction};
use crate::writes::WriteOp;
use crate::DEFAULT_EXCHANGE_RATE;

// =============================================================================
// AppState
// =============================================================================

/// The full in-memory ledger.
///
/// `BTreeMap` keeps iteration deterministic, which keeps reports and
/// persisted batches stable across runs.
#[derive(Debug, Clone)]
pub struct AppState {
    pub products: BTreeMap<String, Product>,
    pub customers: BTreeMap<String, Customer>,
    pub sales: BTreeMap<String, Sale>,
    pub transactions: BTreeMap<String, TreasuryTransaction>,
    pub rate_history: BTreeMap<String, ExchangeRateRecord>,
    /// Live Bs-per-USD rate applied to NEW operations only.
    pub exchange_rate: f64,
    pub categories: Vec<String>,
    /// The register singleton; `Some` while a shift is open.
    pub shift: Option<Shift>,
}

impl Default for AppState {
    fn default() -> Self {
        AppState {
            products: BTreeMap::new(),
            customers: BTreeMap::new(),
            sales: BTreeMap::new(),
            transactions: BTreeMap::new(),
            rate_history: BTreeMap::new(),
            exchange_rate: DEFAULT_EXCHANGE_RATE,
            categories: Vec::new(),
            shift: None,
        }
    }
}

impl AppState {
    pub fn new() -> Self {
        AppState::default()
    }

    /// Applies one op and returns its inverse.
    ///
    /// The inverse of an upsert is restoring the previous document (or
    /// deleting it if there was none); the inverse of a delete is
    /// restoring the removed document. Deleting a missing document is a
    /// no-op whose inverse is also a no-op.
    pub fn apply(&mut self, op: &WriteOp) -> WriteOp {
        match op {
            WriteOp::UpsertProduct(p) => {
                match self.products.insert(p.id.clone(), p.clone()) {
                    Some(prev) => WriteOp::UpsertProduct(prev),
                    None => WriteOp::DeleteProduct(p.id.clone()),
                }
            }
            WriteOp::DeleteProduct(id) => match self.products.remove(id) {
                Some(prev) => WriteOp::UpsertProduct(prev),
                None => WriteOp::DeleteProduct(id.clone()),
            },

            WriteOp::UpsertCustomer(c) => {
                match self.customers.insert(c.id.clone(), c.clone()) {
                    Some(prev) => WriteOp::UpsertCustomer(prev),
                    None => WriteOp::DeleteCustomer(c.id.clone()),
                }
            }
            WriteOp::DeleteCustomer(id) => match self.customers.remove(id) {
                Some(prev) => WriteOp::UpsertCustomer(prev),
                None => WriteOp::DeleteCustomer(id.clone()),
            },

            WriteOp::UpsertSale(s) => match self.sales.insert(s.id.clone(), s.clone()) {
                Some(prev) => WriteOp::UpsertSale(prev),
                None => WriteOp::DeleteSale(s.id.clone()),
            },
            WriteOp::DeleteSale(id) => match self.sales.remove(id) {
                Some(prev) => WriteOp::UpsertSale(prev),
                None => WriteOp::DeleteSale(id.clone()),
            },

            WriteOp::UpsertTransaction(t) => {
                match self.transactions.insert(t.id.clone(), t.clone()) {
                    Some(prev) => WriteOp::UpsertTransaction(prev),
                    None => WriteOp::DeleteTransaction(t.id.clone()),
                }
            }
            WriteOp::DeleteTransaction(id) => match self.transactions.remove(id) {
                Some(prev) => WriteOp::UpsertTransaction(prev),
                None => WriteOp::DeleteTransaction(id.clone()),
            },

            WriteOp::UpsertRateRecord(r) => {
                match self.rate_history.insert(r.id.clone(), r.clone()) {
                    Some(prev) => WriteOp::UpsertRateRecord(prev),
                    None => WriteOp::DeleteRateRecord(r.id.clone()),
                }
            }
            WriteOp::DeleteRateRecord(id) => match self.rate_history.remove(id) {
                Some(prev) => WriteOp::UpsertRateRecord(prev),
                None => WriteOp::DeleteRateRecord(id.clone()),
            },

            WriteOp::SetExchangeRate(rate) => {
                let prev = self.exchange_rate;
                self.exchange_rate = *rate;
                WriteOp::SetExchangeRate(prev)
            }

            WriteOp::SetCategories(categories) => {
                let prev = std::mem::replace(&mut self.categories, categories.clone());
                WriteOp::SetCategories(prev)
            }

            WriteOp::SetShift(shift) => {
                match self.shift.replace(shift.clone()) {
                    Some(prev) => WriteOp::SetShift(prev),
                    None => WriteOp::ClearShift,
                }
            }
            WriteOp::ClearShift => match self.shift.take() {
                Some(prev) => WriteOp::SetShift(prev),
                None => WriteOp::ClearShift,
            },
        }
    }

    /// Applies a whole batch, returning inverses in rollback order
    /// (reverse of application).
    pub fn apply_all(&mut self, ops: &[WriteOp]) -> Vec<WriteOp> {
        let mut inverses: Vec<WriteOp> = ops.iter().map(|op| self.apply(op)).collect();
        inverses.reverse();
        inverses
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
