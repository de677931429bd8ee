//! # Persistence Gateway
//!
//! The contract every backend implements, plus the lowering of typed
//! [`WriteOp`]s to document paths.
//!
//! ## Document Tree
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  products/<id>            Product                                │
//! │  customers/<id>           Customer                               │
//! │  sales/<id>               Sale                                   │
//! │  treasury/<id>            TreasuryTransaction                    │
//! │  rate_history/<id>        ExchangeRateRecord                     │
//! │  settings/exchangeRate    f64                                    │
//! │  settings/categories      [String]                               │
//! │  settings/activeShift     Shift                                  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A batch write is best effort: ops are applied in order and there is no
//! cross-document atomicity guarantee. Callers keep their local state
//! optimistic and roll back when the batch fails as a whole.

use serde_json::Value;
use tokio::sync::broadcast;

use pointy_core::WriteOp;

use crate::error::StoreResult;

// =============================================================================
// Paths
// =============================================================================

/// Root collection and settings-document paths.
pub mod paths {
    pub const PRODUCTS: &str = "products";
    pub const CUSTOMERS: &str = "customers";
    pub const SALES: &str = "sales";
    pub const TREASURY: &str = "treasury";
    pub const RATE_HISTORY: &str = "rate_history";
    pub const EXCHANGE_RATE: &str = "settings/exchangeRate";
    pub const CATEGORIES: &str = "settings/categories";
    pub const ACTIVE_SHIFT: &str = "settings/activeShift";
}

fn doc(collection: &str, id: &str) -> String {
    format!("{collection}/{id}")
}

/// Lowers one write intent to `(path, value)`; `None` means delete.
pub fn lower(op: &WriteOp) -> StoreResult<(String, Option<Value>)> {
    let pair = match op {
        WriteOp::UpsertProduct(p) => (doc(paths::PRODUCTS, &p.id), Some(serde_json::to_value(p)?)),
        WriteOp::DeleteProduct(id) => (doc(paths::PRODUCTS, id), None),
        WriteOp::UpsertCustomer(c) => {
            (doc(paths::CUSTOMERS, &c.id), Some(serde_json::to_value(c)?))
        }
        WriteOp::DeleteCustomer(id) => (doc(paths::CUSTOMERS, id), None),
        WriteOp::UpsertSale(s) => (doc(paths::SALES, &s.id), Some(serde_json::to_value(s)?)),
        WriteOp::DeleteSale(id) => (doc(paths::SALES, id), None),
        WriteOp::UpsertTransaction(t) => {
            (doc(paths::TREASURY, &t.id), Some(serde_json::to_value(t)?))
        }
        WriteOp::DeleteTransaction(id) => (doc(paths::TREASURY, id), None),
        WriteOp::UpsertRateRecord(r) => (
            doc(paths::RATE_HISTORY, &r.id),
            Some(serde_json::to_value(r)?),
        ),
        WriteOp::DeleteRateRecord(id) => (doc(paths::RATE_HISTORY, id), None),
        WriteOp::SetExchangeRate(rate) => (
            paths::EXCHANGE_RATE.to_string(),
            Some(serde_json::to_value(rate)?),
        ),
        WriteOp::SetCategories(categories) => (
            paths::CATEGORIES.to_string(),
            Some(serde_json::to_value(categories)?),
        ),
        WriteOp::SetShift(shift) => (
            paths::ACTIVE_SHIFT.to_string(),
            Some(serde_json::to_value(shift)?),
        ),
        WriteOp::ClearShift => (paths::ACTIVE_SHIFT.to_string(), None),
    };
    Ok(pair)
}

/// Lowers a whole batch, preserving order.
pub fn lower_batch(ops: &[WriteOp]) -> StoreResult<Vec<(String, Option<Value>)>> {
    ops.iter().map(lower).collect()
}

// =============================================================================
// Changes and Subscriptions
// =============================================================================

/// A document change pushed to subscribers. `value: None` is a delete.
#[derive(Debug, Clone)]
pub struct Change {
    pub path: String,
    pub value: Option<Value>,
}

/// A live view of one path: the snapshot at subscribe time plus the
/// stream of subsequent changes under it.
pub struct Subscription {
    path: String,
    /// Snapshot at subscribe time. For a collection path this is an
    /// object keyed by id; `None` means nothing stored yet.
    pub initial: Option<Value>,
    receiver: broadcast::Receiver<Change>,
}

impl Subscription {
    pub fn new(
        path: impl Into<String>,
        initial: Option<Value>,
        receiver: broadcast::Receiver<Change>,
    ) -> Self {
        Subscription {
            path: path.into(),
            initial,
            receiver,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Waits for the next change at or under the subscribed path.
    ///
    /// Returns `None` when the backend is gone. A slow subscriber that
    /// lags the broadcast ring simply skips the overwritten changes.
    pub async fn next(&mut self) -> Option<Change> {
        loop {
            match self.receiver.recv().await {
                Ok(change) if path_matches(&self.path, &change.path) => return Some(change),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

fn path_matches(subscribed: &str, changed: &str) -> bool {
    changed == subscribed
        || changed
            .strip_prefix(subscribed)
            .is_some_and(|rest| rest.starts_with('/'))
}

// =============================================================================
// Gateway Trait
// =============================================================================

/// The persistence contract.
///
/// Backends store a flat tree of JSON documents addressed by path and
/// notify subscribers of every change. [`crate::LocalGateway`] is the
/// in-process fallback; a cloud KV backend implements the same surface.
#[allow(async_fn_in_trait)]
pub trait Gateway: Send + Sync {
    /// Subscribes to a collection (`"sales"`) or document
    /// (`"settings/exchangeRate"`) path.
    async fn subscribe(&self, path: &str) -> StoreResult<Subscription>;

    /// Upserts one document.
    async fn write(&self, path: &str, value: Value) -> StoreResult<()>;

    /// Deletes one document. Deleting a missing document is a no-op.
    async fn delete(&self, path: &str) -> StoreResult<()>;

    /// Applies a batch in order. Best effort; no atomicity across
    /// documents.
    async fn write_batch(&self, ops: Vec<(String, Option<Value>)>) -> StoreResult<()>;
}

// =============================================================================
// Unit Tests
// =============================================================================
