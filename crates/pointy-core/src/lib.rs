//! # pointy-core: Pure Business Logic for Pointy POS
//!
//! This crate is the **heart** of Pointy POS, a dual-currency (USD / Bs)
//! point-of-sale and administration system for a small café. It contains
//! all business logic as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                     Pointy POS Architecture                      │
//! │                                                                  │
//! │  ┌────────────────────────────────────────────────────────────┐  │
//! │  │                  Caller (UI / service layer)               │  │
//! │  └───────────────────────────────┬────────────────────────────┘  │
//! │                                  │                               │
//! │  ┌───────────────────────────────▼────────────────────────────┐  │
//! │  │              ★ pointy-core (THIS CRATE) ★                  │  │
//! │  │                                                            │  │
//! │  │  ┌─────────┐ ┌──────────┐ ┌────────┐ ┌───────────────┐     │  │
//! │  │  │  types  │ │  engine  │ │  cart  │ │   reporting   │     │  │
//! │  │  │ Product │ │ WriteOp  │ │  Cart  │ │ ReportWindow  │     │  │
//! │  │  │  Sale   │ │ batches  │ │ Tender │ │   balances    │     │  │
//! │  │  └─────────┘ └──────────┘ └────────┘ └───────────────┘     │  │
//! │  │                                                            │  │
//! │  │   NO I/O • NO NETWORK • PURE FUNCTIONS                     │  │
//! │  └───────────────────────────────┬────────────────────────────┘  │
//! │                                  │                               │
//! │  ┌───────────────────────────────▼────────────────────────────┐  │
//! │  │               pointy-store (Persistence Layer)             │  │
//! │  │       Gateway contract, local KV backend, seeding          │  │
//! │  └────────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Customer, Sale, Shift, etc.)
//! - [`currency`] - USD ⇄ Bs conversion helpers
//! - [`cart`] - Cart built from frozen product snapshots
//! - [`writes`] - Typed write-intents ([`WriteOp`]) describing every mutation
//! - [`state`] - In-memory ledger state with inverse-producing `apply`
//! - [`engine`] - The Transaction Engine: every operation as an atomic batch
//! - [`reporting`] - Reconciliation and report view-models
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Atomic intent batches**: every operation computes its complete set of
//!    writes up front; callers persist the batch and roll back on failure
//! 2. **No I/O**: network and file system access is FORBIDDEN here
//! 3. **Frozen rates**: a sale stores the exchange rate it was made at, so
//!    history never drifts when the live rate changes
//! 4. **Explicit Errors**: all errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod currency;
pub mod engine;
pub mod error;
pub mod reporting;
pub mod state;
pub mod types;
pub mod writes;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use pointy_core::Sale` instead of
// `use pointy_core::types::Sale`

pub use cart::{Cart, CashTender};
pub use engine::{Applied, ManualEntry, RestockItem, ShiftSummary, TransactionEngine};
pub use error::{EngineError, EngineResult};
pub use reporting::{ReportWindow, Summary};
pub use state::AppState;
pub use types::*;
pub use writes::WriteOp;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Sentinel product id for the synthetic sale recorded by a debt payment.
///
/// ## Why a sentinel?
/// Debt payments flow through the same sales ledger as regular checkouts so
/// reports and history stay uniform. Marking the single line item with this
/// id lets stock and profit logic recognize and skip it.
pub const DEBT_PAYMENT_ITEM_ID: &str = "debt_payment";

/// Display name for the synthetic debt-payment line item.
pub const DEBT_PAYMENT_NAME: &str = "Abono de Deuda";

/// Category for the synthetic debt-payment line item.
pub const DEBT_PAYMENT_CATEGORY: &str = "Pagos";

/// Treasury category for supplier purchase expenses booked by a restock.
pub const SUPPLIER_CATEGORY: &str = "Proveedores";

/// Treasury category for the cash float taken out when a shift opens.
pub const SHIFT_OPEN_CATEGORY: &str = "Apertura de Caja";

/// Treasury category for the cash float returned when a shift closes.
pub const SHIFT_CLOSE_CATEGORY: &str = "Caja (Cierre)";

/// Treasury category for the per-shift sales summary records.
///
/// Transactions in this category are an audit trail only: every sale already
/// feeds the derived vault and bank balances individually, so the balance
/// sums skip this category to avoid counting revenue twice.
pub const CLOSING_SALES_CATEGORY: &str = "Ventas (Cierre)";

/// Tolerance (in Bs) when deciding whether tendered cash covers a total.
///
/// ## Why a tolerance?
/// Bolívar cash is handled in rounded denominations while totals come from
/// floating-point USD × rate conversions. Requiring exact coverage would
/// reject payments that are short by fractions of a céntimo.
pub const CASH_EPSILON_BS: f64 = 0.01;

/// Live exchange rate (Bs per USD) assumed when nothing has been stored yet.
pub const DEFAULT_EXCHANGE_RATE: f64 = 47.90;

/// Maximum length of an auto-generated purchase description.
pub const MAX_PURCHASE_DESCRIPTION: usize = 100;
