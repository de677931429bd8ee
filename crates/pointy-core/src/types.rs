//! # Domain Types
//!
//! Entities for the Pointy POS ledger.
//!
//! ## Entity Relationships
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        Entity Overview                           │
//! │                                                                  │
//! │  Product ──snapshot──► SaleItem ──┐                              │
//! │                                   ├──► Sale (frozen rate)        │
//! │  Customer ◄──balance (Credit)─────┘                              │
//! │                                                                  │
//! │  TreasuryTransaction   manual income/expense, purchases, shifts  │
//! │  ExchangeRateRecord    one per calendar day (upsert-by-date)     │
//! │  Shift                 singleton cash-register session           │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Conventions
//! - Ids are UUID v4 strings (offline-safe, no coordination needed)
//! - Timestamps are `DateTime<Utc>`
//! - Monetary fields are USD unless suffixed `_bs`
//! - Serialized field names are camelCase to match the persisted documents

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::DEBT_PAYMENT_ITEM_ID;

// =============================================================================
// Product
// =============================================================================

/// How a product is sold at the register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SellingMode {
    /// Whole units at `price` each.
    #[default]
    Simple,
    /// Sold by weight; `stock` and quantities are fractional.
    Weight,
    /// Sold as packages of `units_per_package` units.
    Package,
}

/// A catalog item.
///
/// `stock` is an `f64` because weight-mode products carry fractional
/// inventory (e.g. 2.35 kg of coffee beans). Committed mutations keep
/// stock at 0 or above.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub category: String,
    /// Selling price in USD (per unit, kg, or package depending on mode).
    pub price: f64,
    /// Acquisition cost in USD, used for profit estimation.
    pub cost_price: f64,
    pub stock: f64,
    #[serde(default)]
    pub selling_mode: SellingMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units_per_package: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_per_unit: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measurement_unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

// =============================================================================
// Customer
// =============================================================================

/// A credit account holder.
///
/// `balance` is the outstanding debt in USD. It only moves through ledger
/// operations (credit sales add, debt payments subtract) and never goes
/// below zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub balance: f64,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Sale
// =============================================================================

/// Settlement method for a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    Cash,
    Card,
    Credit,
    PagoMovil,
}

impl PaymentMethod {
    /// Methods that settle immediately (everything except Credit).
    pub fn is_settled(&self) -> bool {
        !matches!(self, PaymentMethod::Credit)
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMethod::Cash => write!(f, "Cash"),
            PaymentMethod::Card => write!(f, "Card"),
            PaymentMethod::Credit => write!(f, "Credit"),
            PaymentMethod::PagoMovil => write!(f, "PagoMovil"),
        }
    }
}

/// A frozen snapshot of a product line at sale time.
///
/// ## Why a snapshot?
/// Editing a product later (price change, rename) must never alter recorded
/// history. The sale keeps its own copy of everything a receipt needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleItem {
    pub product_id: String,
    pub name: String,
    pub category: String,
    /// Unit price in USD at sale time.
    pub price: f64,
    /// Unit cost in USD at sale time (kept for audit; profit estimates use
    /// the product's current cost).
    pub cost_price: f64,
    pub quantity: f64,
}

impl SaleItem {
    /// Builds a snapshot from a live product.
    pub fn from_product(product: &Product, quantity: f64) -> Self {
        SaleItem {
            product_id: product.id.clone(),
            name: product.name.clone(),
            category: product.category.clone(),
            price: product.price,
            cost_price: product.cost_price,
            quantity,
        }
    }

    /// Line total in USD.
    pub fn line_total(&self) -> f64 {
        self.price * self.quantity
    }

    /// Whether this is the synthetic debt-payment line.
    pub fn is_debt_payment(&self) -> bool {
        self.product_id == DEBT_PAYMENT_ITEM_ID
    }
}

/// A recorded checkout (or a synthetic debt-payment record).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub items: Vec<SaleItem>,
    /// Total in USD.
    pub total: f64,
    /// Bs-per-USD rate frozen at recording time. Historic Bs figures are
    /// always `total * exchange_rate` with THIS rate.
    pub exchange_rate: f64,
    pub payment_method: PaymentMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
}

impl Sale {
    /// Total in Bs at the sale's own frozen rate.
    pub fn total_bs(&self) -> f64 {
        self.total * self.exchange_rate
    }

    /// Whether this record is a synthetic debt payment.
    pub fn is_debt_payment(&self) -> bool {
        self.items.iter().any(|i| i.is_debt_payment())
    }
}

// =============================================================================
// Treasury
// =============================================================================

/// Direction of a treasury transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    Expense,
}

/// Settlement channel for a treasury transaction.
///
/// Cash moves the physical vault; every other channel moves the bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TreasuryMethod {
    Cash,
    Transfer,
    PagoMovil,
    Card,
    PointOfSale,
    Credit,
    Zelle,
}

impl TreasuryMethod {
    pub fn is_cash(&self) -> bool {
        matches!(self, TreasuryMethod::Cash)
    }
}

/// A manual or system-generated money movement outside of sales.
///
/// `amount_bs` is authoritative: `amount` is derived as
/// `amount_bs / exchange_rate` when the transaction is recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreasuryTransaction {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub category: String,
    pub description: String,
    /// USD value, derived from `amount_bs` at `exchange_rate`.
    pub amount: f64,
    pub amount_bs: f64,
    pub exchange_rate: f64,
    pub method: TreasuryMethod,
}

impl TreasuryTransaction {
    /// Signed Bs value: income positive, expense negative.
    pub fn signed_bs(&self) -> f64 {
        match self.kind {
            TransactionType::Income => self.amount_bs,
            TransactionType::Expense => -self.amount_bs,
        }
    }
}

// =============================================================================
// Exchange Rate History
// =============================================================================

/// One day's exchange rate.
///
/// The history keeps at most one record per UTC calendar day; updating the
/// rate twice on the same day overwrites that day's record in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRateRecord {
    pub id: String,
    pub rate: f64,
    pub timestamp: DateTime<Utc>,
}

// =============================================================================
// Shift
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShiftStatus {
    Open,
    Closed,
}

/// A cash-register session. At most one shift is open at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shift {
    pub id: String,
    pub start_time: DateTime<Utc>,
    /// Opening float in Bs, taken from the vault.
    pub initial_cash: f64,
    pub status: ShiftStatus,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn test_product() -> Product {
        Product {
            id: "p1".to_string(),
            name: "Café".to_string(),
            category: "Bebidas".to_string(),
            price: 2.50,
            cost_price: 0.80,
            stock: 10.0,
            selling_mode: SellingMode::Simple,
            units_per_package: None,
            price_per_unit: None,
            measurement_unit: None,
            description: None,
            image: None,
        }
    }

    #[test]
    fn test_sale_item_snapshot_freezes_product_fields() {
        let mut product = test_product();
        let item = SaleItem::from_product(&product, 3.0);

        product.price = 9.99;
        product.name = "Renamed".to_string();

        assert_eq!(item.price, 2.50);
        assert_eq!(item.name, "Café");
        assert_eq!(item.line_total(), 7.50);
    }

    #[test]
    fn test_sale_total_bs_uses_frozen_rate() {
        let sale = Sale {
            id: "s1".to_string(),
            timestamp: Utc::now(),
            items: vec![],
            total: 2.50,
            exchange_rate: 40.0,
            payment_method: PaymentMethod::Cash,
            customer_id: None,
        };
        assert_eq!(sale.total_bs(), 100.0);
    }

    #[test]
    fn test_debt_payment_detection() {
        let item = SaleItem {
            product_id: DEBT_PAYMENT_ITEM_ID.to_string(),
            name: "Abono de Deuda".to_string(),
            category: "Pagos".to_string(),
            price: 5.0,
            cost_price: 0.0,
            quantity: 1.0,
        };
        assert!(item.is_debt_payment());
        assert!(!SaleItem::from_product(&test_product(), 1.0).is_debt_payment());
    }

    #[test]
    fn test_signed_bs() {
        let mut tx = TreasuryTransaction {
            id: "t1".to_string(),
            timestamp: Utc::now(),
            kind: TransactionType::Income,
            category: "Otros".to_string(),
            description: String::new(),
            amount: 1.0,
            amount_bs: 40.0,
            exchange_rate: 40.0,
            method: TreasuryMethod::Cash,
        };
        assert_eq!(tx.signed_bs(), 40.0);
        tx.kind = TransactionType::Expense;
        assert_eq!(tx.signed_bs(), -40.0);
    }

    #[test]
    fn test_serde_field_names_are_camel_case() {
        let product = test_product();
        let value = serde_json::to_value(&product).unwrap();
        assert!(value.get("costPrice").is_some());
        assert!(value.get("sellingMode").is_some());

        let tx_json = serde_json::json!({
            "id": "t1",
            "timestamp": Utc::now(),
            "type": "expense",
            "category": "Proveedores",
            "description": "Compra",
            "amount": 5.0,
            "amountBs": 200.0,
            "exchangeRate": 40.0,
            "method": "Cash",
        });
        let tx: TreasuryTransaction = serde_json::from_value(tx_json).unwrap();
        assert_eq!(tx.kind, TransactionType::Expense);
        assert_eq!(tx.amount_bs, 200.0);
    }
}
