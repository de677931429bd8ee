//! # Transaction Engine
//!
//! Every ledger operation lives here. An operation validates its inputs,
//! computes the COMPLETE batch of [`WriteOp`]s it implies, applies the
//! batch to local state, and returns an [`Applied`] carrying the batch and
//! its inverse.
//!
//! ## Operation Contract
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  1. Validate           reject before touching anything           │
//! │  2. Build batch        all writes, side effects included         │
//! │  3. Apply locally      optimistic, captures inverses             │
//! │  4. Hand to caller     persist batch; on failure replay inverse  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Side effects are never split across operations: a credit sale's stock
//! decrement, balance increase and sale record travel in ONE batch, so the
//! caller either persists all of it or rolls all of it back.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

use crate::cart::Cart;
use crate::error::{EngineError, EngineResult};
use crate::reporting;
use crate::state::AppState;
use crate::types::{
    Customer, ExchangeRateRecord, PaymentMethod, Product, Sale, SaleItem, Shift, ShiftStatus,
    TransactionType, TreasuryMethod, TreasuryTransaction,
};
use crate::writes::WriteOp;
use crate::{
    CLOSING_SALES_CATEGORY, DEBT_PAYMENT_CATEGORY, DEBT_PAYMENT_ITEM_ID, DEBT_PAYMENT_NAME,
    MAX_PURCHASE_DESCRIPTION, SHIFT_CLOSE_CATEGORY, SHIFT_OPEN_CATEGORY, SUPPLIER_CATEGORY,
};

// =============================================================================
// Operation Result
// =============================================================================

/// The outcome of an engine operation, already applied to local state.
///
/// `ops` is the batch to persist; `inverse` undoes it (in order) if
/// persistence fails.
#[derive(Debug, Clone)]
pub struct Applied<T> {
    pub value: T,
    pub ops: Vec<WriteOp>,
    pub inverse: Vec<WriteOp>,
}

/// One line of a restock purchase.
#[derive(Debug, Clone)]
pub struct RestockItem {
    pub product_id: String,
    pub quantity: f64,
    /// New unit cost in USD; 0 keeps the current cost.
    pub cost: f64,
    /// New selling price in USD; `None` or 0 keeps the current price.
    pub new_price: Option<f64>,
}

/// Input for a manual treasury transaction.
///
/// `amount_bs` is authoritative; the USD amount is derived at `rate`.
/// `id` is set when editing an existing transaction in place, `timestamp`
/// when backdating.
#[derive(Debug, Clone)]
pub struct ManualEntry {
    pub kind: TransactionType,
    pub amount_bs: f64,
    pub rate: f64,
    pub category: String,
    pub description: String,
    pub method: TreasuryMethod,
    pub timestamp: Option<DateTime<Utc>>,
    pub id: Option<String>,
}

/// What a closed shift sold, returned by [`TransactionEngine::close_shift`].
#[derive(Debug, Clone)]
pub struct ShiftSummary {
    pub shift: Shift,
    /// Cash sales during the shift, in Bs at each sale's frozen rate.
    pub cash_sales_bs: f64,
    /// Card + PagoMovil sales during the shift, in Bs at frozen rates.
    pub pos_sales_bs: f64,
}

// =============================================================================
// Engine
// =============================================================================

/// The Transaction Engine. Owns the ledger state; all mutations flow
/// through its operations.
#[derive(Debug, Default)]
pub struct TransactionEngine {
    state: AppState,
}

impl TransactionEngine {
    pub fn new() -> Self {
        TransactionEngine::default()
    }

    /// Builds an engine over an existing ledger, used after hydrating
    /// state from persistence.
    pub fn from_state(state: AppState) -> Self {
        TransactionEngine { state }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Replays inverse ops after a failed persistence attempt.
    pub fn rollback(&mut self, inverse: &[WriteOp]) {
        for op in inverse {
            self.state.apply(op);
        }
    }

    fn commit<T>(&mut self, value: T, ops: Vec<WriteOp>) -> Applied<T> {
        let inverse = self.state.apply_all(&ops);
        Applied {
            value,
            ops,
            inverse,
        }
    }

    // =========================================================================
    // Sales
    // =========================================================================

    /// Records a checkout.
    ///
    /// Freezes the live exchange rate into the sale. Stock is decremented
    /// per line with a floor of zero; a Credit sale adds the total to the
    /// customer's balance.
    pub fn record_sale(
        &mut self,
        cart: &Cart,
        payment_method: PaymentMethod,
        customer_id: Option<String>,
    ) -> EngineResult<Applied<Sale>> {
        if cart.is_empty() {
            return Err(EngineError::EmptyCart);
        }
        if payment_method == PaymentMethod::Credit {
            let id = customer_id.as_deref().ok_or(EngineError::CustomerRequired)?;
            if !self.state.customers.contains_key(id) {
                return Err(EngineError::CustomerNotFound(id.to_string()));
            }
        }

        let rate = self.state.exchange_rate;
        let total = cart.total_usd();
        let sale = Sale {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            items: cart.items().to_vec(),
            total,
            exchange_rate: rate,
            payment_method,
            customer_id: customer_id.clone(),
        };

        let mut ops = Vec::new();
        for item in cart.items().iter().filter(|i| !i.is_debt_payment()) {
            if let Some(product) = self.state.products.get(&item.product_id) {
                let mut updated = product.clone();
                updated.stock = (updated.stock - item.quantity).max(0.0);
                ops.push(WriteOp::UpsertProduct(updated));
            }
        }
        if payment_method == PaymentMethod::Credit {
            if let Some(id) = &customer_id {
                if let Some(customer) = self.state.customers.get(id) {
                    let mut updated = customer.clone();
                    updated.balance += total;
                    ops.push(WriteOp::UpsertCustomer(updated));
                }
            }
        }
        ops.push(WriteOp::UpsertSale(sale.clone()));

        Ok(self.commit(sale, ops))
    }

    /// Voids a recorded sale, undoing its side effects.
    ///
    /// Regular sales restore stock per line (unclamped) and, for Credit,
    /// subtract the total from the customer's balance with a floor of
    /// zero. Voiding a debt payment restores the customer's debt instead.
    pub fn void_sale(&mut self, sale_id: &str) -> EngineResult<Applied<Sale>> {
        let sale = self
            .state
            .sales
            .get(sale_id)
            .cloned()
            .ok_or_else(|| EngineError::SaleNotFound(sale_id.to_string()))?;

        let mut ops = Vec::new();
        if sale.is_debt_payment() {
            if let Some(customer) = sale
                .customer_id
                .as_ref()
                .and_then(|id| self.state.customers.get(id))
            {
                let mut updated = customer.clone();
                updated.balance += sale.total;
                ops.push(WriteOp::UpsertCustomer(updated));
            }
        } else {
            for item in sale.items.iter().filter(|i| !i.is_debt_payment()) {
                if let Some(product) = self.state.products.get(&item.product_id) {
                    let mut updated = product.clone();
                    updated.stock += item.quantity;
                    ops.push(WriteOp::UpsertProduct(updated));
                }
            }
            if sale.payment_method == PaymentMethod::Credit {
                if let Some(customer) = sale
                    .customer_id
                    .as_ref()
                    .and_then(|id| self.state.customers.get(id))
                {
                    let mut updated = customer.clone();
                    updated.balance = (updated.balance - sale.total).max(0.0);
                    ops.push(WriteOp::UpsertCustomer(updated));
                }
            }
        }
        ops.push(WriteOp::DeleteSale(sale.id.clone()));

        Ok(self.commit(sale, ops))
    }

    /// Starts correcting a sale: voids it and returns the product lines to
    /// reload into a cart.
    ///
    /// The caller is in a correction-pending state until it records the
    /// replacement sale; the void already restored stock, so the reloaded
    /// cart sees the pre-sale inventory.
    pub fn begin_edit(&mut self, sale_id: &str) -> EngineResult<Applied<Vec<SaleItem>>> {
        let sale = self
            .state
            .sales
            .get(sale_id)
            .ok_or_else(|| EngineError::SaleNotFound(sale_id.to_string()))?;

        let restore: Vec<SaleItem> = sale
            .items
            .iter()
            .filter(|i| !i.is_debt_payment())
            .cloned()
            .collect();
        if restore.is_empty() {
            return Err(EngineError::NothingToRestore(sale_id.to_string()));
        }

        let applied = self.void_sale(sale_id)?;
        Ok(Applied {
            value: restore,
            ops: applied.ops,
            inverse: applied.inverse,
        })
    }

    /// Records a payment against a customer's debt.
    ///
    /// Produces a synthetic sale (single [`DEBT_PAYMENT_ITEM_ID`] line) so
    /// the payment shows up in sales history, and reduces the balance with
    /// a floor of zero. Overpayment is absorbed.
    pub fn record_debt_payment(
        &mut self,
        customer_id: &str,
        amount: f64,
        method: PaymentMethod,
    ) -> EngineResult<Applied<Sale>> {
        if amount <= 0.0 {
            return Err(EngineError::AmountNotPositive(amount));
        }
        if !matches!(
            method,
            PaymentMethod::Cash | PaymentMethod::Card | PaymentMethod::PagoMovil
        ) {
            return Err(EngineError::InvalidPaymentMethod(method.to_string()));
        }
        let customer = self
            .state
            .customers
            .get(customer_id)
            .cloned()
            .ok_or_else(|| EngineError::CustomerNotFound(customer_id.to_string()))?;

        let sale = Sale {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            items: vec![SaleItem {
                product_id: DEBT_PAYMENT_ITEM_ID.to_string(),
                name: DEBT_PAYMENT_NAME.to_string(),
                category: DEBT_PAYMENT_CATEGORY.to_string(),
                price: amount,
                cost_price: 0.0,
                quantity: 1.0,
            }],
            total: amount,
            exchange_rate: self.state.exchange_rate,
            payment_method: method,
            customer_id: Some(customer_id.to_string()),
        };

        let mut updated = customer;
        updated.balance = (updated.balance - amount).max(0.0);

        let ops = vec![
            WriteOp::UpsertCustomer(updated),
            WriteOp::UpsertSale(sale.clone()),
        ];
        Ok(self.commit(sale, ops))
    }

    // =========================================================================
    // Inventory
    // =========================================================================

    /// Receives a supplier purchase: increments stock, optionally updates
    /// cost and price, and books one expense transaction for the total.
    pub fn restock(
        &mut self,
        items: &[RestockItem],
        method: TreasuryMethod,
        timestamp: Option<DateTime<Utc>>,
    ) -> EngineResult<Applied<TreasuryTransaction>> {
        if items.is_empty() {
            return Err(EngineError::EmptyRestock);
        }
        for item in items {
            if item.quantity <= 0.0 {
                return Err(EngineError::AmountNotPositive(item.quantity));
            }
            if !self.state.products.contains_key(&item.product_id) {
                return Err(EngineError::ProductNotFound(item.product_id.clone()));
            }
        }

        let mut ops = Vec::new();
        let mut total_cost = 0.0;
        let mut names = Vec::new();
        for item in items {
            // Presence checked above.
            if let Some(product) = self.state.products.get(&item.product_id) {
                let mut updated = product.clone();
                updated.stock += item.quantity;
                if item.cost > 0.0 {
                    updated.cost_price = item.cost;
                }
                if let Some(price) = item.new_price {
                    if price > 0.0 {
                        updated.price = price;
                    }
                }
                total_cost += item.cost * item.quantity;
                names.push(updated.name.clone());
                ops.push(WriteOp::UpsertProduct(updated));
            }
        }

        let rate = self.state.exchange_rate;
        let tx = TreasuryTransaction {
            id: Uuid::new_v4().to_string(),
            timestamp: timestamp.unwrap_or_else(Utc::now),
            kind: TransactionType::Expense,
            category: SUPPLIER_CATEGORY.to_string(),
            description: purchase_description(&names),
            amount: total_cost,
            amount_bs: total_cost * rate,
            exchange_rate: rate,
            method,
        };
        ops.push(WriteOp::UpsertTransaction(tx.clone()));

        Ok(self.commit(tx, ops))
    }

    pub fn upsert_product(&mut self, product: Product) -> Applied<Product> {
        let mut product = product;
        // Stock never goes negative, even through direct edits.
        product.stock = product.stock.max(0.0);
        let ops = vec![WriteOp::UpsertProduct(product.clone())];
        self.commit(product, ops)
    }

    pub fn delete_product(&mut self, product_id: &str) -> EngineResult<Applied<()>> {
        if !self.state.products.contains_key(product_id) {
            return Err(EngineError::ProductNotFound(product_id.to_string()));
        }
        let ops = vec![WriteOp::DeleteProduct(product_id.to_string())];
        Ok(self.commit((), ops))
    }

    /// Adds a product category if it is not already present.
    pub fn add_category(&mut self, name: &str) -> Applied<()> {
        if self.state.categories.iter().any(|c| c == name) {
            return Applied {
                value: (),
                ops: Vec::new(),
                inverse: Vec::new(),
            };
        }
        let mut categories = self.state.categories.clone();
        categories.push(name.to_string());
        let ops = vec![WriteOp::SetCategories(categories)];
        self.commit((), ops)
    }

    // =========================================================================
    // Customers
    // =========================================================================

    pub fn upsert_customer(&mut self, customer: Customer) -> Applied<Customer> {
        let mut customer = customer;
        customer.balance = customer.balance.max(0.0);
        let ops = vec![WriteOp::UpsertCustomer(customer.clone())];
        self.commit(customer, ops)
    }

    pub fn delete_customer(&mut self, customer_id: &str) -> EngineResult<Applied<()>> {
        if !self.state.customers.contains_key(customer_id) {
            return Err(EngineError::CustomerNotFound(customer_id.to_string()));
        }
        let ops = vec![WriteOp::DeleteCustomer(customer_id.to_string())];
        Ok(self.commit((), ops))
    }

    // =========================================================================
    // Treasury
    // =========================================================================

    /// Records (or edits, when `entry.id` is set) a manual transaction.
    pub fn record_manual_transaction(
        &mut self,
        entry: ManualEntry,
    ) -> EngineResult<Applied<TreasuryTransaction>> {
        if entry.amount_bs <= 0.0 {
            return Err(EngineError::AmountNotPositive(entry.amount_bs));
        }
        if entry.rate <= 0.0 {
            return Err(EngineError::RateNotPositive(entry.rate));
        }
        if let Some(id) = &entry.id {
            if !self.state.transactions.contains_key(id) {
                return Err(EngineError::TransactionNotFound(id.clone()));
            }
        }

        let tx = TreasuryTransaction {
            id: entry.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            timestamp: entry.timestamp.unwrap_or_else(Utc::now),
            kind: entry.kind,
            category: entry.category,
            description: entry.description,
            amount: entry.amount_bs / entry.rate,
            amount_bs: entry.amount_bs,
            exchange_rate: entry.rate,
            method: entry.method,
        };
        let ops = vec![WriteOp::UpsertTransaction(tx.clone())];
        Ok(self.commit(tx, ops))
    }

    pub fn delete_transaction(&mut self, transaction_id: &str) -> EngineResult<Applied<()>> {
        if !self.state.transactions.contains_key(transaction_id) {
            return Err(EngineError::TransactionNotFound(transaction_id.to_string()));
        }
        let ops = vec![WriteOp::DeleteTransaction(transaction_id.to_string())];
        Ok(self.commit((), ops))
    }

    // =========================================================================
    // Exchange Rate
    // =========================================================================

    /// Sets the live exchange rate and upserts today's history record.
    ///
    /// One record per UTC calendar day: updating twice on the same day
    /// reuses the existing record's id. Recorded sales and transactions
    /// are never touched; their rates are frozen.
    pub fn update_exchange_rate(&mut self, rate: f64) -> EngineResult<Applied<ExchangeRateRecord>> {
        if rate <= 0.0 {
            return Err(EngineError::RateNotPositive(rate));
        }

        let today = Utc::now().date_naive();
        let id = self
            .state
            .rate_history
            .values()
            .find(|r| r.timestamp.date_naive() == today)
            .map(|r| r.id.clone())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let record = ExchangeRateRecord {
            id,
            rate,
            timestamp: midday_utc(today),
        };
        let ops = vec![
            WriteOp::SetExchangeRate(rate),
            WriteOp::UpsertRateRecord(record.clone()),
        ];
        Ok(self.commit(record, ops))
    }

    /// Edits a historical rate record without touching the live rate.
    pub fn update_rate_record(
        &mut self,
        record_id: &str,
        rate: f64,
        date: NaiveDate,
    ) -> EngineResult<Applied<ExchangeRateRecord>> {
        if rate <= 0.0 {
            return Err(EngineError::RateNotPositive(rate));
        }
        if !self.state.rate_history.contains_key(record_id) {
            return Err(EngineError::RateRecordNotFound(record_id.to_string()));
        }

        let record = ExchangeRateRecord {
            id: record_id.to_string(),
            rate,
            timestamp: midday_utc(date),
        };
        let ops = vec![WriteOp::UpsertRateRecord(record.clone())];
        Ok(self.commit(record, ops))
    }

    pub fn delete_rate_record(&mut self, record_id: &str) -> EngineResult<Applied<()>> {
        if !self.state.rate_history.contains_key(record_id) {
            return Err(EngineError::RateRecordNotFound(record_id.to_string()));
        }
        let ops = vec![WriteOp::DeleteRateRecord(record_id.to_string())];
        Ok(self.commit((), ops))
    }

    // =========================================================================
    // Shifts
    // =========================================================================

    /// Opens the register with a cash float taken from the vault.
    ///
    /// Rejects a float larger than the derived vault balance unless
    /// `allow_overdraw` is set (the supervisor override after an explicit
    /// confirmation).
    pub fn open_shift(
        &mut self,
        initial_cash_bs: f64,
        allow_overdraw: bool,
    ) -> EngineResult<Applied<Shift>> {
        if self.state.shift.is_some() {
            return Err(EngineError::ShiftAlreadyOpen);
        }
        if initial_cash_bs < 0.0 {
            return Err(EngineError::AmountNotPositive(initial_cash_bs));
        }
        let available = reporting::vault_cash_bs(&self.state);
        if initial_cash_bs > available && !allow_overdraw {
            return Err(EngineError::InsufficientVaultCash {
                available_bs: available,
                requested_bs: initial_cash_bs,
            });
        }

        let rate = self.state.exchange_rate;
        let shift = Shift {
            id: Uuid::new_v4().to_string(),
            start_time: Utc::now(),
            initial_cash: initial_cash_bs,
            status: ShiftStatus::Open,
        };

        let mut ops = vec![WriteOp::SetShift(shift.clone())];
        if initial_cash_bs > 0.0 {
            ops.push(WriteOp::UpsertTransaction(TreasuryTransaction {
                id: Uuid::new_v4().to_string(),
                timestamp: shift.start_time,
                kind: TransactionType::Expense,
                category: SHIFT_OPEN_CATEGORY.to_string(),
                description: "Fondo de caja inicial".to_string(),
                amount: crate::currency::bs_to_usd(initial_cash_bs, rate),
                amount_bs: initial_cash_bs,
                exchange_rate: rate,
                method: TreasuryMethod::Cash,
            }));
        }

        Ok(self.commit(shift, ops))
    }

    /// Closes the open shift.
    ///
    /// Returns the float to the vault and books summary records for the
    /// period's cash and card/PagoMovil sales (audit trail only; derived
    /// balances skip [`CLOSING_SALES_CATEGORY`]).
    pub fn close_shift(&mut self) -> EngineResult<Applied<ShiftSummary>> {
        let shift = self.state.shift.clone().ok_or(EngineError::NoOpenShift)?;

        let now = Utc::now();
        let rate = self.state.exchange_rate;
        let mut cash_sales_bs = 0.0;
        let mut pos_sales_bs = 0.0;
        for sale in self.state.sales.values() {
            if sale.timestamp < shift.start_time {
                continue;
            }
            match sale.payment_method {
                PaymentMethod::Cash => cash_sales_bs += sale.total_bs(),
                PaymentMethod::Card | PaymentMethod::PagoMovil => pos_sales_bs += sale.total_bs(),
                PaymentMethod::Credit => {}
            }
        }

        let mut ops = Vec::new();
        if shift.initial_cash > 0.0 {
            ops.push(WriteOp::UpsertTransaction(TreasuryTransaction {
                id: Uuid::new_v4().to_string(),
                timestamp: now,
                kind: TransactionType::Income,
                category: SHIFT_CLOSE_CATEGORY.to_string(),
                description: "Devolución de fondo de caja".to_string(),
                amount: crate::currency::bs_to_usd(shift.initial_cash, rate),
                amount_bs: shift.initial_cash,
                exchange_rate: rate,
                method: TreasuryMethod::Cash,
            }));
        }
        if cash_sales_bs > 0.0 {
            ops.push(WriteOp::UpsertTransaction(TreasuryTransaction {
                id: Uuid::new_v4().to_string(),
                timestamp: now,
                kind: TransactionType::Income,
                category: CLOSING_SALES_CATEGORY.to_string(),
                description: "Ventas en efectivo del turno".to_string(),
                amount: crate::currency::bs_to_usd(cash_sales_bs, rate),
                amount_bs: cash_sales_bs,
                exchange_rate: rate,
                method: TreasuryMethod::Cash,
            }));
        }
        if pos_sales_bs > 0.0 {
            ops.push(WriteOp::UpsertTransaction(TreasuryTransaction {
                id: Uuid::new_v4().to_string(),
                timestamp: now,
                kind: TransactionType::Income,
                category: CLOSING_SALES_CATEGORY.to_string(),
                description: "Ventas por punto de venta del turno".to_string(),
                amount: crate::currency::bs_to_usd(pos_sales_bs, rate),
                amount_bs: pos_sales_bs,
                exchange_rate: rate,
                method: TreasuryMethod::PointOfSale,
            }));
        }
        ops.push(WriteOp::ClearShift);

        let summary = ShiftSummary {
            shift,
            cash_sales_bs,
            pos_sales_bs,
        };
        Ok(self.commit(summary, ops))
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn purchase_description(names: &[String]) -> String {
    let full = format!("Compra: {}", names.join(", "));
    if full.chars().count() <= MAX_PURCHASE_DESCRIPTION {
        return full;
    }
    let truncated: String = full.chars().take(MAX_PURCHASE_DESCRIPTION - 3).collect();
    format!("{truncated}...")
}

fn midday_utc(date: NaiveDate) -> DateTime<Utc> {
    let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN);
    date.and_time(noon).and_utc()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SellingMode;

    fn product(id: &str, price: f64, cost: f64, stock: f64) -> Product {
        Product {
            id: id.to_string(),
            name: format!("Product {id}"),
            category: "Test".to_string(),
            price,
            cost_price: cost,
            stock,
            selling_mode: SellingMode::Simple,
            units_per_package: None,
            price_per_unit: None,
            measurement_unit: None,
            description: None,
            image: None,
        }
    }

    fn customer(id: &str, balance: f64) -> Customer {
        Customer {
            id: id.to_string(),
            name: format!("Customer {id}"),
            phone: "0414-0000000".to_string(),
            email: None,
            balance,
            created_at: Utc::now(),
        }
    }

    fn engine_with_product() -> TransactionEngine {
        let mut engine = TransactionEngine::new();
        engine.upsert_product(product("p1", 2.50, 0.80, 10.0));
        engine
    }

    fn cart_with(engine: &TransactionEngine, product_id: &str, qty: f64) -> Cart {
        let mut cart = Cart::new();
        let p = engine.state().products[product_id].clone();
        assert!(cart.add(&p, qty));
        cart
    }

    #[test]
    fn test_cash_sale_scenario() {
        let mut engine = engine_with_product();
        engine.update_exchange_rate(40.0).unwrap();

        let cart = cart_with(&engine, "p1", 3.0);
        let applied = engine
            .record_sale(&cart, PaymentMethod::Cash, None)
            .unwrap();

        let sale = &applied.value;
        assert_eq!(sale.total, 7.50);
        assert_eq!(sale.exchange_rate, 40.0);
        assert_eq!(sale.total_bs(), 300.0);
        assert_eq!(engine.state().products["p1"].stock, 7.0);
        assert_eq!(engine.state().sales.len(), 1);
    }

    #[test]
    fn test_empty_cart_rejected() {
        let mut engine = engine_with_product();
        let err = engine
            .record_sale(&Cart::new(), PaymentMethod::Cash, None)
            .unwrap_err();
        assert!(matches!(err, EngineError::EmptyCart));
    }

    #[test]
    fn test_credit_sale_requires_customer() {
        let mut engine = engine_with_product();
        let cart = cart_with(&engine, "p1", 1.0);

        let err = engine
            .record_sale(&cart, PaymentMethod::Credit, None)
            .unwrap_err();
        assert!(matches!(err, EngineError::CustomerRequired));

        let err = engine
            .record_sale(&cart, PaymentMethod::Credit, Some("ghost".to_string()))
            .unwrap_err();
        assert!(matches!(err, EngineError::CustomerNotFound(_)));
        // Rejection left no trace.
        assert_eq!(engine.state().products["p1"].stock, 10.0);
        assert!(engine.state().sales.is_empty());
    }

    #[test]
    fn test_credit_sales_accumulate_balance() {
        let mut engine = engine_with_product();
        engine.upsert_customer(customer("c1", 0.0));

        for _ in 0..2 {
            let cart = cart_with(&engine, "p1", 1.0);
            engine
                .record_sale(&cart, PaymentMethod::Credit, Some("c1".to_string()))
                .unwrap();
        }
        assert_eq!(engine.state().customers["c1"].balance, 5.00);
        assert_eq!(engine.state().products["p1"].stock, 8.0);
    }

    #[test]
    fn test_stock_clamped_at_zero() {
        let mut engine = engine_with_product();
        // Force a quantity above stock through a pre-built snapshot.
        let p = engine.state().products["p1"].clone();
        let cart = Cart::from_items(vec![SaleItem::from_product(&p, 25.0)]);

        engine
            .record_sale(&cart, PaymentMethod::Cash, None)
            .unwrap();
        assert_eq!(engine.state().products["p1"].stock, 0.0);
    }

    #[test]
    fn test_void_restores_stock_and_balance() {
        let mut engine = engine_with_product();
        engine.upsert_customer(customer("c1", 0.0));

        let cart = cart_with(&engine, "p1", 3.0);
        let applied = engine
            .record_sale(&cart, PaymentMethod::Credit, Some("c1".to_string()))
            .unwrap();
        let sale_id = applied.value.id.clone();
        assert_eq!(engine.state().products["p1"].stock, 7.0);
        assert_eq!(engine.state().customers["c1"].balance, 7.50);

        engine.void_sale(&sale_id).unwrap();
        assert_eq!(engine.state().products["p1"].stock, 10.0);
        assert_eq!(engine.state().customers["c1"].balance, 0.0);
        assert!(engine.state().sales.is_empty());
    }

    #[test]
    fn test_void_unknown_sale() {
        let mut engine = engine_with_product();
        let err = engine.void_sale("nope").unwrap_err();
        assert!(matches!(err, EngineError::SaleNotFound(_)));
    }

    #[test]
    fn test_debt_payment_reduces_balance() {
        let mut engine = TransactionEngine::new();
        engine.upsert_customer(customer("c1", 5.00));

        let applied = engine
            .record_debt_payment("c1", 2.00, PaymentMethod::Cash)
            .unwrap();
        assert_eq!(engine.state().customers["c1"].balance, 3.00);

        let sale = &applied.value;
        assert!(sale.is_debt_payment());
        assert_eq!(sale.total, 2.00);
        assert_eq!(sale.items[0].name, DEBT_PAYMENT_NAME);
        assert_eq!(sale.customer_id.as_deref(), Some("c1"));
    }

    #[test]
    fn test_debt_overpayment_absorbed() {
        let mut engine = TransactionEngine::new();
        engine.upsert_customer(customer("c1", 5.00));

        engine
            .record_debt_payment("c1", 8.00, PaymentMethod::Card)
            .unwrap();
        assert_eq!(engine.state().customers["c1"].balance, 0.0);
    }

    #[test]
    fn test_debt_payment_rejects_credit_method() {
        let mut engine = TransactionEngine::new();
        engine.upsert_customer(customer("c1", 5.00));

        let err = engine
            .record_debt_payment("c1", 2.00, PaymentMethod::Credit)
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidPaymentMethod(_)));

        let err = engine
            .record_debt_payment("c1", -1.0, PaymentMethod::Cash)
            .unwrap_err();
        assert!(matches!(err, EngineError::AmountNotPositive(_)));
    }

    #[test]
    fn test_void_debt_payment_restores_debt() {
        let mut engine = TransactionEngine::new();
        engine.upsert_customer(customer("c1", 5.00));

        let applied = engine
            .record_debt_payment("c1", 2.00, PaymentMethod::Cash)
            .unwrap();
        assert_eq!(engine.state().customers["c1"].balance, 3.00);

        engine.void_sale(&applied.value.id).unwrap();
        assert_eq!(engine.state().customers["c1"].balance, 5.00);
        // No stock movement happened either way.
        assert!(engine.state().products.is_empty());
    }

    #[test]
    fn test_begin_edit_returns_items() {
        let mut engine = engine_with_product();
        let cart = cart_with(&engine, "p1", 3.0);
        let applied = engine
            .record_sale(&cart, PaymentMethod::Cash, None)
            .unwrap();
        let sale_id = applied.value.id.clone();

        let edit = engine.begin_edit(&sale_id).unwrap();
        assert_eq!(edit.value.len(), 1);
        assert_eq!(edit.value[0].quantity, 3.0);
        // Voided: sale gone, stock restored.
        assert!(engine.state().sales.is_empty());
        assert_eq!(engine.state().products["p1"].stock, 10.0);
    }

    #[test]
    fn test_begin_edit_rejects_debt_payment() {
        let mut engine = TransactionEngine::new();
        engine.upsert_customer(customer("c1", 5.00));
        let applied = engine
            .record_debt_payment("c1", 2.00, PaymentMethod::Cash)
            .unwrap();

        let err = engine.begin_edit(&applied.value.id).unwrap_err();
        assert!(matches!(err, EngineError::NothingToRestore(_)));
        // The sale survives a rejected edit.
        assert_eq!(engine.state().sales.len(), 1);
    }

    #[test]
    fn test_restock_scenario() {
        let mut engine = engine_with_product();
        engine.update_exchange_rate(40.0).unwrap();

        let applied = engine
            .restock(
                &[RestockItem {
                    product_id: "p1".to_string(),
                    quantity: 5.0,
                    cost: 1.00,
                    new_price: Some(3.00),
                }],
                TreasuryMethod::Cash,
                None,
            )
            .unwrap();

        let p = &engine.state().products["p1"];
        assert_eq!(p.stock, 15.0);
        assert_eq!(p.cost_price, 1.00);
        assert_eq!(p.price, 3.00);

        let tx = &applied.value;
        assert_eq!(tx.kind, TransactionType::Expense);
        assert_eq!(tx.category, SUPPLIER_CATEGORY);
        assert_eq!(tx.amount, 5.00);
        assert_eq!(tx.amount_bs, 200.0);
    }

    #[test]
    fn test_restock_keeps_zero_cost_and_price() {
        let mut engine = engine_with_product();
        engine
            .restock(
                &[RestockItem {
                    product_id: "p1".to_string(),
                    quantity: 2.0,
                    cost: 0.0,
                    new_price: None,
                }],
                TreasuryMethod::Transfer,
                None,
            )
            .unwrap();

        let p = &engine.state().products["p1"];
        assert_eq!(p.cost_price, 0.80);
        assert_eq!(p.price, 2.50);
        assert_eq!(p.stock, 12.0);
    }

    #[test]
    fn test_restock_rejects_unknown_product() {
        let mut engine = engine_with_product();
        let err = engine
            .restock(
                &[RestockItem {
                    product_id: "ghost".to_string(),
                    quantity: 1.0,
                    cost: 1.0,
                    new_price: None,
                }],
                TreasuryMethod::Cash,
                None,
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::ProductNotFound(_)));

        let err = engine.restock(&[], TreasuryMethod::Cash, None).unwrap_err();
        assert!(matches!(err, EngineError::EmptyRestock));
    }

    #[test]
    fn test_purchase_description_truncation() {
        let names: Vec<String> = (0..30).map(|i| format!("Producto {i}")).collect();
        let desc = purchase_description(&names);
        assert_eq!(desc.chars().count(), MAX_PURCHASE_DESCRIPTION);
        assert!(desc.ends_with("..."));
        assert!(desc.starts_with("Compra: "));

        let short = purchase_description(&["Café".to_string()]);
        assert_eq!(short, "Compra: Café");
    }

    #[test]
    fn test_manual_transaction_derives_usd() {
        let mut engine = TransactionEngine::new();
        let applied = engine
            .record_manual_transaction(ManualEntry {
                kind: TransactionType::Income,
                amount_bs: 200.0,
                rate: 40.0,
                category: "Otros".to_string(),
                description: "Venta de hielo".to_string(),
                method: TreasuryMethod::PagoMovil,
                timestamp: None,
                id: None,
            })
            .unwrap();
        assert_eq!(applied.value.amount, 5.00);
        assert_eq!(applied.value.amount_bs, 200.0);
    }

    #[test]
    fn test_manual_transaction_validation() {
        let entry = |amount_bs: f64, rate: f64| ManualEntry {
            kind: TransactionType::Income,
            amount_bs,
            rate,
            category: "Otros".to_string(),
            description: String::new(),
            method: TreasuryMethod::Cash,
            timestamp: None,
            id: None,
        };

        let mut engine = TransactionEngine::new();
        assert!(matches!(
            engine.record_manual_transaction(entry(0.0, 40.0)),
            Err(EngineError::AmountNotPositive(_))
        ));
        assert!(matches!(
            engine.record_manual_transaction(entry(100.0, 0.0)),
            Err(EngineError::RateNotPositive(_))
        ));
    }

    #[test]
    fn test_manual_transaction_edit_in_place() {
        let mut engine = TransactionEngine::new();
        let applied = engine
            .record_manual_transaction(ManualEntry {
                kind: TransactionType::Expense,
                amount_bs: 100.0,
                rate: 40.0,
                category: "Servicios".to_string(),
                description: "Luz".to_string(),
                method: TreasuryMethod::Cash,
                timestamp: None,
                id: None,
            })
            .unwrap();
        let id = applied.value.id.clone();

        engine
            .record_manual_transaction(ManualEntry {
                kind: TransactionType::Expense,
                amount_bs: 150.0,
                rate: 50.0,
                category: "Servicios".to_string(),
                description: "Luz (corregido)".to_string(),
                method: TreasuryMethod::Cash,
                timestamp: None,
                id: Some(id.clone()),
            })
            .unwrap();

        assert_eq!(engine.state().transactions.len(), 1);
        assert_eq!(engine.state().transactions[&id].amount_bs, 150.0);
        assert_eq!(engine.state().transactions[&id].amount, 3.0);

        engine.delete_transaction(&id).unwrap();
        assert!(engine.state().transactions.is_empty());
    }

    #[test]
    fn test_rate_update_upserts_today() {
        let mut engine = TransactionEngine::new();
        let first = engine.update_exchange_rate(40.0).unwrap();
        assert_eq!(engine.state().exchange_rate, 40.0);
        assert_eq!(engine.state().rate_history.len(), 1);

        let second = engine.update_exchange_rate(41.5).unwrap();
        assert_eq!(engine.state().exchange_rate, 41.5);
        // Same calendar day reuses the record.
        assert_eq!(engine.state().rate_history.len(), 1);
        assert_eq!(first.value.id, second.value.id);
    }

    #[test]
    fn test_rate_update_never_rewrites_sales() {
        let mut engine = engine_with_product();
        engine.update_exchange_rate(40.0).unwrap();
        let cart = cart_with(&engine, "p1", 1.0);
        let applied = engine
            .record_sale(&cart, PaymentMethod::Cash, None)
            .unwrap();
        let sale_id = applied.value.id.clone();

        engine.update_exchange_rate(80.0).unwrap();
        assert_eq!(engine.state().sales[&sale_id].exchange_rate, 40.0);
        assert_eq!(engine.state().sales[&sale_id].total_bs(), 100.0);
    }

    #[test]
    fn test_rate_record_edit_and_delete() {
        let mut engine = TransactionEngine::new();
        let applied = engine.update_exchange_rate(40.0).unwrap();
        let id = applied.value.id.clone();

        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        engine.update_rate_record(&id, 36.5, date).unwrap();
        let record = &engine.state().rate_history[&id];
        assert_eq!(record.rate, 36.5);
        assert_eq!(record.timestamp.date_naive(), date);
        // Live rate untouched by history edits.
        assert_eq!(engine.state().exchange_rate, 40.0);

        engine.delete_rate_record(&id).unwrap();
        assert!(engine.state().rate_history.is_empty());
        assert!(matches!(
            engine.delete_rate_record(&id),
            Err(EngineError::RateRecordNotFound(_))
        ));
    }

    #[test]
    fn test_invalid_rate_rejected() {
        let mut engine = TransactionEngine::new();
        assert!(matches!(
            engine.update_exchange_rate(0.0),
            Err(EngineError::RateNotPositive(_))
        ));
        assert!(matches!(
            engine.update_exchange_rate(-4.0),
            Err(EngineError::RateNotPositive(_))
        ));
    }

    fn seed_vault(engine: &mut TransactionEngine, amount_bs: f64) {
        engine
            .record_manual_transaction(ManualEntry {
                kind: TransactionType::Income,
                amount_bs,
                rate: 40.0,
                category: "Capital".to_string(),
                description: "Fondo inicial".to_string(),
                method: TreasuryMethod::Cash,
                timestamp: None,
                id: None,
            })
            .unwrap();
    }

    #[test]
    fn test_shift_lifecycle() {
        let mut engine = engine_with_product();
        engine.update_exchange_rate(40.0).unwrap();
        seed_vault(&mut engine, 1000.0);

        engine.open_shift(200.0, false).unwrap();
        assert!(engine.state().shift.is_some());
        // Float left the vault.
        assert_eq!(reporting::vault_cash_bs(engine.state()), 800.0);

        // Second open rejected while one is running.
        assert!(matches!(
            engine.open_shift(50.0, false),
            Err(EngineError::ShiftAlreadyOpen)
        ));

        // A cash sale during the shift: 2.50 USD at 40 = 100 Bs.
        let cart = cart_with(&engine, "p1", 1.0);
        engine
            .record_sale(&cart, PaymentMethod::Cash, None)
            .unwrap();
        assert_eq!(reporting::vault_cash_bs(engine.state()), 900.0);

        let applied = engine.close_shift().unwrap();
        let summary = &applied.value;
        assert_eq!(summary.cash_sales_bs, 100.0);
        assert_eq!(summary.pos_sales_bs, 0.0);
        assert!(engine.state().shift.is_none());
        // Float returned; closing summaries do not double-count the sale.
        assert_eq!(reporting::vault_cash_bs(engine.state()), 1100.0);
    }

    #[test]
    fn test_shift_overdraw_guard() {
        let mut engine = TransactionEngine::new();
        seed_vault(&mut engine, 100.0);

        let err = engine.open_shift(500.0, false).unwrap_err();
        match err {
            EngineError::InsufficientVaultCash {
                available_bs,
                requested_bs,
            } => {
                assert_eq!(available_bs, 100.0);
                assert_eq!(requested_bs, 500.0);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(engine.state().shift.is_none());

        // The override goes through.
        engine.open_shift(500.0, true).unwrap();
        assert!(engine.state().shift.is_some());
    }

    #[test]
    fn test_close_without_open() {
        let mut engine = TransactionEngine::new();
        assert!(matches!(
            engine.close_shift(),
            Err(EngineError::NoOpenShift)
        ));
    }

    #[test]
    fn test_rollback_restores_state() {
        let mut engine = engine_with_product();
        engine.upsert_customer(customer("c1", 0.0));
        engine.update_exchange_rate(40.0).unwrap();

        let cart = cart_with(&engine, "p1", 3.0);
        let applied = engine
            .record_sale(&cart, PaymentMethod::Credit, Some("c1".to_string()))
            .unwrap();
        assert_eq!(engine.state().products["p1"].stock, 7.0);
        assert_eq!(engine.state().customers["c1"].balance, 7.50);

        engine.rollback(&applied.inverse);
        assert_eq!(engine.state().products["p1"].stock, 10.0);
        assert_eq!(engine.state().customers["c1"].balance, 0.0);
        assert!(engine.state().sales.is_empty());
    }

    #[test]
    fn test_add_category_dedup() {
        let mut engine = TransactionEngine::new();
        engine.add_category("Bebidas");
        engine.add_category("Dulces");
        let applied = engine.add_category("Bebidas");
        assert!(applied.ops.is_empty());
        assert_eq!(engine.state().categories, vec!["Bebidas", "Dulces"]);
    }

    #[test]
    fn test_upsert_clamps_negative_inputs() {
        let mut engine = TransactionEngine::new();
        engine.upsert_product(product("p1", 1.0, 0.5, -3.0));
        assert_eq!(engine.state().products["p1"].stock, 0.0);

        engine.upsert_customer(customer("c1", -10.0));
        assert_eq!(engine.state().customers["c1"].balance, 0.0);
    }
}
