//! # POS Service
//!
//! The optimistic-command wrapper that every caller goes through. One
//! uniform policy for all operations:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  1. Lock the engine                                              │
//! │  2. Run the operation (validates, applies locally, returns the   │
//! │     WriteOp batch and its inverse)                               │
//! │  3. Lower the batch to document paths, push through the gateway  │
//! │  4. On ANY failure: replay the inverse ops, surface the error    │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Local state is therefore always either ahead of storage by exactly
//! one in-flight batch, or equal to it.

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use pointy_core::{
    reporting, Applied, AppState, Cart, Customer, ManualEntry, PaymentMethod, Product,
    ReportWindow, RestockItem, Sale, SaleItem, Shift, ShiftSummary, Summary, TransactionEngine,
    TreasuryMethod, TreasuryTransaction,
};

use crate::error::StoreResult;
use crate::gateway::{self, paths, Gateway};

// =============================================================================
// PosService
// =============================================================================

/// The engine plus a gateway, behind one async surface.
pub struct PosService<G: Gateway> {
    engine: Mutex<TransactionEngine>,
    gateway: G,
}

impl<G: Gateway> PosService<G> {
    pub fn new(gateway: G) -> Self {
        PosService {
            engine: Mutex::new(TransactionEngine::new()),
            gateway,
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Rebuilds local state from the gateway's current snapshots.
    pub async fn hydrate(&self) -> StoreResult<()> {
        let mut state = AppState::new();

        state.products = self.collection(paths::PRODUCTS).await?;
        state.customers = self.collection(paths::CUSTOMERS).await?;
        state.sales = self.collection(paths::SALES).await?;
        state.transactions = self.collection(paths::TREASURY).await?;
        state.rate_history = self.collection(paths::RATE_HISTORY).await?;

        if let Some(rate) = self.document::<f64>(paths::EXCHANGE_RATE).await? {
            state.exchange_rate = rate;
        }
        if let Some(categories) = self.document::<Vec<String>>(paths::CATEGORIES).await? {
            state.categories = categories;
        }
        state.shift = self.document::<Shift>(paths::ACTIVE_SHIFT).await?;

        info!(
            products = state.products.len(),
            customers = state.customers.len(),
            sales = state.sales.len(),
            transactions = state.transactions.len(),
            "State hydrated"
        );
        *self.engine.lock().await = TransactionEngine::from_state(state);
        Ok(())
    }

    async fn collection<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> StoreResult<BTreeMap<String, T>> {
        let subscription = self.gateway.subscribe(path).await?;
        let mut map = BTreeMap::new();
        if let Some(Value::Object(entries)) = subscription.initial {
            for (id, value) in entries {
                match serde_json::from_value(value) {
                    Ok(item) => {
                        map.insert(id, item);
                    }
                    // A malformed document must not take the whole store down.
                    Err(e) => warn!(path = %path, id = %id, error = %e, "Skipping malformed document"),
                }
            }
        }
        Ok(map)
    }

    async fn document<T: DeserializeOwned>(&self, path: &str) -> StoreResult<Option<T>> {
        let subscription = self.gateway.subscribe(path).await?;
        match subscription.initial {
            Some(value) => match serde_json::from_value(value) {
                Ok(parsed) => Ok(Some(parsed)),
                Err(e) => {
                    warn!(path = %path, error = %e, "Skipping malformed document");
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    /// Reads from local state under the engine lock.
    pub async fn with_state<R>(&self, f: impl FnOnce(&AppState) -> R) -> R {
        let engine = self.engine.lock().await;
        f(engine.state())
    }

    pub async fn summarize(&self, window: ReportWindow) -> Summary {
        let engine = self.engine.lock().await;
        reporting::summarize(engine.state(), window, Utc::now())
    }

    /// Persists an already-applied batch, rolling local state back on
    /// failure.
    async fn push<T>(
        &self,
        engine: &mut TransactionEngine,
        applied: Applied<T>,
    ) -> StoreResult<T> {
        let lowered = match gateway::lower_batch(&applied.ops) {
            Ok(lowered) => lowered,
            Err(e) => {
                warn!(error = %e, "Lowering failed, rolling back");
                engine.rollback(&applied.inverse);
                return Err(e);
            }
        };
        if let Err(e) = self.gateway.write_batch(lowered).await {
            warn!(error = %e, "Persistence failed, rolling back");
            engine.rollback(&applied.inverse);
            return Err(e);
        }
        Ok(applied.value)
    }

    // =========================================================================
    // Sales
    // =========================================================================

    pub async fn record_sale(
        &self,
        cart: &Cart,
        method: PaymentMethod,
        customer_id: Option<String>,
    ) -> StoreResult<Sale> {
        let mut engine = self.engine.lock().await;
        let applied = engine.record_sale(cart, method, customer_id)?;
        let sale = self.push(&mut engine, applied).await?;
        info!(sale_id = %sale.id, total = sale.total, method = %sale.payment_method, items = sale.items.len(), "Sale recorded");
        Ok(sale)
    }

    pub async fn void_sale(&self, sale_id: &str) -> StoreResult<Sale> {
        let mut engine = self.engine.lock().await;
        let applied = engine.void_sale(sale_id)?;
        let sale = self.push(&mut engine, applied).await?;
        info!(sale_id = %sale.id, total = sale.total, "Sale voided");
        Ok(sale)
    }

    /// Voids a sale and returns its product lines for cart re-seeding.
    pub async fn begin_edit(&self, sale_id: &str) -> StoreResult<Vec<SaleItem>> {
        let mut engine = self.engine.lock().await;
        let applied = engine.begin_edit(sale_id)?;
        let items = self.push(&mut engine, applied).await?;
        debug!(sale_id = %sale_id, items = items.len(), "Sale edit started");
        Ok(items)
    }

    pub async fn record_debt_payment(
        &self,
        customer_id: &str,
        amount: f64,
        method: PaymentMethod,
    ) -> StoreResult<Sale> {
        let mut engine = self.engine.lock().await;
        let applied = engine.record_debt_payment(customer_id, amount, method)?;
        let sale = self.push(&mut engine, applied).await?;
        info!(customer_id = %customer_id, amount = amount, "Debt payment recorded");
        Ok(sale)
    }

    // =========================================================================
    // Inventory
    // =========================================================================

    pub async fn restock(
        &self,
        items: &[RestockItem],
        method: TreasuryMethod,
        timestamp: Option<DateTime<Utc>>,
    ) -> StoreResult<TreasuryTransaction> {
        let mut engine = self.engine.lock().await;
        let applied = engine.restock(items, method, timestamp)?;
        let tx = self.push(&mut engine, applied).await?;
        info!(items = items.len(), cost = tx.amount, "Restock recorded");
        Ok(tx)
    }

    pub async fn upsert_product(&self, product: Product) -> StoreResult<Product> {
        let mut engine = self.engine.lock().await;
        let applied = engine.upsert_product(product);
        let product = self.push(&mut engine, applied).await?;
        debug!(product_id = %product.id, "Product saved");
        Ok(product)
    }

    pub async fn delete_product(&self, product_id: &str) -> StoreResult<()> {
        let mut engine = self.engine.lock().await;
        let applied = engine.delete_product(product_id)?;
        self.push(&mut engine, applied).await?;
        debug!(product_id = %product_id, "Product deleted");
        Ok(())
    }

    pub async fn add_category(&self, name: &str) -> StoreResult<()> {
        let mut engine = self.engine.lock().await;
        let applied = engine.add_category(name);
        if applied.ops.is_empty() {
            return Ok(());
        }
        self.push(&mut engine, applied).await
    }

    // =========================================================================
    // Customers
    // =========================================================================

    pub async fn upsert_customer(&self, customer: Customer) -> StoreResult<Customer> {
        let mut engine = self.engine.lock().await;
        let applied = engine.upsert_customer(customer);
        let customer = self.push(&mut engine, applied).await?;
        debug!(customer_id = %customer.id, "Customer saved");
        Ok(customer)
    }

    pub async fn delete_customer(&self, customer_id: &str) -> StoreResult<()> {
        let mut engine = self.engine.lock().await;
        let applied = engine.delete_customer(customer_id)?;
        self.push(&mut engine, applied).await?;
        debug!(customer_id = %customer_id, "Customer deleted");
        Ok(())
    }

    // =========================================================================
    // Treasury
    // =========================================================================

    pub async fn record_manual_transaction(
        &self,
        entry: ManualEntry,
    ) -> StoreResult<TreasuryTransaction> {
        let mut engine = self.engine.lock().await;
        let applied = engine.record_manual_transaction(entry)?;
        let tx = self.push(&mut engine, applied).await?;
        info!(tx_id = %tx.id, amount_bs = tx.amount_bs, category = %tx.category, "Transaction recorded");
        Ok(tx)
    }

    pub async fn delete_transaction(&self, transaction_id: &str) -> StoreResult<()> {
        let mut engine = self.engine.lock().await;
        let applied = engine.delete_transaction(transaction_id)?;
        self.push(&mut engine, applied).await?;
        info!(tx_id = %transaction_id, "Transaction deleted");
        Ok(())
    }

    // =========================================================================
    // Exchange Rate
    // =========================================================================

    pub async fn update_exchange_rate(&self, rate: f64) -> StoreResult<()> {
        let mut engine = self.engine.lock().await;
        let applied = engine.update_exchange_rate(rate)?;
        self.push(&mut engine, applied).await?;
        info!(rate = rate, "Exchange rate updated");
        Ok(())
    }

    pub async fn update_rate_record(
        &self,
        record_id: &str,
        rate: f64,
        date: NaiveDate,
    ) -> StoreResult<()> {
        let mut engine = self.engine.lock().await;
        let applied = engine.update_rate_record(record_id, rate, date)?;
        self.push(&mut engine, applied).await?;
        Ok(())
    }

    pub async fn delete_rate_record(&self, record_id: &str) -> StoreResult<()> {
        let mut engine = self.engine.lock().await;
        let applied = engine.delete_rate_record(record_id)?;
        self.push(&mut engine, applied).await?;
        Ok(())
    }

    // =========================================================================
    // Shifts
    // =========================================================================

    pub async fn open_shift(
        &self,
        initial_cash_bs: f64,
        allow_overdraw: bool,
    ) -> StoreResult<Shift> {
        let mut engine = self.engine.lock().await;
        let applied = engine.open_shift(initial_cash_bs, allow_overdraw)?;
        let shift = self.push(&mut engine, applied).await?;
        info!(shift_id = %shift.id, initial_cash_bs = shift.initial_cash, "Shift opened");
        Ok(shift)
    }

    pub async fn close_shift(&self) -> StoreResult<ShiftSummary> {
        let mut engine = self.engine.lock().await;
        let applied = engine.close_shift()?;
        let summary = self.push(&mut engine, applied).await?;
        info!(
            shift_id = %summary.shift.id,
            cash_sales_bs = summary.cash_sales_bs,
            pos_sales_bs = summary.pos_sales_bs,
            "Shift closed"
        );
        Ok(summary)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::gateway::Subscription;
    use crate::local::LocalGateway;
    use pointy_core::{SellingMode, TransactionType};
    use tokio::sync::broadcast;

    fn product(id: &str, price: f64, stock: f64) -> Product {
        Product {
            id: id.to_string(),
            name: format!("Product {id}"),
            category: "Test".to_string(),
            price,
            cost_price: price / 2.0,
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
            phone: String::new(),
            email: None,
            balance,
            created_at: Utc::now(),
        }
    }

    async fn cart_with(service: &PosService<LocalGateway>, id: &str, qty: f64) -> Cart {
        let p = service
            .with_state(|s| s.products.get(id).cloned())
            .await
            .unwrap();
        let mut cart = Cart::new();
        assert!(cart.add(&p, qty));
        cart
    }

    #[tokio::test]
    async fn test_sale_reaches_the_gateway() {
        let service = PosService::new(LocalGateway::in_memory());
        service.upsert_product(product("p1", 2.50, 10.0)).await.unwrap();
        service.update_exchange_rate(40.0).await.unwrap();

        let cart = cart_with(&service, "p1", 3.0).await;
        let sale = service
            .record_sale(&cart, PaymentMethod::Cash, None)
            .await
            .unwrap();

        let gw = service.gateway();
        let stored = gw.snapshot(&format!("sales/{}", sale.id)).unwrap();
        assert_eq!(stored["total"], 7.50);
        assert_eq!(stored["exchangeRate"], 40.0);
        assert_eq!(gw.snapshot("products").unwrap()["p1"]["stock"], 7.0);
    }

    #[tokio::test]
    async fn test_hydrate_round_trip() {
        let gw = LocalGateway::in_memory();

        {
            let service = PosService::new(gw.clone());
            service.upsert_product(product("p1", 2.50, 10.0)).await.unwrap();
            service.upsert_customer(customer("c1", 0.0)).await.unwrap();
            service.update_exchange_rate(40.0).await.unwrap();
            service.add_category("Bebidas").await.unwrap();

            let cart = cart_with(&service, "p1", 2.0).await;
            service
                .record_sale(&cart, PaymentMethod::Credit, Some("c1".to_string()))
                .await
                .unwrap();
        }

        // A fresh service over the same tree sees everything.
        let service = PosService::new(gw);
        service.hydrate().await.unwrap();
        service
            .with_state(|state| {
                assert_eq!(state.exchange_rate, 40.0);
                assert_eq!(state.products["p1"].stock, 8.0);
                assert_eq!(state.customers["c1"].balance, 5.00);
                assert_eq!(state.sales.len(), 1);
                assert_eq!(state.categories, vec!["Bebidas"]);
                assert!(state.shift.is_none());
            })
            .await;
    }

    #[tokio::test]
    async fn test_summary_over_service_state() {
        let service = PosService::new(LocalGateway::in_memory());
        service.upsert_product(product("p1", 2.50, 10.0)).await.unwrap();
        service.update_exchange_rate(40.0).await.unwrap();

        let cart = cart_with(&service, "p1", 3.0).await;
        service
            .record_sale(&cart, PaymentMethod::Cash, None)
            .await
            .unwrap();

        let summary = service.summarize(ReportWindow::Today).await;
        assert_eq!(summary.cash_sales_bs, 300.0);
        assert_eq!(summary.total_sales_bs, 300.0);
        assert_eq!(summary.vault_cash_bs, 300.0);
    }

    #[tokio::test]
    async fn test_engine_rejection_reaches_caller() {
        let service = PosService::new(LocalGateway::in_memory());
        let err = service
            .record_sale(&Cart::new(), PaymentMethod::Cash, None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Engine(_)));
    }

    // A gateway that accepts nothing, for exercising the rollback path.
    struct FailingGateway;

    impl Gateway for FailingGateway {
        async fn subscribe(&self, path: &str) -> StoreResult<Subscription> {
            let (_, receiver) = broadcast::channel(1);
            Ok(Subscription::new(path, None, receiver))
        }

        async fn write(&self, _path: &str, _value: Value) -> StoreResult<()> {
            Err(StoreError::Backend("write refused".into()))
        }

        async fn delete(&self, _path: &str) -> StoreResult<()> {
            Err(StoreError::Backend("delete refused".into()))
        }

        async fn write_batch(&self, _ops: Vec<(String, Option<Value>)>) -> StoreResult<()> {
            Err(StoreError::Backend("batch refused".into()))
        }
    }

    #[tokio::test]
    async fn test_failed_persistence_rolls_back() {
        let service = PosService::new(FailingGateway);

        let err = service.upsert_product(product("p1", 1.0, 5.0)).await.unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));

        // The optimistic insert was undone.
        service
            .with_state(|state| assert!(state.products.is_empty()))
            .await;
    }

    #[tokio::test]
    async fn test_failed_manual_transaction_rolls_back() {
        let service = PosService::new(FailingGateway);

        let entry = ManualEntry {
            kind: TransactionType::Income,
            amount_bs: 200.0,
            rate: 40.0,
            category: "Otros".to_string(),
            description: String::new(),
            method: TreasuryMethod::Cash,
            timestamp: None,
            id: None,
        };
        assert!(service.record_manual_transaction(entry).await.is_err());
        service
            .with_state(|state| {
                assert!(state.transactions.is_empty());
            })
            .await;
        let summary = service.summarize(ReportWindow::AllTime).await;
        assert_eq!(summary.vault_cash_bs, 0.0);
    }

    #[tokio::test]
    async fn test_shift_flow_through_service() {
        let service = PosService::new(LocalGateway::in_memory());
        service.update_exchange_rate(40.0).await.unwrap();
        service
            .record_manual_transaction(ManualEntry {
                kind: TransactionType::Income,
                amount_bs: 1000.0,
                rate: 40.0,
                category: "Capital".to_string(),
                description: "Fondo inicial".to_string(),
                method: TreasuryMethod::Cash,
                timestamp: None,
                id: None,
            })
            .await
            .unwrap();

        service.open_shift(200.0, false).await.unwrap();
        let stored = service.gateway().snapshot(paths::ACTIVE_SHIFT);
        assert!(stored.is_some());

        let summary = service.close_shift().await.unwrap();
        assert_eq!(summary.cash_sales_bs, 0.0);
        assert!(service.gateway().snapshot(paths::ACTIVE_SHIFT).is_none());
    }
}
