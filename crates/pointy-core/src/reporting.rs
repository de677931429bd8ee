//! # Reporting
//!
//! Read-only view-models over [`AppState`]: windowed sales and treasury
//! summaries plus the derived cash balances.
//!
//! ## Derived, Never Stored
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  vault (Bs) = Σ signed Cash transactions*  + Σ Cash sales        │
//! │  bank  (Bs) = Σ signed non-Cash txs*       + Σ PagoMovil/Card    │
//! │                                              sales               │
//! │  * excluding the "Ventas (Cierre)" audit records                 │
//! │                                                                  │
//! │  Sale totals always convert at the sale's OWN frozen rate.       │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Balances are recomputed from the full history on demand. The ledger is
//! a single café's books; a linear pass is cheap and cannot drift from the
//! records the way a stored counter could.

use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveTime, Utc, Weekday};
use serde::Serialize;

use crate::state::AppState;
use crate::types::PaymentMethod;
use crate::CLOSING_SALES_CATEGORY;

// =============================================================================
// Report Windows
// =============================================================================

/// A reporting period. Bounds are UTC calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportWindow {
    Today,
    /// The current week, starting Sunday.
    Week,
    /// The current calendar month.
    Month,
    /// An inclusive date range.
    Custom { start: NaiveDate, end: NaiveDate },
    AllTime,
}

impl ReportWindow {
    /// Half-open `[start, end)` bounds, or `None` for all time.
    pub fn bounds(&self, now: DateTime<Utc>) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let today = now.date_naive();
        match self {
            ReportWindow::Today => Some((day_start(today), day_start(next_day(today)))),
            ReportWindow::Week => {
                let first = today.week(Weekday::Sun).first_day();
                let end = first
                    .checked_add_days(chrono::Days::new(7))
                    .unwrap_or(first);
                Some((day_start(first), day_start(end)))
            }
            ReportWindow::Month => {
                let first = today.with_day(1).unwrap_or(today);
                let next = first.checked_add_months(Months::new(1)).unwrap_or(first);
                Some((day_start(first), day_start(next)))
            }
            ReportWindow::Custom { start, end } => {
                Some((day_start(*start), day_start(next_day(*end))))
            }
            ReportWindow::AllTime => None,
        }
    }

    pub fn contains(&self, timestamp: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self.bounds(now) {
            Some((start, end)) => timestamp >= start && timestamp < end,
            None => true,
        }
    }
}

fn day_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn next_day(date: NaiveDate) -> NaiveDate {
    date.succ_opt().unwrap_or(date)
}

// =============================================================================
// Summary
// =============================================================================

/// Windowed totals plus the all-time derived balances.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub sale_count: usize,
    /// Settled revenue per method, in Bs at each sale's frozen rate.
    pub cash_sales_bs: f64,
    pub card_sales_bs: f64,
    pub pago_movil_sales_bs: f64,
    /// Credit sales are receivables, not settled revenue; reported apart.
    pub credit_sales_bs: f64,
    /// Cash + Card + PagoMovil.
    pub total_sales_bs: f64,

    pub income_bs: f64,
    pub income_usd: f64,
    pub expense_bs: f64,
    pub expense_usd: f64,
    pub net_bs: f64,
    pub net_usd: f64,

    /// (sale price − current product cost) × quantity over non-debt lines.
    pub estimated_profit_usd: f64,

    pub receivables_usd: f64,
    pub receivables_bs: f64,

    pub vault_cash_bs: f64,
    pub bank_balance_bs: f64,
}

/// Builds the summary for a window ending at `now`.
///
/// Empty collections yield all zeros.
pub fn summarize(state: &AppState, window: ReportWindow, now: DateTime<Utc>) -> Summary {
    let mut summary = Summary::default();

    for sale in state.sales.values() {
        if !window.contains(sale.timestamp, now) {
            continue;
        }
        summary.sale_count += 1;
        let bs = sale.total_bs();
        match sale.payment_method {
            PaymentMethod::Cash => summary.cash_sales_bs += bs,
            PaymentMethod::Card => summary.card_sales_bs += bs,
            PaymentMethod::PagoMovil => summary.pago_movil_sales_bs += bs,
            PaymentMethod::Credit => summary.credit_sales_bs += bs,
        }
        for item in sale.items.iter().filter(|i| !i.is_debt_payment()) {
            // Current cost, not the frozen one: the estimate reflects what
            // replacing the sold stock costs today. Unknown products are
            // skipped.
            if let Some(product) = state.products.get(&item.product_id) {
                summary.estimated_profit_usd += (item.price - product.cost_price) * item.quantity;
            }
        }
    }
    summary.total_sales_bs =
        summary.cash_sales_bs + summary.card_sales_bs + summary.pago_movil_sales_bs;

    for tx in state.transactions.values() {
        if tx.category == CLOSING_SALES_CATEGORY || !window.contains(tx.timestamp, now) {
            continue;
        }
        match tx.kind {
            crate::types::TransactionType::Income => {
                summary.income_bs += tx.amount_bs;
                summary.income_usd += tx.amount;
            }
            crate::types::TransactionType::Expense => {
                summary.expense_bs += tx.amount_bs;
                summary.expense_usd += tx.amount;
            }
        }
    }
    summary.net_bs = summary.income_bs - summary.expense_bs;
    summary.net_usd = summary.income_usd - summary.expense_usd;

    summary.receivables_usd = state.customers.values().map(|c| c.balance).sum();
    summary.receivables_bs = summary.receivables_usd * state.exchange_rate;

    summary.vault_cash_bs = vault_cash_bs(state);
    summary.bank_balance_bs = bank_balance_bs(state);

    summary
}

// =============================================================================
// Derived Balances
// =============================================================================

/// Physical cash on hand, in Bs, recomputed from the full history.
pub fn vault_cash_bs(state: &AppState) -> f64 {
    let transactions: f64 = state
        .transactions
        .values()
        .filter(|t| t.method.is_cash() && t.category != CLOSING_SALES_CATEGORY)
        .map(|t| t.signed_bs())
        .sum();
    let sales: f64 = state
        .sales
        .values()
        .filter(|s| s.payment_method == PaymentMethod::Cash)
        .map(|s| s.total_bs())
        .sum();
    transactions + sales
}

/// Bank balance, in Bs, recomputed from the full history.
///
/// Card revenue counts here alongside PagoMovil so that every settled Bs
/// lands in exactly one of the two balances.
pub fn bank_balance_bs(state: &AppState) -> f64 {
    let transactions: f64 = state
        .transactions
        .values()
        .filter(|t| !t.method.is_cash() && t.category != CLOSING_SALES_CATEGORY)
        .map(|t| t.signed_bs())
        .sum();
    let sales: f64 = state
        .sales
        .values()
        .filter(|s| {
            matches!(
                s.payment_method,
                PaymentMethod::PagoMovil | PaymentMethod::Card
            )
        })
        .map(|s| s.total_bs())
        .sum();
    transactions + sales
}

// =============================================================================
// Unit Tests
// =============================================================================
