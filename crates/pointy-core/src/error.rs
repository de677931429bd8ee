//! # Error Types
//!
//! Domain-specific error types for pointy-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                         Error Types                            │
//! │                                                                │
//! │  pointy-core errors (this file)                                │
//! │  └── EngineError      - Ledger operation rejections            │
//! │                                                                │
//! │  pointy-store errors (separate crate)                          │
//! │  └── StoreError       - Gateway / persistence failures         │
//! │                                                                │
//! │  Flow: EngineError → StoreError → caller                       │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (id, amounts)
//! 3. Errors are enum variants, never String
//! 4. Expected outcomes are NOT errors: insufficient tendered cash and
//!    stock clamping are computed values, reserved for genuine rejections

use thiserror::Error;

// =============================================================================
// Engine Error
// =============================================================================

/// Ledger operation rejections.
///
/// Every variant means the operation was refused before any state changed.
/// The engine never leaves partial state behind on error.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A sale was attempted with an empty cart.
    #[error("Cannot record a sale with an empty cart")]
    EmptyCart,

    /// A credit sale was attempted without naming a customer.
    ///
    /// ## When This Occurs
    /// Credit is the only payment method that requires an account to charge;
    /// the other methods settle immediately.
    #[error("Credit sales require a customer")]
    CustomerRequired,

    /// Customer id does not resolve to a known customer.
    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    /// Product id does not resolve to a known product.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Sale id does not resolve to a recorded sale.
    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    /// Treasury transaction id does not resolve to a recorded transaction.
    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    /// Exchange-rate history record id does not resolve.
    #[error("Rate record not found: {0}")]
    RateRecordNotFound(String),

    /// A monetary amount that must be strictly positive was not.
    #[error("Amount must be positive, got {0}")]
    AmountNotPositive(f64),

    /// An exchange rate that must be strictly positive was not.
    #[error("Exchange rate must be positive, got {0}")]
    RateNotPositive(f64),

    /// The payment method is not allowed for this operation.
    ///
    /// ## When This Occurs
    /// Paying a debt with more credit would be circular, so debt payments
    /// accept Cash, Card and PagoMovil only.
    #[error("Payment method {0} is not allowed here")]
    InvalidPaymentMethod(String),

    /// A restock was attempted with no items.
    #[error("Restock requires at least one item")]
    EmptyRestock,

    /// An edit was attempted on a sale with no restorable items.
    ///
    /// ## When This Occurs
    /// Synthetic debt-payment sales carry no product lines, so there is
    /// nothing to reload into a cart for correction.
    #[error("Sale {0} has no items to restore")]
    NothingToRestore(String),

    /// A shift is already open; the register is a singleton.
    #[error("A shift is already open")]
    ShiftAlreadyOpen,

    /// No shift is open to close.
    #[error("No open shift")]
    NoOpenShift,

    /// The requested opening float exceeds the derived vault balance.
    ///
    /// Callers may retry with the overdraw override after an explicit
    /// confirmation, mirroring a supervisor sign-off.
    #[error("Insufficient vault cash: available {available_bs} Bs, requested {requested_bs} Bs")]
    InsufficientVaultCash {
        available_bs: f64,
        requested_bs: f64,
    },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with EngineError.
pub type EngineResult<T> = Result<T, EngineError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = EngineError::InsufficientVaultCash {
            available_bs: 120.0,
            requested_bs: 200.0,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient vault cash: available 120 Bs, requested 200 Bs"
        );

        let err = EngineError::SaleNotFound("abc".to_string());
        assert_eq!(err.to_string(), "Sale not found: abc");
    }

    #[test]
    fn test_amount_errors_carry_value() {
        let err = EngineError::AmountNotPositive(-3.5);
        assert_eq!(err.to_string(), "Amount must be positive, got -3.5");
    }
}
