//! # Stock Ledger Rules
//!
//! The single chokepoint mapping a movement event to a stock delta and an
//! application policy. The database layer turns each `(movement, quantity)`
//! pair into one atomic SQL update; this module decides the sign and whether
//! the update is plain, clamped at zero, or conditional on available stock.
//!
//! ## Movement Table
//! ```text
//! ┌──────────────────────────────┬───────┬──────────────────────────────────┐
//! │ Movement                     │ Delta │ Policy                           │
//! ├──────────────────────────────┼───────┼──────────────────────────────────┤
//! │ PurchaseEffective            │ +qty  │ plain                            │
//! │ PurchaseCancelled            │ -qty  │ clamped at 0                     │
//! │ PurchaseReactivated          │ +qty  │ plain                            │
//! │ SaleEffective                │ -qty  │ conditional (reject if short)    │
//! │ SaleCancelled                │ +qty  │ plain                            │
//! │ ReturnEffective              │ +qty  │ plain (goods come back)          │
//! │ ReturnCancelled              │ -qty  │ clamped at 0                     │
//! └──────────────────────────────┴───────┴──────────────────────────────────┘
//! ```
//!
//! A genuine sale must never be clamped: selling more than is on the shelf
//! is a business-rule rejection, not a silent floor. Reversals of past
//! movements clamp instead, because the counter may have drifted below the
//! reversal quantity through intervening operations.

use crate::types::SaleKind;

/// A stock-affecting movement event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockMovement {
    /// Purchase line created or purchase becomes effective.
    PurchaseEffective,
    /// Purchase line removed or purchase cancelled from effective.
    PurchaseCancelled,
    /// Cancelled purchase reactivated.
    PurchaseReactivated,
    /// Genuine sale line created or sale becomes effective.
    SaleEffective,
    /// Genuine sale cancelled from effective.
    SaleCancelled,
    /// Return line created or return becomes effective.
    ReturnEffective,
    /// Return cancelled from effective.
    ReturnCancelled,
}

/// How the database layer must apply a movement's delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockPolicy {
    /// `stock = stock + delta`.
    Plain,
    /// `stock = MAX(0, stock + delta)`.
    ClampedAtZero,
    /// `stock = stock - qty` only when `stock >= qty`; otherwise the whole
    /// operation is rejected with an insufficient-stock error.
    Conditional,
}

impl StockMovement {
    /// The movement applied when a sale row of `kind` takes effect.
    pub fn sale_applied(kind: SaleKind) -> Self {
        match kind {
            SaleKind::Sale => StockMovement::SaleEffective,
            SaleKind::Return => StockMovement::ReturnEffective,
        }
    }

    /// The movement applied when a sale row of `kind` stops being effective
    /// (cancellation, deletion, or leaving the Efectiva state).
    pub fn sale_reversed(kind: SaleKind) -> Self {
        match kind {
            SaleKind::Sale => StockMovement::SaleCancelled,
            SaleKind::Return => StockMovement::ReturnCancelled,
        }
    }

    /// Signed stock delta for `quantity` units.
    pub fn delta(&self, quantity: i64) -> i64 {
        match self {
            StockMovement::PurchaseEffective
            | StockMovement::PurchaseReactivated
            | StockMovement::SaleCancelled
            | StockMovement::ReturnEffective => quantity,
            StockMovement::PurchaseCancelled
            | StockMovement::SaleEffective
            | StockMovement::ReturnCancelled => -quantity,
        }
    }

    /// Application policy for this movement.
    pub fn policy(&self) -> StockPolicy {
        match self {
            StockMovement::SaleEffective => StockPolicy::Conditional,
            StockMovement::PurchaseCancelled | StockMovement::ReturnCancelled => {
                StockPolicy::ClampedAtZero
            }
            _ => StockPolicy::Plain,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
