//! # teocat-core: Pure Business Logic for the TeoCat Ledger
//!
//! This crate is the **heart** of the TeoCat inventory and financial ledger.
//! It contains all business logic as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      TeoCat Ledger Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Callers (HTTP API, jobs)                     │   │
//! │  │    create purchase ──► create sale ──► return ──► cancel       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              teocat-db (Services + Repositories)                │   │
//! │  │    PurchaseService, SaleService, SQLite transactions            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ teocat-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  pricing  │  │  ledger   │  │   │
//! │  │   │ Purchase  │  │   Money   │  │LineTotals │  │ Movements │  │   │
//! │  │   │   Sale    │  │  TaxCalc  │  │  tax math │  │ policies  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Purchase, Sale, line items, statuses)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`pricing`] - Canonical line-item totals and tax math
//! - [`ledger`] - Stock movement table and adjustment policies
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation rules
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64) to avoid float errors
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use teocat_core::money::Money;
//! use teocat_core::pricing::LineTotals;
//! use teocat_core::types::TaxRate;
//!
//! // Create money from cents (never from floats!)
//! let unit_price = Money::from_cents(10_000); // $100.00
//!
//! // 10 units at $100.00 with 19% tax
//! let totals = LineTotals::compute(10, unit_price, TaxRate::from_bps(1900));
//!
//! assert_eq!(totals.subtotal.cents(), 100_000);
//! assert_eq!(totals.tax.cents(), 19_000);
//! assert_eq!(totals.total.cents(), 119_000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod ledger;
pub mod money;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use teocat_core::Money` instead of
// `use teocat_core::money::Money`

pub use error::{CoreError, CoreResult, ValidationError};
pub use ledger::{StockMovement, StockPolicy};
pub use money::Money;
pub use pricing::LineTotals;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum line items allowed in a single purchase or sale.
///
/// ## Business Reason
/// Prevents runaway documents and ensures reasonable transaction sizes.
pub const MAX_DOCUMENT_LINES: usize = 100;

/// Maximum quantity of a single product on one line.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
pub const MAX_LINE_QUANTITY: i64 = 999;
