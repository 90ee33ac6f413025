//! # Error Types
//!
//! Domain-specific error types for teocat-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  teocat-core errors (this file)                                        │
//! │  ├── CoreError        - Business-rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  teocat-db errors (separate crate)                                     │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── ServiceError     - Request-boundary envelope (code + message)     │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ServiceError → JSON envelope      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Message Language
//! Business-rule and validation messages keep the legacy Spanish wording so
//! the error envelope stays byte-compatible with what existing TeoCat
//! clients match on (e.g. "Stock insuficiente").

use thiserror::Error;

use crate::types::SaleStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Business-rule violations and reference failures.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Referenced product does not exist (or is soft-deleted).
    #[error("Producto no encontrado: {0}")]
    ProductNotFound(String),

    /// Referenced purchase does not exist.
    #[error("Compra no encontrada: {0}")]
    PurchaseNotFound(String),

    /// Referenced sale does not exist.
    #[error("Venta no encontrada: {0}")]
    SaleNotFound(String),

    /// Referenced line item does not exist.
    #[error("Detalle no encontrado: {0}")]
    LineItemNotFound(String),

    /// Not enough stock for a genuine sale decrement.
    ///
    /// Raised by the conditional stock update; the surrounding transaction
    /// rolls back, so the counter and the sale state are left untouched.
    #[error("Stock insuficiente para el producto {name}. Disponible: {available}, solicitado: {requested}")]
    InsufficientStock {
        name: String,
        available: i64,
        requested: i64,
    },

    /// A return was requested for a sale that is itself a return.
    #[error("No se puede hacer una devolución de otra devolución")]
    ReturnOfReturn,

    /// A return was requested for a sale that is not currently effective.
    #[error("No se puede devolver una venta en estado {status}")]
    SaleNotReturnable { status: SaleStatus },

    /// Double cancellation.
    #[error("La venta ya está cancelada")]
    AlreadyCancelled,

    /// Cancelling a sale that has already been returned.
    #[error("No se puede anular una venta que ya ha sido devuelta")]
    CancelReturned,

    /// State transition to the state the row is already in.
    #[error("El estado ya es {status}")]
    StatusUnchanged { status: String },

    /// Validation error (wraps ValidationError).
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors, raised before any write happens.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} es obligatorio")]
    Required { field: String },

    /// Line quantity must be strictly positive.
    #[error("La cantidad debe ser mayor que 0")]
    QuantityNotPositive,

    /// Unit price must be non-negative.
    #[error("El precio unitario no puede ser negativo")]
    NegativePrice,

    /// A sale needs at least one product or service line.
    #[error("Se requiere al menos un detalle de producto o servicio")]
    NoLines,

    /// A purchase needs at least one line.
    #[error("Datos incompletos para la compra")]
    NoPurchaseLines,

    /// Unparseable date.
    #[error("Formato de fecha inválido: {0}")]
    InvalidDate(String),

    /// Identifier is not a valid UUID.
    #[error("{field} debe ser un identificador válido")]
    InvalidId { field: String },

    /// Tax rate outside 0..=100%.
    #[error("El porcentaje de IVA debe estar entre 0 y 100")]
    InvalidTaxRate { bps: u32 },

    /// A return request without the original sale reference.
    #[error("Para una devolución, se requiere el ID de la venta original")]
    MissingOriginalSale,
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
