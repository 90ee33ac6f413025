//! # Service Error Envelope
//!
//! Request-boundary error type for the ledger services.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  ValidationError / CoreError / DbError                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ServiceError { code, message } ← THIS MODULE                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  HTTP adapter maps code → status, serializes the envelope              │
//! │                                                                         │
//! │  NotFound          → 404                                               │
//! │  ValidationError   → 400                                               │
//! │  InsufficientStock → 400                                               │
//! │  BusinessRule      → 400                                               │
//! │  DatabaseError     → 500 (detail logged, message made generic)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use thiserror::Error;
use tracing::error;

use teocat_core::{CoreError, ValidationError};

use crate::error::DbError;

/// Machine-readable error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Referenced entity does not exist.
    NotFound,
    /// Request input failed validation.
    ValidationError,
    /// A genuine sale asked for more units than are on the shelf.
    InsufficientStock,
    /// A state-machine or aggregate rule was violated.
    BusinessRule,
    /// Something failed at the storage layer.
    DatabaseError,
}

impl ErrorCode {
    /// Suggested HTTP status for adapters.
    pub const fn http_status(&self) -> u16 {
        match self {
            ErrorCode::NotFound => 404,
            ErrorCode::ValidationError
            | ErrorCode::InsufficientStock
            | ErrorCode::BusinessRule => 400,
            ErrorCode::DatabaseError => 500,
        }
    }
}

/// The error envelope every service operation returns.
///
/// `message` carries the legacy Spanish wording clients match on
/// (e.g. "Stock insuficiente..."); `code` is the stable machine surface.
#[derive(Debug, Error, Serialize)]
#[error("{message}")]
pub struct ServiceError {
    pub code: ErrorCode,
    pub message: String,
}

impl ServiceError {
    /// Builds a business-rule error with a custom message.
    pub fn business_rule(message: impl Into<String>) -> Self {
        ServiceError {
            code: ErrorCode::BusinessRule,
            message: message.into(),
        }
    }

    /// Builds a not-found error with a custom message.
    pub fn not_found(message: impl Into<String>) -> Self {
        ServiceError {
            code: ErrorCode::NotFound,
            message: message.into(),
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        ServiceError {
            code: ErrorCode::ValidationError,
            message: err.to_string(),
        }
    }
}

impl From<CoreError> for ServiceError {
    fn from(err: CoreError) -> Self {
        let code = match &err {
            CoreError::ProductNotFound(_)
            | CoreError::PurchaseNotFound(_)
            | CoreError::SaleNotFound(_)
            | CoreError::LineItemNotFound(_) => ErrorCode::NotFound,
            CoreError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            CoreError::Validation(_) => ErrorCode::ValidationError,
            CoreError::ReturnOfReturn
            | CoreError::SaleNotReturnable { .. }
            | CoreError::AlreadyCancelled
            | CoreError::CancelReturned
            | CoreError::StatusUnchanged { .. } => ErrorCode::BusinessRule,
        };

        ServiceError {
            code,
            message: err.to_string(),
        }
    }
}

impl From<DbError> for ServiceError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => {
                ServiceError::not_found(format!("{entity} no encontrado: {id}"))
            }
            other => {
                // Storage detail stays in the log, not on the wire.
                error!(error = %other, "Database error during service operation");
                ServiceError {
                    code: ErrorCode::DatabaseError,
                    message: "Error interno del servidor".to_string(),
                }
            }
        }
    }
}

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

// =============================================================================
// Unit Tests
// =============================================================================
