//! # Validation Module
//!
//! Input validation for ledger operations.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Deserialization (serde)                                      │
//! │  ├── Type/shape checks, enum spellings                                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Quantities, prices, dates, id shapes                              │
//! │  └── Runs before any write; failures abort the whole request           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL, foreign keys, CHECK constraints                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::ValidationError;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line-item quantity. Must be strictly positive.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::QuantityNotPositive);
    }
    Ok(())
}

/// Validates a unit price in cents. Zero is allowed (free items).
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::NegativePrice);
    }
    Ok(())
}

/// Validates a tax rate in basis points (0% to 100%).
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10_000 {
        return Err(ValidationError::InvalidTaxRate { bps });
    }
    Ok(())
}

// =============================================================================
// Reference Validators
// =============================================================================

/// Validates an entity reference: non-empty and UUID-shaped.
///
/// Supplier/customer/staff/service/pet ids belong to external modules; the
/// ledger only checks the shape, not existence.
pub fn validate_id(field: &str, id: &str) -> ValidationResult<()> {
    let id = id.trim();

    if id.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidId {
        field: field.to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Date Parsing
// =============================================================================

/// Parses a request date, accepting RFC 3339 or plain `YYYY-MM-DD`.
///
/// Plain dates become midnight UTC, matching how the legacy backend treated
/// `FechaCompra` values sent without a time component.
pub fn parse_date(raw: &str) -> ValidationResult<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(DateTime::from_naive_utc_and_offset(naive, Utc));
        }
    }

    Err(ValidationError::InvalidDate(raw.to_string()))
}

/// End-of-day timestamp for an inclusive date-range upper bound.
///
/// The legacy date filter stretched `hasta` to 23:59:59.999 so the whole
/// closing day is included.
pub fn end_of_day(date: DateTime<Utc>) -> DateTime<Utc> {
    let naive = date
        .date_naive()
        .and_hms_milli_opt(23, 59, 59, 999)
        .unwrap_or_else(|| date.naive_utc());
    DateTime::from_naive_utc_and_offset(naive, Utc)
}

// =============================================================================
// Unit Tests
// =============================================================================
