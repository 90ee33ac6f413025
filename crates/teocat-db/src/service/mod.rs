//! # Service Module
//!
//! Transactional services implementing the Purchase and Sale aggregates.
//!
//! ## Transaction Coordinator
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    One Operation, One Transaction                       │
//! │                                                                         │
//! │  SaleService::create(req)                                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  validate inputs (no writes yet)                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  tx = db.begin()                                                       │
//! │       ├── insert header                                                │
//! │       ├── per line: insert line + atomic stock update                  │
//! │       ├── recompute header totals (SQL SUM)                            │
//! │       ▼                                                                 │
//! │  tx.commit()  ── any `?` before this point drops the transaction,      │
//! │                  which rolls everything back                            │
//! │                                                                         │
//! │  No in-process locks, no retries: callers retry whole requests.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Services
//!
//! - [`purchase::PurchaseService`] - Purchase aggregate operations
//! - [`sale::SaleService`] - Sale and return aggregate operations
//! - [`error::ServiceError`] - Request-boundary error envelope

pub mod error;
pub mod purchase;
pub mod sale;

use sqlx::SqliteConnection;

use teocat_core::{CoreError, Product, StockMovement, StockPolicy};

use crate::repository::product::ProductRepository;
use error::ServiceResult;

/// Applies one stock movement for `quantity` units of `product`, using the
/// movement's policy to pick the SQL shape.
///
/// The conditional policy is the only one that can fail on business grounds:
/// zero rows affected means the shelf is short, and the caller's transaction
/// rolls back untouched.
pub(crate) async fn apply_stock_movement(
    products: &ProductRepository,
    conn: &mut SqliteConnection,
    product: &Product,
    movement: StockMovement,
    quantity: i64,
) -> ServiceResult<()> {
    let delta = movement.delta(quantity);

    match movement.policy() {
        StockPolicy::Plain => {
            products.apply_stock_delta(conn, &product.id, delta).await?;
        }
        StockPolicy::ClampedAtZero => {
            products
                .apply_stock_delta_clamped(conn, &product.id, delta)
                .await?;
        }
        StockPolicy::Conditional => {
            let decremented = products
                .try_decrement_stock(conn, &product.id, quantity)
                .await?;
            if !decremented {
                return Err(CoreError::InsufficientStock {
                    name: product.name.clone(),
                    available: product.stock,
                    requested: quantity,
                }
                .into());
            }
        }
    }

    Ok(())
}
