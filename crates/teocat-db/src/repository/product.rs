//! # Product Repository
//!
//! Database operations for products: lookups and the three stock-update
//! shapes the ledger needs.
//!
//! ## Stock Update Shapes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Stock Update Strategy                                │
//! │                                                                         │
//! │  ❌ WRONG: read-modify-write (races with concurrent writers)           │
//! │     let p = get(id); p.stock -= 3; update(p);                          │
//! │                                                                         │
//! │  ✅ CORRECT: one atomic SQL statement per movement                     │
//! │                                                                         │
//! │  plain       UPDATE products SET stock = stock + ?                     │
//! │  clamped     UPDATE products SET stock = MAX(0, stock + ?)             │
//! │  conditional UPDATE products SET stock = stock - ?                     │
//! │              WHERE id = ? AND stock >= ?                                │
//! │              └── 0 rows affected ⇒ insufficient stock, roll back       │
//! │                                                                         │
//! │  The conditional shape is what makes overselling impossible even       │
//! │  under concurrent sales of the last unit.                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use teocat_core::Product;

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

const PRODUCT_COLUMNS: &str = "id, name, price_cents, applies_tax, tax_rate_bps, \
     stock, category_id, is_active, created_at, updated_at";

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product by ID through an open transaction.
    ///
    /// Used by services that must see rows written earlier in the same
    /// transaction (and must not borrow a second pool connection).
    pub async fn fetch(&self, conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(product)
    }

    /// Lists active products sorted by name.
    pub async fn list_active(&self, limit: u32) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE is_active = 1 ORDER BY name LIMIT ?1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Inserts a new product.
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, price_cents, applies_tax, tax_rate_bps,
                stock, category_id, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(product.price_cents)
        .bind(product.applies_tax)
        .bind(product.tax_rate_bps)
        .bind(product.stock)
        .bind(&product.category_id)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // =========================================================================
    // Stock Updates (always inside a transaction)
    // =========================================================================

    /// Applies an unclamped stock delta: `stock = stock + delta`.
    ///
    /// Used for purchase receipts, sale cancellations, and effective
    /// returns, where the counter may legitimately grow.
    pub async fn apply_stock_delta(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        delta: i64,
    ) -> DbResult<()> {
        debug!(id = %id, delta = %delta, "Applying stock delta");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock + ?2, updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(delta)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Applies a stock delta clamped at zero: `stock = MAX(0, stock + delta)`.
    ///
    /// Used when reversing a past movement (purchase cancellation, return
    /// cancellation): the counter may have drifted below the reversal
    /// quantity through intervening operations, and the reversal must not
    /// drive it negative.
    pub async fn apply_stock_delta_clamped(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        delta: i64,
    ) -> DbResult<()> {
        debug!(id = %id, delta = %delta, "Applying clamped stock delta");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock = MAX(0, stock + ?2), updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(delta)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Conditionally decrements stock for a genuine sale.
    ///
    /// ## Returns
    /// * `Ok(true)` - Stock was sufficient and has been decremented
    /// * `Ok(false)` - Stock was insufficient; nothing was written
    ///
    /// The caller translates `false` into an insufficient-stock error and
    /// rolls the transaction back.
    pub async fn try_decrement_stock(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        quantity: i64,
    ) -> DbResult<bool> {
        debug!(id = %id, quantity = %quantity, "Conditional stock decrement");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock - ?2, updated_at = ?3
            WHERE id = ?1 AND stock >= ?2
            "#,
        )
        .bind(id)
        .bind(quantity)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Helper to generate a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}
