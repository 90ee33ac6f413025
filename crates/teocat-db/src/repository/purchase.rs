//! # Purchase Repository
//!
//! Database operations for purchase headers and line items.
//!
//! ## Totals Discipline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Header Totals Recompute                              │
//! │                                                                         │
//! │  Header totals are never edited arithmetically in Rust. After any      │
//! │  line mutation, recompute_totals() rebuilds them from the rows:        │
//! │                                                                         │
//! │  subtotal = SUM(purchase_items.subtotal_cents)                         │
//! │  total    = SUM(purchase_items.total_cents)                            │
//! │  tax      = total - subtotal                                           │
//! │                                                                         │
//! │  Running in the same transaction as the line write, the header can     │
//! │  never drift from its lines.                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use teocat_core::{Purchase, PurchaseItem, PurchaseStatus};

/// Repository for purchase database operations.
#[derive(Debug, Clone)]
pub struct PurchaseRepository {
    pool: SqlitePool,
}

const PURCHASE_COLUMNS: &str = "id, supplier_id, purchase_date, subtotal_cents, \
     tax_cents, total_cents, status, created_at, updated_at";

const ITEM_COLUMNS: &str = "id, purchase_id, product_id, quantity, \
     unit_price_cents, subtotal_cents, unit_tax_cents, total_cents";

impl PurchaseRepository {
    /// Creates a new PurchaseRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PurchaseRepository { pool }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Gets a purchase by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Purchase>> {
        let purchase = sqlx::query_as::<_, Purchase>(&format!(
            "SELECT {PURCHASE_COLUMNS} FROM purchases WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(purchase)
    }

    /// Gets a purchase by ID through an open transaction.
    pub async fn fetch(&self, conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Purchase>> {
        let purchase = sqlx::query_as::<_, Purchase>(&format!(
            "SELECT {PURCHASE_COLUMNS} FROM purchases WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(purchase)
    }

    /// Lists all purchases, newest first.
    pub async fn list(&self) -> DbResult<Vec<Purchase>> {
        let purchases = sqlx::query_as::<_, Purchase>(&format!(
            "SELECT {PURCHASE_COLUMNS} FROM purchases ORDER BY purchase_date DESC, created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(purchases)
    }

    /// Lists purchases for one supplier, newest first.
    pub async fn list_by_supplier(&self, supplier_id: &str) -> DbResult<Vec<Purchase>> {
        let purchases = sqlx::query_as::<_, Purchase>(&format!(
            "SELECT {PURCHASE_COLUMNS} FROM purchases \
             WHERE supplier_id = ?1 ORDER BY purchase_date DESC, created_at DESC"
        ))
        .bind(supplier_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(purchases)
    }

    /// Gets all line items for a purchase.
    pub async fn get_items(&self, purchase_id: &str) -> DbResult<Vec<PurchaseItem>> {
        let items = sqlx::query_as::<_, PurchaseItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM purchase_items WHERE purchase_id = ?1 ORDER BY rowid"
        ))
        .bind(purchase_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Gets all line items through an open transaction.
    pub async fn fetch_items(
        &self,
        conn: &mut SqliteConnection,
        purchase_id: &str,
    ) -> DbResult<Vec<PurchaseItem>> {
        let items = sqlx::query_as::<_, PurchaseItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM purchase_items WHERE purchase_id = ?1 ORDER BY rowid"
        ))
        .bind(purchase_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(items)
    }

    /// Gets one line item by ID through an open transaction.
    pub async fn fetch_item(
        &self,
        conn: &mut SqliteConnection,
        item_id: &str,
    ) -> DbResult<Option<PurchaseItem>> {
        let item = sqlx::query_as::<_, PurchaseItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM purchase_items WHERE id = ?1"
        ))
        .bind(item_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(item)
    }

    // =========================================================================
    // Writes (always inside a transaction)
    // =========================================================================

    /// Inserts a purchase header.
    pub async fn insert(&self, conn: &mut SqliteConnection, purchase: &Purchase) -> DbResult<()> {
        debug!(id = %purchase.id, supplier_id = %purchase.supplier_id, "Inserting purchase");

        sqlx::query(
            r#"
            INSERT INTO purchases (
                id, supplier_id, purchase_date,
                subtotal_cents, tax_cents, total_cents,
                status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&purchase.id)
        .bind(&purchase.supplier_id)
        .bind(purchase.purchase_date)
        .bind(purchase.subtotal_cents)
        .bind(purchase.tax_cents)
        .bind(purchase.total_cents)
        .bind(purchase.status)
        .bind(purchase.created_at)
        .bind(purchase.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Inserts a purchase line item.
    pub async fn insert_item(
        &self,
        conn: &mut SqliteConnection,
        item: &PurchaseItem,
    ) -> DbResult<()> {
        debug!(purchase_id = %item.purchase_id, product_id = %item.product_id, "Inserting purchase item");

        sqlx::query(
            r#"
            INSERT INTO purchase_items (
                id, purchase_id, product_id, quantity,
                unit_price_cents, subtotal_cents, unit_tax_cents, total_cents
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&item.id)
        .bind(&item.purchase_id)
        .bind(&item.product_id)
        .bind(item.quantity)
        .bind(item.unit_price_cents)
        .bind(item.subtotal_cents)
        .bind(item.unit_tax_cents)
        .bind(item.total_cents)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Updates the editable header fields (supplier, date).
    pub async fn update_header(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        supplier_id: &str,
        purchase_date: DateTime<Utc>,
    ) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE purchases
            SET supplier_id = ?2, purchase_date = ?3, updated_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(supplier_id)
        .bind(purchase_date)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Purchase", id));
        }

        Ok(())
    }

    /// Sets the purchase status.
    pub async fn set_status(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        status: PurchaseStatus,
    ) -> DbResult<()> {
        debug!(id = %id, status = %status, "Setting purchase status");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE purchases
            SET status = ?2, updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Purchase", id));
        }

        Ok(())
    }

    /// Rebuilds header totals from the current line rows.
    ///
    /// ## When To Call
    /// After any line insert, delete, or replacement, within the same
    /// transaction.
    pub async fn recompute_totals(
        &self,
        conn: &mut SqliteConnection,
        purchase_id: &str,
    ) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE purchases
            SET subtotal_cents = COALESCE(
                    (SELECT SUM(subtotal_cents) FROM purchase_items WHERE purchase_id = ?1), 0),
                total_cents = COALESCE(
                    (SELECT SUM(total_cents) FROM purchase_items WHERE purchase_id = ?1), 0),
                tax_cents = COALESCE(
                    (SELECT SUM(total_cents - subtotal_cents)
                     FROM purchase_items WHERE purchase_id = ?1), 0),
                updated_at = ?2
            WHERE id = ?1
            "#,
        )
        .bind(purchase_id)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Purchase", purchase_id));
        }

        Ok(())
    }

    /// Deletes one line item.
    pub async fn delete_item(&self, conn: &mut SqliteConnection, item_id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM purchase_items WHERE id = ?1")
            .bind(item_id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("PurchaseItem", item_id));
        }

        Ok(())
    }

    /// Deletes a purchase header. Line items cascade.
    pub async fn delete(&self, conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting purchase");

        let result = sqlx::query("DELETE FROM purchases WHERE id = ?1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Purchase", id));
        }

        Ok(())
    }
}

/// Generates a new purchase ID.
pub fn generate_purchase_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates a new purchase item ID.
pub fn generate_purchase_item_id() -> String {
    Uuid::new_v4().to_string()
}
