//! # Sale Repository
//!
//! Database operations for sale headers, product lines, and service lines.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  CREATE (kind = Venta)                                                 │
//! │     └── insert() + insert_item()×N + insert_service_item()×N           │
//! │     └── recompute_totals()                                             │
//! │     └── status Efectiva ⇒ stock decremented conditionally              │
//! │                                                                         │
//! │  RETURN (kind = Devolucion)                                            │
//! │     └── new sale row referencing original_sale_id                      │
//! │     └── original flips to Devuelta in the same transaction             │
//! │                                                                         │
//! │  CANCEL                                                                │
//! │     └── status → Cancelada, stock effects reversed                     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Totals follow the same SUM-based recompute discipline as purchases,
//! with service lines contributing untaxed subtotal.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use teocat_core::{Sale, SaleItem, SaleStatus, ServiceItem};

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

const SALE_COLUMNS: &str = "id, customer_id, staff_id, sale_date, subtotal_cents, \
     tax_cents, total_cents, status, kind, original_sale_id, notes, created_at, updated_at";

const ITEM_COLUMNS: &str = "id, sale_id, product_id, quantity, \
     unit_price_cents, subtotal_cents, unit_tax_cents, total_cents";

const SERVICE_ITEM_COLUMNS: &str = "id, sale_id, service_id, pet_id, quantity, \
     unit_price_cents, subtotal_cents";

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sale)
    }

    /// Gets a sale by ID through an open transaction.
    pub async fn fetch(&self, conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(sale)
    }

    /// Lists all sales, newest first.
    pub async fn list(&self) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales ORDER BY sale_date DESC, created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }

    /// Lists sales for one customer, newest first.
    pub async fn list_by_customer(&self, customer_id: &str) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales \
             WHERE customer_id = ?1 ORDER BY sale_date DESC, created_at DESC"
        ))
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }

    /// Lists sales recorded by one staff member, newest first.
    pub async fn list_by_staff(&self, staff_id: &str) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales \
             WHERE staff_id = ?1 ORDER BY sale_date DESC, created_at DESC"
        ))
        .bind(staff_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }

    /// Lists sales with `sale_date` inside the inclusive range.
    pub async fn list_by_date_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales \
             WHERE sale_date >= ?1 AND sale_date <= ?2 \
             ORDER BY sale_date DESC, created_at DESC"
        ))
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }

    /// Lists return rows referencing a given original sale.
    pub async fn list_returns_of(&self, original_sale_id: &str) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales \
             WHERE original_sale_id = ?1 ORDER BY created_at DESC"
        ))
        .bind(original_sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }

    /// Gets all product lines for a sale.
    pub async fn get_items(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let items = sqlx::query_as::<_, SaleItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM sale_items WHERE sale_id = ?1 ORDER BY rowid"
        ))
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Gets all product lines through an open transaction.
    pub async fn fetch_items(
        &self,
        conn: &mut SqliteConnection,
        sale_id: &str,
    ) -> DbResult<Vec<SaleItem>> {
        let items = sqlx::query_as::<_, SaleItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM sale_items WHERE sale_id = ?1 ORDER BY rowid"
        ))
        .bind(sale_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(items)
    }

    /// Gets one product line by ID through an open transaction.
    pub async fn fetch_item(
        &self,
        conn: &mut SqliteConnection,
        item_id: &str,
    ) -> DbResult<Option<SaleItem>> {
        let item = sqlx::query_as::<_, SaleItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM sale_items WHERE id = ?1"
        ))
        .bind(item_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(item)
    }

    /// Gets all service lines for a sale.
    pub async fn get_service_items(&self, sale_id: &str) -> DbResult<Vec<ServiceItem>> {
        let items = sqlx::query_as::<_, ServiceItem>(&format!(
            "SELECT {SERVICE_ITEM_COLUMNS} FROM sale_service_items \
             WHERE sale_id = ?1 ORDER BY rowid"
        ))
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Gets all service lines through an open transaction.
    pub async fn fetch_service_items(
        &self,
        conn: &mut SqliteConnection,
        sale_id: &str,
    ) -> DbResult<Vec<ServiceItem>> {
        let items = sqlx::query_as::<_, ServiceItem>(&format!(
            "SELECT {SERVICE_ITEM_COLUMNS} FROM sale_service_items \
             WHERE sale_id = ?1 ORDER BY rowid"
        ))
        .bind(sale_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(items)
    }

    /// Gets one service line by ID through an open transaction.
    pub async fn fetch_service_item(
        &self,
        conn: &mut SqliteConnection,
        item_id: &str,
    ) -> DbResult<Option<ServiceItem>> {
        let item = sqlx::query_as::<_, ServiceItem>(&format!(
            "SELECT {SERVICE_ITEM_COLUMNS} FROM sale_service_items WHERE id = ?1"
        ))
        .bind(item_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(item)
    }

    // =========================================================================
    // Writes (always inside a transaction)
    // =========================================================================

    /// Inserts a sale header.
    pub async fn insert(&self, conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
        debug!(id = %sale.id, kind = %sale.kind, status = %sale.status, "Inserting sale");

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, customer_id, staff_id, sale_date,
                subtotal_cents, tax_cents, total_cents,
                status, kind, original_sale_id, notes,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.customer_id)
        .bind(&sale.staff_id)
        .bind(sale.sale_date)
        .bind(sale.subtotal_cents)
        .bind(sale.tax_cents)
        .bind(sale.total_cents)
        .bind(sale.status)
        .bind(sale.kind)
        .bind(&sale.original_sale_id)
        .bind(&sale.notes)
        .bind(sale.created_at)
        .bind(sale.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Inserts a product line.
    pub async fn insert_item(&self, conn: &mut SqliteConnection, item: &SaleItem) -> DbResult<()> {
        debug!(sale_id = %item.sale_id, product_id = %item.product_id, "Inserting sale item");

        sqlx::query(
            r#"
            INSERT INTO sale_items (
                id, sale_id, product_id, quantity,
                unit_price_cents, subtotal_cents, unit_tax_cents, total_cents
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&item.id)
        .bind(&item.sale_id)
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

    /// Inserts a service line.
    pub async fn insert_service_item(
        &self,
        conn: &mut SqliteConnection,
        item: &ServiceItem,
    ) -> DbResult<()> {
        debug!(sale_id = %item.sale_id, service_id = %item.service_id, "Inserting service item");

        sqlx::query(
            r#"
            INSERT INTO sale_service_items (
                id, sale_id, service_id, pet_id,
                quantity, unit_price_cents, subtotal_cents
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&item.id)
        .bind(&item.sale_id)
        .bind(&item.service_id)
        .bind(&item.pet_id)
        .bind(item.quantity)
        .bind(item.unit_price_cents)
        .bind(item.subtotal_cents)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Sets the sale status.
    pub async fn set_status(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        status: SaleStatus,
    ) -> DbResult<()> {
        debug!(id = %id, status = %status, "Setting sale status");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE sales
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
            return Err(DbError::not_found("Sale", id));
        }

        Ok(())
    }

    /// Rebuilds header totals from the current line rows.
    ///
    /// Product lines carry tax; service lines contribute only untaxed
    /// subtotal. Must run in the same transaction as the line mutation.
    pub async fn recompute_totals(
        &self,
        conn: &mut SqliteConnection,
        sale_id: &str,
    ) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE sales
            SET subtotal_cents =
                    COALESCE((SELECT SUM(subtotal_cents) FROM sale_items WHERE sale_id = ?1), 0)
                  + COALESCE((SELECT SUM(subtotal_cents) FROM sale_service_items WHERE sale_id = ?1), 0),
                tax_cents =
                    COALESCE((SELECT SUM(total_cents - subtotal_cents)
                              FROM sale_items WHERE sale_id = ?1), 0),
                total_cents =
                    COALESCE((SELECT SUM(total_cents) FROM sale_items WHERE sale_id = ?1), 0)
                  + COALESCE((SELECT SUM(subtotal_cents) FROM sale_service_items WHERE sale_id = ?1), 0),
                updated_at = ?2
            WHERE id = ?1
            "#,
        )
        .bind(sale_id)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", sale_id));
        }

        Ok(())
    }

    /// Deletes one product line.
    pub async fn delete_item(&self, conn: &mut SqliteConnection, item_id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM sale_items WHERE id = ?1")
            .bind(item_id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("SaleItem", item_id));
        }

        Ok(())
    }

    /// Deletes one service line.
    pub async fn delete_service_item(
        &self,
        conn: &mut SqliteConnection,
        item_id: &str,
    ) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM sale_service_items WHERE id = ?1")
            .bind(item_id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("ServiceItem", item_id));
        }

        Ok(())
    }

    /// Deletes a sale header. Product and service lines cascade.
    pub async fn delete(&self, conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting sale");

        let result = sqlx::query("DELETE FROM sales WHERE id = ?1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", id));
        }

        Ok(())
    }
}

/// Generates a new sale ID.
pub fn generate_sale_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates a new sale item ID.
pub fn generate_sale_item_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates a new service item ID.
pub fn generate_service_item_id() -> String {
    Uuid::new_v4().to_string()
}
