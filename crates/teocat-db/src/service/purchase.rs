//! # Purchase Service
//!
//! The Purchase aggregate: header + line items + stock effects, kept
//! consistent inside single transactions.
//!
//! ## Purchase Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Purchase Lifecycle                                  │
//! │                                                                         │
//! │  create()                                                              │
//! │     └── header Efectiva + lines + stock +qty per line                  │
//! │                                                                         │
//! │  set_status()                                                          │
//! │     ├── Efectiva → Cancelada: stock -qty per line (clamped at 0)       │
//! │     └── Cancelada → Efectiva: stock +qty per line                      │
//! │                                                                         │
//! │  update() with lines                                                   │
//! │     └── compensating pair: reverse old lines, apply new lines          │
//! │                                                                         │
//! │  add_line / update_line / remove_line                                  │
//! │     └── in-place edits with compensating stock deltas                  │
//! │                                                                         │
//! │  delete()                                                              │
//! │     └── reverse stock if Efectiva, then remove header + lines          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Stock only moves when a transition crosses the Efectiva boundary.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use tracing::info;

use teocat_core::{
    validation, CoreError, LineTotals, Product, Purchase, PurchaseItem, PurchaseStatus,
    StockMovement, MAX_DOCUMENT_LINES, MAX_LINE_QUANTITY,
};

use crate::pool::Database;
use crate::repository::purchase::{generate_purchase_id, generate_purchase_item_id};
use crate::service::error::{ServiceError, ServiceResult};

// =============================================================================
// Request / Response DTOs
// =============================================================================

/// One requested purchase line (legacy `detalle` shape).
#[derive(Debug, Clone, Deserialize)]
pub struct PurchaseLineInput {
    #[serde(rename = "IdProducto")]
    pub product_id: String,
    #[serde(rename = "Cantidad")]
    pub quantity: i64,
    /// Unit price in cents.
    #[serde(rename = "PrecioUnitario")]
    pub unit_price_cents: i64,
}

/// Request to create a purchase (legacy `POST /compras` body).
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePurchase {
    #[serde(rename = "IdProveedor")]
    pub supplier_id: String,
    /// RFC 3339 or `YYYY-MM-DD`; defaults to now.
    #[serde(rename = "FechaCompra", default)]
    pub purchase_date: Option<String>,
    #[serde(rename = "Detalles", default)]
    pub lines: Vec<PurchaseLineInput>,
}

/// Request to update a purchase. `lines`, when present, replaces the
/// whole line set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePurchase {
    #[serde(rename = "IdProveedor", default)]
    pub supplier_id: Option<String>,
    #[serde(rename = "FechaCompra", default)]
    pub purchase_date: Option<String>,
    #[serde(rename = "Detalles", default)]
    pub lines: Option<Vec<PurchaseLineInput>>,
}

/// A purchase with its line items, the read model every operation returns.
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseWithLines {
    #[serde(flatten)]
    pub purchase: Purchase,
    #[serde(rename = "detalles")]
    pub items: Vec<PurchaseItem>,
}

// =============================================================================
// Service
// =============================================================================

/// Transactional operations over the Purchase aggregate.
#[derive(Debug, Clone)]
pub struct PurchaseService {
    db: Database,
}

impl PurchaseService {
    /// Creates a new PurchaseService.
    pub fn new(db: Database) -> Self {
        PurchaseService { db }
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Creates a purchase with its lines, applying stock receipts.
    ///
    /// ## Atomicity
    /// Header, lines, stock deltas, and totals all commit together or not
    /// at all.
    pub async fn create(&self, req: CreatePurchase) -> ServiceResult<PurchaseWithLines> {
        validation::validate_id("IdProveedor", &req.supplier_id)?;
        let purchase_date = match &req.purchase_date {
            Some(raw) => validation::parse_date(raw)?,
            None => Utc::now(),
        };
        validate_line_inputs(&req.lines)?;

        let now = Utc::now();
        let purchase = Purchase {
            id: generate_purchase_id(),
            supplier_id: req.supplier_id.trim().to_string(),
            purchase_date,
            subtotal_cents: 0,
            tax_cents: 0,
            total_cents: 0,
            status: PurchaseStatus::Effective,
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.db.begin().await?;

        self.db.purchases().insert(&mut tx, &purchase).await?;

        for line in &req.lines {
            self.write_line(&mut tx, &purchase.id, line, true).await?;
        }

        self.db.purchases().recompute_totals(&mut tx, &purchase.id).await?;

        let result = self.fetch_with_lines(&mut tx, &purchase.id).await?;

        tx.commit().await.map_err(crate::error::DbError::from)?;

        info!(id = %result.purchase.id, lines = result.items.len(), "Purchase created");
        Ok(result)
    }

    /// Updates header fields and optionally replaces the full line set.
    ///
    /// Replacement is an explicit compensating pair inside one transaction:
    /// reverse the old lines' stock, delete them, apply the new ones.
    pub async fn update(&self, id: &str, req: UpdatePurchase) -> ServiceResult<PurchaseWithLines> {
        if let Some(supplier_id) = &req.supplier_id {
            validation::validate_id("IdProveedor", supplier_id)?;
        }
        if let Some(lines) = &req.lines {
            validate_line_inputs(lines)?;
        }

        let mut tx = self.db.begin().await?;

        let purchase = self.require(&mut tx, id).await?;
        let is_effective = purchase.status == PurchaseStatus::Effective;

        let supplier_id = req
            .supplier_id
            .as_deref()
            .map(str::trim)
            .unwrap_or(&purchase.supplier_id);
        let purchase_date = match &req.purchase_date {
            Some(raw) => validation::parse_date(raw)?,
            None => purchase.purchase_date,
        };

        self.db
            .purchases()
            .update_header(&mut tx, id, supplier_id, purchase_date)
            .await?;

        if let Some(lines) = &req.lines {
            let old_items = self.db.purchases().fetch_items(&mut tx, id).await?;

            for item in &old_items {
                if is_effective {
                    self.move_stock(
                        &mut tx,
                        &item.product_id,
                        StockMovement::PurchaseCancelled,
                        item.quantity,
                    )
                    .await?;
                }
                self.db.purchases().delete_item(&mut tx, &item.id).await?;
            }

            for line in lines {
                self.write_line(&mut tx, id, line, is_effective).await?;
            }
        }

        self.db.purchases().recompute_totals(&mut tx, id).await?;

        let result = self.fetch_with_lines(&mut tx, id).await?;

        tx.commit().await.map_err(crate::error::DbError::from)?;

        info!(id = %id, "Purchase updated");
        Ok(result)
    }

    /// Transitions the purchase status, moving stock on the Efectiva
    /// boundary.
    pub async fn set_status(&self, id: &str, status: PurchaseStatus) -> ServiceResult<Purchase> {
        let mut tx = self.db.begin().await?;

        let purchase = self.require(&mut tx, id).await?;

        if purchase.status == status {
            return Err(CoreError::StatusUnchanged {
                status: status.to_string(),
            }
            .into());
        }

        let items = self.db.purchases().fetch_items(&mut tx, id).await?;

        let movement = match status {
            // Leaving Efectiva: take the received goods back off the shelf.
            PurchaseStatus::Cancelled => StockMovement::PurchaseCancelled,
            // Re-entering Efectiva: receive them again.
            PurchaseStatus::Effective => StockMovement::PurchaseReactivated,
        };

        for item in &items {
            self.move_stock(&mut tx, &item.product_id, movement, item.quantity)
                .await?;
        }

        self.db.purchases().set_status(&mut tx, id, status).await?;

        let updated = self.require(&mut tx, id).await?;

        tx.commit().await.map_err(crate::error::DbError::from)?;

        info!(id = %id, status = %status, "Purchase status changed");
        Ok(updated)
    }

    /// Adds one line to an existing purchase.
    pub async fn add_line(
        &self,
        purchase_id: &str,
        line: PurchaseLineInput,
    ) -> ServiceResult<PurchaseWithLines> {
        validate_line_input(&line)?;

        let mut tx = self.db.begin().await?;

        let purchase = self.require(&mut tx, purchase_id).await?;
        let is_effective = purchase.status == PurchaseStatus::Effective;

        self.write_line(&mut tx, purchase_id, &line, is_effective)
            .await?;
        self.db
            .purchases()
            .recompute_totals(&mut tx, purchase_id)
            .await?;

        let result = self.fetch_with_lines(&mut tx, purchase_id).await?;

        tx.commit().await.map_err(crate::error::DbError::from)?;

        info!(purchase_id = %purchase_id, product_id = %line.product_id, "Purchase line added");
        Ok(result)
    }

    /// Replaces one line in place, keeping the line id stable.
    ///
    /// Stock is adjusted as a compensating pair: the old line's receipt is
    /// reversed (clamped), the new one applied.
    pub async fn update_line(
        &self,
        purchase_id: &str,
        item_id: &str,
        line: PurchaseLineInput,
    ) -> ServiceResult<PurchaseWithLines> {
        validate_line_input(&line)?;

        let mut tx = self.db.begin().await?;

        let purchase = self.require(&mut tx, purchase_id).await?;
        let is_effective = purchase.status == PurchaseStatus::Effective;

        let old = self
            .db
            .purchases()
            .fetch_item(&mut tx, item_id)
            .await?
            .filter(|item| item.purchase_id == purchase_id)
            .ok_or_else(|| CoreError::LineItemNotFound(item_id.to_string()))?;

        if is_effective {
            self.move_stock(
                &mut tx,
                &old.product_id,
                StockMovement::PurchaseCancelled,
                old.quantity,
            )
            .await?;
        }
        self.db.purchases().delete_item(&mut tx, item_id).await?;

        let product = self.require_product(&mut tx, &line.product_id).await?;
        let item = build_item(item_id.to_string(), purchase_id, &line, &product);
        self.db.purchases().insert_item(&mut tx, &item).await?;

        if is_effective {
            self.move_stock(
                &mut tx,
                &product.id,
                StockMovement::PurchaseEffective,
                line.quantity,
            )
            .await?;
        }

        self.db
            .purchases()
            .recompute_totals(&mut tx, purchase_id)
            .await?;

        let result = self.fetch_with_lines(&mut tx, purchase_id).await?;

        tx.commit().await.map_err(crate::error::DbError::from)?;

        info!(purchase_id = %purchase_id, item_id = %item_id, "Purchase line replaced");
        Ok(result)
    }

    /// Removes one line, reversing its stock receipt.
    pub async fn remove_line(
        &self,
        purchase_id: &str,
        item_id: &str,
    ) -> ServiceResult<PurchaseWithLines> {
        let mut tx = self.db.begin().await?;

        let purchase = self.require(&mut tx, purchase_id).await?;

        let item = self
            .db
            .purchases()
            .fetch_item(&mut tx, item_id)
            .await?
            .filter(|item| item.purchase_id == purchase_id)
            .ok_or_else(|| CoreError::LineItemNotFound(item_id.to_string()))?;

        if purchase.status == PurchaseStatus::Effective {
            self.move_stock(
                &mut tx,
                &item.product_id,
                StockMovement::PurchaseCancelled,
                item.quantity,
            )
            .await?;
        }

        self.db.purchases().delete_item(&mut tx, item_id).await?;
        self.db
            .purchases()
            .recompute_totals(&mut tx, purchase_id)
            .await?;

        let result = self.fetch_with_lines(&mut tx, purchase_id).await?;

        tx.commit().await.map_err(crate::error::DbError::from)?;

        info!(purchase_id = %purchase_id, item_id = %item_id, "Purchase line removed");
        Ok(result)
    }

    /// Deletes a purchase, reversing its stock effects when Efectiva.
    pub async fn delete(&self, id: &str) -> ServiceResult<()> {
        let mut tx = self.db.begin().await?;

        let purchase = self.require(&mut tx, id).await?;
        let items = self.db.purchases().fetch_items(&mut tx, id).await?;

        if purchase.status == PurchaseStatus::Effective {
            for item in &items {
                self.move_stock(
                    &mut tx,
                    &item.product_id,
                    StockMovement::PurchaseCancelled,
                    item.quantity,
                )
                .await?;
            }
        }

        // Line rows cascade with the header.
        self.db.purchases().delete(&mut tx, id).await?;

        tx.commit().await.map_err(crate::error::DbError::from)?;

        info!(id = %id, "Purchase deleted");
        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Gets a purchase with its lines.
    pub async fn get(&self, id: &str) -> ServiceResult<PurchaseWithLines> {
        let purchase = self
            .db
            .purchases()
            .get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::PurchaseNotFound(id.to_string()))?;
        let items = self.db.purchases().get_items(id).await?;

        Ok(PurchaseWithLines { purchase, items })
    }

    /// Lists all purchases, newest first.
    pub async fn list(&self) -> ServiceResult<Vec<Purchase>> {
        Ok(self.db.purchases().list().await?)
    }

    /// Lists purchases for one supplier.
    pub async fn list_by_supplier(&self, supplier_id: &str) -> ServiceResult<Vec<Purchase>> {
        Ok(self.db.purchases().list_by_supplier(supplier_id).await?)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Loads the purchase or fails with the domain not-found error.
    async fn require(&self, conn: &mut SqliteConnection, id: &str) -> ServiceResult<Purchase> {
        self.db
            .purchases()
            .fetch(conn, id)
            .await?
            .ok_or_else(|| CoreError::PurchaseNotFound(id.to_string()).into())
    }

    /// Loads the product or fails with the domain not-found error.
    async fn require_product(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
    ) -> ServiceResult<Product> {
        self.db
            .products()
            .fetch(conn, id)
            .await?
            .filter(|p| p.is_active)
            .ok_or_else(|| CoreError::ProductNotFound(id.to_string()).into())
    }

    /// Inserts one computed line and, when the purchase is Efectiva,
    /// receives its quantity into stock.
    async fn write_line(
        &self,
        conn: &mut SqliteConnection,
        purchase_id: &str,
        line: &PurchaseLineInput,
        apply_stock: bool,
    ) -> ServiceResult<()> {
        let product = self.require_product(conn, &line.product_id).await?;
        let item = build_item(generate_purchase_item_id(), purchase_id, line, &product);
        self.db.purchases().insert_item(conn, &item).await?;

        if apply_stock {
            self.move_stock(
                conn,
                &product.id,
                StockMovement::PurchaseEffective,
                line.quantity,
            )
            .await?;
        }

        Ok(())
    }

    /// Applies one movement for a product id, resolving the row first.
    async fn move_stock(
        &self,
        conn: &mut SqliteConnection,
        product_id: &str,
        movement: StockMovement,
        quantity: i64,
    ) -> ServiceResult<()> {
        let product = self
            .db
            .products()
            .fetch(conn, product_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;

        crate::service::apply_stock_movement(
            &self.db.products(),
            conn,
            &product,
            movement,
            quantity,
        )
        .await
    }

    /// Reads the header and lines back through the transaction.
    async fn fetch_with_lines(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
    ) -> ServiceResult<PurchaseWithLines> {
        let purchase = self.require(conn, id).await?;
        let items = self.db.purchases().fetch_items(conn, id).await?;
        Ok(PurchaseWithLines { purchase, items })
    }
}

// =============================================================================
// Line Helpers
// =============================================================================

/// Validates a full line list for create/replace.
fn validate_line_inputs(lines: &[PurchaseLineInput]) -> ServiceResult<()> {
    if lines.is_empty() {
        return Err(teocat_core::ValidationError::NoPurchaseLines.into());
    }
    if lines.len() > MAX_DOCUMENT_LINES {
        return Err(ServiceError::business_rule(format!(
            "Una compra no puede tener más de {MAX_DOCUMENT_LINES} detalles"
        )));
    }
    for line in lines {
        validate_line_input(line)?;
    }
    Ok(())
}

/// Validates one line's quantity and price.
fn validate_line_input(line: &PurchaseLineInput) -> ServiceResult<()> {
    validation::validate_quantity(line.quantity)?;
    validation::validate_price_cents(line.unit_price_cents)?;
    if line.quantity > MAX_LINE_QUANTITY {
        return Err(ServiceError::business_rule(format!(
            "La cantidad por detalle no puede superar {MAX_LINE_QUANTITY}"
        )));
    }
    Ok(())
}

/// Computes the money columns for one line with the product's own rate.
fn build_item(
    id: String,
    purchase_id: &str,
    line: &PurchaseLineInput,
    product: &Product,
) -> PurchaseItem {
    let totals = LineTotals::compute(
        line.quantity,
        teocat_core::Money::from_cents(line.unit_price_cents),
        product.effective_tax_rate(),
    );

    PurchaseItem {
        id,
        purchase_id: purchase_id.to_string(),
        product_id: product.id.clone(),
        quantity: line.quantity,
        unit_price_cents: line.unit_price_cents,
        subtotal_cents: totals.subtotal.cents(),
        unit_tax_cents: totals.unit_tax.cents(),
        total_cents: totals.total.cents(),
    }
}
