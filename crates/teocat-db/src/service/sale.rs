//! # Sale Service
//!
//! The Sale aggregate: genuine sales, returns, and their stock effects.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Sale State Machine                                  │
//! │                                                                         │
//! │            ┌──────────────┐        ┌──────────────┐                    │
//! │            │  Pendiente   │ ◄────► │   Efectiva   │                    │
//! │            └──────────────┘        └──────┬───────┘                    │
//! │                                           │                             │
//! │                              ┌────────────┼────────────┐               │
//! │                              ▼                         ▼               │
//! │                      ┌──────────────┐         ┌──────────────┐         │
//! │                      │  Cancelada   │ ──────► │   Devuelta   │         │
//! │                      └──────────────┘ (back   └──────────────┘         │
//! │                        ▲ to Efectiva            set by return_sale     │
//! │                        │ re-decrements,         on the ORIGINAL row    │
//! │                        │ may fail short)                               │
//! │                                                                         │
//! │  Stock moves only when a transition crosses the Efectiva boundary,     │
//! │  with the sign chosen by the row's kind (Venta / Devolucion).          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A return is a separate Sale row of kind Devolucion linked through
//! `original_sale_id`; its effective stock movement is the increment.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use tracing::info;

use teocat_core::{
    validation, CoreError, LineTotals, Money, Product, Sale, SaleItem, SaleKind, SaleStatus,
    ServiceItem, StockMovement, ValidationError, MAX_DOCUMENT_LINES, MAX_LINE_QUANTITY,
};

use crate::pool::Database;
use crate::repository::sale::{generate_sale_id, generate_sale_item_id, generate_service_item_id};
use crate::service::error::{ServiceError, ServiceResult};

// =============================================================================
// Request / Response DTOs
// =============================================================================

/// One requested product line (legacy `detalleProducto` shape).
#[derive(Debug, Clone, Deserialize)]
pub struct SaleLineInput {
    #[serde(rename = "IdProducto")]
    pub product_id: String,
    #[serde(rename = "Cantidad")]
    pub quantity: i64,
    /// Unit price in cents; defaults to the product's list price.
    #[serde(rename = "PrecioUnitario", default)]
    pub unit_price_cents: Option<i64>,
}

/// One requested service line (legacy `detalleServicio` shape).
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceLineInput {
    #[serde(rename = "IdServicio")]
    pub service_id: String,
    #[serde(rename = "IdMascota")]
    pub pet_id: String,
    #[serde(rename = "Cantidad")]
    pub quantity: i64,
    /// Unit price in cents.
    #[serde(rename = "PrecioUnitario")]
    pub unit_price_cents: i64,
}

/// Request to create a sale (legacy `POST /ventas` body).
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSale {
    #[serde(rename = "IdCliente")]
    pub customer_id: String,
    #[serde(rename = "IdUsuario")]
    pub staff_id: String,
    /// RFC 3339 or `YYYY-MM-DD`; defaults to now.
    #[serde(rename = "FechaVenta", default)]
    pub sale_date: Option<String>,
    /// Efectiva or Pendiente only; defaults to Efectiva.
    #[serde(rename = "Estado", default)]
    pub status: Option<SaleStatus>,
    /// Defaults to Venta.
    #[serde(rename = "Tipo", default)]
    pub kind: Option<SaleKind>,
    /// Required when kind is Devolucion.
    #[serde(rename = "IdVentaOriginal", default)]
    pub original_sale_id: Option<String>,
    #[serde(rename = "NotasAdicionales", default)]
    pub notes: Option<String>,
    #[serde(rename = "detallesProductos", default)]
    pub product_lines: Vec<SaleLineInput>,
    #[serde(rename = "detallesServicios", default)]
    pub service_lines: Vec<ServiceLineInput>,
}

/// A sale with both line collections, the read model operations return.
#[derive(Debug, Clone, Serialize)]
pub struct SaleWithLines {
    #[serde(flatten)]
    pub sale: Sale,
    #[serde(rename = "detallesProductos")]
    pub items: Vec<SaleItem>,
    #[serde(rename = "detallesServicios")]
    pub service_items: Vec<ServiceItem>,
}

/// What `return_sale` hands back: the flipped original and the new
/// Devolucion row.
#[derive(Debug, Clone, Serialize)]
pub struct ReturnOutcome {
    #[serde(rename = "ventaOriginal")]
    pub original: Sale,
    #[serde(rename = "devolucion")]
    pub return_sale: SaleWithLines,
}

// =============================================================================
// Service
// =============================================================================

/// Transactional operations over the Sale aggregate.
#[derive(Debug, Clone)]
pub struct SaleService {
    db: Database,
}

impl SaleService {
    /// Creates a new SaleService.
    pub fn new(db: Database) -> Self {
        SaleService { db }
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Creates a sale (or a return, when kind is Devolucion) with its lines.
    ///
    /// For an Efectiva Venta each product line decrements stock
    /// conditionally; the first short line aborts the whole transaction, so
    /// no partial sale is ever visible.
    pub async fn create(&self, req: CreateSale) -> ServiceResult<SaleWithLines> {
        validation::validate_id("IdCliente", &req.customer_id)?;
        validation::validate_id("IdUsuario", &req.staff_id)?;

        let sale_date = match &req.sale_date {
            Some(raw) => validation::parse_date(raw)?,
            None => Utc::now(),
        };
        let status = req.status.unwrap_or(SaleStatus::Effective);
        let kind = req.kind.unwrap_or(SaleKind::Sale);

        // Cancelada and Devuelta are terminal states reached only through
        // cancel() and return_sale(); a row can never be born in them.
        if matches!(status, SaleStatus::Cancelled | SaleStatus::Returned) {
            return Err(ServiceError::business_rule(format!(
                "Una venta no puede crearse en estado {status}"
            )));
        }

        if req.product_lines.is_empty() && req.service_lines.is_empty() {
            return Err(ValidationError::NoLines.into());
        }
        if req.product_lines.len() + req.service_lines.len() > MAX_DOCUMENT_LINES {
            return Err(ServiceError::business_rule(format!(
                "Una venta no puede tener más de {MAX_DOCUMENT_LINES} detalles"
            )));
        }
        for line in &req.product_lines {
            validate_product_line(line)?;
        }
        for line in &req.service_lines {
            validate_service_line(line)?;
        }

        let original_sale_id = match kind {
            SaleKind::Return => Some(
                req.original_sale_id
                    .clone()
                    .ok_or(ValidationError::MissingOriginalSale)?,
            ),
            SaleKind::Sale => None,
        };

        let mut tx = self.db.begin().await?;

        // A return must point at a genuine, existing sale.
        if let Some(original_id) = &original_sale_id {
            let original = self.require(&mut tx, original_id).await?;
            if original.kind == SaleKind::Return {
                return Err(CoreError::ReturnOfReturn.into());
            }
        }

        let now = Utc::now();
        let sale = Sale {
            id: generate_sale_id(),
            customer_id: req.customer_id.trim().to_string(),
            staff_id: req.staff_id.trim().to_string(),
            sale_date,
            subtotal_cents: 0,
            tax_cents: 0,
            total_cents: 0,
            status,
            kind,
            original_sale_id,
            notes: req.notes.clone(),
            created_at: now,
            updated_at: now,
        };

        self.db.sales().insert(&mut tx, &sale).await?;

        let apply_stock = status == SaleStatus::Effective;
        for line in &req.product_lines {
            self.write_product_line(&mut tx, &sale.id, kind, line, apply_stock)
                .await?;
        }
        for line in &req.service_lines {
            self.write_service_line(&mut tx, &sale.id, line).await?;
        }

        self.db.sales().recompute_totals(&mut tx, &sale.id).await?;

        let result = self.fetch_with_lines(&mut tx, &sale.id).await?;

        tx.commit().await.map_err(crate::error::DbError::from)?;

        info!(
            id = %result.sale.id,
            kind = %kind,
            product_lines = result.items.len(),
            service_lines = result.service_items.len(),
            "Sale created"
        );
        Ok(result)
    }

    /// Creates a full return for an effective sale.
    ///
    /// ## What This Does (one transaction)
    /// 1. Rejects returns of returns and of non-Efectiva sales
    /// 2. Creates a Devolucion row copying product and service lines 1:1
    /// 3. Increments stock for every returned product line
    /// 4. Flips the original to Devuelta
    pub async fn return_sale(&self, original_id: &str) -> ServiceResult<ReturnOutcome> {
        let mut tx = self.db.begin().await?;

        let original = self.require(&mut tx, original_id).await?;

        if original.kind == SaleKind::Return {
            return Err(CoreError::ReturnOfReturn.into());
        }
        if !original.is_effective() {
            return Err(CoreError::SaleNotReturnable {
                status: original.status,
            }
            .into());
        }

        let original_items = self.db.sales().fetch_items(&mut tx, original_id).await?;
        let original_services = self
            .db
            .sales()
            .fetch_service_items(&mut tx, original_id)
            .await?;

        let now = Utc::now();
        let return_row = Sale {
            id: generate_sale_id(),
            customer_id: original.customer_id.clone(),
            staff_id: original.staff_id.clone(),
            sale_date: now,
            subtotal_cents: 0,
            tax_cents: 0,
            total_cents: 0,
            status: SaleStatus::Effective,
            kind: SaleKind::Return,
            original_sale_id: Some(original.id.clone()),
            notes: Some(format!("Devolución de la venta {}", original.id)),
            created_at: now,
            updated_at: now,
        };

        self.db.sales().insert(&mut tx, &return_row).await?;

        for item in &original_items {
            let copy = SaleItem {
                id: generate_sale_item_id(),
                sale_id: return_row.id.clone(),
                ..item.clone()
            };
            self.db.sales().insert_item(&mut tx, &copy).await?;

            // Goods come back on the shelf.
            self.move_stock(
                &mut tx,
                &item.product_id,
                StockMovement::ReturnEffective,
                item.quantity,
            )
            .await?;
        }

        for item in &original_services {
            let copy = ServiceItem {
                id: generate_service_item_id(),
                sale_id: return_row.id.clone(),
                ..item.clone()
            };
            self.db.sales().insert_service_item(&mut tx, &copy).await?;
        }

        self.db
            .sales()
            .recompute_totals(&mut tx, &return_row.id)
            .await?;
        self.db
            .sales()
            .set_status(&mut tx, original_id, SaleStatus::Returned)
            .await?;

        let flipped = self.require(&mut tx, original_id).await?;
        let return_sale = self.fetch_with_lines(&mut tx, &return_row.id).await?;

        tx.commit().await.map_err(crate::error::DbError::from)?;

        info!(original_id = %original_id, return_id = %return_sale.sale.id, "Sale returned");
        Ok(ReturnOutcome {
            original: flipped,
            return_sale,
        })
    }

    /// Cancels a sale, reversing its stock effects when Efectiva.
    ///
    /// Cancelling a Devolucion whose original is still marked Devuelta
    /// restores that original to Efectiva.
    pub async fn cancel(&self, id: &str) -> ServiceResult<Sale> {
        let mut tx = self.db.begin().await?;

        let sale = self.require(&mut tx, id).await?;

        match sale.status {
            SaleStatus::Cancelled => return Err(CoreError::AlreadyCancelled.into()),
            SaleStatus::Returned => return Err(CoreError::CancelReturned.into()),
            _ => {}
        }

        if sale.is_effective() {
            self.reverse_stock(&mut tx, &sale).await?;
        }

        self.db
            .sales()
            .set_status(&mut tx, id, SaleStatus::Cancelled)
            .await?;

        if sale.kind == SaleKind::Return {
            if let Some(original_id) = &sale.original_sale_id {
                let original = self.db.sales().fetch(&mut tx, original_id).await?;
                if let Some(original) = original {
                    if original.status == SaleStatus::Returned {
                        self.db
                            .sales()
                            .set_status(&mut tx, original_id, SaleStatus::Effective)
                            .await?;
                    }
                }
            }
        }

        let updated = self.require(&mut tx, id).await?;

        tx.commit().await.map_err(crate::error::DbError::from)?;

        info!(id = %id, kind = %sale.kind, "Sale cancelled");
        Ok(updated)
    }

    /// Generalized status transition.
    ///
    /// Stock moves only when the transition crosses the Efectiva boundary:
    /// leaving reverses by kind, entering re-applies (a Venta reactivation
    /// decrements conditionally and fails short, rolling everything back).
    pub async fn set_status(&self, id: &str, status: SaleStatus) -> ServiceResult<Sale> {
        let mut tx = self.db.begin().await?;

        let sale = self.require(&mut tx, id).await?;

        if sale.status == status {
            return Err(CoreError::StatusUnchanged {
                status: status.to_string(),
            }
            .into());
        }

        let was_effective = sale.is_effective();
        let becomes_effective = status == SaleStatus::Effective;

        if was_effective && !becomes_effective {
            self.reverse_stock(&mut tx, &sale).await?;
        } else if !was_effective && becomes_effective {
            self.apply_stock(&mut tx, &sale).await?;
        }

        self.db.sales().set_status(&mut tx, id, status).await?;

        let updated = self.require(&mut tx, id).await?;

        tx.commit().await.map_err(crate::error::DbError::from)?;

        info!(id = %id, status = %status, "Sale status changed");
        Ok(updated)
    }

    /// Adds one product line to an existing sale.
    pub async fn add_product_line(
        &self,
        sale_id: &str,
        line: SaleLineInput,
    ) -> ServiceResult<SaleWithLines> {
        validate_product_line(&line)?;

        let mut tx = self.db.begin().await?;

        let sale = self.require(&mut tx, sale_id).await?;

        self.write_product_line(&mut tx, sale_id, sale.kind, &line, sale.is_effective())
            .await?;
        self.db.sales().recompute_totals(&mut tx, sale_id).await?;

        let result = self.fetch_with_lines(&mut tx, sale_id).await?;

        tx.commit().await.map_err(crate::error::DbError::from)?;

        info!(sale_id = %sale_id, product_id = %line.product_id, "Sale line added");
        Ok(result)
    }

    /// Replaces one product line in place, keeping the line id stable.
    ///
    /// Stock is adjusted as a compensating pair sized by the sale's kind:
    /// the old line's movement is reversed, the new one applied (conditional
    /// for a Venta, so a short replacement aborts the transaction).
    pub async fn update_product_line(
        &self,
        sale_id: &str,
        item_id: &str,
        line: SaleLineInput,
    ) -> ServiceResult<SaleWithLines> {
        validate_product_line(&line)?;

        let mut tx = self.db.begin().await?;

        let sale = self.require(&mut tx, sale_id).await?;

        let old = self
            .db
            .sales()
            .fetch_item(&mut tx, item_id)
            .await?
            .filter(|item| item.sale_id == sale_id)
            .ok_or_else(|| CoreError::LineItemNotFound(item_id.to_string()))?;

        if sale.is_effective() {
            self.move_stock(
                &mut tx,
                &old.product_id,
                StockMovement::sale_reversed(sale.kind),
                old.quantity,
            )
            .await?;
        }
        self.db.sales().delete_item(&mut tx, item_id).await?;

        let product = self.require_product(&mut tx, &line.product_id).await?;
        let item = build_sale_item(item_id.to_string(), sale_id, &line, &product)?;
        self.db.sales().insert_item(&mut tx, &item).await?;

        if sale.is_effective() {
            crate::service::apply_stock_movement(
                &self.db.products(),
                &mut tx,
                &product,
                StockMovement::sale_applied(sale.kind),
                line.quantity,
            )
            .await?;
        }

        self.db.sales().recompute_totals(&mut tx, sale_id).await?;

        let result = self.fetch_with_lines(&mut tx, sale_id).await?;

        tx.commit().await.map_err(crate::error::DbError::from)?;

        info!(sale_id = %sale_id, item_id = %item_id, "Sale line replaced");
        Ok(result)
    }

    /// Removes one product line, reversing its stock effect.
    pub async fn remove_product_line(
        &self,
        sale_id: &str,
        item_id: &str,
    ) -> ServiceResult<SaleWithLines> {
        let mut tx = self.db.begin().await?;

        let sale = self.require(&mut tx, sale_id).await?;

        let item = self
            .db
            .sales()
            .fetch_item(&mut tx, item_id)
            .await?
            .filter(|item| item.sale_id == sale_id)
            .ok_or_else(|| CoreError::LineItemNotFound(item_id.to_string()))?;

        if sale.is_effective() {
            self.move_stock(
                &mut tx,
                &item.product_id,
                StockMovement::sale_reversed(sale.kind),
                item.quantity,
            )
            .await?;
        }

        self.db.sales().delete_item(&mut tx, item_id).await?;
        self.db.sales().recompute_totals(&mut tx, sale_id).await?;

        let result = self.fetch_with_lines(&mut tx, sale_id).await?;

        tx.commit().await.map_err(crate::error::DbError::from)?;

        info!(sale_id = %sale_id, item_id = %item_id, "Sale line removed");
        Ok(result)
    }

    /// Adds one service line to an existing sale. No stock moves; only the
    /// header totals change.
    pub async fn add_service_line(
        &self,
        sale_id: &str,
        line: ServiceLineInput,
    ) -> ServiceResult<SaleWithLines> {
        validate_service_line(&line)?;

        let mut tx = self.db.begin().await?;

        self.require(&mut tx, sale_id).await?;

        self.write_service_line(&mut tx, sale_id, &line).await?;
        self.db.sales().recompute_totals(&mut tx, sale_id).await?;

        let result = self.fetch_with_lines(&mut tx, sale_id).await?;

        tx.commit().await.map_err(crate::error::DbError::from)?;

        info!(sale_id = %sale_id, service_id = %line.service_id, "Service line added");
        Ok(result)
    }

    /// Replaces one service line in place, keeping the line id stable.
    pub async fn update_service_line(
        &self,
        sale_id: &str,
        item_id: &str,
        line: ServiceLineInput,
    ) -> ServiceResult<SaleWithLines> {
        validate_service_line(&line)?;

        let mut tx = self.db.begin().await?;

        self.require(&mut tx, sale_id).await?;

        self.db
            .sales()
            .fetch_service_item(&mut tx, item_id)
            .await?
            .filter(|item| item.sale_id == sale_id)
            .ok_or_else(|| CoreError::LineItemNotFound(item_id.to_string()))?;

        self.db.sales().delete_service_item(&mut tx, item_id).await?;

        let item = build_service_item(item_id.to_string(), sale_id, &line);
        self.db.sales().insert_service_item(&mut tx, &item).await?;

        self.db.sales().recompute_totals(&mut tx, sale_id).await?;

        let result = self.fetch_with_lines(&mut tx, sale_id).await?;

        tx.commit().await.map_err(crate::error::DbError::from)?;

        info!(sale_id = %sale_id, item_id = %item_id, "Service line replaced");
        Ok(result)
    }

    /// Removes one service line and recomputes the header totals.
    pub async fn remove_service_line(
        &self,
        sale_id: &str,
        item_id: &str,
    ) -> ServiceResult<SaleWithLines> {
        let mut tx = self.db.begin().await?;

        self.require(&mut tx, sale_id).await?;

        self.db
            .sales()
            .fetch_service_item(&mut tx, item_id)
            .await?
            .filter(|item| item.sale_id == sale_id)
            .ok_or_else(|| CoreError::LineItemNotFound(item_id.to_string()))?;

        self.db.sales().delete_service_item(&mut tx, item_id).await?;
        self.db.sales().recompute_totals(&mut tx, sale_id).await?;

        let result = self.fetch_with_lines(&mut tx, sale_id).await?;

        tx.commit().await.map_err(crate::error::DbError::from)?;

        info!(sale_id = %sale_id, item_id = %item_id, "Service line removed");
        Ok(result)
    }

    /// Deletes a sale, reversing its stock effects when Efectiva.
    pub async fn delete(&self, id: &str) -> ServiceResult<()> {
        let mut tx = self.db.begin().await?;

        let sale = self.require(&mut tx, id).await?;

        if sale.is_effective() {
            self.reverse_stock(&mut tx, &sale).await?;
        }

        // Product and service lines cascade with the header.
        self.db.sales().delete(&mut tx, id).await?;

        tx.commit().await.map_err(crate::error::DbError::from)?;

        info!(id = %id, "Sale deleted");
        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Gets a sale with both line collections.
    pub async fn get(&self, id: &str) -> ServiceResult<SaleWithLines> {
        let sale = self
            .db
            .sales()
            .get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(id.to_string()))?;
        let items = self.db.sales().get_items(id).await?;
        let service_items = self.db.sales().get_service_items(id).await?;

        Ok(SaleWithLines {
            sale,
            items,
            service_items,
        })
    }

    /// Lists all sales, newest first.
    pub async fn list(&self) -> ServiceResult<Vec<Sale>> {
        Ok(self.db.sales().list().await?)
    }

    /// Lists sales for one customer.
    pub async fn list_by_customer(&self, customer_id: &str) -> ServiceResult<Vec<Sale>> {
        Ok(self.db.sales().list_by_customer(customer_id).await?)
    }

    /// Lists sales recorded by one staff member.
    pub async fn list_by_staff(&self, staff_id: &str) -> ServiceResult<Vec<Sale>> {
        Ok(self.db.sales().list_by_staff(staff_id).await?)
    }

    /// Lists sales inside an inclusive date range.
    ///
    /// `to` is stretched to the end of its day, so a range given as plain
    /// dates covers the whole closing day.
    pub async fn list_by_date_range(&self, from: &str, to: &str) -> ServiceResult<Vec<Sale>> {
        let from = validation::parse_date(from)?;
        let to = validation::end_of_day(validation::parse_date(to)?);

        Ok(self.db.sales().list_by_date_range(from, to).await?)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Loads the sale or fails with the domain not-found error.
    async fn require(&self, conn: &mut SqliteConnection, id: &str) -> ServiceResult<Sale> {
        self.db
            .sales()
            .fetch(conn, id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(id.to_string()).into())
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

    /// Inserts one computed product line and applies its stock movement
    /// when the sale is Efectiva.
    async fn write_product_line(
        &self,
        conn: &mut SqliteConnection,
        sale_id: &str,
        kind: SaleKind,
        line: &SaleLineInput,
        apply_stock: bool,
    ) -> ServiceResult<()> {
        let product = self.require_product(conn, &line.product_id).await?;
        let item = build_sale_item(generate_sale_item_id(), sale_id, line, &product)?;

        self.db.sales().insert_item(conn, &item).await?;

        if apply_stock {
            crate::service::apply_stock_movement(
                &self.db.products(),
                conn,
                &product,
                StockMovement::sale_applied(kind),
                line.quantity,
            )
            .await?;
        }

        Ok(())
    }

    /// Inserts one service line. Services are untaxed and move no stock.
    async fn write_service_line(
        &self,
        conn: &mut SqliteConnection,
        sale_id: &str,
        line: &ServiceLineInput,
    ) -> ServiceResult<()> {
        let item = build_service_item(generate_service_item_id(), sale_id, line);

        self.db.sales().insert_service_item(conn, &item).await?;

        Ok(())
    }

    /// Re-applies the sale's stock effects (entering Efectiva).
    async fn apply_stock(&self, conn: &mut SqliteConnection, sale: &Sale) -> ServiceResult<()> {
        let items = self.db.sales().fetch_items(conn, &sale.id).await?;
        for item in &items {
            self.move_stock(
                conn,
                &item.product_id,
                StockMovement::sale_applied(sale.kind),
                item.quantity,
            )
            .await?;
        }
        Ok(())
    }

    /// Reverses the sale's stock effects (leaving Efectiva).
    async fn reverse_stock(&self, conn: &mut SqliteConnection, sale: &Sale) -> ServiceResult<()> {
        let items = self.db.sales().fetch_items(conn, &sale.id).await?;
        for item in &items {
            self.move_stock(
                conn,
                &item.product_id,
                StockMovement::sale_reversed(sale.kind),
                item.quantity,
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

    /// Reads the header and both line collections back through the
    /// transaction.
    async fn fetch_with_lines(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
    ) -> ServiceResult<SaleWithLines> {
        let sale = self.require(conn, id).await?;
        let items = self.db.sales().fetch_items(conn, id).await?;
        let service_items = self.db.sales().fetch_service_items(conn, id).await?;
        Ok(SaleWithLines {
            sale,
            items,
            service_items,
        })
    }
}

// =============================================================================
// Line Validators
// =============================================================================

/// Builds a computed product line, defaulting the unit price to the
/// product's current price when the request omits it.
fn build_sale_item(
    id: String,
    sale_id: &str,
    line: &SaleLineInput,
    product: &Product,
) -> ServiceResult<SaleItem> {
    let unit_price_cents = line.unit_price_cents.unwrap_or(product.price_cents);
    validation::validate_price_cents(unit_price_cents)?;

    let totals = LineTotals::compute(
        line.quantity,
        Money::from_cents(unit_price_cents),
        product.effective_tax_rate(),
    );

    Ok(SaleItem {
        id,
        sale_id: sale_id.to_string(),
        product_id: product.id.clone(),
        quantity: line.quantity,
        unit_price_cents,
        subtotal_cents: totals.subtotal.cents(),
        unit_tax_cents: totals.unit_tax.cents(),
        total_cents: totals.total.cents(),
    })
}

/// Builds a service line. Services are untaxed, so the subtotal is the
/// whole money story.
fn build_service_item(id: String, sale_id: &str, line: &ServiceLineInput) -> ServiceItem {
    ServiceItem {
        id,
        sale_id: sale_id.to_string(),
        service_id: line.service_id.trim().to_string(),
        pet_id: line.pet_id.trim().to_string(),
        quantity: line.quantity,
        unit_price_cents: line.unit_price_cents,
        subtotal_cents: line.unit_price_cents * line.quantity,
    }
}

fn validate_product_line(line: &SaleLineInput) -> ServiceResult<()> {
    validation::validate_quantity(line.quantity)?;
    if let Some(price) = line.unit_price_cents {
        validation::validate_price_cents(price)?;
    }
    if line.quantity > MAX_LINE_QUANTITY {
        return Err(ServiceError::business_rule(format!(
            "La cantidad por detalle no puede superar {MAX_LINE_QUANTITY}"
        )));
    }
    Ok(())
}

fn validate_service_line(line: &ServiceLineInput) -> ServiceResult<()> {
    validation::validate_quantity(line.quantity)?;
    validation::validate_price_cents(line.unit_price_cents)?;
    if line.quantity > MAX_LINE_QUANTITY {
        return Err(ServiceError::business_rule(format!(
            "La cantidad por detalle no puede superar {MAX_LINE_QUANTITY}"
        )));
    }
    Ok(())
}
