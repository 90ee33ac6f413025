//! # Domain Types
//!
//! Core domain types for the TeoCat inventory/financial ledger.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │    Purchase     │   │      Sale       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  stock          │   │  supplier_id    │   │  customer_id    │       │
//! │  │  tax_rate_bps   │   │  totals         │   │  kind + status  │       │
//! │  │  applies_tax    │   │  status         │   │  original ref   │       │
//! │  └─────────────────┘   └────────┬────────┘   └────────┬────────┘       │
//! │                                 │ 1:N                 │ 1:N            │
//! │                        ┌────────┴────────┐   ┌────────┴────────┐       │
//! │                        │  PurchaseItem   │   │ SaleItem        │       │
//! │                        └─────────────────┘   │ ServiceItem     │       │
//! │                                              └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Compatibility
//! Status, kind, and field names on the JSON surface keep the legacy Spanish
//! spellings (`Efectiva`, `Devolucion`, `IdProveedor`, ...) so existing
//! clients keep working. Rust-side names are English.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000. The legacy `PorcentajeIVA` column stored
/// a percentage with two decimals; 19.00% becomes 1900 bps with no float.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a percentage (for convenience).
    pub fn from_percentage(pct: f64) -> Self {
        TaxRate((pct * 100.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    /// Checks if the rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Product
// =============================================================================

/// A catalog product, seen through the ledger's narrow lens.
///
/// The ledger owns exactly the fields it mutates or reads: the `stock`
/// counter and the tax configuration. Everything else about a product
/// (photos, barcodes, categories) lives in the catalog module.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name (legacy `NombreProducto`).
    pub name: String,

    /// List price in cents (legacy `Precio`).
    pub price_cents: i64,

    /// Whether IVA applies to this product (legacy `AplicaIVA`).
    pub applies_tax: bool,

    /// Tax rate in basis points (legacy `PorcentajeIVA` × 100).
    pub tax_rate_bps: u32,

    /// Current stock counter. Non-negative by convention; clamped paths
    /// enforce the floor, the conditional decrement rejects instead.
    pub stock: i64,

    /// Category reference (external catalog module).
    pub category_id: Option<String>,

    /// Soft-delete flag.
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the list price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Effective tax rate: the configured rate, or zero when IVA
    /// does not apply.
    #[inline]
    pub fn effective_tax_rate(&self) -> TaxRate {
        if self.applies_tax {
            TaxRate::from_bps(self.tax_rate_bps)
        } else {
            TaxRate::zero()
        }
    }
}

// =============================================================================
// Purchase
// =============================================================================

/// The status of a purchase (legacy `Estado` on `Compras`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
pub enum PurchaseStatus {
    /// Stock effects applied (legacy "Efectiva").
    #[serde(rename = "Efectiva")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "Efectiva"))]
    Effective,
    /// Cancelled; stock effects reversed (legacy "Cancelada").
    #[serde(rename = "Cancelada")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "Cancelada"))]
    Cancelled,
}

impl PurchaseStatus {
    /// Legacy wire spelling, as stored in the database.
    pub const fn as_str(&self) -> &'static str {
        match self {
            PurchaseStatus::Effective => "Efectiva",
            PurchaseStatus::Cancelled => "Cancelada",
        }
    }
}

impl std::fmt::Display for PurchaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for PurchaseStatus {
    fn default() -> Self {
        PurchaseStatus::Effective
    }
}

/// A purchase header (legacy `Compras`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Purchase {
    pub id: String,
    /// Supplier reference (legacy `IdProveedor`, external module).
    pub supplier_id: String,
    /// Purchase date (legacy `FechaCompra`).
    pub purchase_date: DateTime<Utc>,
    /// Sum of line subtotals (legacy `TotalMonto`).
    pub subtotal_cents: i64,
    /// Sum of line tax (legacy `TotalIva`).
    pub tax_cents: i64,
    /// Tax-inclusive total (legacy `TotalMontoConIva`).
    pub total_cents: i64,
    pub status: PurchaseStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Purchase {
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    #[inline]
    pub fn tax(&self) -> Money {
        Money::from_cents(self.tax_cents)
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// A purchase line item (legacy `DetalleCompras`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PurchaseItem {
    pub id: String,
    pub purchase_id: String,
    pub product_id: String,
    /// Quantity purchased (legacy `Cantidad`, > 0).
    pub quantity: i64,
    /// Unit price in cents (legacy `PrecioUnitario`, >= 0).
    pub unit_price_cents: i64,
    /// quantity × unit price (legacy `Subtotal`).
    pub subtotal_cents: i64,
    /// Tax per unit (legacy `IvaUnitario`).
    pub unit_tax_cents: i64,
    /// Tax-inclusive line total (legacy `SubtotalConIva`).
    pub total_cents: i64,
}

impl PurchaseItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Line tax, derived from the tax-inclusive columns.
    /// Header `tax_cents` is the SUM of these.
    #[inline]
    pub fn line_tax_cents(&self) -> i64 {
        self.total_cents - self.subtotal_cents
    }
}

// =============================================================================
// Sale
// =============================================================================

/// The status of a sale (legacy `Estado` on `Ventas`).
///
/// State machine: `Pendiente ⇄ Efectiva → {Cancelada, Devuelta}` with
/// `Cancelada → Efectiva` permitted when stock allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
pub enum SaleStatus {
    #[serde(rename = "Efectiva")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "Efectiva"))]
    Effective,
    #[serde(rename = "Pendiente")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "Pendiente"))]
    Pending,
    #[serde(rename = "Cancelada")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "Cancelada"))]
    Cancelled,
    /// Set on the ORIGINAL sale once a return for it becomes effective.
    #[serde(rename = "Devuelta")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "Devuelta"))]
    Returned,
}

impl SaleStatus {
    /// Legacy wire spelling, as stored in the database.
    pub const fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Effective => "Efectiva",
            SaleStatus::Pending => "Pendiente",
            SaleStatus::Cancelled => "Cancelada",
            SaleStatus::Returned => "Devuelta",
        }
    }
}

impl std::fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for SaleStatus {
    fn default() -> Self {
        SaleStatus::Effective
    }
}

/// Whether a sale row is a genuine sale or a return (legacy `Tipo`).
///
/// A return is a Sale row of kind `Devolucion` linked to the original sale
/// through `original_sale_id`. Returns of returns are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
pub enum SaleKind {
    #[serde(rename = "Venta")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "Venta"))]
    Sale,
    #[serde(rename = "Devolucion")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "Devolucion"))]
    Return,
}

impl SaleKind {
    /// Legacy wire spelling, as stored in the database.
    pub const fn as_str(&self) -> &'static str {
        match self {
            SaleKind::Sale => "Venta",
            SaleKind::Return => "Devolucion",
        }
    }
}

impl std::fmt::Display for SaleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for SaleKind {
    fn default() -> Self {
        SaleKind::Sale
    }
}

/// A sale header (legacy `Ventas`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    pub id: String,
    /// Customer reference (legacy `IdCliente`, external module).
    pub customer_id: String,
    /// Staff user reference (legacy `IdUsuario`, external module).
    pub staff_id: String,
    pub sale_date: DateTime<Utc>,
    /// Sum of all line subtotals (legacy `Subtotal`).
    pub subtotal_cents: i64,
    /// Sum of product-line tax (legacy `TotalIva`; services are untaxed).
    pub tax_cents: i64,
    /// Grand total (legacy `TotalMonto`).
    pub total_cents: i64,
    pub status: SaleStatus,
    pub kind: SaleKind,
    /// Populated only when `kind` is `Return` (legacy `IdVentaOriginal`).
    pub original_sale_id: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    #[inline]
    pub fn tax(&self) -> Money {
        Money::from_cents(self.tax_cents)
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// True when this row's stock effects are currently applied.
    #[inline]
    pub fn is_effective(&self) -> bool {
        self.status == SaleStatus::Effective
    }
}

/// A sale product-line item (legacy `DetalleVentas`).
/// Same money shape as [`PurchaseItem`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub subtotal_cents: i64,
    pub unit_tax_cents: i64,
    pub total_cents: i64,
}

impl SaleItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn line_tax_cents(&self) -> i64 {
        self.total_cents - self.subtotal_cents
    }
}

/// A sale service-line item (legacy `DetalleVentasServicios`).
///
/// Services are untaxed in this model and have no stock effect; each line
/// references the groomed pet (legacy `IdMascota`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ServiceItem {
    pub id: String,
    pub sale_id: String,
    /// Service reference (external module).
    pub service_id: String,
    /// Pet reference (external module).
    pub pet_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub subtotal_cents: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tax_rate_from_bps() {
        let rate = TaxRate::from_bps(1900);
        assert_eq!(rate.bps(), 1900);
        assert!((rate.percentage() - 19.0).abs() < 0.001);
    }

    #[test]
    fn test_tax_rate_from_percentage() {
        assert_eq!(TaxRate::from_percentage(19.0).bps(), 1900);
        assert_eq!(TaxRate::from_percentage(8.25).bps(), 825);
    }

    #[test]
    fn test_effective_tax_rate_respects_applies_tax() {
        let mut product = sample_product();
        assert_eq!(product.effective_tax_rate().bps(), 1900);

        product.applies_tax = false;
        assert!(product.effective_tax_rate().is_zero());
    }

    #[test]
    fn test_status_serializes_to_legacy_spanish() {
        assert_eq!(
            serde_json::to_string(&SaleStatus::Effective).unwrap(),
            "\"Efectiva\""
        );
        assert_eq!(
            serde_json::to_string(&SaleStatus::Returned).unwrap(),
            "\"Devuelta\""
        );
        assert_eq!(
            serde_json::to_string(&SaleKind::Return).unwrap(),
            "\"Devolucion\""
        );
        assert_eq!(
            serde_json::to_string(&PurchaseStatus::Cancelled).unwrap(),
            "\"Cancelada\""
        );
    }

    #[test]
    fn test_line_tax_is_total_minus_subtotal() {
        let item = SaleItem {
            id: "i".into(),
            sale_id: "s".into(),
            product_id: "p".into(),
            quantity: 10,
            unit_price_cents: 10_000,
            subtotal_cents: 100_000,
            unit_tax_cents: 1900,
            total_cents: 119_000,
        };
        assert_eq!(item.line_tax_cents(), 19_000);
    }

    fn sample_product() -> Product {
        let now = Utc::now();
        Product {
            id: "p-1".into(),
            name: "Shampoo para gatos".into(),
            price_cents: 10_000,
            applies_tax: true,
            tax_rate_bps: 1900,
            stock: 0,
            category_id: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}
