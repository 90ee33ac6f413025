//! # Line-Item Calculator
//!
//! Pure math for one purchase/sale line: subtotal, tax, tax-inclusive total.
//!
//! ## Canonical Tax Formula
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  subtotal = unit_price × quantity                                       │
//! │  unit_tax = unit_price × rate          (stored as legacy IvaUnitario)  │
//! │  tax      = subtotal   × rate          (summed into header TotalIva)   │
//! │  total    = subtotal + tax             (legacy SubtotalConIva)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The legacy backend disagreed with itself here: some call sites taxed the
//! unit price, some the subtotal, some hardcoded 16%, 18%, or 19%. This
//! module is the single source of truth: the line tax is subtotal-based and
//! the rate is ALWAYS the product's own configured rate (zero when the
//! product does not apply IVA). The per-unit figure is kept purely because
//! the `IvaUnitario` column still exists on the wire.
//!
//! No side effects. Deterministic. Safe to call for recomputation after any
//! edit: recomputing twice yields identical totals.

use crate::money::Money;
use crate::types::TaxRate;

/// Computed money fields for one line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineTotals {
    /// quantity × unit price.
    pub subtotal: Money,
    /// Tax on a single unit (legacy `IvaUnitario`).
    pub unit_tax: Money,
    /// Tax on the whole line.
    pub tax: Money,
    /// subtotal + tax (legacy `SubtotalConIva`).
    pub total: Money,
}

impl LineTotals {
    /// Computes all money fields for a line.
    ///
    /// Callers are expected to have validated `quantity > 0` and
    /// `unit_price >= 0` already; this function just does the math.
    ///
    /// ## Example
    /// ```rust
    /// use teocat_core::money::Money;
    /// use teocat_core::pricing::LineTotals;
    /// use teocat_core::types::TaxRate;
    ///
    /// // 10 units at $100.00, 19% IVA
    /// let line = LineTotals::compute(10, Money::from_cents(10_000), TaxRate::from_bps(1900));
    /// assert_eq!(line.subtotal.cents(), 100_000); // $1000.00
    /// assert_eq!(line.unit_tax.cents(), 1_900);   // $19.00
    /// assert_eq!(line.tax.cents(), 19_000);       // $190.00
    /// assert_eq!(line.total.cents(), 119_000);    // $1190.00
    /// ```
    pub fn compute(quantity: i64, unit_price: Money, rate: TaxRate) -> LineTotals {
        let subtotal = unit_price.multiply_quantity(quantity);
        let unit_tax = unit_price.calculate_tax(rate);
        let tax = subtotal.calculate_tax(rate);

        LineTotals {
            subtotal,
            unit_tax,
            tax,
            total: subtotal + tax,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_taxed_line() {
        // 10 × $100.00 at 19%
        let line = LineTotals::compute(10, Money::from_cents(10_000), TaxRate::from_bps(1900));
        assert_eq!(line.subtotal.cents(), 100_000);
        assert_eq!(line.unit_tax.cents(), 1_900);
        assert_eq!(line.tax.cents(), 19_000);
        assert_eq!(line.total.cents(), 119_000);
    }

    #[test]
    fn test_untaxed_line() {
        let line = LineTotals::compute(3, Money::from_cents(2_500), TaxRate::zero());
        assert_eq!(line.subtotal.cents(), 7_500);
        assert_eq!(line.unit_tax.cents(), 0);
        assert_eq!(line.tax.cents(), 0);
        assert_eq!(line.total.cents(), 7_500);
    }

    #[test]
    fn test_free_line_is_all_zero() {
        let line = LineTotals::compute(5, Money::zero(), TaxRate::from_bps(1900));
        assert_eq!(line.subtotal.cents(), 0);
        assert_eq!(line.total.cents(), 0);
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let a = LineTotals::compute(7, Money::from_cents(1_099), TaxRate::from_bps(1900));
        let b = LineTotals::compute(7, Money::from_cents(1_099), TaxRate::from_bps(1900));
        assert_eq!(a, b);
    }

    #[test]
    fn test_line_tax_is_subtotal_based_not_unit_based() {
        // Rounding makes unit_tax × quantity drift from subtotal × rate;
        // header totals must use the subtotal-based figure.
        let line = LineTotals::compute(3, Money::from_cents(33), TaxRate::from_bps(1900));
        assert_eq!(line.subtotal.cents(), 99);
        assert_eq!(line.unit_tax.cents(), 6); // 33 × 0.19 = 6.27 → 6
        assert_eq!(line.tax.cents(), 19); // 99 × 0.19 = 18.81 → 19
        assert_ne!(line.tax.cents(), line.unit_tax.cents() * 3);
    }
}
