//! # Cart Rules
//!
//! Quantity rules for cart edits and the priced cart view.
//!
//! Carts are persisted per user by `otherproteins-db`; this module decides
//! what a stored quantity may become and how the cart is totalled.
//!
//! ## Add-to-cart Flow
//! ```text
//! add_item(product, qty=2)
//!      │
//!      ▼
//! validate_quantity(2)            qty <= 0     → Validation
//!      │
//!      ▼
//! existing 3 + 2 = 5              5 > 999      → QuantityTooLarge
//!      │                          new product and
//!      ▼                          cart has 100 → CartTooLarge
//! stock check (soft)              5 > stock    → OutOfStock
//!      │
//!      ▼
//! store quantity 5
//! ```
//!
//! The stock check here is advisory: stock can change before checkout,
//! which re-validates every line inside its transaction.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::order::{ShippingQuote, StorePolicy};
use crate::types::{DeliveryMethod, Product};
use crate::validation::validate_quantity;
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

// =============================================================================
// Quantity Rules
// =============================================================================

/// What the cart currently holds for one product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartSlot {
    /// Quantity already in the cart (0 when absent).
    pub existing: i64,
    /// Distinct products currently in the cart.
    pub distinct_items: usize,
}

fn check_target(product: &Product, slot: CartSlot, target: i64) -> CoreResult<i64> {
    if target > MAX_ITEM_QUANTITY {
        return Err(CoreError::QuantityTooLarge {
            requested: target,
            max: MAX_ITEM_QUANTITY,
        });
    }

    if slot.existing == 0 && slot.distinct_items >= MAX_CART_ITEMS {
        return Err(CoreError::CartTooLarge {
            max: MAX_CART_ITEMS,
        });
    }

    if !product.can_fulfil(target) {
        return Err(CoreError::OutOfStock {
            product_id: product.id,
            name: product.name.clone(),
            available: product.stock,
            requested: target,
        });
    }

    Ok(target)
}

/// Quantity to store after adding `qty` units.
pub fn quantity_after_add(product: &Product, slot: CartSlot, qty: i64) -> CoreResult<i64> {
    validate_quantity(qty)?;
    // Saturates so an absurd qty still lands on QuantityTooLarge.
    check_target(product, slot, slot.existing.saturating_add(qty))
}

/// Quantity to store after an explicit set.
///
/// `Ok(None)` means the entry should be removed (qty 0).
pub fn quantity_after_set(product: &Product, slot: CartSlot, qty: i64) -> CoreResult<Option<i64>> {
    if qty == 0 {
        return Ok(None);
    }
    validate_quantity(qty)?;
    check_target(product, slot, qty).map(Some)
}

// =============================================================================
// Cart View
// =============================================================================

/// A cart entry joined with live catalog data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CartLine {
    pub product_id: i64,
    pub name: String,
    pub unit_price_cents: i64,
    pub quantity: i64,
    /// Current stock, so the client can warn before checkout.
    pub stock: i64,
}

impl CartLine {
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.unit_price_cents).multiply_quantity(self.quantity)
    }

    /// Whether checkout would currently fail on this line.
    #[inline]
    pub fn exceeds_stock(&self) -> bool {
        self.quantity > self.stock
    }
}

/// Priced line as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartViewLine {
    #[serde(flatten)]
    pub line: CartLine,
    pub line_total_cents: i64,
    pub exceeds_stock: bool,
}

/// A user's cart with totals and shipping quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartView {
    pub lines: Vec<CartViewLine>,
    pub total_quantity: i64,
    pub subtotal_cents: i64,
    pub shipping: ShippingQuote,
}

impl CartView {
    /// Prices `lines` (already in display order) and attaches the quote for
    /// `delivery`.
    pub fn build(lines: Vec<CartLine>, policy: &StorePolicy, delivery: DeliveryMethod) -> Self {
        let subtotal: Money = lines.iter().map(CartLine::line_total).sum();
        let total_quantity = lines.iter().map(|l| l.quantity).sum();

        let lines = lines
            .into_iter()
            .map(|line| CartViewLine {
                line_total_cents: line.line_total().cents(),
                exceeds_stock: line.exceeds_stock(),
                line,
            })
            .collect();

        CartView {
            lines,
            total_quantity,
            subtotal_cents: subtotal.cents(),
            shipping: policy.quote(delivery, subtotal),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
