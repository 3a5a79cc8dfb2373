//! # Order Engine Rules
//!
//! The pure half of the order engine: the status machine, checkout planning,
//! shipping and the cancellation window. The database half (transactions,
//! stock movement) lives in `otherproteins-db::repository::order` and calls
//! into this module for every decision.
//!
//! ## Status Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   customer checkout          admin walk-in                              │
//! │          │                        │                                     │
//! │          ▼                        ▼                                     │
//! │   ┌─────────────┐  admin   ┌─────────────┐  admin   ┌─────────────┐     │
//! │   │ prozesatzen │ ───────► │   pagado    │ ───────► │  bidalita   │     │
//! │   └──────┬──────┘          └──────┬──────┘          └──────┬──────┘     │
//! │          │                        │                        │ admin      │
//! │          │  owner/admin,          │                        ▼            │
//! │          │  within window         │                 ┌─────────────┐     │
//! │          ▼                        ▼                 │  bukatuta   │     │
//! │   ┌──────────────────────────────────────┐          └─────────────┘     │
//! │   │            bertan_behera             │          (terminal)          │
//! │   └──────────────────────────────────────┘                              │
//! │                  (terminal)                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Checkout Decision Order
//! 1. walk-in requested by a non-admin → `Forbidden`
//! 2. delivery details invalid → `Validation`
//! 3. no cart entries → `EmptyCart`
//! 4. any line short of stock → `OutOfStock` (whole checkout rejected)
//! 5. otherwise a [`CheckoutPlan`] the database layer applies atomically

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::access::Actor;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{Address, DeliveryMethod};
use crate::validation::validate_address;

// =============================================================================
// Order Status
// =============================================================================

/// Lifecycle state of an order. Wire and database strings are the Basque
/// names and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum OrderStatus {
    /// Processing. Initial state of customer checkouts.
    Prozesatzen,
    /// Paid. Initial state of admin walk-in orders.
    Pagado,
    /// Shipped.
    Bidalita,
    /// Completed (terminal).
    Bukatuta,
    /// Cancelled (terminal).
    BertanBehera,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Prozesatzen,
        OrderStatus::Pagado,
        OrderStatus::Bidalita,
        OrderStatus::Bukatuta,
        OrderStatus::BertanBehera,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Prozesatzen => "prozesatzen",
            OrderStatus::Pagado => "pagado",
            OrderStatus::Bidalita => "bidalita",
            OrderStatus::Bukatuta => "bukatuta",
            OrderStatus::BertanBehera => "bertan_behera",
        }
    }

    /// The single forward step an admin may take from this state.
    pub fn next(&self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Prozesatzen => Some(OrderStatus::Pagado),
            OrderStatus::Pagado => Some(OrderStatus::Bidalita),
            OrderStatus::Bidalita => Some(OrderStatus::Bukatuta),
            OrderStatus::Bukatuta | OrderStatus::BertanBehera => None,
        }
    }

    /// Cancellation is only possible before the order ships.
    pub fn is_cancellable(&self) -> bool {
        matches!(self, OrderStatus::Prozesatzen | OrderStatus::Pagado)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Bukatuta | OrderStatus::BertanBehera)
    }

    /// Initial state for a new order.
    pub fn initial(walk_in: bool) -> OrderStatus {
        if walk_in {
            OrderStatus::Pagado
        } else {
            OrderStatus::Prozesatzen
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: OrderStatus::ALL.iter().map(|s| s.as_str().to_string()).collect(),
            })
    }
}

/// Checks an admin forward transition.
///
/// Only `prozesatzen → pagado`, `pagado → bidalita` and
/// `bidalita → bukatuta` are accepted. Cancellation has its own path.
pub fn ensure_advance(current: OrderStatus, target: OrderStatus) -> CoreResult<()> {
    if current.next() == Some(target) {
        Ok(())
    } else {
        Err(CoreError::InvalidTransition {
            from: current,
            to: target,
        })
    }
}

// =============================================================================
// Store Policy
// =============================================================================

/// Configurable commercial rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorePolicy {
    /// How long after creation an order may still be cancelled.
    pub cancellation_window: Duration,
    /// Items totals at or above this ship free.
    pub free_shipping_threshold: Money,
    /// Flat fee for home delivery below the threshold.
    pub shipping_fee: Money,
}

impl Default for StorePolicy {
    fn default() -> Self {
        StorePolicy {
            cancellation_window: Duration::hours(24),
            free_shipping_threshold: Money::from_cents(5000),
            shipping_fee: Money::from_cents(499),
        }
    }
}

impl StorePolicy {
    pub fn window_hours(&self) -> i64 {
        self.cancellation_window.num_hours()
    }

    /// Shipping charged for an items total.
    ///
    /// ```text
    /// denda (pickup)           ──► 0
    /// etxera, total >= 50,00 € ──► 0
    /// etxera, total <  50,00 € ──► flat fee
    /// ```
    pub fn shipping_for(&self, delivery: DeliveryMethod, items_total: Money) -> Money {
        match delivery {
            DeliveryMethod::Denda => Money::zero(),
            DeliveryMethod::Etxera if items_total >= self.free_shipping_threshold => Money::zero(),
            DeliveryMethod::Etxera => self.shipping_fee,
        }
    }

    /// Full shipping breakdown for display in the cart.
    pub fn quote(&self, delivery: DeliveryMethod, items_total: Money) -> ShippingQuote {
        let shipping = self.shipping_for(delivery, items_total);
        let remaining = if items_total >= self.free_shipping_threshold {
            Money::zero()
        } else {
            self.free_shipping_threshold - items_total
        };

        ShippingQuote {
            delivery,
            items_total_cents: items_total.cents(),
            shipping_cents: shipping.cents(),
            total_cents: (items_total + shipping).cents(),
            free_shipping_remaining_cents: remaining.cents(),
        }
    }

    /// Cancellation check, in this order:
    /// 1. `WindowExpired` if strictly more than the window has elapsed
    /// 2. `InvalidTransition` if the status no longer allows cancelling
    ///
    /// Ownership is checked by the caller before this runs.
    pub fn ensure_cancellable(&self, order: &Order, now: DateTime<Utc>) -> CoreResult<()> {
        if now - order.created_at > self.cancellation_window {
            return Err(CoreError::WindowExpired {
                order_id: order.id,
                window_hours: self.window_hours(),
            });
        }

        if !order.status.is_cancellable() {
            return Err(CoreError::InvalidTransition {
                from: order.status,
                to: OrderStatus::BertanBehera,
            });
        }

        Ok(())
    }
}

/// Shipping breakdown shown with the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ShippingQuote {
    pub delivery: DeliveryMethod,
    pub items_total_cents: i64,
    pub shipping_cents: i64,
    pub total_cents: i64,
    /// How much more to spend for free home delivery (0 when reached).
    pub free_shipping_remaining_cents: i64,
}

// =============================================================================
// Order
// =============================================================================

/// A placed order. Totals are frozen at checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub status: OrderStatus,
    pub delivery_method: DeliveryMethod,
    pub address: Option<Address>,
    /// Σ (line quantity × frozen unit price).
    pub items_total_cents: i64,
    pub shipping_cents: i64,
    /// Name of the in-store customer for admin walk-in orders.
    pub walk_in_customer: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Order {
    #[inline]
    pub fn items_total(&self) -> Money {
        Money::from_cents(self.items_total_cents)
    }

    #[inline]
    pub fn shipping(&self) -> Money {
        Money::from_cents(self.shipping_cents)
    }

    /// Amount charged: items plus shipping.
    #[inline]
    pub fn grand_total(&self) -> Money {
        self.items_total() + self.shipping()
    }
}

/// One product in an order. Name and unit price are snapshots taken at
/// checkout; later catalog edits never reach them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderLine {
    pub order_id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

impl OrderLine {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price().multiply_quantity(self.quantity)
    }
}

/// An order together with its lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub lines: Vec<OrderLine>,
}

impl OrderDetail {
    /// Σ line totals recomputed from the snapshots.
    pub fn lines_total(&self) -> Money {
        self.lines.iter().map(OrderLine::line_total).sum()
    }
}

// =============================================================================
// Checkout Planning
// =============================================================================

/// Checkout options chosen by the customer (or by an admin at the counter).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CheckoutRequest {
    #[serde(default)]
    pub delivery: DeliveryMethod,
    #[serde(default)]
    pub address: Option<Address>,
    /// Admin-only: the order is paid at the counter and starts in `pagado`.
    #[serde(default)]
    pub walk_in: bool,
    #[serde(default)]
    pub walk_in_customer: Option<String>,
}

impl CheckoutRequest {
    /// Store pickup with no extras.
    pub fn pickup() -> Self {
        CheckoutRequest::default()
    }

    pub fn home_delivery(address: Address) -> Self {
        CheckoutRequest {
            delivery: DeliveryMethod::Etxera,
            address: Some(address),
            ..CheckoutRequest::default()
        }
    }

    pub fn walk_in(customer: Option<String>) -> Self {
        CheckoutRequest {
            walk_in: true,
            walk_in_customer: customer,
            ..CheckoutRequest::default()
        }
    }
}

/// A cart entry joined with the product's current catalog data.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CheckoutCandidate {
    pub product_id: i64,
    pub name: String,
    pub price_cents: i64,
    pub stock: i64,
    pub quantity: i64,
}

/// A line the database layer will write, with frozen name and price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedLine {
    pub product_id: i64,
    pub name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

/// Everything needed to persist an order in one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutPlan {
    pub status: OrderStatus,
    pub delivery: DeliveryMethod,
    pub address: Option<Address>,
    pub walk_in_customer: Option<String>,
    pub lines: Vec<PlannedLine>,
    pub items_total: Money,
    pub shipping: Money,
}

/// Decides whether a cart can become an order, and what that order is.
///
/// Pure: it never touches stock. The caller decrements stock for every
/// planned line inside the same transaction that read `candidates`.
pub fn plan_checkout(
    actor: &Actor,
    request: &CheckoutRequest,
    candidates: &[CheckoutCandidate],
    policy: &StorePolicy,
) -> CoreResult<CheckoutPlan> {
    if request.walk_in && !actor.is_admin() {
        return Err(CoreError::Forbidden {
            action: "walk_in_order",
        });
    }

    let address = match request.delivery {
        DeliveryMethod::Denda => None,
        DeliveryMethod::Etxera => {
            let address = request.address.as_ref().ok_or(ValidationError::Required {
                field: "address".to_string(),
            })?;
            validate_address(address)?;
            Some(address.clone())
        }
    };

    let walk_in_customer = if request.walk_in {
        request
            .walk_in_customer
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
    } else {
        None
    };

    if candidates.is_empty() {
        return Err(CoreError::EmptyCart);
    }

    if let Some(short) = candidates.iter().find(|c| c.quantity > c.stock) {
        return Err(CoreError::OutOfStock {
            product_id: short.product_id,
            name: short.name.clone(),
            available: short.stock.max(0),
            requested: short.quantity,
        });
    }

    let lines: Vec<PlannedLine> = candidates
        .iter()
        .map(|c| PlannedLine {
            product_id: c.product_id,
            name: c.name.clone(),
            quantity: c.quantity,
            unit_price_cents: c.price_cents,
        })
        .collect();

    let items_total = lines
        .iter()
        .try_fold(Money::zero(), |total, l| {
            Money::from_cents(l.unit_price_cents)
                .checked_multiply_quantity(l.quantity)
                .and_then(|line| total.checked_add(line))
        })
        .ok_or(ValidationError::OutOfRange {
            field: "total".to_string(),
            min: 0,
            max: i64::MAX,
        })?;

    Ok(CheckoutPlan {
        status: OrderStatus::initial(request.walk_in),
        delivery: request.delivery,
        address,
        walk_in_customer,
        shipping: policy.shipping_for(request.delivery, items_total),
        items_total,
        lines,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
