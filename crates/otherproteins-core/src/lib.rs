//! # otherproteins-core: Pure Business Logic for OtherProteins
//!
//! This crate holds every business decision of the store as pure functions
//! with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      OtherProteins Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                 storefront-api (axum, JSON)                     │    │
//! │  │   /api/cart ──► /api/orders ──► /api/orders/{id}/invoice.pdf    │    │
//! │  └─────────────────────────────┬───────────────────────────────────┘    │
//! │                                │ Actor { user_id, role }                │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐    │
//! │  │               otherproteins-db (transactions)                   │    │
//! │  │        catalog, cart, order and user repositories               │    │
//! │  └─────────────────────────────┬───────────────────────────────────┘    │
//! │                                │ every decision                         │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐    │
//! │  │            ★ otherproteins-core (THIS CRATE) ★                  │    │
//! │  │                                                                 │    │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐   │    │
//! │  │   │  money  │ │  cart   │ │  order  │ │ access  │ │ invoice │   │    │
//! │  │   │  cents  │ │  rules  │ │ states  │ │  roles  │ │   PDF   │   │    │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └─────────┘   │    │
//! │  │                                                                 │    │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • NO CLOCK                  │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Catalog, account and cart types
//! - [`money`] - Euro amounts in integer cents
//! - [`cart`] - Cart quantity rules and the priced cart view
//! - [`order`] - Order status machine, checkout planning, store policy
//! - [`access`] - Roles, `Actor`, `require_admin`
//! - [`invoice`] - PDF invoice rendering
//! - [`validation`] - Input validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use otherproteins_core::{DeliveryMethod, Money, StorePolicy};
//!
//! let policy = StorePolicy::default();
//! let fee = policy.shipping_for(DeliveryMethod::Etxera, Money::from_cents(2299));
//! assert_eq!(fee.to_string(), "4,99 €");
//!
//! let free = policy.shipping_for(DeliveryMethod::Etxera, Money::from_cents(5000));
//! assert!(free.is_zero());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod access;
pub mod cart;
pub mod error;
pub mod invoice;
pub mod money;
pub mod order;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use access::{require_admin, Actor, Role};
pub use cart::{CartLine, CartView};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use order::{
    CheckoutRequest, Order, OrderDetail, OrderLine, OrderStatus, ShippingQuote, StorePolicy,
};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct products in a single cart.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single product in a cart.
///
/// ## Business Reason
/// Catches typos (1000 instead of 10) before they reach checkout.
pub const MAX_ITEM_QUANTITY: i64 = 999;
