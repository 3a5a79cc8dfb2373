//! # Domain Types
//!
//! Catalog, account and cart types used throughout OtherProteins.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐        │
//! │  │    Category     │◄──│    Product      │◄──│   CartEntry     │        │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │        │
//! │  │  id             │   │  id             │   │  user_id        │        │
//! │  │  name (unique)  │   │  price_cents    │   │  product_id     │        │
//! │  └─────────────────┘   │  stock (>= 0)   │   │  quantity (> 0) │        │
//! │                        └─────────────────┘   └─────────────────┘        │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐                              │
//! │  │      User       │   │ DeliveryMethod  │   Orders live in             │
//! │  │  ─────────────  │   │  ─────────────  │   crate::order               │
//! │  │  email (unique) │   │  Denda (pickup) │                              │
//! │  │  role           │   │  Etxera (home)  │                              │
//! │  └─────────────────┘   └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Identifiers are SQLite integer row ids. They also appear in invoice
//! numbers, so they stay small and human-readable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::access::Role;
use crate::money::Money;

// =============================================================================
// Category
// =============================================================================

/// A product category (Proteina, Kreatina, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: i64,

    /// Display name shown in the catalog and frozen onto order lines.
    pub name: String,

    pub description: String,

    /// Unit price in cents. Never negative.
    pub price_cents: i64,

    /// Units on hand. Never negative.
    pub stock: i64,

    pub category_id: Option<i64>,

    pub image_url: Option<String>,

    /// Ingredient list (osagaiak).
    pub ingredients: Option<String>,

    /// Nutritional values (balio nutrizionalak).
    pub nutrition: Option<String>,

    /// Usage instructions (erabilera modua).
    pub usage: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Whether `quantity` units can be taken from current stock.
    #[inline]
    pub fn can_fulfil(&self, quantity: i64) -> bool {
        quantity <= self.stock
    }

    #[inline]
    pub fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

/// Fields for a new catalog product.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price_cents: i64,
    #[serde(default)]
    pub stock: i64,
    pub category_id: Option<i64>,
    pub image_url: Option<String>,
    pub ingredients: Option<String>,
    pub nutrition: Option<String>,
    pub usage: Option<String>,
}

/// Catalog query parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductFilter {
    pub category_id: Option<i64>,
    /// Case-insensitive substring matched against name and description.
    pub query: Option<String>,
    #[serde(default)]
    pub in_stock_only: bool,
    pub limit: Option<i64>,
}

// =============================================================================
// User
// =============================================================================

/// A registered account. Carries the password hash, so it is never
/// serialized; use [`UserProfile`] for anything leaving the process.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_names: String,
    pub phone: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_names)
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_names: self.last_names.clone(),
            phone: self.phone.clone(),
            role: self.role,
            created_at: self.created_at,
        }
    }
}

/// Public view of a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UserProfile {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_names: String,
    pub phone: Option<String>,
    pub role: Role,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Registration input once the password has been hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_names: String,
    pub phone: Option<String>,
    pub role: Role,
}

// =============================================================================
// Delivery
// =============================================================================

/// How an order reaches the customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum DeliveryMethod {
    /// Store pickup. Never incurs shipping.
    #[default]
    Denda,
    /// Home delivery. Requires an address.
    Etxera,
}

impl DeliveryMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryMethod::Denda => "denda",
            DeliveryMethod::Etxera => "etxera",
        }
    }
}

/// Postal address for home delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Address {
    pub street: String,
    pub number: String,
    pub city: String,
    pub province: String,
    pub postal_code: String,
}

impl Address {
    /// Single-line form used on invoices.
    pub fn one_line(&self) -> String {
        format!(
            "{} {}, {} {} ({})",
            self.street, self.number, self.postal_code, self.city, self.province
        )
    }
}

// =============================================================================
// Cart Entry
// =============================================================================

/// A stored cart row: one product in one user's cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CartEntry {
    pub user_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    #[ts(as = "String")]
    pub added_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
