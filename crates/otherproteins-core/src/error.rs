//! # Error Types
//!
//! Domain-specific error types for otherproteins-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  otherproteins-core errors (this file)                                  │
//! │  ├── CoreError        - Business rule rejections                        │
//! │  └── ValidationError  - Input validation failures                       │
//! │                                                                         │
//! │  otherproteins-db errors (separate crate)                               │
//! │  └── DbError          - Database failures + Rejected(CoreError)         │
//! │                                                                         │
//! │  storefront-api errors (in app)                                         │
//! │  └── ApiError         - What HTTP clients see ({code, message})         │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → HTTP          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Display strings of [`CoreError`] are the customer-facing Basque messages
//! the storefront shows verbatim. [`CoreError::code`] gives the stable
//! machine-readable identifier.

use thiserror::Error;

use crate::order::OrderStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule rejections.
///
/// Every variant is recoverable: the operation that produced it changed
/// nothing, and the caller may correct the request and try again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Checkout was attempted with no cart entries.
    #[error("Saskia hutsik dago.")]
    EmptyCart,

    /// A cart quantity cannot be satisfied by current stock.
    ///
    /// ## When This Occurs
    /// ```text
    /// Add to cart (qty: 3, already in cart: 2)
    ///      │
    ///      ▼
    /// Check stock: available=4, wanted=5
    ///      │
    ///      ▼
    /// OutOfStock { available: 4, requested: 5, .. }
    /// ```
    /// Also raised by checkout when any line falls short; the whole
    /// checkout is rejected and no stock moves.
    #[error("Stock nahikorik ez dago ({name}). Gehienez {available} unitate erabilgarri daude.")]
    OutOfStock {
        product_id: i64,
        name: String,
        available: i64,
        requested: i64,
    },

    /// An explicit stock adjustment would drive stock below zero.
    #[error("Ez dago stock nahikorik: {available} unitate daude, {requested} eskatu dira.")]
    InsufficientStock {
        product_id: i64,
        available: i64,
        requested: i64,
    },

    /// The order cannot move between these two states.
    #[error("Eskaera ezin da '{from}' egoeratik '{to}' egoerara pasa.")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// The cancellation window has elapsed.
    #[error("Eskaera ezin da bertan behera utzi: {window_hours} orduko epea igaro da.")]
    WindowExpired { order_id: i64, window_hours: i64 },

    /// Entity does not exist or is not visible to the requester.
    #[error("{entity} ez da aurkitu.")]
    NotFound { entity: &'static str, id: i64 },

    /// The acting user lacks the role for this operation.
    #[error("Ez duzu baimenik ekintza hau egiteko ({action}).")]
    Forbidden { action: &'static str },

    /// Cart has exceeded maximum allowed distinct products.
    #[error("Saskiak ezin ditu {max} produktu baino gehiago izan.")]
    CartTooLarge { max: usize },

    /// Item quantity exceeds maximum allowed.
    #[error("{requested} unitate gehiegi dira (gehienez {max}).")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// Validation error (wraps ValidationError).
    #[error("{0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Shorthand for a missing product.
    pub fn product_not_found(id: i64) -> Self {
        CoreError::NotFound {
            entity: "Produktua",
            id,
        }
    }

    /// Shorthand for a missing (or foreign) order.
    pub fn order_not_found(id: i64) -> Self {
        CoreError::NotFound {
            entity: "Eskaera",
            id,
        }
    }

    /// Stable identifier exposed to API clients.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::EmptyCart => "EMPTY_CART",
            CoreError::OutOfStock { .. } => "OUT_OF_STOCK",
            CoreError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            CoreError::InvalidTransition { .. } => "INVALID_TRANSITION",
            CoreError::WindowExpired { .. } => "WINDOW_EXPIRED",
            CoreError::NotFound { .. } => "NOT_FOUND",
            CoreError::Forbidden { .. } => "FORBIDDEN",
            CoreError::CartTooLarge { .. } => "CART_TOO_LARGE",
            CoreError::QuantityTooLarge { .. } => "QUANTITY_TOO_LARGE",
            CoreError::Validation(_) => "VALIDATION_ERROR",
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any business logic runs, so they never leave partial state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., malformed email, unknown status string).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Duplicate value (e.g., an email that is already registered).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
