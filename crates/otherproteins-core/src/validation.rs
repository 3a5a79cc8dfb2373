//! # Validation Module
//!
//! Input validation for catalog edits, accounts and checkout details.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP extractors (serde)                                       │
//! │  └── Type validation (deserialization)                                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                   │
//! │  └── Business rule validation (lengths, formats, ranges)                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                             │
//! │  ├── CHECK (stock >= 0), CHECK (quantity > 0)                           │
//! │  ├── UNIQUE (users.email), UNIQUE (categories.name)                     │
//! │  └── Foreign key constraints                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::types::{Address, NewProduct};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Minimum password length for new accounts.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Highest accepted unit price: 1.000.000,00 €.
pub const MAX_PRICE_CENTS: i64 = 100_000_000;

/// Highest stock level a product may hold.
pub const MAX_STOCK: i64 = 1_000_000_000;

/// Largest single admin stock adjustment, in either direction.
pub const MAX_STOCK_DELTA: i64 = 1_000_000;

fn required(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

// =============================================================================
// Catalog Validators
// =============================================================================

/// Validates a product name.
///
/// ## Example
/// ```rust
/// use otherproteins_core::validation::validate_product_name;
///
/// assert!(validate_product_name("Creatina Monohidratada").is_ok());
/// assert!(validate_product_name("   ").is_err());
/// ```
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    required("name", name, 200)
}

pub fn validate_category_name(name: &str) -> ValidationResult<()> {
    required("category", name, 100)
}

/// Validates a search query.
///
/// ## Returns
/// The trimmed query, or `None` when it is blank (no filtering).
pub fn validate_search_query(query: &str) -> ValidationResult<Option<String>> {
    let query = query.trim();

    if query.chars().count() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    Ok((!query.is_empty()).then(|| query.to_string()))
}

/// Validates a price in cents. Zero is allowed.
///
/// With prices capped at [`MAX_PRICE_CENTS`] and carts capped at 100 lines
/// of 999 units, no cart or order total can leave `i64`.
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if !(0..=MAX_PRICE_CENTS).contains(&cents) {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: MAX_PRICE_CENTS,
        });
    }

    Ok(())
}

pub fn validate_stock(stock: i64) -> ValidationResult<()> {
    if !(0..=MAX_STOCK).contains(&stock) {
        return Err(ValidationError::OutOfRange {
            field: "stock".to_string(),
            min: 0,
            max: MAX_STOCK,
        });
    }

    Ok(())
}

/// Validates an admin stock adjustment. Zero is a no-op and allowed.
pub fn validate_stock_delta(delta: i64) -> ValidationResult<()> {
    if !(-MAX_STOCK_DELTA..=MAX_STOCK_DELTA).contains(&delta) {
        return Err(ValidationError::OutOfRange {
            field: "delta".to_string(),
            min: -MAX_STOCK_DELTA,
            max: MAX_STOCK_DELTA,
        });
    }

    Ok(())
}

/// Validates every field of a new product.
pub fn validate_new_product(product: &NewProduct) -> ValidationResult<()> {
    validate_product_name(&product.name)?;
    validate_price_cents(product.price_cents)?;
    validate_stock(product.stock)?;
    Ok(())
}

// =============================================================================
// Quantity Validators
// =============================================================================

/// Validates a requested quantity is positive.
///
/// The upper bound (999 per line) is a cart rule and is reported as
/// `CoreError::QuantityTooLarge` by [`crate::cart`].
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Account Validators
// =============================================================================

/// Validates an email address (shape only, no deliverability check).
///
/// ## Example
/// ```rust
/// use otherproteins_core::validation::validate_email;
///
/// assert!(validate_email("ane@example.eus").is_ok());
/// assert!(validate_email("ane.example.eus").is_err());
/// ```
pub fn validate_email(email: &str) -> ValidationResult<()> {
    required("email", email, 254)?;

    let email = email.trim();
    let invalid = || ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: "must look like name@domain".to_string(),
    };

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty()
        || domain.is_empty()
        || domain.contains('@')
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
        || email.chars().any(char::is_whitespace)
    {
        return Err(invalid());
    }

    Ok(())
}

pub fn validate_password(password: &str) -> ValidationResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min: MIN_PASSWORD_LEN,
        });
    }

    if password.len() > 128 {
        return Err(ValidationError::TooLong {
            field: "password".to_string(),
            max: 128,
        });
    }

    Ok(())
}

pub fn validate_person_name(field: &str, name: &str) -> ValidationResult<()> {
    required(field, name, 100)
}

pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();
    let allowed = phone
        .chars()
        .all(|c| c.is_ascii_digit() || c == '+' || c == ' ' || c == '-');

    if !allowed || !(6..=15).contains(&digits) {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must contain 6 to 15 digits".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Delivery Validators
// =============================================================================

/// Validates a home-delivery address: every field present, five-digit
/// postal code.
pub fn validate_address(address: &Address) -> ValidationResult<()> {
    required("street", &address.street, 200)?;
    required("number", &address.number, 20)?;
    required("city", &address.city, 100)?;
    required("province", &address.province, 100)?;
    required("postal_code", &address.postal_code, 10)?;

    let code = address.postal_code.trim();
    if code.len() != 5 || !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "postal_code".to_string(),
            reason: "must be 5 digits".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
