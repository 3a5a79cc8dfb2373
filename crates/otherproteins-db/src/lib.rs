//! # otherproteins-db: Database Layer for OtherProteins
//!
//! SQLite persistence for the store: catalog, carts, orders and accounts.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      OtherProteins Data Flow                            │
//! │                                                                         │
//! │  HTTP handler (POST /api/orders)                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                 otherproteins-db (THIS CRATE)                   │    │
//! │  │                                                                 │    │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐    │    │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │    │    │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │    │    │
//! │  │   │               │    │ CatalogRepo   │    │              │    │    │
//! │  │   │ SqlitePool    │◄───│ CartRepo      │    │ 0001_initial │    │    │
//! │  │   │ RetryPolicy   │    │ OrderRepo     │    │              │    │    │
//! │  │   │               │    │ UserRepo      │    │              │    │    │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘    │    │
//! │  │                                                                 │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                     SQLite Database (WAL)                       │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Catalog, cart, order and user repositories
//! - [`retry`] - Busy/locked transaction retry
//! - [`credentials`] - Argon2 password hashing
//!
//! ## Usage
//!
//! ```rust,ignore
//! use otherproteins_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./otherproteins.db")).await?;
//!
//! db.carts().add_item(&actor, product_id, 2).await?;
//! let order = db.orders().checkout(&actor, &request, &policy, Utc::now()).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod credentials;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod retry;

#[cfg(test)]
mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use retry::RetryPolicy;

// Repository re-exports for convenience
pub use repository::{CartRepository, CatalogRepository, OrderRepository, UserRepository};
