//! # Repository Module
//!
//! Database repositories for the OtherProteins store.
//!
//! ## Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  HTTP handler                                                           │
//! │       │                                                                 │
//! │       │  db.orders().checkout(&actor, &request, &policy, now)           │
//! │       ▼                                                                 │
//! │  OrderRepository ──► cart::clear_cart()                                 │
//! │       │         └──► catalog::adjust_stock_in()                         │
//! │       │                                                                 │
//! │       │  one transaction                                                │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every cart and order call takes the acting [`otherproteins_core::Actor`]
//! explicitly; repositories never look up "the current user".
//!
//! ## Available Repositories
//!
//! - [`CatalogRepository`] - Products, categories, stock
//! - [`CartRepository`] - Per-user carts
//! - [`OrderRepository`] - Checkout, cancellation, status workflow
//! - [`UserRepository`] - Accounts and roles

pub mod cart;
pub mod catalog;
pub mod order;
pub mod user;

pub use cart::CartRepository;
pub use catalog::CatalogRepository;
pub use order::OrderRepository;
pub use user::UserRepository;
