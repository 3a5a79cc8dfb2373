//! # OtherProteins Storefront API
//!
//! JSON HTTP server for customers and the store admin.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Storefront API Layers                             │
//! │                                                                         │
//! │  HTTP request                                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  TraceLayer (request span)                                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Router ──► AuthUser extractor ── Bearer JWT ──► Actor{user_id, role}   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Handler ──► otherproteins-db repository (actor passed explicitly)      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Json<T> | ApiError ──► {"code": "...", "message": "..."}               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! See [`config::ApiConfig`]. Main variables:
//! - `OTHERPROTEINS_DATABASE_PATH` (fallback `SQLITE_PATH`)
//! - `OTHERPROTEINS_HTTP_PORT` (default 8080)
//! - `OTHERPROTEINS_JWT_SECRET`
//! - `OTHERPROTEINS_CANCELLATION_WINDOW_HOURS` (default 24)
//! - `OTHERPROTEINS_FREE_SHIPPING_THRESHOLD_CENTS` (default 5000)
//! - `OTHERPROTEINS_SHIPPING_FEE_CENTS` (default 499)

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;

use axum::Router;
use tower_http::trace::TraceLayer;

// Re-exports
pub use config::ApiConfig;
pub use error::ApiError;
pub use state::AppState;

/// The complete application router.
pub fn app(state: AppState) -> Router {
    routes::routes()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
