//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                        - Liveness
//! GET    /health/ready                  - Database check
//!
//! # Auth
//! POST   /api/auth/register             - Create customer account
//! POST   /api/auth/login                - Returns bearer token
//! GET    /api/auth/me                   - Current profile
//!
//! # Catalog (public)
//! GET    /api/categories                - Category list
//! GET    /api/products                  - Product list (?category=&q=&in_stock=&limit=)
//! GET    /api/products/{id}             - Product detail
//!
//! # Cart (requires auth)
//! GET    /api/cart                      - Cart with totals (?delivery=denda|etxera)
//! DELETE /api/cart                      - Empty the cart
//! POST   /api/cart/items                - Add {product_id, quantity}
//! PUT    /api/cart/items/{product_id}   - Set {quantity}; 0 removes
//! DELETE /api/cart/items/{product_id}   - Remove line
//!
//! # Orders (requires auth)
//! POST   /api/orders                    - Checkout
//! GET    /api/orders                    - My orders
//! GET    /api/orders/{id}               - Order detail
//! POST   /api/orders/{id}/cancel        - Cancel
//! GET    /api/orders/{id}/invoice.pdf   - PDF invoice
//!
//! # Admin (requires admin role)
//! GET    /api/admin/orders              - All orders (?status=)
//! POST   /api/admin/orders/{id}/status  - Advance {status}
//! POST   /api/admin/products            - Create product
//! PATCH  /api/admin/products/{id}       - Rename / reprice
//! POST   /api/admin/products/{id}/stock - Adjust {delta}
//! POST   /api/admin/categories          - Create category
//! ```

pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod orders;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, patch, post, put},
    Router,
};

use crate::state::AppState;

/// Every route, health checks included.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api", api_routes())
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes())
        .merge(catalog_routes())
        .nest("/cart", cart_routes())
        .nest("/orders", order_routes())
        .nest("/admin", admin_routes())
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/me", get(auth::me))
}

/// Create the catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(catalog::categories))
        .route("/products", get(catalog::index))
        .route("/products/{id}", get(catalog::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).delete(cart::clear))
        .route("/items", post(cart::add))
        .route("/items/{product_id}", put(cart::set_quantity).delete(cart::remove))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(orders::checkout).get(orders::index))
        .route("/{id}", get(orders::show))
        .route("/{id}/cancel", post(orders::cancel))
        .route("/{id}/invoice.pdf", get(orders::invoice))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(admin::orders))
        .route("/orders/{id}/status", post(admin::advance_status))
        .route("/products", post(admin::create_product))
        .route("/products/{id}", patch(admin::update_product))
        .route("/products/{id}/stock", post(admin::adjust_stock))
        .route("/categories", post(admin::create_category))
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    if state.db().health_check().await {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
