//! Application state shared across handlers.

use std::sync::Arc;

use otherproteins_core::invoice::StoreDetails;
use otherproteins_core::StorePolicy;
use otherproteins_db::Database;

use crate::auth::JwtManager;
use crate::config::ApiConfig;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    db: Database,
    jwt: JwtManager,
    policy: StorePolicy,
    store: StoreDetails,
}

impl AppState {
    pub fn new(db: Database, jwt: JwtManager, policy: StorePolicy, store: StoreDetails) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                db,
                jwt,
                policy,
                store,
            }),
        }
    }

    /// State for a configured server around an open database.
    pub fn from_config(config: &ApiConfig, db: Database) -> Self {
        Self::new(
            db,
            JwtManager::new(config.jwt_secret.clone(), config.token_lifetime_secs),
            config.policy(),
            config.store_details(),
        )
    }

    #[must_use]
    pub fn db(&self) -> &Database {
        &self.inner.db
    }

    #[must_use]
    pub fn jwt(&self) -> &JwtManager {
        &self.inner.jwt
    }

    /// Cancellation window and shipping rules.
    #[must_use]
    pub fn policy(&self) -> &StorePolicy {
        &self.inner.policy
    }

    /// Seller block for invoices.
    #[must_use]
    pub fn store(&self) -> &StoreDetails {
        &self.inner.store
    }
}
