//! # Cart Repository
//!
//! One persisted cart per user, keyed by `(user_id, product_id)`.
//!
//! Quantity decisions come from `otherproteins_core::cart`; this module
//! reads the current slot and writes the outcome in the same transaction,
//! so a concurrent add from a second tab cannot push a line past its
//! limits.
//!
//! The stock check on add is soft. Stock is re-read and decremented
//! atomically at checkout.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use otherproteins_core::cart::{quantity_after_add, quantity_after_set, CartSlot};
use otherproteins_core::{Actor, CartEntry, CartLine, CartView, CoreError, DeliveryMethod, StorePolicy};

use crate::error::{DbError, DbResult};
use crate::repository::catalog::fetch_product;
use crate::retry::{with_busy_retry, RetryPolicy};

/// Repository for cart operations.
#[derive(Debug, Clone)]
pub struct CartRepository {
    pool: SqlitePool,
    retry: RetryPolicy,
}

impl CartRepository {
    pub fn new(pool: SqlitePool, retry: RetryPolicy) -> Self {
        CartRepository { pool, retry }
    }

    /// Adds `qty` units of a product to the actor's cart.
    ///
    /// ## Errors
    /// - `NotFound` for an unknown product
    /// - `Validation` for `qty <= 0`
    /// - `QuantityTooLarge`, `CartTooLarge`, `OutOfStock`
    pub async fn add_item(&self, actor: &Actor, product_id: i64, qty: i64) -> DbResult<CartEntry> {
        debug!(user_id = actor.user_id, product_id, qty, "Adding to cart");

        let entry = with_busy_retry(self.retry, "cart_add", || {
            self.add_item_once(actor.user_id, product_id, qty)
        })
        .await?;

        info!(
            user_id = actor.user_id,
            product_id,
            quantity = entry.quantity,
            "Cart line updated"
        );
        Ok(entry)
    }

    async fn add_item_once(&self, user_id: i64, product_id: i64, qty: i64) -> DbResult<CartEntry> {
        let mut tx = self.pool.begin().await?;

        let product = fetch_product(&mut tx, product_id)
            .await?
            .ok_or_else(|| DbError::from(CoreError::product_not_found(product_id)))?;
        let slot = read_slot(&mut tx, user_id, product_id).await?;
        let target = quantity_after_add(&product, slot, qty)?;

        let entry = upsert_entry(&mut tx, user_id, product_id, target).await?;
        tx.commit().await?;
        Ok(entry)
    }

    /// Sets the quantity of a cart line. Zero removes it.
    ///
    /// Returns the stored entry, or `None` when the line was removed.
    pub async fn set_quantity(
        &self,
        actor: &Actor,
        product_id: i64,
        qty: i64,
    ) -> DbResult<Option<CartEntry>> {
        debug!(user_id = actor.user_id, product_id, qty, "Setting cart quantity");

        with_busy_retry(self.retry, "cart_set", || {
            self.set_quantity_once(actor.user_id, product_id, qty)
        })
        .await
    }

    async fn set_quantity_once(
        &self,
        user_id: i64,
        product_id: i64,
        qty: i64,
    ) -> DbResult<Option<CartEntry>> {
        let mut tx = self.pool.begin().await?;

        let product = fetch_product(&mut tx, product_id)
            .await?
            .ok_or_else(|| DbError::from(CoreError::product_not_found(product_id)))?;
        let slot = read_slot(&mut tx, user_id, product_id).await?;

        let entry = match quantity_after_set(&product, slot, qty)? {
            Some(target) => Some(upsert_entry(&mut tx, user_id, product_id, target).await?),
            None => {
                delete_entry(&mut tx, user_id, product_id).await?;
                None
            }
        };

        tx.commit().await?;
        Ok(entry)
    }

    /// Removes a product from the cart. Removing an absent line is a no-op.
    pub async fn remove_item(&self, actor: &Actor, product_id: i64) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        let removed = delete_entry(&mut conn, actor.user_id, product_id).await?;

        debug!(user_id = actor.user_id, product_id, removed, "Removed from cart");
        Ok(())
    }

    /// Empties the actor's cart.
    pub async fn clear(&self, actor: &Actor) -> DbResult<u64> {
        let mut conn = self.pool.acquire().await?;
        let removed = clear_cart(&mut conn, actor.user_id).await?;

        info!(user_id = actor.user_id, removed, "Cart cleared");
        Ok(removed)
    }

    /// Current cart joined with live prices and stock, in insertion order,
    /// with the shipping quote for `delivery`.
    pub async fn get_cart(
        &self,
        actor: &Actor,
        policy: &StorePolicy,
        delivery: DeliveryMethod,
    ) -> DbResult<CartView> {
        let lines = sqlx::query_as::<_, CartLine>(
            r#"
            SELECT c.product_id, p.name, p.price_cents AS unit_price_cents, c.quantity, p.stock
            FROM cart_entries c
            JOIN products p ON p.id = c.product_id
            WHERE c.user_id = ?1
            ORDER BY c.added_at, c.product_id
            "#,
        )
        .bind(actor.user_id)
        .fetch_all(&self.pool)
        .await?;

        debug!(user_id = actor.user_id, lines = lines.len(), "Loaded cart");
        Ok(CartView::build(lines, policy, delivery))
    }
}

// =============================================================================
// Transaction Primitives
// =============================================================================

async fn read_slot(conn: &mut SqliteConnection, user_id: i64, product_id: i64) -> DbResult<CartSlot> {
    let (existing, distinct): (i64, i64) = sqlx::query_as(
        r#"
        SELECT
            COALESCE(SUM(CASE WHEN product_id = ?2 THEN quantity END), 0),
            COUNT(*)
        FROM cart_entries
        WHERE user_id = ?1
        "#,
    )
    .bind(user_id)
    .bind(product_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(CartSlot {
        existing,
        distinct_items: usize::try_from(distinct).unwrap_or(usize::MAX),
    })
}

/// Inserts or replaces a line's quantity. `added_at` survives updates so
/// the line keeps its place in the cart.
async fn upsert_entry(
    conn: &mut SqliteConnection,
    user_id: i64,
    product_id: i64,
    quantity: i64,
) -> DbResult<CartEntry> {
    let entry = sqlx::query_as::<_, CartEntry>(
        r#"
        INSERT INTO cart_entries (user_id, product_id, quantity, added_at)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT (user_id, product_id) DO UPDATE SET quantity = excluded.quantity
        RETURNING user_id, product_id, quantity, added_at
        "#,
    )
    .bind(user_id)
    .bind(product_id)
    .bind(quantity)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await?;

    Ok(entry)
}

async fn delete_entry(conn: &mut SqliteConnection, user_id: i64, product_id: i64) -> DbResult<bool> {
    let result = sqlx::query("DELETE FROM cart_entries WHERE user_id = ?1 AND product_id = ?2")
        .bind(user_id)
        .bind(product_id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub(crate) async fn clear_cart(conn: &mut SqliteConnection, user_id: i64) -> DbResult<u64> {
    let result = sqlx::query("DELETE FROM cart_entries WHERE user_id = ?1")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{admin, customer, seed_product, test_db};
    use otherproteins_core::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

    #[tokio::test]
    async fn test_add_accumulates() {
        let db = test_db().await;
        let ane = customer(&db, "ane@example.eus").await;
        let whey = seed_product(&db, "Whey Protein Isolate", 5500, 15).await;

        db.carts().add_item(&ane, whey.id, 2).await.unwrap();
        let entry = db.carts().add_item(&ane, whey.id, 3).await.unwrap();
        assert_eq!(entry.quantity, 5);

        let cart = db
            .carts()
            .get_cart(&ane, &StorePolicy::default(), DeliveryMethod::Etxera)
            .await
            .unwrap();
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.total_quantity, 5);
        assert_eq!(cart.subtotal_cents, 27_500);
        assert_eq!(cart.shipping.shipping_cents, 0);
    }

    #[tokio::test]
    async fn test_carts_are_isolated() {
        let db = test_db().await;
        let ane = customer(&db, "ane@example.eus").await;
        let jon = customer(&db, "jon@example.eus").await;
        let bar = seed_product(&db, "Barritas Energéticas", 2500, 30).await;

        db.carts().add_item(&ane, bar.id, 1).await.unwrap();

        let jon_cart = db
            .carts()
            .get_cart(&jon, &StorePolicy::default(), DeliveryMethod::Denda)
            .await
            .unwrap();
        assert!(jon_cart.is_empty());
    }

    #[tokio::test]
    async fn test_add_beyond_stock_is_rejected() {
        let db = test_db().await;
        let ane = customer(&db, "ane@example.eus").await;
        let casein = seed_product(&db, "Caseina Nocturna", 4550, 2).await;

        db.carts().add_item(&ane, casein.id, 2).await.unwrap();
        let err = db.carts().add_item(&ane, casein.id, 1).await.unwrap_err();
        assert!(matches!(
            err.as_rejection(),
            Some(CoreError::OutOfStock { available: 2, requested: 3, .. })
        ));
    }

    #[tokio::test]
    async fn test_unknown_product_and_bad_quantity() {
        let db = test_db().await;
        let ane = customer(&db, "ane@example.eus").await;
        let whey = seed_product(&db, "Whey Protein Isolate", 5500, 15).await;

        let err = db.carts().add_item(&ane, 999, 1).await.unwrap_err();
        assert!(matches!(err.as_rejection(), Some(CoreError::NotFound { .. })));

        let err = db.carts().add_item(&ane, whey.id, 0).await.unwrap_err();
        assert!(matches!(err.as_rejection(), Some(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_set_quantity_and_remove() {
        let db = test_db().await;
        let ane = customer(&db, "ane@example.eus").await;
        let whey = seed_product(&db, "Whey Protein Isolate", 5500, 15).await;
        let bar = seed_product(&db, "Barritas Energéticas", 2500, 30).await;

        db.carts().add_item(&ane, whey.id, 1).await.unwrap();
        db.carts().add_item(&ane, bar.id, 1).await.unwrap();

        let entry = db.carts().set_quantity(&ane, whey.id, 4).await.unwrap();
        assert_eq!(entry.map(|e| e.quantity), Some(4));

        assert!(db.carts().set_quantity(&ane, bar.id, 0).await.unwrap().is_none());
        db.carts().remove_item(&ane, bar.id).await.unwrap();

        let cart = db
            .carts()
            .get_cart(&ane, &StorePolicy::default(), DeliveryMethod::Denda)
            .await
            .unwrap();
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.lines[0].line.product_id, whey.id);
        assert_eq!(cart.lines[0].line_total_cents, 22_000);
    }

    #[tokio::test]
    async fn test_quantity_limit() {
        let db = test_db().await;
        let admin = admin(&db).await;
        let whey = seed_product(&db, "Whey Protein Isolate", 5500, 5000).await;

        let err = db
            .carts()
            .set_quantity(&admin, whey.id, MAX_ITEM_QUANTITY + 1)
            .await
            .unwrap_err();
        assert!(matches!(err.as_rejection(), Some(CoreError::QuantityTooLarge { .. })));
    }

    #[tokio::test]
    async fn test_huge_add_on_existing_line() {
        let db = test_db().await;
        let ane = customer(&db, "ane@example.eus").await;
        let whey = seed_product(&db, "Whey Protein Isolate", 5500, 15).await;

        db.carts().add_item(&ane, whey.id, 1).await.unwrap();
        let err = db.carts().add_item(&ane, whey.id, i64::MAX).await.unwrap_err();
        assert!(matches!(err.as_rejection(), Some(CoreError::QuantityTooLarge { .. })));

        let view = db
            .carts()
            .get_cart(&ane, &StorePolicy::default(), DeliveryMethod::Denda)
            .await
            .unwrap();
        assert_eq!(view.total_quantity, 1);
    }

    #[tokio::test]
    async fn test_distinct_item_limit() {
        let db = test_db().await;
        let ane = customer(&db, "ane@example.eus").await;

        for i in 0..MAX_CART_ITEMS {
            let p = seed_product(&db, &format!("Produktua {i:03}"), 100, 10).await;
            db.carts().add_item(&ane, p.id, 1).await.unwrap();
        }
        let extra = seed_product(&db, "Azkena", 100, 10).await;

        let err = db.carts().add_item(&ane, extra.id, 1).await.unwrap_err();
        assert!(matches!(err.as_rejection(), Some(CoreError::CartTooLarge { .. })));
    }

    #[tokio::test]
    async fn test_soft_check_flags_lines_over_stock() {
        let db = test_db().await;
        let admin = admin(&db).await;
        let ane = customer(&db, "ane@example.eus").await;
        let creatine = seed_product(&db, "Creatina Monohidratada", 2299, 5).await;

        db.carts().add_item(&ane, creatine.id, 4).await.unwrap();
        db.catalog().adjust_stock(&admin, creatine.id, -3).await.unwrap();

        let cart = db
            .carts()
            .get_cart(&ane, &StorePolicy::default(), DeliveryMethod::Denda)
            .await
            .unwrap();
        assert!(cart.lines[0].exceeds_stock);
    }

    #[tokio::test]
    async fn test_clear() {
        let db = test_db().await;
        let ane = customer(&db, "ane@example.eus").await;
        let whey = seed_product(&db, "Whey Protein Isolate", 5500, 15).await;
        let bar = seed_product(&db, "Barritas Energéticas", 2500, 30).await;

        db.carts().add_item(&ane, whey.id, 1).await.unwrap();
        db.carts().add_item(&ane, bar.id, 2).await.unwrap();

        assert_eq!(db.carts().clear(&ane).await.unwrap(), 2);
        assert_eq!(db.carts().clear(&ane).await.unwrap(), 0);
    }
}
