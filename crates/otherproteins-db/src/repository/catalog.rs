//! # Catalog Repository
//!
//! Products, categories and the single stock mutation primitive.
//!
//! ## Stock Mutation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Every stock change goes through adjust_stock_in()                      │
//! │                                                                         │
//! │  admin adjust_stock ─┐                                                  │
//! │  checkout (−qty) ────┼──► UPDATE products                               │
//! │  cancel (+qty) ──────┘      SET stock = stock + :delta                  │
//! │                             WHERE id = :id AND stock + :delta >= 0      │
//! │                             RETURNING stock                             │
//! │                                                                         │
//! │  No row back: product missing → NotFound                                │
//! │               product present → InsufficientStock                       │
//! │                                                                         │
//! │  The condition and the write are one statement, so two concurrent       │
//! │  decrements can never both pass on the same units.                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use otherproteins_core::validation::{
    validate_category_name, validate_new_product, validate_price_cents, validate_product_name,
    validate_search_query, validate_stock_delta,
};
use otherproteins_core::{
    require_admin, Actor, Category, CoreError, NewProduct, Product, ProductFilter, ValidationError,
};

use crate::error::{DbError, DbResult};
use crate::retry::{with_busy_retry, RetryPolicy};

/// Default and maximum page size for `list_products`.
const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 500;

macro_rules! product_select {
    () => {
        "SELECT id, name, description, price_cents, stock, category_id, image_url, \
         ingredients, nutrition, usage, created_at, updated_at FROM products"
    };
}

/// Repository for catalog operations.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
    retry: RetryPolicy,
}

impl CatalogRepository {
    pub fn new(pool: SqlitePool, retry: RetryPolicy) -> Self {
        CatalogRepository { pool, retry }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Lists products ordered by name.
    ///
    /// ## Filters
    /// - `category_id`: exact category
    /// - `query`: case-insensitive substring of name or description
    /// - `in_stock_only`: hide products with zero stock
    /// - `limit`: defaults to 100, capped at 500
    pub async fn list_products(&self, filter: &ProductFilter) -> DbResult<Vec<Product>> {
        let pattern = match filter.query.as_deref() {
            Some(q) => validate_search_query(q)?.map(|q| format!("%{}%", escape_like(&q))),
            None => None,
        };
        let limit = filter.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

        debug!(
            category_id = ?filter.category_id,
            query = ?pattern,
            in_stock_only = filter.in_stock_only,
            limit,
            "Listing products"
        );

        let products = sqlx::query_as::<_, Product>(concat!(
            product_select!(),
            r#"
            WHERE (?1 IS NULL OR category_id = ?1)
              AND (?2 IS NULL OR name LIKE ?2 ESCAPE '\' OR description LIKE ?2 ESCAPE '\')
              AND (?3 = 0 OR stock > 0)
            ORDER BY name COLLATE NOCASE, id
            LIMIT ?4
            "#
        ))
        .bind(filter.category_id)
        .bind(pattern)
        .bind(filter.in_stock_only)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        debug!(count = products.len(), "Listed products");
        Ok(products)
    }

    /// Gets a product by ID.
    pub async fn get_product(&self, id: i64) -> DbResult<Product> {
        debug!(id, "Getting product");

        let mut conn = self.pool.acquire().await?;
        fetch_product(&mut conn, id)
            .await?
            .ok_or_else(|| CoreError::product_not_found(id).into())
    }

    pub async fn list_categories(&self) -> DbResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, name, description FROM categories ORDER BY name COLLATE NOCASE",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    pub async fn get_category(&self, id: i64) -> DbResult<Category> {
        sqlx::query_as::<_, Category>("SELECT id, name, description FROM categories WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| category_not_found(id).into())
    }

    pub async fn find_category_by_name(&self, name: &str) -> DbResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT id, name, description FROM categories WHERE name = ?1",
        )
        .bind(name.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(category)
    }

    // =========================================================================
    // Admin Edits
    // =========================================================================

    /// Adds `delta` units to a product's stock (negative to remove).
    ///
    /// ## Errors
    /// - `Forbidden` for non-admins
    /// - `NotFound` for an unknown product
    /// - `InsufficientStock` if stock would go below zero
    /// - `Validation` if `|delta|` exceeds `MAX_STOCK_DELTA`
    pub async fn adjust_stock(&self, actor: &Actor, id: i64, delta: i64) -> DbResult<Product> {
        require_admin(actor, "adjust_stock")?;
        validate_stock_delta(delta)?;

        let product =
            with_busy_retry(self.retry, "adjust_stock", || self.adjust_stock_once(id, delta)).await?;

        info!(
            product_id = id,
            delta,
            stock = product.stock,
            admin_id = actor.user_id,
            "Stock adjusted"
        );
        Ok(product)
    }

    async fn adjust_stock_once(&self, id: i64, delta: i64) -> DbResult<Product> {
        let mut tx = self.pool.begin().await?;

        adjust_stock_in(&mut tx, id, delta, Utc::now()).await?;
        let product = fetch_product(&mut tx, id)
            .await?
            .ok_or_else(|| DbError::from(CoreError::product_not_found(id)))?;

        tx.commit().await?;
        Ok(product)
    }

    pub async fn create_category(
        &self,
        actor: &Actor,
        name: &str,
        description: Option<&str>,
    ) -> DbResult<Category> {
        require_admin(actor, "create_category")?;
        validate_category_name(name)?;
        let name = name.trim();

        debug!(name, "Creating category");

        let category = sqlx::query_as::<_, Category>(
            "INSERT INTO categories (name, description) VALUES (?1, ?2) \
             RETURNING id, name, description",
        )
        .bind(name)
        .bind(description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DbError::from(e).on_duplicate("category", name))?;

        info!(category_id = category.id, name, "Category created");
        Ok(category)
    }

    pub async fn create_product(&self, actor: &Actor, product: &NewProduct) -> DbResult<Product> {
        require_admin(actor, "create_product")?;
        validate_new_product(product)?;

        if let Some(category_id) = product.category_id {
            self.get_category(category_id).await?;
        }

        let now = Utc::now();
        debug!(name = %product.name, "Creating product");

        let created = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (
                name, description, price_cents, stock, category_id,
                image_url, ingredients, nutrition, usage, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
            RETURNING id, name, description, price_cents, stock, category_id, image_url,
                      ingredients, nutrition, usage, created_at, updated_at
            "#,
        )
        .bind(product.name.trim())
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(product.stock)
        .bind(product.category_id)
        .bind(&product.image_url)
        .bind(&product.ingredients)
        .bind(&product.nutrition)
        .bind(&product.usage)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        info!(product_id = created.id, name = %created.name, "Product created");
        Ok(created)
    }

    /// Renames a product. Existing order lines keep their snapshot name.
    pub async fn rename_product(&self, actor: &Actor, id: i64, name: &str) -> DbResult<Product> {
        self.update_product(actor, id, Some(name), None).await
    }

    /// Reprices a product. Existing order lines keep their frozen price.
    pub async fn set_price(&self, actor: &Actor, id: i64, price_cents: i64) -> DbResult<Product> {
        self.update_product(actor, id, None, Some(price_cents)).await
    }

    /// Renames and/or reprices a product in a single statement.
    ///
    /// Every given field is validated before anything is written, so a
    /// rejected edit leaves the product untouched.
    pub async fn update_product(
        &self,
        actor: &Actor,
        id: i64,
        name: Option<&str>,
        price_cents: Option<i64>,
    ) -> DbResult<Product> {
        require_admin(actor, "update_product")?;

        if name.is_none() && price_cents.is_none() {
            return Err(ValidationError::Required {
                field: "name".to_string(),
            }
            .into());
        }
        if let Some(name) = name {
            validate_product_name(name)?;
        }
        if let Some(price_cents) = price_cents {
            validate_price_cents(price_cents)?;
        }

        let product = sqlx::query_as::<_, Product>(concat!(
            "UPDATE products SET name = COALESCE(?2, name), ",
            "price_cents = COALESCE(?3, price_cents), updated_at = ?4 WHERE id = ?1 ",
            "RETURNING id, name, description, price_cents, stock, category_id, image_url, ",
            "ingredients, nutrition, usage, created_at, updated_at"
        ))
        .bind(id)
        .bind(name.map(str::trim))
        .bind(price_cents)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::from(CoreError::product_not_found(id)))?;

        info!(
            product_id = id,
            name = %product.name,
            price_cents = product.price_cents,
            admin_id = actor.user_id,
            "Product updated"
        );
        Ok(product)
    }
}

// =============================================================================
// Transaction Primitives
// =============================================================================

/// Applies `delta` to a product's stock inside the caller's transaction.
///
/// Returns the new stock level.
pub(crate) async fn adjust_stock_in(
    conn: &mut SqliteConnection,
    product_id: i64,
    delta: i64,
    now: DateTime<Utc>,
) -> DbResult<i64> {
    debug!(product_id, delta, "Adjusting stock");

    let updated: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE products
        SET stock = stock + ?2, updated_at = ?3
        WHERE id = ?1 AND stock + ?2 >= 0
        RETURNING stock
        "#,
    )
    .bind(product_id)
    .bind(delta)
    .bind(now)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(stock) = updated {
        return Ok(stock);
    }

    let current: Option<i64> = sqlx::query_scalar("SELECT stock FROM products WHERE id = ?1")
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await?;

    Err(match current {
        None => CoreError::product_not_found(product_id),
        Some(available) => CoreError::InsufficientStock {
            product_id,
            available,
            requested: delta.saturating_neg(),
        },
    }
    .into())
}

pub(crate) async fn fetch_product(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(concat!(product_select!(), " WHERE id = ?1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(product)
}

fn category_not_found(id: i64) -> CoreError {
    CoreError::NotFound {
        entity: "Kategoria",
        id,
    }
}

/// Escapes LIKE wildcards so user input matches literally.
fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{admin, customer, seed_product, test_db};
    use otherproteins_core::validation::MAX_STOCK_DELTA;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("100%_whey\\"), "100\\%\\_whey\\\\");
    }

    #[tokio::test]
    async fn test_adjust_stock_up_and_down() {
        let db = test_db().await;
        let admin = admin(&db).await;
        let whey = seed_product(&db, "Whey Protein Isolate", 5500, 15).await;

        let after = db.catalog().adjust_stock(&admin, whey.id, 5).await.unwrap();
        assert_eq!(after.stock, 20);

        let after = db.catalog().adjust_stock(&admin, whey.id, -20).await.unwrap();
        assert_eq!(after.stock, 0);
    }

    #[tokio::test]
    async fn test_adjust_stock_never_goes_negative() {
        let db = test_db().await;
        let admin = admin(&db).await;
        let casein = seed_product(&db, "Caseina Nocturna", 4550, 10).await;

        let err = db.catalog().adjust_stock(&admin, casein.id, -11).await.unwrap_err();
        assert_eq!(
            err.as_rejection(),
            Some(&CoreError::InsufficientStock {
                product_id: casein.id,
                available: 10,
                requested: 11
            })
        );
        assert_eq!(db.catalog().get_product(casein.id).await.unwrap().stock, 10);
    }

    #[tokio::test]
    async fn test_adjust_stock_unknown_product() {
        let db = test_db().await;
        let admin = admin(&db).await;

        let err = db.catalog().adjust_stock(&admin, 999, 1).await.unwrap_err();
        assert!(matches!(err.as_rejection(), Some(CoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_admin_operations_are_gated() {
        let db = test_db().await;
        let ane = customer(&db, "ane@example.eus").await;
        let bar = seed_product(&db, "Barritas Energéticas", 2500, 30).await;

        let catalog = db.catalog();
        for err in [
            catalog.adjust_stock(&ane, bar.id, 1).await.unwrap_err(),
            catalog.rename_product(&ane, bar.id, "Barrita").await.unwrap_err(),
            catalog.set_price(&ane, bar.id, 1).await.unwrap_err(),
            catalog.create_category(&ane, "Bitaminak", None).await.unwrap_err(),
        ] {
            assert!(matches!(err.as_rejection(), Some(CoreError::Forbidden { .. })));
        }

        let unchanged = catalog.get_product(bar.id).await.unwrap();
        assert_eq!(unchanged.stock, 30);
        assert_eq!(unchanged.price_cents, 2500);
    }

    #[tokio::test]
    async fn test_list_products_filters() {
        let db = test_db().await;
        let admin = admin(&db).await;
        let protein = db
            .catalog()
            .create_category(&admin, "Proteina", Some("Proteina hautsak"))
            .await
            .unwrap();

        let mut whey = NewProduct {
            name: "Whey Protein Isolate".to_string(),
            description: "Proteina isolatua".to_string(),
            price_cents: 5500,
            stock: 15,
            category_id: Some(protein.id),
            ..NewProduct::default()
        };
        db.catalog().create_product(&admin, &whey).await.unwrap();
        whey.name = "Caseina Nocturna".to_string();
        whey.stock = 0;
        db.catalog().create_product(&admin, &whey).await.unwrap();
        seed_product(&db, "Creatina Monohidratada", 2299, 25).await;

        let all = db.catalog().list_products(&ProductFilter::default()).await.unwrap();
        let names: Vec<&str> = all.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(
            names,
            ["Caseina Nocturna", "Creatina Monohidratada", "Whey Protein Isolate"]
        );

        let in_category = db
            .catalog()
            .list_products(&ProductFilter {
                category_id: Some(protein.id),
                in_stock_only: true,
                ..ProductFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(in_category.len(), 1);
        assert_eq!(in_category[0].name, "Whey Protein Isolate");

        let searched = db
            .catalog()
            .list_products(&ProductFilter {
                query: Some("CREATINA".to_string()),
                ..ProductFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(searched.len(), 1);

        let by_description = db
            .catalog()
            .list_products(&ProductFilter {
                query: Some("isolatua".to_string()),
                ..ProductFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(by_description.len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_category() {
        let db = test_db().await;
        let admin = admin(&db).await;

        db.catalog().create_category(&admin, "Kreatina", None).await.unwrap();
        let err = db
            .catalog()
            .create_category(&admin, "Kreatina", None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref field, .. } if field == "category"));
    }

    #[tokio::test]
    async fn test_create_product_in_unknown_category() {
        let db = test_db().await;
        let admin = admin(&db).await;

        let err = db
            .catalog()
            .create_product(
                &admin,
                &NewProduct {
                    name: "Pre-entreno Intenso".to_string(),
                    price_cents: 3875,
                    category_id: Some(42),
                    ..NewProduct::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_rejection(),
            Some(CoreError::NotFound { entity: "Kategoria", id: 42 })
        ));
    }

    #[tokio::test]
    async fn test_rename_and_reprice() {
        let db = test_db().await;
        let admin = admin(&db).await;
        let bar = seed_product(&db, "Barritas", 2500, 30).await;

        let renamed = db
            .catalog()
            .rename_product(&admin, bar.id, "Barritas Energéticas")
            .await
            .unwrap();
        assert_eq!(renamed.name, "Barritas Energéticas");

        let repriced = db.catalog().set_price(&admin, bar.id, 2750).await.unwrap();
        assert_eq!(repriced.price_cents, 2750);

        assert!(db.catalog().set_price(&admin, bar.id, -1).await.is_err());
        assert!(db.catalog().set_price(&admin, 999, 100).await.is_err());
    }

    #[tokio::test]
    async fn test_update_product_is_all_or_nothing() {
        let db = test_db().await;
        let admin = admin(&db).await;
        let whey = seed_product(&db, "Whey Protein Isolate", 5500, 15).await;

        let err = db
            .catalog()
            .update_product(&admin, whey.id, Some("Whey Gold"), Some(-1))
            .await
            .unwrap_err();
        assert!(matches!(err.as_rejection(), Some(CoreError::Validation(_))));

        let err = db
            .catalog()
            .update_product(&admin, whey.id, Some("   "), Some(6000))
            .await
            .unwrap_err();
        assert!(matches!(err.as_rejection(), Some(CoreError::Validation(_))));

        let unchanged = db.catalog().get_product(whey.id).await.unwrap();
        assert_eq!(unchanged.name, "Whey Protein Isolate");
        assert_eq!(unchanged.price_cents, 5500);

        let updated = db
            .catalog()
            .update_product(&admin, whey.id, Some("Whey Gold"), Some(5990))
            .await
            .unwrap();
        assert_eq!(updated.name, "Whey Gold");
        assert_eq!(updated.price_cents, 5990);

        assert!(db.catalog().update_product(&admin, whey.id, None, None).await.is_err());
    }

    #[tokio::test]
    async fn test_price_above_ceiling_is_rejected() {
        let db = test_db().await;
        let admin = admin(&db).await;
        let whey = seed_product(&db, "Whey Protein Isolate", 5500, 15).await;

        let err = db.catalog().set_price(&admin, whey.id, i64::MAX / 2).await.unwrap_err();
        assert!(matches!(err.as_rejection(), Some(CoreError::Validation(_))));

        let err = db
            .catalog()
            .create_product(
                &admin,
                &NewProduct {
                    name: "Proteina Urrea".to_string(),
                    price_cents: i64::MAX / 2,
                    ..NewProduct::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err.as_rejection(), Some(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_extreme_stock_deltas_are_rejected() {
        let db = test_db().await;
        let admin = admin(&db).await;
        let casein = seed_product(&db, "Caseina Nocturna", 4550, 10).await;

        for delta in [i64::MIN, i64::MAX, MAX_STOCK_DELTA + 1, -MAX_STOCK_DELTA - 1] {
            let err = db.catalog().adjust_stock(&admin, casein.id, delta).await.unwrap_err();
            assert!(matches!(err.as_rejection(), Some(CoreError::Validation(_))), "{delta}");
        }
        assert_eq!(db.catalog().get_product(casein.id).await.unwrap().stock, 10);

        let after = db
            .catalog()
            .adjust_stock(&admin, casein.id, MAX_STOCK_DELTA)
            .await
            .unwrap();
        assert_eq!(after.stock, 10 + MAX_STOCK_DELTA);

        let after = db
            .catalog()
            .adjust_stock(&admin, casein.id, -MAX_STOCK_DELTA)
            .await
            .unwrap();
        assert_eq!(after.stock, 10);
    }
}
