//! # Order Repository
//!
//! Checkout, cancellation and the admin status workflow.
//!
//! ## Checkout Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │    SELECT cart ⋈ products            ← quantities, live prices, stock   │
//! │    plan_checkout()                   ← EmptyCart / OutOfStock / ...     │
//! │    for each line:                                                       │
//! │      adjust_stock_in(−qty)           ← conditional UPDATE, never < 0    │
//! │    INSERT orders                     ← frozen totals + shipping         │
//! │    INSERT order_lines                ← frozen names + unit prices       │
//! │    DELETE cart_entries                                                  │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Any error drops the transaction: stock and cart are untouched.         │
//! │  SQLITE_BUSY reruns the whole block (crate::retry).                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Status Workflow
//! ```text
//! prozesatzen ──► pagado ──► bidalita ──► bukatuta
//!      │             │
//!      └──────┬──────┘
//!             ▼
//!       bertan_behera   (owner or admin, within the cancellation window)
//! ```

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::{debug, info};

use otherproteins_core::order::{ensure_advance, plan_checkout, CheckoutCandidate, CheckoutPlan};
use otherproteins_core::{
    require_admin, Actor, Address, CheckoutRequest, CoreError, DeliveryMethod, Order, OrderDetail,
    OrderLine, OrderStatus, StorePolicy,
};

use crate::error::{DbError, DbResult};
use crate::repository::cart::clear_cart;
use crate::repository::catalog::adjust_stock_in;
use crate::retry::{with_busy_retry, RetryPolicy};

macro_rules! order_columns {
    () => {
        "id, user_id, status, delivery_method, street, street_number, city, province, \
         postal_code, items_total_cents, shipping_cents, walk_in_customer, created_at, updated_at"
    };
}

/// Flat `orders` row; the address columns are folded into [`Address`].
#[derive(Debug, FromRow)]
struct OrderRow {
    id: i64,
    user_id: i64,
    status: OrderStatus,
    delivery_method: DeliveryMethod,
    street: Option<String>,
    street_number: Option<String>,
    city: Option<String>,
    province: Option<String>,
    postal_code: Option<String>,
    items_total_cents: i64,
    shipping_cents: i64,
    walk_in_customer: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        let address = match (row.street, row.street_number, row.city, row.province, row.postal_code) {
            (Some(street), Some(number), Some(city), Some(province), Some(postal_code)) => {
                Some(Address {
                    street,
                    number,
                    city,
                    province,
                    postal_code,
                })
            }
            _ => None,
        };

        Order {
            id: row.id,
            user_id: row.user_id,
            status: row.status,
            delivery_method: row.delivery_method,
            address,
            items_total_cents: row.items_total_cents,
            shipping_cents: row.shipping_cents,
            walk_in_customer: row.walk_in_customer,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for order operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
    retry: RetryPolicy,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool, retry: RetryPolicy) -> Self {
        OrderRepository { pool, retry }
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// Turns the actor's cart into an order, all or nothing.
    ///
    /// ## Errors
    /// - `Forbidden` for a walk-in request from a non-admin
    /// - `Validation` for home delivery without a complete address
    /// - `EmptyCart`
    /// - `OutOfStock` naming the first line stock cannot cover
    pub async fn checkout(
        &self,
        actor: &Actor,
        request: &CheckoutRequest,
        policy: &StorePolicy,
        now: DateTime<Utc>,
    ) -> DbResult<OrderDetail> {
        debug!(
            user_id = actor.user_id,
            delivery = request.delivery.as_str(),
            walk_in = request.walk_in,
            "Checking out"
        );

        let detail = with_busy_retry(self.retry, "checkout", || {
            self.checkout_once(actor, request, policy, now)
        })
        .await?;

        info!(
            order_id = detail.order.id,
            user_id = actor.user_id,
            status = %detail.order.status,
            lines = detail.lines.len(),
            total_cents = detail.order.grand_total().cents(),
            "Order placed"
        );
        Ok(detail)
    }

    async fn checkout_once(
        &self,
        actor: &Actor,
        request: &CheckoutRequest,
        policy: &StorePolicy,
        now: DateTime<Utc>,
    ) -> DbResult<OrderDetail> {
        let mut tx = self.pool.begin().await?;

        let candidates = sqlx::query_as::<_, CheckoutCandidate>(
            r#"
            SELECT c.product_id, p.name, p.price_cents, p.stock, c.quantity
            FROM cart_entries c
            JOIN products p ON p.id = c.product_id
            WHERE c.user_id = ?1
            ORDER BY c.added_at, c.product_id
            "#,
        )
        .bind(actor.user_id)
        .fetch_all(&mut *tx)
        .await?;

        let plan = plan_checkout(actor, request, &candidates, policy)?;

        for line in &plan.lines {
            adjust_stock_in(&mut tx, line.product_id, -line.quantity, now)
                .await
                .map_err(|err| match err {
                    DbError::Rejected(CoreError::InsufficientStock {
                        product_id,
                        available,
                        requested,
                    }) => DbError::Rejected(CoreError::OutOfStock {
                        product_id,
                        name: line.name.clone(),
                        available,
                        requested,
                    }),
                    other => other,
                })?;
        }

        let order = insert_order(&mut tx, actor.user_id, &plan, now).await?;

        let mut lines = Vec::with_capacity(plan.lines.len());
        for planned in &plan.lines {
            sqlx::query(
                r#"
                INSERT INTO order_lines (order_id, product_id, product_name, quantity, unit_price_cents)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(order.id)
            .bind(planned.product_id)
            .bind(&planned.name)
            .bind(planned.quantity)
            .bind(planned.unit_price_cents)
            .execute(&mut *tx)
            .await?;

            lines.push(OrderLine {
                order_id: order.id,
                product_id: planned.product_id,
                product_name: planned.name.clone(),
                quantity: planned.quantity,
                unit_price_cents: planned.unit_price_cents,
            });
        }

        clear_cart(&mut tx, actor.user_id).await?;
        tx.commit().await?;

        Ok(OrderDetail { order, lines })
    }

    // =========================================================================
    // Cancellation
    // =========================================================================

    /// Cancels an order and puts its units back on the shelf.
    ///
    /// ## Errors
    /// - `NotFound` if the order is missing or belongs to someone else
    /// - `WindowExpired` once the cancellation window has passed
    /// - `InvalidTransition` if the order has already shipped or ended
    pub async fn cancel(
        &self,
        actor: &Actor,
        order_id: i64,
        policy: &StorePolicy,
        now: DateTime<Utc>,
    ) -> DbResult<OrderDetail> {
        debug!(order_id, user_id = actor.user_id, "Cancelling order");

        let detail = with_busy_retry(self.retry, "cancel_order", || {
            self.cancel_once(actor, order_id, policy, now)
        })
        .await?;

        info!(
            order_id,
            user_id = actor.user_id,
            restored_units = detail.lines.iter().map(|l| l.quantity).sum::<i64>(),
            "Order cancelled"
        );
        Ok(detail)
    }

    async fn cancel_once(
        &self,
        actor: &Actor,
        order_id: i64,
        policy: &StorePolicy,
        now: DateTime<Utc>,
    ) -> DbResult<OrderDetail> {
        let mut tx = self.pool.begin().await?;

        let order = fetch_visible_order(&mut tx, actor, order_id).await?;
        policy.ensure_cancellable(&order, now)?;

        let lines = fetch_lines(&mut tx, order_id).await?;
        for line in &lines {
            adjust_stock_in(&mut tx, line.product_id, line.quantity, now).await?;
        }

        let cancelled = update_status(&mut tx, &order, OrderStatus::BertanBehera, now).await?;
        tx.commit().await?;

        Ok(OrderDetail {
            order: cancelled,
            lines,
        })
    }

    // =========================================================================
    // Admin Workflow
    // =========================================================================

    /// Moves an order one step forward. Admin only.
    pub async fn advance_status(
        &self,
        actor: &Actor,
        order_id: i64,
        target: OrderStatus,
        now: DateTime<Utc>,
    ) -> DbResult<Order> {
        require_admin(actor, "advance_order_status")?;

        let order = with_busy_retry(self.retry, "advance_status", || {
            self.advance_status_once(actor, order_id, target, now)
        })
        .await?;

        info!(order_id, status = %order.status, admin_id = actor.user_id, "Order status advanced");
        Ok(order)
    }

    async fn advance_status_once(
        &self,
        actor: &Actor,
        order_id: i64,
        target: OrderStatus,
        now: DateTime<Utc>,
    ) -> DbResult<Order> {
        let mut tx = self.pool.begin().await?;

        let order = fetch_visible_order(&mut tx, actor, order_id).await?;
        ensure_advance(order.status, target)?;
        let advanced = update_status(&mut tx, &order, target, now).await?;

        tx.commit().await?;
        Ok(advanced)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Order with its lines. Other customers' orders read as `NotFound`.
    pub async fn get(&self, actor: &Actor, order_id: i64) -> DbResult<OrderDetail> {
        debug!(order_id, user_id = actor.user_id, "Getting order");

        let mut conn = self.pool.acquire().await?;
        let order = fetch_visible_order(&mut conn, actor, order_id).await?;
        let lines = fetch_lines(&mut conn, order_id).await?;

        Ok(OrderDetail { order, lines })
    }

    /// The actor's own orders, newest first.
    pub async fn list_for_user(&self, actor: &Actor) -> DbResult<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(concat!(
            "SELECT ",
            order_columns!(),
            " FROM orders WHERE user_id = ?1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(actor.user_id)
        .fetch_all(&self.pool)
        .await?;

        debug!(user_id = actor.user_id, count = rows.len(), "Listed user orders");
        Ok(rows.into_iter().map(Order::from).collect())
    }

    /// Every order, newest first, optionally filtered by status. Admin only.
    pub async fn list_all(&self, actor: &Actor, status: Option<OrderStatus>) -> DbResult<Vec<Order>> {
        require_admin(actor, "list_all_orders")?;

        let rows = sqlx::query_as::<_, OrderRow>(concat!(
            "SELECT ",
            order_columns!(),
            " FROM orders WHERE (?1 IS NULL OR status = ?1) ORDER BY created_at DESC, id DESC"
        ))
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        debug!(status = ?status, count = rows.len(), "Listed all orders");
        Ok(rows.into_iter().map(Order::from).collect())
    }
}

// =============================================================================
// Transaction Primitives
// =============================================================================

async fn insert_order(
    conn: &mut SqliteConnection,
    user_id: i64,
    plan: &CheckoutPlan,
    now: DateTime<Utc>,
) -> DbResult<Order> {
    let address = plan.address.as_ref();

    let row = sqlx::query_as::<_, OrderRow>(concat!(
        r#"
        INSERT INTO orders (
            user_id, status, delivery_method, street, street_number, city, province,
            postal_code, items_total_cents, shipping_cents, walk_in_customer, created_at, updated_at
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)
        RETURNING "#,
        order_columns!()
    ))
    .bind(user_id)
    .bind(plan.status)
    .bind(plan.delivery)
    .bind(address.map(|a| a.street.trim()))
    .bind(address.map(|a| a.number.trim()))
    .bind(address.map(|a| a.city.trim()))
    .bind(address.map(|a| a.province.trim()))
    .bind(address.map(|a| a.postal_code.trim()))
    .bind(plan.items_total.cents())
    .bind(plan.shipping.cents())
    .bind(&plan.walk_in_customer)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row.into())
}

/// Loads an order the actor may see. Foreign orders are reported as
/// missing so their existence is not revealed.
async fn fetch_visible_order(conn: &mut SqliteConnection, actor: &Actor, order_id: i64) -> DbResult<Order> {
    let row = sqlx::query_as::<_, OrderRow>(concat!(
        "SELECT ",
        order_columns!(),
        " FROM orders WHERE id = ?1"
    ))
    .bind(order_id)
    .fetch_optional(&mut *conn)
    .await?;

    match row {
        Some(row) if actor.can_access(row.user_id) => Ok(row.into()),
        _ => Err(CoreError::order_not_found(order_id).into()),
    }
}

async fn fetch_lines(conn: &mut SqliteConnection, order_id: i64) -> DbResult<Vec<OrderLine>> {
    let lines = sqlx::query_as::<_, OrderLine>(
        r#"
        SELECT order_id, product_id, product_name, quantity, unit_price_cents
        FROM order_lines
        WHERE order_id = ?1
        ORDER BY rowid
        "#,
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(lines)
}

/// Writes `target` only if the row still holds the status that was checked.
async fn update_status(
    conn: &mut SqliteConnection,
    order: &Order,
    target: OrderStatus,
    now: DateTime<Utc>,
) -> DbResult<Order> {
    let row = sqlx::query_as::<_, OrderRow>(concat!(
        "UPDATE orders SET status = ?3, updated_at = ?4 WHERE id = ?1 AND status = ?2 RETURNING ",
        order_columns!()
    ))
    .bind(order.id)
    .bind(order.status)
    .bind(target)
    .bind(now)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(Order::from).ok_or_else(|| {
        CoreError::InvalidTransition {
            from: order.status,
            to: target,
        }
        .into()
    })
}

// =============================================================================
// Tests
// =============================================================================
