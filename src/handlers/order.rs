use axum::{extract::{Path, Query, State}, Extension, Json};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{info, instrument};
use crate::dtos::common::{non_blank, Paginated};
use crate::dtos::order::{OrderListParams, OrderResponse, OrderSummary, UpdateOrderStatusRequest};
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::models::commission::CommissionStatus;
use crate::models::invoice::{Invoice, InvoiceStatus};
use crate::models::order::{Order, OrderDetail, OrderStatus};
use crate::models::user::Role;
use crate::state::AppState;

pub(crate) const ORDER_COLUMNS: &str = "id, order_number, customer_id, affiliate_id, shipping_address, status, payment_method,
    subtotal, shipping_fee, total, note, created_at, updated_at";

pub(crate) const INVOICE_COLUMNS: &str =
    "id, invoice_number, order_id, customer_id, amount, status, issued_at, paid_at";

pub(crate) async fn fetch_order(db: impl sqlx::PgExecutor<'_>, id: i64) -> Result<Order, AppError> {
    sqlx::query_as::<_, Order>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found("Order not found"))
}

/// The affiliate row id owned by a user, if any.
pub(crate) async fn affiliate_id_for_user(db: impl sqlx::PgExecutor<'_>, user_id: i64) -> Result<Option<i64>, AppError> {
    Ok(sqlx::query_scalar("SELECT id FROM affiliates WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(db)
        .await?)
}

/// Admins see every order, customers their own, affiliates the ones attributed to them.
pub(crate) async fn ensure_can_view(db_pool: &PgPool, auth: &AuthContext, order: &Order) -> Result<(), AppError> {
    let allowed = match auth.role {
        Role::Admin => true,
        Role::Customer => order.customer_id == auth.user_id,
        Role::Affiliate => {
            let own = affiliate_id_for_user(db_pool, auth.user_id).await?;
            own.is_some() && own == order.affiliate_id
        }
    };
    if !allowed {
        // Don't reveal that the order exists.
        return Err(AppError::not_found("Order not found"));
    }
    Ok(())
}

pub(crate) async fn load_order_response(db_pool: &PgPool, order_id: i64) -> Result<OrderResponse, AppError> {
    let order = fetch_order(db_pool, order_id).await?;

    let details = sqlx::query_as::<_, OrderDetail>(
        "SELECT id, product_id, product_name, unit_price, quantity, subtotal
         FROM order_details WHERE order_id = $1 ORDER BY id"
    )
    .bind(order_id)
    .fetch_all(db_pool)
    .await?;

    let invoice = sqlx::query_as::<_, Invoice>(&format!(
        "SELECT {INVOICE_COLUMNS} FROM invoices WHERE order_id = $1"
    ))
    .bind(order_id)
    .fetch_optional(db_pool)
    .await?;

    let commission_total: Decimal = sqlx::query_scalar(
        "SELECT COALESCE(SUM(amount), 0) FROM commissions WHERE order_id = $1 AND status <> 'cancelled'"
    )
    .bind(order_id)
    .fetch_one(db_pool)
    .await?;

    Ok(OrderResponse::new(order, details, invoice, commission_total))
}

/// Moves an order to `next` and applies the bookkeeping that goes with it.
async fn apply_status_change(
    tx: &mut Transaction<'_, Postgres>,
    order: &Order,
    next: OrderStatus,
) -> Result<(), AppError> {
    let current = order
        .status()
        .ok_or_else(|| AppError::internal(format!("Order {} has unknown status '{}'", order.id, order.status)))?;

    if !current.can_transition_to(next) {
        return Err(AppError::validation(format!(
            "Cannot change order from {} to {}",
            current.as_str(),
            next.as_str()
        )));
    }

    // Guard on the old status so two concurrent updates can't both apply side effects.
    let updated = sqlx::query("UPDATE orders SET status = $1, updated_at = NOW() WHERE id = $2 AND status = $3")
        .bind(next.as_str())
        .bind(order.id)
        .bind(current.as_str())
        .execute(&mut **tx)
        .await?;
    if updated.rows_affected() == 0 {
        return Err(AppError::conflict("Order was modified concurrently, please retry"));
    }

    match next {
        OrderStatus::Completed => {
            sqlx::query("UPDATE commissions SET status = $1 WHERE order_id = $2 AND status = $3")
                .bind(CommissionStatus::Approved.as_str())
                .bind(order.id)
                .bind(CommissionStatus::Pending.as_str())
                .execute(&mut **tx)
                .await?;
            sqlx::query("UPDATE invoices SET status = $1, paid_at = COALESCE(paid_at, NOW()) WHERE order_id = $2 AND status = $3")
                .bind(InvoiceStatus::Paid.as_str())
                .bind(order.id)
                .bind(InvoiceStatus::Issued.as_str())
                .execute(&mut **tx)
                .await?;
        }
        OrderStatus::Cancelled => {
            sqlx::query(
                "UPDATE products p SET stock = p.stock + d.quantity, updated_at = NOW()
                 FROM (SELECT product_id, SUM(quantity)::INT AS quantity
                       FROM order_details WHERE order_id = $1 GROUP BY product_id) d
                 WHERE p.id = d.product_id"
            )
            .bind(order.id)
            .execute(&mut **tx)
            .await?;
            sqlx::query("UPDATE commissions SET status = $1 WHERE order_id = $2 AND status IN ($3, $4)")
                .bind(CommissionStatus::Cancelled.as_str())
                .bind(order.id)
                .bind(CommissionStatus::Pending.as_str())
                .bind(CommissionStatus::Approved.as_str())
                .execute(&mut **tx)
                .await?;
            sqlx::query("UPDATE invoices SET status = $1 WHERE order_id = $2 AND status = $3")
                .bind(InvoiceStatus::Void.as_str())
                .bind(order.id)
                .bind(InvoiceStatus::Issued.as_str())
                .execute(&mut **tx)
                .await?;
        }
        _ => {}
    }
    Ok(())
}

// GET /orders
#[instrument(skip(db_pool))]
pub async fn list_orders(
    State(AppState { db_pool, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<OrderListParams>,
) -> Result<Json<Paginated<OrderSummary>>, AppError> {
    let status = match non_blank(params.status.clone()) {
        Some(s) => Some(s.parse::<OrderStatus>().map_err(AppError::validation)?.as_str()),
        None => None,
    };

    // Scope the listing to what the caller may see.
    let (customer_id, affiliate_id) = match auth.role {
        Role::Admin => (params.customer_id, None),
        Role::Customer => (Some(auth.user_id), None),
        Role::Affiliate => {
            let own = affiliate_id_for_user(&db_pool, auth.user_id)
                .await?
                .ok_or_else(|| AppError::not_found("Affiliate profile not found"))?;
            (params.customer_id, Some(own))
        }
    };
    let paging = params.paging();

    let filter = "($1::TEXT IS NULL OR status = $1)
        AND ($2::BIGINT IS NULL OR customer_id = $2)
        AND ($3::BIGINT IS NULL OR affiliate_id = $3)";

    let orders = sqlx::query_as::<_, Order>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE {filter} ORDER BY created_at DESC, id DESC LIMIT $4 OFFSET $5"
    ))
    .bind(status)
    .bind(customer_id)
    .bind(affiliate_id)
    .bind(paging.limit())
    .bind(paging.offset())
    .fetch_all(&db_pool)
    .await?;

    let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM orders WHERE {filter}"))
        .bind(status)
        .bind(customer_id)
        .bind(affiliate_id)
        .fetch_one(&db_pool)
        .await?;

    let data = orders.into_iter().map(OrderSummary::from).collect();
    Ok(Json(Paginated::new(data, total, &paging)))
}

// GET /orders/{id}
pub async fn get_order(
    State(AppState { db_pool, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<OrderResponse>, AppError> {
    let order = fetch_order(&db_pool, id).await?;
    ensure_can_view(&db_pool, &auth, &order).await?;
    load_order_response(&db_pool, id).await.map(Json)
}

// PATCH /orders/{id}/status (admin)
#[instrument(skip(db_pool, auth, req))]
pub async fn update_order_status(
    State(AppState { db_pool, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateOrderStatusRequest>,
) -> Result<Json<OrderResponse>, AppError> {
    auth.require_admin()?;
    let next = req.status.parse::<OrderStatus>().map_err(AppError::validation)?;

    let mut tx = db_pool.begin().await?;
    let order = fetch_order(&mut *tx, id).await?;
    apply_status_change(&mut tx, &order, next).await?;
    tx.commit().await?;

    info!(order_id = id, from = %order.status, to = next.as_str(), "Order status changed");
    load_order_response(&db_pool, id).await.map(Json)
}

// POST /orders/{id}/cancel - customers may cancel their own pending orders
#[instrument(skip(db_pool, auth))]
pub async fn cancel_order(
    State(AppState { db_pool, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<OrderResponse>, AppError> {
    let mut tx = db_pool.begin().await?;
    let order = fetch_order(&mut *tx, id).await?;

    if order.status().is_some_and(|s| s.is_terminal()) {
        return Err(AppError::validation(format!("Order is already {}", order.status)));
    }

    if !auth.is_admin() {
        if order.customer_id != auth.user_id {
            return Err(AppError::not_found("Order not found"));
        }
        if order.status() != Some(OrderStatus::Pending) {
            return Err(AppError::validation("Only pending orders can be cancelled"));
        }
    }

    apply_status_change(&mut tx, &order, OrderStatus::Cancelled).await?;
    tx.commit().await?;

    info!(order_id = id, by = auth.user_id, "Order cancelled");
    load_order_response(&db_pool, id).await.map(Json)
}
