use axum::{extract::State, Extension, Json};
use axum::http::StatusCode;
use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};
use crate::dtos::common::non_blank;
use crate::dtos::order::{CheckoutRequest, OrderResponse};
use crate::error::AppError;
use crate::handlers::address::fetch_owned_address;
use crate::handlers::order::load_order_response;
use crate::middleware::auth::AuthContext;
use crate::models::invoice::invoice_number;
use crate::models::order::{order_number, OrderStatus};
use crate::models::product::Product;
use crate::models::user::Role;
use crate::services::checkout::{plan_checkout, ShippingPolicy};
use crate::state::AppState;

// POST /checkout - turns the caller's cart into an order, invoice and commissions
#[instrument(skip(state, req), fields(user_id = auth.user_id))]
pub async fn checkout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), AppError> {
    auth.require_role(Role::Customer)?;

    let mut tx = state.db_pool.begin().await?;

    let address = fetch_owned_address(&mut *tx, req.address_id, auth.user_id).await?;

    let cart: Vec<(i64, i32)> = sqlx::query_as(
        "SELECT product_id, quantity FROM cart_items WHERE user_id = $1 ORDER BY product_id"
    )
    .bind(auth.user_id)
    .fetch_all(&mut *tx)
    .await?;

    if cart.is_empty() {
        return Err(AppError::validation("Cart is empty"));
    }

    let product_ids: Vec<i64> = cart.iter().map(|(id, _)| *id).collect();
    // Row locks keep concurrent checkouts from overselling the same stock.
    let products = sqlx::query_as::<_, Product>(
        "SELECT id, name, price, stock, commission_rate, is_active
         FROM products WHERE id = ANY($1) ORDER BY id FOR UPDATE"
    )
    .bind(&product_ids)
    .fetch_all(&mut *tx)
    .await?;

    let shipping = ShippingPolicy {
        flat_fee: state.config.shipping_fee,
        free_threshold: state.config.free_shipping_threshold,
    };
    let plan = plan_checkout(&cart, &products, &shipping)?;

    // Only an active affiliate whose account is still an active affiliate login earns.
    let affiliate_id: Option<i64> = sqlx::query_scalar(
        "SELECT c.affiliate_id FROM customers c
         JOIN affiliates a ON a.id = c.affiliate_id
         JOIN users u ON u.id = a.user_id AND u.role = 'affiliate' AND u.is_active
         WHERE c.user_id = $1 AND a.status = 'active'"
    )
    .bind(auth.user_id)
    .fetch_optional(&mut *tx)
    .await?;

    let today = Utc::now().date_naive();

    let order_id: i64 = sqlx::query_scalar(
        "INSERT INTO orders (customer_id, affiliate_id, shipping_address, status, payment_method,
                             subtotal, shipping_fee, total, note)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
         RETURNING id"
    )
    .bind(auth.user_id)
    .bind(affiliate_id)
    .bind(address.one_line())
    .bind(OrderStatus::Pending.as_str())
    .bind(req.payment_method.as_str())
    .bind(plan.subtotal)
    .bind(plan.shipping_fee)
    .bind(plan.total)
    .bind(non_blank(req.note))
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("UPDATE orders SET order_number = $1 WHERE id = $2")
        .bind(order_number(order_id, today))
        .bind(order_id)
        .execute(&mut *tx)
        .await?;

    let mut commission_total = Decimal::ZERO;
    for line in &plan.lines {
        let detail_id: i64 = sqlx::query_scalar(
            "INSERT INTO order_details (order_id, product_id, product_name, unit_price, quantity, subtotal)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING id"
        )
        .bind(order_id)
        .bind(line.product_id)
        .bind(&line.product_name)
        .bind(line.unit_price)
        .bind(line.quantity)
        .bind(line.subtotal)
        .fetch_one(&mut *tx)
        .await?;

        let decremented = sqlx::query(
            "UPDATE products SET stock = stock - $1, updated_at = NOW() WHERE id = $2 AND stock >= $1"
        )
        .bind(line.quantity)
        .bind(line.product_id)
        .execute(&mut *tx)
        .await?;

        if decremented.rows_affected() == 0 {
            warn!(product_id = line.product_id, "Stock changed during checkout");
            return Err(AppError::conflict(format!(
                "Stock for product '{}' changed, please review your cart",
                line.product_name
            )));
        }

        let amount = line.commission();
        if let (Some(affiliate_id), true) = (affiliate_id, amount > Decimal::ZERO) {
            sqlx::query(
                "INSERT INTO commissions (affiliate_id, order_id, order_detail_id, product_id, customer_id,
                                          subtotal, rate, amount)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
            )
            .bind(affiliate_id)
            .bind(order_id)
            .bind(detail_id)
            .bind(line.product_id)
            .bind(auth.user_id)
            .bind(line.subtotal)
            .bind(line.commission_rate)
            .bind(amount)
            .execute(&mut *tx)
            .await?;
            commission_total += amount;
        }
    }

    let invoice_id: i64 = sqlx::query_scalar(
        "INSERT INTO invoices (order_id, customer_id, amount) VALUES ($1, $2, $3) RETURNING id"
    )
    .bind(order_id)
    .bind(auth.user_id)
    .bind(plan.total)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("UPDATE invoices SET invoice_number = $1 WHERE id = $2")
        .bind(invoice_number(invoice_id, today))
        .bind(invoice_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
        .bind(auth.user_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    info!(
        order_id,
        total = %plan.total,
        lines = plan.lines.len(),
        affiliate_id = ?affiliate_id,
        commission_total = %commission_total,
        "Order placed"
    );

    let response = load_order_response(&state.db_pool, order_id).await?;
    Ok((StatusCode::CREATED, Json(response)))
}
