use axum::{extract::{Path, State}, Extension, Json};
use sqlx::PgPool;
use tracing::instrument;
use crate::dtos::cart::{AddCartItemRequest, CartLineRow, CartResponse, UpdateCartItemRequest};
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::state::AppState;

pub(crate) async fn load_cart(db_pool: &PgPool, user_id: i64) -> Result<CartResponse, AppError> {
    let rows = sqlx::query_as::<_, CartLineRow>(
        "SELECT ci.product_id, p.name AS product_name, p.image_url, p.price AS unit_price,
                ci.quantity, p.stock, p.is_active
         FROM cart_items ci
         JOIN products p ON ci.product_id = p.id
         WHERE ci.user_id = $1
         ORDER BY ci.created_at, ci.id"
    )
    .bind(user_id)
    .fetch_all(db_pool)
    .await?;

    Ok(CartResponse::from_rows(rows))
}

async fn available_stock(db_pool: &PgPool, product_id: i64) -> Result<(String, i32), AppError> {
    let (name, stock, is_active): (String, i32, bool) =
        sqlx::query_as("SELECT name, stock, is_active FROM products WHERE id = $1")
            .bind(product_id)
            .fetch_optional(db_pool)
            .await?
            .ok_or_else(|| AppError::not_found("Product not found"))?;

    if !is_active {
        return Err(AppError::validation(format!("Product '{name}' is no longer available")));
    }
    Ok((name, stock))
}

// GET /cart
pub async fn get_cart(
    State(AppState { db_pool, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<CartResponse>, AppError> {
    load_cart(&db_pool, auth.user_id).await.map(Json)
}

// POST /cart/items - adds to any quantity already in the cart
#[instrument(skip(db_pool), fields(user_id = auth.user_id))]
pub async fn add_item(
    State(AppState { db_pool, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<AddCartItemRequest>,
) -> Result<Json<CartResponse>, AppError> {
    if req.quantity <= 0 {
        return Err(AppError::validation("Quantity must be greater than 0"));
    }
    let (name, stock) = available_stock(&db_pool, req.product_id).await?;

    let in_cart: i32 = sqlx::query_scalar("SELECT quantity FROM cart_items WHERE user_id = $1 AND product_id = $2")
        .bind(auth.user_id)
        .bind(req.product_id)
        .fetch_optional(&db_pool)
        .await?
        .unwrap_or(0);

    let wanted = in_cart.saturating_add(req.quantity);
    if wanted > stock {
        return Err(AppError::validation(format!(
            "Insufficient stock for product '{name}'. Requested {wanted}, available {stock}"
        )));
    }

    sqlx::query(
        "INSERT INTO cart_items (user_id, product_id, quantity) VALUES ($1, $2, $3)
         ON CONFLICT (user_id, product_id) DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity"
    )
    .bind(auth.user_id)
    .bind(req.product_id)
    .bind(req.quantity)
    .execute(&db_pool)
    .await?;

    load_cart(&db_pool, auth.user_id).await.map(Json)
}

// PUT /cart/items/{product_id} - quantity 0 removes the line
#[instrument(skip(db_pool), fields(user_id = auth.user_id))]
pub async fn update_item(
    State(AppState { db_pool, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(product_id): Path<i64>,
    Json(req): Json<UpdateCartItemRequest>,
) -> Result<Json<CartResponse>, AppError> {
    if req.quantity < 0 {
        return Err(AppError::validation("Quantity cannot be negative"));
    }

    if req.quantity == 0 {
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2")
            .bind(auth.user_id)
            .bind(product_id)
            .execute(&db_pool)
            .await?;
        return load_cart(&db_pool, auth.user_id).await.map(Json);
    }

    let (name, stock) = available_stock(&db_pool, product_id).await?;
    if req.quantity > stock {
        return Err(AppError::validation(format!(
            "Insufficient stock for product '{name}'. Requested {}, available {stock}",
            req.quantity
        )));
    }

    let result = sqlx::query("UPDATE cart_items SET quantity = $1 WHERE user_id = $2 AND product_id = $3")
        .bind(req.quantity)
        .bind(auth.user_id)
        .bind(product_id)
        .execute(&db_pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Product is not in the cart"));
    }

    load_cart(&db_pool, auth.user_id).await.map(Json)
}

// DELETE /cart/items/{product_id}
pub async fn remove_item(
    State(AppState { db_pool, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(product_id): Path<i64>,
) -> Result<Json<CartResponse>, AppError> {
    let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2")
        .bind(auth.user_id)
        .bind(product_id)
        .execute(&db_pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Product is not in the cart"));
    }

    load_cart(&db_pool, auth.user_id).await.map(Json)
}

// DELETE /cart
pub async fn clear_cart(
    State(AppState { db_pool, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<CartResponse>, AppError> {
    sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
        .bind(auth.user_id)
        .execute(&db_pool)
        .await?;

    load_cart(&db_pool, auth.user_id).await.map(Json)
}
