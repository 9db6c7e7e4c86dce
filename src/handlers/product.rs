// src/handlers/product.rs
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use axum::http::StatusCode;
use rust_decimal::Decimal;
use crate::dtos::common::{non_blank, MessageResponse, Paginated};
use crate::dtos::product::{
    AdjustStockRequest, CreateProductRequest, ProductListParams, ProductResponse, UpdateProductRequest,
};
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::state::AppState;
use tracing::{error, info, instrument};

const PRODUCT_SELECT: &str = "SELECT p.id, p.name, p.description, p.price, p.stock, p.commission_rate,
        p.brand_id, b.name AS brand_name, p.category_id, c.name AS category_name,
        p.image_url, p.is_active, p.created_at, p.updated_at
    FROM products p
    LEFT JOIN brands b ON p.brand_id = b.id
    LEFT JOIN categories c ON p.category_id = c.id";

fn map_reference_violation(err: sqlx::Error) -> AppError {
    match err {
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23503") => {
            AppError::validation("Unknown brand or category")
        }
        other => other.into(),
    }
}

async fn fetch_product(db: impl sqlx::PgExecutor<'_>, id: i64) -> Result<ProductResponse, AppError> {
    sqlx::query_as::<_, ProductResponse>(&format!("{PRODUCT_SELECT} WHERE p.id = $1"))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found("Product not found"))
}

// GET /products - catalog listing; inactive products only for admins who ask for them
#[instrument(skip(state))]
pub async fn get_products(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    Query(params): Query<ProductListParams>,
) -> Result<Json<Paginated<ProductResponse>>, AppError> {
    let is_admin = auth.map(|Extension(a)| a.is_admin()).unwrap_or(false);
    let include_inactive = is_admin && params.include_inactive.unwrap_or(false);
    let search = non_blank(params.search.clone()).map(|s| format!("%{}%", s.to_lowercase()));
    let paging = params.paging();

    let filter = "($1 OR p.is_active)
        AND ($2::BIGINT IS NULL OR p.category_id = $2)
        AND ($3::BIGINT IS NULL OR p.brand_id = $3)
        AND ($4::TEXT IS NULL OR LOWER(p.name) LIKE $4 OR LOWER(COALESCE(p.description, '')) LIKE $4)";

    let products = sqlx::query_as::<_, ProductResponse>(&format!(
        "{PRODUCT_SELECT} WHERE {filter} ORDER BY p.created_at DESC, p.id DESC LIMIT $5 OFFSET $6"
    ))
    .bind(include_inactive)
    .bind(params.category_id)
    .bind(params.brand_id)
    .bind(&search)
    .bind(paging.limit())
    .bind(paging.offset())
    .fetch_all(&state.db_pool)
    .await
    .map_err(|e| {
        error!(?e, "Failed to fetch products");
        AppError::db(e)
    })?;

    let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM products p WHERE {filter}"))
        .bind(include_inactive)
        .bind(params.category_id)
        .bind(params.brand_id)
        .bind(&search)
        .fetch_one(&state.db_pool)
        .await?;

    Ok(Json(Paginated::new(products, total, &paging)))
}

// GET /products/{id}
#[instrument(skip(state))]
pub async fn get_product(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
) -> Result<Json<ProductResponse>, AppError> {
    let is_admin = auth.map(|Extension(a)| a.is_admin()).unwrap_or(false);
    let product = fetch_product(&state.db_pool, id).await?;
    if !product.is_active && !is_admin {
        return Err(AppError::not_found("Product not found"));
    }
    Ok(Json(product))
}

// POST /products (admin)
#[instrument(skip(state, payload))]
pub async fn create_product(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ProductResponse>), AppError> {
    auth.require_admin()?;
    payload.validate()?;

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO products (name, description, price, stock, commission_rate, brand_id, category_id, image_url)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         RETURNING id"
    )
    .bind(payload.name.trim())
    .bind(non_blank(payload.description))
    .bind(payload.price)
    .bind(payload.stock.unwrap_or(0))
    .bind(payload.commission_rate.unwrap_or(Decimal::ZERO))
    .bind(payload.brand_id)
    .bind(payload.category_id)
    .bind(non_blank(payload.image_url))
    .fetch_one(&state.db_pool)
    .await
    .map_err(map_reference_violation)?;

    info!(product_id = id, "Product created");
    Ok((StatusCode::CREATED, Json(fetch_product(&state.db_pool, id).await?)))
}

// PUT /products/{id} (admin) - partial update
#[instrument(skip(state, payload))]
pub async fn update_product(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<Json<ProductResponse>, AppError> {
    auth.require_admin()?;
    payload.validate()?;

    let result = sqlx::query(
        "UPDATE products SET
            name = COALESCE($1, name),
            description = COALESCE($2, description),
            price = COALESCE($3, price),
            stock = COALESCE($4, stock),
            commission_rate = COALESCE($5, commission_rate),
            brand_id = COALESCE($6, brand_id),
            category_id = COALESCE($7, category_id),
            image_url = COALESCE($8, image_url),
            is_active = COALESCE($9, is_active),
            updated_at = NOW()
         WHERE id = $10"
    )
    .bind(non_blank(payload.name))
    .bind(non_blank(payload.description))
    .bind(payload.price)
    .bind(payload.stock)
    .bind(payload.commission_rate)
    .bind(payload.brand_id)
    .bind(payload.category_id)
    .bind(non_blank(payload.image_url))
    .bind(payload.is_active)
    .bind(id)
    .execute(&state.db_pool)
    .await
    .map_err(map_reference_violation)?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Product not found"));
    }

    Ok(Json(fetch_product(&state.db_pool, id).await?))
}

/// Applies a stock delta, refusing results below zero or past the column's range.
fn next_stock(current: i32, delta: i32) -> Result<i32, AppError> {
    match current.checked_add(delta) {
        Some(stock) if stock >= 0 => Ok(stock),
        Some(_) => Err(AppError::validation(format!(
            "Stock cannot go below zero (current {current}, change {delta})"
        ))),
        None => Err(AppError::validation(format!(
            "Stock change {delta} is out of range for current stock {current}"
        ))),
    }
}

// PATCH /products/{id}/stock (admin)
#[instrument(skip(state))]
pub async fn adjust_stock(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<AdjustStockRequest>,
) -> Result<Json<ProductResponse>, AppError> {
    auth.require_admin()?;

    let mut tx = state.db_pool.begin().await?;

    let current: i32 = sqlx::query_scalar("SELECT stock FROM products WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("Product not found"))?;

    let stock = next_stock(current, payload.delta)?;

    let updated = sqlx::query(
        "UPDATE products SET stock = $1, updated_at = NOW() WHERE id = $2 AND stock = $3"
    )
    .bind(stock)
    .bind(id)
    .bind(current)
    .execute(&mut *tx)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(AppError::conflict("Stock changed, please retry"));
    }

    tx.commit().await?;
    info!(product_id = id, stock, "Stock adjusted");

    Ok(Json(fetch_product(&state.db_pool, id).await?))
}

// DELETE /products/{id} (admin) - soft delete so order history keeps its references
#[instrument(skip(state))]
pub async fn delete_product(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<MessageResponse>, AppError> {
    auth.require_admin()?;

    let mut tx = state.db_pool.begin().await?;

    let result = sqlx::query("UPDATE products SET is_active = FALSE, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Product not found"));
    }

    sqlx::query("DELETE FROM cart_items WHERE product_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    info!(product_id = id, "Product deactivated");

    Ok(Json(MessageResponse::ok("Product deleted")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_moves_by_delta() {
        assert_eq!(next_stock(10, 5).unwrap(), 15);
        assert_eq!(next_stock(10, -10).unwrap(), 0);
    }

    #[test]
    fn stock_never_goes_negative() {
        assert!(matches!(next_stock(3, -4), Err(AppError::ValidationError(_))));
    }

    #[test]
    fn stock_overflow_is_a_validation_error() {
        assert!(matches!(next_stock(i32::MAX, 1), Err(AppError::ValidationError(_))));
        assert!(matches!(next_stock(1, i32::MAX), Err(AppError::ValidationError(_))));
        assert!(matches!(next_stock(0, i32::MIN), Err(AppError::ValidationError(_))));
    }
}
