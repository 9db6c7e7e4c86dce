// Brands and categories
use axum::{extract::{Path, State}, Extension, Json};
use axum::http::StatusCode;
use tracing::instrument;
use crate::dtos::common::{non_blank, MessageResponse};
use crate::dtos::product::{BrandRequest, BrandResponse, CategoryRequest, CategoryResponse};
use crate::error::{map_unique_violation, AppError};
use crate::middleware::auth::AuthContext;
use crate::models::product::{Brand, Category};
use crate::state::AppState;

fn required_name(name: &str, what: &str) -> Result<String, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation(format!("{what} name is required")));
    }
    Ok(name.to_string())
}

pub async fn list_brands(
    State(AppState { db_pool, .. }): State<AppState>,
) -> Result<Json<Vec<BrandResponse>>, AppError> {
    let brands = sqlx::query_as::<_, Brand>(
        "SELECT id, name, description, logo_url, created_at FROM brands ORDER BY name"
    )
    .fetch_all(&db_pool)
    .await?;
    Ok(Json(brands.into_iter().map(BrandResponse::from).collect()))
}

pub async fn get_brand(
    State(AppState { db_pool, .. }): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<BrandResponse>, AppError> {
    sqlx::query_as::<_, Brand>("SELECT id, name, description, logo_url, created_at FROM brands WHERE id = $1")
        .bind(id)
        .fetch_optional(&db_pool)
        .await?
        .map(|b| Json(BrandResponse::from(b)))
        .ok_or_else(|| AppError::not_found("Brand not found"))
}

#[instrument(skip(db_pool, auth, req))]
pub async fn create_brand(
    State(AppState { db_pool, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<BrandRequest>,
) -> Result<(StatusCode, Json<BrandResponse>), AppError> {
    auth.require_admin()?;
    let name = required_name(&req.name, "Brand")?;

    let brand = sqlx::query_as::<_, Brand>(
        "INSERT INTO brands (name, description, logo_url) VALUES ($1, $2, $3)
         RETURNING id, name, description, logo_url, created_at"
    )
    .bind(name)
    .bind(non_blank(req.description))
    .bind(non_blank(req.logo_url))
    .fetch_one(&db_pool)
    .await
    .map_err(|e| map_unique_violation(e, "Brand name already exists"))?;

    Ok((StatusCode::CREATED, Json(BrandResponse::from(brand))))
}

#[instrument(skip(db_pool, auth, req))]
pub async fn update_brand(
    State(AppState { db_pool, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(req): Json<BrandRequest>,
) -> Result<Json<BrandResponse>, AppError> {
    auth.require_admin()?;
    let name = required_name(&req.name, "Brand")?;

    sqlx::query_as::<_, Brand>(
        "UPDATE brands SET name = $1, description = $2, logo_url = $3 WHERE id = $4
         RETURNING id, name, description, logo_url, created_at"
    )
    .bind(name)
    .bind(non_blank(req.description))
    .bind(non_blank(req.logo_url))
    .bind(id)
    .fetch_optional(&db_pool)
    .await
    .map_err(|e| map_unique_violation(e, "Brand name already exists"))?
    .map(|b| Json(BrandResponse::from(b)))
    .ok_or_else(|| AppError::not_found("Brand not found"))
}

#[instrument(skip(db_pool, auth))]
pub async fn delete_brand(
    State(AppState { db_pool, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, AppError> {
    auth.require_admin()?;
    let result = sqlx::query("DELETE FROM brands WHERE id = $1").bind(id).execute(&db_pool).await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Brand not found"));
    }
    Ok(Json(MessageResponse::ok("Brand deleted")))
}

pub async fn list_categories(
    State(AppState { db_pool, .. }): State<AppState>,
) -> Result<Json<Vec<CategoryResponse>>, AppError> {
    let categories = sqlx::query_as::<_, Category>(
        "SELECT id, name, description, created_at FROM categories ORDER BY name"
    )
    .fetch_all(&db_pool)
    .await?;
    Ok(Json(categories.into_iter().map(CategoryResponse::from).collect()))
}

pub async fn get_category(
    State(AppState { db_pool, .. }): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<CategoryResponse>, AppError> {
    sqlx::query_as::<_, Category>("SELECT id, name, description, created_at FROM categories WHERE id = $1")
        .bind(id)
        .fetch_optional(&db_pool)
        .await?
        .map(|c| Json(CategoryResponse::from(c)))
        .ok_or_else(|| AppError::not_found("Category not found"))
}

#[instrument(skip(db_pool, auth, req))]
pub async fn create_category(
    State(AppState { db_pool, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CategoryRequest>,
) -> Result<(StatusCode, Json<CategoryResponse>), AppError> {
    auth.require_admin()?;
    let name = required_name(&req.name, "Category")?;

    let category = sqlx::query_as::<_, Category>(
        "INSERT INTO categories (name, description) VALUES ($1, $2)
         RETURNING id, name, description, created_at"
    )
    .bind(name)
    .bind(non_blank(req.description))
    .fetch_one(&db_pool)
    .await
    .map_err(|e| map_unique_violation(e, "Category name already exists"))?;

    Ok((StatusCode::CREATED, Json(CategoryResponse::from(category))))
}

#[instrument(skip(db_pool, auth, req))]
pub async fn update_category(
    State(AppState { db_pool, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(req): Json<CategoryRequest>,
) -> Result<Json<CategoryResponse>, AppError> {
    auth.require_admin()?;
    let name = required_name(&req.name, "Category")?;

    sqlx::query_as::<_, Category>(
        "UPDATE categories SET name = $1, description = $2 WHERE id = $3
         RETURNING id, name, description, created_at"
    )
    .bind(name)
    .bind(non_blank(req.description))
    .bind(id)
    .fetch_optional(&db_pool)
    .await
    .map_err(|e| map_unique_violation(e, "Category name already exists"))?
    .map(|c| Json(CategoryResponse::from(c)))
    .ok_or_else(|| AppError::not_found("Category not found"))
}

#[instrument(skip(db_pool, auth))]
pub async fn delete_category(
    State(AppState { db_pool, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, AppError> {
    auth.require_admin()?;
    let result = sqlx::query("DELETE FROM categories WHERE id = $1").bind(id).execute(&db_pool).await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Category not found"));
    }
    Ok(Json(MessageResponse::ok("Category deleted")))
}
