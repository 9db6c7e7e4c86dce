use axum::{extract::{Path, Query, State}, Extension, Json};
use sqlx::PgPool;
use tracing::{info, instrument};
use crate::dtos::affiliate::{AffiliateResponse, CustomerListParams, CustomerResponse, UpdateAffiliateRequest};
use crate::dtos::common::{non_blank, PageParams, Paginated};
use crate::error::AppError;
use crate::handlers::customer::{CUSTOMER_SELECT, CUSTOMER_FILTER};
use crate::middleware::auth::AuthContext;
use crate::models::party::{Affiliate, AffiliateStatus};
use crate::models::user::Role;
use crate::state::AppState;

const AFFILIATE_SELECT: &str = "SELECT a.id, a.user_id, u.full_name, u.email, u.phone, a.referral_code, a.status,
        a.payout_account,
        (SELECT COUNT(*) FROM customers c WHERE c.affiliate_id = a.id) AS customer_count,
        a.created_at
    FROM affiliates a
    JOIN users u ON u.id = a.user_id";

async fn fetch_affiliate(db: impl sqlx::PgExecutor<'_>, id: i64) -> Result<Affiliate, AppError> {
    sqlx::query_as::<_, Affiliate>(
        "SELECT id, user_id, referral_code, status, payout_account FROM affiliates WHERE id = $1"
    )
    .bind(id)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| AppError::not_found("Affiliate not found"))
}

async fn own_affiliate(db_pool: &PgPool, auth: &AuthContext) -> Result<Affiliate, AppError> {
    auth.require_role(Role::Affiliate)?;
    sqlx::query_as::<_, Affiliate>(
        "SELECT id, user_id, referral_code, status, payout_account FROM affiliates WHERE user_id = $1"
    )
    .bind(auth.user_id)
    .fetch_optional(db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Affiliate profile not found"))
}

async fn load_affiliate_response(db_pool: &PgPool, id: i64) -> Result<AffiliateResponse, AppError> {
    sqlx::query_as::<_, AffiliateResponse>(&format!("{AFFILIATE_SELECT} WHERE a.id = $1"))
        .bind(id)
        .fetch_optional(db_pool)
        .await?
        .ok_or_else(|| AppError::not_found("Affiliate not found"))
}

// GET /affiliates (admin)
#[instrument(skip(db_pool, auth))]
pub async fn list_affiliates(
    State(AppState { db_pool, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(paging): Query<PageParams>,
) -> Result<Json<Paginated<AffiliateResponse>>, AppError> {
    auth.require_admin()?;

    let rows = sqlx::query_as::<_, AffiliateResponse>(&format!(
        "{AFFILIATE_SELECT} ORDER BY a.created_at DESC, a.id DESC LIMIT $1 OFFSET $2"
    ))
    .bind(paging.limit())
    .bind(paging.offset())
    .fetch_all(&db_pool)
    .await?;

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM affiliates")
        .fetch_one(&db_pool)
        .await?;

    Ok(Json(Paginated::new(rows, total, &paging)))
}

// GET /affiliates/me
pub async fn get_my_affiliate(
    State(AppState { db_pool, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<AffiliateResponse>, AppError> {
    let own = own_affiliate(&db_pool, &auth).await?;
    load_affiliate_response(&db_pool, own.id).await.map(Json)
}

// GET /affiliates/me/customers
#[instrument(skip(db_pool, auth))]
pub async fn list_my_customers(
    State(AppState { db_pool, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<CustomerListParams>,
) -> Result<Json<Paginated<CustomerResponse>>, AppError> {
    let own = own_affiliate(&db_pool, &auth).await?;
    let search = non_blank(params.search.clone()).map(|s| format!("%{}%", s.to_lowercase()));
    let paging = params.paging();

    let rows = sqlx::query_as::<_, CustomerResponse>(&format!(
        "{CUSTOMER_SELECT} WHERE {CUSTOMER_FILTER} ORDER BY c.created_at DESC, c.id DESC LIMIT $3 OFFSET $4"
    ))
    .bind(Some(own.id))
    .bind(&search)
    .bind(paging.limit())
    .bind(paging.offset())
    .fetch_all(&db_pool)
    .await?;

    let total: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM customers c JOIN users u ON u.id = c.user_id WHERE {CUSTOMER_FILTER}"
    ))
    .bind(Some(own.id))
    .bind(&search)
    .fetch_one(&db_pool)
    .await?;

    Ok(Json(Paginated::new(rows, total, &paging)))
}

// GET /affiliates/{id} - admin, or the affiliate themselves
pub async fn get_affiliate(
    State(AppState { db_pool, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<AffiliateResponse>, AppError> {
    let affiliate = fetch_affiliate(&db_pool, id).await?;
    auth.require_self_or_admin(affiliate.user_id)?;
    load_affiliate_response(&db_pool, affiliate.id).await.map(Json)
}

// PATCH /affiliates/{id} (admin)
#[instrument(skip(db_pool, auth, req))]
pub async fn update_affiliate(
    State(AppState { db_pool, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateAffiliateRequest>,
) -> Result<Json<AffiliateResponse>, AppError> {
    auth.require_admin()?;

    let status = match req.status.as_deref() {
        Some(raw) => Some(raw.parse::<AffiliateStatus>().map_err(AppError::validation)?),
        None => None,
    };

    let existing = fetch_affiliate(&db_pool, id).await?;
    let payout_account = match req.payout_account {
        Some(raw) => non_blank(Some(raw)),
        None => existing.payout_account,
    };
    let status = status.map(|s| s.as_str().to_string()).unwrap_or(existing.status);

    sqlx::query("UPDATE affiliates SET status = $1, payout_account = $2 WHERE id = $3")
        .bind(&status)
        .bind(&payout_account)
        .bind(id)
        .execute(&db_pool)
        .await?;

    info!(affiliate_id = id, status = %status, "Affiliate updated");
    load_affiliate_response(&db_pool, id).await.map(Json)
}
