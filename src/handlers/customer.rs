use axum::{extract::{Path, Query, State}, Extension, Json};
use tracing::{info, instrument};
use crate::dtos::affiliate::{AssignAffiliateRequest, CustomerListParams, CustomerResponse};
use crate::dtos::common::{non_blank, Paginated};
use crate::error::AppError;
use crate::handlers::order::affiliate_id_for_user;
use crate::middleware::auth::AuthContext;
use crate::models::party::Customer;
use crate::models::user::Role;
use crate::state::AppState;

// Revenue ignores cancelled orders.
pub(crate) const CUSTOMER_SELECT: &str = "SELECT c.id, c.user_id, u.full_name, u.email, u.phone, c.affiliate_id,
        (SELECT COUNT(*) FROM orders o WHERE o.customer_id = c.user_id) AS order_count,
        (SELECT COALESCE(SUM(o.total), 0) FROM orders o
          WHERE o.customer_id = c.user_id AND o.status <> 'cancelled') AS total_spent,
        c.created_at
    FROM customers c
    JOIN users u ON u.id = c.user_id";

/// Binds: $1 affiliate id, $2 lowercase `%search%` pattern.
pub(crate) const CUSTOMER_FILTER: &str = "($1::BIGINT IS NULL OR c.affiliate_id = $1)
    AND ($2::TEXT IS NULL OR LOWER(u.full_name) LIKE $2 OR LOWER(u.email) LIKE $2 OR u.phone LIKE $2)";

async fn fetch_customer(db: impl sqlx::PgExecutor<'_>, id: i64) -> Result<Customer, AppError> {
    sqlx::query_as::<_, Customer>("SELECT id, user_id, affiliate_id FROM customers WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found("Customer not found"))
}

async fn load_customer_response(db: impl sqlx::PgExecutor<'_>, id: i64) -> Result<CustomerResponse, AppError> {
    sqlx::query_as::<_, CustomerResponse>(&format!("{CUSTOMER_SELECT} WHERE c.id = $1"))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found("Customer not found"))
}

// GET /customers (admin)
#[instrument(skip(db_pool, auth))]
pub async fn list_customers(
    State(AppState { db_pool, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<CustomerListParams>,
) -> Result<Json<Paginated<CustomerResponse>>, AppError> {
    auth.require_admin()?;
    let search = non_blank(params.search.clone()).map(|s| format!("%{}%", s.to_lowercase()));
    let paging = params.paging();

    let rows = sqlx::query_as::<_, CustomerResponse>(&format!(
        "{CUSTOMER_SELECT} WHERE {CUSTOMER_FILTER} ORDER BY c.created_at DESC, c.id DESC LIMIT $3 OFFSET $4"
    ))
    .bind(params.affiliate_id)
    .bind(&search)
    .bind(paging.limit())
    .bind(paging.offset())
    .fetch_all(&db_pool)
    .await?;

    let total: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM customers c JOIN users u ON u.id = c.user_id WHERE {CUSTOMER_FILTER}"
    ))
    .bind(params.affiliate_id)
    .bind(&search)
    .fetch_one(&db_pool)
    .await?;

    Ok(Json(Paginated::new(rows, total, &paging)))
}

// GET /customers/{id} - admin, or the affiliate who referred the customer
pub async fn get_customer(
    State(AppState { db_pool, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<CustomerResponse>, AppError> {
    let customer = fetch_customer(&db_pool, id).await?;

    let allowed = match auth.role {
        Role::Admin => true,
        Role::Customer => customer.user_id == auth.user_id,
        Role::Affiliate => {
            let own = affiliate_id_for_user(&db_pool, auth.user_id).await?;
            own.is_some() && own == customer.affiliate_id
        }
    };
    if !allowed {
        return Err(AppError::not_found("Customer not found"));
    }

    load_customer_response(&db_pool, customer.id).await.map(Json)
}

// PATCH /customers/{id}/affiliate (admin) - reassigns or clears the referring affiliate
#[instrument(skip(db_pool, auth))]
pub async fn assign_affiliate(
    State(AppState { db_pool, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(req): Json<AssignAffiliateRequest>,
) -> Result<Json<CustomerResponse>, AppError> {
    auth.require_admin()?;
    let customer = fetch_customer(&db_pool, id).await?;

    if let Some(affiliate_id) = req.affiliate_id {
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM affiliates WHERE id = $1")
            .bind(affiliate_id)
            .fetch_optional(&db_pool)
            .await?;
        if exists.is_none() {
            return Err(AppError::validation(format!("Affiliate {affiliate_id} does not exist")));
        }
    }

    sqlx::query("UPDATE customers SET affiliate_id = $1 WHERE id = $2")
        .bind(req.affiliate_id)
        .bind(customer.id)
        .execute(&db_pool)
        .await?;

    info!(customer_id = id, from = ?customer.affiliate_id, to = ?req.affiliate_id, "Customer referrer changed");
    load_customer_response(&db_pool, id).await.map(Json)
}
