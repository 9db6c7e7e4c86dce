use axum::{extract::{Path, Query, State}, Extension, Json};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{info, instrument};
use crate::dtos::affiliate::{CommissionListParams, CommissionResponse, CommissionSummaryParams};
use crate::dtos::common::{non_blank, Paginated};
use crate::error::AppError;
use crate::handlers::order::affiliate_id_for_user;
use crate::middleware::auth::AuthContext;
use crate::models::commission::{Commission, CommissionStatus};
use crate::models::user::Role;
use crate::services::commission::CommissionTotals;
use crate::state::AppState;

const COMMISSION_COLUMNS: &str = "id, affiliate_id, order_id, order_detail_id, product_id, customer_id,
    subtotal, rate, amount, status, created_at, paid_at";

/// Resolves which affiliate's commissions the caller may look at.
pub(crate) async fn scoped_affiliate(
    db_pool: &PgPool,
    auth: &AuthContext,
    requested: Option<i64>,
) -> Result<Option<i64>, AppError> {
    match auth.role {
        Role::Admin => Ok(requested),
        Role::Affiliate => {
            let own = affiliate_id_for_user(db_pool, auth.user_id)
                .await?
                .ok_or_else(|| AppError::not_found("Affiliate profile not found"))?;
            if requested.is_some_and(|id| id != own) {
                return Err(AppError::forbidden("You can only view your own commissions"));
            }
            Ok(Some(own))
        }
        Role::Customer => Err(AppError::forbidden("Only affiliates and admins can view commissions")),
    }
}

// GET /commissions
#[instrument(skip(db_pool))]
pub async fn list_commissions(
    State(AppState { db_pool, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<CommissionListParams>,
) -> Result<Json<Paginated<CommissionResponse>>, AppError> {
    let affiliate_id = scoped_affiliate(&db_pool, &auth, params.affiliate_id).await?;
    let status = match non_blank(params.status.clone()) {
        Some(s) => Some(s.parse::<CommissionStatus>().map_err(AppError::validation)?.as_str()),
        None => None,
    };
    let paging = params.paging();

    let filter = "($1::BIGINT IS NULL OR affiliate_id = $1) AND ($2::TEXT IS NULL OR status = $2)";

    let rows = sqlx::query_as::<_, Commission>(&format!(
        "SELECT {COMMISSION_COLUMNS} FROM commissions WHERE {filter}
         ORDER BY created_at DESC, id DESC LIMIT $3 OFFSET $4"
    ))
    .bind(affiliate_id)
    .bind(status)
    .bind(paging.limit())
    .bind(paging.offset())
    .fetch_all(&db_pool)
    .await?;

    let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM commissions WHERE {filter}"))
        .bind(affiliate_id)
        .bind(status)
        .fetch_one(&db_pool)
        .await?;

    let data = rows.into_iter().map(CommissionResponse::from).collect();
    Ok(Json(Paginated::new(data, total, &paging)))
}

// GET /commissions/summary
pub async fn commission_summary(
    State(AppState { db_pool, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<CommissionSummaryParams>,
) -> Result<Json<CommissionTotals>, AppError> {
    let affiliate_id = scoped_affiliate(&db_pool, &auth, params.affiliate_id).await?;

    let rows: Vec<(String, Decimal)> = sqlx::query_as(
        "SELECT status, amount FROM commissions WHERE ($1::BIGINT IS NULL OR affiliate_id = $1)"
    )
    .bind(affiliate_id)
    .fetch_all(&db_pool)
    .await?;

    Ok(Json(CommissionTotals::from_rows(rows.iter().map(|(s, a)| (s.as_str(), *a)))))
}

// POST /commissions/{id}/pay (admin) - only approved commissions can be paid out
#[instrument(skip(db_pool, auth))]
pub async fn pay_commission(
    State(AppState { db_pool, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<CommissionResponse>, AppError> {
    auth.require_admin()?;

    let current: String = sqlx::query_scalar("SELECT status FROM commissions WHERE id = $1")
        .bind(id)
        .fetch_optional(&db_pool)
        .await?
        .ok_or_else(|| AppError::not_found("Commission not found"))?;

    if current != CommissionStatus::Approved.as_str() {
        return Err(AppError::validation(format!(
            "Only approved commissions can be paid (status is {current})"
        )));
    }

    let commission = sqlx::query_as::<_, Commission>(&format!(
        "UPDATE commissions SET status = $1, paid_at = NOW() WHERE id = $2 AND status = $3
         RETURNING {COMMISSION_COLUMNS}"
    ))
    .bind(CommissionStatus::Paid.as_str())
    .bind(id)
    .bind(CommissionStatus::Approved.as_str())
    .fetch_optional(&db_pool)
    .await?
    .ok_or_else(|| AppError::conflict("Commission was modified concurrently, please retry"))?;

    info!(commission_id = id, affiliate_id = commission.affiliate_id, amount = %commission.amount, "Commission paid");
    Ok(Json(CommissionResponse::from(commission)))
}
