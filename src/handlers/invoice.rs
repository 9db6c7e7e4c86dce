use axum::{extract::{Path, Query, State}, Extension, Json};
use tracing::{info, instrument};
use crate::dtos::common::{non_blank, Paginated};
use crate::dtos::order::{InvoiceListParams, InvoiceResponse};
use crate::error::AppError;
use crate::handlers::order::{ensure_can_view, fetch_order, INVOICE_COLUMNS};
use crate::middleware::auth::AuthContext;
use crate::models::invoice::{Invoice, InvoiceStatus};
use crate::models::user::Role;
use crate::state::AppState;

async fn fetch_invoice(db: impl sqlx::PgExecutor<'_>, id: i64) -> Result<Invoice, AppError> {
    sqlx::query_as::<_, Invoice>(&format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = $1"))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found("Invoice not found"))
}

fn parse_status(raw: Option<String>) -> Result<Option<&'static str>, AppError> {
    match non_blank(raw).map(|s| s.to_ascii_lowercase()) {
        None => Ok(None),
        Some(s) => match s.as_str() {
            "issued" => Ok(Some(InvoiceStatus::Issued.as_str())),
            "paid" => Ok(Some(InvoiceStatus::Paid.as_str())),
            "void" => Ok(Some(InvoiceStatus::Void.as_str())),
            other => Err(AppError::validation(format!("Unknown invoice status '{other}'"))),
        },
    }
}

// GET /invoices - admins see all, customers their own
#[instrument(skip(db_pool))]
pub async fn list_invoices(
    State(AppState { db_pool, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<InvoiceListParams>,
) -> Result<Json<Paginated<InvoiceResponse>>, AppError> {
    let customer_id = match auth.role {
        Role::Admin => None,
        Role::Customer => Some(auth.user_id),
        Role::Affiliate => return Err(AppError::forbidden("Affiliates have no invoices")),
    };
    let status = parse_status(params.status.clone())?;
    let paging = params.paging();

    let filter = "($1::BIGINT IS NULL OR customer_id = $1) AND ($2::TEXT IS NULL OR status = $2)";

    let invoices = sqlx::query_as::<_, Invoice>(&format!(
        "SELECT {INVOICE_COLUMNS} FROM invoices WHERE {filter} ORDER BY issued_at DESC, id DESC LIMIT $3 OFFSET $4"
    ))
    .bind(customer_id)
    .bind(status)
    .bind(paging.limit())
    .bind(paging.offset())
    .fetch_all(&db_pool)
    .await?;

    let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM invoices WHERE {filter}"))
        .bind(customer_id)
        .bind(status)
        .fetch_one(&db_pool)
        .await?;

    let data = invoices.into_iter().map(InvoiceResponse::from).collect();
    Ok(Json(Paginated::new(data, total, &paging)))
}

// GET /invoices/{id}
pub async fn get_invoice(
    State(AppState { db_pool, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<InvoiceResponse>, AppError> {
    let invoice = fetch_invoice(&db_pool, id).await?;
    if !auth.is_admin() && invoice.customer_id != auth.user_id {
        return Err(AppError::not_found("Invoice not found"));
    }
    Ok(Json(InvoiceResponse::from(invoice)))
}

// GET /orders/{id}/invoice
pub async fn get_order_invoice(
    State(AppState { db_pool, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(order_id): Path<i64>,
) -> Result<Json<InvoiceResponse>, AppError> {
    let order = fetch_order(&db_pool, order_id).await?;
    ensure_can_view(&db_pool, &auth, &order).await?;

    sqlx::query_as::<_, Invoice>(&format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE order_id = $1"))
        .bind(order_id)
        .fetch_optional(&db_pool)
        .await?
        .map(|i| Json(InvoiceResponse::from(i)))
        .ok_or_else(|| AppError::not_found("Invoice not found"))
}

// POST /invoices/{id}/pay (admin) - records payment received, e.g. a bank transfer
#[instrument(skip(db_pool, auth))]
pub async fn mark_invoice_paid(
    State(AppState { db_pool, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<InvoiceResponse>, AppError> {
    auth.require_admin()?;

    let invoice = fetch_invoice(&db_pool, id).await?;
    match invoice.status.as_str() {
        "issued" => {}
        "paid" => return Err(AppError::conflict("Invoice is already paid")),
        _ => return Err(AppError::validation("Void invoices cannot be paid")),
    }

    let updated = sqlx::query_as::<_, Invoice>(&format!(
        "UPDATE invoices SET status = $1, paid_at = NOW() WHERE id = $2 AND status = $3
         RETURNING {INVOICE_COLUMNS}"
    ))
    .bind(InvoiceStatus::Paid.as_str())
    .bind(id)
    .bind(InvoiceStatus::Issued.as_str())
    .fetch_optional(&db_pool)
    .await?
    .ok_or_else(|| AppError::conflict("Invoice was modified concurrently, please retry"))?;

    info!(invoice_id = id, "Invoice marked paid");
    Ok(Json(InvoiceResponse::from(updated)))
}
