use axum::{extract::{Query, State}, Extension, Json};
use chrono::{DateTime, Datelike, TimeZone, Utc};
use rust_decimal::Decimal;
use tracing::instrument;
use crate::dtos::dashboard::{AdminDashboard, AdminTotals, AffiliateDashboard, DashboardParams, Growth, TopProduct};
use crate::dtos::order::OrderSummary;
use crate::error::AppError;
use crate::handlers::order::ORDER_COLUMNS;
use crate::middleware::auth::AuthContext;
use crate::models::order::Order;
use crate::models::party::Affiliate;
use crate::models::user::Role;
use crate::services::analytics::{growth_percent, monthly_buckets, MonthWindow, PeriodTotals};
use crate::services::commission::{round2, CommissionTotals};
use crate::state::AppState;

const TOP_PRODUCTS: i64 = 5;
const RECENT_ORDERS: i64 = 5;

fn growth(current: Decimal, previous: Decimal) -> Growth {
    Growth { current: round2(current), previous: round2(previous), percent: growth_percent(current, previous) }
}

fn count_growth(totals: &PeriodTotals) -> Growth {
    growth(Decimal::from(totals.current_count), Decimal::from(totals.previous_count))
}

/// Earliest point the dashboard needs: the start of the requested year or of last month.
fn fetch_from(year: i32, window: &MonthWindow) -> DateTime<Utc> {
    let year_start = Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).single().unwrap_or_default();
    year_start.min(window.previous_start)
}

fn year_bounds(year: i32) -> Result<i32, AppError> {
    if !(2000..=9999).contains(&year) {
        return Err(AppError::validation(format!("Year {year} is out of range")));
    }
    Ok(year)
}

// GET /dashboard/admin
#[instrument(skip(db_pool, auth))]
pub async fn admin_dashboard(
    State(AppState { db_pool, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<DashboardParams>,
) -> Result<Json<AdminDashboard>, AppError> {
    auth.require_admin()?;

    let now = Utc::now();
    let year = year_bounds(params.year.unwrap_or_else(|| now.year()))?;
    let window = MonthWindow::around(now);

    let (revenue, orders): (Decimal, i64) = sqlx::query_as(
        "SELECT COALESCE(SUM(total), 0), COUNT(*) FROM orders WHERE status <> 'cancelled'"
    )
    .fetch_one(&db_pool)
    .await?;

    let customers: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = $1")
        .bind(Role::Customer.as_str())
        .fetch_one(&db_pool)
        .await?;

    let products: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active")
        .fetch_one(&db_pool)
        .await?;

    let pending_commissions: Decimal = sqlx::query_scalar(
        "SELECT COALESCE(SUM(amount), 0) FROM commissions WHERE status = 'pending'"
    )
    .fetch_one(&db_pool)
    .await?;

    let points: Vec<(DateTime<Utc>, Decimal)> = sqlx::query_as(
        "SELECT created_at, total FROM orders WHERE status <> 'cancelled' AND created_at >= $1"
    )
    .bind(fetch_from(year, &window))
    .fetch_all(&db_pool)
    .await?;

    let period = window.split(points.iter().copied());
    let monthly_revenue = monthly_buckets(points, year);

    let top_products = sqlx::query_as::<_, TopProduct>(
        "SELECT d.product_id, MAX(d.product_name) AS product_name,
                SUM(d.quantity)::BIGINT AS quantity, SUM(d.subtotal) AS revenue
         FROM order_details d
         JOIN orders o ON o.id = d.order_id
         WHERE o.status <> 'cancelled'
         GROUP BY d.product_id
         ORDER BY quantity DESC, revenue DESC
         LIMIT $1"
    )
    .bind(TOP_PRODUCTS)
    .fetch_all(&db_pool)
    .await?;

    let recent_orders = sqlx::query_as::<_, Order>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC, id DESC LIMIT $1"
    ))
    .bind(RECENT_ORDERS)
    .fetch_all(&db_pool)
    .await?
    .into_iter()
    .map(OrderSummary::from)
    .collect();

    Ok(Json(AdminDashboard {
        year,
        totals: AdminTotals {
            revenue: round2(revenue),
            orders,
            customers,
            products,
            pending_commissions: round2(pending_commissions),
        },
        revenue_growth: growth(period.current, period.previous),
        order_growth: count_growth(&period),
        monthly_revenue,
        top_products,
        recent_orders,
    }))
}

// GET /dashboard/affiliate
#[instrument(skip(db_pool, auth))]
pub async fn affiliate_dashboard(
    State(AppState { db_pool, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<DashboardParams>,
) -> Result<Json<AffiliateDashboard>, AppError> {
    auth.require_role(Role::Affiliate)?;

    let affiliate = sqlx::query_as::<_, Affiliate>(
        "SELECT id, user_id, referral_code, status, payout_account FROM affiliates WHERE user_id = $1"
    )
    .bind(auth.user_id)
    .fetch_optional(&db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Affiliate profile not found"))?;

    let now = Utc::now();
    let year = year_bounds(params.year.unwrap_or_else(|| now.year()))?;
    let window = MonthWindow::around(now);

    let rows: Vec<(String, Decimal, DateTime<Utc>)> = sqlx::query_as(
        "SELECT status, amount, created_at FROM commissions WHERE affiliate_id = $1"
    )
    .bind(affiliate.id)
    .fetch_all(&db_pool)
    .await?;

    let commissions = CommissionTotals::from_rows(rows.iter().map(|(s, a, _)| (s.as_str(), *a)));

    // Cancelled commissions never count towards earnings.
    let earned: Vec<(DateTime<Utc>, Decimal)> = rows
        .iter()
        .filter(|(s, _, _)| s != "cancelled")
        .map(|(_, a, at)| (*at, *a))
        .collect();
    let period = window.split(earned.iter().copied());
    let monthly_commissions = monthly_buckets(earned, year);

    let referred_customers: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers WHERE affiliate_id = $1")
        .bind(affiliate.id)
        .fetch_one(&db_pool)
        .await?;

    let attributed_orders: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE affiliate_id = $1")
        .bind(affiliate.id)
        .fetch_one(&db_pool)
        .await?;

    Ok(Json(AffiliateDashboard {
        year,
        affiliate_id: affiliate.id,
        referral_code: affiliate.referral_code,
        commissions,
        commission_growth: growth(period.current, period.previous),
        monthly_commissions,
        referred_customers,
        attributed_orders,
    }))
}
