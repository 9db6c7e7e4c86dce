use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use crate::dtos::order::OrderSummary;
use crate::services::analytics::MonthlyBucket;
use crate::services::commission::CommissionTotals;

#[derive(Debug, Deserialize)]
pub struct DashboardParams {
    pub year: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct Growth {
    pub current: Decimal,
    pub previous: Decimal,
    pub percent: Decimal,
}

#[derive(Debug, Serialize)]
pub struct AdminTotals {
    pub revenue: Decimal,
    pub orders: i64,
    pub customers: i64,
    pub products: i64,
    pub pending_commissions: Decimal,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct TopProduct {
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i64,
    pub revenue: Decimal,
}

#[derive(Debug, Serialize)]
pub struct AdminDashboard {
    pub year: i32,
    pub totals: AdminTotals,
    pub revenue_growth: Growth,
    pub order_growth: Growth,
    pub monthly_revenue: Vec<MonthlyBucket>,
    pub top_products: Vec<TopProduct>,
    pub recent_orders: Vec<OrderSummary>,
}

#[derive(Debug, Serialize)]
pub struct AffiliateDashboard {
    pub year: i32,
    pub affiliate_id: i64,
    pub referral_code: Option<String>,
    pub commissions: CommissionTotals,
    pub commission_growth: Growth,
    pub monthly_commissions: Vec<MonthlyBucket>,
    pub referred_customers: i64,
    pub attributed_orders: i64,
}
