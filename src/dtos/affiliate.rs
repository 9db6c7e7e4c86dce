use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use crate::dtos::common::PageParams;
use crate::models::commission::Commission;

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct AffiliateResponse {
    pub id: i64,
    pub user_id: i64,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub referral_code: Option<String>,
    pub status: String,
    pub payout_account: Option<String>,
    pub customer_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAffiliateRequest {
    pub status: Option<String>,
    pub payout_account: Option<String>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct CustomerResponse {
    pub id: i64,
    pub user_id: i64,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub affiliate_id: Option<i64>,
    pub order_count: i64,
    pub total_spent: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct AssignAffiliateRequest {
    /// `None` clears the referrer.
    pub affiliate_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CustomerListParams {
    pub affiliate_id: Option<i64>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl CustomerListParams {
    pub fn paging(&self) -> PageParams {
        PageParams { page: self.page, per_page: self.per_page }
    }
}

#[derive(Debug, Serialize)]
pub struct CommissionResponse {
    pub id: i64,
    pub affiliate_id: i64,
    pub order_id: i64,
    pub order_detail_id: i64,
    pub product_id: i64,
    pub customer_id: i64,
    pub subtotal: Decimal,
    pub rate: Decimal,
    pub amount: Decimal,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl From<Commission> for CommissionResponse {
    fn from(c: Commission) -> Self {
        Self {
            id: c.id,
            affiliate_id: c.affiliate_id,
            order_id: c.order_id,
            order_detail_id: c.order_detail_id,
            product_id: c.product_id,
            customer_id: c.customer_id,
            subtotal: c.subtotal,
            rate: c.rate,
            amount: c.amount,
            status: c.status,
            created_at: c.created_at,
            paid_at: c.paid_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CommissionListParams {
    pub status: Option<String>,
    pub affiliate_id: Option<i64>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl CommissionListParams {
    pub fn paging(&self) -> PageParams {
        PageParams { page: self.page, per_page: self.per_page }
    }
}

#[derive(Debug, Deserialize)]
pub struct CommissionSummaryParams {
    pub affiliate_id: Option<i64>,
}
