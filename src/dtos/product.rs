// src/dtos/product.rs
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use crate::dtos::common::PageParams;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock: Option<i32>,
    pub commission_rate: Option<Decimal>,
    pub brand_id: Option<i64>,
    pub category_id: Option<i64>,
    pub image_url: Option<String>,
}

impl CreateProductRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::validation("Product name is required"));
        }
        validate_price(Some(self.price))?;
        validate_stock(self.stock)?;
        validate_rate(self.commission_rate)
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub stock: Option<i32>,
    pub commission_rate: Option<Decimal>,
    pub brand_id: Option<i64>,
    pub category_id: Option<i64>,
    pub image_url: Option<String>,
    pub is_active: Option<bool>,
}

impl UpdateProductRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(AppError::validation("Product name cannot be empty"));
            }
        }
        validate_price(self.price)?;
        validate_stock(self.stock)?;
        validate_rate(self.commission_rate)
    }
}

fn validate_price(price: Option<Decimal>) -> Result<(), AppError> {
    match price {
        Some(p) if p < Decimal::ZERO => Err(AppError::validation("Price cannot be negative")),
        _ => Ok(()),
    }
}

fn validate_stock(stock: Option<i32>) -> Result<(), AppError> {
    match stock {
        Some(s) if s < 0 => Err(AppError::validation("Stock cannot be negative")),
        _ => Ok(()),
    }
}

fn validate_rate(rate: Option<Decimal>) -> Result<(), AppError> {
    match rate {
        Some(r) if r < Decimal::ZERO || r > Decimal::ONE_HUNDRED => {
            Err(AppError::validation("Commission rate must be between 0 and 100"))
        }
        _ => Ok(()),
    }
}

#[derive(Debug, Deserialize)]
pub struct AdjustStockRequest {
    pub delta: i32,
}

#[derive(Debug, Deserialize)]
pub struct ProductListParams {
    pub category_id: Option<i64>,
    pub brand_id: Option<i64>,
    pub search: Option<String>,
    pub include_inactive: Option<bool>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl ProductListParams {
    pub fn paging(&self) -> PageParams {
        PageParams { page: self.page, per_page: self.per_page }
    }
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct ProductResponse {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock: i32,
    pub commission_rate: Decimal,
    pub brand_id: Option<i64>,
    pub brand_name: Option<String>,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct BrandRequest {
    pub name: String,
    pub description: Option<String>,
    pub logo_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BrandResponse {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub logo_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<crate::models::product::Brand> for BrandResponse {
    fn from(brand: crate::models::product::Brand) -> Self {
        Self {
            id: brand.id,
            name: brand.name,
            description: brand.description,
            logo_url: brand.logo_url,
            created_at: brand.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<crate::models::product::Category> for CategoryResponse {
    fn from(category: crate::models::product::Category) -> Self {
        Self {
            id: category.id,
            name: category.name,
            description: category.description,
            created_at: category.created_at,
        }
    }
}
