use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use crate::services::commission::round2;

#[derive(Debug, Deserialize)]
pub struct AddCartItemRequest {
    pub product_id: i64,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCartItemRequest {
    pub quantity: i32,
}

#[derive(Debug, sqlx::FromRow)]
pub struct CartLineRow {
    pub product_id: i64,
    pub product_name: String,
    pub image_url: Option<String>,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub stock: i32,
    pub is_active: bool,
}

#[derive(Debug, Serialize)]
pub struct CartLineResponse {
    pub product_id: i64,
    pub product_name: String,
    pub image_url: Option<String>,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub line_total: Decimal,
    /// False when the product was deactivated or stock no longer covers the quantity.
    pub available: bool,
}

#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub items: Vec<CartLineResponse>,
    pub item_count: i32,
    pub subtotal: Decimal,
}

impl CartResponse {
    pub fn from_rows(rows: Vec<CartLineRow>) -> Self {
        let items: Vec<CartLineResponse> = rows
            .into_iter()
            .map(|r| CartLineResponse {
                available: r.is_active && r.stock >= r.quantity,
                line_total: round2(r.unit_price * Decimal::from(r.quantity)),
                product_id: r.product_id,
                product_name: r.product_name,
                image_url: r.image_url,
                unit_price: r.unit_price,
                quantity: r.quantity,
            })
            .collect();

        let item_count = items.iter().map(|i| i.quantity).sum();
        let subtotal = items.iter().map(|i| i.line_total).sum();
        Self { items, item_count, subtotal }
    }
}
