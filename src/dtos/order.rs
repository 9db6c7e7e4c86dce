use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use crate::dtos::common::PageParams;
use crate::models::invoice::Invoice;
use crate::models::order::{Order, OrderDetail, PaymentMethod};

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub address_id: i64,
    pub payment_method: PaymentMethod,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct OrderListParams {
    pub status: Option<String>,
    pub customer_id: Option<i64>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl OrderListParams {
    pub fn paging(&self) -> PageParams {
        PageParams { page: self.page, per_page: self.per_page }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderDetailResponse {
    pub id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub subtotal: Decimal,
}

impl From<OrderDetail> for OrderDetailResponse {
    fn from(d: OrderDetail) -> Self {
        Self {
            id: d.id,
            product_id: d.product_id,
            product_name: d.product_name,
            unit_price: d.unit_price,
            quantity: d.quantity,
            subtotal: d.subtotal,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderSummary {
    pub id: i64,
    pub order_number: Option<String>,
    pub customer_id: i64,
    pub affiliate_id: Option<i64>,
    pub status: String,
    pub payment_method: String,
    pub subtotal: Decimal,
    pub shipping_fee: Decimal,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
}

impl From<Order> for OrderSummary {
    fn from(o: Order) -> Self {
        Self {
            id: o.id,
            order_number: o.order_number,
            customer_id: o.customer_id,
            affiliate_id: o.affiliate_id,
            status: o.status,
            payment_method: o.payment_method,
            subtotal: o.subtotal,
            shipping_fee: o.shipping_fee,
            total: o.total,
            created_at: o.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    #[serde(flatten)]
    pub summary: OrderSummary,
    pub shipping_address: String,
    pub note: Option<String>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<OrderDetailResponse>,
    pub invoice: Option<InvoiceResponse>,
    pub commission_total: Decimal,
}

impl OrderResponse {
    pub fn new(order: Order, details: Vec<OrderDetail>, invoice: Option<Invoice>, commission_total: Decimal) -> Self {
        let shipping_address = order.shipping_address.clone();
        let note = order.note.clone();
        let updated_at = order.updated_at;
        Self {
            summary: OrderSummary::from(order),
            shipping_address,
            note,
            updated_at,
            items: details.into_iter().map(OrderDetailResponse::from).collect(),
            invoice: invoice.map(InvoiceResponse::from),
            commission_total,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InvoiceResponse {
    pub id: i64,
    pub invoice_number: Option<String>,
    pub order_id: i64,
    pub customer_id: i64,
    pub amount: Decimal,
    pub status: String,
    pub issued_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl From<Invoice> for InvoiceResponse {
    fn from(i: Invoice) -> Self {
        Self {
            id: i.id,
            invoice_number: i.invoice_number,
            order_id: i.order_id,
            customer_id: i.customer_id,
            amount: i.amount,
            status: i.status,
            issued_at: i.issued_at,
            paid_at: i.paid_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct InvoiceListParams {
    pub status: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl InvoiceListParams {
    pub fn paging(&self) -> PageParams {
        PageParams { page: self.page, per_page: self.per_page }
    }
}
