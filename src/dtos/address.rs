use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use crate::models::party::Address;

#[derive(Debug, Deserialize)]
pub struct AddressRequest {
    pub recipient_name: String,
    pub phone: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub province: Option<String>,
    pub postal_code: Option<String>,
    pub is_default: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct AddressResponse {
    pub id: i64,
    pub recipient_name: String,
    pub phone: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub province: Option<String>,
    pub postal_code: Option<String>,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Address> for AddressResponse {
    fn from(a: Address) -> Self {
        Self {
            id: a.id,
            recipient_name: a.recipient_name,
            phone: a.phone,
            line1: a.line1,
            line2: a.line2,
            city: a.city,
            province: a.province,
            postal_code: a.postal_code,
            is_default: a.is_default,
            created_at: a.created_at,
        }
    }
}
