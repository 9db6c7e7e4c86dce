// Affiliates, customers and their addresses
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use chrono::{DateTime, Utc};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AffiliateStatus {
    Active,
    Suspended,
}

impl AffiliateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AffiliateStatus::Active => "active",
            AffiliateStatus::Suspended => "suspended",
        }
    }
}

impl FromStr for AffiliateStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(AffiliateStatus::Active),
            "suspended" => Ok(AffiliateStatus::Suspended),
            other => Err(format!("Unknown affiliate status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Affiliate {
    pub id: i64,
    pub user_id: i64,
    pub referral_code: Option<String>,
    pub status: String,
    pub payout_account: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct Customer {
    pub id: i64,
    pub user_id: i64,
    pub affiliate_id: Option<i64>,
}

#[derive(Debug, Clone, FromRow)]
pub struct Address {
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

impl Address {
    /// Single-line form stored on orders so later address edits don't rewrite history.
    pub fn one_line(&self) -> String {
        let mut parts: Vec<&str> = vec![self.recipient_name.as_str(), self.phone.as_str(), self.line1.as_str()];
        if let Some(l2) = self.line2.as_deref().filter(|s| !s.trim().is_empty()) {
            parts.push(l2);
        }
        parts.push(self.city.as_str());
        if let Some(p) = self.province.as_deref().filter(|s| !s.trim().is_empty()) {
            parts.push(p);
        }
        if let Some(z) = self.postal_code.as_deref().filter(|s| !s.trim().is_empty()) {
            parts.push(z);
        }
        parts.join(", ")
    }
}

pub fn referral_code(affiliate_id: i64) -> String {
    format!("AFF{:06}", affiliate_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> Address {
        Address {
            id: 1,
            recipient_name: "Lan Nguyen".into(),
            phone: "+84912345678".into(),
            line1: "12 Hang Bai".into(),
            line2: Some("  ".into()),
            city: "Hanoi".into(),
            province: None,
            postal_code: Some("100000".into()),
            is_default: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn one_line_skips_blank_parts() {
        assert_eq!(address().one_line(), "Lan Nguyen, +84912345678, 12 Hang Bai, Hanoi, 100000");
    }

    #[test]
    fn affiliate_status_parses() {
        assert_eq!(" Suspended ".parse::<AffiliateStatus>(), Ok(AffiliateStatus::Suspended));
        assert!("banned".parse::<AffiliateStatus>().is_err());
    }

    #[test]
    fn referral_codes_are_padded() {
        assert_eq!(referral_code(5), "AFF000005");
    }
}
