use std::net::IpAddr;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub host: IpAddr,
    pub port: u16,
    pub db_max_connections: u32,
    pub jwt_ttl_hours: i64,
    pub shipping_fee: Decimal,
    pub free_shipping_threshold: Option<Decimal>,
    pub phone_country_code: String,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup, so tests don't touch the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let jwt_secret = get("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let host = parse_or(get("HOST"), "HOST", IpAddr::from([127, 0, 0, 1]))?;
        let port = parse_or(get("PORT"), "PORT", 3000u16)?;
        let db_max_connections = parse_or(get("DB_MAX_CONNECTIONS"), "DB_MAX_CONNECTIONS", 10u32)?;
        let jwt_ttl_hours = parse_or(get("JWT_TTL_HOURS"), "JWT_TTL_HOURS", 8i64)?;
        if jwt_ttl_hours <= 0 {
            return Err(ConfigError::Invalid { name: "JWT_TTL_HOURS", value: jwt_ttl_hours.to_string() });
        }

        let shipping_fee = parse_or(get("SHIPPING_FEE"), "SHIPPING_FEE", Decimal::ZERO)?;
        if shipping_fee < Decimal::ZERO {
            return Err(ConfigError::Invalid { name: "SHIPPING_FEE", value: shipping_fee.to_string() });
        }
        let free_shipping_threshold = match get("FREE_SHIPPING_THRESHOLD") {
            Some(v) => Some(v.trim().parse::<Decimal>().map_err(|_| ConfigError::Invalid {
                name: "FREE_SHIPPING_THRESHOLD",
                value: v.clone(),
            })?),
            None => None,
        };

        let phone_country_code = get("PHONE_COUNTRY_CODE").unwrap_or_else(|| "84".to_string());
        let phone_country_code = phone_country_code.trim().trim_start_matches('+').to_string();
        if phone_country_code.is_empty()
            || phone_country_code.len() > 3
            || !phone_country_code.chars().all(|c| c.is_ascii_digit())
        {
            return Err(ConfigError::Invalid { name: "PHONE_COUNTRY_CODE", value: phone_country_code });
        }

        Ok(Self {
            database_url,
            jwt_secret,
            host,
            port,
            db_max_connections,
            jwt_ttl_hours,
            shipping_fee,
            free_shipping_threshold,
            phone_country_code,
            admin_email: get("ADMIN_EMAIL"),
            admin_password: get("ADMIN_PASSWORD"),
        })
    }
}

fn parse_or<T: std::str::FromStr>(raw: Option<String>, name: &'static str, default: T) -> Result<T, ConfigError> {
    match raw {
        Some(v) => v.trim().parse::<T>().map_err(|_| ConfigError::Invalid { name, value: v }),
        None => Ok(default),
    }
}
