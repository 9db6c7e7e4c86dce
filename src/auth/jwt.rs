use chrono::{Utc, Duration};
use jsonwebtoken::{encode, decode, Header, Validation, EncodingKey, DecodingKey, Algorithm};
use serde::{Serialize, Deserialize};
use crate::error::AppError;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub role: String,
    pub exp: usize,
    pub iat: usize,
    pub email: String,
}

pub fn sign_token(user_id: i64, role: &str, email: &str, secret: &str, ttl_hours: i64) -> Result<String, AppError> {
    let now = Utc::now();
    let exp = now + Duration::hours(ttl_hours);
    let claims = Claims {
        sub: user_id,
        role: role.to_string(),
        iat: now.timestamp() as usize,
        exp: exp.timestamp() as usize,
        email: email.to_string(),
    };
    encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| AppError::internal(format!("Token signing failed: {e}")))
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256)
    )
    .map(|d| d.claims)
    .map_err(|e| AppError::unauthorized(format!("Invalid or expired token: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_token_verifies_with_same_secret() {
        let token = sign_token(42, "affiliate", "a@shop.test", "s3cret", 8).unwrap();
        let claims = verify_token(&token, "s3cret").unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.role, "affiliate");
        assert_eq!(claims.email, "a@shop.test");
        assert_eq!(claims.exp - claims.iat, 8 * 60 * 60);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = sign_token(1, "admin", "root@shop.test", "one", 1).unwrap();
        assert!(matches!(verify_token(&token, "two"), Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn tampered_token_is_rejected() {
        let token = sign_token(1, "customer", "c@shop.test", "key", 1).unwrap();
        let forged = sign_token(1, "admin", "c@shop.test", "other", 1).unwrap();
        let forged_payload = forged.split('.').nth(1).unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let tampered = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);
        assert!(verify_token(&tampered, "key").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = sign_token(1, "customer", "c@shop.test", "key", -2).unwrap();
        assert!(verify_token(&token, "key").is_err());
    }
}
