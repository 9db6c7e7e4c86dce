use axum::{response::{Response, IntoResponse}};
use axum::extract::{Request, State};
use axum::http::{header::AUTHORIZATION, StatusCode};
use axum::middleware::Next;
use crate::auth::jwt::verify_token;
use crate::error::AppError;
use crate::models::user::Role;
use crate::state::AppState;
use serde::Serialize;
use sqlx::PgPool;
use tracing::warn;

#[derive(Clone, Debug)]
pub struct AuthContext {
    pub user_id: i64,
    pub role: Role,
}

impl AuthContext {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_role(&self, role: Role) -> Result<(), AppError> {
        if self.role != role {
            return Err(AppError::forbidden(format!("Only {role} accounts can do this")));
        }
        Ok(())
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        if !self.is_admin() {
            return Err(AppError::forbidden("Admins only"));
        }
        Ok(())
    }

    /// Admins may act on anyone; other users only on themselves.
    pub fn require_self_or_admin(&self, user_id: i64) -> Result<(), AppError> {
        if self.is_admin() || self.user_id == user_id {
            return Ok(());
        }
        Err(AppError::forbidden("You can only access your own records"))
    }
}

#[derive(Serialize)]
struct ErrorBody { error: String, code: &'static str }

/// Builds the request context from the stored account row, never from token claims alone.
/// A deleted or deactivated account loses access even while its token is unexpired.
fn resolve_context(user_id: i64, stored: Option<(String, bool)>) -> Result<AuthContext, &'static str> {
    match stored {
        Some((role, true)) => role
            .parse::<Role>()
            .map(|role| AuthContext { user_id, role })
            .map_err(|_| "Unknown account role"),
        _ => Err("Account not found or inactive"),
    }
}

async fn load_account(db_pool: &PgPool, user_id: i64) -> Result<Option<(String, bool)>, AppError> {
    Ok(sqlx::query_as("SELECT role, is_active FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(db_pool)
        .await?)
}

fn bearer_token(req: &Request) -> Result<&str, &'static str> {
    let header = req.headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or("Missing Authorization header")?;

    // Expect "Bearer <token>"
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .ok_or("Invalid Authorization format")
}

pub async fn require_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let token = match bearer_token(&req) {
        Ok(t) => t,
        Err(msg) => return unauthorized(msg),
    };

    let claims = match verify_token(token, &state.config.jwt_secret) {
        Ok(c) => c,
        Err(e) => return unauthorized(&e.to_string()),
    };

    let stored = match load_account(&state.db_pool, claims.sub).await {
        Ok(row) => row,
        Err(e) => return e.into_response(),
    };

    match resolve_context(claims.sub, stored) {
        Ok(ctx) => {
            req.extensions_mut().insert(ctx);
            next.run(req).await
        }
        Err(msg) => {
            warn!(user_id = claims.sub, "Rejected token for unavailable account");
            unauthorized(msg)
        }
    }
}

/// Attaches an `AuthContext` when a valid bearer token belongs to an active account;
/// anything else passes through as anonymous.
pub async fn optional_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let claims = bearer_token(&req)
        .ok()
        .and_then(|t| verify_token(t, &state.config.jwt_secret).ok());

    if let Some(claims) = claims {
        let stored = match load_account(&state.db_pool, claims.sub).await {
            Ok(row) => row,
            Err(e) => return e.into_response(),
        };
        if let Ok(ctx) = resolve_context(claims.sub, stored) {
            req.extensions_mut().insert(ctx);
        }
    }
    next.run(req).await
}

fn unauthorized(msg: &str) -> Response {
    let body = axum::Json(ErrorBody { error: msg.to_string(), code: "unauthorized" });
    (StatusCode::UNAUTHORIZED, body).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(role: Role) -> AuthContext {
        AuthContext { user_id: 7, role }
    }

    #[test]
    fn admin_checks() {
        assert!(ctx(Role::Admin).require_admin().is_ok());
        assert!(matches!(ctx(Role::Customer).require_admin(), Err(AppError::Forbidden(_))));
    }

    #[test]
    fn role_checks() {
        assert!(ctx(Role::Affiliate).require_role(Role::Affiliate).is_ok());
        assert!(ctx(Role::Customer).require_role(Role::Affiliate).is_err());
    }

    #[test]
    fn self_or_admin() {
        assert!(ctx(Role::Customer).require_self_or_admin(7).is_ok());
        assert!(ctx(Role::Customer).require_self_or_admin(8).is_err());
        assert!(ctx(Role::Admin).require_self_or_admin(8).is_ok());
    }

    #[test]
    fn stored_role_wins_over_token() {
        let ctx = resolve_context(7, Some(("customer".into(), true))).unwrap();
        assert_eq!(ctx.role, Role::Customer);
        assert_eq!(ctx.user_id, 7);
    }

    #[test]
    fn missing_or_inactive_accounts_are_rejected() {
        assert!(resolve_context(7, None).is_err());
        assert!(resolve_context(7, Some(("admin".into(), false))).is_err());
        assert!(resolve_context(7, Some(("root".into(), true))).is_err());
    }
}
