use axum::{extract::{Path, Query, State}, Json, Extension};
use axum::http::StatusCode;
use sqlx::{Postgres, Transaction};
use tracing::{info, instrument};
use crate::auth::jwt::sign_token;
use crate::auth::password::{hash_password, validate_password, verify_password};
use crate::auth::phone::{normalize_phone, phones_match};
use crate::dtos::common::{non_blank, MessageResponse, Paginated};
use crate::dtos::user::{
    AdminUpdateUserRequest, ChangePasswordRequest, LoginRequest, LoginResponse,
    RegisterUserRequest, UpdateProfileRequest, UserListParams, UserResponse,
};
use crate::error::{map_unique_violation, AppError};
use crate::middleware::auth::AuthContext;
use crate::models::party::referral_code;
use crate::models::user::{Role, User};
use crate::state::AppState;

const USER_COLUMNS: &str = "id, email, phone, password_hash, full_name, role, is_active, created_at, updated_at";

fn normalize_email(email: &str) -> Result<String, AppError> {
    let email = email.trim().to_lowercase();
    let valid = email
        .split_once('@')
        .map(|(local, domain)| !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.'))
        .unwrap_or(false);
    if !valid || email.chars().any(char::is_whitespace) {
        return Err(AppError::validation("Invalid email address"));
    }
    Ok(email)
}

fn normalize_optional_phone(phone: Option<String>, country_code: &str) -> Result<Option<String>, AppError> {
    match non_blank(phone) {
        Some(p) => normalize_phone(&p, country_code)
            .map(Some)
            .map_err(|e| AppError::validation(e.to_string())),
        None => Ok(None),
    }
}

pub(crate) async fn fetch_user(db: impl sqlx::PgExecutor<'_>, id: i64) -> Result<User, AppError> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))
}

/// Creates the affiliate or customer row that goes with a user's role.
async fn attach_role_profile(
    tx: &mut Transaction<'_, Postgres>,
    user_id: i64,
    role: Role,
    referred_by: Option<i64>,
) -> Result<(), AppError> {
    match role {
        Role::Affiliate => {
            let affiliate_id: Option<i64> = sqlx::query_scalar(
                "INSERT INTO affiliates (user_id) VALUES ($1)
                 ON CONFLICT (user_id) DO NOTHING
                 RETURNING id"
            )
            .bind(user_id)
            .fetch_optional(&mut **tx)
            .await?;

            if let Some(id) = affiliate_id {
                sqlx::query("UPDATE affiliates SET referral_code = $1 WHERE id = $2")
                    .bind(referral_code(id))
                    .bind(id)
                    .execute(&mut **tx)
                    .await?;
            }
        }
        Role::Customer => {
            sqlx::query(
                "INSERT INTO customers (user_id, affiliate_id) VALUES ($1, $2)
                 ON CONFLICT (user_id) DO NOTHING"
            )
            .bind(user_id)
            .bind(referred_by)
            .execute(&mut **tx)
            .await?;
        }
        Role::Admin => {}
    }
    Ok(())
}

// POST /users/register
#[instrument(skip(state, payload))]
pub async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterUserRequest>
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let full_name = payload.full_name.trim().to_string();
    if full_name.is_empty() {
        return Err(AppError::validation("Full name required"));
    }
    let email = normalize_email(&payload.email)?;
    validate_password(&payload.password)?;
    let phone = normalize_optional_phone(payload.phone, &state.config.phone_country_code)?;

    let role = match non_blank(payload.account_type) {
        Some(t) => t.parse::<Role>().map_err(AppError::validation)?,
        None => Role::Customer,
    };
    if role == Role::Admin {
        return Err(AppError::validation("Invalid account type"));
    }

    let password_hash = hash_password(&payload.password)?;
    let mut tx = state.db_pool.begin().await?;

    let referred_by = match (role, non_blank(payload.referral_code)) {
        (Role::Customer, Some(code)) => {
            let id: i64 = sqlx::query_scalar(
                "SELECT a.id FROM affiliates a
                 JOIN users u ON u.id = a.user_id AND u.role = 'affiliate' AND u.is_active
                 WHERE UPPER(a.referral_code) = UPPER($1) AND a.status = 'active'"
            )
            .bind(&code)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::validation("Unknown referral code"))?;
            Some(id)
        }
        _ => None,
    };

    let user = sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (email, phone, password_hash, full_name, role)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING {USER_COLUMNS}"
    ))
    .bind(&email)
    .bind(&phone)
    .bind(&password_hash)
    .bind(&full_name)
    .bind(role.as_str())
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| map_unique_violation(e, "Email or phone already registered"))?;

    attach_role_profile(&mut tx, user.id, role, referred_by).await?;
    tx.commit().await?;

    info!(user_id = user.id, role = %role, "User registered");
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

// POST /users/login
#[instrument(skip(state, payload))]
pub async fn login_user(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>
) -> Result<Json<LoginResponse>, AppError> {
    let identifier = payload.identifier.trim();
    if identifier.is_empty() {
        return Err(AppError::validation("Email or phone required"));
    }
    if payload.password.is_empty() {
        return Err(AppError::validation("Password required"));
    }

    let found = if identifier.contains('@') {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(identifier.to_lowercase())
            .fetch_optional(&state.db_pool)
            .await?
    } else {
        let phone = normalize_phone(identifier, &state.config.phone_country_code)
            .map_err(|_| AppError::not_found("Invalid credentials"))?;
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE phone = $1"))
            .bind(phone)
            .fetch_optional(&state.db_pool)
            .await?
    };
    let user = found.ok_or_else(|| AppError::not_found("Invalid credentials"))?;

    if !user.is_active {
        return Err(AppError::conflict("User inactive"));
    }

    if !verify_password(&payload.password, &user.password_hash)? {
        return Err(AppError::validation("Invalid credentials"));
    }

    let ttl = state.config.jwt_ttl_hours;
    let token = sign_token(user.id, &user.role, &user.email, &state.config.jwt_secret, ttl)?;

    Ok(Json(LoginResponse {
        access_token: token,
        token_type: "Bearer",
        expires_in_seconds: ttl * 60 * 60,
        user: UserResponse::from(user),
    }))
}

// GET /users/me
pub async fn get_me(
    State(AppState { db_pool, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>
) -> Result<Json<UserResponse>, AppError> {
    fetch_user(&db_pool, auth.user_id).await.map(UserResponse::from).map(Json)
}

// PUT /users/me
#[instrument(skip(state, payload), fields(user_id = auth.user_id))]
pub async fn update_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let full_name = non_blank(payload.full_name);
    let country_code = &state.config.phone_country_code;
    let mut phone = normalize_optional_phone(payload.phone, country_code)?;

    let current = fetch_user(&state.db_pool, auth.user_id).await?;
    if let (Some(new), Some(old)) = (phone.as_deref(), current.phone.as_deref()) {
        if phones_match(new, old, country_code) {
            phone = None;
        }
    }
    if phone.is_some() {
        info!("Phone number changed");
    }

    let user = sqlx::query_as::<_, User>(&format!(
        "UPDATE users SET
            full_name = COALESCE($1, full_name),
            phone = COALESCE($2, phone),
            updated_at = NOW()
         WHERE id = $3
         RETURNING {USER_COLUMNS}"
    ))
    .bind(full_name)
    .bind(phone)
    .bind(auth.user_id)
    .fetch_optional(&state.db_pool)
    .await
    .map_err(|e| map_unique_violation(e, "Phone already registered"))?
    .ok_or_else(|| AppError::not_found("User not found"))?;

    Ok(Json(UserResponse::from(user)))
}

// PUT /users/me/password
#[instrument(skip(db_pool, payload), fields(user_id = auth.user_id))]
pub async fn change_password(
    State(AppState { db_pool, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    validate_password(&payload.new_password)?;
    let user = fetch_user(&db_pool, auth.user_id).await?;

    if !verify_password(&payload.current_password, &user.password_hash)? {
        return Err(AppError::validation("Current password is incorrect"));
    }

    let password_hash = hash_password(&payload.new_password)?;
    sqlx::query("UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2")
        .bind(password_hash)
        .bind(auth.user_id)
        .execute(&db_pool)
        .await?;

    Ok(Json(MessageResponse::ok("Password updated")))
}

// GET /users (admin)
#[instrument(skip(db_pool, auth))]
pub async fn list_users(
    State(AppState { db_pool, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<UserListParams>,
) -> Result<Json<Paginated<UserResponse>>, AppError> {
    auth.require_admin()?;

    let role = match non_blank(params.role.clone()) {
        Some(r) => Some(r.parse::<Role>().map_err(AppError::validation)?.as_str()),
        None => None,
    };
    let search = non_blank(params.search.clone()).map(|s| format!("%{}%", s.to_lowercase()));
    let paging = params.paging();

    let filter = "($1::TEXT IS NULL OR role = $1)
        AND ($2::TEXT IS NULL OR LOWER(email) LIKE $2 OR LOWER(full_name) LIKE $2 OR phone LIKE $2)";

    let users = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE {filter} ORDER BY created_at DESC LIMIT $3 OFFSET $4"
    ))
    .bind(role)
    .bind(&search)
    .bind(paging.limit())
    .bind(paging.offset())
    .fetch_all(&db_pool)
    .await?;

    let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM users WHERE {filter}"))
        .bind(role)
        .bind(&search)
        .fetch_one(&db_pool)
        .await?;

    let data = users.into_iter().map(UserResponse::from).collect();
    Ok(Json(Paginated::new(data, total, &paging)))
}

// GET /users/{id} (admin)
pub async fn get_user(
    State(AppState { db_pool, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<UserResponse>, AppError> {
    auth.require_self_or_admin(id)?;
    fetch_user(&db_pool, id).await.map(UserResponse::from).map(Json)
}

// PATCH /users/{id} (admin)
#[instrument(skip(db_pool, auth, payload))]
pub async fn update_user(
    State(AppState { db_pool, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(payload): Json<AdminUpdateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    auth.require_admin()?;

    let role = match non_blank(payload.role) {
        Some(r) => Some(r.parse::<Role>().map_err(AppError::validation)?),
        None => None,
    };
    if id == auth.user_id && (payload.is_active == Some(false) || role.is_some_and(|r| r != Role::Admin)) {
        return Err(AppError::validation("You cannot demote or deactivate yourself"));
    }

    let mut tx = db_pool.begin().await?;
    let user = sqlx::query_as::<_, User>(&format!(
        "UPDATE users SET
            role = COALESCE($1, role),
            is_active = COALESCE($2, is_active),
            updated_at = NOW()
         WHERE id = $3
         RETURNING {USER_COLUMNS}"
    ))
    .bind(role.map(|r| r.as_str()))
    .bind(payload.is_active)
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::not_found("User not found"))?;

    if let Some(role) = role {
        attach_role_profile(&mut tx, user.id, role, None).await?;
    }
    tx.commit().await?;

    info!(user_id = id, role = %user.role, is_active = user.is_active, "User updated by admin");
    Ok(Json(UserResponse::from(user)))
}

// DELETE /users/{id} (admin)
#[instrument(skip(db_pool, auth))]
pub async fn delete_user(
    State(AppState { db_pool, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, AppError> {
    auth.require_admin()?;
    if id == auth.user_id {
        return Err(AppError::validation("You cannot delete yourself"));
    }

    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(&db_pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23503") => {
                AppError::conflict("User has orders; deactivate the account instead")
            }
            other => AppError::db(other),
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("User not found"));
    }

    Ok(Json(MessageResponse::ok("User deleted")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails_are_lowercased_and_checked() {
        assert_eq!(normalize_email("  Lan@Shop.VN ").unwrap(), "lan@shop.vn");
        assert!(normalize_email("no-at-sign").is_err());
        assert!(normalize_email("@shop.vn").is_err());
        assert!(normalize_email("lan@localhost").is_err());
        assert!(normalize_email("la n@shop.vn").is_err());
    }

    #[test]
    fn optional_phone_is_normalized_or_skipped() {
        assert_eq!(normalize_optional_phone(None, "84").unwrap(), None);
        assert_eq!(normalize_optional_phone(Some("  ".into()), "84").unwrap(), None);
        assert_eq!(
            normalize_optional_phone(Some("0912 345 678".into()), "84").unwrap(),
            Some("+84912345678".to_string())
        );
        assert!(normalize_optional_phone(Some("12".into()), "84").is_err());
    }
}
