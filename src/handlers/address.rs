use axum::{extract::{Path, State}, Extension, Json};
use axum::http::StatusCode;
use tracing::instrument;
use crate::auth::phone::normalize_phone;
use crate::dtos::address::{AddressRequest, AddressResponse};
use crate::dtos::common::{non_blank, MessageResponse};
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::models::party::Address;
use crate::state::AppState;

const ADDRESS_COLUMNS: &str =
    "id, recipient_name, phone, line1, line2, city, province, postal_code, is_default, created_at";

struct CleanAddress {
    recipient_name: String,
    phone: String,
    line1: String,
    line2: Option<String>,
    city: String,
    province: Option<String>,
    postal_code: Option<String>,
}

fn clean(req: AddressRequest, country_code: &str) -> Result<CleanAddress, AppError> {
    let recipient_name = req.recipient_name.trim().to_string();
    let line1 = req.line1.trim().to_string();
    let city = req.city.trim().to_string();
    if recipient_name.is_empty() || line1.is_empty() || city.is_empty() {
        return Err(AppError::validation("Recipient name, address line and city are required"));
    }
    let phone = normalize_phone(&req.phone, country_code).map_err(|e| AppError::validation(e.to_string()))?;

    Ok(CleanAddress {
        recipient_name,
        phone,
        line1,
        line2: non_blank(req.line2),
        city,
        province: non_blank(req.province),
        postal_code: non_blank(req.postal_code),
    })
}

pub(crate) async fn fetch_owned_address(
    db: impl sqlx::PgExecutor<'_>,
    id: i64,
    user_id: i64,
) -> Result<Address, AppError> {
    sqlx::query_as::<_, Address>(&format!(
        "SELECT {ADDRESS_COLUMNS} FROM addresses WHERE id = $1 AND user_id = $2"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| AppError::not_found("Address not found"))
}

pub async fn list_addresses(
    State(AppState { db_pool, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<AddressResponse>>, AppError> {
    let addresses = sqlx::query_as::<_, Address>(&format!(
        "SELECT {ADDRESS_COLUMNS} FROM addresses WHERE user_id = $1 ORDER BY is_default DESC, created_at"
    ))
    .bind(auth.user_id)
    .fetch_all(&db_pool)
    .await?;

    Ok(Json(addresses.into_iter().map(AddressResponse::from).collect()))
}

#[instrument(skip(state, req), fields(user_id = auth.user_id))]
pub async fn create_address(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<AddressRequest>,
) -> Result<(StatusCode, Json<AddressResponse>), AppError> {
    let wants_default = req.is_default.unwrap_or(false);
    let a = clean(req, &state.config.phone_country_code)?;
    let mut tx = state.db_pool.begin().await?;

    let has_any: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM addresses WHERE user_id = $1)")
        .bind(auth.user_id)
        .fetch_one(&mut *tx)
        .await?;
    // The first address is always the default.
    let is_default = wants_default || !has_any;

    if is_default {
        sqlx::query("UPDATE addresses SET is_default = FALSE WHERE user_id = $1")
            .bind(auth.user_id)
            .execute(&mut *tx)
            .await?;
    }

    let address = sqlx::query_as::<_, Address>(&format!(
        "INSERT INTO addresses (user_id, recipient_name, phone, line1, line2, city, province, postal_code, is_default)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
         RETURNING {ADDRESS_COLUMNS}"
    ))
    .bind(auth.user_id)
    .bind(a.recipient_name)
    .bind(a.phone)
    .bind(a.line1)
    .bind(a.line2)
    .bind(a.city)
    .bind(a.province)
    .bind(a.postal_code)
    .bind(is_default)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok((StatusCode::CREATED, Json(AddressResponse::from(address))))
}

#[instrument(skip(state, req), fields(user_id = auth.user_id))]
pub async fn update_address(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(req): Json<AddressRequest>,
) -> Result<Json<AddressResponse>, AppError> {
    let make_default = req.is_default == Some(true);
    let a = clean(req, &state.config.phone_country_code)?;
    let mut tx = state.db_pool.begin().await?;

    fetch_owned_address(&mut *tx, id, auth.user_id).await?;

    if make_default {
        sqlx::query("UPDATE addresses SET is_default = FALSE WHERE user_id = $1")
            .bind(auth.user_id)
            .execute(&mut *tx)
            .await?;
    }

    let address = sqlx::query_as::<_, Address>(&format!(
        "UPDATE addresses SET
            recipient_name = $1, phone = $2, line1 = $3, line2 = $4, city = $5,
            province = $6, postal_code = $7, is_default = is_default OR $8
         WHERE id = $9 AND user_id = $10
         RETURNING {ADDRESS_COLUMNS}"
    ))
    .bind(a.recipient_name)
    .bind(a.phone)
    .bind(a.line1)
    .bind(a.line2)
    .bind(a.city)
    .bind(a.province)
    .bind(a.postal_code)
    .bind(make_default)
    .bind(id)
    .bind(auth.user_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(Json(AddressResponse::from(address)))
}

#[instrument(skip(db_pool), fields(user_id = auth.user_id))]
pub async fn set_default_address(
    State(AppState { db_pool, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<AddressResponse>, AppError> {
    let mut tx = db_pool.begin().await?;
    fetch_owned_address(&mut *tx, id, auth.user_id).await?;

    sqlx::query("UPDATE addresses SET is_default = (id = $1) WHERE user_id = $2")
        .bind(id)
        .bind(auth.user_id)
        .execute(&mut *tx)
        .await?;

    let address = fetch_owned_address(&mut *tx, id, auth.user_id).await?;
    tx.commit().await?;
    Ok(Json(AddressResponse::from(address)))
}

#[instrument(skip(db_pool), fields(user_id = auth.user_id))]
pub async fn delete_address(
    State(AppState { db_pool, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, AppError> {
    let mut tx = db_pool.begin().await?;
    let address = fetch_owned_address(&mut *tx, id, auth.user_id).await?;

    sqlx::query("DELETE FROM addresses WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    // Promote the oldest remaining address when the default goes away.
    if address.is_default {
        sqlx::query(
            "UPDATE addresses SET is_default = TRUE
             WHERE id = (SELECT id FROM addresses WHERE user_id = $1 ORDER BY created_at, id LIMIT 1)"
        )
        .bind(auth.user_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(Json(MessageResponse::ok("Address deleted")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(phone: &str, city: &str) -> AddressRequest {
        AddressRequest {
            recipient_name: " Minh ".into(),
            phone: phone.into(),
            line1: "1 Le Loi".into(),
            line2: Some("".into()),
            city: city.into(),
            province: None,
            postal_code: None,
            is_default: None,
        }
    }

    #[test]
    fn clean_trims_and_normalizes() {
        let a = clean(request("0912345678", "HCMC"), "84").unwrap();
        assert_eq!(a.recipient_name, "Minh");
        assert_eq!(a.phone, "+84912345678");
        assert_eq!(a.line2, None);
    }

    #[test]
    fn clean_rejects_missing_fields_and_bad_phone() {
        assert!(clean(request("0912345678", "  "), "84").is_err());
        assert!(clean(request("abc", "HCMC"), "84").is_err());
    }
}
