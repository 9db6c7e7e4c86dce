use axum::{Router, routing::{get, post, put}, middleware};
use crate::state::AppState;
use crate::handlers::user::{
    register_user, login_user, get_me, update_me, change_password, list_users, get_user, update_user, delete_user,
};
use crate::middleware::auth::require_auth;

pub fn routes(state: &AppState) -> Router<AppState> {
    let open = Router::new()
        .route("/users/register", post(register_user))
        .route("/users/login", post(login_user));

    let protected = Router::new()
        .route("/users/me", get(get_me).put(update_me))
        .route("/users/me/password", put(change_password))
        .route("/users", get(list_users))
        .route("/users/{id}", get(get_user).patch(update_user).delete(delete_user))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    open.merge(protected)
}
