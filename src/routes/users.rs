//! User record routes.
//!
//! Creation is open; every other route runs behind the authentication
//! middleware, and update/delete are further restricted to the record owner.

use axum::{
    Extension, Json, Router,
    extract::State,
    http::StatusCode,
    middleware,
    routing::{get, post},
};
use serde::Deserialize;

use crate::auth::{AuthGate, AuthMiddleware, AuthenticatedPrincipal};
use crate::database::UserOut;
use crate::errors::AppError;
use crate::routes::extract::{ApiJson, ApiPath, ApiQuery};
use crate::server::AppState;
use crate::services::validation::UserCreate;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

pub async fn create_user(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<UserCreate>,
) -> Result<(StatusCode, Json<UserOut>), AppError> {
    let user = state.accounts.create_user(payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn list_users(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> Result<Json<Vec<UserOut>>, AppError> {
    let users = state.accounts.list_users(params.skip, params.limit).await?;
    Ok(Json(users))
}

pub async fn read_me(Extension(principal): Extension<AuthenticatedPrincipal>) -> Json<UserOut> {
    Json(UserOut::from(principal.user()))
}

pub async fn get_user(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<i64>,
) -> Result<Json<UserOut>, AppError> {
    Ok(Json(state.accounts.get_user(user_id).await?))
}

pub async fn update_user(
    State(state): State<AppState>,
    Extension(principal): Extension<AuthenticatedPrincipal>,
    ApiPath(user_id): ApiPath<i64>,
    ApiJson(payload): ApiJson<serde_json::Value>,
) -> Result<Json<UserOut>, AppError> {
    // Field types are checked by the service, after ownership.
    let user = state.accounts.update_user(&principal, user_id, payload).await?;
    Ok(Json(user))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Extension(principal): Extension<AuthenticatedPrincipal>,
    ApiPath(user_id): ApiPath<i64>,
) -> Result<StatusCode, AppError> {
    state.accounts.delete_user(&principal, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn create_user_routes(gate: AuthGate) -> Router<AppState> {
    let protected = Router::new()
        .route("/api/v1/users", get(list_users))
        .route("/api/v1/users/me", get(read_me))
        .route(
            "/api/v1/users/{user_id}",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route_layer(middleware::from_fn_with_state(gate, AuthMiddleware::validate_token));

    Router::new()
        .route("/api/v1/users", post(create_user))
        .merge(protected)
}
