//! Auth routes: password login

use axum::{Json, Router, extract::State, routing::post};

use crate::auth::{LoginForm, TokenResponse};
use crate::errors::AppError;
use crate::routes::extract::ApiForm;
use crate::server::AppState;

/// Exchange an email and password for a bearer token.
///
/// Accepts an `application/x-www-form-urlencoded` body with `username`
/// (the email) and `password`.
pub async fn login(
    State(app_state): State<AppState>,
    ApiForm(form): ApiForm<LoginForm>,
) -> Result<Json<TokenResponse>, AppError> {
    let tokens = app_state.accounts.login(&form.username, &form.password).await?;
    Ok(Json(tokens))
}

pub fn create_auth_routes() -> Router<AppState> {
    Router::new().route("/api/v1/auth/login", post(login))
}
