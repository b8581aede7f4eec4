//! Authentication Middleware
//!
//! Resolves the bearer token on a request to an active user and injects it
//! as an [`AuthenticatedPrincipal`].

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::auth::{jwt::JwtService, models::AuthenticatedPrincipal};
use crate::database::UserDirectory;
use crate::errors::AppError;

/// Per-request authentication: token → subject → user → active check.
///
/// Token failures and unknown subjects produce the same `Unauthenticated`
/// error so clients cannot tell them apart. An inactive account is
/// `Forbidden`.
#[derive(Clone)]
pub struct AuthGate {
    jwt_service: Arc<JwtService>,
    directory: Arc<dyn UserDirectory>,
}

impl AuthGate {
    pub fn new(jwt_service: Arc<JwtService>, directory: Arc<dyn UserDirectory>) -> Self {
        Self {
            jwt_service,
            directory,
        }
    }

    pub async fn authenticate(&self, token: Option<&str>) -> Result<AuthenticatedPrincipal, AppError> {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            tracing::debug!("[AuthGate] No bearer token presented");
            return Err(AppError::credentials());
        };

        let subject = self.jwt_service.validate(token).map_err(|e| {
            tracing::debug!("[AuthGate] Token rejected: {}", e);
            AppError::credentials()
        })?;

        let user = self.directory.find_by_email(&subject).await?.ok_or_else(|| {
            tracing::debug!("[AuthGate] Token subject has no account");
            AppError::credentials()
        })?;

        if !user.is_active {
            tracing::info!("[AuthGate] Inactive user id={} denied", user.id);
            return Err(AppError::Forbidden("Inactive user"));
        }

        Ok(AuthenticatedPrincipal(user))
    }
}

/// Token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") {
        Some(token.trim())
    } else {
        None
    }
}

/// Authentication middleware that validates bearer tokens and injects the principal
pub struct AuthMiddleware;

impl AuthMiddleware {
    pub async fn validate_token(
        State(gate): State<AuthGate>,
        mut req: Request,
        next: Next,
    ) -> Result<Response, AppError> {
        tracing::debug!("[AuthMiddleware] Incoming request: {} {}", req.method(), req.uri());

        let principal = gate.authenticate(bearer_token(req.headers())).await?;

        req.extensions_mut().insert(principal);
        Ok(next.run(req).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::tests::ManualClock;
    use crate::config::AuthConfig;
    use crate::database::{MemoryUserDirectory, NewUser, UserChanges};
    use axum::http::HeaderValue;
    use chrono::{Duration, Utc};

    async fn setup() -> (AuthGate, Arc<JwtService>, Arc<MemoryUserDirectory>, i64) {
        let directory = Arc::new(MemoryUserDirectory::new());
        let user = directory
            .insert(NewUser {
                email: "felipe@example.com".into(),
                full_name: "Felipe Test".into(),
                is_active: true,
                password_hash: "unused".into(),
            })
            .await
            .unwrap();
        let jwt_service = Arc::new(JwtService::new(&AuthConfig::default()));
        let gate = AuthGate::new(jwt_service.clone(), directory.clone());
        (gate, jwt_service, directory, user.id)
    }

    #[tokio::test]
    async fn resolves_active_user() {
        let (gate, jwt, _, id) = setup().await;
        let token = jwt.issue("felipe@example.com").unwrap();
        let principal = gate.authenticate(Some(&token)).await.unwrap();
        assert_eq!(principal.id(), id);
    }

    #[tokio::test]
    async fn missing_token_is_unauthenticated() {
        let (gate, _, _, _) = setup().await;
        assert!(matches!(gate.authenticate(None).await, Err(AppError::Unauthenticated(_))));
        assert!(matches!(gate.authenticate(Some("")).await, Err(AppError::Unauthenticated(_))));
    }

    #[tokio::test]
    async fn token_and_identity_failures_look_the_same() {
        let (gate, jwt, directory, _) = setup().await;

        let garbage = gate.authenticate(Some("garbage")).await.unwrap_err();

        let clock = ManualClock::starting_at(Utc::now() - Duration::hours(2));
        let stale = JwtService::with_clock(&AuthConfig::default(), clock)
            .issue("felipe@example.com")
            .unwrap();
        let expired = gate.authenticate(Some(&stale)).await.unwrap_err();

        let ghost = jwt.issue("ghost@example.com").unwrap();
        let unknown = gate.authenticate(Some(&ghost)).await.unwrap_err();

        let deleted_token = jwt.issue("felipe@example.com").unwrap();
        let user = directory.find_by_email("felipe@example.com").await.unwrap().unwrap();
        directory.delete(user.id).await.unwrap();
        let deleted = gate.authenticate(Some(&deleted_token)).await.unwrap_err();

        for err in [garbage, expired, unknown, deleted] {
            assert!(matches!(err, AppError::Unauthenticated(_)));
            assert_eq!(err.to_string(), "Could not validate credentials");
        }
    }

    #[tokio::test]
    async fn inactive_user_is_forbidden() {
        let (gate, jwt, directory, id) = setup().await;
        let token = jwt.issue("felipe@example.com").unwrap();
        directory
            .update(
                id,
                UserChanges {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(matches!(gate.authenticate(Some(&token)).await, Err(AppError::Forbidden(_))));
    }

    #[test]
    fn extracts_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("bearer abc"));
        assert_eq!(bearer_token(&headers), Some("abc"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic Zm9vOmJhcg=="));
        assert_eq!(bearer_token(&headers), None);
    }
}
