//! Account Service
//!
//! User-facing account operations built on the directory, the password
//! hasher, the token service and the ownership policy.

use std::sync::Arc;

use anyhow::Context;

use crate::auth::{AuthenticatedPrincipal, JwtService, TokenResponse, password, policy};
use crate::database::{NewUser, User, UserChanges, UserDirectory, UserOut, normalize_email};
use crate::errors::AppError;
use crate::services::validation::{UserCreate, UserUpdate};

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Clone)]
pub struct AccountService {
    directory: Arc<dyn UserDirectory>,
    jwt_service: Arc<JwtService>,
}

async fn hash_off_thread(plaintext: String) -> Result<String, AppError> {
    let hash = tokio::task::spawn_blocking(move || password::hash_password(&plaintext))
        .await
        .context("Password hashing task failed")??;
    Ok(hash)
}

// Spends the cost of a verification when there is no account to check.
async fn verify_dummy_off_thread(plaintext: String) -> Result<(), AppError> {
    tokio::task::spawn_blocking(move || password::verify_against_dummy(&plaintext))
        .await
        .context("Password verification task failed")?;
    Ok(())
}

async fn verify_off_thread(plaintext: String, hash: String) -> Result<bool, AppError> {
    let ok = tokio::task::spawn_blocking(move || password::verify_password(&plaintext, &hash))
        .await
        .context("Password verification task failed")?;
    Ok(ok)
}

impl AccountService {
    pub fn new(directory: Arc<dyn UserDirectory>, jwt_service: Arc<JwtService>) -> Self {
        Self {
            directory,
            jwt_service,
        }
    }

    /// Exchange credentials for an access token.
    ///
    /// Unknown email and wrong password fail identically.
    pub async fn login(&self, email: &str, plaintext: &str) -> Result<TokenResponse, AppError> {
        let rejected = || AppError::Unauthenticated("Incorrect email or password");

        let Some(user) = self.directory.find_by_email(&normalize_email(email)).await? else {
            verify_dummy_off_thread(plaintext.to_string()).await?;
            tracing::info!("Login failed");
            return Err(rejected());
        };

        if !verify_off_thread(plaintext.to_string(), user.password_hash.clone()).await? {
            tracing::info!("Login failed");
            return Err(rejected());
        }

        let access_token = self.jwt_service.issue(&user.email)?;
        tracing::info!("User id={} logged in", user.id);
        Ok(TokenResponse::new(access_token, self.jwt_service.expires_in()))
    }

    pub async fn create_user(&self, data: UserCreate) -> Result<UserOut, AppError> {
        data.validate()?;

        let email = normalize_email(&data.email);
        if self.directory.find_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("Email already registered"));
        }

        let password_hash = hash_off_thread(data.password).await?;
        let user = self
            .directory
            .insert(NewUser {
                email,
                full_name: data.full_name,
                is_active: data.is_active,
                password_hash,
            })
            .await?;

        tracing::info!("Created user id={}", user.id);
        Ok(user.into())
    }

    pub async fn list_users(&self, skip: Option<i64>, limit: Option<i64>) -> Result<Vec<UserOut>, AppError> {
        let skip = skip.unwrap_or(0).max(0);
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let users = self.directory.list(skip, limit).await?;
        Ok(users.into_iter().map(UserOut::from).collect())
    }

    pub async fn get_user(&self, id: i64) -> Result<UserOut, AppError> {
        self.find_existing(id).await.map(UserOut::from)
    }

    pub async fn update_user(
        &self,
        principal: &AuthenticatedPrincipal,
        id: i64,
        payload: serde_json::Value,
    ) -> Result<UserOut, AppError> {
        let user = self.find_existing(id).await?;
        policy::authorize(principal, user.id)?;
        let data = UserUpdate::from_value(payload)?;
        data.validate()?;

        let email = data.email.as_deref().map(normalize_email);
        if let Some(email) = &email {
            if let Some(owner) = self.directory.find_by_email(email).await? {
                if owner.id != user.id {
                    return Err(AppError::Conflict("Email already registered"));
                }
            }
        }

        let password_hash = match data.password {
            Some(plaintext) => Some(hash_off_thread(plaintext).await?),
            None => None,
        };

        let changes = UserChanges {
            email,
            full_name: data.full_name,
            is_active: data.is_active,
            password_hash,
        };

        let updated = self
            .directory
            .update(user.id, changes)
            .await?
            .ok_or(AppError::NotFound("User not found"))?;

        tracing::info!("Updated user id={}", updated.id);
        Ok(updated.into())
    }

    pub async fn delete_user(&self, principal: &AuthenticatedPrincipal, id: i64) -> Result<(), AppError> {
        let user = self.find_existing(id).await?;
        policy::authorize(principal, user.id)?;

        if !self.directory.delete(user.id).await? {
            return Err(AppError::NotFound("User not found"));
        }

        tracing::info!("Deleted user id={}", user.id);
        Ok(())
    }

    async fn find_existing(&self, id: i64) -> Result<User, AppError> {
        self.directory
            .find_by_id(id)
            .await?
            .ok_or(AppError::NotFound("User not found"))
    }
}
