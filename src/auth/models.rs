//! Authentication Models
//!
//! Data structures for authentication requests, responses, and the
//! authenticated principal.

use serde::{Deserialize, Serialize};

use crate::database::User;

/// The active user a request was authenticated as
#[derive(Debug, Clone)]
pub struct AuthenticatedPrincipal(pub User);

impl AuthenticatedPrincipal {
    pub fn id(&self) -> i64 {
        self.0.id
    }

    pub fn user(&self) -> &User {
        &self.0
    }
}

/// OAuth2 password-grant style login form
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    /// The account email
    pub username: String,
    pub password: String,
}

/// Token response after successful authentication
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

impl TokenResponse {
    pub fn new(access_token: String, expires_in: i64) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
            expires_in,
        }
    }
}
