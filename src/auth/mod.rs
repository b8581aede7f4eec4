//! # Authentication Module
//!
//! Password hashing, JWT issuance and validation, the per-request
//! authentication gate and the ownership policy for user records.

pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;
pub mod policy;

pub use jwt::JwtService;
pub use middleware::{AuthGate, AuthMiddleware};
pub use models::{AuthenticatedPrincipal, LoginForm, TokenResponse};
