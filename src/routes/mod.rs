// # Routes Module
//
// HTTP route handlers, grouped by API area:
// - `health`: liveness endpoint
// - `auth`: login
// - `users`: user record CRUD
// - `extract`: extractors that reject with `AppError`

/// Extractors with JSON error bodies
pub mod extract;

/// Health check endpoint
pub mod health;

/// Login endpoint
pub mod auth;

/// User record endpoints
pub mod users;
