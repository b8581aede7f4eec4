//! # Database Module
//!
//! User Directory persistence: PostgreSQL connection management with
//! tokio-postgres and deadpool, embedded migrations, the user models and the
//! directory backends.

pub mod connection;
pub mod directory;
pub mod migrations;
pub mod models;

pub use connection::{DatabaseConfig, DatabaseConnection};
pub use directory::{DirectoryError, MemoryUserDirectory, PgUserDirectory, UserDirectory};
pub use models::*;
