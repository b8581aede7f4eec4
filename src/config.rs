//! Configuration module for environment variables and application settings

use std::env;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow, bail};
use jsonwebtoken::Algorithm;

/// Secret used when `JWT_SECRET` is not set. Only acceptable for local development.
pub const INSECURE_DEFAULT_SECRET: &str = "change_this_in_production";

/// Upper bound on `ACCESS_TOKEN_EXPIRE_MINUTES`, one year.
pub const MAX_TOKEN_TTL_MINUTES: i64 = 365 * 24 * 60;

/// Application configuration loaded once at startup and passed explicitly
#[derive(Debug, Clone)]
pub struct Config {
    /// Token signing configuration
    pub auth: AuthConfig,

    /// User directory backend configuration
    pub database: DatabaseSettings,

    /// Server configuration
    pub server: ServerConfig,
}

#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_algorithm: Algorithm,
    /// Access token lifetime in minutes
    pub access_token_expire_minutes: i64,
}

// The secret stays out of debug output.
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("jwt_algorithm", &self.jwt_algorithm)
            .field("access_token_expire_minutes", &self.access_token_expire_minutes)
            .finish()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: INSECURE_DEFAULT_SECRET.to_string(),
            jwt_algorithm: Algorithm::HS256,
            access_token_expire_minutes: 60,
        }
    }
}

impl AuthConfig {
    pub fn uses_insecure_secret(&self) -> bool {
        self.jwt_secret == INSECURE_DEFAULT_SECRET
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    /// PostgreSQL URL. `None` selects the in-memory directory.
    pub url: Option<String>,
    pub max_connections: usize,
    pub ssl: bool,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let jwt_algorithm = parse_algorithm(
            &env::var("JWT_ALGORITHM").unwrap_or_else(|_| "HS256".to_string()),
        )?;

        let access_token_expire_minutes =
            check_ttl_minutes(parse_var("ACCESS_TOKEN_EXPIRE_MINUTES", 60)?)?;

        // PORT wins so platform-assigned ports work without extra setup
        let port = match env::var("PORT") {
            Ok(port) => port.parse().context("PORT must be a valid port number")?,
            Err(_) => parse_var("SERVER_PORT", 3000)?,
        };

        Ok(Self {
            auth: AuthConfig {
                jwt_secret: env::var("JWT_SECRET")
                    .unwrap_or_else(|_| INSECURE_DEFAULT_SECRET.to_string()),
                jwt_algorithm,
                access_token_expire_minutes,
            },

            database: DatabaseSettings {
                url: env::var("DATABASE_URL").ok().filter(|url| !url.trim().is_empty()),
                max_connections: parse_var("DATABASE_MAX_CONNECTIONS", 16)?,
                ssl: parse_var("DATABASE_SSL", false)?,
            },

            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port,
            },
        })
    }
}

/// Parse an HMAC algorithm identifier. Asymmetric algorithms are rejected
/// because tokens are signed with a shared secret.
pub fn parse_algorithm(name: &str) -> Result<Algorithm> {
    let algorithm = Algorithm::from_str(name.trim())
        .map_err(|_| anyhow!("unknown JWT_ALGORITHM '{}'", name))?;

    match algorithm {
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => Ok(algorithm),
        other => bail!("JWT_ALGORITHM {:?} is not an HMAC algorithm", other),
    }
}

pub fn check_ttl_minutes(minutes: i64) -> Result<i64> {
    if !(1..=MAX_TOKEN_TTL_MINUTES).contains(&minutes) {
        bail!(
            "ACCESS_TOKEN_EXPIRE_MINUTES must be between 1 and {}, got {}",
            MAX_TOKEN_TTL_MINUTES,
            minutes
        );
    }
    Ok(minutes)
}

fn parse_var<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value '{}'", key, raw)),
        Err(_) => Ok(default),
    }
}
