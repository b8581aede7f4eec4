//! JWT Token Service
//!
//! Issues and validates signed, time-limited access tokens whose subject is
//! the user's email. Tokens are never stored server-side and stay valid
//! until they expire; there is no revocation list.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;

/// Source of the current instant
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// JWT Claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// User email
    pub sub: String,
    /// Token issued at timestamp
    pub iat: i64,
    /// Token expiration timestamp
    pub exp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// Signature mismatch, tampered content, or a foreign algorithm
    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token has expired")]
    Expired,

    #[error("token is malformed")]
    Malformed,
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => TokenError::InvalidSignature,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Malformed,
        }
    }
}

/// JWT Service for token operations
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    validation: Validation,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl JwtService {
    pub fn new(config: &AuthConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &AuthConfig, clock: Arc<dyn Clock>) -> Self {
        let secret = config.jwt_secret.as_bytes();

        // Only the configured algorithm is accepted. Expiry is checked
        // against `clock` in `validate`, without leeway.
        let mut validation = Validation::new(config.jwt_algorithm);
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            algorithm: config.jwt_algorithm,
            validation,
            ttl: Duration::try_minutes(config.access_token_expire_minutes).unwrap_or(Duration::MAX),
            clock,
        }
    }

    /// Issue a token for `subject` expiring one TTL from now
    pub fn issue(&self, subject: &str) -> Result<String> {
        let now = self.clock.now();
        let expires_at = now
            .checked_add_signed(self.ttl)
            .context("Token expiry is out of range")?;
        let claims = Claims {
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .context("Failed to encode JWT token")
    }

    /// Verify a token and return its subject
    pub fn validate(&self, token: &str) -> Result<String, TokenError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)?.claims;

        if claims.sub.trim().is_empty() {
            return Err(TokenError::Malformed);
        }
        if self.clock.now().timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(claims.sub)
    }

    /// Token lifetime in seconds
    pub fn expires_in(&self) -> i64 {
        self.ttl.num_seconds()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use parking_lot::Mutex;

    /// Test clock that only moves when told to
    pub(crate) struct ManualClock(Mutex<DateTime<Utc>>);

    impl ManualClock {
        pub(crate) fn starting_at(now: DateTime<Utc>) -> Arc<Self> {
            Arc::new(Self(Mutex::new(now)))
        }

        pub(crate) fn advance(&self, by: Duration) {
            *self.0.lock() += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock()
        }
    }

    fn config(secret: &str, algorithm: Algorithm) -> AuthConfig {
        AuthConfig {
            jwt_secret: secret.to_string(),
            jwt_algorithm: algorithm,
            access_token_expire_minutes: 60,
        }
    }

    fn service() -> JwtService {
        JwtService::new(&config("test_secret", Algorithm::HS256))
    }

    fn replace_char(s: &str, idx: usize) -> String {
        s.char_indices()
            .map(|(i, c)| match (i == idx, c) {
                (true, 'A') => 'B',
                (true, _) => 'A',
                (false, c) => c,
            })
            .collect()
    }

    #[test]
    fn test_jwt_roundtrip() {
        let jwt_service = service();
        let token = jwt_service.issue("felipe@example.com").unwrap();
        assert_eq!(token.split('.').count(), 3);
        assert_eq!(jwt_service.validate(&token).unwrap(), "felipe@example.com");
    }

    #[test]
    fn expires_exactly_at_ttl() {
        let clock = ManualClock::starting_at(Utc::now());
        let jwt_service = JwtService::with_clock(&config("test_secret", Algorithm::HS256), clock.clone());
        let token = jwt_service.issue("felipe@example.com").unwrap();

        clock.advance(Duration::minutes(60) - Duration::seconds(1));
        assert!(jwt_service.validate(&token).is_ok());

        clock.advance(Duration::seconds(1));
        assert_eq!(jwt_service.validate(&token), Err(TokenError::Expired));
    }

    #[test]
    fn oversized_ttl_fails_to_issue_instead_of_panicking() {
        for minutes in [i64::MAX, 1_000_000_000_000] {
            let mut cfg = config("test_secret", Algorithm::HS256);
            cfg.access_token_expire_minutes = minutes;
            let jwt_service = JwtService::new(&cfg);
            assert!(jwt_service.issue("felipe@example.com").is_err());
        }
    }

    #[test]
    fn embeds_issue_and_expiry_claims() {
        let start = Utc::now();
        let jwt_service =
            JwtService::with_clock(&config("test_secret", Algorithm::HS256), ManualClock::starting_at(start));
        let token = jwt_service.issue("felipe@example.com").unwrap();

        let payload = token.split('.').nth(1).unwrap();
        let claims: Claims = serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload).unwrap()).unwrap();
        assert_eq!(claims.iat, start.timestamp());
        assert_eq!(claims.exp - claims.iat, 3600);
        assert_eq!(jwt_service.expires_in(), 3600);
    }

    #[test]
    fn rejects_token_from_another_secret() {
        let other = JwtService::new(&config("other_secret", Algorithm::HS256));
        let token = other.issue("felipe@example.com").unwrap();
        assert_eq!(service().validate(&token), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn rejects_token_signed_with_another_algorithm() {
        let other = JwtService::new(&config("test_secret", Algorithm::HS512));
        let token = other.issue("felipe@example.com").unwrap();
        assert_eq!(service().validate(&token), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn rejects_rewritten_subject() {
        let jwt_service = service();
        let token = jwt_service.issue("felipe@example.com").unwrap();
        let parts: Vec<&str> = token.split('.').collect();

        let mut claims: Claims =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(parts[1]).unwrap()).unwrap();
        claims.sub = "admin@example.com".to_string();
        let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap());
        let forged = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);

        assert_eq!(jwt_service.validate(&forged), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn rejects_any_altered_payload_or_signature_character() {
        let jwt_service = service();
        let token = jwt_service.issue("felipe@example.com").unwrap();
        let header_len = token.find('.').unwrap();

        for idx in (header_len + 1)..token.len() {
            if token.as_bytes()[idx] == b'.' {
                continue;
            }
            let altered = replace_char(&token, idx);
            assert_eq!(
                jwt_service.validate(&altered),
                Err(TokenError::InvalidSignature),
                "alteration at {} was accepted",
                idx
            );
        }
    }

    #[test]
    fn missing_or_empty_subject_is_malformed() {
        #[derive(Serialize)]
        struct NoSubject {
            exp: i64,
        }

        let jwt_service = service();
        let key = EncodingKey::from_secret(b"test_secret");
        let exp = (Utc::now() + Duration::minutes(5)).timestamp();

        let token = encode(&Header::default(), &NoSubject { exp }, &key).unwrap();
        assert_eq!(jwt_service.validate(&token), Err(TokenError::Malformed));

        let claims = Claims {
            sub: String::new(),
            iat: Utc::now().timestamp(),
            exp,
        };
        let token = encode(&Header::default(), &claims, &key).unwrap();
        assert_eq!(jwt_service.validate(&token), Err(TokenError::Malformed));
    }

    #[test]
    fn garbage_is_malformed() {
        let jwt_service = service();
        assert_eq!(jwt_service.validate("not-a-token"), Err(TokenError::Malformed));
        assert_eq!(jwt_service.validate(""), Err(TokenError::Malformed));
    }

    #[test]
    fn unsigned_token_is_rejected() {
        let jwt_service = service();
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let exp = (Utc::now() + Duration::minutes(5)).timestamp();
        let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"a@example.com","exp":{}}}"#, exp));
        assert!(jwt_service.validate(&format!("{}.{}.", header, payload)).is_err());
    }
}
