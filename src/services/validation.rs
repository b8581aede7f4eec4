//! Request payloads for user records and their field rules.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::errors::AppError;

pub const PASSWORD_MIN_LEN: usize = 8;
pub const PASSWORD_MAX_LEN: usize = 72;
pub const FULL_NAME_MIN_LEN: usize = 2;
pub const FULL_NAME_MAX_LEN: usize = 255;

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserCreate {
    pub email: String,
    pub full_name: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub is_active: Option<bool>,
    pub password: Option<String>,
}

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is a valid regex")
});

pub fn valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn check_email(email: &str) -> Result<(), AppError> {
    if valid_email(email) {
        Ok(())
    } else {
        Err(AppError::Validation("email: value is not a valid email address".into()))
    }
}

pub fn check_full_name(full_name: &str) -> Result<(), AppError> {
    check_length("full_name", full_name, FULL_NAME_MIN_LEN, FULL_NAME_MAX_LEN)
}

pub fn check_password(password: &str) -> Result<(), AppError> {
    check_length("password", password, PASSWORD_MIN_LEN, PASSWORD_MAX_LEN)
}

// Lengths are counted in characters, not bytes.
fn check_length(field: &str, value: &str, min: usize, max: usize) -> Result<(), AppError> {
    let len = value.chars().count();
    if (min..=max).contains(&len) {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "{}: length must be between {} and {} characters",
            field, min, max
        )))
    }
}

impl UserCreate {
    pub fn validate(&self) -> Result<(), AppError> {
        check_email(self.email.trim())?;
        check_full_name(&self.full_name)?;
        check_password(&self.password)
    }
}

impl UserUpdate {
    /// Decode an update body, reporting type errors as validation failures
    pub fn from_value(payload: serde_json::Value) -> Result<Self, AppError> {
        serde_json::from_value(payload).map_err(|e| AppError::Validation(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(email) = &self.email {
            check_email(email.trim())?;
        }
        if let Some(full_name) = &self.full_name {
            check_full_name(full_name)?;
        }
        if let Some(password) = &self.password {
            check_password(password)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(email: &str, full_name: &str, password: &str) -> UserCreate {
        UserCreate {
            email: email.into(),
            full_name: full_name.into(),
            is_active: true,
            password: password.into(),
        }
    }

    #[test]
    fn valid_email_accepts_basic_format() {
        assert!(valid_email("felipe@example.com"));
        assert!(valid_email("first.last+tag@sub.example.org"));
    }

    #[test]
    fn valid_email_rejects_missing_parts() {
        assert!(!valid_email("felipe"));
        assert!(!valid_email("felipe@example"));
        assert!(!valid_email("@example.com"));
        assert!(!valid_email("fe lipe@example.com"));
    }

    #[test]
    fn password_bounds() {
        assert!(create("a@b.co", "Al", "12345678").validate().is_ok());
        assert!(create("a@b.co", "Al", &"x".repeat(72)).validate().is_ok());
        assert!(create("a@b.co", "Al", "1234567").validate().is_err());
        assert!(create("a@b.co", "Al", &"x".repeat(73)).validate().is_err());
    }

    #[test]
    fn full_name_bounds() {
        assert!(create("a@b.co", "A", "12345678").validate().is_err());
        assert!(create("a@b.co", &"n".repeat(256), "12345678").validate().is_err());
        assert!(create("a@b.co", "Zoë", "12345678").validate().is_ok());
    }

    #[test]
    fn update_checks_only_present_fields() {
        assert!(UserUpdate::default().validate().is_ok());

        let bad = UserUpdate {
            password: Some("short".into()),
            ..Default::default()
        };
        assert!(matches!(bad.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn update_decodes_from_json_and_rejects_wrong_types() {
        let update = UserUpdate::from_value(serde_json::json!({ "full_name": "Al" })).unwrap();
        assert_eq!(update.full_name.as_deref(), Some("Al"));
        assert!(update.email.is_none());

        let err = UserUpdate::from_value(serde_json::json!({ "is_active": "yes" })).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn create_defaults_to_active() {
        let payload: UserCreate = serde_json::from_str(
            r#"{"email":"a@b.co","full_name":"Al","password":"12345678"}"#,
        )
        .unwrap();
        assert!(payload.is_active);
    }
}
