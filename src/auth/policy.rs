//! Ownership rule for mutating user records.
//!
//! Only the record's own identity may update or delete it. There is no
//! administrative override.

use crate::auth::models::AuthenticatedPrincipal;
use crate::errors::AppError;

pub fn can_mutate(principal: &AuthenticatedPrincipal, target_user_id: i64) -> bool {
    principal.id() == target_user_id
}

pub fn authorize(principal: &AuthenticatedPrincipal, target_user_id: i64) -> Result<(), AppError> {
    if can_mutate(principal, target_user_id) {
        Ok(())
    } else {
        tracing::warn!(
            principal = principal.id(),
            target = target_user_id,
            "Mutation of another user's record denied"
        );
        Err(AppError::Forbidden("Not enough permissions"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::User;
    use chrono::Utc;

    fn principal(id: i64) -> AuthenticatedPrincipal {
        let now = Utc::now();
        AuthenticatedPrincipal(User {
            id,
            email: format!("user{}@example.com", id),
            full_name: "Someone".into(),
            is_active: true,
            password_hash: String::new(),
            created_at: now,
            updated_at: now,
        })
    }

    #[test]
    fn owner_may_mutate() {
        assert!(can_mutate(&principal(3), 3));
        assert!(authorize(&principal(3), 3).is_ok());
    }

    #[test]
    fn others_are_forbidden() {
        assert!(!can_mutate(&principal(3), 4));
        assert!(matches!(authorize(&principal(3), 4), Err(AppError::Forbidden(_))));
    }
}
