//! User Directory
//!
//! Persistence of user records behind the [`UserDirectory`] trait, with a
//! PostgreSQL backend and an in-memory backend for development and tests.
//!
//! Every lookup by email is case-normalized by the directory itself.

use std::collections::BTreeMap;

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use deadpool_postgres::Pool;
use parking_lot::RwLock;
use tokio_postgres::error::SqlState;

use crate::database::models::{FromRow, NewUser, User, UserChanges, normalize_email};

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("email already registered")]
    DuplicateEmail,

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type DirectoryResult<T> = Result<T, DirectoryError>;

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_email(&self, email: &str) -> DirectoryResult<Option<User>>;

    async fn find_by_id(&self, id: i64) -> DirectoryResult<Option<User>>;

    async fn list(&self, skip: i64, limit: i64) -> DirectoryResult<Vec<User>>;

    /// Fails with [`DirectoryError::DuplicateEmail`] if the email is taken
    async fn insert(&self, user: NewUser) -> DirectoryResult<User>;

    /// Returns `None` if no record has this id
    async fn update(&self, id: i64, changes: UserChanges) -> DirectoryResult<Option<User>>;

    /// Returns whether a record was removed
    async fn delete(&self, id: i64) -> DirectoryResult<bool>;
}

/// PostgreSQL-backed directory.
///
/// Each call checks a client out of the pool for the duration of one
/// statement; the pooled object goes back to the pool when it is dropped.
#[derive(Debug, Clone)]
pub struct PgUserDirectory {
    pool: Pool,
}

impl PgUserDirectory {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

fn map_write_error(err: tokio_postgres::Error, context: &'static str) -> DirectoryError {
    if err.code() == Some(&SqlState::UNIQUE_VIOLATION) {
        DirectoryError::DuplicateEmail
    } else {
        DirectoryError::Backend(anyhow::Error::new(err).context(context))
    }
}

fn decode(row: &tokio_postgres::Row) -> DirectoryResult<User> {
    User::from_row(row)
        .context("Failed to decode user row")
        .map_err(DirectoryError::from)
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn find_by_email(&self, email: &str) -> DirectoryResult<Option<User>> {
        let email = normalize_email(email);
        let client = self.pool.get().await.context("Failed to get DB connection")?;
        let row = client
            .query_opt("SELECT * FROM users WHERE email = $1", &[&email])
            .await
            .context("Failed to query user by email")?;
        row.as_ref().map(decode).transpose()
    }

    async fn find_by_id(&self, id: i64) -> DirectoryResult<Option<User>> {
        let client = self.pool.get().await.context("Failed to get DB connection")?;
        let row = client
            .query_opt("SELECT * FROM users WHERE id = $1", &[&id])
            .await
            .context("Failed to query user by id")?;
        row.as_ref().map(decode).transpose()
    }

    async fn list(&self, skip: i64, limit: i64) -> DirectoryResult<Vec<User>> {
        let client = self.pool.get().await.context("Failed to get DB connection")?;
        let rows = client
            .query(
                "SELECT * FROM users ORDER BY id OFFSET $1 LIMIT $2",
                &[&skip, &limit],
            )
            .await
            .context("Failed to list users")?;
        rows.iter().map(decode).collect()
    }

    async fn insert(&self, user: NewUser) -> DirectoryResult<User> {
        let email = normalize_email(&user.email);
        let client = self.pool.get().await.context("Failed to get DB connection")?;
        let row = client
            .query_one(
                "INSERT INTO users (email, full_name, is_active, password_hash) \
                 VALUES ($1, $2, $3, $4) RETURNING *",
                &[&email, &user.full_name, &user.is_active, &user.password_hash],
            )
            .await
            .map_err(|e| map_write_error(e, "Failed to insert user"))?;
        decode(&row)
    }

    async fn update(&self, id: i64, changes: UserChanges) -> DirectoryResult<Option<User>> {
        let email = changes.email.as_deref().map(normalize_email);
        let client = self.pool.get().await.context("Failed to get DB connection")?;
        let row = client
            .query_opt(
                "UPDATE users SET \
                    email = COALESCE($2, email), \
                    full_name = COALESCE($3, full_name), \
                    is_active = COALESCE($4, is_active), \
                    password_hash = COALESCE($5, password_hash), \
                    updated_at = NOW() \
                 WHERE id = $1 RETURNING *",
                &[
                    &id,
                    &email,
                    &changes.full_name,
                    &changes.is_active,
                    &changes.password_hash,
                ],
            )
            .await
            .map_err(|e| map_write_error(e, "Failed to update user"))?;
        row.as_ref().map(decode).transpose()
    }

    async fn delete(&self, id: i64) -> DirectoryResult<bool> {
        let client = self.pool.get().await.context("Failed to get DB connection")?;
        let n = client
            .execute("DELETE FROM users WHERE id = $1", &[&id])
            .await
            .context("Failed to delete user")?;
        Ok(n > 0)
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    last_id: i64,
    users: BTreeMap<i64, User>,
}

impl MemoryState {
    fn email_taken(&self, email: &str, except: Option<i64>) -> bool {
        self.users
            .values()
            .any(|u| u.email == email && Some(u.id) != except)
    }
}

/// In-process directory. Ids start at 1 and are never reused.
#[derive(Debug, Default)]
pub struct MemoryUserDirectory {
    state: RwLock<MemoryState>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn find_by_email(&self, email: &str) -> DirectoryResult<Option<User>> {
        let email = normalize_email(email);
        let state = self.state.read();
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: i64) -> DirectoryResult<Option<User>> {
        Ok(self.state.read().users.get(&id).cloned())
    }

    async fn list(&self, skip: i64, limit: i64) -> DirectoryResult<Vec<User>> {
        let skip = usize::try_from(skip).unwrap_or(0);
        let limit = usize::try_from(limit).unwrap_or(0);
        let state = self.state.read();
        Ok(state.users.values().skip(skip).take(limit).cloned().collect())
    }

    async fn insert(&self, user: NewUser) -> DirectoryResult<User> {
        let email = normalize_email(&user.email);
        let mut state = self.state.write();
        if state.email_taken(&email, None) {
            return Err(DirectoryError::DuplicateEmail);
        }

        state.last_id += 1;
        let now = Utc::now();
        let record = User {
            id: state.last_id,
            email,
            full_name: user.full_name,
            is_active: user.is_active,
            password_hash: user.password_hash,
            created_at: now,
            updated_at: now,
        };
        state.users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update(&self, id: i64, mut changes: UserChanges) -> DirectoryResult<Option<User>> {
        changes.email = changes.email.as_deref().map(normalize_email);
        let mut state = self.state.write();
        if let Some(email) = changes.email.as_deref() {
            if state.email_taken(email, Some(id)) {
                return Err(DirectoryError::DuplicateEmail);
            }
        }

        let Some(user) = state.users.get_mut(&id) else {
            return Ok(None);
        };
        changes.apply(user);
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: i64) -> DirectoryResult<bool> {
        Ok(self.state.write().users.remove(&id).is_some())
    }
}
