//! Persistence boundary for users and feedback rows.
//!
//! The rest of the crate talks to storage through [`FeedbackStore`], which
//! deals exclusively in *stored* representations: password digests and
//! encrypted field values. Hashing happens above this boundary in
//! [`auth`](crate::auth), encryption in [`records`](crate::records). A store
//! implementation must never see a plaintext password or an unencrypted
//! contact field.
//!
//! Two implementations ship with the crate: [`postgres::PgStore`] behind the
//! `postgres` feature, and [`MemoryStore`](crate::testing::MemoryStore) for
//! tests and examples.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Row types
// ============================================================================

/// User role.
///
/// The intake surface is anonymous; only reviewing staff have accounts, so
/// `Admin` is currently the sole variant. Kept as an enum (with a lowercase
/// wire form) so adding a reviewer tier later is a variant, not a migration
/// of every call site from `String`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            other => Err(StoreError::Corrupt(format!("unknown role: {}", other))),
        }
    }
}

/// A user account as stored.
///
/// `password_digest` is the salted credential produced by
/// [`CredentialHasher::hash`](crate::CredentialHasher::hash); it is never a
/// plaintext password.
#[derive(Clone, PartialEq)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_digest: String,
    pub role: Role,
    /// Set at seeding; cleared by the first successful password change.
    pub requires_password_reset: bool,
}

impl fmt::Debug for UserRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserRow")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password_digest", &"[REDACTED]")
            .field("role", &self.role)
            .field("requires_password_reset", &self.requires_password_reset)
            .finish()
    }
}

/// A feedback submission as stored.
///
/// `content`, `email`, and `phone` hold the cipher's hex encoding, not
/// plaintext. `email`/`phone` are `None` when the submitter left them out.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackRow {
    pub id: i64,
    pub content: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Stored field values for a new feedback row, already encrypted.
#[derive(Debug, Clone)]
pub struct NewFeedbackRow {
    pub content: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Field values for a new user row, digest already derived.
#[derive(Clone)]
pub struct NewUserRow {
    pub username: String,
    pub email: String,
    pub password_digest: String,
    pub role: Role,
    pub requires_password_reset: bool,
}

impl fmt::Debug for NewUserRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUserRow")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password_digest", &"[REDACTED]")
            .field("role", &self.role)
            .field("requires_password_reset", &self.requires_password_reset)
            .finish()
    }
}

// ============================================================================
// Store trait
// ============================================================================

/// Storage operations the auth and gateway layers need.
///
/// All methods are infallible on "not found" where the absence is a normal
/// outcome (lookups return `Option`); `StoreError` is reserved for the
/// backend actually failing.
pub trait FeedbackStore: Send + Sync {
    /// Find a user whose username **or** email exactly equals `identifier`.
    ///
    /// Matching is case-sensitive on both columns. At most one row is
    /// returned; seeding keeps usernames and emails unique across both
    /// columns.
    fn find_user_by_identifier(
        &self,
        identifier: &str,
    ) -> impl std::future::Future<Output = Result<Option<UserRow>, StoreError>> + Send;

    /// Find a user by primary key.
    fn find_user_by_id(
        &self,
        id: i64,
    ) -> impl std::future::Future<Output = Result<Option<UserRow>, StoreError>> + Send;

    /// Replace a user's password digest and clear the reset flag, in one
    /// mutation.
    ///
    /// Returns `false` if no row has that id. The digest swap and the flag
    /// clear are a single atomic write so no interleaving can observe the
    /// new digest with the flag still set.
    fn update_user_credential(
        &self,
        id: i64,
        digest: &str,
    ) -> impl std::future::Future<Output = Result<bool, StoreError>> + Send;

    /// Insert a user row, returning it with its assigned id.
    fn insert_user(
        &self,
        user: NewUserRow,
    ) -> impl std::future::Future<Output = Result<UserRow, StoreError>> + Send;

    /// Insert a feedback row, returning it with its assigned id and
    /// creation timestamp.
    fn insert_feedback(
        &self,
        row: NewFeedbackRow,
    ) -> impl std::future::Future<Output = Result<FeedbackRow, StoreError>> + Send;

    /// All feedback rows, newest first (`created_at` descending, id
    /// descending as the tiebreak for equal timestamps).
    fn list_feedback_newest_first(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<FeedbackRow>, StoreError>> + Send;
}

// ============================================================================
// Errors
// ============================================================================

/// Storage backend errors.
#[derive(Debug, Clone)]
pub enum StoreError {
    /// The backend rejected or failed the operation
    Backend(String),
    /// A stored value could not be interpreted (e.g. an unknown role)
    Corrupt(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backend(msg) => write!(f, "storage backend error: {}", msg),
            Self::Corrupt(msg) => write!(f, "corrupt stored data: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

// ============================================================================
// Postgres implementation
// ============================================================================

#[cfg(feature = "postgres")]
pub mod postgres {
    //! `sqlx`-backed Postgres store.
    //!
    //! Expected schema:
    //!
    //! ```sql
    //! CREATE TABLE users (
    //!     id BIGSERIAL PRIMARY KEY,
    //!     username TEXT NOT NULL UNIQUE,
    //!     email TEXT NOT NULL UNIQUE,
    //!     password_digest TEXT NOT NULL,
    //!     role TEXT NOT NULL,
    //!     requires_password_reset BOOLEAN NOT NULL DEFAULT FALSE
    //! );
    //!
    //! CREATE TABLE feedback (
    //!     id BIGSERIAL PRIMARY KEY,
    //!     content TEXT NOT NULL,
    //!     email TEXT,
    //!     phone TEXT,
    //!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    //! );
    //! ```

    use sqlx::postgres::PgPool;
    use sqlx::Row;

    use super::{FeedbackRow, NewFeedbackRow, NewUserRow, Role, StoreError, UserRow};

    /// Postgres-backed [`FeedbackStore`](super::FeedbackStore).
    #[derive(Debug, Clone)]
    pub struct PgStore {
        pool: PgPool,
    }

    impl PgStore {
        pub fn new(pool: PgPool) -> Self {
            Self { pool }
        }
    }

    impl From<sqlx::Error> for StoreError {
        fn from(e: sqlx::Error) -> Self {
            StoreError::Backend(e.to_string())
        }
    }

    fn user_from_row(row: &sqlx::postgres::PgRow) -> Result<UserRow, StoreError> {
        let role: String = row.try_get("role").map_err(StoreError::from)?;
        Ok(UserRow {
            id: row.try_get("id").map_err(StoreError::from)?,
            username: row.try_get("username").map_err(StoreError::from)?,
            email: row.try_get("email").map_err(StoreError::from)?,
            password_digest: row.try_get("password_digest").map_err(StoreError::from)?,
            role: role.parse::<Role>()?,
            requires_password_reset: row
                .try_get("requires_password_reset")
                .map_err(StoreError::from)?,
        })
    }

    fn feedback_from_row(row: &sqlx::postgres::PgRow) -> Result<FeedbackRow, StoreError> {
        Ok(FeedbackRow {
            id: row.try_get("id").map_err(StoreError::from)?,
            content: row.try_get("content").map_err(StoreError::from)?,
            email: row.try_get("email").map_err(StoreError::from)?,
            phone: row.try_get("phone").map_err(StoreError::from)?,
            created_at: row.try_get("created_at").map_err(StoreError::from)?,
        })
    }

    impl super::FeedbackStore for PgStore {
        async fn find_user_by_identifier(
            &self,
            identifier: &str,
        ) -> Result<Option<UserRow>, StoreError> {
            let row = sqlx::query(
                "SELECT id, username, email, password_digest, role, requires_password_reset \
                 FROM users WHERE username = $1 OR email = $1",
            )
            .bind(identifier)
            .fetch_optional(&self.pool)
            .await?;

            row.as_ref().map(user_from_row).transpose()
        }

        async fn find_user_by_id(&self, id: i64) -> Result<Option<UserRow>, StoreError> {
            let row = sqlx::query(
                "SELECT id, username, email, password_digest, role, requires_password_reset \
                 FROM users WHERE id = $1",
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

            row.as_ref().map(user_from_row).transpose()
        }

        async fn update_user_credential(&self, id: i64, digest: &str) -> Result<bool, StoreError> {
            let result = sqlx::query(
                "UPDATE users SET password_digest = $1, requires_password_reset = FALSE \
                 WHERE id = $2",
            )
            .bind(digest)
            .bind(id)
            .execute(&self.pool)
            .await?;

            Ok(result.rows_affected() > 0)
        }

        async fn insert_user(&self, user: NewUserRow) -> Result<UserRow, StoreError> {
            let row = sqlx::query(
                "INSERT INTO users (username, email, password_digest, role, requires_password_reset) \
                 VALUES ($1, $2, $3, $4, $5) \
                 RETURNING id, username, email, password_digest, role, requires_password_reset",
            )
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_digest)
            .bind(user.role.as_str())
            .bind(user.requires_password_reset)
            .fetch_one(&self.pool)
            .await?;

            user_from_row(&row)
        }

        async fn insert_feedback(&self, new: NewFeedbackRow) -> Result<FeedbackRow, StoreError> {
            let row = sqlx::query(
                "INSERT INTO feedback (content, email, phone) VALUES ($1, $2, $3) \
                 RETURNING id, content, email, phone, created_at",
            )
            .bind(&new.content)
            .bind(&new.email)
            .bind(&new.phone)
            .fetch_one(&self.pool)
            .await?;

            feedback_from_row(&row)
        }

        async fn list_feedback_newest_first(&self) -> Result<Vec<FeedbackRow>, StoreError> {
            let rows = sqlx::query(
                "SELECT id, content, email, phone, created_at FROM feedback \
                 ORDER BY created_at DESC, id DESC",
            )
            .fetch_all(&self.pool)
            .await?;

            rows.iter().map(feedback_from_row).collect()
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_its_wire_form() {
        assert_eq!(Role::Admin.as_str(), "admin");
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert!("superuser".parse::<Role>().is_err());
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
        assert_eq!(
            serde_json::from_str::<Role>("\"admin\"").unwrap(),
            Role::Admin
        );
    }

    #[test]
    fn user_row_debug_redacts_digest() {
        let row = UserRow {
            id: 1,
            username: "alice".into(),
            email: "alice@example.com".into(),
            password_digest: "aabb:ccdd".into(),
            role: Role::Admin,
            requires_password_reset: false,
        };
        let debug = format!("{:?}", row);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("aabb:ccdd"));
    }
}
