//! In-memory store for tests, examples, and local development.
//!
//! [`MemoryStore`] implements [`FeedbackStore`] over two locked `Vec`s. It
//! mirrors the Postgres backend's observable behaviour (id assignment,
//! newest-first ordering with id tiebreak, atomic credential update) so a
//! test against it exercises the same contract a deployment relies on.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::store::{
    FeedbackRow, FeedbackStore, NewFeedbackRow, NewUserRow, StoreError, UserRow,
};

/// In-memory [`FeedbackStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<Vec<UserRow>>,
    feedback: RwLock<Vec<FeedbackRow>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored feedback rows.
    pub fn feedback_count(&self) -> usize {
        self.feedback.read().len()
    }

    /// Raw stored feedback rows, in insertion order.
    ///
    /// Tests use this to assert on what actually hit storage (encrypted
    /// values), bypassing the gateway's decryption.
    pub fn raw_feedback(&self) -> Vec<FeedbackRow> {
        self.feedback.read().clone()
    }

    /// Insert a feedback row with an explicit timestamp.
    ///
    /// Ordering tests need rows whose `created_at` values are controlled
    /// rather than all equal to "now".
    pub fn insert_feedback_at(&self, row: NewFeedbackRow, created_at: DateTime<Utc>) -> FeedbackRow {
        let mut feedback = self.feedback.write();
        let id = feedback.last().map_or(1, |r| r.id + 1);
        let stored = FeedbackRow {
            id,
            content: row.content,
            email: row.email,
            phone: row.phone,
            created_at,
        };
        feedback.push(stored.clone());
        stored
    }
}

impl FeedbackStore for MemoryStore {
    async fn find_user_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<UserRow>, StoreError> {
        let users = self.users.read();
        Ok(users
            .iter()
            .find(|u| u.username == identifier || u.email == identifier)
            .cloned())
    }

    async fn find_user_by_id(&self, id: i64) -> Result<Option<UserRow>, StoreError> {
        let users = self.users.read();
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn update_user_credential(&self, id: i64, digest: &str) -> Result<bool, StoreError> {
        let mut users = self.users.write();
        match users.iter_mut().find(|u| u.id == id) {
            Some(user) => {
                user.password_digest = digest.to_string();
                user.requires_password_reset = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_user(&self, user: NewUserRow) -> Result<UserRow, StoreError> {
        let mut users = self.users.write();
        if users
            .iter()
            .any(|u| u.username == user.username || u.email == user.email)
        {
            return Err(StoreError::Backend(format!(
                "duplicate username or email: {}",
                user.username
            )));
        }
        let id = users.last().map_or(1, |u| u.id + 1);
        let stored = UserRow {
            id,
            username: user.username,
            email: user.email,
            password_digest: user.password_digest,
            role: user.role,
            requires_password_reset: user.requires_password_reset,
        };
        users.push(stored.clone());
        Ok(stored)
    }

    async fn insert_feedback(&self, row: NewFeedbackRow) -> Result<FeedbackRow, StoreError> {
        Ok(self.insert_feedback_at(row, Utc::now()))
    }

    async fn list_feedback_newest_first(&self) -> Result<Vec<FeedbackRow>, StoreError> {
        let mut rows = self.feedback.read().clone();
        rows.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(rows)
    }
}
