//! First-run seeding of reviewer accounts.
//!
//! The intake surface has no self-service signup; reviewer accounts are
//! seeded at deploy time with a shared temporary password and the
//! `requires_password_reset` flag set, so every seeded account is forced
//! through a password change on first login.
//!
//! Seeding is idempotent. Re-running it against a store that already holds
//! the accounts (including ones whose passwords have since been changed) is
//! a no-op for those accounts, so it is safe to run on every startup.

use crate::credential::CredentialHasher;
use crate::store::{FeedbackStore, NewUserRow, Role, StoreError, UserRow};

/// Temporary password assigned to newly seeded accounts.
///
/// Usable exactly once per account in practice: the reset obligation in the
/// login token pushes the holder straight into a password change.
pub const SEED_TEMP_PASSWORD: &str = "temp123456";

/// Identity of an account to seed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedUser {
    pub username: String,
    pub email: String,
}

impl SeedUser {
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
        }
    }
}

/// Ensure the given admin accounts exist, creating any that are missing.
///
/// An account already present under the same username or email is left
/// untouched. Each created account gets a fresh salted digest of
/// [`SEED_TEMP_PASSWORD`] (fresh salt per account, so the shared temporary
/// password still produces distinct digests) and the reset flag set.
///
/// Returns the accounts created by this run.
pub async fn seed_admin_users<S: FeedbackStore>(
    store: &S,
    hasher: &CredentialHasher,
    users: &[SeedUser],
) -> Result<Vec<UserRow>, StoreError> {
    let mut created = Vec::new();

    for seed in users {
        let by_username = store.find_user_by_identifier(&seed.username).await?;
        let by_email = store.find_user_by_identifier(&seed.email).await?;
        if by_username.is_some() || by_email.is_some() {
            tracing::debug!(username = %seed.username, "seed account already exists");
            continue;
        }

        let row = store
            .insert_user(NewUserRow {
                username: seed.username.clone(),
                email: seed.email.clone(),
                password_digest: hasher.hash(SEED_TEMP_PASSWORD),
                role: Role::Admin,
                requires_password_reset: true,
            })
            .await?;

        tracing::info!(user_id = row.id, username = %row.username, "seeded admin account");
        created.push(row);
    }

    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStore;

    fn seeds() -> Vec<SeedUser> {
        vec![
            SeedUser::new("alice", "alice@example.com"),
            SeedUser::new("bob", "bob@example.com"),
        ]
    }

    #[tokio::test]
    async fn seeds_missing_accounts_with_reset_flag() {
        let store = MemoryStore::new();
        let hasher = CredentialHasher::default();

        let created = seed_admin_users(&store, &hasher, &seeds()).await.unwrap();
        assert_eq!(created.len(), 2);

        for user in &created {
            assert_eq!(user.role, Role::Admin);
            assert!(user.requires_password_reset);
            assert!(hasher.verify(SEED_TEMP_PASSWORD, &user.password_digest));
        }

        // Shared temp password, distinct salts, distinct digests.
        assert_ne!(created[0].password_digest, created[1].password_digest);
    }

    #[tokio::test]
    async fn reseeding_is_a_noop() {
        let store = MemoryStore::new();
        let hasher = CredentialHasher::default();

        let first = seed_admin_users(&store, &hasher, &seeds()).await.unwrap();
        assert_eq!(first.len(), 2);

        let second = seed_admin_users(&store, &hasher, &seeds()).await.unwrap();
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn seeding_never_resets_a_changed_password() {
        let store = MemoryStore::new();
        let hasher = CredentialHasher::default();

        let created = seed_admin_users(&store, &hasher, &seeds()).await.unwrap();
        let alice = &created[0];

        // The account completed its forced reset.
        let new_digest = hasher.hash("chosen-password");
        assert!(store
            .update_user_credential(alice.id, &new_digest)
            .await
            .unwrap());

        seed_admin_users(&store, &hasher, &seeds()).await.unwrap();

        let row = store.find_user_by_id(alice.id).await.unwrap().unwrap();
        assert!(hasher.verify("chosen-password", &row.password_digest));
        assert!(!hasher.verify(SEED_TEMP_PASSWORD, &row.password_digest));
        assert!(!row.requires_password_reset);
    }
}
