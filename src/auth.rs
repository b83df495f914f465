//! Authentication orchestration.
//!
//! Glues the credential hasher, the token service, and the user store into
//! the login and password-change flows. The store only ever sees digests;
//! plaintext passwords live on the stack for the duration of a call and are
//! never logged.
//!
//! # Uniform rejection
//!
//! `authenticate` and `change_password` do not reveal which check failed.
//! An unknown identifier and a wrong password both come back as `None` (or
//! `false`), so a caller probing the login surface cannot enumerate valid
//! usernames. Only backend failures surface as errors.

use std::fmt;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::credential::CredentialHasher;
use crate::store::{FeedbackStore, StoreError, UserRow};
use crate::token::{SessionClaimInput, SessionTokenService, TokenError};

/// A successful login: the issued token plus the authenticated user.
///
/// The user row is returned alongside the token so transports can shape a
/// response body without a second lookup. `requires_password_reset` tells
/// the client to force a password change before anything else.
#[derive(Debug, Clone)]
pub struct LoginSession {
    pub token: String,
    pub user: UserRow,
}

/// Login, password change, and session issuance over a [`FeedbackStore`].
#[derive(Debug, Clone)]
pub struct AuthService<S> {
    store: Arc<S>,
    hasher: CredentialHasher,
    tokens: SessionTokenService,
}

impl<S: FeedbackStore> AuthService<S> {
    pub fn new(store: Arc<S>, config: &AppConfig) -> Self {
        Self {
            store,
            hasher: CredentialHasher::with_iterations(config.pbkdf2_iterations),
            tokens: SessionTokenService::new(&config.jwt_secret, config.token_lifetime),
        }
    }

    /// Check an identifier/password pair against the store.
    ///
    /// The identifier matches a username or an email, exactly and
    /// case-sensitively. Returns `Ok(None)` for both an unknown identifier
    /// and a wrong password; the password check runs through the hasher's
    /// constant-time comparison.
    pub async fn authenticate(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<Option<UserRow>, StoreError> {
        let Some(user) = self.store.find_user_by_identifier(identifier).await? else {
            tracing::debug!(identifier = %identifier, "authentication rejected");
            return Ok(None);
        };

        if !self.hasher.verify(password, &user.password_digest) {
            tracing::debug!(user_id = user.id, "authentication rejected");
            return Ok(None);
        }

        Ok(Some(user))
    }

    /// Authenticate and issue a session token.
    ///
    /// The token claims carry the user's `requires_password_reset` state at
    /// the moment of login, so a client holding the token knows whether to
    /// force a password change.
    pub async fn login(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<Option<LoginSession>, AuthError> {
        let Some(user) = self.authenticate(identifier, password).await? else {
            return Ok(None);
        };

        let token = self.tokens.issue(SessionClaimInput {
            user_id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
            requires_password_reset: user.requires_password_reset,
        })?;

        tracing::info!(user_id = user.id, username = %user.username, "login succeeded");
        Ok(Some(LoginSession { token, user }))
    }

    /// Change a user's password after verifying the current one.
    ///
    /// Returns `Ok(false)`, indistinguishably, when the user does not exist
    /// or the current password is wrong; in both cases nothing is written.
    /// On success the stored digest is replaced and the reset flag cleared
    /// in a single store mutation.
    pub async fn change_password(
        &self,
        user_id: i64,
        current_password: &str,
        new_password: &str,
    ) -> Result<bool, StoreError> {
        let Some(user) = self.store.find_user_by_id(user_id).await? else {
            tracing::debug!(user_id, "password change rejected");
            return Ok(false);
        };

        if !self.hasher.verify(current_password, &user.password_digest) {
            tracing::debug!(user_id, "password change rejected");
            return Ok(false);
        }

        let digest = self.hasher.hash(new_password);
        let updated = self.store.update_user_credential(user_id, &digest).await?;
        if updated {
            tracing::info!(user_id, "password changed");
        }
        Ok(updated)
    }

    /// Look up a user by id.
    pub async fn user_by_id(&self, id: i64) -> Result<Option<UserRow>, StoreError> {
        self.store.find_user_by_id(id).await
    }

    /// The token service this instance issues and verifies with.
    pub fn tokens(&self) -> &SessionTokenService {
        &self.tokens
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Authentication flow errors.
///
/// Credential mismatches are not errors (they are `None`/`false` results);
/// this enum covers the infrastructure failing underneath the flow.
#[derive(Debug, Clone)]
pub enum AuthError {
    Store(StoreError),
    Token(TokenError),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store(e) => write!(f, "auth storage failure: {}", e),
            Self::Token(e) => write!(f, "auth token failure: {}", e),
        }
    }
}

impl std::error::Error for AuthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store(e) => Some(e),
            Self::Token(e) => Some(e),
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

impl From<TokenError> for AuthError {
    fn from(e: TokenError) -> Self {
        Self::Token(e)
    }
}

// ============================================================================
// Tests
// ============================================================================
