//! # Confide
//!
//! Credential and field-confidentiality core for an anonymous feedback
//! intake service.
//!
//! Feedback submissions may carry contact details the submitter expects to
//! stay private. This crate encrypts those fields before they reach the row
//! store, and gates every read of them behind a verified session token.
//!
//! ## Components
//!
//! - **Credential hashing** ([`credential`]): salted PBKDF2-HMAC-SHA512
//!   digests with constant-time verification
//! - **Field encryption** ([`cipher`]): AES-256-CBC with a fresh random IV
//!   per value, stored as `hex(iv) || hex(ciphertext)`
//! - **Session tokens** ([`token`]): signed, self-contained 24-hour claims
//!   carrying a forced-password-reset obligation
//! - **Auth orchestration** ([`auth`]): username-or-email login, token
//!   issuance, password change that clears the reset flag
//! - **Record gateway** ([`records`]): token-gated reads with per-field
//!   decryption, encrypt-on-submit writes with background notification
//!
//! ## Quick start
//!
//! ```ignore
//! use std::sync::Arc;
//! use confide::{AppConfig, AuthService, FeedbackGateway, NewSubmission};
//! use confide::notify::LogSink;
//! use confide::testing::MemoryStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::from_env()?;
//!     let store = Arc::new(MemoryStore::new());
//!
//!     let auth = AuthService::new(Arc::clone(&store), &config);
//!     let gateway = FeedbackGateway::new(store, &config, Arc::new(LogSink))?;
//!
//!     gateway.submit(NewSubmission::new("the elevator is broken")).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Security model
//!
//! Tokens are stateless: there is no revocation list, so a leaked token
//! remains valid until its expiry instant regardless of logout. Acceptable
//! for a low-stakes internal admin surface; do not reuse this design where
//! compromise recovery inside the expiry window matters.

pub mod auth;
pub mod bootstrap;
pub mod cipher;
pub mod config;
pub mod credential;
mod crypto;
pub mod notify;
pub mod records;
pub mod store;
pub mod testing;
pub mod token;

// Re-exports
pub use auth::{AuthError, AuthService, LoginSession};
pub use bootstrap::{seed_admin_users, SeedUser, SEED_TEMP_PASSWORD};
pub use cipher::{CipherError, FieldCipher};
pub use config::{AppConfig, AppConfigBuilder, ConfigError};
pub use credential::CredentialHasher;
pub use crypto::{constant_time_eq, constant_time_str_eq};
pub use notify::{LogSink, NotificationSink, NotifyError};
pub use records::{Feedback, FeedbackGateway, FeedbackReceipt, GatewayError, NewSubmission};
pub use store::{
    FeedbackRow, FeedbackStore, NewFeedbackRow, NewUserRow, Role, StoreError, UserRow,
};
pub use token::{
    extract_bearer, SessionClaimInput, SessionClaims, SessionTokenService, TokenError,
    DEFAULT_TOKEN_LIFETIME,
};

#[cfg(feature = "postgres")]
pub use store::postgres::PgStore;
