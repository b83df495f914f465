//! Token-gated gateway over confidential feedback records.
//!
//! The gateway is the only component that sees feedback plaintext. Writes
//! encrypt every sensitive field before the store is involved; reads demand
//! a valid session token and decrypt on the way out. Anything below this
//! layer (store, notification sink, logs) handles ciphertext or metadata
//! only.
//!
//! A submission is anonymous by default. Contact details are optional, and
//! their *presence* is the only thing ever disclosed outside the encrypted
//! columns (the notification flag).

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::cipher::{CipherError, FieldCipher};
use crate::config::AppConfig;
use crate::notify::NotificationSink;
use crate::store::{FeedbackStore, NewFeedbackRow, StoreError};
use crate::token::SessionTokenService;

// ============================================================================
// Submission and view types
// ============================================================================

/// An incoming feedback submission, still plaintext.
#[derive(Debug, Clone, Default)]
pub struct NewSubmission {
    content: String,
    email: Option<String>,
    phone: Option<String>,
}

impl NewSubmission {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            email: None,
            phone: None,
        }
    }

    /// Attach a contact email. An empty value is treated as absent.
    pub fn email(mut self, email: impl Into<String>) -> Self {
        let email = email.into();
        self.email = (!email.is_empty()).then_some(email);
        self
    }

    /// Attach a contact phone number. An empty value is treated as absent.
    pub fn phone(mut self, phone: impl Into<String>) -> Self {
        let phone = phone.into();
        self.phone = (!phone.is_empty()).then_some(phone);
        self
    }

    /// Whether the submitter chose to be reachable.
    pub fn has_contact_info(&self) -> bool {
        self.email.is_some() || self.phone.is_some()
    }
}

/// What the submitter gets back: proof of storage, no content echo.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackReceipt {
    pub id: i64,
    pub created_at: DateTime<Utc>,
}

/// A decrypted feedback record, as served to an authenticated reviewer.
#[derive(Debug, Clone, PartialEq)]
pub struct Feedback {
    pub id: i64,
    pub content: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Gateway
// ============================================================================

/// Encrypt-on-write, verify-then-decrypt-on-read access to feedback rows.
#[derive(Debug)]
pub struct FeedbackGateway<S, N> {
    store: Arc<S>,
    cipher: FieldCipher,
    tokens: SessionTokenService,
    sink: Arc<N>,
}

impl<S, N> FeedbackGateway<S, N>
where
    S: FeedbackStore,
    N: NotificationSink,
{
    /// Build a gateway from application configuration.
    ///
    /// Fails only if the encryption key is unusable; a gateway must never
    /// exist without a working cipher.
    pub fn new(store: Arc<S>, config: &AppConfig, sink: Arc<N>) -> Result<Self, CipherError> {
        Ok(Self {
            store,
            cipher: FieldCipher::new(&config.encryption_key)?,
            tokens: SessionTokenService::new(&config.jwt_secret, config.token_lifetime),
            sink,
        })
    }

    /// Store a submission, encrypting every sensitive field first.
    ///
    /// No token required; the intake side is anonymous. After the row is
    /// committed a notification is dispatched on a background task carrying
    /// only the row id and the contact-info flag. Notification failure is
    /// logged and never affects the returned receipt.
    pub async fn submit(&self, submission: NewSubmission) -> Result<FeedbackReceipt, GatewayError> {
        let has_contact_info = submission.has_contact_info();

        let row = NewFeedbackRow {
            content: self.cipher.encrypt(&submission.content)?,
            email: submission
                .email
                .as_deref()
                .map(|v| self.cipher.encrypt(v))
                .transpose()?,
            phone: submission
                .phone
                .as_deref()
                .map(|v| self.cipher.encrypt(v))
                .transpose()?,
        };

        let stored = self.store.insert_feedback(row).await?;
        tracing::info!(feedback_id = stored.id, has_contact_info, "feedback stored");

        let sink = Arc::clone(&self.sink);
        let feedback_id = stored.id;
        tokio::spawn(async move {
            if let Err(e) = sink.notify_new_feedback(feedback_id, has_contact_info).await {
                tracing::warn!(feedback_id, error = %e, "feedback notification failed");
            }
        });

        Ok(FeedbackReceipt {
            id: stored.id,
            created_at: stored.created_at,
        })
    }

    /// List all feedback, newest first, decrypted.
    ///
    /// Requires a valid session token; any verification failure is a
    /// uniform [`GatewayError::Unauthorized`]. A decryption failure on any
    /// field of any row fails the whole read: partial results under a wrong
    /// key would look like data loss instead of the configuration error it
    /// actually is.
    pub async fn list_feedback(&self, token: &str) -> Result<Vec<Feedback>, GatewayError> {
        let Some(claims) = self.tokens.verify(token) else {
            return Err(GatewayError::Unauthorized);
        };
        tracing::debug!(user_id = claims.user_id, "feedback list requested");

        let rows = self.store.list_feedback_newest_first().await?;
        rows.into_iter()
            .map(|row| {
                Ok(Feedback {
                    id: row.id,
                    content: self.cipher.decrypt(&row.content)?,
                    email: row
                        .email
                        .as_deref()
                        .map(|v| self.cipher.decrypt(v))
                        .transpose()?,
                    phone: row
                        .phone
                        .as_deref()
                        .map(|v| self.cipher.decrypt(v))
                        .transpose()?,
                    created_at: row.created_at,
                })
            })
            .collect()
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Gateway errors.
#[derive(Debug, Clone)]
pub enum GatewayError {
    /// Missing, malformed, tampered, or expired session token
    Unauthorized,
    /// A stored field failed to decrypt; the whole read is abandoned
    Decryption(CipherError),
    /// The store failed underneath the gateway
    Store(StoreError),
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::Decryption(e) => write!(f, "record decryption failed: {}", e),
            Self::Store(e) => write!(f, "record storage failure: {}", e),
        }
    }
}

impl std::error::Error for GatewayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Unauthorized => None,
            Self::Decryption(e) => Some(e),
            Self::Store(e) => Some(e),
        }
    }
}

impl From<CipherError> for GatewayError {
    fn from(e: CipherError) -> Self {
        Self::Decryption(e)
    }
}

impl From<StoreError> for GatewayError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{LogSink, NotifyError};
    use crate::store::Role;
    use crate::testing::MemoryStore;
    use crate::token::SessionClaimInput;
    use std::time::Duration;

    fn config() -> AppConfig {
        AppConfig::builder("unit-test-jwt-secret", "unit-test-enc-key")
            .build()
            .unwrap()
    }

    fn reviewer_token(config: &AppConfig) -> String {
        SessionTokenService::new(&config.jwt_secret, config.token_lifetime)
            .issue(SessionClaimInput {
                user_id: 1,
                username: "alice".into(),
                email: "alice@example.com".into(),
                role: Role::Admin,
                requires_password_reset: false,
            })
            .unwrap()
    }

    fn gateway(
        store: Arc<MemoryStore>,
        config: &AppConfig,
    ) -> FeedbackGateway<MemoryStore, LogSink> {
        FeedbackGateway::new(store, config, Arc::new(LogSink)).unwrap()
    }

    #[tokio::test]
    async fn stored_fields_are_never_plaintext() {
        let config = config();
        let store = Arc::new(MemoryStore::new());
        let gw = gateway(Arc::clone(&store), &config);

        gw.submit(
            NewSubmission::new("the microwave is haunted")
                .email("reporter@example.com")
                .phone("555-0100"),
        )
        .await
        .unwrap();

        let raw = store.raw_feedback();
        assert_eq!(raw.len(), 1);
        assert_ne!(raw[0].content, "the microwave is haunted");
        assert_ne!(raw[0].email.as_deref(), Some("reporter@example.com"));
        assert_ne!(raw[0].phone.as_deref(), Some("555-0100"));
        // Everything stored is the cipher's hex encoding
        assert!(raw[0].content.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn authenticated_read_returns_plaintext_newest_first() {
        let config = config();
        let store = Arc::new(MemoryStore::new());
        let gw = gateway(Arc::clone(&store), &config);

        gw.submit(NewSubmission::new("first")).await.unwrap();
        gw.submit(NewSubmission::new("second").email("a@example.com"))
            .await
            .unwrap();

        let listed = gw.list_feedback(&reviewer_token(&config)).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].content, "second");
        assert_eq!(listed[0].email.as_deref(), Some("a@example.com"));
        assert_eq!(listed[1].content, "first");
        assert_eq!(listed[1].email, None);
        assert_eq!(listed[1].phone, None);
    }

    #[tokio::test]
    async fn read_without_valid_token_is_unauthorized() {
        let config = config();
        let store = Arc::new(MemoryStore::new());
        let gw = gateway(store, &config);

        for token in ["", "garbage", "a.b.c"] {
            assert!(matches!(
                gw.list_feedback(token).await,
                Err(GatewayError::Unauthorized)
            ));
        }

        // A token signed under a different secret is just as dead.
        let other = AppConfig::builder("different-secret", "unit-test-enc-key")
            .build()
            .unwrap();
        let foreign = reviewer_token(&other);
        assert!(matches!(
            gw.list_feedback(&foreign).await,
            Err(GatewayError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn expired_token_is_unauthorized() {
        let config = config();
        let store = Arc::new(MemoryStore::new());
        let gw = gateway(store, &config);

        // Correct secret, zero lifetime: already expired by the time we read.
        let expired = SessionTokenService::new(&config.jwt_secret, Duration::ZERO)
            .issue(SessionClaimInput {
                user_id: 1,
                username: "alice".into(),
                email: "alice@example.com".into(),
                role: Role::Admin,
                requires_password_reset: false,
            })
            .unwrap();
        tokio::time::sleep(Duration::from_millis(1100)).await;

        assert!(matches!(
            gw.list_feedback(&expired).await,
            Err(GatewayError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn undecryptable_row_fails_the_whole_read() {
        let config = config();
        let store = Arc::new(MemoryStore::new());
        let gw = gateway(Arc::clone(&store), &config);

        gw.submit(NewSubmission::new("fine")).await.unwrap();
        // Rows written before encryption was configured correctly: one
        // short, one long and non-ASCII with a multi-byte character
        // straddling the would-be IV boundary.
        let long_legacy = format!("a{}", "é".repeat(40));
        for legacy in ["legacy plaintext row", long_legacy.as_str()] {
            store.insert_feedback_at(
                NewFeedbackRow {
                    content: legacy.into(),
                    email: None,
                    phone: None,
                },
                Utc::now(),
            );

            assert!(matches!(
                gw.list_feedback(&reviewer_token(&config)).await,
                Err(GatewayError::Decryption(CipherError::DecryptFailed))
            ));
        }
    }

    struct ChannelSink(tokio::sync::mpsc::UnboundedSender<(i64, bool)>);

    impl NotificationSink for ChannelSink {
        async fn notify_new_feedback(
            &self,
            feedback_id: i64,
            has_contact_info: bool,
        ) -> Result<(), NotifyError> {
            self.0
                .send((feedback_id, has_contact_info))
                .map_err(|e| NotifyError(e.to_string()))
        }
    }

    #[tokio::test]
    async fn notification_carries_only_id_and_contact_flag() {
        let config = config();
        let store = Arc::new(MemoryStore::new());
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let gw = FeedbackGateway::new(store, &config, Arc::new(ChannelSink(tx))).unwrap();

        let anonymous = gw.submit(NewSubmission::new("no contact")).await.unwrap();
        let reachable = gw
            .submit(NewSubmission::new("call me").phone("555-0100"))
            .await
            .unwrap();

        // Delivery is fire-and-forget, so collect both without assuming
        // which background task ran first.
        let mut received = Vec::new();
        for _ in 0..2 {
            let event = tokio::time::timeout(Duration::from_secs(1), rx.recv())
                .await
                .unwrap()
                .unwrap();
            received.push(event);
        }
        received.sort();

        assert_eq!(received, vec![(anonymous.id, false), (reachable.id, true)]);
    }

    #[tokio::test]
    async fn empty_contact_values_count_as_absent() {
        let submission = NewSubmission::new("content").email("").phone("");
        assert!(!submission.has_contact_info());
    }
}
