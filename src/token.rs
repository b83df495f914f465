//! Session token issuance and verification.
//!
//! Tokens are stateless HS256 JWTs: the claim set identifies the user and
//! carries the forced-password-reset obligation, and the signature binds it
//! all to a process-wide secret. Nothing is persisted server-side; a token's
//! only representation is the string held by the client.
//!
//! A token moves from valid (issue to expiry) to expired, and expiry is
//! terminal. There is no revoked state: logout is a client-side discard and
//! a leaked token stays valid until its expiry instant.
//!
//! Verification collapses every failure mode into `None`. Callers treat
//! `None` uniformly as "unauthenticated" and must not distinguish the cases
//! to clients.

use std::fmt;
use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::store::Role;

/// Default session lifetime: 24 hours from issuance.
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

// ============================================================================
// Claims
// ============================================================================

/// Identity facts embedded in a session token at authentication time.
///
/// Wire names are camelCase to stay compatible with tokens already held by
/// clients; `iat`/`exp` keep their standard registered-claim names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaims {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub requires_password_reset: bool,
    /// Issued-at, seconds since the Unix epoch
    pub iat: i64,
    /// Expiry instant, seconds since the Unix epoch
    pub exp: i64,
}

/// Claim fields supplied by the caller at issuance; timestamps are stamped
/// by the service.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionClaimInput {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub requires_password_reset: bool,
}

// ============================================================================
// Token service
// ============================================================================

/// Issues and verifies signed session tokens.
///
/// Holds the process-wide signing secret; construct once at startup and
/// share. All operations are `&self` and lock-free.
#[derive(Clone)]
pub struct SessionTokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    lifetime: Duration,
}

impl SessionTokenService {
    /// Create a service with an explicit token lifetime.
    pub fn new(secret: &str, lifetime: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            lifetime,
        }
    }

    /// Create a service with the standard 24-hour lifetime.
    pub fn with_default_lifetime(secret: &str) -> Self {
        Self::new(secret, DEFAULT_TOKEN_LIFETIME)
    }

    /// Issue a signed token for the given claim input.
    ///
    /// Stamps `iat` with the current instant and `exp` exactly one lifetime
    /// later. Any bit flip in the returned string invalidates it.
    pub fn issue(&self, input: SessionClaimInput) -> Result<String, TokenError> {
        let now = Utc::now().timestamp();
        let claims = SessionClaims {
            user_id: input.user_id,
            username: input.username,
            email: input.email,
            role: input.role,
            requires_password_reset: input.requires_password_reset,
            iat: now,
            exp: now + self.lifetime.as_secs() as i64,
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Issue(e.to_string()))
    }

    /// Verify a token and return its claims, or `None`.
    ///
    /// `None` covers malformed input, a signature mismatch, and an `exp` in
    /// the past (no clock-skew leeway). This boundary never panics and never
    /// surfaces error detail.
    pub fn verify(&self, token: &str) -> Option<SessionClaims> {
        let mut validation = Validation::default();
        validation.leeway = 0;

        match decode::<SessionClaims>(token, &self.decoding_key, &validation) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                tracing::debug!(reason = %e.kind_name(), "session token rejected");
                None
            }
        }
    }
}

impl fmt::Debug for SessionTokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionTokenService")
            .field("secret", &"[REDACTED]")
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

/// Stable rejection-reason labels for debug logging, without leaking
/// jsonwebtoken's error detail into log schemas.
trait KindName {
    fn kind_name(&self) -> &'static str;
}

impl KindName for jsonwebtoken::errors::Error {
    fn kind_name(&self) -> &'static str {
        use jsonwebtoken::errors::ErrorKind;
        match self.kind() {
            ErrorKind::ExpiredSignature => "expired",
            ErrorKind::InvalidSignature => "bad_signature",
            ErrorKind::InvalidToken => "malformed",
            _ => "invalid",
        }
    }
}

// ============================================================================
// Transport boundary
// ============================================================================

/// Extract the bearer token from an `Authorization` header value.
///
/// Returns `None` when the header is absent or does not carry the `Bearer `
/// scheme. Upstream that is an authorization failure in its own right,
/// though transports surface it to clients the same way as an invalid token.
pub fn extract_bearer(header: Option<&str>) -> Option<&str> {
    let value = header?;
    let token = value.strip_prefix("Bearer ")?;
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Token issuance errors.
///
/// Verification has no error type: every failure is `None`.
#[derive(Debug, Clone)]
pub enum TokenError {
    /// Signing/serialization failed during issuance
    Issue(String),
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Issue(msg) => write!(f, "token issuance failed: {}", msg),
        }
    }
}

impl std::error::Error for TokenError {}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn claim_input() -> SessionClaimInput {
        SessionClaimInput {
            user_id: 7,
            username: "alice".into(),
            email: "alice@example.com".into(),
            role: Role::Admin,
            requires_password_reset: true,
        }
    }

    fn service() -> SessionTokenService {
        SessionTokenService::with_default_lifetime("unit-test-signing-secret")
    }

    #[test]
    fn fresh_token_verifies() {
        let svc = service();
        let token = svc.issue(claim_input()).unwrap();
        let claims = svc.verify(&token).expect("fresh token must verify");

        assert_eq!(claims.user_id, 7);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.email, "alice@example.com");
        assert_eq!(claims.role, Role::Admin);
        assert!(claims.requires_password_reset);
        assert_eq!(claims.exp - claims.iat, 24 * 60 * 60);
    }

    #[test]
    fn expired_token_fails() {
        // Zero lifetime makes exp == iat, which is already in the past for
        // a leeway-free check.
        let svc = SessionTokenService::new("secret", Duration::ZERO);
        let token = svc.issue(claim_input()).unwrap();
        std::thread::sleep(Duration::from_millis(1100));
        assert!(svc.verify(&token).is_none());
    }

    #[test]
    fn flipped_character_fails() {
        let svc = service();
        let token = svc.issue(claim_input()).unwrap();

        // Flip one character in the payload segment.
        let mut bytes = token.clone().into_bytes();
        let dot = token.find('.').unwrap();
        let idx = dot + 3;
        bytes[idx] = if bytes[idx] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).unwrap();

        assert!(svc.verify(&tampered).is_none());
    }

    #[test]
    fn wrong_secret_fails() {
        let issuer = SessionTokenService::with_default_lifetime("secret-one");
        let verifier = SessionTokenService::with_default_lifetime("secret-two");
        let token = issuer.issue(claim_input()).unwrap();
        assert!(verifier.verify(&token).is_none());
    }

    #[test]
    fn structural_garbage_fails_quietly() {
        let svc = service();
        assert!(svc.verify("").is_none());
        assert!(svc.verify("not-a-jwt").is_none());
        assert!(svc.verify("a.b").is_none());
        assert!(svc.verify("a.b.c.d").is_none());
    }

    #[test]
    fn claims_use_camel_case_wire_names() {
        let svc = service();
        let token = svc.issue(claim_input()).unwrap();

        // Decode the payload segment and inspect the raw JSON keys.
        use base64::Engine;
        let payload = token.split('.').nth(1).unwrap();
        let raw = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(payload)
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&raw).unwrap();

        assert!(json.get("userId").is_some());
        assert!(json.get("requiresPasswordReset").is_some());
        assert!(json.get("iat").is_some());
        assert!(json.get("exp").is_some());
        assert!(json.get("user_id").is_none());
    }

    #[test]
    fn bearer_extraction() {
        assert_eq!(extract_bearer(Some("Bearer abc.def.ghi")), Some("abc.def.ghi"));
        assert_eq!(extract_bearer(Some("Bearer ")), None);
        assert_eq!(extract_bearer(Some("bearer abc")), None);
        assert_eq!(extract_bearer(Some("Basic dXNlcg==")), None);
        assert_eq!(extract_bearer(None), None);
    }

    #[test]
    fn debug_redacts_secret() {
        let debug = format!("{:?}", service());
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("unit-test-signing-secret"));
    }
}
