//! Password credential hashing and verification.
//!
//! Credentials are stored as `hex(salt):hex(digest)` where the digest is
//! PBKDF2-HMAC-SHA512 over the password with the hex-encoded salt string as
//! the KDF salt input. The hex string (not the raw salt bytes) is what feeds
//! the KDF; existing stored digests were derived that way, so the encoding
//! is load-bearing.
//!
//! # Usage
//!
//! ```
//! use confide::CredentialHasher;
//!
//! let hasher = CredentialHasher::default();
//! let stored = hasher.hash("hunter2hunter2");
//!
//! assert!(hasher.verify("hunter2hunter2", &stored));
//! assert!(!hasher.verify("wrong", &stored));
//! ```

use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha512;

use crate::crypto::constant_time_str_eq;

/// Length of the random salt in raw bytes (32 hex characters once encoded).
const SALT_LEN: usize = 16;

/// Length of the derived digest in bytes (128 hex characters once encoded).
const DIGEST_LEN: usize = 64;

/// Default PBKDF2 iteration count.
///
/// Fixed per deployment; raising it invalidates nothing (verification
/// re-derives with the verifier's configured count), but stored digests
/// derived under a different count will no longer verify, so treat this as
/// part of the deployment's data format.
const DEFAULT_ITERATIONS: u32 = 1000;

/// Derives and verifies salted password digests.
///
/// Stateless apart from the iteration count; cheap to clone and share.
#[derive(Debug, Clone, Copy)]
pub struct CredentialHasher {
    iterations: u32,
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
        }
    }
}

impl CredentialHasher {
    /// Create a hasher with a custom iteration count.
    pub fn with_iterations(iterations: u32) -> Self {
        Self { iterations }
    }

    /// Hash a password with a fresh random salt.
    ///
    /// Returns `hex(salt):hex(digest)`. Never fails: any UTF-8 password of
    /// any length (including empty) produces a digest. Two calls with the
    /// same password yield different outputs because the salt is
    /// re-randomized per call.
    pub fn hash(&self, password: &str) -> String {
        let mut salt = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);
        let salt_hex = hex::encode(salt);

        let digest_hex = self.derive(password, &salt_hex);
        format!("{}:{}", salt_hex, digest_hex)
    }

    /// Verify a password against a stored `salt:digest` credential.
    ///
    /// Returns `false` (never panics, never errors) on malformed stored
    /// input: a missing separator, an empty salt, or a digest of the wrong
    /// shape all verify as a mismatch. Digest comparison is constant-time.
    pub fn verify(&self, password: &str, stored: &str) -> bool {
        let Some((salt_hex, digest_hex)) = stored.split_once(':') else {
            return false;
        };
        if salt_hex.is_empty() || digest_hex.is_empty() {
            return false;
        }

        let candidate = self.derive(password, salt_hex);
        constant_time_str_eq(&candidate, digest_hex)
    }

    /// Derive the hex digest for a password under the given hex salt string.
    fn derive(&self, password: &str, salt_hex: &str) -> String {
        let mut digest = [0u8; DIGEST_LEN];
        pbkdf2_hmac::<Sha512>(
            password.as_bytes(),
            salt_hex.as_bytes(),
            self.iterations,
            &mut digest,
        );
        hex::encode(digest)
    }
}
