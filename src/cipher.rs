//! Field-level encryption for sensitive submission values.
//!
//! Feedback content and optional contact details are encrypted individually
//! before they reach the row store, so a leaked database dump exposes only
//! opaque hex strings. The cipher is AES-256-CBC with PKCS#7 padding and a
//! fresh random 16-byte IV per value; the stored encoding is
//! `hex(iv) || hex(ciphertext)` in a single string column.
//!
//! The 32-byte key is the configured secret's raw UTF-8 bytes, zero-padded
//! or truncated to length. This deliberately skips a KDF: rows already at
//! rest were encrypted under exactly this key interpretation, and changing
//! it would orphan them.
//!
//! # Failure policy
//!
//! Decryption failure is fatal to the enclosing read. A value that fails to
//! decrypt (wrong key, corruption, a legacy plaintext row) must never be
//! passed off as valid data; a misconfigured key should be loudly visible
//! rather than silently tolerated.

use std::fmt;

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

const KEY_LEN: usize = 32;
const IV_LEN: usize = 16;
const BLOCK_LEN: usize = 16;

/// Encrypts and decrypts individual sensitive text fields.
///
/// `Send + Sync`; construct once at startup and share.
#[derive(Clone)]
pub struct FieldCipher {
    key: [u8; KEY_LEN],
}

impl FieldCipher {
    /// Build a cipher from the configured secret string.
    ///
    /// The secret's UTF-8 bytes become the AES-256 key, zero-padded if
    /// shorter than 32 bytes and truncated if longer. An empty secret is a
    /// configuration error: encryption must never run keyless.
    pub fn new(secret: &str) -> Result<Self, CipherError> {
        if secret.is_empty() {
            return Err(CipherError::KeyMissing);
        }

        let bytes = secret.as_bytes();
        let mut key = [0u8; KEY_LEN];
        let n = bytes.len().min(KEY_LEN);
        key[..n].copy_from_slice(&bytes[..n]);

        Ok(Self { key })
    }

    /// Encrypt a plaintext field value.
    ///
    /// The empty string encrypts to the empty string (optional columns store
    /// absence as emptiness, not as a ciphertext of nothing). Every call
    /// draws a fresh random IV, so identical plaintexts produce different
    /// ciphertexts.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }

        let mut iv = [0u8; IV_LEN];
        rand::thread_rng().fill_bytes(&mut iv);

        let ciphertext = Aes256CbcEnc::new(&self.key.into(), &iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());

        let mut out = String::with_capacity((IV_LEN + ciphertext.len()) * 2);
        out.push_str(&hex::encode(iv));
        out.push_str(&hex::encode(ciphertext));
        Ok(out)
    }

    /// Decrypt a value produced by [`encrypt`](Self::encrypt).
    ///
    /// The empty string decrypts to the empty string. Anything else must be
    /// the exact IV-prefixed hex format: the first 32 hex characters are the
    /// IV, the remainder the ciphertext. Fails with
    /// [`CipherError::DecryptFailed`] on a short or non-hex input, a
    /// ciphertext that is not a whole number of blocks, a padding check
    /// failure (wrong key or corrupted data), or non-UTF-8 plaintext.
    pub fn decrypt(&self, encoded: &str) -> Result<String, CipherError> {
        if encoded.is_empty() {
            return Ok(String::new());
        }

        // IV (32 hex chars) plus at least one ciphertext block.
        if encoded.len() < IV_LEN * 2 + BLOCK_LEN * 2 {
            return Err(CipherError::DecryptFailed);
        }

        // Split as bytes: a legacy plaintext row can put a multi-byte
        // character across index 32, where a str split would panic.
        let (iv_hex, ct_hex) = encoded.as_bytes().split_at(IV_LEN * 2);
        let iv: [u8; IV_LEN] = hex::decode(iv_hex)
            .ok()
            .and_then(|v| v.try_into().ok())
            .ok_or(CipherError::DecryptFailed)?;
        let ciphertext = hex::decode(ct_hex).map_err(|_| CipherError::DecryptFailed)?;

        if ciphertext.is_empty() || ciphertext.len() % BLOCK_LEN != 0 {
            return Err(CipherError::DecryptFailed);
        }

        let plaintext = Aes256CbcDec::new(&self.key.into(), &iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
            .map_err(|_| CipherError::DecryptFailed)?;

        String::from_utf8(plaintext).map_err(|_| CipherError::DecryptFailed)
    }
}

impl fmt::Debug for FieldCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldCipher")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Field cipher errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherError {
    /// No encryption key configured (empty secret)
    KeyMissing,
    /// Input is not the IV-prefixed format this cipher produces, the
    /// padding check failed (wrong key or tampered data), or the plaintext
    /// is not valid UTF-8
    DecryptFailed,
}

impl fmt::Display for CipherError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyMissing => write!(f, "encryption key is not configured"),
            Self::DecryptFailed => {
                write!(f, "decryption failed (wrong key, corrupt, or malformed data)")
            }
        }
    }
}

impl std::error::Error for CipherError {}

// ============================================================================
// Tests
// ============================================================================
