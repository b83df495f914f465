//! Constant-time comparison helpers.
//!
//! Credential digests must never be compared with `==`: the early-exit
//! behaviour of an ordinary byte comparison leaks, through response timing,
//! how long the matching prefix is. The `subtle` crate provides comparisons
//! whose duration does not depend on where (or whether) the inputs differ.

use subtle::ConstantTimeEq;

/// Compare two byte slices in constant time.
///
/// Slices of different lengths compare unequal; the length check itself is
/// not secret (digest lengths are public).
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

/// Compare two strings in constant time.
///
/// Convenience wrapper around [`constant_time_eq`] for hex-encoded digests.
pub fn constant_time_str_eq(a: &str, b: &str) -> bool {
    constant_time_eq(a.as_bytes(), b.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_inputs_match() {
        assert!(constant_time_eq(b"deadbeef", b"deadbeef"));
        assert!(constant_time_str_eq("a1b2c3", "a1b2c3"));
    }

    #[test]
    fn different_inputs_do_not_match() {
        assert!(!constant_time_eq(b"deadbeef", b"deadbeee"));
        assert!(!constant_time_str_eq("a1b2c3", "a1b2c4"));
    }

    #[test]
    fn different_lengths_do_not_match() {
        assert!(!constant_time_eq(b"short", b"longer input"));
    }

    #[test]
    fn empty_inputs_match() {
        assert!(constant_time_eq(b"", b""));
    }
}
