//! Invite code model
//!
//! Codes are short uppercase alphanumeric tokens shared out-of-band. Redemption
//! compares normalized text, so `ab12cd` and ` AB12CD ` name the same code.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Default length of a generated invite code
pub const INVITE_CODE_LENGTH: usize = 6;

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// A group's invite code, always stored in normalized (uppercase) form
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InviteCode(String);

impl InviteCode {
    /// Draw a fresh random code of the given length
    pub fn generate<R: Rng + ?Sized>(rng: &mut R, len: usize) -> Self {
        let code = (0..len)
            .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
            .collect();
        Self(code)
    }

    /// Normalize user input: trim surrounding whitespace and uppercase.
    ///
    /// Returns `None` for input that can never be a valid code (empty or containing
    /// anything other than ASCII letters and digits).
    pub fn normalize(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }
        Some(Self(trimmed.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InviteCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_shape() {
        let mut rng = rand::thread_rng();
        for _ in 0..50 {
            let code = InviteCode::generate(&mut rng, INVITE_CODE_LENGTH);
            assert_eq!(code.as_str().len(), INVITE_CODE_LENGTH);
            assert!(code
                .as_str()
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_normalize_is_case_insensitive() {
        let a = InviteCode::normalize("  ab12cd ").unwrap();
        let b = InviteCode::normalize("AB12CD").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "AB12CD");
    }

    #[test]
    fn test_normalize_rejects_garbage() {
        assert!(InviteCode::normalize("").is_none());
        assert!(InviteCode::normalize("   ").is_none());
        assert!(InviteCode::normalize("AB-12").is_none());
    }
}
