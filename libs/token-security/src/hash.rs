//! One-way hashing and display masking for persisted credentials.
//!
//! Raw API keys are never stored; only the SHA-256 hex digest is persisted
//! and used for lookup. The display prefix is computed once at issuance,
//! since the raw value is unrecoverable afterwards.

use sha2::{Digest, Sha256};

/// Mask inserted between the leading and trailing characters of a key.
const PREFIX_MASK: &str = "****************";

/// Minimum raw length for masking; shorter values are shown unmasked.
const MIN_MASKABLE_LEN: usize = 8;

/// Compute the hex-encoded SHA-256 digest of the input.
pub fn sha256_hex(input: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input);
    hex::encode(hasher.finalize())
}

/// Build the masked display form of a raw key: first four characters, a
/// fixed mask, last four characters. Values shorter than eight characters
/// cannot be meaningfully masked and are returned as-is.
pub fn display_prefix(raw: &str) -> String {
    if raw.len() < MIN_MASKABLE_LEN {
        return raw.to_string();
    }
    format!(
        "{}{}{}",
        &raw[..4],
        PREFIX_MASK,
        &raw[raw.len() - 4..]
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex_deterministic() {
        let a = sha256_hex(b"raw-api-key");
        let b = sha256_hex(b"raw-api-key");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);

        assert_ne!(a, sha256_hex(b"other-key"));
    }

    #[test]
    fn test_display_prefix_masks_long_values() {
        let masked = display_prefix("abcdefghijklmnop");
        assert!(masked.starts_with("abcd"));
        assert!(masked.ends_with("mnop"));
        assert!(masked.contains("****"));
        assert_eq!(masked.len(), 4 + PREFIX_MASK.len() + 4);
    }

    #[test]
    fn test_display_prefix_short_value_unmasked() {
        assert_eq!(display_prefix("abc"), "abc");
        assert_eq!(display_prefix("abcdefg"), "abcdefg");
    }

    #[test]
    fn test_display_prefix_boundary_length() {
        // Exactly eight characters gets masked
        let masked = display_prefix("abcd1234");
        assert!(masked.starts_with("abcd"));
        assert!(masked.ends_with("1234"));
        assert_ne!(masked, "abcd1234");
    }
}
