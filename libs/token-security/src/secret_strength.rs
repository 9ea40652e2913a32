//! Strength checks for the shared signing secret.
//!
//! HS256 security is entirely a function of the secret, so the signer warns
//! when handed key material that is short or low-entropy.

use base64::{engine::general_purpose::STANDARD, Engine};
use rand::RngCore;

/// Minimum secret length in bytes (256 bits).
const MIN_SECRET_LENGTH: usize = 32;

/// Recommended secret length in bytes (512 bits).
const RECOMMENDED_SECRET_LENGTH: usize = 64;

/// Minimum Shannon entropy in bits per byte.
const MIN_ENTROPY_BITS: f64 = 4.0;

/// Secret strength classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretStrength {
    /// Too short or too predictable for HS256 key material
    Weak,
    /// Meets the minimum bar
    Acceptable,
    /// Meets the recommended length with high entropy
    Strong,
}

/// Classify the strength of a signing secret.
pub fn validate_secret_strength(secret: &str) -> SecretStrength {
    let bytes = secret.as_bytes();

    if bytes.len() < MIN_SECRET_LENGTH {
        return SecretStrength::Weak;
    }

    let entropy = shannon_entropy(bytes);
    if entropy < MIN_ENTROPY_BITS {
        return SecretStrength::Weak;
    }

    if bytes.len() >= RECOMMENDED_SECRET_LENGTH && entropy >= 5.0 {
        SecretStrength::Strong
    } else {
        SecretStrength::Acceptable
    }
}

/// Generate a base64-encoded random secret of at least `length` bytes.
///
/// Intended for provisioning and test setup; production secrets come from
/// the deployment's secret store.
pub fn generate_secret(length: usize) -> String {
    let length = length.max(MIN_SECRET_LENGTH);
    let mut buffer = vec![0u8; length];
    rand::thread_rng().fill_bytes(&mut buffer);
    STANDARD.encode(&buffer)
}

/// Shannon entropy of a byte sequence, in bits per byte.
fn shannon_entropy(data: &[u8]) -> f64 {
    let mut freq = [0u32; 256];
    for &byte in data {
        freq[byte as usize] += 1;
    }

    let len = data.len() as f64;
    freq.iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_secret_is_weak() {
        assert_eq!(validate_secret_strength("short"), SecretStrength::Weak);
    }

    #[test]
    fn test_repeated_secret_is_weak() {
        let repeated = "a".repeat(64);
        assert_eq!(validate_secret_strength(&repeated), SecretStrength::Weak);
    }

    #[test]
    fn test_generated_secret_is_not_weak() {
        let secret = generate_secret(64);
        assert_ne!(validate_secret_strength(&secret), SecretStrength::Weak);
    }

    #[test]
    fn test_entropy_extremes() {
        assert!(shannon_entropy(&[b'x'; 100]) < 0.1);

        let uniform: Vec<u8> = (0..=255).collect();
        assert!(shannon_entropy(&uniform) > 7.5);
    }
}
