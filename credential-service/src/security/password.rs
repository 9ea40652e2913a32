/// Password hashing and verification using Argon2id
use crate::error::{CredentialError, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use zxcvbn::zxcvbn;

/// Hash a password using Argon2id with a random per-password salt.
///
/// Enforces the strength rules before hashing and returns a PHC-formatted
/// string safe for storage.
pub fn hash_password(password: &str) -> Result<String> {
    validate_password_strength(password)?;

    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| CredentialError::Internal(format!("password hashing failed: {}", e)))?
        .to_string();

    Ok(password_hash)
}

/// Verify a password against its stored PHC hash.
///
/// Comparison is constant-time inside the argon2 crate. Returns `false` on
/// mismatch; only a malformed stored hash or an algorithm fault is an error.
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|e| CredentialError::Internal(format!("invalid password hash format: {}", e)))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(_) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(CredentialError::Internal(format!(
            "password verification failed: {}",
            e
        ))),
    }
}

/// Validate password strength: length, composition, zxcvbn entropy score.
fn validate_password_strength(password: &str) -> Result<()> {
    if password.len() < 8 {
        return Err(CredentialError::WeakPassword(
            "password must be at least 8 characters".to_string(),
        ));
    }

    let has_uppercase = password.chars().any(|c| c.is_ascii_uppercase());
    let has_lowercase = password.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password.chars().any(|c| !c.is_alphanumeric());

    if !has_uppercase || !has_lowercase || !has_digit || !has_special {
        return Err(CredentialError::WeakPassword(
            "password must mix upper and lower case letters, digits and special characters"
                .to_string(),
        ));
    }

    let entropy = zxcvbn(password, &[]).map_err(|e| {
        CredentialError::Internal(format!("password entropy calculation failed: {}", e))
    })?;

    if entropy.score() < 3 {
        return Err(CredentialError::WeakPassword(
            "password is too predictable; choose a stronger one".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_valid_password() {
        let password = "vElvet!Quasar7-Lantern";
        let hash = hash_password(password).expect("should hash password successfully");
        assert!(verify_password(password, &hash).expect("should verify successfully"));
    }

    #[test]
    fn test_verify_wrong_password() {
        let password = "vElvet!Quasar7-Lantern";
        let hash = hash_password(password).expect("should hash password successfully");
        assert!(!verify_password("WrongPassword123!", &hash).expect("verification should succeed"));
    }

    #[test]
    fn test_weak_password_too_short() {
        let result = hash_password("Sh1rt!");
        assert!(matches!(result, Err(CredentialError::WeakPassword(_))));
    }

    #[test]
    fn test_weak_password_missing_composition() {
        assert!(matches!(
            hash_password("weakpassword123!"),
            Err(CredentialError::WeakPassword(_))
        ));
        assert!(matches!(
            hash_password("StrongPassword!"),
            Err(CredentialError::WeakPassword(_))
        ));
        assert!(matches!(
            hash_password("StrongPassword123"),
            Err(CredentialError::WeakPassword(_))
        ));
    }

    #[test]
    fn test_different_hashes_for_same_password() {
        let password = "vElvet!Quasar7-Lantern";
        let hash1 = hash_password(password).expect("should hash successfully");
        let hash2 = hash_password(password).expect("should hash successfully");
        // Different salts should produce different hashes
        assert_ne!(hash1, hash2);
    }
}
