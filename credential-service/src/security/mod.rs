/// Security primitives for the credential engine
///
/// - **password**: Argon2id password hashing and verification
///
/// Token signing lives in the shared `token-security` library.
pub mod password;

pub use password::{hash_password, verify_password};
