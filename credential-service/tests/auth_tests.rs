//! Authentication and refresh integration tests.

mod common;

use common::{TestHarness, GOOD_PASSWORD};
use credential_service::error::CredentialError;
use credential_service::models::{NewAccount, Role, VerificationChannel};
use credential_service::store::CredentialStore;
use token_security::{TokenError, TokenType};

#[tokio::test]
async fn test_register_starts_unverified() {
    let harness = TestHarness::new();
    let account = harness.register_account("alice").await;

    assert!(!account.is_verified);
    assert!(!account.is_email_verified);
    assert!(!account.is_phone_verified);
    assert_eq!(account.roles, vec![Role::new("user")]);
}

#[tokio::test]
async fn test_register_rejects_duplicate_identifiers() {
    let harness = TestHarness::new();
    harness.register_account("alice").await;

    let err = harness
        .authenticator
        .register(NewAccount {
            username: Some("alice2".to_string()),
            email: Some("alice@example.com".to_string()),
            phone: None,
            password: GOOD_PASSWORD.to_string(),
            roles: vec![],
        })
        .await
        .unwrap_err();
    assert!(matches!(err, CredentialError::CredentialAlreadyExists));
}

#[tokio::test]
async fn test_register_requires_some_identifier_and_strong_password() {
    let harness = TestHarness::new();

    let err = harness
        .authenticator
        .register(NewAccount {
            username: None,
            email: None,
            phone: None,
            password: GOOD_PASSWORD.to_string(),
            roles: vec![],
        })
        .await
        .unwrap_err();
    assert!(matches!(err, CredentialError::Validation(_)));

    let err = harness
        .authenticator
        .register(NewAccount {
            username: Some("weakling".to_string()),
            email: None,
            phone: None,
            password: "password".to_string(),
            roles: vec![],
        })
        .await
        .unwrap_err();
    assert!(matches!(err, CredentialError::WeakPassword(_)));
}

#[tokio::test]
async fn test_unverified_login_requires_verification_not_tokens() {
    let harness = TestHarness::new();
    harness.register_account("bob").await;

    // Correct password, but the account has not completed verification
    let err = harness
        .authenticator
        .authenticate("bob", GOOD_PASSWORD)
        .await
        .unwrap_err();
    assert!(matches!(err, CredentialError::VerificationRequired));
}

#[tokio::test]
async fn test_verified_login_issues_session_pair() {
    let harness = TestHarness::new();
    let account = harness.register_account("carol").await;
    harness
        .store
        .mark_account_verified(account.id, VerificationChannel::Email)
        .await
        .unwrap();

    let tokens = harness
        .authenticator
        .authenticate("carol", GOOD_PASSWORD)
        .await
        .expect("login should succeed");

    let claims = harness
        .signer
        .verify(&tokens.access_token, TokenType::Access)
        .unwrap();
    assert_eq!(claims.sub, account.id.to_string());
    assert_eq!(claims.roles, Some(vec!["user".to_string()]));

    harness
        .signer
        .verify(&tokens.refresh_token, TokenType::Refresh)
        .unwrap();
    assert_eq!(tokens.token_type, "Bearer");
}

#[tokio::test]
async fn test_wrong_password_fails_generically() {
    let harness = TestHarness::new();
    let account = harness.register_account("dave").await;
    harness
        .store
        .mark_account_verified(account.id, VerificationChannel::Email)
        .await
        .unwrap();

    let err = harness
        .authenticator
        .authenticate("dave", "Wrong-Kestrel9!Domino")
        .await
        .unwrap_err();
    assert!(matches!(err, CredentialError::VerificationFailed));
}

#[tokio::test]
async fn test_unknown_identifier_is_not_found() {
    let harness = TestHarness::new();

    let err = harness
        .authenticator
        .authenticate("nobody", GOOD_PASSWORD)
        .await
        .unwrap_err();
    assert!(matches!(err, CredentialError::CredentialNotFound));
}

#[tokio::test]
async fn test_e164_identifier_uses_the_phone_lookup_path() {
    let harness = TestHarness::new();
    let account = harness
        .authenticator
        .register(NewAccount {
            username: Some("phoneuser".to_string()),
            email: None,
            phone: Some("+14155551234".to_string()),
            password: GOOD_PASSWORD.to_string(),
            roles: vec![],
        })
        .await
        .unwrap();
    harness
        .store
        .mark_account_verified(account.id, VerificationChannel::Phone)
        .await
        .unwrap();

    // E.164-shaped identifier resolves through the phone column
    harness
        .authenticator
        .authenticate("+14155551234", GOOD_PASSWORD)
        .await
        .expect("phone login should succeed");

    // Username login still works independently
    harness
        .authenticator
        .authenticate("phoneuser", GOOD_PASSWORD)
        .await
        .expect("username login should succeed");
}

#[tokio::test]
async fn test_classification_never_falls_back_to_other_paths() {
    let harness = TestHarness::new();
    let account = harness
        .authenticator
        .register(NewAccount {
            username: Some("erin".to_string()),
            email: None,
            phone: None,
            password: GOOD_PASSWORD.to_string(),
            roles: vec![],
        })
        .await
        .unwrap();
    harness
        .store
        .mark_account_verified(account.id, VerificationChannel::Email)
        .await
        .unwrap();

    // An email-shaped identifier only consults the email column; the
    // account is username-only, so the lookup misses with no fallback
    let err = harness
        .authenticator
        .authenticate("erin@example.com", GOOD_PASSWORD)
        .await
        .unwrap_err();
    assert!(matches!(err, CredentialError::CredentialNotFound));
}

#[tokio::test]
async fn test_refresh_issues_fresh_access_token_only() {
    let harness = TestHarness::new();
    let account = harness.register_account("frank").await;
    harness
        .store
        .mark_account_verified(account.id, VerificationChannel::Email)
        .await
        .unwrap();

    let tokens = harness
        .authenticator
        .authenticate("frank", GOOD_PASSWORD)
        .await
        .unwrap();

    let refreshed = harness
        .authenticator
        .refresh(&tokens.refresh_token)
        .await
        .expect("refresh should succeed");

    let claims = harness
        .signer
        .verify(&refreshed.access_token, TokenType::Access)
        .unwrap();
    assert_eq!(claims.sub, account.id.to_string());
    assert_eq!(refreshed.token_type, "Bearer");
    assert!(refreshed.expires_in > 0);
}

#[tokio::test]
async fn test_refresh_rejects_access_tokens_by_type() {
    let harness = TestHarness::new();
    let account = harness.register_account("grace").await;
    harness
        .store
        .mark_account_verified(account.id, VerificationChannel::Email)
        .await
        .unwrap();

    let tokens = harness
        .authenticator
        .authenticate("grace", GOOD_PASSWORD)
        .await
        .unwrap();

    // Presenting the access token on the refresh path is a type mismatch,
    // not a generic failure
    let err = harness
        .authenticator
        .refresh(&tokens.access_token)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CredentialError::Token(TokenError::TypeMismatch {
            expected: TokenType::Refresh,
            actual: TokenType::Access,
        })
    ));
}

#[tokio::test]
async fn test_refresh_rejects_garbage_and_empty_tokens() {
    let harness = TestHarness::new();

    let err = harness.authenticator.refresh("garbage").await.unwrap_err();
    assert!(matches!(
        err,
        CredentialError::Token(TokenError::Malformed)
    ));

    let err = harness.authenticator.refresh("").await.unwrap_err();
    assert!(matches!(err, CredentialError::Token(TokenError::Empty)));
}

#[tokio::test]
async fn test_refresh_for_a_vanished_account_is_not_found() {
    let harness = TestHarness::new();

    // A refresh token whose subject was never registered in this store
    let refresh_token = harness
        .signer
        .issue_refresh_token(&uuid::Uuid::new_v4().to_string())
        .unwrap();

    let err = harness
        .authenticator
        .refresh(&refresh_token)
        .await
        .unwrap_err();
    assert!(matches!(err, CredentialError::CredentialNotFound));
}
