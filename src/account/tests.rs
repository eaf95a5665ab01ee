use super::*;
use crate::credentials::CredentialCipher;
use crate::store::UserStore;
use crate::token::TokenIssuer;

fn test_service() -> AccountService {
    test_service_with_key(&[3u8; 32])
}

fn test_service_with_key(key: &[u8]) -> AccountService {
    AccountService::new(
        UserStore::new(":memory:").unwrap(),
        CredentialCipher::new(key).unwrap(),
        TokenIssuer::new("test-signing-secret", None),
    )
}

#[test]
fn test_register_then_login_roundtrip() {
    let service = test_service();

    let (user_id, token) = service
        .register("alice", "alice@example.com", "correct-secret")
        .expect("register failed");
    assert!(user_id > 0);
    assert!(!token.is_empty());

    let (login_id, login_token) = service
        .login("alice", "alice@example.com", "correct-secret")
        .expect("login failed");
    assert_eq!(login_id, user_id);
    assert!(!login_token.is_empty());
}

#[test]
fn test_register_returns_verifiable_token() {
    let issuer = TokenIssuer::new("test-signing-secret", None);
    let service = AccountService::new(
        UserStore::new(":memory:").unwrap(),
        CredentialCipher::new(&[3u8; 32]).unwrap(),
        issuer.clone(),
    );

    let (user_id, token) = service
        .register("alice", "alice@example.com", "correct-secret")
        .unwrap();

    assert_eq!(issuer.verify(&token), Some(user_id));
}

#[test]
fn test_register_validation() {
    let service = test_service();

    // Username too short
    assert!(matches!(
        service.register("ab", "a@example.com", "long-enough"),
        Err(RegisterError::Validation(ValidationError::UsernameTooShort))
    ));

    // Username too long
    let long = "a".repeat(31);
    assert!(matches!(
        service.register(&long, "a@example.com", "long-enough"),
        Err(RegisterError::Validation(ValidationError::UsernameTooLong))
    ));

    // Bad characters
    assert!(matches!(
        service.register("alice!", "a@example.com", "long-enough"),
        Err(RegisterError::Validation(
            ValidationError::UsernameInvalidCharacters
        ))
    ));

    // Identity not email-shaped
    assert!(matches!(
        service.register("alice", "not-an-email", "long-enough"),
        Err(RegisterError::Validation(
            ValidationError::InvalidExternalIdentity
        ))
    ));

    // Secret too short
    assert!(matches!(
        service.register("alice", "a@example.com", "short"),
        Err(RegisterError::Validation(ValidationError::SecretTooShort))
    ));

    // Nothing was stored
    assert!(service
        .login("alice", "a@example.com", "long-enough")
        .is_err());
}

#[test]
fn test_username_shape_edge_cases() {
    assert!(validate_username("al_ice-99").is_ok());
    assert!(validate_username("abc").is_ok());
    assert!(validate_username(&"a".repeat(30)).is_ok());
    assert!(validate_username("has space").is_err());
    assert!(validate_username("tabs\there").is_err());
}

#[test]
fn test_external_identity_shape() {
    assert!(validate_external_identity("alice@example.com").is_ok());
    assert!(validate_external_identity("a.b+c@mail.example.co").is_ok());
    assert!(validate_external_identity("@example.com").is_err());
    assert!(validate_external_identity("alice@").is_err());
    assert!(validate_external_identity("alice@nodot").is_err());
    assert!(validate_external_identity("alice@.com").is_err());
    assert!(validate_external_identity("al ice@example.com").is_err());
}

#[test]
fn test_duplicate_username() {
    let service = test_service();

    service
        .register("alice", "alice@example.com", "correct-secret")
        .unwrap();

    let result = service.register("alice", "other@example.com", "other-secret");
    assert!(matches!(result, Err(RegisterError::DuplicateUsername)));

    // First account's credentials are unchanged
    let (_, _) = service
        .login("alice", "alice@example.com", "correct-secret")
        .expect("original account should still authenticate");
}

#[test]
fn test_login_failures_are_indistinguishable() {
    let service = test_service();
    service
        .register("alice", "alice@example.com", "correct-secret")
        .unwrap();

    // Wrong secret, wrong identity, and unknown username produce the same
    // error, so responses cannot be used to enumerate usernames.
    let wrong_secret = service.login("alice", "alice@example.com", "wrong-secret");
    let wrong_identity = service.login("alice", "mallory@example.com", "correct-secret");
    let unknown_user = service.login("mallory", "alice@example.com", "correct-secret");

    for result in [wrong_secret, wrong_identity, unknown_user] {
        assert!(matches!(result, Err(LoginError::InvalidCredentials)));
    }
}

#[test]
fn test_login_requires_both_identity_and_secret() {
    let service = test_service();
    service
        .register("alice", "alice@example.com", "correct-secret")
        .unwrap();

    assert!(service
        .login("alice", "alice@example.com", "correct-secret")
        .is_ok());
    assert!(service
        .login("alice", "alice@example.org", "correct-secret")
        .is_err());
    assert!(service
        .login("alice", "alice@example.com", "correct-secreT")
        .is_err());
}

#[test]
fn test_key_mismatch_is_invalid_credentials_not_crash() {
    // Register under one key, then stand up a service over the same rows
    // with a different key, as after an encryption-key rotation.
    let dir = tempfile::TempDir::new().unwrap();
    let db_path = dir.path().join("users.db");

    {
        let service = AccountService::new(
            UserStore::new(&db_path).unwrap(),
            CredentialCipher::new(&[1u8; 32]).unwrap(),
            TokenIssuer::new("test-signing-secret", None),
        );
        service
            .register("alice", "alice@example.com", "correct-secret")
            .unwrap();
    }

    let rotated = AccountService::new(
        UserStore::new(&db_path).unwrap(),
        CredentialCipher::new(&[2u8; 32]).unwrap(),
        TokenIssuer::new("test-signing-secret", None),
    );

    let result = rotated.login("alice", "alice@example.com", "correct-secret");
    assert!(matches!(result, Err(LoginError::InvalidCredentials)));
}

#[test]
fn test_get_credentials_roundtrip() {
    let service = test_service();
    let (user_id, _) = service
        .register("alice", "alice@example.com", "correct-secret")
        .unwrap();

    let creds = service
        .get_credentials_for_user(user_id)
        .unwrap()
        .expect("credentials missing");
    assert_eq!(creds.external_identity, "alice@example.com");
    assert_eq!(creds.secret, "correct-secret");
}

#[test]
fn test_get_credentials_for_unknown_user_is_none() {
    let service = test_service();
    assert!(service.get_credentials_for_user(9999).unwrap().is_none());
}

#[test]
fn test_get_credentials_key_mismatch_is_error() {
    let dir = tempfile::TempDir::new().unwrap();
    let db_path = dir.path().join("users.db");

    let user_id = {
        let service = AccountService::new(
            UserStore::new(&db_path).unwrap(),
            CredentialCipher::new(&[1u8; 32]).unwrap(),
            TokenIssuer::new("test-signing-secret", None),
        );
        service
            .register("alice", "alice@example.com", "correct-secret")
            .unwrap()
            .0
    };

    let rotated = AccountService::new(
        UserStore::new(&db_path).unwrap(),
        CredentialCipher::new(&[2u8; 32]).unwrap(),
        TokenIssuer::new("test-signing-secret", None),
    );

    // Operator-facing failure, not a silent None
    assert!(rotated.get_credentials_for_user(user_id).is_err());
}

#[test]
fn test_tenant_isolation() {
    let service = test_service();
    let (alice_id, _) = service
        .register("alice", "alice@example.com", "alice-secret")
        .unwrap();
    let (bob_id, _) = service
        .register("bob", "bob@example.com", "bob-secret!")
        .unwrap();

    let alice = service.get_credentials_for_user(alice_id).unwrap().unwrap();
    let bob = service.get_credentials_for_user(bob_id).unwrap().unwrap();

    assert_eq!(alice.secret, "alice-secret");
    assert_eq!(bob.secret, "bob-secret!");
    assert_ne!(alice.external_identity, bob.external_identity);
}

#[test]
fn test_secret_is_stored_encrypted() {
    let dir = tempfile::TempDir::new().unwrap();
    let db_path = dir.path().join("users.db");

    let service = AccountService::new(
        UserStore::new(&db_path).unwrap(),
        CredentialCipher::new(&[3u8; 32]).unwrap(),
        TokenIssuer::new("test-signing-secret", None),
    );
    service
        .register("alice", "alice@example.com", "correct-secret")
        .unwrap();

    // Inspect the persisted row through a second store handle: the blob on
    // disk must bear no resemblance to the plaintext.
    let raw = UserStore::new(&db_path)
        .unwrap()
        .find_by_username("alice")
        .unwrap()
        .unwrap();
    assert!(!raw.encrypted_secret.contains("correct-secret"));
}
