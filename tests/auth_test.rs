//! Password hashing and field validators.

use consenso::auth::{password, validate};

const TEST_PASSWORD: &str = "password123";

#[test]
fn test_hash_and_verify_password() {
    let hash = password::hash_password(TEST_PASSWORD).expect("Failed to hash password");
    assert!(hash.starts_with("$argon2"));
    assert!(password::verify_password(TEST_PASSWORD, &hash).expect("verify"));
    assert!(!password::verify_password("wrong password", &hash).expect("verify"));
}

#[test]
fn test_hashes_are_salted() {
    let a = password::hash_password(TEST_PASSWORD).expect("hash");
    let b = password::hash_password(TEST_PASSWORD).expect("hash");
    assert_ne!(a, b);
}

#[test]
fn test_malformed_hash_is_an_error() {
    assert!(password::verify_password(TEST_PASSWORD, "not-a-hash").is_err());
}

#[test]
fn test_username_rules() {
    assert!(validate::validate_username("ana_maria").is_none());
    assert!(validate::validate_username("").is_some());
    assert!(validate::validate_username("a").is_some());
    assert!(validate::validate_username("with space").is_some());
    assert!(validate::validate_username(&"x".repeat(51)).is_some());
}

#[test]
fn test_email_and_password_rules() {
    assert!(validate::validate_email("ana@example.org").is_none());
    assert!(validate::validate_email("ana.example.org").is_some());
    assert!(validate::validate_password("12345678").is_none());
    assert!(validate::validate_password("1234567").is_some());
}

#[test]
fn test_length_limits_count_characters() {
    assert!(validate::validate_required("ñññ", "Title", 3).is_none());
    assert!(validate::validate_required("   ", "Title", 3).is_some());
    assert!(validate::validate_optional("", "Notes", 3).is_none());
    assert!(validate::validate_optional("abcd", "Notes", 3).is_some());
}

#[test]
fn test_into_result_joins_messages() {
    assert!(validate::into_result(Vec::new()).is_ok());
    let err = validate::into_result(vec!["a".to_string(), "b".to_string()]).expect_err("errors");
    assert_eq!(err.to_string(), "a; b");
}
