// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JWT authentication tests.
//!
//! These tests verify that tokens issued by `create_jwt` carry the claims
//! the identity provider contract promises and decode back to the same
//! identity, catching compatibility issues early.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use runlog::error::AppError;
use runlog::middleware::auth::{create_jwt, verify_token};
use runlog::models::Identity;
use serde::{Deserialize, Serialize};

/// Claims structure as an external issuer would produce it.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    exp: usize,
    iat: usize,
}

const SIGNING_KEY: &[u8] = b"test_signing_key_32_bytes_long!!";

fn now() -> usize {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize
}

fn external_token(claims: &Claims, key: &[u8]) -> String {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(key),
    )
    .expect("Failed to create JWT")
}

#[test]
fn test_jwt_roundtrip() {
    let identity = Identity {
        owner_id: "uid-123".to_string(),
        email: Some("runner@example.com".to_string()),
        display_name: Some("Runner".to_string()),
    };

    let token = create_jwt(&identity, SIGNING_KEY).unwrap();
    let decoded = verify_token(&token, SIGNING_KEY).unwrap();

    assert_eq!(decoded.identity, identity);
}

#[test]
fn test_jwt_claims_format() {
    let identity = Identity {
        owner_id: "uid-123".to_string(),
        email: None,
        display_name: None,
    };
    let token = create_jwt(&identity, SIGNING_KEY).unwrap();

    let data = decode::<Claims>(
        &token,
        &DecodingKey::from_secret(SIGNING_KEY),
        &Validation::new(Algorithm::HS256),
    )
    .unwrap();

    assert_eq!(data.claims.sub, "uid-123");
    assert!(data.claims.exp > data.claims.iat);
    assert_eq!(data.claims.exp - data.claims.iat, 30 * 24 * 60 * 60);
}

#[test]
fn test_external_token_without_profile_claims() {
    let claims = Claims {
        sub: "uid-456".to_string(),
        email: None,
        name: None,
        exp: now() + 3600,
        iat: now(),
    };
    let token = external_token(&claims, SIGNING_KEY);

    let verified = verify_token(&token, SIGNING_KEY).unwrap();
    assert_eq!(verified.expires_at.timestamp() as usize, claims.exp);

    let identity = verified.identity;
    assert_eq!(identity.owner_id, "uid-456");
    assert!(identity.email.is_none());
    assert!(identity.display_name.is_none());
}

#[test]
fn test_jwt_wrong_key_fails() {
    let claims = Claims {
        sub: "uid-123".to_string(),
        email: None,
        name: None,
        exp: now() + 3600,
        iat: now(),
    };
    let token = external_token(&claims, b"another_signing_key_32_bytes!!!!");

    let result = verify_token(&token, SIGNING_KEY);
    assert!(matches!(result, Err(AppError::InvalidToken)));
}

#[test]
fn test_jwt_expired_fails() {
    let claims = Claims {
        sub: "uid-123".to_string(),
        email: None,
        name: None,
        // Well past the default leeway
        exp: now() - 3600,
        iat: now() - 7200,
    };
    let token = external_token(&claims, SIGNING_KEY);

    assert!(matches!(
        verify_token(&token, SIGNING_KEY),
        Err(AppError::InvalidToken)
    ));
}

#[test]
fn test_jwt_blank_subject_fails() {
    let claims = Claims {
        sub: "  ".to_string(),
        email: None,
        name: None,
        exp: now() + 3600,
        iat: now(),
    };
    let token = external_token(&claims, SIGNING_KEY);

    assert!(matches!(
        verify_token(&token, SIGNING_KEY),
        Err(AppError::InvalidToken)
    ));
}
