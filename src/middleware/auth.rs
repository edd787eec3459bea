// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session resolution middleware.
//!
//! Requests carrying a valid identity-provider token run in that user's
//! signed-in session; requests without a token run in the guest session.
//! A token that is present but invalid is rejected rather than downgraded
//! to guest.

use crate::error::AppError;
use crate::models::Identity;
use crate::services::SessionContext;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Cookie carrying the session token.
pub const SESSION_COOKIE: &str = "runlog_token";

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (owner ID)
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// Session a request runs in, inserted by [`resolve_session`].
#[derive(Clone)]
pub struct CurrentSession(pub Arc<SessionContext>);

/// Middleware that attaches the caller's session (signed-in or guest).
pub async fn resolve_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    // Try cookie first, then header
    let token = if let Some(cookie) = jar.get(SESSION_COOKIE) {
        Some(cookie.value().to_string())
    } else {
        let auth_header = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        match auth_header {
            Some(h) if h.starts_with("Bearer ") => Some(h[7..].to_string()),
            Some(_) => return Err(StatusCode::UNAUTHORIZED),
            None => None,
        }
    };

    let session = match token {
        Some(token) => {
            let verified = verify_token(&token, &state.config.jwt_signing_key)
                .map_err(|_| StatusCode::UNAUTHORIZED)?;
            state
                .sessions
                .sign_in(verified.identity, verified.expires_at, &state.db)
        }
        None => state.guest.clone(),
    };

    request.extensions_mut().insert(CurrentSession(session));

    Ok(next.run(request).await)
}

/// A token that passed signature and expiry checks.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedToken {
    pub identity: Identity,
    pub expires_at: DateTime<Utc>,
}

/// Decode a session token into the identity it asserts.
pub fn verify_token(token: &str, signing_key: &[u8]) -> Result<VerifiedToken, AppError> {
    let key = DecodingKey::from_secret(signing_key);
    let validation = Validation::new(Algorithm::HS256);

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| {
        tracing::debug!(error = %e, "Rejected session token");
        AppError::InvalidToken
    })?;

    let claims = token_data.claims;
    if claims.sub.trim().is_empty() {
        return Err(AppError::InvalidToken);
    }
    let expires_at = i64::try_from(claims.exp)
        .ok()
        .and_then(|exp| DateTime::from_timestamp(exp, 0))
        .ok_or(AppError::InvalidToken)?;

    Ok(VerifiedToken {
        identity: Identity {
            owner_id: claims.sub,
            email: claims.email,
            display_name: claims.name,
        },
        expires_at,
    })
}

/// Create a JWT for a user session.
pub fn create_jwt(identity: &Identity, signing_key: &[u8]) -> anyhow::Result<String> {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as usize;

    let claims = Claims {
        sub: identity.owner_id.clone(),
        email: identity.email.clone(),
        name: identity.display_name.clone(),
        iat: now,
        exp: now + 30 * 24 * 60 * 60, // 30 days
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &[u8] = b"test_signing_key_32_bytes_long!!";

    #[test]
    fn test_token_round_trip() {
        let identity = Identity {
            owner_id: "uid-123".to_string(),
            email: Some("runner@example.com".to_string()),
            display_name: Some("Runner".to_string()),
        };

        let token = create_jwt(&identity, KEY).unwrap();
        let verified = verify_token(&token, KEY).unwrap();

        assert_eq!(verified.identity, identity);
        assert!(verified.expires_at > Utc::now() + chrono::Duration::days(29));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let identity = Identity {
            owner_id: "uid-123".to_string(),
            email: None,
            display_name: None,
        };
        let token = create_jwt(&identity, KEY).unwrap();

        let err = verify_token(&token, b"another_signing_key_32_bytes!!!!").unwrap_err();
        assert!(matches!(err, AppError::InvalidToken));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(
            verify_token("not.a.jwt", KEY),
            Err(AppError::InvalidToken)
        ));
    }
}
