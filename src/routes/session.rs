// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session teardown.
//!
//! Sign-in itself happens at the identity provider; the first request that
//! carries its token starts the session here.

use crate::middleware::CurrentSession;
use crate::AppState;
use axum::{extract::State, routing::post, Extension, Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::Serialize;
use std::sync::Arc;

use crate::middleware::auth::SESSION_COOKIE;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/session/sign-out", post(sign_out))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignOutResponse {
    /// False when the caller was a guest (nothing to end)
    pub signed_out: bool,
}

/// End the caller's session and all of its run streams.
async fn sign_out(
    State(state): State<Arc<AppState>>,
    Extension(CurrentSession(session)): Extension<CurrentSession>,
    jar: CookieJar,
) -> (CookieJar, Json<SignOutResponse>) {
    let signed_out = if session.is_guest() {
        false
    } else {
        // The registry may already have dropped it; end it regardless
        state.sessions.sign_out(session.owner_id());
        session.sign_out();
        true
    };

    let jar = jar.remove(Cookie::from(SESSION_COOKIE));
    (jar, Json(SignOutResponse { signed_out }))
}
