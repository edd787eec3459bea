// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile routes: identity, totals, and profile picture.

use crate::error::{AppError, Result};
use crate::middleware::CurrentSession;
use crate::models::{Identity, RunTotals};
use crate::services::aggregate;
use crate::AppState;
use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Room for a maximum-size picture after base64 expansion.
const PICTURE_BODY_LIMIT: usize = 4 * 1024 * 1024;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/profile", get(get_profile))
        .route(
            "/api/profile/picture",
            get(get_picture)
                .put(put_picture)
                .delete(delete_picture)
                .layer(DefaultBodyLimit::max(PICTURE_BODY_LIMIT)),
        )
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ProfileResponse {
    pub guest: bool,
    pub owner_id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub totals: RunTotals,
    pub has_picture: bool,
}

/// Profile page data for the caller.
async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(CurrentSession(session)): Extension<CurrentSession>,
) -> Result<Json<ProfileResponse>> {
    let runs = session.list().await?;
    let totals = aggregate::totals(&runs);
    let owner_id = session.owner_id().to_string();

    let (email, display_name) = match session.identity() {
        Some(Identity {
            email,
            display_name,
            ..
        }) => (email.clone(), display_name.clone()),
        None => (None, None),
    };

    Ok(Json(ProfileResponse {
        guest: session.is_guest(),
        has_picture: state.pictures.get(&owner_id).is_some(),
        owner_id,
        email,
        display_name,
        totals,
    }))
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PictureBody {
    /// `data:image/...;base64,...`
    pub data_uri: String,
}

async fn get_picture(
    State(state): State<Arc<AppState>>,
    Extension(CurrentSession(session)): Extension<CurrentSession>,
) -> Result<Json<PictureBody>> {
    let data_uri = state
        .pictures
        .get(session.owner_id())
        .ok_or_else(|| AppError::NotFound("No profile picture".to_string()))?;
    Ok(Json(PictureBody { data_uri }))
}

async fn put_picture(
    State(state): State<Arc<AppState>>,
    Extension(CurrentSession(session)): Extension<CurrentSession>,
    Json(body): Json<PictureBody>,
) -> Result<StatusCode> {
    state.pictures.set(session.owner_id(), &body.data_uri)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_picture(
    State(state): State<Arc<AppState>>,
    Extension(CurrentSession(session)): Extension<CurrentSession>,
) -> Result<StatusCode> {
    state.pictures.remove(session.owner_id())?;
    Ok(StatusCode::NO_CONTENT)
}
