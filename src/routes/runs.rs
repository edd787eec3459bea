// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Run routes: list, live stream, create, replace, delete.
//!
//! Every handler works through the request's [`CurrentSession`], so the
//! storage realm is whatever the session was built with.

use crate::error::Result;
use crate::middleware::CurrentSession;
use crate::models::{MonthGroup, Run, RunForm, RunTotals};
use crate::services::aggregate;
use crate::AppState;
use axum::{
    extract::Path,
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, put},
    Extension, Json, Router,
};
use futures_util::{Stream, StreamExt};
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// SSE event name for run snapshots.
const RUNS_EVENT: &str = "runs";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/runs", get(list_runs).post(create_run))
        .route("/api/runs/stream", get(stream_runs))
        .route("/api/runs/{id}", put(update_run).delete(delete_run))
}

/// Run list with everything the list page renders.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RunsResponse {
    /// Date ascending
    pub runs: Vec<Run>,
    /// Chronological month groups
    pub months: Vec<MonthGroup>,
    pub totals: RunTotals,
}

impl RunsResponse {
    pub fn from_runs(runs: Vec<Run>) -> Self {
        Self {
            months: aggregate::group_by_month(&runs),
            totals: aggregate::totals(&runs),
            runs,
        }
    }
}

/// Current runs for the caller's owner scope.
async fn list_runs(
    Extension(CurrentSession(session)): Extension<CurrentSession>,
) -> Result<Json<RunsResponse>> {
    let runs = session.list().await?;

    tracing::debug!(
        owner_id = session.owner_id(),
        count = runs.len(),
        "Listed runs"
    );

    Ok(Json(RunsResponse::from_runs(runs)))
}

/// Server-sent events: one `runs` event per snapshot.
///
/// Signed-in sessions keep receiving snapshots as runs change anywhere.
/// Guest sessions receive the current snapshot and the stream ends.
async fn stream_runs(
    Extension(CurrentSession(session)): Extension<CurrentSession>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, axum::Error>>>> {
    let subscription = session.subscribe().await?;

    tracing::info!(
        owner_id = session.owner_id(),
        guest = session.is_guest(),
        "Opened run stream"
    );

    let events = subscription.map(|runs| {
        Event::default()
            .event(RUNS_EVENT)
            .json_data(RunsResponse::from_runs(runs))
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

async fn create_run(
    Extension(CurrentSession(session)): Extension<CurrentSession>,
    Json(form): Json<RunForm>,
) -> Result<(StatusCode, Json<Run>)> {
    let input = form.parse()?;
    let run = session.create(input).await?;
    Ok((StatusCode::CREATED, Json(run)))
}

/// Replace a run entirely.
async fn update_run(
    Extension(CurrentSession(session)): Extension<CurrentSession>,
    Path(id): Path<String>,
    Json(form): Json<RunForm>,
) -> Result<Json<Run>> {
    let input = form.parse()?;
    let run = session.update(&id, input).await?;
    Ok(Json(run))
}

async fn delete_run(
    Extension(CurrentSession(session)): Extension<CurrentSession>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    session.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
