// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Run repository: one contract over the two storage realms.
//!
//! - [`RemoteRunRepository`] stores runs in Firestore and pushes a fresh
//!   snapshot to subscribers whenever the owner's runs change.
//! - [`LocalRunRepository`] stores guest runs in on-device storage.
//!   Subscribing yields the current snapshot once; callers subscribe again
//!   after a mutation.
//!
//! Which realm a session uses is decided once, when its
//! [`SessionRepository`] is built.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::{watch, Notify};

use crate::db::firestore::RunsListener;
use crate::db::local::keys;
use crate::db::{FirestoreDb, LocalStorage};
use crate::error::{AppError, Result};
use crate::models::{Run, RunInput};
use crate::services::subscription::{self, RunSubscription, SnapshotSink};

/// Operations every storage realm supports.
///
/// Every call is scoped to `owner_id`; records of other owners are never
/// returned, replaced or removed.
pub trait RunRepository {
    /// Open a stream of complete, date-ascending snapshots of the owner's runs.
    fn subscribe(&self, owner_id: &str) -> impl Future<Output = Result<RunSubscription>> + Send;

    /// Current runs of the owner, date ascending.
    fn list(&self, owner_id: &str) -> impl Future<Output = Result<Vec<Run>>> + Send;

    /// Validate, derive the speed, assign an id, and persist.
    fn create(&self, owner_id: &str, input: RunInput)
        -> impl Future<Output = Result<Run>> + Send;

    /// Replace the whole record at `run_id`.
    ///
    /// Fails with `NotFound` if the owner has no run with that id.
    fn update(
        &self,
        run_id: &str,
        owner_id: &str,
        input: RunInput,
    ) -> impl Future<Output = Result<Run>> + Send;

    /// Remove a run. Removing an absent run succeeds.
    fn delete(&self, run_id: &str, owner_id: &str) -> impl Future<Output = Result<()>> + Send;
}

/// Order snapshots by date, ties by id so repeated snapshots are stable.
pub fn sort_snapshot(mut runs: Vec<Run>) -> Vec<Run> {
    runs.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
    runs
}

fn not_found(run_id: &str) -> AppError {
    AppError::NotFound(format!("Run {} not found", run_id))
}

// ─── Remote Realm ────────────────────────────────────────────

/// Firestore-backed repository for signed-in sessions.
#[derive(Clone)]
pub struct RemoteRunRepository {
    db: FirestoreDb,
    session: watch::Receiver<bool>,
}

impl RemoteRunRepository {
    pub fn new(db: FirestoreDb, session: watch::Receiver<bool>) -> Self {
        Self { db, session }
    }

    async fn list_sorted(&self, owner_id: &str) -> Result<Vec<Run>> {
        Ok(sort_snapshot(self.db.list_runs(owner_id).await?))
    }
}

impl RunRepository for RemoteRunRepository {
    async fn subscribe(&self, owner_id: &str) -> Result<RunSubscription> {
        let (sink, subscription) = subscription::channel(self.session.clone());
        let changed = Arc::new(Notify::new());

        // Listen before the initial read so no change falls in between
        let listener = self.db.listen_runs(owner_id, changed.clone()).await?;
        let initial = match self.list_sorted(owner_id).await {
            Ok(runs) => runs,
            Err(e) => {
                if let Err(stop_err) = listener.shutdown().await {
                    tracing::warn!(owner_id, error = %stop_err, "Failed to stop listener");
                }
                return Err(e);
            }
        };

        tracing::debug!(owner_id, count = initial.len(), "Opened remote run subscription");

        tokio::spawn(forward_remote_changes(
            self.clone(),
            owner_id.to_string(),
            listener,
            changed,
            sink,
            initial,
        ));

        Ok(subscription)
    }

    async fn list(&self, owner_id: &str) -> Result<Vec<Run>> {
        self.list_sorted(owner_id).await
    }

    async fn create(&self, owner_id: &str, input: RunInput) -> Result<Run> {
        let doc = input.into_document(owner_id)?;
        let run = self.db.insert_run(&doc).await?;

        tracing::info!(
            owner_id,
            run_id = %run.id,
            sport = run.sport.as_str(),
            "Created run"
        );
        Ok(run)
    }

    async fn update(&self, run_id: &str, owner_id: &str, input: RunInput) -> Result<Run> {
        let doc = input.into_document(owner_id)?;

        match self.db.get_run(run_id).await? {
            Some(existing) if existing.owner_id == owner_id => {}
            _ => return Err(not_found(run_id)),
        }

        self.db.replace_run(run_id, &doc).await?;

        tracing::info!(owner_id, run_id, "Updated run");
        Ok(Run::from_document(run_id, doc))
    }

    async fn delete(&self, run_id: &str, owner_id: &str) -> Result<()> {
        match self.db.get_run(run_id).await? {
            None => {
                tracing::debug!(owner_id, run_id, "Run already absent");
                return Ok(());
            }
            Some(existing) if existing.owner_id != owner_id => {
                tracing::warn!(owner_id, run_id, "Refusing to delete another owner's run");
                return Ok(());
            }
            Some(_) => {}
        }

        self.db.delete_run(run_id).await?;

        tracing::info!(owner_id, run_id, "Deleted run");
        Ok(())
    }
}

/// Push the initial snapshot, then a fresh snapshot after every change,
/// until the subscriber goes away or the session ends.
async fn forward_remote_changes(
    repo: RemoteRunRepository,
    owner_id: String,
    listener: RunsListener,
    changed: Arc<Notify>,
    mut sink: SnapshotSink,
    initial: Vec<Run>,
) {
    if sink.send(initial).await {
        loop {
            tokio::select! {
                _ = sink.closed() => break,
                _ = changed.notified() => {
                    match repo.list_sorted(&owner_id).await {
                        Ok(runs) => {
                            if !sink.send(runs).await {
                                break;
                            }
                        }
                        Err(e) => {
                            // Retried on the next change notification
                            tracing::warn!(
                                owner_id = %owner_id,
                                error = %e,
                                "Failed to refresh run snapshot"
                            );
                        }
                    }
                }
            }
        }
    }

    if let Err(e) = listener.shutdown().await {
        tracing::warn!(owner_id = %owner_id, error = %e, "Failed to stop listener");
    }
    tracing::debug!(owner_id = %owner_id, "Remote run subscription ended");
}

// ─── Local Guest Realm ───────────────────────────────────────

/// On-device repository for guest sessions.
///
/// All guest runs share the `runs` key as one JSON array.
#[derive(Clone)]
pub struct LocalRunRepository {
    storage: LocalStorage,
    session: watch::Receiver<bool>,
}

impl LocalRunRepository {
    pub fn new(storage: LocalStorage, session: watch::Receiver<bool>) -> Self {
        Self { storage, session }
    }

    fn read_owned(&self, owner_id: &str) -> Result<Vec<Run>> {
        let runs: Vec<Run> = self.storage.get_json(keys::RUNS)?.unwrap_or_default();
        Ok(sort_snapshot(
            runs.into_iter().filter(|r| r.owner_id == owner_id).collect(),
        ))
    }

    /// Drop every locally stored guest run.
    pub fn clear_local_runs(&self) -> Result<()> {
        self.storage.remove_item(keys::RUNS)?;
        tracing::info!("Cleared local guest runs");
        Ok(())
    }
}

impl RunRepository for LocalRunRepository {
    async fn subscribe(&self, owner_id: &str) -> Result<RunSubscription> {
        let snapshot = self.read_owned(owner_id)?;
        let (sink, subscription) = subscription::channel(self.session.clone());
        // The buffer is empty, so this only fails if the session already ended
        sink.try_send(snapshot);
        Ok(subscription)
    }

    async fn list(&self, owner_id: &str) -> Result<Vec<Run>> {
        self.read_owned(owner_id)
    }

    async fn create(&self, owner_id: &str, input: RunInput) -> Result<Run> {
        let doc = input.into_document(owner_id)?;
        let run = Run::from_document(uuid::Uuid::new_v4().to_string(), doc);

        self.storage.update_json(keys::RUNS, |runs: &mut Vec<Run>| {
            runs.push(run.clone());
            Ok(())
        })?;

        tracing::info!(
            owner_id,
            run_id = %run.id,
            sport = run.sport.as_str(),
            "Created local run"
        );
        Ok(run)
    }

    async fn update(&self, run_id: &str, owner_id: &str, input: RunInput) -> Result<Run> {
        let doc = input.into_document(owner_id)?;

        let run = self.storage.update_json(keys::RUNS, |runs: &mut Vec<Run>| {
            let slot = runs
                .iter_mut()
                .find(|r| r.id == run_id && r.owner_id == owner_id)
                .ok_or_else(|| not_found(run_id))?;
            *slot = Run::from_document(run_id, doc);
            Ok(slot.clone())
        })?;

        tracing::info!(owner_id, run_id, "Updated local run");
        Ok(run)
    }

    async fn delete(&self, run_id: &str, owner_id: &str) -> Result<()> {
        let removed = self.storage.update_json(keys::RUNS, |runs: &mut Vec<Run>| {
            let before = runs.len();
            runs.retain(|r| !(r.id == run_id && r.owner_id == owner_id));
            Ok(before - runs.len())
        })?;

        tracing::info!(owner_id, run_id, removed, "Deleted local run");
        Ok(())
    }
}

// ─── Session Dispatch ────────────────────────────────────────

/// The realm chosen for one session.
#[derive(Clone)]
pub enum SessionRepository {
    Remote(RemoteRunRepository),
    Local(LocalRunRepository),
}

impl RunRepository for SessionRepository {
    async fn subscribe(&self, owner_id: &str) -> Result<RunSubscription> {
        match self {
            SessionRepository::Remote(repo) => repo.subscribe(owner_id).await,
            SessionRepository::Local(repo) => repo.subscribe(owner_id).await,
        }
    }

    async fn list(&self, owner_id: &str) -> Result<Vec<Run>> {
        match self {
            SessionRepository::Remote(repo) => repo.list(owner_id).await,
            SessionRepository::Local(repo) => repo.list(owner_id).await,
        }
    }

    async fn create(&self, owner_id: &str, input: RunInput) -> Result<Run> {
        match self {
            SessionRepository::Remote(repo) => repo.create(owner_id, input).await,
            SessionRepository::Local(repo) => repo.create(owner_id, input).await,
        }
    }

    async fn update(&self, run_id: &str, owner_id: &str, input: RunInput) -> Result<Run> {
        match self {
            SessionRepository::Remote(repo) => repo.update(run_id, owner_id, input).await,
            SessionRepository::Local(repo) => repo.update(run_id, owner_id, input).await,
        }
    }

    async fn delete(&self, run_id: &str, owner_id: &str) -> Result<()> {
        match self {
            SessionRepository::Remote(repo) => repo.delete(run_id, owner_id).await,
            SessionRepository::Local(repo) => repo.delete(run_id, owner_id).await,
        }
    }
}
