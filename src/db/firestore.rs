// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations for run records.
//!
//! Runs live in the `runs` collection, one document per run, partitioned by
//! the `ownerId` field. Document ids are assigned by Firestore on insert.

use crate::db::collections;
use crate::error::AppError;
use crate::models::{Run, RunDocument};
use firestore::{
    FirestoreListenEvent, FirestoreListener, FirestoreListenerTarget,
    FirestoreMemListenStateStorage,
};
use std::sync::Arc;
use tokio::sync::Notify;

/// Each listener watches a single query, so one fixed target id suffices.
const RUNS_LISTENER_TARGET_ID: u32 = 1;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id).await.map_err(|e| {
            AppError::StoreUnavailable(format!("Failed to connect to Firestore: {}", e))
        })?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::StoreUnavailable(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client.as_ref().ok_or_else(|| {
            AppError::StoreUnavailable("Database not connected (offline mode)".to_string())
        })
    }

    // ─── Run Operations ──────────────────────────────────────────

    /// All runs owned by `owner_id`, in no particular order.
    pub async fn list_runs(&self, owner_id: &str) -> Result<Vec<Run>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::RUNS)
            .filter(|q| q.for_all([q.field("ownerId").eq(owner_id)]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::StoreUnavailable(e.to_string()))
    }

    /// Get a run by document ID.
    pub async fn get_run(&self, run_id: &str) -> Result<Option<Run>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::RUNS)
            .obj()
            .one(run_id)
            .await
            .map_err(|e| AppError::StoreUnavailable(e.to_string()))
    }

    /// Insert a new run and return it with its Firestore-assigned ID.
    pub async fn insert_run(&self, doc: &RunDocument) -> Result<Run, AppError> {
        self.get_client()?
            .fluent()
            .insert()
            .into(collections::RUNS)
            .generate_document_id()
            .object(doc)
            .execute()
            .await
            .map_err(|e| AppError::StoreUnavailable(e.to_string()))
    }

    /// Overwrite the whole document at `run_id`.
    pub async fn replace_run(&self, run_id: &str, doc: &RunDocument) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::RUNS)
            .document_id(run_id)
            .object(doc)
            .execute()
            .await
            .map_err(|e| AppError::StoreUnavailable(e.to_string()))?;
        Ok(())
    }

    /// Delete a run document. Deleting a missing document succeeds.
    pub async fn delete_run(&self, run_id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::RUNS)
            .document_id(run_id)
            .execute()
            .await
            .map_err(|e| AppError::StoreUnavailable(e.to_string()))?;
        Ok(())
    }

    // ─── Change Listening ────────────────────────────────────────

    /// Start listening for changes to `owner_id`'s runs.
    ///
    /// `changed` is notified on every document change, delete or removal in
    /// the owner's result set, including writes made by other clients.
    /// Bursts of changes may coalesce into one notification.
    pub async fn listen_runs(
        &self,
        owner_id: &str,
        changed: Arc<Notify>,
    ) -> Result<RunsListener, AppError> {
        let client = self.get_client()?;

        let mut listener = client
            .create_listener(FirestoreMemListenStateStorage::new())
            .await
            .map_err(|e| AppError::StoreUnavailable(format!("Failed to create listener: {}", e)))?;

        client
            .fluent()
            .select()
            .from(collections::RUNS)
            .filter(|q| q.for_all([q.field("ownerId").eq(owner_id)]))
            .listen()
            .add_target(
                FirestoreListenerTarget::new(RUNS_LISTENER_TARGET_ID),
                &mut listener,
            )
            .map_err(|e| AppError::StoreUnavailable(format!("Failed to add target: {}", e)))?;

        listener
            .start(move |event| {
                let changed = changed.clone();
                async move {
                    if matches!(
                        event,
                        FirestoreListenEvent::DocumentChange(_)
                            | FirestoreListenEvent::DocumentDelete(_)
                            | FirestoreListenEvent::DocumentRemove(_)
                    ) {
                        changed.notify_one();
                    }
                    Ok(())
                }
            })
            .await
            .map_err(|e| AppError::StoreUnavailable(format!("Failed to start listener: {}", e)))?;

        tracing::debug!(owner_id, "Started Firestore listener");

        Ok(RunsListener { inner: listener })
    }
}

/// A running Firestore listener. Call [`RunsListener::shutdown`] to stop it.
pub struct RunsListener {
    inner: FirestoreListener<firestore::FirestoreDb, FirestoreMemListenStateStorage>,
}

impl RunsListener {
    pub async fn shutdown(mut self) -> Result<(), AppError> {
        self.inner
            .shutdown()
            .await
            .map_err(|e| AppError::StoreUnavailable(format!("Failed to stop listener: {}", e)))
    }
}
