// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session contexts.
//!
//! A session context binds an owner scope to one storage realm for its whole
//! lifetime: signed-in users get the Firestore realm, guests get local
//! storage. Signing out closes the context's scope, which ends every
//! subscription opened through it.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::db::{FirestoreDb, LocalStorage};
use crate::error::Result;
use crate::models::{Identity, Run, RunInput, GUEST_OWNER_ID};
use crate::services::repository::{
    LocalRunRepository, RemoteRunRepository, RunRepository, SessionRepository,
};
use crate::services::subscription::{RunSubscription, SessionScope};

/// Owner-scoped access to runs for one session.
pub struct SessionContext {
    identity: Option<Identity>,
    repository: SessionRepository,
    scope: SessionScope,
}

impl SessionContext {
    /// Session for a signed-in user, backed by Firestore.
    pub fn signed_in(identity: Identity, db: FirestoreDb) -> Self {
        let scope = SessionScope::new();
        let repository = SessionRepository::Remote(RemoteRunRepository::new(db, scope.handle()));
        Self {
            identity: Some(identity),
            repository,
            scope,
        }
    }

    /// Guest session, backed by local storage.
    pub fn guest(storage: LocalStorage) -> Self {
        let scope = SessionScope::new();
        let repository =
            SessionRepository::Local(LocalRunRepository::new(storage, scope.handle()));
        Self {
            identity: None,
            repository,
            scope,
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn is_guest(&self) -> bool {
        self.identity.is_none()
    }

    /// Owner scope of every run this session touches.
    pub fn owner_id(&self) -> &str {
        self.identity
            .as_ref()
            .map(|i| i.owner_id.as_str())
            .unwrap_or(GUEST_OWNER_ID)
    }

    pub fn repository(&self) -> &SessionRepository {
        &self.repository
    }

    pub async fn subscribe(&self) -> Result<RunSubscription> {
        self.repository.subscribe(self.owner_id()).await
    }

    pub async fn list(&self) -> Result<Vec<Run>> {
        self.repository.list(self.owner_id()).await
    }

    pub async fn create(&self, input: RunInput) -> Result<Run> {
        self.repository.create(self.owner_id(), input).await
    }

    pub async fn update(&self, run_id: &str, input: RunInput) -> Result<Run> {
        self.repository
            .update(run_id, self.owner_id(), input)
            .await
    }

    pub async fn delete(&self, run_id: &str) -> Result<()> {
        self.repository.delete(run_id, self.owner_id()).await
    }

    /// End the session and every subscription opened under it.
    pub fn sign_out(&self) {
        if !self.scope.is_closed() {
            self.scope.close();
            tracing::info!(owner_id = self.owner_id(), "Session ended");
        }
    }

    pub fn is_signed_out(&self) -> bool {
        self.scope.is_closed()
    }
}

impl Drop for SessionContext {
    fn drop(&mut self) {
        self.scope.close();
    }
}

/// Live signed-in sessions, keyed by owner id.
///
/// An entry lives until its owner signs out or the newest token seen for it
/// expires, whichever comes first. [`SessionRegistry::evict_expired`] does
/// the expiry half and is run periodically by [`spawn_expiry_sweeper`].
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<DashMap<String, RegisteredSession>>,
}

struct RegisteredSession {
    context: Arc<SessionContext>,
    expires_at: DateTime<Utc>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context for `identity`, created on first sign-in. A later token
    /// extends the session's expiry.
    pub fn sign_in(
        &self,
        identity: Identity,
        expires_at: DateTime<Utc>,
        db: &FirestoreDb,
    ) -> Arc<SessionContext> {
        let mut entry = self
            .sessions
            .entry(identity.owner_id.clone())
            .or_insert_with(|| {
                tracing::info!(owner_id = %identity.owner_id, "Session started");
                RegisteredSession {
                    context: Arc::new(SessionContext::signed_in(identity, db.clone())),
                    expires_at,
                }
            });
        if expires_at > entry.expires_at {
            entry.expires_at = expires_at;
        }
        entry.context.clone()
    }

    pub fn get(&self, owner_id: &str) -> Option<Arc<SessionContext>> {
        self.sessions.get(owner_id).map(|s| s.context.clone())
    }

    /// Tear down the owner's session. Returns `false` if none was live.
    pub fn sign_out(&self, owner_id: &str) -> bool {
        match self.sessions.remove(owner_id) {
            Some((_, session)) => {
                session.context.sign_out();
                true
            }
            None => false,
        }
    }

    /// Tear down every session whose token expired at or before `now`.
    /// Returns how many were removed.
    pub fn evict_expired(&self, now: DateTime<Utc>) -> usize {
        let expired: Vec<String> = self
            .sessions
            .iter()
            .filter(|e| e.expires_at <= now)
            .map(|e| e.key().clone())
            .collect();

        let mut evicted = 0;
        for owner_id in expired {
            // Re-checked under the entry lock in case a fresh token arrived
            if let Some((_, session)) = self
                .sessions
                .remove_if(&owner_id, |_, s| s.expires_at <= now)
            {
                session.context.sign_out();
                tracing::info!(owner_id = %owner_id, "Session expired");
                evicted += 1;
            }
        }
        evicted
    }

    /// Tear down every session (server shutdown).
    pub fn sign_out_all(&self) {
        let owners: Vec<String> = self.sessions.iter().map(|e| e.key().clone()).collect();
        for owner_id in owners {
            self.sign_out(&owner_id);
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Evict expired sessions from `registry` every `period` until aborted.
pub fn spawn_expiry_sweeper(registry: SessionRegistry, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticks = tokio::time::interval(period);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticks.tick().await;
            let evicted = registry.evict_expired(Utc::now());
            if evicted > 0 {
                tracing::debug!(evicted, live = registry.len(), "Swept expired sessions");
            }
        }
    })
}
