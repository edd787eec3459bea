// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Runlog: a personal run log.
//!
//! This crate provides the backend API for recording runs, with signed-in
//! users stored in Firestore and guests kept in on-device storage, plus the
//! aggregation behind the run list and profile pages.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::{FirestoreDb, LocalStorage};
use services::{ProfilePictures, SessionContext, SessionRegistry};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub storage: LocalStorage,
    /// Signed-in sessions by owner id
    pub sessions: SessionRegistry,
    /// The single process-wide guest session
    pub guest: Arc<SessionContext>,
    pub pictures: ProfilePictures,
}

impl AppState {
    pub fn new(config: Config, db: FirestoreDb, storage: LocalStorage) -> Self {
        Self {
            config,
            db,
            guest: Arc::new(SessionContext::guest(storage.clone())),
            pictures: ProfilePictures::new(storage.clone()),
            storage,
            sessions: SessionRegistry::new(),
        }
    }
}
