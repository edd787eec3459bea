// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod aggregate;
pub mod profile;
pub mod repository;
pub mod session;
pub mod subscription;

pub use profile::ProfilePictures;
pub use repository::{
    LocalRunRepository, RemoteRunRepository, RunRepository, SessionRepository,
};
pub use session::{SessionContext, SessionRegistry};
pub use subscription::{RunSubscription, SessionScope};
