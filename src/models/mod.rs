// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod run;
pub mod summary;
pub mod user;

pub use run::{Run, RunDocument, RunForm, RunInput, Sport, GUEST_OWNER_ID};
pub use summary::{MonthGroup, RunTotals};
pub use user::Identity;
