// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Aggregated views over a list of runs.

use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::Run;

/// Runs from one calendar month, date ascending.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MonthGroup {
    /// Display label, e.g. "January 2024"
    pub label: String,
    pub year: i32,
    /// Month number (1-12)
    pub month: u32,
    pub subtotal_distance_km: f64,
    pub runs: Vec<Run>,
}

/// Profile totals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RunTotals {
    pub run_count: u32,
    pub total_distance_km: f64,
    pub average_speed_kmh: f64,
}
