// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Run aggregation: totals, average speed, and month grouping.
//!
//! Pure functions over a slice of runs. Callers recompute on every new
//! snapshot rather than maintaining incremental state.

use std::collections::BTreeMap;

use crate::models::run::round2;
use crate::models::{MonthGroup, Run, RunTotals};
use crate::time_utils::{month_key, month_label};

/// Sum of `distance_km`; 0 for an empty list.
pub fn total_distance(runs: &[Run]) -> f64 {
    runs.iter().map(|r| r.distance_km).sum()
}

/// Mean of `speed_kmh`, rounded to two decimals; 0 for an empty list.
pub fn average_speed(runs: &[Run]) -> f64 {
    if runs.is_empty() {
        return 0.0;
    }
    let sum: f64 = runs.iter().map(|r| r.speed_kmh).sum();
    round2(sum / runs.len() as f64)
}

/// Partition runs by calendar month.
///
/// Groups come back in chronological order (oldest month first) and the runs
/// inside each group are sorted by date ascending. Runs sharing a date keep
/// their input order.
pub fn group_by_month(runs: &[Run]) -> Vec<MonthGroup> {
    let mut buckets: BTreeMap<(i32, u32), Vec<Run>> = BTreeMap::new();
    for run in runs {
        buckets
            .entry(month_key(run.date))
            .or_default()
            .push(run.clone());
    }

    buckets
        .into_iter()
        .map(|((year, month), mut runs)| {
            runs.sort_by_key(|r| r.date);
            let subtotal_distance_km = total_distance(&runs);
            MonthGroup {
                // Every bucket holds at least one run
                label: month_label(runs[0].date),
                year,
                month,
                subtotal_distance_km,
                runs,
            }
        })
        .collect()
}

/// Totals shown on the profile page.
pub fn totals(runs: &[Run]) -> RunTotals {
    RunTotals {
        run_count: runs.len() as u32,
        total_distance_km: total_distance(runs),
        average_speed_kmh: average_speed(runs),
    }
}
