// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date formatting.

use chrono::{Datelike, NaiveDate};

/// Format the month containing `date` as "January 2024".
pub fn month_label(date: NaiveDate) -> String {
    date.format("%B %Y").to_string()
}

/// `(year, month)` key that sorts chronologically.
pub fn month_key(date: NaiveDate) -> (i32, u32) {
    (date.year(), date.month())
}
