// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Run record model for storage and API.
//!
//! `speed_kmh` is derived from distance and time whenever a document is
//! built from input. Nothing accepts a speed from the caller.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

use crate::error::{AppError, Result};

/// Owner scope for records created without a signed-in session.
pub const GUEST_OWNER_ID: &str = "unknown";

/// Kind of exercise a run records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum Sport {
    #[default]
    Running,
    InlineSkating,
    Cycling,
}

impl Sport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sport::Running => "running",
            Sport::InlineSkating => "inline_skating",
            Sport::Cycling => "cycling",
        }
    }
}

impl FromStr for Sport {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "running" => Ok(Sport::Running),
            "inline_skating" => Ok(Sport::InlineSkating),
            "cycling" => Ok(Sport::Cycling),
            other => Err(AppError::Validation(format!("unknown sport '{}'", other))),
        }
    }
}

/// Stored run body (everything but the id).
///
/// This is the shape written to both the `runs` Firestore collection and
/// the guest list in local storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunDocument {
    /// Owning user ID, or [`GUEST_OWNER_ID`]
    pub owner_id: String,
    /// Calendar date of the run (serialized as `YYYY-MM-DD`)
    pub date: NaiveDate,
    pub distance_km: f64,
    pub time_minutes: f64,
    /// Derived: `distance_km / (time_minutes / 60)`, two decimals
    pub speed_kmh: f64,
    #[serde(default)]
    pub sport: Sport,
}

/// A persisted run record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Run {
    /// Store-assigned ID (Firestore document ID, or a UUID for guest runs)
    #[serde(alias = "_firestore_id", default)]
    pub id: String,
    pub owner_id: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub date: NaiveDate,
    pub distance_km: f64,
    pub time_minutes: f64,
    pub speed_kmh: f64,
    #[serde(default)]
    pub sport: Sport,
}

impl Run {
    pub fn from_document(id: impl Into<String>, doc: RunDocument) -> Self {
        Self {
            id: id.into(),
            owner_id: doc.owner_id,
            date: doc.date,
            distance_km: doc.distance_km,
            time_minutes: doc.time_minutes,
            speed_kmh: doc.speed_kmh,
            sport: doc.sport,
        }
    }
}

/// Longest accepted single run, in kilometers.
pub const MAX_DISTANCE_KM: f64 = 10_000.0;

/// Longest accepted single run, in minutes (30 days).
pub const MAX_TIME_MINUTES: f64 = 43_200.0;

/// Validated user input for a create or a full replace.
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct RunInput {
    pub date: NaiveDate,
    #[validate(range(exclusive_min = 0.0, max = 10_000.0))]
    pub distance_km: f64,
    #[validate(range(exclusive_min = 0.0, max = 43_200.0))]
    pub time_minutes: f64,
    pub sport: Sport,
}

impl RunInput {
    pub fn new(date: NaiveDate, distance_km: f64, time_minutes: f64) -> Self {
        Self {
            date,
            distance_km,
            time_minutes,
            sport: Sport::default(),
        }
    }

    pub fn with_sport(mut self, sport: Sport) -> Self {
        self.sport = sport;
        self
    }

    /// Reject non-finite, non-positive or out-of-range distance and time,
    /// and any pair whose derived speed is not a finite number.
    ///
    /// Stored documents must round-trip through JSON, which has no
    /// representation for infinities.
    pub fn check(&self) -> Result<()> {
        if !self.distance_km.is_finite() || !self.time_minutes.is_finite() {
            return Err(AppError::Validation(
                "distance and time must be finite numbers".to_string(),
            ));
        }
        self.validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        if !compute_speed_kmh(self.distance_km, self.time_minutes).is_finite() {
            return Err(AppError::Validation(format!(
                "speed for {} km in {} minutes is out of range",
                self.distance_km, self.time_minutes
            )));
        }
        Ok(())
    }

    /// Build the stored body for `owner_id`, computing the speed.
    pub fn into_document(self, owner_id: &str) -> Result<RunDocument> {
        self.check()?;
        Ok(RunDocument {
            owner_id: owner_id.to_string(),
            date: self.date,
            distance_km: self.distance_km,
            time_minutes: self.time_minutes,
            speed_kmh: compute_speed_kmh(self.distance_km, self.time_minutes),
            sport: self.sport,
        })
    }
}

/// Raw form fields as submitted by the UI.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunForm {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub distance: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub sport: Option<String>,
}

impl RunForm {
    /// Parse and validate the raw fields.
    pub fn parse(&self) -> Result<RunInput> {
        let date = NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d").map_err(|_| {
            AppError::Validation(format!("date '{}' is not YYYY-MM-DD", self.date))
        })?;
        let distance_km = parse_positive("distance", &self.distance)?;
        let time_minutes = parse_positive("time", &self.time)?;
        let sport = match self.sport.as_deref().map(str::trim) {
            None | Some("") => Sport::default(),
            Some(s) => s.parse()?,
        };

        let input = RunInput {
            date,
            distance_km,
            time_minutes,
            sport,
        };
        input.check()?;
        Ok(input)
    }
}

fn parse_positive(field: &str, raw: &str) -> Result<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    let value: f64 = raw
        .parse()
        .map_err(|_| AppError::Validation(format!("{} '{}' is not a number", field, raw)))?;
    if !value.is_finite() || value <= 0.0 {
        return Err(AppError::Validation(format!(
            "{} must be greater than 0",
            field
        )));
    }
    Ok(value)
}

/// Speed in km/h from distance (km) and duration (minutes), two decimals.
pub fn compute_speed_kmh(distance_km: f64, time_minutes: f64) -> f64 {
    round2(distance_km / (time_minutes / 60.0))
}

/// Round to two fraction digits.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
