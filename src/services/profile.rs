// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile pictures kept in local storage.
//!
//! Stored as a `data:image/...;base64,...` URI under `profilePicture-{owner}`.
//! Independent of the run model and of the session's storage realm.

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::db::local::keys;
use crate::db::LocalStorage;
use crate::error::{AppError, Result};

/// Largest accepted decoded image.
pub const MAX_PICTURE_BYTES: usize = 2 * 1024 * 1024;

#[derive(Clone)]
pub struct ProfilePictures {
    storage: LocalStorage,
}

impl ProfilePictures {
    pub fn new(storage: LocalStorage) -> Self {
        Self { storage }
    }

    pub fn get(&self, owner_id: &str) -> Option<String> {
        self.storage.get_item(&keys::profile_picture(owner_id))
    }

    pub fn set(&self, owner_id: &str, data_uri: &str) -> Result<()> {
        let bytes = validate_data_uri(data_uri)?;
        self.storage
            .set_item(&keys::profile_picture(owner_id), data_uri.trim())?;
        tracing::info!(owner_id, bytes, "Stored profile picture");
        Ok(())
    }

    pub fn remove(&self, owner_id: &str) -> Result<()> {
        self.storage.remove_item(&keys::profile_picture(owner_id))
    }
}

/// Check that `uri` is a base64 image data URI. Returns the decoded size.
pub fn validate_data_uri(uri: &str) -> Result<usize> {
    let invalid = |msg: &str| AppError::BadRequest(format!("Invalid picture: {}", msg));

    let rest = uri
        .trim()
        .strip_prefix("data:")
        .ok_or_else(|| invalid("not a data URI"))?;
    let (mime, payload) = rest
        .split_once(";base64,")
        .ok_or_else(|| invalid("expected base64 encoding"))?;

    if !mime.starts_with("image/") || mime.len() <= "image/".len() {
        return Err(invalid("media type must be image/*"));
    }
    // Reject before decoding anything oversized
    if payload.len() / 4 * 3 > MAX_PICTURE_BYTES + 2 {
        return Err(invalid("image too large"));
    }

    let bytes = STANDARD
        .decode(payload)
        .map_err(|_| invalid("malformed base64"))?;
    if bytes.is_empty() {
        return Err(invalid("empty image"));
    }
    if bytes.len() > MAX_PICTURE_BYTES {
        return Err(invalid("image too large"));
    }
    Ok(bytes.len())
}
