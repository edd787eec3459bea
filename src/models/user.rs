//! Signed-in identity as supplied by the identity provider.

use serde::{Deserialize, Serialize};

/// Who a session belongs to.
///
/// `owner_id` is the partition key for every run the user owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub owner_id: String,
    /// Email address (may be None if the provider does not share it)
    pub email: Option<String>,
    pub display_name: Option<String>,
}
