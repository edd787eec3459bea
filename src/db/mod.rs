//! Backing stores: Firestore (remote realm) and local storage (guest realm).

pub mod firestore;
pub mod local;

pub use firestore::FirestoreDb;
pub use local::LocalStorage;

/// Collection names as constants.
pub mod collections {
    pub const RUNS: &str = "runs";
}
