// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests for the remote run repository.
//!
//! These tests require the Firestore emulator to be running.
//! Run with: FIRESTORE_EMULATOR_HOST=localhost:8080 cargo test --test firestore_integration
//!
//! Every test uses a fresh owner id, so tests never see each other's runs.

use chrono::NaiveDate;
use futures_util::StreamExt;
use runlog::error::AppError;
use runlog::models::{Run, RunInput, Sport};
use runlog::services::{RemoteRunRepository, RunRepository, RunSubscription, SessionScope};
use std::time::Duration;

mod common;
use common::test_db;

/// How long to wait for a pushed snapshot before failing.
const PUSH_TIMEOUT: Duration = Duration::from_secs(10);

/// Generate a unique owner id for test isolation.
fn unique_owner_id() -> String {
    format!("test-owner-{}", uuid::Uuid::new_v4())
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

async fn test_repo(scope: &SessionScope) -> RemoteRunRepository {
    RemoteRunRepository::new(test_db().await, scope.handle())
}

/// Wait for the next snapshot that satisfies `pred`.
async fn next_matching(
    sub: &mut RunSubscription,
    pred: impl Fn(&[Run]) -> bool,
) -> Vec<Run> {
    tokio::time::timeout(PUSH_TIMEOUT, async {
        loop {
            let runs = sub.next().await.expect("subscription ended early");
            if pred(&runs) {
                return runs;
            }
        }
    })
    .await
    .expect("timed out waiting for snapshot")
}

// ═══════════════════════════════════════════════════════════════════════════
// CRUD TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_create_and_list() {
    require_emulator!();

    let scope = SessionScope::new();
    let repo = test_repo(&scope).await;
    let owner = unique_owner_id();

    let before = repo.list(&owner).await.unwrap();
    assert!(before.is_empty(), "Fresh owner should have no runs");

    let later = repo
        .create(&owner, RunInput::new(date("2024-01-20"), 10.0, 50.0))
        .await
        .unwrap();
    let earlier = repo
        .create(
            &owner,
            RunInput::new(date("2024-01-05"), 5.0, 30.0).with_sport(Sport::Cycling),
        )
        .await
        .unwrap();

    assert!(!later.id.is_empty());
    assert_ne!(later.id, earlier.id);
    assert_eq!(later.speed_kmh, 12.0);
    assert_eq!(later.owner_id, owner);

    let runs = repo.list(&owner).await.unwrap();
    assert_eq!(runs, vec![earlier.clone(), later.clone()]);
    assert_eq!(runs[0].sport, Sport::Cycling);
}

#[tokio::test]
async fn test_update_replaces_record() {
    require_emulator!();

    let scope = SessionScope::new();
    let repo = test_repo(&scope).await;
    let owner = unique_owner_id();

    let run = repo
        .create(&owner, RunInput::new(date("2024-01-05"), 5.0, 30.0))
        .await
        .unwrap();

    let updated = repo
        .update(
            &run.id,
            &owner,
            RunInput::new(date("2024-03-01"), 21.1, 120.0),
        )
        .await
        .unwrap();

    assert_eq!(updated.id, run.id);
    assert_eq!(updated.speed_kmh, 10.55);

    let runs = repo.list(&owner).await.unwrap();
    assert_eq!(runs, vec![updated]);
}

#[tokio::test]
async fn test_update_unknown_id_is_not_found() {
    require_emulator!();

    let scope = SessionScope::new();
    let repo = test_repo(&scope).await;
    let owner = unique_owner_id();

    let result = repo
        .update(
            "no-such-run",
            &owner,
            RunInput::new(date("2024-01-05"), 5.0, 30.0),
        )
        .await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert!(repo.list(&owner).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_twice_succeeds() {
    require_emulator!();

    let scope = SessionScope::new();
    let repo = test_repo(&scope).await;
    let owner = unique_owner_id();

    let run = repo
        .create(&owner, RunInput::new(date("2024-01-05"), 5.0, 30.0))
        .await
        .unwrap();

    repo.delete(&run.id, &owner).await.unwrap();
    repo.delete(&run.id, &owner).await.unwrap();

    assert!(repo.list(&owner).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_owners_are_isolated() {
    require_emulator!();

    let scope = SessionScope::new();
    let repo = test_repo(&scope).await;
    let alice = unique_owner_id();
    let bob = unique_owner_id();

    let run = repo
        .create(&alice, RunInput::new(date("2024-01-05"), 5.0, 30.0))
        .await
        .unwrap();

    assert!(repo.list(&bob).await.unwrap().is_empty());

    // Bob can neither replace nor remove Alice's run
    let result = repo
        .update(&run.id, &bob, RunInput::new(date("2024-01-06"), 1.0, 5.0))
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
    repo.delete(&run.id, &bob).await.unwrap();

    assert_eq!(repo.list(&alice).await.unwrap(), vec![run]);
}

#[tokio::test]
async fn test_invalid_input_never_reaches_store() {
    require_emulator!();

    let scope = SessionScope::new();
    let repo = test_repo(&scope).await;
    let owner = unique_owner_id();

    let result = repo
        .create(&owner, RunInput::new(date("2024-01-05"), 0.0, 30.0))
        .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
    assert!(repo.list(&owner).await.unwrap().is_empty());
}

// ═══════════════════════════════════════════════════════════════════════════
// SUBSCRIPTION TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_subscription_includes_created_run_once() {
    require_emulator!();

    let scope = SessionScope::new();
    let repo = test_repo(&scope).await;
    let owner = unique_owner_id();

    let run = repo
        .create(&owner, RunInput::new(date("2024-01-05"), 5.0, 30.0))
        .await
        .unwrap();

    let mut sub = repo.subscribe(&owner).await.unwrap();
    let runs = next_matching(&mut sub, |runs| !runs.is_empty()).await;

    assert_eq!(runs.iter().filter(|r| r.id == run.id).count(), 1);
    sub.cancel();
}

#[tokio::test]
async fn test_subscription_pushes_changes() {
    require_emulator!();

    let scope = SessionScope::new();
    let repo = test_repo(&scope).await;
    let owner = unique_owner_id();

    let mut sub = repo.subscribe(&owner).await.unwrap();
    let initial = next_matching(&mut sub, |_| true).await;
    assert!(initial.is_empty());

    let run = repo
        .create(&owner, RunInput::new(date("2024-01-05"), 5.0, 30.0))
        .await
        .unwrap();
    let runs = next_matching(&mut sub, |runs| runs.len() == 1).await;
    assert_eq!(runs[0].id, run.id);

    repo.delete(&run.id, &owner).await.unwrap();
    next_matching(&mut sub, |runs| runs.is_empty()).await;

    sub.cancel();
    assert!(sub.next().await.is_none());
}

#[tokio::test]
async fn test_subscription_ignores_other_owners() {
    require_emulator!();

    let scope = SessionScope::new();
    let repo = test_repo(&scope).await;
    let alice = unique_owner_id();
    let bob = unique_owner_id();

    let mut sub = repo.subscribe(&alice).await.unwrap();
    next_matching(&mut sub, |_| true).await;

    repo.create(&bob, RunInput::new(date("2024-01-05"), 5.0, 30.0))
        .await
        .unwrap();
    let mine = repo
        .create(&alice, RunInput::new(date("2024-01-06"), 6.0, 30.0))
        .await
        .unwrap();

    let runs = next_matching(&mut sub, |runs| !runs.is_empty()).await;
    assert!(runs.iter().all(|r| r.owner_id == alice));
    assert_eq!(runs[0].id, mine.id);
}

#[tokio::test]
async fn test_sign_out_ends_subscription() {
    require_emulator!();

    let scope = SessionScope::new();
    let repo = test_repo(&scope).await;
    let owner = unique_owner_id();

    let mut sub = repo.subscribe(&owner).await.unwrap();
    next_matching(&mut sub, |_| true).await;

    scope.close();

    let end = tokio::time::timeout(PUSH_TIMEOUT, sub.next())
        .await
        .expect("stream should end after sign-out");
    assert!(end.is_none());
}
