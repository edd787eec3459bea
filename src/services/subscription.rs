// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cancellable stream of run-list snapshots.
//!
//! A [`RunSubscription`] is the consumer half of a bounded channel. The
//! producer half ([`SnapshotSink`]) is driven by whichever realm opened the
//! subscription. Once the subscription is cancelled, dropped, or its session
//! ends, `poll_next` yields `None` and any snapshot still buffered is
//! discarded.

use futures_util::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::{mpsc, watch};

use crate::models::Run;

/// Snapshots buffered per subscription before the producer waits.
const SNAPSHOT_BUFFER: usize = 16;

/// Lifetime of a session. Closing it ends every subscription opened with
/// one of its handles.
#[derive(Debug)]
pub struct SessionScope {
    ended: watch::Sender<bool>,
}

impl SessionScope {
    pub fn new() -> Self {
        let (ended, _) = watch::channel(false);
        Self { ended }
    }

    pub fn handle(&self) -> watch::Receiver<bool> {
        self.ended.subscribe()
    }

    pub fn close(&self) {
        self.ended.send_replace(true);
    }

    pub fn is_closed(&self) -> bool {
        *self.ended.borrow()
    }
}

impl Default for SessionScope {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a connected sink/subscription pair bound to a session.
pub fn channel(session: watch::Receiver<bool>) -> (SnapshotSink, RunSubscription) {
    let (tx, rx) = mpsc::channel(SNAPSHOT_BUFFER);
    let sink = SnapshotSink {
        tx,
        session: session.clone(),
    };
    let subscription = RunSubscription {
        rx,
        session,
        cancelled: false,
    };
    (sink, subscription)
}

/// Producer half of a subscription.
pub struct SnapshotSink {
    tx: mpsc::Sender<Vec<Run>>,
    session: watch::Receiver<bool>,
}

impl SnapshotSink {
    /// Deliver a snapshot, waiting for buffer space.
    ///
    /// Returns `false` once the consumer is gone or the session ended.
    pub async fn send(&self, runs: Vec<Run>) -> bool {
        if self.is_closed() {
            return false;
        }
        self.tx.send(runs).await.is_ok()
    }

    /// Deliver a snapshot without waiting. Returns `false` if it was not
    /// queued.
    pub fn try_send(&self, runs: Vec<Run>) -> bool {
        if self.is_closed() {
            return false;
        }
        self.tx.try_send(runs).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed() || *self.session.borrow()
    }

    /// Resolves once the consumer cancelled or dropped the subscription, or
    /// the session ended.
    pub async fn closed(&mut self) {
        let tx = &self.tx;
        let session = &mut self.session;
        tokio::select! {
            _ = tx.closed() => {}
            // A dropped scope counts as ended
            _ = session.wait_for(|ended| *ended) => {}
        }
    }
}

/// Stream of complete, date-ascending run lists for one owner.
pub struct RunSubscription {
    rx: mpsc::Receiver<Vec<Run>>,
    session: watch::Receiver<bool>,
    cancelled: bool,
}

impl RunSubscription {
    /// Stop receiving snapshots. Safe to call any number of times.
    pub fn cancel(&mut self) {
        if !self.cancelled {
            self.cancelled = true;
            self.rx.close();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled || *self.session.borrow()
    }
}

impl Stream for RunSubscription {
    type Item = Vec<Run>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.is_cancelled() {
            return Poll::Ready(None);
        }
        this.rx.poll_recv(cx)
    }
}
