// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Resolve-once session notifications and their registry.
//!
//! A [`SessionFuture`] is a single-assignment cell tied to one establishment
//! attempt. Any number of callers may wait on it; the first resolution wins
//! and every later resolution is refused. Only the state machine can resolve
//! a future, and it does so through the [`SessionFutureRegistry`] it owns.
//!
//! ```text
//! Idle ──lazy()──▶ F1 ──adopt()──▶ Connecting(F1) ─▶ CreateAndActivate(F1) ─▶ Active(F1 = Ok)
//!                                                                               │
//!                                                    Reactivating(F2) ◀─create()┘
//! ```

use std::fmt;
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::watch;

use crate::error::SessionFailure;

use super::session::SessionHandle;

/// The value a session future resolves to.
pub type SessionOutcome = Result<Arc<SessionHandle>, SessionFailure>;

// =============================================================================
// AttemptId
// =============================================================================

/// Token identifying one entry action.
///
/// Completion events carry the token of the entry action that produced
/// them. A completion whose token does not match the current state is
/// stale and gets dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AttemptId(u64);

impl AttemptId {
    /// Returns the raw value.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// =============================================================================
// SessionFuture
// =============================================================================

struct Cell {
    id: u64,
    slot: watch::Sender<Option<SessionOutcome>>,
}

/// Pending notification for one establishment attempt.
///
/// Cheap to clone; clones observe the same cell.
///
/// # Examples
///
/// ```no_run
/// # async fn example(client: tether_opcua::client::UaClient) {
/// let future = client.session_future();
/// match future.await {
///     Ok(session) => println!("active: {}", session),
///     Err(failure) => eprintln!("attempt failed: {}", failure),
/// }
/// # }
/// ```
#[derive(Clone)]
pub struct SessionFuture {
    cell: Arc<Cell>,
}

impl SessionFuture {
    fn new(id: u64) -> Self {
        let (slot, _) = watch::channel(None);
        Self {
            cell: Arc::new(Cell { id, slot }),
        }
    }

    /// Identifier, unique per client.
    #[inline]
    pub fn id(&self) -> u64 {
        self.cell.id
    }

    /// Returns `true` once the attempt has concluded.
    pub fn is_resolved(&self) -> bool {
        self.cell.slot.borrow().is_some()
    }

    /// Returns the outcome without waiting.
    pub fn try_get(&self) -> Option<SessionOutcome> {
        self.cell.slot.borrow().clone()
    }

    /// Waits for the attempt to conclude.
    pub async fn wait(&self) -> SessionOutcome {
        let mut rx = self.cell.slot.subscribe();
        let outcome = match rx.wait_for(Option::is_some).await {
            Ok(outcome) => outcome.clone().unwrap_or(Err(SessionFailure::Shutdown)),
            Err(_) => Err(SessionFailure::Shutdown),
        };
        outcome
    }

    /// Returns `true` if both values observe the same cell.
    #[inline]
    pub fn same_as(&self, other: &SessionFuture) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }

    /// Stores `outcome` unless a value is already present.
    fn resolve(&self, outcome: SessionOutcome) -> bool {
        let mut outcome = Some(outcome);
        self.cell.slot.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = outcome.take();
            true
        })
    }
}

impl IntoFuture for SessionFuture {
    type Output = SessionOutcome;
    type IntoFuture = Pin<Box<dyn Future<Output = SessionOutcome> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move { self.wait().await })
    }
}

impl fmt::Debug for SessionFuture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.cell.slot.borrow() {
            None => "pending",
            Some(Ok(_)) => "resolved",
            Some(Err(_)) => "failed",
        };
        f.debug_struct("SessionFuture")
            .field("id", &self.cell.id)
            .field("state", &state)
            .finish()
    }
}

// =============================================================================
// SessionFutureRegistry
// =============================================================================

/// Allocates attempt tokens and session futures.
///
/// Owned by the sequencer. Besides fresh futures for new attempts it keeps
/// one *idle* future: the notification handed out while the machine rests
/// in `Idle` or `Inactive`, adopted by whichever attempt is requested next.
#[derive(Debug, Default)]
pub struct SessionFutureRegistry {
    next_attempt: u64,
    next_future: u64,
    idle: Option<SessionFuture>,
    created: u64,
    resolved: u64,
}

impl SessionFutureRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a fresh attempt token.
    pub fn next_attempt(&mut self) -> AttemptId {
        self.next_attempt += 1;
        AttemptId(self.next_attempt)
    }

    /// Creates a fresh future for a new attempt.
    pub fn create(&mut self) -> SessionFuture {
        self.next_future += 1;
        self.created += 1;
        SessionFuture::new(self.next_future)
    }

    /// Returns the idle future, creating it if none is outstanding.
    pub fn idle(&mut self) -> SessionFuture {
        if let Some(future) = &self.idle {
            return future.clone();
        }
        let future = self.create();
        self.idle = Some(future.clone());
        future
    }

    /// Hands the idle future to a new attempt.
    ///
    /// Callers that obtained the idle future while the machine was at rest
    /// are resolved by this attempt.
    pub fn adopt(&mut self) -> SessionFuture {
        match self.idle.take() {
            Some(future) => future,
            None => self.create(),
        }
    }

    /// Resolves `future`. Returns `false` if it was already resolved.
    pub fn settle(&mut self, future: &SessionFuture, outcome: SessionOutcome) -> bool {
        let settled = future.resolve(outcome);
        if settled {
            self.resolved += 1;
        }
        settled
    }

    /// Fails the idle future, if any. Used when the machine shuts down.
    pub fn fail_idle(&mut self, failure: SessionFailure) -> bool {
        match self.idle.take() {
            Some(future) => self.settle(&future, Err(failure)),
            None => false,
        }
    }

    /// Number of futures created.
    pub fn created(&self) -> u64 {
        self.created
    }

    /// Number of futures resolved.
    pub fn resolved(&self) -> u64 {
        self.resolved
    }
}

// =============================================================================
// Tests
// =============================================================================
