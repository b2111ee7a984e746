// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Session and channel handles, activity listeners, and statistics.
//!
//! Handles are produced by the gates and shared read-only with callers
//! through `Arc`. The state machine never mutates a handle after it has
//! been published.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::types::{SecurityMode, SecurityPolicy};

// =============================================================================
// ChannelHandle
// =============================================================================

/// An open secure channel returned by the transport gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelHandle {
    /// Server-assigned secure channel ID.
    pub channel_id: u32,

    /// Endpoint the channel is bound to.
    pub endpoint: String,

    /// Negotiated security mode.
    pub security_mode: SecurityMode,

    /// Negotiated security policy.
    pub security_policy: SecurityPolicy,

    /// When the channel was opened.
    pub opened_at: DateTime<Utc>,
}

impl ChannelHandle {
    /// Creates an unsecured channel handle.
    pub fn new(channel_id: u32, endpoint: impl Into<String>) -> Self {
        Self {
            channel_id,
            endpoint: endpoint.into(),
            security_mode: SecurityMode::None,
            security_policy: SecurityPolicy::None,
            opened_at: Utc::now(),
        }
    }

    /// Sets the negotiated security.
    pub fn with_security(mut self, mode: SecurityMode, policy: SecurityPolicy) -> Self {
        self.security_mode = mode;
        self.security_policy = policy;
        self
    }
}

impl fmt::Display for ChannelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "channel#{}@{}", self.channel_id, self.endpoint)
    }
}

// =============================================================================
// SessionHandle
// =============================================================================

/// An activated session.
///
/// `handle_id` is unique per handle instance, so two handles for the same
/// server session (for example before and after reactivation) can still be
/// told apart. `session_id` is the server's identity for the session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    /// Locally unique handle ID.
    pub handle_id: Uuid,

    /// Server-assigned session ID.
    pub session_id: String,

    /// Authentication token used on requests.
    pub auth_token: String,

    /// Channel the session is activated on.
    pub channel: ChannelHandle,

    /// Session timeout revised by the server.
    pub revised_timeout: Duration,

    /// When the server created the session.
    pub created_at: DateTime<Utc>,

    /// When this handle was activated.
    pub activated_at: Instant,
}

impl SessionHandle {
    /// Creates a new session handle.
    pub fn new(
        session_id: impl Into<String>,
        auth_token: impl Into<String>,
        channel: ChannelHandle,
    ) -> Self {
        Self {
            handle_id: Uuid::new_v4(),
            session_id: session_id.into(),
            auth_token: auth_token.into(),
            channel,
            revised_timeout: Duration::from_secs(60),
            created_at: Utc::now(),
            activated_at: Instant::now(),
        }
    }

    /// Re-activates the same server session on a new channel.
    ///
    /// The returned handle keeps `session_id`, `auth_token` and
    /// `created_at`, and gets a fresh `handle_id`.
    pub fn reactivated_on(&self, channel: ChannelHandle) -> Self {
        Self {
            handle_id: Uuid::new_v4(),
            session_id: self.session_id.clone(),
            auth_token: self.auth_token.clone(),
            channel,
            revised_timeout: self.revised_timeout,
            created_at: self.created_at,
            activated_at: Instant::now(),
        }
    }

    /// Sets the server-revised timeout.
    pub fn with_revised_timeout(mut self, timeout: Duration) -> Self {
        self.revised_timeout = timeout;
        self
    }

    /// Returns the endpoint of the underlying channel.
    #[inline]
    pub fn endpoint(&self) -> &str {
        &self.channel.endpoint
    }

    /// Returns `true` if this handle continues the server session of
    /// `previous`.
    pub fn is_recovery_of(&self, previous: &SessionHandle) -> bool {
        self.session_id == previous.session_id && self.handle_id != previous.handle_id
    }

    /// Time since activation.
    pub fn active_for(&self) -> Duration {
        self.activated_at.elapsed()
    }
}

impl PartialEq for SessionHandle {
    fn eq(&self, other: &Self) -> bool {
        self.handle_id == other.handle_id
    }
}

impl Eq for SessionHandle {}

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session {} on {}", self.session_id, self.channel)
    }
}

// =============================================================================
// SessionActivityListener
// =============================================================================

/// Observer for sessions becoming usable or unusable.
///
/// Called on the state machine's sequencer. Implementations must return
/// quickly and must not wait on the client they observe.
pub trait SessionActivityListener: Send + Sync {
    /// The machine entered `Active` with `session`.
    fn on_session_active(&self, session: &Arc<SessionHandle>) {
        let _ = session;
    }

    /// The machine left `Active`; `session` is no longer usable.
    fn on_session_inactive(&self, session: &Arc<SessionHandle>) {
        let _ = session;
    }
}

/// Registered activity listeners.
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    listeners: RwLock<Vec<Arc<dyn SessionActivityListener>>>,
}

impl ListenerRegistry {
    pub(crate) fn add(&self, listener: Arc<dyn SessionActivityListener>) {
        self.listeners.write().push(listener);
    }

    pub(crate) fn remove(&self, listener: &Arc<dyn SessionActivityListener>) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|l| !Arc::ptr_eq(l, listener));
        listeners.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.read().len()
    }

    pub(crate) fn notify_active(&self, session: &Arc<SessionHandle>) {
        for listener in self.listeners.read().iter() {
            listener.on_session_active(session);
        }
    }

    pub(crate) fn notify_inactive(&self, session: &Arc<SessionHandle>) {
        for listener in self.listeners.read().iter() {
            listener.on_session_inactive(session);
        }
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.len())
            .finish()
    }
}

// =============================================================================
// SessionStats
// =============================================================================

/// Statistics for the session lifecycle.
#[derive(Debug)]
pub struct SessionStats {
    /// Connect attempts started.
    connect_attempts: AtomicU64,

    /// Times the machine entered `Active`.
    activations: AtomicU64,

    /// Reactivation attempts started.
    reactivation_attempts: AtomicU64,

    /// Reactivations that restored `Active`.
    reactivations: AtomicU64,

    /// Notifications resolved with a failure.
    failures: AtomicU64,

    /// Teardowns completed.
    disconnects: AtomicU64,

    /// Events dropped as unroutable.
    ignored_events: AtomicU64,

    /// Failed keep-alive probes.
    keepalive_failures: AtomicU64,
}

impl SessionStats {
    /// Creates new session statistics.
    pub fn new() -> Self {
        Self {
            connect_attempts: AtomicU64::new(0),
            activations: AtomicU64::new(0),
            reactivation_attempts: AtomicU64::new(0),
            reactivations: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            disconnects: AtomicU64::new(0),
            ignored_events: AtomicU64::new(0),
            keepalive_failures: AtomicU64::new(0),
        }
    }

    /// Records a connect attempt.
    pub fn record_connect_attempt(&self) {
        self.connect_attempts.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a session activation.
    pub fn record_activation(&self) {
        self.activations.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a reactivation attempt.
    pub fn record_reactivation_attempt(&self) {
        self.reactivation_attempts.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a successful reactivation.
    pub fn record_reactivation(&self) {
        self.reactivations.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a failed notification.
    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a completed teardown.
    pub fn record_disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an ignored event.
    pub fn record_ignored_event(&self) {
        self.ignored_events.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a failed keep-alive.
    pub fn record_keepalive_failure(&self) {
        self.keepalive_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the number of connect attempts.
    pub fn connect_attempts(&self) -> u64 {
        self.connect_attempts.load(Ordering::Relaxed)
    }

    /// Returns the number of activations.
    pub fn activations(&self) -> u64 {
        self.activations.load(Ordering::Relaxed)
    }

    /// Returns the number of reactivation attempts.
    pub fn reactivation_attempts(&self) -> u64 {
        self.reactivation_attempts.load(Ordering::Relaxed)
    }

    /// Returns the number of successful reactivations.
    pub fn reactivations(&self) -> u64 {
        self.reactivations.load(Ordering::Relaxed)
    }

    /// Returns the number of failures.
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Returns the number of disconnects.
    pub fn disconnects(&self) -> u64 {
        self.disconnects.load(Ordering::Relaxed)
    }

    /// Returns the number of ignored events.
    pub fn ignored_events(&self) -> u64 {
        self.ignored_events.load(Ordering::Relaxed)
    }

    /// Returns the number of failed keep-alives.
    pub fn keepalive_failures(&self) -> u64 {
        self.keepalive_failures.load(Ordering::Relaxed)
    }

    /// Resets all statistics.
    pub fn reset(&self) {
        self.connect_attempts.store(0, Ordering::Relaxed);
        self.activations.store(0, Ordering::Relaxed);
        self.reactivation_attempts.store(0, Ordering::Relaxed);
        self.reactivations.store(0, Ordering::Relaxed);
        self.failures.store(0, Ordering::Relaxed);
        self.disconnects.store(0, Ordering::Relaxed);
        self.ignored_events.store(0, Ordering::Relaxed);
        self.keepalive_failures.store(0, Ordering::Relaxed);
    }
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
