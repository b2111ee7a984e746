// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Mock Implementations
//!
//! Mock gates for driving the session state machine without a server.
//!
//! ## Design Principles
//!
//! - Configurable failures: all calls, or the next `n` calls
//! - Recording of interactions for verification
//! - Simulated latency (pair with paused Tokio time)

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use tether_opcua::client::{
    ChannelHandle, SessionActivityListener, SessionEstablishment, SessionHandle, TransportGate,
};
use tether_opcua::error::{ActivationError, ConnectionError, OpcUaError, OpcUaResult};
use tether_opcua::types::{ChannelSecurity, SessionParameters};

/// Consumes one scripted failure, if any are left.
fn take_scripted(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

// =============================================================================
// Mock Transport Gate
// =============================================================================

/// Secure channel gate with failure injection.
#[derive(Debug)]
pub struct MockTransportGate {
    endpoint: String,

    /// Channel state as the gate sees it.
    connected: AtomicBool,

    /// Force every connect to fail.
    fail_connect: AtomicBool,

    /// Fail this many upcoming connects.
    fail_next_connects: AtomicU32,

    /// Force disconnect to fail.
    fail_disconnect: AtomicBool,

    /// Simulated connect latency.
    connect_latency: Mutex<Duration>,

    /// Simulated disconnect latency.
    disconnect_latency: Mutex<Duration>,

    next_channel: AtomicU32,
    connect_count: AtomicU64,
    disconnect_count: AtomicU64,

    /// Security settings of the most recent connect.
    last_security: Mutex<Option<ChannelSecurity>>,
}

impl MockTransportGate {
    /// Creates a gate that always succeeds immediately.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            connected: AtomicBool::new(false),
            fail_connect: AtomicBool::new(false),
            fail_next_connects: AtomicU32::new(0),
            fail_disconnect: AtomicBool::new(false),
            connect_latency: Mutex::new(Duration::ZERO),
            disconnect_latency: Mutex::new(Duration::ZERO),
            next_channel: AtomicU32::new(0),
            connect_count: AtomicU64::new(0),
            disconnect_count: AtomicU64::new(0),
            last_security: Mutex::new(None),
        }
    }

    /// Makes every connect fail (or succeed again).
    pub fn set_fail_connect(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::SeqCst);
    }

    /// Makes the next `count` connects fail.
    pub fn fail_next_connects(&self, count: u32) {
        self.fail_next_connects.store(count, Ordering::SeqCst);
    }

    /// Makes disconnect fail.
    pub fn set_fail_disconnect(&self, fail: bool) {
        self.fail_disconnect.store(fail, Ordering::SeqCst);
    }

    /// Sets the simulated connect latency.
    pub fn set_connect_latency(&self, latency: Duration) {
        *self.connect_latency.lock() = latency;
    }

    /// Sets the simulated disconnect latency.
    pub fn set_disconnect_latency(&self, latency: Duration) {
        *self.disconnect_latency.lock() = latency;
    }

    /// Number of connect calls.
    pub fn connect_count(&self) -> u64 {
        self.connect_count.load(Ordering::SeqCst)
    }

    /// Number of disconnect calls.
    pub fn disconnect_count(&self) -> u64 {
        self.disconnect_count.load(Ordering::SeqCst)
    }

    /// Security settings passed to the most recent connect.
    pub fn last_security(&self) -> Option<ChannelSecurity> {
        self.last_security.lock().clone()
    }

    /// Clears failures, latency and counters.
    pub fn reset(&self) {
        self.connected.store(false, Ordering::SeqCst);
        self.fail_connect.store(false, Ordering::SeqCst);
        self.fail_next_connects.store(0, Ordering::SeqCst);
        self.fail_disconnect.store(false, Ordering::SeqCst);
        *self.connect_latency.lock() = Duration::ZERO;
        *self.disconnect_latency.lock() = Duration::ZERO;
        self.connect_count.store(0, Ordering::SeqCst);
        self.disconnect_count.store(0, Ordering::SeqCst);
        *self.last_security.lock() = None;
    }
}

#[async_trait]
impl TransportGate for MockTransportGate {
    async fn connect(&self, security: &ChannelSecurity) -> OpcUaResult<ChannelHandle> {
        self.connect_count.fetch_add(1, Ordering::SeqCst);
        *self.last_security.lock() = Some(security.clone());

        let latency = *self.connect_latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        if take_scripted(&self.fail_next_connects) || self.fail_connect.load(Ordering::SeqCst) {
            return Err(OpcUaError::connection(ConnectionError::refused(&self.endpoint)));
        }

        self.connected.store(true, Ordering::SeqCst);
        let id = self.next_channel.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(ChannelHandle::new(id, &self.endpoint))
    }

    async fn disconnect(&self) -> OpcUaResult<()> {
        self.disconnect_count.fetch_add(1, Ordering::SeqCst);

        let latency = *self.disconnect_latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        self.connected.store(false, Ordering::SeqCst);
        if self.fail_disconnect.load(Ordering::SeqCst) {
            return Err(OpcUaError::connection(ConnectionError::closed(Some(
                "mock disconnect failure".to_string(),
            ))));
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

// =============================================================================
// Mock Session Establishment
// =============================================================================

/// Session establishment gate with failure injection.
///
/// Reactivation re-activates the previous session identity unless
/// [`set_preserve_identity(false)`](Self::set_preserve_identity) is called.
#[derive(Debug)]
pub struct MockSessionEstablishment {
    /// Force every activation to fail with a retryable error.
    fail_activation: AtomicBool,

    /// Fail this many upcoming activations with a retryable error.
    fail_next_activations: AtomicU32,

    /// Reject the identity token (not retryable).
    reject_identity: AtomicBool,

    /// Force keep-alive probes to fail.
    fail_keep_alive: AtomicBool,

    /// Force close_session to fail.
    fail_close: AtomicBool,

    preserve_identity: AtomicBool,
    activation_latency: Mutex<Duration>,

    next_session: AtomicU32,
    activation_count: AtomicU64,
    keep_alive_count: AtomicU64,
    close_count: AtomicU64,

    /// `previous` session ids seen by create_and_activate, in call order.
    previous_seen: Mutex<Vec<Option<String>>>,

    /// Session parameters seen by create_and_activate, in call order.
    parameters_seen: Mutex<Vec<SessionParameters>>,
}

impl Default for MockSessionEstablishment {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSessionEstablishment {
    /// Creates a gate that always succeeds immediately.
    pub fn new() -> Self {
        Self {
            fail_activation: AtomicBool::new(false),
            fail_next_activations: AtomicU32::new(0),
            reject_identity: AtomicBool::new(false),
            fail_keep_alive: AtomicBool::new(false),
            fail_close: AtomicBool::new(false),
            preserve_identity: AtomicBool::new(true),
            activation_latency: Mutex::new(Duration::ZERO),
            next_session: AtomicU32::new(0),
            activation_count: AtomicU64::new(0),
            keep_alive_count: AtomicU64::new(0),
            close_count: AtomicU64::new(0),
            previous_seen: Mutex::new(Vec::new()),
            parameters_seen: Mutex::new(Vec::new()),
        }
    }

    /// Makes every activation fail (or succeed again).
    pub fn set_fail_activation(&self, fail: bool) {
        self.fail_activation.store(fail, Ordering::SeqCst);
    }

    /// Makes the next `count` activations fail.
    pub fn fail_next_activations(&self, count: u32) {
        self.fail_next_activations.store(count, Ordering::SeqCst);
    }

    /// Makes the server reject the identity token.
    pub fn set_reject_identity(&self, reject: bool) {
        self.reject_identity.store(reject, Ordering::SeqCst);
    }

    /// Makes keep-alive probes fail.
    pub fn set_fail_keep_alive(&self, fail: bool) {
        self.fail_keep_alive.store(fail, Ordering::SeqCst);
    }

    /// Makes close_session fail.
    pub fn set_fail_close(&self, fail: bool) {
        self.fail_close.store(fail, Ordering::SeqCst);
    }

    /// Whether reactivation keeps the previous session id.
    pub fn set_preserve_identity(&self, preserve: bool) {
        self.preserve_identity.store(preserve, Ordering::SeqCst);
    }

    /// Sets the simulated create/activate latency.
    pub fn set_activation_latency(&self, latency: Duration) {
        *self.activation_latency.lock() = latency;
    }

    /// Number of create_and_activate calls.
    pub fn activation_count(&self) -> u64 {
        self.activation_count.load(Ordering::SeqCst)
    }

    /// Number of keep-alive probes.
    pub fn keep_alive_count(&self) -> u64 {
        self.keep_alive_count.load(Ordering::SeqCst)
    }

    /// Number of close_session calls.
    pub fn close_count(&self) -> u64 {
        self.close_count.load(Ordering::SeqCst)
    }

    /// `previous` session ids passed to create_and_activate.
    pub fn previous_seen(&self) -> Vec<Option<String>> {
        self.previous_seen.lock().clone()
    }

    /// Session parameters passed to create_and_activate.
    pub fn parameters_seen(&self) -> Vec<SessionParameters> {
        self.parameters_seen.lock().clone()
    }
}

#[async_trait]
impl SessionEstablishment for MockSessionEstablishment {
    async fn create_and_activate(
        &self,
        channel: &ChannelHandle,
        params: &SessionParameters,
        previous: Option<&SessionHandle>,
    ) -> OpcUaResult<SessionHandle> {
        self.activation_count.fetch_add(1, Ordering::SeqCst);
        self.previous_seen
            .lock()
            .push(previous.map(|p| p.session_id.clone()));
        self.parameters_seen.lock().push(params.clone());

        let latency = *self.activation_latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        if self.reject_identity.load(Ordering::SeqCst) {
            return Err(OpcUaError::activation(ActivationError::identity_rejected(
                "mock user is not allowed",
            )));
        }
        if take_scripted(&self.fail_next_activations)
            || self.fail_activation.load(Ordering::SeqCst)
        {
            return Err(OpcUaError::activation(ActivationError::activate_failed(
                "mock activation failure",
            )));
        }

        match previous {
            Some(previous) if self.preserve_identity.load(Ordering::SeqCst) => {
                Ok(previous.reactivated_on(channel.clone()))
            }
            _ => {
                let n = self.next_session.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(SessionHandle::new(
                    format!("ns=1;i={}", 1000 + n),
                    format!("auth-{}", n),
                    channel.clone(),
                ))
            }
        }
    }

    async fn keep_alive(&self, _session: &SessionHandle) -> OpcUaResult<()> {
        self.keep_alive_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_keep_alive.load(Ordering::SeqCst) {
            return Err(OpcUaError::connection(ConnectionError::lost(
                "keep-alive not answered",
            )));
        }
        Ok(())
    }

    async fn close_session(&self, _session: &SessionHandle) -> OpcUaResult<()> {
        self.close_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_close.load(Ordering::SeqCst) {
            return Err(OpcUaError::activation(ActivationError::session_invalid(
                "mock close failure",
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Recording Listener
// =============================================================================

/// Activity notification recorded by [`RecordingListener`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityRecord {
    /// `on_session_active` with the session id.
    Active(String),
    /// `on_session_inactive` with the session id.
    Inactive(String),
}

/// Listener that records every notification.
#[derive(Debug, Default)]
pub struct RecordingListener {
    records: Mutex<Vec<ActivityRecord>>,
}

impl RecordingListener {
    /// Creates an empty listener.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Recorded notifications, in order.
    pub fn records(&self) -> Vec<ActivityRecord> {
        self.records.lock().clone()
    }
}

impl SessionActivityListener for RecordingListener {
    fn on_session_active(&self, session: &Arc<SessionHandle>) {
        self.records
            .lock()
            .push(ActivityRecord::Active(session.session_id.clone()));
    }

    fn on_session_inactive(&self, session: &Arc<SessionHandle>) {
        self.records
            .lock()
            .push(ActivityRecord::Inactive(session.session_id.clone()));
    }
}
