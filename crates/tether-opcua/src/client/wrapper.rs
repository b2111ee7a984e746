// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! High-level OPC UA client.
//!
//! [`UaClient`] is the surface upper layers (request dispatch, subscription
//! management, browse/read/write) depend on. It turns the event-driven state
//! machine into awaitable operations: `connect`, `activate`, `disconnect`,
//! `get_session`. Clones share one state machine.

use std::sync::Arc;

use tokio::sync::watch;

use crate::error::{OpcUaError, OpcUaResult, SessionFailure};
use crate::types::ClientConfig;

use super::fsm::{FaultHook, SessionContext, SessionFsm, SessionSnapshot};
use super::future::SessionFuture;
use super::gate::{SessionEstablishment, TransportGate};
use super::session::{SessionActivityListener, SessionHandle, SessionStats};
use super::state::{SessionEvent, SessionStateKind};

// =============================================================================
// UaClient
// =============================================================================

/// OPC UA client with a managed session lifecycle.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use tether_opcua::client::{SessionEstablishment, TransportGate, UaClient};
/// use tether_opcua::types::ClientConfig;
///
/// # async fn example(
/// #     transport: Arc<dyn TransportGate>,
/// #     establishment: Arc<dyn SessionEstablishment>,
/// # ) -> tether_opcua::OpcUaResult<()> {
/// let config = ClientConfig::builder()
///     .endpoint("opc.tcp://localhost:4840")
///     .build()?;
///
/// let client = UaClient::new(config, transport, establishment)?;
/// client.connect().await?;
///
/// let session = client.get_session().await?;
/// println!("using {}", session);
///
/// client.disconnect().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct UaClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: ClientConfig,
    fsm: SessionFsm,
}

impl UaClient {
    /// Creates a client and starts its state machine in `Idle`.
    ///
    /// Must be called within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `config` does not validate.
    pub fn new(
        config: ClientConfig,
        transport: Arc<dyn TransportGate>,
        establishment: Arc<dyn SessionEstablishment>,
    ) -> OpcUaResult<Self> {
        config.validate()?;

        tracing::debug!(
            endpoint = %config.endpoint,
            transport_endpoint = transport.endpoint(),
            auto_activate = config.auto_activate,
            "Creating OPC UA client"
        );

        let fsm = SessionFsm::spawn(SessionContext::new(
            config.clone(),
            transport,
            establishment,
        ));

        Ok(Self {
            inner: Arc::new(ClientInner { config, fsm }),
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Returns the endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.inner.config.endpoint
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Requests a connection and waits for the attempt to conclude.
    ///
    /// With `auto_activate` this returns once the session is active. Without
    /// it, once the secure channel is open; call [`activate`](Self::activate)
    /// next. Calling this while already active returns immediately.
    ///
    /// # Errors
    ///
    /// Returns [`OpcUaError::Session`] with the attempt's failure.
    pub async fn connect(&self) -> OpcUaResult<()> {
        let snapshot = self.submit(SessionEvent::ConnectRequested).await?;

        if self.inner.config.auto_activate {
            snapshot.future.await.map_err(OpcUaError::session)?;
            return Ok(());
        }

        let future = snapshot.future;
        let mut rx = self.inner.fsm.watch();
        tokio::select! {
            outcome = future.wait() => {
                outcome.map_err(OpcUaError::session)?;
            }
            reached = rx.wait_for(|s| s.state == SessionStateKind::Connected && s.future.same_as(&future)) => {
                if reached.is_err() {
                    return Err(OpcUaError::session(SessionFailure::Shutdown));
                }
            }
        }
        Ok(())
    }

    /// Requests session creation and activation.
    ///
    /// From `Connected` this activates on the open channel; at rest it
    /// connects first.
    ///
    /// # Errors
    ///
    /// Returns [`OpcUaError::Session`] with the attempt's failure.
    pub async fn activate(&self) -> OpcUaResult<Arc<SessionHandle>> {
        let snapshot = self.submit(SessionEvent::CreateAndActivateRequested).await?;
        snapshot.future.await.map_err(OpcUaError::session)
    }

    /// Tears the session and channel down and waits until teardown ends.
    ///
    /// A no-op that does not touch the transport while `Idle` or `Inactive`.
    pub async fn disconnect(&self) -> OpcUaResult<()> {
        if self.state().is_at_rest() {
            tracing::trace!(endpoint = %self.endpoint(), "Already disconnected");
            return Ok(());
        }

        let snapshot = self.submit(SessionEvent::DisconnectRequested).await?;
        if snapshot.state != SessionStateKind::Disconnecting {
            return Ok(());
        }

        let mut rx = self.inner.fsm.watch();
        rx.wait_for(|s| s.state != SessionStateKind::Disconnecting)
            .await
            .map_err(|_| OpcUaError::session(SessionFailure::Shutdown))?;

        tracing::info!(endpoint = %self.endpoint(), "OPC UA client disconnected");
        Ok(())
    }

    /// Disconnects if needed, then stops the state machine.
    ///
    /// Every notification still pending resolves with
    /// [`SessionFailure::Shutdown`].
    pub async fn shutdown(&self) {
        if let Err(e) = self.disconnect().await {
            e.log("shutdown");
        }
        self.inner.fsm.shutdown().await;
    }

    // =========================================================================
    // Session access
    // =========================================================================

    /// Waits for the current attempt and returns its session.
    ///
    /// While at rest this waits until a new attempt is requested and
    /// concludes.
    pub async fn get_session(&self) -> OpcUaResult<Arc<SessionHandle>> {
        self.session_future().await.map_err(OpcUaError::session)
    }

    /// Returns the active session, connecting first when at rest.
    pub async fn ensure_session(&self) -> OpcUaResult<Arc<SessionHandle>> {
        if let Some(session) = self.session() {
            return Ok(session);
        }
        if self.state().is_at_rest() {
            self.inner.fsm.handle_event(SessionEvent::ConnectRequested);
        }
        self.get_session().await
    }

    /// Notification for the current attempt.
    pub fn session_future(&self) -> SessionFuture {
        self.inner.fsm.session_future()
    }

    /// The session, if active right now.
    pub fn session(&self) -> Option<Arc<SessionHandle>> {
        self.inner.fsm.snapshot().session
    }

    // =========================================================================
    // State
    // =========================================================================

    /// Current lifecycle state.
    pub fn state(&self) -> SessionStateKind {
        self.inner.fsm.state()
    }

    /// Returns `true` if a session is usable.
    pub fn is_active(&self) -> bool {
        self.state().is_active()
    }

    /// Latest snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.fsm.snapshot()
    }

    /// Subscribes to state snapshots.
    pub fn watch_state(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.fsm.watch()
    }

    /// Lifecycle statistics.
    pub fn stats(&self) -> &SessionStats {
        self.inner.fsm.stats()
    }

    // =========================================================================
    // Events and hooks
    // =========================================================================

    /// Enqueues a raw event.
    pub fn handle_event(&self, event: SessionEvent) {
        self.inner.fsm.handle_event(event);
    }

    /// Hook for the transport layer to report connection loss.
    pub fn fault_hook(&self) -> FaultHook {
        self.inner.fsm.fault_hook()
    }

    /// Registers a listener for session activation changes.
    pub fn add_session_listener(&self, listener: Arc<dyn SessionActivityListener>) {
        self.inner.fsm.add_listener(listener);
    }

    /// Removes a listener. Returns `false` if it was not registered.
    pub fn remove_session_listener(&self, listener: &Arc<dyn SessionActivityListener>) -> bool {
        self.inner.fsm.remove_listener(listener)
    }

    async fn submit(&self, event: SessionEvent) -> OpcUaResult<SessionSnapshot> {
        self.inner
            .fsm
            .submit(event)
            .await
            .map_err(OpcUaError::session)
    }
}

impl std::fmt::Debug for UaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UaClient")
            .field("endpoint", &self.inner.config.endpoint)
            .field("state", &self.state())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
