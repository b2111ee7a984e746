// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Session state machine.
//!
//! The machine is a single sequencer task that owns the current
//! [`SessionState`] and the [`SessionFutureRegistry`]. Everything that wants
//! to move the machine (callers, entry actions, the keep-alive monitor, the
//! transport's fault detector) sends an event over one channel. The
//! sequencer handles one event at a time:
//!
//! 1. run [`transition`] on the current state
//! 2. leave the old state (stop keep-alive, notify listeners)
//! 3. resolve the notification the transition settles
//! 4. enter the new state and start its entry action
//! 5. publish a [`SessionSnapshot`]
//!
//! Entry actions run as separate tasks. They capture what the state held at
//! entry and report back by posting a completion event stamped with their
//! attempt token. They never touch machine state directly.

use std::future::Future;
use std::mem;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::error::{OpcUaError, OpcUaResult, SessionFailure, TimeoutError};
use crate::types::ClientConfig;

use super::future::{AttemptId, SessionFuture, SessionFutureRegistry, SessionOutcome};
use super::gate::{SessionEstablishment, TransportGate};
use super::keepalive::{KeepAliveMonitor, KeepAliveSettings};
use super::session::{
    ChannelHandle, ListenerRegistry, SessionActivityListener, SessionHandle, SessionStats,
};
use super::state::{
    transition, SessionEvent, SessionState, SessionStateKind, Transition, TransitionContext,
};

// =============================================================================
// SessionContext
// =============================================================================

/// Collaborators handed to the state machine at construction.
#[derive(Clone)]
pub struct SessionContext {
    /// Client configuration.
    pub config: ClientConfig,
    /// Secure channel gate.
    pub transport: Arc<dyn TransportGate>,
    /// Session create/activate gate.
    pub establishment: Arc<dyn SessionEstablishment>,
}

impl SessionContext {
    /// Creates a new context.
    pub fn new(
        config: ClientConfig,
        transport: Arc<dyn TransportGate>,
        establishment: Arc<dyn SessionEstablishment>,
    ) -> Self {
        Self {
            config,
            transport,
            establishment,
        }
    }

    fn keepalive_settings(&self) -> KeepAliveSettings {
        KeepAliveSettings {
            interval: self.config.keepalive_interval,
            max_failures: self.config.max_failed_keepalives,
        }
    }
}

// =============================================================================
// SessionSnapshot
// =============================================================================

/// What the machine publishes after every handled event.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    /// Current state.
    pub state: SessionStateKind,
    /// Notification for the current attempt. At rest this is the idle
    /// notification that the next attempt adopts.
    pub future: SessionFuture,
    /// The usable session, while `Active`.
    pub session: Option<Arc<SessionHandle>>,
    /// Retry number, while `Reactivating`.
    pub retry: Option<u32>,
    /// `true` once the sequencer has stopped.
    pub shut_down: bool,
}

impl SessionSnapshot {
    fn of(state: &SessionState, registry: &mut SessionFutureRegistry) -> Self {
        let future = match state.future() {
            Some(future) => future.clone(),
            None => registry.idle(),
        };
        let retry = match state {
            SessionState::Reactivating { retry, .. } => Some(*retry),
            _ => None,
        };

        Self {
            state: state.kind(),
            future,
            session: state.session().cloned(),
            retry,
            shut_down: false,
        }
    }
}

// =============================================================================
// FaultHook
// =============================================================================

/// Handle the transport layer uses to report a dead connection.
#[derive(Clone)]
pub struct FaultHook {
    tx: mpsc::UnboundedSender<Command>,
}

impl FaultHook {
    /// Raises `ERR_CONNECTION_LOST`. Returns `false` if the machine has
    /// stopped.
    pub fn report_connection_lost(&self, reason: impl Into<String>) -> bool {
        let reason = reason.into();
        tracing::debug!(reason = %reason, "Connection loss reported");
        self.tx
            .send(Command::Event {
                event: SessionEvent::ConnectionLost { reason },
                reply: None,
            })
            .is_ok()
    }
}

impl std::fmt::Debug for FaultHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FaultHook")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

// =============================================================================
// Commands
// =============================================================================

enum Command {
    Event {
        event: SessionEvent,
        reply: Option<oneshot::Sender<SessionSnapshot>>,
    },
    Shutdown {
        reply: Option<oneshot::Sender<()>>,
    },
}

// =============================================================================
// SessionFsm
// =============================================================================

/// Handle to a running session state machine.
///
/// Dropping the handle stops the sequencer; pending notifications resolve
/// with [`SessionFailure::Shutdown`].
pub struct SessionFsm {
    tx: mpsc::UnboundedSender<Command>,
    snapshot_rx: watch::Receiver<SessionSnapshot>,
    stats: Arc<SessionStats>,
    listeners: Arc<ListenerRegistry>,
    task: Mutex<Option<JoinHandle<()>>>,
    endpoint: String,
}

impl SessionFsm {
    /// Starts the sequencer in `Idle`.
    ///
    /// Must be called within a Tokio runtime.
    pub fn spawn(context: SessionContext) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let stats = Arc::new(SessionStats::new());
        let listeners = Arc::new(ListenerRegistry::default());
        let endpoint = context.config.endpoint.clone();

        let mut registry = SessionFutureRegistry::new();
        let initial = SessionSnapshot::of(&SessionState::Idle, &mut registry);
        let (snapshot_tx, snapshot_rx) = watch::channel(initial);

        let sequencer = Sequencer {
            state: SessionState::Idle,
            registry,
            context,
            stats: Arc::clone(&stats),
            listeners: Arc::clone(&listeners),
            tx: tx.clone(),
            rx,
            snapshot_tx,
            keepalive: None,
            entry_task: None,
            release: None,
        };

        let task = tokio::spawn(sequencer.run());

        Self {
            tx,
            snapshot_rx,
            stats,
            listeners,
            task: Mutex::new(Some(task)),
            endpoint,
        }
    }

    /// Enqueues `event`. Never blocks and never fails; events sent after
    /// shutdown are dropped.
    pub fn handle_event(&self, event: SessionEvent) {
        if self
            .tx
            .send(Command::Event { event, reply: None })
            .is_err()
        {
            tracing::debug!(endpoint = %self.endpoint, "Event dropped, state machine stopped");
        }
    }

    /// Enqueues `event` and waits until the sequencer has handled it.
    ///
    /// Returns the snapshot published right after the event.
    pub async fn submit(&self, event: SessionEvent) -> Result<SessionSnapshot, SessionFailure> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Event {
                event,
                reply: Some(reply),
            })
            .map_err(|_| SessionFailure::Shutdown)?;
        rx.await.map_err(|_| SessionFailure::Shutdown)
    }

    /// Notification for the current attempt.
    ///
    /// Resolved with the session while `Active`; pending while an attempt is
    /// in flight; pending until the next attempt concludes while at rest.
    pub fn session_future(&self) -> SessionFuture {
        self.snapshot_rx.borrow().future.clone()
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Current state.
    pub fn state(&self) -> SessionStateKind {
        self.snapshot_rx.borrow().state
    }

    /// Subscribes to snapshots.
    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_rx.clone()
    }

    /// Hook for reporting connection loss.
    pub fn fault_hook(&self) -> FaultHook {
        FaultHook {
            tx: self.tx.clone(),
        }
    }

    /// Lifecycle statistics.
    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Registers an activity listener.
    pub fn add_listener(&self, listener: Arc<dyn SessionActivityListener>) {
        self.listeners.add(listener);
    }

    /// Removes an activity listener. Returns `false` if it was not registered.
    pub fn remove_listener(&self, listener: &Arc<dyn SessionActivityListener>) -> bool {
        self.listeners.remove(listener)
    }

    /// Returns `true` until the sequencer has stopped.
    pub fn is_running(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Stops the sequencer and waits for it to finish.
    pub async fn shutdown(&self) {
        let (reply, rx) = oneshot::channel();
        if self
            .tx
            .send(Command::Shutdown { reply: Some(reply) })
            .is_ok()
        {
            let _ = rx.await;
        }

        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::warn!(endpoint = %self.endpoint, error = %e, "Sequencer task failed");
            }
        }
    }
}

impl Drop for SessionFsm {
    fn drop(&mut self) {
        let _ = self.tx.send(Command::Shutdown { reply: None });
    }
}

impl std::fmt::Debug for SessionFsm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionFsm")
            .field("endpoint", &self.endpoint)
            .field("state", &self.state())
            .finish()
    }
}

// =============================================================================
// Sequencer
// =============================================================================

struct Sequencer {
    state: SessionState,
    registry: SessionFutureRegistry,
    context: SessionContext,
    stats: Arc<SessionStats>,
    listeners: Arc<ListenerRegistry>,
    tx: mpsc::UnboundedSender<Command>,
    rx: mpsc::UnboundedReceiver<Command>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
    keepalive: Option<KeepAliveMonitor>,
    entry_task: Option<JoinHandle<()>>,
    /// Channel release started on falling back to `Idle`. The next attempt
    /// waits for it before opening a channel.
    release: Option<JoinHandle<()>>,
}

impl Sequencer {
    async fn run(mut self) {
        tracing::debug!(endpoint = %self.context.config.endpoint, "Session state machine started");

        while let Some(command) = self.rx.recv().await {
            match command {
                Command::Event { event, reply } => {
                    self.handle(event);
                    if let Some(reply) = reply {
                        let _ = reply.send(self.snapshot_tx.borrow().clone());
                    }
                }
                Command::Shutdown { reply } => {
                    self.stop();
                    if let Some(reply) = reply {
                        let _ = reply.send(());
                    }
                    break;
                }
            }
        }

        self.rx.close();
        tracing::debug!(endpoint = %self.context.config.endpoint, "Session state machine stopped");
    }

    fn handle(&mut self, event: SessionEvent) {
        let event_name = event.to_string();
        let state = mem::take(&mut self.state);
        let from = state.kind();
        let leaving_session = state.session().cloned();

        let mut cx = TransitionContext {
            registry: &mut self.registry,
            policy: &self.context.config.reactivation,
            auto_activate: self.context.config.auto_activate,
            now: Instant::now(),
        };

        match transition(state, event, &mut cx) {
            Transition::Ignored(state) => {
                self.state = state;
                self.stats.record_ignored_event();
                tracing::debug!(
                    endpoint = %self.context.config.endpoint,
                    state = %self.state,
                    event = %event_name,
                    "Event ignored"
                );
            }
            Transition::Enter { next, settle } => {
                if let Some(session) = leaving_session {
                    self.leave_active(&session);
                }

                if let Some(settlement) = settle {
                    self.settle(&settlement.future, settlement.outcome);
                }

                tracing::debug!(
                    endpoint = %self.context.config.endpoint,
                    from = %from,
                    to = %next,
                    event = %event_name,
                    "Session state transition"
                );

                self.state = next;
                self.enter(from);
            }
        }

        self.publish();
    }

    fn settle(&mut self, future: &SessionFuture, outcome: SessionOutcome) {
        if let Err(failure) = &outcome {
            self.stats.record_failure();
            log_failure(&self.context.config.endpoint, failure);
        }
        if !self.registry.settle(future, outcome) {
            tracing::trace!(future = future.id(), "Notification already resolved");
        }
    }

    fn leave_active(&mut self, session: &Arc<SessionHandle>) {
        if let Some(monitor) = self.keepalive.take() {
            monitor.stop();
        }
        self.listeners.notify_inactive(session);
    }

    fn publish(&mut self) {
        let snapshot = SessionSnapshot::of(&self.state, &mut self.registry);
        self.snapshot_tx.send_replace(snapshot);
    }

    // =========================================================================
    // Entry actions
    // =========================================================================

    fn enter(&mut self, from: SessionStateKind) {
        let endpoint = self.context.config.endpoint.clone();

        match &self.state {
            SessionState::Idle => {
                tracing::info!(endpoint = %endpoint, "Session idle");
                // A channel that lost its connection before activation is
                // still held by the transport.
                if from == SessionStateKind::Connected {
                    let context = self.context.clone();
                    self.release = Some(tokio::spawn(async move {
                        release_channel(&context).await;
                    }));
                }
            }

            SessionState::Inactive => {
                self.stats.record_disconnect();
                tracing::info!(endpoint = %endpoint, "Session inactive");
            }

            SessionState::Connecting { attempt, .. } => {
                self.stats.record_connect_attempt();
                tracing::info!(
                    endpoint = %endpoint,
                    attempt = %attempt,
                    security_mode = %self.context.config.security_mode,
                    security_policy = self.context.config.security_policy.uri(),
                    "Connecting"
                );
                let task = connect_action(
                    *attempt,
                    self.release.take(),
                    self.context.clone(),
                    self.tx.clone(),
                );
                self.spawn_entry(task);
            }

            SessionState::Connected { channel, .. } => {
                tracing::info!(
                    endpoint = %endpoint,
                    channel = %channel,
                    "Secure channel open, waiting for session activation"
                );
            }

            SessionState::CreateAndActivate {
                attempt, channel, ..
            } => {
                if channel.is_none() {
                    self.stats.record_connect_attempt();
                }
                tracing::info!(
                    endpoint = %endpoint,
                    attempt = %attempt,
                    session_name = %self.context.config.effective_session_name(),
                    user_token = self.context.config.user_token.type_name(),
                    "Creating and activating session"
                );
                let task = create_and_activate_action(
                    *attempt,
                    channel.clone(),
                    self.release.take(),
                    self.context.clone(),
                    self.tx.clone(),
                );
                self.spawn_entry(task);
            }

            SessionState::Active { session, .. } => {
                self.stats.record_activation();
                if from == SessionStateKind::Reactivating {
                    self.stats.record_reactivation();
                }
                tracing::info!(
                    endpoint = %endpoint,
                    session_id = %session.session_id,
                    channel = %session.channel,
                    "Session active"
                );

                let session = Arc::clone(session);
                self.listeners.notify_active(&session);
                self.keepalive = KeepAliveMonitor::start(
                    session,
                    Arc::clone(&self.context.establishment),
                    self.context.keepalive_settings(),
                    Arc::clone(&self.stats),
                    FaultHook {
                        tx: self.tx.clone(),
                    },
                );
            }

            SessionState::Reactivating {
                attempt,
                previous,
                retry,
                last_error,
                ..
            } => {
                self.stats.record_reactivation_attempt();
                let delay = self.context.config.reactivation.delay_for_retry(*retry);
                match last_error {
                    None => tracing::warn!(
                        endpoint = %endpoint,
                        session_id = %previous.session_id,
                        "Connection lost, reactivating session"
                    ),
                    Some(error) => tracing::warn!(
                        endpoint = %endpoint,
                        session_id = %previous.session_id,
                        retry = *retry,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %error,
                        "Reactivation attempt failed, retrying"
                    ),
                }
                let task = reactivate_action(
                    *attempt,
                    Arc::clone(previous),
                    delay,
                    self.context.clone(),
                    self.tx.clone(),
                );
                self.spawn_entry(task);
            }

            SessionState::Disconnecting {
                attempt, session, ..
            } => {
                tracing::info!(endpoint = %endpoint, attempt = %attempt, "Disconnecting");
                let task = disconnect_action(
                    *attempt,
                    session.clone(),
                    self.context.clone(),
                    self.tx.clone(),
                );
                self.spawn_entry(task);
            }
        }
    }

    /// Starts an entry action. An action still running at this point
    /// belongs to a superseded attempt and is aborted first.
    fn spawn_entry<F>(&mut self, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if let Some(previous) = self.entry_task.take() {
            previous.abort();
        }
        self.entry_task = Some(tokio::spawn(action));
    }

    /// Ends the machine's life. Every notification still pending is failed.
    fn stop(&mut self) {
        if let Some(task) = self.entry_task.take() {
            task.abort();
        }

        let state = mem::replace(&mut self.state, SessionState::Inactive);
        if let Some(session) = state.session() {
            let session = Arc::clone(session);
            self.leave_active(&session);
        }
        if let Some(future) = state.future() {
            self.registry.settle(future, Err(SessionFailure::Shutdown));
        }
        self.registry.fail_idle(SessionFailure::Shutdown);

        let closed = self.registry.create();
        self.registry.settle(&closed, Err(SessionFailure::Shutdown));

        self.snapshot_tx.send_replace(SessionSnapshot {
            state: SessionStateKind::Inactive,
            future: closed,
            session: None,
            retry: None,
            shut_down: true,
        });

        tracing::info!(
            endpoint = %self.context.config.endpoint,
            from = %state,
            "Session state machine shutting down"
        );
    }
}

fn log_failure(endpoint: &str, failure: &SessionFailure) {
    match failure {
        SessionFailure::ReactivationExhausted { .. } => {
            tracing::error!(endpoint = %endpoint, error_code = %failure.error_code(), "{failure}")
        }
        SessionFailure::Superseded | SessionFailure::Shutdown => {
            tracing::debug!(endpoint = %endpoint, "{failure}")
        }
        _ => tracing::warn!(endpoint = %endpoint, error_code = %failure.error_code(), "{failure}"),
    }
}

// =============================================================================
// Entry action bodies
// =============================================================================

async fn bounded<T, F>(
    limit: Duration,
    on_timeout: fn(Duration) -> TimeoutError,
    call: F,
) -> OpcUaResult<T>
where
    F: Future<Output = OpcUaResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(OpcUaError::timeout(on_timeout(limit))),
    }
}

async fn open_channel(context: &SessionContext) -> OpcUaResult<ChannelHandle> {
    let security = context.config.channel_security();
    bounded(
        context.config.connect_timeout,
        TimeoutError::Connect,
        context.transport.connect(&security),
    )
    .await
}

/// Best-effort bounded channel close. Failures are only logged.
async fn release_channel(context: &SessionContext) {
    if let Err(e) = bounded(
        context.config.disconnect_timeout,
        TimeoutError::Disconnect,
        context.transport.disconnect(),
    )
    .await
    {
        tracing::debug!(
            endpoint = %context.config.endpoint,
            error = %e,
            "Releasing channel failed"
        );
    }
}

async fn await_release(release: Option<JoinHandle<()>>) {
    if let Some(release) = release {
        let _ = release.await;
    }
}

async fn activate(
    context: &SessionContext,
    channel: &ChannelHandle,
    previous: Option<&SessionHandle>,
) -> OpcUaResult<SessionHandle> {
    let params = context.config.session_parameters();
    bounded(
        context.config.activation_timeout,
        TimeoutError::Activation,
        context
            .establishment
            .create_and_activate(channel, &params, previous),
    )
    .await
}

fn post(tx: &mpsc::UnboundedSender<Command>, event: SessionEvent) {
    let _ = tx.send(Command::Event { event, reply: None });
}

async fn connect_action(
    attempt: AttemptId,
    release: Option<JoinHandle<()>>,
    context: SessionContext,
    tx: mpsc::UnboundedSender<Command>,
) {
    await_release(release).await;
    let event = match open_channel(&context).await {
        Ok(channel) => SessionEvent::ConnectSucceeded { attempt, channel },
        Err(error) => SessionEvent::ConnectFailed {
            attempt,
            error: Arc::new(error),
        },
    };
    post(&tx, event);
}

async fn create_and_activate_action(
    attempt: AttemptId,
    channel: Option<ChannelHandle>,
    release: Option<JoinHandle<()>>,
    context: SessionContext,
    tx: mpsc::UnboundedSender<Command>,
) {
    await_release(release).await;

    let result: OpcUaResult<SessionHandle> = async {
        let channel = match channel {
            Some(channel) => channel,
            None => open_channel(&context).await?,
        };
        let session = activate(&context, &channel, None).await;
        if session.is_err() {
            release_channel(&context).await;
        }
        session
    }
    .await;

    post(&tx, activation_event(attempt, result));
}

async fn reactivate_action(
    attempt: AttemptId,
    previous: Arc<SessionHandle>,
    delay: Duration,
    context: SessionContext,
    tx: mpsc::UnboundedSender<Command>,
) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let result: OpcUaResult<SessionHandle> = async {
        // The lost channel may still look open to the gate.
        release_channel(&context).await;
        let channel = open_channel(&context).await?;
        let session = activate(&context, &channel, Some(&previous)).await;
        if session.is_err() {
            release_channel(&context).await;
        }
        session
    }
    .await;

    post(&tx, activation_event(attempt, result));
}

fn activation_event(attempt: AttemptId, result: OpcUaResult<SessionHandle>) -> SessionEvent {
    match result {
        Ok(session) => SessionEvent::CreateAndActivateSucceeded {
            attempt,
            session: Arc::new(session),
        },
        Err(error) => SessionEvent::CreateAndActivateFailed {
            attempt,
            error: Arc::new(error),
        },
    }
}

async fn disconnect_action(
    attempt: AttemptId,
    session: Option<Arc<SessionHandle>>,
    context: SessionContext,
    tx: mpsc::UnboundedSender<Command>,
) {
    let limit = context.config.disconnect_timeout;

    if let Some(session) = session {
        if let Err(e) = bounded(
            limit,
            TimeoutError::Disconnect,
            context.establishment.close_session(&session),
        )
        .await
        {
            e.log("close session");
        }
    }

    if let Err(e) = bounded(limit, TimeoutError::Disconnect, context.transport.disconnect()).await {
        e.log("disconnect");
    }

    post(&tx, SessionEvent::DisconnectSucceeded { attempt });
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ActivationError, ConnectionError};
    use crate::types::{ChannelSecurity, SessionParameters};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    #[derive(Default)]
    struct Transport {
        fail: AtomicBool,
        connects: AtomicU32,
        disconnects: AtomicU32,
    }

    #[async_trait]
    impl TransportGate for Transport {
        async fn connect(&self, _security: &ChannelSecurity) -> OpcUaResult<ChannelHandle> {
            let n = self.connects.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail.load(Ordering::SeqCst) {
                return Err(OpcUaError::connection(ConnectionError::refused(
                    "opc.tcp://localhost:4840",
                )));
            }
            Ok(ChannelHandle::new(n, "opc.tcp://localhost:4840"))
        }

        async fn disconnect(&self) -> OpcUaResult<()> {
            self.disconnects.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn is_connected(&self) -> bool {
            false
        }

        fn endpoint(&self) -> &str {
            "opc.tcp://localhost:4840"
        }
    }

    #[derive(Default)]
    struct Establishment {
        fail: AtomicBool,
        activations: AtomicU32,
    }

    #[async_trait]
    impl SessionEstablishment for Establishment {
        async fn create_and_activate(
            &self,
            channel: &ChannelHandle,
            _params: &SessionParameters,
            previous: Option<&SessionHandle>,
        ) -> OpcUaResult<SessionHandle> {
            self.activations.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(OpcUaError::activation(ActivationError::rejected(
                    0x8056_0000,
                )));
            }
            Ok(match previous {
                Some(previous) => previous.reactivated_on(channel.clone()),
                None => SessionHandle::new("ns=1;i=1", "token", channel.clone()),
            })
        }
    }

    fn machine() -> (SessionFsm, Arc<Transport>, Arc<Establishment>) {
        let transport = Arc::new(Transport::default());
        let establishment = Arc::new(Establishment::default());
        let config = ClientConfig::builder()
            .endpoint("opc.tcp://localhost:4840")
            .keepalive_interval(Duration::ZERO)
            .build()
            .unwrap();
        let fsm = SessionFsm::spawn(SessionContext::new(
            config,
            transport.clone(),
            establishment.clone(),
        ));
        (fsm, transport, establishment)
    }

    #[tokio::test]
    async fn test_connect_reaches_active() {
        let (fsm, transport, establishment) = machine();
        assert_eq!(fsm.state(), SessionStateKind::Idle);

        let future = fsm.session_future();
        fsm.handle_event(SessionEvent::ConnectRequested);

        let session = future.await.unwrap();
        assert_eq!(session.session_id, "ns=1;i=1");
        assert_eq!(transport.connects.load(Ordering::SeqCst), 1);
        assert_eq!(establishment.activations.load(Ordering::SeqCst), 1);

        let mut rx = fsm.watch();
        rx.wait_for(|s| s.state == SessionStateKind::Active).await.unwrap();
        assert!(fsm.session_future().try_get().unwrap().is_ok());
        assert_eq!(fsm.stats().activations(), 1);
    }

    #[tokio::test]
    async fn test_connect_failure_resolves_with_failure() {
        let (fsm, transport, _) = machine();
        transport.fail.store(true, Ordering::SeqCst);

        let snapshot = fsm.submit(SessionEvent::ConnectRequested).await.unwrap();
        assert_eq!(snapshot.state, SessionStateKind::Connecting);

        let outcome = snapshot.future.await;
        assert!(matches!(outcome, Err(SessionFailure::ConnectFailed(_))));
        assert_eq!(fsm.stats().failures(), 1);
    }

    #[tokio::test]
    async fn test_activation_failure_releases_channel() {
        let (fsm, transport, establishment) = machine();
        establishment.fail.store(true, Ordering::SeqCst);

        let snapshot = fsm.submit(SessionEvent::ConnectRequested).await.unwrap();
        assert!(snapshot.future.await.is_err());
        assert_eq!(transport.disconnects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_ignored_events_are_counted() {
        let (fsm, _, _) = machine();
        let snapshot = fsm.submit(SessionEvent::DisconnectRequested).await.unwrap();
        assert_eq!(snapshot.state, SessionStateKind::Idle);
        assert_eq!(fsm.stats().ignored_events(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_fails_pending_notifications() {
        let (fsm, _, _) = machine();
        let idle = fsm.session_future();

        fsm.shutdown().await;

        assert!(matches!(idle.await, Err(SessionFailure::Shutdown)));
        assert!(!fsm.is_running());
        assert!(fsm.snapshot().shut_down);
        assert!(matches!(
            fsm.submit(SessionEvent::ConnectRequested).await,
            Err(SessionFailure::Shutdown)
        ));
        assert!(!fsm.fault_hook().report_connection_lost("late"));
    }
}
