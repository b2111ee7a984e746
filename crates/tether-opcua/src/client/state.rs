// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Session lifecycle states, events, and the transition table.
//!
//! [`transition`] is pure: it consumes the current state and an event and
//! tells the sequencer which state to enter next and which pending
//! notification to resolve. It performs no I/O. Allocating attempt tokens
//! and futures through the registry is bookkeeping, not I/O.
//!
//! Pairs the table does not list come back as [`Transition::Ignored`]
//! carrying the original state value. Completion events whose attempt token
//! does not match the current state are ignored the same way.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::error::{OpcUaError, SessionFailure};

use super::future::{AttemptId, SessionFuture, SessionFutureRegistry, SessionOutcome};
use super::policy::{ReactivationPolicy, RetryDecision};
use super::session::{ChannelHandle, SessionHandle};

// =============================================================================
// SessionStateKind
// =============================================================================

/// Data-free discriminant of [`SessionState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionStateKind {
    /// No channel, no session.
    #[default]
    Idle,
    /// Secure channel connect in flight.
    Connecting,
    /// Channel open, waiting for an activation request.
    Connected,
    /// CreateSession + ActivateSession in flight.
    CreateAndActivate,
    /// Session usable.
    Active,
    /// Recovering after connection loss.
    Reactivating,
    /// Teardown in flight.
    Disconnecting,
    /// At rest after teardown.
    Inactive,
}

impl SessionStateKind {
    /// Returns `true` for `Idle` and `Inactive`.
    #[inline]
    pub fn is_at_rest(&self) -> bool {
        matches!(self, Self::Idle | Self::Inactive)
    }

    /// Returns `true` while an establishment attempt is in flight.
    #[inline]
    pub fn is_establishing(&self) -> bool {
        matches!(
            self,
            Self::Connecting | Self::Connected | Self::CreateAndActivate | Self::Reactivating
        )
    }

    /// Returns `true` if a session is usable.
    #[inline]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Returns the state name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Connecting => "Connecting",
            Self::Connected => "Connected",
            Self::CreateAndActivate => "CreateAndActivate",
            Self::Active => "Active",
            Self::Reactivating => "Reactivating",
            Self::Disconnecting => "Disconnecting",
            Self::Inactive => "Inactive",
        }
    }
}

impl fmt::Display for SessionStateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// =============================================================================
// SessionState
// =============================================================================

/// Lifecycle state. Each variant carries what its entry action and its
/// own transitions need, and nothing else.
#[derive(Debug, Default)]
pub enum SessionState {
    /// No channel, no session.
    #[default]
    Idle,

    /// Secure channel connect in flight.
    Connecting {
        /// Token of the connect action.
        attempt: AttemptId,
        /// Notification for this attempt.
        future: SessionFuture,
    },

    /// Channel open; activation waits for an explicit request.
    Connected {
        /// Notification carried to the activation attempt.
        future: SessionFuture,
        /// The open channel.
        channel: ChannelHandle,
    },

    /// CreateSession + ActivateSession in flight.
    CreateAndActivate {
        /// Token of the create/activate action.
        attempt: AttemptId,
        /// Notification for this attempt.
        future: SessionFuture,
        /// Channel opened by `Connecting`, if any. The entry action
        /// connects first when this is `None`.
        channel: Option<ChannelHandle>,
    },

    /// Session usable.
    Active {
        /// The activated session.
        session: Arc<SessionHandle>,
        /// Notification resolved with `session`.
        future: SessionFuture,
    },

    /// Recovering after connection loss.
    Reactivating {
        /// Token of the current recovery action.
        attempt: AttemptId,
        /// Notification for the whole recovery.
        future: SessionFuture,
        /// Session being recovered.
        previous: Arc<SessionHandle>,
        /// Retry number; 0 is the immediate first attempt.
        retry: u32,
        /// When the connection was lost.
        lost_at: Instant,
        /// Error of the previous failed attempt.
        last_error: Option<Arc<OpcUaError>>,
    },

    /// Teardown in flight.
    Disconnecting {
        /// Token of the teardown action.
        attempt: AttemptId,
        /// Notification inherited from the previous state, already resolved.
        future: SessionFuture,
        /// Session to close before the channel goes down.
        session: Option<Arc<SessionHandle>>,
    },

    /// At rest after teardown.
    Inactive,
}

impl SessionState {
    /// Returns the discriminant.
    pub fn kind(&self) -> SessionStateKind {
        match self {
            Self::Idle => SessionStateKind::Idle,
            Self::Connecting { .. } => SessionStateKind::Connecting,
            Self::Connected { .. } => SessionStateKind::Connected,
            Self::CreateAndActivate { .. } => SessionStateKind::CreateAndActivate,
            Self::Active { .. } => SessionStateKind::Active,
            Self::Reactivating { .. } => SessionStateKind::Reactivating,
            Self::Disconnecting { .. } => SessionStateKind::Disconnecting,
            Self::Inactive => SessionStateKind::Inactive,
        }
    }

    /// Notification owned by this state. `None` at rest.
    pub fn future(&self) -> Option<&SessionFuture> {
        match self {
            Self::Connecting { future, .. }
            | Self::Connected { future, .. }
            | Self::CreateAndActivate { future, .. }
            | Self::Active { future, .. }
            | Self::Reactivating { future, .. }
            | Self::Disconnecting { future, .. } => Some(future),
            Self::Idle | Self::Inactive => None,
        }
    }

    /// Token of the entry action in flight.
    pub fn attempt(&self) -> Option<AttemptId> {
        match self {
            Self::Connecting { attempt, .. }
            | Self::CreateAndActivate { attempt, .. }
            | Self::Reactivating { attempt, .. }
            | Self::Disconnecting { attempt, .. } => Some(*attempt),
            _ => None,
        }
    }

    /// The usable session, only while `Active`.
    pub fn session(&self) -> Option<&Arc<SessionHandle>> {
        match self {
            Self::Active { session, .. } => Some(session),
            _ => None,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reactivating { retry, .. } => write!(f, "Reactivating(retry={})", retry),
            other => write!(f, "{}", other.kind()),
        }
    }
}

// =============================================================================
// SessionEvent
// =============================================================================

/// Data-free discriminant of [`SessionEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionEventKind {
    /// `CONNECT_REQUESTED`
    ConnectRequested,
    /// `CONNECT_SUCCEEDED`
    ConnectSucceeded,
    /// `CONNECT_FAILED`
    ConnectFailed,
    /// `CREATE_AND_ACTIVATE_REQUESTED`
    CreateAndActivateRequested,
    /// `CREATE_AND_ACTIVATE_SUCCEEDED`
    CreateAndActivateSucceeded,
    /// `CREATE_AND_ACTIVATE_FAILED`
    CreateAndActivateFailed,
    /// `ERR_CONNECTION_LOST`
    ErrConnectionLost,
    /// `DISCONNECT_REQUESTED`
    DisconnectRequested,
    /// `DISCONNECT_SUCCEEDED`
    DisconnectSucceeded,
}

impl SessionEventKind {
    /// Returns the event name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ConnectRequested => "CONNECT_REQUESTED",
            Self::ConnectSucceeded => "CONNECT_SUCCEEDED",
            Self::ConnectFailed => "CONNECT_FAILED",
            Self::CreateAndActivateRequested => "CREATE_AND_ACTIVATE_REQUESTED",
            Self::CreateAndActivateSucceeded => "CREATE_AND_ACTIVATE_SUCCEEDED",
            Self::CreateAndActivateFailed => "CREATE_AND_ACTIVATE_FAILED",
            Self::ErrConnectionLost => "ERR_CONNECTION_LOST",
            Self::DisconnectRequested => "DISCONNECT_REQUESTED",
            Self::DisconnectSucceeded => "DISCONNECT_SUCCEEDED",
        }
    }
}

impl fmt::Display for SessionEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Input to the state machine.
///
/// Requests come from callers. Completions are posted by entry actions and
/// carry the token of the action that produced them.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A caller asked for a connection.
    ConnectRequested,

    /// The channel is open.
    ConnectSucceeded {
        /// Token of the connect action.
        attempt: AttemptId,
        /// The open channel.
        channel: ChannelHandle,
    },

    /// The channel could not be opened.
    ConnectFailed {
        /// Token of the connect action.
        attempt: AttemptId,
        /// Why.
        error: Arc<OpcUaError>,
    },

    /// A caller asked for session activation.
    CreateAndActivateRequested,

    /// The session is active.
    CreateAndActivateSucceeded {
        /// Token of the create/activate action.
        attempt: AttemptId,
        /// The activated session.
        session: Arc<SessionHandle>,
    },

    /// The session could not be created or activated.
    CreateAndActivateFailed {
        /// Token of the create/activate action.
        attempt: AttemptId,
        /// Why.
        error: Arc<OpcUaError>,
    },

    /// The transport or keep-alive monitor observed a dead connection.
    ConnectionLost {
        /// What was observed.
        reason: String,
    },

    /// A caller asked for teardown.
    DisconnectRequested,

    /// Teardown finished.
    DisconnectSucceeded {
        /// Token of the teardown action.
        attempt: AttemptId,
    },
}

impl SessionEvent {
    /// Creates a connection lost event.
    pub fn connection_lost(reason: impl Into<String>) -> Self {
        Self::ConnectionLost {
            reason: reason.into(),
        }
    }

    /// Returns the discriminant.
    pub fn kind(&self) -> SessionEventKind {
        match self {
            Self::ConnectRequested => SessionEventKind::ConnectRequested,
            Self::ConnectSucceeded { .. } => SessionEventKind::ConnectSucceeded,
            Self::ConnectFailed { .. } => SessionEventKind::ConnectFailed,
            Self::CreateAndActivateRequested => SessionEventKind::CreateAndActivateRequested,
            Self::CreateAndActivateSucceeded { .. } => SessionEventKind::CreateAndActivateSucceeded,
            Self::CreateAndActivateFailed { .. } => SessionEventKind::CreateAndActivateFailed,
            Self::ConnectionLost { .. } => SessionEventKind::ErrConnectionLost,
            Self::DisconnectRequested => SessionEventKind::DisconnectRequested,
            Self::DisconnectSucceeded { .. } => SessionEventKind::DisconnectSucceeded,
        }
    }

    /// Token carried by completion events.
    pub fn attempt(&self) -> Option<AttemptId> {
        match self {
            Self::ConnectSucceeded { attempt, .. }
            | Self::ConnectFailed { attempt, .. }
            | Self::CreateAndActivateSucceeded { attempt, .. }
            | Self::CreateAndActivateFailed { attempt, .. }
            | Self::DisconnectSucceeded { attempt } => Some(*attempt),
            _ => None,
        }
    }
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.attempt() {
            Some(attempt) => write!(f, "{}{}", self.kind(), attempt),
            None => write!(f, "{}", self.kind()),
        }
    }
}

// =============================================================================
// Transition
// =============================================================================

/// A notification to resolve as part of a transition.
#[derive(Debug)]
pub struct Settlement {
    /// The notification.
    pub future: SessionFuture,
    /// Its outcome.
    pub outcome: SessionOutcome,
}

impl Settlement {
    fn ok(future: SessionFuture, session: Arc<SessionHandle>) -> Option<Self> {
        Some(Self {
            future,
            outcome: Ok(session),
        })
    }

    fn fail(future: SessionFuture, failure: SessionFailure) -> Option<Self> {
        Some(Self {
            future,
            outcome: Err(failure),
        })
    }
}

/// Result of [`transition`].
#[derive(Debug)]
pub enum Transition {
    /// The event does not apply; the machine stays in this state.
    Ignored(SessionState),

    /// Enter `next`, resolving `settle` first.
    Enter {
        /// State to enter. Its entry action runs exactly once.
        next: SessionState,
        /// Notification resolved on leaving the current state.
        settle: Option<Settlement>,
    },
}

impl Transition {
    fn enter(next: SessionState) -> Self {
        Self::Enter { next, settle: None }
    }

    /// Returns `true` if the event was ignored.
    #[inline]
    pub fn is_ignored(&self) -> bool {
        matches!(self, Self::Ignored(_))
    }
}

/// What the transition function may consult besides state and event.
pub struct TransitionContext<'a> {
    /// Allocates attempt tokens and futures.
    pub registry: &'a mut SessionFutureRegistry,
    /// Decides reactivation retries.
    pub policy: &'a ReactivationPolicy,
    /// Continue from `Connecting` straight into `CreateAndActivate`.
    pub auto_activate: bool,
    /// Current time.
    pub now: Instant,
}

// =============================================================================
// transition()
// =============================================================================

/// Maps `(state, event)` to the next state.
pub fn transition(
    state: SessionState,
    event: SessionEvent,
    cx: &mut TransitionContext<'_>,
) -> Transition {
    use SessionEvent as E;
    use SessionState as S;

    match (state, event) {
        // ---------------------------------------------------------------------
        // At rest
        // ---------------------------------------------------------------------
        (S::Idle | S::Inactive, E::ConnectRequested) => Transition::enter(S::Connecting {
            attempt: cx.registry.next_attempt(),
            future: cx.registry.adopt(),
        }),

        (S::Idle | S::Inactive, E::CreateAndActivateRequested) => {
            Transition::enter(S::CreateAndActivate {
                attempt: cx.registry.next_attempt(),
                future: cx.registry.adopt(),
                channel: None,
            })
        }

        // ---------------------------------------------------------------------
        // Connecting
        // ---------------------------------------------------------------------
        (S::Connecting { attempt, future }, E::ConnectSucceeded { attempt: token, channel })
            if attempt == token =>
        {
            if cx.auto_activate {
                Transition::enter(S::CreateAndActivate {
                    attempt: cx.registry.next_attempt(),
                    future,
                    channel: Some(channel),
                })
            } else {
                Transition::enter(S::Connected { future, channel })
            }
        }

        (S::Connecting { attempt, future }, E::ConnectFailed { attempt: token, error })
            if attempt == token =>
        {
            Transition::Enter {
                next: S::Idle,
                settle: Settlement::fail(future, SessionFailure::ConnectFailed(error)),
            }
        }

        (S::Connecting { future, .. }, E::DisconnectRequested) => supersede(future, cx),

        // ---------------------------------------------------------------------
        // Connected (manual activation)
        // ---------------------------------------------------------------------
        (S::Connected { future, channel }, E::CreateAndActivateRequested) => {
            Transition::enter(S::CreateAndActivate {
                attempt: cx.registry.next_attempt(),
                future,
                channel: Some(channel),
            })
        }

        (S::Connected { future, .. }, E::ConnectionLost { reason }) => Transition::Enter {
            next: S::Idle,
            settle: Settlement::fail(future, SessionFailure::ConnectionLost { reason }),
        },

        (S::Connected { future, .. }, E::DisconnectRequested) => supersede(future, cx),

        // ---------------------------------------------------------------------
        // CreateAndActivate
        // ---------------------------------------------------------------------
        (
            S::CreateAndActivate { attempt, future, .. },
            E::CreateAndActivateSucceeded { attempt: token, session },
        ) if attempt == token => Transition::Enter {
            settle: Settlement::ok(future.clone(), session.clone()),
            next: S::Active { session, future },
        },

        (
            S::CreateAndActivate { attempt, future, .. },
            E::CreateAndActivateFailed { attempt: token, error },
        ) if attempt == token => Transition::Enter {
            next: S::Idle,
            settle: Settlement::fail(future, SessionFailure::ActivationFailed(error)),
        },

        (S::CreateAndActivate { future, .. }, E::DisconnectRequested) => {
            supersede(future, cx)
        }

        // ---------------------------------------------------------------------
        // Active
        // ---------------------------------------------------------------------
        (S::Active { session, .. }, E::ConnectionLost { .. }) => {
            Transition::enter(S::Reactivating {
                attempt: cx.registry.next_attempt(),
                future: cx.registry.create(),
                previous: session,
                retry: 0,
                lost_at: cx.now,
                last_error: None,
            })
        }

        (S::Active { session, future }, E::DisconnectRequested) => {
            Transition::enter(S::Disconnecting {
                attempt: cx.registry.next_attempt(),
                future,
                session: Some(session),
            })
        }

        // ---------------------------------------------------------------------
        // Reactivating
        // ---------------------------------------------------------------------
        (
            S::Reactivating { attempt, future, .. },
            E::CreateAndActivateSucceeded { attempt: token, session },
        ) if attempt == token => Transition::Enter {
            settle: Settlement::ok(future.clone(), session.clone()),
            next: S::Active { session, future },
        },

        (
            S::Reactivating {
                attempt,
                future,
                previous,
                retry,
                lost_at,
                ..
            },
            E::CreateAndActivateFailed { attempt: token, error },
        ) if attempt == token => {
            let attempts = retry.saturating_add(1);
            let elapsed = cx.now.saturating_duration_since(lost_at);

            match cx.policy.decide(attempts, elapsed, &error) {
                RetryDecision::Retry { retry, .. } => Transition::enter(S::Reactivating {
                    attempt: cx.registry.next_attempt(),
                    future,
                    previous,
                    retry,
                    lost_at,
                    last_error: Some(error),
                }),
                RetryDecision::GiveUp { attempts, .. } => Transition::Enter {
                    next: S::Idle,
                    settle: Settlement::fail(
                        future,
                        SessionFailure::exhausted(attempts, Some(error)),
                    ),
                },
            }
        }

        (S::Reactivating { future, .. }, E::DisconnectRequested) => supersede(future, cx),

        // ---------------------------------------------------------------------
        // Disconnecting
        // ---------------------------------------------------------------------
        (S::Disconnecting { attempt, .. }, E::DisconnectSucceeded { attempt: token })
            if attempt == token =>
        {
            Transition::enter(S::Inactive)
        }

        (S::Disconnecting { .. }, E::ConnectionLost { .. }) => Transition::enter(S::Inactive),

        (S::Disconnecting { .. }, E::ConnectRequested | E::CreateAndActivateRequested) => {
            Transition::enter(S::CreateAndActivate {
                attempt: cx.registry.next_attempt(),
                future: cx.registry.adopt(),
                channel: None,
            })
        }

        // ---------------------------------------------------------------------
        // Everything else
        // ---------------------------------------------------------------------
        (state, _) => Transition::Ignored(state),
    }
}

/// Fails the in-flight attempt and starts teardown.
fn supersede(future: SessionFuture, cx: &mut TransitionContext<'_>) -> Transition {
    Transition::Enter {
        settle: Settlement::fail(future.clone(), SessionFailure::Superseded),
        next: SessionState::Disconnecting {
            attempt: cx.registry.next_attempt(),
            future,
            session: None,
        },
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConnectionError;

    struct Fixture {
        registry: SessionFutureRegistry,
        policy: ReactivationPolicy,
        auto_activate: bool,
        now: Instant,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                registry: SessionFutureRegistry::new(),
                policy: ReactivationPolicy::new(3),
                auto_activate: true,
                now: Instant::now(),
            }
        }

        fn step(&mut self, state: SessionState, event: SessionEvent) -> Transition {
            let mut cx = TransitionContext {
                registry: &mut self.registry,
                policy: &self.policy,
                auto_activate: self.auto_activate,
                now: self.now,
            };
            transition(state, event, &mut cx)
        }

        /// Applies the transition, resolving the settlement like the machine does.
        fn apply(&mut self, state: SessionState, event: SessionEvent) -> SessionState {
            match self.step(state, event) {
                Transition::Ignored(state) => state,
                Transition::Enter { next, settle } => {
                    if let Some(settlement) = settle {
                        self.registry.settle(&settlement.future, settlement.outcome);
                    }
                    next
                }
            }
        }
    }

    fn channel() -> ChannelHandle {
        ChannelHandle::new(1, "opc.tcp://localhost:4840")
    }

    fn session() -> Arc<SessionHandle> {
        Arc::new(SessionHandle::new("ns=1;i=7", "token", channel()))
    }

    fn refused() -> Arc<OpcUaError> {
        Arc::new(OpcUaError::connection(ConnectionError::refused(
            "opc.tcp://localhost:4840",
        )))
    }

    fn active(fx: &mut Fixture) -> (SessionState, SessionFuture) {
        let state = fx.apply(SessionState::Idle, SessionEvent::CreateAndActivateRequested);
        let attempt = state.attempt().unwrap();
        let future = state.future().unwrap().clone();
        let state = fx.apply(
            state,
            SessionEvent::CreateAndActivateSucceeded {
                attempt,
                session: session(),
            },
        );
        (state, future)
    }

    #[test]
    fn test_connect_path_carries_one_future() {
        let mut fx = Fixture::new();
        let idle_future = fx.registry.idle();

        let state = fx.apply(SessionState::Idle, SessionEvent::ConnectRequested);
        assert_eq!(state.kind(), SessionStateKind::Connecting);
        assert!(state.future().unwrap().same_as(&idle_future));

        let attempt = state.attempt().unwrap();
        let state = fx.apply(
            state,
            SessionEvent::ConnectSucceeded {
                attempt,
                channel: channel(),
            },
        );
        assert_eq!(state.kind(), SessionStateKind::CreateAndActivate);
        assert!(state.future().unwrap().same_as(&idle_future));
        assert!(!idle_future.is_resolved());

        let attempt = state.attempt().unwrap();
        let state = fx.apply(
            state,
            SessionEvent::CreateAndActivateSucceeded {
                attempt,
                session: session(),
            },
        );
        assert_eq!(state.kind(), SessionStateKind::Active);
        assert!(matches!(idle_future.try_get(), Some(Ok(_))));
    }

    #[test]
    fn test_connect_failure_returns_to_idle() {
        let mut fx = Fixture::new();
        let state = fx.apply(SessionState::Idle, SessionEvent::ConnectRequested);
        let future = state.future().unwrap().clone();
        let attempt = state.attempt().unwrap();

        let state = fx.apply(
            state,
            SessionEvent::ConnectFailed {
                attempt,
                error: refused(),
            },
        );
        assert_eq!(state.kind(), SessionStateKind::Idle);
        assert!(matches!(
            future.try_get(),
            Some(Err(SessionFailure::ConnectFailed(_)))
        ));
    }

    #[test]
    fn test_stale_completion_is_ignored() {
        let mut fx = Fixture::new();
        let state = fx.apply(SessionState::Idle, SessionEvent::ConnectRequested);
        let stale = state.attempt().unwrap();
        let state = fx.apply(
            state,
            SessionEvent::ConnectSucceeded {
                attempt: stale,
                channel: channel(),
            },
        );

        let transition = fx.step(
            state,
            SessionEvent::ConnectFailed {
                attempt: stale,
                error: refused(),
            },
        );
        match transition {
            Transition::Ignored(state) => {
                assert_eq!(state.kind(), SessionStateKind::CreateAndActivate)
            }
            other => panic!("expected ignore, got {:?}", other),
        }
    }

    #[test]
    fn test_manual_activation_stops_in_connected() {
        let mut fx = Fixture::new();
        fx.auto_activate = false;

        let state = fx.apply(SessionState::Idle, SessionEvent::ConnectRequested);
        let future = state.future().unwrap().clone();
        let attempt = state.attempt().unwrap();
        let state = fx.apply(
            state,
            SessionEvent::ConnectSucceeded {
                attempt,
                channel: channel(),
            },
        );
        assert_eq!(state.kind(), SessionStateKind::Connected);
        assert!(state.attempt().is_none());

        let state = fx.apply(state, SessionEvent::CreateAndActivateRequested);
        assert_eq!(state.kind(), SessionStateKind::CreateAndActivate);
        assert!(state.future().unwrap().same_as(&future));
        match &state {
            SessionState::CreateAndActivate { channel, .. } => assert!(channel.is_some()),
            other => panic!("unexpected state {}", other),
        }
    }

    #[test]
    fn test_connected_connection_lost_fails_attempt() {
        let mut fx = Fixture::new();
        let future = fx.registry.create();
        let state = fx.apply(
            SessionState::Connected {
                future: future.clone(),
                channel: channel(),
            },
            SessionEvent::connection_lost("socket reset"),
        );
        assert_eq!(state.kind(), SessionStateKind::Idle);
        assert!(matches!(
            future.try_get(),
            Some(Err(SessionFailure::ConnectionLost { .. }))
        ));
    }

    #[test]
    fn test_disconnect_supersedes_in_flight_attempt() {
        let mut fx = Fixture::new();
        let state = fx.apply(SessionState::Idle, SessionEvent::CreateAndActivateRequested);
        let future = state.future().unwrap().clone();

        let state = fx.apply(state, SessionEvent::DisconnectRequested);
        assert_eq!(state.kind(), SessionStateKind::Disconnecting);
        assert!(matches!(future.try_get(), Some(Err(SessionFailure::Superseded))));
        assert!(state.future().unwrap().same_as(&future));
    }

    #[test]
    fn test_connection_lost_while_active_always_reactivates() {
        let mut fx = Fixture::new();
        let (state, original) = active(&mut fx);

        let state = fx.apply(state, SessionEvent::connection_lost("keep-alive failed"));
        assert_eq!(state.kind(), SessionStateKind::Reactivating);

        let recovery = state.future().unwrap().clone();
        assert!(!recovery.same_as(&original));
        assert!(!recovery.is_resolved());
        assert!(matches!(original.try_get(), Some(Ok(_))));
    }

    #[test]
    fn test_second_connection_lost_is_ignored() {
        let mut fx = Fixture::new();
        let (state, _) = active(&mut fx);
        let state = fx.apply(state, SessionEvent::connection_lost("first"));
        let attempt = state.attempt();

        let transition = fx.step(state, SessionEvent::connection_lost("second"));
        match transition {
            Transition::Ignored(state) => assert_eq!(state.attempt(), attempt),
            other => panic!("expected ignore, got {:?}", other),
        }
    }

    #[test]
    fn test_reactivation_retries_then_gives_up() {
        let mut fx = Fixture::new();
        let (state, _) = active(&mut fx);
        let mut state = fx.apply(state, SessionEvent::connection_lost("lost"));
        let recovery = state.future().unwrap().clone();

        for expected_retry in 1..=2 {
            let attempt = state.attempt().unwrap();
            state = fx.apply(
                state,
                SessionEvent::CreateAndActivateFailed {
                    attempt,
                    error: refused(),
                },
            );
            match &state {
                SessionState::Reactivating { retry, future, .. } => {
                    assert_eq!(*retry, expected_retry);
                    assert!(future.same_as(&recovery));
                }
                other => panic!("unexpected state {}", other),
            }
            assert!(!recovery.is_resolved());
        }

        let attempt = state.attempt().unwrap();
        let state = fx.apply(
            state,
            SessionEvent::CreateAndActivateFailed {
                attempt,
                error: refused(),
            },
        );
        assert_eq!(state.kind(), SessionStateKind::Idle);
        assert!(matches!(
            recovery.try_get(),
            Some(Err(SessionFailure::ReactivationExhausted { attempts: 3, .. }))
        ));
    }

    #[test]
    fn test_reactivation_success_resolves_recovery_future() {
        let mut fx = Fixture::new();
        let (state, _) = active(&mut fx);
        let state = fx.apply(state, SessionEvent::connection_lost("lost"));
        let recovery = state.future().unwrap().clone();

        let attempt = state.attempt().unwrap();
        let state = fx.apply(
            state,
            SessionEvent::CreateAndActivateFailed {
                attempt,
                error: refused(),
            },
        );
        let attempt = state.attempt().unwrap();
        let state = fx.apply(
            state,
            SessionEvent::CreateAndActivateSucceeded {
                attempt,
                session: session(),
            },
        );

        assert_eq!(state.kind(), SessionStateKind::Active);
        assert!(matches!(recovery.try_get(), Some(Ok(_))));
    }

    #[test]
    fn test_teardown_paths() {
        let mut fx = Fixture::new();
        let (state, original) = active(&mut fx);

        let state = fx.apply(state, SessionEvent::DisconnectRequested);
        assert_eq!(state.kind(), SessionStateKind::Disconnecting);
        assert!(state.future().unwrap().same_as(&original));
        let attempt = state.attempt().unwrap();

        let state = fx.apply(state, SessionEvent::DisconnectSucceeded { attempt });
        assert_eq!(state.kind(), SessionStateKind::Inactive);

        let state = fx.apply(state, SessionEvent::ConnectRequested);
        assert_eq!(state.kind(), SessionStateKind::Connecting);
    }

    #[test]
    fn test_connect_during_teardown_starts_new_attempt() {
        let mut fx = Fixture::new();
        let (state, original) = active(&mut fx);
        let state = fx.apply(state, SessionEvent::DisconnectRequested);

        let state = fx.apply(state, SessionEvent::ConnectRequested);
        assert_eq!(state.kind(), SessionStateKind::CreateAndActivate);
        assert!(!state.future().unwrap().same_as(&original));
    }

    #[test]
    fn test_unlisted_pairs_are_ignored() {
        let mut fx = Fixture::new();
        assert!(fx.step(SessionState::Idle, SessionEvent::DisconnectRequested).is_ignored());
        assert!(fx
            .step(SessionState::Inactive, SessionEvent::connection_lost("x"))
            .is_ignored());

        let (state, _) = active(&mut fx);
        assert!(fx.step(state, SessionEvent::ConnectRequested).is_ignored());
    }

    #[test]
    fn test_event_display() {
        assert_eq!(
            SessionEvent::connection_lost("x").to_string(),
            "ERR_CONNECTION_LOST"
        );
        let mut registry = SessionFutureRegistry::new();
        let attempt = registry.next_attempt();
        assert_eq!(
            SessionEvent::DisconnectSucceeded { attempt }.to_string(),
            "DISCONNECT_SUCCEEDED#1"
        );
    }
}
