// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA client session lifecycle.
//!
//! - **State Registry**: legal `(state, event)` pairs and their targets
//! - **Session State Machine**: a single sequencer task that owns the state
//! - **Session Futures**: resolve-once notifications, one per attempt
//! - **Reactivation Policy**: bounded backoff after connection loss
//! - **Client Wrapper**: awaitable `connect` / `activate` / `disconnect`
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          UaClient                               │
//! │            (connect / activate / disconnect / get_session)      │
//! └─────────────────────────────────────────────────────────────────┘
//!                              │ events
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         SessionFsm                              │
//! │   sequencer task: transition() → settle → enter → publish       │
//! │   ┌──────────────┐  ┌──────────────────────┐  ┌─────────────┐   │
//! │   │ SessionState │  │ SessionFutureRegistry│  │  KeepAlive  │   │
//! │   └──────────────┘  └──────────────────────┘  └─────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//!                 │ entry actions               ▲ follow-up events
//!                 ▼                             │
//! ┌───────────────────────────────┐  ┌──────────────────────────────┐
//! │         TransportGate         │  │     SessionEstablishment     │
//! │   (secure channel open/close) │  │ (create/activate/keep-alive) │
//! └───────────────────────────────┘  └──────────────────────────────┘
//! ```
//!
//! # Lifecycle
//!
//! ```text
//! Idle ─▶ Connecting ─▶ CreateAndActivate ─▶ Active ─▶ Disconnecting ─▶ Inactive
//!  ▲           │                 │            │  ▲            ▲
//!  │           │  (manual) Connected ─────────┘  │            │
//!  └───────────┴─────────────────┴─── Reactivating ───────────┘
//! ```

mod fsm;
mod future;
mod gate;
mod keepalive;
mod policy;
mod session;
mod state;
mod wrapper;

pub use fsm::{FaultHook, SessionContext, SessionFsm, SessionSnapshot};
pub use future::{AttemptId, SessionFuture, SessionFutureRegistry, SessionOutcome};
pub use gate::{SessionEstablishment, TransportGate};
pub use keepalive::KeepAliveSettings;
pub use policy::{BackoffStrategy, GiveUpReason, ReactivationPolicy, RetryDecision};
pub use session::{ChannelHandle, SessionActivityListener, SessionHandle, SessionStats};
pub use state::{
    transition, SessionEvent, SessionEventKind, SessionState, SessionStateKind, Settlement,
    Transition, TransitionContext,
};
pub use wrapper::UaClient;
