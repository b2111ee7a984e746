// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Gate traits consumed by the session state machine.
//!
//! The state machine does not speak the wire protocol. It drives two gates:
//!
//! - [`TransportGate`]: opens and closes the secure channel.
//! - [`SessionEstablishment`]: creates and activates a session on an open
//!   channel, probes it with keep-alives, and closes it on teardown.
//!
//! Gates are shared between the sequencer and the entry-action tasks it
//! spawns, so every method takes `&self`. Implementations provide their own
//! interior mutability. The machine bounds each call with the timeouts from
//! [`ClientConfig`](crate::types::ClientConfig); a gate may apply tighter
//! limits internally.

use async_trait::async_trait;

use crate::error::OpcUaResult;
use crate::types::{ChannelSecurity, SessionParameters};

use super::session::{ChannelHandle, SessionHandle};

// =============================================================================
// TransportGate
// =============================================================================

/// Secure channel connect/disconnect primitive.
#[async_trait]
pub trait TransportGate: Send + Sync {
    /// Opens the secure channel with the given security settings.
    ///
    /// Calling this while a channel is already open returns that channel.
    ///
    /// # Errors
    ///
    /// Returns a connection or timeout error if the channel cannot be opened.
    async fn connect(&self, security: &ChannelSecurity) -> OpcUaResult<ChannelHandle>;

    /// Closes the secure channel.
    ///
    /// Calling this while no channel is open is a no-op. The state machine
    /// logs errors from this call and proceeds with the teardown.
    async fn disconnect(&self) -> OpcUaResult<()>;

    /// Returns `true` if a channel is currently open.
    fn is_connected(&self) -> bool;

    /// Endpoint this gate connects to, for logging.
    fn endpoint(&self) -> &str;
}

// =============================================================================
// SessionEstablishment
// =============================================================================

/// CreateSession + ActivateSession as one logical unit.
#[async_trait]
pub trait SessionEstablishment: Send + Sync {
    /// Creates and activates a session on `channel` using `params`.
    ///
    /// `previous` is `Some` while recovering after connection loss. An
    /// implementation may re-activate that session identity or create a new
    /// session and transfer its subscriptions; the machine only uses the
    /// returned handle.
    ///
    /// # Errors
    ///
    /// Returns an activation or timeout error if the server does not accept
    /// the session.
    async fn create_and_activate(
        &self,
        channel: &ChannelHandle,
        params: &SessionParameters,
        previous: Option<&SessionHandle>,
    ) -> OpcUaResult<SessionHandle>;

    /// Probes `session` to confirm the server still serves it.
    async fn keep_alive(&self, session: &SessionHandle) -> OpcUaResult<()> {
        let _ = session;
        Ok(())
    }

    /// Closes `session` before the channel is torn down.
    async fn close_session(&self, session: &SessionHandle) -> OpcUaResult<()> {
        let _ = session;
        Ok(())
    }
}
