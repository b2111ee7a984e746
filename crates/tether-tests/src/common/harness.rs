// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Harness
//!
//! Wires a [`UaClient`] to mock gates and a recording listener.

use std::sync::Arc;
use std::time::Duration;

use tether_opcua::client::{SessionSnapshot, SessionStateKind, UaClient};
use tether_opcua::types::ClientConfig;

use super::fixtures::{ConfigFixtures, TEST_ENDPOINT};
use super::mocks::{MockSessionEstablishment, MockTransportGate, RecordingListener};

/// Default limit for [`SessionHarness::wait_for_state`].
pub const DEFAULT_WAIT: Duration = Duration::from_secs(30);

/// A client plus the mocks behind it.
pub struct SessionHarness {
    /// Client under test.
    pub client: UaClient,

    /// Transport gate behind the client.
    pub transport: Arc<MockTransportGate>,

    /// Establishment gate behind the client.
    pub establishment: Arc<MockSessionEstablishment>,

    /// Listener registered on the client.
    pub listener: Arc<RecordingListener>,
}

impl SessionHarness {
    /// Harness with [`ConfigFixtures::basic`].
    pub fn new() -> Self {
        Self::with_config(ConfigFixtures::basic())
    }

    /// Harness with a custom configuration.
    ///
    /// Must be called within a Tokio runtime.
    pub fn with_config(config: ClientConfig) -> Self {
        super::init_test_logging();

        let transport = Arc::new(MockTransportGate::new(TEST_ENDPOINT));
        let establishment = Arc::new(MockSessionEstablishment::new());
        let client = UaClient::new(config, transport.clone(), establishment.clone())
            .expect("harness config is valid");

        let listener = RecordingListener::new();
        client.add_session_listener(listener.clone());

        Self {
            client,
            transport,
            establishment,
            listener,
        }
    }

    /// Connects and asserts the session became active.
    pub async fn connect_active(&self) {
        self.client.connect().await.expect("connect succeeds");
        assert_eq!(self.client.state(), SessionStateKind::Active);
    }

    /// Waits until the client publishes `state`.
    ///
    /// Panics after [`DEFAULT_WAIT`]; with paused time this is virtual.
    pub async fn wait_for_state(&self, state: SessionStateKind) -> SessionSnapshot {
        self.wait_until(|s| s.state == state).await
    }

    /// Waits until a published snapshot satisfies `predicate`.
    pub async fn wait_until<F>(&self, mut predicate: F) -> SessionSnapshot
    where
        F: FnMut(&SessionSnapshot) -> bool,
    {
        let mut rx = self.client.watch_state();
        let waited = tokio::time::timeout(DEFAULT_WAIT, async {
            rx.wait_for(|s| predicate(s))
                .await
                .map(|s| s.clone())
                .expect("state machine running")
        })
        .await;

        match waited {
            Ok(snapshot) => {
                tracing::debug!(state = %snapshot.state, "harness wait satisfied");
                snapshot
            }
            Err(_) => panic!(
                "timed out waiting; last state was {}",
                self.client.state()
            ),
        }
    }
}

impl Default for SessionHarness {
    fn default() -> Self {
        Self::new()
    }
}
