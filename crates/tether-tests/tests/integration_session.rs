// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Session Lifecycle Integration Tests
//!
//! Drives `UaClient` against the mock gates:
//!
//! - `test_connect_*`: establishment and its failures
//! - `test_manual_*`: manual activation mode
//! - `test_disconnect_*`: teardown and supersession
//! - `test_shutdown_*`: end of life

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use tether_opcua::client::{SessionEvent, SessionStateKind, TransportGate};
use tether_opcua::error::{OpcUaError, SessionFailure};
use tether_opcua::types::{ClientConfig, SecurityMode, SecurityPolicy, UserTokenType};

use tether_tests::common::fixtures::{ConfigFixtures, TEST_ENDPOINT};
use tether_tests::common::harness::SessionHarness;
use tether_tests::common::mocks::ActivityRecord;

// =============================================================================
// Connect
// =============================================================================

#[tokio::test]
async fn test_connect_reaches_active() {
    let harness = SessionHarness::new();
    assert_eq!(harness.client.state(), SessionStateKind::Idle);

    harness.connect_active().await;

    let session = harness.client.get_session().await.unwrap();
    assert_eq!(session.endpoint(), TEST_ENDPOINT);
    assert_eq!(harness.transport.connect_count(), 1);
    assert_eq!(harness.establishment.activation_count(), 1);
    assert_eq!(harness.establishment.previous_seen(), vec![None]);

    let stats = harness.client.stats();
    assert_eq!(stats.connect_attempts(), 1);
    assert_eq!(stats.activations(), 1);
    assert_eq!(stats.failures(), 0);
}

#[tokio::test]
async fn test_connect_waiters_share_one_outcome() {
    let harness = SessionHarness::new();

    // Taken while idle: the next attempt resolves it.
    let waiters: Vec<_> = (0..8)
        .map(|_| tokio::spawn(harness.client.session_future().into_future()))
        .collect();

    harness.client.connect().await.unwrap();

    let expected = harness.client.session().unwrap();
    for waiter in waiters {
        let session = waiter.await.unwrap().unwrap();
        assert!(Arc::ptr_eq(&session, &expected));
    }
}

#[tokio::test]
async fn test_connect_failure_returns_to_idle() {
    let harness = SessionHarness::new();
    harness.transport.set_fail_connect(true);

    let err = harness.client.connect().await.unwrap_err();
    match err {
        OpcUaError::Session(SessionFailure::ConnectFailed(cause)) => {
            assert!(cause.is_retryable());
        }
        other => panic!("unexpected error: {other}"),
    }

    assert_eq!(harness.client.state(), SessionStateKind::Idle);
    assert_eq!(harness.establishment.activation_count(), 0);
    assert_eq!(harness.client.stats().failures(), 1);

    // A fresh attempt gets a fresh notification.
    harness.transport.set_fail_connect(false);
    harness.connect_active().await;
}

#[tokio::test]
async fn test_connect_activation_failure_returns_to_idle() {
    let harness = SessionHarness::new();
    harness.establishment.set_reject_identity(true);

    let err = harness.client.connect().await.unwrap_err();
    assert!(matches!(
        err,
        OpcUaError::Session(SessionFailure::ActivationFailed(_))
    ));
    assert_eq!(harness.client.state(), SessionStateKind::Idle);
    assert!(harness.listener.records().is_empty());
}

#[tokio::test]
async fn test_connect_activation_failure_releases_channel() {
    let harness = SessionHarness::new();
    harness.establishment.set_fail_activation(true);

    assert!(harness.client.connect().await.is_err());

    assert_eq!(harness.client.state(), SessionStateKind::Idle);
    assert!(!harness.transport.is_connected());
    assert_eq!(harness.transport.disconnect_count(), 1);
}

#[tokio::test]
async fn test_connect_passes_config_to_gates() {
    let config = ClientConfig {
        application_name: "packaging-line".to_string(),
        session_name: Some("line-3".to_string()),
        session_timeout: Duration::from_secs(90),
        user_token: UserTokenType::UserName {
            username: "operator".to_string(),
            password: "secret".to_string(),
        },
        security_mode: SecurityMode::Sign,
        security_policy: SecurityPolicy::Basic256Sha256,
        trust_all_certificates: true,
        ..ConfigFixtures::basic()
    };
    let harness = SessionHarness::with_config(config);

    harness.connect_active().await;

    let security = harness.transport.last_security().unwrap();
    assert_eq!(security.mode, SecurityMode::Sign);
    assert_eq!(security.policy, SecurityPolicy::Basic256Sha256);
    assert!(security.trust_all_certificates);

    let params = harness.establishment.parameters_seen();
    assert_eq!(params.len(), 1);
    assert_eq!(params[0].application_name, "packaging-line");
    assert_eq!(params[0].session_name, "line-3");
    assert_eq!(params[0].session_timeout, Duration::from_secs(90));
    assert!(matches!(
        &params[0].user_token,
        UserTokenType::UserName { username, .. } if username == "operator"
    ));
}

#[tokio::test]
async fn test_connect_while_active_is_ignored() {
    let harness = SessionHarness::new();
    harness.connect_active().await;
    let session = harness.client.session().unwrap();

    harness.client.connect().await.unwrap();

    assert_eq!(harness.client.session().unwrap(), session);
    assert_eq!(harness.transport.connect_count(), 1);
    assert_eq!(harness.client.stats().ignored_events(), 1);
}

#[tokio::test]
async fn test_ensure_session_reuses_active_session() {
    let harness = SessionHarness::new();

    let first = harness.client.ensure_session().await.unwrap();
    let second = harness.client.ensure_session().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(harness.transport.connect_count(), 1);
}

#[tokio::test]
async fn test_create_and_activate_from_idle_connects_first() {
    let harness = SessionHarness::new();

    let session = harness.client.activate().await.unwrap();

    assert_eq!(session.channel.channel_id, 1);
    assert_eq!(harness.transport.connect_count(), 1);
    assert_eq!(harness.client.state(), SessionStateKind::Active);
}

// =============================================================================
// Manual activation
// =============================================================================

#[tokio::test]
async fn test_manual_activation_stops_in_connected() {
    let harness = SessionHarness::with_config(ConfigFixtures::manual_activation());

    harness.client.connect().await.unwrap();
    assert_eq!(harness.client.state(), SessionStateKind::Connected);
    assert_eq!(harness.establishment.activation_count(), 0);

    let pending = harness.client.session_future();
    assert!(!pending.is_resolved());

    let session = harness.client.activate().await.unwrap();
    assert_eq!(harness.client.state(), SessionStateKind::Active);
    assert_eq!(pending.await.unwrap(), session);
    assert_eq!(harness.transport.connect_count(), 1);
}

#[tokio::test]
async fn test_manual_connection_lost_fails_pending_attempt() {
    let harness = SessionHarness::with_config(ConfigFixtures::manual_activation());
    harness.client.connect().await.unwrap();
    let pending = harness.client.session_future();

    assert!(harness.client.fault_hook().report_connection_lost("socket reset"));

    match pending.await {
        Err(SessionFailure::ConnectionLost { reason }) => assert_eq!(reason, "socket reset"),
        other => panic!("unexpected outcome: {:?}", other.map(|s| s.session_id.clone())),
    }
    assert_eq!(harness.client.state(), SessionStateKind::Idle);
}

#[tokio::test]
async fn test_manual_connection_lost_releases_channel_before_retry() {
    let harness = SessionHarness::with_config(ConfigFixtures::manual_activation());
    harness.client.connect().await.unwrap();

    harness.client.fault_hook().report_connection_lost("socket reset");
    harness.wait_for_state(SessionStateKind::Idle).await;

    // The next attempt waits for the old channel to be released.
    harness.client.connect().await.unwrap();

    assert_eq!(harness.transport.disconnect_count(), 1);
    assert_eq!(harness.transport.connect_count(), 2);
    assert!(harness.transport.is_connected());
    assert_eq!(harness.client.state(), SessionStateKind::Connected);
}

// =============================================================================
// Disconnect
// =============================================================================

#[tokio::test]
async fn test_disconnect_closes_session_then_channel() {
    let harness = SessionHarness::new();
    harness.connect_active().await;
    let session = harness.client.session().unwrap();

    harness.client.disconnect().await.unwrap();

    assert_eq!(harness.client.state(), SessionStateKind::Inactive);
    assert_eq!(harness.establishment.close_count(), 1);
    assert_eq!(harness.transport.disconnect_count(), 1);
    assert_eq!(harness.client.stats().disconnects(), 1);
    assert_eq!(
        harness.listener.records(),
        vec![
            ActivityRecord::Active(session.session_id.clone()),
            ActivityRecord::Inactive(session.session_id.clone()),
        ]
    );
}

#[tokio::test]
async fn test_disconnect_is_idempotent() {
    let harness = SessionHarness::new();

    harness.client.disconnect().await.unwrap();
    assert_eq!(harness.client.state(), SessionStateKind::Idle);
    assert_eq!(harness.transport.disconnect_count(), 0);

    harness.connect_active().await;
    harness.client.disconnect().await.unwrap();
    harness.client.disconnect().await.unwrap();

    assert_eq!(harness.client.state(), SessionStateKind::Inactive);
    assert_eq!(harness.transport.disconnect_count(), 1);
}

#[tokio::test]
async fn test_disconnect_errors_do_not_block_teardown() {
    let harness = SessionHarness::new();
    harness.connect_active().await;
    harness.establishment.set_fail_close(true);
    harness.transport.set_fail_disconnect(true);

    harness.client.disconnect().await.unwrap();
    assert_eq!(harness.client.state(), SessionStateKind::Inactive);
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_supersedes_connect_attempt() {
    let harness = SessionHarness::new();
    harness.transport.set_connect_latency(Duration::from_secs(5));

    harness.client.handle_event(SessionEvent::ConnectRequested);
    let snapshot = harness.wait_for_state(SessionStateKind::Connecting).await;

    harness.client.disconnect().await.unwrap();

    assert!(matches!(
        snapshot.future.await,
        Err(SessionFailure::Superseded)
    ));
    assert_eq!(harness.client.state(), SessionStateKind::Inactive);
    assert_eq!(harness.transport.disconnect_count(), 1);
    assert_eq!(harness.establishment.activation_count(), 0);
    assert_eq!(harness.establishment.close_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_supersedes_activation_attempt() {
    let harness = SessionHarness::new();
    harness.establishment.set_activation_latency(Duration::from_secs(5));

    harness.client.handle_event(SessionEvent::ConnectRequested);
    let snapshot = harness
        .wait_for_state(SessionStateKind::CreateAndActivate)
        .await;

    harness.client.disconnect().await.unwrap();

    assert!(matches!(
        snapshot.future.await,
        Err(SessionFailure::Superseded)
    ));
    assert_eq!(harness.client.state(), SessionStateKind::Inactive);
    assert!(harness.listener.records().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_connect_during_teardown_starts_new_attempt() {
    let harness = SessionHarness::new();
    harness.connect_active().await;
    harness
        .transport
        .set_disconnect_latency(Duration::from_secs(5));

    harness.client.handle_event(SessionEvent::DisconnectRequested);
    harness.wait_for_state(SessionStateKind::Disconnecting).await;

    harness.client.connect().await.unwrap();

    assert_eq!(harness.client.state(), SessionStateKind::Active);
    assert_eq!(harness.transport.connect_count(), 2);
    assert_eq!(harness.establishment.activation_count(), 2);
}

#[tokio::test]
async fn test_reconnect_after_disconnect() {
    let harness = SessionHarness::new();
    harness.connect_active().await;
    let first = harness.client.session().unwrap();
    harness.client.disconnect().await.unwrap();

    harness.connect_active().await;
    let second = harness.client.session().unwrap();

    assert_ne!(first.session_id, second.session_id);
    assert_eq!(second.channel.channel_id, 2);
}

// =============================================================================
// Shutdown
// =============================================================================

#[tokio::test]
async fn test_shutdown_fails_idle_waiters() {
    let harness = SessionHarness::new();
    let waiting = harness.client.session_future();

    harness.client.shutdown().await;

    assert!(matches!(waiting.await, Err(SessionFailure::Shutdown)));
    assert!(harness.client.snapshot().shut_down);
    assert_eq!(harness.transport.disconnect_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_supersedes_pending_attempt() {
    let harness = SessionHarness::new();
    harness.transport.set_connect_latency(Duration::from_secs(60));

    harness.client.handle_event(SessionEvent::ConnectRequested);
    let snapshot = harness.wait_for_state(SessionStateKind::Connecting).await;

    harness.client.shutdown().await;

    assert!(matches!(
        snapshot.future.await,
        Err(SessionFailure::Superseded)
    ));
    assert_eq!(harness.transport.disconnect_count(), 1);
    assert!(harness.client.snapshot().shut_down);
}

#[tokio::test]
async fn test_shutdown_tears_down_active_session() {
    let harness = SessionHarness::new();
    harness.connect_active().await;

    harness.client.shutdown().await;

    assert_eq!(harness.transport.disconnect_count(), 1);
    assert_eq!(harness.establishment.close_count(), 1);
    assert!(matches!(
        harness.client.get_session().await,
        Err(OpcUaError::Session(SessionFailure::Shutdown))
    ));
    assert!(harness.client.connect().await.is_err());
    assert!(!harness.client.fault_hook().report_connection_lost("late"));
}
