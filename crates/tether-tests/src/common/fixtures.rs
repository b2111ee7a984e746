// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Fixtures
//!
//! Pre-built client configurations for consistent testing.
//!
//! Every fixture disables keep-alive unless its name says otherwise, so
//! tests with paused time do not see unexpected probes.

use std::time::Duration;

use tether_opcua::client::{BackoffStrategy, ReactivationPolicy};
use tether_opcua::types::ClientConfig;

/// Endpoint used by every fixture.
pub const TEST_ENDPOINT: &str = "opc.tcp://mock-server:4840";

/// Fixture providing client configurations.
pub struct ConfigFixtures;

impl ConfigFixtures {
    /// Auto-activating client, keep-alive off, default reactivation.
    pub fn basic() -> ClientConfig {
        ClientConfig::builder()
            .endpoint(TEST_ENDPOINT)
            .session_name("tether-test")
            .keepalive_interval(Duration::ZERO)
            .build()
            .expect("basic fixture is valid")
    }

    /// Client that stops in `Connected` until activated explicitly.
    pub fn manual_activation() -> ClientConfig {
        ClientConfig {
            auto_activate: false,
            ..Self::basic()
        }
    }

    /// Keep-alive every `interval`, lost after `max_failures` misses.
    pub fn with_keepalive(interval: Duration, max_failures: u32) -> ClientConfig {
        ClientConfig {
            keepalive_interval: interval,
            max_failed_keepalives: max_failures,
            ..Self::basic()
        }
    }

    /// At most `max_attempts` reactivation attempts, one second apart.
    pub fn bounded_reactivation(max_attempts: u32) -> ClientConfig {
        ClientConfig {
            reactivation: Self::fixed_policy(max_attempts),
            ..Self::basic()
        }
    }

    /// Fixed one second backoff.
    pub fn fixed_policy(max_attempts: u32) -> ReactivationPolicy {
        ReactivationPolicy::new(max_attempts)
            .with_strategy(BackoffStrategy::Fixed)
            .with_initial_delay(Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(1))
    }
}
