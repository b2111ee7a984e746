// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Config Integration Tests
//!
//! - `test_load_*`: file loading in every format
//! - `test_validate_*`: validation rules
//! - `test_client_*`: loaded configuration driving a client

use std::io::Write;
use std::time::Duration;

use tempfile::NamedTempFile;

use tether_opcua::client::{BackoffStrategy, ReactivationPolicy, SessionStateKind};
use tether_opcua::error::{ConfigurationError, OpcUaError};
use tether_opcua::loader::{ConfigFormat, ConfigLoader};
use tether_opcua::types::{ClientConfig, SecurityMode, SecurityPolicy};

use tether_tests::common::harness::SessionHarness;

fn write_temp(suffix: &str, content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::with_suffix(suffix).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

fn loader() -> ConfigLoader {
    // Unique prefix so no stray variable in the environment applies.
    ConfigLoader::new().with_env_prefix("TETHER_ITEST")
}

// =============================================================================
// Loading
// =============================================================================

#[test]
fn test_load_yaml_full() {
    let file = write_temp(
        ".yaml",
        r#"
endpoint: "opc.tcp://plc-7:4840"
security_mode: sign_and_encrypt
security_policy: basic256_sha256
trust_all_certificates: true
session_timeout: 2m
keepalive_interval: 15s
max_failed_keepalives: 4
reactivation:
  max_attempts: 6
  max_elapsed: 5m
  initial_delay: 2s
  max_delay: 1m
  multiplier: 3.0
  strategy: exponential
  give_up_on_fatal: false
"#,
    );

    let config = loader().load(file.path()).unwrap();

    assert_eq!(config.security_mode, SecurityMode::SignAndEncrypt);
    assert_eq!(config.security_policy, SecurityPolicy::Basic256Sha256);
    assert_eq!(config.session_timeout, Duration::from_secs(120));
    assert_eq!(config.keepalive_interval, Duration::from_secs(15));
    assert_eq!(config.max_failed_keepalives, 4);

    let policy = &config.reactivation;
    assert_eq!(policy.max_attempts, Some(6));
    assert_eq!(policy.max_elapsed, Some(Duration::from_secs(300)));
    assert_eq!(policy.max_delay, Duration::from_secs(60));
    assert_eq!(policy.strategy, BackoffStrategy::Exponential);
    assert!(!policy.give_up_on_fatal);
}

#[test]
fn test_load_json_round_trip_of_defaults() {
    let config = ClientConfig::new("opc.tcp://localhost:4840");
    let json = serde_json::to_string(&config).unwrap();

    let loaded = loader().load_from_str(&json, ConfigFormat::Json).unwrap();

    assert_eq!(loaded.endpoint, config.endpoint);
    assert_eq!(loaded.connect_timeout, config.connect_timeout);
    assert_eq!(loaded.reactivation, ReactivationPolicy::default());
}

#[test]
fn test_load_placeholder_default() {
    let file = write_temp(
        ".toml",
        r#"endpoint = "${TETHER_ITEST_UNSET_ENDPOINT:opc.tcp://fallback:4840}""#,
    );

    let config = loader().load(file.path()).unwrap();
    assert_eq!(config.endpoint, "opc.tcp://fallback:4840");
}

#[test]
fn test_load_unsupported_extension() {
    let file = write_temp(".ini", "endpoint=opc.tcp://localhost:4840");
    let err = loader().load(file.path()).unwrap_err();
    assert!(matches!(
        err,
        OpcUaError::Configuration(ConfigurationError::UnsupportedFormat { .. })
    ));
}

// =============================================================================
// Validation
// =============================================================================

#[test]
fn test_validate_rejects_zero_attempt_budget() {
    let json = r#"{ "endpoint": "opc.tcp://localhost:4840", "reactivation": { "max_attempts": 0 } }"#;
    let err = loader().load_from_str(json, ConfigFormat::Json).unwrap_err();
    assert!(matches!(
        err,
        OpcUaError::Configuration(ConfigurationError::InvalidPolicy { .. })
    ));
}

#[test]
fn test_validate_rejects_security_without_certificates() {
    let yaml = r#"
endpoint: "opc.tcp://localhost:4840"
security_mode: sign
security_policy: basic256_sha256
"#;
    let err = loader().load_from_str(yaml, ConfigFormat::Yaml).unwrap_err();
    assert!(matches!(
        err,
        OpcUaError::Configuration(ConfigurationError::MissingField { .. })
    ));
}

#[test]
fn test_validate_rejects_zero_timeout() {
    let err = ClientConfig::builder()
        .endpoint("opc.tcp://localhost:4840")
        .connect_timeout(Duration::ZERO)
        .build()
        .unwrap_err();
    assert!(matches!(
        err,
        OpcUaError::Configuration(ConfigurationError::InvalidTimeout { .. })
    ));
}

// =============================================================================
// Client
// =============================================================================

#[tokio::test]
async fn test_client_from_loaded_manual_config() {
    let file = write_temp(
        ".yml",
        r#"
endpoint: "opc.tcp://mock-server:4840"
auto_activate: false
keepalive_interval: 0s
"#,
    );
    let config = loader().load(file.path()).unwrap();

    let harness = SessionHarness::with_config(config);
    harness.client.connect().await.unwrap();
    assert_eq!(harness.client.state(), SessionStateKind::Connected);

    harness.client.activate().await.unwrap();
    assert!(harness.client.is_active());
}
