// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA client session lifecycle for Tether.
//!
//! This crate manages the life of one OPC UA client session: opening the
//! secure channel, creating and activating the session, noticing when the
//! connection drops, reactivating with bounded backoff, and tearing down
//! cleanly. It does not speak the wire protocol; a transport and a session
//! establishment implementation are plugged in through the gate traits in
//! [`client`].
//!
//! # Features
//!
//! - Event-driven state machine with a single sequencer task
//! - Resolve-once session notifications shared by any number of waiters
//! - Stale completion filtering through per-attempt tokens
//! - Keep-alive monitoring and automatic reactivation
//! - Manual activation mode
//! - Configuration from YAML, TOML or JSON with environment overrides
//!
//! # Error Handling
//!
//! ```text
//! OpcUaError
//! ├── Connection    - Secure channel failures
//! ├── Activation    - CreateSession / ActivateSession failures
//! ├── Disconnect    - Teardown failures
//! ├── Timeout       - Gate calls that exceeded their limit
//! ├── Configuration - Invalid settings
//! └── Session       - How an establishment attempt ended
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tether_opcua::{ClientConfig, UaClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::builder()
//!         .endpoint("opc.tcp://localhost:4840")
//!         .build()?;
//!
//!     let client = UaClient::new(config, Arc::new(MyTransport), Arc::new(MyEstablishment))?;
//!     client.connect().await?;
//!
//!     let session = client.get_session().await?;
//!     println!("Session: {}", session);
//!
//!     client.shutdown().await;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod client;
pub mod error;
pub mod loader;
pub mod types;

pub use error::{
    ActivationError, ConfigurationError, ConnectionError, DisconnectError, ErrorCode,
    ErrorSeverity, OpcUaError, OpcUaResult, SessionFailure, TimeoutError,
};

pub use types::{
    ChannelSecurity, ClientConfig, ClientConfigBuilder, SecurityMode, SecurityPolicy,
    SessionParameters, UserTokenType,
};

pub use client::{
    AttemptId, BackoffStrategy, ChannelHandle, FaultHook, ReactivationPolicy,
    SessionActivityListener, SessionEstablishment, SessionEvent, SessionFsm, SessionFuture,
    SessionHandle, SessionOutcome, SessionSnapshot, SessionStateKind, SessionStats,
    TransportGate, UaClient,
};

pub use loader::{load_config, load_config_str, ConfigFormat, ConfigLoader};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Convenience re-exports for common use cases.
pub mod prelude {
    pub use crate::client::{
        SessionEstablishment, SessionFuture, SessionHandle, SessionStateKind, TransportGate,
        UaClient,
    };
    pub use crate::error::{OpcUaError, OpcUaResult, SessionFailure};
    pub use crate::loader::load_config;
    pub use crate::types::ClientConfig;
}
