// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Tether Integration Tests
//!
//! Test utilities and integration suites for `tether-opcua`.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p tether-tests
//! cargo test -p tether-tests --test integration_session
//! cargo test -p tether-tests --test integration_reactivation
//! cargo test -p tether-tests --test integration_config
//!
//! # With logs
//! RUST_LOG=tether_opcua=trace cargo test -p tether-tests -- --nocapture
//! ```
//!
//! ## Using the Harness
//!
//! ```rust,ignore
//! use tether_tests::prelude::*;
//!
//! #[tokio::test(start_paused = true)]
//! async fn test_something() {
//!     let harness = SessionHarness::with_config(ConfigFixtures::bounded_reactivation(3));
//!     harness.connect_active().await;
//!     harness.client.fault_hook().report_connection_lost("cable pulled");
//!     harness.wait_for_state(SessionStateKind::Active).await;
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod common;

/// Re-export commonly used items for convenience.
pub mod prelude {
    pub use crate::common::fixtures::*;
    pub use crate::common::harness::*;
    pub use crate::common::mocks::*;
    pub use tether_opcua::client::SessionStateKind;
}
