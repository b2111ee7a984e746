// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Keep-alive monitor for the active session.
//!
//! One monitor runs per activation. It probes the session every interval
//! and reports connection loss through the [`FaultHook`] after too many
//! consecutive failures. The sequencer cancels it on leaving `Active`.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::error::{OpcUaError, TimeoutError};

use super::fsm::FaultHook;
use super::gate::SessionEstablishment;
use super::session::{SessionHandle, SessionStats};

/// Keep-alive settings taken from the client configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepAliveSettings {
    /// Probe interval. Zero disables the monitor.
    pub interval: Duration,
    /// Consecutive failures that count as connection loss.
    pub max_failures: u32,
}

impl KeepAliveSettings {
    /// Returns `true` if the monitor should run.
    #[inline]
    pub fn enabled(&self) -> bool {
        !self.interval.is_zero() && self.max_failures > 0
    }
}

/// A running keep-alive loop.
#[derive(Debug)]
pub(crate) struct KeepAliveMonitor {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl KeepAliveMonitor {
    /// Starts monitoring `session`. Returns `None` when disabled.
    pub(crate) fn start(
        session: Arc<SessionHandle>,
        establishment: Arc<dyn SessionEstablishment>,
        settings: KeepAliveSettings,
        stats: Arc<SessionStats>,
        hook: FaultHook,
    ) -> Option<Self> {
        if !settings.enabled() {
            return None;
        }

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(
            session,
            establishment,
            settings,
            stats,
            hook,
            cancel.clone(),
        ));

        Some(Self { cancel, task })
    }

    /// Stops the loop. A probe in flight is abandoned.
    pub(crate) fn stop(self) {
        self.cancel.cancel();
        drop(self.task);
    }
}

async fn run(
    session: Arc<SessionHandle>,
    establishment: Arc<dyn SessionEstablishment>,
    settings: KeepAliveSettings,
    stats: Arc<SessionStats>,
    hook: FaultHook,
    cancel: CancellationToken,
) {
    let mut ticker = time::interval_at(Instant::now() + settings.interval, settings.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut failures = 0u32;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let probe = tokio::select! {
            _ = cancel.cancelled() => break,
            result = time::timeout(settings.interval, establishment.keep_alive(&session)) => {
                result.unwrap_or_else(|_| {
                    Err(OpcUaError::timeout(TimeoutError::KeepAlive(settings.interval)))
                })
            }
        };

        match probe {
            Ok(()) => failures = 0,
            Err(error) => {
                failures += 1;
                stats.record_keepalive_failure();
                tracing::warn!(
                    session_id = %session.session_id,
                    failures = failures,
                    max_failures = settings.max_failures,
                    error = %error,
                    "Keep-alive failed"
                );

                if failures >= settings.max_failures {
                    hook.report_connection_lost(format!(
                        "{} consecutive keep-alive failures: {}",
                        failures, error
                    ));
                    break;
                }
            }
        }
    }

    tracing::trace!(session_id = %session.session_id, "Keep-alive monitor stopped");
}
