// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error types for the OPC UA client session layer.
//!
//! Errors are grouped by the gate or phase that produced them:
//!
//! ```text
//! OpcUaError
//! ├── Connection    - Secure channel connect failures and connection loss
//! ├── Activation    - Server rejected session creation or activation
//! ├── Disconnect    - Teardown failures (never fatal)
//! ├── Timeout       - Gate operations that exceeded their deadline
//! ├── Configuration - Invalid settings or unreadable config files
//! └── Session       - Terminal outcome of an establishment attempt
//! ```
//!
//! Gate errors never escape the state machine directly. They are turned
//! into `*_FAILED` events and reach callers only through a resolved
//! [`SessionFailure`].
//!
//! # Examples
//!
//! ```
//! use tether_opcua::error::{ConnectionError, OpcUaError};
//!
//! let error = OpcUaError::connection(ConnectionError::refused("opc.tcp://localhost:4840"));
//! assert!(error.is_retryable());
//! assert_eq!(error.category(), "connection");
//! ```

use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::Level;

// =============================================================================
// OpcUaError - Main Error Type
// =============================================================================

/// The main error type for the client session layer.
#[derive(Debug, Error)]
pub enum OpcUaError {
    /// Secure channel errors.
    #[error("{0}")]
    Connection(#[from] ConnectionError),

    /// Session create/activate rejections.
    #[error("{0}")]
    Activation(#[from] ActivationError),

    /// Teardown errors.
    #[error("{0}")]
    Disconnect(#[from] DisconnectError),

    /// Timeout errors.
    #[error("{0}")]
    Timeout(#[from] TimeoutError),

    /// Configuration errors.
    #[error("{0}")]
    Configuration(#[from] ConfigurationError),

    /// Outcome of a failed establishment attempt.
    #[error("{0}")]
    Session(#[from] SessionFailure),
}

impl OpcUaError {
    // =========================================================================
    // Factory Methods
    // =========================================================================

    /// Creates a connection error.
    #[inline]
    pub fn connection(error: ConnectionError) -> Self {
        Self::Connection(error)
    }

    /// Creates an activation error.
    #[inline]
    pub fn activation(error: ActivationError) -> Self {
        Self::Activation(error)
    }

    /// Creates a disconnect error.
    #[inline]
    pub fn disconnect(error: DisconnectError) -> Self {
        Self::Disconnect(error)
    }

    /// Creates a timeout error.
    #[inline]
    pub fn timeout(error: TimeoutError) -> Self {
        Self::Timeout(error)
    }

    /// Creates a configuration error.
    #[inline]
    pub fn configuration(error: ConfigurationError) -> Self {
        Self::Configuration(error)
    }

    /// Creates a session failure error.
    #[inline]
    pub fn session(failure: SessionFailure) -> Self {
        Self::Session(failure)
    }

    // =========================================================================
    // Convenience Factory Methods
    // =========================================================================

    /// Creates a connection refused error.
    pub fn connection_refused(endpoint: impl Into<String>) -> Self {
        Self::Connection(ConnectionError::refused(endpoint))
    }

    /// Creates a not connected error.
    pub fn not_connected() -> Self {
        Self::Connection(ConnectionError::NotConnected)
    }

    /// Creates an activation failed error.
    pub fn activation_failed(message: impl Into<String>) -> Self {
        Self::Activation(ActivationError::activate_failed(message))
    }

    /// Creates an identity rejected error.
    pub fn identity_rejected(message: impl Into<String>) -> Self {
        Self::Activation(ActivationError::identity_rejected(message))
    }

    // =========================================================================
    // Error Properties
    // =========================================================================

    /// Returns `true` if a later attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection(e) => e.is_retryable(),
            Self::Activation(e) => e.is_retryable(),
            Self::Disconnect(_) => false,
            Self::Timeout(_) => true,
            Self::Configuration(_) => false,
            Self::Session(e) => e.is_retryable(),
        }
    }

    /// Returns the severity level of this error.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Connection(e) => e.severity(),
            Self::Activation(e) => e.severity(),
            Self::Disconnect(_) => ErrorSeverity::Warning,
            Self::Timeout(_) => ErrorSeverity::Warning,
            Self::Configuration(_) => ErrorSeverity::Critical,
            Self::Session(e) => e.severity(),
        }
    }

    /// Returns the error category for logging.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Connection(_) => "connection",
            Self::Activation(_) => "activation",
            Self::Disconnect(_) => "disconnect",
            Self::Timeout(_) => "timeout",
            Self::Configuration(_) => "configuration",
            Self::Session(_) => "session",
        }
    }

    /// Returns a unique error code for this error.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Connection(e) => e.error_code(),
            Self::Activation(e) => e.error_code(),
            Self::Disconnect(e) => e.error_code(),
            Self::Timeout(e) => e.error_code(),
            Self::Configuration(e) => e.error_code(),
            Self::Session(e) => e.error_code(),
        }
    }

    /// Returns a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            Self::Connection(e) => e.user_message(),
            Self::Activation(e) => e.user_message(),
            Self::Disconnect(_) => "The connection was not closed cleanly".to_string(),
            Self::Timeout(e) => e.user_message(),
            Self::Configuration(e) => format!("Invalid client configuration: {}", e),
            Self::Session(e) => e.user_message(),
        }
    }

    /// Returns the tracing level for this error.
    pub fn tracing_level(&self) -> Level {
        self.severity().to_tracing_level()
    }

    /// Logs this error with appropriate level and context.
    pub fn log(&self, context: &str) {
        let code = self.error_code();

        match self.tracing_level() {
            Level::ERROR => tracing::error!(
                error_code = %code,
                category = self.category(),
                context = context,
                retryable = self.is_retryable(),
                "{self}"
            ),
            Level::WARN => tracing::warn!(
                error_code = %code,
                category = self.category(),
                context = context,
                retryable = self.is_retryable(),
                "{self}"
            ),
            _ => tracing::debug!(
                error_code = %code,
                category = self.category(),
                context = context,
                retryable = self.is_retryable(),
                "{self}"
            ),
        }
    }
}

// =============================================================================
// ConnectionError
// =============================================================================

/// Secure channel errors raised by the transport gate.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// Connection refused.
    #[error("Connection refused to '{endpoint}'")]
    Refused {
        /// Target endpoint.
        endpoint: String,
        /// Underlying error.
        #[source]
        source: Option<io::Error>,
    },

    /// Endpoint not found.
    #[error("Endpoint not found: '{endpoint}'")]
    EndpointNotFound {
        /// The endpoint URL.
        endpoint: String,
    },

    /// Invalid endpoint URL.
    #[error("Invalid endpoint URL: '{url}' - {reason}")]
    InvalidEndpoint {
        /// The invalid URL.
        url: String,
        /// Reason.
        reason: String,
    },

    /// Secure channel handshake rejected.
    #[error("Secure channel handshake failed: {message}")]
    Handshake {
        /// Error message.
        message: String,
    },

    /// Connection closed unexpectedly.
    #[error("Connection closed unexpectedly")]
    Closed {
        /// Reason for closure.
        reason: Option<String>,
    },

    /// An open channel was lost.
    #[error("Connection lost: {reason}")]
    Lost {
        /// What the transport observed.
        reason: String,
    },

    /// Not connected.
    #[error("Not connected to OPC UA server")]
    NotConnected,

    /// Generic I/O error.
    #[error("I/O error: {message}")]
    Io {
        /// Error message.
        message: String,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
}

impl ConnectionError {
    /// Creates a connection refused error.
    pub fn refused(endpoint: impl Into<String>) -> Self {
        Self::Refused {
            endpoint: endpoint.into(),
            source: None,
        }
    }

    /// Creates a connection refused error with source.
    pub fn refused_with(endpoint: impl Into<String>, source: io::Error) -> Self {
        Self::Refused {
            endpoint: endpoint.into(),
            source: Some(source),
        }
    }

    /// Creates an endpoint not found error.
    pub fn endpoint_not_found(endpoint: impl Into<String>) -> Self {
        Self::EndpointNotFound {
            endpoint: endpoint.into(),
        }
    }

    /// Creates an invalid endpoint error.
    pub fn invalid_endpoint(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidEndpoint {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates a handshake error.
    pub fn handshake(message: impl Into<String>) -> Self {
        Self::Handshake {
            message: message.into(),
        }
    }

    /// Creates a connection closed error.
    pub fn closed(reason: Option<String>) -> Self {
        Self::Closed { reason }
    }

    /// Creates a connection lost error.
    pub fn lost(reason: impl Into<String>) -> Self {
        Self::Lost {
            reason: reason.into(),
        }
    }

    /// Creates an I/O error.
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Returns `true` if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Refused { .. } => true,
            Self::Closed { .. } => true,
            Self::Lost { .. } => true,
            Self::NotConnected => true,
            Self::Io { source, .. } => matches!(
                source.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::ConnectionRefused
                    | io::ErrorKind::TimedOut
                    | io::ErrorKind::Interrupted
            ),
            Self::EndpointNotFound { .. }
            | Self::InvalidEndpoint { .. }
            | Self::Handshake { .. } => false,
        }
    }

    /// Returns the severity level.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::NotConnected | Self::Closed { .. } | Self::Lost { .. } => ErrorSeverity::Warning,
            _ => ErrorSeverity::Error,
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Refused { .. } => ErrorCode::new(1, 1),
            Self::EndpointNotFound { .. } => ErrorCode::new(1, 2),
            Self::InvalidEndpoint { .. } => ErrorCode::new(1, 3),
            Self::Handshake { .. } => ErrorCode::new(1, 4),
            Self::Closed { .. } => ErrorCode::new(1, 5),
            Self::Lost { .. } => ErrorCode::new(1, 6),
            Self::NotConnected => ErrorCode::new(1, 7),
            Self::Io { .. } => ErrorCode::new(1, 8),
        }
    }

    /// Returns a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            Self::Refused { endpoint, .. } => {
                format!("Cannot reach the OPC UA server at {}", endpoint)
            }
            Self::EndpointNotFound { endpoint } => format!("Endpoint not found: {}", endpoint),
            Self::InvalidEndpoint { url, .. } => format!("Invalid endpoint URL: {}", url),
            Self::Handshake { .. } => "The server rejected the secure channel".to_string(),
            Self::Closed { .. } | Self::Lost { .. } => "The connection was lost".to_string(),
            Self::NotConnected => "Not connected to the OPC UA server".to_string(),
            Self::Io { .. } => "A network error occurred".to_string(),
        }
    }
}

impl From<io::Error> for ConnectionError {
    fn from(error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::ConnectionRefused => Self::Refused {
                endpoint: "unknown".to_string(),
                source: Some(error),
            },
            _ => Self::Io {
                message: error.to_string(),
                source: error,
            },
        }
    }
}

// =============================================================================
// ActivationError
// =============================================================================

/// The server refused to create or activate a session.
#[derive(Debug, Error)]
pub enum ActivationError {
    /// CreateSession failed.
    #[error("Failed to create session: {message}")]
    CreateFailed {
        /// Error message.
        message: String,
    },

    /// ActivateSession failed.
    #[error("Failed to activate session: {message}")]
    ActivateFailed {
        /// Error message.
        message: String,
    },

    /// The server answered with a bad service result.
    #[error("Server rejected the session with status 0x{status_code:08X}")]
    Rejected {
        /// OPC UA status code.
        status_code: u32,
    },

    /// The user identity token was not accepted.
    #[error("User identity rejected: {message}")]
    IdentityRejected {
        /// Error message.
        message: String,
    },

    /// Security checks on the session failed.
    #[error("Session security check failed: {message}")]
    SecurityRejected {
        /// Error message.
        message: String,
    },

    /// The session being recovered is no longer known to the server.
    #[error("Session '{session_id}' is no longer valid on the server")]
    SessionInvalid {
        /// Server-assigned session ID.
        session_id: String,
    },

    /// Subscriptions could not be moved to the recovered session.
    #[error("Subscription transfer failed: {message}")]
    TransferFailed {
        /// Error message.
        message: String,
    },
}

impl ActivationError {
    /// `BadTooManySessions`.
    pub const BAD_TOO_MANY_SESSIONS: u32 = 0x8056_0000;
    /// `BadServerHalted`.
    pub const BAD_SERVER_HALTED: u32 = 0x800E_0000;
    /// `BadIdentityTokenRejected`.
    pub const BAD_IDENTITY_TOKEN_REJECTED: u32 = 0x8021_0000;

    /// Creates a create failed error.
    pub fn create_failed(message: impl Into<String>) -> Self {
        Self::CreateFailed {
            message: message.into(),
        }
    }

    /// Creates an activate failed error.
    pub fn activate_failed(message: impl Into<String>) -> Self {
        Self::ActivateFailed {
            message: message.into(),
        }
    }

    /// Creates a status rejection.
    pub fn rejected(status_code: u32) -> Self {
        Self::Rejected { status_code }
    }

    /// Creates an identity rejected error.
    pub fn identity_rejected(message: impl Into<String>) -> Self {
        Self::IdentityRejected {
            message: message.into(),
        }
    }

    /// Creates a security rejected error.
    pub fn security_rejected(message: impl Into<String>) -> Self {
        Self::SecurityRejected {
            message: message.into(),
        }
    }

    /// Creates a session invalid error.
    pub fn session_invalid(session_id: impl Into<String>) -> Self {
        Self::SessionInvalid {
            session_id: session_id.into(),
        }
    }

    /// Creates a transfer failed error.
    pub fn transfer_failed(message: impl Into<String>) -> Self {
        Self::TransferFailed {
            message: message.into(),
        }
    }

    /// Returns `true` if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::CreateFailed { .. }
            | Self::ActivateFailed { .. }
            | Self::SessionInvalid { .. }
            | Self::TransferFailed { .. } => true,
            Self::Rejected { status_code } => matches!(
                *status_code,
                Self::BAD_TOO_MANY_SESSIONS | Self::BAD_SERVER_HALTED
            ),
            Self::IdentityRejected { .. } | Self::SecurityRejected { .. } => false,
        }
    }

    /// Returns the severity level.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::SessionInvalid { .. } | Self::TransferFailed { .. } => ErrorSeverity::Warning,
            Self::IdentityRejected { .. } | Self::SecurityRejected { .. } => {
                ErrorSeverity::Critical
            }
            _ => ErrorSeverity::Error,
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::CreateFailed { .. } => ErrorCode::new(2, 1),
            Self::ActivateFailed { .. } => ErrorCode::new(2, 2),
            Self::Rejected { .. } => ErrorCode::new(2, 3),
            Self::IdentityRejected { .. } => ErrorCode::new(2, 4),
            Self::SecurityRejected { .. } => ErrorCode::new(2, 5),
            Self::SessionInvalid { .. } => ErrorCode::new(2, 6),
            Self::TransferFailed { .. } => ErrorCode::new(2, 7),
        }
    }

    /// Returns a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            Self::IdentityRejected { .. } => "The server did not accept the user credentials".to_string(),
            Self::SecurityRejected { .. } => "The server rejected the session security".to_string(),
            Self::Rejected { status_code } => {
                format!("The server refused the session (0x{:08X})", status_code)
            }
            _ => "The session could not be established".to_string(),
        }
    }
}

// =============================================================================
// DisconnectError
// =============================================================================

/// Teardown errors. Logged, never propagated as a failed teardown.
#[derive(Debug, Error)]
pub enum DisconnectError {
    /// CloseSession failed.
    #[error("Failed to close session: {message}")]
    CloseSessionFailed {
        /// Error message.
        message: String,
    },

    /// Closing the secure channel failed.
    #[error("Failed to close secure channel: {message}")]
    ChannelCloseFailed {
        /// Error message.
        message: String,
    },
}

impl DisconnectError {
    /// Creates a close session failed error.
    pub fn close_session_failed(message: impl Into<String>) -> Self {
        Self::CloseSessionFailed {
            message: message.into(),
        }
    }

    /// Creates a channel close failed error.
    pub fn channel_close_failed(message: impl Into<String>) -> Self {
        Self::ChannelCloseFailed {
            message: message.into(),
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::CloseSessionFailed { .. } => ErrorCode::new(3, 1),
            Self::ChannelCloseFailed { .. } => ErrorCode::new(3, 2),
        }
    }
}

// =============================================================================
// TimeoutError
// =============================================================================

/// A gate operation exceeded its deadline.
#[derive(Debug, Error)]
pub enum TimeoutError {
    /// Secure channel connect timed out.
    #[error("Connect timed out after {0:?}")]
    Connect(Duration),

    /// CreateSession/ActivateSession timed out.
    #[error("Session activation timed out after {0:?}")]
    Activation(Duration),

    /// Teardown timed out.
    #[error("Disconnect timed out after {0:?}")]
    Disconnect(Duration),

    /// A keep-alive probe timed out.
    #[error("Keep-alive timed out after {0:?}")]
    KeepAlive(Duration),
}

impl TimeoutError {
    /// Returns the timeout duration.
    pub fn duration(&self) -> Duration {
        match self {
            Self::Connect(d) | Self::Activation(d) | Self::Disconnect(d) | Self::KeepAlive(d) => {
                *d
            }
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Connect(_) => ErrorCode::new(4, 1),
            Self::Activation(_) => ErrorCode::new(4, 2),
            Self::Disconnect(_) => ErrorCode::new(4, 3),
            Self::KeepAlive(_) => ErrorCode::new(4, 4),
        }
    }

    /// Returns a user-friendly error message.
    pub fn user_message(&self) -> String {
        format!("The server did not answer within {:?}", self.duration())
    }
}

// =============================================================================
// ConfigurationError
// =============================================================================

/// Invalid client configuration.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Required field is missing.
    #[error("Missing required field: '{field}'")]
    MissingField {
        /// Field name.
        field: String,
    },

    /// Invalid endpoint URL.
    #[error("Invalid endpoint '{url}': {reason}")]
    InvalidEndpoint {
        /// The URL.
        url: String,
        /// Reason.
        reason: String,
    },

    /// Inconsistent security settings.
    #[error("Invalid security configuration: {message}")]
    InvalidSecurity {
        /// Error message.
        message: String,
    },

    /// Invalid timeout value.
    #[error("Invalid timeout {duration:?}: {reason}")]
    InvalidTimeout {
        /// The duration.
        duration: Duration,
        /// Reason.
        reason: String,
    },

    /// Invalid reactivation policy.
    #[error("Invalid reactivation policy: {message}")]
    InvalidPolicy {
        /// Error message.
        message: String,
    },

    /// Environment override could not be applied.
    #[error("Invalid environment variable '{name}': {reason}")]
    InvalidEnvVar {
        /// Variable name.
        name: String,
        /// Reason.
        reason: String,
    },

    /// Configuration file does not exist.
    #[error("Configuration file not found: '{path}'")]
    FileNotFound {
        /// File path.
        path: String,
    },

    /// Configuration file could not be read.
    #[error("Failed to read configuration file '{path}'")]
    Io {
        /// File path.
        path: String,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// Configuration content could not be parsed.
    #[error("Failed to parse configuration '{path}': {message}")]
    Parse {
        /// File path or `<string>`.
        path: String,
        /// Parser message.
        message: String,
    },

    /// Unknown file extension.
    #[error("Unsupported configuration format: '{extension}'")]
    UnsupportedFormat {
        /// The extension found.
        extension: String,
    },
}

impl ConfigurationError {
    /// Creates a missing field error.
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Creates an invalid endpoint error.
    pub fn invalid_endpoint(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidEndpoint {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid security error.
    pub fn invalid_security(message: impl Into<String>) -> Self {
        Self::InvalidSecurity {
            message: message.into(),
        }
    }

    /// Creates an invalid timeout error.
    pub fn invalid_timeout(duration: Duration, reason: impl Into<String>) -> Self {
        Self::InvalidTimeout {
            duration,
            reason: reason.into(),
        }
    }

    /// Creates an invalid policy error.
    pub fn invalid_policy(message: impl Into<String>) -> Self {
        Self::InvalidPolicy {
            message: message.into(),
        }
    }

    /// Creates an invalid environment variable error.
    pub fn invalid_env_var(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidEnvVar {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Creates a file not found error.
    pub fn file_not_found(path: impl Into<String>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Creates an I/O error.
    pub fn io(path: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a parse error.
    pub fn parse(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates an unsupported format error.
    pub fn unsupported_format(extension: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            extension: extension.into(),
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::MissingField { .. } => ErrorCode::new(5, 1),
            Self::InvalidEndpoint { .. } => ErrorCode::new(5, 2),
            Self::InvalidSecurity { .. } => ErrorCode::new(5, 3),
            Self::InvalidTimeout { .. } => ErrorCode::new(5, 4),
            Self::InvalidPolicy { .. } => ErrorCode::new(5, 5),
            Self::InvalidEnvVar { .. } => ErrorCode::new(5, 6),
            Self::FileNotFound { .. } => ErrorCode::new(5, 7),
            Self::Io { .. } => ErrorCode::new(5, 8),
            Self::Parse { .. } => ErrorCode::new(5, 9),
            Self::UnsupportedFormat { .. } => ErrorCode::new(5, 10),
        }
    }
}

// =============================================================================
// SessionFailure
// =============================================================================

/// The failure a pending session notification resolves to.
///
/// Cloneable so every caller waiting on the same attempt observes the
/// same value. Gate errors are shared behind an `Arc`.
#[derive(Debug, Clone, Error)]
pub enum SessionFailure {
    /// The secure channel could not be opened.
    #[error("Connect attempt failed: {0}")]
    ConnectFailed(#[source] Arc<OpcUaError>),

    /// The server did not create or activate the session.
    #[error("Session create/activate failed: {0}")]
    ActivationFailed(#[source] Arc<OpcUaError>),

    /// The channel dropped before a session was established.
    #[error("Connection lost before the session became active: {reason}")]
    ConnectionLost {
        /// What the transport observed.
        reason: String,
    },

    /// A disconnect request replaced the in-flight attempt.
    #[error("Establishment attempt superseded by a disconnect request")]
    Superseded,

    /// Reactivation ran out of budget.
    #[error("Session reactivation gave up after {attempts} attempt(s)")]
    ReactivationExhausted {
        /// Attempts made.
        attempts: u32,
        /// Error of the final attempt.
        #[source]
        last_error: Option<Arc<OpcUaError>>,
    },

    /// The state machine stopped while the attempt was pending.
    #[error("Session state machine has shut down")]
    Shutdown,
}

impl SessionFailure {
    /// Wraps a transport error.
    pub fn connect(error: OpcUaError) -> Self {
        Self::ConnectFailed(Arc::new(error))
    }

    /// Wraps an establishment error.
    pub fn activation(error: OpcUaError) -> Self {
        Self::ActivationFailed(Arc::new(error))
    }

    /// Creates a connection lost failure.
    pub fn connection_lost(reason: impl Into<String>) -> Self {
        Self::ConnectionLost {
            reason: reason.into(),
        }
    }

    /// Creates a reactivation exhausted failure.
    pub fn exhausted(attempts: u32, last_error: Option<Arc<OpcUaError>>) -> Self {
        Self::ReactivationExhausted {
            attempts,
            last_error,
        }
    }

    /// Returns the underlying gate error, if any.
    pub fn cause(&self) -> Option<&OpcUaError> {
        match self {
            Self::ConnectFailed(e) | Self::ActivationFailed(e) => Some(e),
            Self::ReactivationExhausted { last_error, .. } => last_error.as_deref(),
            _ => None,
        }
    }

    /// Returns `true` if a new attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ConnectFailed(e) | Self::ActivationFailed(e) => e.is_retryable(),
            Self::ConnectionLost { .. } => true,
            Self::Superseded | Self::ReactivationExhausted { .. } | Self::Shutdown => false,
        }
    }

    /// Returns the severity level.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::ConnectFailed(e) | Self::ActivationFailed(e) => e.severity(),
            Self::ConnectionLost { .. } => ErrorSeverity::Warning,
            Self::Superseded | Self::Shutdown => ErrorSeverity::Info,
            Self::ReactivationExhausted { .. } => ErrorSeverity::Critical,
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::ConnectFailed(_) => ErrorCode::new(6, 1),
            Self::ActivationFailed(_) => ErrorCode::new(6, 2),
            Self::ConnectionLost { .. } => ErrorCode::new(6, 3),
            Self::Superseded => ErrorCode::new(6, 4),
            Self::ReactivationExhausted { .. } => ErrorCode::new(6, 5),
            Self::Shutdown => ErrorCode::new(6, 6),
        }
    }

    /// Returns a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            Self::ConnectFailed(e) | Self::ActivationFailed(e) => e.user_message(),
            Self::ConnectionLost { .. } => "The connection was lost".to_string(),
            Self::Superseded => "The connection attempt was cancelled".to_string(),
            Self::ReactivationExhausted { attempts, .. } => {
                format!("The session could not be recovered after {} attempts", attempts)
            }
            Self::Shutdown => "The client has shut down".to_string(),
        }
    }
}

// =============================================================================
// ErrorSeverity
// =============================================================================

/// Error severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    /// Informational - no action required.
    Info,
    /// Warning - action may be required.
    Warning,
    /// Error - action required, but recoverable.
    Error,
    /// Critical - immediate action required.
    Critical,
}

impl ErrorSeverity {
    /// Converts to tracing level.
    pub fn to_tracing_level(self) -> Level {
        match self {
            Self::Info => Level::INFO,
            Self::Warning => Level::WARN,
            Self::Error | Self::Critical => Level::ERROR,
        }
    }

    /// Returns the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// ErrorCode
// =============================================================================

/// Structured error code for categorization.
///
/// Format: `UA-XXYY` where XX is category and YY is specific error.
///
/// Categories:
/// - 1: Connection
/// - 2: Activation
/// - 3: Disconnect
/// - 4: Timeout
/// - 5: Configuration
/// - 6: Session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode {
    /// Category (1-6).
    pub category: u8,
    /// Specific error within category.
    pub code: u8,
}

impl ErrorCode {
    /// Creates a new error code.
    pub const fn new(category: u8, code: u8) -> Self {
        Self { category, code }
    }

    /// Returns the full error code as a u16.
    pub fn as_u16(&self) -> u16 {
        ((self.category as u16) << 8) | (self.code as u16)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UA-{:02X}{:02X}", self.category, self.code)
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// A Result type with OpcUaError.
pub type OpcUaResult<T> = Result<T, OpcUaError>;

// =============================================================================
// Tests
// =============================================================================
