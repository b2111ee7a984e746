// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Client configuration types.
//!
//! - **SecurityMode/Policy**: Security configuration types
//! - **UserTokenType**: Identity presented when activating a session
//! - **ClientConfig**: Session lifecycle configuration with builder
//! - **ChannelSecurity/SessionParameters**: What the config hands each gate
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//! use tether_opcua::types::{ClientConfig, SecurityMode};
//!
//! let config = ClientConfig::builder()
//!     .endpoint("opc.tcp://localhost:4840")
//!     .security_mode(SecurityMode::None)
//!     .connect_timeout(Duration::from_secs(5))
//!     .build()
//!     .unwrap();
//!
//! assert!(config.auto_activate);
//! ```

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::client::ReactivationPolicy;
use crate::error::{ConfigurationError, OpcUaError, OpcUaResult};

// =============================================================================
// SecurityMode
// =============================================================================

/// OPC UA message security mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SecurityMode {
    /// No security (messages are neither signed nor encrypted).
    #[default]
    None,

    /// Messages are signed but not encrypted.
    Sign,

    /// Messages are signed and encrypted.
    SignAndEncrypt,
}

impl SecurityMode {
    /// Returns the display name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Sign => "Sign",
            Self::SignAndEncrypt => "SignAndEncrypt",
        }
    }
}

impl fmt::Display for SecurityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for SecurityMode {
    type Err = OpcUaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "none" | "nosecurity" => Ok(Self::None),
            "sign" | "signed" => Ok(Self::Sign),
            "signandencrypt" | "signencrypt" | "encrypted" => Ok(Self::SignAndEncrypt),
            _ => Err(OpcUaError::configuration(ConfigurationError::invalid_security(
                format!("unknown security mode '{}'", s),
            ))),
        }
    }
}

// =============================================================================
// SecurityPolicy
// =============================================================================

/// OPC UA security policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SecurityPolicy {
    /// No security policy (use with SecurityMode::None).
    #[default]
    None,

    /// Basic256Sha256.
    Basic256Sha256,

    /// Aes128Sha256RsaOaep.
    Aes128Sha256RsaOaep,

    /// Aes256Sha256RsaPss.
    Aes256Sha256RsaPss,
}

impl SecurityPolicy {
    /// Returns the OPC UA policy URI.
    pub const fn uri(&self) -> &'static str {
        match self {
            Self::None => "http://opcfoundation.org/UA/SecurityPolicy#None",
            Self::Basic256Sha256 => "http://opcfoundation.org/UA/SecurityPolicy#Basic256Sha256",
            Self::Aes128Sha256RsaOaep => {
                "http://opcfoundation.org/UA/SecurityPolicy#Aes128_Sha256_RsaOaep"
            }
            Self::Aes256Sha256RsaPss => {
                "http://opcfoundation.org/UA/SecurityPolicy#Aes256_Sha256_RsaPss"
            }
        }
    }

    /// Returns the short name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Basic256Sha256 => "Basic256Sha256",
            Self::Aes128Sha256RsaOaep => "Aes128Sha256RsaOaep",
            Self::Aes256Sha256RsaPss => "Aes256Sha256RsaPss",
        }
    }

    /// Returns `true` if certificates are required for this policy.
    #[inline]
    pub const fn requires_certificates(&self) -> bool {
        !matches!(self, Self::None)
    }
}

impl fmt::Display for SecurityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for SecurityPolicy {
    type Err = OpcUaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.rsplit('#').next().unwrap_or(s);
        match key.to_lowercase().replace(['-', '_'], "").as_str() {
            "none" => Ok(Self::None),
            "basic256sha256" => Ok(Self::Basic256Sha256),
            "aes128sha256rsaoaep" | "aes128" => Ok(Self::Aes128Sha256RsaOaep),
            "aes256sha256rsapss" | "aes256" => Ok(Self::Aes256Sha256RsaPss),
            _ => Err(OpcUaError::configuration(ConfigurationError::invalid_security(
                format!("unknown security policy '{}'", s),
            ))),
        }
    }
}

// =============================================================================
// UserTokenType
// =============================================================================

/// Identity presented to the server on session activation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserTokenType {
    /// Anonymous authentication.
    #[default]
    Anonymous,

    /// Username and password authentication.
    UserName {
        /// The username.
        username: String,
        /// The password.
        password: String,
    },

    /// X.509 certificate authentication.
    Certificate {
        /// Path to the certificate file.
        certificate_path: String,
        /// Path to the private key file.
        private_key_path: String,
    },
}

impl UserTokenType {
    /// Returns the type name.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Anonymous => "Anonymous",
            Self::UserName { .. } => "UserName",
            Self::Certificate { .. } => "Certificate",
        }
    }
}

impl fmt::Display for UserTokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => write!(f, "Anonymous"),
            Self::UserName { username, .. } => write!(f, "UserName({})", username),
            Self::Certificate {
                certificate_path, ..
            } => write!(f, "Certificate({})", certificate_path),
        }
    }
}

// =============================================================================
// ClientConfig
// =============================================================================

/// Session lifecycle configuration.
///
/// Timeouts bound each gate call made by the session state machine. A
/// timed-out call is reported the same way as any other gate failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Server endpoint URL (e.g., "opc.tcp://localhost:4840").
    pub endpoint: String,

    /// Security mode.
    #[serde(default)]
    pub security_mode: SecurityMode,

    /// Security policy.
    #[serde(default)]
    pub security_policy: SecurityPolicy,

    /// User authentication token.
    #[serde(default)]
    pub user_token: UserTokenType,

    /// Application name.
    #[serde(default = "default_application_name")]
    pub application_name: String,

    /// Session name sent in CreateSession.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_name: Option<String>,

    /// Requested session timeout.
    #[serde(default = "default_session_timeout", with = "humantime_serde")]
    pub session_timeout: Duration,

    /// Secure channel connect timeout.
    #[serde(default = "default_connect_timeout", with = "humantime_serde")]
    pub connect_timeout: Duration,

    /// CreateSession + ActivateSession timeout.
    #[serde(default = "default_activation_timeout", with = "humantime_serde")]
    pub activation_timeout: Duration,

    /// Teardown timeout.
    #[serde(default = "default_disconnect_timeout", with = "humantime_serde")]
    pub disconnect_timeout: Duration,

    /// Keep-alive interval while active. Zero disables keep-alive.
    #[serde(default = "default_keepalive_interval", with = "humantime_serde")]
    pub keepalive_interval: Duration,

    /// Consecutive keep-alive failures that count as connection loss.
    #[serde(default = "default_max_failed_keepalives")]
    pub max_failed_keepalives: u32,

    /// Create and activate the session as soon as the channel is open.
    #[serde(default = "default_true")]
    pub auto_activate: bool,

    /// Recovery behavior after connection loss.
    #[serde(default)]
    pub reactivation: ReactivationPolicy,

    /// Path to client certificate file (for secure connections).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_path: Option<String>,

    /// Path to client private key file (for secure connections).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key_path: Option<String>,

    /// Whether to trust all server certificates (insecure, for testing only).
    #[serde(default)]
    pub trust_all_certificates: bool,
}

fn default_application_name() -> String {
    "Tether OPC UA Client".to_string()
}

fn default_session_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_activation_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_disconnect_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_keepalive_interval() -> Duration {
    Duration::from_secs(10)
}

fn default_max_failed_keepalives() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

impl ClientConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Creates a configuration with defaults for everything but the endpoint.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Validates this configuration.
    pub fn validate(&self) -> OpcUaResult<()> {
        if self.endpoint.is_empty() {
            return Err(OpcUaError::configuration(ConfigurationError::missing_field(
                "endpoint",
            )));
        }

        if !self.endpoint.starts_with("opc.tcp://") {
            return Err(OpcUaError::configuration(ConfigurationError::invalid_endpoint(
                &self.endpoint,
                "Endpoint must start with opc.tcp://",
            )));
        }

        if self.security_mode != SecurityMode::None && self.security_policy == SecurityPolicy::None
        {
            return Err(OpcUaError::configuration(ConfigurationError::invalid_security(
                "Security mode requires a security policy other than None",
            )));
        }

        if self.security_mode == SecurityMode::None && self.security_policy != SecurityPolicy::None
        {
            return Err(OpcUaError::configuration(ConfigurationError::invalid_security(
                "Security policy requires a security mode other than None",
            )));
        }

        if self.security_policy.requires_certificates() && !self.trust_all_certificates {
            if self.certificate_path.is_none() {
                return Err(OpcUaError::configuration(ConfigurationError::missing_field(
                    "certificate_path",
                )));
            }
            if self.private_key_path.is_none() {
                return Err(OpcUaError::configuration(ConfigurationError::missing_field(
                    "private_key_path",
                )));
            }
        }

        for (name, value) in [
            ("session_timeout", self.session_timeout),
            ("connect_timeout", self.connect_timeout),
            ("activation_timeout", self.activation_timeout),
            ("disconnect_timeout", self.disconnect_timeout),
        ] {
            if value.is_zero() {
                return Err(OpcUaError::configuration(ConfigurationError::invalid_timeout(
                    value,
                    format!("{} must be greater than 0", name),
                )));
            }
        }

        if !self.keepalive_interval.is_zero() && self.max_failed_keepalives == 0 {
            return Err(OpcUaError::configuration(ConfigurationError::invalid_timeout(
                self.keepalive_interval,
                "max_failed_keepalives must be at least 1 when keep-alive is enabled",
            )));
        }

        self.reactivation.validate()
    }

    /// Returns `true` if the keep-alive monitor runs while active.
    #[inline]
    pub fn keepalive_enabled(&self) -> bool {
        !self.keepalive_interval.is_zero()
    }

    /// Returns the session name, falling back to the application name.
    pub fn effective_session_name(&self) -> &str {
        self.session_name
            .as_deref()
            .unwrap_or(self.application_name.as_str())
    }

    /// Secure channel parameters for [`TransportGate::connect`].
    ///
    /// [`TransportGate::connect`]: crate::client::TransportGate::connect
    pub fn channel_security(&self) -> ChannelSecurity {
        ChannelSecurity {
            mode: self.security_mode,
            policy: self.security_policy,
            certificate_path: self.certificate_path.clone(),
            private_key_path: self.private_key_path.clone(),
            trust_all_certificates: self.trust_all_certificates,
        }
    }

    /// CreateSession/ActivateSession parameters for
    /// [`SessionEstablishment::create_and_activate`].
    ///
    /// [`SessionEstablishment::create_and_activate`]: crate::client::SessionEstablishment::create_and_activate
    pub fn session_parameters(&self) -> SessionParameters {
        SessionParameters {
            application_name: self.application_name.clone(),
            session_name: self.effective_session_name().to_string(),
            session_timeout: self.session_timeout,
            user_token: self.user_token.clone(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            security_mode: SecurityMode::default(),
            security_policy: SecurityPolicy::default(),
            user_token: UserTokenType::default(),
            application_name: default_application_name(),
            session_name: None,
            session_timeout: default_session_timeout(),
            connect_timeout: default_connect_timeout(),
            activation_timeout: default_activation_timeout(),
            disconnect_timeout: default_disconnect_timeout(),
            keepalive_interval: default_keepalive_interval(),
            max_failed_keepalives: default_max_failed_keepalives(),
            auto_activate: true,
            reactivation: ReactivationPolicy::default(),
            certificate_path: None,
            private_key_path: None,
            trust_all_certificates: false,
        }
    }
}

// =============================================================================
// ClientConfigBuilder
// =============================================================================

/// Builder for `ClientConfig`.
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    endpoint: Option<String>,
    security_mode: Option<SecurityMode>,
    security_policy: Option<SecurityPolicy>,
    user_token: Option<UserTokenType>,
    application_name: Option<String>,
    session_name: Option<String>,
    session_timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    activation_timeout: Option<Duration>,
    disconnect_timeout: Option<Duration>,
    keepalive_interval: Option<Duration>,
    max_failed_keepalives: Option<u32>,
    auto_activate: Option<bool>,
    reactivation: Option<ReactivationPolicy>,
    certificate_path: Option<String>,
    private_key_path: Option<String>,
    trust_all_certificates: Option<bool>,
}

impl ClientConfigBuilder {
    /// Sets the server endpoint URL.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Sets the security mode.
    pub fn security_mode(mut self, mode: SecurityMode) -> Self {
        self.security_mode = Some(mode);
        self
    }

    /// Sets the security policy.
    pub fn security_policy(mut self, policy: SecurityPolicy) -> Self {
        self.security_policy = Some(policy);
        self
    }

    /// Sets username/password authentication.
    pub fn username(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.user_token = Some(UserTokenType::UserName {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    /// Sets the user token.
    pub fn user_token(mut self, token: UserTokenType) -> Self {
        self.user_token = Some(token);
        self
    }

    /// Sets the application name.
    pub fn application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = Some(name.into());
        self
    }

    /// Sets the session name.
    pub fn session_name(mut self, name: impl Into<String>) -> Self {
        self.session_name = Some(name.into());
        self
    }

    /// Sets the session timeout.
    pub fn session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout = Some(timeout);
        self
    }

    /// Sets the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Sets the activation timeout.
    pub fn activation_timeout(mut self, timeout: Duration) -> Self {
        self.activation_timeout = Some(timeout);
        self
    }

    /// Sets the disconnect timeout.
    pub fn disconnect_timeout(mut self, timeout: Duration) -> Self {
        self.disconnect_timeout = Some(timeout);
        self
    }

    /// Sets the keep-alive interval. Zero disables keep-alive.
    pub fn keepalive_interval(mut self, interval: Duration) -> Self {
        self.keepalive_interval = Some(interval);
        self
    }

    /// Sets the consecutive keep-alive failure threshold.
    pub fn max_failed_keepalives(mut self, count: u32) -> Self {
        self.max_failed_keepalives = Some(count);
        self
    }

    /// Sets whether the session is activated automatically after connect.
    pub fn auto_activate(mut self, auto: bool) -> Self {
        self.auto_activate = Some(auto);
        self
    }

    /// Sets the reactivation policy.
    pub fn reactivation(mut self, policy: ReactivationPolicy) -> Self {
        self.reactivation = Some(policy);
        self
    }

    /// Sets the client certificate path.
    pub fn certificate_path(mut self, path: impl Into<String>) -> Self {
        self.certificate_path = Some(path.into());
        self
    }

    /// Sets the client private key path.
    pub fn private_key_path(mut self, path: impl Into<String>) -> Self {
        self.private_key_path = Some(path.into());
        self
    }

    /// Sets whether to trust all server certificates (insecure).
    pub fn trust_all_certificates(mut self, trust: bool) -> Self {
        self.trust_all_certificates = Some(trust);
        self
    }

    /// Builds and validates the configuration.
    pub fn build(self) -> OpcUaResult<ClientConfig> {
        let endpoint = self.endpoint.ok_or_else(|| {
            OpcUaError::configuration(ConfigurationError::missing_field("endpoint"))
        })?;

        let config = ClientConfig {
            endpoint,
            security_mode: self.security_mode.unwrap_or_default(),
            security_policy: self.security_policy.unwrap_or_default(),
            user_token: self.user_token.unwrap_or_default(),
            application_name: self.application_name.unwrap_or_else(default_application_name),
            session_name: self.session_name,
            session_timeout: self.session_timeout.unwrap_or_else(default_session_timeout),
            connect_timeout: self.connect_timeout.unwrap_or_else(default_connect_timeout),
            activation_timeout: self
                .activation_timeout
                .unwrap_or_else(default_activation_timeout),
            disconnect_timeout: self
                .disconnect_timeout
                .unwrap_or_else(default_disconnect_timeout),
            keepalive_interval: self
                .keepalive_interval
                .unwrap_or_else(default_keepalive_interval),
            max_failed_keepalives: self
                .max_failed_keepalives
                .unwrap_or_else(default_max_failed_keepalives),
            auto_activate: self.auto_activate.unwrap_or(true),
            reactivation: self.reactivation.unwrap_or_default(),
            certificate_path: self.certificate_path,
            private_key_path: self.private_key_path,
            trust_all_certificates: self.trust_all_certificates.unwrap_or(false),
        };

        config.validate()?;
        Ok(config)
    }
}

// =============================================================================
// Gate parameters
// =============================================================================

/// What the transport needs to open a secure channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSecurity {
    /// Message security mode.
    pub mode: SecurityMode,
    /// Security policy.
    pub policy: SecurityPolicy,
    /// Client certificate, already resolved against the config file.
    pub certificate_path: Option<String>,
    /// Client private key.
    pub private_key_path: Option<String>,
    /// Accept any server certificate.
    pub trust_all_certificates: bool,
}

/// What CreateSession and ActivateSession send to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionParameters {
    /// Client application name.
    pub application_name: String,
    /// Session name, falling back to the application name.
    pub session_name: String,
    /// Requested session timeout.
    pub session_timeout: Duration,
    /// Identity to activate with.
    pub user_token: UserTokenType,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_security_mode_parse() {
        assert_eq!("none".parse::<SecurityMode>().unwrap(), SecurityMode::None);
        assert_eq!(
            "Sign-And-Encrypt".parse::<SecurityMode>().unwrap(),
            SecurityMode::SignAndEncrypt
        );
        assert!("bogus".parse::<SecurityMode>().is_err());
    }

    #[test]
    fn test_security_policy_parse() {
        assert_eq!(
            "http://opcfoundation.org/UA/SecurityPolicy#Basic256Sha256"
                .parse::<SecurityPolicy>()
                .unwrap(),
            SecurityPolicy::Basic256Sha256
        );
        assert_eq!(
            "aes256".parse::<SecurityPolicy>().unwrap(),
            SecurityPolicy::Aes256Sha256RsaPss
        );
        assert!("rot13".parse::<SecurityPolicy>().is_err());
    }

    #[test]
    fn test_builder_defaults() {
        let config = ClientConfig::builder()
            .endpoint("opc.tcp://localhost:4840")
            .build()
            .unwrap();

        assert!(config.auto_activate);
        assert!(config.keepalive_enabled());
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.effective_session_name(), "Tether OPC UA Client");
    }

    #[test]
    fn test_gate_parameters_follow_config() {
        let config = ClientConfig::builder()
            .endpoint("opc.tcp://localhost:4840")
            .security_mode(SecurityMode::SignAndEncrypt)
            .security_policy(SecurityPolicy::Aes256Sha256RsaPss)
            .certificate_path("/pki/client.der")
            .private_key_path("/pki/client.pem")
            .username("operator", "secret")
            .application_name("line-3")
            .session_timeout(Duration::from_secs(90))
            .build()
            .unwrap();

        let security = config.channel_security();
        assert_eq!(security.mode, SecurityMode::SignAndEncrypt);
        assert_eq!(security.policy, SecurityPolicy::Aes256Sha256RsaPss);
        assert_eq!(security.certificate_path.as_deref(), Some("/pki/client.der"));
        assert!(!security.trust_all_certificates);

        let params = config.session_parameters();
        assert_eq!(params.session_name, "line-3");
        assert_eq!(params.session_timeout, Duration::from_secs(90));
        assert_eq!(params.user_token.type_name(), "UserName");
    }

    #[test]
    fn test_builder_requires_endpoint() {
        assert!(ClientConfig::builder().build().is_err());
    }

    #[test]
    fn test_validate_endpoint_scheme() {
        let config = ClientConfig::new("http://localhost:4840");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_security_consistency() {
        let result = ClientConfig::builder()
            .endpoint("opc.tcp://localhost:4840")
            .security_mode(SecurityMode::Sign)
            .build();
        assert!(result.is_err());

        let result = ClientConfig::builder()
            .endpoint("opc.tcp://localhost:4840")
            .security_mode(SecurityMode::Sign)
            .security_policy(SecurityPolicy::Basic256Sha256)
            .build();
        assert!(matches!(
            result,
            Err(OpcUaError::Configuration(ConfigurationError::MissingField { .. }))
        ));

        let result = ClientConfig::builder()
            .endpoint("opc.tcp://localhost:4840")
            .security_mode(SecurityMode::Sign)
            .security_policy(SecurityPolicy::Basic256Sha256)
            .trust_all_certificates(true)
            .build();
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_timeouts() {
        let result = ClientConfig::builder()
            .endpoint("opc.tcp://localhost:4840")
            .activation_timeout(Duration::ZERO)
            .build();
        assert!(result.is_err());

        let disabled = ClientConfig::builder()
            .endpoint("opc.tcp://localhost:4840")
            .keepalive_interval(Duration::ZERO)
            .max_failed_keepalives(0)
            .build()
            .unwrap();
        assert!(!disabled.keepalive_enabled());
    }

    #[test]
    fn test_validate_reactivation_policy() {
        let result = ClientConfig::builder()
            .endpoint("opc.tcp://localhost:4840")
            .reactivation(ReactivationPolicy::new(0))
            .build();
        assert!(matches!(
            result,
            Err(OpcUaError::Configuration(ConfigurationError::InvalidPolicy { .. }))
        ));
    }

    #[test]
    fn test_serde_humantime() {
        let config: ClientConfig = serde_json::from_str(
            r#"{
                "endpoint": "opc.tcp://plc:4840",
                "connect_timeout": "2s 500ms",
                "auto_activate": false,
                "reactivation": { "max_attempts": 4, "initial_delay": "100ms" }
            }"#,
        )
        .unwrap();

        assert_eq!(config.connect_timeout, Duration::from_millis(2500));
        assert!(!config.auto_activate);
        assert_eq!(config.reactivation.max_attempts, Some(4));
        assert_eq!(config.reactivation.initial_delay, Duration::from_millis(100));
        assert!(config.validate().is_ok());
    }
}
