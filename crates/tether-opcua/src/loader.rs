// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Client configuration loading.
//!
//! # Loading Pipeline
//!
//! 1. Read the file and pick the format from its extension
//! 2. Resolve `${VAR}` and `${VAR:default}` placeholders in the raw text
//! 3. Parse YAML, TOML or JSON into [`ClientConfig`]
//! 4. Apply environment overrides
//! 5. Validate
//!
//! # Environment Overrides
//!
//! ```text
//! TETHER_ENDPOINT=opc.tcp://plc-7:4840
//! TETHER_SESSION_NAME=line-7
//! TETHER_CONNECT_TIMEOUT=3s
//! TETHER_AUTO_ACTIVATE=false
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::error::{ConfigurationError, OpcUaError, OpcUaResult};
use crate::types::ClientConfig;

// =============================================================================
// ConfigLoader
// =============================================================================

/// Loads [`ClientConfig`] from files or strings.
///
/// # Examples
///
/// ```no_run
/// use tether_opcua::loader::ConfigLoader;
///
/// let config = ConfigLoader::new()
///     .with_env_prefix("PLANT")
///     .load("client.yaml")?;
/// # Ok::<(), tether_opcua::OpcUaError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Base directory for relative certificate paths.
    base_path: Option<PathBuf>,

    /// Environment variable prefix.
    env_prefix: String,

    /// Whether placeholders and overrides are applied.
    resolve_env_vars: bool,
}

impl ConfigLoader {
    /// Creates a loader with the `TETHER` prefix.
    pub fn new() -> Self {
        Self {
            base_path: None,
            env_prefix: "TETHER".to_string(),
            resolve_env_vars: true,
        }
    }

    /// Sets the base path for resolving relative certificate paths.
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Sets the environment variable prefix.
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Enables or disables placeholder resolution and overrides.
    pub fn with_env_vars(mut self, enabled: bool) -> Self {
        self.resolve_env_vars = enabled;
        self
    }

    /// Loads configuration from a file.
    ///
    /// The format follows the extension: `.yaml`/`.yml`, `.toml` or `.json`.
    pub fn load(&self, path: impl AsRef<Path>) -> OpcUaResult<ClientConfig> {
        let path = path.as_ref();
        info!("Loading client configuration from: {}", path.display());

        let format = ConfigFormat::from_path(path)?;
        let content = read_file(path)?;
        let content = if self.resolve_env_vars {
            self.resolve_env_placeholders(&content)
        } else {
            content
        };

        let mut config: ClientConfig = parse_str(&content, format).map_err(|message| {
            OpcUaError::configuration(ConfigurationError::parse(
                path.display().to_string(),
                message,
            ))
        })?;

        let base_path = self.base_path.clone().unwrap_or_else(|| {
            path.parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."))
        });
        resolve_relative_paths(&mut config, &base_path);

        self.finish(config)
    }

    /// Loads configuration from a string.
    pub fn load_from_str(&self, content: &str, format: ConfigFormat) -> OpcUaResult<ClientConfig> {
        let content = if self.resolve_env_vars {
            self.resolve_env_placeholders(content)
        } else {
            content.to_string()
        };

        let config = parse_str(&content, format).map_err(|message| {
            OpcUaError::configuration(ConfigurationError::parse("<string>", message))
        })?;

        self.finish(config)
    }

    fn finish(&self, mut config: ClientConfig) -> OpcUaResult<ClientConfig> {
        if self.resolve_env_vars {
            self.apply_env_overrides(&mut config)?;
        }
        config.validate()?;

        debug!(
            endpoint = %config.endpoint,
            security_mode = %config.security_mode,
            auto_activate = config.auto_activate,
            "Client configuration loaded"
        );
        Ok(config)
    }

    /// Replaces `${VAR}` and `${VAR:default}` with environment values.
    ///
    /// An unset variable without a default is left as written.
    fn resolve_env_placeholders(&self, content: &str) -> String {
        let mut result = String::with_capacity(content.len());
        let mut rest = content;

        while let Some(start) = rest.find("${") {
            result.push_str(&rest[..start]);
            let after = &rest[start + 2..];

            let Some(end) = after.find('}') else {
                result.push_str(&rest[start..]);
                return result;
            };

            let body = &after[..end];
            let (name, default) = match body.split_once(':') {
                Some((name, default)) => (name, Some(default)),
                None => (body, None),
            };

            match (env::var(name), default) {
                (Ok(value), _) => result.push_str(&value),
                (Err(_), Some(default)) => result.push_str(default),
                (Err(_), None) => {
                    warn!("Environment variable '{}' not found", name);
                    result.push_str(&rest[start..start + 3 + end]);
                }
            }

            rest = &after[end + 1..];
        }

        result.push_str(rest);
        result
    }

    fn apply_env_overrides(&self, config: &mut ClientConfig) -> OpcUaResult<()> {
        if let Some(value) = self.env("ENDPOINT") {
            config.endpoint = value;
        }
        if let Some(value) = self.env("SESSION_NAME") {
            config.session_name = Some(value);
        }
        if let Some(value) = self.env("CONNECT_TIMEOUT") {
            config.connect_timeout = self.parse_duration("CONNECT_TIMEOUT", &value)?;
        }
        if let Some(value) = self.env("AUTO_ACTIVATE") {
            config.auto_activate = parse_bool(&value);
        }
        Ok(())
    }

    fn env(&self, key: &str) -> Option<String> {
        env::var(format!("{}_{}", self.env_prefix, key)).ok()
    }

    fn parse_duration(&self, key: &str, value: &str) -> OpcUaResult<Duration> {
        humantime_serde::re::humantime::parse_duration(value).map_err(|e| {
            OpcUaError::configuration(ConfigurationError::invalid_env_var(
                format!("{}_{}", self.env_prefix, key),
                format!("expected a duration such as '5s': {}", e),
            ))
        })
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// ConfigFormat
// =============================================================================

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML format.
    Yaml,
    /// TOML format.
    Toml,
    /// JSON format.
    Json,
}

impl ConfigFormat {
    /// Determines the format from a file path.
    pub fn from_path(path: &Path) -> OpcUaResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        match ext.as_deref() {
            Some("yaml") | Some("yml") => Ok(ConfigFormat::Yaml),
            Some("toml") => Ok(ConfigFormat::Toml),
            Some("json") => Ok(ConfigFormat::Json),
            Some(other) => Err(OpcUaError::configuration(
                ConfigurationError::unsupported_format(other),
            )),
            None => Err(OpcUaError::configuration(
                ConfigurationError::unsupported_format("(no extension)"),
            )),
        }
    }

    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            ConfigFormat::Yaml => "yaml",
            ConfigFormat::Toml => "toml",
            ConfigFormat::Json => "json",
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn read_file(path: &Path) -> OpcUaResult<String> {
    if !path.exists() {
        return Err(OpcUaError::configuration(
            ConfigurationError::file_not_found(path.display().to_string()),
        ));
    }
    fs::read_to_string(path).map_err(|e| {
        OpcUaError::configuration(ConfigurationError::io(path.display().to_string(), e))
    })
}

fn parse_str<T: DeserializeOwned>(content: &str, format: ConfigFormat) -> Result<T, String> {
    match format {
        ConfigFormat::Yaml => parse_yaml(content),
        ConfigFormat::Toml => toml::from_str(content).map_err(|e| e.to_string()),
        ConfigFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
    }
}

fn parse_yaml<T: DeserializeOwned>(content: &str) -> Result<T, String> {
    config::Config::builder()
        .add_source(config::File::from_str(content, config::FileFormat::Yaml))
        .build()
        .and_then(|c| c.try_deserialize())
        .map_err(|e| e.to_string())
}

fn resolve_relative_paths(config: &mut ClientConfig, base_path: &Path) {
    for path in [&mut config.certificate_path, &mut config.private_key_path]
        .into_iter()
        .flatten()
    {
        if Path::new(path.as_str()).is_relative() {
            *path = base_path.join(path.as_str()).display().to_string();
        }
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.to_lowercase().as_str(),
        "true" | "1" | "yes" | "on" | "enabled"
    )
}

// =============================================================================
// Convenience Functions
// =============================================================================

/// Loads configuration from a file with default settings.
pub fn load_config(path: impl AsRef<Path>) -> OpcUaResult<ClientConfig> {
    ConfigLoader::new().load(path)
}

/// Loads configuration from a string with the given format.
pub fn load_config_str(content: &str, format: ConfigFormat) -> OpcUaResult<ClientConfig> {
    ConfigLoader::new().load_from_str(content, format)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::BackoffStrategy;
    use crate::types::SecurityMode;
    use std::io::Write;
    use tempfile::NamedTempFile;

    // Tests that touch the process environment use their own prefix so they
    // cannot race each other.
    fn loader(prefix: &str) -> ConfigLoader {
        ConfigLoader::new().with_env_prefix(prefix)
    }

    const YAML: &str = r#"
endpoint: "opc.tcp://localhost:4840"
session_name: "line-7"
connect_timeout: 3s
keepalive_interval: 0s
auto_activate: false
reactivation:
  max_attempts: 4
  initial_delay: 500ms
  max_delay: 5s
  strategy: linear
"#;

    #[test]
    fn test_load_yaml() {
        let mut file = NamedTempFile::with_suffix(".yaml").unwrap();
        file.write_all(YAML.as_bytes()).unwrap();

        let config = loader("TETHER_TEST_YAML").load(file.path()).unwrap();

        assert_eq!(config.endpoint, "opc.tcp://localhost:4840");
        assert_eq!(config.session_name.as_deref(), Some("line-7"));
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
        assert!(!config.keepalive_enabled());
        assert!(!config.auto_activate);
        assert_eq!(config.reactivation.max_attempts, Some(4));
        assert_eq!(config.reactivation.initial_delay, Duration::from_millis(500));
        assert_eq!(config.reactivation.strategy, BackoffStrategy::Linear);
    }

    #[test]
    fn test_load_toml() {
        let toml = r#"
endpoint = "opc.tcp://plc:4840"
security_mode = "none"
activation_timeout = "2s"

[reactivation]
multiplier = 1.5
"#;
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        file.write_all(toml.as_bytes()).unwrap();

        let config = loader("TETHER_TEST_TOML").load(file.path()).unwrap();
        assert_eq!(config.endpoint, "opc.tcp://plc:4840");
        assert_eq!(config.security_mode, SecurityMode::None);
        assert_eq!(config.activation_timeout, Duration::from_secs(2));
        assert_eq!(config.reactivation.multiplier, 1.5);
        assert_eq!(config.reactivation.max_attempts, Some(10));
    }

    #[test]
    fn test_load_json_string() {
        let json = r#"{ "endpoint": "opc.tcp://localhost:4840", "max_failed_keepalives": 5 }"#;
        let config = loader("TETHER_TEST_JSON")
            .load_from_str(json, ConfigFormat::Json)
            .unwrap();
        assert_eq!(config.max_failed_keepalives, 5);
        assert!(config.auto_activate);
    }

    #[test]
    fn test_load_missing_file() {
        let err = loader("TETHER_TEST_MISSING")
            .load("/definitely/not/here.yaml")
            .unwrap_err();
        assert!(matches!(
            err,
            OpcUaError::Configuration(ConfigurationError::FileNotFound { .. })
        ));
    }

    #[test]
    fn test_load_rejects_invalid_config() {
        let json = r#"{ "endpoint": "http://localhost:4840" }"#;
        assert!(loader("TETHER_TEST_INVALID")
            .load_from_str(json, ConfigFormat::Json)
            .is_err());
    }

    #[test]
    fn test_parse_error_names_source() {
        let err = loader("TETHER_TEST_PARSE")
            .load_from_str("endpoint = ", ConfigFormat::Toml)
            .unwrap_err();
        assert!(matches!(
            err,
            OpcUaError::Configuration(ConfigurationError::Parse { .. })
        ));
    }

    #[test]
    fn test_config_format_from_path() {
        assert_eq!(
            ConfigFormat::from_path(Path::new("client.yml")).unwrap(),
            ConfigFormat::Yaml
        );
        assert_eq!(
            ConfigFormat::from_path(Path::new("client.TOML")).unwrap(),
            ConfigFormat::Toml
        );
        assert!(ConfigFormat::from_path(Path::new("client.ini")).is_err());
        assert!(ConfigFormat::from_path(Path::new("client")).is_err());
    }

    #[test]
    fn test_env_placeholder_with_default() {
        let resolved = ConfigLoader::new()
            .resolve_env_placeholders("endpoint: ${TETHER_TEST_UNSET_VAR:opc.tcp://fallback:4840}");
        assert_eq!(resolved, "endpoint: opc.tcp://fallback:4840");
    }

    #[test]
    fn test_env_placeholder_unset_is_kept() {
        let resolved = ConfigLoader::new().resolve_env_placeholders("a: ${TETHER_TEST_UNSET_VAR} b");
        assert_eq!(resolved, "a: ${TETHER_TEST_UNSET_VAR} b");

        let unterminated = ConfigLoader::new().resolve_env_placeholders("a: ${OPEN");
        assert_eq!(unterminated, "a: ${OPEN");
    }

    #[test]
    fn test_env_overrides() {
        env::set_var("TETHER_TEST_OVR_ENDPOINT", "opc.tcp://override:4840");
        env::set_var("TETHER_TEST_OVR_CONNECT_TIMEOUT", "250ms");
        env::set_var("TETHER_TEST_OVR_AUTO_ACTIVATE", "no");

        let config = loader("TETHER_TEST_OVR")
            .load_from_str(r#"{ "endpoint": "opc.tcp://file:4840" }"#, ConfigFormat::Json)
            .unwrap();

        assert_eq!(config.endpoint, "opc.tcp://override:4840");
        assert_eq!(config.connect_timeout, Duration::from_millis(250));
        assert!(!config.auto_activate);
    }

    #[test]
    fn test_env_override_bad_duration() {
        env::set_var("TETHER_TEST_BAD_CONNECT_TIMEOUT", "soon");

        let err = loader("TETHER_TEST_BAD")
            .load_from_str(r#"{ "endpoint": "opc.tcp://file:4840" }"#, ConfigFormat::Json)
            .unwrap_err();
        assert!(matches!(
            err,
            OpcUaError::Configuration(ConfigurationError::InvalidEnvVar { .. })
        ));
    }

    #[test]
    fn test_relative_certificate_paths() {
        let yaml = r#"
endpoint: "opc.tcp://localhost:4840"
certificate_path: "pki/client.der"
private_key_path: "/abs/key.pem"
"#;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.yaml");
        fs::write(&path, yaml).unwrap();

        let config = loader("TETHER_TEST_PATHS").load(&path).unwrap();
        assert_eq!(
            config.certificate_path.as_deref(),
            Some(dir.path().join("pki/client.der").display().to_string().as_str())
        );
        assert_eq!(config.private_key_path.as_deref(), Some("/abs/key.pem"));
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("true"));
        assert!(parse_bool("ON"));
        assert!(!parse_bool("off"));
        assert!(!parse_bool("0"));
    }
}
