//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Charset for text bodies and `content-type` parameters.
    pub charset: String,

    /// `user-agent` sent on `loop:`, `http:` and `https:` requests.
    pub user_agent: String,

    /// Protocol-routing client settings.
    pub client: ClientConfig,

    /// Inbound listener.
    pub listener: ListenerConfig,

    /// Inbound request limits.
    pub limits: LimitsConfig,

    /// Pipeline executor settings.
    pub pipeline: PipelineSettings,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Mounted upstreams, served by the `relay serve` command.
    pub mounts: Vec<MountConfig>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            charset: "utf-8".to_string(),
            user_agent: format!("relay/{}", env!("CARGO_PKG_VERSION")),
            client: ClientConfig::default(),
            listener: ListenerConfig::default(),
            limits: LimitsConfig::default(),
            pipeline: PipelineSettings::default(),
            observability: ObservabilityConfig::default(),
            mounts: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Advertised `accept-encoding` for remote requests.
    pub accept_encoding: String,

    /// Remote address reported on synthetic `loop:` requests.
    pub loopback_address: String,

    /// Bound on one `http:`/`https:` request. Unset means no bound.
    pub request_timeout_secs: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            accept_encoding: "gzip, deflate".to_string(),
            loopback_address: "127.0.0.1".to_string(),
            request_timeout_secs: None,
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum inbound body size in bytes.
    pub max_body_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Body written when a step fails.
    pub error_message: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            error_message: "Error occurred in pipe function. See log for details.".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// A mounted upstream.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MountConfig {
    /// Mount identifier for logging.
    pub name: String,

    /// Host header to match (case-insensitive).
    pub host: Option<String>,

    /// Path prefix to match.
    pub path_prefix: Option<String>,

    /// Higher priority is checked first.
    #[serde(default)]
    pub priority: u32,

    /// Base href the request path is appended to (`file:`, `loop:`, `http(s):`).
    pub upstream: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_toml_uses_defaults() {
        let config: RelayConfig = toml::from_str("charset = \"gbk\"").unwrap();
        assert_eq!(config.charset, "gbk");
        assert_eq!(config.client.accept_encoding, "gzip, deflate");
        assert!(config.client.request_timeout_secs.is_none());
        assert!(config.mounts.is_empty());
        assert!(config.user_agent.starts_with("relay/"));
    }

    #[test]
    fn parses_mounts() {
        let config: RelayConfig = toml::from_str(
            r#"
            [[mounts]]
            name = "static"
            path_prefix = "/assets"
            upstream = "file:///srv/www"

            [[mounts]]
            name = "api"
            host = "api.local"
            priority = 5
            upstream = "http://127.0.0.1:3000"
            "#,
        )
        .unwrap();
        assert_eq!(config.mounts.len(), 2);
        assert_eq!(config.mounts[0].priority, 0);
        assert_eq!(config.mounts[1].host.as_deref(), Some("api.local"));
    }
}
