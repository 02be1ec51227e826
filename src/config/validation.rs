//! Configuration validation.
//!
//! # Responsibilities
//! - Check the charset is a known encoding label
//! - Check addresses parse
//! - Check mount upstreams use a routable scheme and names are unique
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RelayConfig → Result<(), Vec<ValidationError>>

use std::collections::HashSet;
use std::net::{IpAddr, SocketAddr};
use thiserror::Error;

use crate::codec::Charset;
use crate::config::schema::RelayConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("unknown charset `{0}`")]
    UnknownCharset(String),

    #[error("user_agent must not be empty")]
    EmptyUserAgent,

    #[error("invalid {field} `{value}`")]
    InvalidAddress { field: &'static str, value: String },

    #[error("mount `{name}` has unsupported upstream `{upstream}`")]
    UnsupportedUpstream { name: String, upstream: String },

    #[error("duplicate mount name `{0}`")]
    DuplicateMount(String),
}

pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if Charset::from_label(&config.charset).is_none() {
        errors.push(ValidationError::UnknownCharset(config.charset.clone()));
    }

    if config.user_agent.trim().is_empty() {
        errors.push(ValidationError::EmptyUserAgent);
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if config.client.loopback_address.parse::<IpAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "client.loopback_address",
            value: config.client.loopback_address.clone(),
        });
    }

    let mut seen = HashSet::new();
    for mount in &config.mounts {
        if !seen.insert(mount.name.as_str()) {
            errors.push(ValidationError::DuplicateMount(mount.name.clone()));
        }
        let scheme = mount.upstream.split_once("://").map(|(s, _)| s);
        if !matches!(scheme, Some("file" | "loop" | "http" | "https")) {
            errors.push(ValidationError::UnsupportedUpstream {
                name: mount.name.clone(),
                upstream: mount.upstream.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MountConfig;

    fn mount(name: &str, upstream: &str) -> MountConfig {
        MountConfig {
            name: name.into(),
            host: None,
            path_prefix: None,
            priority: 0,
            upstream: upstream.into(),
        }
    }

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&RelayConfig::default()).is_ok());
    }

    #[test]
    fn collects_every_error() {
        let mut config = RelayConfig::default();
        config.charset = "nope".into();
        config.user_agent = " ".into();
        config.listener.bind_address = "localhost".into();
        config.client.loopback_address = "home".into();
        config.mounts = vec![mount("a", "ftp://x"), mount("a", "http://ok")];

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 6);
        assert!(errors.contains(&ValidationError::UnknownCharset("nope".into())));
        assert!(errors.contains(&ValidationError::EmptyUserAgent));
        assert!(errors.contains(&ValidationError::DuplicateMount("a".into())));
    }
}
