//! Configuration validation.
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: BridgeConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::{IpAddr, SocketAddr};
use thiserror::Error;

use crate::config::schema::BridgeConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("listener.host {0:?} is not an IP address")]
    InvalidHost(String),

    #[error("timeouts.response_secs must be greater than zero")]
    ZeroResponseTimeout,

    #[error("timeouts.shutdown_timeout_ms must be greater than zero")]
    ZeroShutdownTimeout,

    #[error("{field} {value:?} is not a socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("control.bind_address collides with the listener address {0}")]
    ControlCollision(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &BridgeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let host = config.listener.host.parse::<IpAddr>().ok();
    if host.is_none() {
        errors.push(ValidationError::InvalidHost(config.listener.host.clone()));
    }

    if config.timeouts.response_secs == 0 {
        errors.push(ValidationError::ZeroResponseTimeout);
    }
    if config.timeouts.shutdown_timeout_ms == 0 {
        errors.push(ValidationError::ZeroShutdownTimeout);
    }

    if config.observability.metrics_enabled {
        check_address("observability.metrics_address", &config.observability.metrics_address, &mut errors);
    }

    if config.control.enabled {
        if let Some(control) = check_address("control.bind_address", &config.control.bind_address, &mut errors) {
            if let Some(host) = host {
                let listener = SocketAddr::new(host, config.listener.port);
                if control == listener {
                    errors.push(ValidationError::ControlCollision(listener.to_string()));
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(field: &'static str, value: &str, errors: &mut Vec<ValidationError>) -> Option<SocketAddr> {
    match value.parse::<SocketAddr>() {
        Ok(addr) => Some(addr),
        Err(_) => {
            errors.push(ValidationError::InvalidAddress {
                field,
                value: value.to_string(),
            });
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&BridgeConfig::default()).is_ok());
    }

    #[test]
    fn collects_every_error() {
        let mut config = BridgeConfig::default();
        config.listener.host = "not-an-ip".into();
        config.timeouts.response_secs = 0;
        config.timeouts.shutdown_timeout_ms = 0;
        config.observability.metrics_enabled = true;
        config.observability.metrics_address = "nowhere".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::ZeroResponseTimeout));
        assert!(errors.contains(&ValidationError::InvalidHost("not-an-ip".into())));
    }

    #[test]
    fn control_must_not_share_listener_address() {
        let mut config = BridgeConfig::default();
        config.listener.host = "127.0.0.1".into();
        config.listener.port = 4000;
        config.control.enabled = true;
        config.control.bind_address = "127.0.0.1:4000".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::ControlCollision("127.0.0.1:4000".into())]);
    }

    #[test]
    fn disabled_sections_are_not_checked() {
        let mut config = BridgeConfig::default();
        config.control.bind_address = "garbage".into();
        config.observability.metrics_address = "garbage".into();
        assert!(validate_config(&config).is_ok());
    }
}
