//! Configuration validation.
//!
//! Serde handles syntax; this module checks values that would make the
//! pipeline unsafe or meaningless. All errors are collected so an operator
//! can fix a config file in one pass.

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::GatewayConfig;

const PLACEHOLDER_SECRET: &str = "CHANGE_ME_IN_PRODUCTION";
const MIN_SECRET_LEN: usize = 32;
const MAX_TOKEN_TTL_HOURS: i64 = 8_760;
const MAX_RESET_TOKEN_TTL_MINUTES: i64 = 1_440;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a loaded configuration, returning every error found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if config.listener.request_timeout_secs == 0 {
        errors.push(ValidationError::new("listener.request_timeout_secs", "must be > 0"));
    }

    if config.rate_limit.enabled {
        if config.rate_limit.max_requests == 0 {
            errors.push(ValidationError::new("rate_limit.max_requests", "must be > 0"));
        }
        if config.rate_limit.window_secs == 0 {
            errors.push(ValidationError::new("rate_limit.window_secs", "must be > 0"));
        }
        if config.rate_limit.sweep_interval_secs == 0 {
            errors.push(ValidationError::new("rate_limit.sweep_interval_secs", "must be > 0"));
        }
    }

    if config.cors.allowed_origins.is_empty() && !config.cors.allow_missing_origin {
        errors.push(ValidationError::new(
            "cors.allowed_origins",
            "empty allow-list rejects every request",
        ));
    }
    for origin in &config.cors.allowed_origins {
        if origin.ends_with('/') || !(origin.starts_with("http://") || origin.starts_with("https://")) {
            errors.push(ValidationError::new(
                "cors.allowed_origins",
                format!("'{}' is not a scheme://host[:port] origin", origin),
            ));
        }
    }

    if config.hpp.check_body && config.hpp.body_content_type.trim().is_empty() {
        errors.push(ValidationError::new("hpp.body_content_type", "must be set when check_body is enabled"));
    }

    let secret = &config.auth.jwt_secret;
    if secret == PLACEHOLDER_SECRET {
        errors.push(ValidationError::new("auth.jwt_secret", "placeholder secret must be replaced"));
    } else if secret.len() < MIN_SECRET_LEN {
        errors.push(ValidationError::new(
            "auth.jwt_secret",
            format!("must be at least {} bytes", MIN_SECRET_LEN),
        ));
    }
    if !(1..=MAX_TOKEN_TTL_HOURS).contains(&config.auth.token_ttl_hours) {
        errors.push(ValidationError::new(
            "auth.token_ttl_hours",
            format!("must be between 1 and {}", MAX_TOKEN_TTL_HOURS),
        ));
    }
    if !(1..=MAX_RESET_TOKEN_TTL_MINUTES).contains(&config.auth.reset_token_ttl_minutes) {
        errors.push(ValidationError::new(
            "auth.reset_token_ttl_minutes",
            format!("must be between 1 and {}", MAX_RESET_TOKEN_TTL_MINUTES),
        ));
    }
    if config.auth.cookie_name.is_empty()
        || config.auth.cookie_name.contains(|c: char| c == '=' || c == ';' || c.is_whitespace())
    {
        errors.push(ValidationError::new("auth.cookie_name", "must be a non-empty cookie token"));
    }
    for path in &config.auth.excluded_paths {
        if !path.starts_with('/') {
            errors.push(ValidationError::new(
                "auth.excluded_paths",
                format!("'{}' must start with '/'", path),
            ));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
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

    fn valid_config() -> GatewayConfig {
        let mut config = GatewayConfig::default();
        config.auth.jwt_secret = "a-very-long-secret-for-signing-tokens-0123".to_string();
        config
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_placeholder_secret_rejected() {
        let errors = validate_config(&GatewayConfig::default()).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "auth.jwt_secret"));
    }

    #[test]
    fn test_reports_every_error() {
        let mut config = valid_config();
        config.rate_limit.max_requests = 0;
        config.rate_limit.window_secs = 0;
        config.auth.excluded_paths.push("execs/login".to_string());
        config.cors.allowed_origins.push("https://trailing.example/".to_string());

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert!(fields.contains(&"rate_limit.max_requests"));
        assert!(fields.contains(&"rate_limit.window_secs"));
        assert!(fields.contains(&"auth.excluded_paths"));
        assert!(fields.contains(&"cors.allowed_origins"));
    }

    #[test]
    fn test_token_lifetimes_bounded() {
        let mut config = valid_config();
        config.auth.token_ttl_hours = i64::MAX;
        config.auth.reset_token_ttl_minutes = i64::MAX;
        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["auth.token_ttl_hours", "auth.reset_token_ttl_minutes"]);

        config.auth.token_ttl_hours = MAX_TOKEN_TTL_HOURS;
        config.auth.reset_token_ttl_minutes = MAX_RESET_TOKEN_TTL_MINUTES;
        assert!(validate_config(&config).is_ok());

        config.auth.token_ttl_hours = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_disabled_rate_limit_skips_checks() {
        let mut config = valid_config();
        config.rate_limit.enabled = false;
        config.rate_limit.max_requests = 0;
        assert!(validate_config(&config).is_ok());
    }
}
