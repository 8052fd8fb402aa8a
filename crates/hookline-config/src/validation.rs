// SPDX-FileCopyrightText: 2026 Hookline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as valid bind addresses, non-empty paths, and coherent
//! retry parameters.

use crate::diagnostic::ConfigError;
use crate::model::HooklineConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &HooklineConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let host = config.gateway.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::Validation {
            message: "gateway.host must not be empty".to_string(),
        });
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(ConfigError::Validation {
                message: format!("gateway.host `{host}` is not a valid IP address or hostname"),
            });
        }
    }

    if config.gateway.port == 0 {
        errors.push(ConfigError::Validation {
            message: "gateway.port must not be 0".to_string(),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if let Some(secret) = &config.webhook.signing_secret
        && secret.trim().is_empty()
    {
        errors.push(ConfigError::Validation {
            message: "webhook.signing_secret must not be empty when set".to_string(),
        });
    }

    if config.webhook.timestamp_tolerance_secs <= 0 {
        errors.push(ConfigError::Validation {
            message: format!(
                "webhook.timestamp_tolerance_secs must be positive, got {}",
                config.webhook.timestamp_tolerance_secs
            ),
        });
    }

    if config.webhook.system_owner.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "webhook.system_owner must not be empty".to_string(),
        });
    }

    if config.queue.workers < 1 {
        errors.push(ConfigError::Validation {
            message: "queue.workers must be at least 1".to_string(),
        });
    }

    if config.queue.max_attempts < 1 {
        errors.push(ConfigError::Validation {
            message: "queue.max_attempts must be at least 1".to_string(),
        });
    }

    if config.queue.retry_base_secs > config.queue.retry_cap_secs {
        errors.push(ConfigError::Validation {
            message: format!(
                "queue.retry_base_secs ({}) must not exceed queue.retry_cap_secs ({})",
                config.queue.retry_base_secs, config.queue.retry_cap_secs
            ),
        });
    }

    if config.queue.task_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "queue.task_timeout_secs must not be 0".to_string(),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = HooklineConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = HooklineConfig::default();
        config.storage.database_path = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("database_path"))
        ));
    }

    #[test]
    fn zero_port_fails_validation() {
        let mut config = HooklineConfig::default();
        config.gateway.port = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("gateway.port"))
        ));
    }

    #[test]
    fn empty_secret_fails_validation() {
        let mut config = HooklineConfig::default();
        config.webhook.signing_secret = Some("   ".to_string());
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("signing_secret"))
        ));
    }

    #[test]
    fn inverted_retry_bounds_fail_validation() {
        let mut config = HooklineConfig::default();
        config.queue.retry_base_secs = 900;
        config.queue.retry_cap_secs = 600;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("retry_base_secs"))
        ));
    }

    #[test]
    fn collects_multiple_errors() {
        let mut config = HooklineConfig::default();
        config.gateway.port = 0;
        config.queue.workers = 0;
        config.webhook.timestamp_tolerance_secs = -1;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.len() >= 3);
    }
}
