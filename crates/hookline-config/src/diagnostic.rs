// SPDX-FileCopyrightText: 2026 Hookline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration error diagnostics.
//!
//! Converts Figment deserialization errors and semantic validation failures
//! into miette diagnostics rendered at startup.

use miette::Diagnostic;
use thiserror::Error;

/// A configuration error with diagnostic information.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// The TOML/env layer failed to deserialize into the config model.
    #[error("failed to load configuration: {detail}")]
    #[diagnostic(
        code(hookline::config::load),
        help("check hookline.toml and HOOKLINE_* environment variables")
    )]
    Load {
        /// Figment's description of the failure (unknown key, type mismatch, ...).
        detail: String,
    },

    /// A semantic validation error for a config value.
    #[error("validation error: {message}")]
    #[diagnostic(code(hookline::config::validation))]
    Validation {
        /// Description of the validation failure.
        message: String,
    },
}

/// Convert a figment error (which may aggregate several failures) into
/// one `ConfigError` per underlying failure.
pub fn figment_to_config_errors(err: figment::Error) -> Vec<ConfigError> {
    err.into_iter()
        .map(|e| ConfigError::Load {
            detail: e.to_string(),
        })
        .collect()
}

/// Render configuration errors to stderr via miette's fancy reporter.
pub fn render_errors(errors: &[ConfigError]) {
    for error in errors {
        let report = miette::Report::msg(error.to_string());
        eprintln!("{report:?}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_displays_message() {
        let err = ConfigError::Validation {
            message: "gateway.port must not be 0".to_string(),
        };
        assert!(err.to_string().contains("gateway.port"));
    }

    #[test]
    fn figment_errors_are_split_per_failure() {
        let err = figment::Error::from("boom".to_string());
        let errors = figment_to_config_errors(err);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("boom"));
    }
}
