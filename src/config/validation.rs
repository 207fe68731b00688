//! Configuration validation.
//!
//! Semantic checks only; serde and clap handle syntax. All problems are
//! reported at once.

use thiserror::Error;

use crate::config::schema::GatewayConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("root {0:?} must start with '/'")]
    RootNotAbsolute(String),

    #[error("passthrough header name must not be empty")]
    EmptyPassthroughName,

    #[error("passthrough header name {0:?} must not contain '='")]
    InvalidPassthroughName(String),

    #[error("listen address must not be empty")]
    EmptyListenAddress,
}

/// Check a resolved configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !config.root.starts_with('/') {
        errors.push(ValidationError::RootNotAbsolute(config.root.clone()));
    }

    for name in &config.passthrough_headers {
        if name.is_empty() {
            errors.push(ValidationError::EmptyPassthroughName);
        } else if name.contains('=') {
            errors.push(ValidationError::InvalidPassthroughName(name.clone()));
        }
    }

    if config.listen_address.trim().is_empty() {
        errors.push(ValidationError::EmptyListenAddress);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
