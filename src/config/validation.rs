//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Reject resource names that would make resolution ambiguous
//! - Validate value ranges for watching
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AdapterConfig → Result<(), Vec<ValidationError>>
//! - Runs before settings are accepted

use std::fmt;

use crate::config::schema::AdapterConfig;

/// Longest accepted debounce window.
pub const MAX_DEBOUNCE_MS: u64 = 5_000;

/// A single semantic problem with the settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyName { field: &'static str },
    AmbiguousResources { name: String },
    EmptyConfigFile,
    DebounceOutOfRange { value: u64 },
    ZeroPollInterval,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyName { field } => write!(f, "{} must not be empty", field),
            ValidationError::AmbiguousResources { name } => {
                write!(f, "active and test resources are both named {}", name)
            }
            ValidationError::EmptyConfigFile => write!(f, "config_file must not be empty"),
            ValidationError::DebounceOutOfRange { value } => {
                write!(f, "watch.debounce_ms must be at most {}, got {}", MAX_DEBOUNCE_MS, value)
            }
            ValidationError::ZeroPollInterval => write!(f, "watch.poll_interval_ms must be positive"),
        }
    }
}

/// Check `config` for semantic problems.
pub fn validate_config(config: &AdapterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let names = [
        ("resources.active", &config.resources.active),
        ("resources.test", &config.resources.test),
        ("resources.default_template", &config.resources.default_template),
    ];
    for (field, name) in names {
        if name.trim().is_empty() {
            errors.push(ValidationError::EmptyName { field });
        }
    }
    if !config.resources.active.is_empty() && config.resources.active == config.resources.test {
        errors.push(ValidationError::AmbiguousResources {
            name: config.resources.active.clone(),
        });
    }

    if config.config_file.as_os_str().is_empty() {
        errors.push(ValidationError::EmptyConfigFile);
    }

    if config.watch.debounce_ms > MAX_DEBOUNCE_MS {
        errors.push(ValidationError::DebounceOutOfRange {
            value: config.watch.debounce_ms,
        });
    }
    if config.watch.poll_interval_ms == 0 {
        errors.push(ValidationError::ZeroPollInterval);
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
    use std::path::PathBuf;

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(validate_config(&AdapterConfig::default()), Ok(()));
    }

    #[test]
    fn test_each_rule() {
        let mut config = AdapterConfig::default();
        config.resources.default_template = " ".into();
        config.config_file = PathBuf::new();
        config.watch.debounce_ms = 10_000;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::EmptyName { field: "resources.default_template" },
                ValidationError::EmptyConfigFile,
                ValidationError::DebounceOutOfRange { value: 10_000 },
            ]
        );
    }
}
