//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::BlogConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<BlogConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str) -> Result<BlogConfig, ConfigError> {
    let config: BlogConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load `path` if it exists; when `required` is false a missing file yields
/// the defaults.
pub fn load_or_default(path: &Path, required: bool) -> Result<BlogConfig, ConfigError> {
    if !required && !path.exists() {
        tracing::info!(path = %path.display(), "No config file found; using defaults");
        let config = BlogConfig::default();
        validate_config(&config).map_err(ConfigError::Validation)?;
        return Ok(config);
    }
    load_config(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_uses_defaults() {
        let config = parse_config(
            r#"
            [listener]
            bind_address = "0.0.0.0:8080"

            [site]
            name = "Notes"
            "#,
        )
        .unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.site.name, "Notes");
        assert_eq!(config.session.cookie_name, "blog_session");
        assert_eq!(config.uploads.max_file_bytes, 5 * 1024 * 1024);
    }

    #[test]
    fn test_parse_and_validation_errors() {
        assert!(matches!(parse_config("[listener"), Err(ConfigError::Parse(_))));

        let err = parse_config("[timeouts]\nrequest_secs = 0").unwrap_err();
        match err {
            ConfigError::Validation(errors) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].field, "timeouts.request_secs");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_optional_file_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blog.toml");
        assert!(load_or_default(&path, false).is_ok());
        assert!(matches!(load_or_default(&path, true), Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_sample_config_parses() {
        let config = parse_config(include_str!("../../blog.toml")).unwrap();
        assert_eq!(config.session.cookie_name, "blog_session");
        assert_eq!(
            config.storage.data_file.as_deref(),
            Some(Path::new("data/blog.json"))
        );
    }
}
