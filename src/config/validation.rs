//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, limits > 0, addresses parse)
//! - Check that the session cookie name is a legal token
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: BlogConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::BlogConfig;

/// One semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
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

pub fn validate_config(config: &BlogConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("`{}` is not a socket address", config.listener.bind_address),
        ));
    }

    if let Some(tls) = &config.listener.tls {
        if tls.cert_path.trim().is_empty() {
            errors.push(ValidationError::new("listener.tls.cert_path", "must not be empty"));
        }
        if tls.key_path.trim().is_empty() {
            errors.push(ValidationError::new("listener.tls.key_path", "must not be empty"));
        }
    }

    match url::Url::parse(&config.site.base_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ValidationError::new(
            "site.base_url",
            format!("unsupported scheme `{}`", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new("site.base_url", e.to_string())),
    }

    if config.site.name.trim().is_empty() {
        errors.push(ValidationError::new("site.name", "must not be empty"));
    }

    if !is_cookie_token(&config.session.cookie_name) {
        errors.push(ValidationError::new(
            "session.cookie_name",
            "must be a non-empty token without separators",
        ));
    }
    if config.session.ttl_secs == 0 {
        errors.push(ValidationError::new("session.ttl_secs", "must be greater than 0"));
    }

    if config.auth.pbkdf2_iterations == 0 {
        errors.push(ValidationError::new("auth.pbkdf2_iterations", "must be greater than 0"));
    }

    if config.uploads.max_file_bytes == 0 {
        errors.push(ValidationError::new("uploads.max_file_bytes", "must be greater than 0"));
    }
    let uploads_prefix = config.uploads.url_prefix.trim_end_matches('/');
    if !uploads_prefix.starts_with('/') {
        errors.push(ValidationError::new(
            "uploads.url_prefix",
            "must be an absolute path such as /uploads",
        ));
    } else if uploads_prefix == "/static" {
        errors.push(ValidationError::new("uploads.url_prefix", "collides with /static"));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    if config.security.max_body_size == 0 {
        errors.push(ValidationError::new("security.max_body_size", "must be greater than 0"));
    }

    if !matches!(config.observability.log_format.as_str(), "pretty" | "json") {
        errors.push(ValidationError::new(
            "observability.log_format",
            format!("unknown format `{}`", config.observability.log_format),
        ));
    }
    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!(
                "`{}` is not a socket address",
                config.observability.metrics_address
            ),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// RFC 6265 cookie-name token.
fn is_cookie_token(name: &str) -> bool {
    !name.is_empty()
        && name.bytes().all(|b| {
            b.is_ascii_graphic() && !b"()<>@,;:\\\"/[]?={}".contains(&b)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&BlogConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = BlogConfig::default();
        config.listener.bind_address = "nowhere".into();
        config.site.base_url = "ftp://example.com".into();
        config.session.cookie_name = "bad name".into();
        config.session.ttl_secs = 0;
        config.observability.log_format = "xml".into();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "listener.bind_address",
                "site.base_url",
                "session.cookie_name",
                "session.ttl_secs",
                "observability.log_format",
            ]
        );
    }

    #[test]
    fn test_metrics_address_only_checked_when_enabled() {
        let mut config = BlogConfig::default();
        config.observability.metrics_address = "bogus".into();
        assert!(validate_config(&config).is_ok());
        config.observability.metrics_enabled = true;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_uploads_prefix() {
        let mut config = BlogConfig::default();
        for bad in ["uploads", "/", "//", "/static/"] {
            config.uploads.url_prefix = bad.into();
            assert!(validate_config(&config).is_err(), "{bad}");
        }
        config.uploads.url_prefix = "/media/".into();
        assert!(validate_config(&config).is_ok());
    }
}
