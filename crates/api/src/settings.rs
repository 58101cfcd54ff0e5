//! Environment-sourced configuration.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub port: u16,
    /// `NODE_ENV`-style environment name; TLS verification is only relaxed
    /// outside `production`.
    pub environment: String,
    pub redis_host: String,
    pub redis_port: u16,
    pub queue_concurrency: usize,
    pub queue_attempts: u32,
    pub remote_base_url: String,
    pub notification_api_url: String,
    pub api_gateway_token: String,
    pub email_from: String,
    pub email_team_tag: String,
    pub email_product_tag: String,
    /// Directory holding the three JSON manifests.
    pub config_dir: String,
}

impl Settings {
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an injectable lookup (used in tests).
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, SettingsError> {
        Ok(Self {
            port: parse_or(&lookup, "PORT", 8080)?,
            environment: lookup("NODE_ENV").unwrap_or_else(|| "development".to_string()),
            redis_host: lookup("REDIS_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            redis_port: parse_or(&lookup, "REDIS_PORT", 6379)?,
            queue_concurrency: parse_or(&lookup, "QUEUE_CONCURRENCY", 5)?,
            queue_attempts: parse_or(&lookup, "QUEUE_ATTEMPTS", 3)?,
            remote_base_url: required(&lookup, "REMOTE_BASE_URL")?,
            notification_api_url: required(&lookup, "NOTIFICATION_API_URL")?,
            api_gateway_token: required(&lookup, "API_GATEWAY_TOKEN")?,
            email_from: required(&lookup, "EMAIL_FROM")?,
            email_team_tag: lookup("EMAIL_TEAM_TAG").unwrap_or_else(|| "analytics".to_string()),
            email_product_tag: lookup("EMAIL_PRODUCT_TAG")
                .unwrap_or_else(|| "reportdeck".to_string()),
            config_dir: lookup("CONFIG_DIR").unwrap_or_else(|| "config".to_string()),
        })
    }

    pub fn redis_url(&self) -> String {
        format!("redis://{}:{}", self.redis_host, self.redis_port)
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn required(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<String, SettingsError> {
    match lookup(key) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(SettingsError::Missing(key)),
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, SettingsError> {
    match lookup(key) {
        Some(value) => value
            .parse()
            .map_err(|_| SettingsError::Invalid { key, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_env(key: &str) -> Option<String> {
        match key {
            "REMOTE_BASE_URL" => Some("https://analytics.example.com/api/3.21".to_string()),
            "NOTIFICATION_API_URL" => Some("https://notify.example.com".to_string()),
            "API_GATEWAY_TOKEN" => Some("token".to_string()),
            "EMAIL_FROM" => Some("reports@example.com".to_string()),
            _ => None,
        }
    }

    #[test]
    fn defaults_apply_when_optional_vars_are_absent() {
        let settings = Settings::from_lookup(base_env).unwrap();
        assert_eq!(settings.port, 8080);
        assert_eq!(settings.queue_concurrency, 5);
        assert_eq!(settings.queue_attempts, 3);
        assert_eq!(settings.redis_url(), "redis://127.0.0.1:6379");
        assert!(!settings.is_production());
    }

    #[test]
    fn missing_required_var_fails_startup() {
        let err = Settings::from_lookup(|key| match key {
            "REMOTE_BASE_URL" => None,
            other => base_env(other),
        })
        .unwrap_err();
        assert!(matches!(err, SettingsError::Missing("REMOTE_BASE_URL")));
    }

    #[test]
    fn invalid_numeric_var_is_rejected() {
        let err = Settings::from_lookup(|key| match key {
            "QUEUE_CONCURRENCY" => Some("lots".to_string()),
            other => base_env(other),
        })
        .unwrap_err();
        assert!(matches!(err, SettingsError::Invalid { key: "QUEUE_CONCURRENCY", .. }));
    }

    #[test]
    fn production_environment_is_detected() {
        let settings = Settings::from_lookup(|key| match key {
            "NODE_ENV" => Some("production".to_string()),
            other => base_env(other),
        })
        .unwrap();
        assert!(settings.is_production());
    }
}
