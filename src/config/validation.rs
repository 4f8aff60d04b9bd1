//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, port range ordered)
//! - Check the management endpoint is usable
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: NodeConfig → Result<(), Vec<ValidationError>>
//! - Resource sections are not validated; their gaps degrade one resource at startup

use tracing_subscriber::EnvFilter;
use url::Url;

use crate::config::schema::NodeConfig;

/// A single semantic problem in the configuration.
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

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &NodeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match Url::parse(&config.app_server.url) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(url) => errors.push(ValidationError::new(
            "app_server.url",
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new(
            "app_server.url",
            format!("'{}' is not a valid URL ({})", config.app_server.url, e),
        )),
    }

    if config.app_server.apikey.trim().is_empty() {
        errors.push(ValidationError::new("app_server.apikey", "must not be empty"));
    }

    let monitor = &config.monitor;
    if monitor.port_min == 0 {
        errors.push(ValidationError::new("monitor.port_min", "must be at least 1"));
    }
    if monitor.port_min > monitor.port_max {
        errors.push(ValidationError::new(
            "monitor.port_max",
            format!("{} is below port_min {}", monitor.port_max, monitor.port_min),
        ));
    }

    if monitor.bind_host.parse::<std::net::IpAddr>().is_err() {
        errors.push(ValidationError::new(
            "monitor.bind_host",
            format!("'{}' is not an IP address", monitor.bind_host),
        ));
    }

    let positive = [
        ("monitor.request_timeout_secs", monitor.request_timeout_secs),
        ("monitor.server_shutdown_timeout_secs", monitor.server_shutdown_timeout_secs),
        ("heartbeat.interval_secs", config.heartbeat.interval_secs),
        ("heartbeat.request_timeout_secs", config.heartbeat.request_timeout_secs),
        ("health.probe_timeout_secs", config.health.probe_timeout_secs),
        ("health.broker_stale_after_secs", config.health.broker_stale_after_secs),
        ("brokers.connect_timeout_secs", config.brokers.connect_timeout_secs),
        ("brokers.keep_alive_secs", config.brokers.keep_alive_secs),
        ("resources.connect_timeout_secs", config.resources.connect_timeout_secs),
        ("shutdown.task_join_timeout_secs", config.shutdown.task_join_timeout_secs),
    ];
    for (field, value) in positive {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than zero"));
        }
    }

    if let Err(e) = EnvFilter::try_new(&config.log.level) {
        errors.push(ValidationError::new("log.level", e.to_string()));
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

    fn valid() -> NodeConfig {
        let mut config = NodeConfig::default();
        config.app_server.url = "https://mgmt.example.com".into();
        config.app_server.apikey = "k".into();
        config
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate_config(&valid()).is_ok());
    }

    #[test]
    fn test_reports_every_problem() {
        let mut config = valid();
        config.app_server.url = "ftp://mgmt".into();
        config.monitor.port_min = 9000;
        config.monitor.port_max = 8000;
        config.heartbeat.interval_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec!["app_server.url", "monitor.port_max", "heartbeat.interval_secs"]
        );
    }

    #[test]
    fn test_rejects_relative_url_and_blank_key() {
        let mut config = valid();
        config.app_server.url = "mgmt.local/api".into();
        config.app_server.apikey = "  ".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_bind_host_must_be_an_ip() {
        let mut config = valid();
        config.monitor.bind_host = "localhost".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "monitor.bind_host");
    }
}
