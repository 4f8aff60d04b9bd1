//! Relational database pool backed by `sqlx`.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;

use crate::config::DatabaseConfig;
use crate::resources::{Database, ResourceError};

const RESOURCE: &str = "database";

/// A pooled connection to a Postgres or MySQL database.
pub struct SqlDatabase {
    driver: String,
    pool: AnyPool,
}

impl SqlDatabase {
    /// Open the pool and wait until one connection is established.
    pub async fn connect(config: &DatabaseConfig, timeout: Duration) -> Result<Self, ResourceError> {
        let driver = required(config.driver.as_deref(), "type")?;
        let connection = required(config.connection.as_deref(), "connection")?;
        let url = connection_url(driver, connection)?;

        let max_open = config.max_open_conns();
        let idle = config.max_idle_conns().min(max_open);

        sqlx::any::install_default_drivers();
        let pool = AnyPoolOptions::new()
            .max_connections(max_open)
            .min_connections(idle)
            .acquire_timeout(timeout)
            .connect(&url)
            .await
            .map_err(|e| ResourceError::Unreachable {
                resource: RESOURCE,
                reason: e.to_string(),
            })?;

        tracing::info!(driver = %driver, max_open, idle, "Database pool opened");

        Ok(Self {
            driver: driver.to_string(),
            pool,
        })
    }
}

#[async_trait]
impl Database for SqlDatabase {
    fn driver(&self) -> &str {
        &self.driver
    }

    async fn ping(&self) -> Result<(), ResourceError> {
        if self.pool.is_closed() {
            return Err(ResourceError::Closed { resource: RESOURCE });
        }
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| ResourceError::Unreachable {
                resource: RESOURCE,
                reason: e.to_string(),
            })
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

fn required<'a>(value: Option<&'a str>, field: &'static str) -> Result<&'a str, ResourceError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(ResourceError::MissingField {
            resource: RESOURCE,
            field,
        })
}

/// Build the URL handed to the pool. A DSN without scheme gets the driver's.
pub(crate) fn connection_url(driver: &str, connection: &str) -> Result<String, ResourceError> {
    let scheme = match driver.to_ascii_lowercase().as_str() {
        "postgres" | "postgresql" => "postgres",
        "mysql" => "mysql",
        _ => {
            return Err(ResourceError::Unsupported {
                resource: RESOURCE,
                kind: driver.to_string(),
            })
        }
    };

    if connection.contains("://") {
        Ok(connection.to_string())
    } else {
        Ok(format!("{scheme}://{connection}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_url() {
        assert_eq!(
            connection_url("postgres", "postgres://u@db/app").unwrap(),
            "postgres://u@db/app"
        );
        assert_eq!(connection_url("MySQL", "u:p@db:3306/app").unwrap(), "mysql://u:p@db:3306/app");
        assert!(matches!(
            connection_url("sqlserver", "server=db"),
            Err(ResourceError::Unsupported { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_fields_fail_before_connecting() {
        let config = DatabaseConfig {
            driver: Some("postgres".into()),
            ..Default::default()
        };
        let err = SqlDatabase::connect(&config, Duration::from_millis(100))
            .await
            .err()
            .unwrap();
        assert!(matches!(
            err,
            ResourceError::MissingField { field: "connection", .. }
        ));

        let err = SqlDatabase::connect(&DatabaseConfig::default(), Duration::from_millis(100))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ResourceError::MissingField { field: "type", .. }));
    }
}
