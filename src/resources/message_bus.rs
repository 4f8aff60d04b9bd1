//! Message bus client over HTTP.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::config::MessageBusConfig;
use crate::resources::{MessageBus, ResourceError};

const RESOURCE: &str = "message bus";

/// Client for the message bus hub.
///
/// Reachability is any answer that is not a server error; the hub may well
/// reject an unauthenticated GET and still be up.
pub struct HttpMessageBus {
    url: Url,
    client: reqwest::Client,
    closed: AtomicBool,
}

impl HttpMessageBus {
    pub async fn connect(config: &MessageBusConfig, timeout: Duration) -> Result<Self, ResourceError> {
        let raw = config
            .url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or(ResourceError::MissingField {
                resource: RESOURCE,
                field: "url",
            })?;
        let url = Url::parse(raw).map_err(|e| ResourceError::InvalidConnection {
            resource: RESOURCE,
            reason: format!("'{raw}': {e}"),
        })?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ResourceError::InvalidConnection {
                resource: RESOURCE,
                reason: e.to_string(),
            })?;

        let bus = Self {
            url,
            client,
            closed: AtomicBool::new(false),
        };
        bus.ping().await?;

        tracing::info!(url = %bus.url, options = config.options.len(), "Message bus connected");
        Ok(bus)
    }
}

#[async_trait]
impl MessageBus for HttpMessageBus {
    async fn ping(&self) -> Result<(), ResourceError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ResourceError::Closed { resource: RESOURCE });
        }

        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(|e| ResourceError::Unreachable {
                resource: RESOURCE,
                reason: e.to_string(),
            })?;

        if response.status().is_server_error() {
            return Err(ResourceError::Unreachable {
                resource: RESOURCE,
                reason: format!("status {}", response.status()),
            });
        }
        Ok(())
    }

    async fn stop(&self) {
        self.closed.store(true, Ordering::Release);
        tracing::debug!(url = %self.url, "Message bus client stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str) -> MessageBusConfig {
        MessageBusConfig {
            url: Some(url.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_connect_accepts_client_errors() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/iacmessagebus")
            .with_status(401)
            .expect_at_least(1)
            .create_async()
            .await;

        let bus = HttpMessageBus::connect(&config(&format!("{}/iacmessagebus", server.url())), Duration::from_secs(2))
            .await
            .unwrap();
        assert!(bus.ping().await.is_ok());
        mock.assert_async().await;

        bus.stop().await;
        assert!(matches!(bus.ping().await, Err(ResourceError::Closed { .. })));
    }

    #[tokio::test]
    async fn test_connect_fails_on_server_error() {
        let mut server = mockito::Server::new_async().await;
        server.mock("GET", "/").with_status(503).create_async().await;

        let err = HttpMessageBus::connect(&config(&server.url()), Duration::from_secs(2))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ResourceError::Unreachable { .. }));
    }

    #[tokio::test]
    async fn test_missing_url() {
        let err = HttpMessageBus::connect(&MessageBusConfig::default(), Duration::from_secs(1))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ResourceError::MissingField { field: "url", .. }));
    }
}
