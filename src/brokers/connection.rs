//! A registered broker connection.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::brokers::{BrokerError, BrokerSession};
use crate::config::BrokerSettings;
use crate::resources::ResourceHandles;

/// Lock-free record of the last time a broker was heard from.
#[derive(Debug)]
pub struct ContactClock {
    origin: Instant,
    /// Milliseconds since `origin`, plus one; zero means never.
    last_ms: AtomicU64,
}

impl ContactClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            last_ms: AtomicU64::new(0),
        }
    }

    pub fn touch(&self) {
        let elapsed = self.origin.elapsed().as_millis() as u64;
        self.last_ms.store(elapsed + 1, Ordering::Release);
    }

    pub fn last(&self) -> Option<Instant> {
        match self.last_ms.load(Ordering::Acquire) {
            0 => None,
            ms => Some(self.origin + Duration::from_millis(ms - 1)),
        }
    }
}

impl Default for ContactClock {
    fn default() -> Self {
        Self::new()
    }
}

/// One broker declared in the broker file, with its session if it came up.
pub struct BrokerConnection {
    settings: BrokerSettings,
    session: Option<Arc<dyn BrokerSession>>,
    resources: Arc<ResourceHandles>,
    app_server: String,
    api_key: String,
    registered_at: Instant,
}

impl BrokerConnection {
    pub fn new(
        settings: BrokerSettings,
        session: Option<Arc<dyn BrokerSession>>,
        resources: Arc<ResourceHandles>,
        app_server: String,
        api_key: String,
    ) -> Self {
        Self {
            settings,
            session,
            resources,
            app_server,
            api_key,
            registered_at: Instant::now(),
        }
    }

    pub fn host(&self) -> &str {
        &self.settings.host
    }

    pub fn settings(&self) -> &BrokerSettings {
        &self.settings
    }

    pub fn session(&self) -> Option<&Arc<dyn BrokerSession>> {
        self.session.as_ref()
    }

    pub fn resources(&self) -> &Arc<ResourceHandles> {
        &self.resources
    }

    pub fn app_server(&self) -> &str {
        &self.app_server
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn registered_at(&self) -> Instant {
        self.registered_at
    }

    /// Subscribe to the configured topics. A connection without session has
    /// nothing to subscribe.
    pub async fn setup_subscriptions(&self) -> Result<usize, BrokerError> {
        let Some(session) = &self.session else {
            return Ok(0);
        };
        session.subscribe(&self.settings.topics).await?;
        Ok(self.settings.topics.len())
    }

    pub async fn disconnect(&self) {
        if let Some(session) = &self.session {
            session.disconnect().await;
        }
    }
}

impl fmt::Debug for BrokerConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerConnection")
            .field("host", &self.settings.host)
            .field("port", &self.settings.port)
            .field("session", &self.session.is_some())
            .field("app_server", &self.app_server)
            .finish()
    }
}
