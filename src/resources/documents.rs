//! Document store client.
//!
//! Speaks only as much of the store as the node needs: it resolves the
//! seed hosts of a connection string and checks that one of them accepts
//! connections. Queries belong to the services that use the store.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use url::{Host, Url};

use crate::config::DocumentConfig;
use crate::resilience::bounded;
use crate::resources::{DocumentStore, ResourceError};

const RESOURCE: &str = "document store";

/// One seed host of a connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedHost {
    pub host: String,
    pub port: u16,
}

#[derive(Debug)]
pub struct DocumentStoreClient {
    kind: String,
    database: String,
    seeds: Vec<SeedHost>,
    probe_timeout: Duration,
    closed: AtomicBool,
}

impl DocumentStoreClient {
    /// Resolve the connection string and check the store is reachable.
    pub async fn connect(config: &DocumentConfig, timeout: Duration) -> Result<Self, ResourceError> {
        let kind = required(config.kind.as_deref(), "type")?;
        let connection = required(config.connection.as_deref(), "connection")?;
        let database = required(config.database.as_deref(), "database")?;

        let seeds = parse_seed_hosts(connection, default_port(kind))?;

        let client = Self {
            kind: kind.to_string(),
            database: database.to_string(),
            seeds,
            probe_timeout: timeout,
            closed: AtomicBool::new(false),
        };
        client.ping().await?;

        tracing::info!(kind = %client.kind, database = %client.database, seeds = client.seeds.len(), "Document store connected");
        Ok(client)
    }

    pub fn seeds(&self) -> &[SeedHost] {
        &self.seeds
    }
}

#[async_trait]
impl DocumentStore for DocumentStoreClient {
    fn database_name(&self) -> &str {
        &self.database
    }

    async fn ping(&self) -> Result<(), ResourceError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ResourceError::Closed { resource: RESOURCE });
        }

        let mut last_error = String::from("no seed hosts");
        for seed in &self.seeds {
            let attempt = bounded(
                "document store connect",
                self.probe_timeout,
                TcpStream::connect((seed.host.as_str(), seed.port)),
            )
            .await;
            match attempt {
                Ok(Ok(_stream)) => return Ok(()),
                Ok(Err(e)) => last_error = format!("{}:{}: {}", seed.host, seed.port, e),
                Err(e) => last_error = format!("{}:{}: {}", seed.host, seed.port, e),
            }
        }

        Err(ResourceError::Unreachable {
            resource: RESOURCE,
            reason: last_error,
        })
    }

    async fn disconnect(&self) {
        self.closed.store(true, Ordering::Release);
        tracing::debug!(database = %self.database, "Document store disconnected");
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

fn default_port(kind: &str) -> Option<u16> {
    match kind.to_ascii_lowercase().as_str() {
        "mongodb" | "mongo" => Some(27017),
        _ => None,
    }
}

/// Extract `host:port` pairs from `scheme://[user:pass@]h1[:p1],h2[:p2][/db][?opts]`.
///
/// A seed list is not a single URL authority, so each host is parsed as
/// its own `scheme://host[:port]` URL.
pub(crate) fn parse_seed_hosts(
    connection: &str,
    default_port: Option<u16>,
) -> Result<Vec<SeedHost>, ResourceError> {
    let invalid = |reason: String| ResourceError::InvalidConnection {
        resource: RESOURCE,
        reason,
    };

    let (scheme, rest) = connection
        .split_once("://")
        .ok_or_else(|| invalid(format!("'{connection}' has no scheme")))?;
    let authority = rest.split(['/', '?']).next().unwrap_or_default();
    let hosts = authority.rsplit_once('@').map_or(authority, |(_, h)| h);

    let mut seeds = Vec::new();
    for entry in hosts.split(',').filter(|h| !h.is_empty()) {
        let seed = Url::parse(&format!("{scheme}://{entry}"))
            .map_err(|e| invalid(format!("bad host '{entry}': {e}")))?;
        let host = match seed.host() {
            Some(Host::Domain(name)) if !name.is_empty() => name.to_string(),
            Some(Host::Ipv4(ip)) => ip.to_string(),
            Some(Host::Ipv6(ip)) => ip.to_string(),
            _ => return Err(invalid(format!("'{entry}' has no host"))),
        };
        let port = seed
            .port()
            .or(default_port)
            .ok_or_else(|| invalid(format!("'{entry}' has no port")))?;
        seeds.push(SeedHost { host, port });
    }

    if seeds.is_empty() {
        return Err(invalid(format!("'{connection}' names no hosts")));
    }
    Ok(seeds)
}
