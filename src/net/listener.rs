//! Monitor port selection.
//!
//! # Responsibilities
//! - Scan an inclusive port range and keep the first listener that binds
//! - Report range exhaustion as a distinct error

use std::net::{IpAddr, SocketAddr};

use tokio::net::TcpListener;

/// Error type for listener operations.
#[derive(Debug)]
pub enum ListenerError {
    /// The bind host is not an IP address.
    InvalidHost(String),
    /// Every port in the range refused to bind.
    NoPortAvailable { min: u16, max: u16 },
}

impl std::fmt::Display for ListenerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerError::InvalidHost(host) => write!(f, "Invalid bind host '{}'", host),
            ListenerError::NoPortAvailable { min, max } => {
                write!(f, "No free port in range {}-{}", min, max)
            }
        }
    }
}

impl std::error::Error for ListenerError {}

/// Bind the smallest free port in `[min, max]` on `host`.
///
/// The returned listener is the one that was bound; the port is never
/// released and re-acquired.
pub async fn bind_in_range(host: &str, min: u16, max: u16) -> Result<TcpListener, ListenerError> {
    let ip: IpAddr = host
        .parse()
        .map_err(|_| ListenerError::InvalidHost(host.to_string()))?;

    for port in min..=max {
        match TcpListener::bind(SocketAddr::new(ip, port)).await {
            Ok(listener) => {
                tracing::info!(address = %ip, port, "Listener bound");
                return Ok(listener);
            }
            Err(e) => tracing::debug!(port, error = %e, "Port unavailable"),
        }
    }

    Err(ListenerError::NoPortAvailable { min, max })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Find `len` consecutive free ports by probing from an OS-assigned one.
    async fn free_run(len: u16) -> u16 {
        loop {
            let probe = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let start = probe.local_addr().unwrap().port();
            drop(probe);
            if start.checked_add(len).is_none() {
                continue;
            }

            let mut ok = true;
            for port in start..start + len {
                if std::net::TcpListener::bind(("127.0.0.1", port)).is_err() {
                    ok = false;
                    break;
                }
            }
            if ok {
                return start;
            }
        }
    }

    #[tokio::test]
    async fn test_binds_smallest_free_port() {
        let start = free_run(3).await;
        let _held = TcpListener::bind(("127.0.0.1", start)).await.unwrap();

        let listener = bind_in_range("127.0.0.1", start, start + 2).await.unwrap();
        assert_eq!(listener.local_addr().unwrap().port(), start + 1);
    }

    #[tokio::test]
    async fn test_exhausted_range() {
        let start = free_run(2).await;
        let _a = TcpListener::bind(("127.0.0.1", start)).await.unwrap();
        let _b = TcpListener::bind(("127.0.0.1", start + 1)).await.unwrap();

        let err = bind_in_range("127.0.0.1", start, start + 1).await.unwrap_err();
        assert!(matches!(
            err,
            ListenerError::NoPortAvailable { min, max } if min == start && max == start + 1
        ));
    }

    #[tokio::test]
    async fn test_invalid_host() {
        let err = bind_in_range("not an ip", 8800, 8800).await.unwrap_err();
        assert!(matches!(err, ListenerError::InvalidHost(_)));
    }
}
