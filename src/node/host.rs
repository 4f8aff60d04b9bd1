//! Host name and address discovery.

use std::net::IpAddr;

use serde::Serialize;

/// Where this node can be reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostAddress {
    pub host: String,
    pub ip: Option<IpAddr>,
}

impl HostAddress {
    /// Discover the host name and the first non-loopback IPv4 address.
    ///
    /// Falls back to any non-loopback address, then to none.
    pub fn discover() -> Self {
        let host = gethostname::gethostname().to_string_lossy().to_string();

        let ip = match if_addrs::get_if_addrs() {
            Ok(interfaces) => {
                let candidates: Vec<IpAddr> = interfaces
                    .iter()
                    .filter(|iface| !iface.is_loopback())
                    .map(|iface| iface.ip())
                    .collect();
                candidates
                    .iter()
                    .find(|ip| ip.is_ipv4())
                    .or_else(|| candidates.first())
                    .copied()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to enumerate network interfaces");
                None
            }
        };

        tracing::debug!(host = %host, ip = ?ip, "Host address discovered");
        Self { host, ip }
    }
}
