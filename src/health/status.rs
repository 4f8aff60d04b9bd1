//! Broker liveness and aggregate status.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::brokers::BrokerConnection;
use crate::config::{BrokerLiveness, EmptyRegistryStatus, HealthConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OverallStatus {
    #[serde(rename = "OK")]
    Ok,
    PartiallyAvailable,
    Unavailable,
    NoBrokersConfigured,
}

/// How a registry entry is judged live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessPolicy {
    /// A session handle exists.
    HandlePresent,
    /// A session handle exists and the broker was heard from within `max_age`.
    Fresh { max_age: Duration },
}

impl LivenessPolicy {
    pub fn from_config(config: &HealthConfig) -> Self {
        match config.broker_liveness {
            BrokerLiveness::Handle => Self::HandlePresent,
            BrokerLiveness::Staleness => Self::Fresh {
                max_age: config.broker_stale_after(),
            },
        }
    }

    pub fn is_live(&self, connection: &BrokerConnection, now: Instant) -> bool {
        let Some(session) = connection.session() else {
            return false;
        };
        match self {
            Self::HandlePresent => true,
            Self::Fresh { max_age } => session
                .last_contact()
                .is_some_and(|at| now.saturating_duration_since(at) <= *max_age),
        }
    }
}

/// Liveness by host plus the aggregate status.
///
/// Serializes as a flat object: one boolean per host and an
/// `"OverallStatus"` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceStatus {
    #[serde(flatten)]
    pub brokers: BTreeMap<String, bool>,
    #[serde(rename = "OverallStatus")]
    pub overall: OverallStatus,
    /// Registry entries counted, including duplicate hosts.
    #[serde(skip)]
    pub total: usize,
    #[serde(skip)]
    pub live: usize,
}

impl ServiceStatus {
    /// Aggregate `(host, live)` pairs in registry order. A later entry for
    /// the same host overwrites the earlier one in the map.
    pub fn from_entries<'a, I>(entries: I, empty: EmptyRegistryStatus) -> Self
    where
        I: IntoIterator<Item = (&'a str, bool)>,
    {
        let mut brokers = BTreeMap::new();
        let mut total = 0;
        let mut live = 0;
        for (host, up) in entries {
            total += 1;
            live += usize::from(up);
            brokers.insert(host.to_string(), up);
        }

        Self {
            brokers,
            overall: overall_status(total, live, empty),
            total,
            live,
        }
    }

    pub fn from_registry(
        connections: &[Arc<BrokerConnection>],
        policy: LivenessPolicy,
        empty: EmptyRegistryStatus,
        now: Instant,
    ) -> Self {
        Self::from_entries(
            connections.iter().map(|c| (c.host(), policy.is_live(c, now))),
            empty,
        )
    }
}

pub fn overall_status(total: usize, live: usize, empty: EmptyRegistryStatus) -> OverallStatus {
    match (total, live) {
        (0, _) => match empty {
            EmptyRegistryStatus::Ok => OverallStatus::Ok,
            EmptyRegistryStatus::NoBrokers => OverallStatus::NoBrokersConfigured,
        },
        (_, 0) => OverallStatus::Unavailable,
        (n, k) if k < n => OverallStatus::PartiallyAvailable,
        _ => OverallStatus::Ok,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;

    use crate::brokers::{BrokerError, BrokerSession, ContactClock};
    use crate::config::{BrokerSettings, TopicSubscription};
    use crate::resources::ResourceHandles;

    struct ClockSession(ContactClock);

    #[async_trait]
    impl BrokerSession for ClockSession {
        async fn subscribe(&self, _topics: &[TopicSubscription]) -> Result<(), BrokerError> {
            Ok(())
        }

        fn last_contact(&self) -> Option<Instant> {
            self.0.last()
        }

        async fn disconnect(&self) {}
    }

    fn connection(host: &str, session: Option<ContactClock>) -> Arc<BrokerConnection> {
        let settings: BrokerSettings = serde_json::from_value(serde_json::json!({ "Host": host })).unwrap();
        let session = session.map(|clock| Arc::new(ClockSession(clock)) as Arc<dyn BrokerSession>);
        Arc::new(BrokerConnection::new(
            settings,
            session,
            Arc::new(ResourceHandles::default()),
            "http://app.local".into(),
            "k".into(),
        ))
    }

    fn touched() -> ContactClock {
        let clock = ContactClock::new();
        clock.touch();
        clock
    }

    #[test]
    fn test_overall_status_for_all_counts() {
        for total in 0..6 {
            for live in 0..=total {
                let status = overall_status(total, live, EmptyRegistryStatus::Ok);
                assert_eq!(status == OverallStatus::Unavailable, live == 0 && total > 0);
                assert_eq!(status == OverallStatus::Ok, live == total);
                assert_eq!(
                    status == OverallStatus::PartiallyAvailable,
                    live > 0 && live < total
                );
            }
        }
    }

    #[test]
    fn test_empty_registry_policy() {
        assert_eq!(overall_status(0, 0, EmptyRegistryStatus::Ok), OverallStatus::Ok);
        assert_eq!(
            overall_status(0, 0, EmptyRegistryStatus::NoBrokers),
            OverallStatus::NoBrokersConfigured
        );
    }

    #[test]
    fn test_three_brokers_two_handles() {
        let entries = [
            connection("hostA", Some(touched())),
            connection("hostB", Some(touched())),
            connection("hostC", None),
        ];
        let status = ServiceStatus::from_registry(
            &entries,
            LivenessPolicy::HandlePresent,
            EmptyRegistryStatus::Ok,
            Instant::now(),
        );

        assert_eq!(
            serde_json::to_value(&status).unwrap(),
            serde_json::json!({
                "hostA": true,
                "hostB": true,
                "hostC": false,
                "OverallStatus": "PartiallyAvailable"
            })
        );
    }

    #[test]
    fn test_duplicate_host_later_entry_wins() {
        let status = ServiceStatus::from_entries(
            [("a", true), ("b", true), ("a", false)],
            EmptyRegistryStatus::Ok,
        );
        assert_eq!(status.total, 3);
        assert_eq!(status.live, 2);
        assert_eq!(status.brokers["a"], false);
        assert_eq!(status.overall, OverallStatus::PartiallyAvailable);
    }

    #[test]
    fn test_staleness_policy() {
        let policy = LivenessPolicy::Fresh {
            max_age: Duration::from_secs(90),
        };
        let fresh = connection("fresh", Some(touched()));
        let silent = connection("silent", Some(ContactClock::new()));
        let absent = connection("absent", None);

        let now = Instant::now();
        assert!(policy.is_live(&fresh, now));
        assert!(!policy.is_live(&silent, now));
        assert!(!policy.is_live(&absent, now));
        assert!(!policy.is_live(&fresh, now + Duration::from_secs(91)));

        assert!(LivenessPolicy::HandlePresent.is_live(&silent, now));
    }

    #[test]
    fn test_policy_from_config() {
        let mut config = HealthConfig::default();
        assert_eq!(
            LivenessPolicy::from_config(&config),
            LivenessPolicy::Fresh {
                max_age: Duration::from_secs(90)
            }
        );
        config.broker_liveness = BrokerLiveness::Handle;
        assert_eq!(LivenessPolicy::from_config(&config), LivenessPolicy::HandlePresent);
    }
}
