//! MQTT broker sessions.
//!
//! # Responsibilities
//! - Open a session and wait for the broker's CONNACK within the connect timeout
//! - Drive the event loop in a background task, touching the contact clock on
//!   every packet from the broker
//! - Back off between reconnect attempts after transport errors
//!
//! # Design Decisions
//! - Event loops hang off a child of the connector's cancellation token, so
//!   cancelling it stops every session even if disconnect is never called
//! - Subscriptions use QoS 1

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use rumqttc::{AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::brokers::{BrokerConnector, BrokerError, BrokerSession, ContactClock};
use crate::config::{BrokerSettings, TopicSubscription};
use crate::resilience::{bounded, Backoff};
use crate::resources::ResourceHandles;

const REQUEST_CHANNEL_CAPACITY: usize = 32;
const RECONNECT_BASE: Duration = Duration::from_millis(500);
const RECONNECT_MAX: Duration = Duration::from_secs(30);
const LOOP_STOP_TIMEOUT: Duration = Duration::from_secs(2);

/// Connector for MQTT brokers.
#[derive(Debug, Clone)]
pub struct MqttConnector {
    connect_timeout: Duration,
    keep_alive: Duration,
    cancel: CancellationToken,
}

impl MqttConnector {
    pub fn new(connect_timeout: Duration, keep_alive: Duration, cancel: CancellationToken) -> Self {
        Self {
            connect_timeout,
            keep_alive,
            cancel,
        }
    }

    fn options(&self, settings: &BrokerSettings) -> MqttOptions {
        let client_id = settings
            .client_id
            .clone()
            .unwrap_or_else(|| format!("broker-node-{}", uuid::Uuid::new_v4().simple()));

        let mut options = MqttOptions::new(client_id, settings.host.as_str(), settings.port);
        options.set_keep_alive(self.keep_alive);
        if let Some(username) = &settings.username {
            options.set_credentials(username.as_str(), settings.password.clone().unwrap_or_default());
        }
        options
    }
}

#[async_trait]
impl BrokerConnector for MqttConnector {
    async fn connect(
        &self,
        settings: &BrokerSettings,
        _resources: &Arc<ResourceHandles>,
    ) -> Result<Arc<dyn BrokerSession>, BrokerError> {
        let host = settings.host.clone();
        let (client, mut event_loop) = AsyncClient::new(self.options(settings), REQUEST_CHANNEL_CAPACITY);

        bounded("broker connect", self.connect_timeout, await_connack(&mut event_loop))
            .await?
            .map_err(|reason| BrokerError::Connect {
                host: host.clone(),
                reason,
            })?;

        let clock = Arc::new(ContactClock::new());
        clock.touch();

        let cancel = self.cancel.child_token();
        let task = tokio::spawn(drive(host.clone(), event_loop, clock.clone(), cancel.clone()));

        tracing::info!(host = %host, port = settings.port, "Broker session established");

        Ok(Arc::new(MqttSession {
            host,
            client,
            clock,
            cancel,
            task: Mutex::new(Some(task)),
        }))
    }
}

async fn await_connack(event_loop: &mut EventLoop) -> Result<(), String> {
    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                return match ack.code {
                    ConnectReturnCode::Success => Ok(()),
                    code => Err(format!("{code:?}")),
                };
            }
            Ok(_) => continue,
            Err(e) => return Err(e.to_string()),
        }
    }
}

async fn drive(host: String, mut event_loop: EventLoop, clock: Arc<ContactClock>, cancel: CancellationToken) {
    let mut backoff = Backoff::new(RECONNECT_BASE, RECONNECT_MAX);

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            event = event_loop.poll() => match event {
                Ok(Event::Incoming(packet)) => {
                    clock.touch();
                    backoff.reset();
                    if let Packet::Publish(publish) = packet {
                        tracing::debug!(
                            host = %host,
                            topic = %publish.topic,
                            bytes = publish.payload.len(),
                            "Message received"
                        );
                    }
                }
                Ok(Event::Outgoing(Outgoing::Disconnect)) => break,
                Ok(Event::Outgoing(_)) => {}
                Err(e) => {
                    let delay = backoff.next_delay();
                    tracing::warn!(
                        host = %host,
                        error = %e,
                        attempt = backoff.attempt(),
                        retry_in_ms = delay.as_millis() as u64,
                        "Broker session interrupted"
                    );
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }

    tracing::debug!(host = %host, "Broker event loop stopped");
}

struct MqttSession {
    host: String,
    client: AsyncClient,
    clock: Arc<ContactClock>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

#[async_trait]
impl BrokerSession for MqttSession {
    async fn subscribe(&self, topics: &[TopicSubscription]) -> Result<(), BrokerError> {
        for subscription in topics {
            self.client
                .subscribe(subscription.topic.as_str(), QoS::AtLeastOnce)
                .await
                .map_err(|e| BrokerError::Subscribe {
                    host: self.host.clone(),
                    topic: subscription.topic.clone(),
                    reason: e.to_string(),
                })?;
            tracing::debug!(
                host = %self.host,
                topic = %subscription.topic,
                handler = subscription.handler.as_deref().unwrap_or("default"),
                "Subscribed"
            );
        }
        Ok(())
    }

    fn last_contact(&self) -> Option<Instant> {
        self.clock.last()
    }

    async fn disconnect(&self) {
        let Some(mut task) = self.task.lock().await.take() else {
            return;
        };

        // The loop exits by itself once DISCONNECT is on the wire.
        if let Err(e) = self.client.try_disconnect() {
            tracing::debug!(host = %self.host, error = %e, "DISCONNECT not queued");
            self.cancel.cancel();
        }

        if bounded("broker event loop stop", LOOP_STOP_TIMEOUT, &mut task).await.is_err() {
            tracing::warn!(host = %self.host, "Broker event loop did not stop in time");
            self.cancel.cancel();
            task.abort();
        }
        tracing::debug!(host = %self.host, "Broker session closed");
    }
}
