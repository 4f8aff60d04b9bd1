//! OS signal handling and reload triggers.
//!
//! # Responsibilities
//! - Wait for SIGINT or SIGTERM
//! - Re-run the broker registry pass on SIGHUP or a broker file change
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - SIGHUP triggers a reload, not shutdown
//! - Bursts of file events collapse into one reload

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::brokers::ConnectionRegistry;

/// Resolves on the first termination signal and names it.
#[cfg(unix)]
pub async fn wait_for_termination() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                name = ctrl_c() => name,
                _ = sigterm.recv() => "SIGTERM",
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to install SIGTERM handler");
            ctrl_c().await
        }
    }
}

#[cfg(not(unix))]
pub async fn wait_for_termination() -> &'static str {
    ctrl_c().await
}

async fn ctrl_c() -> &'static str {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for SIGINT");
        std::future::pending::<()>().await;
    }
    "SIGINT"
}

/// Reload the registry on every SIGHUP until cancelled.
#[cfg(unix)]
pub async fn reload_on_hangup(registry: Arc<ConnectionRegistry>, cancel: CancellationToken) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = match signal(SignalKind::hangup()) {
        Ok(hangup) => hangup,
        Err(e) => {
            tracing::error!(error = %e, "Failed to install SIGHUP handler");
            return;
        }
    };

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            received = hangup.recv() => {
                if received.is_none() {
                    break;
                }
                tracing::info!(signal = "SIGHUP", "Reloading broker registry");
                let _ = registry.load().await;
            }
        }
    }
}

/// Reload the registry whenever the broker file watcher reports a change.
pub async fn reload_on_change(
    registry: Arc<ConnectionRegistry>,
    mut changes: mpsc::UnboundedReceiver<()>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            change = changes.recv() => {
                if change.is_none() {
                    break;
                }
                while changes.try_recv().is_ok() {}
                let _ = registry.load().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::brokers::{BrokerConnector, BrokerError, BrokerSession};
    use crate::config::{BrokerSettings, ReloadMode};
    use crate::resources::ResourceHandles;

    struct Refusing;

    #[async_trait]
    impl BrokerConnector for Refusing {
        async fn connect(
            &self,
            settings: &BrokerSettings,
            _resources: &Arc<ResourceHandles>,
        ) -> Result<Arc<dyn BrokerSession>, BrokerError> {
            Err(BrokerError::Connect {
                host: settings.host.clone(),
                reason: "refused".into(),
            })
        }
    }

    #[tokio::test]
    async fn test_change_burst_collapses_into_one_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("activemqconfig.json");
        std::fs::write(&path, r#"{"ApiKey":"k","ActiveMQs":[{"Host":"a"}]}"#).unwrap();

        let registry = Arc::new(ConnectionRegistry::new(
            path,
            ReloadMode::Additive,
            "http://app.local",
            Arc::new(ResourceHandles::default()),
            Arc::new(Refusing),
        ));

        let (tx, rx) = mpsc::unbounded_channel();
        for _ in 0..3 {
            tx.send(()).unwrap();
        }

        let cancel = CancellationToken::new();
        let task = tokio::spawn(reload_on_change(registry.clone(), rx, cancel.clone()));
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
        task.await.unwrap();

        assert_eq!(registry.len(), 1);
    }
}
