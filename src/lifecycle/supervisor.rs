//! Ownership of the node's background tasks.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Holds every long-lived task with the token that stops it.
#[derive(Debug, Default)]
pub struct Supervisor {
    token: CancellationToken,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

/// How the supervised tasks ended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinReport {
    pub joined: Vec<&'static str>,
    pub aborted: Vec<&'static str>,
}

impl Supervisor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Spawn `task`, handing it a child of the supervisor's token.
    pub fn spawn<F, Fut>(&mut self, name: &'static str, task: F)
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(task(self.token.child_token()));
        tracing::debug!(task = name, "Supervised task started");
        self.tasks.push((name, handle));
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Cancel every task and wait for them, sharing one `timeout` across all
    /// joins. Tasks still running at the deadline are aborted.
    pub async fn shutdown(self, timeout: Duration) -> JoinReport {
        self.token.cancel();
        let deadline = tokio::time::Instant::now() + timeout;
        let mut report = JoinReport::default();

        for (name, mut handle) in self.tasks {
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(())) => report.joined.push(name),
                Ok(Err(e)) => {
                    tracing::warn!(task = name, error = %e, "Supervised task ended abnormally");
                    report.joined.push(name);
                }
                Err(_) => {
                    tracing::warn!(task = name, "Supervised task did not stop in time, aborting");
                    handle.abort();
                    report.aborted.push(name);
                }
            }
        }
        report
    }
}
