//! Shutdown coordination.
//!
//! [`Shutdown`] is the execution substrate: every long-running service task is
//! spawned through it and subscribes to its broadcast channel. The shutdown
//! hook on [`ServiceLifecycle`] runs once and in three bounded steps.

use std::future::Future;
use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio::sync::broadcast;

use crate::lifecycle::startup::{ServiceBinding, ServiceLifecycle};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Coordinator for graceful shutdown.
///
/// Provides a broadcast channel that all long-running tasks subscribe to.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Spawn `task`, abandoning it when termination is broadcast.
    ///
    /// The task counts as running until it finishes or is terminated.
    pub fn spawn<F>(&self, name: &'static str, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut rx = self.subscribe();
        tokio::spawn(async move {
            tokio::select! {
                _ = task => tracing::debug!(task = name, "Task finished"),
                _ = rx.recv() => tracing::debug!(task = name, "Task terminated"),
            }
        });
    }

    /// Broadcast termination. Returns how many tasks were signalled.
    pub fn trigger(&self) -> usize {
        self.tx.send(()).unwrap_or(0)
    }

    /// Number of tasks still running.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Resolve once every spawned task has finished.
    pub async fn wait_idle(&self) {
        while self.receiver_count() > 0 {
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of one shutdown step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Completed,
    /// The step exceeded its budget. The sequence continued regardless.
    TimedOut { after: Duration },
    /// Nothing to do, e.g. the listener was already released.
    Skipped,
}

/// What a call to [`ServiceLifecycle::shutdown`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReport {
    /// This call ran the sequence.
    Executed {
        unbind: StepOutcome,
        terminate: StepOutcome,
        termination: StepOutcome,
    },
    /// Another call already ran, or is running, the sequence.
    AlreadyTriggered,
}

impl ServiceLifecycle {
    /// The shutdown hook.
    ///
    /// The first call unbinds and drains the listener, terminates the
    /// substrate and waits for its tasks. Later calls return
    /// [`ShutdownReport::AlreadyTriggered`] without doing anything.
    pub async fn shutdown(&self) -> ShutdownReport {
        if self.triggered.swap(true, Ordering::SeqCst) {
            tracing::debug!("Shutdown already triggered");
            return ShutdownReport::AlreadyTriggered;
        }

        tracing::info!("Shutdown started");

        let binding = match self.binding.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        let unbind = match binding {
            Some(binding) => self.unbind(binding).await,
            None => StepOutcome::Skipped,
        };

        let signalled = self.substrate.trigger();
        tracing::info!(tasks = signalled, "Termination broadcast");
        let terminate = StepOutcome::Completed;

        let termination = self.await_termination().await;

        tracing::info!(?unbind, ?termination, "Shutdown complete");
        ShutdownReport::Executed {
            unbind,
            terminate,
            termination,
        }
    }

    async fn unbind(&self, binding: ServiceBinding) -> StepOutcome {
        let drain = self.settings.drain;
        tracing::info!(address = %binding.local_addr, drain_secs = drain.as_secs(), "Unbinding listener");
        binding.handle.graceful_shutdown(Some(drain));

        let drained = async {
            while binding.handle.connection_count() > 0 {
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        };

        match tokio::time::timeout(drain, drained).await {
            Ok(()) => StepOutcome::Completed,
            Err(_) => {
                tracing::warn!(
                    remaining = binding.handle.connection_count(),
                    after = ?drain,
                    "Connections still open after drain timeout"
                );
                StepOutcome::TimedOut { after: drain }
            }
        }
    }

    async fn await_termination(&self) -> StepOutcome {
        let budget = self.settings.terminate;
        match tokio::time::timeout(budget, self.substrate.wait_idle()).await {
            Ok(()) => StepOutcome::Completed,
            Err(_) => {
                tracing::warn!(
                    remaining = self.substrate.receiver_count(),
                    after = ?budget,
                    "Tasks still running after termination timeout"
                );
                StepOutcome::TimedOut { after: budget }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn spawned_tasks_are_counted_until_done() {
        let shutdown = Shutdown::new();
        shutdown.spawn("short", async {});
        shutdown.spawn("forever", std::future::pending());
        assert_eq!(shutdown.receiver_count(), 2);

        tokio::time::timeout(Duration::from_secs(1), async {
            while shutdown.receiver_count() > 1 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        assert_eq!(shutdown.trigger(), 1);
        tokio::time::timeout(Duration::from_secs(1), shutdown.wait_idle())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn trigger_without_tasks_is_harmless() {
        let shutdown = Shutdown::default();
        assert_eq!(shutdown.trigger(), 0);
        shutdown.wait_idle().await;
    }

    #[tokio::test]
    async fn repeated_shutdown_is_a_no_op() {
        let lifecycle = ServiceLifecycle::bind(
            0,
            None,
            axum::Router::new(),
            crate::lifecycle::LifecycleSettings {
                drain: Duration::from_secs(1),
                terminate: Duration::from_secs(1),
            },
        )
        .unwrap();

        let first = lifecycle.shutdown().await;
        assert_eq!(
            first,
            ShutdownReport::Executed {
                unbind: StepOutcome::Completed,
                terminate: StepOutcome::Completed,
                termination: StepOutcome::Completed,
            }
        );
        assert_eq!(lifecycle.shutdown().await, ShutdownReport::AlreadyTriggered);
        assert_eq!(lifecycle.substrate.receiver_count(), 0);
    }
}
