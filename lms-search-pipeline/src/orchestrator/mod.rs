//! Orchestrator module for the indexing pipeline.
//!
//! Index and delete requests travel over a bounded channel to a worker that
//! runs them through the [`IndexMessageHandler`] one at a time.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, instrument, warn};

use crate::errors::PipelineError;
use crate::handlers::IndexMessageHandler;
use crate::messages::IndexMessage;

/// Capability to enqueue work for a background worker.
#[async_trait]
pub trait MessageDispatcher: Send + Sync {
    async fn dispatch(&self, message: IndexMessage) -> Result<(), PipelineError>;
}

/// Configuration for the worker channel.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Size of the message channel buffer.
    pub channel_buffer_size: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            channel_buffer_size: 1000,
        }
    }
}

/// Sending half of the worker channel.
#[derive(Clone)]
pub struct ChannelDispatcher {
    tx: mpsc::Sender<IndexMessage>,
}

#[async_trait]
impl MessageDispatcher for ChannelDispatcher {
    async fn dispatch(&self, message: IndexMessage) -> Result<(), PipelineError> {
        self.tx
            .send(message)
            .await
            .map_err(|e| PipelineError::dispatch(format!("Worker is gone: {}", e)))
    }
}

/// Counts of what a worker did before it stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerSummary {
    pub handled: usize,
    /// Messages whose batch reported engine-side item failures.
    pub degraded: usize,
    pub failed: usize,
    /// Messages still queued when the worker was stopped.
    pub abandoned: usize,
}

impl WorkerSummary {
    /// Every message the worker received or left behind.
    pub fn total(&self) -> usize {
        self.handled + self.failed + self.abandoned
    }

    /// Whether some messages were not handled.
    pub fn is_incomplete(&self) -> bool {
        self.failed > 0 || self.abandoned > 0
    }
}

/// Receives messages and runs them through the handler.
///
/// The worker:
/// - Handles messages strictly in arrival order
/// - Logs and counts failures without stopping
/// - Stops when every dispatcher is dropped or on shutdown
/// - Counts what was left in the channel when stopped early
pub struct IndexWorker {
    rx: mpsc::Receiver<IndexMessage>,
    handler: Arc<IndexMessageHandler>,
    shutdown_tx: broadcast::Sender<()>,
    shutdown_rx: broadcast::Receiver<()>,
}

impl IndexWorker {
    /// Create a worker and the dispatcher feeding it.
    pub fn new(handler: Arc<IndexMessageHandler>) -> (Self, ChannelDispatcher) {
        Self::with_config(handler, WorkerConfig::default())
    }

    /// Create a worker with custom configuration.
    pub fn with_config(
        handler: Arc<IndexMessageHandler>,
        config: WorkerConfig,
    ) -> (Self, ChannelDispatcher) {
        let (tx, rx) = mpsc::channel(config.channel_buffer_size.max(1));
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        (
            Self {
                rx,
                handler,
                shutdown_tx,
                shutdown_rx,
            },
            ChannelDispatcher { tx },
        )
    }

    /// A sender that stops [`run`](Self::run) after the current message.
    ///
    /// A shutdown sent before `run` starts is still observed.
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Run until the channel closes, a shutdown is requested or Ctrl-C.
    #[instrument(skip(self))]
    pub async fn run(mut self) -> WorkerSummary {
        info!("Starting index worker");
        let mut summary = WorkerSummary::default();

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown_rx.recv() => {
                    info!("Shutdown requested");
                    break;
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    break;
                }
                msg = self.rx.recv() => {
                    match msg {
                        Some(message) => self.process(message, &mut summary).await,
                        None => {
                            info!("All dispatchers dropped");
                            break;
                        }
                    }
                }
            }
        }

        self.rx.close();
        summary.abandoned = std::iter::from_fn(|| self.rx.try_recv().ok()).count();
        if summary.abandoned > 0 {
            warn!(
                abandoned = summary.abandoned,
                "Worker stopped with messages still queued"
            );
        }

        info!(
            handled = summary.handled,
            degraded = summary.degraded,
            failed = summary.failed,
            abandoned = summary.abandoned,
            "Index worker stopped"
        );
        summary
    }

    async fn process(&self, message: IndexMessage, summary: &mut WorkerSummary) {
        let kind = message.kind();
        match self.handler.handle(message).await {
            Ok(true) => summary.handled += 1,
            Ok(false) => {
                summary.handled += 1;
                summary.degraded += 1;
            }
            Err(e) => {
                error!(kind, error = %e, "Failed to handle message");
                summary.failed += 1;
            }
        }
    }
}
