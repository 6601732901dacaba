//! Polling ingest worker
//!
//! External task-runner seam: claims queued uploads from the database with
//! `FOR UPDATE SKIP LOCKED` and dispatches each to the pipeline. Distinct
//! uploads may run concurrently (bounded by a semaphore); row processing
//! within one run stays sequential so last-write-wins ordering holds.

use std::sync::Arc;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};

use super::pipeline::IngestPipeline;
use crate::config::IngestConfig;
use crate::db::uploads::UploadStore;

/// Handle for stopping the worker loop.
pub struct WorkerHandle {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl WorkerHandle {
    /// Signal shutdown and wait for the loop to exit. In-flight runs
    /// finish on their own; a re-delivered upload is a no-op anyway.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.handle.await;
    }
}

/// Worker that polls for queued uploads and runs the pipeline.
pub struct IngestWorker {
    pipeline: Arc<IngestPipeline>,
    uploads: UploadStore,
    poll_interval: Duration,
    max_concurrent: usize,
}

impl IngestWorker {
    pub fn new(pipeline: Arc<IngestPipeline>, uploads: UploadStore, config: &IngestConfig) -> Self {
        Self {
            pipeline,
            uploads,
            poll_interval: Duration::from_millis(config.poll_interval_ms.max(10)),
            max_concurrent: config.max_concurrent.max(1),
        }
    }

    /// Spawn the polling loop onto the runtime.
    pub fn spawn(self) -> WorkerHandle {
        let (shutdown, receiver) = watch::channel(false);
        let handle = tokio::spawn(self.run_loop(receiver));
        WorkerHandle { shutdown, handle }
    }

    async fn run_loop(self, mut shutdown: watch::Receiver<bool>) {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            max_concurrent = self.max_concurrent,
            "ingest worker started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => self.drain_queue(&semaphore).await,
                _ = shutdown.changed() => {
                    tracing::info!("ingest worker shutting down");
                    break;
                },
            }
        }
    }

    /// Claim and dispatch queued uploads until the queue is empty or all
    /// permits are in use.
    async fn drain_queue(&self, semaphore: &Arc<Semaphore>) {
        loop {
            let Ok(permit) = semaphore.clone().try_acquire_owned() else {
                break;
            };

            match self.uploads.claim_next_queued().await {
                Ok(Some(upload_id)) => {
                    let pipeline = self.pipeline.clone();
                    tokio::spawn(async move {
                        let _permit = permit;
                        if let Err(err) = pipeline.run(upload_id).await {
                            tracing::error!(
                                %upload_id,
                                error = ?err,
                                "ingestion run could not record its outcome"
                            );
                        }
                    });
                },
                Ok(None) => break,
                Err(err) => {
                    tracing::error!(error = ?err, "failed to claim queued upload");
                    break;
                },
            }
        }
    }
}
