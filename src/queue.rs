//! Notification dispatch: a bounded job queue and the worker draining it
//!
//! Enqueueing never waits. If the queue is full or the worker is gone the job
//! is dropped with a warning and the request that produced it still succeeds.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::jobs::Job;
use crate::mail::Mailer;

/// A job together with its queue bookkeeping
#[derive(Debug, Clone)]
pub struct Envelope {
    pub id: Uuid,
    pub enqueued_at: DateTime<Utc>,
    pub job: Job,
}

/// Sending half of the job queue
#[derive(Clone)]
pub struct Queue {
    tx: mpsc::Sender<Envelope>,
}

impl Queue {
    /// Create a queue holding at most `capacity` pending jobs
    pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<Envelope>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Hand a job to the worker without waiting.
    ///
    /// Returns the envelope id when the job was accepted.
    pub fn enqueue(&self, job: Job) -> Option<Uuid> {
        let key = job.key();
        let envelope = Envelope {
            id: Uuid::new_v4(),
            enqueued_at: Utc::now(),
            job,
        };
        let id = envelope.id;

        match self.tx.try_send(envelope) {
            Ok(()) => {
                tracing::debug!(job = key, %id, "job enqueued");
                Some(id)
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(job = key, "job queue is full, dropping job");
                None
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::warn!(job = key, "job worker stopped, dropping job");
                None
            }
        }
    }
}

/// Consumes queued jobs and runs them against a mailer
pub struct Worker<M> {
    rx: mpsc::Receiver<Envelope>,
    mailer: M,
    max_attempts: u32,
    backoff: Duration,
}

impl<M: Mailer> Worker<M> {
    pub fn new(rx: mpsc::Receiver<Envelope>, mailer: M, max_attempts: u32) -> Self {
        Self {
            rx,
            mailer,
            max_attempts: max_attempts.max(1),
            backoff: Duration::from_millis(500),
        }
    }

    /// Base delay between attempts; grows linearly with the attempt number
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Run until every [`Queue`] handle is dropped
    pub async fn run(mut self) {
        tracing::info!("job worker started");
        while let Some(envelope) = self.rx.recv().await {
            self.process(envelope).await;
        }
        tracing::info!("job worker stopped");
    }

    /// Run one job, retrying failures up to `max_attempts` times.
    /// Returns whether the job eventually succeeded.
    pub async fn process(&self, envelope: Envelope) -> bool {
        let key = envelope.job.key();
        for attempt in 1..=self.max_attempts {
            match envelope.job.run(&self.mailer).await {
                Ok(()) => {
                    tracing::info!(job = key, id = %envelope.id, attempt, "job completed");
                    return true;
                }
                Err(e) if attempt < self.max_attempts => {
                    tracing::warn!(job = key, id = %envelope.id, attempt, "job failed, retrying: {}", e);
                    tokio::time::sleep(self.backoff * attempt).await;
                }
                Err(e) => {
                    tracing::error!(job = key, id = %envelope.id, attempt, "job failed, giving up: {}", e);
                }
            }
        }
        false
    }
}
