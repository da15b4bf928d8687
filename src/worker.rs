use crate::{Config, EmailVerifier, Metrics, Verdict};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};

/// One address to verify. `index` is its position in the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub index: usize,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationOutcome {
    pub index: usize,
    pub email: String,
    pub verdict: Verdict,
}

/// A pool member. It owns its verifier outright; nothing else touches it.
pub struct VerificationWorker<V> {
    id: usize,
    verifier: V,
    rate_limit: Duration,
    verbose: bool,
    metrics: Metrics,
    processed_count: usize,
    error_count: usize,
}

impl<V: EmailVerifier> VerificationWorker<V> {
    pub fn new(id: usize, verifier: V, config: &Config, metrics: Metrics) -> Self {
        Self {
            id,
            verifier,
            rate_limit: config.rate_limit,
            verbose: config.verbose,
            metrics,
            processed_count: 0,
            error_count: 0,
        }
    }

    /// Pulls jobs until the queue is closed and drained, sending exactly one
    /// outcome per job.
    pub async fn run_with_shared_receiver(
        mut self,
        jobs: Arc<Mutex<mpsc::Receiver<Job>>>,
        results: mpsc::Sender<VerificationOutcome>,
    ) -> WorkerStats {
        debug!("Starting verification worker {}", self.id);

        loop {
            let job = {
                let mut receiver = jobs.lock().await;
                receiver.recv().await
            };

            let Some(job) = job else {
                break;
            };

            let outcome = self.process_job(job).await;
            self.processed_count += 1;

            if let Err(e) = results.send(outcome).await {
                error!("Worker {} failed to send result: {}", self.id, e);
                break;
            }

            if !self.rate_limit.is_zero() {
                sleep(self.rate_limit).await;
            }
        }

        debug!(
            "Verification worker {} stopped after {} jobs ({} errors)",
            self.id, self.processed_count, self.error_count
        );
        self.stats()
    }

    async fn process_job(&mut self, job: Job) -> VerificationOutcome {
        let started = Instant::now();
        let result = self.verifier.verify(&job.email).await;
        self.metrics
            .record_verification(started.elapsed(), result.is_err());

        if let Err(e) = &result {
            self.error_count += 1;
            warn!("Worker {} could not verify {}: {}", self.id, job.email, e);
        }

        let verdict = Verdict::from(result);
        if self.verbose {
            match &verdict {
                Verdict::Valid => info!("  valid   {}", job.email),
                Verdict::Invalid(reason) => info!("  invalid {} - {}", job.email, reason),
            }
        }

        VerificationOutcome {
            index: job.index,
            email: job.email,
            verdict,
        }
    }

    pub fn stats(&self) -> WorkerStats {
        WorkerStats {
            id: self.id,
            processed_count: self.processed_count,
            error_count: self.error_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerStats {
    pub id: usize,
    pub processed_count: usize,
    pub error_count: usize,
}
