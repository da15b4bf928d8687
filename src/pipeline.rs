//! The verification pipeline
//!
//! One dispatcher task feeds a bounded job queue, `workers` tasks verify in
//! parallel, and a single aggregator task drains the bounded result queue:
//!
//! ```text
//! dispatcher -> [jobs: 2 x workers] -> worker x N -> [results: 2 x workers] -> aggregator
//! ```
//!
//! Shutdown runs front to back. The dispatcher drops the only job sender
//! after the last job; each worker exits once the queue is closed and empty;
//! the driver waits for every worker before dropping its own result sender,
//! which lets the aggregator finish.
//!
//! # Examples
//!
//! ```rust,no_run
//! use bulk_email_verifier::{BasicVerifier, Config, VerificationPipeline};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pipeline = VerificationPipeline::new(Config::default(), |_worker_id: usize| BasicVerifier::offline());
//!     let report = pipeline
//!         .run(vec!["someone@example.com".to_string()])
//!         .await?;
//!     println!("{} invalid", report.invalid_emails.len());
//!     Ok(())
//! }
//! ```

use crate::{
    Config, InvalidEmail, Job, Metrics, ResultAggregator, RunningStats, StatsSnapshot,
    VerificationWorker, VerifierError, VerifierFactory, WorkerStats,
};
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info};

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// Rejected addresses in completion order.
    pub invalid_emails: Vec<InvalidEmail>,
    pub stats: StatsSnapshot,
    pub worker_stats: Vec<WorkerStats>,
}

pub struct VerificationPipeline<F> {
    config: Config,
    factory: Arc<F>,
    metrics: Metrics,
}

impl<F: VerifierFactory> VerificationPipeline<F> {
    pub fn new(config: Config, factory: F) -> Self {
        Self {
            config,
            factory: Arc::new(factory),
            metrics: Metrics::new(),
        }
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Verifies every address and returns once all of them are aggregated.
    pub async fn run(&self, emails: Vec<String>) -> Result<PipelineReport, VerifierError> {
        self.run_with_stats(emails, Arc::new(RunningStats::new()))
            .await
    }

    /// Like [`run`](Self::run), with caller-owned counters that can be read
    /// while the run is in progress.
    pub async fn run_with_stats(
        &self,
        emails: Vec<String>,
        stats: Arc<RunningStats>,
    ) -> Result<PipelineReport, VerifierError> {
        self.config.validate()?;

        let total = emails.len();
        let capacity = self.config.queue_capacity();
        let (job_sender, job_receiver) = mpsc::channel(capacity);
        let (result_sender, result_receiver) = mpsc::channel(capacity);

        let aggregator = ResultAggregator::new(
            total,
            self.config.batch_size,
            stats.clone(),
            self.metrics.clone(),
        );
        let aggregator_handle = tokio::spawn(aggregator.run(result_receiver));

        let shared_jobs = Arc::new(Mutex::new(job_receiver));
        let mut worker_handles = Vec::with_capacity(self.config.workers);
        for id in 0..self.config.workers {
            let worker = VerificationWorker::new(
                id,
                self.factory.create(id),
                &self.config,
                self.metrics.clone(),
            );
            let jobs = shared_jobs.clone();
            let results = result_sender.clone();

            worker_handles.push(tokio::spawn(async move {
                worker.run_with_shared_receiver(jobs, results).await
            }));
        }
        drop(shared_jobs);
        debug!("Spawned {} verification workers", self.config.workers);

        let dispatched = tokio::spawn(dispatch_jobs(emails, job_sender)).await?;

        let mut worker_stats = Vec::with_capacity(worker_handles.len());
        for joined in join_all(worker_handles).await {
            worker_stats.push(joined?);
        }

        // Every worker has exited, so no one else can send.
        drop(result_sender);

        let invalid_emails = aggregator_handle.await?;
        let stats = stats.snapshot();

        if dispatched != total || stats.total_checked != total as u64 {
            return Err(VerifierError::WorkerFailed(format!(
                "{} of {} emails dispatched, {} aggregated",
                dispatched, total, stats.total_checked
            )));
        }

        info!(
            "Pipeline finished: {} checked, {} valid, {} invalid",
            stats.total_checked, stats.total_valid, stats.total_invalid
        );

        Ok(PipelineReport {
            invalid_emails,
            stats,
            worker_stats,
        })
    }
}

/// Enqueues one job per address in input order, then closes the queue by
/// dropping the sender. Returns how many jobs were enqueued.
pub async fn dispatch_jobs(emails: Vec<String>, jobs: mpsc::Sender<Job>) -> usize {
    let mut dispatched = 0;

    for (index, email) in emails.into_iter().enumerate() {
        if jobs.send(Job { index, email }).await.is_err() {
            error!("Job queue closed early; {} jobs dispatched", dispatched);
            break;
        }
        dispatched += 1;
    }

    dispatched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EmailVerifier, VerificationReport};
    use async_trait::async_trait;
    use std::time::Duration;

    struct AlwaysValid;

    #[async_trait]
    impl EmailVerifier for AlwaysValid {
        async fn verify(&mut self, _email: &str) -> Result<VerificationReport, VerifierError> {
            tokio::task::yield_now().await;
            Ok(VerificationReport::deliverable())
        }
    }

    fn config(workers: usize) -> Config {
        Config {
            workers,
            batch_size: 10,
            rate_limit: Duration::ZERO,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_dispatch_preserves_input_order() {
        let (tx, mut rx) = mpsc::channel(8);
        let emails: Vec<String> = (0..5).map(|i| format!("u{i}@example.com")).collect();

        let dispatched = dispatch_jobs(emails, tx).await;
        assert_eq!(dispatched, 5);

        let mut indices = Vec::new();
        while let Some(job) = rx.recv().await {
            assert_eq!(job.email, format!("u{}@example.com", job.index));
            indices.push(job.index);
        }
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_dispatch_stops_when_workers_are_gone() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let dispatched = dispatch_jobs(vec!["a@example.com".to_string()], tx).await;
        assert_eq!(dispatched, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_every_job_yields_one_outcome() {
        let pipeline = VerificationPipeline::new(config(8), |_: usize| AlwaysValid);
        let emails: Vec<String> = (0..500).map(|i| format!("u{i}@example.com")).collect();

        let report = pipeline.run(emails).await.unwrap();
        assert_eq!(report.stats.total_checked, 500);
        assert_eq!(report.stats.total_valid, 500);
        assert!(report.invalid_emails.is_empty());
        assert_eq!(report.worker_stats.len(), 8);
        assert_eq!(
            report
                .worker_stats
                .iter()
                .map(|w| w.processed_count)
                .sum::<usize>(),
            500
        );
    }

    #[tokio::test]
    async fn test_more_workers_than_jobs() {
        let pipeline = VerificationPipeline::new(config(16), |_: usize| AlwaysValid);
        let report = pipeline
            .run(vec!["solo@example.com".to_string()])
            .await
            .unwrap();
        assert_eq!(report.stats.total_checked, 1);
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let pipeline = VerificationPipeline::new(config(0), |_: usize| AlwaysValid);
        let err = pipeline.run(Vec::new()).await.unwrap_err();
        assert!(matches!(err, VerifierError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_caller_can_watch_live_stats() {
        let pipeline = VerificationPipeline::new(config(2), |_: usize| AlwaysValid);
        let stats = Arc::new(RunningStats::new());
        let emails: Vec<String> = (0..20).map(|i| format!("u{i}@example.com")).collect();

        pipeline
            .run_with_stats(emails, stats.clone())
            .await
            .unwrap();
        assert_eq!(stats.total_checked(), 20);
    }
}
