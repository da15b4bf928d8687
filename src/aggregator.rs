use crate::{
    format_duration, should_report, InvalidEmail, Metrics, RunningStats, Verdict,
    VerificationOutcome,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::info;

/// The single consumer of worker results.
///
/// Counters go through the shared [`RunningStats`]; the invalid list is owned
/// here and only handed out once the result queue has been drained.
pub struct ResultAggregator {
    total: usize,
    batch_size: usize,
    stats: Arc<RunningStats>,
    metrics: Metrics,
    invalid_emails: Vec<InvalidEmail>,
    last_report: Instant,
    reports_emitted: usize,
}

impl ResultAggregator {
    pub fn new(total: usize, batch_size: usize, stats: Arc<RunningStats>, metrics: Metrics) -> Self {
        Self {
            total,
            batch_size,
            stats,
            metrics,
            invalid_emails: Vec::new(),
            last_report: Instant::now(),
            reports_emitted: 0,
        }
    }

    /// Consumes outcomes until every sender is gone, then returns the invalid list.
    pub async fn run(mut self, mut results: mpsc::Receiver<VerificationOutcome>) -> Vec<InvalidEmail> {
        while let Some(outcome) = results.recv().await {
            self.aggregate(outcome);
        }
        self.invalid_emails
    }

    pub fn aggregate(&mut self, outcome: VerificationOutcome) {
        let valid = outcome.verdict.is_valid();
        if let Verdict::Invalid(reason) = outcome.verdict {
            self.invalid_emails.push(InvalidEmail {
                email: outcome.email,
                reason,
            });
        }

        let checked = self.stats.record(valid);
        self.metrics.record_outcome(valid);

        if should_report(checked, self.batch_size, self.last_report.elapsed()) {
            self.report_progress();
            self.last_report = Instant::now();
        }
    }

    fn report_progress(&mut self) {
        let progress = self.stats.progress(self.total);
        let eta = progress
            .eta
            .map(format_duration)
            .unwrap_or_else(|| "unknown".to_string());

        info!(
            "Progress: {}/{} ({:.1}%) | Rate: {:.1}/s | ETA: {} | Invalid: {}",
            progress.checked, progress.total, progress.percent, progress.rate, eta, progress.invalid
        );
        self.reports_emitted += 1;
    }

    #[cfg(test)]
    fn invalid_emails(&self) -> &[InvalidEmail] {
        &self.invalid_emails
    }

    #[cfg(test)]
    fn reports_emitted(&self) -> usize {
        self.reports_emitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn outcome(index: usize, verdict: Verdict) -> VerificationOutcome {
        VerificationOutcome {
            index,
            email: format!("user{index}@example.com"),
            verdict,
        }
    }

    #[test]
    fn test_counters_match_invalid_list() {
        let stats = Arc::new(RunningStats::new());
        let mut aggregator = ResultAggregator::new(10, 1000, stats.clone(), Metrics::new());

        for i in 0..10 {
            let verdict = if i % 3 == 0 {
                Verdict::Invalid("email is not deliverable".to_string())
            } else {
                Verdict::Valid
            };
            aggregator.aggregate(outcome(i, verdict));

            let snapshot = stats.snapshot();
            assert_eq!(
                snapshot.total_checked,
                snapshot.total_valid + snapshot.total_invalid
            );
            assert_eq!(
                snapshot.total_invalid as usize,
                aggregator.invalid_emails().len()
            );
        }

        assert_eq!(stats.total_checked(), 10);
        assert_eq!(stats.total_invalid(), 4);
        assert_eq!(aggregator.invalid_emails()[1].email, "user3@example.com");
        assert_eq!(aggregator.invalid_emails()[1].reason, "email is not deliverable");
    }

    #[test]
    fn test_progress_on_every_full_batch() {
        let stats = Arc::new(RunningStats::new());
        let mut aggregator = ResultAggregator::new(25, 10, stats, Metrics::new());

        for i in 0..25 {
            aggregator.aggregate(outcome(i, Verdict::Valid));
        }
        assert_eq!(aggregator.reports_emitted(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_after_quiet_interval() {
        let stats = Arc::new(RunningStats::new());
        let mut aggregator = ResultAggregator::new(100, 1000, stats, Metrics::new());

        aggregator.aggregate(outcome(0, Verdict::Valid));
        assert_eq!(aggregator.reports_emitted(), 0);

        tokio::time::advance(Duration::from_secs(6)).await;
        aggregator.aggregate(outcome(1, Verdict::Valid));
        assert_eq!(aggregator.reports_emitted(), 1);

        aggregator.aggregate(outcome(2, Verdict::Valid));
        assert_eq!(aggregator.reports_emitted(), 1);
    }

    #[tokio::test]
    async fn test_run_drains_until_closed() {
        let stats = Arc::new(RunningStats::new());
        let aggregator = ResultAggregator::new(3, 1000, stats.clone(), Metrics::new());
        let (tx, rx) = mpsc::channel(4);

        tx.send(outcome(0, Verdict::Valid)).await.unwrap();
        tx.send(outcome(1, Verdict::Invalid("invalid email syntax".to_string())))
            .await
            .unwrap();
        tx.send(outcome(2, Verdict::Valid)).await.unwrap();
        drop(tx);

        let invalid = aggregator.run(rx).await;
        assert_eq!(invalid.len(), 1);
        assert_eq!(invalid[0].email, "user1@example.com");
        assert_eq!(stats.total_checked(), 3);
    }
}
