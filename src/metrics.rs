use metrics::{register_counter, register_histogram, Counter, Histogram};
use std::time::Duration;

pub const EMAILS_CHECKED: &str = "bulk_email_verifier_emails_checked_total";
pub const EMAILS_VALID: &str = "bulk_email_verifier_emails_valid_total";
pub const EMAILS_INVALID: &str = "bulk_email_verifier_emails_invalid_total";
pub const VERIFICATION_ERRORS: &str = "bulk_email_verifier_verification_errors_total";
pub const VERIFICATION_DURATION: &str = "bulk_email_verifier_verification_duration_seconds";

/// Metric handles shared by workers and the aggregator.
///
/// `Metrics::new()` gives no-op handles; [`Metrics::register`] binds them to
/// whichever recorder the host process installed.
#[derive(Clone)]
pub struct Metrics {
    pub emails_checked: Counter,
    pub emails_valid: Counter,
    pub emails_invalid: Counter,
    pub verification_errors: Counter,
    pub verification_duration: Histogram,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            emails_checked: Counter::noop(),
            emails_valid: Counter::noop(),
            emails_invalid: Counter::noop(),
            verification_errors: Counter::noop(),
            verification_duration: Histogram::noop(),
        }
    }

    pub fn register() -> Self {
        Self {
            emails_checked: register_counter!(EMAILS_CHECKED),
            emails_valid: register_counter!(EMAILS_VALID),
            emails_invalid: register_counter!(EMAILS_INVALID),
            verification_errors: register_counter!(VERIFICATION_ERRORS),
            verification_duration: register_histogram!(VERIFICATION_DURATION),
        }
    }

    pub fn record_verification(&self, duration: Duration, errored: bool) {
        self.verification_duration.record(duration.as_secs_f64());
        if errored {
            self.verification_errors.increment(1);
        }
    }

    pub fn record_outcome(&self, valid: bool) {
        self.emails_checked.increment(1);
        if valid {
            self.emails_valid.increment(1);
        } else {
            self.emails_invalid.increment(1);
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
