//! The verifier boundary and verdict translation
//!
//! Verification itself (syntax rules, MX lookups, SMTP probing, disposable
//! lists) lives behind [`EmailVerifier`]. The pipeline only consumes the
//! structured [`VerificationReport`] it returns and maps it to a [`Verdict`]
//! with [`evaluate_report`].

use crate::VerifierError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Whether the verifier believes a mailbox can receive mail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Reachability {
    Yes,
    No,
    #[default]
    Unknown,
}

/// Result of an SMTP conversation with the domain's mail host.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SmtpReport {
    pub host_exists: bool,
    pub deliverable: bool,
    pub disabled: bool,
}

/// Structured findings for one address.
///
/// `smtp` is `None` when no SMTP check was performed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct VerificationReport {
    pub syntax_valid: bool,
    pub disposable: bool,
    pub suggestion: Option<String>,
    pub has_mx_records: bool,
    pub reachable: Reachability,
    pub smtp: Option<SmtpReport>,
}

impl VerificationReport {
    /// A report with every check passing and no SMTP result.
    pub fn deliverable() -> Self {
        Self {
            syntax_valid: true,
            disposable: false,
            suggestion: None,
            has_mx_records: true,
            reachable: Reachability::Unknown,
            smtp: None,
        }
    }
}

/// Final classification of an address. A reason exists only for invalid ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Valid,
    Invalid(String),
}

impl Verdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, Verdict::Valid)
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Verdict::Valid => None,
            Verdict::Invalid(reason) => Some(reason),
        }
    }
}

impl From<Result<VerificationReport, VerifierError>> for Verdict {
    fn from(result: Result<VerificationReport, VerifierError>) -> Self {
        match result {
            Ok(report) => evaluate_report(&report),
            Err(err) => Verdict::Invalid(err.to_string()),
        }
    }
}

/// Maps a verifier report to a verdict. The first failing check decides the
/// reason, in this order: syntax, disposable, typo suggestion, MX, SMTP
/// (host, deliverability, disabled mailbox), reachability.
pub fn evaluate_report(report: &VerificationReport) -> Verdict {
    if !report.syntax_valid {
        return Verdict::Invalid("invalid email syntax".to_string());
    }

    if report.disposable {
        return Verdict::Invalid("disposable email address".to_string());
    }

    if let Some(suggestion) = report.suggestion.as_deref().filter(|s| !s.is_empty()) {
        return Verdict::Invalid(format!("possible typo, did you mean: {suggestion}"));
    }

    if !report.has_mx_records {
        return Verdict::Invalid("domain has no MX records".to_string());
    }

    if let Some(smtp) = &report.smtp {
        if !smtp.host_exists {
            return Verdict::Invalid("SMTP host does not exist".to_string());
        }
        if !smtp.deliverable {
            return Verdict::Invalid("email is not deliverable".to_string());
        }
        if smtp.disabled {
            return Verdict::Invalid("mailbox is disabled".to_string());
        }
    }

    if report.reachable == Reachability::No {
        return Verdict::Invalid("email is not reachable".to_string());
    }

    Verdict::Valid
}

/// A verification backend. Each worker owns one instance exclusively, so
/// implementations may keep mutable caches without synchronisation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmailVerifier: Send {
    async fn verify(&mut self, email: &str) -> Result<VerificationReport, VerifierError>;
}

/// Builds one verifier per worker.
pub trait VerifierFactory: Send + Sync + 'static {
    type Verifier: EmailVerifier + 'static;

    fn create(&self, worker_id: usize) -> Self::Verifier;
}

impl<F, V> VerifierFactory for F
where
    F: Fn(usize) -> V + Send + Sync + 'static,
    V: EmailVerifier + 'static,
{
    type Verifier = V;

    fn create(&self, worker_id: usize) -> V {
        self(worker_id)
    }
}
