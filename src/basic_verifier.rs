//! Built-in verifier used by the command-line tool
//!
//! Performs the checks that need no mail-server conversation: structural
//! syntax, a bundled disposable-domain list, common-provider typos, and a
//! DNS lookup for a mail host (MX, falling back to A/AAAA). SMTP probing is
//! never done, so reports always carry `smtp: None` and `reachable: Unknown`.

use crate::{EmailVerifier, Reachability, VerificationReport, VerifierError};
use async_trait::async_trait;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::proto::op::ResponseCode;
use hickory_resolver::TokioAsyncResolver;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

pub const DNS_TIMEOUT: Duration = Duration::from_secs(5);

pub const DISPOSABLE_DOMAINS: &[&str] = &[
    "10minutemail.com",
    "dispostable.com",
    "getnada.com",
    "guerrillamail.com",
    "mailinator.com",
    "maildrop.cc",
    "sharklasers.com",
    "temp-mail.org",
    "tempmail.com",
    "throwawaymail.com",
    "trashmail.com",
    "yopmail.com",
];

/// Misspelt domain -> intended domain.
pub const DOMAIN_TYPOS: &[(&str, &str)] = &[
    ("gmial.com", "gmail.com"),
    ("gmai.com", "gmail.com"),
    ("gamil.com", "gmail.com"),
    ("gnail.com", "gmail.com"),
    ("gmail.co", "gmail.com"),
    ("hotmial.com", "hotmail.com"),
    ("hotmal.com", "hotmail.com"),
    ("hotmail.co", "hotmail.com"),
    ("yaho.com", "yahoo.com"),
    ("yahooo.com", "yahoo.com"),
    ("outlok.com", "outlook.com"),
    ("outlook.co", "outlook.com"),
    ("iclod.com", "icloud.com"),
];

/// Answers whether a domain has somewhere to deliver mail.
///
/// `Ok(false)` means the DNS gave a definitive negative answer (NXDOMAIN, or
/// no MX and no address records). Anything inconclusive is an `Err`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MailHostResolver: Send + Sync {
    async fn has_mail_host(&self, domain: &str) -> Result<bool, VerifierError>;
}

/// [`MailHostResolver`] backed by an async DNS resolver. Cheap to clone; all
/// clones share one cache and connection pool.
#[derive(Clone)]
pub struct DnsResolver {
    resolver: TokioAsyncResolver,
}

impl DnsResolver {
    /// Uses the host's resolver configuration (`/etc/resolv.conf` and friends).
    pub fn from_system_conf() -> Result<Self, VerifierError> {
        let resolver = TokioAsyncResolver::tokio_from_system_conf().map_err(|e| {
            VerifierError::Configuration(format!("failed to read system DNS config: {e}"))
        })?;
        Ok(Self { resolver })
    }

    pub fn with_config(config: ResolverConfig, opts: ResolverOpts) -> Self {
        Self {
            resolver: TokioAsyncResolver::tokio(config, opts),
        }
    }

    /// System configuration when readable, the library's public default otherwise.
    pub fn system_or_default() -> Self {
        Self::from_system_conf().unwrap_or_else(|e| {
            warn!("{}; falling back to the default public resolvers", e);
            Self::with_config(ResolverConfig::default(), ResolverOpts::default())
        })
    }
}

#[async_trait]
impl MailHostResolver for DnsResolver {
    async fn has_mail_host(&self, domain: &str) -> Result<bool, VerifierError> {
        match self.resolver.mx_lookup(domain).await {
            Ok(mx) if mx.iter().next().is_some() => return Ok(true),
            Ok(_) => {}
            Err(e) => match no_records_code(&e) {
                Some(ResponseCode::NXDomain) => return Ok(false),
                Some(_) => {}
                None => {
                    return Err(VerifierError::Verification(format!(
                        "MX lookup for {domain} failed: {e}"
                    )))
                }
            },
        }

        // No MX: an address record makes the domain its own mail host.
        match self.resolver.lookup_ip(domain).await {
            Ok(ips) => Ok(ips.iter().next().is_some()),
            Err(e) if no_records_code(&e).is_some() => Ok(false),
            Err(e) => Err(VerifierError::Verification(format!(
                "address lookup for {domain} failed: {e}"
            ))),
        }
    }
}

/// Response code of a negative answer, or `None` for transport and server failures.
fn no_records_code(err: &ResolveError) -> Option<ResponseCode> {
    match err.kind() {
        ResolveErrorKind::NoRecordsFound { response_code, .. } => Some(*response_code),
        _ => None,
    }
}

pub struct BasicVerifier {
    disposable_domains: HashSet<String>,
    typos: HashMap<String, String>,
    resolver: Option<Arc<dyn MailHostResolver>>,
    lookup_timeout: Duration,
    domain_cache: HashMap<String, bool>,
}

impl BasicVerifier {
    pub fn new(resolver: Arc<dyn MailHostResolver>) -> Self {
        Self {
            disposable_domains: DISPOSABLE_DOMAINS.iter().map(|d| d.to_string()).collect(),
            typos: DOMAIN_TYPOS
                .iter()
                .map(|(typo, fix)| (typo.to_string(), fix.to_string()))
                .collect(),
            resolver: Some(resolver),
            lookup_timeout: DNS_TIMEOUT,
            domain_cache: HashMap::new(),
        }
    }

    /// Skips DNS and treats every domain as having a mail host.
    pub fn offline() -> Self {
        Self {
            disposable_domains: DISPOSABLE_DOMAINS.iter().map(|d| d.to_string()).collect(),
            typos: DOMAIN_TYPOS
                .iter()
                .map(|(typo, fix)| (typo.to_string(), fix.to_string()))
                .collect(),
            resolver: None,
            lookup_timeout: DNS_TIMEOUT,
            domain_cache: HashMap::new(),
        }
    }

    pub fn with_disposable_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.disposable_domains
            .extend(domains.into_iter().map(|d| d.into().to_ascii_lowercase()));
        self
    }

    pub fn with_lookup_timeout(mut self, lookup_timeout: Duration) -> Self {
        self.lookup_timeout = lookup_timeout;
        self
    }

    /// Only definitive answers are cached; errors and timeouts are retried
    /// on the next address for the same domain.
    async fn domain_accepts_mail(&mut self, domain: &str) -> Result<bool, VerifierError> {
        let Some(resolver) = &self.resolver else {
            return Ok(true);
        };
        if let Some(known) = self.domain_cache.get(domain) {
            return Ok(*known);
        }

        let found = match timeout(self.lookup_timeout, resolver.has_mail_host(domain)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(VerifierError::Verification(format!(
                    "DNS lookup for {domain} timed out after {:?}",
                    self.lookup_timeout
                )))
            }
        };

        debug!("Domain {} has mail host: {}", domain, found);
        self.domain_cache.insert(domain.to_string(), found);
        Ok(found)
    }
}

#[async_trait]
impl EmailVerifier for BasicVerifier {
    async fn verify(&mut self, email: &str) -> Result<VerificationReport, VerifierError> {
        let mut report = VerificationReport {
            syntax_valid: false,
            disposable: false,
            suggestion: None,
            has_mx_records: false,
            reachable: Reachability::Unknown,
            smtp: None,
        };

        let Some(domain) = split_domain(email) else {
            return Ok(report);
        };
        report.syntax_valid = true;

        let domain = domain.to_ascii_lowercase();
        report.disposable = self.disposable_domains.contains(&domain);
        report.suggestion = self.typos.get(&domain).cloned();
        if report.disposable || report.suggestion.is_some() {
            return Ok(report);
        }

        report.has_mx_records = self.domain_accepts_mail(&domain).await?;
        Ok(report)
    }
}

/// Returns the domain of a structurally valid address.
///
/// Checks only the shape: one `@`, length limits, a dotted domain made of
/// alphanumeric/hyphen labels, and a local part without whitespace or
/// misplaced dots.
pub fn split_domain(email: &str) -> Option<&str> {
    if email.len() > 254 {
        return None;
    }

    let (local, domain) = email.split_once('@')?;
    if domain.contains('@') {
        return None;
    }

    let local_ok = !local.is_empty()
        && local.len() <= 64
        && !local.starts_with('.')
        && !local.ends_with('.')
        && !local.contains("..")
        && !local.chars().any(|c| c.is_whitespace() || c.is_control());
    if !local_ok {
        return None;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    let domain_ok = domain.len() <= 253
        && labels.len() >= 2
        && labels.iter().all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_alphanumeric() || c == '-')
        });

    domain_ok.then_some(domain)
}
