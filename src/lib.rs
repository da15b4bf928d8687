//! # Bulk Email Verifier
//!
//! Verifies millions of email addresses with a fixed pool of concurrent
//! workers and writes the rejected ones, with a reason each, to a JSON
//! report. Memory stays bounded on both ends: the input document is decoded
//! incrementally and the report is written record by record.
//!
//! ## Pipeline
//!
//! | Stage | Tasks | Queue out | Notes |
//! |-------|-------|-----------|-------|
//! | **Reader** | blocking thread | in-memory list | `{"emails": [...]}`, other members skipped |
//! | **Dispatcher** | 1 | jobs (2 x workers) | input order preserved |
//! | **Workers** | N | results (2 x workers) | own verifier each, per-worker rate limit |
//! | **Aggregator** | 1 | - | atomic counters, invalid list, progress lines |
//! | **Writer** | blocking thread | output file | buffered, incremental |
//!
//! Bounded queues give backpressure: a slow verifier stalls the dispatcher and
//! a slow aggregator stalls the workers, rather than letting buffers grow.
//!
//! ## Verdicts
//!
//! A verifier returns a [`VerificationReport`]; [`evaluate_report`] turns it
//! into a [`Verdict`]. The first failing check wins: syntax, disposable
//! domain, typo suggestion, MX records, SMTP (host, deliverability, disabled
//! mailbox), then reachability. Verifier errors become invalid verdicts with
//! the error text as the reason, so one bad address never stops a run.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bulk_email_verifier::{
//!     read_emails, write_results, BasicVerifier, Config, DnsResolver, MailHostResolver,
//!     VerificationPipeline,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let emails = read_emails(&config.input_file)?;
//!
//!     let resolver: Arc<dyn MailHostResolver> = Arc::new(DnsResolver::system_or_default());
//!     let pipeline = VerificationPipeline::new(config.clone(), move |_worker_id: usize| {
//!         BasicVerifier::new(resolver.clone())
//!     });
//!     let report = pipeline.run(emails).await?;
//!
//!     write_results(&config.output_file, &report.invalid_emails, &report.stats)?;
//!     Ok(())
//! }
//! ```
//!
//! ## CLI Usage
//!
//! ```bash
//! bulk-email-verifier --input data/data.json --output data/invalid_emails.json \
//!     --workers 32 --rate 20ms --smtp=false
//! ```
//!
//! Every flag can also come from the environment (`INPUT_FILE`, `OUTPUT_FILE`,
//! `WORKERS`, `BATCH_SIZE`, `RATE_LIMIT`, `ENABLE_SMTP`, `VERBOSE`), a `.env`
//! file, or a JSON file passed with `--config`.

/// Configuration and settings for a verification run
pub mod config;

/// Error types and error handling utilities
pub mod error;

/// Verifier boundary and verdict translation
pub mod verifier;

/// Built-in verifier used by the CLI
pub mod basic_verifier;

/// Streaming input decoding
pub mod reader;

/// Streaming report output
pub mod writer;

/// Worker tasks that run verifications
pub mod worker;

/// Single consumer of verification outcomes
pub mod aggregator;

/// Running counters and progress math
pub mod progress;

/// Dispatcher and pipeline driver
pub mod pipeline;

/// Command-line interface implementation
pub mod cli;

/// Metric handles for verification throughput
pub mod metrics;

/// Utility functions and helpers
pub mod utils;

#[cfg(test)]
mod tests;

pub use aggregator::*;
pub use basic_verifier::*;
pub use cli::*;
pub use config::*;
pub use error::*;
pub use metrics::*;
pub use pipeline::*;
pub use progress::*;
pub use reader::*;
pub use utils::*;
pub use verifier::*;
pub use worker::*;
pub use writer::*;
