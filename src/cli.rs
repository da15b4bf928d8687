use crate::{
    format_duration, load_env_file, merged_environment, parse_bool, parse_duration, read_emails,
    save_results, BasicVerifier, Config, ConfigOverrides, DnsResolver, MailHostResolver, Metrics,
    PipelineReport, RunningStats, VerificationPipeline, VerifierError, ENV_ENABLE_SMTP,
};
use clap::Parser;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Parser, Debug)]
#[command(name = "bulk-email-verifier")]
#[command(about = "Verify large lists of email addresses with a concurrent worker pool")]
#[command(version)]
pub struct Cli {
    #[arg(value_name = "INPUT", help = "Input JSON file with emails (takes precedence over --input)")]
    pub input_path: Option<PathBuf>,

    #[arg(value_name = "OUTPUT", help = "Output JSON file for invalid emails (takes precedence over --output)")]
    pub output_path: Option<PathBuf>,

    #[arg(long, help = "Input JSON file with emails")]
    pub input: Option<PathBuf>,

    #[arg(long, help = "Output JSON file for invalid emails")]
    pub output: Option<PathBuf>,

    #[arg(long, help = "Number of concurrent workers")]
    pub workers: Option<usize>,

    #[arg(long = "batch", help = "Batch size for progress reporting")]
    pub batch_size: Option<usize>,

    #[arg(long = "rate", value_parser = parse_duration, help = "Delay between verifications per worker, e.g. 10ms")]
    pub rate_limit: Option<Duration>,

    #[arg(
        long,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        value_parser = parse_flag,
        help = "Enable SMTP verification (--smtp=false if port 25 is blocked)"
    )]
    pub smtp: Option<bool>,

    #[arg(long, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, help = "JSON configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, default_value = ".env", help = "File of KEY=VALUE defaults")]
    pub env_file: PathBuf,
}

fn parse_flag(value: &str) -> Result<bool, String> {
    parse_bool(value).ok_or_else(|| format!("expected true or false, got {value:?}"))
}

impl Cli {
    /// The explicit overrides given on the command line.
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            input_file: self.input_path.clone().or_else(|| self.input.clone()),
            output_file: self.output_path.clone().or_else(|| self.output.clone()),
            workers: self.workers,
            batch_size: self.batch_size,
            rate_limit: self.rate_limit,
            enable_smtp: self.smtp,
            verbose: self.verbose.then_some(true),
        }
    }
}

/// Final numbers of a completed run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub report: PipelineReport,
    pub output_file: PathBuf,
}

pub struct CliRunner {
    pub config: Config,
    smtp_requested: bool,
}

impl CliRunner {
    /// Resolves configuration from `.env`, the process environment, the
    /// optional config file and the command line.
    pub fn from_cli(args: &Cli) -> Result<Self, VerifierError> {
        let dotenv = load_env_file(&args.env_file)?;
        let env = merged_environment(dotenv, std::env::vars());
        let file = args
            .config
            .as_deref()
            .map(ConfigOverrides::from_json_file)
            .transpose()?;

        Self::from_layers(&env, file.as_ref(), &args.overrides())
    }

    /// Same as [`from_cli`](Self::from_cli) with the layers already loaded.
    pub fn from_layers(
        env: &HashMap<String, String>,
        file: Option<&ConfigOverrides>,
        cli: &ConfigOverrides,
    ) -> Result<Self, VerifierError> {
        let config = Config::resolve(env, file, cli)?;

        let smtp_set_explicitly = cli.enable_smtp.is_some()
            || file.is_some_and(|f| f.enable_smtp.is_some())
            || env
                .get(ENV_ENABLE_SMTP)
                .is_some_and(|v| !v.trim().is_empty());

        Ok(Self {
            smtp_requested: smtp_set_explicitly && config.enable_smtp,
            config,
        })
    }

    pub fn new(config: Config) -> Self {
        Self {
            smtp_requested: config.enable_smtp,
            config,
        }
    }

    /// True when SMTP checks were asked for rather than left at the default.
    pub fn smtp_requested(&self) -> bool {
        self.smtp_requested
    }

    pub async fn run(&self) -> Result<RunSummary, VerifierError> {
        let config = &self.config;

        ensure_parent_dir(&config.output_file).await?;

        let input = config.input_file.clone();
        let emails = tokio::task::spawn_blocking(move || read_emails(&input)).await??;

        info!("Starting email verification for {} emails...", emails.len());
        info!(
            "Configuration: {} workers, batch size {}, rate limit {:?}, SMTP: {}",
            config.workers, config.batch_size, config.rate_limit, config.enable_smtp
        );
        if self.smtp_requested {
            warn!("The built-in verifier does not probe SMTP servers; mailbox checks are skipped");
        } else if config.enable_smtp {
            debug!("SMTP checks left at their default; the built-in verifier skips them");
        }

        let resolver: Arc<dyn MailHostResolver> = Arc::new(DnsResolver::system_or_default());
        let pipeline = VerificationPipeline::new(config.clone(), move |_worker_id: usize| {
            BasicVerifier::new(resolver.clone())
        })
        .with_metrics(Metrics::register());

        let stats = Arc::new(RunningStats::new());
        let mut report = pipeline.run_with_stats(emails, stats.clone()).await?;

        let output = config.output_file.clone();
        let invalid_emails = std::mem::take(&mut report.invalid_emails);
        let (invalid_emails, written) = tokio::task::spawn_blocking(move || {
            save_results(&output, &invalid_emails, &stats).map(|written| (invalid_emails, written))
        })
        .await??;
        report.invalid_emails = invalid_emails;
        report.stats = written;

        let summary = RunSummary {
            report,
            output_file: config.output_file.clone(),
        };
        log_summary(&summary);
        Ok(summary)
    }
}

async fn ensure_parent_dir(path: &Path) -> Result<(), VerifierError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                VerifierError::Io(format!(
                    "failed to create directory {}: {}",
                    parent.display(),
                    e
                ))
            })
        }
        _ => Ok(()),
    }
}

pub fn log_summary(summary: &RunSummary) {
    let stats = &summary.report.stats;

    info!("═══════════════════════════════════════════════════════");
    info!("VERIFICATION COMPLETE");
    info!("   Total emails checked: {}", stats.total_checked);
    info!("   Valid emails: {}", stats.total_valid);
    info!("   Invalid emails: {}", stats.total_invalid);
    info!("   Time elapsed: {}", format_duration(stats.elapsed));
    info!("   Processing rate: {:.2} emails/second", stats.rate());
    info!("   Results saved to: {}", summary.output_file.display());
    info!("═══════════════════════════════════════════════════════");
}

pub fn setup_logging(verbose: bool) -> anyhow::Result<()> {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install log subscriber: {e}"))?;

    Ok(())
}
