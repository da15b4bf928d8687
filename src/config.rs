//! Configuration management with serde serialization/deserialization
//!
//! A run is driven by one immutable [`Config`]. It is produced by
//! [`Config::resolve`], which layers defaults, environment variables, an
//! optional JSON config file and command-line overrides, in that order.

use crate::{parse_bool, parse_duration, VerifierError};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DATA_DIR: &str = "data";

pub const ENV_INPUT_FILE: &str = "INPUT_FILE";
pub const ENV_OUTPUT_FILE: &str = "OUTPUT_FILE";
pub const ENV_WORKERS: &str = "WORKERS";
pub const ENV_BATCH_SIZE: &str = "BATCH_SIZE";
pub const ENV_RATE_LIMIT: &str = "RATE_LIMIT";
pub const ENV_ENABLE_SMTP: &str = "ENABLE_SMTP";
pub const ENV_VERBOSE: &str = "VERBOSE";

/// Main configuration structure for a verification run
///
/// # Examples
///
/// ```rust
/// use bulk_email_verifier::Config;
/// use std::time::Duration;
///
/// let config = Config {
///     workers: 4,
///     rate_limit: Duration::ZERO,
///     ..Default::default()
/// };
/// assert_eq!(config.batch_size, 1000);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// JSON document holding the `emails` array (default: `data/data.json`)
    pub input_file: PathBuf,

    /// Where the invalid-email report is written (default: `data/invalid_emails.json`)
    pub output_file: PathBuf,

    /// Number of concurrent verification workers (default: 2 x CPU count)
    ///
    /// Each worker owns its own verifier, so memory and open connections grow
    /// linearly with this value.
    pub workers: usize,

    /// Progress is logged every time this many addresses have been checked (default: 1000)
    pub batch_size: usize,

    /// Delay each worker waits after every verification (default: 10ms)
    ///
    /// Workers throttle independently, so the aggregate ceiling is roughly
    /// `workers / rate_limit` verifications per second. Zero disables it.
    pub rate_limit: Duration,

    /// Ask the verifier to probe mailboxes over SMTP (default: true)
    pub enable_smtp: bool,

    /// Log every address as it is verified (default: false)
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_file: Path::new(DATA_DIR).join("data.json"),
            output_file: Path::new(DATA_DIR).join("invalid_emails.json"),
            workers: num_cpus::get() * 2,
            batch_size: 1000,
            rate_limit: Duration::from_millis(10),
            enable_smtp: true,
            verbose: false,
        }
    }
}

/// A partial configuration layer.
///
/// Used both for the JSON config file and for command-line overrides; any
/// field left as `None` falls through to the layer below.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigOverrides {
    pub input_file: Option<PathBuf>,
    pub output_file: Option<PathBuf>,
    pub workers: Option<usize>,
    pub batch_size: Option<usize>,
    #[serde(deserialize_with = "deserialize_optional_duration")]
    pub rate_limit: Option<Duration>,
    pub enable_smtp: Option<bool>,
    pub verbose: Option<bool>,
}

impl ConfigOverrides {
    pub fn from_json_file(path: &Path) -> Result<Self, VerifierError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            VerifierError::Io(format!("failed to read config {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            VerifierError::Configuration(format!("invalid config {}: {}", path.display(), e))
        })
    }

    fn apply_to(&self, config: &mut Config) {
        if let Some(input_file) = &self.input_file {
            config.input_file = input_file.clone();
        }
        if let Some(output_file) = &self.output_file {
            config.output_file = output_file.clone();
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(rate_limit) = self.rate_limit {
            config.rate_limit = rate_limit;
        }
        if let Some(enable_smtp) = self.enable_smtp {
            config.enable_smtp = enable_smtp;
        }
        if let Some(verbose) = self.verbose {
            config.verbose = verbose;
        }
    }
}

fn deserialize_optional_duration<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.map(|value| parse_duration(&value).map_err(serde::de::Error::custom))
        .transpose()
}

impl Config {
    /// Builds the run configuration from its layers.
    ///
    /// Precedence, lowest to highest: defaults, `env`, `file`, `cli`.
    /// Environment values that are set but unparseable are rejected rather
    /// than silently replaced with defaults.
    pub fn resolve(
        env: &HashMap<String, String>,
        file: Option<&ConfigOverrides>,
        cli: &ConfigOverrides,
    ) -> Result<Self, VerifierError> {
        let mut config = Config::default();

        overrides_from_env(env)?.apply_to(&mut config);
        if let Some(file) = file {
            file.apply_to(&mut config);
        }
        cli.apply_to(&mut config);

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), VerifierError> {
        if self.workers == 0 {
            return Err(VerifierError::Configuration(
                "worker count must be greater than 0".to_string(),
            ));
        }

        if self.batch_size == 0 {
            return Err(VerifierError::Configuration(
                "batch size must be greater than 0".to_string(),
            ));
        }

        if self.input_file.as_os_str().is_empty() || self.output_file.as_os_str().is_empty() {
            return Err(VerifierError::Configuration(
                "input and output paths must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Capacity of both the job and the result queue.
    pub fn queue_capacity(&self) -> usize {
        self.workers.max(1) * 2
    }
}

fn env_value<'a>(env: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    env.get(key).map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn invalid_env(key: &str, value: &str) -> VerifierError {
    VerifierError::Configuration(format!("invalid {key}={value:?}"))
}

fn env_parsed<T>(
    env: &HashMap<String, String>,
    key: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<Option<T>, VerifierError> {
    env_value(env, key)
        .map(|v| parse(v).ok_or_else(|| invalid_env(key, v)))
        .transpose()
}

fn overrides_from_env(env: &HashMap<String, String>) -> Result<ConfigOverrides, VerifierError> {
    Ok(ConfigOverrides {
        input_file: env_value(env, ENV_INPUT_FILE).map(PathBuf::from),
        output_file: env_value(env, ENV_OUTPUT_FILE).map(PathBuf::from),
        workers: env_parsed(env, ENV_WORKERS, |v| v.parse().ok())?,
        batch_size: env_parsed(env, ENV_BATCH_SIZE, |v| v.parse().ok())?,
        rate_limit: env_parsed(env, ENV_RATE_LIMIT, |v| parse_duration(v).ok())?,
        enable_smtp: env_parsed(env, ENV_ENABLE_SMTP, parse_bool)?,
        verbose: env_parsed(env, ENV_VERBOSE, parse_bool)?,
    })
}

/// Parses a `.env` style file of `KEY=VALUE` lines.
///
/// Blank lines and `#` comments are skipped, as are lines without `=`.
/// Surrounding quotes on values are stripped. A missing file is not an error.
pub fn load_env_file(path: &Path) -> Result<HashMap<String, String>, VerifierError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
        Err(e) => {
            return Err(VerifierError::Io(format!(
                "failed to read {}: {}",
                path.display(),
                e
            )))
        }
    };

    let mut vars = HashMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(value);
        vars.insert(key.trim().to_string(), value.to_string());
    }

    Ok(vars)
}

/// Merges `.env` values under the process environment: a variable already
/// set in the process wins.
pub fn merged_environment(
    dotenv: HashMap<String, String>,
    process: impl IntoIterator<Item = (String, String)>,
) -> HashMap<String, String> {
    let mut env = dotenv;
    for (key, value) in process {
        if !value.is_empty() {
            env.insert(key, value);
        }
    }
    env
}
