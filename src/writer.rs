//! Streaming writer for the invalid-email report

use crate::{RunningStats, StatsSnapshot, VerifierError};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub const WRITE_BUFFER_SIZE: usize = 1024 * 1024;

/// One rejected address and why it was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct InvalidEmail {
    pub email: String,
    pub reason: String,
}

/// Writes the report to `path` one record at a time.
///
/// A failure partway through leaves a truncated file behind.
pub fn write_results(
    path: &Path,
    invalid_emails: &[InvalidEmail],
    stats: &StatsSnapshot,
) -> Result<(), VerifierError> {
    let file = File::create(path).map_err(|e| {
        VerifierError::Io(format!("failed to create file {}: {}", path.display(), e))
    })?;

    let mut writer = BufWriter::with_capacity(WRITE_BUFFER_SIZE, file);
    write_results_to(&mut writer, invalid_emails, stats, Utc::now())
        .and_then(|_| writer.flush().map_err(VerifierError::from))
        .map_err(|e| match e {
            VerifierError::Io(msg) => {
                VerifierError::Io(format!("failed to write {}: {}", path.display(), msg))
            }
            other => other,
        })
}

/// Writes the report with counters and processing time read from `stats`
/// at write time. Returns the snapshot that went into the file.
pub fn save_results(
    path: &Path,
    invalid_emails: &[InvalidEmail],
    stats: &RunningStats,
) -> Result<StatsSnapshot, VerifierError> {
    let snapshot = stats.snapshot();
    write_results(path, invalid_emails, &snapshot)?;
    Ok(snapshot)
}

/// Serialises the report into `writer` without building it in memory.
pub fn write_results_to<W: Write>(
    writer: &mut W,
    invalid_emails: &[InvalidEmail],
    stats: &StatsSnapshot,
    checked_at: DateTime<Utc>,
) -> Result<(), VerifierError> {
    writer.write_all(b"{\n  \"invalid_emails\": [")?;

    for (i, invalid) in invalid_emails.iter().enumerate() {
        let separator: &[u8] = if i == 0 { b"\n    " } else { b",\n    " };
        writer.write_all(separator)?;
        serde_json::to_writer(&mut *writer, invalid)?;
    }
    if !invalid_emails.is_empty() {
        writer.write_all(b"\n  ")?;
    }
    writer.write_all(b"],\n")?;

    let checked_at = checked_at.to_rfc3339_opts(SecondsFormat::Secs, true);
    writeln!(writer, "  \"checked_at\": {},", serde_json::to_string(&checked_at)?)?;
    writeln!(writer, "  \"total_checked\": {},", stats.total_checked)?;
    writeln!(writer, "  \"total_valid\": {},", stats.total_valid)?;
    writeln!(writer, "  \"total_invalid\": {},", stats.total_invalid)?;
    writeln!(
        writer,
        "  \"processing_time_seconds\": {:.2}",
        stats.elapsed.as_secs_f64()
    )?;
    writer.write_all(b"}\n")?;

    Ok(())
}
