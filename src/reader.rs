//! Streaming reader for the input document
//!
//! The input is a JSON object with an `emails` array of strings. The file is
//! decoded incrementally through a buffered reader: only the address strings
//! are kept, and every other member is skipped without being built in memory.

use crate::VerifierError;
use serde::de::{DeserializeSeed, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{info, warn};

pub const EMAILS_FIELD: &str = "emails";
pub const READ_BUFFER_SIZE: usize = 1024 * 1024;

/// Average bytes one address occupies in the input, quotes and comma included.
pub const ESTIMATED_BYTES_PER_EMAIL: u64 = 35;
pub const MIN_ESTIMATED_CAPACITY: usize = 100;
pub const MAX_ESTIMATED_CAPACITY: usize = 10_000_000;

/// Guesses how many addresses a file of `file_size` bytes holds. Only used to
/// pre-size the result vector.
pub fn estimate_capacity(file_size: u64) -> usize {
    (file_size / ESTIMATED_BYTES_PER_EMAIL).clamp(
        MIN_ESTIMATED_CAPACITY as u64,
        MAX_ESTIMATED_CAPACITY as u64,
    ) as usize
}

/// Reads every address from the `emails` array of the document at `path`,
/// in document order.
pub fn read_emails(path: &Path) -> Result<Vec<String>, VerifierError> {
    let file = File::open(path).map_err(|e| {
        VerifierError::Io(format!("failed to open file {}: {}", path.display(), e))
    })?;
    let file_size = file
        .metadata()
        .map_err(|e| VerifierError::Io(format!("failed to stat file {}: {}", path.display(), e)))?
        .len();

    let reader = BufReader::with_capacity(READ_BUFFER_SIZE, file);
    let emails = read_emails_from(reader, estimate_capacity(file_size))?;

    info!("Loaded {} emails from {}", emails.len(), path.display());
    Ok(emails)
}

/// Same as [`read_emails`] over any reader; `capacity` pre-sizes the result.
pub fn read_emails_from<R: Read>(reader: R, capacity: usize) -> Result<Vec<String>, VerifierError> {
    let mut deserializer = serde_json::Deserializer::from_reader(reader);

    let emails = EmailDocument { capacity }
        .deserialize(&mut deserializer)
        .map_err(|e| match VerifierError::from(e) {
            VerifierError::Format(msg) => VerifierError::Format(format!("failed to read JSON: {msg}")),
            other => other,
        })?;

    match emails {
        Some(emails) => Ok(emails),
        None => {
            warn!("Input document has no \"{}\" field", EMAILS_FIELD);
            Ok(Vec::new())
        }
    }
}

/// Top-level object. Yields `None` when no `emails` member exists.
struct EmailDocument {
    capacity: usize,
}

impl<'de> DeserializeSeed<'de> for EmailDocument {
    type Value = Option<Vec<String>>;

    fn deserialize<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(self)
    }
}

impl<'de> Visitor<'de> for EmailDocument {
    type Value = Option<Vec<String>>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "a JSON object with an \"{EMAILS_FIELD}\" array")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut emails = None;

        while let Some(key) = map.next_key::<String>()? {
            if key == EMAILS_FIELD && emails.is_none() {
                emails = Some(map.next_value_seed(EmailArray {
                    capacity: self.capacity,
                })?);
            } else {
                map.next_value::<IgnoredAny>()?;
            }
        }

        Ok(emails)
    }
}

struct EmailArray {
    capacity: usize,
}

impl<'de> DeserializeSeed<'de> for EmailArray {
    type Value = Vec<String>;

    fn deserialize<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_seq(self)
    }
}

impl<'de> Visitor<'de> for EmailArray {
    type Value = Vec<String>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an array of email address strings")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut emails = Vec::with_capacity(self.capacity);
        while let Some(email) = seq.next_element::<String>()? {
            emails.push(email);
        }
        Ok(emails)
    }
}
