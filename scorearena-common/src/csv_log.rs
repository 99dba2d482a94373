//! Append-only CSV record logs
//!
//! Every log is one CSV file with a header row. Rows are only ever appended;
//! nothing here rewrites or reorders existing content.
//!
//! Each append encodes the complete row (plus the header when the file is
//! still empty) into one buffer and hands it to a single append-mode write,
//! so concurrent writers interleave whole rows and never leave half a row
//! behind.
//!
//! The empty-file check and the write are not atomic: two writers racing on
//! a brand-new file may both emit a header. Readers therefore drop any data
//! row identical to the header.

use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::warn;

use crate::{Error, Result};

/// Append-only CSV file with a fixed header
#[derive(Debug, Clone)]
pub struct AppendLog {
    path: PathBuf,
    header: &'static [&'static str],
}

impl AppendLog {
    /// Create a log handle; the file is created lazily on first append
    pub fn new(path: impl Into<PathBuf>, header: &'static [&'static str]) -> Self {
        Self {
            path: path.into(),
            header,
        }
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Column names written as the first row of a new file
    pub fn header(&self) -> &'static [&'static str] {
        self.header
    }

    /// Append one record
    ///
    /// The record must serialize to the same columns as `header`.
    pub async fn append<R: Serialize>(&self, record: &R) -> Result<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        let needs_header = file.metadata().await?.len() == 0;
        let buffer = self.encode(record, needs_header)?;

        file.write_all(&buffer).await?;
        file.flush().await?;
        Ok(())
    }

    fn encode<R: Serialize>(&self, record: &R, with_header: bool) -> Result<Vec<u8>> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());

        if with_header {
            writer.write_record(self.header)?;
        }
        writer.serialize(record)?;

        writer
            .into_inner()
            .map_err(|e| Error::Internal(format!("CSV buffer flush failed: {}", e.error())))
    }

    /// Read every well-formed record, in file order
    ///
    /// A missing file reads as an empty log. Rows that cannot be decoded
    /// (e.g. written by an older column layout) are skipped with a warning,
    /// repeated header rows silently.
    pub fn read_all<R: DeserializeOwned>(&self) -> Result<Vec<R>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.path)?;
        let headers = reader.headers()?.clone();

        let mut records = Vec::new();
        for (index, row) in reader.records().enumerate() {
            let decoded = row.and_then(|row| {
                if self.is_header(&row) {
                    Ok(None)
                } else {
                    row.deserialize(Some(&headers)).map(Some)
                }
            });
            match decoded {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        log = %self.path.display(),
                        row = index + 1,
                        "Skipping unreadable CSV row: {}",
                        e
                    );
                }
            }
        }
        Ok(records)
    }

    fn is_header(&self, row: &csv::StringRecord) -> bool {
        row.iter().eq(self.header.iter().copied())
    }
}
