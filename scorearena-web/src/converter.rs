//! External notation converter
//!
//! Wraps the MuseScore command line: `<bin> <input> -o <output>`, where the
//! output extension selects the target format.

use std::path::Path;
use std::process::Command;

use crate::error::UploadError;

/// Runs the converter executable
#[derive(Debug, Clone)]
pub struct Converter {
    bin: String,
}

impl Converter {
    /// `bin` is a name on PATH or an absolute path
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }

    pub fn bin(&self) -> &str {
        &self.bin
    }

    /// Convert `input` into `output`
    ///
    /// Fails when the executable cannot be started or exits non-zero.
    pub async fn convert(&self, input: &Path, output: &Path) -> Result<(), UploadError> {
        tracing::debug!(
            input = %input.display(),
            output = %output.display(),
            "Running converter"
        );

        let result = tokio::task::spawn_blocking({
            let bin = self.bin.clone();
            let input = input.to_path_buf();
            let output = output.to_path_buf();

            move || Command::new(&bin).arg(&input).arg("-o").arg(&output).output()
        })
        .await
        .map_err(|e| UploadError::ConversionFailed(format!("Task join error: {}", e)))?
        .map_err(|e| UploadError::ConversionFailed(format!("{}: {}", self.bin, e)))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(UploadError::ConversionFailed(format!(
                "Exit code: {:?}, stderr: {}",
                result.status.code(),
                stderr.trim()
            )));
        }

        tracing::info!(output = %output.display(), "Conversion completed");
        Ok(())
    }
}
