//! Notation upload and conversion
//!
//! An accepted `.mscz` file is stored in the uploads directory, converted to
//! `.ogg` audio and `.musicxml` score next to it, and described by a row in
//! the metadata log when the uploader gave any descriptive field.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::catalog::{MetadataStore, TrackMetadata, AUDIO_EXTENSION, SCORE_EXTENSION};
use crate::converter::Converter;
use crate::error::UploadError;

/// Accepted notation file extension
pub const NOTATION_EXTENSION: &str = "mscz";

/// Descriptive fields sent with an upload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UploadMetadata {
    #[serde(default)]
    pub model_name: String,
    #[serde(default)]
    pub composer: String,
    #[serde(default)]
    pub piece_name: String,
}

/// What an accepted upload produced
#[derive(Debug, Clone, Serialize)]
pub struct UploadReceipt {
    /// Stored notation file name
    pub filename: String,
    /// Audio artifact, which is also the new track's id
    pub track_id: String,
    pub score_file: String,
    pub metadata_saved: bool,
}

/// True when `filename` carries the accepted extension (case-insensitive)
pub fn allowed_file(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(NOTATION_EXTENSION))
}

/// Reduce a client-supplied file name to a safe, flat name
///
/// Path separators and whitespace become `_`, characters outside
/// `[A-Za-z0-9._-]` are dropped, leading and trailing dots and underscores
/// are stripped. Returns `None` when nothing remains.
pub fn sanitize_filename(filename: &str) -> Option<String> {
    let spaced = filename.replace(['/', '\\'], " ");
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    let trimmed = kept.trim_matches(|c| c == '.' || c == '_');
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Stores, converts and describes uploaded notation files
#[derive(Debug, Clone)]
pub struct Uploader {
    uploads_dir: PathBuf,
    converter: Converter,
    metadata: MetadataStore,
}

impl Uploader {
    pub fn new(uploads_dir: impl Into<PathBuf>, converter: Converter, metadata: MetadataStore) -> Self {
        Self {
            uploads_dir: uploads_dir.into(),
            converter,
            metadata,
        }
    }

    /// Store `content` under a sanitized `filename`, convert it and record metadata
    ///
    /// Both conversions must succeed before metadata is written; a failed
    /// conversion leaves the notation file in place but records nothing.
    pub async fn accept(
        &self,
        filename: &str,
        content: &[u8],
        metadata: UploadMetadata,
    ) -> Result<UploadReceipt, UploadError> {
        if filename.trim().is_empty() || content.is_empty() {
            return Err(UploadError::MissingFile);
        }
        if !allowed_file(filename) {
            return Err(UploadError::UnsupportedFileType(filename.to_string()));
        }
        let safe_name = sanitize_filename(filename)
            .filter(|name| allowed_file(name))
            .ok_or_else(|| UploadError::InvalidFilename(filename.to_string()))?;

        tokio::fs::create_dir_all(&self.uploads_dir).await?;
        let notation_path = self.uploads_dir.join(&safe_name);
        tokio::fs::write(&notation_path, content).await?;

        let stem = Path::new(&safe_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| UploadError::InvalidFilename(safe_name.clone()))?;
        let track_id = format!("{}.{}", stem, AUDIO_EXTENSION);
        let score_file = format!("{}.{}", stem, SCORE_EXTENSION);

        self.converter
            .convert(&notation_path, &self.uploads_dir.join(&track_id))
            .await?;
        self.converter
            .convert(&notation_path, &self.uploads_dir.join(&score_file))
            .await?;

        let row = TrackMetadata {
            filename: track_id.clone(),
            model_name: metadata.model_name.trim().to_string(),
            composer: metadata.composer.trim().to_string(),
            piece_name: metadata.piece_name.trim().to_string(),
            score_filename: String::new(),
            upload_timestamp: scorearena_common::time::now_rfc3339(),
        };
        let metadata_saved = !row.is_blank();
        if metadata_saved {
            self.metadata.save(&row).await?;
        }

        info!(
            file = %safe_name,
            model = %row.model_name,
            metadata_saved,
            "Upload converted"
        );

        Ok(UploadReceipt {
            filename: safe_name,
            track_id,
            score_file,
            metadata_saved,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_allowed_file() {
        assert!(allowed_file("sonata.mscz"));
        assert!(allowed_file("Sonata.MSCZ"));
        assert!(!allowed_file("sonata.mscx"));
        assert!(!allowed_file("sonata"));
        assert!(!allowed_file("mscz"));
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("My Sonata.mscz").as_deref(), Some("My_Sonata.mscz"));
        assert_eq!(
            sanitize_filename("../../etc/passwd.mscz").as_deref(),
            Some("etc_passwd.mscz")
        );
        assert_eq!(sanitize_filename("C:\\scores\\a.mscz").as_deref(), Some("C_scores_a.mscz"));
        assert_eq!(sanitize_filename("Für Elise.mscz").as_deref(), Some("Fr_Elise.mscz"));
        assert_eq!(sanitize_filename("..."), None);
    }

    fn uploader_in(dir: &TempDir, bin: &str) -> Uploader {
        Uploader::new(
            dir.path().join("uploads"),
            Converter::new(bin),
            MetadataStore::new(dir.path().join("metadata.csv")),
        )
    }

    #[tokio::test]
    async fn test_rejects_missing_and_foreign_files() {
        let dir = TempDir::new().unwrap();
        let uploader = uploader_in(&dir, "scorearena-no-such-converter");

        assert!(matches!(
            uploader.accept("", b"x", UploadMetadata::default()).await,
            Err(UploadError::MissingFile)
        ));
        assert!(matches!(
            uploader.accept("a.mscz", b"", UploadMetadata::default()).await,
            Err(UploadError::MissingFile)
        ));
        assert!(matches!(
            uploader.accept("a.mp3", b"x", UploadMetadata::default()).await,
            Err(UploadError::UnsupportedFileType(_))
        ));
        assert!(!dir.path().join("uploads").exists());
    }

    #[tokio::test]
    async fn test_conversion_failure_records_no_metadata() {
        let dir = TempDir::new().unwrap();
        let uploader = uploader_in(&dir, "scorearena-no-such-converter");

        let err = uploader
            .accept(
                "sonata.mscz",
                b"notation",
                UploadMetadata {
                    model_name: "m1".into(),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::ConversionFailed(_)));
        assert!(dir.path().join("uploads/sonata.mscz").exists());
        assert!(!dir.path().join("metadata.csv").exists());
    }

    #[cfg(unix)]
    fn fake_converter(dir: &TempDir) -> String {
        use std::os::unix::fs::PermissionsExt;

        // Copies the input to the path after "-o"
        let script = dir.path().join("fake-musescore");
        std::fs::write(&script, "#!/bin/sh\ncp \"$1\" \"$3\"\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script.to_string_lossy().into_owned()
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_upload_converts_and_records_metadata() {
        let dir = TempDir::new().unwrap();
        let bin = fake_converter(&dir);
        let uploader = uploader_in(&dir, &bin);

        let receipt = uploader
            .accept(
                "Moonlight Sonata.mscz",
                b"notation",
                UploadMetadata {
                    model_name: " modelA ".into(),
                    composer: "Beethoven".into(),
                    piece_name: "Sonata 14".into(),
                },
            )
            .await
            .unwrap();

        assert_eq!(receipt.filename, "Moonlight_Sonata.mscz");
        assert_eq!(receipt.track_id, "Moonlight_Sonata.ogg");
        assert!(receipt.metadata_saved);

        let uploads = dir.path().join("uploads");
        assert!(uploads.join("Moonlight_Sonata.ogg").is_file());
        assert!(uploads.join("Moonlight_Sonata.musicxml").is_file());

        let rows = MetadataStore::new(dir.path().join("metadata.csv")).load().unwrap();
        let row = &rows["Moonlight_Sonata.ogg"];
        assert_eq!(row.model_name, "modelA");
        assert_eq!(row.composer, "Beethoven");
        assert!(!row.upload_timestamp.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_blank_metadata_is_not_recorded() {
        let dir = TempDir::new().unwrap();
        let bin = fake_converter(&dir);
        let uploader = uploader_in(&dir, &bin);

        let receipt = uploader
            .accept("etude.mscz", b"notation", UploadMetadata::default())
            .await
            .unwrap();

        assert!(!receipt.metadata_saved);
        assert!(!dir.path().join("metadata.csv").exists());
        assert!(dir.path().join("uploads/etude.ogg").is_file());
    }
}
