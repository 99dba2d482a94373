//! Track catalog
//!
//! Read-only view over the artifacts the external converter has produced.
//! A track becomes visible as soon as its `.ogg` exists in the uploads
//! directory; its `.musicxml` may still be missing ("not yet converted"), in
//! which case `score_ref` is `None`.
//!
//! Grouping into pieces comes from the metadata log written at upload time.
//! Nothing is cached: every [`TrackCatalog::snapshot`] re-reads the directory
//! and the metadata log.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};

use scorearena_common::{AppendLog, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::ArenaError;

/// Model label for tracks uploaded without one
pub const UNLABELED_MODEL: &str = "unlabeled";

/// Extension of the converted audio artifact
pub const AUDIO_EXTENSION: &str = "ogg";

/// Extension of the converted score artifact
pub const SCORE_EXTENSION: &str = "musicxml";

/// URL prefix under which the uploads directory is served
pub const MEDIA_URL_PREFIX: &str = "/uploads";

/// Columns of the metadata log
pub const METADATA_HEADER: &[&str] = &[
    "filename",
    "model_name",
    "composer",
    "piece_name",
    "score_filename",
    "upload_timestamp",
];

/// Hex digits of the grouping-key digest appended to every piece id
const PIECE_ID_DIGEST_LEN: usize = 12;

/// URL-safe identifier of a piece
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PieceId(String);

impl PieceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PieceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for PieceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for PieceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lower-case ASCII alphanumerics, every other run of characters becomes one `-`
///
/// Lossy; only the readable prefix of a [`PieceId`].
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// One row of the metadata log
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackMetadata {
    /// Audio artifact file name the row describes
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub model_name: String,
    #[serde(default)]
    pub composer: String,
    #[serde(default)]
    pub piece_name: String,
    #[serde(default)]
    pub score_filename: String,
    #[serde(default)]
    pub upload_timestamp: String,
}

impl TrackMetadata {
    /// True when no descriptive field carries a value
    pub fn is_blank(&self) -> bool {
        self.model_name.trim().is_empty()
            && self.composer.trim().is_empty()
            && self.piece_name.trim().is_empty()
    }
}

/// Metadata log (`metadata.csv`)
#[derive(Debug, Clone)]
pub struct MetadataStore {
    log: AppendLog,
}

impl MetadataStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            log: AppendLog::new(path, METADATA_HEADER),
        }
    }

    /// Metadata by file name; the first row for a file wins, later ones are ignored
    pub fn load(&self) -> Result<HashMap<String, TrackMetadata>> {
        let rows: Vec<TrackMetadata> = self.log.read_all()?;
        let mut by_file = HashMap::with_capacity(rows.len());
        for row in rows {
            by_file.entry(row.filename.clone()).or_insert(row);
        }
        Ok(by_file)
    }

    pub async fn save(&self, metadata: &TrackMetadata) -> Result<()> {
        self.log.append(metadata).await
    }
}

/// Directory holding converted artifacts
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Sorted file names of all audio artifacts; a missing directory is empty
    pub fn audio_files(&self) -> Result<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(AUDIO_EXTENSION) {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                files.push(name.to_string());
            }
        }
        files.sort();
        Ok(files)
    }

    /// File name of the score artifact belonging to `audio_file`, if converted
    pub fn score_file_for(&self, audio_file: &str) -> Option<String> {
        let stem = Path::new(audio_file).file_stem()?.to_str()?;
        let score = format!("{}.{}", stem, SCORE_EXTENSION);
        self.dir.join(&score).is_file().then_some(score)
    }

    /// Public URL of an artifact
    pub fn media_url(file_name: &str) -> String {
        format!("{}/{}", MEDIA_URL_PREFIX, file_name)
    }
}

/// Raw grouping key of a piece
///
/// Two tracks belong to the same piece exactly when their keys are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PieceKey<'a> {
    Work { composer: &'a str, title: &'a str },
    Title(&'a str),
    File(&'a str),
}

impl PieceKey<'_> {
    /// Kind-tagged, length-prefixed encoding; distinct keys never share one
    fn encode(&self) -> String {
        let field = |kind: &str, value: &str| format!("{}:{}:{}", kind, value.len(), value);
        match self {
            PieceKey::Work { composer, title } => {
                format!("{}|{}", field("composer", composer), field("piece", title))
            }
            PieceKey::Title(title) => field("piece", title),
            PieceKey::File(stem) => field("file", stem),
        }
    }

    /// Slug of `readable` for legibility, key digest for uniqueness
    fn piece_id(&self, readable: &str) -> PieceId {
        let digest = format!("{:x}", Sha256::digest(self.encode().as_bytes()));
        let digest = &digest[..PIECE_ID_DIGEST_LEN];
        match slugify(readable) {
            slug if slug.is_empty() => PieceId(digest.to_string()),
            slug => PieceId(format!("{}-{}", slug, digest)),
        }
    }
}

/// Grouping identity of a piece
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PieceIdentity {
    pub piece_id: PieceId,
    /// Human-readable label
    pub label: String,
    pub composer: Option<String>,
    pub title: String,
}

impl PieceIdentity {
    /// Derive the grouping identity of an audio artifact
    ///
    /// Composer plus piece name identify a piece; a piece name alone does too.
    /// Anything less (including a composer alone) falls back to the file stem.
    /// The id is never empty and differs whenever the raw key does.
    pub fn derive(audio_file: &str, metadata: &TrackMetadata) -> Self {
        let title = Some(metadata.piece_name.trim())
            .filter(|s| !s.is_empty())
            .or_else(|| Some(metadata.score_filename.trim()).filter(|s| !s.is_empty()));
        let composer = Some(metadata.composer.trim()).filter(|s| !s.is_empty());

        match (composer, title) {
            (Some(composer), Some(title)) => Self {
                piece_id: PieceKey::Work { composer, title }
                    .piece_id(&format!("{} {}", composer, title)),
                label: format!("{} — {}", composer, title),
                composer: Some(composer.to_string()),
                title: title.to_string(),
            },
            (None, Some(title)) => Self {
                piece_id: PieceKey::Title(title).piece_id(title),
                label: title.to_string(),
                composer: None,
                title: title.to_string(),
            },
            (composer, None) => {
                let stem = Path::new(audio_file)
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or(audio_file);
                Self {
                    piece_id: PieceKey::File(stem).piece_id(stem),
                    label: stem.to_string(),
                    composer: composer.map(str::to_string),
                    title: stem.to_string(),
                }
            }
        }
    }

    /// Identity whose label and title are the id itself
    pub fn bare(piece_id: PieceId) -> Self {
        Self {
            label: piece_id.to_string(),
            title: piece_id.to_string(),
            composer: None,
            piece_id,
        }
    }
}

/// One converted rendition of a piece
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Audio artifact file name
    pub track_id: String,
    pub piece_id: PieceId,
    pub model_label: String,
    /// URL of the audio artifact
    pub media_ref: String,
    /// URL of the score artifact, `None` until converted
    #[serde(default)]
    pub score_ref: Option<String>,
}

/// Piece overview for listings
#[derive(Debug, Clone, Serialize)]
pub struct PieceSummary {
    #[serde(flatten)]
    pub identity: PieceIdentity,
    pub track_count: usize,
    pub models: Vec<String>,
    /// Arena-eligible: at least two distinct model labels
    pub eligible: bool,
}

/// Distinct model labels among `tracks`
pub fn distinct_models<'a>(tracks: impl IntoIterator<Item = &'a Track>) -> BTreeSet<&'a str> {
    tracks.into_iter().map(|t| t.model_label.as_str()).collect()
}

/// In-memory view of the catalog at one point in time
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    tracks: Vec<Track>,
    pieces: BTreeMap<PieceId, PieceIdentity>,
}

impl CatalogSnapshot {
    /// Build from tracks plus piece identities
    ///
    /// Pieces referenced by a track but missing from `pieces` get a bare identity.
    pub fn from_parts(
        mut tracks: Vec<Track>,
        pieces: impl IntoIterator<Item = PieceIdentity>,
    ) -> Self {
        tracks.sort_by(|a, b| a.track_id.cmp(&b.track_id));

        let mut by_id: BTreeMap<PieceId, PieceIdentity> = pieces
            .into_iter()
            .map(|identity| (identity.piece_id.clone(), identity))
            .collect();
        for track in &tracks {
            by_id
                .entry(track.piece_id.clone())
                .or_insert_with(|| PieceIdentity::bare(track.piece_id.clone()));
        }
        by_id.retain(|id, _| tracks.iter().any(|t| &t.piece_id == id));

        Self {
            tracks,
            pieces: by_id,
        }
    }

    pub fn from_tracks(tracks: Vec<Track>) -> Self {
        Self::from_parts(tracks, std::iter::empty())
    }

    /// All tracks, ordered by track id
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track(&self, track_id: &str) -> Option<&Track> {
        self.tracks.iter().find(|t| t.track_id == track_id)
    }

    pub fn piece(&self, piece_id: &PieceId) -> Option<&PieceIdentity> {
        self.pieces.get(piece_id)
    }

    /// Ids of every piece with at least one track
    pub fn list_pieces(&self) -> BTreeSet<PieceId> {
        self.pieces.keys().cloned().collect()
    }

    /// Tracks of one piece, ordered by track id
    pub fn tracks_for(&self, piece_id: &PieceId) -> std::result::Result<Vec<&Track>, ArenaError> {
        let tracks: Vec<&Track> = self
            .tracks
            .iter()
            .filter(|t| &t.piece_id == piece_id)
            .collect();
        if tracks.is_empty() {
            return Err(ArenaError::NotFound(piece_id.clone()));
        }
        Ok(tracks)
    }

    /// Pieces with at least two distinct model labels
    pub fn eligible_pieces(&self) -> Vec<&PieceId> {
        self.pieces
            .keys()
            .filter(|id| {
                distinct_models(self.tracks.iter().filter(|t| &t.piece_id == *id)).len() >= 2
            })
            .collect()
    }

    pub fn summaries(&self) -> Vec<PieceSummary> {
        self.pieces
            .values()
            .map(|identity| {
                let tracks: Vec<&Track> = self
                    .tracks
                    .iter()
                    .filter(|t| t.piece_id == identity.piece_id)
                    .collect();
                let models: Vec<String> = distinct_models(tracks.iter().copied())
                    .into_iter()
                    .map(str::to_string)
                    .collect();
                PieceSummary {
                    identity: identity.clone(),
                    track_count: tracks.len(),
                    eligible: models.len() >= 2,
                    models,
                }
            })
            .collect()
    }
}

/// Catalog over the artifact store and the metadata log
#[derive(Debug, Clone)]
pub struct TrackCatalog {
    artifacts: ArtifactStore,
    metadata: MetadataStore,
}

impl TrackCatalog {
    pub fn new(artifacts: ArtifactStore, metadata: MetadataStore) -> Self {
        Self {
            artifacts,
            metadata,
        }
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    /// Read the current state of the artifact store
    pub fn snapshot(&self) -> std::result::Result<CatalogSnapshot, ArenaError> {
        let audio_files = self.artifacts.audio_files().map_err(ArenaError::CatalogRead)?;
        let metadata = self.metadata.load().map_err(ArenaError::CatalogRead)?;

        let mut tracks = Vec::with_capacity(audio_files.len());
        let mut pieces = Vec::new();
        for file in audio_files {
            let meta = metadata.get(&file).cloned().unwrap_or_default();
            let identity = PieceIdentity::derive(&file, &meta);
            let model_label = match meta.model_name.trim() {
                "" => UNLABELED_MODEL.to_string(),
                name => name.to_string(),
            };

            tracks.push(Track {
                media_ref: ArtifactStore::media_url(&file),
                score_ref: self
                    .artifacts
                    .score_file_for(&file)
                    .map(|score| ArtifactStore::media_url(&score)),
                piece_id: identity.piece_id.clone(),
                model_label,
                track_id: file,
            });
            pieces.push(identity);
        }

        debug!(tracks = tracks.len(), "Catalog snapshot read");
        Ok(CatalogSnapshot::from_parts(tracks, pieces))
    }

    pub fn list_pieces(&self) -> std::result::Result<BTreeSet<PieceId>, ArenaError> {
        Ok(self.snapshot()?.list_pieces())
    }

    pub fn tracks_for(&self, piece_id: &PieceId) -> std::result::Result<Vec<Track>, ArenaError> {
        let snapshot = self.snapshot()?;
        let tracks = snapshot.tracks_for(piece_id)?;
        Ok(tracks.into_iter().cloned().collect())
    }
}
