//! Single-track ratings
//!
//! Testers score individual tracks 1-10 with an optional remark. Each
//! tester's worklist only contains tracks they have not rated yet; testers
//! are identified by e-mail, compared case-insensitively.

use std::collections::{BTreeSet, HashSet};
use std::path::PathBuf;

use scorearena_common::{AppendLog, Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::catalog::{CatalogSnapshot, Track};

/// Columns of the rating log
pub const RATING_HEADER: &[&str] = &["timestamp", "track", "score", "tester", "remark"];

/// Accepted score range
pub const SCORE_RANGE: std::ops::RangeInclusive<i64> = 1..=10;

/// One persisted rating
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingRecord {
    pub timestamp: String,
    pub track: String,
    pub score: u8,
    pub tester: String,
    pub remark: Option<String>,
}

/// One rating as submitted; entries without a valid score are skipped
#[derive(Debug, Clone, Deserialize)]
pub struct RatingEntry {
    pub track: String,
    #[serde(default)]
    pub score: Option<i64>,
    #[serde(default)]
    pub remark: Option<String>,
}

/// Worklist ordering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RatingSort {
    #[default]
    #[serde(alias = "filename")]
    Track,
    Composer,
    Piece,
    Model,
}

/// Worklist filters, each an exact match when present
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RatingFilters {
    #[serde(default)]
    pub composer: Option<String>,
    #[serde(default)]
    pub piece: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub sort: RatingSort,
}

/// A track awaiting the tester's rating
#[derive(Debug, Clone, Serialize)]
pub struct RatingItem {
    #[serde(flatten)]
    pub track: Track,
    pub composer: Option<String>,
    pub piece_name: String,
    pub piece_label: String,
}

/// Tracks left to rate plus the facet values for filtering them
#[derive(Debug, Clone, Serialize)]
pub struct RatingWorklist {
    pub tester: String,
    /// All tracks in the catalog, rated or not
    pub total_tracks: usize,
    pub tracks: Vec<RatingItem>,
    pub composers: Vec<String>,
    pub pieces: Vec<String>,
    pub models: Vec<String>,
}

/// Rating log (`ratings.csv`)
#[derive(Debug, Clone)]
pub struct RatingStore {
    log: AppendLog,
}

impl RatingStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            log: AppendLog::new(path, RATING_HEADER),
        }
    }

    /// Track ids the tester has rated
    pub fn rated_by(&self, tester: &str) -> Result<HashSet<String>> {
        let tester = tester.trim();
        let rows: Vec<RatingRecord> = self.log.read_all()?;
        Ok(rows
            .into_iter()
            .filter(|row| row.tester.trim().eq_ignore_ascii_case(tester))
            .map(|row| row.track)
            .collect())
    }

    /// Unrated tracks for `tester`, filtered and sorted
    pub fn unrated_for(
        &self,
        snapshot: &CatalogSnapshot,
        tester: &str,
        filters: &RatingFilters,
    ) -> Result<RatingWorklist> {
        let tester = require_tester(tester)?;
        let rated = self.rated_by(tester)?;

        let unrated: Vec<RatingItem> = snapshot
            .tracks()
            .iter()
            .filter(|t| !rated.contains(&t.track_id))
            .map(|track| {
                let identity = snapshot.piece(&track.piece_id);
                RatingItem {
                    composer: identity.and_then(|p| p.composer.clone()),
                    piece_name: identity
                        .map(|p| p.title.clone())
                        .unwrap_or_else(|| track.piece_id.to_string()),
                    piece_label: identity
                        .map(|p| p.label.clone())
                        .unwrap_or_else(|| track.piece_id.to_string()),
                    track: track.clone(),
                }
            })
            .collect();

        let composers: BTreeSet<String> =
            unrated.iter().filter_map(|i| i.composer.clone()).collect();
        let pieces: BTreeSet<String> = unrated.iter().map(|i| i.piece_name.clone()).collect();
        let models: BTreeSet<String> = unrated
            .iter()
            .map(|i| i.track.model_label.clone())
            .collect();

        let mut tracks: Vec<RatingItem> = unrated
            .into_iter()
            .filter(|item| matches_filters(item, filters))
            .collect();
        match filters.sort {
            RatingSort::Track => {}
            RatingSort::Composer => tracks.sort_by(|a, b| a.composer.cmp(&b.composer)),
            RatingSort::Piece => tracks.sort_by(|a, b| a.piece_name.cmp(&b.piece_name)),
            RatingSort::Model => tracks.sort_by(|a, b| a.track.model_label.cmp(&b.track.model_label)),
        }

        debug!(tester, remaining = tracks.len(), "Rating worklist built");

        Ok(RatingWorklist {
            tester: tester.to_string(),
            total_tracks: snapshot.tracks().len(),
            tracks,
            composers: composers.into_iter().collect(),
            pieces: pieces.into_iter().collect(),
            models: models.into_iter().collect(),
        })
    }

    /// Append one row per valid entry, returning how many were stored
    ///
    /// Entries with a missing or out-of-range score or an empty track are
    /// skipped. Storing none at all is an error.
    pub async fn record_batch(&self, tester: &str, entries: &[RatingEntry]) -> Result<usize> {
        let tester = require_tester(tester)?;

        let mut submitted = 0;
        for entry in entries {
            let Some(score) = entry.score.filter(|s| SCORE_RANGE.contains(s)) else {
                continue;
            };
            let track = entry.track.trim();
            if track.is_empty() {
                continue;
            }

            let record = RatingRecord {
                timestamp: scorearena_common::time::now_rfc3339(),
                track: track.to_string(),
                score: score as u8,
                tester: tester.to_string(),
                remark: entry
                    .remark
                    .as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
            };
            self.log.append(&record).await?;
            submitted += 1;
        }

        if submitted == 0 {
            return Err(Error::InvalidInput(
                "Please rate at least one track before submitting".to_string(),
            ));
        }

        info!(tester, submitted, "Ratings recorded");
        Ok(submitted)
    }

    /// Every rating recorded so far, in file order
    pub fn history(&self) -> Result<Vec<RatingRecord>> {
        self.log.read_all()
    }
}

fn require_tester(tester: &str) -> Result<&str> {
    let tester = tester.trim();
    if tester.is_empty() {
        return Err(Error::InvalidInput("Tester e-mail is required".to_string()));
    }
    Ok(tester)
}

fn matches_filters(item: &RatingItem, filters: &RatingFilters) -> bool {
    let wanted = |filter: &Option<String>, value: Option<&str>| match filter.as_deref() {
        None | Some("") => true,
        Some(f) => value == Some(f),
    };

    wanted(&filters.composer, item.composer.as_deref())
        && wanted(&filters.piece, Some(item.piece_name.as_str()))
        && wanted(&filters.model, Some(item.track.model_label.as_str()))
}
