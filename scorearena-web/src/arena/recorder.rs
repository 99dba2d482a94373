//! Verdict recording
//!
//! The A/B labels are a presentation-layer blind only. Every stored row
//! carries the real winning and losing model labels; the slot letter the
//! tester clicked is never persisted.

use std::path::PathBuf;

use scorearena_common::AppendLog;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{Pairing, SlotLabel};
use crate::catalog::PieceId;
use crate::error::ArenaError;

/// Columns of the verdict log
pub const VERDICT_HEADER: &[&str] = &[
    "piece_id",
    "winner_model_label",
    "loser_model_label",
    "feedback_text",
    "timestamp",
    "winner_track",
    "loser_track",
    "tester",
];

/// One persisted verdict
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerdictRecord {
    pub piece_id: PieceId,
    pub winner_model_label: String,
    pub loser_model_label: String,
    pub feedback_text: Option<String>,
    /// RFC 3339, UTC
    pub timestamp: String,
    pub winner_track: String,
    pub loser_track: String,
    pub tester: Option<String>,
}

/// Appends verdicts to the arena log
#[derive(Debug, Clone)]
pub struct VerdictRecorder {
    log: AppendLog,
}

impl VerdictRecorder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            log: AppendLog::new(path, VERDICT_HEADER),
        }
    }

    /// Record a vote given as the raw label text ("A" or "B")
    ///
    /// Anything else fails with [`ArenaError::InvalidChoice`] before the log
    /// is touched.
    pub async fn record(
        &self,
        pairing: &Pairing,
        chosen_label: &str,
        feedback_text: Option<&str>,
        tester: Option<&str>,
    ) -> Result<VerdictRecord, ArenaError> {
        let chosen: SlotLabel = chosen_label.parse()?;
        self.record_choice(pairing, chosen, feedback_text, tester).await
    }

    /// Record a vote for an already parsed label
    pub async fn record_choice(
        &self,
        pairing: &Pairing,
        chosen: SlotLabel,
        feedback_text: Option<&str>,
        tester: Option<&str>,
    ) -> Result<VerdictRecord, ArenaError> {
        pairing.validate()?;
        let (winner, loser) = pairing.resolve(chosen);

        let record = VerdictRecord {
            piece_id: pairing.piece_id.clone(),
            winner_model_label: winner.model_label.clone(),
            loser_model_label: loser.model_label.clone(),
            feedback_text: non_blank(feedback_text),
            timestamp: scorearena_common::time::now_rfc3339(),
            winner_track: winner.track_id.clone(),
            loser_track: loser.track_id.clone(),
            tester: non_blank(tester),
        };

        self.log
            .append(&record)
            .await
            .map_err(ArenaError::StorageWrite)?;

        info!(
            piece = %record.piece_id,
            winner = %record.winner_model_label,
            loser = %record.loser_model_label,
            "Arena verdict recorded"
        );
        Ok(record)
    }

    /// Every verdict recorded so far, in file order
    pub fn history(&self) -> scorearena_common::Result<Vec<VerdictRecord>> {
        self.log.read_all()
    }
}

fn non_blank(text: Option<&str>) -> Option<String> {
    text.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
