//! Arena session flow
//!
//! Stateless per request: the active [`Pairing`] is handed to the client with
//! the comparison and comes back with the vote. Before recording, the pairing
//! is checked against the current catalog so a client cannot attribute a
//! verdict to tracks or models that do not exist.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{Pairing, PairingSelector, SlotLabel, VerdictRecord, VerdictRecorder};
use crate::catalog::{CatalogSnapshot, PieceId, TrackCatalog};
use crate::error::ArenaError;

/// What the tester wants after submitting a verdict
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NextAction {
    /// Another comparison on the same piece
    Same,
    /// A comparison on a different piece
    #[default]
    New,
    /// No follow-up comparison
    Stop,
}

/// Vote as submitted by the client
#[derive(Debug, Clone, Deserialize)]
pub struct VerdictSubmission {
    pub pairing: Pairing,
    /// "A" or "B"
    pub chosen_label: String,
    #[serde(default)]
    pub feedback: Option<String>,
    #[serde(default)]
    pub tester: Option<String>,
    #[serde(default)]
    pub next: NextAction,
}

/// Result of a submitted vote
#[derive(Debug, Clone, Serialize)]
pub struct SubmitOutcome {
    pub verdict: VerdictRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_pairing: Option<Pairing>,
    /// Why no follow-up pairing could be offered, if one was requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_error: Option<String>,
}

/// Drives selector and recorder for one request
#[derive(Debug, Clone, Copy)]
pub struct SessionFlow<'a> {
    catalog: &'a TrackCatalog,
    recorder: &'a VerdictRecorder,
}

impl<'a> SessionFlow<'a> {
    pub fn new(catalog: &'a TrackCatalog, recorder: &'a VerdictRecorder) -> Self {
        Self { catalog, recorder }
    }

    /// Comparison for one piece, or for any eligible piece
    pub fn comparison<R: Rng + ?Sized>(
        &self,
        piece_id: Option<&PieceId>,
        rng: &mut R,
    ) -> Result<Pairing, ArenaError> {
        let snapshot = self.catalog.snapshot()?;
        PairingSelector::new(&snapshot).select_pairing(piece_id, rng)
    }

    /// Record a vote, then offer the follow-up comparison the tester asked for
    ///
    /// Nothing is written when the label or the pairing is invalid. Once the
    /// verdict is stored, a failing follow-up selection is reported in
    /// `next_error` rather than failing the whole submission.
    pub async fn submit<R: Rng + Send + ?Sized>(
        &self,
        submission: VerdictSubmission,
        rng: &mut R,
    ) -> Result<SubmitOutcome, ArenaError> {
        let chosen: SlotLabel = submission.chosen_label.parse()?;

        let snapshot = self.catalog.snapshot()?;
        verify_against_catalog(&snapshot, &submission.pairing)?;

        let verdict = self
            .recorder
            .record_choice(
                &submission.pairing,
                chosen,
                submission.feedback.as_deref(),
                submission.tester.as_deref(),
            )
            .await?;

        let piece_id = &submission.pairing.piece_id;
        let follow_up = match submission.next {
            NextAction::Stop => None,
            next => Some(self.follow_up(next, piece_id, rng)),
        };

        let (next_pairing, next_error) = match follow_up {
            None => (None, None),
            Some(Ok(pairing)) => (Some(pairing), None),
            Some(Err(e)) => {
                warn!(piece = %piece_id, "No follow-up pairing: {}", e);
                (None, Some(e.to_string()))
            }
        };

        Ok(SubmitOutcome {
            verdict,
            next_pairing,
            next_error,
        })
    }

    /// Fresh catalog read, so artifacts converted meanwhile are offered too
    fn follow_up<R: Rng + ?Sized>(
        &self,
        next: NextAction,
        piece_id: &PieceId,
        rng: &mut R,
    ) -> Result<Pairing, ArenaError> {
        let snapshot = self.catalog.snapshot()?;
        let selector = PairingSelector::new(&snapshot);
        match next {
            NextAction::Same => selector.select_pairing(Some(piece_id), rng),
            _ => selector.select_pairing_avoiding(piece_id, rng),
        }
    }
}

/// Both slots must name catalog tracks of the pairing's piece with the stated model labels
fn verify_against_catalog(snapshot: &CatalogSnapshot, pairing: &Pairing) -> Result<(), ArenaError> {
    pairing.validate()?;

    for slot in [&pairing.slot_a, &pairing.slot_b] {
        let known = snapshot.track(&slot.track_id).ok_or_else(|| {
            ArenaError::InvalidPairing(format!("unknown track {}", slot.track_id))
        })?;
        if known.piece_id != slot.piece_id || known.model_label != slot.model_label {
            return Err(ArenaError::InvalidPairing(format!(
                "track {} does not match the catalog",
                slot.track_id
            )));
        }
    }
    Ok(())
}
