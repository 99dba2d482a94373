//! Model arena: blind A/B comparison of two renditions of one piece
//!
//! - [`selector`]: picks two tracks with different model labels and blinds them as A/B
//! - [`recorder`]: resolves the tester's A/B choice to real model labels and logs it
//! - [`session`]: sequences the two per tester action, without server-side state

pub mod recorder;
pub mod selector;
pub mod session;

pub use recorder::{VerdictRecord, VerdictRecorder, VERDICT_HEADER};
pub use selector::PairingSelector;
pub use session::{NextAction, SessionFlow, SubmitOutcome, VerdictSubmission};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::catalog::{PieceId, Track};
use crate::error::ArenaError;

/// Blinded slot label shown to the tester
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlotLabel {
    A,
    B,
}

impl SlotLabel {
    pub fn other(self) -> Self {
        match self {
            SlotLabel::A => SlotLabel::B,
            SlotLabel::B => SlotLabel::A,
        }
    }
}

impl fmt::Display for SlotLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotLabel::A => f.write_str("A"),
            SlotLabel::B => f.write_str("B"),
        }
    }
}

impl FromStr for SlotLabel {
    type Err = ArenaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "A" => Ok(SlotLabel::A),
            "B" => Ok(SlotLabel::B),
            other => Err(ArenaError::InvalidChoice(other.to_string())),
        }
    }
}

/// One A/B trial
///
/// The label assignment is the slot placement: `slot_a` is presented as "A".
/// Pairings are never stored server-side; clients hand them back with the vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pairing {
    pub piece_id: PieceId,
    #[serde(default)]
    pub piece_label: String,
    pub slot_a: Track,
    pub slot_b: Track,
}

impl Pairing {
    /// Track presented under `label`
    pub fn track(&self, label: SlotLabel) -> &Track {
        match label {
            SlotLabel::A => &self.slot_a,
            SlotLabel::B => &self.slot_b,
        }
    }

    /// `(winner, loser)` for a tester's choice
    pub fn resolve(&self, chosen: SlotLabel) -> (&Track, &Track) {
        (self.track(chosen), self.track(chosen.other()))
    }

    /// Label under which a track is presented, if it is part of this pairing
    pub fn label_of(&self, track_id: &str) -> Option<SlotLabel> {
        [SlotLabel::A, SlotLabel::B]
            .into_iter()
            .find(|label| self.track(*label).track_id == track_id)
    }

    /// Structural checks: one piece, two distinct tracks, two distinct model labels
    pub fn validate(&self) -> Result<(), ArenaError> {
        if self.slot_a.piece_id != self.piece_id || self.slot_b.piece_id != self.piece_id {
            return Err(ArenaError::InvalidPairing(format!(
                "both tracks must belong to piece {}",
                self.piece_id
            )));
        }
        if self.slot_a.track_id == self.slot_b.track_id {
            return Err(ArenaError::InvalidPairing(
                "slots A and B hold the same track".to_string(),
            ));
        }
        if self.slot_a.model_label == self.slot_b.model_label {
            return Err(ArenaError::InvalidPairing(format!(
                "both tracks come from model {}",
                self.slot_a.model_label
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::catalog::{ArtifactStore, PieceId, Track};

    use super::Pairing;

    pub(crate) fn track(id: &str, piece: &str, model: &str) -> Track {
        Track {
            track_id: id.to_string(),
            piece_id: PieceId::from(piece),
            model_label: model.to_string(),
            media_ref: ArtifactStore::media_url(id),
            score_ref: None,
        }
    }

    /// The "sonata-1" pairing with modelA in slot A
    pub(crate) fn sonata_pairing() -> Pairing {
        Pairing {
            piece_id: PieceId::from("sonata-1"),
            piece_label: "sonata-1".to_string(),
            slot_a: track("modelA-sonata-1.ogg", "sonata-1", "modelA"),
            slot_b: track("modelB-sonata-1.ogg", "sonata-1", "modelB"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_slot_label_parsing() {
        assert_eq!("A".parse::<SlotLabel>().unwrap(), SlotLabel::A);
        assert_eq!(" B ".parse::<SlotLabel>().unwrap(), SlotLabel::B);

        for bad in ["a", "C", "", "AB", "modelA"] {
            let err = bad.parse::<SlotLabel>().unwrap_err();
            assert!(matches!(err, ArenaError::InvalidChoice(_)), "{:?}", bad);
        }
    }

    #[test]
    fn test_resolve_maps_choice_to_tracks() {
        let pairing = sonata_pairing();

        let (winner, loser) = pairing.resolve(SlotLabel::A);
        assert_eq!(winner.model_label, "modelA");
        assert_eq!(loser.model_label, "modelB");

        let (winner, loser) = pairing.resolve(SlotLabel::B);
        assert_eq!(winner.model_label, "modelB");
        assert_eq!(loser.model_label, "modelA");
    }

    #[test]
    fn test_label_of() {
        let pairing = sonata_pairing();
        assert_eq!(pairing.label_of("modelB-sonata-1.ogg"), Some(SlotLabel::B));
        assert_eq!(pairing.label_of("elsewhere.ogg"), None);
    }

    #[test]
    fn test_validate_rejects_same_model() {
        let mut pairing = sonata_pairing();
        pairing.slot_b.model_label = "modelA".to_string();
        assert!(matches!(
            pairing.validate(),
            Err(ArenaError::InvalidPairing(_))
        ));
    }

    #[test]
    fn test_validate_rejects_foreign_piece() {
        let mut pairing = sonata_pairing();
        pairing.slot_b = track("modelB-etude.ogg", "etude", "modelB");
        assert!(matches!(
            pairing.validate(),
            Err(ArenaError::InvalidPairing(_))
        ));
    }

    #[test]
    fn test_pairing_json_shape() {
        let json = serde_json::to_value(sonata_pairing()).unwrap();
        assert_eq!(json["piece_id"], "sonata-1");
        assert_eq!(json["slot_a"]["model_label"], "modelA");
        assert_eq!(json["slot_b"]["media_ref"], "/uploads/modelB-sonata-1.ogg");
    }
}
