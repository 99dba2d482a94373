//! Pairing selection
//!
//! Picks the piece (uniformly among eligible pieces when none is requested),
//! then one pair of tracks with different model labels uniformly among all
//! such pairs of that piece, then flips a fair coin for the A/B placement.
//! The coin flip is what keeps positional bias out of blind testing: every
//! model lands in slot A half the time in expectation.

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use super::Pairing;
use crate::catalog::{CatalogSnapshot, PieceId, Track};
use crate::error::ArenaError;

/// Selects pairings from one catalog snapshot
#[derive(Debug, Clone, Copy)]
pub struct PairingSelector<'a> {
    snapshot: &'a CatalogSnapshot,
}

impl<'a> PairingSelector<'a> {
    pub fn new(snapshot: &'a CatalogSnapshot) -> Self {
        Self { snapshot }
    }

    /// Pairing for `piece_id`, or for a random eligible piece when `None`
    pub fn select_pairing<R: Rng + ?Sized>(
        &self,
        piece_id: Option<&PieceId>,
        rng: &mut R,
    ) -> Result<Pairing, ArenaError> {
        match piece_id {
            Some(piece_id) => self.pairing_for_piece(piece_id, rng),
            None => {
                let eligible = self.snapshot.eligible_pieces();
                let piece_id = eligible
                    .choose(rng)
                    .copied()
                    .ok_or(ArenaError::NoEligiblePiece)?;
                self.pairing_for_piece(piece_id, rng)
            }
        }
    }

    /// Pairing for a random eligible piece other than `avoid`
    ///
    /// Falls back to `avoid` itself when it is the only eligible piece.
    pub fn select_pairing_avoiding<R: Rng + ?Sized>(
        &self,
        avoid: &PieceId,
        rng: &mut R,
    ) -> Result<Pairing, ArenaError> {
        let eligible = self.snapshot.eligible_pieces();
        let others: Vec<&PieceId> = eligible.iter().copied().filter(|p| *p != avoid).collect();

        let piece_id = others
            .choose(rng)
            .or_else(|| eligible.choose(rng))
            .copied()
            .ok_or(ArenaError::NoEligiblePiece)?;
        self.pairing_for_piece(piece_id, rng)
    }

    fn pairing_for_piece<R: Rng + ?Sized>(
        &self,
        piece_id: &PieceId,
        rng: &mut R,
    ) -> Result<Pairing, ArenaError> {
        let tracks = self.snapshot.tracks_for(piece_id)?;

        let candidates = cross_model_pairs(&tracks);
        let &(first, second) = candidates
            .choose(rng)
            .ok_or_else(|| ArenaError::InsufficientVariants(piece_id.clone()))?;

        let (slot_a, slot_b) = if rng.gen_bool(0.5) {
            (first, second)
        } else {
            (second, first)
        };

        debug!(
            piece = %piece_id,
            candidates = candidates.len(),
            "Selected pairing"
        );

        Ok(Pairing {
            piece_id: piece_id.clone(),
            piece_label: self
                .snapshot
                .piece(piece_id)
                .map(|p| p.label.clone())
                .unwrap_or_else(|| piece_id.to_string()),
            slot_a: slot_a.clone(),
            slot_b: slot_b.clone(),
        })
    }
}

/// Every unordered pair of tracks whose model labels differ
fn cross_model_pairs<'t>(tracks: &[&'t Track]) -> Vec<(&'t Track, &'t Track)> {
    let mut pairs = Vec::new();
    for (i, first) in tracks.iter().enumerate() {
        for second in &tracks[i + 1..] {
            if first.model_label != second.model_label {
                pairs.push((*first, *second));
            }
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::test_support::track;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::{HashMap, HashSet};

    fn sonata_only() -> CatalogSnapshot {
        CatalogSnapshot::from_tracks(vec![
            track("modelA-sonata-1.ogg", "sonata-1", "modelA"),
            track("modelB-sonata-1.ogg", "sonata-1", "modelB"),
        ])
    }

    fn mixed_catalog() -> CatalogSnapshot {
        CatalogSnapshot::from_tracks(vec![
            track("modelA-sonata-1.ogg", "sonata-1", "modelA"),
            track("modelB-sonata-1.ogg", "sonata-1", "modelB"),
            track("v1-etude.ogg", "etude", "v1"),
            track("v2-etude.ogg", "etude", "v2"),
            track("v3-etude.ogg", "etude", "v3"),
            track("solo-a.ogg", "solo", "only"),
            track("solo-b.ogg", "solo", "only"),
        ])
    }

    #[test]
    fn test_sonata_scenario_references_both_tracks() {
        let snapshot = sonata_only();
        let mut rng = StdRng::seed_from_u64(1);

        let pairing = PairingSelector::new(&snapshot)
            .select_pairing(Some(&PieceId::from("sonata-1")), &mut rng)
            .unwrap();

        assert_eq!(pairing.piece_id.as_str(), "sonata-1");
        let ids: HashSet<&str> = [&pairing.slot_a, &pairing.slot_b]
            .iter()
            .map(|t| t.track_id.as_str())
            .collect();
        assert!(ids.contains("modelA-sonata-1.ogg"));
        assert!(ids.contains("modelB-sonata-1.ogg"));
    }

    #[test]
    fn test_pairings_always_cross_models() {
        let snapshot = mixed_catalog();
        let selector = PairingSelector::new(&snapshot);
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..500 {
            let pairing = selector.select_pairing(None, &mut rng).unwrap();
            assert_ne!(pairing.slot_a.model_label, pairing.slot_b.model_label);
            assert_eq!(pairing.slot_a.piece_id, pairing.piece_id);
            assert_eq!(pairing.slot_b.piece_id, pairing.piece_id);
            assert_ne!(pairing.piece_id.as_str(), "solo", "ineligible piece chosen");
        }
    }

    #[test]
    fn test_slot_a_assignment_is_unbiased() {
        let snapshot = sonata_only();
        let selector = PairingSelector::new(&snapshot);
        let piece = PieceId::from("sonata-1");
        let mut rng = StdRng::seed_from_u64(42);

        const TRIALS: usize = 4000;
        let model_a_first = (0..TRIALS)
            .map(|_| selector.select_pairing(Some(&piece), &mut rng).unwrap())
            .filter(|p| p.slot_a.model_label == "modelA")
            .count();

        let share = model_a_first as f64 / TRIALS as f64;
        assert!(
            (0.45..=0.55).contains(&share),
            "modelA landed in slot A {:.3} of the time",
            share
        );
    }

    #[test]
    fn test_every_cross_model_pair_is_reachable() {
        let snapshot = mixed_catalog();
        let selector = PairingSelector::new(&snapshot);
        let piece = PieceId::from("etude");
        let mut rng = StdRng::seed_from_u64(3);

        let mut seen: HashMap<(String, String), usize> = HashMap::new();
        for _ in 0..3000 {
            let p = selector.select_pairing(Some(&piece), &mut rng).unwrap();
            let mut key = [p.slot_a.model_label, p.slot_b.model_label];
            key.sort();
            let [x, y] = key;
            *seen.entry((x, y)).or_default() += 1;
        }

        assert_eq!(seen.len(), 3, "v1/v2, v1/v3 and v2/v3 must all occur");
        for count in seen.values() {
            // 1000 expected per pair
            assert!((800..=1200).contains(count), "skewed pair count {}", count);
        }
    }

    #[test]
    fn test_single_model_piece_has_insufficient_variants() {
        let snapshot = mixed_catalog();
        let mut rng = StdRng::seed_from_u64(0);

        let err = PairingSelector::new(&snapshot)
            .select_pairing(Some(&PieceId::from("solo")), &mut rng)
            .unwrap_err();
        assert!(matches!(err, ArenaError::InsufficientVariants(id) if id.as_str() == "solo"));
    }

    #[test]
    fn test_unknown_piece_is_not_found() {
        let snapshot = mixed_catalog();
        let mut rng = StdRng::seed_from_u64(0);

        let err = PairingSelector::new(&snapshot)
            .select_pairing(Some(&PieceId::from("missing")), &mut rng)
            .unwrap_err();
        assert!(matches!(err, ArenaError::NotFound(_)));
    }

    #[test]
    fn test_no_eligible_piece() {
        let snapshot = CatalogSnapshot::from_tracks(vec![
            track("solo-a.ogg", "solo", "only"),
            track("solo-b.ogg", "solo", "only"),
        ]);
        let mut rng = StdRng::seed_from_u64(0);
        let selector = PairingSelector::new(&snapshot);

        assert!(matches!(
            selector.select_pairing(None, &mut rng),
            Err(ArenaError::NoEligiblePiece)
        ));
        assert!(matches!(
            PairingSelector::new(&CatalogSnapshot::default()).select_pairing(None, &mut rng),
            Err(ArenaError::NoEligiblePiece)
        ));
    }

    #[test]
    fn test_avoiding_prefers_other_pieces() {
        let snapshot = mixed_catalog();
        let selector = PairingSelector::new(&snapshot);
        let sonata = PieceId::from("sonata-1");
        let mut rng = StdRng::seed_from_u64(11);

        for _ in 0..100 {
            let pairing = selector.select_pairing_avoiding(&sonata, &mut rng).unwrap();
            assert_eq!(pairing.piece_id.as_str(), "etude");
        }
    }

    #[test]
    fn test_avoiding_falls_back_to_only_eligible_piece() {
        let snapshot = sonata_only();
        let mut rng = StdRng::seed_from_u64(5);

        let pairing = PairingSelector::new(&snapshot)
            .select_pairing_avoiding(&PieceId::from("sonata-1"), &mut rng)
            .unwrap();
        assert_eq!(pairing.piece_id.as_str(), "sonata-1");
    }
}
