//! Face matching rule.
//!
//! A probe embedding matches the FIRST stored embedding (in
//! store-enumeration order) whose distance is within tolerance. This is
//! deliberately a first-match policy, not a nearest-match policy: once a
//! candidate is within tolerance the scan stops, even if a later row is
//! numerically closer.

use crate::types::{Embedding, KnownFace};

/// Maximum euclidean distance between two normalized embeddings for
/// them to be considered the same identity.
pub const DEFAULT_TOLERANCE: f32 = 0.6;

/// A resolved match against the stored gallery.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub identity_id: i64,
    pub name: String,
    /// Distance to the matched row (not necessarily the minimum).
    pub distance: f32,
}

/// Strategy for resolving a probe embedding against stored identities.
pub trait Matcher {
    /// `None` means unknown: no stored embedding within tolerance.
    fn resolve(&self, probe: &Embedding, known: &[KnownFace], tolerance: f32) -> Option<Match>;
}

/// First-match resolver.
pub struct FirstMatcher;

impl Matcher for FirstMatcher {
    fn resolve(&self, probe: &Embedding, known: &[KnownFace], tolerance: f32) -> Option<Match> {
        for face in known {
            let distance = probe.distance(&face.embedding);
            if distance <= tolerance {
                return Some(Match {
                    identity_id: face.id,
                    name: face.name.clone(),
                    distance,
                });
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face(id: i64, name: &str, values: Vec<f32>) -> KnownFace {
        KnownFace {
            id,
            name: name.to_string(),
            embedding: Embedding::new(values),
        }
    }

    #[test]
    fn test_exact_probe_matches() {
        let known = vec![face(1, "alice", vec![1.0, 0.0, 0.0])];
        let probe = Embedding::new(vec![1.0, 0.0, 0.0]);
        let m = FirstMatcher.resolve(&probe, &known, DEFAULT_TOLERANCE).unwrap();
        assert_eq!(m.identity_id, 1);
        assert_eq!(m.name, "alice");
        assert_eq!(m.distance, 0.0);
    }

    #[test]
    fn test_out_of_tolerance_is_unknown() {
        // Orthogonal unit vectors are sqrt(2) apart, well past 0.6.
        let known = vec![face(1, "alice", vec![1.0, 0.0, 0.0])];
        let probe = Embedding::new(vec![0.0, 1.0, 0.0]);
        assert!(FirstMatcher.resolve(&probe, &known, DEFAULT_TOLERANCE).is_none());
    }

    #[test]
    fn test_boundary_distance_matches() {
        // Distance exactly equal to tolerance still matches (<=, not <).
        let known = vec![face(1, "alice", vec![0.0])];
        let probe = Embedding::new(vec![0.6]);
        assert!(FirstMatcher.resolve(&probe, &known, 0.6).is_some());
    }

    #[test]
    fn test_first_match_beats_closer_later_match() {
        // Both rows are within tolerance of the probe; row 1 is farther
        // (0.5) than row 2 (0.0) but is enumerated first, so it wins.
        let known = vec![
            face(1, "alice", vec![0.5, 0.0]),
            face(2, "bob", vec![0.0, 0.0]),
        ];
        let probe = Embedding::new(vec![0.0, 0.0]);
        let m = FirstMatcher.resolve(&probe, &known, DEFAULT_TOLERANCE).unwrap();
        assert_eq!(m.identity_id, 1);
        assert_eq!(m.name, "alice");
        assert!((m.distance - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_empty_gallery_is_unknown() {
        let probe = Embedding::new(vec![1.0, 0.0]);
        assert!(FirstMatcher.resolve(&probe, &[], DEFAULT_TOLERANCE).is_none());
    }

    #[test]
    fn test_skips_out_of_tolerance_rows() {
        // First row is out of tolerance, second is within; the second
        // is returned even though it is not first in the gallery.
        let known = vec![
            face(1, "alice", vec![5.0, 0.0]),
            face(2, "bob", vec![0.1, 0.0]),
        ];
        let probe = Embedding::new(vec![0.0, 0.0]);
        let m = FirstMatcher.resolve(&probe, &known, DEFAULT_TOLERANCE).unwrap();
        assert_eq!(m.identity_id, 2);
    }
}
