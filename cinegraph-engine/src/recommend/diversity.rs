//! Diversity filtering
//!
//! Pairwise similarity blends four signals:
//!
//! | Signal                          | Weight |
//! |---------------------------------|--------|
//! | same relationship kind          | 0.3    |
//! | same primary algorithm          | 0.2    |
//! | score closeness `1 - |Δscore|`  | 0.2    |
//! | reason token overlap (Jaccard)  | 0.3    |

use super::Recommendation;
use crate::utils::text::{content_terms, jaccard};

const SAME_KIND_WEIGHT: f64 = 0.3;
const SAME_ALGORITHM_WEIGHT: f64 = 0.2;
const SCORE_WEIGHT: f64 = 0.2;
const REASON_WEIGHT: f64 = 0.3;

pub fn similarity(a: &Recommendation, b: &Recommendation) -> f64 {
    let same_kind = if a.kind == b.kind { 1.0 } else { 0.0 };
    let same_algorithm = if a.primary_algorithm() == b.primary_algorithm() { 1.0 } else { 0.0 };
    let closeness = 1.0 - (a.score - b.score).abs().min(1.0);
    let reason_a = content_terms(&a.reason());
    let reason_b = content_terms(&b.reason());
    let overlap = jaccard(reason_a.iter().map(String::as_str), reason_b.iter().map(String::as_str));

    SAME_KIND_WEIGHT * same_kind + SAME_ALGORITHM_WEIGHT * same_algorithm + SCORE_WEIGHT * closeness + REASON_WEIGHT * overlap
}

/// Keep candidates, in order, whose similarity to every kept one is below
/// `threshold`, stopping at `cap`
///
/// The first candidate is always kept.
pub fn diversify(candidates: Vec<Recommendation>, threshold: f64, cap: usize) -> Vec<Recommendation> {
    let mut kept: Vec<Recommendation> = Vec::with_capacity(cap.min(candidates.len()));
    for candidate in candidates {
        if kept.len() >= cap {
            break;
        }
        if kept.iter().all(|k| similarity(k, &candidate) < threshold) {
            kept.push(candidate);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recommend::Algorithm;
    use cinegraph_common::ConnectionFactor;

    fn rec(target: &str, kind: &str, reason: &str, score: f64, algorithm: Algorithm) -> Recommendation {
        Recommendation {
            target: target.into(),
            score,
            confidence: 0.8,
            kind: kind.into(),
            algorithms: vec![algorithm],
            factors: vec![ConnectionFactor::new(reason, score)],
            category: None,
        }
    }

    #[test]
    fn test_identical_shape_is_maximally_similar() {
        let a = rec("movie_1", "same_decade", "released 1990s", 0.5, Algorithm::ContentBased);
        let b = rec("movie_2", "same_decade", "released 1990s", 0.5, Algorithm::ContentBased);
        assert!((similarity(&a, &b) - 1.0).abs() < 1e-9);

        let c = rec("movie_3", "shared_cast", "two shared cast members", 0.1, Algorithm::Collaborative);
        // only score closeness contributes
        assert!((similarity(&a, &c) - 0.2 * 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_diversify_drops_near_duplicates_and_caps() {
        let candidates = vec![
            rec("movie_1", "same_decade", "released 1990s", 0.5, Algorithm::ContentBased),
            rec("movie_2", "same_decade", "released 1990s", 0.49, Algorithm::ContentBased),
            rec("movie_3", "shared_cast", "shared cast", 0.45, Algorithm::ContentBased),
            rec("movie_4", "known_for", "known for heat", 0.4, Algorithm::ContentBased),
        ];
        let kept = diversify(candidates.clone(), 0.8, 10);
        let targets: Vec<_> = kept.iter().map(|r| r.target.as_str()).collect();
        assert_eq!(targets, vec!["movie_1", "movie_3", "movie_4"]);

        for (i, a) in kept.iter().enumerate() {
            for b in kept.iter().skip(i + 1) {
                assert!(similarity(a, b) < 0.8);
            }
        }
        assert_eq!(diversify(candidates, 0.8, 2).len(), 2);
    }
}
