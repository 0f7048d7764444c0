// src/scoring.rs
//
// Document-likeness scoring over candidate quadrilaterals.
//
// A detector may emit several plausible page outlines per frame. Each
// candidate is scored on four normalized criteria and the best weighted sum
// wins:
//   - size: area relative to the largest candidate in the set
//   - rectangularity: similarity of each pair of opposite sides
//   - aspect fitness: closeness to a typical document page ratio
//   - angle: average corner deviation from 90°
//
// Size dominates the weighting, but a clearly rectangular page-shaped
// candidate can beat a larger skewed blob (a shadow, a table edge).

use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};
use tracing::debug;

use crate::types::Quadrilateral;

/// Weights and shape targets for candidate scoring.
///
/// The defaults are heuristic tuning values: the 0.75 ideal aspect ratio is
/// the rough average of US Letter and A4 page ratios.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub size_weight: f64,
    pub rectangularity_weight: f64,
    pub aspect_weight: f64,
    pub angle_weight: f64,

    /// Aspect ratio receiving the maximum aspect sub-score.
    pub ideal_aspect: f64,
    /// Accepted aspect window; ratios outside it get `aspect_floor`.
    pub aspect_min: f64,
    pub aspect_max: f64,
    /// Flat sub-score for candidates outside the accepted aspect window.
    pub aspect_floor: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            size_weight: 0.4,
            rectangularity_weight: 0.3,
            aspect_weight: 0.2,
            angle_weight: 0.1,
            ideal_aspect: 0.75,
            aspect_min: 0.65,
            aspect_max: 1.5,
            aspect_floor: 0.1,
        }
    }
}

/// Score breakdown for one candidate. Sub-scores are roughly in [0, 1].
#[derive(Debug, Clone, Copy)]
pub struct CandidateScore {
    pub total: f64,
    pub size: f64,
    pub rectangularity: f64,
    pub aspect: f64,
    pub angle: f64,
}

pub struct CandidateScorer {
    config: ScoringConfig,
}

impl CandidateScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    /// Pick the best candidate from one frame's detector output.
    ///
    /// Returns `None` for an empty set — absence, not an error. Ties
    /// resolve to the first maximum in scan order.
    pub fn select_best<'a>(
        &self,
        candidates: &'a [Quadrilateral],
    ) -> Option<(&'a Quadrilateral, CandidateScore)> {
        let max_area = candidates
            .iter()
            .map(|q| q.area())
            .fold(0.0_f64, f64::max);

        let mut best: Option<(&Quadrilateral, CandidateScore)> = None;
        for candidate in candidates {
            let score = self.score(candidate, max_area);
            match &best {
                Some((_, current)) if score.total <= current.total => {}
                _ => best = Some((candidate, score)),
            }
        }

        if let Some((_, score)) = &best {
            debug!(
                total = score.total,
                size = score.size,
                rectangularity = score.rectangularity,
                aspect = score.aspect,
                angle = score.angle,
                candidates = candidates.len(),
                "candidate selected"
            );
        }
        best
    }

    /// Score one candidate against the largest area in its set.
    pub fn score(&self, quad: &Quadrilateral, max_area: f64) -> CandidateScore {
        let size = if max_area > 0.0 {
            quad.area() / max_area
        } else {
            0.0
        };
        let rectangularity = rectangularity_score(quad);
        let aspect = self.aspect_score(quad.aspect_ratio());
        let angle = angle_score(quad);

        let c = &self.config;
        CandidateScore {
            total: c.size_weight * size
                + c.rectangularity_weight * rectangularity
                + c.aspect_weight * aspect
                + c.angle_weight * angle,
            size,
            rectangularity,
            aspect,
            angle,
        }
    }

    fn aspect_score(&self, aspect: f64) -> f64 {
        let c = &self.config;
        if aspect >= c.aspect_min && aspect <= c.aspect_max {
            (1.0 - 1.5 * (aspect - c.ideal_aspect).abs()).max(0.0)
        } else {
            c.aspect_floor
        }
    }
}

/// Average opposite-side similarity over both axes. A side pair with one
/// zero-length side scores 0 for its axis rather than producing NaN.
fn rectangularity_score(quad: &Quadrilateral) -> f64 {
    let horizontal = side_similarity(quad.top_length(), quad.bottom_length());
    let vertical = side_similarity(quad.left_length(), quad.right_length());
    (horizontal + vertical) * 0.5
}

fn side_similarity(a: f64, b: f64) -> f64 {
    let longest = a.max(b);
    if longest <= 0.0 {
        return 0.0;
    }
    1.0 - (a - b).abs() / longest
}

/// 1.0 for four right angles, falling to 0 at an average deviation of 45°.
fn angle_score(quad: &Quadrilateral) -> f64 {
    let deviation: f64 = quad
        .corner_angles()
        .iter()
        .map(|angle| (angle - FRAC_PI_2).abs())
        .sum::<f64>()
        / 4.0;
    (1.0 - deviation / FRAC_PI_4).max(0.0)
}

// ============================================================================
// TESTS
// ============================================================================
