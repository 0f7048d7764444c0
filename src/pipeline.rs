// src/pipeline.rs
//
// Per-frame composition of the three core components.
//
// Motion samples feed the stability gate continuously. For each video frame
// the detector's candidate set is scored; when the device is stable the
// winner becomes a fresh measurement for the tracker, otherwise the tracker
// coasts on prediction. The returned quadrilateral (if any) is what the
// overlay/capture layer should show for this frame.

use tracing::{debug, info};

use crate::config::Config;
use crate::scoring::CandidateScorer;
use crate::stability::StabilityGate;
use crate::tracking::QuadrilateralTracker;
use crate::types::{MotionSample, Quadrilateral};

pub struct FramePipeline {
    scorer: CandidateScorer,
    gate: StabilityGate,
    tracker: QuadrilateralTracker,
}

impl FramePipeline {
    pub fn new(config: Config) -> Self {
        Self {
            scorer: CandidateScorer::new(config.scoring),
            gate: StabilityGate::new(config.stability),
            tracker: QuadrilateralTracker::new(config.tracking),
        }
    }

    /// Fold one device-motion sample into the stability gate. Returns the
    /// current stability flag.
    pub fn ingest_motion(&mut self, sample: &MotionSample) -> bool {
        self.gate.ingest(sample)
    }

    /// Process one frame's detector output.
    ///
    /// `candidates` may be empty (the detector found nothing this frame).
    /// Returns the smoothed or predicted quadrilateral to display, or
    /// `None` when there is nothing to show yet.
    pub fn process_frame(
        &mut self,
        candidates: &[Quadrilateral],
        timestamp: f64,
    ) -> Option<Quadrilateral> {
        if self.gate.is_stable() {
            if let Some((best, score)) = self.scorer.select_best(candidates) {
                debug!(timestamp, total = score.total, "measurement accepted");
                return Some(self.tracker.update(best, timestamp));
            }
        } else if !candidates.is_empty() {
            debug!(
                timestamp,
                candidates = candidates.len(),
                "device unstable, coasting on prediction"
            );
        }

        // Unstable, or nothing detected: fall back to prediction. None
        // until the first measurement has arrived.
        self.tracker.predict(timestamp)
    }

    pub fn is_stable(&self) -> bool {
        self.gate.is_stable()
    }

    /// Stop the session: clear the gate and drop all tracking state.
    pub fn reset(&mut self) {
        info!("frame pipeline reset");
        self.gate.stop();
        self.tracker.reset();
    }
}

// ============================================================================
// TESTS
// ============================================================================
