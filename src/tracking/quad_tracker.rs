// src/tracking/quad_tracker.rs
//
// Tracks a whole quadrilateral across frames with four independent corner
// filters. Every fresh measurement is preceded by a predict step so the
// covariance evolves with elapsed time even when updates arrive irregularly.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::corner_filter::{CornerFilterConfig, CornerKalmanFilter};
use crate::types::{Point2D, Quadrilateral};

/// Assumed frame interval for the very first update, when no prior
/// timestamp exists.
const DEFAULT_DT: f64 = 1.0 / 30.0;

/// Floor on the derived frame interval. Guards against duplicate or
/// out-of-order timestamps from the frame source.
const MIN_DT: f64 = 1e-3;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QuadTrackerConfig {
    pub corner_filter: CornerFilterConfig,
}

/// Tracking lifecycle. A tracker starts `Uninitialized` and enters
/// `Tracking` on the first measurement; `reset()` returns it to
/// `Uninitialized`. Prediction is only meaningful while `Tracking`.
#[derive(Debug, Clone)]
enum TrackState {
    Uninitialized,
    Tracking {
        /// One filter per corner, in TL, TR, BR, BL order.
        filters: Box<[CornerKalmanFilter; 4]>,
        /// Timestamp (seconds) of the last processed frame.
        last_timestamp: f64,
    },
}

pub struct QuadrilateralTracker {
    config: QuadTrackerConfig,
    state: TrackState,
}

impl QuadrilateralTracker {
    pub fn new(config: QuadTrackerConfig) -> Self {
        Self {
            config,
            state: TrackState::Uninitialized,
        }
    }

    /// Fold a fresh measurement into the track and return the smoothed
    /// quadrilateral.
    ///
    /// On the first call the four filters are seeded at the measured corners
    /// and a default 1/30 s interval stands in for the missing prior
    /// timestamp. Timestamps must be non-decreasing across calls; the
    /// derived interval is floored at `MIN_DT`.
    pub fn update(&mut self, measured: &Quadrilateral, timestamp: f64) -> Quadrilateral {
        let (mut filters, dt) = match std::mem::replace(&mut self.state, TrackState::Uninitialized)
        {
            TrackState::Uninitialized => {
                debug!(timestamp, "quad tracker initialized from first measurement");
                let corners = measured.corners();
                let seed = |p: Point2D| CornerKalmanFilter::new(p, &self.config.corner_filter);
                let filters = Box::new([
                    seed(corners[0]),
                    seed(corners[1]),
                    seed(corners[2]),
                    seed(corners[3]),
                ]);
                (filters, DEFAULT_DT)
            }
            TrackState::Tracking {
                filters,
                last_timestamp,
            } => (filters, (timestamp - last_timestamp).max(MIN_DT)),
        };

        let corners = measured.corners();
        let mut smoothed = [Point2D::new(0.0, 0.0); 4];
        for (i, filter) in filters.iter_mut().enumerate() {
            // Predict first so the covariance reflects the elapsed time;
            // the predicted position itself is superseded by the correction.
            filter.predict(dt);
            smoothed[i] = filter.update(corners[i]);
        }

        self.state = TrackState::Tracking {
            filters,
            last_timestamp: timestamp,
        };

        Quadrilateral::new(smoothed[0], smoothed[1], smoothed[2], smoothed[3])
    }

    /// Advance the track to `timestamp` without a measurement.
    ///
    /// Returns `None` until the first measurement arrives — a normal
    /// "nothing to display yet" condition, not an error.
    pub fn predict(&mut self, timestamp: f64) -> Option<Quadrilateral> {
        let TrackState::Tracking {
            filters,
            last_timestamp,
        } = &mut self.state
        else {
            return None;
        };

        let dt = (timestamp - *last_timestamp).max(MIN_DT);
        *last_timestamp = timestamp;

        let mut predicted = [Point2D::new(0.0, 0.0); 4];
        for (i, filter) in filters.iter_mut().enumerate() {
            predicted[i] = filter.predict(dt);
        }

        Some(Quadrilateral::new(
            predicted[0],
            predicted[1],
            predicted[2],
            predicted[3],
        ))
    }

    /// Discard all filter state and the last timestamp. Call when a capture
    /// session stops or a new page begins, so stale velocity and covariance
    /// never bleed into an unrelated quadrilateral.
    pub fn reset(&mut self) {
        if matches!(self.state, TrackState::Tracking { .. }) {
            debug!("quad tracker reset");
        }
        self.state = TrackState::Uninitialized;
    }

    pub fn is_tracking(&self) -> bool {
        matches!(self.state, TrackState::Tracking { .. })
    }
}

// ============================================================================
// TESTS
// ============================================================================
