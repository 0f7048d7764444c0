// src/stability.rs
//
// Motion-stability hysteresis gate.
//
// Consumes device-motion samples (gravity-removed acceleration + angular
// rate) and maintains a boolean "stable" signal the capture layer uses to
// decide whether to trust a fresh detection or coast on prediction.
//
// The hysteresis is deliberately asymmetric: gaining stability is easier
// than losing it. The unstable thresholds sit well above the stable ones,
// and dropping out requires twice as many consecutive samples as locking in,
// so sensor noise while holding the device roughly still never flaps the
// capture decision.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::MotionSample;

/// Thresholds and hysteresis parameters for the stability gate.
///
/// Exact values are tuning knobs. Two orderings are load-bearing and must
/// hold for the gate to behave: each stable threshold is below its unstable
/// threshold (dead zone in between), and `required_unstable_samples` exceeds
/// `required_stable_samples`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilityConfig {
    /// EWMA smoothing factor applied to both magnitude signals.
    pub alpha: f64,

    /// Filtered acceleration magnitude (m/s²) below which a sample counts
    /// as stable.
    pub accel_stable: f64,
    /// Filtered acceleration magnitude above which a sample counts as
    /// unstable.
    pub accel_unstable: f64,

    /// Filtered angular-rate magnitude (rad/s) below which a sample counts
    /// as stable.
    pub rotation_stable: f64,
    /// Filtered angular-rate magnitude above which a sample counts as
    /// unstable.
    pub rotation_unstable: f64,

    /// Consecutive stable samples required to flip to stable.
    pub required_stable_samples: u32,
    /// Consecutive unstable samples required to flip back to unstable.
    /// Kept above `required_stable_samples` so losing stability is harder
    /// than gaining it.
    pub required_unstable_samples: u32,
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            alpha: 0.2,
            accel_stable: 0.10,
            accel_unstable: 0.30,
            rotation_stable: 0.15,
            rotation_unstable: 0.50,
            required_stable_samples: 6,   // ~100ms at 60Hz
            required_unstable_samples: 12, // ~200ms at 60Hz
        }
    }
}

/// Per-sample classification against the dual thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SampleClass {
    /// Both filtered magnitudes below their stable thresholds.
    Stable,
    /// Either filtered magnitude above its unstable threshold.
    Unstable,
    /// In the dead zone between the threshold pairs.
    Indeterminate,
}

pub struct StabilityGate {
    config: StabilityConfig,
    filtered_accel: f64,
    filtered_rotation: f64,
    stable_count: u32,
    unstable_count: u32,
    is_stable: bool,
}

impl StabilityGate {
    pub fn new(config: StabilityConfig) -> Self {
        Self {
            config,
            filtered_accel: 0.0,
            filtered_rotation: 0.0,
            stable_count: 0,
            unstable_count: 0,
            is_stable: false,
        }
    }

    /// Fold one motion sample into the gate and return the current
    /// stability flag.
    pub fn ingest(&mut self, sample: &MotionSample) -> bool {
        let accel_mag = sample.acceleration.norm();
        let rotation_mag = sample.rotation_rate.norm();

        let a = self.config.alpha;
        self.filtered_accel = a * accel_mag + (1.0 - a) * self.filtered_accel;
        self.filtered_rotation = a * rotation_mag + (1.0 - a) * self.filtered_rotation;

        match self.classify() {
            SampleClass::Stable => {
                self.stable_count += 1;
                self.unstable_count = 0;
                if !self.is_stable && self.stable_count >= self.config.required_stable_samples {
                    self.is_stable = true;
                    debug!(
                        accel = self.filtered_accel,
                        rotation = self.filtered_rotation,
                        "stability gained after {} samples",
                        self.stable_count
                    );
                }
            }
            SampleClass::Unstable => {
                self.unstable_count += 1;
                self.stable_count = 0;
                if self.is_stable && self.unstable_count >= self.config.required_unstable_samples {
                    self.is_stable = false;
                    debug!(
                        accel = self.filtered_accel,
                        rotation = self.filtered_rotation,
                        "stability lost after {} samples",
                        self.unstable_count
                    );
                }
            }
            SampleClass::Indeterminate => {
                // Dead zone: decay both counters so a stale streak cannot
                // combine with a later one to force a flip.
                self.stable_count = self.stable_count.saturating_sub(1);
                self.unstable_count = self.unstable_count.saturating_sub(1);
            }
        }

        self.is_stable
    }

    fn classify(&self) -> SampleClass {
        if self.filtered_accel > self.config.accel_unstable
            || self.filtered_rotation > self.config.rotation_unstable
        {
            SampleClass::Unstable
        } else if self.filtered_accel < self.config.accel_stable
            && self.filtered_rotation < self.config.rotation_stable
        {
            SampleClass::Stable
        } else {
            SampleClass::Indeterminate
        }
    }

    pub fn is_stable(&self) -> bool {
        self.is_stable
    }

    /// Clear all smoothed magnitudes and counters and force not-stable.
    /// Call when the capture session stops.
    pub fn stop(&mut self) {
        self.filtered_accel = 0.0;
        self.filtered_rotation = 0.0;
        self.stable_count = 0;
        self.unstable_count = 0;
        self.is_stable = false;
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    fn sample(accel: f64, rotation: f64) -> MotionSample {
        MotionSample::new(
            Vector3::new(accel, 0.0, 0.0),
            Vector3::new(rotation, 0.0, 0.0),
        )
    }

    fn still() -> MotionSample {
        sample(0.01, 0.01)
    }

    fn shaking() -> MotionSample {
        sample(2.0, 2.0)
    }

    fn settle(gate: &mut StabilityGate) {
        for _ in 0..40 {
            gate.ingest(&still());
        }
        assert!(gate.is_stable(), "Gate should settle on still samples");
    }

    #[test]
    fn test_fresh_gate_is_not_stable() {
        let gate = StabilityGate::new(StabilityConfig::default());
        assert!(!gate.is_stable());
    }

    #[test]
    fn test_consecutive_still_samples_gain_stability() {
        let config = StabilityConfig::default();
        let mut gate = StabilityGate::new(config);

        let mut flipped_at = None;
        for i in 0..60 {
            if gate.ingest(&still()) {
                flipped_at = Some(i);
                break;
            }
        }
        let flipped_at = flipped_at.expect("Gate should become stable on still input");
        // The EWMA needs no warm-up from zero (magnitudes start below the
        // stable threshold), so the flip lands exactly at the sample
        // requirement.
        assert_eq!(flipped_at + 1, config.required_stable_samples as usize);
    }

    #[test]
    fn test_short_unstable_bursts_do_not_drop_stability() {
        let config = StabilityConfig::default();
        let mut gate = StabilityGate::new(config);
        settle(&mut gate);

        // Oscillate: short bursts of unstable samples separated by still
        // periods. Even counting the EWMA decay tail after each burst, the
        // unstable streak stays below the drop requirement, so stability
        // must hold.
        for _ in 0..10 {
            for _ in 0..3 {
                gate.ingest(&shaking());
            }
            for _ in 0..30 {
                gate.ingest(&still());
            }
            assert!(
                gate.is_stable(),
                "Sub-threshold unstable bursts must not drop stability"
            );
        }
    }

    #[test]
    fn test_sustained_shaking_drops_stability() {
        let mut gate = StabilityGate::new(StabilityConfig::default());
        settle(&mut gate);

        for _ in 0..40 {
            gate.ingest(&shaking());
        }
        assert!(!gate.is_stable(), "Sustained shaking should drop stability");
    }

    #[test]
    fn test_either_signal_alone_can_block_stability() {
        // Still acceleration but sustained rotation: never stable.
        let mut gate = StabilityGate::new(StabilityConfig::default());
        for _ in 0..60 {
            gate.ingest(&sample(0.01, 2.0));
        }
        assert!(!gate.is_stable());
    }

    #[test]
    fn test_dead_zone_input_never_gains_stability() {
        // Magnitudes that settle between the stable and unstable
        // thresholds. The first few samples classify stable while the EWMA
        // warms up, but fewer than the requirement; once the filtered
        // magnitudes enter the dead zone the streak decays and the gate
        // never flips.
        let mut gate = StabilityGate::new(StabilityConfig::default());
        for _ in 0..120 {
            gate.ingest(&sample(0.2, 0.3));
        }
        assert!(!gate.is_stable());
    }

    #[test]
    fn test_dead_zone_holds_current_state() {
        // A stable gate drifting into the dead zone stays stable: the dead
        // zone neither gains nor loses, it holds.
        let mut gate = StabilityGate::new(StabilityConfig::default());
        settle(&mut gate);
        for _ in 0..50 {
            gate.ingest(&sample(0.2, 0.3));
        }
        assert!(gate.is_stable());
    }

    #[test]
    fn test_stop_resets_everything() {
        let mut gate = StabilityGate::new(StabilityConfig::default());
        settle(&mut gate);

        gate.stop();
        assert!(!gate.is_stable());

        // After stop, stability must be re-earned from scratch.
        gate.ingest(&still());
        assert!(!gate.is_stable());
    }
}
