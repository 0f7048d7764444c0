// src/tracking/corner_filter.rs
//
// Constant-velocity Kalman filter for a single tracked corner.
//
// State: [px, py, vx, vy]
//   - (px, py): corner position in source-image pixels
//   - (vx, vy): velocity in pixels/second
//
// Measurement: [px, py] — the detector observes position only.
//
// Transition for elapsed time dt:
//   px' = px + vx·dt,  py' = py + vy·dt,  vx' = vx,  vy' = vy
//
// The process noise Q is a fixed diagonal, deliberately not scaled by dt.
// With frame intervals near 1/30 s the simplification is invisible in the
// output and keeps the filter's responsiveness independent of dropped frames.

use serde::{Deserialize, Serialize};

use crate::types::Point2D;

// ============================================================================
// 4-STATE MATRIX MATH (inline, no external dependency)
// ============================================================================
//
// Only what the filter needs: multiply, add, transpose, and a closed-form
// 2×2 inverse for the innovation covariance. Everything is stack-allocated.

/// 4×4 matrix stored row-major.
#[derive(Debug, Clone, Copy)]
struct Mat4([f64; 16]);

impl Mat4 {
    const ZERO: Self = Self([0.0; 16]);

    fn identity() -> Self {
        let mut m = Self::ZERO;
        for i in 0..4 {
            m.0[i * 4 + i] = 1.0;
        }
        m
    }

    #[inline]
    fn get(&self, r: usize, c: usize) -> f64 {
        self.0[r * 4 + c]
    }

    #[inline]
    fn set(&mut self, r: usize, c: usize, v: f64) {
        self.0[r * 4 + c] = v;
    }

    fn mul(&self, rhs: &Mat4) -> Mat4 {
        let mut out = Mat4::ZERO;
        for i in 0..4 {
            for j in 0..4 {
                let mut sum = 0.0;
                for k in 0..4 {
                    sum += self.get(i, k) * rhs.get(k, j);
                }
                out.set(i, j, sum);
            }
        }
        out
    }

    fn add(&self, rhs: &Mat4) -> Mat4 {
        let mut out = Mat4::ZERO;
        for i in 0..16 {
            out.0[i] = self.0[i] + rhs.0[i];
        }
        out
    }

    fn sub(&self, rhs: &Mat4) -> Mat4 {
        let mut out = Mat4::ZERO;
        for i in 0..16 {
            out.0[i] = self.0[i] - rhs.0[i];
        }
        out
    }

    fn transpose(&self) -> Mat4 {
        let mut out = Mat4::ZERO;
        for i in 0..4 {
            for j in 0..4 {
                out.set(i, j, self.get(j, i));
            }
        }
        out
    }

    /// 4×4 * 4×1 → 4×1
    fn mul_vec(&self, v: &Vec4) -> Vec4 {
        let mut out = Vec4::ZERO;
        for i in 0..4 {
            let mut sum = 0.0;
            for j in 0..4 {
                sum += self.get(i, j) * v.0[j];
            }
            out.0[i] = sum;
        }
        out
    }
}

/// 2×4 observation matrix H.
#[derive(Debug, Clone, Copy)]
struct Mat2x4([f64; 8]);

impl Mat2x4 {
    const ZERO: Self = Self([0.0; 8]);

    #[inline]
    fn get(&self, r: usize, c: usize) -> f64 {
        self.0[r * 4 + c]
    }

    #[inline]
    fn set(&mut self, r: usize, c: usize, v: f64) {
        self.0[r * 4 + c] = v;
    }

    /// H (2×4) * P (4×4) → 2×4
    fn mul_mat4(&self, rhs: &Mat4) -> Mat2x4 {
        let mut out = Mat2x4::ZERO;
        for i in 0..2 {
            for j in 0..4 {
                let mut sum = 0.0;
                for k in 0..4 {
                    sum += self.get(i, k) * rhs.get(k, j);
                }
                out.set(i, j, sum);
            }
        }
        out
    }

    /// H (2×4) * v (4×1) → 2×1
    fn mul_vec(&self, v: &Vec4) -> Vec2 {
        let mut out = Vec2::ZERO;
        for i in 0..2 {
            let mut sum = 0.0;
            for j in 0..4 {
                sum += self.get(i, j) * v.0[j];
            }
            out.0[i] = sum;
        }
        out
    }

    fn transpose(&self) -> Mat4x2 {
        let mut out = Mat4x2::ZERO;
        for i in 0..2 {
            for j in 0..4 {
                out.set(j, i, self.get(i, j));
            }
        }
        out
    }
}

/// 4×2 matrix (H transposed, Kalman gain).
#[derive(Debug, Clone, Copy)]
struct Mat4x2([f64; 8]);

impl Mat4x2 {
    const ZERO: Self = Self([0.0; 8]);

    #[inline]
    fn get(&self, r: usize, c: usize) -> f64 {
        self.0[r * 2 + c]
    }

    #[inline]
    fn set(&mut self, r: usize, c: usize, v: f64) {
        self.0[r * 2 + c] = v;
    }

    /// (4×2) * (2×2) → 4×2
    fn mul_mat2(&self, rhs: &Mat2) -> Mat4x2 {
        let mut out = Mat4x2::ZERO;
        for i in 0..4 {
            for j in 0..2 {
                let mut sum = 0.0;
                for k in 0..2 {
                    sum += self.get(i, k) * rhs.get(k, j);
                }
                out.set(i, j, sum);
            }
        }
        out
    }

    /// (4×2) * (2×1) → 4×1
    fn mul_vec2(&self, v: &Vec2) -> Vec4 {
        let mut out = Vec4::ZERO;
        for i in 0..4 {
            out.0[i] = self.get(i, 0) * v.0[0] + self.get(i, 1) * v.0[1];
        }
        out
    }

    /// K (4×2) * H (2×4) → 4×4
    fn mul_mat2x4(&self, rhs: &Mat2x4) -> Mat4 {
        let mut out = Mat4::ZERO;
        for i in 0..4 {
            for j in 0..4 {
                let mut sum = 0.0;
                for k in 0..2 {
                    sum += self.get(i, k) * rhs.get(k, j);
                }
                out.set(i, j, sum);
            }
        }
        out
    }
}

/// 2×2 matrix for the innovation covariance S.
#[derive(Debug, Clone, Copy)]
struct Mat2([f64; 4]);

impl Mat2 {
    #[inline]
    fn get(&self, r: usize, c: usize) -> f64 {
        self.0[r * 2 + c]
    }

    /// Closed-form 2×2 inverse. Returns None if singular; with R's diagonal
    /// added to S this never happens for positive measurement noise.
    fn invert(&self) -> Option<Self> {
        let [a, b, c, d] = self.0;
        let det = a * d - b * c;
        if det.abs() < 1e-12 {
            return None;
        }
        let inv_det = 1.0 / det;
        Some(Mat2([d * inv_det, -b * inv_det, -c * inv_det, a * inv_det]))
    }
}

/// 4-element state vector.
#[derive(Debug, Clone, Copy)]
struct Vec4([f64; 4]);

impl Vec4 {
    const ZERO: Self = Self([0.0; 4]);

    fn add(&self, rhs: &Vec4) -> Vec4 {
        Vec4([
            self.0[0] + rhs.0[0],
            self.0[1] + rhs.0[1],
            self.0[2] + rhs.0[2],
            self.0[3] + rhs.0[3],
        ])
    }
}

/// 2-element measurement/innovation vector.
#[derive(Debug, Clone, Copy)]
struct Vec2([f64; 2]);

impl Vec2 {
    const ZERO: Self = Self([0.0; 2]);

    fn sub(&self, rhs: &Vec2) -> Vec2 {
        Vec2([self.0[0] - rhs.0[0], self.0[1] - rhs.0[1]])
    }
}

/// (2×4) * (4×4) * (4×2) → 2×2 — needed for S = H P H' + R
fn hpht(h: &Mat2x4, p: &Mat4, ht: &Mat4x2) -> Mat2 {
    let hp = h.mul_mat4(p);
    let mut out = Mat2([0.0; 4]);
    for i in 0..2 {
        for j in 0..2 {
            let mut sum = 0.0;
            for k in 0..4 {
                sum += hp.get(i, k) * ht.get(k, j);
            }
            out.0[i * 2 + j] = sum;
        }
    }
    out
}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Noise and initialization parameters for one corner filter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct CornerFilterConfig {
    /// Process noise on every state component per predict step.
    /// Higher = more responsive to real motion, noisier overlay.
    pub process_noise: f64,

    /// Measurement noise on the detected corner position (px²).
    /// Higher = smoother output, slower to follow the detector.
    pub measurement_noise: f64,

    /// Initial position variance. The first measurement seeds the position,
    /// so this starts small.
    pub initial_position_variance: f64,

    /// Initial velocity variance. Velocity is unobserved at seed time and
    /// starts at zero, so uncertainty here is much larger.
    pub initial_velocity_variance: f64,
}

impl Default for CornerFilterConfig {
    fn default() -> Self {
        Self {
            process_noise: 1e-2,
            measurement_noise: 3e-1,
            initial_position_variance: 1.0,
            initial_velocity_variance: 10.0,
        }
    }
}

// ============================================================================
// FILTER
// ============================================================================

/// Constant-velocity Kalman filter for one tracked corner.
///
/// Seeded at a measured position with zero velocity. `predict` advances the
/// state by `dt` seconds; `update` corrects it against a fresh measurement.
/// Purely numerical — no failure modes, no I/O.
#[derive(Debug, Clone)]
pub struct CornerKalmanFilter {
    /// State vector [px, py, vx, vy].
    x: Vec4,
    /// State covariance (4×4).
    p: Mat4,
    /// Process noise (4×4, diagonal).
    q: Mat4,
    /// Measurement noise (2×2, diagonal).
    r: Mat2,
    /// Observation matrix H (2×4): extracts position from state.
    h: Mat2x4,
    /// H transposed (4×2).
    ht: Mat4x2,
}

impl CornerKalmanFilter {
    /// Seed a filter at a measured corner position with zero velocity.
    pub fn new(initial: Point2D, config: &CornerFilterConfig) -> Self {
        let mut q = Mat4::ZERO;
        for i in 0..4 {
            q.set(i, i, config.process_noise);
        }

        let r = Mat2([
            config.measurement_noise,
            0.0,
            0.0,
            config.measurement_noise,
        ]);

        let mut h = Mat2x4::ZERO;
        h.set(0, 0, 1.0); // observe px
        h.set(1, 1, 1.0); // observe py
        let ht = h.transpose();

        let mut p = Mat4::ZERO;
        p.set(0, 0, config.initial_position_variance);
        p.set(1, 1, config.initial_position_variance);
        p.set(2, 2, config.initial_velocity_variance);
        p.set(3, 3, config.initial_velocity_variance);

        Self {
            x: Vec4([initial.x, initial.y, 0.0, 0.0]),
            p,
            q,
            r,
            h,
            ht,
        }
    }

    /// Kalman predict step over `dt` seconds.
    ///
    /// `dt` must be positive; callers clamp (the tracker floors it at 1e-3).
    pub fn predict(&mut self, dt: f64) -> Point2D {
        let mut f = Mat4::identity();
        f.set(0, 2, dt);
        f.set(1, 3, dt);

        // x = F·x
        self.x = f.mul_vec(&self.x);
        // P = F·P·F' + Q
        let fp = f.mul(&self.p);
        self.p = fp.mul(&f.transpose()).add(&self.q);

        self.position()
    }

    /// Kalman update step with a freshly measured corner position.
    pub fn update(&mut self, measurement: Point2D) -> Point2D {
        let z = Vec2([measurement.x, measurement.y]);

        // Innovation y = z - H·x
        let innovation = z.sub(&self.h.mul_vec(&self.x));

        // S = H·P·H' + R
        let mut s = hpht(&self.h, &self.p, &self.ht);
        s.0[0] += self.r.0[0];
        s.0[3] += self.r.0[3];

        // K = P·H'·S⁻¹. S is positive definite for positive R; if the
        // inverse still fails numerically, skip the correction this sample.
        let Some(s_inv) = s.invert() else {
            return self.position();
        };
        let pht = {
            let mut out = Mat4x2::ZERO;
            for i in 0..4 {
                for j in 0..2 {
                    let mut sum = 0.0;
                    for k in 0..4 {
                        sum += self.p.get(i, k) * self.ht.get(k, j);
                    }
                    out.set(i, j, sum);
                }
            }
            out
        };
        let k = pht.mul_mat2(&s_inv);

        // x = x + K·y
        self.x = self.x.add(&k.mul_vec2(&innovation));
        // P = (I - K·H)·P
        let kh = k.mul_mat2x4(&self.h);
        self.p = Mat4::identity().sub(&kh).mul(&self.p);

        self.position()
    }

    /// Current position estimate.
    pub fn position(&self) -> Point2D {
        Point2D::new(self.x.0[0], self.x.0[1])
    }

    /// Current velocity estimate (pixels/second).
    pub fn velocity(&self) -> (f64, f64) {
        (self.x.0[2], self.x.0[3])
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f64 = 1.0 / 30.0;

    #[test]
    fn test_seed_state() {
        let kf = CornerKalmanFilter::new(Point2D::new(12.0, 34.0), &CornerFilterConfig::default());
        assert_eq!(kf.position(), Point2D::new(12.0, 34.0));
        assert_eq!(kf.velocity(), (0.0, 0.0));
    }

    #[test]
    fn test_converges_on_stationary_measurement() {
        let config = CornerFilterConfig::default();
        let target = Point2D::new(100.0, 200.0);
        // Seed deliberately off-target to exercise convergence.
        let mut kf = CornerKalmanFilter::new(Point2D::new(90.0, 190.0), &config);

        for _ in 0..60 {
            kf.predict(DT);
            kf.update(target);
        }

        let pos = kf.position();
        assert!(
            (pos.x - target.x).abs() < 0.5 && (pos.y - target.y).abs() < 0.5,
            "Position should converge to the stationary measurement, got {pos:?}"
        );
        let (vx, vy) = kf.velocity();
        assert!(
            vx.abs() < 0.5 && vy.abs() < 0.5,
            "Velocity should converge to zero, got ({vx}, {vy})"
        );
    }

    #[test]
    fn test_tracks_constant_velocity_target() {
        let config = CornerFilterConfig::default();
        let (vx, vy) = (120.0, -60.0); // px/s
        let mut kf = CornerKalmanFilter::new(Point2D::new(0.0, 0.0), &config);

        let mut truth = Point2D::new(0.0, 0.0);
        for step in 1..=90 {
            let t = step as f64 * DT;
            truth = Point2D::new(vx * t, vy * t);
            kf.predict(DT);
            kf.update(truth);
        }

        // After the measurement sequence, one predict-only step should land
        // near the true next position — velocity has been learned.
        let predicted = kf.predict(DT);
        let expected = Point2D::new(truth.x + vx * DT, truth.y + vy * DT);
        assert!(
            predicted.distance_to(&expected) < 2.0,
            "Predicted {predicted:?}, expected near {expected:?}"
        );
    }

    #[test]
    fn test_predict_grows_uncertainty_update_shrinks_it() {
        let config = CornerFilterConfig::default();
        let mut kf = CornerKalmanFilter::new(Point2D::new(0.0, 0.0), &config);

        let p_before = kf.p.get(0, 0);
        kf.predict(DT);
        let p_after_predict = kf.p.get(0, 0);
        assert!(p_after_predict > p_before);

        kf.update(Point2D::new(0.0, 0.0));
        let p_after_update = kf.p.get(0, 0);
        assert!(p_after_update < p_after_predict);
    }

    #[test]
    fn test_smoothing_rejects_single_frame_jitter() {
        let config = CornerFilterConfig::default();
        let anchor = Point2D::new(50.0, 50.0);
        let mut kf = CornerKalmanFilter::new(anchor, &config);
        for _ in 0..30 {
            kf.predict(DT);
            kf.update(anchor);
        }

        // One wild outlier measurement should move the estimate only a
        // fraction of the way toward it.
        kf.predict(DT);
        let pos = kf.update(Point2D::new(80.0, 50.0));
        assert!(
            pos.x < 70.0,
            "A settled filter should damp single-frame jitter, got x={}",
            pos.x
        );
    }
}
