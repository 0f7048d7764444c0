// src/types.rs

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// A 2D coordinate, unit-agnostic (pixels in source-image space by convention).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: &Point2D) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Four corners in fixed cyclic order. Callers must supply corners forming a
/// simple polygon; the geometry helpers do not check for self-intersection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quadrilateral {
    pub top_left: Point2D,
    pub top_right: Point2D,
    pub bottom_right: Point2D,
    pub bottom_left: Point2D,
}

impl Quadrilateral {
    pub fn new(
        top_left: Point2D,
        top_right: Point2D,
        bottom_right: Point2D,
        bottom_left: Point2D,
    ) -> Self {
        Self {
            top_left,
            top_right,
            bottom_right,
            bottom_left,
        }
    }

    /// Corners in cyclic order: TL, TR, BR, BL.
    pub fn corners(&self) -> [Point2D; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        ]
    }

    /// Polygon area via the shoelace formula.
    pub fn area(&self) -> f64 {
        let c = self.corners();
        let mut sum = 0.0;
        for i in 0..4 {
            let j = (i + 1) % 4;
            sum += c[i].x * c[j].y - c[j].x * c[i].y;
        }
        sum.abs() * 0.5
    }

    pub fn top_length(&self) -> f64 {
        self.top_left.distance_to(&self.top_right)
    }

    pub fn bottom_length(&self) -> f64 {
        self.bottom_left.distance_to(&self.bottom_right)
    }

    pub fn left_length(&self) -> f64 {
        self.top_left.distance_to(&self.bottom_left)
    }

    pub fn right_length(&self) -> f64 {
        self.top_right.distance_to(&self.bottom_right)
    }

    /// Width-to-height ratio using the average of each pair of opposite sides.
    /// A portrait document is < 1; US Letter is ~0.77.
    pub fn aspect_ratio(&self) -> f64 {
        let width = (self.top_length() + self.bottom_length()) * 0.5;
        let height = (self.left_length() + self.right_length()) * 0.5;
        if height > 0.0 {
            width / height
        } else {
            0.0
        }
    }

    /// Interior angle (radians) at each corner, in TL, TR, BR, BL order.
    /// Degenerate corners (a zero-length adjacent edge) yield an angle of 0.
    pub fn corner_angles(&self) -> [f64; 4] {
        let c = self.corners();
        let mut angles = [0.0; 4];
        for i in 0..4 {
            let prev = c[(i + 3) % 4];
            let next = c[(i + 1) % 4];
            angles[i] = interior_angle(c[i], prev, next);
        }
        angles
    }
}

/// Angle at `vertex` between the edges toward `a` and `b`.
fn interior_angle(vertex: Point2D, a: Point2D, b: Point2D) -> f64 {
    let (ux, uy) = (a.x - vertex.x, a.y - vertex.y);
    let (vx, vy) = (b.x - vertex.x, b.y - vertex.y);
    let nu = (ux * ux + uy * uy).sqrt();
    let nv = (vx * vx + vy * vy).sqrt();
    if nu <= 0.0 || nv <= 0.0 {
        return 0.0;
    }
    let cos = ((ux * vx + uy * vy) / (nu * nv)).clamp(-1.0, 1.0);
    cos.acos()
}

/// One device-motion sample: gravity-removed linear acceleration (m/s²) and
/// angular rate (rad/s), both in the device frame.
#[derive(Debug, Clone, Copy)]
pub struct MotionSample {
    pub acceleration: Vector3<f64>,
    pub rotation_rate: Vector3<f64>,
}

impl MotionSample {
    pub fn new(acceleration: Vector3<f64>, rotation_rate: Vector3<f64>) -> Self {
        Self {
            acceleration,
            rotation_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    fn unit_square(scale: f64) -> Quadrilateral {
        Quadrilateral::new(
            Point2D::new(0.0, 0.0),
            Point2D::new(scale, 0.0),
            Point2D::new(scale, scale),
            Point2D::new(0.0, scale),
        )
    }

    #[test]
    fn test_square_area() {
        assert_relative_eq!(unit_square(100.0).area(), 10000.0);
    }

    #[test]
    fn test_area_invariant_under_winding_direction() {
        // Shoelace sign flips for clockwise vs counter-clockwise; area must not.
        let ccw = unit_square(10.0);
        let cw = Quadrilateral::new(
            Point2D::new(0.0, 0.0),
            Point2D::new(0.0, 10.0),
            Point2D::new(10.0, 10.0),
            Point2D::new(10.0, 0.0),
        );
        assert_relative_eq!(ccw.area(), cw.area());
    }

    #[test]
    fn test_aspect_ratio_portrait_document() {
        // 600 wide, 800 tall -> 0.75
        let quad = Quadrilateral::new(
            Point2D::new(0.0, 0.0),
            Point2D::new(600.0, 0.0),
            Point2D::new(600.0, 800.0),
            Point2D::new(0.0, 800.0),
        );
        assert_relative_eq!(quad.aspect_ratio(), 0.75);
    }

    #[test]
    fn test_rectangle_corner_angles_are_right_angles() {
        for angle in unit_square(50.0).corner_angles() {
            assert_relative_eq!(angle, FRAC_PI_2, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_degenerate_quad_geometry_is_finite() {
        let p = Point2D::new(5.0, 5.0);
        let quad = Quadrilateral::new(p, p, p, p);
        assert_eq!(quad.area(), 0.0);
        assert_eq!(quad.aspect_ratio(), 0.0);
        for angle in quad.corner_angles() {
            assert!(angle.is_finite());
        }
    }
}
