use crate::math::polygon_2d::Aabb2;
use crate::math::Point2;

use super::clipping;

/// Flatness tolerance, in pixels, used when approximating a curve by a polyline.
pub const FLATNESS_TOLERANCE: f64 = 1.0;

/// Subdivision depth at which flattening stops regardless of flatness.
const MAX_FLATTEN_DEPTH: u32 = 16;

/// A cubic Bézier curve in the plane.
///
/// The curve is parameterized over `[0, 1]`:
/// `B(t) = (1-t)³·start + 3(1-t)²t·control_1 + 3(1-t)t²·control_2 + t³·end`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicBezier {
    pub start: Point2,
    pub control_1: Point2,
    pub control_2: Point2,
    pub end: Point2,
}

impl CubicBezier {
    #[must_use]
    pub fn new(start: Point2, control_1: Point2, control_2: Point2, end: Point2) -> Self {
        Self {
            start,
            control_1,
            control_2,
            end,
        }
    }

    /// A straight segment expressed as a cubic, with the controls at a third
    /// and two thirds of the chord so the parameter runs uniformly.
    #[must_use]
    pub fn line(start: Point2, end: Point2) -> Self {
        let step = (end - start) / 3.0;
        Self::new(start, start + step, end - step, end)
    }

    /// The four defining points in curve order.
    #[must_use]
    pub fn points(&self) -> [Point2; 4] {
        [self.start, self.control_1, self.control_2, self.end]
    }

    /// Evaluates the curve at parameter `t`.
    #[must_use]
    pub fn point_at(&self, t: f64) -> Point2 {
        self.blossom(t, t, t)
    }

    /// Splits the curve at `t` into the pieces over `[0, t]` and `[t, 1]`.
    #[must_use]
    pub fn split(&self, t: f64) -> (Self, Self) {
        let m0 = self.start.lerp(&self.control_1, t);
        let m1 = self.control_1.lerp(&self.control_2, t);
        let m2 = self.control_2.lerp(&self.end, t);
        let q0 = m0.lerp(&m1, t);
        let q1 = m1.lerp(&m2, t);
        let mid = q0.lerp(&q1, t);
        (
            Self::new(self.start, m0, q0, mid),
            Self::new(mid, q1, m2, self.end),
        )
    }

    /// Returns the piece of the curve over `[t_min, t_max]`, reparameterized to `[0, 1]`.
    #[must_use]
    pub fn sub_curve(&self, t_min: f64, t_max: f64) -> Self {
        if t_min <= 0.0 && t_max >= 1.0 {
            return *self;
        }
        Self::new(
            self.blossom(t_min, t_min, t_min),
            self.blossom(t_min, t_min, t_max),
            self.blossom(t_min, t_max, t_max),
            self.blossom(t_max, t_max, t_max),
        )
    }

    /// De Casteljau evaluation with a separate parameter per level (the polar form).
    fn blossom(&self, u: f64, v: f64, w: f64) -> Point2 {
        let a = self.start.lerp(&self.control_1, u);
        let b = self.control_1.lerp(&self.control_2, u);
        let c = self.control_2.lerp(&self.end, u);
        let d = a.lerp(&b, v);
        let e = b.lerp(&c, v);
        d.lerp(&e, w)
    }

    /// Bounding box of the control polygon, which contains the curve.
    #[must_use]
    pub fn bounding_box(&self) -> Aabb2 {
        Aabb2::from_points(&self.points())
    }

    /// Area of the control-polygon bounding box, with each side clamped to at least one pixel.
    #[must_use]
    pub fn bounding_box_area(&self) -> f64 {
        let bbox = self.bounding_box();
        bbox.width().max(1.0) * bbox.height().max(1.0)
    }

    /// Whether the chord approximates the curve within `tolerance` pixels.
    ///
    /// Compares the controls' deviation from the chord against `16·tolerance²`.
    #[must_use]
    pub fn is_flat_enough(&self, tolerance: f64) -> bool {
        let limit = 16.0 * tolerance * tolerance;
        let u = self.control_1.coords * 3.0 - self.start.coords * 2.0 - self.end.coords;
        let v = self.control_2.coords * 3.0 - self.end.coords * 2.0 - self.start.coords;
        let x = (u.x * u.x).max(v.x * v.x);
        let y = (u.y * u.y).max(v.y * v.y);
        x + y <= limit
    }

    /// Flattens the curve into a polyline from `start` to `end`.
    #[must_use]
    pub fn approximate(&self) -> Vec<Point2> {
        let mut points = vec![self.start];
        self.flatten_into(&mut points, 0);
        points
    }

    fn flatten_into(&self, points: &mut Vec<Point2>, depth: u32) {
        if depth >= MAX_FLATTEN_DEPTH || self.is_flat_enough(FLATNESS_TOLERANCE) {
            points.push(self.end);
            return;
        }
        let (left, right) = self.split(0.5);
        left.flatten_into(points, depth + 1);
        right.flatten_into(points, depth + 1);
    }

    /// All crossing points with `other`, found by Bézier clipping.
    #[must_use]
    pub fn intersections(&self, other: &Self) -> Vec<Point2> {
        clipping::intersect(self, other)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sample() -> CubicBezier {
        CubicBezier::new(
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 30.0),
            Point2::new(40.0, 30.0),
            Point2::new(50.0, 0.0),
        )
    }

    #[test]
    fn evaluates_endpoints() {
        let c = sample();
        assert_eq!(c.point_at(0.0), c.start);
        assert_eq!(c.point_at(1.0), c.end);
        let mid = c.point_at(0.5);
        assert_abs_diff_eq!(mid.x, 25.0, epsilon = 1e-12);
        assert_abs_diff_eq!(mid.y, 22.5, epsilon = 1e-12);
    }

    #[test]
    fn split_pieces_meet_on_curve() {
        let c = sample();
        let (left, right) = c.split(0.3);
        let p = c.point_at(0.3);
        assert_abs_diff_eq!(left.end.x, p.x, epsilon = 1e-12);
        assert_abs_diff_eq!(right.start.y, p.y, epsilon = 1e-12);
        let q = left.point_at(0.5);
        let expected = c.point_at(0.15);
        assert_abs_diff_eq!(q.x, expected.x, epsilon = 1e-9);
        assert_abs_diff_eq!(q.y, expected.y, epsilon = 1e-9);
    }

    #[test]
    fn sub_curve_reparameterizes() {
        let c = sample();
        let sub = c.sub_curve(0.2, 0.6);
        for (s, t) in [(0.0, 0.2), (0.5, 0.4), (1.0, 0.6)] {
            let a = sub.point_at(s);
            let b = c.point_at(t);
            assert_abs_diff_eq!(a.x, b.x, epsilon = 1e-9);
            assert_abs_diff_eq!(a.y, b.y, epsilon = 1e-9);
        }
        assert_eq!(c.sub_curve(0.0, 1.0), c);
    }

    #[test]
    fn bounding_box_area_is_clamped_to_a_pixel() {
        let dot = CubicBezier::line(Point2::new(5.0, 5.0), Point2::new(5.2, 5.1));
        assert_abs_diff_eq!(dot.bounding_box_area(), 1.0);
        let wide = CubicBezier::line(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0));
        assert_abs_diff_eq!(wide.bounding_box_area(), 10.0);
    }

    #[test]
    fn straight_line_is_flat() {
        let line = CubicBezier::line(Point2::new(0.0, 0.0), Point2::new(100.0, 50.0));
        assert!(line.is_flat_enough(FLATNESS_TOLERANCE));
        assert_eq!(line.approximate(), vec![line.start, line.end]);
        assert_abs_diff_eq!(line.point_at(0.25).x, 25.0, epsilon = 1e-9);
        assert_abs_diff_eq!(line.point_at(0.25).y, 12.5, epsilon = 1e-9);
    }

    #[test]
    fn approximation_stays_close_to_curve() {
        let c = sample();
        let poly = c.approximate();
        assert!(poly.len() > 2);
        assert_eq!(poly[0], c.start);
        assert_eq!(*poly.last().unwrap(), c.end);
        for p in &poly {
            // Every flattened vertex is an exact curve point.
            let closest = (0..=1000)
                .map(|i| (c.point_at(f64::from(i) / 1000.0) - p).norm())
                .fold(f64::INFINITY, f64::min);
            assert!(closest < 0.1);
        }
    }
}
