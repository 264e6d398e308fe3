use super::{Point2, Vector2, FLOAT_IMPRECISION};

/// Normal lengths below this are treated as a degenerate (zero-length) chord.
const DEGENERATE_NORM: f64 = 1e-12;

/// A line in implicit form `a·x + b·y = c`, normalized so that `a² + b² = 1`.
///
/// With this normalization [`ImplicitLine::distance`] is the signed
/// perpendicular distance of a point to the line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImplicitLine {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

/// How two implicit lines relate to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineRelation {
    Parallel,
    Coincident,
    Intersecting,
}

impl ImplicitLine {
    /// Builds the line through `start` and `end`.
    ///
    /// Returns `None` when the two points coincide.
    #[must_use]
    pub fn through(start: &Point2, end: &Point2) -> Option<Self> {
        let a = start.y - end.y;
        let b = end.x - start.x;
        let c = end.x * start.y - start.x * end.y;
        let norm = a.hypot(b);
        if norm < DEGENERATE_NORM {
            return None;
        }
        Some(Self {
            a: a / norm,
            b: b / norm,
            c: c / norm,
        })
    }

    /// Builds a line from an already normalized normal `(a, b)` and offset `c`.
    #[must_use]
    pub fn from_normal(normal: Vector2, c: f64) -> Self {
        Self {
            a: normal.x,
            b: normal.y,
            c,
        }
    }

    /// Signed perpendicular distance from `point` to the line.
    #[must_use]
    pub fn distance(&self, point: &Point2) -> f64 {
        self.a * point.x + self.b * point.y - self.c
    }

    /// Unit normal of the line.
    #[must_use]
    pub fn normal(&self) -> Vector2 {
        Vector2::new(self.a, self.b)
    }

    /// Classifies this line against `other`.
    #[must_use]
    pub fn relation(&self, other: &Self) -> LineRelation {
        let denominator = self.a * other.b - other.a * self.b;
        if denominator.abs() > DEGENERATE_NORM {
            return LineRelation::Intersecting;
        }
        // Parallel normals may point in opposite directions, which flips c.
        let same_sense = self.a * other.a + self.b * other.b > 0.0;
        let offset = if same_sense {
            self.c - other.c
        } else {
            self.c + other.c
        };
        if offset.abs() < FLOAT_IMPRECISION {
            LineRelation::Coincident
        } else {
            LineRelation::Parallel
        }
    }

    /// Returns the unique intersection point with `other`, if there is one.
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Option<Point2> {
        if self.relation(other) != LineRelation::Intersecting {
            return None;
        }
        let denominator = self.a * other.b - other.a * self.b;
        Some(Point2::new(
            (self.c * other.b - other.c * self.b) / denominator,
            (self.a * other.c - other.a * self.c) / denominator,
        ))
    }
}

/// Result of intersecting two bounded segments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SegmentIntersection {
    None,
    Point(Point2),
    /// The segments lie on the same line and share a stretch of it.
    Overlap,
}

/// A line segment, i.e. an implicit line restricted to the parameter range `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start: Point2,
    pub end: Point2,
    line: Option<ImplicitLine>,
}

impl Segment {
    #[must_use]
    pub fn new(start: Point2, end: Point2) -> Self {
        Self {
            start,
            end,
            line: ImplicitLine::through(&start, &end),
        }
    }

    /// Supporting line, or `None` for a zero-length segment.
    #[must_use]
    pub fn line(&self) -> Option<&ImplicitLine> {
        self.line.as_ref()
    }

    #[must_use]
    pub fn direction(&self) -> Vector2 {
        self.end - self.start
    }

    /// Point at parameter `t`, where `t = 0` is the start and `t = 1` the end.
    #[must_use]
    pub fn point_at(&self, t: f64) -> Point2 {
        self.start + self.direction() * t
    }

    /// Signed distance of `point` to the supporting line.
    ///
    /// Zero-length segments report the plain distance to their start point.
    #[must_use]
    pub fn distance(&self, point: &Point2) -> f64 {
        match &self.line {
            Some(line) => line.distance(point),
            None => (point - self.start).norm(),
        }
    }

    /// Whether `point` lies on the segment, within [`FLOAT_IMPRECISION`].
    #[must_use]
    pub fn contains_point(&self, point: &Point2) -> bool {
        let Some(line) = &self.line else {
            return (point - self.start).norm() < FLOAT_IMPRECISION;
        };
        if line.distance(point).abs() >= FLOAT_IMPRECISION {
            return false;
        }
        let direction = self.direction();
        let length_sq = direction.norm_squared();
        let t = (point - self.start).dot(&direction) / length_sq;
        let slack = FLOAT_IMPRECISION / length_sq.sqrt();
        (-slack..=1.0 + slack).contains(&t)
    }

    /// Whether the perpendicular projection of `point` falls within the segment's span.
    #[must_use]
    pub fn projects_onto(&self, point: &Point2) -> bool {
        let direction = self.direction();
        let from_start = direction.dot(&(point - self.start));
        let from_end = -direction.dot(&(point - self.end));
        from_start * from_end >= 0.0
    }

    /// Intersects two bounded segments.
    #[must_use]
    pub fn intersection(&self, other: &Self) -> SegmentIntersection {
        let (Some(line), Some(other_line)) = (&self.line, &other.line) else {
            return self.degenerate_intersection(other);
        };
        match line.relation(other_line) {
            LineRelation::Parallel => SegmentIntersection::None,
            LineRelation::Coincident => {
                if self.contains_point(&other.start)
                    || self.contains_point(&other.end)
                    || other.contains_point(&self.start)
                {
                    SegmentIntersection::Overlap
                } else {
                    SegmentIntersection::None
                }
            }
            LineRelation::Intersecting => match line.intersection(other_line) {
                Some(p) if self.contains_point(&p) && other.contains_point(&p) => {
                    SegmentIntersection::Point(p)
                }
                _ => SegmentIntersection::None,
            },
        }
    }

    fn degenerate_intersection(&self, other: &Self) -> SegmentIntersection {
        if self.line.is_none() && other.contains_point(&self.start) {
            SegmentIntersection::Point(self.start)
        } else if other.line.is_none() && self.contains_point(&other.start) {
            SegmentIntersection::Point(other.start)
        } else {
            SegmentIntersection::None
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn implicit_line_is_normalized() {
        let line = ImplicitLine::through(&Point2::new(0.0, 0.0), &Point2::new(3.0, 4.0)).unwrap();
        assert_abs_diff_eq!(line.a * line.a + line.b * line.b, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(line.distance(&Point2::new(3.0, 4.0)), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn distance_is_signed() {
        let line = ImplicitLine::through(&Point2::new(0.0, 0.0), &Point2::new(10.0, 0.0)).unwrap();
        let above = line.distance(&Point2::new(5.0, 2.0));
        let below = line.distance(&Point2::new(5.0, -2.0));
        assert_abs_diff_eq!(above.abs(), 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(above, -below, epsilon = 1e-12);
    }

    #[test]
    fn coincident_points_have_no_line() {
        let p = Point2::new(1.0, 1.0);
        assert!(ImplicitLine::through(&p, &p).is_none());
    }

    #[test]
    fn line_relations() {
        let base = ImplicitLine::through(&Point2::new(0.0, 0.0), &Point2::new(1.0, 0.0)).unwrap();
        let shifted = ImplicitLine::through(&Point2::new(0.0, 1.0), &Point2::new(1.0, 1.0)).unwrap();
        let reversed = ImplicitLine::through(&Point2::new(5.0, 0.0), &Point2::new(2.0, 0.0)).unwrap();
        let crossing = ImplicitLine::through(&Point2::new(0.0, -1.0), &Point2::new(1.0, 1.0)).unwrap();
        assert_eq!(base.relation(&shifted), LineRelation::Parallel);
        assert_eq!(base.relation(&reversed), LineRelation::Coincident);
        assert_eq!(base.relation(&crossing), LineRelation::Intersecting);
        assert!(base.intersection(&shifted).is_none());
    }

    #[test]
    fn line_intersection_point() {
        let a = ImplicitLine::through(&Point2::new(0.0, 0.0), &Point2::new(4.0, 4.0)).unwrap();
        let b = ImplicitLine::through(&Point2::new(0.0, 4.0), &Point2::new(4.0, 0.0)).unwrap();
        let p = a.intersection(&b).unwrap();
        assert_abs_diff_eq!(p.x, 2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(p.y, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn segment_contains_endpoints_and_interior() {
        let seg = Segment::new(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0));
        assert!(seg.contains_point(&Point2::new(0.0, 0.0)));
        assert!(seg.contains_point(&Point2::new(10.0, 0.0)));
        assert!(seg.contains_point(&Point2::new(4.0, 0.0005)));
        assert!(!seg.contains_point(&Point2::new(11.0, 0.0)));
        assert!(!seg.contains_point(&Point2::new(4.0, 0.1)));
    }

    #[test]
    fn vertical_segment_contains_point() {
        let seg = Segment::new(Point2::new(3.0, 0.0), Point2::new(3.0, 8.0));
        assert!(seg.contains_point(&Point2::new(3.0, 5.0)));
        assert!(!seg.contains_point(&Point2::new(3.0, 9.0)));
    }

    #[test]
    fn segment_intersection_inside_both() {
        let a = Segment::new(Point2::new(0.0, 0.0), Point2::new(10.0, 10.0));
        let b = Segment::new(Point2::new(0.0, 10.0), Point2::new(10.0, 0.0));
        match a.intersection(&b) {
            SegmentIntersection::Point(p) => {
                assert_abs_diff_eq!(p.x, 5.0, epsilon = 1e-9);
                assert_abs_diff_eq!(p.y, 5.0, epsilon = 1e-9);
            }
            other => panic!("expected a point, got {other:?}"),
        }
    }

    #[test]
    fn segment_intersection_outside_range() {
        let a = Segment::new(Point2::new(0.0, 0.0), Point2::new(1.0, 1.0));
        let b = Segment::new(Point2::new(0.0, 10.0), Point2::new(10.0, 0.0));
        assert_eq!(a.intersection(&b), SegmentIntersection::None);
    }

    #[test]
    fn collinear_segments_overlap() {
        let a = Segment::new(Point2::new(0.0, 0.0), Point2::new(5.0, 0.0));
        let b = Segment::new(Point2::new(3.0, 0.0), Point2::new(8.0, 0.0));
        let c = Segment::new(Point2::new(6.0, 0.0), Point2::new(8.0, 0.0));
        assert_eq!(a.intersection(&b), SegmentIntersection::Overlap);
        assert_eq!(a.intersection(&c), SegmentIntersection::None);
    }

    #[test]
    fn projection_span() {
        let seg = Segment::new(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0));
        assert!(seg.projects_onto(&Point2::new(5.0, 7.0)));
        assert!(seg.projects_onto(&Point2::new(0.0, -3.0)));
        assert!(!seg.projects_onto(&Point2::new(-1.0, 0.5)));
        assert!(!seg.projects_onto(&Point2::new(10.5, 0.5)));
    }
}
