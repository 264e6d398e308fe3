use super::intersect_2d::Segment;
use super::{Point2, FLOAT_IMPRECISION};

/// Computes the signed area of a closed polygon (shoelace formula).
///
/// Positive for counter-clockwise, negative for clockwise. The closing
/// edge from the last point back to the first is implied.
#[must_use]
pub fn signed_area_2d(points: &[Point2]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        sum += points[i].x * points[j].y - points[j].x * points[i].y;
    }
    sum * 0.5
}

/// An axis-aligned bounding box in the plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb2 {
    pub min: Point2,
    pub max: Point2,
}

impl Aabb2 {
    /// Bounding box of a point set. An empty set yields a box containing nothing.
    #[must_use]
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point2>) -> Self {
        let mut min = Point2::new(f64::INFINITY, f64::INFINITY);
        let mut max = Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in points {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        Self { min, max }
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// Inclusive containment test, padded by [`FLOAT_IMPRECISION`].
    #[must_use]
    pub fn contains(&self, point: &Point2) -> bool {
        point.x >= self.min.x - FLOAT_IMPRECISION
            && point.x <= self.max.x + FLOAT_IMPRECISION
            && point.y >= self.min.y - FLOAT_IMPRECISION
            && point.y <= self.max.y + FLOAT_IMPRECISION
    }
}

/// Classification of a point relative to a closed polygon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointClassification {
    Inside,
    Outside,
    OnBoundary,
}

impl PointClassification {
    /// Whether the point belongs to the closed polygon (boundary counts as inside).
    #[must_use]
    pub fn is_inside_or_on(self) -> bool {
        !matches!(self, Self::Outside)
    }
}

/// Classifies `point` against the closed polygon `border` using the winding number.
///
/// Points lying on a border segment are reported as
/// [`PointClassification::OnBoundary`] before any crossing is counted.
/// Crossings follow the half-open rule: an upward edge includes its lower
/// endpoint and excludes its upper one, and a downward edge the reverse, so
/// a vertex shared by two edges or a horizontal edge is never counted twice.
#[must_use]
pub fn classify_point_in_polygon(point: &Point2, border: &[Point2]) -> PointClassification {
    let n = border.len();
    if n == 0 {
        return PointClassification::Outside;
    }

    for i in 0..n {
        let start = border[i];
        let end = border[(i + 1) % n];
        if Segment::new(start, end).contains_point(point) {
            return PointClassification::OnBoundary;
        }
    }

    let mut winding = 0i32;
    for i in 0..n {
        let start = border[i];
        let end = border[(i + 1) % n];
        if start == end {
            continue;
        }
        let side = is_left(&start, &end, point);
        if start.y <= point.y {
            // Upward crossing.
            if end.y > point.y && side > 0.0 {
                winding += 1;
            }
        } else if end.y <= point.y && side < 0.0 {
            // Downward crossing.
            winding -= 1;
        }
    }

    if winding == 0 {
        PointClassification::Outside
    } else {
        PointClassification::Inside
    }
}

/// Twice the signed area of triangle `(start, end, point)`.
///
/// Positive when `point` is left of the directed line `start → end`.
fn is_left(start: &Point2, end: &Point2, point: &Point2) -> f64 {
    (end.x - start.x) * (point.y - start.y) - (point.x - start.x) * (end.y - start.y)
}
