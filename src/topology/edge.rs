use std::cell::OnceCell;

use crate::error::{GeometryError, Result};
use crate::geometry::{curves_through, CubicBezier};
use crate::math::intersect_2d::Segment;
use crate::math::{Point2, Vector2};

use super::vertex::VertexId;

slotmap::new_key_type! {
    /// Unique identifier for an edge in the graph store.
    pub struct EdgeId;
}

/// Hits within this squared distance of a vertex shared by two edges are where
/// the edges legitimately meet.
pub const SHARED_VERTEX_RADIUS_SQ: f64 = 81.0;

/// Hits between consecutive curves must be farther than this (squared) from their joint.
const JOINT_RADIUS_SQ: f64 = 5.0;

/// Hits between non-consecutive curves this close (squared) to an edge end are ignored.
const ENDPOINT_RADIUS_SQ: f64 = 4.0;

/// Distance a polyline point must have from the origin to define an outgoing direction.
const DIRECTION_SAMPLE_DISTANCE: f64 = 1.0;

/// Data associated with a game edge.
///
/// An edge is an immutable, C0-continuous chain of cubic curves between two
/// vertices. Its polyline approximation is computed on first use and kept.
#[derive(Debug, Clone)]
pub struct EdgeData {
    /// Start vertex of the edge.
    pub start: VertexId,
    /// End vertex of the edge. Equal to `start` for a loop.
    pub end: VertexId,
    curves: Vec<CubicBezier>,
    approximation: OnceCell<Vec<Point2>>,
}

impl EdgeData {
    /// Creates an edge from an already built curve chain.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::EmptyCurveList`] if `curves` is empty.
    pub fn new(start: VertexId, end: VertexId, curves: Vec<CubicBezier>) -> Result<Self> {
        if curves.is_empty() {
            return Err(GeometryError::EmptyCurveList.into());
        }
        Ok(Self {
            start,
            end,
            curves,
            approximation: OnceCell::new(),
        })
    }

    /// Creates an edge whose curves pass through `anchors`, the first and last
    /// anchor being the positions of `start` and `end`.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::TooFewAnchors`] if fewer than 2 anchors are given.
    pub fn from_anchors(start: VertexId, end: VertexId, anchors: &[Point2]) -> Result<Self> {
        Self::new(start, end, curves_through(anchors)?)
    }

    #[must_use]
    pub fn curves(&self) -> &[CubicBezier] {
        &self.curves
    }

    #[must_use]
    pub fn start_position(&self) -> Point2 {
        self.curves[0].start
    }

    #[must_use]
    pub fn end_position(&self) -> Point2 {
        self.curves[self.curves.len() - 1].end
    }

    /// Whether the edge starts and ends at the same vertex.
    #[must_use]
    pub fn is_loop(&self) -> bool {
        self.start == self.end
    }

    /// The endpoint opposite `vertex`, or `None` if `vertex` is not an endpoint.
    #[must_use]
    pub fn other_end(&self, vertex: VertexId) -> Option<VertexId> {
        if vertex == self.start {
            Some(self.end)
        } else if vertex == self.end {
            Some(self.start)
        } else {
            None
        }
    }

    /// Polyline approximation of the whole chain, from start to end.
    pub fn approximation(&self) -> &[Point2] {
        self.approximation.get_or_init(|| {
            let mut points: Vec<Point2> = Vec::new();
            for curve in &self.curves {
                let flat = curve.approximate();
                let skip = usize::from(points.last() == flat.first());
                points.extend_from_slice(&flat[skip..]);
            }
            points
        })
    }

    /// Crossing points with `other`.
    ///
    /// Where the end curves of both edges meet at a vertex the edges share,
    /// hits near that vertex are dropped.
    #[must_use]
    pub fn intersections(&self, other: &Self) -> Vec<Point2> {
        let mut exclusions = Vec::with_capacity(2);
        if self.start == other.start || self.end == other.start {
            exclusions.push(other.start_position());
        }
        if self.start == other.end || self.end == other.end {
            exclusions.push(other.end_position());
        }

        let last = self.curves.len() - 1;
        let other_last = other.curves.len() - 1;
        let mut hits = Vec::new();
        for (i, curve) in self.curves.iter().enumerate() {
            let at_end = i == 0 || i == last;
            for (j, other_curve) in other.curves.iter().enumerate() {
                let filtered = at_end && (j == 0 || j == other_last);
                hits.extend(curve.intersections(other_curve).into_iter().filter(|p| {
                    !filtered
                        || exclusions
                            .iter()
                            .all(|q| (p - q).norm_squared() >= SHARED_VERTEX_RADIUS_SQ)
                }));
            }
        }
        hits
    }

    /// Points where the edge crosses itself.
    ///
    /// Consecutive curves always meet at their joint, and for a loop the first
    /// and last curve meet at the loop vertex; those contacts are not crossings.
    #[must_use]
    pub fn self_intersections(&self) -> Vec<Point2> {
        let start = self.start_position();
        let end = self.end_position();
        let near_end = |p: &Point2| {
            (p - start).norm_squared() < ENDPOINT_RADIUS_SQ
                || (p - end).norm_squared() < ENDPOINT_RADIUS_SQ
        };

        let n = self.curves.len();
        let mut hits = Vec::new();
        for i in 0..n {
            for j in i + 1..n {
                let first = &self.curves[i];
                let found = first.intersections(&self.curves[j]);
                let closing = self.is_loop() && i == 0 && j == n - 1;
                if j == i + 1 {
                    hits.extend(found.into_iter().filter(|p| {
                        (p - first.end).norm_squared() > JOINT_RADIUS_SQ && !(closing && near_end(p))
                    }));
                } else {
                    hits.extend(found.into_iter().filter(|p| !near_end(p)));
                }
            }
        }
        hits
    }

    /// Whether a vertex disc at `position` with the given `radius` touches the edge.
    ///
    /// The edge's own endpoints never touch it. Polyline segments next to an
    /// endpoint are skipped when the vertex is also near that endpoint.
    #[must_use]
    pub fn touches_vertex(&self, vertex: VertexId, position: &Point2, radius: f64) -> bool {
        if vertex == self.start || vertex == self.end {
            return false;
        }
        let start = self.start_position();
        let end = self.end_position();
        let near_start = (position - start).norm_squared() < SHARED_VERTEX_RADIUS_SQ;
        let near_end = (position - end).norm_squared() < SHARED_VERTEX_RADIUS_SQ;

        self.approximation().windows(2).any(|pair| {
            if near_start && (pair[0] - start).norm_squared() < SHARED_VERTEX_RADIUS_SQ {
                return false;
            }
            if near_end && (pair[1] - end).norm_squared() < SHARED_VERTEX_RADIUS_SQ {
                return false;
            }
            let segment = Segment::new(pair[0], pair[1]);
            segment.projects_onto(position) && segment.distance(position).abs() < radius
        })
    }

    /// The middle curve evaluated at its parameter midpoint.
    #[must_use]
    pub fn midpoint(&self) -> Point2 {
        self.curves[self.curves.len() / 2].point_at(0.5)
    }

    /// Cuts the chain in two halves and returns them with the cut point.
    ///
    /// An even number of curves is cut at the middle joint; an odd number
    /// splits the middle curve at `t = 0.5`.
    #[must_use]
    pub fn bisect(&self) -> (Vec<CubicBezier>, Vec<CubicBezier>, Point2) {
        let n = self.curves.len();
        let half = n / 2;
        if n % 2 == 0 {
            let cut = self.curves[half - 1].end;
            (self.curves[..half].to_vec(), self.curves[half..].to_vec(), cut)
        } else {
            let (left, right) = self.curves[half].split(0.5);
            let mut first = self.curves[..half].to_vec();
            first.push(left);
            let mut second = vec![right];
            second.extend_from_slice(&self.curves[half + 1..]);
            (first, second, left.end)
        }
    }

    /// Direction in which the edge leaves its start (`forward`) or its end.
    #[must_use]
    pub fn outgoing_direction(&self, forward: bool) -> Vector2 {
        let points = self.approximation();
        if forward {
            first_departure(points.iter())
        } else {
            first_departure(points.iter().rev())
        }
    }
}

/// Vector from the first point to the first later point at least
/// [`DIRECTION_SAMPLE_DISTANCE`] away, or to the last point if none is.
fn first_departure<'a>(mut points: impl Iterator<Item = &'a Point2>) -> Vector2 {
    let Some(origin) = points.next() else {
        return Vector2::zeros();
    };
    let mut last = *origin;
    for p in points {
        last = *p;
        if (p - origin).norm() >= DIRECTION_SAMPLE_DISTANCE {
            break;
        }
    }
    last - origin
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::SproutsError;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;
    use slotmap::SlotMap;

    fn p(x: f64, y: f64) -> Point2 {
        Point2::new(x, y)
    }

    fn ids(n: usize) -> Vec<VertexId> {
        let mut keys: SlotMap<VertexId, ()> = SlotMap::with_key();
        (0..n).map(|_| keys.insert(())).collect()
    }

    #[test]
    fn empty_curve_list_is_rejected() {
        let v = ids(2);
        let err = EdgeData::new(v[0], v[1], Vec::new()).unwrap_err();
        assert!(matches!(
            err,
            SproutsError::Geometry(GeometryError::EmptyCurveList)
        ));
    }

    #[test]
    fn single_anchor_is_rejected() {
        let v = ids(1);
        let err = EdgeData::from_anchors(v[0], v[0], &[p(3.0, 3.0)]).unwrap_err();
        assert!(matches!(
            err,
            SproutsError::Geometry(GeometryError::TooFewAnchors { count: 1 })
        ));
    }

    #[test]
    fn approximation_has_no_duplicate_joins() {
        let v = ids(2);
        let edge =
            EdgeData::from_anchors(v[0], v[1], &[p(0.0, 0.0), p(50.0, 80.0), p(120.0, 10.0)]).unwrap();
        let points = edge.approximation();
        assert_eq!(points[0], p(0.0, 0.0));
        assert_eq!(*points.last().unwrap(), p(120.0, 10.0));
        assert!(points.windows(2).all(|w| w[0] != w[1]));
        assert!(points.contains(&p(50.0, 80.0)));
    }

    #[test]
    fn bisect_even_chain_at_joint() {
        let v = ids(2);
        let anchors = [p(0.0, 0.0), p(40.0, 30.0), p(80.0, 0.0), p(120.0, 30.0), p(160.0, 0.0)];
        let edge = EdgeData::from_anchors(v[0], v[1], &anchors).unwrap();
        let (first, second, cut) = edge.bisect();
        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 2);
        assert_eq!(cut, p(80.0, 0.0));
        assert_eq!(first[1].end, cut);
        assert_eq!(second[0].start, cut);
    }

    #[test]
    fn bisect_odd_chain_splits_middle_curve() {
        let v = ids(2);
        let anchors = [p(0.0, 0.0), p(40.0, 30.0), p(80.0, 0.0), p(120.0, 30.0)];
        let edge = EdgeData::from_anchors(v[0], v[1], &anchors).unwrap();
        let (first, second, cut) = edge.bisect();
        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 2);
        let expected = edge.curves()[1].point_at(0.5);
        assert_abs_diff_eq!(cut.x, expected.x, epsilon = 1e-9);
        assert_abs_diff_eq!(cut.y, expected.y, epsilon = 1e-9);
        assert_eq!(first[0], edge.curves()[0]);
        assert_eq!(second[1], edge.curves()[2]);
        assert_eq!(edge.midpoint(), expected);
    }

    #[test]
    fn straight_edges_cross_once() {
        let v = ids(4);
        let a = EdgeData::from_anchors(v[0], v[1], &[p(0.0, 50.0), p(100.0, 50.0)]).unwrap();
        let b = EdgeData::from_anchors(v[2], v[3], &[p(50.0, 0.0), p(50.0, 100.0)]).unwrap();
        let hits = a.intersections(&b);
        assert_eq!(hits.len(), 1);
        assert!((hits[0] - p(50.0, 50.0)).norm() < 1.0);
        assert_eq!(b.intersections(&a).len(), 1);
    }

    #[test]
    fn edges_meeting_at_shared_vertex_do_not_cross() {
        let v = ids(3);
        let a = EdgeData::from_anchors(v[0], v[1], &[p(0.0, 0.0), p(100.0, 0.0)]).unwrap();
        let b = EdgeData::from_anchors(v[0], v[2], &[p(0.0, 0.0), p(30.0, 60.0), p(0.0, 100.0)]).unwrap();
        assert!(a.intersections(&b).is_empty());
        assert!(b.intersections(&a).is_empty());
    }

    #[test]
    fn closed_loop_without_crossing_has_no_self_intersections() {
        let v = ids(1);
        let corner = p(376.0, 95.0);
        let anchors = [corner, p(154.0, 199.0), p(302.0, 315.0), p(493.0, 120.0), corner];
        let edge = EdgeData::from_anchors(v[0], v[0], &anchors).unwrap();
        assert!(edge.self_intersections().is_empty());
    }

    #[test]
    fn triangular_loop_has_no_self_intersections() {
        let v = ids(1);
        let anchors = [p(100.0, 100.0), p(200.0, 60.0), p(220.0, 160.0), p(100.0, 100.0)];
        let edge = EdgeData::from_anchors(v[0], v[0], &anchors).unwrap();
        assert!(edge.is_loop());
        assert!(edge.self_intersections().is_empty());
    }

    #[test]
    fn crossing_path_reports_self_intersection() {
        let v = ids(2);
        let anchors = [p(0.0, 0.0), p(100.0, 100.0), p(100.0, 0.0), p(0.0, 100.0)];
        let edge = EdgeData::from_anchors(v[0], v[1], &anchors).unwrap();
        let hits = edge.self_intersections();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].x > 20.0 && hits[0].x < 80.0);
        assert!(hits[0].y > 20.0 && hits[0].y < 80.0);
    }

    #[test]
    fn vertex_touching_edge() {
        let v = ids(4);
        let edge = EdgeData::from_anchors(v[0], v[1], &[p(0.0, 0.0), p(100.0, 0.0)]).unwrap();
        assert!(edge.touches_vertex(v[2], &p(50.0, 5.0), 9.0));
        assert!(!edge.touches_vertex(v[2], &p(50.0, 20.0), 9.0));
        assert!(!edge.touches_vertex(v[2], &p(120.0, 0.0), 9.0));
        assert!(!edge.touches_vertex(v[0], &p(0.0, 0.0), 9.0));
        // Close to the edge's start, where it legitimately fans out from a vertex.
        assert!(!edge.touches_vertex(v[3], &p(3.0, 2.0), 9.0));
    }

    #[test]
    fn outgoing_direction_follows_polyline() {
        let v = ids(2);
        let edge = EdgeData::from_anchors(v[0], v[1], &[p(0.0, 0.0), p(100.0, 0.0)]).unwrap();
        let forward = edge.outgoing_direction(true);
        let backward = edge.outgoing_direction(false);
        assert!(forward.x > 0.0);
        assert_abs_diff_eq!(forward.y, 0.0);
        assert!(backward.x < 0.0);
        assert_eq!(edge.other_end(v[0]), Some(v[1]));
        assert_eq!(edge.other_end(v[1]), Some(v[0]));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn random_edges_cross_each_other_equally_often(
            rows in proptest::collection::vec(0.0f64..400.0, 4),
            columns in proptest::collection::vec(0.0f64..400.0, 4),
        ) {
            let v = ids(4);
            let across: Vec<Point2> = rows
                .iter()
                .enumerate()
                .map(|(i, &y)| p(130.0 * i as f64, y))
                .collect();
            let down: Vec<Point2> = columns
                .iter()
                .enumerate()
                .map(|(i, &x)| p(x, 130.0 * i as f64))
                .collect();
            let first = EdgeData::from_anchors(v[0], v[1], &across).unwrap();
            let second = EdgeData::from_anchors(v[2], v[3], &down).unwrap();
            prop_assert_eq!(
                first.intersections(&second).len(),
                second.intersections(&first).len()
            );
        }
    }
}
