use tracing::debug;

use crate::error::Result;
use crate::math::Point2;
use crate::topology::{EdgeData, GraphStore, VertexId, MAX_DEGREE};

/// One reason a candidate edge cannot be played.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Violation {
    /// The vertex has no free slot left for the candidate.
    DegreeExceeded { label: usize },
    /// The candidate crosses an existing edge here.
    Crossing(Point2),
    /// The candidate crosses itself here.
    SelfCrossing(Point2),
    /// The candidate passes through the disc of a vertex it does not end at.
    TouchesVertex { vertex: VertexId, position: Point2 },
}

impl Violation {
    /// Where the violation is located on the board, if anywhere.
    #[must_use]
    pub fn point(&self) -> Option<Point2> {
        match self {
            Self::DegreeExceeded { .. } => None,
            Self::Crossing(p) | Self::SelfCrossing(p) => Some(*p),
            Self::TouchesVertex { position, .. } => Some(*position),
        }
    }
}

/// Verdict on a candidate edge.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgeValidation {
    pub violations: Vec<Violation>,
}

impl EdgeValidation {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// Board locations of all located violations, for highlighting.
    #[must_use]
    pub fn points(&self) -> Vec<Point2> {
        self.violations.iter().filter_map(Violation::point).collect()
    }
}

/// Checks whether a candidate edge may be added to the graph.
///
/// Degree limits come first, then crossings with every existing edge, then
/// self-crossings. Vertex touches are only looked for when nothing else is
/// wrong.
pub struct ValidateCandidateEdge<'a> {
    candidate: &'a EdgeData,
    vertex_radius: f64,
}

impl<'a> ValidateCandidateEdge<'a> {
    #[must_use]
    pub fn new(candidate: &'a EdgeData, vertex_radius: f64) -> Self {
        Self {
            candidate,
            vertex_radius,
        }
    }

    /// Executes the validation.
    ///
    /// # Errors
    ///
    /// Returns an error if an endpoint of the candidate is not in the store.
    pub fn execute(&self, store: &GraphStore) -> Result<EdgeValidation> {
        let candidate = self.candidate;
        let mut violations = Vec::new();

        let start = store.vertex(candidate.start)?;
        if candidate.is_loop() {
            if start.degree + 2 > MAX_DEGREE {
                violations.push(Violation::DegreeExceeded { label: start.label });
            }
        } else {
            let end = store.vertex(candidate.end)?;
            for vertex in [start, end] {
                if vertex.degree + 1 > MAX_DEGREE {
                    violations.push(Violation::DegreeExceeded { label: vertex.label });
                }
            }
        }

        for (_, edge) in store.edges() {
            violations.extend(candidate.intersections(edge).into_iter().map(Violation::Crossing));
        }
        violations.extend(
            candidate
                .self_intersections()
                .into_iter()
                .map(Violation::SelfCrossing),
        );

        if violations.is_empty() {
            for (id, vertex) in store.vertices() {
                if candidate.touches_vertex(id, &vertex.position, self.vertex_radius) {
                    violations.push(Violation::TouchesVertex {
                        vertex: id,
                        position: vertex.position,
                    });
                }
            }
        }

        if !violations.is_empty() {
            debug!(count = violations.len(), first = ?violations[0], "candidate edge rejected");
        }
        Ok(EdgeValidation { violations })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Point2 {
        Point2::new(x, y)
    }

    fn edge(store: &GraphStore, from: VertexId, via: &[Point2], to: VertexId) -> EdgeData {
        let mut anchors = vec![store.position(from).unwrap()];
        anchors.extend_from_slice(via);
        anchors.push(store.position(to).unwrap());
        EdgeData::from_anchors(from, to, &anchors).unwrap()
    }

    #[test]
    fn straight_path_between_free_spots_is_valid() {
        let mut store = GraphStore::new();
        let a = store.add_vertex(p(100.0, 100.0));
        let b = store.add_vertex(p(300.0, 100.0));
        let candidate = edge(&store, a, &[], b);
        let verdict = ValidateCandidateEdge::new(&candidate, 9.0).execute(&store).unwrap();
        assert!(verdict.is_valid());
        assert!(verdict.points().is_empty());
    }

    #[test]
    fn crossing_an_existing_edge_is_reported_at_the_crossing() {
        let mut store = GraphStore::new();
        let a = store.add_vertex(p(0.0, 0.0));
        let b = store.add_vertex(p(100.0, 100.0));
        let c = store.add_vertex(p(0.0, 100.0));
        let d = store.add_vertex(p(100.0, 0.0));
        let existing = edge(&store, a, &[], b);
        store.add_edge(existing);

        let candidate = edge(&store, c, &[], d);
        let verdict = ValidateCandidateEdge::new(&candidate, 9.0).execute(&store).unwrap();
        assert!(!verdict.is_valid());
        let points = verdict.points();
        assert_eq!(points.len(), 1);
        assert!((points[0] - p(50.0, 50.0)).norm() < 1.0);
    }

    #[test]
    fn saturated_vertex_cannot_take_another_edge() {
        let mut store = GraphStore::new();
        let a = store.add_vertex(p(100.0, 100.0));
        let b = store.add_vertex(p(300.0, 100.0));
        store.vertex_mut(a).unwrap().degree = 3;
        let candidate = edge(&store, a, &[], b);
        let verdict = ValidateCandidateEdge::new(&candidate, 9.0).execute(&store).unwrap();
        assert_eq!(verdict.violations, vec![Violation::DegreeExceeded { label: 0 }]);
    }

    #[test]
    fn loop_needs_two_free_slots() {
        let mut store = GraphStore::new();
        let a = store.add_vertex(p(300.0, 300.0));
        store.vertex_mut(a).unwrap().degree = 2;
        let candidate = edge(&store, a, &[p(400.0, 200.0), p(400.0, 400.0)], a);
        let verdict = ValidateCandidateEdge::new(&candidate, 9.0).execute(&store).unwrap();
        assert_eq!(verdict.violations, vec![Violation::DegreeExceeded { label: 0 }]);

        store.vertex_mut(a).unwrap().degree = 1;
        let verdict = ValidateCandidateEdge::new(&candidate, 9.0).execute(&store).unwrap();
        assert!(verdict.is_valid());
    }

    #[test]
    fn path_through_a_spot_touches_it() {
        let mut store = GraphStore::new();
        let a = store.add_vertex(p(100.0, 100.0));
        let b = store.add_vertex(p(300.0, 100.0));
        let c = store.add_vertex(p(200.0, 104.0));
        let candidate = edge(&store, a, &[], b);
        let verdict = ValidateCandidateEdge::new(&candidate, 9.0).execute(&store).unwrap();
        assert_eq!(
            verdict.violations,
            vec![Violation::TouchesVertex {
                vertex: c,
                position: p(200.0, 104.0),
            }]
        );
    }

    #[test]
    fn touches_are_not_checked_once_something_else_failed() {
        let mut store = GraphStore::new();
        let a = store.add_vertex(p(100.0, 100.0));
        let b = store.add_vertex(p(300.0, 100.0));
        store.add_vertex(p(200.0, 104.0));
        store.vertex_mut(b).unwrap().degree = 3;
        let candidate = edge(&store, a, &[], b);
        let verdict = ValidateCandidateEdge::new(&candidate, 9.0).execute(&store).unwrap();
        assert_eq!(verdict.violations, vec![Violation::DegreeExceeded { label: 1 }]);
    }
}
