use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::{debug, trace};

use crate::error::{MoveError, Result, TopologyError};
use crate::math::polygon_2d::signed_area_2d;
use crate::math::Point2;
use crate::topology::{wire_polyline, Adjacency, EdgeId, GraphStore, OrientedEdge, VertexId};

/// Finds the faces around the connected component of a start vertex.
///
/// Every half-edge of the component is walked exactly once. At each vertex the
/// walk leaves along the half-edge that comes next clockwise after the one it
/// arrived on, so each closed walk traces one face with the face on its left.
/// Walks that use an edge twice run along a dead end or a bridge and are
/// discarded.
pub struct FindFaces<'a> {
    start: VertexId,
    adjacency: &'a Adjacency,
}

impl<'a> FindFaces<'a> {
    #[must_use]
    pub fn new(start: VertexId, adjacency: &'a Adjacency) -> Self {
        Self { start, adjacency }
    }

    /// Executes the search, returning each face as its boundary walk.
    ///
    /// # Errors
    ///
    /// Returns an error if an edge of the adjacency is missing from the store
    /// or the adjacency does not list an edge at both of its endpoints.
    pub fn execute(&self, store: &GraphStore) -> Result<Vec<Vec<OrientedEdge>>> {
        let rotations = Rotations::new(store, self.adjacency)?;
        let mut used: HashSet<OrientedEdge> = HashSet::new();
        let mut faces = Vec::new();

        for first in component_half_edges(store, self.adjacency, self.start)? {
            if used.contains(&first) {
                continue;
            }
            let walk = rotations.walk(store, first)?;
            used.extend(walk.iter().copied());
            let distinct: HashSet<EdgeId> = walk.iter().map(|h| h.edge).collect();
            if distinct.len() == walk.len() {
                faces.push(walk);
            } else {
                trace!(length = walk.len(), "discarding walk along a dead end");
            }
        }

        debug!(faces = faces.len(), "face search finished");
        Ok(faces)
    }
}

/// The two sides of a path `a → vertex → b` that was just added to a face.
#[derive(Debug, Clone)]
pub enum NewCycles {
    /// Both sides are the same face: the path closes no cycle.
    Bridge,
    /// One simple cycle per side of the path, both passing through the vertex.
    Cycles([SideCycle; 2]),
}

/// A simple cycle through a new path, traced with its side of the path on the left.
#[derive(Debug, Clone)]
pub struct SideCycle {
    pub edges: Vec<OrientedEdge>,
    /// Closed polyline of the cycle.
    pub border: Vec<Point2>,
    /// Positive when the traced side is the bounded interior of the cycle.
    pub signed_area: f64,
}

impl SideCycle {
    fn from_walk(store: &GraphStore, walk: &[OrientedEdge]) -> Result<Self> {
        let edges = loop_erased(store, walk)?;
        let border = wire_polyline(store, &edges)?;
        let signed_area = signed_area_2d(&border);
        Ok(Self {
            edges,
            border,
            signed_area,
        })
    }

    /// Whether the traced side is the inside of the cycle.
    #[must_use]
    pub fn is_bounded(&self) -> bool {
        self.signed_area > 0.0
    }

    #[must_use]
    pub fn edge_set(&self) -> BTreeSet<EdgeId> {
        self.edges.iter().map(|h| h.edge).collect()
    }
}

/// Traces the cycles closed by two edges meeting at a degree-2 vertex.
///
/// Both edges must already be listed in the adjacency.
pub struct CyclesThrough<'a> {
    vertex: VertexId,
    first: EdgeId,
    second: EdgeId,
    adjacency: &'a Adjacency,
}

impl<'a> CyclesThrough<'a> {
    #[must_use]
    pub fn new(vertex: VertexId, first: EdgeId, second: EdgeId, adjacency: &'a Adjacency) -> Self {
        Self {
            vertex,
            first,
            second,
            adjacency,
        }
    }

    /// Executes the trace.
    ///
    /// Each side is walked starting with the new edge leaving the vertex. When
    /// the walk of one side also leaves along the other new edge, both sides
    /// are one face. Otherwise loops hanging off each walk are erased, leaving
    /// the simple cycle through the vertex.
    ///
    /// # Errors
    ///
    /// Returns an error if an edge is missing from the store or is not
    /// incident to the vertex.
    pub fn execute(&self, store: &GraphStore) -> Result<NewCycles> {
        let rotations = Rotations::new(store, self.adjacency)?;
        let first = leaving(store, self.first, self.vertex)?;
        let second = leaving(store, self.second, self.vertex)?;

        let first_walk = rotations.walk(store, first)?;
        if first_walk.contains(&second) {
            debug!(length = first_walk.len(), "new path does not close a face");
            return Ok(NewCycles::Bridge);
        }
        let second_walk = rotations.walk(store, second)?;

        let cycles = [
            SideCycle::from_walk(store, &first_walk)?,
            SideCycle::from_walk(store, &second_walk)?,
        ];
        debug!(
            first_area = cycles[0].signed_area,
            second_area = cycles[1].signed_area,
            "new path closes a cycle"
        );
        Ok(NewCycles::Cycles(cycles))
    }
}

/// The half-edge of `edge` leaving `vertex`.
fn leaving(store: &GraphStore, edge: EdgeId, vertex: VertexId) -> Result<OrientedEdge> {
    let data = store.edge(edge)?;
    if data.start == vertex {
        Ok(OrientedEdge::new(edge, true))
    } else if data.end == vertex {
        Ok(OrientedEdge::new(edge, false))
    } else {
        Err(MoveError::InvalidInput("new edge is not incident to the midpoint".into()).into())
    }
}

/// Removes every closed sub-walk, keeping the simple cycle through the walk's origin.
///
/// The walk must start and end at its origin and pass it nowhere else.
fn loop_erased(store: &GraphStore, walk: &[OrientedEdge]) -> Result<Vec<OrientedEdge>> {
    let Some((closing, body)) = walk.split_last() else {
        return Ok(Vec::new());
    };
    let mut path: Vec<OrientedEdge> = Vec::with_capacity(walk.len());
    let mut visited: Vec<VertexId> = vec![walk[0].origin(store)?];
    for half_edge in body {
        let target = half_edge.target(store)?;
        if let Some(index) = visited.iter().position(|v| *v == target) {
            path.truncate(index);
            visited.truncate(index + 1);
        } else {
            path.push(*half_edge);
            visited.push(target);
        }
    }
    path.push(*closing);
    Ok(path)
}

/// Half-edges of the component containing `start`, in a stable order.
fn component_half_edges(
    store: &GraphStore,
    adjacency: &Adjacency,
    start: VertexId,
) -> Result<BTreeSet<OrientedEdge>> {
    let mut seen = HashSet::from([start]);
    let mut stack = vec![start];
    let mut half_edges = BTreeSet::new();

    while let Some(vertex) = stack.pop() {
        let Some(edges) = adjacency.get(&vertex) else {
            continue;
        };
        for &edge in edges {
            half_edges.insert(OrientedEdge::new(edge, true));
            half_edges.insert(OrientedEdge::new(edge, false));
            if let Some(other) = store.edge(edge)?.other_end(vertex) {
                if seen.insert(other) {
                    stack.push(other);
                }
            }
        }
    }
    Ok(half_edges)
}

/// Outgoing half-edges around each vertex, sorted counter-clockwise.
struct Rotations {
    around: HashMap<VertexId, Vec<OrientedEdge>>,
    half_edge_count: usize,
}

impl Rotations {
    fn new(store: &GraphStore, adjacency: &Adjacency) -> Result<Self> {
        let mut around = HashMap::with_capacity(adjacency.len());
        let mut half_edge_count = 0;
        for (&vertex, edges) in adjacency {
            let mut outgoing: Vec<(f64, OrientedEdge)> = Vec::with_capacity(edges.len());
            for &edge in edges {
                let data = store.edge(edge)?;
                for forward in [true, false] {
                    let origin = if forward { data.start } else { data.end };
                    if origin == vertex {
                        let d = data.outgoing_direction(forward);
                        outgoing.push((d.y.atan2(d.x), OrientedEdge::new(edge, forward)));
                    }
                }
            }
            outgoing.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
            half_edge_count += outgoing.len();
            around.insert(vertex, outgoing.into_iter().map(|(_, h)| h).collect());
        }
        Ok(Self {
            around,
            half_edge_count,
        })
    }

    /// The half-edge following `half_edge` along its face.
    fn next(&self, store: &GraphStore, half_edge: OrientedEdge) -> Result<OrientedEdge> {
        let target = half_edge.target(store)?;
        let twin = half_edge.reversed();
        let missing = || TopologyError::InvalidTopology("edge missing from adjacency".into());
        let rotation = self.around.get(&target).ok_or_else(missing)?;
        let index = rotation.iter().position(|h| *h == twin).ok_or_else(missing)?;
        Ok(rotation[(index + rotation.len() - 1) % rotation.len()])
    }

    /// Follows `next` from `first` until the walk closes.
    fn walk(&self, store: &GraphStore, first: OrientedEdge) -> Result<Vec<OrientedEdge>> {
        let mut walk = vec![first];
        let mut current = self.next(store, first)?;
        while current != first {
            if walk.len() > self.half_edge_count {
                return Err(TopologyError::InvalidTopology("face walk does not close".into()).into());
            }
            walk.push(current);
            current = self.next(store, current)?;
        }
        Ok(walk)
    }
}
