use crate::error::Result;
use crate::math::{Point2, Vector2};

use super::edge::EdgeId;
use super::vertex::VertexId;
use super::GraphStore;

/// An edge with orientation information, i.e. one of its two half-edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OrientedEdge {
    /// The edge identifier.
    pub edge: EdgeId,
    /// If `true`, the edge is traversed in its natural direction (start → end).
    /// If `false`, the edge is traversed in reverse (end → start).
    pub forward: bool,
}

impl OrientedEdge {
    /// Creates a new oriented edge.
    #[must_use]
    pub fn new(edge: EdgeId, forward: bool) -> Self {
        Self { edge, forward }
    }

    /// The same edge traversed the other way.
    #[must_use]
    pub fn reversed(self) -> Self {
        Self::new(self.edge, !self.forward)
    }

    /// Vertex the traversal leaves from.
    ///
    /// # Errors
    ///
    /// Returns an error if the edge is not in the store.
    pub fn origin(&self, store: &GraphStore) -> Result<VertexId> {
        let edge = store.edge(self.edge)?;
        Ok(if self.forward { edge.start } else { edge.end })
    }

    /// Vertex the traversal arrives at.
    ///
    /// # Errors
    ///
    /// Returns an error if the edge is not in the store.
    pub fn target(&self, store: &GraphStore) -> Result<VertexId> {
        let edge = store.edge(self.edge)?;
        Ok(if self.forward { edge.end } else { edge.start })
    }

    /// Direction in which the traversal leaves its origin.
    ///
    /// # Errors
    ///
    /// Returns an error if the edge is not in the store.
    pub fn direction(&self, store: &GraphStore) -> Result<Vector2> {
        Ok(store.edge(self.edge)?.outgoing_direction(self.forward))
    }
}

/// Concatenates the polylines of a closed chain of oriented edges.
///
/// The first point of each edge is dropped, so the result lists every corner
/// once and the closing segment back to the first point is implied.
///
/// # Errors
///
/// Returns an error if an edge is not in the store.
pub fn wire_polyline(store: &GraphStore, wire: &[OrientedEdge]) -> Result<Vec<Point2>> {
    let mut points = Vec::new();
    for oriented in wire {
        let approximation = store.edge(oriented.edge)?.approximation();
        if oriented.forward {
            points.extend(approximation.iter().skip(1));
        } else {
            points.extend(approximation.iter().rev().skip(1));
        }
    }
    Ok(points)
}
