pub mod edge;
pub mod region;
pub mod vertex;
pub mod wire;

pub use edge::{EdgeData, EdgeId};
pub use region::{Adjacency, RegionContents, RegionData, RegionId};
pub use vertex::{VertexData, VertexId, MAX_DEGREE};
pub use wire::{wire_polyline, OrientedEdge};

use crate::error::TopologyError;
use crate::math::Point2;
use slotmap::SlotMap;

/// Central arena that owns all vertices and edges of a game.
///
/// Entities reference each other via typed IDs (generational indices).
/// Vertex labels are handed out in creation order and index `labels`.
#[derive(Debug, Default)]
pub struct GraphStore {
    vertices: SlotMap<VertexId, VertexData>,
    edges: SlotMap<EdgeId, EdgeData>,
    labels: Vec<VertexId>,
}

impl GraphStore {
    /// Creates a new, empty graph store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes every vertex and edge and restarts labelling at 0.
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.edges.clear();
        self.labels.clear();
    }

    // --- Vertex operations ---

    /// Inserts an unconnected vertex with the next free label and returns its ID.
    pub fn add_vertex(&mut self, position: Point2) -> VertexId {
        let label = self.labels.len();
        let id = self.vertices.insert(VertexData::new(position, label));
        self.labels.push(id);
        id
    }

    /// Removes the most recently added vertex.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is not the newest vertex, since removing any
    /// other vertex would leave a hole in the label sequence.
    pub fn remove_newest_vertex(&mut self, id: VertexId) -> Result<VertexData, TopologyError> {
        if self.labels.last() != Some(&id) {
            return Err(TopologyError::InvalidTopology(
                "only the newest vertex can be removed".into(),
            ));
        }
        self.labels.pop();
        self.vertices
            .remove(id)
            .ok_or_else(|| TopologyError::EntityNotFound("vertex".into()))
    }

    /// Returns a reference to the vertex data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn vertex(&self, id: VertexId) -> Result<&VertexData, TopologyError> {
        self.vertices
            .get(id)
            .ok_or_else(|| TopologyError::EntityNotFound("vertex".into()))
    }

    /// Returns a mutable reference to the vertex data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn vertex_mut(&mut self, id: VertexId) -> Result<&mut VertexData, TopologyError> {
        self.vertices
            .get_mut(id)
            .ok_or_else(|| TopologyError::EntityNotFound("vertex".into()))
    }

    /// Looks a vertex up by its label.
    ///
    /// # Errors
    ///
    /// Returns an error if no vertex carries `label`.
    pub fn vertex_by_label(&self, label: usize) -> Result<VertexId, TopologyError> {
        self.labels
            .get(label)
            .copied()
            .ok_or_else(|| TopologyError::EntityNotFound(format!("vertex with label {label}")))
    }

    /// Position of a vertex.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn position(&self, id: VertexId) -> Result<Point2, TopologyError> {
        Ok(self.vertex(id)?.position)
    }

    /// Iterates over all vertices.
    pub fn vertices(&self) -> impl Iterator<Item = (VertexId, &VertexData)> {
        self.vertices.iter()
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    // --- Edge operations ---

    /// Inserts an edge and returns its ID.
    pub fn add_edge(&mut self, data: EdgeData) -> EdgeId {
        self.edges.insert(data)
    }

    /// Removes an edge, returning its data.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn remove_edge(&mut self, id: EdgeId) -> Result<EdgeData, TopologyError> {
        self.edges
            .remove(id)
            .ok_or_else(|| TopologyError::EntityNotFound("edge".into()))
    }

    /// Returns a reference to the edge data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn edge(&self, id: EdgeId) -> Result<&EdgeData, TopologyError> {
        self.edges
            .get(id)
            .ok_or_else(|| TopologyError::EntityNotFound("edge".into()))
    }

    /// Iterates over all edges.
    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &EdgeData)> {
        self.edges.iter()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}
