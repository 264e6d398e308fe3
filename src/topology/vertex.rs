use crate::math::Point2;

slotmap::new_key_type! {
    /// Unique identifier for a vertex in the graph store.
    pub struct VertexId;
}

/// Maximum number of edge-ends that may meet at a vertex.
pub const MAX_DEGREE: u8 = 3;

/// Data associated with a game vertex.
#[derive(Debug, Clone)]
pub struct VertexData {
    /// Board position of the vertex.
    pub position: Point2,
    /// Number of edge-ends incident to the vertex. A loop counts twice.
    pub degree: u8,
    /// Session-wide label, assigned in creation order starting at 0.
    pub label: usize,
}

impl VertexData {
    /// Creates a new, unconnected vertex.
    #[must_use]
    pub fn new(position: Point2, label: usize) -> Self {
        Self {
            position,
            degree: 0,
            label,
        }
    }

    /// Number of edge-ends that can still be attached.
    #[must_use]
    pub fn free_slots(&self) -> u8 {
        MAX_DEGREE.saturating_sub(self.degree)
    }
}
