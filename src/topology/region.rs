use std::collections::{BTreeMap, BTreeSet};

use crate::math::polygon_2d::Aabb2;
use crate::math::Point2;

use super::edge::EdgeId;
use super::vertex::VertexId;
use super::wire::OrientedEdge;

slotmap::new_key_type! {
    /// Unique identifier for a region in the region tree.
    pub struct RegionId;
}

/// Incident edges per vertex, as tracked by one region.
pub type Adjacency = BTreeMap<VertexId, BTreeSet<EdgeId>>;

/// What a region holds at its own nesting level.
#[derive(Debug, Clone, PartialEq)]
pub enum RegionContents {
    /// The region is a face of the game: it owns the vertices visible inside it
    /// and the edges incident to them.
    Populated {
        vertices: BTreeSet<VertexId>,
        adjacency: Adjacency,
    },
    /// The region only groups its children; its whole interior is covered by them.
    Container,
}

impl RegionContents {
    /// Populated contents with no vertices or edges.
    #[must_use]
    pub fn empty() -> Self {
        Self::Populated {
            vertices: BTreeSet::new(),
            adjacency: BTreeMap::new(),
        }
    }
}

/// A node in the nested decomposition of the board into faces.
#[derive(Debug, Clone)]
pub struct RegionData {
    /// Closed polyline bounding the region.
    pub border: Vec<Point2>,
    /// Bounding box of `border`.
    pub bbox: Aabb2,
    /// Edges bounding the face, in walk order. Empty for the root.
    pub cycle: Vec<OrientedEdge>,
    pub contents: RegionContents,
    /// Regions nested directly inside this one.
    pub children: Vec<RegionId>,
    pub parent: Option<RegionId>,
    /// Sum of free slots over the visible vertices. Always 0 for a container.
    pub open_slots: u32,
}

impl RegionData {
    #[must_use]
    pub fn new(border: Vec<Point2>, cycle: Vec<OrientedEdge>, contents: RegionContents) -> Self {
        let bbox = Aabb2::from_points(&border);
        Self {
            border,
            bbox,
            cycle,
            contents,
            children: Vec::new(),
            parent: None,
            open_slots: 0,
        }
    }

    #[must_use]
    pub fn is_container(&self) -> bool {
        matches!(self.contents, RegionContents::Container)
    }

    /// Visible vertices, or `None` for a container.
    #[must_use]
    pub fn vertices(&self) -> Option<&BTreeSet<VertexId>> {
        match &self.contents {
            RegionContents::Populated { vertices, .. } => Some(vertices),
            RegionContents::Container => None,
        }
    }

    /// Tracked adjacency, or `None` for a container.
    #[must_use]
    pub fn adjacency(&self) -> Option<&Adjacency> {
        match &self.contents {
            RegionContents::Populated { adjacency, .. } => Some(adjacency),
            RegionContents::Container => None,
        }
    }

    /// Whether `vertex` is visible in this region.
    #[must_use]
    pub fn contains_vertex(&self, vertex: VertexId) -> bool {
        self.vertices().is_some_and(|v| v.contains(&vertex))
    }

    /// Edges of the bounding cycle.
    pub fn cycle_edges(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.cycle.iter().map(|oriented| oriented.edge)
    }
}
