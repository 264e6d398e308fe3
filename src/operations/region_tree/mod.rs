mod update;

pub use update::MoveOutcome;

use std::collections::{BTreeSet, HashMap};

use slotmap::SlotMap;

use crate::error::{GeometryError, MoveError, Result, TopologyError};
use crate::math::polygon_2d::{classify_point_in_polygon, PointClassification};
use crate::math::Point2;
use crate::topology::{GraphStore, OrientedEdge, RegionContents, RegionData, RegionId, VertexId};

/// Nested decomposition of the board into faces.
///
/// The root region is bounded by the board rectangle. Every other region is a
/// face cut out of its parent by a cycle of edges. Regions live in an arena and
/// refer to each other by ID; `vertex_regions` indexes which regions each
/// vertex is visible in.
#[derive(Debug)]
pub struct RegionTree {
    regions: SlotMap<RegionId, RegionData>,
    root: RegionId,
    vertex_regions: HashMap<VertexId, BTreeSet<RegionId>>,
}

impl RegionTree {
    /// Creates a tree holding only the root region, bounded by the rectangle
    /// `[0, width] × [0, height]`, with `vertices` as its isolated vertices.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::Degenerate`] if the board has no area, or an
    /// error if a vertex is not in the store.
    pub fn new(
        store: &GraphStore,
        width: f64,
        height: f64,
        vertices: impl IntoIterator<Item = VertexId>,
    ) -> Result<Self> {
        if !(width > 0.0 && height > 0.0) {
            return Err(GeometryError::Degenerate(format!("board size {width} x {height}")).into());
        }
        let border = vec![
            Point2::new(0.0, 0.0),
            Point2::new(width, 0.0),
            Point2::new(width, height),
            Point2::new(0.0, height),
        ];
        let mut regions = SlotMap::with_key();
        let root = regions.insert(RegionData::new(border, Vec::new(), RegionContents::empty()));
        let mut tree = Self {
            regions,
            root,
            vertex_regions: HashMap::new(),
        };
        for vertex in vertices {
            tree.attach_isolated(root, vertex)?;
        }
        tree.recount_open_slots(store, root)?;
        Ok(tree)
    }

    #[must_use]
    pub fn root(&self) -> RegionId {
        self.root
    }

    /// Returns a reference to the region data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the region is not in the tree.
    pub fn region(&self, id: RegionId) -> Result<&RegionData> {
        Ok(self
            .regions
            .get(id)
            .ok_or_else(|| TopologyError::EntityNotFound("region".into()))?)
    }

    fn region_mut(&mut self, id: RegionId) -> Result<&mut RegionData> {
        Ok(self
            .regions
            .get_mut(id)
            .ok_or_else(|| TopologyError::EntityNotFound("region".into()))?)
    }

    /// Iterates over all regions.
    pub fn regions(&self) -> impl Iterator<Item = (RegionId, &RegionData)> {
        self.regions.iter()
    }

    #[must_use]
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// Places a new, unconnected vertex in a populated region.
    ///
    /// # Errors
    ///
    /// Returns [`MoveError::NotInFace`] if the region is a container, or an
    /// error if the region or vertex does not exist.
    pub fn insert_vertex(&mut self, store: &GraphStore, region: RegionId, vertex: VertexId) -> Result<()> {
        store.vertex(vertex)?;
        if self.region(region)?.is_container() {
            return Err(MoveError::NotInFace.into());
        }
        self.attach_isolated(region, vertex)?;
        self.recount_open_slots(store, region)
    }

    fn attach_isolated(&mut self, region: RegionId, vertex: VertexId) -> Result<()> {
        if let RegionContents::Populated {
            vertices,
            adjacency,
        } = &mut self.region_mut(region)?.contents
        {
            vertices.insert(vertex);
            adjacency.entry(vertex).or_default();
        }
        self.vertex_regions.entry(vertex).or_default().insert(region);
        Ok(())
    }

    // --- Point location ---

    /// Finds the innermost face containing `point`.
    ///
    /// Children are searched before their parent, so a point on the border of
    /// a child is located in the child. Returns `None` outside the board.
    #[must_use]
    pub fn find_region(&self, point: &Point2) -> Option<RegionId> {
        self.find_region_from(self.root, point)
    }

    fn find_region_from(&self, id: RegionId, point: &Point2) -> Option<RegionId> {
        let region = self.regions.get(id)?;
        if !region.bbox.contains(point) {
            return None;
        }
        for &child in &region.children {
            if let Some(found) = self.find_region_from(child, point) {
                return Some(found);
            }
        }
        if region.is_container() {
            return None;
        }
        classify_point_in_polygon(point, &region.border)
            .is_inside_or_on()
            .then_some(id)
    }

    /// Whether `point` lies in the face of `region` itself.
    ///
    /// Only direct children are consulted: a point strictly inside a child is
    /// not in the face, while a point on a child's border is.
    ///
    /// # Errors
    ///
    /// Returns an error if the region or one of its children does not exist.
    pub fn is_point_in_region(&self, region: RegionId, point: &Point2) -> Result<bool> {
        let data = self.region(region)?;
        for &child in &data.children {
            match classify_point_in_polygon(point, &self.region(child)?.border) {
                PointClassification::Inside => return Ok(false),
                PointClassification::OnBoundary => return Ok(true),
                PointClassification::Outside => {}
            }
        }
        Ok(classify_point_in_polygon(point, &data.border).is_inside_or_on())
    }

    /// Whether `point` lies within the border of `region`, sub-regions included.
    ///
    /// # Errors
    ///
    /// Returns an error if the region does not exist.
    pub fn is_point_in_polygon(&self, region: RegionId, point: &Point2) -> Result<bool> {
        Ok(classify_point_in_polygon(point, &self.region(region)?.border).is_inside_or_on())
    }

    // --- Vertex queries ---

    /// Regions in which `vertex` is currently visible.
    pub fn regions_of(&self, vertex: VertexId) -> impl Iterator<Item = RegionId> + '_ {
        self.vertex_regions
            .get(&vertex)
            .into_iter()
            .flat_map(|regions| regions.iter().copied())
    }

    /// A face in which both vertices are visible, if there is one.
    #[must_use]
    pub fn shares_region(&self, a: VertexId, b: VertexId) -> Option<RegionId> {
        let of_b = self.vertex_regions.get(&b)?;
        self.regions_of(a).find(|region| of_b.contains(region))
    }

    /// Depth-first search for a region with more than one open slot.
    ///
    /// `None` means no legal move is left anywhere on the board.
    #[must_use]
    pub fn find_open_region(&self) -> Option<RegionId> {
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let Some(region) = self.regions.get(id) else {
                continue;
            };
            if region.open_slots > 1 {
                return Some(id);
            }
            stack.extend(region.children.iter().rev().copied());
        }
        None
    }

    // --- Bookkeeping shared with the update ---

    /// Recomputes the open-slot count of a region from current vertex degrees.
    fn recount_open_slots(&mut self, store: &GraphStore, id: RegionId) -> Result<()> {
        let slots = match self.region(id)?.vertices() {
            Some(vertices) => {
                let mut total = 0u32;
                for &vertex in vertices {
                    total += u32::from(store.vertex(vertex)?.free_slots());
                }
                total
            }
            None => 0,
        };
        self.region_mut(id)?.open_slots = slots;
        Ok(())
    }

    /// Makes `vertices` the exact set of vertices indexed under `id`.
    fn reindex(&mut self, id: RegionId, vertices: &BTreeSet<VertexId>) -> Result<()> {
        let old = self
            .regions
            .get(id)
            .ok_or_else(|| TopologyError::EntityNotFound("region".into()))?;
        if let Some(old) = old.vertices() {
            for vertex in old.difference(vertices) {
                if let Some(regions) = self.vertex_regions.get_mut(vertex) {
                    regions.remove(&id);
                }
            }
        }
        for &vertex in vertices {
            self.vertex_regions.entry(vertex).or_default().insert(id);
        }
        Ok(())
    }

    /// Adds a region under `parent` and returns its ID.
    fn insert_region(
        &mut self,
        parent: RegionId,
        border: Vec<Point2>,
        cycle: Vec<OrientedEdge>,
        contents: RegionContents,
    ) -> Result<RegionId> {
        let mut data = RegionData::new(border, cycle, contents);
        data.parent = Some(parent);
        let id = self.regions.insert(data);
        self.region_mut(parent)?.children.push(id);
        Ok(id)
    }

    /// Moves `child` from its current parent to `parent`.
    fn reparent(&mut self, child: RegionId, parent: RegionId) -> Result<()> {
        if let Some(old) = self.region(child)?.parent {
            self.region_mut(old)?.children.retain(|c| *c != child);
        }
        self.region_mut(child)?.parent = Some(parent);
        self.region_mut(parent)?.children.push(child);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Point2 {
        Point2::new(x, y)
    }

    fn square() -> Vec<Point2> {
        vec![p(100.0, 100.0), p(100.0, 300.0), p(300.0, 300.0), p(300.0, 100.0)]
    }

    fn tree_with_face(border: Vec<Point2>) -> (RegionTree, RegionId) {
        let store = GraphStore::new();
        let mut tree = RegionTree::new(&store, 1000.0, 700.0, []).unwrap();
        let root = tree.root();
        let face = tree
            .insert_region(root, border, Vec::new(), RegionContents::empty())
            .unwrap();
        (tree, face)
    }

    #[test]
    fn point_inside_square_region() {
        let (tree, face) = tree_with_face(square());
        assert!(tree.is_point_in_region(face, &p(200.0, 200.0)).unwrap());
        assert!(!tree.is_point_in_region(face, &p(400.0, 200.0)).unwrap());
    }

    #[test]
    fn point_in_bbox_but_outside_concave_region() {
        let concave = vec![
            p(100.0, 100.0),
            p(200.0, 200.0),
            p(100.0, 300.0),
            p(300.0, 300.0),
            p(300.0, 100.0),
        ];
        let (tree, face) = tree_with_face(concave);
        assert!(!tree.is_point_in_region(face, &p(150.0, 200.0)).unwrap());
        assert_eq!(tree.find_region(&p(150.0, 200.0)), Some(tree.root()));
    }

    #[test]
    fn child_occludes_parent() {
        let border = vec![
            p(100.0, 100.0),
            p(100.0, 300.0),
            p(250.0, 300.0),
            p(300.0, 300.0),
            p(300.0, 100.0),
        ];
        let (mut tree, face) = tree_with_face(border);
        let child_border = vec![p(150.0, 150.0), p(150.0, 250.0), p(250.0, 300.0), p(250.0, 150.0)];
        let child = tree
            .insert_region(face, child_border, Vec::new(), RegionContents::empty())
            .unwrap();

        let inside_child = p(200.0, 200.0);
        assert!(!tree.is_point_in_region(face, &inside_child).unwrap());
        assert!(tree.is_point_in_region(child, &inside_child).unwrap());
        assert!(tree.is_point_in_polygon(face, &inside_child).unwrap());
        assert_eq!(tree.find_region(&inside_child), Some(child));
    }

    #[test]
    fn point_on_child_border_belongs_to_parent_and_child() {
        let (mut tree, face) = tree_with_face(square());
        let child_border = vec![p(150.0, 150.0), p(150.0, 250.0), p(250.0, 300.0), p(250.0, 150.0)];
        let child = tree
            .insert_region(face, child_border, Vec::new(), RegionContents::empty())
            .unwrap();

        let on_edge = p(150.0, 200.0);
        assert!(tree.is_point_in_region(face, &on_edge).unwrap());
        assert_eq!(tree.find_region(&on_edge), Some(child));
    }

    #[test]
    fn point_outside_board_has_no_region() {
        let (tree, _) = tree_with_face(square());
        assert_eq!(tree.find_region(&p(-5.0, 10.0)), None);
        assert_eq!(tree.find_region(&p(1200.0, 10.0)), None);
    }

    #[test]
    fn locating_twice_gives_the_same_region() {
        let (tree, face) = tree_with_face(square());
        let point = p(180.0, 220.0);
        assert_eq!(tree.find_region(&point), Some(face));
        assert_eq!(tree.find_region(&point), tree.find_region(&point));
    }

    #[test]
    fn open_slots_of_root_vertices() {
        let mut store = GraphStore::new();
        let a = store.add_vertex(p(100.0, 100.0));
        let b = store.add_vertex(p(200.0, 100.0));
        let mut tree = RegionTree::new(&store, 1000.0, 700.0, [a, b]).unwrap();
        let root = tree.root();
        assert_eq!(tree.region(root).unwrap().open_slots, 6);
        assert_eq!(tree.find_open_region(), Some(root));
        assert_eq!(tree.shares_region(a, b), Some(root));

        let c = store.add_vertex(p(300.0, 100.0));
        tree.insert_vertex(&store, root, c).unwrap();
        assert_eq!(tree.region(root).unwrap().open_slots, 9);
        assert_eq!(tree.regions_of(c).collect::<Vec<_>>(), vec![root]);
    }

    #[test]
    fn board_without_area_is_refused() {
        let store = GraphStore::new();
        assert!(RegionTree::new(&store, 0.0, 700.0, []).is_err());
        assert!(RegionTree::new(&store, 1000.0, f64::NAN, []).is_err());
    }

    #[test]
    fn empty_board_has_no_open_region() {
        let store = GraphStore::new();
        let tree = RegionTree::new(&store, 1000.0, 700.0, []).unwrap();
        assert_eq!(tree.find_open_region(), None);
    }
}
