use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use super::RegionTree;
use crate::error::{MoveError, Result, TopologyError};
use crate::math::polygon_2d::classify_point_in_polygon;
use crate::math::Point2;
use crate::operations::face_finder::{CyclesThrough, NewCycles, SideCycle};
use crate::topology::{
    Adjacency, EdgeId, GraphStore, RegionContents, RegionId, VertexId, MAX_DEGREE,
};

/// How a committed move changed the region tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The path closed no cycle; its edges are loose edges of `region`.
    NoNewFace { region: RegionId },
    /// The path closed a cycle inside `region`, cutting out the new child `face`.
    SimpleFaceAdded { region: RegionId, face: RegionId },
    /// The path divided the face of `container` in two. The former face is now
    /// a container holding `faces`.
    FaceSplit {
        container: RegionId,
        faces: [RegionId; 2],
    },
    /// The path ran from an older child's outline back to it, enclosing a new
    /// `face` between them. The new `container`, a child of `region`, groups
    /// the older child and the new face under their common outline.
    FaceSplitsExistingChild {
        region: RegionId,
        container: RegionId,
        face: RegionId,
    },
}

/// How the two sides of the new path relate, decided before any mutation.
enum Plan {
    NoNewFace,
    SimpleFaceAdded { inner: SideCycle },
    FaceSplit { first: SideCycle, second: SideCycle },
    FaceSplitsExistingChild { inner: SideCycle, outer: SideCycle },
}

/// Edge endpoints, edge midpoints and vertex positions of one face, read from
/// the store up front so restructuring needs no further lookups.
struct Probes {
    edges: HashMap<EdgeId, (VertexId, VertexId, Point2)>,
    positions: HashMap<VertexId, Point2>,
}

impl Probes {
    fn collect(store: &GraphStore, adjacency: &Adjacency) -> Result<Self> {
        let mut edges = HashMap::new();
        let mut positions = HashMap::with_capacity(adjacency.len());
        for (&vertex, incident) in adjacency {
            positions.insert(vertex, store.position(vertex)?);
            for &edge in incident {
                if !edges.contains_key(&edge) {
                    let data = store.edge(edge)?;
                    edges.insert(edge, (data.start, data.end, data.midpoint()));
                }
            }
        }
        Ok(Self { edges, positions })
    }

    fn edge(&self, edge: EdgeId) -> Result<(VertexId, VertexId, Point2)> {
        Ok(self
            .edges
            .get(&edge)
            .copied()
            .ok_or_else(|| TopologyError::EntityNotFound("edge".into()))?)
    }

    fn position(&self, vertex: VertexId) -> Result<Point2> {
        Ok(self
            .positions
            .get(&vertex)
            .copied()
            .ok_or_else(|| TopologyError::EntityNotFound("vertex".into()))?)
    }
}

impl RegionTree {
    /// Incorporates a committed move: two new edges meeting at `midpoint`.
    ///
    /// The degrees of all three vertices must already include the new edges.
    /// Everything is validated before the tree is touched: on error the tree
    /// is unchanged.
    ///
    /// # Errors
    ///
    /// - [`MoveError::WrongEdgeCount`] unless exactly two edges are given.
    /// - [`MoveError::InvalidInput`] if an edge does not end at `midpoint`.
    /// - [`MoveError::DegreeExceeded`] if a vertex has more than three edge-ends.
    /// - [`MoveError::NotInFace`] if the path's endpoints are not both visible
    ///   in the face containing `midpoint`.
    /// - [`TopologyError::InvalidTopology`] if the new cycles are inconsistent.
    pub fn update_region_tree(
        &mut self,
        store: &GraphStore,
        edges: &[EdgeId],
        midpoint: VertexId,
    ) -> Result<MoveOutcome> {
        let &[first, second] = edges else {
            return Err(MoveError::WrongEdgeCount { count: edges.len() }.into());
        };
        let (Some(a), Some(b)) = (
            store.edge(first)?.other_end(midpoint),
            store.edge(second)?.other_end(midpoint),
        ) else {
            return Err(MoveError::InvalidInput("both edges must end at the midpoint".into()).into());
        };
        for vertex in [a, b, midpoint] {
            let data = store.vertex(vertex)?;
            if data.degree > MAX_DEGREE {
                return Err(MoveError::DegreeExceeded { label: data.label }.into());
            }
        }

        let region_id = self
            .find_region(&store.position(midpoint)?)
            .ok_or(MoveError::NotInFace)?;
        let region = self.region(region_id)?;
        let Some(adjacency) = region.adjacency() else {
            return Err(MoveError::NotInFace.into());
        };
        if !region.contains_vertex(a) || !region.contains_vertex(b) {
            return Err(MoveError::NotInFace.into());
        }
        let is_root = region.parent.is_none();

        let mut adjacency = adjacency.clone();
        adjacency.entry(a).or_default().insert(first);
        adjacency.entry(b).or_default().insert(second);
        adjacency.entry(midpoint).or_default().extend([first, second]);

        let plan = match CyclesThrough::new(midpoint, first, second, &adjacency).execute(store)? {
            NewCycles::Bridge => Plan::NoNewFace,
            NewCycles::Cycles([x, y]) => match (x.is_bounded(), y.is_bounded()) {
                (true, true) if !is_root => Plan::FaceSplit {
                    first: x,
                    second: y,
                },
                (true, false) | (false, true) => {
                    let (inner, outer) = if x.is_bounded() { (x, y) } else { (y, x) };
                    if inner.edge_set() == outer.edge_set() {
                        Plan::SimpleFaceAdded { inner }
                    } else {
                        Plan::FaceSplitsExistingChild { inner, outer }
                    }
                }
                _ => {
                    return Err(TopologyError::InvalidTopology(
                        "the sides of the new path do not bound a consistent face".into(),
                    )
                    .into())
                }
            },
        };

        let probes = Probes::collect(store, &adjacency)?;
        let (loose, isolated) = self.partition(region_id, &adjacency)?;

        let (outcome, affected) = match plan {
            Plan::NoNewFace => {
                self.rebuild(&probes, region_id, &loose, &isolated)?;
                (MoveOutcome::NoNewFace { region: region_id }, vec![region_id])
            }
            Plan::SimpleFaceAdded { inner } => {
                let face = self.add_simple_face(&probes, region_id, inner, loose, isolated)?;
                (
                    MoveOutcome::SimpleFaceAdded {
                        region: region_id,
                        face,
                    },
                    vec![region_id, face],
                )
            }
            Plan::FaceSplit { first, second } => {
                let faces = self.split_face(&probes, region_id, first, second, loose, isolated)?;
                (
                    MoveOutcome::FaceSplit {
                        container: region_id,
                        faces,
                    },
                    vec![region_id, faces[0], faces[1]],
                )
            }
            Plan::FaceSplitsExistingChild { inner, outer } => {
                let (container, face) =
                    self.split_existing_child(&probes, region_id, inner, outer, loose, isolated)?;
                (
                    MoveOutcome::FaceSplitsExistingChild {
                        region: region_id,
                        container,
                        face,
                    },
                    vec![region_id, container, face],
                )
            }
        };

        let mut touched: BTreeSet<RegionId> = [a, b, midpoint]
            .into_iter()
            .flat_map(|vertex| self.regions_of(vertex).collect::<Vec<_>>())
            .collect();
        touched.extend(affected);
        for id in touched {
            self.recount_open_slots(store, id)?;
        }

        debug!(?outcome, regions = self.region_count(), "region tree updated");
        Ok(outcome)
    }

    /// Cuts a new child out of `region`, bounded by `inner`.
    fn add_simple_face(
        &mut self,
        probes: &Probes,
        region: RegionId,
        inner: SideCycle,
        mut loose: BTreeSet<EdgeId>,
        mut isolated: BTreeSet<VertexId>,
    ) -> Result<RegionId> {
        let cycle_edges = inner.edge_set();
        loose.retain(|edge| !cycle_edges.contains(edge));
        let children = self.region(region)?.children.clone();

        let face = self.insert_region(region, inner.border, inner.edges, RegionContents::empty())?;
        let (face_loose, face_isolated) =
            self.claim(probes, face, &cycle_edges, &children, &mut loose, &mut isolated)?;

        self.rebuild(probes, face, &face_loose, &face_isolated)?;
        self.rebuild(probes, region, &loose, &isolated)?;
        Ok(face)
    }

    /// Turns `region` into a container of the two faces bounded by `first` and `second`.
    fn split_face(
        &mut self,
        probes: &Probes,
        region: RegionId,
        first: SideCycle,
        second: SideCycle,
        mut loose: BTreeSet<EdgeId>,
        mut isolated: BTreeSet<VertexId>,
    ) -> Result<[RegionId; 2]> {
        let first_edges = first.edge_set();
        let second_edges = second.edge_set();
        loose.retain(|edge| !first_edges.contains(edge) && !second_edges.contains(edge));
        let children = self.region(region)?.children.clone();

        let first_face = self.insert_region(region, first.border, first.edges, RegionContents::empty())?;
        let second_face =
            self.insert_region(region, second.border, second.edges, RegionContents::empty())?;

        let (first_loose, first_isolated) =
            self.claim(probes, first_face, &first_edges, &children, &mut loose, &mut isolated)?;
        let remaining: Vec<RegionId> = self
            .region(region)?
            .children
            .iter()
            .copied()
            .filter(|child| *child != first_face && *child != second_face)
            .collect();
        let (mut second_loose, mut second_isolated) =
            self.claim(probes, second_face, &second_edges, &remaining, &mut loose, &mut isolated)?;
        // Whatever the first face did not claim lies in the second.
        second_loose.append(&mut loose);
        second_isolated.append(&mut isolated);

        let kept = self.region(region)?.children.len();
        if kept > 2 {
            debug!(kept = kept - 2, "older children stay with the split face's container");
        }

        self.rebuild(probes, first_face, &first_loose, &first_isolated)?;
        self.rebuild(probes, second_face, &second_loose, &second_isolated)?;
        self.reindex(region, &BTreeSet::new())?;
        self.region_mut(region)?.contents = RegionContents::Container;
        Ok([first_face, second_face])
    }

    /// Groups an older child and the new face between it and the path under a
    /// container bounded by `outer`.
    fn split_existing_child(
        &mut self,
        probes: &Probes,
        region: RegionId,
        inner: SideCycle,
        outer: SideCycle,
        mut loose: BTreeSet<EdgeId>,
        mut isolated: BTreeSet<VertexId>,
    ) -> Result<(RegionId, RegionId)> {
        let inner_edges = inner.edge_set();
        let outer_edges = outer.edge_set();
        loose.retain(|edge| !inner_edges.contains(edge) && !outer_edges.contains(edge));
        let children = self.region(region)?.children.clone();

        let container = self.insert_region(region, outer.border, outer.edges, RegionContents::Container)?;
        let face = self.insert_region(container, inner.border, inner.edges, RegionContents::empty())?;

        let outline = self.region(container)?.border.clone();
        let mut enclosed = Vec::new();
        for child in children {
            if self.encloses(probes, &outline, &outer_edges, child)? {
                self.reparent(child, container)?;
                enclosed.push(child);
            }
        }
        let (face_loose, face_isolated) =
            self.claim(probes, face, &inner_edges, &enclosed, &mut loose, &mut isolated)?;

        self.rebuild(probes, face, &face_loose, &face_isolated)?;
        self.rebuild(probes, region, &loose, &isolated)?;
        Ok((container, face))
    }

    /// Moves into `target` the candidate children, loose edges and isolated
    /// vertices that lie within its border. Returns the claimed edges and vertices.
    fn claim(
        &mut self,
        probes: &Probes,
        target: RegionId,
        cycle_edges: &BTreeSet<EdgeId>,
        children: &[RegionId],
        loose: &mut BTreeSet<EdgeId>,
        isolated: &mut BTreeSet<VertexId>,
    ) -> Result<(BTreeSet<EdgeId>, BTreeSet<VertexId>)> {
        let border = self.region(target)?.border.clone();
        for &child in children {
            if self.encloses(probes, &border, cycle_edges, child)? {
                self.reparent(child, target)?;
            }
        }

        let mut claimed_edges = BTreeSet::new();
        for &edge in loose.iter() {
            let (_, _, midpoint) = probes.edge(edge)?;
            if classify_point_in_polygon(&midpoint, &border).is_inside_or_on() {
                claimed_edges.insert(edge);
            }
        }
        loose.retain(|edge| !claimed_edges.contains(edge));

        let mut claimed_vertices = BTreeSet::new();
        for &vertex in isolated.iter() {
            if classify_point_in_polygon(&probes.position(vertex)?, &border).is_inside_or_on() {
                claimed_vertices.insert(vertex);
            }
        }
        isolated.retain(|vertex| !claimed_vertices.contains(vertex));

        Ok((claimed_edges, claimed_vertices))
    }

    /// Whether `child` lies within `border`, judged by one of its cycle edges
    /// that is not part of the border's own cycle.
    fn encloses(
        &self,
        probes: &Probes,
        border: &[Point2],
        cycle_edges: &BTreeSet<EdgeId>,
        child: RegionId,
    ) -> Result<bool> {
        let probe = self
            .region(child)?
            .cycle_edges()
            .find(|edge| !cycle_edges.contains(edge));
        let Some(edge) = probe else {
            return Ok(false);
        };
        let (_, _, midpoint) = probes.edge(edge)?;
        Ok(classify_point_in_polygon(&midpoint, border).is_inside_or_on())
    }

    /// Splits a face's tracked edges into loose edges (not on its own or a
    /// child's cycle) and its isolated vertices.
    fn partition(
        &self,
        id: RegionId,
        adjacency: &Adjacency,
    ) -> Result<(BTreeSet<EdgeId>, BTreeSet<VertexId>)> {
        let region = self.region(id)?;
        let mut bounding: BTreeSet<EdgeId> = region.cycle_edges().collect();
        for &child in &region.children {
            bounding.extend(self.region(child)?.cycle_edges());
        }
        let loose = adjacency
            .values()
            .flatten()
            .copied()
            .filter(|edge| !bounding.contains(edge))
            .collect();
        let isolated = adjacency
            .iter()
            .filter(|(_, edges)| edges.is_empty())
            .map(|(vertex, _)| *vertex)
            .collect();
        Ok((loose, isolated))
    }

    /// Rebuilds a populated region's adjacency from its cycle, its children's
    /// cycles, the given loose edges and isolated vertices. Vertices no longer
    /// on any of these are dropped from the region.
    fn rebuild(
        &mut self,
        probes: &Probes,
        id: RegionId,
        loose: &BTreeSet<EdgeId>,
        isolated: &BTreeSet<VertexId>,
    ) -> Result<()> {
        let region = self.region(id)?;
        let mut edges: BTreeSet<EdgeId> = region.cycle_edges().collect();
        for &child in &region.children {
            edges.extend(self.region(child)?.cycle_edges());
        }
        edges.extend(loose.iter().copied());

        let mut adjacency = Adjacency::new();
        for edge in edges {
            let (start, end, _) = probes.edge(edge)?;
            adjacency.entry(start).or_default().insert(edge);
            adjacency.entry(end).or_default().insert(edge);
        }
        for &vertex in isolated {
            adjacency.entry(vertex).or_default();
        }
        let vertices: BTreeSet<VertexId> = adjacency.keys().copied().collect();

        self.reindex(id, &vertices)?;
        self.region_mut(id)?.contents = RegionContents::Populated {
            vertices,
            adjacency,
        };
        Ok(())
    }
}
