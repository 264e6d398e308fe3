use tracing::{debug, warn};

use crate::error::{MoveError, Result};
use crate::math::Point2;
use crate::operations::{EdgeValidation, MoveOutcome, RegionTree, ValidateCandidateEdge};
use crate::topology::{EdgeData, EdgeId, GraphStore, RegionId, VertexId};

/// Board and rendering parameters of a session.
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    /// Width of the board rectangle.
    pub board_width: f64,
    /// Height of the board rectangle.
    pub board_height: f64,
    /// Radius of the disc drawn for a vertex; edges may not pass through it.
    pub vertex_radius: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            board_width: 1000.0,
            board_height: 700.0,
            vertex_radius: 9.0,
        }
    }
}

/// A previously played move, given by vertex labels and the anchors between them.
#[derive(Debug, Clone)]
pub struct InitialMove {
    pub start: usize,
    pub end: usize,
    pub via: Vec<Point2>,
}

/// The graph entities created by a committed move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommittedMove {
    /// Edge from the path's start to the midpoint.
    pub first: EdgeId,
    /// Edge from the midpoint to the path's end.
    pub second: EdgeId,
    pub midpoint: VertexId,
    pub outcome: MoveOutcome,
}

/// Result of [`GameSession::play`].
#[derive(Debug, Clone, PartialEq)]
pub enum MoveResult {
    Rejected(EdgeValidation),
    Accepted(CommittedMove),
}

/// One game in progress: the vertex/edge store and the region tree kept in step.
#[derive(Debug)]
pub struct GameSession {
    config: SessionConfig,
    store: GraphStore,
    tree: RegionTree,
}

impl GameSession {
    /// Starts a game with a spot at each of `points`.
    ///
    /// # Errors
    ///
    /// Returns [`MoveError::OutsideBoard`] if a point is off the board.
    pub fn new(config: SessionConfig, points: &[Point2]) -> Result<Self> {
        let store = GraphStore::new();
        let tree = RegionTree::new(&store, config.board_width, config.board_height, [])?;
        let mut session = Self {
            config,
            store,
            tree,
        };
        for &point in points {
            session.add_vertex(point)?;
        }
        Ok(session)
    }

    /// Starts a game and replays already played moves without validating them.
    ///
    /// # Errors
    ///
    /// Returns an error if a point is off the board, a move names an unknown
    /// label, or a move cannot be incorporated into the region tree.
    pub fn with_initial_state(
        config: SessionConfig,
        points: &[Point2],
        moves: &[InitialMove],
    ) -> Result<Self> {
        let mut session = Self::new(config, points)?;
        for (index, initial) in moves.iter().enumerate() {
            let start = session.store.vertex_by_label(initial.start)?;
            let end = session.store.vertex_by_label(initial.end)?;
            let candidate = session.candidate_edge(start, end, &initial.via)?;
            let committed = session.commit_move(&candidate)?;
            debug!(index, outcome = ?committed.outcome, "replayed move");
        }
        Ok(session)
    }

    /// Discards the game and starts over with spots at `points`.
    ///
    /// # Errors
    ///
    /// Returns [`MoveError::OutsideBoard`] if a point is off the board.
    pub fn reset(&mut self, points: &[Point2]) -> Result<()> {
        self.store.clear();
        self.tree = RegionTree::new(
            &self.store,
            self.config.board_width,
            self.config.board_height,
            [],
        )?;
        for &point in points {
            self.add_vertex(point)?;
        }
        Ok(())
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    #[must_use]
    pub fn tree(&self) -> &RegionTree {
        &self.tree
    }

    /// Places an unconnected spot in the face containing `point`.
    ///
    /// # Errors
    ///
    /// Returns [`MoveError::OutsideBoard`] if the point is off the board.
    pub fn add_vertex(&mut self, point: Point2) -> Result<VertexId> {
        let region = self.locate_face(&point).ok_or(MoveError::OutsideBoard)?;
        let vertex = self.store.add_vertex(point);
        if let Err(err) = self.tree.insert_vertex(&self.store, region, vertex) {
            self.store.remove_newest_vertex(vertex)?;
            return Err(err);
        }
        Ok(vertex)
    }

    /// Builds the edge a player drew from `start` through `via` to `end`.
    ///
    /// # Errors
    ///
    /// Returns an error if either vertex is unknown.
    pub fn candidate_edge(&self, start: VertexId, end: VertexId, via: &[Point2]) -> Result<EdgeData> {
        let mut anchors = Vec::with_capacity(via.len() + 2);
        anchors.push(self.store.position(start)?);
        anchors.extend_from_slice(via);
        anchors.push(self.store.position(end)?);
        EdgeData::from_anchors(start, end, &anchors)
    }

    /// Checks a candidate edge against the rules of the game.
    ///
    /// # Errors
    ///
    /// Returns an error if an endpoint of the candidate is unknown.
    pub fn validate_candidate_edge(&self, candidate: &EdgeData) -> Result<EdgeValidation> {
        ValidateCandidateEdge::new(candidate, self.config.vertex_radius).execute(&self.store)
    }

    /// The face containing `point`, or `None` off the board.
    #[must_use]
    pub fn locate_face(&self, point: &Point2) -> Option<RegionId> {
        self.tree.find_region(point)
    }

    /// Adds a candidate edge to the game: it is cut in two at its midpoint,
    /// which becomes a new spot of degree 2.
    ///
    /// The candidate is not validated. If the region tree rejects the move,
    /// the store is rolled back and the game is unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if an endpoint is unknown or the move cannot be
    /// incorporated into the region tree.
    pub fn commit_move(&mut self, candidate: &EdgeData) -> Result<CommittedMove> {
        let (start, end) = (candidate.start, candidate.end);
        self.store.vertex(start)?;
        self.store.vertex(end)?;
        let (head, tail, cut) = candidate.bisect();

        let midpoint = self.store.add_vertex(cut);
        let halves = EdgeData::new(start, midpoint, head)
            .and_then(|first| EdgeData::new(midpoint, end, tail).map(|second| (first, second)));
        let (first, second) = match halves {
            Ok(halves) => halves,
            Err(err) => {
                self.store.remove_newest_vertex(midpoint)?;
                return Err(err);
            }
        };
        let first = self.store.add_edge(first);
        let second = self.store.add_edge(second);
        // A loop bumps its vertex twice.
        self.store.vertex_mut(start)?.degree += 1;
        self.store.vertex_mut(end)?.degree += 1;
        self.store.vertex_mut(midpoint)?.degree = 2;

        match self.tree.update_region_tree(&self.store, &[first, second], midpoint) {
            Ok(outcome) => Ok(CommittedMove {
                first,
                second,
                midpoint,
                outcome,
            }),
            Err(err) => {
                warn!(%err, "move rejected by the region tree, rolling back");
                self.store.remove_edge(first)?;
                self.store.remove_edge(second)?;
                self.store.vertex_mut(start)?.degree -= 1;
                self.store.vertex_mut(end)?.degree -= 1;
                self.store.remove_newest_vertex(midpoint)?;
                Err(err)
            }
        }
    }

    /// Validates a candidate edge and commits it if it is legal.
    ///
    /// # Errors
    ///
    /// Returns an error if an endpoint is unknown or a legal move cannot be
    /// incorporated into the region tree.
    pub fn play(&mut self, candidate: &EdgeData) -> Result<MoveResult> {
        let validation = self.validate_candidate_edge(candidate)?;
        if !validation.is_valid() {
            return Ok(MoveResult::Rejected(validation));
        }
        Ok(MoveResult::Accepted(self.commit_move(candidate)?))
    }

    /// Whether no face has two free slots left to connect.
    #[must_use]
    pub fn is_game_over(&self) -> bool {
        self.tree.find_open_region().is_none()
    }

    /// Whether `point` lies in the face of `region`, outside its sub-faces.
    ///
    /// # Errors
    ///
    /// Returns an error if the region does not exist.
    pub fn is_point_in_face(&self, point: &Point2, region: RegionId) -> Result<bool> {
        self.tree.is_point_in_region(region, point)
    }

    /// Whether `a` and `b` share a face and have slots for an edge between them.
    ///
    /// # Errors
    ///
    /// Returns an error if either vertex is unknown.
    pub fn can_connect(&self, a: VertexId, b: VertexId) -> Result<bool> {
        let free_a = self.store.vertex(a)?.free_slots();
        let free_b = self.store.vertex(b)?.free_slots();
        let slots = if a == b { free_a >= 2 } else { free_a >= 1 && free_b >= 1 };
        Ok(slots && self.tree.shares_region(a, b).is_some())
    }
}
