use thiserror::Error;

/// Top-level error type for the Sprouts engine.
#[derive(Debug, Error)]
pub enum SproutsError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error(transparent)]
    Move(#[from] MoveError),
}

/// Errors related to curve construction.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("an edge needs at least 2 anchor points, got {count}")]
    TooFewAnchors { count: usize },

    #[error("an edge needs at least one curve")]
    EmptyCurveList,

    #[error("degenerate geometry: {0}")]
    Degenerate(String),
}

/// Errors related to the vertex/edge store and the region tree.
#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("entity not found: {0}")]
    EntityNotFound(String),

    #[error("invalid topology: {0}")]
    InvalidTopology(String),
}

/// Errors raised when a move cannot be incorporated.
///
/// These signal caller defects (a move that skipped validation, or a
/// malformed edge pair). Illegal moves made by a player are reported
/// through [`crate::operations::EdgeValidation`] instead.
#[derive(Debug, Error)]
pub enum MoveError {
    #[error("a move must add exactly 2 edges, got {count}")]
    WrongEdgeCount { count: usize },

    #[error("vertex {label} would exceed the maximum degree")]
    DegreeExceeded { label: usize },

    #[error("point lies outside the board")]
    OutsideBoard,

    #[error("the move does not lie inside a single face")]
    NotInFace,

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Convenience type alias for results using [`SproutsError`].
pub type Result<T> = std::result::Result<T, SproutsError>;
