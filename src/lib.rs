pub mod error;
pub mod geometry;
pub mod math;
pub mod operations;
pub mod session;
pub mod topology;

pub use error::{Result, SproutsError};
pub use session::{CommittedMove, GameSession, InitialMove, MoveResult, SessionConfig};
