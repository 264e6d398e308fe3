mod face_finder;
mod region_tree;
mod validate;

pub use face_finder::{CyclesThrough, FindFaces, NewCycles, SideCycle};
pub use region_tree::{MoveOutcome, RegionTree};
pub use validate::{EdgeValidation, ValidateCandidateEdge, Violation};
