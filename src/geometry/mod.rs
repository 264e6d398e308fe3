pub mod curve;

pub use curve::{curves_through, CubicBezier};
