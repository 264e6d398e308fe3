mod bezier;
mod clipping;
mod spline;

pub use bezier::{CubicBezier, FLATNESS_TOLERANCE};
pub use spline::curves_through;
