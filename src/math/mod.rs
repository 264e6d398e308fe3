pub mod intersect_2d;
pub mod polygon_2d;

/// 2D point type.
pub type Point2 = nalgebra::Point2<f64>;

/// 2D vector type.
pub type Vector2 = nalgebra::Vector2<f64>;

/// Tolerance for comparing curve-derived distances against zero.
///
/// Board coordinates are pixels, so this is far below anything visible.
pub const FLOAT_IMPRECISION: f64 = 1e-3;
