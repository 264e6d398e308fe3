use crate::error::{GeometryError, Result};
use crate::math::{Point2, Vector2};

use super::CubicBezier;

/// Fraction of the neighbour distance used for the controls at an inner anchor.
const TANGENT_SCALE: f64 = 0.2;

/// Builds the chain of cubic curves passing through `anchors`.
///
/// One curve is produced per consecutive anchor pair. At an inner anchor both
/// adjacent controls lie on a common tangent, so the chain turns smoothly
/// through every click. At the two ends the free control sits halfway to the
/// neighbouring anchor. Two anchors give a straight segment.
///
/// # Errors
///
/// Returns [`GeometryError::TooFewAnchors`] if fewer than 2 anchors are given.
pub fn curves_through(anchors: &[Point2]) -> Result<Vec<CubicBezier>> {
    let n = anchors.len();
    if n < 2 {
        return Err(GeometryError::TooFewAnchors { count: n }.into());
    }

    let mut controls = Vec::with_capacity(2 * n - 2);
    controls.push(anchors[1].lerp(&anchors[0], 0.5));
    for window in anchors.windows(3) {
        let (before, after) = tangent_controls(&window[0], &window[1], &window[2]);
        controls.push(before);
        controls.push(after);
    }
    controls.push(anchors[n - 1].lerp(&anchors[n - 2], 0.5));

    Ok(anchors
        .windows(2)
        .enumerate()
        .map(|(i, pair)| CubicBezier::new(pair[0], controls[2 * i], controls[2 * i + 1], pair[1]))
        .collect())
}

/// Controls on either side of `middle`, aligned with the tangent through it.
fn tangent_controls(previous: &Point2, middle: &Point2, next: &Point2) -> (Point2, Point2) {
    let to_previous = previous - middle;
    let to_next = next - middle;
    let direction = unit_or_zero(to_previous) - unit_or_zero(to_next);
    (
        middle + direction * (to_previous.norm() * TANGENT_SCALE),
        middle - direction * (to_next.norm() * TANGENT_SCALE),
    )
}

fn unit_or_zero(v: Vector2) -> Vector2 {
    v.try_normalize(f64::EPSILON).unwrap_or_else(Vector2::zeros)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::SproutsError;
    use approx::assert_abs_diff_eq;

    fn p(x: f64, y: f64) -> Point2 {
        Point2::new(x, y)
    }

    #[test]
    fn two_anchors_give_a_straight_curve() {
        let curves = curves_through(&[p(0.0, 0.0), p(10.0, 20.0)]).unwrap();
        assert_eq!(curves.len(), 1);
        let c = curves[0];
        assert_eq!(c.start, p(0.0, 0.0));
        assert_eq!(c.end, p(10.0, 20.0));
        assert_eq!(c.control_1, p(5.0, 10.0));
        assert_eq!(c.control_2, p(5.0, 10.0));
    }

    #[test]
    fn chain_passes_through_every_anchor() {
        let anchors = [p(0.0, 0.0), p(50.0, 40.0), p(100.0, 0.0), p(150.0, 60.0)];
        let curves = curves_through(&anchors).unwrap();
        assert_eq!(curves.len(), 3);
        for (i, c) in curves.iter().enumerate() {
            assert_eq!(c.start, anchors[i]);
            assert_eq!(c.end, anchors[i + 1]);
        }
    }

    #[test]
    fn inner_anchor_controls_are_collinear() {
        let anchors = [p(0.0, 0.0), p(50.0, 40.0), p(100.0, 0.0)];
        let curves = curves_through(&anchors).unwrap();
        let incoming = curves[0].end - curves[0].control_2;
        let outgoing = curves[1].control_1 - curves[1].start;
        assert_abs_diff_eq!(incoming.perp(&outgoing), 0.0, epsilon = 1e-9);
        assert!(incoming.dot(&outgoing) > 0.0);
    }

    #[test]
    fn inner_control_distance_scales_with_neighbour() {
        // Symmetric peak: the tangent is horizontal and each control sits at a fifth
        // of the neighbour distance times the tangent length.
        let anchors = [p(0.0, 0.0), p(30.0, 40.0), p(60.0, 0.0)];
        let curves = curves_through(&anchors).unwrap();
        assert_abs_diff_eq!(curves[0].control_2.y, 40.0, epsilon = 1e-9);
        assert_abs_diff_eq!(curves[1].control_1.y, 40.0, epsilon = 1e-9);
        assert_abs_diff_eq!(curves[0].control_2.x, 30.0 - 0.2 * 50.0 * 1.2, epsilon = 1e-9);
    }

    #[test]
    fn repeated_anchor_does_not_produce_nan() {
        let anchors = [p(0.0, 0.0), p(0.0, 0.0), p(10.0, 0.0)];
        let curves = curves_through(&anchors).unwrap();
        for c in &curves {
            for q in c.points() {
                assert!(q.x.is_finite() && q.y.is_finite());
            }
        }
    }

    #[test]
    fn single_anchor_is_rejected() {
        let err = curves_through(&[p(1.0, 1.0)]).unwrap_err();
        assert!(matches!(
            err,
            SproutsError::Geometry(GeometryError::TooFewAnchors { count: 1 })
        ));
    }
}
