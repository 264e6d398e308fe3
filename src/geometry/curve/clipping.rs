use tracing::{trace, warn};

use crate::math::intersect_2d::ImplicitLine;
use crate::math::{Point2, Vector2};

use super::CubicBezier;

/// Bounding-box area (px²) below which a sub-curve is treated as a single pixel.
const BOUNDING_BOX_AREA: f64 = 3.0;

/// Squared endpoint distance at which two pixel-sized sub-curves intersect.
const INTERSECT_DIST_SQ: f64 = 4.0;

/// Clipping must shrink an interval to at most this ratio, or the pair is split.
const PARAMETER_CHANGE: f64 = 0.80;

/// Hits closer than this (squared) to an earlier hit are the same crossing.
const DUPLICATE_DIST_SQ: f64 = 16.0;

/// Chords shorter than this (squared) do not define a usable line.
const DEGENERATE_CHORD_SQ: f64 = 0.1;

/// Length of the replacement chord built for a degenerate sub-curve.
const CHORD_NUDGE: f64 = 0.1;

/// Slack added around every clipped interval so tangential contacts survive.
const INTERVAL_PADDING: f64 = 1e-9;

/// Upper bound on processed parameter boxes, reached only by overlapping curves.
const MAX_ITERATIONS: usize = 20_000;

/// A pair of parameter intervals, one per curve.
#[derive(Debug, Clone, Copy)]
struct ParameterBox {
    t_min: f64,
    t_max: f64,
    u_min: f64,
    u_max: f64,
}

/// Returns every crossing point of `first` and `second`, by Bézier clipping.
///
/// Each step bounds one curve by a fat line strip and removes the parameter
/// range of the other curve whose distance hull falls outside that strip.
/// Pairs that stop shrinking are bisected instead.
pub(crate) fn intersect(first: &CubicBezier, second: &CubicBezier) -> Vec<Point2> {
    let mut hits: Vec<Point2> = Vec::new();
    let mut stack = vec![ParameterBox {
        t_min: 0.0,
        t_max: 1.0,
        u_min: 0.0,
        u_max: 1.0,
    }];
    let mut iterations = 0usize;

    while let Some(bx) = stack.pop() {
        iterations += 1;
        if iterations > MAX_ITERATIONS {
            warn!(
                pending = stack.len(),
                hits = hits.len(),
                "curve clipping did not converge, curves probably overlap"
            );
            break;
        }
        if bx.t_max - bx.t_min <= 0.0 || bx.u_max - bx.u_min <= 0.0 {
            continue;
        }

        let first_sub = first.sub_curve(bx.t_min, bx.t_max);
        let second_sub = second.sub_curve(bx.u_min, bx.u_max);
        let first_small = first_sub.bounding_box_area() < BOUNDING_BOX_AREA;
        let second_small = second_sub.bounding_box_area() < BOUNDING_BOX_AREA;

        if first_small && second_small {
            if endpoints_close(&first_sub, &second_sub) {
                record_hit(&mut hits, hit_point(&first_sub, &second_sub));
            }
            continue;
        }

        // Clip the second curve against strips around the first.
        let (u_min, u_max) = if second_small {
            (bx.u_min, bx.u_max)
        } else {
            match clip(&first_sub, &second_sub) {
                Some((lo, hi)) => project(lo, hi, bx.u_min, bx.u_max),
                None => continue,
            }
        };

        // Then clip the first curve against strips around what is left of the second.
        let second_clipped = second.sub_curve(u_min, u_max);
        let (t_min, t_max) = if first_small {
            (bx.t_min, bx.t_max)
        } else {
            match clip(&second_clipped, &first_sub) {
                Some((lo, hi)) => project(lo, hi, bx.t_min, bx.t_max),
                None => continue,
            }
        };

        let t_ratio = (t_max - t_min) / (bx.t_max - bx.t_min);
        let u_ratio = (u_max - u_min) / (bx.u_max - bx.u_min);

        if t_ratio > PARAMETER_CHANGE && u_ratio > PARAMETER_CHANGE {
            let split_second = if first_small {
                true
            } else if second_small {
                false
            } else {
                t_max - t_min < u_max - u_min
            };
            if split_second {
                let mid = 0.5 * (u_min + u_max);
                stack.push(ParameterBox { t_min, t_max, u_min, u_max: mid });
                stack.push(ParameterBox { t_min, t_max, u_min: mid, u_max });
            } else {
                let mid = 0.5 * (t_min + t_max);
                stack.push(ParameterBox { t_min, t_max: mid, u_min, u_max });
                stack.push(ParameterBox { t_min: mid, t_max, u_min, u_max });
            }
        } else {
            stack.push(ParameterBox {
                t_min,
                t_max,
                u_min,
                u_max,
            });
        }
    }

    trace!(iterations, hits = hits.len(), "curve clipping finished");
    hits
}

/// Maps a local interval of a sub-curve back into the parent's parameter space.
fn project(lo: f64, hi: f64, min: f64, max: f64) -> (f64, f64) {
    let span = max - min;
    (min + lo * span, min + hi * span)
}

fn endpoints_close(a: &CubicBezier, b: &CubicBezier) -> bool {
    [a.start, a.end].iter().any(|p| {
        [b.start, b.end]
            .iter()
            .any(|q| (p - q).norm_squared() < INTERSECT_DIST_SQ)
    })
}

/// Locates the crossing of two pixel-sized sub-curves.
///
/// At this scale both pieces are close to straight, so the crossing of their
/// chords is used when it lies within a pixel of both pieces. Otherwise the
/// parameter midpoint of the first piece is used.
fn hit_point(a: &CubicBezier, b: &CubicBezier) -> Point2 {
    let fallback = a.point_at(0.5);
    let (Some(line_a), Some(line_b)) = (
        ImplicitLine::through(&a.start, &a.end),
        ImplicitLine::through(&b.start, &b.end),
    ) else {
        return fallback;
    };
    match line_a.intersection(&line_b) {
        Some(p) if near_box(a, &p) && near_box(b, &p) => p,
        _ => fallback,
    }
}

fn near_box(curve: &CubicBezier, p: &Point2) -> bool {
    let bbox = curve.bounding_box();
    p.x >= bbox.min.x - 1.0
        && p.x <= bbox.max.x + 1.0
        && p.y >= bbox.min.y - 1.0
        && p.y <= bbox.max.y + 1.0
}

fn record_hit(hits: &mut Vec<Point2>, p: Point2) {
    if hits
        .iter()
        .all(|h| (h - p).norm_squared() >= DUPLICATE_DIST_SQ)
    {
        hits.push(p);
    }
}

/// Clips `target` against both fat lines of `clipper`.
///
/// Returns the tighter of the two local parameter intervals of `target`, or
/// `None` when either strip proves the curves cannot meet.
fn clip(clipper: &CubicBezier, target: &CubicBezier) -> Option<(f64, f64)> {
    let fallback = target.end - target.start;
    let parallel = FatLine::parallel(clipper, fallback).clip(target)?;
    let perpendicular = FatLine::perpendicular(clipper, fallback).clip(target)?;

    let (lo, hi) = if parallel.1 - parallel.0 <= perpendicular.1 - perpendicular.0 {
        parallel
    } else {
        perpendicular
    };
    Some((
        (lo - INTERVAL_PADDING).max(0.0),
        (hi + INTERVAL_PADDING).min(1.0),
    ))
}

/// A strip `d_min ≤ distance ≤ d_max` around a line, enclosing a curve.
#[derive(Debug, Clone, Copy)]
struct FatLine {
    line: ImplicitLine,
    d_min: f64,
    d_max: f64,
}

impl FatLine {
    /// Strip parallel to the chord of `curve`.
    fn parallel(curve: &CubicBezier, fallback: Vector2) -> Self {
        match chord(curve) {
            Some(line) => {
                let d1 = line.distance(&curve.control_1);
                let d2 = line.distance(&curve.control_2);
                let factor = if d1 * d2 > 0.0 { 3.0 / 4.0 } else { 4.0 / 9.0 };
                Self {
                    line,
                    d_min: factor * d1.min(d2).min(0.0),
                    d_max: factor * d1.max(d2).max(0.0),
                }
            }
            None => {
                // Without a chord the tight factors do not hold; bound by all points instead.
                let line = nudged_line(curve, fallback);
                let (d_min, d_max) = distance_range(&line, curve);
                Self { line, d_min, d_max }
            }
        }
    }

    /// Strip perpendicular to the chord of `curve`, spanning the curve's extent along it.
    fn perpendicular(curve: &CubicBezier, fallback: Vector2) -> Self {
        let base = chord(curve).unwrap_or_else(|| nudged_line(curve, fallback));
        // Rotating the normal by a quarter turn gives the chord direction.
        let normal = Vector2::new(base.b, -base.a);
        let offset = curve
            .points()
            .iter()
            .map(|p| normal.dot(&p.coords))
            .fold(f64::INFINITY, f64::min);
        let line = ImplicitLine::from_normal(normal, offset);
        let (_, d_max) = distance_range(&line, curve);
        Self {
            line,
            d_min: 0.0,
            d_max,
        }
    }

    /// Local parameter interval of `target` whose distance hull lies inside the strip.
    fn clip(&self, target: &CubicBezier) -> Option<(f64, f64)> {
        let hull = ConvexHull4::new(
            target
                .points()
                .map(|p| self.line.distance(&p)),
        );
        hull.clip(self.d_min, self.d_max)
    }
}

fn chord(curve: &CubicBezier) -> Option<ImplicitLine> {
    if (curve.end - curve.start).norm_squared() < DEGENERATE_CHORD_SQ {
        return None;
    }
    ImplicitLine::through(&curve.start, &curve.end)
}

/// A short replacement chord from the curve's start.
///
/// Points toward the farthest defining point when the curve has any extent,
/// otherwise along `fallback` (normally the other curve's chord).
fn nudged_line(curve: &CubicBezier, fallback: Vector2) -> ImplicitLine {
    let farthest = [curve.control_1, curve.control_2, curve.end]
        .iter()
        .map(|p| p - curve.start)
        .fold(Vector2::zeros(), |best, v| {
            if v.norm_squared() > best.norm_squared() {
                v
            } else {
                best
            }
        });
    let direction = if farthest.norm_squared() >= DEGENERATE_CHORD_SQ {
        farthest
    } else {
        fallback
    };
    let direction = direction
        .try_normalize(f64::EPSILON)
        .unwrap_or_else(Vector2::x);
    let tip = curve.start + direction * CHORD_NUDGE;
    ImplicitLine::through(&curve.start, &tip)
        .unwrap_or_else(|| ImplicitLine::from_normal(Vector2::y(), curve.start.y))
}

fn distance_range(line: &ImplicitLine, curve: &CubicBezier) -> (f64, f64) {
    curve
        .points()
        .iter()
        .map(|p| line.distance(p))
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), d| {
            (lo.min(d), hi.max(d))
        })
}

/// Convex hull of the four points `(i/3, d_i)` of a distance function.
#[derive(Debug, Clone)]
struct ConvexHull4 {
    /// Hull vertices in counter-clockwise order.
    vertices: Vec<(f64, f64)>,
}

impl ConvexHull4 {
    fn new(distances: [f64; 4]) -> Self {
        let points: [(f64, f64); 4] = [
            (0.0, distances[0]),
            (1.0 / 3.0, distances[1]),
            (2.0 / 3.0, distances[2]),
            (1.0, distances[3]),
        ];

        // Monotone chain; the points are already sorted by x.
        let mut lower: Vec<(f64, f64)> = Vec::with_capacity(4);
        for &p in &points {
            while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0.0 {
                lower.pop();
            }
            lower.push(p);
        }
        let mut upper: Vec<(f64, f64)> = Vec::with_capacity(4);
        for &p in points.iter().rev() {
            while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0.0 {
                upper.pop();
            }
            upper.push(p);
        }
        lower.pop();
        upper.pop();
        lower.extend(upper);
        Self { vertices: lower }
    }

    /// Range of x where the hull overlaps the horizontal strip `[d_min, d_max]`.
    fn clip(&self, d_min: f64, d_max: f64) -> Option<(f64, f64)> {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        let n = self.vertices.len();

        for i in 0..n {
            let (x0, y0) = self.vertices[i];
            if (d_min..=d_max).contains(&y0) {
                lo = lo.min(x0);
                hi = hi.max(x0);
            }
            let (x1, y1) = self.vertices[(i + 1) % n];
            for level in [d_min, d_max] {
                if (y0 - level) * (y1 - level) < 0.0 {
                    let x = x0 + (level - y0) * (x1 - x0) / (y1 - y0);
                    lo = lo.min(x);
                    hi = hi.max(x);
                }
            }
        }

        (lo <= hi).then(|| (lo.max(0.0), hi.min(1.0)))
    }
}

fn cross(o: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
    (a.0 - o.0) * (b.1 - o.1) - (a.1 - o.1) * (b.0 - o.0)
}
