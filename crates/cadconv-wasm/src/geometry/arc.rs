//! Arc reconstruction from the representations CAD vendors store.
//!
//! Two entry points resolve an [`ArcParameters`]:
//!
//! - [`arc_from_endpoints_and_sweep`] for "bulge" style formats that keep the
//!   two endpoints and a signed sweep angle;
//! - [`arc_from_center_and_offsets`] for photoplotter I/J offsets in single-
//!   or multi-quadrant mode.
//!
//! Everything here is pure. Centres are rounded to whole nanometres when the
//! [`ArcParameters`] is built; radius and angles stay unrounded.

use log::trace;

use crate::error::GeometryError;

use super::types::{ArcDirection, ArcParameters, BoundingBox, Point};

const FULL_TURN_DEG: f64 = 360.0;
const HALF_TURN_DEG: f64 = 180.0;
const QUARTER_TURN_DEG: f64 = 90.0;
/// Beyond this magnitude the angle is pre-reduced so the adjustment loop stays short.
const LARGE_ANGLE_DEG: f64 = FULL_TURN_DEG * 64.0;
const COSINE_DENOMINATOR_EPSILON: f64 = 1e-12;
const RADIUS_MISMATCH_RELATIVE: f64 = 1e-3;
const RADIUS_MISMATCH_FLOOR_NM: f64 = 2_540.0;
const SINGLE_QUADRANT_MAX_SWEEP_DEG: f64 = 90.5;

/// Default tessellation count for arcs inside polygon outlines.
pub const DEFAULT_ARC_SEGMENTS: u32 = 15;

/// Resolve the arc of signed sweep `sweep_deg` running from `p1` to `p2`.
///
/// Positive sweeps run counter-clockwise. The radius comes from the law of
/// cosines on the chord; the centre sits on the perpendicular bisector at the
/// Pythagorean offset, on the side picked by the sign of the chord × offset
/// cross product. Sweeps larger than a half turn put the centre on the other
/// side, so the cross-product choice is inverted for them.
///
/// # Errors
///
/// - [`GeometryError::DegenerateChord`] when `p1 == p2`.
/// - [`GeometryError::ImaginaryRadius`] when the sweep is (close to) a
///   multiple of a full turn, leaving no finite radius.
/// - [`GeometryError::NonFiniteSweep`] for NaN or infinite sweeps.
pub fn arc_from_endpoints_and_sweep(
    p1: Point,
    p2: Point,
    sweep_deg: f64,
) -> Result<ArcParameters, GeometryError> {
    if !sweep_deg.is_finite() {
        return Err(GeometryError::NonFiniteSweep);
    }
    if p1 == p2 {
        return Err(GeometryError::DegenerateChord);
    }

    let sweep = normalize_angle_deg(sweep_deg);
    let (ax, ay) = p1.to_f64();
    let (bx, by) = p2.to_f64();
    let dx = bx - ax;
    let dy = by - ay;
    let chord_len_sq = dx.mul_add(dx, dy * dy);
    let chord_len = chord_len_sq.sqrt();

    let theta = sweep.abs().to_radians();
    let denominator = 2.0f64.mul_add(-theta.cos(), 2.0);
    if denominator <= COSINE_DENOMINATOR_EPSILON {
        return Err(GeometryError::ImaginaryRadius);
    }

    let radius = (chord_len_sq / denominator).sqrt();
    let half_chord = chord_len / 2.0;
    let offset_distance = radius.mul_add(radius, -(half_chord * half_chord)).max(0.0).sqrt();

    // Candidate offset: the chord direction turned a quarter clockwise.
    let offset_x = offset_distance * dy / chord_len;
    let offset_y = -offset_distance * dx / chord_len;
    let mid_x = (ax + bx) / 2.0;
    let mid_y = (ay + by) / 2.0;

    let cross = dx.mul_add(offset_y, -(dy * offset_x));
    let mut take_candidate = (cross > 0.0) == (sweep > 0.0);
    if sweep.abs() > HALF_TURN_DEG {
        take_candidate = !take_candidate;
    }

    let (cx, cy) = if take_candidate {
        (mid_x + offset_x, mid_y + offset_y)
    } else {
        (mid_x - offset_x, mid_y - offset_y)
    };

    let start_angle = (ay - cy).atan2(ax - cx).to_degrees();
    trace!("arc through {p1:?} and {p2:?}: centre ({cx}, {cy}), radius {radius}, sweep {sweep}");
    ArcParameters::new(Point::from_f64(cx, cy), radius, start_angle, sweep)
}

/// Resolve a photoplotter arc from the current point, target point and I/J
/// centre offsets (all in nanometres).
///
/// In multi-quadrant mode the offsets are signed and the centre is simply
/// `current + (i, j)`; identical start and end points describe a full circle.
/// In single-quadrant mode the offsets are unsigned and the four sign
/// combinations are tried; the candidate whose start and end radii agree and
/// whose sweep in `direction` stays within a quadrant wins.
///
/// # Errors
///
/// - [`GeometryError::ZeroRadius`] when the multi-quadrant centre coincides
///   with the start point.
/// - [`GeometryError::AmbiguousQuadrant`] when no single-quadrant candidate
///   is consistent with the endpoints.
pub fn arc_from_center_and_offsets(
    current: Point,
    target: Point,
    i: f64,
    j: f64,
    multi_quadrant: bool,
    direction: ArcDirection,
) -> Result<ArcParameters, GeometryError> {
    if !i.is_finite() || !j.is_finite() {
        return Err(GeometryError::NonFiniteSweep);
    }

    if multi_quadrant {
        return resolve_multi_quadrant(current, target, i, j, direction);
    }

    resolve_single_quadrant(current, target, i.abs(), j.abs(), direction)
}

fn resolve_multi_quadrant(
    current: Point,
    target: Point,
    i: f64,
    j: f64,
    direction: ArcDirection,
) -> Result<ArcParameters, GeometryError> {
    let (sx, sy) = current.to_f64();
    let center = (sx + i, sy + j);
    let start_radius = distance((sx, sy), center);
    if start_radius <= f64::EPSILON {
        return Err(GeometryError::ZeroRadius);
    }

    let start_angle = (sy - center.1).atan2(sx - center.0).to_degrees();
    if current == target {
        let sweep = match direction {
            ArcDirection::Clockwise => -FULL_TURN_DEG,
            ArcDirection::CounterClockwise => FULL_TURN_DEG,
        };
        return ArcParameters::new(
            Point::from_f64(center.0, center.1),
            start_radius,
            start_angle,
            sweep,
        );
    }

    let end = target.to_f64();
    let end_radius = distance(end, center);
    let radius = resolve_radius(start_radius, end_radius);
    let end_angle = (end.1 - center.1).atan2(end.0 - center.0).to_degrees();
    let sweep = compute_sweep(start_angle, end_angle, direction);

    ArcParameters::new(Point::from_f64(center.0, center.1), radius, start_angle, sweep)
}

fn resolve_single_quadrant(
    current: Point,
    target: Point,
    i: f64,
    j: f64,
    direction: ArcDirection,
) -> Result<ArcParameters, GeometryError> {
    let start = current.to_f64();
    let end = target.to_f64();

    // Axis-aligned offsets (i or j zero) collapse pairs of candidates.
    let candidates = [(i, j), (-i, j), (i, -j), (-i, -j)];

    let mut best: Option<(f64, ArcParameters)> = None;
    for (ci, cj) in candidates {
        let center = (start.0 + ci, start.1 + cj);
        let start_radius = distance(start, center);
        if start_radius <= f64::EPSILON {
            continue;
        }

        let end_radius = distance(end, center);
        let mismatch = (start_radius - end_radius).abs();
        if mismatch > radius_tolerance(start_radius) {
            continue;
        }

        let start_angle = (start.1 - center.1).atan2(start.0 - center.0).to_degrees();
        let end_angle = (end.1 - center.1).atan2(end.0 - center.0).to_degrees();
        let sweep = compute_sweep(start_angle, end_angle, direction);
        if sweep.abs() > SINGLE_QUADRANT_MAX_SWEEP_DEG {
            continue;
        }

        let is_better = best.as_ref().map_or(true, |(score, _)| mismatch < *score);
        if is_better {
            let arc = ArcParameters::new(
                Point::from_f64(center.0, center.1),
                (start_radius + end_radius) / 2.0,
                start_angle,
                sweep,
            )?;
            best = Some((mismatch, arc));
        }
    }

    best.map(|(_, arc)| arc)
        .ok_or(GeometryError::AmbiguousQuadrant)
}

/// Reduce an angle into `(-360, 360]` by whole-turn adjustments.
///
/// Positive multiples of a full turn map to `360`, negative ones to `0`, the
/// sign of any partial turn is kept. Non-finite input is returned unchanged.
pub fn normalize_angle_deg(a: f64) -> f64 {
    if !a.is_finite() {
        return a;
    }

    let mut angle = a;
    if angle.abs() > LARGE_ANGLE_DEG {
        let remainder = angle % FULL_TURN_DEG;
        angle = if remainder == 0.0 && angle > 0.0 {
            FULL_TURN_DEG
        } else {
            remainder
        };
    }

    while angle > FULL_TURN_DEG {
        angle -= FULL_TURN_DEG;
    }
    while angle <= -FULL_TURN_DEG {
        angle += FULL_TURN_DEG;
    }
    angle
}

/// Tessellate an arc into `segment_count + 1` points running from its start
/// point to its end point.
///
/// Points are generated with a positive sweep; when the stored sweep is
/// negative they are generated from the end point and the order is reversed,
/// so a chain of arcs keeps the winding of the outline it belongs to.
pub fn polygon_as_line_segments(arc: ArcParameters, segment_count: u32) -> Vec<Point> {
    let segments = segment_count.max(1);
    let delta = arc.delta_angle_deg();
    let reverse = delta < 0.0;
    let (first_angle, sweep) = if reverse {
        (arc.start_angle_deg() + delta, -delta)
    } else {
        (arc.start_angle_deg(), delta)
    };

    let mut points: Vec<Point> = (0..=segments)
        .map(|step| {
            let t = f64::from(step) / f64::from(segments);
            arc.point_at(sweep.mul_add(t, first_angle))
        })
        .collect();

    if reverse {
        points.reverse();
    }
    points
}

impl ArcParameters {
    /// Exact extents of the arc stroked with `half_width`: both endpoints plus
    /// every axis crossing inside the sweep.
    pub fn bounding_box(&self, half_width: i64) -> BoundingBox {
        let mut bounds = BoundingBox::new();
        bounds.update_with_margin(self.start_point(), half_width);
        bounds.update_with_margin(self.end_point(), half_width);

        let delta = self.delta_angle_deg();
        let (low, high) = if delta < 0.0 {
            (self.start_angle_deg() + delta, self.start_angle_deg())
        } else {
            (self.start_angle_deg(), self.start_angle_deg() + delta)
        };

        // Walk the quarter-turn axis angles inside the swept range. A sweep
        // crosses at most four axes, so the walk is bounded whatever the
        // start angle.
        let span = (high - low).min(FULL_TURN_DEG);
        let low = low.rem_euclid(FULL_TURN_DEG);
        let first_axis = (low / QUARTER_TURN_DEG).ceil();
        for step in 0..5_u8 {
            let axis = (first_axis + f64::from(step)) * QUARTER_TURN_DEG;
            if axis > low + span {
                break;
            }
            bounds.update_with_margin(self.point_at(axis), half_width);
        }

        bounds
    }
}

fn resolve_radius(start_radius: f64, end_radius: f64) -> f64 {
    if (start_radius - end_radius).abs() > radius_tolerance(start_radius) {
        trace!("arc radii mismatch ({start_radius} vs {end_radius}); using average radius");
        return (start_radius + end_radius) / 2.0;
    }

    start_radius
}

fn radius_tolerance(radius: f64) -> f64 {
    (radius * RADIUS_MISMATCH_RELATIVE).max(RADIUS_MISMATCH_FLOOR_NM)
}

fn compute_sweep(start_angle: f64, end_angle: f64, direction: ArcDirection) -> f64 {
    let delta = end_angle - start_angle;
    match direction {
        ArcDirection::Clockwise => {
            if delta >= 0.0 {
                delta - FULL_TURN_DEG
            } else {
                delta
            }
        }
        ArcDirection::CounterClockwise => {
            if delta <= 0.0 {
                delta + FULL_TURN_DEG
            } else {
                delta
            }
        }
    }
}

fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    dx.hypot(dy)
}
