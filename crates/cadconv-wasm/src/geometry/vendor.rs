//! Arc encodings used by footprint and board formats other than Gerber.
//!
//! Every adapter returns arcs in board coordinates (Y up, positive sweep
//! counter-clockwise, nanometres).

use serde::Serialize;

use crate::error::GeometryError;

use super::arc::{arc_from_endpoints_and_sweep, normalize_angle_deg};
use super::types::{round_nm, ArcParameters, Point};

/// Nanometres per mil.
pub const NM_PER_MIL: f64 = 25_400.0;

/// Stroke width substituted when a format stores a zero width.
pub const DEFAULT_ARC_THICKNESS_NM: i64 = 254_000;

/// An arc read from a vendor format together with its stroke width.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VendorArc {
    /// Resolved arc geometry.
    pub arc: ArcParameters,
    /// Stroke width in nanometres.
    pub thickness: i64,
}

/// Eagle `<wire x1 y1 x2 y2 width curve>`: two endpoints and a signed curve
/// angle, positive counter-clockwise from the first point to the second.
///
/// # Errors
///
/// Propagates [`arc_from_endpoints_and_sweep`] failures.
pub fn eagle_wire_arc(
    p1: Point,
    p2: Point,
    curve_deg: f64,
    width: i64,
) -> Result<VendorArc, GeometryError> {
    let arc = arc_from_endpoints_and_sweep(p1, p2, curve_deg)?;
    Ok(VendorArc {
        arc,
        thickness: thickness_or_default(width),
    })
}

/// BXL `Arc (Origin x, y) (Radius r) (StartAngle a) (SweepAngle s) (Width w)`
/// with lengths in mils and angles in degrees.
///
/// # Errors
///
/// Returns [`GeometryError::ZeroRadius`] or [`GeometryError::NonFiniteSweep`]
/// for invalid values.
pub fn bxl_arc(
    origin_mil: (f64, f64),
    radius_mil: f64,
    start_deg: f64,
    sweep_deg: f64,
    width_mil: f64,
) -> Result<VendorArc, GeometryError> {
    let center = Point::from_f64(origin_mil.0 * NM_PER_MIL, origin_mil.1 * NM_PER_MIL);
    let arc = ArcParameters::new(
        center,
        radius_mil * NM_PER_MIL,
        start_deg,
        normalize_angle_deg(sweep_deg),
    )?;
    Ok(VendorArc {
        arc,
        thickness: thickness_or_default(round_nm(width_mil * NM_PER_MIL)),
    })
}

/// KiCad `DA`/`fp_arc`: centre and start point in the Y-down footprint
/// frame, and a clockwise sweep in decidegrees.
///
/// Some converted footprints carry sweeps beyond a full turn; these collapse
/// to a single turn, so `3600` and `7200` are both a full circle.
///
/// # Errors
///
/// Returns [`GeometryError::ZeroRadius`] when the start point is the centre.
pub fn kicad_arc(
    center: Point,
    start: Point,
    delta_decideg: i64,
    width: i64,
) -> Result<VendorArc, GeometryError> {
    let center = flip_y(center);
    let start = flip_y(start);
    let (cx, cy) = center.to_f64();
    let (sx, sy) = start.to_f64();

    #[allow(clippy::cast_precision_loss)]
    let clockwise_deg = normalize_angle_deg(delta_decideg as f64 / 10.0);
    let radius = (sx - cx).hypot(sy - cy);
    let start_angle = (sy - cy).atan2(sx - cx).to_degrees();

    let arc = ArcParameters::new(center, radius, start_angle, -clockwise_deg)?;
    Ok(VendorArc {
        arc,
        thickness: thickness_or_default(width),
    })
}

const fn flip_y(point: Point) -> Point {
    Point::new(point.x, point.y.saturating_neg())
}

const fn thickness_or_default(width: i64) -> i64 {
    if width <= 0 {
        DEFAULT_ARC_THICKNESS_NM
    } else {
        width
    }
}
