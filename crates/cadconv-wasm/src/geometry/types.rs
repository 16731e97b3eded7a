//! Core geometry value types shared by the kernel, the plotter and the sink.

use serde::Serialize;

use crate::error::GeometryError;

/// Nanometres per millimetre.
pub const NM_PER_MM: i64 = 1_000_000;

/// Nanometres per inch.
pub const NM_PER_INCH: i64 = 25_400_000;

/// 2D point in board coordinate space, in integral nanometres.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Point {
    /// X coordinate.
    pub x: i64,
    /// Y coordinate.
    pub y: i64,
}

impl Point {
    /// The origin.
    pub const ORIGIN: Self = Self { x: 0, y: 0 };

    /// Creates a point from nanometre coordinates.
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// Returns this point shifted by `(dx, dy)`.
    #[must_use]
    pub const fn translated(self, dx: i64, dy: i64) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }

    /// Returns this point mirrored about the Y axis.
    #[must_use]
    pub const fn mirrored_y_axis(self) -> Self {
        Self {
            x: self.x.saturating_neg(),
            y: self.y,
        }
    }

    /// Returns the coordinates as floating point for intermediate maths.
    #[allow(clippy::cast_precision_loss)]
    pub fn to_f64(self) -> (f64, f64) {
        (self.x as f64, self.y as f64)
    }

    /// Rounds floating point coordinates to the nearest nanometre.
    pub fn from_f64(x: f64, y: f64) -> Self {
        Self {
            x: round_nm(x),
            y: round_nm(y),
        }
    }
}

/// Rounds a floating point nanometre value to an integer, saturating at the
/// `i64` range and mapping NaN to zero.
#[allow(clippy::cast_possible_truncation)]
pub fn round_nm(value: f64) -> i64 {
    // `as` saturates on overflow and maps NaN to 0.
    value.round() as i64
}

/// Axis-aligned bounding box in nanometres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoundingBox {
    /// Minimum X coordinate.
    pub min_x: i64,
    /// Minimum Y coordinate.
    pub min_y: i64,
    /// Maximum X coordinate.
    pub max_x: i64,
    /// Maximum Y coordinate.
    pub max_y: i64,
}

impl BoundingBox {
    /// Creates an empty bounding box that will expand with the first `update` call.
    pub const fn new() -> Self {
        Self {
            min_x: i64::MAX,
            min_y: i64::MAX,
            max_x: i64::MIN,
            max_y: i64::MIN,
        }
    }

    /// Returns `true` until the first point has been added.
    pub const fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    /// Expands the bounding box to include the given point.
    pub fn update(&mut self, x: i64, y: i64) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    /// Expands the bounding box to include a square of half-size `margin`
    /// around `point`.
    pub fn update_with_margin(&mut self, point: Point, margin: i64) {
        let margin = margin.saturating_abs();
        self.update(point.x.saturating_sub(margin), point.y.saturating_sub(margin));
        self.update(point.x.saturating_add(margin), point.y.saturating_add(margin));
    }

    /// Expands this bounding box to include `other`.
    pub fn merge(&mut self, other: &Self) {
        if other.is_empty() {
            return;
        }
        self.update(other.min_x, other.min_y);
        self.update(other.max_x, other.max_y);
    }

    /// Width of the box, zero when empty.
    pub const fn width(&self) -> i64 {
        if self.is_empty() {
            0
        } else {
            self.max_x.saturating_sub(self.min_x)
        }
    }

    /// Height of the box, zero when empty.
    pub const fn height(&self) -> i64 {
        if self.is_empty() {
            0
        } else {
            self.max_y.saturating_sub(self.min_y)
        }
    }

    /// Centre of the box, or the origin when empty.
    pub const fn center(&self) -> Point {
        if self.is_empty() {
            return Point::ORIGIN;
        }
        Point {
            x: self.min_x + self.width() / 2,
            y: self.min_y + self.height() / 2,
        }
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::new()
    }
}

/// Layer polarity (`%LPD*%` / `%LPC*%`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Polarity {
    /// Dark polarity: adds material.
    Dark,
    /// Clear polarity: removes material.
    Clear,
}

/// Interpolation mode state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpolationMode {
    /// Linear interpolation (G01).
    Linear,
    /// Clockwise circular interpolation (G02).
    ClockwiseArc,
    /// Counter-clockwise circular interpolation (G03).
    CounterClockwiseArc,
}

/// Arc sweep direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ArcDirection {
    /// Clockwise, negative sweep.
    Clockwise,
    /// Counter-clockwise, positive sweep.
    CounterClockwise,
}

impl ArcDirection {
    /// The opposite direction.
    #[must_use]
    pub const fn reversed(self) -> Self {
        match self {
            Self::Clockwise => Self::CounterClockwise,
            Self::CounterClockwise => Self::Clockwise,
        }
    }
}

/// A resolved circular arc.
///
/// Angles are in degrees, measured counter-clockwise from the positive X
/// axis. The sign of `delta_angle_deg` always agrees with `direction`.
/// Instances only come out of [`ArcParameters::new`], which rejects a
/// non-positive radius and a non-finite sweep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ArcParameters {
    center: Point,
    radius: f64,
    start_angle_deg: f64,
    delta_angle_deg: f64,
    direction: ArcDirection,
}

impl ArcParameters {
    /// Validates and builds arc parameters. The direction follows the sign of
    /// `delta_angle_deg`.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::ZeroRadius`] when `radius` is not a positive
    /// finite number and [`GeometryError::NonFiniteSweep`] when either angle
    /// is not finite.
    pub fn new(
        center: Point,
        radius: f64,
        start_angle_deg: f64,
        delta_angle_deg: f64,
    ) -> Result<Self, GeometryError> {
        if !radius.is_finite() || radius <= f64::EPSILON {
            return Err(GeometryError::ZeroRadius);
        }
        if !delta_angle_deg.is_finite() || !start_angle_deg.is_finite() {
            return Err(GeometryError::NonFiniteSweep);
        }

        let direction = if delta_angle_deg < 0.0 {
            ArcDirection::Clockwise
        } else {
            ArcDirection::CounterClockwise
        };

        Ok(Self {
            center,
            radius,
            start_angle_deg,
            delta_angle_deg,
            direction,
        })
    }

    /// Centre of the arc.
    pub const fn center(&self) -> Point {
        self.center
    }

    /// Radius in nanometres, unrounded.
    pub const fn radius(&self) -> f64 {
        self.radius
    }

    /// Start angle in degrees.
    pub const fn start_angle_deg(&self) -> f64 {
        self.start_angle_deg
    }

    /// Signed sweep in degrees.
    pub const fn delta_angle_deg(&self) -> f64 {
        self.delta_angle_deg
    }

    /// End angle in degrees (`start + delta`).
    pub fn end_angle_deg(&self) -> f64 {
        self.start_angle_deg + self.delta_angle_deg
    }

    /// Sweep direction.
    pub const fn direction(&self) -> ArcDirection {
        self.direction
    }

    /// Point on the arc at `angle_deg`, rounded to the nearest nanometre.
    pub fn point_at(&self, angle_deg: f64) -> Point {
        let (cx, cy) = self.center.to_f64();
        let angle = angle_deg.to_radians();
        Point::from_f64(
            self.radius.mul_add(angle.cos(), cx),
            self.radius.mul_add(angle.sin(), cy),
        )
    }

    /// First point of the arc.
    pub fn start_point(&self) -> Point {
        self.point_at(self.start_angle_deg)
    }

    /// Last point of the arc.
    pub fn end_point(&self) -> Point {
        self.point_at(self.end_angle_deg())
    }

    /// Returns the arc shifted by `(dx, dy)`.
    #[must_use]
    pub const fn translated(self, dx: i64, dy: i64) -> Self {
        Self {
            center: self.center.translated(dx, dy),
            ..self
        }
    }

    /// Returns the arc mirrored about the Y axis. The sweep flips sign and the
    /// direction reverses.
    #[must_use]
    pub fn mirrored_y_axis(self) -> Self {
        Self {
            center: self.center.mirrored_y_axis(),
            radius: self.radius,
            start_angle_deg: 180.0 - self.start_angle_deg,
            delta_angle_deg: -self.delta_angle_deg,
            direction: self.direction.reversed(),
        }
    }
}
