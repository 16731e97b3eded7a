//! Aperture shapes and the per-job aperture table.
//!
//! Dimensions are integral nanometres, converted with the units active when
//! the `AD` directive was read.

use std::collections::HashMap;

use log::debug;
use serde::Serialize;

use super::types::{round_nm, Point};

/// Identifier of the built-in fallback aperture.
pub const DEFAULT_APERTURE_ID: u32 = 10;

/// Diameter of the built-in fallback aperture: a 0.025" circle.
pub const DEFAULT_APERTURE_DIAMETER_NM: i64 = 635_000;

/// Shape of a standard aperture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ApertureShape {
    /// `C` aperture.
    Circle {
        /// Outer diameter.
        diameter: i64,
    },
    /// `R` aperture.
    Rectangle {
        /// Size along X.
        width: i64,
        /// Size along Y.
        height: i64,
    },
    /// `O` aperture: a rectangle with fully rounded short ends.
    Oval {
        /// Size along X.
        width: i64,
        /// Size along Y.
        height: i64,
    },
    /// `P` aperture.
    RegularPolygon {
        /// Diameter of the circumscribed circle.
        outer_diameter: i64,
        /// Number of vertices (3 to 12 in well-formed input).
        vertex_count: u32,
        /// Rotation of the first vertex, degrees counter-clockwise.
        rotation_deg: f64,
        /// Diameter of a round hole, zero when absent.
        hole_diameter: i64,
    },
}

/// How a stroke drawn with an aperture ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineCap {
    /// Round ends (circle, oval and polygon apertures).
    Round,
    /// Square ends (rectangle apertures).
    Square,
}

impl ApertureShape {
    /// The built-in fallback shape.
    pub const DEFAULT: Self = Self::Circle {
        diameter: DEFAULT_APERTURE_DIAMETER_NM,
    };

    /// Width of a stroke drawn with this aperture.
    pub fn stroke_width(&self) -> i64 {
        match *self {
            Self::Circle { diameter } => diameter,
            Self::Rectangle { width, height } | Self::Oval { width, height } => {
                width.min(height)
            }
            Self::RegularPolygon { outer_diameter, .. } => outer_diameter,
        }
    }

    /// Line cap used when stroking with this aperture.
    pub const fn line_cap(&self) -> LineCap {
        match self {
            Self::Rectangle { .. } => LineCap::Square,
            Self::Circle { .. } | Self::Oval { .. } | Self::RegularPolygon { .. } => {
                LineCap::Round
            }
        }
    }

    /// Half extents `(dx, dy)` of a flash of this aperture.
    pub fn half_extents(&self) -> (i64, i64) {
        match *self {
            Self::Circle { diameter } => (diameter / 2, diameter / 2),
            Self::Rectangle { width, height } | Self::Oval { width, height } => {
                (width / 2, height / 2)
            }
            Self::RegularPolygon { outer_diameter, .. } => (outer_diameter / 2, outer_diameter / 2),
        }
    }

    /// Vertices of a regular polygon aperture flashed at `center`, or `None`
    /// for the other shapes.
    pub fn polygon_vertices(&self, center: Point) -> Option<Vec<Point>> {
        let Self::RegularPolygon {
            outer_diameter,
            vertex_count,
            rotation_deg,
            ..
        } = *self
        else {
            return None;
        };

        let sides = vertex_count.max(3);
        #[allow(clippy::cast_precision_loss)]
        let radius = outer_diameter as f64 / 2.0;
        let (cx, cy) = center.to_f64();
        let vertices = (0..sides)
            .map(|index| {
                let angle =
                    (360.0f64.mul_add(f64::from(index) / f64::from(sides), rotation_deg)).to_radians();
                Point::new(
                    round_nm(radius.mul_add(angle.cos(), cx)),
                    round_nm(radius.mul_add(angle.sin(), cy)),
                )
            })
            .collect();
        Some(vertices)
    }

    /// The shape mirrored about the Y axis.
    #[must_use]
    pub fn mirrored_y_axis(self) -> Self {
        match self {
            Self::RegularPolygon {
                outer_diameter,
                vertex_count,
                rotation_deg,
                hole_diameter,
            } => Self::RegularPolygon {
                outer_diameter,
                vertex_count,
                rotation_deg: 180.0 - rotation_deg,
                hole_diameter,
            },
            other => other,
        }
    }
}

/// An aperture captured by value at the time an event is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Aperture {
    /// D-code the aperture was selected with.
    pub id: u32,
    /// Shape at the time of selection.
    pub shape: ApertureShape,
}

/// Apertures defined by `AD` directives during one conversion job.
///
/// Entries are never removed. Lookups of id 0 or any undefined id fall back
/// to [`ApertureShape::DEFAULT`].
#[derive(Debug, Clone, Default)]
pub struct ApertureTable {
    entries: HashMap<u32, ApertureShape>,
}

impl ApertureTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the shape for `id`.
    pub fn define(&mut self, id: u32, shape: ApertureShape) {
        if let Some(previous) = self.entries.insert(id, shape) {
            debug!("aperture D{id} redefined: {previous:?} -> {shape:?}");
        } else {
            debug!("aperture D{id} defined: {shape:?}");
        }
    }

    /// Shape for `id`, or the built-in default.
    pub fn lookup(&self, id: u32) -> ApertureShape {
        if id == 0 {
            return ApertureShape::DEFAULT;
        }
        self.entries
            .get(&id)
            .copied()
            .unwrap_or(ApertureShape::DEFAULT)
    }

    /// The aperture for `id` captured by value.
    pub fn capture(&self, id: u32) -> Aperture {
        Aperture {
            id,
            shape: self.lookup(id),
        }
    }

    /// Number of user-defined apertures.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when nothing has been defined.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(0)]
    #[case(10)]
    #[case(11)]
    #[case(999)]
    fn ut_apr_001_undefined_ids_fall_back_to_default_circle(#[case] id: u32) {
        let table = ApertureTable::new();
        assert_eq!(
            table.lookup(id),
            ApertureShape::Circle {
                diameter: 635_000
            }
        );
    }

    #[test]
    fn ut_apr_002_define_overwrites_and_lookup_returns_latest() {
        let mut table = ApertureTable::new();
        table.define(
            12,
            ApertureShape::Rectangle {
                width: 1,
                height: 2,
            },
        );
        table.define(12, ApertureShape::Circle { diameter: 7 });
        assert_eq!(table.lookup(12), ApertureShape::Circle { diameter: 7 });
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn ut_apr_003_id_zero_ignores_definitions() {
        let mut table = ApertureTable::new();
        table.define(0, ApertureShape::Circle { diameter: 5 });
        assert_eq!(table.lookup(0), ApertureShape::DEFAULT);
    }

    #[test]
    fn ut_apr_004_default_id_can_be_redefined() {
        let mut table = ApertureTable::new();
        table.define(10, ApertureShape::Circle { diameter: 254_000 });
        assert_eq!(table.lookup(10), ApertureShape::Circle { diameter: 254_000 });
    }

    #[test]
    fn ut_apr_005_captured_aperture_is_independent_of_later_redefinition() {
        let mut table = ApertureTable::new();
        table.define(11, ApertureShape::Circle { diameter: 100 });
        let captured = table.capture(11);
        table.define(11, ApertureShape::Circle { diameter: 900 });
        assert_eq!(captured.shape, ApertureShape::Circle { diameter: 100 });
    }

    #[test]
    fn ut_apr_006_stroke_width_and_cap_follow_shape() {
        let rect = ApertureShape::Rectangle {
            width: 300,
            height: 200,
        };
        assert_eq!(rect.stroke_width(), 200);
        assert_eq!(rect.line_cap(), LineCap::Square);

        let oval = ApertureShape::Oval {
            width: 100,
            height: 400,
        };
        assert_eq!(oval.stroke_width(), 100);
        assert_eq!(oval.line_cap(), LineCap::Round);
        assert_eq!(oval.half_extents(), (50, 200));
    }

    #[test]
    fn ut_apr_007_polygon_vertices_start_at_rotation() {
        let hexagon = ApertureShape::RegularPolygon {
            outer_diameter: 2_000_000,
            vertex_count: 6,
            rotation_deg: 0.0,
            hole_diameter: 0,
        };
        let vertices = hexagon.polygon_vertices(Point::new(10, 20));
        assert!(vertices.is_some());
        if let Some(vertices) = vertices {
            assert_eq!(vertices.len(), 6);
            assert_eq!(vertices[0], Point::new(1_000_010, 20));
            assert_eq!(vertices[3], Point::new(-999_990, 20));
        }
        assert!(ApertureShape::DEFAULT.polygon_vertices(Point::ORIGIN).is_none());
    }
}
