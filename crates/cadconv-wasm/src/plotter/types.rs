//! Draw events, output primitives and diagnostics.

use std::fmt;

use serde::Serialize;

use crate::error::GeometryError;
use crate::geometry::aperture::{Aperture, ApertureShape, LineCap};
use crate::geometry::polarity::ClearRange;
use crate::geometry::types::{ArcParameters, BoundingBox, Point, Polarity};

/// One drawing operation resolved by the plotter.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawEvent {
    /// Straight stroke.
    Line {
        /// Start point.
        from: Point,
        /// End point.
        to: Point,
        /// Aperture at emission time.
        aperture: Aperture,
    },
    /// Aperture flash.
    FlashAperture {
        /// Flash position.
        at: Point,
        /// Aperture at emission time.
        aperture: Aperture,
    },
    /// Circular stroke whose centre has already been resolved.
    ArcSegment {
        /// End point as commanded.
        to: Point,
        /// Centre relative to the start point, as commanded by I/J.
        via_center_offset: Point,
        /// Resolved arc.
        arc: ArcParameters,
        /// Aperture at emission time.
        aperture: Aperture,
    },
    /// Vertex of the open fill contour.
    PolygonVertex {
        /// Vertex position.
        point: Point,
    },
    /// Closes the open fill contour.
    PolygonClose,
    /// Layer polarity change.
    Polarity(Polarity),
}

/// Output geometry handed to an emitter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Primitive {
    /// Flashed aperture, or a rectangular fill region.
    Pad {
        /// Pad centre.
        center: Point,
        /// Pad outline.
        shape: ApertureShape,
    },
    /// Straight stroke.
    TraceLine {
        /// Start point.
        from: Point,
        /// End point.
        to: Point,
        /// Stroke width.
        width: i64,
        /// End cap style.
        cap: LineCap,
    },
    /// Circular stroke.
    Arc {
        /// Arc geometry.
        arc: ArcParameters,
        /// Stroke width.
        thickness: i64,
    },
    /// Filled polygon.
    PolygonPour {
        /// Ring vertices, not repeated at the end.
        vertices: Vec<Point>,
    },
}

impl Primitive {
    /// Extents of the primitive including stroke width.
    pub fn bounds(&self) -> BoundingBox {
        let mut bounds = BoundingBox::new();
        match self {
            Self::Pad { center, shape } => {
                if let Some(vertices) = shape.polygon_vertices(*center) {
                    for vertex in vertices {
                        bounds.update(vertex.x, vertex.y);
                    }
                } else {
                    let (dx, dy) = shape.half_extents();
                    bounds.update(center.x.saturating_sub(dx), center.y.saturating_sub(dy));
                    bounds.update(center.x.saturating_add(dx), center.y.saturating_add(dy));
                }
            }
            Self::TraceLine {
                from, to, width, ..
            } => {
                bounds.update_with_margin(*from, width / 2);
                bounds.update_with_margin(*to, width / 2);
            }
            Self::Arc { arc, thickness } => bounds = arc.bounding_box(thickness / 2),
            Self::PolygonPour { vertices } => {
                for vertex in vertices {
                    bounds.update(vertex.x, vertex.y);
                }
            }
        }
        bounds
    }

    /// The primitive shifted by `(dx, dy)`.
    #[must_use]
    pub fn translated(self, dx: i64, dy: i64) -> Self {
        match self {
            Self::Pad { center, shape } => Self::Pad {
                center: center.translated(dx, dy),
                shape,
            },
            Self::TraceLine {
                from,
                to,
                width,
                cap,
            } => Self::TraceLine {
                from: from.translated(dx, dy),
                to: to.translated(dx, dy),
                width,
                cap,
            },
            Self::Arc { arc, thickness } => Self::Arc {
                arc: arc.translated(dx, dy),
                thickness,
            },
            Self::PolygonPour { vertices } => Self::PolygonPour {
                vertices: vertices
                    .into_iter()
                    .map(|vertex| vertex.translated(dx, dy))
                    .collect(),
            },
        }
    }

    /// The primitive mirrored about the Y axis.
    #[must_use]
    pub fn mirrored_y_axis(self) -> Self {
        match self {
            Self::Pad { center, shape } => Self::Pad {
                center: center.mirrored_y_axis(),
                shape: shape.mirrored_y_axis(),
            },
            Self::TraceLine {
                from,
                to,
                width,
                cap,
            } => Self::TraceLine {
                from: from.mirrored_y_axis(),
                to: to.mirrored_y_axis(),
                width,
                cap,
            },
            Self::Arc { arc, thickness } => Self::Arc {
                arc: arc.mirrored_y_axis(),
                thickness,
            },
            Self::PolygonPour { vertices } => Self::PolygonPour {
                vertices: vertices.into_iter().map(Point::mirrored_y_axis).collect(),
            },
        }
    }
}

/// What went wrong with a command that was skipped or repaired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// An arc could not be resolved; the pen still moved.
    SkippedArc {
        /// Kernel failure.
        #[serde(serialize_with = "serialize_display")]
        error: GeometryError,
    },
    /// A numeric literal was read as zero.
    MalformedNumber {
        /// The literal as written.
        literal: String,
    },
    /// An include directive inserted nothing.
    IncludeFailed {
        /// Requested include name.
        name: String,
        /// Why nothing was inserted.
        reason: String,
    },
    /// A fill contour had fewer than three distinct vertices.
    DegeneratePolygon {
        /// Distinct vertex count.
        vertices: usize,
    },
}

fn serialize_display<S: serde::Serializer>(
    value: &GeometryError,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

/// A recoverable problem tied to one command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Zero-based index of the command in the token stream.
    pub command_index: usize,
    /// The command text.
    pub command: String,
    /// Problem details.
    pub kind: DiagnosticKind,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "command {} `{}`: ", self.command_index, self.command)?;
        match &self.kind {
            DiagnosticKind::SkippedArc { error } => write!(f, "arc skipped: {error}"),
            DiagnosticKind::MalformedNumber { literal } => {
                write!(f, "malformed number `{literal}` read as 0")
            }
            DiagnosticKind::IncludeFailed { name, reason } => {
                write!(f, "include `{name}` failed: {reason}")
            }
            DiagnosticKind::DegeneratePolygon { vertices } => {
                write!(f, "fill region with {vertices} distinct vertices dropped")
            }
        }
    }
}

/// Result of one conversion job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conversion {
    /// Output primitives in emission order.
    pub primitives: Vec<Primitive>,
    /// Recoverable problems, in command order.
    pub diagnostics: Vec<Diagnostic>,
    /// Extents of all primitives, empty when there are none.
    pub bounds: BoundingBox,
    /// Primitive ranges drawn with clear polarity.
    pub clear_ranges: Vec<ClearRange>,
    /// Number of commands processed.
    pub command_count: usize,
}

impl Conversion {
    /// Number of diagnostics of any kind.
    pub fn diagnostic_count(&self) -> usize {
        self.diagnostics.len()
    }

    /// Number of numeric literals that were read as zero.
    pub fn malformed_number_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|diagnostic| matches!(diagnostic.kind, DiagnosticKind::MalformedNumber { .. }))
            .count()
    }
}
