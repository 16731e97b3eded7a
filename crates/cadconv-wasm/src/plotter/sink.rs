//! Turns draw events into output primitives.

use log::{debug, trace, warn};

use crate::geometry::aperture::ApertureShape;
use crate::geometry::polarity::{ClearRange, PolarityTracker};
use crate::geometry::region::{classify_ring, RingClass};
use crate::geometry::types::{BoundingBox, Point};

use super::types::{DiagnosticKind, DrawEvent, Primitive};

/// Accumulates primitives, the open fill contour and polarity ranges.
#[derive(Debug)]
pub struct DrawEventSink {
    strict_polygons: bool,
    primitives: Vec<Primitive>,
    contour: Vec<Point>,
    polarity: PolarityTracker,
}

/// Everything the sink produced for one job.
#[derive(Debug, Clone, PartialEq)]
pub struct SinkOutput {
    /// Primitives in emission order.
    pub primitives: Vec<Primitive>,
    /// Extents of all primitives.
    pub bounds: BoundingBox,
    /// Primitive ranges drawn with clear polarity.
    pub clear_ranges: Vec<ClearRange>,
    /// Problem with a fill contour still open at end of stream.
    pub unclosed_contour: Option<DiagnosticKind>,
}

impl DrawEventSink {
    /// Creates an empty sink. With `strict_polygons` set, four-corner fill
    /// regions stay polygon pours.
    pub const fn new(strict_polygons: bool) -> Self {
        Self {
            strict_polygons,
            primitives: Vec::new(),
            contour: Vec::new(),
            polarity: PolarityTracker::new(),
        }
    }

    /// Primitives emitted so far.
    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    /// Consumes one event. Returns a diagnostic when a fill contour had to
    /// be dropped.
    pub fn accept(&mut self, event: DrawEvent) -> Option<DiagnosticKind> {
        match event {
            DrawEvent::Line { from, to, aperture } => {
                self.push(Primitive::TraceLine {
                    from,
                    to,
                    width: aperture.shape.stroke_width(),
                    cap: aperture.shape.line_cap(),
                });
            }
            DrawEvent::FlashAperture { at, aperture } => {
                self.push(Primitive::Pad {
                    center: at,
                    shape: aperture.shape,
                });
            }
            DrawEvent::ArcSegment { arc, aperture, .. } => {
                self.push(Primitive::Arc {
                    arc,
                    thickness: aperture.shape.stroke_width(),
                });
            }
            DrawEvent::PolygonVertex { point } => self.contour.push(point),
            DrawEvent::PolygonClose => return self.close_contour(),
            DrawEvent::Polarity(polarity) => {
                self.polarity.set_polarity(polarity, self.primitives.len());
            }
        }
        None
    }

    /// Closes any open contour, applies the optional mirror and centring
    /// post-passes, and returns the output.
    pub fn finish(mut self, centre: bool, mirror_y_axis: bool) -> SinkOutput {
        let unclosed_contour = if self.contour.is_empty() {
            None
        } else {
            debug!("closing fill contour left open at end of stream");
            self.close_contour()
        };

        let mut primitives = self.primitives;
        if mirror_y_axis {
            primitives = primitives
                .into_iter()
                .map(Primitive::mirrored_y_axis)
                .collect();
        }

        let mut bounds = bounds_of(&primitives);
        if centre && !bounds.is_empty() {
            let offset = bounds.center();
            debug!("centring output: shifting by ({}, {})", -offset.x, -offset.y);
            primitives = primitives
                .into_iter()
                .map(|primitive| primitive.translated(-offset.x, -offset.y))
                .collect();
            bounds = bounds_of(&primitives);
        }

        let clear_ranges = self.polarity.finish(primitives.len());
        SinkOutput {
            primitives,
            bounds,
            clear_ranges,
            unclosed_contour,
        }
    }

    fn close_contour(&mut self) -> Option<DiagnosticKind> {
        let vertices = std::mem::take(&mut self.contour);
        match classify_ring(vertices, self.strict_polygons) {
            RingClass::RectanglePad {
                center,
                width,
                height,
            } => {
                self.push(Primitive::Pad {
                    center,
                    shape: ApertureShape::Rectangle { width, height },
                });
                None
            }
            RingClass::Pour(vertices) => {
                self.push(Primitive::PolygonPour { vertices });
                None
            }
            RingClass::Degenerate { vertices } => {
                warn!("fill contour with {vertices} distinct vertices dropped");
                Some(DiagnosticKind::DegeneratePolygon { vertices })
            }
        }
    }

    fn push(&mut self, primitive: Primitive) {
        trace!("primitive {}: {primitive:?}", self.primitives.len());
        self.primitives.push(primitive);
    }
}

fn bounds_of(primitives: &[Primitive]) -> BoundingBox {
    let mut bounds = BoundingBox::new();
    for primitive in primitives {
        bounds.merge(&primitive.bounds());
    }
    bounds
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::geometry::aperture::{Aperture, LineCap};
    use crate::geometry::types::{ArcParameters, Polarity};

    const ROUND_10: Aperture = Aperture {
        id: 10,
        shape: ApertureShape::Circle { diameter: 100 },
    };

    fn rectangle_events() -> Vec<DrawEvent> {
        [
            Point::new(0, 0),
            Point::new(2_000_000, 0),
            Point::new(2_000_000, 1_000_000),
            Point::new(0, 1_000_000),
            Point::new(0, 0),
        ]
        .into_iter()
        .map(|point| DrawEvent::PolygonVertex { point })
        .chain(std::iter::once(DrawEvent::PolygonClose))
        .collect()
    }

    #[test]
    fn ut_snk_001_line_flash_and_arc_map_one_to_one() {
        let mut sink = DrawEventSink::new(false);
        let arc = ArcParameters::new(Point::ORIGIN, 1_000.0, 0.0, 90.0);
        assert!(arc.is_ok());
        let Ok(arc) = arc else {
            return;
        };

        sink.accept(DrawEvent::Line {
            from: Point::new(0, 0),
            to: Point::new(1_000, 0),
            aperture: ROUND_10,
        });
        sink.accept(DrawEvent::FlashAperture {
            at: Point::new(5, 5),
            aperture: ROUND_10,
        });
        sink.accept(DrawEvent::ArcSegment {
            to: Point::new(0, 1_000),
            via_center_offset: Point::new(-1_000, 0),
            arc,
            aperture: ROUND_10,
        });

        let output = sink.finish(false, false);
        assert_eq!(output.primitives.len(), 3);
        assert_eq!(
            output.primitives[0],
            Primitive::TraceLine {
                from: Point::new(0, 0),
                to: Point::new(1_000, 0),
                width: 100,
                cap: LineCap::Round,
            }
        );
        assert!(matches!(output.primitives[1], Primitive::Pad { center, .. } if center == Point::new(5, 5)));
        assert!(matches!(output.primitives[2], Primitive::Arc { thickness: 100, .. }));
        assert_eq!(output.bounds.min_x, -50);
        assert_eq!(output.bounds.max_y, 1_050);
    }

    #[test]
    fn ut_snk_002_rectangular_region_becomes_pad() {
        let mut sink = DrawEventSink::new(false);
        for event in rectangle_events() {
            assert!(sink.accept(event).is_none());
        }
        let output = sink.finish(false, false);
        assert_eq!(
            output.primitives,
            vec![Primitive::Pad {
                center: Point::new(1_000_000, 500_000),
                shape: ApertureShape::Rectangle {
                    width: 2_000_000,
                    height: 1_000_000
                },
            }]
        );
    }

    #[test]
    fn ut_snk_003_strict_sink_keeps_pour() {
        let mut sink = DrawEventSink::new(true);
        for event in rectangle_events() {
            sink.accept(event);
        }
        let output = sink.finish(false, false);
        assert!(matches!(&output.primitives[0], Primitive::PolygonPour { vertices } if vertices.len() == 4));
    }

    #[test]
    fn ut_snk_004_degenerate_contour_yields_diagnostic() {
        let mut sink = DrawEventSink::new(false);
        sink.accept(DrawEvent::PolygonVertex {
            point: Point::new(1, 1),
        });
        sink.accept(DrawEvent::PolygonVertex {
            point: Point::new(2, 2),
        });
        assert_eq!(
            sink.accept(DrawEvent::PolygonClose),
            Some(DiagnosticKind::DegeneratePolygon { vertices: 2 })
        );
        assert!(sink.primitives().is_empty());
    }

    #[test]
    fn ut_snk_005_open_contour_is_closed_at_finish() {
        let mut sink = DrawEventSink::new(false);
        for event in rectangle_events().into_iter().take(4) {
            sink.accept(event);
        }
        let output = sink.finish(false, false);
        assert_eq!(output.primitives.len(), 1);
        assert!(output.unclosed_contour.is_none());
    }

    #[test]
    fn ut_snk_006_centre_and_mirror_post_passes() {
        let mut sink = DrawEventSink::new(false);
        sink.accept(DrawEvent::FlashAperture {
            at: Point::new(1_000, 0),
            aperture: ROUND_10,
        });
        sink.accept(DrawEvent::FlashAperture {
            at: Point::new(3_000, 2_000),
            aperture: ROUND_10,
        });
        let output = sink.finish(true, true);
        // Mirrored to x = -1000 and -3000, then centred on the origin.
        assert!(matches!(output.primitives[0], Primitive::Pad { center, .. } if center == Point::new(1_000, -1_000)));
        assert!(matches!(output.primitives[1], Primitive::Pad { center, .. } if center == Point::new(-1_000, 1_000)));
        assert_eq!(output.bounds.center(), Point::ORIGIN);
    }

    #[test]
    fn ut_snk_007_clear_polarity_ranges_cover_primitives() {
        let mut sink = DrawEventSink::new(false);
        let flash = DrawEvent::FlashAperture {
            at: Point::ORIGIN,
            aperture: ROUND_10,
        };
        sink.accept(flash.clone());
        sink.accept(DrawEvent::Polarity(Polarity::Clear));
        sink.accept(flash.clone());
        sink.accept(flash.clone());
        sink.accept(DrawEvent::Polarity(Polarity::Dark));
        sink.accept(flash);
        let output = sink.finish(false, false);
        assert_eq!(output.clear_ranges, vec![ClearRange { start: 1, end: 3 }]);
    }
}
