//! Classification of closed area-fill contours (G36/G37).
//!
//! Many CAM generators write rectangular copper as a four-point filled
//! region instead of a flashed aperture. Such rings are reported as
//! rectangle pads unless strict classification is requested.

use super::types::{BoundingBox, Point};

/// What a closed contour turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RingClass {
    /// Axis-aligned four-corner ring.
    RectanglePad {
        /// Centre of the extents.
        center: Point,
        /// Size along X.
        width: i64,
        /// Size along Y.
        height: i64,
    },
    /// Any other ring, closing vertex removed.
    Pour(Vec<Point>),
    /// Fewer than three distinct vertices.
    Degenerate {
        /// Vertex count after removing repeats.
        vertices: usize,
    },
}

/// Classify the vertices of a closed contour.
///
/// Consecutive repeated vertices and a closing vertex equal to the first are
/// removed first. With `strict` set the rectangle heuristic is skipped and
/// every valid ring becomes a pour.
pub fn classify_ring(mut vertices: Vec<Point>, strict: bool) -> RingClass {
    vertices.dedup();
    if vertices.len() > 1 && vertices.first() == vertices.last() {
        vertices.pop();
    }

    if vertices.len() < 3 {
        return RingClass::Degenerate {
            vertices: vertices.len(),
        };
    }

    if !strict {
        if let Some(pad) = rectangle_pad(&vertices) {
            return pad;
        }
    }

    RingClass::Pour(vertices)
}

fn rectangle_pad(vertices: &[Point]) -> Option<RingClass> {
    if vertices.len() != 4 {
        return None;
    }

    let closing = vertices.first().copied()?;
    let edges_axis_aligned = vertices
        .iter()
        .zip(vertices.iter().skip(1).chain(std::iter::once(&closing)))
        .all(|(a, b)| a.x == b.x || a.y == b.y);
    if !edges_axis_aligned {
        return None;
    }

    let mut bounds = BoundingBox::new();
    for vertex in vertices {
        bounds.update(vertex.x, vertex.y);
    }
    if bounds.width() == 0 || bounds.height() == 0 {
        return None;
    }

    let corners = [
        Point::new(bounds.min_x, bounds.min_y),
        Point::new(bounds.max_x, bounds.min_y),
        Point::new(bounds.max_x, bounds.max_y),
        Point::new(bounds.min_x, bounds.max_y),
    ];
    if !corners.iter().all(|corner| vertices.contains(corner)) {
        return None;
    }

    Some(RingClass::RectanglePad {
        center: bounds.center(),
        width: bounds.width(),
        height: bounds.height(),
    })
}
