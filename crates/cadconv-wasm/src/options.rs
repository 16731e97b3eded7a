//! Per-job conversion settings.

use log::warn;
use serde::Deserialize;

use crate::geometry::arc::DEFAULT_ARC_SEGMENTS;
use crate::plotter::format::{CoordinateFormat, Units};

const DEFAULT_MAX_INCLUDE_DEPTH: u32 = 8;
/// Upper bound for [`ConversionOptions::region_arc_segments`].
pub const MAX_REGION_ARC_SEGMENTS: u32 = 1_024;
/// Upper bound for [`ConversionOptions::max_include_depth`].
pub const MAX_INCLUDE_DEPTH_LIMIT: u32 = 64;

/// Settings for one conversion job.
///
/// Deserializes from a partial object; missing fields take their defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConversionOptions {
    /// Keep four-corner fill regions as polygon pours instead of rectangle pads.
    pub strict_polygons: bool,
    /// Segments per arc when an arc is part of a fill region outline.
    pub region_arc_segments: u32,
    /// Maximum nesting of `IF` include directives.
    pub max_include_depth: u32,
    /// Translate the output so its bounding box is centred on the origin.
    pub centre: bool,
    /// Mirror the output about the Y axis.
    pub mirror_y_axis: bool,
    /// Units assumed until the stream declares its own.
    pub default_units: Units,
    /// Coordinate format assumed until the stream declares its own.
    pub default_format: CoordinateFormat,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            strict_polygons: false,
            region_arc_segments: DEFAULT_ARC_SEGMENTS,
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
            centre: false,
            mirror_y_axis: false,
            default_units: Units::Millimetres,
            default_format: CoordinateFormat::default(),
        }
    }
}

impl ConversionOptions {
    /// The options with tessellation count and include depth capped, so
    /// caller-supplied values cannot exhaust memory or stack.
    #[must_use]
    pub fn clamped(self) -> Self {
        let region_arc_segments = self.region_arc_segments.min(MAX_REGION_ARC_SEGMENTS);
        let max_include_depth = self.max_include_depth.min(MAX_INCLUDE_DEPTH_LIMIT);
        if region_arc_segments != self.region_arc_segments
            || max_include_depth != self.max_include_depth
        {
            warn!(
                "options clamped: region_arc_segments {} -> {region_arc_segments}, \
                 max_include_depth {} -> {max_include_depth}",
                self.region_arc_segments, self.max_include_depth
            );
        }
        Self {
            region_arc_segments,
            max_include_depth,
            ..self
        }
    }
}
