//! The photoplotter state machine.
//!
//! [`PlotterState::execute`] consumes one token at a time and returns the
//! draw events it produced. A statement such as `G02X100Y0I50J0D01` is read
//! word by word first; its movement and drawing take effect once the whole
//! statement has been read.

use log::{debug, trace, warn};

use crate::error::MalformedNumber;
use crate::geometry::aperture::{ApertureShape, ApertureTable, DEFAULT_APERTURE_ID};
use crate::geometry::arc::{arc_from_center_and_offsets, polygon_as_line_segments};
use crate::geometry::types::{ArcDirection, ArcParameters, InterpolationMode, Point, Polarity};
use crate::options::ConversionOptions;

use super::format::{
    parse_code, parse_coordinate, parse_decimal, parse_format_statement, parse_real,
    split_number, AxisFormat, CoordinateFormat, CoordinateNotation, Units,
};
use super::tokenizer::Token;
use super::types::{DiagnosticKind, DrawEvent};

/// Exposure state selected by D01/D02/D03.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawMode {
    /// D02: move without drawing.
    Off,
    /// D01: draw while moving.
    On,
    /// D03: flash at the destination.
    Flash,
}

/// Everything the plotter knows while reading one stream.
///
/// One instance per conversion job; [`PlotterState::new`] is the power-on
/// state.
#[derive(Debug)]
pub struct PlotterState {
    position: Point,
    aperture_id: u32,
    draw: DrawMode,
    interpolation: InterpolationMode,
    multi_quadrant: bool,
    units: Units,
    format: CoordinateFormat,
    area_fill: bool,
    contour_vertices: usize,
    center_offset: Point,
    in_block: bool,
    stopped: bool,
    apertures: ApertureTable,
    region_arc_segments: u32,
    diagnostics: Vec<DiagnosticKind>,
}

/// Pending movement of the statement being read.
struct Statement {
    target_x: i64,
    target_y: i64,
    has_coordinates: bool,
    open_region: bool,
    close_region: bool,
}

impl PlotterState {
    /// Power-on state: origin, aperture 10, exposure off, linear,
    /// single-quadrant, with units and format from `options`.
    pub fn new(options: &ConversionOptions) -> Self {
        Self {
            position: Point::ORIGIN,
            aperture_id: DEFAULT_APERTURE_ID,
            draw: DrawMode::Off,
            interpolation: InterpolationMode::Linear,
            multi_quadrant: false,
            units: options.default_units,
            format: options.default_format,
            area_fill: false,
            contour_vertices: 0,
            center_offset: Point::ORIGIN,
            in_block: false,
            stopped: false,
            apertures: ApertureTable::new(),
            region_arc_segments: options.region_arc_segments,
            diagnostics: Vec::new(),
        }
    }

    /// Current pen position.
    pub const fn position(&self) -> Point {
        self.position
    }

    /// Active unit system.
    pub const fn units(&self) -> Units {
        self.units
    }

    /// Active coordinate format.
    pub const fn format(&self) -> CoordinateFormat {
        self.format
    }

    /// Apertures defined so far.
    pub const fn apertures(&self) -> &ApertureTable {
        &self.apertures
    }

    /// `true` once M00/M02 has been read.
    pub const fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// `true` while inside a `%` parameter block.
    pub const fn in_parameter_block(&self) -> bool {
        self.in_block
    }

    /// Diagnostics recorded since the last call.
    pub fn take_diagnostics(&mut self) -> Vec<DiagnosticKind> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Executes one token and returns the events it produced.
    pub fn execute(&mut self, token: &Token) -> Vec<DrawEvent> {
        match token {
            Token::BlockDelimiter => {
                self.in_block = !self.in_block;
                Vec::new()
            }
            Token::Command(_) if self.stopped => Vec::new(),
            Token::Command(command) if self.in_block => self.execute_parameter(command),
            Token::Command(command) => self.execute_statement(command),
        }
    }

    fn execute_parameter(&mut self, command: &str) -> Vec<DrawEvent> {
        if let Some(body) = command.strip_prefix("FS") {
            self.format = parse_format_statement(body, self.format);
            debug!("coordinate format: {:?}", self.format);
        } else if command.starts_with("MOIN") {
            self.set_units(Units::Inches);
        } else if command.starts_with("MOMM") {
            self.set_units(Units::Millimetres);
        } else if let Some(body) = command.strip_prefix("ADD") {
            self.define_aperture(body);
        } else if command.starts_with("LPC") {
            debug!("polarity: clear");
            return vec![DrawEvent::Polarity(Polarity::Clear)];
        } else if command.starts_with("LPD") {
            debug!("polarity: dark");
            return vec![DrawEvent::Polarity(Polarity::Dark)];
        }
        // IF is resolved by the tokenizer; AS, AM and the rest are ignored.
        Vec::new()
    }

    fn set_units(&mut self, units: Units) {
        if self.units != units {
            debug!("units: {units:?}");
        }
        self.units = units;
    }

    fn define_aperture(&mut self, body: &str) {
        let (id_text, definition) = split_number(body);
        let id = match parse_code(id_text) {
            Ok(id) => id,
            Err(err) => {
                self.record_malformed(err);
                return;
            }
        };

        let Some((template, modifiers)) = definition.split_once(',') else {
            // Parameterless standard apertures are not valid; macros are unsupported.
            return;
        };
        let params: Vec<&str> = modifiers.split('X').collect();

        let shape = match template {
            "C" => ApertureShape::Circle {
                diameter: self.length_param(&params, 0),
            },
            "R" => ApertureShape::Rectangle {
                width: self.length_param(&params, 0),
                height: self.length_param(&params, 1),
            },
            "O" => ApertureShape::Oval {
                width: self.length_param(&params, 0),
                height: self.length_param(&params, 1),
            },
            "P" => ApertureShape::RegularPolygon {
                outer_diameter: self.length_param(&params, 0),
                vertex_count: self.count_param(&params, 1),
                rotation_deg: self.real_param(&params, 2),
                hole_diameter: self.length_param(&params, 3),
            },
            _ => {
                trace!("aperture D{id} uses macro `{template}`; ignored");
                return;
            }
        };
        self.apertures.define(id, shape);
    }

    fn length_param(&mut self, params: &[&str], index: usize) -> i64 {
        let Some(raw) = params.get(index) else {
            return 0;
        };
        let units = self.units;
        parse_decimal(raw, units)
            .map(i64::abs)
            .unwrap_or_else(|err| self.zero_for(err))
    }

    fn real_param(&mut self, params: &[&str], index: usize) -> f64 {
        let Some(raw) = params.get(index) else {
            return 0.0;
        };
        parse_real(raw).unwrap_or_else(|err| {
            self.record_malformed(err);
            0.0
        })
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn count_param(&mut self, params: &[&str], index: usize) -> u32 {
        let value = self.real_param(params, index);
        value.round().clamp(0.0, f64::from(u32::MAX)) as u32
    }

    fn execute_statement(&mut self, command: &str) -> Vec<DrawEvent> {
        let mut statement = self.begin_statement();
        self.center_offset = Point::ORIGIN;

        let mut rest = command;
        while let Some(letter) = rest.chars().next() {
            let (number, remainder) =
                split_number(rest.get(letter.len_utf8()..).unwrap_or_default());
            rest = remainder;

            match letter {
                'G' => {
                    let Some(code) = self.code(number) else {
                        continue;
                    };
                    if code == 4 {
                        // Comment: the remainder is free text.
                        break;
                    }
                    self.apply_g_code(code, &mut statement);
                }
                'X' => {
                    statement.target_x = self.coordinate(number, self.format.x);
                    statement.has_coordinates = true;
                }
                'Y' => {
                    statement.target_y = self.coordinate(number, self.format.y);
                    statement.has_coordinates = true;
                }
                'I' => {
                    self.center_offset.x = self.coordinate(number, self.format.x);
                    statement.has_coordinates = true;
                }
                'J' => {
                    self.center_offset.y = self.coordinate(number, self.format.y);
                    statement.has_coordinates = true;
                }
                'D' => {
                    if let Some(code) = self.code(number) {
                        self.apply_d_code(code);
                    }
                }
                'M' => {
                    if let Some(code) = self.code(number) {
                        if code == 0 || code == 2 {
                            debug!("stop code M{code:02}");
                            self.stopped = true;
                        }
                    }
                }
                // N line numbers and anything unrecognised.
                _ => {}
            }
        }

        self.finish_statement(&statement)
    }

    fn begin_statement(&self) -> Statement {
        let (target_x, target_y) = match self.format.notation {
            CoordinateNotation::Absolute => (self.position.x, self.position.y),
            CoordinateNotation::Incremental => (0, 0),
        };
        Statement {
            target_x,
            target_y,
            has_coordinates: false,
            open_region: false,
            close_region: false,
        }
    }

    fn apply_g_code(&mut self, code: u32, statement: &mut Statement) {
        match code {
            1 => self.interpolation = InterpolationMode::Linear,
            2 => self.interpolation = InterpolationMode::ClockwiseArc,
            3 => self.interpolation = InterpolationMode::CounterClockwiseArc,
            36 => statement.open_region = true,
            37 => statement.close_region = true,
            70 => self.set_units(Units::Inches),
            71 => self.set_units(Units::Millimetres),
            74 => self.multi_quadrant = false,
            75 => self.multi_quadrant = true,
            90 => {
                if self.format.notation == CoordinateNotation::Incremental {
                    statement.target_x = self.position.x;
                    statement.target_y = self.position.y;
                }
                self.format.notation = CoordinateNotation::Absolute;
            }
            91 => {
                if self.format.notation == CoordinateNotation::Absolute {
                    statement.target_x = 0;
                    statement.target_y = 0;
                }
                self.format.notation = CoordinateNotation::Incremental;
            }
            // G54/G55 aperture-select prefixes and unknown codes.
            _ => {}
        }
    }

    fn apply_d_code(&mut self, code: u32) {
        match code {
            1 => self.draw = DrawMode::On,
            2 => self.draw = DrawMode::Off,
            3 => self.draw = DrawMode::Flash,
            id if id >= 10 => {
                trace!("aperture D{id} selected");
                self.aperture_id = id;
            }
            _ => {}
        }
    }

    fn finish_statement(&mut self, statement: &Statement) -> Vec<DrawEvent> {
        let mut target = Point::new(statement.target_x, statement.target_y);
        if self.format.notation == CoordinateNotation::Incremental {
            target = target.translated(self.position.x, self.position.y);
        }

        let mut events = Vec::new();
        if statement.open_region {
            // A region opened twice closes the contour it already holds.
            self.close_contour(&mut events);
            self.area_fill = true;
            debug!("area fill on");
        }

        if statement.has_coordinates {
            if self.area_fill {
                self.extend_contour(target, &mut events);
            } else {
                self.draw_to(target, &mut events);
            }
            self.position = target;
            // Circular interpolation is not modal.
            self.interpolation = InterpolationMode::Linear;
        }

        if statement.close_region {
            self.close_contour(&mut events);
            self.area_fill = false;
            debug!("area fill off");
        }

        for event in &events {
            trace!("event: {event:?}");
        }
        events
    }

    fn draw_to(&mut self, target: Point, events: &mut Vec<DrawEvent>) {
        match self.draw {
            DrawMode::Off => {}
            DrawMode::Flash => events.push(DrawEvent::FlashAperture {
                at: target,
                aperture: self.apertures.capture(self.aperture_id),
            }),
            DrawMode::On => {
                let aperture = self.apertures.capture(self.aperture_id);
                match self.arc_direction() {
                    None => events.push(DrawEvent::Line {
                        from: self.position,
                        to: target,
                        aperture,
                    }),
                    Some(direction) => {
                        if let Some(arc) = self.resolve_arc(target, direction) {
                            events.push(DrawEvent::ArcSegment {
                                to: target,
                                via_center_offset: self.center_offset,
                                arc,
                                aperture,
                            });
                        }
                    }
                }
            }
        }
    }

    fn extend_contour(&mut self, target: Point, events: &mut Vec<DrawEvent>) {
        match self.draw {
            // Flashes inside a region are ignored.
            DrawMode::Flash => {}
            DrawMode::Off => self.close_contour(events),
            DrawMode::On => {
                if self.contour_vertices == 0 {
                    self.push_vertex(self.position, events);
                }
                let arc = self
                    .arc_direction()
                    .and_then(|direction| self.resolve_arc(target, direction));
                if let Some(arc) = arc {
                    let points = polygon_as_line_segments(arc, self.region_arc_segments);
                    let inner = points.len().saturating_sub(1);
                    for point in points.into_iter().take(inner).skip(1) {
                        self.push_vertex(point, events);
                    }
                }
                self.push_vertex(target, events);
            }
        }
    }

    fn push_vertex(&mut self, point: Point, events: &mut Vec<DrawEvent>) {
        self.contour_vertices += 1;
        events.push(DrawEvent::PolygonVertex { point });
    }

    fn close_contour(&mut self, events: &mut Vec<DrawEvent>) {
        if self.contour_vertices > 0 {
            events.push(DrawEvent::PolygonClose);
            self.contour_vertices = 0;
        }
    }

    const fn arc_direction(&self) -> Option<ArcDirection> {
        match self.interpolation {
            InterpolationMode::Linear => None,
            InterpolationMode::ClockwiseArc => Some(ArcDirection::Clockwise),
            InterpolationMode::CounterClockwiseArc => Some(ArcDirection::CounterClockwise),
        }
    }

    fn resolve_arc(
        &mut self,
        target: Point,
        direction: ArcDirection,
    ) -> Option<ArcParameters> {
        let (i, j) = self.center_offset.to_f64();
        match arc_from_center_and_offsets(
            self.position,
            target,
            i,
            j,
            self.multi_quadrant,
            direction,
        ) {
            Ok(arc) => Some(arc),
            Err(error) => {
                warn!(
                    "arc from {:?} to {target:?} skipped: {error}",
                    self.position
                );
                self.diagnostics.push(DiagnosticKind::SkippedArc { error });
                None
            }
        }
    }

    fn coordinate(&mut self, raw: &str, axis: AxisFormat) -> i64 {
        parse_coordinate(raw, axis, self.format.zero_omission, self.units)
            .unwrap_or_else(|err| self.zero_for(err))
    }

    fn code(&mut self, raw: &str) -> Option<u32> {
        match parse_code(raw) {
            Ok(code) => Some(code),
            Err(err) => {
                self.record_malformed(err);
                None
            }
        }
    }

    fn zero_for(&mut self, err: MalformedNumber) -> i64 {
        self.record_malformed(err);
        0
    }

    fn record_malformed(&mut self, err: MalformedNumber) {
        warn!("{err}; using 0");
        self.diagnostics.push(DiagnosticKind::MalformedNumber { literal: err.0 });
    }
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::geometry::aperture::Aperture;

    fn plotter() -> PlotterState {
        PlotterState::new(&ConversionOptions::default())
    }

    fn run(state: &mut PlotterState, stream: &[&str]) -> Vec<DrawEvent> {
        stream
            .iter()
            .flat_map(|text| {
                let token = if *text == "%" {
                    Token::BlockDelimiter
                } else {
                    Token::Command((*text).to_string())
                };
                state.execute(&token)
            })
            .collect()
    }

    #[test]
    fn ut_plt_001_parameter_block_sets_format_units_and_aperture() {
        let mut state = plotter();
        let events = run(
            &mut state,
            &["%", "FSLAX34Y34", "%", "%", "MOIN", "%", "%", "ADD11R,0.1X0.05", "%"],
        );
        assert!(events.is_empty());
        assert_eq!(state.units(), Units::Inches);
        assert_eq!(state.format().x.decimal_digits, 4);
        assert_eq!(
            state.apertures().lookup(11),
            ApertureShape::Rectangle {
                width: 2_540_000,
                height: 1_270_000
            }
        );
        assert!(!state.in_parameter_block());
    }

    #[test]
    fn ut_plt_002_d01_move_emits_line_with_captured_aperture() {
        let mut state = plotter();
        let events = run(
            &mut state,
            &["%", "ADD10C,0.5", "%", "X1000Y0D02", "X2000Y500D01"],
        );
        assert_eq!(
            events,
            vec![DrawEvent::Line {
                from: Point::new(1_000_000, 0),
                to: Point::new(2_000_000, 500_000),
                aperture: Aperture {
                    id: 10,
                    shape: ApertureShape::Circle { diameter: 500_000 }
                },
            }]
        );
        assert_eq!(state.position(), Point::new(2_000_000, 500_000));
    }

    #[test]
    fn ut_plt_003_flash_uses_default_aperture_when_undefined() {
        let mut state = plotter();
        let events = run(&mut state, &["D37", "X100Y200D03"]);
        assert_eq!(
            events,
            vec![DrawEvent::FlashAperture {
                at: Point::new(100_000, 200_000),
                aperture: Aperture {
                    id: 37,
                    shape: ApertureShape::DEFAULT
                },
            }]
        );
    }

    #[test]
    fn ut_plt_004_draw_mode_is_modal_but_interpolation_is_not() {
        let mut state = plotter();
        let events = run(
            &mut state,
            &["G75", "X1000Y0D02", "G03X0Y1000I-1000J0D01", "X0Y2000"],
        );
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], DrawEvent::ArcSegment { .. }));
        assert!(
            matches!(events[1], DrawEvent::Line { .. }),
            "plain move after an arc must be linear, got {:?}",
            events[1]
        );
    }

    #[test]
    fn ut_plt_005_arc_mode_set_alone_applies_to_next_move() {
        let mut state = plotter();
        let events = run(
            &mut state,
            &["G75", "X1000Y0D02", "G02", "X0Y-1000I-1000J0D01"],
        );
        assert_eq!(events.len(), 1);
        assert!(
            matches!(
                &events[0],
                DrawEvent::ArcSegment { arc, .. }
                    if arc.center() == Point::ORIGIN && arc.direction() == ArcDirection::Clockwise
            ),
            "expected clockwise arc around the origin, got {:?}",
            events[0]
        );
    }

    #[test]
    fn ut_plt_006_failed_arc_records_diagnostic_and_still_moves() {
        let mut state = plotter();
        let events = run(
            &mut state,
            &["X1000Y0D02", "G02X1000Y0I1000J0D01", "X3000Y0D01"],
        );
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], DrawEvent::Line { from, .. } if from == Point::new(1_000_000, 0)));
        let diagnostics = state.take_diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert!(matches!(diagnostics[0], DiagnosticKind::SkippedArc { .. }));
    }

    #[test]
    fn ut_plt_007_incremental_coordinates_accumulate() {
        let mut state = plotter();
        let events = run(&mut state, &["G91", "X1000Y1000D02", "X1000D01"]);
        assert_eq!(
            events,
            vec![DrawEvent::Line {
                from: Point::new(1_000_000, 1_000_000),
                to: Point::new(2_000_000, 1_000_000),
                aperture: Aperture {
                    id: 10,
                    shape: ApertureShape::DEFAULT
                },
            }]
        );
    }

    #[test]
    fn ut_plt_008_region_emits_vertices_and_close() {
        let mut state = plotter();
        let events = run(
            &mut state,
            &["G36", "X0Y0D02", "X2000Y0D01", "X2000Y1000D01", "X0Y1000D01", "X0Y0D01", "G37"],
        );
        let vertices = events
            .iter()
            .filter(|event| matches!(event, DrawEvent::PolygonVertex { .. }))
            .count();
        assert_eq!(vertices, 5);
        assert_eq!(events.last(), Some(&DrawEvent::PolygonClose));
        assert_eq!(events[0], DrawEvent::PolygonVertex { point: Point::ORIGIN });
    }

    #[test]
    fn ut_plt_009_d02_inside_region_starts_new_contour() {
        let mut state = plotter();
        let events = run(
            &mut state,
            &[
                "G36", "X0Y0D02", "X1D01", "Y1D01", "X0Y5D02", "X1D01", "Y6D01", "G37",
            ],
        );
        let closes = events
            .iter()
            .filter(|event| **event == DrawEvent::PolygonClose)
            .count();
        assert_eq!(closes, 2);
    }

    #[test]
    fn ut_plt_010_arc_inside_region_is_tessellated() {
        let mut state = plotter();
        let events = run(
            &mut state,
            &["G36", "G75", "X1000Y0D02", "G03X-1000Y0I-1000J0D01", "G37"],
        );
        // Start vertex, 14 inner points, end vertex, close.
        assert_eq!(events.len(), 17);
        assert_eq!(
            events[15],
            DrawEvent::PolygonVertex {
                point: Point::new(-1_000_000, 0)
            }
        );
    }

    #[test]
    fn ut_plt_011_stop_code_ignores_rest_of_stream() {
        let mut state = plotter();
        let events = run(&mut state, &["M02", "X1Y1D03"]);
        assert!(events.is_empty());
        assert!(state.is_stopped());
    }

    #[test]
    fn ut_plt_012_malformed_coordinate_reads_as_zero() {
        let mut state = plotter();
        let events = run(&mut state, &["X5Y5D02", "X1-2Y3D01"]);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], DrawEvent::Line { to, .. } if to == Point::new(0, 3_000)));
        assert_eq!(
            state.take_diagnostics(),
            vec![DiagnosticKind::MalformedNumber {
                literal: "1-2".to_string()
            }]
        );
    }

    #[test]
    fn ut_plt_013_comment_and_unknown_words_are_ignored() {
        let mut state = plotter();
        let events = run(&mut state, &["G04Title:X1Y1D03", "N10G54D11", "Z99", "X1Y1D03"]);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], DrawEvent::FlashAperture { aperture, .. } if aperture.id == 11));
        assert!(state.take_diagnostics().is_empty());
    }

    #[test]
    fn ut_plt_014_polarity_directives_emit_events() {
        let mut state = plotter();
        let events = run(&mut state, &["%", "LPC", "%", "%", "LPD", "%"]);
        assert_eq!(
            events,
            vec![
                DrawEvent::Polarity(Polarity::Clear),
                DrawEvent::Polarity(Polarity::Dark)
            ]
        );
    }

    #[test]
    fn ut_plt_015_polygon_aperture_definition() {
        let mut state = plotter();
        run(&mut state, &["%", "ADD15P,1.0X6X30.0", "%"]);
        assert_eq!(
            state.apertures().lookup(15),
            ApertureShape::RegularPolygon {
                outer_diameter: 1_000_000,
                vertex_count: 6,
                rotation_deg: 30.0,
                hole_diameter: 0,
            }
        );
    }

    #[test]
    fn ut_plt_016_g70_switches_units_inline() {
        let mut state = plotter();
        let events = run(&mut state, &["G70", "X1000Y0D03"]);
        assert!(matches!(events[0], DrawEvent::FlashAperture { at, .. } if at == Point::new(25_400_000, 0)));
    }

    #[test]
    fn ut_plt_017_non_ascii_character_skips_only_itself() {
        let mut state = plotter();
        let events = run(&mut state, &["\u{c4}X1000\u{b0}Y2000D03"]);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], DrawEvent::FlashAperture { at, .. } if at == Point::new(1_000_000, 2_000_000)));
        assert!(state.take_diagnostics().is_empty());
    }

    #[test]
    fn ut_plt_018_second_region_open_closes_pending_contour() {
        let mut state = plotter();
        let events = run(
            &mut state,
            &[
                "G36", "X0Y0D02", "X1000Y0D01", "X1000Y1000D01",
                "G36", "X5000Y5000D02", "X6000Y5000D01", "X6000Y6000D01", "G37",
            ],
        );
        let closes: Vec<usize> = events
            .iter()
            .enumerate()
            .filter(|(_, event)| **event == DrawEvent::PolygonClose)
            .map(|(index, _)| index)
            .collect();
        assert_eq!(closes, vec![3, 7]);
        assert_eq!(
            events[4],
            DrawEvent::PolygonVertex {
                point: Point::new(5_000_000, 5_000_000)
            }
        );
    }
}
