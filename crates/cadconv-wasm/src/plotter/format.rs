//! Fixed-point coordinate format and number conversion.
//!
//! Coordinates arrive as digit strings whose decimal point is implied by the
//! `FS` directive. Conversion to nanometres is done in integer arithmetic and
//! rounded once.

use serde::{Deserialize, Serialize};

use crate::error::MalformedNumber;
use crate::geometry::types::{NM_PER_INCH, NM_PER_MM};

const DEFAULT_INTEGER_DIGITS: u8 = 2;
const DEFAULT_DECIMAL_DIGITS: u8 = 3;
const MAX_SIGNIFICANT_DIGITS: usize = 24;

/// Unit system of the command stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Units {
    /// Millimetres (`%MOMM*%`, `G71`).
    #[default]
    Millimetres,
    /// Inches (`%MOIN*%`, `G70`).
    Inches,
}

impl Units {
    /// Nanometres per unit.
    pub const fn nm_per_unit(self) -> i64 {
        match self {
            Self::Millimetres => NM_PER_MM,
            Self::Inches => NM_PER_INCH,
        }
    }
}

/// Which zeros the generator left out of coordinate literals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroOmission {
    /// Leading zeros omitted (`FSL`); the literal is right-aligned.
    #[default]
    Leading,
    /// Trailing zeros omitted (`FST`); the literal is left-aligned.
    Trailing,
}

/// Absolute or incremental coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateNotation {
    /// Coordinates are positions (`FS.A`, `G90`).
    #[default]
    Absolute,
    /// Coordinates are deltas from the current position (`FS.I`, `G91`).
    Incremental,
}

/// Digit layout of one axis: `integer_digits.decimal_digits`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisFormat {
    /// Digits before the implied decimal point.
    pub integer_digits: u8,
    /// Digits after the implied decimal point.
    pub decimal_digits: u8,
}

impl AxisFormat {
    /// Total digit count of a fully written literal.
    pub const fn total_digits(self) -> usize {
        self.integer_digits as usize + self.decimal_digits as usize
    }
}

impl Default for AxisFormat {
    fn default() -> Self {
        Self {
            integer_digits: DEFAULT_INTEGER_DIGITS,
            decimal_digits: DEFAULT_DECIMAL_DIGITS,
        }
    }
}

/// The coordinate format established by `%FS...*%`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinateFormat {
    /// X axis layout (also used for I).
    pub x: AxisFormat,
    /// Y axis layout (also used for J).
    pub y: AxisFormat,
    /// Zero omission rule.
    pub zero_omission: ZeroOmission,
    /// Absolute or incremental notation.
    pub notation: CoordinateNotation,
}

/// Parse the body of a format statement (text after `FS`), e.g. `LAX34Y34`.
///
/// Fields that are missing keep the values from `base`. Unknown letters
/// (`N`, `G`, `D`, `M` digit counts) are skipped.
pub fn parse_format_statement(body: &str, base: CoordinateFormat) -> CoordinateFormat {
    let mut format = base;
    let mut rest = body;

    if let Some(first) = rest.chars().next() {
        format.zero_omission = if first == 'T' {
            ZeroOmission::Trailing
        } else {
            ZeroOmission::Leading
        };
        rest = rest.get(first.len_utf8()..).unwrap_or_default();
    }
    if let Some(second) = rest.chars().next() {
        format.notation = if second == 'I' {
            CoordinateNotation::Incremental
        } else {
            CoordinateNotation::Absolute
        };
        rest = rest.get(second.len_utf8()..).unwrap_or_default();
    }

    while let Some(letter) = rest.chars().next() {
        let digits = rest.get(letter.len_utf8()..).unwrap_or_default();
        let (value, remainder) = split_number(digits);
        match (letter, axis_from_digits(value)) {
            ('X', Some(axis)) => format.x = axis,
            ('Y', Some(axis)) => format.y = axis,
            _ => {}
        }
        rest = remainder;
    }

    format
}

fn axis_from_digits(value: &str) -> Option<AxisFormat> {
    let mut chars = value.chars();
    let integer_digits = chars.next()?.to_digit(10)?;
    let decimal_digits = chars.next()?.to_digit(10)?;
    Some(AxisFormat {
        integer_digits: u8::try_from(integer_digits).ok()?,
        decimal_digits: u8::try_from(decimal_digits).ok()?,
    })
}

/// Convert a coordinate literal to nanometres.
///
/// Literals with an explicit decimal point are read as-is. Otherwise the
/// implied decimal point of `axis` is applied, padding with zeros on the
/// side selected by `omission`.
///
/// # Errors
///
/// Returns [`MalformedNumber`] for empty literals, non-digit characters and
/// values outside the nanometre range.
pub fn parse_coordinate(
    raw: &str,
    axis: AxisFormat,
    omission: ZeroOmission,
    units: Units,
) -> Result<i64, MalformedNumber> {
    if raw.contains('.') {
        return parse_decimal(raw, units);
    }

    let (negative, digits) = split_sign(raw);
    if digits.is_empty() || !digits.chars().all(|ch| ch.is_ascii_digit()) {
        return Err(MalformedNumber(raw.to_string()));
    }

    let total_digits = axis.total_digits();
    let expanded = match omission {
        ZeroOmission::Leading => digits.to_string(),
        ZeroOmission::Trailing if digits.len() < total_digits => {
            format!("{digits:0<total_digits$}")
        }
        ZeroOmission::Trailing => digits.to_string(),
    };

    scale_to_nm(negative, &expanded, u32::from(axis.decimal_digits), units)
        .ok_or_else(|| MalformedNumber(raw.to_string()))
}

/// Convert a literal with an optional explicit decimal point (aperture
/// dimensions, decimal coordinates) to nanometres.
///
/// # Errors
///
/// Returns [`MalformedNumber`] when the literal is not a plain decimal number.
pub fn parse_decimal(raw: &str, units: Units) -> Result<i64, MalformedNumber> {
    let (negative, body) = split_sign(raw);
    let (int_part, frac_part) = body.split_once('.').unwrap_or((body, ""));
    let all_digits = int_part
        .chars()
        .chain(frac_part.chars())
        .all(|ch| ch.is_ascii_digit());
    if !all_digits || (int_part.is_empty() && frac_part.is_empty()) {
        return Err(MalformedNumber(raw.to_string()));
    }

    let decimals =
        u32::try_from(frac_part.len()).map_err(|_| MalformedNumber(raw.to_string()))?;
    let joined = format!("{int_part}{frac_part}");
    scale_to_nm(negative, &joined, decimals, units).ok_or_else(|| MalformedNumber(raw.to_string()))
}

/// Parse a plain real number (angles, counts) leniently.
///
/// # Errors
///
/// Returns [`MalformedNumber`] when `raw` is not a finite real number.
pub fn parse_real(raw: &str) -> Result<f64, MalformedNumber> {
    raw.parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| MalformedNumber(raw.to_string()))
}

/// Parse an unsigned integer code (D, G, M numbers, aperture ids).
///
/// # Errors
///
/// Returns [`MalformedNumber`] when `raw` is not an unsigned integer.
pub fn parse_code(raw: &str) -> Result<u32, MalformedNumber> {
    raw.parse::<u32>()
        .map_err(|_| MalformedNumber(raw.to_string()))
}

/// Split `text` into its leading numeric run (digits, sign, point) and the rest.
pub fn split_number(text: &str) -> (&str, &str) {
    let end = text
        .find(|ch: char| !(ch.is_ascii_digit() || ch == '-' || ch == '+' || ch == '.'))
        .unwrap_or(text.len());
    text.split_at(end)
}

fn split_sign(raw: &str) -> (bool, &str) {
    match (raw.strip_prefix('-'), raw.strip_prefix('+')) {
        (Some(rest), _) => (true, rest),
        (None, Some(rest)) => (false, rest),
        (None, None) => (false, raw),
    }
}

/// `digits / 10^decimals` units, in nanometres, rounded half away from zero.
fn scale_to_nm(negative: bool, digits: &str, decimals: u32, units: Units) -> Option<i64> {
    let significant = digits.trim_start_matches('0');
    if significant.len() > MAX_SIGNIFICANT_DIGITS {
        return None;
    }

    let magnitude: i128 = if significant.is_empty() {
        0
    } else {
        significant.parse().ok()?
    };
    let numerator = magnitude.checked_mul(i128::from(units.nm_per_unit()))?;
    let denominator = 10_i128.checked_pow(decimals)?;
    let rounded = numerator.checked_add(denominator / 2)? / denominator;
    let signed = if negative { -rounded } else { rounded };
    i64::try_from(signed).ok()
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    const FORMAT_34: AxisFormat = AxisFormat {
        integer_digits: 3,
        decimal_digits: 4,
    };

    #[test]
    fn ut_fmt_001_format_statement_reads_omission_notation_and_digits() {
        let format = parse_format_statement("TIX25Y36", CoordinateFormat::default());
        assert_eq!(format.zero_omission, ZeroOmission::Trailing);
        assert_eq!(format.notation, CoordinateNotation::Incremental);
        assert_eq!(
            format.x,
            AxisFormat {
                integer_digits: 2,
                decimal_digits: 5
            }
        );
        assert_eq!(
            format.y,
            AxisFormat {
                integer_digits: 3,
                decimal_digits: 6
            }
        );
    }

    #[test]
    fn ut_fmt_002_format_statement_skips_unused_digit_fields() {
        let format = parse_format_statement("LAN2G2X34Y34D2M2", CoordinateFormat::default());
        assert_eq!(format.zero_omission, ZeroOmission::Leading);
        assert_eq!(format.notation, CoordinateNotation::Absolute);
        assert_eq!(format.x, FORMAT_34);
        assert_eq!(format.y, FORMAT_34);
    }

    #[test]
    fn ut_fmt_009_non_ascii_characters_do_not_hide_later_fields() {
        let format = parse_format_statement("L\u{c4}X34\u{b0}Y25", CoordinateFormat::default());
        assert_eq!(format.notation, CoordinateNotation::Absolute);
        assert_eq!(format.x, FORMAT_34);
        assert_eq!(
            format.y,
            AxisFormat {
                integer_digits: 2,
                decimal_digits: 5
            }
        );
    }

    #[rstest]
    #[case("10000000", ZeroOmission::Leading, Units::Millimetres, 1_000_000_000)]
    #[case("-15", ZeroOmission::Leading, Units::Millimetres, -1_500)]
    #[case("+15", ZeroOmission::Leading, Units::Inches, 38_100)]
    #[case("0", ZeroOmission::Leading, Units::Millimetres, 0)]
    #[case("12", ZeroOmission::Trailing, Units::Millimetres, 120_000_000)]
    #[case("-0015", ZeroOmission::Trailing, Units::Millimetres, -1_500_000)]
    #[case("1.5", ZeroOmission::Leading, Units::Inches, 38_100_000)]
    fn ut_fmt_003_coordinates_scale_to_nanometres(
        #[case] raw: &str,
        #[case] omission: ZeroOmission,
        #[case] units: Units,
        #[case] expected: i64,
    ) {
        assert_eq!(parse_coordinate(raw, FORMAT_34, omission, units), Ok(expected));
    }

    #[test]
    fn ut_fmt_004_sub_nanometre_inch_values_round_once() {
        // One millionth of an inch is 25.4 nm.
        let axis = AxisFormat {
            integer_digits: 2,
            decimal_digits: 6,
        };
        assert_eq!(
            parse_coordinate("1", axis, ZeroOmission::Leading, Units::Inches),
            Ok(25)
        );
        assert_eq!(
            parse_coordinate("3", axis, ZeroOmission::Leading, Units::Inches),
            Ok(76)
        );
    }

    #[rstest]
    #[case("")]
    #[case("-")]
    #[case("12a4")]
    #[case("1.2.3")]
    #[case("999999999999999999999999999")]
    fn ut_fmt_005_malformed_literals_are_reported(#[case] raw: &str) {
        let result = parse_coordinate(raw, FORMAT_34, ZeroOmission::Leading, Units::Millimetres);
        assert_eq!(result, Err(MalformedNumber(raw.to_string())));
    }

    #[test]
    fn ut_fmt_006_decimal_dimensions_convert_exactly() {
        assert_eq!(parse_decimal("0.254", Units::Millimetres), Ok(254_000));
        assert_eq!(parse_decimal("0.025", Units::Inches), Ok(635_000));
        assert_eq!(parse_decimal(".5", Units::Millimetres), Ok(500_000));
        assert_eq!(parse_decimal("2", Units::Millimetres), Ok(2_000_000));
        assert!(parse_decimal("abc", Units::Millimetres).is_err());
    }

    #[test]
    fn ut_fmt_007_split_number_stops_at_next_letter() {
        assert_eq!(split_number("-1200Y300D01"), ("-1200", "Y300D01"));
        assert_eq!(split_number("D01"), ("", "D01"));
        assert_eq!(split_number("42"), ("42", ""));
    }

    #[test]
    fn ut_fmt_008_code_and_real_parsing() {
        assert_eq!(parse_code("10"), Ok(10));
        assert!(parse_code("-1").is_err());
        assert_eq!(parse_real("45.5"), Ok(45.5));
        assert!(parse_real("nan").is_err());
    }
}
