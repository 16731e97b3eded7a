#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::indexing_slicing)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! `cadconv` WASM module: photoplotter (RS-274X) interpretation, arc
//! reconstruction and vendor arc adapters, producing footprint primitives
//! in integral nanometres.

pub mod error;
pub mod geometry;
pub mod options;
pub mod plotter;

use serde::Serialize;
use wasm_bindgen::prelude::*;

pub use crate::error::{ConversionError, GeometryError, TokenizeError};
pub use crate::geometry::{ArcParameters, BoundingBox, Point};
pub use crate::options::ConversionOptions;
pub use crate::plotter::{convert, convert_with, Conversion, Diagnostic, DiagnosticKind, Primitive};

use crate::geometry::ClearRange;
use crate::plotter::NoIncludes;

/// Conversion result handed across the WASM boundary.
///
/// Bounds are `None` when nothing was drawn, so no sentinel extremes leave
/// the module.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionSummary {
    /// Number of commands processed.
    pub command_count: usize,
    /// Number of diagnostics of any kind.
    pub diagnostic_count: usize,
    /// Number of numeric literals read as zero.
    pub malformed_number_count: usize,
    /// Extents of the output, in nanometres.
    pub bounds: Option<BoundingBox>,
    /// Output primitives in emission order.
    pub primitives: Vec<Primitive>,
    /// One line per diagnostic.
    pub diagnostics: Vec<String>,
    /// Primitive ranges drawn with clear polarity.
    pub clear_ranges: Vec<ClearRange>,
}

impl From<Conversion> for ConversionSummary {
    fn from(conversion: Conversion) -> Self {
        Self {
            command_count: conversion.command_count,
            diagnostic_count: conversion.diagnostic_count(),
            malformed_number_count: conversion.malformed_number_count(),
            bounds: (!conversion.bounds.is_empty()).then_some(conversion.bounds),
            diagnostics: conversion
                .diagnostics
                .iter()
                .map(ToString::to_string)
                .collect(),
            primitives: conversion.primitives,
            clear_ranges: conversion.clear_ranges,
        }
    }
}

/// Initialize the WASM module. Sets up the panic hook for debugging.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Convert a photoplotter file from raw bytes.
///
/// `options` is a partial [`ConversionOptions`] object, or `undefined` for
/// the defaults. Returns a [`ConversionSummary`] as a `JsValue` via
/// `serde-wasm-bindgen`.
///
/// # Errors
///
/// Returns a descriptive error string if the options are invalid or the
/// job fails fatally.
#[wasm_bindgen]
pub fn convert_gerber(data: &[u8], options: JsValue) -> Result<JsValue, JsValue> {
    let options: ConversionOptions = if options.is_undefined() || options.is_null() {
        ConversionOptions::default()
    } else {
        serde_wasm_bindgen::from_value(options)
            .map_err(|e| JsValue::from_str(&format!("invalid options: {e}")))?
    };
    let summary =
        convert_gerber_internal(data, &options).map_err(|e| JsValue::from_str(&e.to_string()))?;
    serde_wasm_bindgen::to_value(&summary).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Internal conversion logic shared between the wasm export and native tests.
#[doc(hidden)]
pub fn convert_gerber_internal(
    data: &[u8],
    options: &ConversionOptions,
) -> Result<ConversionSummary, ConversionError> {
    if data.is_empty() {
        return Err(ConversionError::EmptyInput);
    }
    let text =
        std::str::from_utf8(data).map_err(|e| ConversionError::InvalidUtf8(e.to_string()))?;
    let conversion = convert_with(text, options, &NoIncludes)?;
    Ok(conversion.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn convert_gerber_valid_fixture() {
        let data = include_bytes!("../tests/fixtures/minimal/rectangle.gbr");
        let result = convert_gerber_internal(data, &ConversionOptions::default());
        assert!(
            result.is_ok(),
            "expected Ok, got Err: {:?}",
            result.as_ref().err()
        );
        let Some(summary) = result.ok() else {
            return;
        };
        assert!(summary.command_count > 0, "expected commands from valid input");
        assert!(!summary.primitives.is_empty(), "expected output primitives");
        assert!(summary.bounds.is_some());
        assert_eq!(summary.diagnostic_count, 0);
    }

    #[test]
    fn convert_gerber_empty_bytes() {
        let result = convert_gerber_internal(&[], &ConversionOptions::default());
        assert_eq!(result.err(), Some(ConversionError::EmptyInput));
    }

    #[test]
    fn convert_gerber_invalid_utf8() {
        let garbage: &[u8] = &[0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x01, 0x02, 0x03];
        let result = convert_gerber_internal(garbage, &ConversionOptions::default());
        assert!(matches!(result, Err(ConversionError::InvalidUtf8(_))));
    }

    #[test]
    fn convert_gerber_malformed_fixture_recovers() {
        let data = include_bytes!("../tests/fixtures/minimal/malformed.gbr");
        let result = convert_gerber_internal(data, &ConversionOptions::default());
        assert!(
            result.is_ok(),
            "expected Ok for recoverable input, got Err: {:?}",
            result.as_ref().err()
        );
        let Some(summary) = result.ok() else {
            return;
        };
        assert!(summary.command_count > 0);
        assert!(summary.diagnostic_count > 0, "expected diagnostics");
        assert_eq!(summary.diagnostics.len(), summary.diagnostic_count);
    }

    #[test]
    fn summary_of_empty_drawing_has_no_bounds() {
        let result = convert_gerber_internal(b"%MOMM*%\nM02*\n", &ConversionOptions::default());
        assert!(result.is_ok());
        if let Ok(summary) = result {
            assert!(summary.bounds.is_none());
            assert!(summary.primitives.is_empty());
        }
    }
}
