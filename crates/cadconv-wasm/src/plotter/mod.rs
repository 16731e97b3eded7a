//! Photoplotter interpreter: tokenizer, state machine and event sink.

pub mod format;
pub mod sink;
pub mod state;
pub mod tokenizer;
pub mod types;

use log::debug;

use crate::error::ConversionError;
use crate::options::ConversionOptions;

pub use format::{AxisFormat, CoordinateFormat, CoordinateNotation, Units, ZeroOmission};
pub use sink::{DrawEventSink, SinkOutput};
pub use state::{DrawMode, PlotterState};
pub use tokenizer::{IncludeSource, NoIncludes, Token, Tokenized, Tokenizer};
pub use types::{Conversion, Diagnostic, DiagnosticKind, DrawEvent, Primitive};

/// Convert a photoplotter stream with default options and no includes.
///
/// # Errors
///
/// See [`convert_with`].
pub fn convert(text: &str) -> Result<Conversion, ConversionError> {
    convert_with(text, &ConversionOptions::default(), &NoIncludes)
}

/// Convert a photoplotter stream.
///
/// Problems with individual commands never fail the job; they are listed in
/// [`Conversion::diagnostics`].
///
/// # Errors
///
/// Returns [`ConversionError::EmptyInput`] for blank input and
/// [`ConversionError::Tokenize`] when a top-level `%` block is never closed.
pub fn convert_with(
    text: &str,
    options: &ConversionOptions,
    includes: &dyn IncludeSource,
) -> Result<Conversion, ConversionError> {
    if text.trim().is_empty() {
        return Err(ConversionError::EmptyInput);
    }
    let options = &options.clamped();

    let Tokenized {
        tokens,
        include_failures,
    } = Tokenizer::new(includes, options.max_include_depth).tokenize(text)?;

    let mut diagnostics: Vec<Diagnostic> = include_failures
        .into_iter()
        .map(|failure| Diagnostic {
            command_index: failure.token_index,
            command: failure.command,
            kind: DiagnosticKind::IncludeFailed {
                name: failure.name,
                reason: failure.reason,
            },
        })
        .collect();

    let mut state = PlotterState::new(options);
    let mut sink = DrawEventSink::new(options.strict_polygons);
    let mut command_count = 0;
    let mut last_command = (0, String::new());

    for (index, token) in tokens.iter().enumerate() {
        if state.is_stopped() {
            break;
        }

        let events = state.execute(token);
        let Token::Command(command) = token else {
            continue;
        };
        command_count += 1;

        let mut kinds = state.take_diagnostics();
        kinds.extend(events.into_iter().filter_map(|event| sink.accept(event)));
        diagnostics.extend(kinds.into_iter().map(|kind| Diagnostic {
            command_index: index,
            command: command.clone(),
            kind,
        }));
        last_command = (index, command.clone());
    }

    let output = sink.finish(options.centre, options.mirror_y_axis);
    if let Some(kind) = output.unclosed_contour {
        diagnostics.push(Diagnostic {
            command_index: last_command.0,
            command: last_command.1,
            kind,
        });
    }
    diagnostics.sort_by_key(|diagnostic| diagnostic.command_index);

    debug!(
        "converted {command_count} commands into {} primitives with {} diagnostics",
        output.primitives.len(),
        diagnostics.len()
    );

    Ok(Conversion {
        primitives: output.primitives,
        diagnostics,
        bounds: output.bounds,
        clear_ranges: output.clear_ranges,
        command_count,
    })
}
