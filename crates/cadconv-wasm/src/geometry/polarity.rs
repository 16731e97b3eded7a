//! Polarity tracking over the output primitive list.
//!
//! Records which primitive index ranges were drawn under clear polarity
//! (`%LPC*%`) so the emitter can subtract them from earlier dark geometry.

use serde::Serialize;

use super::types::Polarity;

/// Half-open range of primitive indices drawn with clear polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClearRange {
    /// First primitive index (inclusive).
    pub start: usize,
    /// End primitive index (exclusive).
    pub end: usize,
}

/// Tracks polarity state and records clear-polarity ranges.
#[derive(Debug)]
pub struct PolarityTracker {
    polarity: Polarity,
    clear_start: Option<usize>,
    clear_ranges: Vec<ClearRange>,
}

impl PolarityTracker {
    /// Creates a new tracker with dark polarity.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            polarity: Polarity::Dark,
            clear_start: None,
            clear_ranges: Vec::new(),
        }
    }

    /// Returns the current polarity.
    #[must_use]
    pub const fn current(&self) -> Polarity {
        self.polarity
    }

    /// Switches polarity with `primitive_count` primitives emitted so far.
    ///
    /// Switching to clear opens a range; switching back to dark closes it.
    /// Empty ranges are dropped.
    pub fn set_polarity(&mut self, polarity: Polarity, primitive_count: usize) {
        if polarity == self.polarity {
            return;
        }

        if polarity == Polarity::Clear {
            self.clear_start = Some(primitive_count);
        } else {
            self.close_range(primitive_count);
        }

        self.polarity = polarity;
    }

    /// Closes any open clear range and returns all ranges in order.
    #[must_use]
    pub fn finish(mut self, primitive_count: usize) -> Vec<ClearRange> {
        self.close_range(primitive_count);
        self.clear_ranges
    }

    fn close_range(&mut self, primitive_count: usize) {
        if let Some(start) = self.clear_start.take() {
            if primitive_count > start {
                self.clear_ranges.push(ClearRange {
                    start,
                    end: primitive_count,
                });
            }
        }
    }
}

impl Default for PolarityTracker {
    fn default() -> Self {
        Self::new()
    }
}
