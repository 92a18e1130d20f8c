//! Input buffer and location tracking.
//!
//! The buffer is created once per parse and never mutated; locations are
//! immutable value objects produced by advancing from prior locations, so
//! a matcher context can save and restore a cursor by copying it.

use std::sync::Arc;

use miette::NamedSource;
use serde::{Deserialize, Serialize};

use crate::chars::EOI;

/// Immutable random-access view of the source characters.
///
/// Characters are materialized up front for O(1) indexing; the virtual
/// end-of-input position `length` reports the [`EOI`] sentinel. The name
/// travels with the buffer so diagnostics can cite it.
#[derive(Debug, Clone)]
pub struct InputBuffer {
    name: String,
    text: String,
    chars: Vec<char>,
}

impl InputBuffer {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let chars = text.chars().collect();
        Self {
            name: name.into(),
            text,
            chars,
        }
    }

    /// An unnamed buffer for ad-hoc parses.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self::new("input", text)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Number of characters (not bytes) in the buffer.
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Character at `index`, or the EOI sentinel at and beyond the end.
    pub fn char_at(&self, index: usize) -> char {
        self.chars.get(index).copied().unwrap_or(EOI)
    }

    /// Extracts the text over the half-open character range `[start, end)`.
    /// Out-of-range bounds are clamped.
    pub fn extract(&self, start: usize, end: usize) -> String {
        let end = end.min(self.chars.len());
        let start = start.min(end);
        self.chars[start..end].iter().collect()
    }

    /// Translates a character index to a 1-based (line, column) pair.
    pub fn position(&self, index: usize) -> (usize, usize) {
        let mut line = 1;
        let mut column = 1;
        for c in self.chars.iter().take(index) {
            if *c == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }
        (line, column)
    }

    /// Byte offset of the character at `index`, for span construction.
    pub fn byte_offset(&self, index: usize) -> usize {
        self.chars
            .iter()
            .take(index)
            .map(|c| c.len_utf8())
            .sum()
    }

    /// The buffer as a miette source for diagnostic rendering.
    pub fn to_named_source(&self) -> Arc<NamedSource<String>> {
        Arc::new(NamedSource::new(self.name.clone(), self.text.clone()))
    }
}

/// A cursor into an [`InputBuffer`].
///
/// Carries the character at its own index so matchers test the current
/// character without touching the buffer. At `index == length` the current
/// character is the EOI sentinel and advancing is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputLocation {
    pub index: usize,
    pub line: usize,
    pub column: usize,
    pub current_char: char,
}

impl InputLocation {
    /// The location at the start of the buffer.
    pub fn start(buffer: &InputBuffer) -> Self {
        Self {
            index: 0,
            line: 1,
            column: 1,
            current_char: buffer.char_at(0),
        }
    }

    /// Returns the successor location. Advancing over a newline moves to
    /// the next line; advancing at end-of-input returns `self` unchanged.
    pub fn advance(&self, buffer: &InputBuffer) -> Self {
        if self.index >= buffer.len() {
            return *self;
        }
        let (line, column) = if self.current_char == '\n' {
            (self.line + 1, 1)
        } else {
            (self.line, self.column + 1)
        };
        let index = self.index + 1;
        Self {
            index,
            line,
            column,
            current_char: buffer.char_at(index),
        }
    }

    /// True once the cursor sits on the virtual end position.
    pub fn at_end(&self) -> bool {
        self.current_char == EOI
    }
}
