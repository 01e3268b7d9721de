//! Source positions carried by tree nodes, tokens and diagnostics.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// 1-based line/column range of a node or token in the program text.
///
/// Parsers that synthesize nodes leave the span at its default (line 0),
/// which diagnostics treat as "no position".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    #[serde(rename = "line")]
    pub start_line: u32,
    #[serde(rename = "column")]
    pub start_col: u32,
    pub end_line: u32,
    #[serde(rename = "end_column")]
    pub end_col: u32,
}

impl Span {
    pub fn new(start_line: u32, start_col: u32, end_line: u32, end_col: u32) -> Self {
        Self {
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// Zero-width span at `line:col`.
    pub fn point(line: u32, col: u32) -> Self {
        Self::new(line, col, line, col)
    }

    pub fn is_synthetic(&self) -> bool {
        self.start_line == 0
    }

    fn first(&self) -> (u32, u32) {
        (self.start_line, self.start_col)
    }

    fn last(&self) -> (u32, u32) {
        (self.end_line, self.end_col)
    }

    /// Smallest span covering `self` and `other`. A synthetic side is
    /// ignored so it cannot drag the result back to line 0.
    pub fn merge(self, other: Span) -> Span {
        match (self.is_synthetic(), other.is_synthetic()) {
            (true, _) => other,
            (false, true) => self,
            (false, false) => {
                let (start_line, start_col) = self.first().min(other.first());
                let (end_line, end_col) = self.last().max(other.last());
                Span::new(start_line, start_col, end_line, end_col)
            }
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (line, col) = self.first();
        write!(f, "{line}:{col}")
    }
}

/// Program text kept next to a tree so diagnostics can quote the line an
/// error points at. The interpreter never reads it otherwise.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub source: String,
    /// Byte range of each line, newline excluded.
    lines: Vec<Range<usize>>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        let source = source.into();
        let mut lines = Vec::new();
        let mut offset = 0;
        for text in source.split('\n') {
            lines.push(offset..offset + text.len());
            offset += text.len() + 1;
        }
        Self {
            name: name.into(),
            source,
            lines,
        }
    }

    /// Text of 1-based line `number` without its line terminator, or `None`
    /// past either end.
    pub fn line(&self, number: u32) -> Option<&str> {
        let index = usize::try_from(number.checked_sub(1)?).ok()?;
        let range = self.lines.get(index)?.clone();
        Some(self.source[range].trim_end_matches('\r'))
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }
}
