use crate::{SourceFile, Span};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Error category, determined by error code range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Scope,
    Type,
    Structure,
    Limit,
}

/// Numeric error code (E100–E499).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ErrorCode(pub u16);

impl ErrorCode {
    // ── Scope errors (E100–E199) ──
    pub const UNDEFINED_VARIABLE: Self = Self(100);
    pub const UNDEFINED_PROCEDURE: Self = Self(101);

    // ── Type errors (E200–E299) ──
    pub const TYPE_MISMATCH: Self = Self(200);
    pub const WRONG_ARG_COUNT: Self = Self(201);
    pub const NO_OUTPUT: Self = Self(202);
    pub const INVALID_LITERAL: Self = Self(203);

    // ── Structure errors (E300–E399) ──
    pub const MALFORMED_TREE: Self = Self(300);
    pub const UNKNOWN_PRIMITIVE: Self = Self(301);

    // ── Limit errors (E400–E499) ──
    pub const RECURSION_LIMIT: Self = Self(400);
    pub const STEP_LIMIT: Self = Self(401);

    /// Get the category for this error code.
    pub fn category(self) -> ErrorCategory {
        match self.0 {
            100..=199 => ErrorCategory::Scope,
            200..=299 => ErrorCategory::Type,
            400..=499 => ErrorCategory::Limit,
            _ => ErrorCategory::Structure,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scope => write!(f, "scope"),
            Self::Type => write!(f, "type"),
            Self::Structure => write!(f, "structure"),
            Self::Limit => write!(f, "limit"),
        }
    }
}

/// A structured runtime diagnostic.
///
/// Hosts render these (console pane, editor gutter); they must not parse
/// free-form error strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Source file name.
    pub file: String,
    /// Error code (e.g., E100).
    pub code: ErrorCode,
    pub severity: Severity,
    /// Error category (derived from code).
    pub category: ErrorCategory,
    /// Human-readable error message.
    pub message: String,
    /// Source location of the node that raised the fault.
    #[serde(flatten)]
    pub span: Span,
    /// The exact source line for context, empty when unknown.
    pub source_line: String,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub fn new(
        file: impl Into<String>,
        code: ErrorCode,
        message: impl Into<String>,
        span: Span,
        source_line: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            code,
            severity: Severity::Error,
            category: code.category(),
            message: message.into(),
            span,
            source_line: source_line.into(),
        }
    }

    /// Create a diagnostic, quoting the source line from `source` when given.
    pub fn at(
        source: Option<&SourceFile>,
        code: ErrorCode,
        message: impl Into<String>,
        span: Span,
    ) -> Self {
        let file = source.map(|s| s.name.as_str()).unwrap_or("<tree>");
        let line = source
            .and_then(|s| s.line(span.start_line))
            .unwrap_or_default();
        Self::new(file, code, message, span, line)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {} [{}] {}",
            self.file, self.span, self.code, self.category, self.message
        )
    }
}

impl std::error::Error for Diagnostic {}

/// Failure to load a parse tree handed over by an external parser.
#[derive(Debug, Error)]
pub enum TreeError {
    #[error("invalid parse tree JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_category() {
        assert_eq!(ErrorCode::UNDEFINED_VARIABLE.category(), ErrorCategory::Scope);
        assert_eq!(ErrorCode::TYPE_MISMATCH.category(), ErrorCategory::Type);
        assert_eq!(ErrorCode::MALFORMED_TREE.category(), ErrorCategory::Structure);
        assert_eq!(ErrorCode::STEP_LIMIT.category(), ErrorCategory::Limit);
    }

    #[test]
    fn test_error_code_display() {
        assert_eq!(format!("{}", ErrorCode::TYPE_MISMATCH), "E200");
        assert_eq!(format!("{}", ErrorCode::UNDEFINED_VARIABLE), "E100");
    }

    #[test]
    fn test_diagnostic_quotes_source_line() {
        let src = SourceFile::new("spiral.logo", "make \"n 1\nfd :size");
        let diag = Diagnostic::at(
            Some(&src),
            ErrorCode::UNDEFINED_VARIABLE,
            "undefined variable 'size'",
            Span::new(2, 4, 2, 8),
        );
        assert_eq!(diag.file, "spiral.logo");
        assert_eq!(diag.source_line, "fd :size");
        assert_eq!(diag.category, ErrorCategory::Scope);
        assert_eq!(
            diag.to_string(),
            "spiral.logo:2:4: E100 [scope] undefined variable 'size'"
        );
    }

    #[test]
    fn test_diagnostic_without_source() {
        let diag = Diagnostic::at(None, ErrorCode::MALFORMED_TREE, "bad", Span::point(1, 1));
        assert_eq!(diag.file, "<tree>");
        assert_eq!(diag.source_line, "");
    }

    #[test]
    fn test_diagnostic_json_serialization() {
        let diag = Diagnostic::new(
            "prog.bas",
            ErrorCode::TYPE_MISMATCH,
            "type mismatch: expected number, found string",
            Span::new(3, 5, 3, 12),
            "20 LET X = \"A\" + 1",
        );
        let json = serde_json::to_string(&diag).unwrap();
        assert!(json.contains("\"code\":200"));
        assert!(json.contains("\"severity\":\"error\""));
        assert!(json.contains("\"category\":\"type\""));
        assert!(json.contains("\"line\":3"));
        assert!(json.contains("\"column\":5"));

        let back: Diagnostic = serde_json::from_str(&json).unwrap();
        assert_eq!(back.code, diag.code);
        assert_eq!(back.span, diag.span);
    }
}
