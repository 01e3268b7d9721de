//! Runtime error types for the Pendown interpreter.

use crate::value::ValueType;
use pendown_types::{Diagnostic, ErrorCode, SourceFile, Span};
use thiserror::Error;

/// Evaluation error. Every fault carries the span of the node that raised it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// Lookup exhausted the whole scope chain.
    #[error("undefined variable '{name}'")]
    UndefinedVariable { name: String, span: Span },

    /// No procedure with this name is visible from the calling block.
    #[error("undefined procedure '{name}'")]
    UndefinedProcedure { name: String, span: Span },

    /// A coercion site received a value of the wrong type.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: ValueType,
        found: ValueType,
        span: Span,
    },

    #[error("'{name}' expects {expected} argument(s), got {found}")]
    ArityMismatch {
        name: String,
        expected: String,
        found: usize,
        span: Span,
    },

    /// A procedure used as an expression finished without `output`.
    #[error("'{name}' did not output a value")]
    NoOutput { name: String, span: Span },

    #[error("invalid numeric literal '{text}'")]
    InvalidLiteral { text: String, span: Span },

    /// The parse tree does not have the shape the interpreter consumes.
    #[error("malformed parse tree: {message}")]
    MalformedTree { message: String, span: Span },

    #[error("unknown primitive '{name}'")]
    UnknownPrimitive { name: String, span: Span },

    #[error("call depth limit of {limit} exceeded")]
    RecursionLimit { limit: usize, span: Span },

    #[error("step limit of {limit} exhausted")]
    StepLimitExhausted { limit: u64, span: Span },

    /// Halt observed inside an expression (used internally for control
    /// flow; converted back into a HALT signal at the statement boundary).
    #[error("halted")]
    Halted,
}

impl EvalError {
    pub(crate) fn malformed(message: impl Into<String>, span: Span) -> Self {
        EvalError::MalformedTree {
            message: message.into(),
            span,
        }
    }

    /// Source position of the originating node.
    pub fn span(&self) -> Span {
        match self {
            EvalError::UndefinedVariable { span, .. }
            | EvalError::UndefinedProcedure { span, .. }
            | EvalError::TypeMismatch { span, .. }
            | EvalError::ArityMismatch { span, .. }
            | EvalError::NoOutput { span, .. }
            | EvalError::InvalidLiteral { span, .. }
            | EvalError::MalformedTree { span, .. }
            | EvalError::UnknownPrimitive { span, .. }
            | EvalError::RecursionLimit { span, .. }
            | EvalError::StepLimitExhausted { span, .. } => *span,
            EvalError::Halted => Span::default(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            EvalError::UndefinedVariable { .. } => ErrorCode::UNDEFINED_VARIABLE,
            EvalError::UndefinedProcedure { .. } => ErrorCode::UNDEFINED_PROCEDURE,
            EvalError::TypeMismatch { .. } => ErrorCode::TYPE_MISMATCH,
            EvalError::ArityMismatch { .. } => ErrorCode::WRONG_ARG_COUNT,
            EvalError::NoOutput { .. } => ErrorCode::NO_OUTPUT,
            EvalError::InvalidLiteral { .. } => ErrorCode::INVALID_LITERAL,
            EvalError::MalformedTree { .. } | EvalError::Halted => ErrorCode::MALFORMED_TREE,
            EvalError::UnknownPrimitive { .. } => ErrorCode::UNKNOWN_PRIMITIVE,
            EvalError::RecursionLimit { .. } => ErrorCode::RECURSION_LIMIT,
            EvalError::StepLimitExhausted { .. } => ErrorCode::STEP_LIMIT,
        }
    }

    /// Render as a structured diagnostic, quoting `source` when available.
    pub fn to_diagnostic(&self, source: Option<&SourceFile>) -> Diagnostic {
        Diagnostic::at(source, self.code(), self.to_string(), self.span())
    }
}

/// Result alias for evaluator operations.
pub type EvalResult<T> = Result<T, EvalError>;

#[cfg(test)]
mod tests {
    use super::*;
    use pendown_types::ErrorCategory;

    #[test]
    fn test_display_messages() {
        let err = EvalError::UndefinedVariable {
            name: "size".into(),
            span: Span::point(3, 4),
        };
        assert_eq!(err.to_string(), "undefined variable 'size'");

        let err = EvalError::TypeMismatch {
            expected: ValueType::Number,
            found: ValueType::String,
            span: Span::default(),
        };
        assert_eq!(err.to_string(), "type mismatch: expected number, found string");
    }

    #[test]
    fn test_diagnostic_carries_position() {
        let src = SourceFile::new("star.logo", "repeat 5 [\n  fd :len\n]");
        let err = EvalError::UndefinedVariable {
            name: "len".into(),
            span: Span::new(2, 6, 2, 9),
        };
        let diag = err.to_diagnostic(Some(&src));
        assert_eq!(diag.code, ErrorCode::UNDEFINED_VARIABLE);
        assert_eq!(diag.category, ErrorCategory::Scope);
        assert_eq!(diag.span.start_line, 2);
        assert_eq!(diag.span.start_col, 6);
        assert_eq!(diag.source_line, "  fd :len");
    }

    #[test]
    fn test_limit_codes() {
        let err = EvalError::RecursionLimit {
            limit: 8,
            span: Span::default(),
        };
        assert_eq!(err.code().category(), ErrorCategory::Limit);
    }
}
