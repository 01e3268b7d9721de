//! Shared types for the Pendown runtime.
//!
//! This crate defines the parse-tree model handed to the interpreter by an
//! external parser, source spans, and the structured diagnostics produced
//! when a run fails.

mod error;
mod span;
pub mod build;
pub mod tree;

pub use error::{Diagnostic, ErrorCategory, ErrorCode, Severity, TreeError};
pub use span::{SourceFile, Span};
pub use tree::{ParseNode, ParseTree, RuleKind, Token, TokenKind};
