//! Execution observers for debuggers and editor integrations.

use crate::error::EvalError;
use crate::scope::Scope;
use crate::signal::ReturnValue;
use pendown_types::{RuleKind, Span};

/// Callbacks fired while a program runs. All methods default to no-ops.
///
/// Listeners observe; they cannot alter control flow. A stepping debugger
/// pauses by blocking inside `current_statement` and stops a run through
/// the shared [`HaltMonitor`](crate::HaltMonitor).
///
/// Listeners must be `Send` so a configured [`Interpreter`](crate::Interpreter)
/// can be moved onto a worker thread.
pub trait InterpreterListener: Send {
    fn started(&self) {}

    fn finished(&self, _outcome: &ReturnValue) {}

    fn error(&self, _error: &EvalError) {}

    /// Fired before each statement executes.
    fn current_statement(&self, _kind: RuleKind, _span: Span, _scope: &Scope) {}
}
