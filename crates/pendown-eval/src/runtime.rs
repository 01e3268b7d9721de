//! Per-run execution context.
//!
//! A [`Runtime`] bundles the mutable state of one run (the scope chain,
//! the canvas, call depth and step counters) with the shared, read-only
//! program and configuration. Frames are pushed through [`FrameGuard`],
//! which pops on drop so every exit path, errors included, leaves the
//! scope balanced.

use crate::block::{BlockId, BlockKind, CodeBlock, Program};
use crate::canvas::{self, Canvas, Primitive};
use crate::config::InterpreterConfig;
use crate::error::{EvalError, EvalResult};
use crate::expr;
use crate::halt::HaltMonitor;
use crate::listener::InterpreterListener;
use crate::scope::Scope;
use crate::signal::{ProcessResult, ReturnValue};
use crate::stack;
use crate::value::TypedValue;
use pendown_types::{ParseNode, RuleKind, Span};
use std::ops::{Deref, DerefMut};
use std::time::Duration;

/// Mutable state of a single run.
pub struct Runtime<'a> {
    program: &'a Program,
    config: &'a InterpreterConfig,
    listeners: &'a [Box<dyn InterpreterListener>],
    canvas: &'a mut dyn Canvas,
    halt: HaltMonitor,
    /// The live scope chain.
    pub scope: Scope,
    call_depth: usize,
    steps: u64,
}

impl<'a> Runtime<'a> {
    pub fn new(
        program: &'a Program,
        config: &'a InterpreterConfig,
        scope: Scope,
        halt: HaltMonitor,
        canvas: &'a mut dyn Canvas,
        listeners: &'a [Box<dyn InterpreterListener>],
    ) -> Self {
        Self {
            program,
            config,
            listeners,
            canvas,
            halt,
            scope,
            call_depth: 0,
            steps: 0,
        }
    }

    pub fn program(&self) -> &'a Program {
        self.program
    }

    pub fn config(&self) -> &'a InterpreterConfig {
        self.config
    }

    /// Statements executed so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn call_depth(&self) -> usize {
        self.call_depth
    }

    pub fn is_halted(&self) -> bool {
        self.halt.is_halted()
    }

    /// Consume the runtime, returning the final scope.
    pub fn into_scope(self) -> Scope {
        self.scope
    }

    /// Push a frame owned by `owner`, chained to the current frame.
    pub fn scoped(&mut self, owner: BlockId) -> FrameGuard<'_, 'a> {
        self.scope.push(owner);
        FrameGuard { rt: self }
    }

    /// Push a frame owned by `owner`, chained to frame `parent`.
    pub fn scoped_lexical(&mut self, owner: BlockId, parent: usize) -> FrameGuard<'_, 'a> {
        self.scope.push_lexical(owner, parent);
        FrameGuard { rt: self }
    }

    /// Canonical form of an identifier under the active config.
    pub fn canonical(&self, raw: &str) -> String {
        self.config.canonical_name(raw)
    }

    /// Count one statement or loop iteration against the optional step
    /// budget.
    pub(crate) fn tick(&mut self, span: Span) -> EvalResult<()> {
        self.steps += 1;
        match self.config.max_steps {
            Some(limit) if self.steps > limit => {
                Err(EvalError::StepLimitExhausted { limit, span })
            }
            _ => Ok(()),
        }
    }

    pub(crate) fn notify_statement(&self, kind: RuleKind, span: Span) {
        for listener in self.listeners {
            listener.current_statement(kind, span, &self.scope);
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Procedures
    // ══════════════════════════════════════════════════════════════════════

    /// Invoke procedure `name` with argument expressions evaluated in the
    /// caller's scope.
    ///
    /// RETURN and BREAK are consumed here; the result is SUCCESS carrying
    /// the output value, if any. HALT propagates.
    pub fn call(&mut self, name: &str, args: &[&ParseNode], span: Span) -> EvalResult<ReturnValue> {
        let program = self.program;
        let key = self.canonical(name);
        let from = self.scope.current_owner().unwrap_or(program.root().id);
        let target = program
            .find_function(from, &key)
            .ok_or_else(|| EvalError::UndefinedProcedure {
                name: key.clone(),
                span,
            })?;
        let BlockKind::Procedure(def) = &target.kind else {
            return Err(EvalError::malformed(
                format!("'{key}' is not a procedure"),
                span,
            ));
        };
        if args.len() != def.params.len() {
            return Err(EvalError::ArityMismatch {
                name: key,
                expected: def.params.len().to_string(),
                found: args.len(),
                span,
            });
        }
        if self.call_depth >= self.config.max_call_depth {
            return Err(EvalError::RecursionLimit {
                limit: self.config.max_call_depth,
                span,
            });
        }

        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(expr::evaluate(self, arg)?);
        }

        tracing::debug!(procedure = %key, depth = self.call_depth + 1, "call");
        let defining = target
            .parent()
            .and_then(|p| self.scope.frame_of(p))
            .unwrap_or(0);
        self.call_depth += 1;
        let result = stack::ensure_sufficient_stack(|| {
            self.invoke(target, &def.params, values, defining)
        });
        self.call_depth -= 1;
        tracing::debug!(procedure = %key, "return");

        let signal = result?;
        Ok(match signal.result {
            ProcessResult::Halt => ReturnValue::HALT,
            ProcessResult::Return => ReturnValue {
                result: ProcessResult::Success,
                value: signal.value,
            },
            ProcessResult::Success | ProcessResult::Break => ReturnValue::SUCCESS,
        })
    }

    fn invoke(
        &mut self,
        target: &CodeBlock,
        params: &[String],
        values: Vec<TypedValue>,
        defining: usize,
    ) -> EvalResult<ReturnValue> {
        let mut scoped = self.scoped_lexical(target.id, defining);
        for (param, value) in params.iter().zip(values) {
            scoped.scope.declare(param, value);
        }
        target.run_statements(&mut scoped)
    }

    // ══════════════════════════════════════════════════════════════════════
    // Primitives
    // ══════════════════════════════════════════════════════════════════════

    /// Issue a primitive. `pause` sleeps here, cooperatively; being halted
    /// during the pause yields HALT.
    pub(crate) fn primitive(
        &mut self,
        primitive: Primitive,
        args: &[TypedValue],
        span: Span,
    ) -> EvalResult<ReturnValue> {
        tracing::trace!(?primitive, "primitive");
        if primitive == Primitive::Pause {
            let millis = args
                .first()
                .map(|v| v.as_number(span))
                .transpose()?
                .unwrap_or(0.0)
                .max(0.0);
            let completed = self
                .halt
                .sleep(Duration::from_millis(millis as u64), self.config.pause_slice());
            return Ok(if completed {
                ReturnValue::SUCCESS
            } else {
                ReturnValue::HALT
            });
        }
        canvas::dispatch(&mut *self.canvas, primitive, args, span)?;
        Ok(ReturnValue::SUCCESS)
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Frame guard
// ══════════════════════════════════════════════════════════════════════════════

/// A pushed frame. Dereferences to the runtime; pops the frame on drop.
pub struct FrameGuard<'g, 'a> {
    rt: &'g mut Runtime<'a>,
}

impl<'a> Deref for FrameGuard<'_, 'a> {
    type Target = Runtime<'a>;

    fn deref(&self) -> &Self::Target {
        self.rt
    }
}

impl DerefMut for FrameGuard<'_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.rt
    }
}

impl Drop for FrameGuard<'_, '_> {
    fn drop(&mut self) {
        self.rt.scope.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::RecordingCanvas;
    use pendown_types::build::*;

    fn with_runtime<T>(
        program: &Program,
        config: &InterpreterConfig,
        f: impl FnOnce(&mut Runtime<'_>) -> T,
    ) -> T {
        let mut canvas = RecordingCanvas::new();
        let mut rt = Runtime::new(
            program,
            config,
            Scope::new(),
            HaltMonitor::new(),
            &mut canvas,
            &[],
        );
        f(&mut rt)
    }

    #[test]
    fn test_frame_guard_pops_on_drop() {
        let program = Program::empty();
        let config = InterpreterConfig::default();
        with_runtime(&program, &config, |rt| {
            {
                let mut scoped = rt.scoped(BlockId(0));
                scoped.scope.declare("x", TypedValue::Number(1.0));
                assert_eq!(scoped.scope.depth(), 2);
            }
            assert_eq!(rt.scope.depth(), 1);
            assert_eq!(rt.scope.lookup("x"), None);
        });
    }

    #[test]
    fn test_step_limit() {
        let program = Program::empty();
        let config = InterpreterConfig {
            max_steps: Some(2),
            ..InterpreterConfig::default()
        };
        with_runtime(&program, &config, |rt| {
            assert!(rt.tick(Span::default()).is_ok());
            assert!(rt.tick(Span::default()).is_ok());
            let err = rt.tick(Span::point(9, 1)).unwrap_err();
            assert_eq!(
                err,
                EvalError::StepLimitExhausted {
                    limit: 2,
                    span: Span::point(9, 1)
                }
            );
        });
    }

    #[test]
    fn test_call_checks_arity() {
        let tree = program(vec![procedure("sq", &["n"], block(vec![output(var("n"))]))]);
        let config = InterpreterConfig::default();
        let program = Program::build(&tree, &config).unwrap();
        with_runtime(&program, &config, |rt| {
            let err = rt.call("sq", &[], Span::point(1, 1)).unwrap_err();
            assert!(matches!(err, EvalError::ArityMismatch { found: 0, .. }));
            assert_eq!(rt.call_depth(), 0);
        });
    }

    #[test]
    fn test_call_consumes_return_and_keeps_value() {
        let tree = program(vec![procedure("sq", &["n"], block(vec![output(var("n"))]))]);
        let config = InterpreterConfig::default();
        let program = Program::build(&tree, &config).unwrap();
        with_runtime(&program, &config, |rt| {
            let arg = num("7");
            let signal = rt.call("SQ", &[&arg], Span::default()).unwrap();
            assert!(signal.is_success());
            assert_eq!(signal.value, Some(TypedValue::Number(7.0)));
            assert_eq!(rt.scope.depth(), 1);
        });
    }

    #[test]
    fn test_pause_interrupted_by_halt() {
        let program = Program::empty();
        let config = InterpreterConfig::default();
        let mut canvas = RecordingCanvas::new();
        let halt = HaltMonitor::new();
        halt.halt();
        let mut rt = Runtime::new(&program, &config, Scope::new(), halt, &mut canvas, &[]);
        let signal = rt
            .primitive(Primitive::Pause, &[TypedValue::Number(60_000.0)], Span::default())
            .unwrap();
        assert!(signal.is_halt());
    }
}
