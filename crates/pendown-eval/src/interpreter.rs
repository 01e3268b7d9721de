//! Host-facing entry point.
//!
//! An [`Interpreter`] is built once from a parse tree and can run any
//! number of times against different canvases and seeded scopes.

use crate::block::Program;
use crate::canvas::Canvas;
use crate::config::InterpreterConfig;
use crate::error::{EvalError, EvalResult};
use crate::halt::HaltMonitor;
use crate::listener::InterpreterListener;
use crate::runtime::Runtime;
use crate::scope::Scope;
use crate::signal::ReturnValue;
use pendown_types::ParseNode;

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// The root block's signal; HALT when the run was stopped early.
    pub outcome: ReturnValue,
    /// The scope after the run; only the global frame remains.
    pub scope: Scope,
    /// Statements executed.
    pub steps: u64,
}

/// A built program plus its configuration, halt monitor and listeners.
pub struct Interpreter {
    program: Program,
    config: InterpreterConfig,
    halt: HaltMonitor,
    listeners: Vec<Box<dyn InterpreterListener>>,
}

impl Interpreter {
    /// Build with the default configuration.
    pub fn new(tree: &ParseNode) -> EvalResult<Self> {
        Self::with_config(tree, InterpreterConfig::default())
    }

    pub fn with_config(tree: &ParseNode, config: InterpreterConfig) -> EvalResult<Self> {
        let program = Program::build(tree, &config)?;
        tracing::debug!(blocks = program.len(), "program built");
        Ok(Self {
            program,
            config,
            halt: HaltMonitor::new(),
            listeners: Vec::new(),
        })
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    /// A handle sharing this interpreter's halt flag.
    pub fn halt_monitor(&self) -> HaltMonitor {
        self.halt.clone()
    }

    pub fn add_listener(&mut self, listener: Box<dyn InterpreterListener>) {
        self.listeners.push(listener);
    }

    /// Run against a fresh scope.
    pub fn run(&self, canvas: &mut dyn Canvas) -> EvalResult<RunReport> {
        self.run_with_scope(Scope::new(), canvas)
    }

    /// Run with a host-seeded scope; its global frame receives the
    /// program's top-level assignments.
    pub fn run_with_scope(&self, scope: Scope, canvas: &mut dyn Canvas) -> EvalResult<RunReport> {
        tracing::debug!("run started");
        for listener in &self.listeners {
            listener.started();
        }

        let mut rt = Runtime::new(
            &self.program,
            &self.config,
            scope,
            self.halt.clone(),
            canvas,
            &self.listeners,
        );
        let result = match self.program.root().run_statements(&mut rt) {
            Err(EvalError::Halted) => Ok(ReturnValue::HALT),
            other => other,
        };
        let steps = rt.steps();

        match result {
            Ok(outcome) => {
                tracing::debug!(result = ?outcome.result, steps, "run finished");
                for listener in &self.listeners {
                    listener.finished(&outcome);
                }
                Ok(RunReport {
                    outcome,
                    scope: rt.into_scope(),
                    steps,
                })
            }
            Err(err) => {
                tracing::debug!(error = %err, steps, "run failed");
                for listener in &self.listeners {
                    listener.error(&err);
                }
                Err(err)
            }
        }
    }
}
