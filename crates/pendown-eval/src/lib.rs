//! Pendown tree-walking interpreter.
//!
//! Executes Logo/BASIC-style programs delivered as grammar-shaped parse
//! trees ([`pendown_types::ParseNode`]). The tree is turned into an arena of
//! [`CodeBlock`]s once; running walks those blocks against a host-supplied
//! [`Canvas`], producing [`ReturnValue`] signals for structured control flow.
//! A run can be stopped from another thread through a [`HaltMonitor`].

pub mod block;
mod canvas;
mod config;
pub mod control;
mod error;
pub mod expr;
mod halt;
mod interpreter;
mod listener;
pub mod runtime;
mod scope;
mod signal;
mod stack;
mod value;

pub use block::{BlockId, BlockKind, CodeBlock, Program};
pub use canvas::{Canvas, Color, DrawCall, Primitive, RecordingCanvas};
pub use config::InterpreterConfig;
pub use control::{Direction, ForRange};
pub use error::{EvalError, EvalResult};
pub use expr::{evaluate, evaluate_in};
pub use halt::HaltMonitor;
pub use interpreter::{Interpreter, RunReport};
pub use listener::InterpreterListener;
pub use runtime::{FrameGuard, Runtime};
pub use scope::{Frame, Scope};
pub use signal::{ProcessResult, ReturnValue};
pub use value::{TypedValue, ValueType};
